use anyhow::{anyhow, Result};
use dirs::home_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{info, warn};

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_MAX_TOKENS: u32 = 1024;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_HISTORY_MAX: usize = 40;

/// When to emit ANSI colors in user-facing output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

impl FromStr for ColorMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(ColorMode::Auto),
            "always" => Ok(ColorMode::Always),
            "never" => Ok(ColorMode::Never),
            other => Err(anyhow!("invalid color mode '{}', expected auto|always|never", other)),
        }
    }
}

/// On-disk portion of the configuration (`~/.llmsh/config.toml`).
#[derive(Debug, Default, Serialize, Deserialize)]
struct FileConfig {
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default)]
    endpoint: Option<String>,
    #[serde(default)]
    model: Option<String>,
}

/// Fully resolved settings for one call.
///
/// Resolution order, lowest to highest precedence: built-in defaults,
/// the config file, environment variables. `Config::load` is cheap and is
/// called once per turn so environment changes take effect immediately.
#[derive(Debug, Clone)]
pub struct Config {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    pub color: ColorMode,
    pub history_max: usize,
    pub use_mock: bool,
}

impl Config {
    /// Resolve settings from defaults, the config file, and environment variables.
    pub fn load() -> Result<Self> {
        let file = FileConfig::load_from_file().unwrap_or_else(|_| {
            info!("No config file found, using defaults");
            FileConfig::default()
        });

        let mut config = Self {
            endpoint: file.endpoint.unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            model: file.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_key: file.api_key,
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            color: ColorMode::Auto,
            history_max: DEFAULT_HISTORY_MAX,
            use_mock: false,
        };

        // Environment variables override the config file
        if let Ok(endpoint) = std::env::var("LLMSH_ENDPOINT") {
            config.endpoint = endpoint;
        }
        if let Ok(model) = std::env::var("LLMSH_MODEL") {
            config.model = model;
        }
        if let Ok(key) = std::env::var("LLMSH_API_KEY") {
            config.api_key = Some(key);
        } else if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            config.api_key = Some(key);
        }

        config.max_tokens = env_parsed("LLMSH_MAX_TOKENS", config.max_tokens);
        config.timeout_secs = env_parsed("LLMSH_TIMEOUT_SECS", config.timeout_secs);
        config.history_max = env_parsed("LLMSH_HISTORY_MAX", config.history_max);

        if let Ok(mode) = std::env::var("LLMSH_COLOR") {
            match mode.parse() {
                Ok(parsed) => config.color = parsed,
                Err(e) => warn!("Ignoring LLMSH_COLOR: {}", e),
            }
        }

        if std::env::var("LLMSH_USE_MOCK").is_ok() {
            config.use_mock = true;
        }

        Ok(config)
    }

    pub fn is_mock_mode(&self) -> bool {
        self.use_mock
    }

    /// Set API key and persist it to the config file.
    pub fn set_api_key(api_key: String) -> Result<()> {
        let mut file = FileConfig::load_from_file().unwrap_or_default();
        file.api_key = Some(api_key);
        file.save()?;
        info!("API key saved to config file");
        Ok(())
    }

    pub fn get_config_dir() -> Result<PathBuf> {
        let home = home_dir().ok_or_else(|| anyhow!("Could not find home directory"))?;
        Ok(home.join(".llmsh"))
    }

    pub fn show_config_info() -> Result<()> {
        let config_path = FileConfig::config_path()?;
        println!("Configuration file: {}", config_path.display());

        if config_path.exists() {
            println!("Status: Found");
            let file = FileConfig::load_from_file()?;
            println!("API Key: {}", if file.api_key.is_some() { "Set" } else { "Not set" });
        } else {
            println!("Status: Not found (using defaults)");
        }

        let resolved = Self::load()?;
        println!("\nResolved settings:");
        println!("  Endpoint: {}", resolved.endpoint);
        println!("  Model: {}", resolved.model);
        println!("  Max tokens: {}", resolved.max_tokens);
        println!("  Timeout: {}s", resolved.timeout_secs);
        println!("  History cap: {} messages", resolved.history_max);

        println!("\nTo set API key:");
        println!("  llmsh --set-api-key <your-key>");
        println!("\nOr set environment variable:");
        println!("  export LLMSH_API_KEY=<your-key>");

        Ok(())
    }
}

fn env_parsed<T: FromStr + Copy>(name: &str, fallback: T) -> T
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(e) => {
                warn!("Ignoring {}={}: {}", name, raw, e);
                fallback
            }
        },
        Err(_) => fallback,
    }
}

impl FileConfig {
    fn load_from_file() -> Result<Self> {
        let config_path = Self::config_path()?;
        if config_path.exists() {
            let content = fs::read_to_string(&config_path)?;
            let config: FileConfig = toml::from_str(&content)?;
            info!("Loaded config from: {}", config_path.display());
            Ok(config)
        } else {
            Err(anyhow!("Config file not found"))
        }
    }

    fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&config_path, content)?;
        info!("Saved config to: {}", config_path.display());
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        Ok(Config::get_config_dir()?.join("config.toml"))
    }
}
