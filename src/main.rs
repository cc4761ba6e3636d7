use clap::{Arg, Command};
use std::io::IsTerminal;
use tracing::info;

mod api;
mod config;
mod confirm;
mod context;
mod history;
mod http_client;
mod repl;
mod session;
mod tools;

use session::ChatSession;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let matches = Command::new("llmsh")
        .about("Generate and run shell commands from natural language")
        .long_about(
            "llmsh turns natural-language requests into shell commands via a \
             chat-completion API. With no prompt it starts an interactive session \
             with bounded in-memory history; generated commands land in the input \
             buffer for editing before they run.",
        )
        .arg(Arg::new("prompt")
            .help("Natural-language request; omit to start an interactive session")
            .num_args(0..))
        .arg(Arg::new("execute")
            .short('x')
            .long("execute")
            .help("Allow the model to run commands via tool calls (each run is confirmed)")
            .action(clap::ArgAction::SetTrue))
        .arg(Arg::new("context")
            .short('C')
            .long("context")
            .help("Extra context appended to the prompt; may be repeated")
            .value_name("TEXT")
            .action(clap::ArgAction::Append))
        .arg(Arg::new("set-api-key")
            .long("set-api-key")
            .help("Store the API key in the config file")
            .value_name("API_KEY")
            .num_args(1))
        .arg(Arg::new("config")
            .long("config")
            .help("Show configuration information")
            .action(clap::ArgAction::SetTrue))
        .get_matches();

    // Handle configuration commands
    if let Some(api_key) = matches.get_one::<String>("set-api-key") {
        config::Config::set_api_key(api_key.clone())?;
        println!("✅ API key saved successfully");
        return Ok(());
    }

    if matches.get_flag("config") {
        config::Config::show_config_info()?;
        return Ok(());
    }

    let settings = config::Config::load()?;
    confirm::apply_color_mode(settings.color);

    let allow_exec = matches.get_flag("execute");
    let context_fragments: Vec<String> = matches
        .get_many::<String>("context")
        .unwrap_or_default()
        .cloned()
        .collect();
    let prompt_words: Vec<String> = matches
        .get_many::<String>("prompt")
        .unwrap_or_default()
        .cloned()
        .collect();

    if prompt_words.is_empty() {
        if !std::io::stdin().is_terminal() {
            anyhow::bail!(
                "Piped input needs a prompt, e.g.: some-command | llmsh \"explain this\""
            );
        }
        return repl::run(allow_exec, context_fragments).await;
    }

    // One-shot mode: single turn, reply on stdout
    let prompt = prompt_words.join(" ");
    info!("One-shot prompt: {}", prompt);

    let piped = context::read_piped_stdin();
    let mut session = ChatSession::new(&settings, allow_exec);
    let answer = session
        .ask(&prompt, &context_fragments, piped.as_deref())
        .await?;
    println!("{}", answer);

    Ok(())
}
