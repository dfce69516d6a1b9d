use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod app;
mod cli;
mod commands;
mod config;
mod core;
mod display;
mod input;
mod providers;
mod server;
mod session;
mod store;

use crate::app::Application;
use crate::cli::{Args, Command};
use crate::commands::create_command_registry;
use crate::config::Config;
use crate::core::error::EloyError;
use crate::providers::factory::ProviderFactory;
use crate::session::Conversation;

fn init_tracing(verbose: bool, command: &Command) {
    let default_level = match (verbose, command) {
        (true, _) => "eloy=debug,tower_http=debug,info",
        (false, Command::Serve { .. }) => "info",
        (false, _) => "warn",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn init_config(args: &Args, force: bool) -> Result<(), EloyError> {
    let path = args.config.clone().unwrap_or_else(Config::default_path);
    if path.exists() && !force {
        return Err(EloyError::Config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    let written = Config::default().save(Some(path.as_path()))?;
    println!("Config written to {}", written.display());
    Ok(())
}

async fn run(args: Args) -> Result<(), EloyError> {
    let command = args.command();

    if let Command::InitConfig { force } = command {
        return init_config(&args, force);
    }

    let mut config = Config::load(args.config.as_deref())?;
    config.apply_env()?;
    args.apply_to(&mut config)?;

    let store = store::open(
        &config.storage,
        Duration::from_secs(config.request_timeout_secs),
    )?;
    let provider = ProviderFactory::from_config(&config)?;
    tracing::info!(
        provider = ?config.active_provider,
        model = provider.model(),
        store = store.kind(),
        "assistant ready"
    );
    let conversation = Arc::new(Conversation::new(
        store,
        provider,
        config.assistant_name.clone(),
    ));

    match command {
        Command::Serve { .. } => server::serve(&config.server, conversation).await,
        Command::Ask { mensagem, contexto } => {
            let app = Application::new(config, conversation, create_command_registry());
            app.ask(&mensagem, contexto.as_deref()).await
        }
        Command::Chat | Command::InitConfig { .. } => {
            let app = Application::new(config, conversation, create_command_registry());
            app.run_chat().await
        }
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_tracing(args.verbose, &args.command());

    if let Err(e) = run(args).await {
        display::display_error(&e.to_string());
        std::process::exit(1);
    }
}
