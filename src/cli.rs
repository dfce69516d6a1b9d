use crate::config::{Config, Provider};
use crate::core::error::EloyError;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "eloy", author, version, about = "Assistente corporativo por chat e API HTTP", long_about = None)]
pub struct Args {
    /// Path to the YAML config file (default: ~/.eloy/config.yaml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// LLM provider [possible values: groq, openai, openrouter]
    #[arg(short, long, global = true)]
    pub provider: Option<String>,

    /// Model to use (provider-specific)
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP API
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Interactive chat in the terminal (default)
    Chat,
    /// Send one message and print the JSON reply
    Ask {
        mensagem: String,
        /// Conversation context as returned by a previous reply
        #[arg(long)]
        contexto: Option<String>,
    },
    /// Write a config file with the defaults
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl Args {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Chat)
    }

    /// Flags take precedence over the config file and the environment.
    pub fn apply_to(&self, config: &mut Config) -> Result<(), EloyError> {
        if let Some(name) = &self.provider {
            config.active_provider = Provider::from_str(name)
                .ok_or_else(|| EloyError::Config(format!("Unsupported provider: {}", name)))?;
        }
        if let Some(model) = &self.model {
            config
                .providers
                .entry(config.active_provider)
                .or_default()
                .model = Some(model.clone());
        }
        if let Command::Serve { host, port } = self.command() {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
        }
        Ok(())
    }
}
