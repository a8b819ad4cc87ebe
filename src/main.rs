#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::unnecessary_literal_bound,
    clippy::module_name_repetitions,
    clippy::struct_field_names
)]

use anyhow::Result;
use clap::{Parser, Subcommand};
use dirchat::agent::{self, RunOptions};
use dirchat::config::{Config, McpTransport, ProviderKind};
use dirchat::tools::{schema, ToolInvoker};
use dirchat::util::mask_secret;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// `dirchat` - ask questions about your organization directory in plain language.
#[derive(Parser, Debug)]
#[command(name = "dirchat")]
#[command(version)]
#[command(about = "Chat with an LLM that queries your directory through remote tools.", long_about = None)]
struct Cli {
    /// Config file (default: ~/.dirchat/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start a chat session
    Chat {
        /// Single message mode (don't enter interactive mode)
        #[arg(short, long)]
        message: Option<String>,

        /// Model to use (azure-openai always targets [provider].deployment)
        #[arg(long)]
        model: Option<String>,

        /// Temperature (0.0 - 2.0)
        #[arg(short, long)]
        temperature: Option<f64>,
    },

    /// List the tools offered by the tool server with their schemas
    Tools,

    /// Show the resolved configuration (secrets masked)
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = match &cli.config {
        Some(path) => Config::load_or_init_at(path)?,
        None => Config::load_or_init()?,
    };

    match cli.command {
        Commands::Chat {
            message,
            model,
            temperature,
        } => {
            agent::run(
                config,
                RunOptions {
                    message,
                    model,
                    temperature,
                },
            )
            .await
        }

        Commands::Tools => {
            let source = agent::connect(&config).await?;
            let invoker = ToolInvoker::discover(source).await?;
            if invoker.tools().is_empty() {
                println!("The tool server lists no tools.");
                return Ok(());
            }
            for spec in invoker.specs() {
                println!("{}", spec.name);
                if !spec.description.is_empty() {
                    println!("    {}", spec.description);
                }
                match schema::required_argument(&spec.name) {
                    Some(arg) => println!("    requires: {} (string)", arg.name),
                    None => println!("    requires: nothing (no schema known)"),
                }
            }
            Ok(())
        }

        Commands::Status => {
            print_status(&config);
            Ok(())
        }
    }
}

fn print_status(config: &Config) {
    let masked = |value: Option<&String>| {
        value.map_or_else(|| "not set".to_string(), |v| mask_secret(v))
    };

    println!("dirchat {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Config:        {}", config.config_path.display());
    println!();
    let kind = match config.provider.kind {
        ProviderKind::Openai => "openai",
        ProviderKind::AzureOpenai => "azure-openai",
    };
    println!("Provider:      {kind}");
    println!("  Endpoint:    {}", config.provider.endpoint);
    println!("  Model:       {}", config.provider.model);
    if let Some(deployment) = &config.provider.deployment {
        println!("  Deployment:  {deployment}");
    }
    println!("  API key:     {}", masked(config.provider.api_key.as_ref()));
    println!("  Temperature: {}", config.provider.temperature);
    println!();
    match config.mcp.transport {
        McpTransport::Http => println!("Tool server:   {} (http)", config.mcp.url),
        McpTransport::Stdio => println!(
            "Tool server:   {} {} (stdio)",
            config.mcp.command.as_deref().unwrap_or("<unset>"),
            config.mcp.args.join(" ")
        ),
    }
    println!("  Timeout:     {}s", config.mcp.timeout_secs);
    println!("  Token:       {}", masked(config.auth.access_token.as_ref()));
    println!(
        "  Prompt:      {}",
        if config.auth.prompt_for_token { "on" } else { "off" }
    );
    println!();
    println!(
        "Iterations:    {} per turn",
        config.effective_max_tool_iterations()
    );
    println!("Observer:      {}", config.observability.backend);
}
