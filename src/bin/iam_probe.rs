//! iam-hook-probe - exercise the IAM hook against a live IAM service
//!
//! Builds the hook exactly as a broker would and runs a single decision.
//! Exits 0 when the verdict is allow and 1 when it is deny.

use anyhow::Context;
use bytes::Bytes;
use clap::{Parser, Subcommand};
use iam_auth_hook::diagnostics::TracingSink;
use iam_auth_hook::packets::{Client, Packet};
use iam_auth_hook::{panic_handler, Config, Hook, HookRegistry, IamAuthHook};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "iam-hook-probe")]
#[command(about = "Run a single IAM hook decision against an IAM service")]
#[command(version)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, conflicts_with = "address")]
    config: Option<String>,

    /// IAM service address, used with default timeouts when no config is given
    #[arg(long, default_value = "127.0.0.1:50051")]
    address: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Authenticate a client as on MQTT CONNECT
    Authenticate {
        #[arg(long)]
        client_id: String,
        #[arg(long)]
        token: String,
    },
    /// Check whether a client may access a topic
    Authorize {
        #[arg(long)]
        client_id: String,
        #[arg(long)]
        topic: String,
        /// Check publish access instead of subscribe access
        #[arg(long)]
        write: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();
    panic_handler::install_panic_hook();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("failed to load configuration from {}", path))?,
        None => Config::for_address(cli.address.clone()),
    };

    let hook = Arc::new(
        IamAuthHook::from_config(&config, Arc::new(TracingSink))
            .await
            .context("IAM hook could not be constructed")?,
    );

    let mut registry = HookRegistry::new();
    registry.add(hook.clone(), None)?;
    info!("Registered hook {}", hook.id());

    let allowed = match cli.command {
        Commands::Authenticate { client_id, token } => {
            let packet = Packet::connect(client_id.clone(), Some(Bytes::from(token)));
            registry
                .on_connect_authenticate(&Client::new(client_id), &packet)
                .await
        }
        Commands::Authorize {
            client_id,
            topic,
            write,
        } => {
            registry
                .on_acl_check(&Client::new(client_id), &topic, write)
                .await
        }
    };

    registry.stop_all()?;

    println!("{}", if allowed { "allow" } else { "deny" });
    Ok(if allowed {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}
