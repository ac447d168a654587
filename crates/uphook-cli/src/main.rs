//! uphook: command-line client for upload hook handlers.
//!
//! Reads its configuration from HOOKS_* environment variables (or `.env`).
//! `invoke` sends one hook to the configured handler and prints how the
//! response resolved.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;

use uphook_core::{HookCodec, HookConfig, HookType, HttpResponse, JsonCodec, Resolution};
use uphook_infra::{build_dispatcher, init_telemetry, LogFormat};

#[derive(Parser)]
#[command(name = "uphook", about = "Upload lifecycle hook client")]
struct Cli {
    /// Log output format: text or json
    #[arg(long, global = true, default_value = "text")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Invoke a hook and print the resolved outcome
    Invoke {
        /// Hook type, e.g. pre-create or post-finish
        #[arg(long)]
        hook_type: HookType,
        /// JSON event file (the `Event` object of a hook request), `-` for stdin
        #[arg(long, default_value = "-")]
        event: PathBuf,
        /// Status of the response the server would send if the hook changed nothing
        #[arg(long, default_value = "200")]
        default_status: u16,
    },
    /// Print the effective configuration
    Config,
}

#[derive(Serialize)]
struct InvokeOutput {
    resolution: Resolution,
    client_response: HttpResponse,
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

fn read_event(path: &Path) -> anyhow::Result<serde_json::Value> {
    let raw = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read event from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read event file {}", path.display()))?
    };
    serde_json::from_str(&raw).context("Event is not valid JSON")
}

async fn invoke(
    hook_type: HookType,
    event_path: PathBuf,
    default_status: u16,
) -> anyhow::Result<()> {
    let config = HookConfig::from_env()?;
    let dispatcher = build_dispatcher(&config).await?;

    // Decode through the wire codec so the event gets the same validation a
    // handler's view of it would
    let payload = serde_json::json!({
        "Type": hook_type.as_str(),
        "Event": read_event(&event_path)?,
    });
    let request = JsonCodec
        .decode_request(&serde_json::to_vec(&payload)?)
        .context("Invalid hook event")?;

    let resolution = dispatcher
        .invoke(request.hook_type(), request.into_event())
        .await
        .with_context(|| format!("{} hook failed", hook_type))?;

    let client_response = resolution.response_for_client(&HttpResponse::new(default_status));
    print_json(&InvokeOutput {
        resolution,
        client_response,
    })
}

fn show_config() -> anyhow::Result<()> {
    let config = HookConfig::from_env()?;
    print_json(&config)?;
    if let Err(e) = config.validate() {
        tracing::warn!(error = %e, "Configuration is not usable");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_telemetry(cli.log_format).map_err(|e| anyhow::anyhow!("{}", e))?;

    match cli.command {
        Commands::Invoke {
            hook_type,
            event,
            default_status,
        } => invoke(hook_type, event, default_status).await,
        Commands::Config => show_config(),
    }
}
