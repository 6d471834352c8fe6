//! # hfml
//!
//! Provision a managed online endpoint and its deployment from a YAML config,
//! then score messages against it.

#![deny(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde_json::{Value, json};

use hfml_core::constants::DEFAULT_LOG_LEVEL;
use hfml_session::Session;
use hfml_core::logging::with_bootstrap_subscriber;
use hfml_settings::loader::settings_path;
use hfml_settings::{HfmlSettings, Result as SettingsResult, load_settings, load_settings_from_path};

/// Managed online endpoint orchestrator.
#[derive(Parser, Debug)]
#[command(name = "hfml", version, about = "Managed online endpoint orchestrator")]
struct Cli {
    /// Path to the YAML session config.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Log filter (overrides `Runtime.log_level`; `RUST_LOG` wins over both).
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Acquire the client, then create or update the endpoint and deployment.
    Deploy,
    /// Score a message against the configured deployment.
    Invoke {
        /// Text sent as the `inputs` value.
        #[arg(long, short)]
        message: String,
    },
    /// Print the resolved configuration and exit.
    ShowConfig,
}

impl Cli {
    fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(settings_path)
    }

    /// Load the `--config` file, or `config.yml` when none was given.
    fn load_settings(&self) -> SettingsResult<HfmlSettings> {
        match &self.config {
            Some(path) => load_settings_from_path(path),
            None => load_settings(),
        }
    }
}

/// Flag wins, then the loaded settings, then the compiled default.
fn resolve_log_level(flag: Option<&str>, settings: Option<&HfmlSettings>) -> String {
    flag.map(str::to_string)
        .or_else(|| settings.map(|s| s.runtime.log_level.clone()))
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
}

fn show_config(settings: &HfmlSettings) -> Value {
    let config = settings.session_config();
    json!({
        "model_id": config.model_id(),
        "session": config,
        "runtime": settings.runtime,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    let path = args.config_path();

    // Settings load before the global subscriber so `Runtime.log_level` can
    // pick the filter; a scoped one reports load failures meanwhile.
    let bootstrap_level = args.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL);
    let loaded = with_bootstrap_subscriber(bootstrap_level, || args.load_settings());
    let level = resolve_log_level(args.log_level.as_deref(), loaded.as_ref().ok());
    if args.json_logs {
        hfml_core::logging::init_json_subscriber(&level);
    } else {
        hfml_core::logging::init_subscriber(&level);
    }
    let settings =
        loaded.with_context(|| format!("Failed to load config: {}", path.display()))?;
    tracing::debug!(path = %path.display(), command = ?args.command, "config loaded");

    match args.command {
        Command::ShowConfig => {
            println!("{}", serde_json::to_string_pretty(&show_config(&settings))?);
        }
        Command::Deploy => {
            let mut session = Session::new(&settings);
            let report = session
                .deploy()
                .await
                .context("Failed to acquire management client")?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.is_success() {
                bail!("deploy finished with failures");
            }
        }
        Command::Invoke { message } => {
            let mut session = Session::new(&settings);
            session
                .acquire_client()
                .await
                .context("Failed to acquire management client")?;
            let response = session
                .invoke(&message)
                .await
                .context("Failed to invoke endpoint")?;
            println!("{response}");
        }
    }
    Ok(())
}
