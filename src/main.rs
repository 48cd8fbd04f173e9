use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use itagent_lib::agent;
use itagent_lib::error::AgentError;
use itagent_lib::notification::{failure_message, SlackNotifier};
use itagent_lib::probe::{HardwareProbe, PowerShellProbe};
use itagent_lib::snipeit::client::SnipeItClient;
use itagent_lib::state;
use itagent_lib::types::Settings;

/// Collect hardware inventory and sync it to Snipe-IT.
#[derive(Debug, Parser)]
#[command(name = "itagent", version, about)]
struct Cli {
    /// Directory holding config.json, custom_fields.json and dynamic_names.json
    #[arg(long, value_name = "DIR")]
    config_dir: Option<PathBuf>,

    /// Log at debug level (RUST_LOG still wins)
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    log::info!("ITAgent {} starting", env!("CARGO_PKG_VERSION"));

    let settings = match state::config_dir(cli.config_dir.as_deref())
        .and_then(|dir| state::load_settings(&dir))
    {
        Ok(settings) => settings,
        Err(e) => {
            // No settings means no Slack webhook either
            log::error!("{}", AgentError::Config(e));
            return ExitCode::FAILURE;
        }
    };

    let probe = PowerShellProbe::new();
    match run(&settings, &probe) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_failure(&settings, &probe, &e);
            ExitCode::FAILURE
        }
    }
}

fn run(settings: &Settings, probe: &PowerShellProbe) -> Result<(), AgentError> {
    let client = SnipeItClient::new(&settings.config.server)?;
    let report = agent::run(settings, probe, &client)?;

    match serde_json::to_string_pretty(&report) {
        Ok(json) => log::info!("Run complete:\n{}", json),
        Err(e) => log::warn!("Failed to render run report: {}", e),
    }
    Ok(())
}

fn report_failure(settings: &Settings, probe: &PowerShellProbe, error: &AgentError) {
    let debugging = &settings.config.debugging;

    if debugging.slack_logging {
        match debugging.slack_webhook.as_deref() {
            Some(webhook) if !webhook.is_empty() => {
                let hostname = probe.hostname().unwrap_or_else(|_| "unknown host".to_string());
                let user = std::env::var("USERNAME")
                    .or_else(|_| std::env::var("USER"))
                    .unwrap_or_else(|_| "unknown".to_string());
                let message =
                    failure_message(error, &hostname, &user, env!("CARGO_PKG_VERSION"));
                match SlackNotifier::new(webhook) {
                    Ok(notifier) => notifier.notify(&message),
                    Err(e) => log::warn!("{}", e),
                }
            }
            _ => log::warn!("slackLogging is on but no slackWebhook is configured"),
        }
    }

    if !debugging.silent_mode {
        log::error!("{}", error);
        log::error!("{}", error.recovery_suggestion());
    }
}
