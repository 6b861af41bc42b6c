mod cli;
mod repl;

use std::io::IsTerminal;
use std::process::ExitCode;

use empathy_ai::{Session, SessionOptions};
use empathy_common::EmpathyError;
use empathy_config::schema::{EmpathyConfig, LogLevel};
use tokio::io::BufReader;
use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter, Registry};

use crate::repl::{ChatApp, Spinner};

type FilterHandle = reload::Handle<EnvFilter, Registry>;

/// Level used until the config file has been read.
const BOOTSTRAP_LEVEL: &str = "info";

/// A directive that is known before the config is read: `--log-level`,
/// then a non-blank `RUST_LOG`. The config level applies only without one.
fn fixed_directive(cli: Option<&str>, env: Option<String>) -> Option<String> {
    cli.map(str::to_string)
        .or_else(|| env.filter(|value| !value.trim().is_empty()))
}

/// Installed before the config is loaded so loading itself is logged.
fn init_logging(fixed: Option<&str>) -> FilterHandle {
    let filter = match fixed {
        Some(directive) => EnvFilter::try_new(directive).unwrap_or_else(|e| {
            eprintln!("invalid log directive {directive:?}: {e}");
            EnvFilter::new(BOOTSTRAP_LEVEL)
        }),
        None => EnvFilter::new(BOOTSTRAP_LEVEL),
    };

    let (filter, handle) = reload::Layer::new(filter);
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
    handle
}

fn apply_config_level(handle: &FilterHandle, level: LogLevel) {
    if let Err(e) = handle.reload(EnvFilter::new(level.as_directive())) {
        tracing::warn!("could not apply the configured log level: {e}");
    }
}

fn load_config(args: &cli::Args) -> empathy_common::Result<EmpathyConfig> {
    let mut config = match empathy_config::load_config(args.config.as_deref()) {
        Ok(config) => config,
        // an explicit file that cannot be used is fatal
        Err(e) if args.config.is_some() => return Err(e.into()),
        Err(e) => {
            tracing::warn!("Config load failed, using defaults: {e}");
            EmpathyConfig::default()
        }
    };

    args.apply_to(&mut config);
    empathy_config::validation::validate(&config)?;
    Ok(config)
}

async fn chat(args: &cli::Args, config: &EmpathyConfig) -> empathy_common::Result<()> {
    let mut stdout = std::io::stdout();
    repl::render_header(&mut stdout)?;

    let interactive = std::io::stderr().is_terminal();
    let spinner = interactive.then(|| Spinner::start("Loading model..."));
    let engine = empathy_ai::shared_engine(config).await;
    if let Some(spinner) = spinner {
        spinner.stop().await;
    }
    let engine = engine?;

    let session = Session::with_options(engine, SessionOptions::from_config(config));
    tracing::info!(session = %session.id().short(), "session started");

    let app = ChatApp::new(session.into_shared())
        .with_spinner(interactive)
        .with_json_history(args.json_history);

    let stdin = BufReader::new(tokio::io::stdin());
    app.run(stdin, &mut stdout).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::parse();
    let fixed = fixed_directive(args.log_level.as_deref(), std::env::var("RUST_LOG").ok());
    let log_filter = init_logging(fixed.as_deref());

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("empathybot: {e}");
            return ExitCode::from(2);
        }
    };
    if fixed.is_none() {
        apply_config_level(&log_filter, config.logging.level);
    }

    if args.print_config {
        println!("{}", empathy_config::config_to_json(&config));
        return ExitCode::SUCCESS;
    }

    tracing::info!("EmpathyBot v{} starting...", env!("CARGO_PKG_VERSION"));

    match chat(&args, &config).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e @ EmpathyError::Ai(_)) => {
            tracing::error!("Model unavailable: {e}");
            eprintln!("empathybot: could not load the model: {e}");
            ExitCode::FAILURE
        }
        Err(e) => {
            tracing::error!("Chat loop error: {e}");
            eprintln!("empathybot: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixed_directive;

    #[test]
    fn cli_level_wins_over_env() {
        assert_eq!(
            fixed_directive(Some("debug"), Some("warn".into())).as_deref(),
            Some("debug")
        );
    }

    #[test]
    fn env_is_used_without_cli_level() {
        assert_eq!(
            fixed_directive(None, Some("empathy_ai=trace".into())).as_deref(),
            Some("empathy_ai=trace")
        );
    }

    #[test]
    fn config_level_applies_when_nothing_is_fixed() {
        assert_eq!(fixed_directive(None, None), None);
        assert_eq!(fixed_directive(None, Some("  ".into())), None);
    }
}
