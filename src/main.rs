//! auto-accept
//!
//! Entry point: attaches to IDE webviews over the DevTools protocol and keeps
//! their agent panels moving.

use clap::Parser;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use autoaccept_config::auto_accept_dir;

mod adapters;
mod cli;
mod cmd_check;
mod cmd_probe;
mod cmd_run;
mod cmd_stats;

use cli::{Cli, Commands};
use cmd_run::RunOverrides;

/// Initialize tracing with console and file output.
///
/// Log files are written to ~/.auto-accept/logs/ with daily rotation.
fn init_tracing() -> anyhow::Result<()> {
    let log_dir = auto_accept_dir().join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("auto-accept")
        .filename_suffix("log")
        .max_log_files(30)
        .build(&log_dir)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Flushes the file writer on exit.
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
        std::sync::OnceLock::new();
    let _ = GUARD.set(guard);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_ansi(true))
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;

    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        None => cmd_run::run(config_path, RunOverrides::default()).await,
        Some(Commands::Run {
            ide,
            background,
            poll_interval,
            port,
        }) => {
            let overrides = RunOverrides {
                ide,
                background,
                poll_interval,
                port,
            };
            cmd_run::run(config_path, overrides).await
        }
        Some(Commands::Probe { format }) => cmd_probe::probe(config_path, &format).await,
        Some(Commands::Stats { format }) => cmd_stats::stats(config_path, &format).await,
        Some(Commands::CheckConfig) => cmd_check::check_config(config_path),
    }
}
