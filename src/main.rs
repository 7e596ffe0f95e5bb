use clap::{Parser, Subcommand};
use derive_more::{Display, Error};
use exn::ResultExt;
use figment::providers::Serialized;
use longbox_archive::ArchiveClassifier;
use longbox_catalog::Database;
use longbox_config::Config;
use longbox_monitor::{Monitor, MonitorHandle, MonitorOptions, Phase};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Debug, Display, Error)]
enum ErrorKind {
    #[display("invalid configuration")]
    Config,
    #[display("unable to open the catalog")]
    Catalog,
    #[display("library monitor failed")]
    Monitor,
    #[display("unable to listen for shutdown signals")]
    Signal,
}

type Result<T> = std::result::Result<T, exn::Exn<ErrorKind>>;

#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Config file to use instead of the one in the user config directory.
    #[arg(short, long, global = true, env = "LONGBOX_CONFIG")]
    config: Option<PathBuf>,
    /// Catalog database, overriding the configured one.
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Reconcile the catalog with the library once, print the result and exit.
    Scan {
        /// Folders to scan, overriding the configured library roots.
        roots: Vec<PathBuf>,
    },
    /// Scan, then keep the catalog up to date as files change until interrupted.
    Watch {
        /// Folders to watch, overriding the configured library roots.
        roots: Vec<PathBuf>,
        /// Seconds between progress log lines while a scan is running.
        #[arg(long, default_value_t = 10)]
        progress_interval: u64,
    },
}

impl Command {
    fn roots(&self) -> &[PathBuf] {
        match self {
            Self::Scan { roots } | Self::Watch { roots, .. } => roots,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = ?err, "longbox failed");
            ExitCode::FAILURE
        },
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut figment = Config::figment(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    let roots = cli.command.roots();
    if !roots.is_empty() {
        let roots = roots
            .iter()
            .map(std::path::absolute)
            .collect::<std::io::Result<Vec<_>>>()
            .or_raise(|| ErrorKind::Config)?;
        figment = figment.merge(Serialized::default("library.roots", roots));
    }
    if let Some(catalog) = &cli.catalog {
        figment = figment.merge(Serialized::default("catalog.path", catalog));
    }
    Config::from_figment(figment).or_raise(|| ErrorKind::Config)
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    if let Some(parent) = config.catalog.path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).or_raise(|| ErrorKind::Catalog)?;
    }
    info!(catalog = %config.catalog.path.display(), "opening catalog");
    let database = Database::connect(&config.catalog.path).await.or_raise(|| ErrorKind::Catalog)?;
    let options = MonitorOptions {
        quiet_period: config.monitor.quiet_period(),
        batch_size: config.monitor.batch_size,
        poll_timeout: config.monitor.poll_timeout(),
        thumbnail_size: config.monitor.thumbnail_size(),
        exit_when_done: matches!(cli.command, Command::Scan { .. }),
    };
    let monitor = Monitor::new(config.library.roots, Arc::new(database.clone()), Arc::new(ArchiveClassifier::new()))
        .with_options(options)
        .start()
        .or_raise(|| ErrorKind::Monitor)?;
    monitor.request_scan();
    let result = match cli.command {
        Command::Scan { .. } => scan(monitor).await,
        Command::Watch { progress_interval, .. } => watch(monitor, Duration::from_secs(progress_interval.max(1))).await,
    };
    database.close().await;
    result
}

async fn scan(monitor: MonitorHandle) -> Result<()> {
    let status = monitor.status_handle();
    monitor.wait().await.or_raise(|| ErrorKind::Monitor)?;
    match serde_json::to_string_pretty(&status.snapshot()) {
        Ok(json) => println!("{json}"),
        Err(err) => error!(error = %err, "unable to serialize status"),
    }
    Ok(())
}

async fn watch(monitor: MonitorHandle, progress_interval: Duration) -> Result<()> {
    let mut ticker = tokio::time::interval(progress_interval);
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.or_raise(|| ErrorKind::Signal)?;
                info!("interrupted, stopping");
                break;
            },
            _ = ticker.tick() => {
                if monitor.is_finished() {
                    break;
                }
                let status = monitor.status();
                if status.phase == Phase::Scanning {
                    info!(
                        detail = %status.detail,
                        total = status.counters.files_total,
                        read = status.counters.files_read,
                        added = status.counters.files_added,
                        "scanning"
                    );
                }
            },
        }
    }
    monitor.stop().await.or_raise(|| ErrorKind::Monitor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_cli_roots_override_config() {
        Jail::expect_with(|jail| {
            jail.create_file("longbox.toml", "[library]\nroots = [\"/srv/comics\"]\n")?;
            let config_path = jail.directory().join("longbox.toml");
            let cli = Cli::parse_from(["longbox", "--config", config_path.to_str().unwrap(), "scan", "/mnt/manga"]);
            let config = load_config(&cli).unwrap();
            assert_eq!(config.library.roots, vec![PathBuf::from("/mnt/manga")]);
            Ok(())
        });
    }

    #[test]
    fn test_relative_cli_roots_made_absolute() {
        Jail::expect_with(|jail| {
            jail.create_file("longbox.toml", "")?;
            let config_path = jail.directory().join("longbox.toml");
            let cli = Cli::parse_from(["longbox", "--config", config_path.to_str().unwrap(), "watch", "comics"]);
            let config = load_config(&cli).unwrap();
            assert!(config.library.roots[0].is_absolute());
            assert!(config.library.roots[0].ends_with("comics"));
            Ok(())
        });
    }

    #[test]
    fn test_config_without_roots_is_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("longbox.toml", "[monitor]\nbatch_size = 5\n")?;
            let config_path = jail.directory().join("longbox.toml");
            let cli = Cli::parse_from(["longbox", "--config", config_path.to_str().unwrap(), "scan"]);
            assert!(load_config(&cli).is_err());
            Ok(())
        });
    }
}
