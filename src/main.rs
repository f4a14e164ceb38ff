use anyhow::{Context, Result};
use clap::Parser;
use dnf_dbus::auth::{AllowAll, AuthorizationGate, PolicyEngine, PolkitAuthority};
use dnf_dbus::backend::DnfBackend;
use dnf_dbus::config::{BusKind, Config, PolicyMode, DEFAULT_CONFIG_PATH};
use dnf_dbus::dbus::{serve, DnfDbusDaemon};
use dnf_dbus::engine::CacheEngine;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn, Instrument};

#[derive(Parser)]
#[command(name = "dnf-dbusd")]
#[command(about = "D-Bus daemon answering package queries from the dnf cache", long_about = None)]
struct Cli {
    /// Configuration file [default: /etc/dnf-dbus/daemon.toml, or the user
    /// config directory with --session]
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Register on the session bus instead of the system bus
    #[arg(long)]
    session: bool,

    /// Skip polkit and grant every caller (development only)
    #[arg(long)]
    allow_all: bool,

    /// dnf metadata cache directory
    #[arg(long, value_name = "PATH")]
    cache_dir: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Configuration file values with command line overrides applied
    fn config_path(&self) -> PathBuf {
        if let Some(path) = &self.config {
            return path.clone();
        }
        if self.session {
            if let Some(path) = Config::user_config_path().filter(|p| p.exists()) {
                return path;
            }
        }
        PathBuf::from(DEFAULT_CONFIG_PATH)
    }

    fn load_config(&self) -> Result<Config> {
        let path = self.config_path();
        let mut config = Config::load_or_default(&path)
            .with_context(|| format!("Failed to load {}", path.display()))?;
        if self.session {
            config.bus = BusKind::Session;
        }
        if self.allow_all {
            config.authorization = PolicyMode::AllowAll;
        }
        if let Some(cache_dir) = &self.cache_dir {
            config.cache_dir = cache_dir.clone();
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::filter::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::filter::EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.load_config()?;

    #[cfg(unix)]
    if config.bus == BusKind::System && unsafe { libc::geteuid() } != 0 {
        warn!("not running as root, the system bus may refuse the name");
    }

    let span = tracing::info_span!("daemon", bus = ?config.bus, name = %config.bus_name);
    let runtime = tokio::runtime::Runtime::new().context("Failed to start runtime")?;
    runtime.block_on(run(config).instrument(span))
}

async fn run(config: Config) -> Result<()> {
    let connection = match config.bus {
        BusKind::System => zbus::Connection::system().await,
        BusKind::Session => zbus::Connection::session().await,
    }
    .context("Failed to connect to the message bus")?;

    let policy: Arc<dyn PolicyEngine> = match config.authorization {
        PolicyMode::Polkit => {
            let system = match config.bus {
                BusKind::System => connection.clone(),
                BusKind::Session => zbus::Connection::system()
                    .await
                    .context("polkit needs the system bus")?,
            };
            Arc::new(PolkitAuthority::new(&system).await?)
        }
        PolicyMode::AllowAll => {
            warn!("authorization disabled, every caller is granted");
            Arc::new(AllowAll)
        }
    };

    let (events_tx, events_rx) = tokio::sync::mpsc::unbounded_channel();
    let engine = CacheEngine::new(&config);
    let backend = DnfBackend::new(Box::new(engine), config.cache_only).with_events(events_tx);
    let daemon = Arc::new(DnfDbusDaemon::new(backend, AuthorizationGate::new(policy)));

    info!(
        cache_dir = %config.cache_dir.display(),
        version = env!("CARGO_PKG_VERSION"),
        "starting"
    );
    serve(connection, &config.bus_name, daemon, events_rx)
        .await
        .context("D-Bus service failed")?;
    Ok(())
}
