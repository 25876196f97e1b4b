use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use sentinel_provider::config::ProviderConfig;
use sentinel_provider::provider::{resource_type_name, Provider};
use sentinel_provider::resource::{cancel_pair, Registry};
use sentinel_provider::{server, VERSION};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Lifecycle provider for Sentinel sector sentries
#[derive(Parser, Debug)]
#[command(name = "sentinel-provider", version = VERSION, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Sentry catalog (JSON or YAML) replacing the built-in kinds
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Sentinel API endpoint
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    /// Log file to use instead of the default location
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List registered sentry kinds
    Kinds,
    /// Print the resource schema of a kind as JSON
    Schema {
        /// Kind name (`apollo`) or resource type name (`sentinel_apollo`)
        kind: String,
    },
    /// Answer JSON requests on stdin, one per line
    Serve,
}

/// Env var with `EnvFilter` directives; wins over `--log-level`
const LOG_ENV: &str = "SENTINEL_LOG";

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Filter for this crate only; dependencies stay at warn
    fn directives(self) -> Option<String> {
        let level = match self {
            LogLevel::Off => return None,
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        };
        Some(format!("warn,sentinel_provider={}", level))
    }
}

/// Stdout carries protocol output, so logs only ever go to a file
fn setup_logging(level: LogLevel, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = match std::env::var(LOG_ENV) {
        Ok(directives) if !directives.trim().is_empty() => EnvFilter::try_new(&directives)
            .with_context(|| format!("Invalid {} filter {:?}", LOG_ENV, directives))?,
        _ => match level.directives() {
            Some(directives) => EnvFilter::new(directives),
            None => return Ok(None),
        },
    };

    let log_path = log_file
        .map(Path::to_path_buf)
        .unwrap_or_else(default_log_path);
    if let Some(parent) = log_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {:?}", parent))?;
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {:?}", log_path))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!(
        version = VERSION,
        pid = std::process::id(),
        log_file = %log_path.display(),
        "sentinel-provider started"
    );

    Ok(Some(guard))
}

fn default_log_path() -> PathBuf {
    match dirs::config_dir() {
        Some(config_dir) => config_dir.join("sentinel").join("sentinel.log"),
        None => PathBuf::from("sentinel.log"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level, args.log_file.as_deref())?;

    let config = load_config(&args)?;
    let catalog = args.catalog.as_deref().or(config.catalog.as_deref());
    let registry = Arc::new(load_registry(catalog)?);

    match args.command {
        Command::Kinds => {
            for kind in registry.kinds() {
                println!(
                    "{:<12} {:<22} {}",
                    kind.name,
                    resource_type_name(&kind.name),
                    kind.sector
                );
            }
        }
        Command::Schema { kind } => {
            let provider = Provider::new(VERSION, registry);
            let type_name = if kind.starts_with("sentinel_") {
                kind
            } else {
                resource_type_name(&kind)
            };
            let server = provider.resource(&type_name)?;
            println!("{}", serde_json::to_string_pretty(server.schema())?);
        }
        Command::Serve => {
            let provider = Provider::new(VERSION, registry).with_defaults(config);
            serve(Arc::new(provider)).await?;
        }
    }

    Ok(())
}

fn load_config(args: &Args) -> Result<ProviderConfig> {
    let config = match &args.config {
        Some(path) => ProviderConfig::load_from(path)?.with_env(),
        None => ProviderConfig::load(),
    };
    Ok(config.with_overrides(args.endpoint.clone(), None))
}

/// Registry failures are the one fatal startup error
fn load_registry(catalog: Option<&Path>) -> Result<Registry> {
    let registry = match catalog {
        Some(path) => Registry::from_catalog_file(path)?,
        None => Registry::builtin().context("Built-in sentry catalog is invalid")?,
    };
    tracing::info!("Registered {} sentry kinds", registry.len());
    Ok(registry)
}

/// JSON-lines loop. Requests run concurrently; Ctrl-C cancels everything in
/// flight and stops reading.
async fn serve(provider: Arc<Provider>) -> Result<()> {
    let (cancel_handle, cancel) = cancel_pair();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(line) = rx.recv().await {
            stdout.write_all(line.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
        }
        Ok::<_, std::io::Error>(())
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut tasks = JoinSet::new();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read request")? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }

                let provider = Arc::clone(&provider);
                let cancel = cancel.clone();
                let tx = tx.clone();
                tasks.spawn(async move {
                    let response = server::handle_line(&provider, &line, &cancel).await;
                    match serde_json::to_string(&response) {
                        Ok(json) => {
                            let _ = tx.send(json);
                        }
                        Err(e) => tracing::error!("Failed to encode response: {}", e),
                    }
                });
            }
            Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                if let Err(e) = joined {
                    tracing::error!("Request task failed: {}", e);
                }
            }
            _ = &mut shutdown => {
                tracing::info!("Interrupted, cancelling {} in-flight requests", tasks.len());
                cancel_handle.cancel();
                break;
            }
        }
    }

    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            tracing::error!("Request task failed: {}", e);
        }
    }

    drop(tx);
    writer.await??;

    Ok(())
}
