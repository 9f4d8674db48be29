//! Command-line interface for the JDBC acceptance test
//!
//! ```bash
//! # Print the script for the type-correct binding
//! pgwire-java-acceptance render
//!
//! # Print the script with a custom setter
//! pgwire-java-acceptance render --setter 'String(2, "a")'
//!
//! # Run both cases against a local node
//! pgwire-java-acceptance run --host localhost --port 26257 --certs-dir ./certs
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use pgwire_java_acceptance::container::ContainerRuntimeType;
use pgwire_java_acceptance::{render, run_java, HarnessConfig, Runner};

/////////////////////////////////////////////////////////////////////////////////////////

const BINARY_NAME: &str = env!("CARGO_PKG_NAME");
const VERSION: &str = env!("CARGO_PKG_VERSION");
const DEFAULT_LOGGING_CONFIG: &str = "info";

/////////////////////////////////////////////////////////////////////////////////////////

#[derive(Parser)]
#[command(name = BINARY_NAME, version = VERSION, about = "JDBC acceptance test runner")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the client script with the given setter substituted
    Render {
        /// Setter call without the leading `set`, e.g. `Int(2, 3)`
        #[arg(long, default_value = "Int(2, 3)")]
        setter: String,
    },
    /// Run the Java scenario against a running database
    Run(RunArgs),
}

#[derive(clap::Args)]
struct RunArgs {
    /// YAML config file; flags below override it
    #[arg(long, env = "ACCEPTANCE_CONFIG")]
    config: Option<PathBuf>,
    #[arg(long, value_enum, env = "ACCEPTANCE_RUNTIME")]
    runtime: Option<ContainerRuntimeType>,
    #[arg(long, env = "ACCEPTANCE_RUNTIME_BINARY")]
    runtime_binary: Option<PathBuf>,
    #[arg(long, env = "ACCEPTANCE_IMAGE")]
    image: Option<String>,
    #[arg(long, env = "ACCEPTANCE_NETWORK")]
    network: Option<String>,
    #[arg(long, env = "ACCEPTANCE_PGHOST")]
    host: Option<String>,
    #[arg(long, env = "ACCEPTANCE_PGPORT")]
    port: Option<u16>,
    #[arg(long, env = "ACCEPTANCE_CERTS_DIR")]
    certs_dir: Option<PathBuf>,
    #[arg(long, env = "ACCEPTANCE_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,
    #[arg(long, env = "ACCEPTANCE_LOG_DIR")]
    log_dir: Option<PathBuf>,
}

impl RunArgs {
    fn into_config(self) -> Result<HarnessConfig, pgwire_java_acceptance::ConfigError> {
        let mut cfg = match &self.config {
            Some(path) => HarnessConfig::load(path)?,
            None => HarnessConfig::default(),
        };

        if let Some(runtime) = self.runtime {
            cfg.runtime = runtime;
        }
        if self.runtime_binary.is_some() {
            cfg.runtime_binary = self.runtime_binary;
        }
        if let Some(image) = self.image {
            cfg.image = image;
        }
        if self.network.is_some() {
            cfg.network = self.network;
        }
        if let Some(host) = self.host {
            cfg.pg_host = host;
        }
        if let Some(port) = self.port {
            cfg.pg_port = port;
        }
        if let Some(certs_dir) = self.certs_dir {
            cfg.certs_dir = certs_dir;
        }
        if let Some(secs) = self.timeout_secs {
            cfg.timeout = std::time::Duration::from_secs(secs);
        }
        if self.log_dir.is_some() {
            cfg.log_dir = self.log_dir;
        }
        Ok(cfg)
    }
}

/////////////////////////////////////////////////////////////////////////////////////////

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Render { setter } => {
            print!("{}", render(&setter));
            ExitCode::SUCCESS
        }
        Commands::Run(args) => {
            init_logging();
            tracing::info!("{} (v{})", BINARY_NAME, VERSION);

            let config = match args.into_config() {
                Ok(config) => config,
                Err(e) => {
                    tracing::error!(error = %e, source = ?std::error::Error::source(&e), "Bad configuration");
                    return ExitCode::FAILURE;
                }
            };

            let runner = Runner::new(config);

            match run_java(&runner, runner.config().log_dir.as_deref()).await {
                Ok(outcomes) => {
                    for o in &outcomes {
                        tracing::info!(
                            case = %o.name,
                            container = %o.container_name,
                            exit_code = o.exit_code,
                            started_at = %o.started_at,
                            elapsed = ?o.elapsed,
                            "Case passed"
                        );
                    }
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    tracing::error!(error = %e, "Acceptance test failed");
                    ExitCode::FAILURE
                }
            }
        }
    }
}

/////////////////////////////////////////////////////////////////////////////////////////

fn init_logging() {
    use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
    use tracing_log::LogTracer;
    use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Registry};

    // Redirect all standard logging to tracing events
    LogTracer::init().expect("Failed to set LogTracer");

    // Use configuration from RUST_LOG env var if provided
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or(EnvFilter::new(DEFAULT_LOGGING_CONFIG.to_owned()));

    // Bunyan JSON to stderr so `render` output and logs never mix
    let formatting_layer = BunyanFormattingLayer::new(BINARY_NAME.to_owned(), std::io::stderr);
    let subscriber = Registry::default()
        .with(env_filter)
        .with(JsonStorageLayer)
        .with(formatting_layer);

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");
}
