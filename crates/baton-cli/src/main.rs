use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use baton_core::config::{Config, LoggingConfig, ServerConfig, SessionConfig};
use baton_gateway::GatewayState;

#[derive(Parser)]
#[command(
    name = "baton",
    about = "Shared turn-based timer — one controller at a time, everyone sees the clock",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the session server
    Serve {
        /// Port to listen on (default: 8080)
        #[arg(long)]
        port: Option<u16>,

        /// Address to bind (default: 0.0.0.0)
        #[arg(long)]
        bind: Option<String>,

        /// Broadcast interval in milliseconds (default: 100)
        #[arg(long)]
        tick_ms: Option<u64>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Check the configuration for problems
    Validate,
}

/// Install the global tracing subscriber from the logging config.
///
/// `RUST_LOG` wins over the configured level and filters; `--verbose` forces debug.
fn init_logging(logging: Option<&LoggingConfig>, verbose: bool) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => {
            let level = if verbose {
                "debug"
            } else {
                logging.and_then(|l| l.level.as_deref()).unwrap_or("info")
            };
            let mut directives = vec![level.to_string()];
            if let Some(logging) = logging {
                directives.extend(logging.filters.iter().cloned());
            }
            EnvFilter::try_new(directives.join(","))?
        }
    };

    let json = logging.is_some_and(|l| l.format == "json");
    let stdout = logging.is_some_and(|l| l.output == "stdout");
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match (json, stdout) {
        (true, true) => builder.json().with_writer(std::io::stdout).init(),
        (true, false) => builder.json().with_writer(std::io::stderr).init(),
        (false, true) => builder.with_writer(std::io::stdout).init(),
        (false, false) => builder.with_writer(std::io::stderr).init(),
    }
    Ok(())
}

/// Fold command-line overrides into the loaded config.
fn apply_overrides(config: &mut Config, port: Option<u16>, bind: Option<String>, tick_ms: Option<u64>) {
    if port.is_some() || bind.is_some() {
        let server = config.server.get_or_insert_with(|| ServerConfig {
            port: 8080,
            bind: None,
        });
        if let Some(port) = port {
            server.port = port;
        }
        if bind.is_some() {
            server.bind = bind;
        }
    }
    if tick_ms.is_some() {
        config
            .session
            .get_or_insert_with(SessionConfig::default)
            .tick_interval_ms = tick_ms;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load config
    let config_path = cli
        .config
        .map(std::path::PathBuf::from)
        .unwrap_or_else(Config::default_path);

    let mut config = Config::load(&config_path)?;

    init_logging(config.logging.as_ref(), cli.verbose)?;

    match cli.command {
        Commands::Serve {
            port,
            bind,
            tick_ms,
        } => {
            apply_overrides(&mut config, port, bind, tick_ms);

            let (warnings, errors) = config.validate();
            for warning in &warnings {
                tracing::warn!("Config: {warning}");
            }
            if !errors.is_empty() {
                anyhow::bail!("Invalid configuration: {}", errors.join("; "));
            }

            let port = config.port();
            let tick_ms = config.tick_interval().as_millis();
            tracing::info!(
                config = %config_path.display(),
                tick_ms,
                "Starting Baton server on port {port}"
            );
            let state = Arc::new(GatewayState::new(Arc::new(config)));
            baton_gateway::start_gateway(state, port).await?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let json = serde_json::to_string_pretty(&config)?;
                println!("{json}");
            }
            ConfigAction::Validate => {
                let (warnings, errors) = config.validate();
                for warning in &warnings {
                    println!("warning: {warning}");
                }
                for error in &errors {
                    println!("error: {error}");
                }
                if !errors.is_empty() {
                    anyhow::bail!("{} config error(s) in {}", errors.len(), config_path.display());
                }
                println!("Config OK: {}", config_path.display());
            }
        },
    }

    Ok(())
}
