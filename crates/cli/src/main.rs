use std::path::{Path, PathBuf};

use {
    anyhow::Context,
    clap::{Parser, Subcommand},
    food_dispatch_config::DispatchConfig,
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(
    name = "food-dispatch",
    about = "Food Dispatch: session-aware API gateway"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Only look for config files in this directory.
    #[arg(long, global = true, env = "FOOD_DISPATCH_CONFIG_DIR")]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway server.
    Gateway {
        #[arg(long, env = "FOOD_DISPATCH_BIND")]
        bind: Option<String>,
        #[arg(long, env = "FOOD_DISPATCH_PORT")]
        port: Option<u16>,
        /// Config file to load instead of discovering one.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the resolved configuration.
    Show {
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the config file path discovery would use.
    Path,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

/// File (explicit or discovered), then environment overrides.
fn resolve_config(explicit: Option<&Path>) -> anyhow::Result<DispatchConfig> {
    let mut config = match explicit {
        Some(path) => food_dispatch_config::load_config(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => food_dispatch_config::discover_and_load(),
    };
    food_dispatch_config::apply_env_overrides(&mut config);
    Ok(config)
}

fn apply_flags(config: &mut DispatchConfig, bind: Option<String>, port: Option<u16>) {
    if let Some(bind) = bind {
        config.gateway.bind = bind;
    }
    if let Some(port) = port {
        config.gateway.port = port;
    }
}

fn show_config(config: &DispatchConfig) -> anyhow::Result<String> {
    let mut out = toml::to_string_pretty(config)?;
    out.push_str(&format!("\n# backend base url: {}\n", config.backend.base_url()?));
    Ok(out)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    if let Some(dir) = cli.config_dir.clone() {
        food_dispatch_config::set_config_dir(dir);
    }

    info!(version = env!("CARGO_PKG_VERSION"), "food-dispatch starting");

    match cli.command {
        Commands::Gateway { bind, port, config } => {
            let mut resolved = resolve_config(config.as_deref())?;
            apply_flags(&mut resolved, bind, port);
            food_dispatch_gateway::start_gateway(resolved).await
        },
        Commands::Config { action } => match action {
            ConfigAction::Show { config } => {
                let resolved = resolve_config(config.as_deref())?;
                print!("{}", show_config(&resolved)?);
                Ok(())
            },
            ConfigAction::Path => {
                println!(
                    "{}",
                    food_dispatch_config::find_or_default_config_path().display()
                );
                Ok(())
            },
        },
    }
}
