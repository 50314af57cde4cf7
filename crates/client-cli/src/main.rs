use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod app;
mod config;
mod dashboard;
mod device;
mod otp;
mod registration;
mod report;
mod screens;
mod session;
mod validation;

#[derive(Parser)]
#[command(name = "primefield")]
#[command(about = "Field-service staff client: attendance, registration and service reports")]
#[command(version)]
struct Cli {
    /// Backend base URL (overrides config)
    #[arg(long, global = true)]
    server: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Register as a new staff member
    Register,
    /// Fill in a service report without logging in
    Report,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Set a configuration value
    Set {
        /// Configuration key, e.g. backend.base_url
        key: String,
        /// Configuration value
        value: String,
    },
    /// Get a configuration value
    Get {
        /// Configuration key
        key: String,
    },
    /// Show all configuration
    Show,
    /// Get the config file path
    Path,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Logs go to stderr so the screens on stdout stay readable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "primefield=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let start = match cli.command {
        Some(Commands::Config { action }) => return handle_config_command(action),
        Some(Commands::Report) => {
            let mut console = screens::Console::stdin();
            return match screens::report::show(&mut console).await {
                Err(e) if e.is::<screens::InputClosed>() => Ok(()),
                other => other,
            };
        }
        Some(Commands::Register) => screens::Start::Register,
        None => screens::Start::Login,
    };

    let mut config = config::Config::load()?;
    if let Some(server) = cli.server {
        config.backend.base_url = server;
    }
    tracing::info!("Using backend {}", config.backend.base_url);

    let app = app::App::new(config)?;
    screens::run(app, start).await
}

fn handle_config_command(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Set { key, value } => {
            let mut config = config::Config::load().unwrap_or_default();
            config.set(&key, value)?;
            config.save()?;
            println!("Configuration saved");
        }
        ConfigAction::Get { key } => {
            let config = config::Config::load()?;
            println!("{}", config.get(&key)?);
        }
        ConfigAction::Show => {
            let config = config::Config::load()?;
            for key in config::Config::KEYS {
                println!("{}: {}", key, config.get(key)?);
            }
        }
        ConfigAction::Path => {
            let path = config::Config::config_path()?;
            println!("{}", path.display());
        }
    }
    Ok(())
}
