//! mqttd - MQTT broker daemon.
//!
//! Wires `mqtt_session::Session` to a `TcpListener` and to the reference
//! collaborator implementations in `mqtt_broker`.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::{fmt, EnvFilter};

use mqtt_broker::{AllowAll, AllowAnonymous, ClientRegistry, GuidGenerator, LoggingHooks, StaticCredentials};
use mqttd::credentials;
use mqttd::server::{self, Broker};
use mqttd::Config;

#[derive(Parser, Debug)]
#[command(name = "mqttd")]
#[command(about = "MQTT 3.1/3.1.1 broker daemon")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to the TOML configuration file.
    #[arg(short = 'c', long, default_value = "/etc/mqttd/config.toml")]
    config: PathBuf,

    /// Override the configured listen address (e.g. 0.0.0.0:1883).
    #[arg(short = 'l', long)]
    listen: Option<String>,

    /// Force debug-level logging regardless of configuration.
    #[arg(short = 'v', long)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage entries in a password file consumed by `auth.password_file`.
    Passwd {
        #[arg(short = 'f', long)]
        file: String,

        #[arg(short = 'u', long)]
        username: String,

        /// Delete the user instead of adding/updating it.
        #[arg(short = 'd', long)]
        delete: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(Commands::Passwd { file, username, delete }) = cli.command {
        if delete {
            credentials::delete_user(&file, &username)?;
        } else {
            credentials::add_or_update_user(&file, &username)?;
        }
        return Ok(());
    }

    let config = if cli.config.exists() {
        Config::from_file(&cli.config)?
    } else if cli.config == PathBuf::from("/etc/mqttd/config.toml") {
        Config::default()
    } else {
        eprintln!("config file not found: {}", cli.config.display());
        std::process::exit(1);
    };

    let log_level = if cli.verbose { "debug" } else { &config.logging.level };
    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let listen_addr = cli
        .listen
        .unwrap_or_else(|| format!("{}:{}", config.server.host, config.server.port));

    let listener = TcpListener::bind(&listen_addr).await?;
    tracing::info!(%listen_addr, "mqttd listening");

    let auth: Arc<dyn mqtt_broker::AuthBackend> = if config.auth.require_auth {
        let Some(password_file) = config.auth.password_file.as_deref() else {
            eprintln!("auth.require_auth is set but auth.password_file is not configured");
            std::process::exit(1);
        };
        let entries = credentials::load_password_file(password_file)?;
        tracing::info!(count = entries.len(), "loaded credentials from password file");
        Arc::new(StaticCredentials::new(entries))
    } else {
        Arc::new(AllowAnonymous)
    };

    let broker = Arc::new(Broker {
        router: Arc::new(mqtt_broker::MemoryRouter::new()),
        acl: Arc::new(AllowAll),
        auth,
        registry: Arc::new(ClientRegistry::new()),
        hooks: Arc::new(LoggingHooks),
        client_ids: Arc::new(GuidGenerator::new()),
    });

    let session_config = (&config.session).into();

    server::run(listener, broker, session_config, wait_for_ctrl_c()).await;

    tracing::info!("mqttd stopped");
    Ok(())
}

async fn wait_for_ctrl_c() {
    let _ = signal::ctrl_c().await;
}
