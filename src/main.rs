//! Classwatch server - main entry point

use clap::{Parser, Subcommand};
use classwatch::{http_api, ingest, ChannelConfig, Result, ServerConfig, Service};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Classwatch server configuration
#[derive(Parser, Debug)]
#[command(name = "classwatch-server")]
#[command(about = "Classroom attendance, motion and noise monitoring server")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Sensor channel selection
    #[command(subcommand)]
    channel: ChannelCommand,

    /// Port for the HTTP API
    #[arg(long, global = true, default_value_t = 3002, env = "CLASSWATCH_PORT")]
    port: u16,

    /// Path of the local database file
    #[arg(
        long,
        global = true,
        default_value = "./classwatch.db",
        env = "CLASSWATCH_DB"
    )]
    database: String,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum ChannelCommand {
    /// Read sensor lines from a serial-over-TCP bridge
    Tcp {
        /// Bridge address, host:port
        #[arg(long, env = "CLASSWATCH_CHANNEL_ADDR")]
        addr: String,

        /// Seconds between reconnect attempts
        #[arg(long, default_value_t = 5)]
        reconnect_delay_secs: u64,
    },
    /// Generate synthetic sensor lines (no hardware required)
    Simulate {
        /// Seconds between generated lines
        #[arg(long, default_value_t = 5)]
        interval_secs: u64,
    },
}

impl Cli {
    fn initialize_logging(&self) {
        let filter = if self.debug {
            EnvFilter::new("debug")
        } else {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
        };

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .init();
    }

    fn channel_config(&self) -> ChannelConfig {
        match &self.channel {
            ChannelCommand::Tcp { addr, .. } => ChannelConfig::Tcp { addr: addr.clone() },
            ChannelCommand::Simulate { interval_secs } => ChannelConfig::Simulated {
                interval: Duration::from_secs(*interval_secs),
            },
        }
    }

    fn reconnect_delay(&self) -> Duration {
        match &self.channel {
            ChannelCommand::Tcp {
                reconnect_delay_secs,
                ..
            } => Duration::from_secs(*reconnect_delay_secs),
            ChannelCommand::Simulate { .. } => Duration::from_secs(5),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.initialize_logging();

    info!("Starting classwatch server v{}", env!("CARGO_PKG_VERSION"));

    let config = ServerConfig {
        http_port: cli.port,
        database_path: cli.database.clone(),
        reconnect_delay: cli.reconnect_delay(),
        ..Default::default()
    };
    let channel = cli.channel_config();

    let service = Service::new(config).await?;

    let source = ingest::source_for(&channel);
    let supervisor = service.spawn_supervisor(source);

    http_api::serve(service.clone(), cli.port).await?;

    supervisor.abort();
    info!("Server stopped");
    Ok(())
}
