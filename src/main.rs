use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use rover_relay::bridge::{DEFAULT_AUTH_DIR, DEFAULT_RECONNECT_DELAY};
use rover_relay::commands::{DEFAULT_CONFIRM_TIMEOUT, DEFAULT_PORT};
use rover_relay::transport::serial::DEFAULT_BAUD_RATE;
use rover_relay::{
    Bridge, BridgeConfig, CommandConfig, ConsoleConnector, SerialConnector, list_ports,
};

const CONFIRM_TIMEOUT_MS: u64 = DEFAULT_CONFIRM_TIMEOUT.as_secs() * 1000;

/// Relay rover telemetry from a serial port into a chat session.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Port opened by "/conectar" without arguments
    #[arg(long, default_value = DEFAULT_PORT)]
    port: String,

    /// Baud rate used when "/conectar" gives none
    #[arg(short, long, default_value_t = DEFAULT_BAUD_RATE)]
    baud: u32,

    /// Only allow "/conectar" to open these ports (repeatable)
    #[arg(long = "allow-port")]
    allowed_ports: Vec<String>,

    /// Conversation greeted when the chat session opens
    #[arg(long)]
    greet: Option<String>,

    /// Directory for the chat session credentials
    #[arg(long, default_value = DEFAULT_AUTH_DIR)]
    auth_dir: PathBuf,

    /// Seconds to wait before reconnecting a lost chat session
    #[arg(long, default_value_t = DEFAULT_RECONNECT_DELAY.as_secs())]
    reconnect_secs: u64,

    /// Wait for the rover to report a toggle before confirming it
    #[arg(long)]
    confirm_writes: bool,

    /// How long to wait for that report, in milliseconds
    #[arg(long, default_value_t = CONFIRM_TIMEOUT_MS)]
    confirm_timeout_ms: u64,

    /// List available serial ports and exit
    #[arg(long)]
    list_ports: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), rover_relay::Error> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rover_relay=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if cli.list_ports {
        for port in list_ports()? {
            println!("{port}");
        }
        return Ok(());
    }

    let mut commands = CommandConfig::default()
        .default_port(cli.port)
        .default_baud_rate(cli.baud)
        .allowed_ports(cli.allowed_ports);
    if cli.confirm_writes {
        commands = commands.confirm_writes(Duration::from_millis(cli.confirm_timeout_ms));
    }

    let mut config = BridgeConfig::default()
        .commands(commands)
        .reconnect_delay(Duration::from_secs(cli.reconnect_secs))
        .auth_dir(cli.auth_dir);
    if let Some(conversation) = cli.greet {
        config = config.greet(conversation);
    }

    let mut bridge = Bridge::new(config, ConsoleConnector::new(), SerialConnector);
    bridge.run().await
}
