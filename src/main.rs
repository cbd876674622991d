use clap::Parser;
use log::{error, info, warn};
use pilight_bridge::accessory::{CharacteristicEvent, PilightAccessory};
use pilight_bridge::config::{self, BridgeConfig};
use pilight_bridge::connection::ConnectionPool;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::broadcast;

#[derive(Parser)]
#[command(name = "pilight-bridge")]
#[command(about = "Expose pilight devices as smart accessories")]
struct Cli {
    /// Path to the JSON config file (defaults to <config dir>/pilight-bridge/config.json)
    #[arg(long, env = "PILIGHT_BRIDGE_CONFIG")]
    config: Option<PathBuf>,
}

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

fn load_config(cli: &Cli) -> pilight_bridge::error::Result<BridgeConfig> {
    if let Some(path) = &cli.config {
        info!("Loading configuration from {}", path.display());
        return BridgeConfig::load(path);
    }

    match BridgeConfig::default_path() {
        Some(path) if path.exists() => {
            info!("Loading configuration from {}", path.display());
            BridgeConfig::load(&path)
        }
        _ => {
            info!("No config file found, using PILIGHT_* environment");
            Ok(BridgeConfig::from_env())
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env before the runtime starts its worker threads
    config::load_dotenv();
    init_logger();

    let cli = Cli::parse();
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run(cli))
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting pilight bridge");

    let bridge_config = load_config(&cli)?;
    let pool = ConnectionPool::new();
    let (host_tx, mut host_rx) = broadcast::channel::<CharacteristicEvent>(64);

    let mut tasks = Vec::new();
    for device_config in bridge_config.device_configs() {
        info!(
            "Accessory \"{}\": {} device \"{}\" at {}",
            device_config.name,
            device_config.device_type,
            device_config.device_id,
            device_config.address()
        );

        let connection = pool.connection(&device_config.address(), device_config.shared_ws);
        let accessory = Arc::new(PilightAccessory::new(device_config, connection));
        accessory.set_notifier(host_tx.clone());

        for service in accessory.services() {
            info!(
                "  - {} \"{}\" ({} characteristics)",
                service.kind(),
                service.display_name(),
                service.characteristics().len()
            );
        }

        tasks.push(accessory.start());
    }

    // Log what a host would receive
    let host_task = tokio::spawn(async move {
        loop {
            match host_rx.recv().await {
                Ok(event) => {
                    info!("[host] {} {} = {}", event.accessory, event.kind, event.value);
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!("[host] Missed {} characteristic events", missed);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    info!("pilight bridge is running, press Ctrl+C to exit");

    match signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal"),
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }

    pool.shutdown();
    for task in tasks {
        task.abort();
    }
    host_task.abort();

    info!("pilight bridge stopped");
    Ok(())
}
