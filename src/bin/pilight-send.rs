//! Development tool for talking to a pilight daemon directly.
//!
//! Usage:
//!   cargo run --bin pilight-send -- values
//!   cargo run --bin pilight-send -- on lamp
//!   cargo run --bin pilight-send -- dim lamp 50
//!
//! Sends one frame and prints every frame pilight pushes back during the
//! listen window.

use clap::{Parser, Subcommand};
use futures_util::{SinkExt, StreamExt};
use pilight_bridge::config::{DEFAULT_HOST, DEFAULT_PORT};
use pilight_bridge::protocol::{OutboundFrame, ProtocolFrame, classify, command};
use std::time::Duration;
use tokio_tungstenite::{connect_async, tungstenite::Message};

#[derive(Parser)]
#[command(name = "pilight-send")]
#[command(about = "Send a single command to a pilight daemon")]
struct Cli {
    /// pilight host
    #[arg(long, env = "PILIGHT_HOST", default_value = DEFAULT_HOST)]
    host: String,

    /// pilight WebSocket port
    #[arg(long, env = "PILIGHT_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Seconds to keep printing received frames
    #[arg(long, default_value_t = 2)]
    listen: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Request the current values of all devices
    Values,
    /// Switch a device on
    On { device: String },
    /// Switch a device off
    Off { device: String },
    /// Dim a device to a brightness percentage
    Dim { device: String, brightness: f64 },
}

impl Commands {
    fn frame(&self) -> pilight_bridge::error::Result<Option<OutboundFrame>> {
        Ok(match self {
            Commands::Values => Some(command::request_values()),
            Commands::On { device } => Some(command::set_power(device, true)),
            Commands::Off { device } => Some(command::set_power(device, false)),
            Commands::Dim { device, brightness } => {
                command::set_brightness(device, &serde_json::json!(*brightness))?
            }
        })
    }
}

fn describe(text: &str) -> String {
    match serde_json::from_str(text).map(|raw: serde_json::Value| classify(&raw)) {
        Ok(Ok(ProtocolFrame::ValueSnapshot(groups))) => {
            format!("snapshot with {} device group(s)", groups.len())
        }
        Ok(Ok(ProtocolFrame::Update(group))) => format!("update for {:?}", group.devices),
        Ok(Err(_)) => "other frame".to_string(),
        Err(e) => format!("invalid JSON ({})", e),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let Some(frame) = cli.command.frame()? else {
        println!("Brightness 0 has no dim level, nothing to send");
        return Ok(());
    };

    let address = format!("ws://{}:{}/", cli.host, cli.port);
    println!("Connecting to pilight at {}...", address);

    let (ws_stream, _) = connect_async(&address).await.map_err(|e| {
        eprintln!("Failed to connect to {}", address);
        eprintln!("Make sure pilight-daemon is running with its webserver enabled.");
        e
    })?;
    let (mut write, mut read) = ws_stream.split();

    let msg = frame.to_json()?;
    println!("Sending: {}", msg);
    write.send(Message::Text(msg.into())).await?;

    let listen = tokio::time::timeout(Duration::from_secs(cli.listen), async {
        while let Some(msg) = read.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    let text_str: &str = &text;
                    println!("Received {}: {}", describe(text_str), text_str);
                }
                Ok(Message::Close(_)) => {
                    println!("pilight closed the connection");
                    return;
                }
                Err(e) => {
                    eprintln!("WebSocket error: {}", e);
                    return;
                }
                _ => {}
            }
        }
    })
    .await;

    if listen.is_err() {
        println!("Done listening after {}s", cli.listen);
    }

    Ok(())
}
