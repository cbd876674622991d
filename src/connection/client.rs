//! WebSocket client task for a pilight daemon.

use super::{ConnectionEvent, ConnectionState, Driver};
use crate::error::Result;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use std::time::Duration;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Run the connection loop until cancelled, reconnecting after failures.
pub(super) async fn run(mut driver: Driver, cancel: CancellationToken) {
    loop {
        driver.set_state(ConnectionState::Connecting);

        let result = tokio::select! {
            _ = cancel.cancelled() => break,
            result = session(&mut driver) => result,
        };

        driver.set_state(ConnectionState::Disconnected);
        let dropped = discard_outbound(&mut driver);
        if dropped > 0 {
            warn!(
                "[ws] Dropped {} unsent frame(s) for {}",
                dropped,
                driver.address()
            );
        }

        let message = match result {
            Ok(()) => "connection closed by pilight".to_string(),
            Err(e) => e.to_string(),
        };
        error!("[ws] {}: {}", driver.address(), message);
        driver.emit(ConnectionEvent::Error(message));

        // Wait before reconnecting
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(RECONNECT_DELAY) => {}
        }
        info!("[ws] Reconnecting to {}", driver.address());
    }

    driver.set_state(ConnectionState::Disconnected);
    info!("[ws] Connection to {} stopped", driver.address());
}

/// One connected session. Returns `Ok(())` when the peer closes the socket.
async fn session(driver: &mut Driver) -> Result<()> {
    let (ws_stream, _) = connect_async(driver.address()).await?;
    info!("[ws] Connected to {}", driver.address());

    let (mut write, mut read) = ws_stream.split();
    driver.set_state(ConnectionState::Connected);
    driver.emit(ConnectionEvent::Ready);

    loop {
        tokio::select! {
            frame = driver.outbound.recv() => {
                let Some(frame) = frame else {
                    return Ok(());
                };
                let text = frame.to_json()?;
                debug!("[ws] -> {}", text);
                write.send(Message::Text(text.into())).await?;
            }
            message = read.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    let text_str: &str = &text;
                    debug!("[ws] <- {}", text_str);
                    driver.emit(decode(text_str));
                }
                Some(Ok(Message::Close(_))) | None => return Ok(()),
                Some(Ok(Message::Binary(data))) => {
                    warn!("[ws] Ignoring {} byte binary frame", data.len());
                }
                // Pings are answered by tungstenite
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
            },
        }
    }
}

/// Drop frames queued for a session that has ended.
fn discard_outbound(driver: &mut Driver) -> usize {
    std::iter::from_fn(|| driver.try_next_outbound()).count()
}

fn decode(text: &str) -> ConnectionEvent {
    match serde_json::from_str(text) {
        Ok(value) => ConnectionEvent::Frame(value),
        Err(e) => ConnectionEvent::FrameError(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Connection;
    use crate::protocol::command;
    use serde_json::json;

    #[test]
    fn test_decode_json() {
        assert_eq!(
            decode(r#"{"devices":["lamp"],"values":{"state":"on"}}"#),
            ConnectionEvent::Frame(json!({"devices": ["lamp"], "values": {"state": "on"}}))
        );
    }

    #[test]
    fn test_decode_garbage() {
        assert!(matches!(
            decode("{\"devices\":"),
            ConnectionEvent::FrameError(_)
        ));
    }

    #[test]
    fn test_discard_outbound_after_session() {
        let connection = Connection::new("ws://localhost:5001/");
        let mut driver = connection.take_driver().unwrap();
        driver.set_state(ConnectionState::Connected);
        connection.send(command::set_power("lamp", true)).unwrap();
        connection.send(command::request_values()).unwrap();

        driver.set_state(ConnectionState::Disconnected);
        assert_eq!(discard_outbound(&mut driver), 2);
        assert_eq!(driver.try_next_outbound(), None);
        assert_eq!(discard_outbound(&mut driver), 0);
    }
}
