//! WebSocket feed connection with bounded reconnection.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use futures::StreamExt;
use log::{debug, error, info, warn};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::events::StoreEvent;

/// Reconnection budget: consecutive failed connection attempts before the
/// feed gives up until the next `connect` call.
const RECONNECT_ATTEMPTS: u32 = 5;
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Events buffered per subscriber before the oldest are dropped.
const EVENT_BUFFER: usize = 64;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed is already connected")]
    AlreadyConnected,
}

/// Owns the feed connection.
///
/// Constructed by the composition root and passed to whoever needs events;
/// `connect` starts a background task that keeps the connection alive within
/// the reconnection budget, `disconnect` tears it down.
pub struct FeedClient {
    url: String,
    sender: broadcast::Sender<StoreEvent>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl FeedClient {
    pub fn new(url: &str) -> Self {
        let (sender, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            url: url.to_string(),
            sender,
            task: Mutex::new(None),
        }
    }

    /// Subscribe to decoded feed events. Works before or after `connect`;
    /// slow subscribers lose the oldest buffered events, never the connection.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.sender.subscribe()
    }

    /// Start the background connection loop.
    pub fn connect(&self) -> Result<(), FeedError> {
        let mut slot = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|task| !task.is_finished()) {
            return Err(FeedError::AlreadyConnected);
        }
        let url = self.url.clone();
        let sender = self.sender.clone();
        *slot = Some(tokio::spawn(run(url, sender)));
        Ok(())
    }

    /// Drop the connection and stop the background task. Idempotent.
    pub fn disconnect(&self) {
        let mut slot = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = slot.take() {
            task.abort();
            info!("feed disconnected");
        }
    }
}

impl Drop for FeedClient {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Connection loop: a successful connection resets the attempt budget, so
/// only consecutive failures count against it.
async fn run(url: String, sender: broadcast::Sender<StoreEvent>) {
    let mut attempts = 0u32;
    while attempts < RECONNECT_ATTEMPTS {
        attempts += 1;
        info!("connecting to feed at {url} (attempt {attempts}/{RECONNECT_ATTEMPTS})");

        match connect_async(url.as_str()).await {
            Ok((stream, _response)) => {
                info!("feed connected");
                attempts = 0;
                run_session(stream, &sender).await;
                warn!("feed session ended, reconnecting");
            }
            Err(err) => {
                error!("feed connection failed: {err}");
            }
        }

        tokio::time::sleep(RECONNECT_DELAY).await;
    }
    error!("feed gave up after {RECONNECT_ATTEMPTS} failed connection attempts");
}

/// Drive a single session: decode text frames and fan them out.
async fn run_session(
    stream: tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >,
    sender: &broadcast::Sender<StoreEvent>,
) {
    let (_sink, mut stream) = stream.split();

    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Text(text)) => dispatch(&text, sender),
            Ok(Message::Ping(_) | Message::Pong(_)) => {
                // Handled automatically by tungstenite.
            }
            Ok(Message::Close(frame)) => {
                info!("feed closed by server: {frame:?}");
                break;
            }
            Ok(_) => {
                // Binary / Frame — ignore.
            }
            Err(err) => {
                error!("feed receive error: {err}");
                break;
            }
        }
    }
}

/// Decode one frame and broadcast it. Unknown or malformed events are logged
/// and skipped; they never tear the connection down.
fn dispatch(text: &str, sender: &broadcast::Sender<StoreEvent>) {
    match serde_json::from_str::<StoreEvent>(text) {
        Ok(event) => {
            debug!("feed event: {event:?}");
            // A send error only means nobody is subscribed right now.
            let _ = sender.send(event);
        }
        Err(err) => {
            warn!("unknown or malformed feed event, skipping: {err} ({text})");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_fans_out_to_subscribers() {
        let (sender, mut receiver) = broadcast::channel(8);
        dispatch(
            r#"{"event":"stock-update","data":{"productId":3,"stock":1}}"#,
            &sender,
        );
        match receiver.try_recv().unwrap() {
            StoreEvent::StockUpdate(update) => assert_eq!(update.product_id, 3),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn dispatch_skips_malformed_frames() {
        let (sender, mut receiver) = broadcast::channel(8);
        dispatch("not json", &sender);
        dispatch(r#"{"event":"mystery","data":{}}"#, &sender);
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn dispatch_without_subscribers_is_harmless() {
        let (sender, _) = broadcast::channel(8);
        dispatch(
            r#"{"event":"delete-product","data":{"id":1}}"#,
            &sender,
        );
    }

    #[tokio::test]
    async fn connect_twice_is_rejected_while_running() {
        let client = FeedClient::new("ws://127.0.0.1:9");
        client.connect().unwrap();
        assert!(matches!(client.connect(), Err(FeedError::AlreadyConnected)));
        client.disconnect();
        // After disconnect the slot is free again.
        client.connect().unwrap();
        client.disconnect();
    }
}
