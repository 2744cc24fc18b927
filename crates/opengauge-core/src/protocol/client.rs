//! Reconnecting stream client
//!
//! Handles the connection lifecycle: connect, read lines until the stream
//! ends, wait the reconnect delay, connect again. Runs until
//! [`StreamClient::disconnect`] is called or the client is dropped.

use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{decode_line, encode_line, ProtocolError, ProtocolMessage, EVENT_CHANNEL_CAPACITY};
use crate::config::DEFAULT_RECONNECT_DELAY_MS;
use crate::live::LiveValueStore;

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectionState {
    /// Not connected
    #[default]
    Disconnected,
    /// Opening the TCP stream
    Connecting,
    /// Connected and reading
    Connected,
}

/// Lifecycle and message notifications
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// A stream was opened. Sent before any message from that stream, so
    /// this is the moment to send `Init`.
    Connected,
    /// The stream ended or could not be opened. `reason` is `None` when the
    /// client was shut down locally.
    Disconnected {
        /// Why the connection ended
        reason: Option<String>,
    },
    /// A decoded message
    Message(ProtocolMessage),
}

/// Background task bookkeeping
struct Worker {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// State shared with the background task
struct Shared {
    store: Option<Arc<LiveValueStore>>,
    events: broadcast::Sender<ClientEvent>,
    state: RwLock<ConnectionState>,
    last_failure: RwLock<Option<String>>,
    writer: tokio::sync::Mutex<Option<OwnedWriteHalf>>,
    reconnect_delay: Duration,
}

impl Shared {
    fn set_state(&self, state: ConnectionState) {
        if let Ok(mut current) = self.state.write() {
            *current = state;
        }
    }

    fn set_failure(&self, reason: Option<String>) {
        if let Ok(mut failure) = self.last_failure.write() {
            *failure = reason;
        }
    }

    fn emit(&self, event: ClientEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

/// TCP client for the gauge stream
pub struct StreamClient {
    shared: Arc<Shared>,
    worker: Mutex<Option<Worker>>,
}

impl StreamClient {
    /// Create a client.
    ///
    /// When a store is attached, every received `var` message with a value
    /// is ingested into it before the message event is published.
    pub fn new(store: Option<Arc<LiveValueStore>>, reconnect_delay: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            shared: Arc::new(Shared {
                store,
                events,
                state: RwLock::new(ConnectionState::Disconnected),
                last_failure: RwLock::new(None),
                writer: tokio::sync::Mutex::new(None),
                reconnect_delay,
            }),
            worker: Mutex::new(None),
        }
    }

    /// Receive lifecycle and message events. Drop the receiver to
    /// unsubscribe.
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.shared.events.subscribe()
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        self.shared
            .state
            .read()
            .map(|state| *state)
            .unwrap_or_default()
    }

    /// Check if a stream is currently open
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Reason of the most recent failed connect or lost stream
    pub fn last_failure(&self) -> Option<String> {
        self.shared.last_failure.read().ok().and_then(|f| f.clone())
    }

    /// The attached store, if any
    pub fn store(&self) -> Option<&Arc<LiveValueStore>> {
        self.shared.store.as_ref()
    }

    /// Start connecting to `host:port` in the background.
    ///
    /// Must be called within a tokio runtime. Calling it again while the
    /// background task is alive does nothing.
    pub fn connect(&self, host: impl Into<String>, port: u16) {
        let mut worker = match self.worker.lock() {
            Ok(worker) => worker,
            Err(_) => return,
        };

        if let Some(existing) = worker.as_ref() {
            if !existing.handle.is_finished() {
                tracing::debug!("Stream client already running");
                return;
            }
        }

        let host = host.into();
        let cancel = CancellationToken::new();
        let shared = Arc::clone(&self.shared);
        let task_cancel = cancel.clone();

        tracing::info!("Connecting to {}:{}", host, port);
        let handle = tokio::spawn(async move {
            run(shared, host, port, task_cancel).await;
        });

        *worker = Some(Worker { cancel, handle });
    }

    /// Send one message.
    ///
    /// Sending while not connected is a silent no-op.
    pub async fn send(&self, message: &ProtocolMessage) -> Result<(), ProtocolError> {
        match self.try_send(message).await {
            Err(ProtocolError::NotConnected) => {
                tracing::debug!("Not connected, dropping {:?} message", message.message_type());
                Ok(())
            }
            other => other,
        }
    }

    /// Send one message, failing with [`ProtocolError::NotConnected`] when
    /// no stream is open
    pub async fn try_send(&self, message: &ProtocolMessage) -> Result<(), ProtocolError> {
        let line = encode_line(message)?;

        let mut writer = self.shared.writer.lock().await;
        let stream = writer.as_mut().ok_or(ProtocolError::NotConnected)?;

        if let Err(e) = stream.write_all(line.as_bytes()).await {
            tracing::warn!("Send failed: {}", e);
            // The read loop notices the broken stream and reconnects
            *writer = None;
            self.shared.set_state(ConnectionState::Disconnected);
            return Err(e.into());
        }

        Ok(())
    }

    /// Stop the background task and close the stream.
    ///
    /// Interrupts both a blocked read and a pending reconnect delay.
    pub async fn disconnect(&self) {
        let worker = match self.worker.lock() {
            Ok(mut worker) => worker.take(),
            Err(_) => None,
        };

        if let Some(worker) = worker {
            worker.cancel.cancel();
            if let Err(e) = worker.handle.await {
                tracing::warn!("Stream task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for StreamClient {
    fn drop(&mut self) {
        if let Ok(mut worker) = self.worker.lock() {
            if let Some(worker) = worker.take() {
                worker.cancel.cancel();
            }
        }
    }
}

impl Default for StreamClient {
    fn default() -> Self {
        Self::new(None, Duration::from_millis(DEFAULT_RECONNECT_DELAY_MS))
    }
}

/// Why a read loop ended
enum ReadEnd {
    Cancelled,
    Lost(String),
}

async fn run(shared: Arc<Shared>, host: String, port: u16, cancel: CancellationToken) {
    loop {
        shared.set_state(ConnectionState::Connecting);

        let attempt = tokio::select! {
            _ = cancel.cancelled() => break,
            attempt = open(&host, port) => attempt,
        };

        match attempt {
            Ok(stream) => {
                if let Err(e) = stream.set_nodelay(true) {
                    tracing::debug!("Could not set TCP_NODELAY: {}", e);
                }

                let (read_half, write_half) = stream.into_split();
                *shared.writer.lock().await = Some(write_half);
                shared.set_state(ConnectionState::Connected);
                shared.set_failure(None);

                tracing::info!("Connected to {}:{}", host, port);
                shared.emit(ClientEvent::Connected);

                let end = read_loop(&shared, read_half, &cancel).await;
                *shared.writer.lock().await = None;

                match end {
                    ReadEnd::Cancelled => {
                        shared.set_state(ConnectionState::Disconnected);
                        shared.emit(ClientEvent::Disconnected { reason: None });
                        break;
                    }
                    ReadEnd::Lost(reason) => {
                        tracing::warn!("Disconnected from {}:{}: {}", host, port, reason);
                        shared.set_state(ConnectionState::Disconnected);
                        shared.set_failure(Some(reason.clone()));
                        shared.emit(ClientEvent::Disconnected {
                            reason: Some(reason),
                        });
                    }
                }
            }
            Err(e) => {
                let reason = e.to_string();
                tracing::warn!("{}", reason);
                shared.set_state(ConnectionState::Disconnected);
                shared.set_failure(Some(reason.clone()));
                shared.emit(ClientEvent::Disconnected {
                    reason: Some(reason),
                });
            }
        }

        tracing::debug!("Reconnecting in {:?}", shared.reconnect_delay);
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(shared.reconnect_delay) => {}
        }
    }

    shared.set_state(ConnectionState::Disconnected);
    tracing::info!("Stream client stopped");
}

async fn open(host: &str, port: u16) -> Result<TcpStream, ProtocolError> {
    TcpStream::connect((host, port))
        .await
        .map_err(|e| ProtocolError::ConnectionFailed(format!("{}:{}: {}", host, port, e)))
}

async fn read_loop(shared: &Shared, read_half: OwnedReadHalf, cancel: &CancellationToken) -> ReadEnd {
    let mut lines = BufReader::new(read_half).lines();

    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => return ReadEnd::Cancelled,
            line = lines.next_line() => line,
        };

        match line {
            Ok(Some(line)) => handle_line(shared, &line),
            Ok(None) => return ReadEnd::Lost("connection closed by server".to_string()),
            Err(e) => return ReadEnd::Lost(e.to_string()),
        }
    }
}

fn handle_line(shared: &Shared, line: &str) {
    if line.trim().is_empty() {
        return;
    }

    let message = match decode_line(line) {
        Ok(message) => message,
        Err(e) => {
            tracing::warn!("Skipping malformed line: {}", e);
            return;
        }
    };

    if let ProtocolMessage::Var(payload) = &message {
        if let (Some(store), Some(value)) = (&shared.store, payload.value) {
            store.ingest(&payload.key(), value, Instant::now());
        }
    }

    tracing::trace!("Received {:?}", message);
    shared.emit(ClientEvent::Message(message));
}
