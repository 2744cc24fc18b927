//! TCP gauge server
//!
//! One accept task, one data task pushing subscribed vars every tick, and a
//! reader plus a writer task per client. Writers are fed through a bounded
//! queue so a slow client never stalls the data task; a client whose queue
//! is full misses that tick.

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::{DataSource, SourceManager};
use crate::protocol::{decode_line, encode_line, InitPayload, ProtocolMessage, VarDef, VarPayload};
use crate::var::VarKey;

/// Messages queued per client before ticks are dropped
pub const CLIENT_QUEUE_CAPACITY: usize = 256;

/// A connected client
struct ClientSlot {
    peer: SocketAddr,
    tx: mpsc::Sender<ProtocolMessage>,
    /// Vars to push, set once the client's `init` was accepted
    vars: Vec<VarDef>,
    events: Vec<String>,
    initialized: bool,
}

/// State shared by all server tasks and handles
struct Shared {
    manager: Mutex<SourceManager>,
    clients: RwLock<HashMap<Uuid, ClientSlot>>,
}

impl Shared {
    fn vehicle_name(&self) -> Option<String> {
        self.manager
            .lock()
            .ok()
            .and_then(|manager| manager.vehicle_name())
    }

    /// Queue a message for one client. Drops the client when its writer is
    /// gone.
    fn send_to(&self, id: Uuid, message: ProtocolMessage) {
        let tx = match self.clients.read() {
            Ok(clients) => match clients.get(&id) {
                Some(slot) => slot.tx.clone(),
                None => return,
            },
            Err(_) => return,
        };

        self.queue(id, &tx, message);
    }

    fn queue(&self, id: Uuid, tx: &mpsc::Sender<ProtocolMessage>, message: ProtocolMessage) {
        match tx.try_send(message) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::debug!("Client {} queue full, dropping message", id);
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.remove_client(id);
            }
        }
    }

    /// Tell every client to initialize again
    fn broadcast_reinit(&self, vehicle: Option<String>) {
        tracing::info!("New vehicle {:?}, informing clients...", vehicle);

        let targets: Vec<(Uuid, mpsc::Sender<ProtocolMessage>)> = match self.clients.write() {
            Ok(mut clients) => clients
                .iter_mut()
                .map(|(id, slot)| {
                    // Stop pushing vars for the old vehicle until the client re-inits
                    slot.initialized = false;
                    (*id, slot.tx.clone())
                })
                .collect(),
            Err(_) => return,
        };

        for (id, tx) in targets {
            self.queue(id, &tx, ProtocolMessage::ReInit(InitPayload::vehicle(vehicle.clone())));
        }
    }

    fn handle_init(&self, id: Uuid, payload: InitPayload) {
        let current = self.vehicle_name();

        if payload.vehicle_name != current {
            tracing::info!(
                "Client {} has vehicle {:?} but it is currently {:?}, telling them to re-init",
                id,
                payload.vehicle_name,
                current
            );
            if let Ok(mut clients) = self.clients.write() {
                if let Some(slot) = clients.get_mut(&id) {
                    slot.initialized = false;
                    slot.vars.clear();
                }
            }
            self.send_to(id, ProtocolMessage::ReInit(InitPayload::vehicle(current)));
            return;
        }

        self.send_to(id, ProtocolMessage::Init(InitPayload::vehicle(current)));

        tracing::info!("Client {} subscribing to {} vars", id, payload.vars.len());
        if let Ok(mut clients) = self.clients.write() {
            if let Some(slot) = clients.get_mut(&id) {
                slot.vars = payload.vars;
                slot.events = payload.events;
                slot.initialized = true;
            }
        }
    }

    /// Push one tick of var values to every initialized client
    fn push_vars(&self) {
        let targets: Vec<(Uuid, mpsc::Sender<ProtocolMessage>, Vec<VarDef>)> =
            match self.clients.read() {
                Ok(clients) => clients
                    .iter()
                    .filter(|(_, slot)| slot.initialized && !slot.vars.is_empty())
                    .map(|(id, slot)| (*id, slot.tx.clone(), slot.vars.clone()))
                    .collect(),
                Err(_) => return,
            };

        if targets.is_empty() {
            return;
        }

        let mut values: HashMap<VarKey, Option<f64>> = HashMap::new();

        for (id, tx, vars) in targets {
            for var in vars {
                let key = var.key();
                let value = match values.get(&key) {
                    Some(value) => *value,
                    None => {
                        let value = match self.manager.lock() {
                            Ok(mut manager) => manager.value(&key),
                            Err(_) => None,
                        };
                        values.insert(key.clone(), value);
                        value
                    }
                };

                if var.is_debug() {
                    tracing::debug!("Var {} => {:?}", key, value);
                }

                self.queue(id, &tx, ProtocolMessage::Var(VarPayload::new(&key, value)));
            }
        }
    }

    fn remove_client(&self, id: Uuid) {
        let removed = self
            .clients
            .write()
            .ok()
            .and_then(|mut clients| clients.remove(&id));

        if let Some(slot) = removed {
            tracing::info!(
                "Client {} ({}) disconnected, dropped {} var and {} event subscriptions",
                id,
                slot.peer,
                slot.vars.len(),
                slot.events.len()
            );
        }
    }
}

/// Streams data source values to gauge clients
pub struct GaugeServer {
    listener: TcpListener,
    shared: Arc<Shared>,
    rate: Duration,
    cancel: CancellationToken,
}

impl GaugeServer {
    /// Bind the listening socket.
    ///
    /// `rate` is the interval between var pushes (and data source steps).
    pub async fn bind(
        addr: impl ToSocketAddrs,
        source: Box<dyn DataSource>,
        rate: Duration,
    ) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(
            "Server listening on {} with data source '{}'",
            listener.local_addr()?,
            source.name()
        );

        Ok(Self {
            listener,
            shared: Arc::new(Shared {
                manager: Mutex::new(SourceManager::new(source)),
                clients: RwLock::new(HashMap::new()),
            }),
            rate: rate.max(Duration::from_millis(1)),
            cancel: CancellationToken::new(),
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Control handle, usable while [`run`](Self::run) is executing
    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            shared: Arc::clone(&self.shared),
            cancel: self.cancel.clone(),
        }
    }

    /// Accept clients and push data until shut down
    pub async fn run(self) -> io::Result<()> {
        let data_task = tokio::spawn(data_loop(
            Arc::clone(&self.shared),
            self.rate,
            self.cancel.clone(),
        ));

        let result = loop {
            let accepted = tokio::select! {
                _ = self.cancel.cancelled() => break Ok(()),
                accepted = self.listener.accept() => accepted,
            };

            match accepted {
                Ok((stream, peer)) => {
                    spawn_client(Arc::clone(&self.shared), stream, peer, &self.cancel);
                }
                Err(e) => {
                    tracing::warn!("Accept failed: {}", e);
                }
            }
        };

        self.cancel.cancel();
        if let Err(e) = data_task.await {
            tracing::warn!("Data task ended abnormally: {}", e);
        }

        if let Ok(mut clients) = self.shared.clients.write() {
            clients.clear();
        }
        tracing::info!("Server stopped");
        result
    }
}

/// Cloneable control surface of a running [`GaugeServer`]
#[derive(Clone)]
pub struct ServerHandle {
    shared: Arc<Shared>,
    cancel: CancellationToken,
}

impl ServerHandle {
    /// Stop accepting, close all clients and end [`GaugeServer::run`]
    pub fn shutdown(&self) {
        tracing::info!("Shutting down...");
        self.cancel.cancel();
    }

    /// Check if shutdown was requested
    pub fn is_shutdown(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Force a var to a fixed value
    pub fn force_var(&self, key: &VarKey, value: f64) {
        if let Ok(mut manager) = self.shared.manager.lock() {
            manager.force_var(key, value);
        }
    }

    /// Stop forcing a var
    pub fn clear_forced_var(&self, key: &VarKey) {
        if let Ok(mut manager) = self.shared.manager.lock() {
            manager.clear_forced_var(key);
        }
    }

    /// Force the vehicle name, telling clients to re-init if it changed
    pub fn force_vehicle(&self, name: impl Into<String>) {
        let changed = match self.shared.manager.lock() {
            Ok(mut manager) => manager.force_vehicle(name),
            Err(_) => None,
        };
        if let Some(vehicle) = changed {
            self.shared.broadcast_reinit(vehicle);
        }
    }

    /// Go back to the data source's vehicle name
    pub fn clear_forced_vehicle(&self) {
        let changed = match self.shared.manager.lock() {
            Ok(mut manager) => manager.clear_forced_vehicle(),
            Err(_) => None,
        };
        if let Some(vehicle) = changed {
            self.shared.broadcast_reinit(vehicle);
        }
    }

    /// Log the next values of a var
    pub fn watch(&self, name: &str, unit: Option<&str>) {
        if let Ok(mut manager) = self.shared.manager.lock() {
            manager.watch(name, unit);
        }
    }

    /// Current effective vehicle
    pub fn vehicle_name(&self) -> Option<String> {
        self.shared.vehicle_name()
    }

    /// Number of connected clients
    pub fn client_count(&self) -> usize {
        self.shared
            .clients
            .read()
            .map(|clients| clients.len())
            .unwrap_or(0)
    }

    /// Number of clients whose `init` was accepted
    pub fn initialized_count(&self) -> usize {
        self.shared
            .clients
            .read()
            .map(|clients| clients.values().filter(|c| c.initialized).count())
            .unwrap_or(0)
    }
}

async fn data_loop(shared: Arc<Shared>, rate: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(rate);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last = Instant::now();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {}
        }

        let now = Instant::now();
        let dt = now.saturating_duration_since(last);
        last = now;

        let changed = match shared.manager.lock() {
            Ok(mut manager) => manager.step(dt),
            Err(_) => None,
        };
        if let Some(vehicle) = changed {
            shared.broadcast_reinit(vehicle);
        }

        shared.push_vars();
    }
}

fn spawn_client(shared: Arc<Shared>, stream: TcpStream, peer: SocketAddr, cancel: &CancellationToken) {
    let id = Uuid::new_v4();
    let (tx, rx) = mpsc::channel(CLIENT_QUEUE_CAPACITY);

    if let Err(e) = stream.set_nodelay(true) {
        tracing::debug!("Could not set TCP_NODELAY for {}: {}", peer, e);
    }

    if let Ok(mut clients) = shared.clients.write() {
        clients.insert(
            id,
            ClientSlot {
                peer,
                tx,
                vars: Vec::new(),
                events: Vec::new(),
                initialized: false,
            },
        );
    }
    tracing::info!("Client {} ({}) connected", id, peer);

    let (read_half, write_half) = stream.into_split();
    let client_cancel = cancel.child_token();

    tokio::spawn(write_loop(
        Arc::clone(&shared),
        id,
        write_half,
        rx,
        client_cancel.clone(),
    ));
    tokio::spawn(read_loop(shared, id, read_half, client_cancel));
}

async fn write_loop(
    shared: Arc<Shared>,
    id: Uuid,
    mut stream: OwnedWriteHalf,
    mut rx: mpsc::Receiver<ProtocolMessage>,
    cancel: CancellationToken,
) {
    loop {
        let message = tokio::select! {
            _ = cancel.cancelled() => break,
            message = rx.recv() => match message {
                Some(message) => message,
                None => break,
            },
        };

        let line = match encode_line(&message) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!("Failed to encode message for client {}: {}", id, e);
                continue;
            }
        };

        if let Err(e) = stream.write_all(line.as_bytes()).await {
            tracing::debug!("Write to client {} failed: {}", id, e);
            break;
        }
    }

    cancel.cancel();
    shared.remove_client(id);
    let _ = stream.shutdown().await;
}

async fn read_loop(shared: Arc<Shared>, id: Uuid, stream: OwnedReadHalf, cancel: CancellationToken) {
    let mut lines = BufReader::new(stream).lines();

    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => break,
            line = lines.next_line() => line,
        };

        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::debug!("Read from client {} failed: {}", id, e);
                break;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        match decode_line(&line) {
            Ok(ProtocolMessage::Init(payload)) => {
                tracing::debug!("Client {} wants to initialize: {:?}", id, payload);
                shared.handle_init(id, payload);
            }
            Ok(other) => {
                tracing::debug!("Ignoring {:?} message from client {}", other.message_type(), id);
            }
            Err(e) => {
                tracing::warn!("Skipping malformed line from client {}: {}", id, e);
            }
        }
    }

    cancel.cancel();
    shared.remove_client(id);
}
