//! WebSocket Voting Server
//!
//! Async WebSocket front end for a single ballot.
//! Handles authentication, commit/reveal routing, read-only queries and a
//! periodic status push so clients need not poll.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, Notify, RwLock};
use tokio::time::interval;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::core::clock::{Clock, Timestamp};
use crate::core::hash::hash_to_hex;
use crate::network::auth::{authenticate, AuthConfig, AuthError};
use crate::network::protocol::{
    parse_participant, AuthRequest, AuthResult, ClientMessage, CommitReceipt, CommitRequest,
    CommitmentInfo, ErrorCode, HashInfo, PhaseInfo, RevealReceipt, RevealRequest, ServerError,
    ServerMessage, VoteEvent,
};
use crate::voting::{BallotConfig, BallotEvent, CommitRevealBallot, ParticipantId, Phase, Tally};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Connections silent for longer than this are dropped.
    pub idle_timeout: Duration,
    /// Period of the status push.
    pub status_interval: Duration,
    /// Phase lengths for the ballot this server starts.
    pub ballot: BallotConfig,
    /// Server version string.
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            max_connections: 1000,
            idle_timeout: Duration::from_secs(300),
            status_interval: Duration::from_secs(5),
            ballot: BallotConfig::default(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `VOTING_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(addr) = env_value("VOTING_BIND_ADDR")? {
            config.bind_addr = addr;
        }
        if let Some(secs) = env_value("VOTING_COMMIT_SECS")? {
            config.ballot.commit_duration = secs;
        }
        if let Some(secs) = env_value("VOTING_REVEAL_SECS")? {
            config.ballot.reveal_duration = secs;
        }
        if let Some(secs) = env_value::<u64>("VOTING_STATUS_INTERVAL_SECS")? {
            if secs == 0 {
                return Err(ConfigError::InvalidValue {
                    name: "VOTING_STATUS_INTERVAL_SECS",
                    value: "0".into(),
                });
            }
            config.status_interval = Duration::from_secs(secs);
        }
        if let Some(max) = env_value("VOTING_MAX_CONNECTIONS")? {
            config.max_connections = max;
        }
        if let Some(secs) = env_value("VOTING_IDLE_TIMEOUT_SECS")? {
            config.idle_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

/// Read and parse an optional environment variable.
fn env_value<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { name, value }),
        _ => Ok(None),
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Variable present but unparseable.
    #[error("invalid value for {name}: {value:?}")]
    InvalidValue {
        /// Variable name.
        name: &'static str,
        /// Raw value.
        value: String,
    },
}

/// Server errors.
#[derive(Debug, thiserror::Error)]
pub enum VotingServerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),
}

/// Connected client state.
struct ConnectedClient {
    /// Connection identifier reported to the client.
    connection_id: Uuid,
    /// Participant bound by auth.
    participant: Option<ParticipantId>,
    /// Connection time.
    connected_at: Instant,
    /// Last activity.
    last_activity: Instant,
    /// Outbound queue.
    sender: mpsc::Sender<ServerMessage>,
    /// Signalled by the cleanup loop to close the connection.
    disconnect: Arc<Notify>,
}

type ClientMap = Arc<RwLock<BTreeMap<SocketAddr, ConnectedClient>>>;

/// State shared by every connection task.
#[derive(Clone)]
struct ServerContext {
    config: Arc<ServerConfig>,
    auth: Arc<AuthConfig>,
    ballot: Arc<CommitRevealBallot>,
    clock: Arc<dyn Clock>,
    clients: ClientMap,
}

/// The voting server.
pub struct VotingServer {
    ctx: ServerContext,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl VotingServer {
    /// Create a server for `ballot`.
    pub fn new(
        config: ServerConfig,
        auth: AuthConfig,
        ballot: Arc<CommitRevealBallot>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            ctx: ServerContext {
                config: Arc::new(config),
                auth: Arc::new(auth),
                ballot,
                clock,
                clients: Arc::new(RwLock::new(BTreeMap::new())),
            },
            shutdown_tx,
        }
    }

    /// The ballot this server fronts.
    pub fn ballot(&self) -> &Arc<CommitRevealBallot> {
        &self.ctx.ballot
    }

    /// Bind to the configured address and serve until shutdown.
    pub async fn run(&self) -> Result<(), VotingServerError> {
        let listener = TcpListener::bind(self.ctx.config.bind_addr).await?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener until shutdown.
    #[instrument(skip(self, listener))]
    pub async fn serve(&self, listener: TcpListener) -> Result<(), VotingServerError> {
        info!("Voting server listening on {}", listener.local_addr()?);
        if !self.ctx.auth.is_configured() {
            warn!("No auth key configured; clients may claim any participant address");
        }

        let status_ctx = self.ctx.clone();
        let status_handle = tokio::spawn(async move {
            Self::run_status_loop(status_ctx).await;
        });

        let cleanup_ctx = self.ctx.clone();
        let cleanup_handle = tokio::spawn(async move {
            Self::run_cleanup_loop(cleanup_ctx).await;
        });

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            let clients_count = self.ctx.clients.read().await.len();
                            if clients_count >= self.ctx.config.max_connections {
                                warn!("Connection limit reached, rejecting {}", addr);
                                tokio::spawn(reject_overloaded(stream));
                                continue;
                            }

                            info!("New connection from {}", addr);
                            self.handle_connection(stream, addr);
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        status_handle.abort();
        cleanup_handle.abort();

        Ok(())
    }

    /// Handle a new WebSocket connection.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let ctx = self.ctx.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    error!("WebSocket handshake failed for {}: {}", addr, e);
                    return;
                }
            };

            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(64);
            let disconnect = Arc::new(Notify::new());

            {
                let mut clients = ctx.clients.write().await;
                clients.insert(addr, ConnectedClient {
                    connection_id: Uuid::new_v4(),
                    participant: None,
                    connected_at: Instant::now(),
                    last_activity: Instant::now(),
                    sender: msg_tx.clone(),
                    disconnect: disconnect.clone(),
                });
            }

            let sender_task = tokio::spawn(async move {
                while let Some(msg) = msg_rx.recv().await {
                    let text = match msg.to_json() {
                        Ok(t) => t,
                        Err(e) => {
                            error!("Failed to serialize message: {}", e);
                            continue;
                        }
                    };
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                let _ = ws_sender.close().await;
            });

            loop {
                tokio::select! {
                    msg = ws_receiver.next() => {
                        if let Some(Ok(_)) = &msg {
                            touch(&ctx.clients, addr).await;
                        }

                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                let client_msg = match ClientMessage::from_json(&text) {
                                    Ok(m) => m,
                                    Err(e) => {
                                        debug!("Invalid message from {}: {}", addr, e);
                                        reply(&msg_tx, error_message(ErrorCode::InvalidInput, "Invalid message format")).await;
                                        continue;
                                    }
                                };

                                Self::handle_client_message(&ctx, addr, client_msg, &msg_tx).await;
                            }
                            Some(Ok(Message::Binary(_))) => {
                                reply(&msg_tx, error_message(ErrorCode::InvalidInput, "Binary frames are not supported")).await;
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                debug!("Client {} disconnected", addr);
                                break;
                            }
                            Some(Err(e)) => {
                                error!("WebSocket error for {}: {}", addr, e);
                                break;
                            }
                            // Ping/pong frames are answered by tungstenite
                            _ => {}
                        }
                    }
                    _ = disconnect.notified() => {
                        debug!("Closing idle client {}", addr);
                        break;
                    }
                    _ = shutdown_rx.recv() => {
                        reply(&msg_tx, ServerMessage::Shutdown {
                            reason: "Server shutting down".to_string(),
                        }).await;
                        break;
                    }
                }
            }

            // Let queued replies drain before tearing down the writer.
            drop(msg_tx);
            ctx.clients.write().await.remove(&addr);
            if tokio::time::timeout(Duration::from_secs(1), sender_task).await.is_err() {
                debug!("Dropped pending messages for {}", addr);
            }

            info!("Client {} cleaned up", addr);
        });
    }

    /// Handle a client message.
    async fn handle_client_message(
        ctx: &ServerContext,
        addr: SocketAddr,
        msg: ClientMessage,
        sender: &mpsc::Sender<ServerMessage>,
    ) {
        match msg {
            ClientMessage::Auth(auth) => {
                Self::handle_auth(ctx, addr, auth, sender).await;
            }
            ClientMessage::Commit(req) => {
                Self::handle_commit(ctx, addr, req, sender).await;
            }
            ClientMessage::Reveal(req) => {
                Self::handle_reveal(ctx, addr, req, sender).await;
            }
            ClientMessage::GetPhase => {
                reply(sender, ServerMessage::Phase(phase_info(ctx))).await;
            }
            ClientMessage::GetTally => {
                reply(sender, ServerMessage::Tally(ctx.ballot.get_tally().into())).await;
            }
            ClientMessage::GetCommitment { participant } => {
                let response = match parse_participant(&participant) {
                    Ok(id) => ServerMessage::Commitment(CommitmentInfo {
                        participant: id.to_hex(),
                        commitment: ctx.ballot.get_commitment(&id).map(|h| hash_to_hex(&h)),
                        revealed: ctx.ballot.has_revealed(&id),
                    }),
                    Err(e) => ServerMessage::Error(ServerError::from(&e)),
                };
                reply(sender, response).await;
            }
            ClientMessage::ComputeHash(req) => {
                let response = match req.validate() {
                    Ok(()) => ServerMessage::Hash(HashInfo {
                        choice: req.choice,
                        commitment: hash_to_hex(&CommitRevealBallot::compute_hash(req.choice, &req.secret)),
                    }),
                    Err(e) => ServerMessage::Error(ServerError::from(&e)),
                };
                reply(sender, response).await;
            }
            ClientMessage::Ping { timestamp } => {
                reply(sender, ServerMessage::Pong {
                    timestamp,
                    server_time: ctx.clock.now(),
                }).await;
            }
        }
    }

    /// Handle authentication.
    async fn handle_auth(
        ctx: &ServerContext,
        addr: SocketAddr,
        auth: AuthRequest,
        sender: &mpsc::Sender<ServerMessage>,
    ) {
        let participant = match authenticate(&auth, &ctx.auth) {
            Ok(participant) => participant,
            Err(e) => {
                warn!("Auth failed for {}: {}", addr, e);
                reply(sender, ServerMessage::AuthResult(AuthResult {
                    success: false,
                    participant: None,
                    connection_id: None,
                    error: Some(e.to_string()),
                    error_code: Some(auth_error_code(&e)),
                    server_version: ctx.config.version.clone(),
                })).await;
                return;
            }
        };

        let connection_id = {
            let mut clients = ctx.clients.write().await;
            clients.get_mut(&addr).map(|client| {
                client.participant = Some(participant);
                client.connection_id
            })
        };

        reply(sender, ServerMessage::AuthResult(AuthResult {
            success: true,
            participant: Some(participant.to_hex()),
            connection_id: connection_id.map(|id| id.to_string()),
            error: None,
            error_code: None,
            server_version: ctx.config.version.clone(),
        })).await;

        debug!("Client {} authenticated as {}", addr, participant);
    }

    /// Handle a commitment submission.
    #[instrument(skip_all, fields(client = %addr))]
    async fn handle_commit(
        ctx: &ServerContext,
        addr: SocketAddr,
        req: CommitRequest,
        sender: &mpsc::Sender<ServerMessage>,
    ) {
        let Some(participant) = authenticated_participant(ctx, addr).await else {
            reply(sender, error_message(ErrorCode::NotAuthenticated, "Authenticate before committing")).await;
            return;
        };

        let digest = match req.commitment_hash() {
            Ok(digest) => digest,
            Err(e) => {
                reply(sender, ServerMessage::Error(ServerError::from(&e))).await;
                return;
            }
        };

        match ctx.ballot.submit_commitment(participant, digest, ctx.clock.now()) {
            Ok(event) => {
                reply(sender, ServerMessage::Committed(CommitReceipt {
                    participant: participant.to_hex(),
                    commitment: hash_to_hex(&digest),
                })).await;
                broadcast_event(&ctx.clients, &event).await;
            }
            Err(e) => {
                reply(sender, ServerMessage::Error(ServerError::from(&e))).await;
            }
        }
    }

    /// Handle a reveal.
    #[instrument(skip_all, fields(client = %addr))]
    async fn handle_reveal(
        ctx: &ServerContext,
        addr: SocketAddr,
        req: RevealRequest,
        sender: &mpsc::Sender<ServerMessage>,
    ) {
        let Some(participant) = authenticated_participant(ctx, addr).await else {
            reply(sender, error_message(ErrorCode::NotAuthenticated, "Authenticate before revealing")).await;
            return;
        };

        if let Err(e) = req.validate() {
            reply(sender, ServerMessage::Error(ServerError::from(&e))).await;
            return;
        }

        match ctx.ballot.reveal(participant, req.choice, &req.secret, ctx.clock.now()) {
            Ok(event) => {
                reply(sender, ServerMessage::Revealed(reveal_receipt(&event, participant, req.choice))).await;
                broadcast_event(&ctx.clients, &event).await;
            }
            Err(e) => {
                reply(sender, ServerMessage::Error(ServerError::from(&e))).await;
            }
        }
    }

    /// Push status to every client and announce phase transitions.
    async fn run_status_loop(ctx: ServerContext) {
        let mut interval = interval(ctx.config.status_interval);
        let mut last_phase = ctx.ballot.current_phase(ctx.clock.now());

        loop {
            interval.tick().await;

            let now = ctx.clock.now();
            let status = ctx.ballot.status(now);

            for event in phase_transitions(last_phase, status.phase, now) {
                info!("Ballot phase changed: {:?}", event);
                broadcast_event(&ctx.clients, &event).await;
            }
            last_phase = status.phase;

            broadcast(&ctx.clients, ServerMessage::Status(status.into())).await;
        }
    }

    /// Run cleanup loop.
    async fn run_cleanup_loop(ctx: ServerContext) {
        let idle_timeout = ctx.config.idle_timeout;
        let mut interval = interval(Duration::from_secs(60).min(idle_timeout.max(Duration::from_secs(1))));

        loop {
            interval.tick().await;

            let now = Instant::now();
            let mut clients = ctx.clients.write().await;
            let idle: Vec<_> = clients
                .iter()
                .filter(|(_, c)| now.duration_since(c.last_activity) > idle_timeout)
                .map(|(addr, _)| *addr)
                .collect();

            for addr in idle {
                if let Some(client) = clients.remove(&addr) {
                    client.disconnect.notify_one();
                    info!(
                        "Removed idle client {} after {:?}",
                        addr,
                        now.duration_since(client.connected_at)
                    );
                }
            }
        }
    }

    /// Shutdown the server.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Get active connection count.
    pub async fn connection_count(&self) -> usize {
        self.ctx.clients.read().await.len()
    }

    /// Get authenticated connection count.
    pub async fn authenticated_count(&self) -> usize {
        self.ctx
            .clients
            .read()
            .await
            .values()
            .filter(|c| c.participant.is_some())
            .count()
    }
}

/// Record inbound traffic for the idle check.
async fn touch(clients: &ClientMap, addr: SocketAddr) {
    if let Some(client) = clients.write().await.get_mut(&addr) {
        client.last_activity = Instant::now();
    }
}

/// Participant bound to the connection, if authenticated.
async fn authenticated_participant(ctx: &ServerContext, addr: SocketAddr) -> Option<ParticipantId> {
    ctx.clients.read().await.get(&addr).and_then(|c| c.participant)
}

fn phase_info(ctx: &ServerContext) -> PhaseInfo {
    let now = ctx.clock.now();
    let config = ctx.ballot.phase_config();
    PhaseInfo {
        phase: config.phase_at(now),
        server_time: now,
        phase_deadline: config.phase_deadline(now),
        seconds_remaining: config.seconds_remaining(now),
    }
}

/// One `PhaseChanged` per step from `from` to `to`.
fn phase_transitions(from: Phase, to: Phase, at: Timestamp) -> Vec<BallotEvent> {
    let mut events = Vec::new();
    let mut current = from;
    while current < to {
        let Some(next) = current.next() else { break };
        events.push(BallotEvent::PhaseChanged { from: current, to: next, at });
        current = next;
    }
    events
}

/// Receipt carrying the tally snapshot taken when this vote was counted.
fn reveal_receipt(event: &BallotEvent, participant: ParticipantId, choice: bool) -> RevealReceipt {
    let tally = match event {
        BallotEvent::VoteRevealed { tally, .. } => *tally,
        _ => Tally::default(),
    };
    RevealReceipt {
        participant: participant.to_hex(),
        choice,
        tally: tally.into(),
    }
}

fn error_message(code: ErrorCode, message: impl Into<String>) -> ServerMessage {
    ServerMessage::Error(ServerError::new(code, message))
}

fn auth_error_code(err: &AuthError) -> ErrorCode {
    match err {
        AuthError::Expired => ErrorCode::TokenExpired,
        AuthError::InvalidParticipant(_) => ErrorCode::InvalidInput,
        AuthError::NotConfigured => ErrorCode::AuthFailed,
        _ => ErrorCode::InvalidToken,
    }
}

/// Complete the handshake only to tell the client the server is full.
async fn reject_overloaded(stream: TcpStream) {
    let Ok(mut ws) = accept_async(stream).await else { return };
    let msg = error_message(ErrorCode::ServerOverloaded, "Connection limit reached");
    if let Ok(text) = msg.to_json() {
        let _ = ws.send(Message::Text(text)).await;
    }
    let _ = ws.close(None).await;
}

async fn reply(sender: &mpsc::Sender<ServerMessage>, msg: ServerMessage) {
    if sender.send(msg).await.is_err() {
        debug!("Reply dropped, client writer closed");
    }
}

/// Queue a message for every client. Full queues drop the message.
async fn broadcast(clients: &ClientMap, msg: ServerMessage) {
    let clients = clients.read().await;
    for (addr, client) in clients.iter() {
        if client.sender.try_send(msg.clone()).is_err() {
            debug!("Broadcast to {} dropped", addr);
        }
    }
}

async fn broadcast_event(clients: &ClientMap, event: &BallotEvent) {
    broadcast(clients, ServerMessage::Event(VoteEvent::from(event))).await;
}
