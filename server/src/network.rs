//! Server network layer: UDP transport plus the single event loop that owns
//! the simulation.
//!
//! Three timers (integration tick, snapshot broadcast, liveness sweep) and the
//! packet handlers all run inside one `select!` loop, so the participant map
//! is never touched concurrently. Socket reads and writes happen on helper
//! tasks that talk to the loop over channels.

use crate::connections::ConnectionManager;
use crate::simulation::ServerSimulation;
use crate::ServerConfig;
use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{now_ms, period, InputRecord, Packet, MAX_PACKET_SIZE, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};

/// Reason sent to addresses whose participant was already dropped
pub const STALE_SESSION_REASON: &str = "Timed out";

/// Messages sent from network tasks to main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived { packet: Packet, addr: SocketAddr },
    Shutdown,
}

/// Messages sent from main server loop to the sender task
#[derive(Debug)]
pub enum GameMessage {
    SendPacket {
        packet: Packet,
        addr: SocketAddr,
    },
    BroadcastPacket {
        packet: Packet,
        addrs: Vec<SocketAddr>,
    },
}

/// Main server coordinating networking and simulation
pub struct Server {
    socket: Arc<UdpSocket>,
    config: ServerConfig,
    connections: ConnectionManager,
    simulation: ServerSimulation,
    rng: StdRng,
    snapshots_sent: u64,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    game_tx: mpsc::UnboundedSender<GameMessage>,
    game_rx: Option<mpsc::UnboundedReceiver<GameMessage>>,
}

impl Server {
    pub async fn new(addr: &str, config: ServerConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("Server listening on {}", socket.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (game_tx, game_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket,
            connections: ConnectionManager::new(config.max_clients),
            simulation: ServerSimulation::new(config.motion),
            rng: StdRng::from_entropy(),
            snapshots_sent: 0,
            config,
            server_tx,
            server_rx,
            game_tx,
            game_rx: Some(game_rx),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Handle for injecting messages (e.g. `Shutdown`) into the main loop
    pub fn message_sender(&self) -> mpsc::UnboundedSender<ServerMessage> {
        self.server_tx.clone()
    }

    pub fn simulation(&self) -> &ServerSimulation {
        &self.simulation
    }

    /// Spawns task that continuously listens for incoming packets
    fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = vec![0u8; MAX_PACKET_SIZE];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => match Packet::decode(&buffer[..len]) {
                        Ok(packet) => {
                            if let Err(e) =
                                server_tx.send(ServerMessage::PacketReceived { packet, addr })
                            {
                                error!("Failed to send packet to main loop: {}", e);
                                break;
                            }
                        }
                        Err(e) => warn!("Failed to decode packet from {}: {}", addr, e),
                    },
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns task that processes the outgoing packet queue
    fn spawn_network_sender(&mut self) {
        let Some(mut game_rx) = self.game_rx.take() else {
            warn!("Network sender already running");
            return;
        };
        let socket = Arc::clone(&self.socket);

        tokio::spawn(async move {
            while let Some(message) = game_rx.recv().await {
                let (packet, addrs) = match message {
                    GameMessage::SendPacket { packet, addr } => (packet, vec![addr]),
                    GameMessage::BroadcastPacket { packet, addrs } => (packet, addrs),
                };

                let data = match packet.encode() {
                    Ok(data) => data,
                    Err(e) => {
                        error!("Failed to encode {} packet: {}", packet.kind(), e);
                        continue;
                    }
                };

                for addr in addrs {
                    if let Err(e) = socket.send_to(&data, addr).await {
                        error!("Failed to send {} to {}: {}", packet.kind(), addr, e);
                    }
                }
            }
        });
    }

    fn send_packet(&self, packet: Packet, addr: SocketAddr) {
        if let Err(e) = self.game_tx.send(GameMessage::SendPacket { packet, addr }) {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    fn broadcast_packet(&self, packet: Packet) {
        let addrs = self.connections.addrs();
        if addrs.is_empty() {
            return;
        }

        if let Err(e) = self
            .game_tx
            .send(GameMessage::BroadcastPacket { packet, addrs })
        {
            error!("Failed to queue broadcast packet: {}", e);
        }
    }

    /// Broadcasts the current state of every participant
    fn broadcast_snapshot(&mut self) {
        let snapshot = self.simulation.snapshot(now_ms());
        self.snapshots_sent += 1;
        self.broadcast_packet(Packet::Snapshot(snapshot));
    }

    /// Processes one incoming packet
    fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        let known = self.connections.touch(&addr);

        match packet {
            Packet::Connect { client_version } => self.handle_connect(addr, client_version),

            Packet::StateInput(record) => {
                if known {
                    self.handle_input(addr, record);
                } else {
                    self.reject_stale(addr);
                }
            }

            Packet::TimeProbe { c } => {
                self.send_packet(Packet::TimeEcho { c, s: now_ms() }, addr);
            }

            Packet::Disconnect => {
                if known {
                    self.drop_connection(&addr);
                } else {
                    self.reject_stale(addr);
                }
            }

            other => {
                warn!(
                    "Unexpected {} packet from client at {}",
                    other.kind(),
                    addr
                );
            }
        }
    }

    fn handle_connect(&mut self, addr: SocketAddr, client_version: u32) {
        info!(
            "Client connecting from {} (version: {})",
            addr, client_version
        );

        if client_version != PROTOCOL_VERSION {
            let reason = "Protocol version mismatch".to_string();
            self.send_packet(Packet::Disconnected { reason }, addr);
            return;
        }

        // A reconnect from the same address replaces the old participant
        if self.connections.participant_for(&addr).is_some() {
            info!("Replacing existing connection from {}", addr);
            self.drop_connection(&addr);
        }

        if self.connections.is_full() {
            let reason = "Server full".to_string();
            self.send_packet(Packet::Disconnected { reason }, addr);
            return;
        }

        let participant = self.simulation.add_participant(&mut self.rng);
        let welcome = Packet::Welcome {
            id: participant.id.clone(),
            name: participant.name.clone(),
            color: participant.color,
        };
        let id = participant.id.clone();

        self.connections.add(addr, id);
        self.send_packet(welcome, addr);
        self.broadcast_snapshot();
    }

    fn handle_input(&mut self, addr: SocketAddr, record: InputRecord) {
        if let Some(id) = self.connections.participant_for(&addr) {
            let id = id.clone();
            self.simulation.apply_input(&id, record);
        }
    }

    /// Tells an address we no longer track that its session is gone, so the
    /// client clears its identity and connects again.
    fn reject_stale(&self, addr: SocketAddr) {
        debug!("Traffic from unknown address {}, asking it to reconnect", addr);
        let reason = STALE_SESSION_REASON.to_string();
        self.send_packet(Packet::Disconnected { reason }, addr);
    }

    /// Removes the participant behind `addr` and tells everyone right away,
    /// without waiting for the next scheduled broadcast.
    fn drop_connection(&mut self, addr: &SocketAddr) {
        if let Some(id) = self.connections.remove(addr) {
            self.simulation.remove_participant(&id);
            self.broadcast_snapshot();
        }
    }

    fn check_timeouts(&mut self) {
        let expired = self.connections.check_timeouts(self.config.client_timeout);
        if expired.is_empty() {
            return;
        }

        for (_, id) in &expired {
            self.simulation.remove_participant(id);
        }
        self.broadcast_snapshot();
    }

    /// Main server loop coordinating all operations
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_network_receiver();
        self.spawn_network_sender();

        let dt = 1.0 / self.config.tick_rate.max(1) as f32;
        let mut tick_interval = interval(period(self.config.tick_rate));
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut snapshot_interval = interval(period(self.config.snapshot_rate));
        snapshot_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut liveness_interval = interval(Duration::from_secs(1));

        info!(
            "Server started: {}Hz simulation, {}Hz snapshots",
            self.config.tick_rate, self.config.snapshot_rate
        );

        loop {
            tokio::select! {
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::PacketReceived { packet, addr }) => {
                            self.handle_packet(packet, addr);
                        },
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                _ = tick_interval.tick() => {
                    self.simulation.tick(dt);

                    if self.simulation.tick % (self.config.tick_rate.max(1) as u64 * 10) == 0
                        && !self.simulation.is_empty()
                    {
                        debug!(
                            "Tick {}: {} participants, {} snapshots sent",
                            self.simulation.tick,
                            self.simulation.len(),
                            self.snapshots_sent
                        );
                    }
                },

                _ = snapshot_interval.tick() => {
                    if !self.connections.is_empty() {
                        self.broadcast_snapshot();
                    }
                },

                _ = liveness_interval.tick() => {
                    self.check_timeouts();
                },
            }
        }

        Ok(())
    }
}
