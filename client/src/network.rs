use crate::game::{ClientGameState, FrameSink};
use crate::input::{InputSource, RawInput};
use crate::ClientConfig;
use log::{debug, error, info, warn};
use shared::{now_ms, period, Packet, CLOCK_PROBE_INTERVAL_MS, MAX_PACKET_SIZE, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::{interval, interval_at, sleep, MissedTickBehavior};

/// Messages delivered to the client loop
#[derive(Debug)]
pub enum ClientMessage {
    PacketReceived { packet: Packet, received_at: u64 },
    Shutdown,
}

/// Headless client: one UDP socket, one event loop
///
/// Inbound datagrams arrive over a channel from a receiver task. Input
/// records, frames and clock probes each run on their own timer in the same
/// `select!`, so simulated latency never stalls the loop.
pub struct Client {
    socket: Arc<UdpSocket>,
    server_addr: SocketAddr,
    config: ClientConfig,
    game: ClientGameState,
    input: Box<dyn InputSource + Send>,
    sink: Box<dyn FrameSink + Send>,
    client_tx: mpsc::UnboundedSender<ClientMessage>,
    client_rx: mpsc::UnboundedReceiver<ClientMessage>,
    started: Instant,
}

impl Client {
    pub async fn new(
        config: ClientConfig,
        input: Box<dyn InputSource + Send>,
        sink: Box<dyn FrameSink + Send>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let server_addr: SocketAddr = config.server_addr.parse()?;
        let bind_addr = if server_addr.is_ipv4() {
            "0.0.0.0:0"
        } else {
            "[::]:0"
        };
        let socket = Arc::new(UdpSocket::bind(bind_addr).await?);
        let (client_tx, client_rx) = mpsc::unbounded_channel();

        let game = ClientGameState::new(config.mapping.clone(), config.motion, config.interp_delay);

        Ok(Client {
            socket,
            server_addr,
            config,
            game,
            input,
            sink,
            client_tx,
            client_rx,
            started: Instant::now(),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Handle for stopping the loop from outside
    pub fn message_sender(&self) -> mpsc::UnboundedSender<ClientMessage> {
        self.client_tx.clone()
    }

    pub fn game(&self) -> &ClientGameState {
        &self.game
    }

    fn one_way_delay(&self) -> Duration {
        Duration::from_millis(self.config.fake_ping_ms / 2)
    }

    fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let client_tx = self.client_tx.clone();
        let server_addr = self.server_addr;
        let delay = self.one_way_delay();

        tokio::spawn(async move {
            let mut buffer = vec![0u8; MAX_PACKET_SIZE];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        if addr != server_addr {
                            debug!("Ignoring datagram from {}", addr);
                            continue;
                        }
                        let packet = match Packet::decode(&buffer[..len]) {
                            Ok(packet) => packet,
                            Err(e) => {
                                warn!("Failed to decode packet: {}", e);
                                continue;
                            }
                        };

                        if delay.is_zero() {
                            let message = ClientMessage::PacketReceived {
                                packet,
                                received_at: now_ms(),
                            };
                            if client_tx.send(message).is_err() {
                                break;
                            }
                        } else {
                            let client_tx = client_tx.clone();
                            tokio::spawn(async move {
                                sleep(delay).await;
                                let _ = client_tx.send(ClientMessage::PacketReceived {
                                    packet,
                                    received_at: now_ms(),
                                });
                            });
                        }
                    }
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Queues `packet` for the server, after the simulated one-way delay if any.
    fn send_packet(&self, packet: &Packet) {
        let data = match packet.encode() {
            Ok(data) => data,
            Err(e) => {
                error!("Failed to encode {} packet: {}", packet.kind(), e);
                return;
            }
        };

        let delay = self.one_way_delay();
        if delay.is_zero() {
            if let Err(e) = self.socket.try_send_to(&data, self.server_addr) {
                warn!("Failed to send {} packet: {}", packet.kind(), e);
            }
            return;
        }

        let socket = Arc::clone(&self.socket);
        let server_addr = self.server_addr;
        tokio::spawn(async move {
            sleep(delay).await;
            if let Err(e) = socket.send_to(&data, server_addr).await {
                warn!("Failed to send delayed packet: {}", e);
            }
        });
    }

    fn connect(&self) {
        info!("Connecting to {}...", self.server_addr);
        self.send_packet(&Packet::Connect {
            client_version: PROTOCOL_VERSION,
        });
    }

    fn send_probe(&self) {
        self.send_packet(&Packet::TimeProbe { c: now_ms() });
    }

    fn poll_input(&mut self) -> RawInput {
        self.input.poll(self.started.elapsed().as_secs_f32())
    }

    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_network_receiver();
        self.connect();
        self.send_probe();

        let mut input_interval = interval(period(self.config.input_rate));
        input_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut frame_interval = interval(period(self.config.frame_rate));
        frame_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let probe_period = Duration::from_millis(CLOCK_PROBE_INTERVAL_MS);
        let mut probe_interval = interval_at(tokio::time::Instant::now() + probe_period, probe_period);

        let mut last_frame = Instant::now();

        loop {
            tokio::select! {
                message = self.client_rx.recv() => {
                    match message {
                        Some(ClientMessage::PacketReceived { packet, received_at }) => {
                            self.game.handle_packet(packet, received_at);
                        },
                        Some(ClientMessage::Shutdown) | None => {
                            info!("Client shutting down");
                            break;
                        }
                    }
                },

                _ = input_interval.tick() => {
                    let raw = self.poll_input();
                    if let Some(record) = self.game.input_record(&raw, now_ms()) {
                        self.send_packet(&Packet::StateInput(record));
                    }
                },

                _ = frame_interval.tick() => {
                    let dt = last_frame.elapsed().as_secs_f32();
                    last_frame = Instant::now();

                    let raw = self.poll_input();
                    let view = self.game.frame(&raw, dt, now_ms());
                    self.sink.present(&view);
                },

                _ = probe_interval.tick() => {
                    self.game.expire_if_silent(now_ms());
                    if !self.game.is_connected() {
                        self.connect();
                    }
                    self.send_probe();
                },
            }
        }

        if self.game.is_connected() {
            let data = Packet::Disconnect.encode()?;
            if let Err(e) = self.socket.send_to(&data, self.server_addr).await {
                warn!("Failed to send disconnect: {}", e);
            }
        }

        Ok(())
    }
}
