//! Server network layer: UDP transport, connection lifecycle and the
//! waiting/running/terminating loop

use crate::client_manager::{ClientManager, CLIENT_TIMEOUT};
use log::{debug, error, info, warn};
use shared::{
    ActorId, ActorKind, Packet, QuitSignal, Result, World, MAX_DATAGRAM_SIZE, MIN_PLAYERS,
    PROTOCOL_VERSION,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::interval;

/// How often a waiting server re-checks the player count.
pub const PLAYER_POLL_INTERVAL: Duration = Duration::from_millis(500);
const TIMEOUT_CHECK_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    WaitingForPlayers,
    Running,
    Terminating,
}

/// Messages sent from network tasks to main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived { packet: Packet, addr: SocketAddr },
    ClientTimeout { client_id: ActorId },
}

/// Messages sent from game loop to network tasks
#[derive(Debug)]
pub enum GameMessage {
    SendPacket { packet: Packet, addr: SocketAddr },
    BroadcastPacket { packet: Packet },
}

/// Authoritative end of a networked session. Owns the socket and every
/// client connection; shares only the [`World`].
pub struct Server {
    socket: Arc<UdpSocket>,
    world: Arc<World>,
    clients: Arc<RwLock<ClientManager>>,
    tick_duration: Duration,
    quit: QuitSignal,
    state_tx: watch::Sender<ServerState>,
    tasks: Vec<JoinHandle<()>>,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    game_tx: mpsc::UnboundedSender<GameMessage>,
    game_rx: Option<mpsc::UnboundedReceiver<GameMessage>>,
}

impl Server {
    pub async fn bind(
        addr: &str,
        world: Arc<World>,
        tick_duration: Duration,
        max_clients: usize,
        quit: QuitSignal,
    ) -> Result<Self> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("Server listening on {}", socket.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (game_tx, game_rx) = mpsc::unbounded_channel();
        let (state_tx, _) = watch::channel(ServerState::WaitingForPlayers);

        Ok(Server {
            socket,
            world,
            clients: Arc::new(RwLock::new(ClientManager::new(max_clients))),
            tick_duration,
            quit,
            state_tx,
            tasks: Vec::new(),
            server_tx,
            server_rx,
            game_tx,
            game_rx: Some(game_rx),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    pub fn state(&self) -> ServerState {
        *self.state_tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ServerState> {
        self.state_tx.subscribe()
    }

    pub async fn client_count(&self) -> usize {
        self.clients.read().await.len()
    }

    fn set_state(&self, state: ServerState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            info!("Server state {:?} -> {:?}", previous, state);
        }
    }

    /// Spawns task that continuously listens for incoming packets
    fn spawn_network_receiver(&mut self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        self.tasks.push(tokio::spawn(async move {
            let mut buffer = vec![0u8; MAX_DATAGRAM_SIZE];

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
                        // ICMP port unreachable from a vanished client surfaces here
                        debug!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        }));
    }

    /// Spawns task that processes outgoing packet queue. A failed send marks
    /// that connection dead without touching the others.
    fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let clients = Arc::clone(&self.clients);
        let Some(mut game_rx) = self.game_rx.take() else {
            return;
        };

        self.tasks.push(tokio::spawn(async move {
            while let Some(message) = game_rx.recv().await {
                match message {
                    GameMessage::SendPacket { packet, addr } => {
                        if let Err(e) = send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                    GameMessage::BroadcastPacket { packet } => {
                        let client_addrs = clients.read().await.get_client_addrs();

                        for (client_id, addr) in client_addrs {
                            if let Err(e) = send_packet_impl(&socket, &packet, addr).await {
                                error!("Failed to send to client {}: {}", client_id, e);
                                clients.write().await.mark_dead(&client_id);
                            }
                        }
                    }
                }
            }
        }));
    }

    /// Spawns task that monitors client timeouts
    fn spawn_timeout_checker(&mut self) {
        let clients = Arc::clone(&self.clients);
        let server_tx = self.server_tx.clone();

        self.tasks.push(tokio::spawn(async move {
            let mut interval = interval(TIMEOUT_CHECK_INTERVAL);

            loop {
                interval.tick().await;

                let timed_out = clients.write().await.check_timeouts(CLIENT_TIMEOUT);

                for client_id in timed_out {
                    if let Err(e) = server_tx.send(ServerMessage::ClientTimeout { client_id }) {
                        error!("Failed to send timeout message: {}", e);
                        return;
                    }
                }
            }
        }));
    }

    fn send_packet(&self, packet: Packet, addr: SocketAddr) {
        if let Err(e) = self.game_tx.send(GameMessage::SendPacket { packet, addr }) {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    fn broadcast_packet(&self, packet: Packet) {
        if let Err(e) = self.game_tx.send(GameMessage::BroadcastPacket { packet }) {
            error!("Failed to queue broadcast packet: {}", e);
        }
    }

    fn reject(&self, addr: SocketAddr, reason: &str) {
        info!("Rejecting {}: {}", addr, reason);
        self.send_packet(
            Packet::Disconnected {
                reason: reason.to_string(),
            },
            addr,
        );
    }

    async fn drop_client(&self, id: ActorId) {
        self.clients.write().await.remove_client(&id);
        self.world.remove_actor(id);
    }

    /// Processes incoming packets. Connects are honoured in every state, so
    /// players may join a running game.
    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        let known = {
            let mut clients = self.clients.write().await;
            let id = clients.find_client_by_addr(addr);
            if let Some(client) = id.and_then(|id| clients.get_mut(&id)) {
                client.touch();
            }
            id
        };

        match packet {
            Packet::Connect {
                client_version,
                name,
            } => {
                info!(
                    "Client connecting from {} (version: {}, name: {:?})",
                    addr, client_version, name
                );

                if client_version != PROTOCOL_VERSION {
                    self.reject(
                        addr,
                        &format!(
                            "Protocol version mismatch (server {}, client {})",
                            PROTOCOL_VERSION, client_version
                        ),
                    );
                    return;
                }

                // Reconnect from the same address replaces the old session
                if let Some(existing_id) = known {
                    info!("Removing existing client {} from {}", existing_id, addr);
                    self.drop_client(existing_id).await;
                }

                if self.clients.read().await.is_full() {
                    self.reject(addr, "Server full");
                    return;
                }

                let Some(spawn) = self.world.random_spawn_locked() else {
                    self.reject(addr, "No free spawn point");
                    return;
                };

                let client_id = self
                    .world
                    .add_actor_named(spawn, ActorKind::Remote, 0, name);
                let name = self
                    .world
                    .with_actors(|actors| {
                        actors
                            .iter()
                            .find(|a| a.id == client_id)
                            .map(|a| a.name.clone())
                    })
                    .unwrap_or_default();

                self.clients
                    .write()
                    .await
                    .add_client(client_id, addr, name);
                self.send_packet(Packet::Connected { client_id }, addr);
            }

            Packet::Input { sequence, controls } => {
                let Some(client_id) = known else {
                    debug!("Input from unknown address {}", addr);
                    return;
                };

                let fresh = self
                    .clients
                    .write()
                    .await
                    .get_mut(&client_id)
                    .map(|client| client.accept_input(sequence))
                    .unwrap_or(false);

                if fresh {
                    self.world.set_controls(client_id, controls);
                }
            }

            Packet::Disconnect => {
                if let Some(client_id) = known {
                    self.drop_client(client_id).await;
                }
            }

            _ => {
                warn!("Unexpected packet type from client at {}", addr);
            }
        }
    }

    async fn reap_dead_connections(&self) {
        let dead = self.clients.write().await.reap_dead();
        for id in dead {
            self.world.remove_actor(id);
        }
    }

    /// Broadcasts a snapshot if anything changed since the last one.
    fn broadcast_changes(&self) {
        if let Some(snapshot) = self.world.serialize() {
            self.broadcast_packet(Packet::Snapshot(snapshot));
        }
    }

    /// One simulation tick: step, snapshot, broadcast.
    fn tick(&self) {
        self.world.update();
        self.broadcast_changes();
    }

    /// Runs until the quit signal fires, then terminates the session.
    pub async fn run(&mut self) -> Result<()> {
        self.spawn_network_receiver();
        self.spawn_network_sender();
        self.spawn_timeout_checker();

        let quit = self.quit.clone();
        let mut poll_interval = interval(PLAYER_POLL_INTERVAL);
        let mut tick_interval = interval(self.tick_duration);

        info!("Server started successfully, waiting for {} players", MIN_PLAYERS);

        loop {
            let state = self.state();

            tokio::select! {
                _ = quit.cancelled() => break,

                // Handle network events
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::PacketReceived { packet, addr }) => {
                            self.handle_packet(packet, addr).await;
                        }
                        Some(ServerMessage::ClientTimeout { client_id }) => {
                            warn!("Client {} timed out", client_id);
                            self.world.remove_actor(client_id);
                        }
                        None => break,
                    }
                }

                // Joins and leaves still reach clients while waiting
                _ = poll_interval.tick(), if state == ServerState::WaitingForPlayers => {
                    self.reap_dead_connections().await;
                    self.broadcast_changes();
                    if self.world.actor_count() >= MIN_PLAYERS {
                        self.set_state(ServerState::Running);
                    }
                }

                _ = tick_interval.tick(), if state == ServerState::Running => {
                    self.reap_dead_connections().await;
                    self.tick();

                    let tick = self.world.tick();
                    if tick % 600 == 0 && tick > 0 {
                        debug!("Tick {}: {} clients", tick, self.client_count().await);
                    }
                }
            }
        }

        self.terminate().await;
        Ok(())
    }

    /// Tells every client the session is over, stops the network tasks and
    /// drops all connections.
    pub async fn terminate(&mut self) {
        self.set_state(ServerState::Terminating);

        let clients = self.clients.write().await.drain();
        let packet = Packet::Disconnected {
            reason: "Server shutting down".to_string(),
        };
        for client in &clients {
            if let Err(e) = send_packet_impl(&self.socket, &packet, client.addr).await {
                debug!("Could not notify client {}: {}", client.id, e);
            }
        }

        for task in self.tasks.drain(..) {
            task.abort();
        }
        info!("Server terminated, dropped {} connections", clients.len());
    }
}

async fn send_packet_impl(socket: &UdpSocket, packet: &Packet, addr: SocketAddr) -> Result<()> {
    let data = packet.encode()?;
    socket.send_to(&data, addr).await?;
    Ok(())
}
