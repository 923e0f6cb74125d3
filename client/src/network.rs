//! Client end of a networked session: connects to a server, mirrors its world
//! and relays local input

use log::{debug, error, info, warn};
use shared::{
    ActorId, ArenaError, Packet, QuitSignal, Result, Snapshot, World, MAX_DATAGRAM_SIZE,
    MIN_PLAYERS, PROTOCOL_VERSION,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{lookup_host, UdpSocket};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout};

/// How long to wait for the server to answer a connect request.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
/// How often the local actor's controls are sent. Doubles as keep-alive.
pub const INPUT_INTERVAL: Duration = Duration::from_millis(16);
/// How often a syncing client re-checks the mirrored player count.
pub const SYNC_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Connecting,
    Syncing,
    Active,
    Disconnected,
}

/// Moves to `next` unless the session already ended.
fn transition(state_tx: &watch::Sender<ClientState>, next: ClientState) {
    state_tx.send_if_modified(|state| {
        if *state == ClientState::Disconnected || *state == next {
            return false;
        }
        info!("Client state {:?} -> {:?}", state, next);
        *state = next;
        true
    });
}

/// Applies `snapshot` unless the session has ended. The state stays locked
/// while applying, so nothing lands after a concurrent `terminate`.
fn apply_while_connected(
    state_tx: &watch::Sender<ClientState>,
    world: &World,
    snapshot: &Snapshot,
) -> bool {
    let mut applied = false;
    state_tx.send_if_modified(|state| {
        if *state != ClientState::Disconnected {
            applied = world.apply_snapshot(snapshot);
        }
        false
    });
    applied
}

fn current(state_tx: &watch::Sender<ClientState>) -> ClientState {
    *state_tx.borrow()
}

/// A connected client. The mirror [`World`] passed to
/// [`ClientSession::connect`] is kept in step with the server until the
/// session ends.
pub struct ClientSession {
    socket: Arc<UdpSocket>,
    server_addr: SocketAddr,
    client_id: ActorId,
    state_tx: Arc<watch::Sender<ClientState>>,
    tasks: Vec<JoinHandle<()>>,
}

impl ClientSession {
    /// Resolves `host`, sends a connect request and waits for the server to
    /// assign an actor. Failure here is final; retrying is up to the caller.
    pub async fn connect(
        host: &str,
        port: u16,
        name: &str,
        world: Arc<World>,
        control_scheme: u8,
        quit: QuitSignal,
    ) -> Result<Self> {
        let (state_tx, _) = watch::channel(ClientState::Connecting);
        let state_tx = Arc::new(state_tx);

        let server_addr = lookup_host((host, port))
            .await
            .map_err(|e| ArenaError::InvalidAddress(format!("{}:{} ({})", host, port, e)))?
            .next()
            .ok_or_else(|| ArenaError::InvalidAddress(format!("{}:{}", host, port)))?;

        let bind_addr = if server_addr.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let socket = Arc::new(UdpSocket::bind(bind_addr).await?);
        socket.connect(server_addr).await?;

        info!("Connecting to {} as {:?}...", server_addr, name);
        let hello = Packet::Connect {
            client_version: PROTOCOL_VERSION,
            name: name.to_string(),
        };
        socket.send(&hello.encode()?).await?;

        let client_id = timeout(CONNECT_TIMEOUT, Self::await_welcome(&socket, &world))
            .await
            .map_err(|_| ArenaError::ConnectTimeout(server_addr.to_string()))??;
        info!("Connected! Client ID: {}", client_id);

        world.set_local_actor(client_id, control_scheme);
        transition(&state_tx, ClientState::Syncing);

        let mut session = Self {
            socket,
            server_addr,
            client_id,
            state_tx,
            tasks: Vec::new(),
        };
        session.spawn_receiver(world.clone(), quit.clone());
        session.spawn_sync_poller(world.clone(), quit.clone());
        session.spawn_input_relay(world, quit);

        Ok(session)
    }

    async fn await_welcome(socket: &UdpSocket, world: &World) -> Result<ActorId> {
        let mut buffer = vec![0u8; MAX_DATAGRAM_SIZE];

        loop {
            let len = socket.recv(&mut buffer).await?;
            match Packet::decode(&buffer[..len]) {
                Ok(Packet::Connected { client_id }) => return Ok(client_id),
                Ok(Packet::Disconnected { reason }) => return Err(ArenaError::Rejected(reason)),
                // A broadcast can overtake the welcome
                Ok(Packet::Snapshot(snapshot)) => {
                    world.apply_snapshot(&snapshot);
                }
                Ok(other) => debug!("Ignoring {:?} while connecting", other),
                Err(e) => warn!("Failed to decode packet from server: {}", e),
            }
        }
    }

    /// Applies snapshots in arrival order; stale ones are dropped by the world.
    fn spawn_receiver(&mut self, world: Arc<World>, quit: QuitSignal) {
        let socket = Arc::clone(&self.socket);
        let state_tx = Arc::clone(&self.state_tx);

        self.tasks.push(tokio::spawn(async move {
            let mut buffer = vec![0u8; MAX_DATAGRAM_SIZE];

            loop {
                let result = tokio::select! {
                    _ = quit.cancelled() => break,
                    result = socket.recv(&mut buffer) => result,
                };

                let len = match result {
                    Ok(len) => len,
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        transition(&state_tx, ClientState::Disconnected);
                        break;
                    }
                };

                if current(&state_tx) == ClientState::Disconnected {
                    break;
                }

                match Packet::decode(&buffer[..len]) {
                    Ok(Packet::Snapshot(snapshot)) => {
                        apply_while_connected(&state_tx, &world, &snapshot);
                    }
                    Ok(Packet::Disconnected { reason }) => {
                        warn!("Disconnected: {}", reason);
                        transition(&state_tx, ClientState::Disconnected);
                        break;
                    }
                    Ok(other) => debug!("Unexpected packet {:?}", other),
                    Err(e) => warn!("Failed to decode packet from server: {}", e),
                }
            }
        }));
    }

    /// Holds the session in `Syncing` until the mirror shows enough players.
    fn spawn_sync_poller(&mut self, world: Arc<World>, quit: QuitSignal) {
        let state_tx = Arc::clone(&self.state_tx);

        self.tasks.push(tokio::spawn(async move {
            let mut poll = interval(SYNC_POLL_INTERVAL);

            loop {
                tokio::select! {
                    _ = quit.cancelled() => break,
                    _ = poll.tick() => {}
                }

                match current(&state_tx) {
                    ClientState::Syncing if world.actor_count() >= MIN_PLAYERS => {
                        transition(&state_tx, ClientState::Active);
                        break;
                    }
                    ClientState::Disconnected => break,
                    _ => {}
                }
            }
        }));
    }

    /// Sends the local actor's controls on a fixed interval, independent of
    /// rendering.
    fn spawn_input_relay(&mut self, world: Arc<World>, quit: QuitSignal) {
        let socket = Arc::clone(&self.socket);
        let state_tx = Arc::clone(&self.state_tx);
        let client_id = self.client_id;

        self.tasks.push(tokio::spawn(async move {
            let mut ticker = interval(INPUT_INTERVAL);
            let mut sequence: u32 = 0;

            loop {
                tokio::select! {
                    _ = quit.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                if current(&state_tx) == ClientState::Disconnected {
                    break;
                }

                sequence = sequence.wrapping_add(1);
                let packet = Packet::Input {
                    sequence,
                    controls: world.controls_of(client_id).unwrap_or_default(),
                };

                let data = match packet.encode() {
                    Ok(data) => data,
                    Err(e) => {
                        error!("Failed to encode input: {}", e);
                        continue;
                    }
                };

                if let Err(e) = socket.send(&data).await {
                    error!("Error sending input: {}", e);
                    transition(&state_tx, ClientState::Disconnected);
                    break;
                }
            }
        }));
    }

    pub fn client_id(&self) -> ActorId {
        self.client_id
    }

    pub fn server_addr(&self) -> SocketAddr {
        self.server_addr
    }

    pub fn state(&self) -> ClientState {
        current(&self.state_tx)
    }

    pub fn subscribe(&self) -> watch::Receiver<ClientState> {
        self.state_tx.subscribe()
    }

    /// Waits until the session is `Active`, or has ended. Returns the state
    /// it settled in.
    pub async fn wait_until_active(&self) -> ClientState {
        let mut states = self.subscribe();
        let settled = states
            .wait_for(|s| matches!(s, ClientState::Active | ClientState::Disconnected))
            .await
            .map(|s| *s);
        settled.unwrap_or(ClientState::Disconnected)
    }

    /// Says goodbye to the server and stops all session tasks.
    pub async fn terminate(&mut self) {
        if self.state() != ClientState::Disconnected {
            match Packet::Disconnect.encode() {
                Ok(data) => {
                    if let Err(e) = self.socket.send(&data).await {
                        debug!("Could not notify server: {}", e);
                    }
                }
                Err(e) => error!("Failed to encode disconnect: {}", e),
            }
            transition(&self.state_tx, ClientState::Disconnected);
        }

        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{ActorKind, Controls, GameMode, Snapshot, Vec2};

    fn mirror() -> Arc<World> {
        Arc::new(World::new(25.0, 18.75, GameMode::default(), false))
    }

    /// Fake server socket plus its port.
    async fn fake_server() -> (UdpSocket, u16) {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = socket.local_addr().unwrap().port();
        (socket, port)
    }

    async fn recv_packet(socket: &UdpSocket) -> (Packet, SocketAddr) {
        let mut buffer = vec![0u8; MAX_DATAGRAM_SIZE];
        let (len, addr) = timeout(Duration::from_secs(2), socket.recv_from(&mut buffer))
            .await
            .expect("nothing received")
            .unwrap();
        (Packet::decode(&buffer[..len]).unwrap(), addr)
    }

    async fn reply(socket: &UdpSocket, packet: Packet, addr: SocketAddr) {
        socket.send_to(&packet.encode().unwrap(), addr).await.unwrap();
    }

    /// Connects a session to the fake server, answering as actor `id`.
    async fn accepted(id: ActorId, world: Arc<World>) -> (ClientSession, UdpSocket, SocketAddr) {
        let (server, port) = fake_server().await;
        let connecting = tokio::spawn(ClientSession::connect(
            "127.0.0.1",
            port,
            "alice",
            world,
            1,
            QuitSignal::new(),
        ));

        let (hello, client_addr) = recv_packet(&server).await;
        assert_eq!(
            hello,
            Packet::Connect {
                client_version: PROTOCOL_VERSION,
                name: "alice".into()
            }
        );
        reply(&server, Packet::Connected { client_id: id }, client_addr).await;

        let session = connecting.await.unwrap().unwrap();
        (session, server, client_addr)
    }

    fn snapshot(sequence: u64, ids: &[ActorId]) -> Snapshot {
        let source = World::new(25.0, 18.75, GameMode::default(), true);
        for (i, _) in ids.iter().enumerate() {
            source.add_actor(Vec2::new(2.0 + 3.0 * i as f32, 5.0), ActorKind::Remote, 0);
        }
        let mut snapshot = source.serialize().unwrap();
        for (state, id) in snapshot.actors.iter_mut().zip(ids) {
            state.id = *id;
        }
        snapshot.sequence = sequence;
        snapshot
    }

    #[test]
    fn test_no_snapshot_lands_after_disconnect() {
        let world = mirror();
        let (state_tx, _states) = watch::channel(ClientState::Syncing);

        assert!(apply_while_connected(&state_tx, &world, &snapshot(1, &[3])));
        transition(&state_tx, ClientState::Disconnected);
        assert!(!apply_while_connected(&state_tx, &world, &snapshot(2, &[3, 4])));

        assert_eq!(world.actor_count(), 1);
    }

    #[tokio::test]
    async fn test_large_snapshot_is_applied() {
        let world = mirror();
        let (_session, server, client_addr) = accepted(7, world.clone()).await;

        let mut big = snapshot(1, &[7, 8]);
        for state in &mut big.actors {
            state.name = "x".repeat(5000);
        }
        let packet = Packet::Snapshot(big);
        assert!(packet.encode().unwrap().len() > 8192);
        reply(&server, packet, client_addr).await;

        let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
        while world.actor_count() < 2 && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(world.actor_count(), 2);
    }

    #[tokio::test]
    async fn test_connect_timeout() {
        let (_server, port) = fake_server().await;

        let result = ClientSession::connect("127.0.0.1", port, "alice", mirror(), 1, QuitSignal::new()).await;

        assert!(matches!(result, Err(ArenaError::ConnectTimeout(_))));
    }

    #[tokio::test]
    async fn test_connect_rejected() {
        let (server, port) = fake_server().await;
        let connecting = tokio::spawn(ClientSession::connect(
            "127.0.0.1",
            port,
            "alice",
            mirror(),
            1,
            QuitSignal::new(),
        ));

        let (_, client_addr) = recv_packet(&server).await;
        reply(
            &server,
            Packet::Disconnected {
                reason: "Server full".into(),
            },
            client_addr,
        )
        .await;

        match connecting.await.unwrap() {
            Err(ArenaError::Rejected(reason)) => assert_eq!(reason, "Server full"),
            other => panic!("Unexpected result {:?}", other.map(|s| s.client_id())),
        }
    }

    #[tokio::test]
    async fn test_syncing_until_two_players() {
        let world = mirror();
        let (session, server, client_addr) = accepted(7, world.clone()).await;
        assert_eq!(session.client_id(), 7);
        assert_eq!(session.state(), ClientState::Syncing);

        reply(&server, Packet::Snapshot(snapshot(1, &[7])), client_addr).await;
        tokio::time::sleep(SYNC_POLL_INTERVAL * 2).await;
        assert_eq!(world.actor_count(), 1);
        assert_eq!(session.state(), ClientState::Syncing);

        reply(&server, Packet::Snapshot(snapshot(2, &[7, 8])), client_addr).await;
        let settled = timeout(SYNC_POLL_INTERVAL * 3, session.wait_until_active())
            .await
            .unwrap();
        assert_eq!(settled, ClientState::Active);
        world.with_actors(|actors| assert!(actors[0].is_local()));
    }

    #[tokio::test]
    async fn test_relays_local_controls() {
        let world = mirror();
        let (_session, server, client_addr) = accepted(3, world.clone()).await;
        reply(&server, Packet::Snapshot(snapshot(1, &[3])), client_addr).await;

        let jump = Controls {
            jump: true,
            ..Controls::default()
        };
        while !world.set_controls(3, jump) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let mut last_sequence = 0;
        loop {
            match recv_packet(&server).await.0 {
                Packet::Input { sequence, controls } => {
                    assert!(sequence > last_sequence);
                    last_sequence = sequence;
                    if controls == jump {
                        break;
                    }
                }
                other => panic!("Unexpected packet {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_server_disconnect_ends_session() {
        let world = mirror();
        let (session, server, client_addr) = accepted(3, world.clone()).await;

        reply(
            &server,
            Packet::Disconnected {
                reason: "Server shutting down".into(),
            },
            client_addr,
        )
        .await;

        let settled = timeout(Duration::from_secs(1), session.wait_until_active())
            .await
            .unwrap();
        assert_eq!(settled, ClientState::Disconnected);

        // Nothing is applied once the session ended
        reply(&server, Packet::Snapshot(snapshot(9, &[3, 4])), client_addr).await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(world.actor_count(), 0);
    }

    #[tokio::test]
    async fn test_terminate_sends_disconnect() {
        let (mut session, server, _) = accepted(3, mirror()).await;

        session.terminate().await;
        assert_eq!(session.state(), ClientState::Disconnected);

        loop {
            match recv_packet(&server).await.0 {
                Packet::Input { .. } => continue,
                Packet::Disconnect => break,
                other => panic!("Unexpected packet {:?}", other),
            }
        }
    }
}
