//! End-to-end tests: a real server and real client sessions over loopback UDP

use client::network::SYNC_POLL_INTERVAL;
use client::{ClientSession, ClientState};
use server::network::PLAYER_POLL_INTERVAL;
use server::{Server, ServerState};
use shared::{
    Actor, ActorId, ActorKind, Canvas, FontAlign, GameMode, QuitSignal, Rect, Viewport, World,
};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};

const TICK: Duration = Duration::from_millis(16);

struct TestServer {
    addr: SocketAddr,
    states: watch::Receiver<ServerState>,
    quit: QuitSignal,
    handle: JoinHandle<shared::Result<()>>,
}

impl TestServer {
    async fn start() -> Self {
        let mode = GameMode::load_named("deathmatch").unwrap();
        let world = Arc::new(World::new(25.0, 18.75, mode, true));
        let quit = QuitSignal::new();
        let mut server = Server::bind("127.0.0.1:0", world, TICK, 8, quit.clone())
            .await
            .unwrap();

        let addr = server.local_addr().unwrap();
        let states = server.subscribe();
        let handle = tokio::spawn(async move { server.run().await });

        Self {
            addr,
            states,
            quit,
            handle,
        }
    }

    async fn stop(self) {
        self.quit.trigger();
        self.handle.await.unwrap().unwrap();
    }
}

struct TestClient {
    session: ClientSession,
    world: Arc<World>,
    /// Distinct actor counts seen by the mirror, in order
    counts: Arc<Mutex<Vec<usize>>>,
    quit: QuitSignal,
}

impl TestClient {
    async fn join(addr: SocketAddr, name: &str) -> Self {
        let world = Arc::new(World::new(25.0, 18.75, GameMode::default(), false));
        let quit = QuitSignal::new();
        let counts = Arc::new(Mutex::new(vec![world.actor_count()]));

        // Sample the mirror from before the connect request goes out
        let sampled_world = Arc::clone(&world);
        let sampled_counts = Arc::clone(&counts);
        let sampler_quit = quit.clone();
        tokio::spawn(async move {
            while !sampler_quit.is_set() {
                let count = sampled_world.actor_count();
                {
                    let mut counts = sampled_counts.lock().unwrap();
                    if counts.last() != Some(&count) {
                        counts.push(count);
                    }
                }
                sleep(Duration::from_millis(2)).await;
            }
        });

        let session = ClientSession::connect(
            "127.0.0.1",
            addr.port(),
            name,
            Arc::clone(&world),
            1,
            quit.clone(),
        )
        .await
        .unwrap();

        Self {
            session,
            world,
            counts,
            quit,
        }
    }

    fn counts(&self) -> Vec<usize> {
        self.counts.lock().unwrap().clone()
    }

    fn ids(&self) -> Vec<ActorId> {
        self.world.actor_states().iter().map(|a| a.id).collect()
    }

    async fn leave(mut self) {
        self.session.terminate().await;
        self.quit.trigger();
    }
}

async fn until(limit: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + limit;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        sleep(Duration::from_millis(5)).await;
    }
    condition()
}

/// Counts must grow one join at a time, ending at two.
fn assert_join_sequence(counts: &[usize]) {
    assert_eq!(counts.last(), Some(&2), "counts {:?}", counts);
    assert!(counts.windows(2).all(|w| w[0] < w[1]), "counts {:?}", counts);
    assert!(counts.iter().all(|c| *c <= 2), "counts {:?}", counts);
}

#[tokio::test]
async fn two_clients_sync_and_activate_together() {
    let server = TestServer::start().await;

    let alice = TestClient::join(server.addr, "alice").await;
    assert!(until(PLAYER_POLL_INTERVAL * 3, || alice.world.actor_count() == 1).await);
    assert_eq!(alice.session.state(), ClientState::Syncing);

    let bob = TestClient::join(server.addr, "bob").await;

    let (alice_state, bob_state) = tokio::join!(
        async {
            let state = alice.session.wait_until_active().await;
            (state, Instant::now())
        },
        async {
            let state = bob.session.wait_until_active().await;
            (state, Instant::now())
        },
    );
    assert_eq!(alice_state.0, ClientState::Active);
    assert_eq!(bob_state.0, ClientState::Active);

    let apart = if alice_state.1 > bob_state.1 {
        alice_state.1 - bob_state.1
    } else {
        bob_state.1 - alice_state.1
    };
    assert!(apart <= SYNC_POLL_INTERVAL + Duration::from_millis(100), "{:?} apart", apart);

    assert_eq!(alice.counts(), vec![0, 1, 2]);
    assert_join_sequence(&bob.counts());

    let mut states = server.states.clone();
    timeout(PLAYER_POLL_INTERVAL * 3, states.wait_for(|s| *s == ServerState::Running))
        .await
        .expect("server never started running")
        .unwrap();

    alice.leave().await;
    bob.leave().await;
    server.stop().await;
}

#[tokio::test]
async fn leaving_client_disappears_from_remaining_mirror() {
    let server = TestServer::start().await;
    let alice = TestClient::join(server.addr, "alice").await;
    let bob = TestClient::join(server.addr, "bob").await;

    assert_eq!(alice.session.wait_until_active().await, ClientState::Active);
    assert_eq!(bob.session.wait_until_active().await, ClientState::Active);

    let alice_id = alice.session.client_id();
    let bob_id = bob.session.client_id();
    let mut ids = alice.ids();
    ids.sort();
    let mut expected = vec![alice_id, bob_id];
    expected.sort();
    assert_eq!(ids, expected);

    bob.leave().await;

    assert!(
        until(TICK * 10, || alice.world.actor_count() == 1).await,
        "bob still mirrored: {:?}",
        alice.ids()
    );
    assert_eq!(alice.ids(), vec![alice_id]);

    // Alice keeps driving her own actor
    sleep(TICK * 5).await;
    assert_eq!(alice.ids(), vec![alice_id]);
    alice.world.with_actors(|actors| assert!(actors[0].is_local()));

    alice.leave().await;
    server.stop().await;
}

#[tokio::test]
async fn single_player_never_leaves_waiting() {
    let server = TestServer::start().await;
    let alice = TestClient::join(server.addr, "alice").await;

    sleep(PLAYER_POLL_INTERVAL * 3).await;

    assert_eq!(*server.states.borrow(), ServerState::WaitingForPlayers);
    assert_eq!(alice.session.state(), ClientState::Syncing);
    assert_eq!(alice.world.actor_count(), 1);

    alice.leave().await;
    server.stop().await;
}

#[tokio::test]
async fn oversized_names_still_sync() {
    let server = TestServer::start().await;
    let name = "x".repeat(5000);
    let alice = TestClient::join(server.addr, &name).await;
    let bob = TestClient::join(server.addr, &name).await;

    for client in [&alice, &bob] {
        let state = timeout(PLAYER_POLL_INTERVAL * 6, client.session.wait_until_active())
            .await
            .expect("session never settled");
        assert_eq!(state, ClientState::Active);
        assert_eq!(client.world.actor_count(), 2);
        for (name, _) in client.world.scoreboard() {
            assert_eq!(name, "x".repeat(shared::MAX_NAME_LEN));
        }
    }

    alice.leave().await;
    bob.leave().await;
    server.stop().await;
}

#[tokio::test]
async fn server_shutdown_disconnects_clients() {
    let server = TestServer::start().await;
    let alice = TestClient::join(server.addr, "alice").await;

    server.stop().await;

    let state = timeout(Duration::from_secs(1), alice.session.wait_until_active())
        .await
        .unwrap();
    assert_eq!(state, ClientState::Disconnected);
}

#[test]
fn snapshot_reproduces_world_in_fresh_mirror() {
    let source = World::new(25.0, 18.75, GameMode::default(), true);
    source.add_actor_named(shared::Vec2::new(2.0, 2.0), ActorKind::Remote, 0, "alice".to_string());
    source.add_actor(shared::Vec2::new(12.0, 2.0), ActorKind::Ai, 0);
    for _ in 0..50 {
        source.advance(shared::TIMESTEP);
    }

    let snapshot = source.serialize().unwrap();
    let mirror = World::new(25.0, 18.75, GameMode::default(), false);
    assert!(mirror.apply_snapshot(&snapshot));

    assert_eq!(mirror.actor_states(), source.actor_states());
    assert_eq!(mirror.scoreboard(), source.scoreboard());
    assert_eq!(mirror.tick(), source.tick());

    // Duplicate and reordered deliveries change nothing
    source.with_actors_mut(|actors| actors[0].body.x += 1.0);
    let newer = source.serialize().unwrap();
    assert!(newer.sequence > snapshot.sequence);
    assert!(mirror.apply_snapshot(&newer));
    assert!(!mirror.apply_snapshot(&newer));
    assert!(!mirror.apply_snapshot(&snapshot));
    assert_eq!(mirror.actor_states(), newer.actors);
}

/// Canvas that keeps what it was asked to draw.
#[derive(Default)]
struct Recorder {
    blocks: Vec<Rect>,
    actors: Vec<Rect>,
}

impl Canvas for Recorder {
    fn begin(&mut self, _viewport: &Viewport) {}

    fn draw_block(&mut self, block: &Rect) {
        self.blocks.push(*block);
    }

    fn draw_actor(&mut self, actor: &Actor) {
        self.actors.push(actor.body.rect());
    }

    fn draw_text(&mut self, _x: f32, _y: f32, _text: &str, _align: FontAlign) {}
}

#[test]
fn spawn_points_are_never_occupied() {
    let world = World::new(25.0, 18.75, GameMode::default(), true);

    while let Some(spawn) = world.random_spawn_locked() {
        let mut scene = Recorder::default();
        world.draw(&mut scene);

        let candidate = Rect::actor_at(spawn);
        assert!(scene.blocks.iter().all(|b| !b.intersects(&candidate)));
        assert!(scene.actors.iter().all(|a| !a.intersects(&candidate)));

        world.add_actor(spawn, ActorKind::Ai, 0);
        assert!(world.actor_count() < 100);
    }
}

#[test]
fn snapshots_never_see_half_applied_joins() {
    let world = Arc::new(World::new(25.0, 18.75, GameMode::default(), true));
    let quit = QuitSignal::new();

    let churn = {
        let world = Arc::clone(&world);
        thread::spawn(move || {
            for _ in 0..200 {
                let id = world.add_actor(shared::Vec2::new(3.0, 2.0), ActorKind::Ai, 0);
                world.advance(shared::TIMESTEP);
                assert!(world.remove_actor(id));
            }
        })
    };

    let observer = {
        let world = Arc::clone(&world);
        let quit = quit.clone();
        thread::spawn(move || {
            let mut seen = 0;
            while !quit.is_set() {
                if let Some(snapshot) = world.serialize() {
                    assert!(snapshot.actors.len() <= 1);
                    seen += 1;
                }
            }
            seen
        })
    };

    churn.join().unwrap();
    quit.trigger();
    assert!(observer.join().unwrap() > 0);
    assert_eq!(world.actor_count(), 0);
}
