mod cli;

use cli::{Mode, Outcome};
use log::info;
use shared::config::WORLD_WIDTH;
use shared::keys::KEYS_FILE;
use shared::{paths, ArenaError, Config, GameMode, KeyBindings, QuitSignal, Result, World};
use std::cell::RefCell;
use std::process;
use std::rc::Rc;
use std::sync::Arc;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = match cli::parse(std::env::args_os()) {
        Outcome::Run(args) => args,
        Outcome::Exit {
            code,
            message,
            stderr,
        } => {
            if stderr {
                eprintln!("{}", message.trim_end());
            } else {
                println!("{}", message.trim_end());
            }
            process::exit(code);
        }
    };

    if let Err(e) = run(args) {
        eprintln!("-!- FATAL ERROR: {}", e);
    }
}

fn run(args: cli::Args) -> Result<()> {
    let config = Config::load_default()?;
    let mode = args.mode(&config)?;

    let gamemode_name = args
        .gamemode
        .clone()
        .unwrap_or_else(|| config.default_gamemode.clone());
    let gamemode = GameMode::load_named(&gamemode_name)?;
    info!("Game mode: {} ({:?})", gamemode.name, gamemode.gameplay);

    match mode {
        Mode::Interactive => run_interactive(&args, config, gamemode),
        Mode::Server { port } => run_server(port, &config, gamemode),
        Mode::Client { host, port } => run_client(&args, &host, port, config, gamemode),
    }
}

fn window_conf(config: &Config) -> macroquad::window::Conf {
    macroquad::window::Conf {
        window_title: "Arena".to_string(),
        window_width: config.screen_width as i32,
        window_height: config.screen_height as i32,
        fullscreen: config.fullscreen,
        ..Default::default()
    }
}

/// Runs the frame loop in a macroquad window until quit. `macroquad` owns
/// the main thread while the window is open; `on_exit` runs inside the
/// window future once the loop ends.
fn open_window(
    config: Config,
    world: Arc<World>,
    quit: QuitSignal,
    session: Option<tokio::sync::watch::Receiver<client::ClientState>>,
    on_exit: impl FnOnce() + 'static,
) -> Result<()> {
    let failure: Rc<RefCell<Option<ArenaError>>> = Rc::new(RefCell::new(None));
    let slot = Rc::clone(&failure);
    let conf = window_conf(&config);

    macroquad::Window::from_config(conf, async move {
        let result = client::game::run(world, &config, quit.clone(), session).await;
        quit.trigger();
        on_exit();
        if let Err(e) = result {
            *slot.borrow_mut() = Some(e);
        }
    });

    let outcome = failure.borrow_mut().take();
    match outcome {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn load_world(config: &Config, gamemode: GameMode, authoritative: bool) -> Result<Arc<World>> {
    let world = World::new(WORLD_WIDTH, config.world_height(), gamemode, authoritative);
    world.set_key_bindings(KeyBindings::load(paths::file_path(KEYS_FILE))?);
    Ok(Arc::new(world))
}

fn run_interactive(args: &cli::Args, config: Config, gamemode: GameMode) -> Result<()> {
    let world = load_world(&config, gamemode, true)?;
    let added = client::game::populate_local(&world, args.players, args.ai);
    info!("Starting local game with {} actors", added);

    open_window(config, world, QuitSignal::new(), None, || {})
}

#[cfg(feature = "network")]
fn run_server(port: u16, config: &Config, gamemode: GameMode) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;

    runtime.block_on(async {
        let world = Arc::new(World::new(
            WORLD_WIDTH,
            config.world_height(),
            gamemode,
            true,
        ));
        let quit = QuitSignal::new();
        let mut server = server::Server::bind(
            &format!("0.0.0.0:{}", port),
            world,
            config.tick_duration(),
            config.max_clients,
            quit.clone(),
        )
        .await?;

        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupted, shutting down");
                quit.trigger();
            }
        });

        server.run().await
    })
}

#[cfg(feature = "network")]
fn run_client(
    args: &cli::Args,
    host: &str,
    port: u16,
    config: Config,
    gamemode: GameMode,
) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    let world = load_world(&config, gamemode, false)?;
    let quit = QuitSignal::new();

    let mut session = runtime.block_on(client::ClientSession::connect(
        host,
        port,
        &args.name,
        Arc::clone(&world),
        1,
        quit.clone(),
    ))?;

    let states = session.subscribe();
    let handle = runtime.handle().clone();
    open_window(config, world, quit, Some(states), move || {
        handle.block_on(session.terminate());
        info!("Left the server");
    })
}

#[cfg(not(feature = "network"))]
fn run_server(_port: u16, _config: &Config, _gamemode: GameMode) -> Result<()> {
    Err(ArenaError::NetworkingDisabled)
}

#[cfg(not(feature = "network"))]
fn run_client(
    _args: &cli::Args,
    _host: &str,
    _port: u16,
    _config: Config,
    _gamemode: GameMode,
) -> Result<()> {
    Err(ArenaError::NetworkingDisabled)
}
