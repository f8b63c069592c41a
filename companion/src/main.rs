//! HA9 companion - drives the e-ink panel daemon and the chess replay.
//!
//! The `run` subcommand is the long-running service:
//!
//! 1. Opens the command transport: the daemon's Unix socket when
//!    `HA9_COMMAND_SOCKET` is set, stdout otherwise.
//! 2. Restores per-app display modes from the JSON preference file.
//! 3. Replays a randomly sampled chess game, one move per tick.
//! 4. Reads device events from stdin (see [`events`]) and turns them into
//!    panel commands.
//!
//! See [`config`] for all tunables.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chess::{parse_collection, CollectionSource, GameSession, GameSource, PgnFileSource};
use clap::{Parser, Subcommand};
use eink::{
    BrightnessGate, ChannelError, Command, CommandChannel, CommandParseError, DisplayController,
    JsonPreferences, PreferenceError, Preferences, UnixSocketChannel, WriterChannel,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;
mod events;

use events::{Event, ReaderAction};

/// Top-level CLI arguments.
#[derive(Parser)]
#[command(name = "ha9-companion", about = "E-ink display companion service")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the service: chess ticks plus stdin device events.
    Run {
        /// Daemon socket; overrides `HA9_COMMAND_SOCKET`.
        #[arg(long)]
        socket: Option<PathBuf>,
        /// Seconds between chess moves; overrides `HA9_CHESS_TICK_SECS`.
        #[arg(long)]
        tick_secs: Option<u64>,
        /// Game collection; overrides `HA9_GAMES_PATH`.
        #[arg(long)]
        games: Option<PathBuf>,
    },
    /// Replay sampled games and print the board after every move.
    Replay {
        /// Number of moves to play.
        #[arg(short, long, default_value_t = 10)]
        moves: usize,
        /// Seed for game sampling, for reproducible output.
        #[arg(long)]
        seed: Option<u64>,
        /// Load the whole collection and show every game once per round.
        #[arg(long)]
        all: bool,
        /// Print one JSON object per move instead of the board.
        #[arg(long)]
        json: bool,
        #[arg(long)]
        games: Option<PathBuf>,
    },
    /// List the games of a collection.
    Games {
        #[arg(long)]
        games: Option<PathBuf>,
    },
    /// Validate raw commands and send them to the daemon.
    Send {
        /// Wire tokens such as `r`, `sb1400` or `stl12`.
        #[arg(required = true)]
        commands: Vec<String>,
        #[arg(long)]
        socket: Option<PathBuf>,
    },
}

/// Error type for CLI operations.
#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("command channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("invalid command: {0}")]
    InvalidCommand(#[from] CommandParseError),

    #[error("preference store error: {0}")]
    Preferences(#[from] PreferenceError),

    #[error("failed to read game collection {0}: {1}")]
    Games(PathBuf, #[source] std::io::Error),
}

/// Install the tracing subscriber. With a log directory, logs go to a
/// daily-rolling file; otherwise to stderr so stdout stays free for commands.
fn init_tracing(log_dir: Option<&Path>) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).ok();
            let file_appender = tracing_appender::rolling::daily(dir, "ha9-companion");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_writer(non_blocking)
                        .with_ansi(false)
                        .with_target(true)
                        .with_line_number(true),
                )
                .with(filter)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_span_events(fmt::format::FmtSpan::CLOSE)
                .init();
            None
        }
    }
}

/// Open the command transport. A socket transport keeps retrying until the
/// daemon accepts or the configured timeout runs out.
fn open_channel(socket: Option<PathBuf>) -> Result<Box<dyn CommandChannel>, CliError> {
    let mut channel: Box<dyn CommandChannel> = match socket {
        Some(path) => {
            tracing::info!("Sending commands to {}", path.display());
            Box::new(UnixSocketChannel::new(path).with_connect_timeout(
                Duration::from_secs(config::get_socket_timeout_secs()),
                Duration::from_millis(config::get_socket_poll_interval_ms()),
            ))
        }
        None => {
            tracing::info!("Sending commands to stdout");
            Box::new(WriterChannel::stdout())
        }
    };
    channel.open()?;
    Ok(channel)
}

/// Game source for the configured collection, re-hosted into the cache
/// directory when possible.
fn game_source(games: &Path, seed: Option<u64>) -> PgnFileSource {
    use chess::pgn::sampler::rehost_asset;

    let path = match rehost_asset(games, &config::get_cache_dir()) {
        Ok(cached) => cached,
        Err(e) => {
            tracing::warn!("Using {} directly, caching failed: {}", games.display(), e);
            games.to_path_buf()
        }
    };
    match seed {
        Some(seed) => PgnFileSource::seeded(path, seed),
        None => PgnFileSource::new(path),
    }
}

fn spawn_flush(after: Duration, tx: &mpsc::Sender<()>) {
    let tx = tx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(after).await;
        let _ = tx.send(()).await;
    });
}

/// Apply one device event. Returns `false` when the loop should stop.
fn handle_event<C, P>(
    controller: &mut DisplayController<C, P>,
    event: Event,
    flush_tx: &mpsc::Sender<()>,
) -> bool
where
    C: CommandChannel,
    P: Preferences,
{
    match event {
        Event::App(package) => controller.on_app_change(&package),
        Event::Refresh(mode) => controller.change_refresh_mode(mode),
        Event::Clear => controller.force_clear(),
        Event::Opacity(opacity) => controller.change_opacity(opacity),
        Event::Reader(ReaderAction::On) => controller.set_reader_mode(true),
        Event::Reader(ReaderAction::Off) => controller.set_reader_mode(false),
        Event::Reader(ReaderAction::Toggle) => controller.toggle_reader_mode(),
        Event::Temperature(mode) => controller.set_temperature_mode(mode),
        Event::Brightness(value) => {
            if let BrightnessGate::Scheduled { after } = controller.set_brightness(value, Instant::now()) {
                spawn_flush(after, flush_tx);
            }
        }
        Event::Mix(value) => {
            if let BrightnessGate::Scheduled { after } =
                controller.set_white_to_yellow(value, Instant::now())
            {
                spawn_flush(after, flush_tx);
            }
        }
        Event::Screen(on) => controller.on_screen_change(on),
        Event::Disable(disabled) => controller.set_temperature_disabled(disabled),
        Event::Pref { key, value } => {
            match events::store_preference(controller.prefs_mut(), &key, &value) {
                Ok(()) => controller.on_preference_changed(&key),
                Err(e) => tracing::warn!("Failed to store preference {}: {}", key, e),
            }
        }
        Event::Quit => return false,
    }
    true
}

fn log_tick<S: GameSource>(session: &GameSession<S>) {
    let Some(game) = session.game() else {
        return;
    };
    tracing::info!(
        white = %game.white_player,
        black = %game.black_player,
        white_result = %game.current_white_result,
        black_result = %game.current_black_result,
        "Move {}/{}",
        game.current_move,
        game.moves.len()
    );
    tracing::debug!("\n{}", session.board());
}

async fn run(socket: Option<PathBuf>, tick: Duration, games: PathBuf) -> Result<(), CliError> {
    let channel = tokio::task::block_in_place(|| open_channel(socket))?;
    let prefs = JsonPreferences::open(config::get_prefs_path())?;
    tracing::info!("Preferences at {}", prefs.path().display());

    let mut controller = DisplayController::new(channel, prefs);
    controller.apply_panel_tuning();

    let mut session = GameSession::new(game_source(&games, None));
    let mut ticker = tokio::time::interval(tick);
    let (flush_tx, mut flush_rx) = mpsc::channel::<()>(8);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                session.tick();
                log_tick(&session);
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) if line.trim().is_empty() => {}
                Ok(Some(line)) => match events::parse_event(&line) {
                    Ok(event) => {
                        if !handle_event(&mut controller, event, &flush_tx) {
                            break;
                        }
                    }
                    Err(e) => tracing::warn!("Ignoring event {:?}: {}", line, e),
                },
                Ok(None) => {
                    tracing::info!("Event input closed, continuing with chess only");
                    stdin_open = false;
                }
                Err(e) => {
                    tracing::warn!("Failed to read events: {}", e);
                    stdin_open = false;
                }
            },
            Some(()) = flush_rx.recv() => controller.flush_brightness(),
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            }
        }
    }

    controller.shutdown();
    tracing::info!("HA9 companion shutting down");
    Ok(())
}

fn read_collection(games: &Path) -> Result<Vec<chess::ChessGame>, CliError> {
    let text = std::fs::read(games).map_err(|e| CliError::Games(games.to_path_buf(), e))?;
    Ok(parse_collection(&String::from_utf8_lossy(&text)))
}

/// One replayed move as a JSON line.
fn tick_json<S: GameSource>(session: &GameSession<S>, outcome: &chess::TickOutcome) -> serde_json::Value {
    let game = session.game();
    serde_json::json!({
        "white": game.map(|g| g.white_player.as_str()),
        "black": game.map(|g| g.black_player.as_str()),
        "move": game.and_then(|g| g.moves.get(outcome.move_index)),
        "tick": outcome,
        "placement": session.board().placement(),
    })
}

fn replay<S: GameSource>(mut session: GameSession<S>, moves: usize, json: bool) {
    for _ in 0..moves {
        let outcome = session.tick();
        if json {
            println!("{}", tick_json(&session, &outcome));
            continue;
        }
        if let Some(game) = session.game() {
            if outcome.new_game {
                println!(
                    "=== {} vs {} ({}, {}) ===",
                    game.white_player, game.black_player, game.event, game.date
                );
            }
            println!(
                "Move {}/{}  {} {}",
                outcome.move_index + 1,
                game.moves.len(),
                outcome.white_result,
                outcome.black_result
            );
        }
        println!("{}", session.board());
    }
}

fn list_games(games: &Path) -> Result<(), CliError> {
    let collection = read_collection(games)?;
    for (index, game) in collection.iter().enumerate() {
        println!(
            "{:>3}. {} vs {} | {} {} | {} moves{}",
            index + 1,
            game.white_player,
            game.black_player,
            game.event,
            game.date,
            game.moves.len(),
            if game.is_playable() { "" } else { " (skipped)" }
        );
    }
    println!("{} games", collection.len());
    Ok(())
}

async fn send(wire: &[String], socket: Option<PathBuf>) -> Result<(), CliError> {
    let commands = wire
        .iter()
        .map(|token| Command::parse(token))
        .collect::<Result<Vec<_>, _>>()?;
    let mut channel = tokio::task::block_in_place(|| open_channel(socket))?;
    channel.send(&commands)?;
    channel.close()?;
    tracing::info!("Sent {} commands", commands.len());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _guard = init_tracing(config::get_log_dir().as_deref());

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            socket,
            tick_secs,
            games,
        } => {
            let socket = socket.or_else(config::get_command_socket);
            let tick = Duration::from_secs(tick_secs.unwrap_or_else(config::get_chess_tick_secs).max(1));
            let games = games.unwrap_or_else(config::get_games_path);
            tracing::info!("Starting HA9 companion");
            run(socket, tick, games).await?;
        }
        Commands::Replay {
            moves,
            seed,
            all,
            json,
            games,
        } => {
            let games = games.unwrap_or_else(config::get_games_path);
            if all {
                let collection = read_collection(&games)?;
                let source = match seed {
                    Some(seed) => CollectionSource::seeded(collection, seed),
                    None => CollectionSource::new(collection),
                };
                replay(GameSession::new(source), moves, json);
            } else {
                replay(GameSession::new(game_source(&games, seed)), moves, json);
            }
        }
        Commands::Games { games } => {
            list_games(&games.unwrap_or_else(config::get_games_path))?;
        }
        Commands::Send { commands, socket } => {
            send(&commands, socket.or_else(config::get_command_socket)).await?;
        }
    }

    Ok(())
}
