use bomber_arena::config::ArenaConfig;
use bomber_arena::engine::GameEngine;
use bomber_arena::types::{Direction, Intent, Snapshot};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about = "Real-time bomber arena driven by stdin commands")]
struct Cli {
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    seed: Option<u32>,
    #[arg(long)]
    agents: Option<usize>,
    /// Stop after this many ticks even without a quit command.
    #[arg(long)]
    max_ticks: Option<u64>,
    /// Log a state line every N ticks.
    #[arg(long, default_value_t = 25)]
    log_every: u64,
    /// Print every tick-end snapshot as a JSON line on stdout.
    #[arg(long)]
    snapshots: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let mut config = match cli.config.as_deref() {
        Some(path) => match ArenaConfig::load(path) {
            Ok(config) => config,
            Err(error) => {
                error!(%error, "failed to load config");
                std::process::exit(2);
            }
        },
        None => ArenaConfig {
            seed: rand::random::<u32>(),
            ..ArenaConfig::default()
        },
    };
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    if let Some(agents) = cli.agents {
        config.agent_count = agents;
    }

    let mut engine = match GameEngine::new(config) {
        Ok(engine) => engine,
        Err(error) => {
            error!(%error, "invalid arena config");
            std::process::exit(2);
        }
    };
    info!(
        seed = engine.config.seed,
        width = engine.map.width,
        height = engine.map.height,
        "arena ready; commands: w/a/s/d, bomb, compare, quit"
    );

    let (tx, mut rx) = mpsc::channel::<Intent>(64);
    tokio::spawn(read_commands(tx));

    let tick_ms = engine.config.tick_ms;
    let mut interval = tokio::time::interval(Duration::from_millis(tick_ms));
    let mut input_open = true;
    loop {
        tokio::select! {
            _ = interval.tick() => {
                engine.step(tick_ms);
                let snapshot = engine.build_snapshot();
                if cli.snapshots {
                    print_json(&snapshot);
                }
                if cli.log_every > 0 && snapshot.tick % cli.log_every == 0 {
                    log_tick(&snapshot);
                }
                if engine.is_ended() || cli.max_ticks.is_some_and(|max| snapshot.tick >= max) {
                    break;
                }
            }
            received = rx.recv(), if input_open => match received {
                Some(intent) => engine.queue_intent(intent),
                None => input_open = false,
            },
        }
    }

    let summary = engine.build_summary();
    info!(ticks = summary.ticks, score = summary.player_score, "arena closed");
    print_json(&summary);
}

async fn read_commands(tx: mpsc::Sender<Intent>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match parse_command(&line) {
                Some(intent) => {
                    if tx.send(intent).await.is_err() {
                        break;
                    }
                }
                None if line.trim().is_empty() => {}
                None => warn!(command = %line.trim(), "unknown command"),
            },
            Ok(None) => break,
            Err(error) => {
                warn!(%error, "stdin read failed");
                break;
            }
        }
    }
}

/// Maps one input line to an intent. Words combine, e.g. `bomb d`.
fn parse_command(line: &str) -> Option<Intent> {
    let mut intent = Intent::default();
    for word in line.split_whitespace() {
        let word = word.to_ascii_lowercase();
        match word.as_str() {
            "bomb" | "b" | "space" => intent.place_bomb = true,
            "quit" | "q" | "exit" => intent.quit = true,
            "compare" | "c" => intent.compare_paths = true,
            other => intent.movement = Some(Direction::parse_move(other)?),
        }
    }
    (!intent.is_idle()).then_some(intent)
}

fn log_tick(snapshot: &Snapshot) {
    let player = snapshot.players.first();
    info!(
        tick = snapshot.tick,
        now_ms = snapshot.now_ms,
        player_x = player.map(|p| p.x),
        player_y = player.map(|p| p.y),
        health = player.map(|p| p.health),
        score = player.map(|p| p.score),
        agents_alive = snapshot.agents.iter().filter(|a| a.alive).count(),
        bombs = snapshot.bombs.len(),
        power_ups = snapshot.power_ups.len(),
        "tick"
    );
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(line) => println!("{line}"),
        Err(error) => error!(%error, "failed to serialize output"),
    }
}
