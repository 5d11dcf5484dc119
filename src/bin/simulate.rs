use bomber_arena::config::ArenaConfig;
use bomber_arena::engine::GameEngine;
use bomber_arena::rng::Rng;
use bomber_arena::types::{Direction, GameOverReason, Intent, Snapshot};
use chrono::{SecondsFormat, Utc};
use clap::Parser;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Salt for the scripted player's input stream, kept apart from the engine's.
const WANDER_SALT: u32 = 0x5eed_1234;
const WANDER_MOVE_CHANCE: f64 = 0.8;
const WANDER_BOMB_CHANCE: f64 = 0.05;

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless batch runner for the bomber arena")]
struct Cli {
    /// JSON session config; flags below override its fields.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    seed: Option<u32>,
    #[arg(long, default_value_t = 1_500)]
    ticks: u64,
    #[arg(long)]
    agents: Option<usize>,
    #[arg(long)]
    width: Option<i32>,
    #[arg(long)]
    height: Option<i32>,
    #[arg(long, default_value_t = 1)]
    runs: u32,
    /// Drive the player with scripted random input instead of leaving it idle.
    #[arg(long)]
    wander: bool,
    #[arg(long)]
    match_id: Option<String>,
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

#[derive(Clone, Debug)]
struct Scenario {
    name: String,
    config: ArenaConfig,
    ticks: u64,
    wander: bool,
}

#[derive(Clone, Debug, Serialize)]
struct ScenarioResultLine {
    scenario: String,
    seed: u32,
    width: i32,
    height: i32,
    agents: usize,
    ticks: u64,
    reason: Option<GameOverReason>,
    #[serde(rename = "elapsedMs")]
    elapsed_ms: u64,
    #[serde(rename = "playerScore")]
    player_score: i32,
    #[serde(rename = "playerHealth")]
    player_health: i32,
    #[serde(rename = "agentsAlive")]
    agents_alive: usize,
    #[serde(rename = "bombsDetonated")]
    bombs_detonated: u32,
    #[serde(rename = "softWallsDestroyed")]
    soft_walls_destroyed: u32,
    #[serde(rename = "powerUpsCollected")]
    power_ups_collected: u32,
    anomalies: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
struct AnomalyRecord {
    tick: u64,
    message: String,
}

#[derive(Clone, Debug)]
struct ScenarioRunResult {
    result: ScenarioResultLine,
    anomaly_records: Vec<AnomalyRecord>,
}

#[derive(Clone, Debug, Serialize)]
struct RunSummary {
    #[serde(rename = "matchId")]
    match_id: String,
    #[serde(rename = "startedAt")]
    started_at: String,
    #[serde(rename = "finishedAt")]
    finished_at: String,
    #[serde(rename = "scenarioCount")]
    scenario_count: usize,
    #[serde(rename = "anomalyCount")]
    anomaly_count: usize,
    #[serde(rename = "averageElapsedMs")]
    average_elapsed_ms: u64,
    #[serde(rename = "reasonCounts")]
    reason_counts: BTreeMap<String, usize>,
    scenarios: Vec<ScenarioResultLine>,
}

fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    let scenarios = match resolve_scenarios(&cli) {
        Ok(scenarios) => scenarios,
        Err(error) => {
            error!(%error, "invalid simulation config");
            std::process::exit(2);
        }
    };
    let started_at = timestamp();
    let seed_hint = scenarios
        .first()
        .map(|scenario| scenario.config.seed)
        .unwrap_or(0);
    let match_id = cli
        .match_id
        .clone()
        .unwrap_or_else(|| default_match_id(seed_hint, Utc::now().timestamp_millis()));

    let mut has_anomaly = false;
    let mut scenario_results = Vec::new();
    let mut total_anomalies = 0usize;

    for scenario in scenarios {
        info!(
            match_id = %match_id,
            scenario = %scenario.name,
            seed = scenario.config.seed,
            agents = scenario.config.agent_count,
            ticks = scenario.ticks,
            "scenario started"
        );
        let scenario_run = match run_scenario(&scenario) {
            Ok(run) => run,
            Err(error) => {
                error!(scenario = %scenario.name, %error, "engine rejected config");
                std::process::exit(2);
            }
        };

        for anomaly in &scenario_run.anomaly_records {
            warn!(
                scenario = %scenario.name,
                tick = anomaly.tick,
                message = %anomaly.message,
                "anomaly detected"
            );
        }
        if !scenario_run.result.anomalies.is_empty() {
            has_anomaly = true;
        }
        total_anomalies += scenario_run.anomaly_records.len();

        info!(
            scenario = %scenario.name,
            reason = reason_key(scenario_run.result.reason),
            elapsed_ms = scenario_run.result.elapsed_ms,
            agents_alive = scenario_run.result.agents_alive,
            anomalies = scenario_run.anomaly_records.len(),
            "scenario finished"
        );

        match serde_json::to_string(&scenario_run.result) {
            Ok(line) => println!("{line}"),
            Err(error) => error!(%error, "failed to serialize scenario result"),
        }
        scenario_results.push(scenario_run.result);
    }

    let summary = build_run_summary(
        match_id.clone(),
        started_at,
        timestamp(),
        scenario_results,
        total_anomalies,
    );

    if let Some(path) = cli.summary_out.as_ref() {
        if let Err(error) = write_summary(path, &summary) {
            error!(path = %path.display(), %error, "summary write failed");
            std::process::exit(2);
        }
    }

    info!(
        match_id = %match_id,
        scenarios = summary.scenario_count,
        anomalies = summary.anomaly_count,
        average_elapsed_ms = summary.average_elapsed_ms,
        "run finished"
    );

    if has_anomaly {
        std::process::exit(1);
    }
}

fn resolve_scenarios(cli: &Cli) -> Result<Vec<Scenario>, String> {
    let mut base = match cli.config.as_deref() {
        Some(path) => ArenaConfig::load(path).map_err(|error| error.to_string())?,
        None => ArenaConfig::default(),
    };
    if let Some(agents) = cli.agents {
        base.agent_count = agents;
    }
    if let Some(width) = cli.width {
        base.width = width;
    }
    if let Some(height) = cli.height {
        base.height = height;
    }
    let seed = cli.seed.unwrap_or_else(|| {
        if cli.config.is_some() {
            base.seed
        } else {
            rand::random::<u32>()
        }
    });
    base.validate().map_err(|error| error.to_string())?;

    Ok((0..cli.runs.max(1))
        .map(|run| {
            let config = ArenaConfig {
                seed: seed.wrapping_add(run),
                ..base.clone()
            };
            Scenario {
                name: format!("arena-{}x{}-run{}", config.width, config.height, run + 1),
                config,
                ticks: cli.ticks,
                wander: cli.wander,
            }
        })
        .collect())
}

fn run_scenario(scenario: &Scenario) -> Result<ScenarioRunResult, String> {
    let mut engine =
        GameEngine::new(scenario.config.clone()).map_err(|error| error.to_string())?;
    let mut input_rng = Rng::new(scenario.config.seed ^ WANDER_SALT);
    let mut anomalies = Vec::new();
    let mut anomaly_records = Vec::new();
    let mut anomaly_seen = HashSet::new();

    for _ in 0..scenario.ticks {
        if engine.is_ended() {
            break;
        }
        if scenario.wander {
            engine.queue_intent(wander_intent(&mut input_rng));
        }
        engine.step(scenario.config.tick_ms);
        let snapshot = engine.build_snapshot();
        for message in collect_snapshot_anomalies(&snapshot, scenario.config.message_capacity) {
            push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                snapshot.tick,
                message,
            );
        }
    }

    let summary = engine.build_summary();
    Ok(ScenarioRunResult {
        result: ScenarioResultLine {
            scenario: scenario.name.clone(),
            seed: scenario.config.seed,
            width: scenario.config.width,
            height: scenario.config.height,
            agents: scenario.config.agent_count,
            ticks: summary.ticks,
            reason: summary.reason,
            elapsed_ms: summary.elapsed_ms,
            player_score: summary.player_score,
            player_health: summary.player_health,
            agents_alive: summary.agents_alive,
            bombs_detonated: summary.bombs_detonated,
            soft_walls_destroyed: summary.soft_walls_destroyed,
            power_ups_collected: summary.power_ups_collected,
            anomalies,
        },
        anomaly_records,
    })
}

fn wander_intent(rng: &mut Rng) -> Intent {
    let movement = if rng.bool(WANDER_MOVE_CHANCE) {
        rng.pick(&Direction::CARDINALS).copied()
    } else {
        None
    };
    Intent {
        movement,
        place_bomb: rng.bool(WANDER_BOMB_CHANCE),
        ..Intent::default()
    }
}

fn collect_snapshot_anomalies(snapshot: &Snapshot, message_capacity: usize) -> Vec<String> {
    let mut anomalies = Vec::new();
    let glyph_at = |x: i32, y: i32| {
        usize::try_from(y)
            .ok()
            .and_then(|row| snapshot.tiles.get(row))
            .and_then(|row| usize::try_from(x).ok().and_then(|col| row.chars().nth(col)))
    };

    let mut bombs_by_owner: HashMap<u32, i32> = HashMap::new();
    for bomb in &snapshot.bombs {
        *bombs_by_owner.entry(bomb.owner_id).or_insert(0) += 1;
    }

    for combatant in snapshot.players.iter().chain(snapshot.agents.iter()) {
        if combatant.bombs_active < 0 || combatant.bombs_active > combatant.max_bombs {
            anomalies.push(format!(
                "bomb count out of range: {} {}/{}",
                combatant.id, combatant.bombs_active, combatant.max_bombs
            ));
        }
        let owned = bombs_by_owner.get(&combatant.id).copied().unwrap_or(0);
        if owned != combatant.bombs_active {
            anomalies.push(format!(
                "bomb count drift: {} tracks {} but owns {owned}",
                combatant.id, combatant.bombs_active
            ));
        }
        if combatant.alive && combatant.health <= 0 {
            anomalies.push(format!("alive with no health: {}", combatant.id));
        }
        if glyph_at(combatant.x, combatant.y) != Some('.') {
            anomalies.push(format!(
                "combatant inside a wall: {} at {},{}",
                combatant.id, combatant.x, combatant.y
            ));
        }
    }

    for power_up in &snapshot.power_ups {
        if glyph_at(power_up.x, power_up.y) != Some('.') {
            anomalies.push(format!(
                "power-up inside a wall at {},{}",
                power_up.x, power_up.y
            ));
        }
    }

    if snapshot.messages.len() > message_capacity {
        anomalies.push(format!(
            "message log overflow: {} > {message_capacity}",
            snapshot.messages.len()
        ));
    }
    anomalies
}

fn push_anomaly(
    anomalies: &mut Vec<String>,
    anomaly_records: &mut Vec<AnomalyRecord>,
    anomaly_seen: &mut HashSet<String>,
    tick: u64,
    message: String,
) {
    anomaly_records.push(AnomalyRecord {
        tick,
        message: message.clone(),
    });
    if anomaly_seen.insert(message.clone()) {
        anomalies.push(message);
    }
}

fn default_match_id(seed: u32, timestamp_ms: i64) -> String {
    format!("sim-{seed}-{timestamp_ms}")
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn reason_key(reason: Option<GameOverReason>) -> &'static str {
    match reason {
        Some(GameOverReason::Quit) => "quit",
        Some(GameOverReason::PlayerDown) => "player_down",
        None => "running",
    }
}

fn build_run_summary(
    match_id: String,
    started_at: String,
    finished_at: String,
    scenarios: Vec<ScenarioResultLine>,
    anomaly_count: usize,
) -> RunSummary {
    let scenario_count = scenarios.len();
    let total_elapsed_ms: u64 = scenarios.iter().map(|s| s.elapsed_ms).sum();
    let average_elapsed_ms = if scenario_count == 0 {
        0
    } else {
        total_elapsed_ms / scenario_count as u64
    };
    let mut reason_counts = BTreeMap::new();
    for scenario in &scenarios {
        *reason_counts
            .entry(reason_key(scenario.reason).to_string())
            .or_insert(0) += 1;
    }
    RunSummary {
        match_id,
        started_at,
        finished_at,
        scenario_count,
        anomaly_count,
        average_elapsed_ms,
        reason_counts,
        scenarios,
    }
}

fn write_summary(path: &Path, summary: &RunSummary) -> io::Result<()> {
    let summary_text = serde_json::to_string_pretty(summary).map_err(io::Error::other)?;
    std::fs::write(path, summary_text)
}
