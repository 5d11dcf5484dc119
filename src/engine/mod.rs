use std::collections::{BTreeSet, HashSet, VecDeque};

use tracing::{debug, info};

use crate::config::ArenaConfig;
use crate::constants::{AGENT_SPAWN_TRIES, PLAYER_START};
use crate::error::ConfigError;
use crate::pathfinding::PathComparison;
use crate::rng::Rng;
use crate::types::{
    AgentState, BombView, Cell, CombatantView, Direction, ExplosionView, GameOverReason,
    GameSummary, Intent, PowerUpFlash, PowerUpView, Role, Snapshot, TileKind,
};
use crate::world::GameMap;

mod agent_system;
mod blast_system;
mod danger_system;
mod diagnostics;
mod utils;

use self::utils::{first_min_by_key, manhattan, offset};

/// Separates the engine's decision stream from the map generation stream.
const ENGINE_RNG_SALT: u32 = 0x9e37_79b9;

#[derive(Clone, Debug)]
struct AgentBrain {
    vision: i32,
    state: AgentState,
    target: Option<Cell>,
    path: VecDeque<Cell>,
    last_plan_at: Option<u64>,
    replan_ms: u64,
    replans: u32,
}

/// Where a combatant's movement comes from.
#[derive(Clone, Debug)]
enum Control {
    Input,
    Agent(AgentBrain),
}

#[derive(Clone, Debug)]
struct Combatant {
    id: u32,
    x: i32,
    y: i32,
    health: i32,
    max_health: i32,
    alive: bool,
    max_bombs: i32,
    bomb_power: i32,
    bombs_active: i32,
    score: i32,
    control: Control,
}

impl Combatant {
    fn can_place(&self) -> bool {
        self.alive && self.bombs_active < self.max_bombs
    }

    fn is_player(&self) -> bool {
        matches!(self.control, Control::Input)
    }

    fn brain(&self) -> Option<&AgentBrain> {
        match &self.control {
            Control::Agent(brain) => Some(brain),
            Control::Input => None,
        }
    }

    fn brain_mut(&mut self) -> Option<&mut AgentBrain> {
        match &mut self.control {
            Control::Agent(brain) => Some(brain),
            Control::Input => None,
        }
    }

    fn view(&self) -> CombatantView {
        CombatantView {
            id: self.id,
            role: if self.is_player() {
                Role::Player
            } else {
                Role::Agent
            },
            x: self.x,
            y: self.y,
            health: self.health,
            alive: self.alive,
            max_bombs: self.max_bombs,
            bomb_power: self.bomb_power,
            bombs_active: self.bombs_active,
            score: self.score,
            state: self.brain().map(|brain| brain.state),
            target: self.brain().and_then(|brain| brain.target),
        }
    }
}

#[derive(Clone, Debug)]
struct BombInternal {
    id: u32,
    x: i32,
    y: i32,
    /// Index of the owning combatant; combatants are never removed.
    owner: usize,
    explode_at: u64,
    power: i32,
}

#[derive(Clone, Debug)]
struct ExplosionInternal {
    cells: BTreeSet<Cell>,
    end_at: u64,
}

#[derive(Clone, Debug, Default)]
struct SessionStats {
    bombs_detonated: u32,
    soft_walls_destroyed: u32,
    power_ups_collected: u32,
}

#[derive(Clone, Debug)]
pub struct GameEngine {
    pub config: ArenaConfig,
    pub map: GameMap,

    rng: Rng,
    combatants: Vec<Combatant>,
    bombs: Vec<BombInternal>,
    explosions: Vec<ExplosionInternal>,
    power_ups: Vec<PowerUpView>,
    power_up_flash: Option<PowerUpFlash>,
    messages: VecDeque<String>,
    pending_intent: Intent,
    path_comparison: Option<PathComparison>,
    stats: SessionStats,

    elapsed_ms: u64,
    tick_counter: u64,
    ended: bool,
    next_id_counter: u32,
}

impl GameEngine {
    /// Generates the arena from the config seed and spawns the agents.
    pub fn new(config: ArenaConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let map = GameMap::generate_with_density(
            config.width,
            config.height,
            config.seed,
            config.soft_wall_chance,
        );
        let mut engine = Self::with_map(config, map)?;
        engine.spawn_initial_agents();
        Ok(engine)
    }

    /// Builds a session on a prepared map with the player only.
    pub fn with_map(mut config: ArenaConfig, map: GameMap) -> Result<Self, ConfigError> {
        config.width = map.width;
        config.height = map.height;
        config.validate()?;

        let rng = Rng::new(config.seed ^ ENGINE_RNG_SALT);
        let mut engine = Self {
            rng,
            map,
            combatants: Vec::new(),
            bombs: Vec::new(),
            explosions: Vec::new(),
            power_ups: Vec::new(),
            power_up_flash: None,
            messages: VecDeque::with_capacity(config.message_capacity),
            pending_intent: Intent::default(),
            path_comparison: None,
            stats: SessionStats::default(),
            elapsed_ms: 0,
            tick_counter: 0,
            ended: false,
            next_id_counter: 1,
            config,
        };

        let id = engine.make_id();
        engine.combatants.push(Combatant {
            id,
            x: PLAYER_START.0,
            y: PLAYER_START.1,
            health: engine.config.player_health,
            max_health: engine.config.player_health,
            alive: true,
            max_bombs: engine.config.player_max_bombs,
            bomb_power: engine.config.bomb_power,
            bombs_active: 0,
            score: 0,
            control: Control::Input,
        });
        Ok(engine)
    }

    fn spawn_initial_agents(&mut self) {
        let mut tries = 0;
        let mut spawned = 0;
        while spawned < self.config.agent_count && tries < AGENT_SPAWN_TRIES {
            tries += 1;
            let x = self.rng.int(1, self.map.width - 2);
            let y = self.rng.int(1, self.map.height - 2);
            if self.map.kind(x, y) != Some(TileKind::Empty) {
                continue;
            }
            if self.combatants.iter().any(|c| c.x == x && c.y == y) {
                continue;
            }
            self.spawn_agent_at(x, y);
            spawned += 1;
        }
    }

    /// Adds an agent at the given cell and returns its combatant index.
    pub fn spawn_agent_at(&mut self, x: i32, y: i32) -> usize {
        let id = self.make_id();
        self.combatants.push(Combatant {
            id,
            x,
            y,
            health: self.config.agent_health,
            max_health: self.config.agent_health,
            alive: true,
            max_bombs: self.config.agent_max_bombs,
            bomb_power: self.config.bomb_power,
            bombs_active: 0,
            score: 0,
            control: Control::Agent(AgentBrain {
                vision: self.config.agent_vision,
                state: AgentState::Search,
                target: None,
                path: VecDeque::new(),
                last_plan_at: None,
                replan_ms: self.config.agent_replan_ms,
                replans: 0,
            }),
        });
        self.combatants.len() - 1
    }

    pub fn now_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn tick(&self) -> u64 {
        self.tick_counter
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn player_index(&self) -> Option<usize> {
        self.combatants.iter().position(Combatant::is_player)
    }

    pub fn player(&self) -> Option<CombatantView> {
        self.player_index().map(|idx| self.combatants[idx].view())
    }

    pub fn combatant(&self, idx: usize) -> Option<CombatantView> {
        self.combatants.get(idx).map(Combatant::view)
    }

    pub fn agent_indices(&self) -> Vec<usize> {
        self.combatants
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.is_player())
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Number of times the agent has re-evaluated its behaviour state.
    pub fn agent_replans(&self, idx: usize) -> Option<u32> {
        self.combatants
            .get(idx)
            .and_then(Combatant::brain)
            .map(|brain| brain.replans)
    }

    /// Places a combatant directly, ignoring walkability. Used to stage scenarios.
    pub fn set_position(&mut self, idx: usize, x: i32, y: i32) -> bool {
        if !self.map.in_bounds(x, y) {
            return false;
        }
        let Some(combatant) = self.combatants.get_mut(idx) else {
            return false;
        };
        combatant.x = x;
        combatant.y = y;
        if let Some(brain) = combatant.brain_mut() {
            brain.path.clear();
        }
        true
    }

    pub fn bomb_ids(&self) -> Vec<u32> {
        self.bombs.iter().map(|bomb| bomb.id).collect()
    }

    pub fn power_ups(&self) -> &[PowerUpView] {
        &self.power_ups
    }

    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.messages.iter().map(String::as_str)
    }

    /// Buffers input for the next tick. Later movement wins; triggers accumulate.
    pub fn queue_intent(&mut self, intent: Intent) {
        self.pending_intent.merge(intent);
    }

    /// Advances one fixed tick: intent, agents, detonations, explosion expiry.
    pub fn step(&mut self, dt_ms: u64) {
        if self.ended {
            return;
        }
        self.tick_counter += 1;
        self.elapsed_ms = self.elapsed_ms.saturating_add(dt_ms);
        let now_ms = self.elapsed_ms;

        let intent = std::mem::take(&mut self.pending_intent);
        self.apply_intent(intent);
        if self.ended {
            return;
        }

        self.update_agents(now_ms);
        self.detonate_due_bombs(now_ms);
        self.prune_explosions(now_ms);
        if self
            .power_up_flash
            .is_some_and(|flash| flash.until_ms <= now_ms)
        {
            self.power_up_flash = None;
        }
    }

    fn apply_intent(&mut self, intent: Intent) {
        if intent.quit {
            self.ended = true;
            self.push_message("Quit requested".to_string());
            return;
        }
        if intent.compare_paths {
            self.toggle_path_comparison();
        }
        let Some(player_idx) = self.player_index() else {
            return;
        };
        if intent.place_bomb {
            self.place_bomb(player_idx);
        }
        if let Some(dir) = intent.movement {
            self.move_player(player_idx, dir);
        }
    }

    fn move_player(&mut self, idx: usize, dir: Direction) {
        let (x, y, alive) = {
            let player = &self.combatants[idx];
            (player.x, player.y, player.alive)
        };
        if !alive {
            return;
        }
        let (nx, ny) = offset(x, y, dir);
        if !self.map.is_walkable(nx, ny) {
            return;
        }
        self.enter_cell(idx, nx, ny);
    }

    /// Moves a combatant onto a cell and hands it whatever power-ups lie there.
    fn enter_cell(&mut self, idx: usize, x: i32, y: i32) {
        let Some(combatant) = self.combatants.get_mut(idx) else {
            return;
        };
        combatant.x = x;
        combatant.y = y;
        for power_up in self.collect_powerups_at(x, y) {
            self.apply_powerup(idx, power_up.kind);
        }
    }

    fn push_message(&mut self, text: String) {
        info!(tick = self.tick_counter, "{text}");
        self.messages.push_back(text);
        while self.messages.len() > self.config.message_capacity {
            self.messages.pop_front();
        }
    }

    fn make_id(&mut self) -> u32 {
        let id = self.next_id_counter;
        self.next_id_counter = self.next_id_counter.saturating_add(1);
        id
    }

    pub fn build_snapshot(&self) -> Snapshot {
        let now_ms = self.elapsed_ms;
        let fuse = self.config.bomb_fuse_ms.max(1) as f32;
        Snapshot {
            tick: self.tick_counter,
            now_ms,
            width: self.map.width,
            height: self.map.height,
            tiles: self.map.rows(),
            blast_cells: self.map.blast_cells(),
            players: self
                .combatants
                .iter()
                .filter(|c| c.is_player())
                .map(Combatant::view)
                .collect(),
            agents: self
                .combatants
                .iter()
                .filter(|c| !c.is_player())
                .map(Combatant::view)
                .collect(),
            bombs: self
                .bombs
                .iter()
                .map(|bomb| {
                    let remaining_ms = bomb.explode_at.saturating_sub(now_ms);
                    BombView {
                        id: bomb.id,
                        owner_id: self.combatants.get(bomb.owner).map(|c| c.id).unwrap_or(0),
                        x: bomb.x,
                        y: bomb.y,
                        power: bomb.power,
                        explode_at: bomb.explode_at,
                        remaining_ms,
                        fuse_fraction: (remaining_ms as f32 / fuse).clamp(0.0, 1.0),
                    }
                })
                .collect(),
            explosions: self
                .explosions
                .iter()
                .map(|explosion| ExplosionView {
                    cells: explosion.cells.iter().copied().collect(),
                    end_at: explosion.end_at,
                })
                .collect(),
            power_ups: self.power_ups.clone(),
            power_up_flash: self.power_up_flash,
            messages: self.messages.iter().cloned().collect(),
            path_comparison: self.path_comparison.as_ref().map(PathComparison::view),
            ended: self.ended,
        }
    }

    pub fn build_summary(&self) -> GameSummary {
        let player = self.player_index().map(|idx| &self.combatants[idx]);
        let reason = if self.ended {
            Some(GameOverReason::Quit)
        } else if player.is_some_and(|p| !p.alive) {
            Some(GameOverReason::PlayerDown)
        } else {
            None
        };
        GameSummary {
            reason,
            ticks: self.tick_counter,
            elapsed_ms: self.elapsed_ms,
            player_score: player.map(|p| p.score).unwrap_or(0),
            player_health: player.map(|p| p.health).unwrap_or(0),
            agents_alive: self
                .combatants
                .iter()
                .filter(|c| !c.is_player() && c.alive)
                .count(),
            bombs_detonated: self.stats.bombs_detonated,
            soft_walls_destroyed: self.stats.soft_walls_destroyed,
            power_ups_collected: self.stats.power_ups_collected,
        }
    }

    fn cell_of(&self, idx: usize) -> Option<Cell> {
        self.combatants.get(idx).map(|c| (c.x, c.y))
    }

    fn log_bomb(&self, bomb: &BombInternal, verb: &str) {
        debug!(
            bomb = bomb.id,
            owner = bomb.owner,
            x = bomb.x,
            y = bomb.y,
            power = bomb.power,
            "bomb {verb}"
        );
    }
}
