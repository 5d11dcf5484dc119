use serde::{Deserialize, Serialize};

pub type Cell = (i32, i32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Probe order shared by blasts, searches and neighbour scans.
    pub const CARDINALS: [Direction; 4] = [
        Direction::Right,
        Direction::Left,
        Direction::Down,
        Direction::Up,
    ];

    pub fn parse_move(value: &str) -> Option<Self> {
        match value {
            "up" | "w" => Some(Self::Up),
            "down" | "s" => Some(Self::Down),
            "left" | "a" => Some(Self::Left),
            "right" | "d" => Some(Self::Right),
            _ => None,
        }
    }

    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }
}

/// Movement keys currently held by the input collaborator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MoveKeys {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl MoveKeys {
    /// Collapses held keys into one direction; up beats down beats left beats right.
    pub fn resolve(self) -> Option<Direction> {
        if self.up {
            Some(Direction::Up)
        } else if self.down {
            Some(Direction::Down)
        } else if self.left {
            Some(Direction::Left)
        } else if self.right {
            Some(Direction::Right)
        } else {
            None
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Intent {
    pub movement: Option<Direction>,
    pub place_bomb: bool,
    pub quit: bool,
    pub compare_paths: bool,
}

impl Intent {
    pub fn from_keys(keys: MoveKeys) -> Self {
        Self {
            movement: keys.resolve(),
            ..Self::default()
        }
    }

    /// Folds a later intent into this one without losing one-shot triggers.
    /// Repeated compare requests within a tick toggle the overlay once.
    pub fn merge(&mut self, other: Intent) {
        if other.movement.is_some() {
            self.movement = other.movement;
        }
        self.place_bomb |= other.place_bomb;
        self.quit |= other.quit;
        self.compare_paths |= other.compare_paths;
    }

    pub fn is_idle(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TileKind {
    Empty,
    Soft,
    Hard,
}

impl TileKind {
    pub fn glyph(self) -> char {
        match self {
            TileKind::Empty => '.',
            TileKind::Soft => '+',
            TileKind::Hard => '#',
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerUpKind {
    ExtraBomb,
    BombPower,
    Health,
}

impl PowerUpKind {
    pub fn label(self) -> &'static str {
        match self {
            PowerUpKind::ExtraBomb => "Extra Bomb",
            PowerUpKind::BombPower => "Bomb Power",
            PowerUpKind::Health => "Health",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    Search,
    Chase,
    Evade,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Player,
    Agent,
}

#[derive(Clone, Debug, Serialize)]
pub struct CombatantView {
    pub id: u32,
    pub role: Role,
    pub x: i32,
    pub y: i32,
    pub health: i32,
    pub alive: bool,
    #[serde(rename = "maxBombs")]
    pub max_bombs: i32,
    #[serde(rename = "bombPower")]
    pub bomb_power: i32,
    #[serde(rename = "bombsActive")]
    pub bombs_active: i32,
    pub score: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<AgentState>,
    /// Cell the agent is chasing or digging toward.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<Cell>,
}

#[derive(Clone, Debug, Serialize)]
pub struct BombView {
    pub id: u32,
    #[serde(rename = "ownerId")]
    pub owner_id: u32,
    pub x: i32,
    pub y: i32,
    pub power: i32,
    #[serde(rename = "explodeAt")]
    pub explode_at: u64,
    #[serde(rename = "remainingMs")]
    pub remaining_ms: u64,
    /// Remaining fuse as a fraction of the full fuse, 1.0 when freshly placed.
    #[serde(rename = "fuseFraction")]
    pub fuse_fraction: f32,
}

#[derive(Clone, Debug, Serialize)]
pub struct ExplosionView {
    pub cells: Vec<Cell>,
    #[serde(rename = "endAt")]
    pub end_at: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PowerUpView {
    pub x: i32,
    pub y: i32,
    pub kind: PowerUpKind,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PowerUpFlash {
    pub kind: PowerUpKind,
    #[serde(rename = "untilMs")]
    pub until_ms: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct AlgorithmRunView {
    pub algorithm: String,
    pub path: Option<Vec<Cell>>,
    pub visited: Vec<Cell>,
    #[serde(rename = "nodesExplored")]
    pub nodes_explored: usize,
    #[serde(rename = "durationUs")]
    pub duration_us: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct PathComparisonView {
    pub start: Cell,
    pub goal: Cell,
    pub runs: Vec<AlgorithmRunView>,
}

#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    #[serde(rename = "nowMs")]
    pub now_ms: u64,
    pub width: i32,
    pub height: i32,
    pub tiles: Vec<String>,
    #[serde(rename = "blastCells")]
    pub blast_cells: Vec<Cell>,
    pub players: Vec<CombatantView>,
    pub agents: Vec<CombatantView>,
    pub bombs: Vec<BombView>,
    pub explosions: Vec<ExplosionView>,
    #[serde(rename = "powerUps")]
    pub power_ups: Vec<PowerUpView>,
    #[serde(rename = "powerUpFlash")]
    pub power_up_flash: Option<PowerUpFlash>,
    pub messages: Vec<String>,
    #[serde(rename = "pathComparison")]
    pub path_comparison: Option<PathComparisonView>,
    pub ended: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOverReason {
    Quit,
    PlayerDown,
}

#[derive(Clone, Debug, Serialize)]
pub struct GameSummary {
    pub reason: Option<GameOverReason>,
    pub ticks: u64,
    #[serde(rename = "elapsedMs")]
    pub elapsed_ms: u64,
    #[serde(rename = "playerScore")]
    pub player_score: i32,
    #[serde(rename = "playerHealth")]
    pub player_health: i32,
    #[serde(rename = "agentsAlive")]
    pub agents_alive: usize,
    #[serde(rename = "bombsDetonated")]
    pub bombs_detonated: u32,
    #[serde(rename = "softWallsDestroyed")]
    pub soft_walls_destroyed: u32,
    #[serde(rename = "powerUpsCollected")]
    pub power_ups_collected: u32,
}
