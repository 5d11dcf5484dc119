use crate::types::PowerUpKind;

pub const TICK_MS: u64 = 80;

pub const MAP_WIDTH: i32 = 31;
pub const MAP_HEIGHT: i32 = 17;
pub const MAP_SEED: u32 = 0xBEEF;
pub const SOFT_WALL_CHANCE: f64 = 0.52;

pub const BOMB_FUSE_MS: u64 = 2_200;
pub const EXPLOSION_MS: u64 = 550;
pub const BOMB_POWER: i32 = 3;

pub const PLAYER_MAX_BOMBS: i32 = 1;
pub const AGENT_MAX_BOMBS: i32 = 1;
pub const PLAYER_HEALTH: i32 = 3;
pub const AGENT_HEALTH: i32 = 1;

pub const AGENT_COUNT: usize = 3;
pub const AGENT_VISION: i32 = 7;
pub const AGENT_REPLAN_MS: u64 = 400;
pub const AGENT_SPAWN_TRIES: usize = 1_000;
pub const AGENT_KILL_BONUS: i32 = 100;
pub const CHASE_BOMB_CHANCE: f64 = 0.3;
pub const SEARCH_BOMB_CHANCE: f64 = 0.6;

pub const DANGER_LOOKAHEAD_MS: u64 = 2_000;
pub const SAFE_TILE_SEARCH_CAP: usize = 1_000;

pub const POWERUP_SPAWN_CHANCE: f64 = 0.16;
pub const POWERUP_KINDS: [PowerUpKind; 3] = [
    PowerUpKind::ExtraBomb,
    PowerUpKind::BombPower,
    PowerUpKind::Health,
];
pub const POWERUP_FLASH_MS: u64 = 1_800;

pub const MESSAGE_CAPACITY: usize = 5;

pub const MAX_MAP_SIDE: i32 = 1_024;
pub const MAX_DURATION_MS: u64 = 3_600_000;
pub const MAX_MESSAGE_CAPACITY: usize = 1_024;
pub const PLAYER_START: (i32, i32) = (1, 1);
