use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{
    AGENT_COUNT, AGENT_HEALTH, AGENT_KILL_BONUS, AGENT_MAX_BOMBS, AGENT_REPLAN_MS, AGENT_VISION,
    BOMB_FUSE_MS, BOMB_POWER, CHASE_BOMB_CHANCE, DANGER_LOOKAHEAD_MS, EXPLOSION_MS, MAP_HEIGHT,
    MAP_SEED, MAP_WIDTH, MAX_DURATION_MS, MAX_MAP_SIDE, MAX_MESSAGE_CAPACITY, MESSAGE_CAPACITY,
    PLAYER_HEALTH, PLAYER_MAX_BOMBS, POWERUP_FLASH_MS, POWERUP_KINDS, POWERUP_SPAWN_CHANCE,
    SEARCH_BOMB_CHANCE, SOFT_WALL_CHANCE, TICK_MS,
};
use crate::error::ConfigError;
use crate::types::PowerUpKind;

/// Session constants. Fixed once the engine is built.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ArenaConfig {
    pub width: i32,
    pub height: i32,
    pub seed: u32,
    pub soft_wall_chance: f64,
    pub tick_ms: u64,
    pub bomb_fuse_ms: u64,
    pub explosion_ms: u64,
    pub bomb_power: i32,
    pub player_max_bombs: i32,
    pub agent_max_bombs: i32,
    pub player_health: i32,
    pub agent_health: i32,
    pub agent_count: usize,
    pub agent_vision: i32,
    pub agent_replan_ms: u64,
    pub agent_kill_bonus: i32,
    pub chase_bomb_chance: f64,
    pub search_bomb_chance: f64,
    pub danger_lookahead_ms: u64,
    pub powerup_spawn_chance: f64,
    pub powerup_kinds: Vec<PowerUpKind>,
    pub powerup_flash_ms: u64,
    pub message_capacity: usize,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            width: MAP_WIDTH,
            height: MAP_HEIGHT,
            seed: MAP_SEED,
            soft_wall_chance: SOFT_WALL_CHANCE,
            tick_ms: TICK_MS,
            bomb_fuse_ms: BOMB_FUSE_MS,
            explosion_ms: EXPLOSION_MS,
            bomb_power: BOMB_POWER,
            player_max_bombs: PLAYER_MAX_BOMBS,
            agent_max_bombs: AGENT_MAX_BOMBS,
            player_health: PLAYER_HEALTH,
            agent_health: AGENT_HEALTH,
            agent_count: AGENT_COUNT,
            agent_vision: AGENT_VISION,
            agent_replan_ms: AGENT_REPLAN_MS,
            agent_kill_bonus: AGENT_KILL_BONUS,
            chase_bomb_chance: CHASE_BOMB_CHANCE,
            search_bomb_chance: SEARCH_BOMB_CHANCE,
            danger_lookahead_ms: DANGER_LOOKAHEAD_MS,
            powerup_spawn_chance: POWERUP_SPAWN_CHANCE,
            powerup_kinds: POWERUP_KINDS.to_vec(),
            powerup_flash_ms: POWERUP_FLASH_MS,
            message_capacity: MESSAGE_CAPACITY,
        }
    }
}

impl ArenaConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(text).map_err(|error| ConfigError::Parse(error.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|error| ConfigError::Read(format!("{}: {error}", path.display())))?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width < 5 || self.height < 5 {
            return Err(ConfigError::MapTooSmall {
                width: self.width,
                height: self.height,
            });
        }
        if self.width > MAX_MAP_SIDE || self.height > MAX_MAP_SIDE {
            return Err(ConfigError::MapTooLarge {
                width: self.width,
                height: self.height,
                max: MAX_MAP_SIDE,
            });
        }

        let positives: [(&'static str, bool); 7] = [
            ("tickMs", self.tick_ms > 0),
            ("bombFuseMs", self.bomb_fuse_ms > 0),
            ("bombPower", self.bomb_power > 0),
            ("playerMaxBombs", self.player_max_bombs > 0),
            ("playerHealth", self.player_health > 0),
            ("agentHealth", self.agent_health > 0),
            ("messageCapacity", self.message_capacity > 0),
        ];
        if let Some(&(name, _)) = positives.iter().find(|(_, ok)| !ok) {
            return Err(ConfigError::NonPositive { name });
        }

        // Timestamps are `now + duration`; bounded durations keep them far from u64::MAX.
        let durations = [
            ("tickMs", self.tick_ms),
            ("bombFuseMs", self.bomb_fuse_ms),
            ("explosionMs", self.explosion_ms),
            ("agentReplanMs", self.agent_replan_ms),
            ("dangerLookaheadMs", self.danger_lookahead_ms),
            ("powerupFlashMs", self.powerup_flash_ms),
        ];
        if let Some(&(name, _)) = durations.iter().find(|(_, ms)| *ms > MAX_DURATION_MS) {
            return Err(ConfigError::TooLarge {
                name,
                max: MAX_DURATION_MS,
            });
        }
        if self.message_capacity > MAX_MESSAGE_CAPACITY {
            return Err(ConfigError::TooLarge {
                name: "messageCapacity",
                max: MAX_MESSAGE_CAPACITY as u64,
            });
        }

        let probabilities = [
            ("softWallChance", self.soft_wall_chance),
            ("chaseBombChance", self.chase_bomb_chance),
            ("searchBombChance", self.search_bomb_chance),
            ("powerupSpawnChance", self.powerup_spawn_chance),
        ];
        for (name, value) in probabilities {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ProbabilityOutOfRange { name, value });
            }
        }

        if self.powerup_spawn_chance > 0.0 && self.powerup_kinds.is_empty() {
            return Err(ConfigError::NoPowerUpKinds);
        }
        Ok(())
    }
}
