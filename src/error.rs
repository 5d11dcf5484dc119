use thiserror::Error;

use crate::types::Cell;

#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConfigError {
    #[error("map must be at least 5x5, got {width}x{height}")]
    MapTooSmall { width: i32, height: i32 },
    #[error("map side must not exceed {max}, got {width}x{height}")]
    MapTooLarge { width: i32, height: i32, max: i32 },
    #[error("{name} must be positive")]
    NonPositive { name: &'static str },
    #[error("{name} must not exceed {max}")]
    TooLarge { name: &'static str, max: u64 },
    #[error("{name} must lie in [0, 1], got {value}")]
    ProbabilityOutOfRange { name: &'static str, value: f64 },
    #[error("power-up spawn chance is set but no power-up kinds are configured")]
    NoPowerUpKinds,
    #[error("failed to read config: {0}")]
    Read(String),
    #[error("failed to parse config: {0}")]
    Parse(String),
}

/// Why a bomb placement was rejected. Rejections never change state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum PlaceBombError {
    #[error("combatant is down")]
    OwnerDown,
    #[error("bomb limit of {max} reached")]
    BombLimitReached { max: i32 },
    #[error("cell {0:?} already holds a bomb")]
    CellOccupied(Cell),
    #[error("no combatant at index {0}")]
    UnknownOwner(usize),
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DiagnosticError {
    #[error("no player to compare from")]
    NoPlayer,
    #[error("no living agent to compare to")]
    NoLivingAgent,
    #[error("path lengths diverge: {0}")]
    Divergence(String),
}
