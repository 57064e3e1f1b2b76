//! Rejections and configuration errors.

use serde::{Deserialize, Serialize};

/// A command the ring refused. Rejections are never partial: the ring and
/// every data point are left exactly as they were.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum RingError {
    #[error("ring is full ({max} nodes)")]
    Full { max: usize },

    #[error("ring is at its minimum ({min} nodes)")]
    AtMinimum { min: usize },

    #[error("no nodes available to own data")]
    NoNodes,

    #[error("data key {0:?} already exists")]
    DuplicateKey(String),
}

/// Tunables that cannot describe a working ring.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("max_nodes must be between 1 and {palette} (got {max})")]
    MaxNodes { max: usize, palette: usize },

    #[error("min_nodes ({min}) exceeds max_nodes ({max})")]
    MinAboveMax { min: usize, max: usize },

    #[error("initial_nodes ({initial}) must lie within [{min}, {max}]")]
    InitialOutOfBounds {
        initial: usize,
        min: usize,
        max: usize,
    },

    #[error("initial_jitter must be at most 360 degrees (got {0})")]
    Jitter(u16),

    #[error("generate_every must be non-zero")]
    ZeroPeriod,

    #[error("initial nodes could not be placed: {0}")]
    Seed(#[from] RingError),
}
