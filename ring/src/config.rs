use crate::{error::ConfigError, ring::PALETTE};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Engine tunables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RingConfig {
    /// Adding a node beyond this count is rejected.
    pub max_nodes: usize,
    /// Removing a node below this count is rejected.
    pub min_nodes: usize,
    /// Nodes placed at startup, spread evenly around the ring.
    pub initial_nodes: usize,
    /// Upper bound (exclusive) of the random offset added to each startup
    /// node's evenly spaced position, in degrees.
    pub initial_jitter: u16,
    /// Cadence of the data generator.
    pub generate_every: Duration,
    /// Fixes every random draw (node positions, generated keys) when set.
    pub seed: Option<u64>,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            max_nodes: 8,
            min_nodes: 1,
            initial_nodes: 3,
            initial_jitter: 30,
            generate_every: Duration::from_secs(1),
            seed: None,
        }
    }
}

impl RingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_nodes == 0 || self.max_nodes > PALETTE.len() {
            return Err(ConfigError::MaxNodes {
                max: self.max_nodes,
                palette: PALETTE.len(),
            });
        }
        if self.min_nodes > self.max_nodes {
            return Err(ConfigError::MinAboveMax {
                min: self.min_nodes,
                max: self.max_nodes,
            });
        }
        if !(self.min_nodes..=self.max_nodes).contains(&self.initial_nodes) {
            return Err(ConfigError::InitialOutOfBounds {
                initial: self.initial_nodes,
                min: self.min_nodes,
                max: self.max_nodes,
            });
        }
        if self.initial_jitter > 360 {
            return Err(ConfigError::Jitter(self.initial_jitter));
        }
        if self.generate_every.is_zero() {
            return Err(ConfigError::ZeroPeriod);
        }
        Ok(())
    }
}
