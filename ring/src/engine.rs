//! The assignment engine: binds data keys to the ring's nodes and keeps
//! those bindings current as membership changes.

use crate::{
    config::RingConfig,
    error::{ConfigError, RingError},
    hash::{position_of, Position, DEGREES},
    ring::{Label, Node, NodeId, Ring},
};
use fnv::{FnvHashMap, FnvHashSet};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
/// How many recent keys [`NodeLoad`] carries per node.
const RECENT_KEYS: usize = 3;

/// A keyed item and the node that currently owns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataPoint {
    pub key: String,
    /// Opaque payload; the engine never looks inside.
    pub value: String,
    /// Always `position_of(key)`.
    pub position: Position,
    pub node: NodeId,
    pub label: Label,
}

/// A key whose owner changed during a reassignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Migration {
    pub key: String,
    pub from: NodeId,
    pub to: NodeId,
}

/// Outcome of a successful node add or remove.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipChange {
    pub node: Node,
    pub migrations: Vec<Migration>,
}

/// How much data one node owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeLoad {
    pub node: Node,
    pub count: usize,
    /// The most recently added keys this node owns, oldest first.
    pub recent: Vec<(String, String)>,
}

/// Read-only copy of the engine state, taken between commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub nodes: Vec<Node>,
    pub data_points: Vec<DataPoint>,
}

impl Snapshot {
    /// Per-node load, in node insertion order.
    pub fn distribution(&self) -> Vec<NodeLoad> {
        let mut owned: FnvHashMap<NodeId, Vec<&DataPoint>> = FnvHashMap::default();
        for point in &self.data_points {
            owned.entry(point.node).or_default().push(point);
        }

        self.nodes
            .iter()
            .map(|node| {
                let points = owned.remove(&node.id).unwrap_or_default();
                let skip = points.len().saturating_sub(RECENT_KEYS);
                NodeLoad {
                    node: node.clone(),
                    count: points.len(),
                    recent: points[skip..]
                        .iter()
                        .map(|p| (p.key.clone(), p.value.clone()))
                        .collect(),
                }
            })
            .collect()
    }
}

/// Owns the ring and every data point.
///
/// All mutation goes through `&mut self`, so commands never interleave.
/// Every membership change finishes with a full reassignment before it
/// returns. Rejected commands leave the engine untouched.
#[derive(Debug)]
pub struct Engine<R = StdRng> {
    ring: Ring,
    data: Vec<DataPoint>,
    keys: FnvHashSet<String>,
    config: RingConfig,
    rng: R,
}

impl Engine<StdRng> {
    /// Validates `config` and seeds the ring with its initial nodes.
    pub fn new(config: RingConfig) -> Result<Self, ConfigError> {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(config, rng)
    }
}

impl<R: Rng> Engine<R> {
    pub fn with_rng(config: RingConfig, rng: R) -> Result<Self, ConfigError> {
        let mut engine = Self::empty(config, rng)?;

        // Even spread, each nudged forward by a little jitter.
        let n = engine.config.initial_nodes as u32;
        for i in 0..n {
            let jitter = match engine.config.initial_jitter {
                0 => 0,
                j => engine.rng.gen_range(0..j as u32),
            };
            let position = Position::wrapping(i * DEGREES as u32 / n + jitter);
            engine.ring.insert(position)?;
        }
        info!(nodes = engine.ring.len(), "ring seeded");

        Ok(engine)
    }

    /// An engine whose ring holds no nodes yet. Nothing can be assigned
    /// until a node is added.
    pub fn empty(config: RingConfig, rng: R) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            ring: Ring::new(config.min_nodes, config.max_nodes),
            data: Vec::new(),
            keys: FnvHashSet::default(),
            config,
            rng,
        })
    }

    /// Adds a node at a uniformly random position.
    pub fn add_node(&mut self) -> Result<MembershipChange, RingError> {
        // Check before drawing so a rejection leaves the rng untouched too.
        if self.ring.len() >= self.ring.max() {
            debug!(max = self.ring.max(), "add node rejected, ring full");
            return Err(RingError::Full {
                max: self.ring.max(),
            });
        }
        let position = Position::wrapping(self.rng.gen_range(0..DEGREES as u32));
        self.add_node_at(position)
    }

    /// Adds a node at a caller-chosen position.
    pub fn add_node_at(&mut self, position: Position) -> Result<MembershipChange, RingError> {
        let node = match self.ring.insert(position) {
            Ok(node) => node.clone(),
            Err(e) => {
                debug!(error = %e, "add node rejected");
                return Err(e);
            }
        };
        let migrations = self.reassign_all();
        info!(
            id = %node.id,
            position = %node.position,
            moved = migrations.len(),
            "node added"
        );
        Ok(MembershipChange { node, migrations })
    }

    /// Removes the most recently added node.
    pub fn remove_node(&mut self) -> Result<MembershipChange, RingError> {
        let node = self.ring.pop().inspect_err(|e| {
            debug!(error = %e, "remove node rejected");
        })?;
        let migrations = self.reassign_all();
        info!(id = %node.id, moved = migrations.len(), "node removed");
        Ok(MembershipChange { node, migrations })
    }

    /// Hashes `key` onto the ring and records it with its owning node.
    pub fn add_data_point(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<&DataPoint, RingError> {
        let key = key.into();
        if self.keys.contains(&key) {
            debug!(%key, "data rejected, duplicate key");
            return Err(RingError::DuplicateKey(key));
        }
        let position = position_of(&key);
        let Some(owner) = self.ring.nearest_clockwise(position) else {
            debug!(%key, "data rejected, ring is empty");
            return Err(RingError::NoNodes);
        };

        let point = DataPoint {
            key: key.clone(),
            value: value.into(),
            position,
            node: owner.id,
            label: owner.label,
        };
        debug!(%key, %position, node = %point.node, "data assigned");
        self.keys.insert(key);
        self.data.push(point);

        // Just pushed.
        Ok(&self.data[self.data.len() - 1])
    }

    /// Invents a fresh `data-xxxxxxxxx` key and a short value, then adds
    /// them. Rejected with [`RingError::NoNodes`] on an empty ring.
    pub fn generate_data_point(&mut self) -> Result<&DataPoint, RingError> {
        if self.ring.is_empty() {
            return Err(RingError::NoNodes);
        }
        let key = loop {
            let key = format!("data-{}", base36(&mut self.rng, 9));
            if !self.keys.contains(&key) {
                break key;
            }
        };
        let value = base36(&mut self.rng, 5);
        self.add_data_point(key, value)
    }

    /// Re-resolves every data point against the current ring and reports
    /// the keys that changed owner.
    ///
    /// Runs after each membership change. An empty ring clears the data set
    /// outright instead of leaving points without an owner.
    pub fn reassign_all(&mut self) -> Vec<Migration> {
        if self.ring.is_empty() {
            if !self.data.is_empty() {
                info!(dropped = self.data.len(), "ring empty, clearing data");
            }
            self.data.clear();
            self.keys.clear();
            return Vec::new();
        }

        let mut migrations = Vec::new();
        for point in &mut self.data {
            point.position = position_of(&point.key);
            let Some(owner) = self.ring.nearest_clockwise(point.position) else {
                continue;
            };
            if owner.id != point.node {
                debug!(key = %point.key, from = %point.node, to = %owner.id, "data moved");
                migrations.push(Migration {
                    key: point.key.clone(),
                    from: point.node,
                    to: owner.id,
                });
            }
            point.node = owner.id;
            point.label = owner.label;
        }
        migrations
    }

    /// Drops every node and, with them, every data point.
    pub fn reset(&mut self) {
        info!(nodes = self.ring.len(), data = self.data.len(), "ring reset");
        self.ring.clear();
        self.reassign_all();
    }

    pub fn nodes(&self) -> &[Node] {
        self.ring.nodes()
    }

    pub fn data_points(&self) -> &[DataPoint] {
        &self.data
    }

    pub fn ring(&self) -> &Ring {
        &self.ring
    }

    pub fn config(&self) -> &RingConfig {
        &self.config
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            nodes: self.ring.nodes().to_vec(),
            data_points: self.data.clone(),
        }
    }

    pub fn distribution(&self) -> Vec<NodeLoad> {
        self.snapshot().distribution()
    }
}

fn base36(rng: &mut impl Rng, len: usize) -> String {
    (0..len)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect()
}
