use crate::{error::RingError, hash::Position};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt::Display;
use tracing::debug;

/// Display colours handed out to nodes, in creation order.
pub const PALETTE: [&str; 8] = [
    "#FF6B6B", "#4ECDC4", "#45B7D1", "#96CEB4", "#FFEEAD", "#D4A5A5", "#9B59B6", "#3498DB",
];

/// Stable node identity. Never reused by the ring that allocated it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node-{}", self.0)
    }
}

/// A node's display identity: an index into [`PALETTE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Label(pub u8);

impl Label {
    pub fn color(self) -> &'static str {
        PALETTE[self.0 as usize % PALETTE.len()]
    }
}

impl Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.color())
    }
}

/// A live node. It never moves once placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub position: Position,
    pub label: Label,
}

/// The live node set, kept in insertion order.
///
/// Positions may collide. Lookups settle ties in favour of the node that
/// was inserted first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ring {
    // Insertion order doubles as removal order (last in, first out) and as
    // the tie-break order for `nearest_clockwise`.
    nodes: SmallVec<[Node; 8]>,
    next_id: u32,
    min: usize,
    max: usize,
}

impl Ring {
    pub fn new(min: usize, max: usize) -> Self {
        Self {
            nodes: SmallVec::new(),
            next_id: 1,
            min,
            max,
        }
    }

    /// Places a new node at `position`, taking the lowest palette entry no
    /// live node holds.
    pub fn insert(&mut self, position: Position) -> Result<&Node, RingError> {
        if self.nodes.len() >= self.max {
            return Err(RingError::Full { max: self.max });
        }
        let label = (0..PALETTE.len() as u8)
            .map(Label)
            .find(|label| self.nodes.iter().all(|node| node.label != *label))
            .ok_or(RingError::Full { max: self.max })?;

        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.push(Node {
            id,
            position,
            label,
        });
        debug!(%id, %position, %label, "placed node");

        // Just pushed.
        Ok(&self.nodes[self.nodes.len() - 1])
    }

    /// Takes out the most recently inserted node.
    pub fn pop(&mut self) -> Result<Node, RingError> {
        if self.nodes.len() <= self.min {
            return Err(RingError::AtMinimum { min: self.min });
        }
        self.nodes.pop().ok_or(RingError::NoNodes)
    }

    /// Drops every node, bypassing the minimum. Ids keep counting up.
    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    /// The node reached by the smallest forward rotation from `position`,
    /// or `None` if the ring is empty.
    pub fn nearest_clockwise(&self, position: Position) -> Option<&Node> {
        // Ties keep the earlier node: only a strictly shorter distance
        // replaces the current winner.
        let mut best: Option<(u16, &Node)> = None;
        for node in &self.nodes {
            let distance = position.clockwise_distance(node.position);
            match best {
                Some((shortest, _)) if shortest <= distance => {}
                _ => best = Some((distance, node)),
            }
        }
        best.map(|(_, node)| node)
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn min(&self) -> usize {
        self.min
    }

    pub fn max(&self) -> usize {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn pos(degrees: u16) -> Position {
        Position::new(degrees).unwrap()
    }

    fn ring_at(positions: &[u16]) -> Ring {
        let mut ring = Ring::new(1, PALETTE.len());
        for p in positions {
            ring.insert(pos(*p)).unwrap();
        }
        ring
    }

    #[test]
    fn empty_ring_has_no_owner() {
        assert!(Ring::new(1, 8).nearest_clockwise(pos(0)).is_none());
    }

    #[test]
    fn lookup_walks_forward_and_wraps() {
        let ring = ring_at(&[10, 100, 200]);
        let at = |p| ring.nearest_clockwise(pos(p)).unwrap().position.degrees();

        assert_eq!(at(10), 10);
        assert_eq!(at(11), 100);
        assert_eq!(at(150), 200);
        // Past the last node the walk wraps to the first.
        assert_eq!(at(201), 10);
        assert_eq!(at(359), 10);
    }

    #[test]
    fn colliding_positions_favour_earliest_insert() {
        let ring = ring_at(&[90, 90, 90]);
        let owner = ring.nearest_clockwise(pos(45)).unwrap();
        assert_eq!(owner.id, NodeId(1));
    }

    #[test]
    fn labels_follow_creation_order_and_are_reused_after_pop() {
        let mut ring = ring_at(&[0, 1, 2]);
        let labels: Vec<_> = ring.nodes().iter().map(|n| n.label).collect();
        assert_eq!(labels, [Label(0), Label(1), Label(2)]);

        let popped = ring.pop().unwrap();
        assert_eq!(popped.id, NodeId(3));

        let fresh = ring.insert(pos(3)).unwrap();
        assert_eq!(fresh.label, Label(2));
        assert_eq!(fresh.id, NodeId(4));
    }

    #[test]
    fn bounds_are_enforced_without_side_effects() {
        let mut ring = Ring::new(1, 2);
        ring.insert(pos(5)).unwrap();
        assert_eq!(ring.pop(), Err(RingError::AtMinimum { min: 1 }));
        assert_eq!(ring.len(), 1);

        ring.insert(pos(6)).unwrap();
        let before = ring.clone();
        assert_eq!(ring.insert(pos(7)).unwrap_err(), RingError::Full { max: 2 });
        assert_eq!(ring, before);
    }

    #[test]
    fn ids_survive_clear() {
        let mut ring = ring_at(&[1, 2]);
        ring.clear();
        assert!(ring.is_empty());
        assert_eq!(ring.insert(pos(1)).unwrap().id, NodeId(3));
    }

    proptest! {
        #[test]
        fn nearest_clockwise_matches_brute_force(
            positions in prop::collection::vec(0u16..360, 1..=8),
            probe in 0u16..360,
        ) {
            let ring = ring_at(&positions);
            let probe = pos(probe);
            let winner = ring.nearest_clockwise(probe).unwrap();

            let shortest = positions
                .iter()
                .map(|p| probe.clockwise_distance(pos(*p)))
                .min()
                .unwrap();
            prop_assert_eq!(probe.clockwise_distance(winner.position), shortest);

            // The winner is the first inserted node at that distance.
            let first = ring
                .nodes()
                .iter()
                .find(|n| probe.clockwise_distance(n.position) == shortest)
                .unwrap();
            prop_assert_eq!(winner.id, first.id);
        }

        #[test]
        fn count_stays_within_bounds(ops in prop::collection::vec(any::<bool>(), 0..64)) {
            let mut ring = Ring::new(1, 8);
            ring.insert(pos(0)).unwrap();
            for (i, add) in ops.into_iter().enumerate() {
                let before = ring.clone();
                let outcome = if add {
                    ring.insert(Position::wrapping(i as u32 * 47)).map(|_| ())
                } else {
                    ring.pop().map(|_| ())
                };
                if outcome.is_err() {
                    prop_assert_eq!(&ring, &before);
                }
                prop_assert!((1..=8).contains(&ring.len()));
            }
        }
    }
}
