//! Consistent hashing on a 360 degree ring.
//!
//! Nodes sit at integer angles. Every data key hashes to an angle and is
//! owned by the first node reached travelling clockwise from it. The
//! [`Engine`] keeps those assignments current: every membership change
//! re-resolves all known keys against the new ring.
//!
//! Each node occupies exactly one position. There are no virtual nodes, so
//! load spread over a handful of nodes is as lumpy as their positions are.

mod config;
mod engine;
mod error;
mod hash;
mod ring;
mod schedule;

pub use config::RingConfig;
pub use engine::{DataPoint, Engine, MembershipChange, Migration, NodeLoad, Snapshot};
pub use error::{ConfigError, RingError};
pub use hash::{position_of, Position, DEGREES};
pub use ring::{Label, Node, NodeId, Ring, PALETTE};
pub use schedule::Schedule;
