use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Size of the ring's coordinate space.
pub const DEGREES: u16 = 360;

/// An integer angle on the ring, always in `[0, 360)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct Position(u16);

impl Position {
    pub const ZERO: Position = Position(0);

    /// Returns `None` for angles outside `[0, 360)`.
    pub fn new(degrees: u16) -> Option<Self> {
        (degrees < DEGREES).then_some(Self(degrees))
    }

    /// Reduces any angle onto the ring.
    pub fn wrapping(degrees: u32) -> Self {
        Self((degrees % DEGREES as u32) as u16)
    }

    pub fn degrees(self) -> u16 {
        self.0
    }

    /// How far one has to rotate forward (increasing angle) from `self` to
    /// land on `to`. Zero when the two coincide.
    pub fn clockwise_distance(self, to: Position) -> u16 {
        (to.0 + DEGREES - self.0) % DEGREES
    }
}

impl TryFrom<u16> for Position {
    type Error = String;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Position::new(value).ok_or_else(|| format!("{value} is not an angle in [0, {DEGREES})"))
    }
}

impl From<Position> for u16 {
    fn from(value: Position) -> Self {
        value.0
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}°", self.0)
    }
}

/// Hashes a key onto the ring.
///
/// The classic `h = h * 31 + c` string hash over the key's UTF-16 code
/// units, wrapped to a signed 32-bit value at every step, then folded into
/// `[0, 360)` by magnitude. Pure: the same key always lands on the same
/// position, and distinct keys are free to collide.
pub fn position_of(key: &str) -> Position {
    let acc = key
        .encode_utf16()
        .fold(0i32, |acc, unit| acc.wrapping_mul(31).wrapping_add(unit as i32));
    // `unsigned_abs` so that i32::MIN has a magnitude at all.
    Position::wrapping(acc.unsigned_abs())
}
