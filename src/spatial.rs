//! World and block coordinate primitives.
//!
//! Both types wrap [`nalgebra::Vector3`] so offset arithmetic and distance checks stay in
//! one place. World positions are continuous (entity coordinates); block positions are the
//! integer grid cells placement commands address.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A continuous world coordinate (entity position, origin anchor).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldPos(pub Vector3<f64>);

impl WorldPos {
    /// Convenience constructor.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self(Vector3::new(x, y, z))
    }

    pub fn x(&self) -> f64 {
        self.0.x
    }

    pub fn y(&self) -> f64 {
        self.0.y
    }

    pub fn z(&self) -> f64 {
        self.0.z
    }

    /// Floors every component onto the block grid. `None` when a component is not finite
    /// or falls outside the `i32` range.
    pub fn floor(&self) -> Option<BlockPos> {
        let mut cell = Vector3::zeros();
        for (out, c) in cell.iter_mut().zip(self.0.iter()) {
            *out = floor_to_i32(*c)?;
        }
        Some(BlockPos(cell))
    }

    /// Whether every component is a finite number.
    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|c| c.is_finite())
    }

    /// Returns the position shifted by an integer block offset.
    pub fn offset(&self, offset: Vector3<i32>) -> WorldPos {
        WorldPos(self.0 + offset.map(f64::from))
    }

    /// Returns the position raised by `dy` units.
    pub fn lifted(&self, dy: f64) -> WorldPos {
        WorldPos(self.0 + Vector3::new(0.0, dy, 0.0))
    }

    /// Euclidean distance to `other`.
    pub fn distance(&self, other: &WorldPos) -> f64 {
        (self.0 - other.0).norm()
    }
}

fn floor_to_i32(c: f64) -> Option<i32> {
    let floored = c.floor();
    if floored.is_finite() && floored >= f64::from(i32::MIN) && floored <= f64::from(i32::MAX) {
        Some(floored as i32)
    } else {
        None
    }
}

impl fmt::Display for WorldPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.0.x, self.0.y, self.0.z)
    }
}

/// An integer block-grid coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockPos(pub Vector3<i32>);

impl BlockPos {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self(Vector3::new(x, y, z))
    }

    pub fn x(&self) -> i32 {
        self.0.x
    }

    pub fn y(&self) -> i32 {
        self.0.y
    }

    pub fn z(&self) -> i32 {
        self.0.z
    }

    /// The block's minimum corner as a world position.
    pub fn to_world(&self) -> WorldPos {
        WorldPos(self.0.map(f64::from))
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.0.x, self.0.y, self.0.z)
    }
}
