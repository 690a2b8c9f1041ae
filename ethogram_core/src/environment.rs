//! Environment rectangle and boundary reactions.

use crate::entity::{normalize_angle, Entity};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// How the environment reacts when an entity crosses its boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryKind {
    /// Wrap to the opposite edge (torus)
    #[default]
    Rounded,
    /// No correction
    Open,
    /// Clamp to the edge and mirror the heading
    Closed,
}

/// One side of the environment rectangle.
///
/// Declaration order is the priority order of the collision test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    North,
    South,
    East,
    West,
}

/// The rectangle `[0, width] x [0, height]`, y growing southward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub kind: BoundaryKind,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            width: 500.0,
            height: 500.0,
            kind: BoundaryKind::Rounded,
        }
    }
}

impl Environment {
    pub fn new(width: f64, height: f64, kind: BoundaryKind) -> Self {
        Self { width, height, kind }
    }

    /// Returns the first violated side in north, south, east, west order.
    pub fn side_hit(&self, entity: &Entity) -> Option<Side> {
        let (x, y) = (entity.position.x, entity.position.y);
        let (w, h) = (entity.extent.x, entity.extent.y);

        if y - h < 0.0 {
            Some(Side::North)
        } else if y + h > self.height {
            Some(Side::South)
        } else if x + w > self.width {
            Some(Side::East)
        } else if x - w < 0.0 {
            Some(Side::West)
        } else {
            None
        }
    }

    /// Applies the boundary reaction to the first violated side.
    ///
    /// Returns the side that was handled, if any.
    pub fn confine(&self, entity: &mut Entity) -> Option<Side> {
        let side = self.side_hit(entity)?;
        let (w, h) = (entity.extent.x, entity.extent.y);

        match self.kind {
            BoundaryKind::Open => {}
            BoundaryKind::Rounded => match side {
                Side::North => entity.position.y = self.height - h,
                Side::South => entity.position.y = h,
                Side::East => entity.position.x = w,
                Side::West => entity.position.x = self.width - w,
            },
            BoundaryKind::Closed => {
                match side {
                    Side::North => entity.position.y = h,
                    Side::South => entity.position.y = self.height - h,
                    Side::East => entity.position.x = self.width - w,
                    Side::West => entity.position.x = w,
                }
                entity.direction = match side {
                    Side::North | Side::South => normalize_angle(-entity.direction),
                    Side::East | Side::West => normalize_angle(PI - entity.direction),
                };
            }
        }

        Some(side)
    }
}
