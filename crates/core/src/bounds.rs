//! World extents and the toroidal wrap applied to free particles.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Width and height of the world particles live in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldBounds {
    pub width: f64,
    pub height: f64,
}

impl WorldBounds {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Like [`WorldBounds::new`], but rejects zero, negative, or non-finite
    /// extents. Hosts use this at their boundary; the simulation itself
    /// trusts its caller.
    pub fn checked(width: f64, height: f64) -> Result<Self, EngineError> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if valid(width) && valid(height) {
            Ok(Self { width, height })
        } else {
            Err(EngineError::InvalidDimensions)
        }
    }

    /// Whether `p` lies in `[0, width] x [0, height]`.
    pub fn contains(&self, p: DVec2) -> bool {
        (0.0..=self.width).contains(&p.x) && (0.0..=self.height).contains(&p.y)
    }

    /// Re-enters a point that left the world from the opposite edge.
    ///
    /// Each axis is handled independently: past the far edge snaps to 0,
    /// below 0 snaps to the far edge. Points already inside are unchanged.
    pub fn wrap(&self, p: DVec2) -> DVec2 {
        DVec2::new(wrap_axis(p.x, self.width), wrap_axis(p.y, self.height))
    }

    pub fn center(&self) -> DVec2 {
        DVec2::new(self.width, self.height) * 0.5
    }
}

fn wrap_axis(v: f64, extent: f64) -> f64 {
    if v > extent {
        0.0
    } else if v < 0.0 {
        extent
    } else {
        v
    }
}
