//! The `Engine` trait a host drives once per display refresh.
//!
//! The trait is object-safe so hosts can hold a `Box<dyn Engine>` without
//! knowing the random source or noise field the engine was built with.

use glam::DVec2;
use serde_json::Value;

use crate::bounds::WorldBounds;

/// A step-driven particle simulation.
///
/// Hosts call [`Engine::step`] once per frame with a monotonically
/// increasing clock value and rasterize the returned positions. Formation
/// and resize calls are ordinary `&mut self` calls serialized with `step`.
pub trait Engine {
    /// Advance the simulation by one tick and return the positions to draw.
    ///
    /// `now` only needs to increase steadily; its units and epoch are
    /// irrelevant beyond the time-shrink parameter it is divided by.
    fn step(&mut self, now: f64) -> &[DVec2];

    /// Positions recorded by the most recent tick (initial positions before
    /// the first one).
    fn positions(&self) -> &[DVec2];

    fn bounds(&self) -> WorldBounds;

    /// Replaces the world bounds. Existing particles are not moved.
    fn update_bounds(&mut self, bounds: WorldBounds);

    /// Assigns `targets` in order to the leading particles and returns how
    /// many were assigned.
    fn set_formation(&mut self, targets: &[DVec2]) -> usize;

    /// Releases every particle from its target.
    fn clear_formation(&mut self);

    /// Current parameter values as a JSON object.
    fn params(&self) -> Value;

    /// Schema describing all available parameters, their types, ranges, and defaults.
    fn param_schema(&self) -> Value;
}
