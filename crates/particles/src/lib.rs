#![deny(unsafe_code)]
//! Noise-driven particle system.
//!
//! Every tick each particle samples a 3-D gradient noise field twice (once
//! per velocity channel, with the time axis mirrored between them), picks up
//! a small random kick, is optionally pulled toward a formation target, and
//! is then damped and integrated. Free particles wrap around the world
//! edges; particles seeking a target are allowed to leave the world while
//! they converge.

use std::f64::consts::TAU;
use std::ops::RangeInclusive;

use drift_core::bounds::WorldBounds;
use drift_core::error::EngineError;
use drift_core::noise::{NoiseField, Perlin3};
use drift_core::params::{param_f64, param_usize};
use drift_core::prng::{RandomSource, Xorshift64};
use drift_core::Engine;
use glam::DVec2;
use log::debug;
use serde_json::{json, Value};

/// Particle count used when none is given.
pub const DEFAULT_PARTICLE_COUNT: usize = 6000;
/// Per-tick velocity retention.
const DEFAULT_SPEED_MULTIPLIER: f64 = 0.94;
/// World units per noise lattice cell.
const DEFAULT_GRID_SHRINK: f64 = 200.0;
/// Clock units per noise lattice cell along the time axis.
const DEFAULT_Z_SHRINK: f64 = 4000.0;
/// Spring constant pulling a particle toward its target.
const DEFAULT_FORMATION_DAMPING: f64 = 0.01;
/// Upper bound of the random kick magnitude.
const DEFAULT_JITTER: f64 = 0.25;

/// Accepted particle counts.
pub const PARTICLE_COUNT_RANGE: RangeInclusive<usize> = 1..=100_000;
const SPEED_MULTIPLIER_RANGE: RangeInclusive<f64> = 0.0..=1.0;
// Lower bounds keep noise coordinates finite.
const GRID_SHRINK_RANGE: RangeInclusive<f64> = 1.0..=10_000.0;
const Z_SHRINK_RANGE: RangeInclusive<f64> = 1.0..=1_000_000.0;
const FORMATION_DAMPING_RANGE: RangeInclusive<f64> = 0.0..=1.0;
const JITTER_RANGE: RangeInclusive<f64> = 0.0..=10.0;

/// The fixed constants of the simulation.
///
/// [`Default`] gives the canonical values; [`DriftParams::from_json`] lets a
/// host override them once, at construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriftParams {
    /// Multiplier applied to velocity every tick before integration.
    pub speed_multiplier: f64,
    /// Divisor turning world coordinates into noise coordinates.
    pub grid_shrink: f64,
    /// Divisor turning the clock into the noise time coordinate.
    pub z_shrink: f64,
    /// Fraction of the offset to the target added to velocity per tick.
    pub formation_damping: f64,
    /// Maximum magnitude of the per-tick random kick.
    pub jitter: f64,
}

impl Default for DriftParams {
    fn default() -> Self {
        Self {
            speed_multiplier: DEFAULT_SPEED_MULTIPLIER,
            grid_shrink: DEFAULT_GRID_SHRINK,
            z_shrink: DEFAULT_Z_SHRINK,
            formation_damping: DEFAULT_FORMATION_DAMPING,
            jitter: DEFAULT_JITTER,
        }
    }
}

impl DriftParams {
    /// Extracts parameters from a JSON object, falling back to defaults.
    ///
    /// Returns `EngineError::InvalidParams` if a present value lies outside
    /// the range published by [`DriftParams::schema`].
    pub fn from_json(params: &Value) -> Result<Self, EngineError> {
        Ok(Self {
            speed_multiplier: ranged_f64(
                params,
                "speed_multiplier",
                DEFAULT_SPEED_MULTIPLIER,
                SPEED_MULTIPLIER_RANGE,
            )?,
            grid_shrink: ranged_f64(params, "grid_shrink", DEFAULT_GRID_SHRINK, GRID_SHRINK_RANGE)?,
            z_shrink: ranged_f64(params, "z_shrink", DEFAULT_Z_SHRINK, Z_SHRINK_RANGE)?,
            formation_damping: ranged_f64(
                params,
                "formation_damping",
                DEFAULT_FORMATION_DAMPING,
                FORMATION_DAMPING_RANGE,
            )?,
            jitter: ranged_f64(params, "jitter", DEFAULT_JITTER, JITTER_RANGE)?,
        })
    }

    /// Every JSON parameter with its type, default, inclusive range and
    /// description. Includes `count`, which is read at construction.
    pub fn schema() -> Value {
        json!({
            "count": {
                "type": "integer",
                "default": DEFAULT_PARTICLE_COUNT,
                "min": PARTICLE_COUNT_RANGE.start(),
                "max": PARTICLE_COUNT_RANGE.end(),
                "description": "Number of particles, fixed for the run"
            },
            "speed_multiplier": number_schema(
                DEFAULT_SPEED_MULTIPLIER,
                SPEED_MULTIPLIER_RANGE,
                "Velocity retained per tick",
            ),
            "grid_shrink": number_schema(
                DEFAULT_GRID_SHRINK,
                GRID_SHRINK_RANGE,
                "World units per noise cell; larger means smoother flow",
            ),
            "z_shrink": number_schema(
                DEFAULT_Z_SHRINK,
                Z_SHRINK_RANGE,
                "Clock units per noise cell along time; larger means slower change",
            ),
            "formation_damping": number_schema(
                DEFAULT_FORMATION_DAMPING,
                FORMATION_DAMPING_RANGE,
                "Pull toward the formation target per tick",
            ),
            "jitter": number_schema(
                DEFAULT_JITTER,
                JITTER_RANGE,
                "Maximum random kick added to velocity per tick",
            ),
        })
    }
}

fn ranged_f64(
    params: &Value,
    name: &str,
    default: f64,
    range: RangeInclusive<f64>,
) -> Result<f64, EngineError> {
    let value = param_f64(params, name, default);
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(EngineError::InvalidParams(format!(
            "{name} = {value} is outside [{}, {}]",
            range.start(),
            range.end()
        )))
    }
}

fn number_schema(default: f64, range: RangeInclusive<f64>, description: &str) -> Value {
    json!({
        "type": "number",
        "default": default,
        "min": range.start(),
        "max": range.end(),
        "description": description
    })
}

/// A single particle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub position: DVec2,
    pub velocity: DVec2,
    /// Formation destination; `None` means the particle drifts freely.
    pub target: Option<DVec2>,
}

impl Particle {
    /// A particle at rest at `position` with no target.
    pub fn at_rest(position: DVec2) -> Self {
        Self {
            position,
            velocity: DVec2::ZERO,
            target: None,
        }
    }
}

/// A fixed-size population of particles advected by a noise field.
///
/// Generic over the random source `R` (placement and jitter) and the noise
/// field `N`, so hosts and tests can substitute deterministic stand-ins.
pub struct ParticleSystem<R = Xorshift64, N = Perlin3> {
    particles: Vec<Particle>,
    draw_list: Vec<DVec2>,
    bounds: WorldBounds,
    params: DriftParams,
    rng: R,
    noise: N,
}

impl ParticleSystem {
    /// Creates a system driven by [`Xorshift64`] and [`Perlin3`].
    pub fn seeded(count: usize, bounds: WorldBounds, seed: u64, params: DriftParams) -> Self {
        Self::new(count, bounds, params, Xorshift64::new(seed), Perlin3)
    }

    /// Creates a system from a JSON params object.
    ///
    /// Reads `count` (particle count) plus every [`DriftParams`] key,
    /// falling back to defaults for missing keys. Out-of-range values are
    /// rejected with `EngineError::InvalidParams` before anything is
    /// allocated.
    pub fn from_json(
        width: f64,
        height: f64,
        seed: u64,
        json_params: &Value,
    ) -> Result<Self, EngineError> {
        let count = param_usize(json_params, "count", DEFAULT_PARTICLE_COUNT);
        if !PARTICLE_COUNT_RANGE.contains(&count) {
            return Err(EngineError::InvalidParams(format!(
                "count = {count} is outside [{}, {}]",
                PARTICLE_COUNT_RANGE.start(),
                PARTICLE_COUNT_RANGE.end()
            )));
        }
        let params = DriftParams::from_json(json_params)?;
        Ok(Self::seeded(count, WorldBounds::new(width, height), seed, params))
    }
}

impl<R: RandomSource, N: NoiseField> ParticleSystem<R, N> {
    /// Creates a system and places `count` particles uniformly at random
    /// inside `bounds`.
    pub fn new(count: usize, bounds: WorldBounds, params: DriftParams, rng: R, noise: N) -> Self {
        let mut system = Self {
            particles: Vec::new(),
            draw_list: Vec::new(),
            bounds,
            params,
            rng,
            noise,
        };
        system.initialize(count, bounds.width, bounds.height);
        system
    }

    /// Replaces the whole population with `count` fresh particles.
    ///
    /// Each particle lands uniformly in `[0, width) x [0, height)` with zero
    /// velocity and no target. The world bounds are updated to match.
    pub fn initialize(&mut self, count: usize, width: f64, height: f64) {
        self.bounds = WorldBounds::new(width, height);
        let rng = &mut self.rng;
        self.particles = (0..count)
            .map(|_| {
                let x = rng.next_f64() * width;
                let y = rng.next_f64() * height;
                Particle::at_rest(DVec2::new(x, y))
            })
            .collect();
        self.draw_list = self.particles.iter().map(|p| p.position).collect();
        debug!("initialized {count} particles in {width}x{height}");
    }

    /// Replaces the world bounds without moving any particle.
    pub fn update_bounds(&mut self, width: f64, height: f64) {
        self.bounds = WorldBounds::new(width, height);
        debug!("world bounds now {width}x{height}");
    }

    /// Assigns `targets[i]` to particle `i` for every index both share.
    ///
    /// Targets past the particle count are ignored. Particles past the end
    /// of the list are left without a target. Returns the number assigned.
    pub fn set_formation(&mut self, targets: &[DVec2]) -> usize {
        let assigned = targets.len().min(self.particles.len());
        for (i, particle) in self.particles.iter_mut().enumerate() {
            particle.target = targets.get(i).copied();
        }
        debug!(
            "formation assigned {assigned} of {} targets to {} particles",
            targets.len(),
            self.particles.len()
        );
        assigned
    }

    /// Releases every particle from its target.
    pub fn clear_formation(&mut self) {
        for particle in &mut self.particles {
            particle.target = None;
        }
        debug!("formation cleared");
    }

    /// Advances every particle by one tick and returns the positions to draw.
    pub fn step(&mut self, now: f64) -> &[DVec2] {
        let params = self.params;
        let bounds = self.bounds;
        let z = now / params.z_shrink;

        self.draw_list.clear();
        for particle in &mut self.particles {
            let cell = particle.position / params.grid_shrink;
            // Mirrored time axes keep the two channels decorrelated.
            let noise_x = self.noise.sample(cell.x, cell.y, -z);
            let noise_y = self.noise.sample(cell.x, cell.y, z);

            let kick_x = jitter(&mut self.rng, params.jitter, f64::cos);
            let kick_y = jitter(&mut self.rng, params.jitter, f64::sin);
            particle.velocity += DVec2::new(kick_x + noise_x, kick_y + noise_y);

            if let Some(target) = particle.target {
                particle.velocity += (target - particle.position) * params.formation_damping;
            }

            particle.velocity *= params.speed_multiplier;
            particle.position += particle.velocity;

            if particle.target.is_none() {
                particle.position = bounds.wrap(particle.position);
            }

            self.draw_list.push(particle.position);
        }

        &self.draw_list
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Mutable access to one particle, for hosts that need to place it.
    pub fn particle_mut(&mut self, index: usize) -> Option<&mut Particle> {
        self.particles.get_mut(index)
    }

    /// Positions recorded by the last tick.
    pub fn positions(&self) -> &[DVec2] {
        &self.draw_list
    }

    pub fn bounds(&self) -> WorldBounds {
        self.bounds
    }

    pub fn drift_params(&self) -> DriftParams {
        self.params
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Number of particles currently seeking a target.
    pub fn targeted_count(&self) -> usize {
        self.particles.iter().filter(|p| p.target.is_some()).count()
    }
}

/// Random kick along one channel: a magnitude in `[0, max)` scaled by
/// `trig` of a random angle. The magnitude is drawn before the angle.
fn jitter<R: RandomSource>(rng: &mut R, max: f64, trig: fn(f64) -> f64) -> f64 {
    let magnitude = rng.next_f64() * max;
    let angle = rng.next_f64() * TAU;
    magnitude * trig(angle)
}

impl<R: RandomSource, N: NoiseField> Engine for ParticleSystem<R, N> {
    fn step(&mut self, now: f64) -> &[DVec2] {
        ParticleSystem::<R, N>::step(self, now)
    }

    fn positions(&self) -> &[DVec2] {
        ParticleSystem::<R, N>::positions(self)
    }

    fn bounds(&self) -> WorldBounds {
        self.bounds
    }

    fn update_bounds(&mut self, bounds: WorldBounds) {
        ParticleSystem::<R, N>::update_bounds(self, bounds.width, bounds.height);
    }

    fn set_formation(&mut self, targets: &[DVec2]) -> usize {
        ParticleSystem::<R, N>::set_formation(self, targets)
    }

    fn clear_formation(&mut self) {
        ParticleSystem::<R, N>::clear_formation(self);
    }

    fn params(&self) -> Value {
        json!({
            "count": self.particles.len(),
            "speed_multiplier": self.params.speed_multiplier,
            "grid_shrink": self.params.grid_shrink,
            "z_shrink": self.params.z_shrink,
            "formation_damping": self.params.formation_damping,
            "jitter": self.params.jitter,
        })
    }

    fn param_schema(&self) -> Value {
        DriftParams::schema()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Random source that always returns the same value.
    struct Fixed(f64);

    impl RandomSource for Fixed {
        fn next_f64(&mut self) -> f64 {
            self.0
        }
    }

    /// Random source that cycles through a fixed list.
    struct Sequence {
        values: Vec<f64>,
        next: usize,
    }

    impl Sequence {
        fn new(values: &[f64]) -> Self {
            Self {
                values: values.to_vec(),
                next: 0,
            }
        }
    }

    impl RandomSource for Sequence {
        fn next_f64(&mut self) -> f64 {
            let v = self.values[self.next % self.values.len()];
            self.next += 1;
            v
        }
    }

    /// Noise field with the same value everywhere.
    struct Flat(f64);

    impl NoiseField for Flat {
        fn sample(&self, _x: f64, _y: f64, _z: f64) -> f64 {
            self.0
        }
    }

    /// Noise field that echoes one of its coordinates.
    struct Echo(usize);

    impl NoiseField for Echo {
        fn sample(&self, x: f64, y: f64, z: f64) -> f64 {
            [x, y, z][self.0]
        }
    }

    fn still(width: f64, height: f64, noise: f64) -> ParticleSystem<Fixed, Flat> {
        ParticleSystem::new(
            1,
            WorldBounds::new(width, height),
            DriftParams::default(),
            Fixed(0.0),
            Flat(noise),
        )
    }

    fn place(system: &mut ParticleSystem<impl RandomSource, impl NoiseField>, x: f64, y: f64) {
        let p = system.particle_mut(0).unwrap();
        p.position = DVec2::new(x, y);
        p.velocity = DVec2::ZERO;
    }

    // ---- Construction ----

    #[test]
    fn initialize_creates_resting_particles_inside_bounds() {
        let system = ParticleSystem::seeded(500, WorldBounds::new(320.0, 200.0), 42, DriftParams::default());
        assert_eq!(system.len(), 500);
        for p in system.particles() {
            assert!((0.0..320.0).contains(&p.position.x), "x out of range: {}", p.position.x);
            assert!((0.0..200.0).contains(&p.position.y), "y out of range: {}", p.position.y);
            assert_eq!(p.velocity, DVec2::ZERO);
            assert!(p.target.is_none());
        }
        assert_eq!(system.targeted_count(), 0);
    }

    #[test]
    fn initial_positions_are_drawable_before_first_step() {
        let system = ParticleSystem::seeded(10, WorldBounds::new(50.0, 50.0), 3, DriftParams::default());
        let expected: Vec<DVec2> = system.particles().iter().map(|p| p.position).collect();
        assert_eq!(system.positions(), expected.as_slice());
    }

    #[test]
    fn initialize_with_zero_count_is_empty() {
        let mut system = ParticleSystem::seeded(0, WorldBounds::new(10.0, 10.0), 1, DriftParams::default());
        assert!(system.is_empty());
        assert!(system.step(0.0).is_empty());
    }

    #[test]
    fn reinitialize_replaces_population_and_bounds() {
        let mut system = ParticleSystem::seeded(10, WorldBounds::new(10.0, 10.0), 1, DriftParams::default());
        system.set_formation(&[DVec2::ONE; 10]);
        system.initialize(25, 400.0, 300.0);
        assert_eq!(system.len(), 25);
        assert_eq!(system.bounds(), WorldBounds::new(400.0, 300.0));
        assert_eq!(system.targeted_count(), 0);
    }

    #[test]
    fn from_json_uses_defaults_for_empty_json() {
        let system = ParticleSystem::from_json(100.0, 100.0, 1, &json!({})).unwrap();
        assert_eq!(system.len(), DEFAULT_PARTICLE_COUNT);
        assert_eq!(system.drift_params(), DriftParams::default());
    }

    #[test]
    fn from_json_extracts_custom_values() {
        let system = ParticleSystem::from_json(
            100.0,
            100.0,
            1,
            &json!({"count": 2500, "speed_multiplier": 0.96, "jitter": 0.0}),
        )
        .unwrap();
        assert_eq!(system.len(), 2500);
        let p = system.drift_params();
        assert!((p.speed_multiplier - 0.96).abs() < f64::EPSILON);
        assert_eq!(p.jitter, 0.0);
        assert!((p.grid_shrink - DEFAULT_GRID_SHRINK).abs() < f64::EPSILON);
    }

    #[test]
    fn params_and_schema_cover_the_same_keys() {
        let system = ParticleSystem::from_json(10.0, 10.0, 1, &json!({"count": 4})).unwrap();
        let params = system.params();
        let schema = system.param_schema();
        assert_eq!(params["count"], 4);
        for key in ["count", "speed_multiplier", "grid_shrink", "z_shrink", "formation_damping", "jitter"] {
            assert!(params.get(key).is_some(), "params missing {key}");
            assert!(schema.get(key).is_some(), "schema missing {key}");
        }
    }

    #[test]
    fn from_json_rejects_oversized_count_before_allocating() {
        let result = ParticleSystem::from_json(10.0, 10.0, 1, &json!({"count": 1_u64 << 60}));
        assert!(matches!(result, Err(EngineError::InvalidParams(_))));
    }

    #[test]
    fn from_json_rejects_zero_count() {
        let result = ParticleSystem::from_json(10.0, 10.0, 1, &json!({"count": 0}));
        assert!(matches!(result, Err(EngineError::InvalidParams(_))));
    }

    #[test]
    fn from_json_rejects_zero_shrink() {
        for key in ["grid_shrink", "z_shrink"] {
            let err = DriftParams::from_json(&json!({ key: 0 })).unwrap_err();
            assert!(err.to_string().contains(key), "error does not name {key}: {err}");
        }
    }

    #[test]
    fn from_json_rejects_out_of_range_numbers() {
        assert!(DriftParams::from_json(&json!({"speed_multiplier": 1.5})).is_err());
        assert!(DriftParams::from_json(&json!({"jitter": -0.1})).is_err());
        assert!(DriftParams::from_json(&json!({"formation_damping": 2})).is_err());
    }

    #[test]
    fn from_json_accepts_range_edges() {
        let p = DriftParams::from_json(&json!({"grid_shrink": 1.0, "speed_multiplier": 1.0, "jitter": 0}))
            .unwrap();
        assert_eq!(p.grid_shrink, 1.0);
        assert_eq!(p.speed_multiplier, 1.0);
        assert_eq!(p.jitter, 0.0);
    }

    #[test]
    fn schema_defaults_pass_validation() {
        let schema = DriftParams::schema();
        let defaults: serde_json::Map<String, Value> = schema
            .as_object()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.clone(), v["default"].clone()))
            .collect();
        let system = ParticleSystem::from_json(10.0, 10.0, 1, &Value::Object(defaults)).unwrap();
        assert_eq!(system.len(), DEFAULT_PARTICLE_COUNT);
        assert_eq!(system.drift_params(), DriftParams::default());
    }

    #[test]
    fn schema_lists_every_parameter_with_range() {
        let schema = DriftParams::schema();
        for key in ["count", "speed_multiplier", "grid_shrink", "z_shrink", "formation_damping", "jitter"] {
            let entry = &schema[key];
            assert!(entry["min"].is_number(), "{key} missing min");
            assert!(entry["max"].is_number(), "{key} missing max");
            assert!(entry["min"].as_f64() <= entry["default"].as_f64(), "{key} default below min");
        }
        assert_eq!(schema["grid_shrink"]["min"], 1.0);
    }

    // ---- Bounds ----

    #[test]
    fn update_bounds_does_not_move_particles() {
        let mut system = ParticleSystem::seeded(50, WorldBounds::new(100.0, 100.0), 9, DriftParams::default());
        let before: Vec<Particle> = system.particles().to_vec();
        system.update_bounds(10.0, 10.0);
        assert_eq!(system.bounds(), WorldBounds::new(10.0, 10.0));
        assert_eq!(system.particles(), before.as_slice());
    }

    #[test]
    fn free_particle_past_far_edge_wraps_to_zero() {
        let mut system = still(100.0, 100.0, 10.0);
        place(&mut system, 95.0, 95.0);
        let drawn = system.step(0.0);
        assert_eq!(drawn[0], DVec2::new(0.0, 0.0));
        assert_eq!(system.particles()[0].position, DVec2::ZERO);
    }

    #[test]
    fn free_particle_below_zero_wraps_to_far_edge() {
        let mut system = still(100.0, 80.0, -10.0);
        place(&mut system, 5.0, 5.0);
        let drawn = system.step(0.0);
        assert_eq!(drawn[0], DVec2::new(100.0, 80.0));
    }

    #[test]
    fn wrapping_keeps_velocity() {
        let mut system = still(100.0, 100.0, 10.0);
        place(&mut system, 95.0, 95.0);
        system.step(0.0);
        let v = system.particles()[0].velocity;
        assert!((v.x - 9.4).abs() < 1e-12);
        assert!((v.y - 9.4).abs() < 1e-12);
    }

    #[test]
    fn targeted_particle_is_not_wrapped() {
        let mut system = still(100.0, 100.0, 10.0);
        place(&mut system, 95.0, 95.0);
        system.set_formation(&[DVec2::new(95.0, 95.0)]);
        let drawn = system.step(0.0);
        assert!(drawn[0].x > 100.0, "expected x past the edge, got {}", drawn[0].x);
        assert!(drawn[0].y > 100.0, "expected y past the edge, got {}", drawn[0].y);
    }

    // ---- Formation ----

    #[test]
    fn set_formation_assigns_targets_in_order() {
        let mut system = ParticleSystem::seeded(5, WorldBounds::new(100.0, 100.0), 1, DriftParams::default());
        let assigned = system.set_formation(&[DVec2::new(10.0, 20.0), DVec2::new(30.0, 40.0)]);
        assert_eq!(assigned, 2);
        assert_eq!(system.particles()[0].target, Some(DVec2::new(10.0, 20.0)));
        assert_eq!(system.particles()[1].target, Some(DVec2::new(30.0, 40.0)));
        assert!(system.particles()[2..].iter().all(|p| p.target.is_none()));

        system.clear_formation();
        assert!(system.particles().iter().all(|p| p.target.is_none()));
    }

    #[test]
    fn set_formation_ignores_excess_targets() {
        let mut system = ParticleSystem::seeded(3, WorldBounds::new(100.0, 100.0), 1, DriftParams::default());
        let targets: Vec<DVec2> = (0..10).map(|i| DVec2::splat(i as f64)).collect();
        assert_eq!(system.set_formation(&targets), 3);
        assert_eq!(system.targeted_count(), 3);
        assert_eq!(system.particles()[2].target, Some(DVec2::splat(2.0)));
    }

    #[test]
    fn empty_formation_assigns_nothing() {
        let mut system = ParticleSystem::seeded(3, WorldBounds::new(100.0, 100.0), 1, DriftParams::default());
        assert_eq!(system.set_formation(&[]), 0);
        assert_eq!(system.targeted_count(), 0);
    }

    #[test]
    fn shorter_formation_releases_the_tail() {
        let mut system = ParticleSystem::seeded(4, WorldBounds::new(100.0, 100.0), 1, DriftParams::default());
        system.set_formation(&[DVec2::ONE; 4]);
        system.set_formation(&[DVec2::splat(7.0)]);
        assert_eq!(system.targeted_count(), 1);
        assert_eq!(system.particles()[0].target, Some(DVec2::splat(7.0)));
    }

    #[test]
    fn particle_converges_on_target_without_wrapping() {
        let mut system = still(100.0, 100.0, 0.0);
        place(&mut system, 50.0, 50.0);
        system.set_formation(&[DVec2::new(60.0, 50.0)]);

        let mut xs = Vec::new();
        for tick in 0..400 {
            xs.push(system.step(tick as f64)[0].x);
        }

        // Rising toward the target until the first (damped) overshoot.
        for pair in xs[..25].windows(2) {
            assert!(pair[1] > pair[0], "x fell from {} to {}", pair[0], pair[1]);
        }
        assert!(xs.iter().all(|&x| (50.0..65.0).contains(&x)), "left the target region");
        let last = *xs.last().unwrap();
        assert!((last - 60.0).abs() < 0.05, "did not settle: {last}");
        assert_eq!(system.particles()[0].position.y, 50.0);
    }

    #[test]
    fn target_outside_world_is_reached_without_wrapping() {
        let mut system = still(100.0, 100.0, 0.0);
        place(&mut system, 90.0, 50.0);
        system.set_formation(&[DVec2::new(150.0, 50.0)]);

        let mut max_x = f64::NEG_INFINITY;
        for tick in 0..60 {
            let x = system.step(tick as f64)[0].x;
            assert!(x >= 90.0, "particle wrapped to {x}");
            max_x = max_x.max(x);
        }
        assert!(max_x > 100.0);
    }

    #[test]
    fn released_particle_wraps_again() {
        let mut system = still(100.0, 100.0, 0.0);
        place(&mut system, 50.0, 50.0);
        system.set_formation(&[DVec2::new(400.0, 50.0)]);
        for tick in 0..20 {
            system.step(tick as f64);
        }
        assert!(system.particles()[0].position.x > 100.0);
        system.clear_formation();
        let drawn = system.step(20.0);
        assert_eq!(drawn[0].x, 0.0);
    }

    // ---- Integration details ----

    #[test]
    fn velocity_is_damped_before_integration() {
        let mut system = still(1000.0, 1000.0, 1.0);
        place(&mut system, 500.0, 500.0);
        system.step(0.0);
        let p = system.particles()[0];
        assert!((p.velocity.x - 0.94).abs() < 1e-12);
        assert!((p.position.x - 500.94).abs() < 1e-9);
        system.step(0.0);
        let p = system.particles()[0];
        // (0.94 + 1.0) * 0.94
        assert!((p.velocity.x - 1.8236).abs() < 1e-12);
    }

    #[test]
    fn time_axis_is_mirrored_between_channels() {
        let mut system = ParticleSystem::new(
            1,
            WorldBounds::new(100.0, 100.0),
            DriftParams::default(),
            Fixed(0.0),
            Echo(2),
        );
        place(&mut system, 50.0, 50.0);
        system.step(4000.0);
        let v = system.particles()[0].velocity;
        assert!((v.x + 0.94).abs() < 1e-12, "x channel should see -now: {}", v.x);
        assert!((v.y - 0.94).abs() < 1e-12, "y channel should see +now: {}", v.y);
    }

    #[test]
    fn noise_is_sampled_in_shrunk_world_coordinates() {
        let mut system = ParticleSystem::new(
            1,
            WorldBounds::new(1000.0, 1000.0),
            DriftParams::default(),
            Fixed(0.0),
            Echo(0),
        );
        place(&mut system, 100.0, 300.0);
        system.step(0.0);
        let v = system.particles()[0].velocity;
        // Both channels see x / 200 = 0.5.
        assert!((v.x - 0.47).abs() < 1e-12);
        assert!((v.y - 0.47).abs() < 1e-12);
    }

    #[test]
    fn jitter_draws_magnitude_then_angle_x_channel_first() {
        let mut seq_system = ParticleSystem::new(
            1,
            WorldBounds::new(100.0, 100.0),
            DriftParams::default(),
            Sequence::new(&[0.5, 0.5]),
            Flat(0.0),
        );
        place(&mut seq_system, 50.0, 50.0);
        // X: magnitude 1.0 * 0.25, angle 0 -> cos = 1.
        // Y: magnitude 0.5 * 0.25, angle quarter turn -> sin = 1.
        seq_system.rng = Sequence::new(&[1.0, 0.0, 0.5, 0.25]);
        seq_system.step(0.0);
        let v = seq_system.particles()[0].velocity;
        assert!((v.x - 0.25 * 0.94).abs() < 1e-12, "x kick: {}", v.x);
        assert!((v.y - 0.125 * 0.94).abs() < 1e-12, "y kick: {}", v.y);
    }

    #[test]
    fn zero_jitter_makes_motion_purely_noise_driven() {
        let params = DriftParams {
            jitter: 0.0,
            ..DriftParams::default()
        };
        let mut a = ParticleSystem::seeded(20, WorldBounds::new(200.0, 200.0), 1, params);
        let mut b = ParticleSystem::seeded(20, WorldBounds::new(200.0, 200.0), 1, params);
        // Same placement; different jitter streams no longer matter.
        b.rng = Xorshift64::new(999);
        for tick in 0..20 {
            let now = tick as f64 * 16.0;
            assert_eq!(a.step(now), b.step(now));
        }
    }

    // ---- Determinism ----

    #[test]
    fn same_seed_produces_identical_position_sequences() {
        let bounds = WorldBounds::new(640.0, 480.0);
        let mut a = ParticleSystem::seeded(300, bounds, 77, DriftParams::default());
        let mut b = ParticleSystem::seeded(300, bounds, 77, DriftParams::default());
        for tick in 0..50 {
            let now = tick as f64 * 1000.0 / 60.0;
            let pa = a.step(now).to_vec();
            let pb = b.step(now);
            assert!(pa
                .iter()
                .zip(pb)
                .all(|(p, q)| p.x.to_bits() == q.x.to_bits() && p.y.to_bits() == q.y.to_bits()));
        }
    }

    #[test]
    fn stubbed_random_source_reproduces_runs() {
        let run = || {
            let mut system = ParticleSystem::new(
                8,
                WorldBounds::new(100.0, 100.0),
                DriftParams::default(),
                Sequence::new(&[0.1, 0.7, 0.3, 0.9, 0.5]),
                Perlin3,
            );
            (0..30)
                .map(|tick| system.step(tick as f64 * 16.0).to_vec())
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn different_seeds_diverge() {
        let bounds = WorldBounds::new(640.0, 480.0);
        let a = ParticleSystem::seeded(50, bounds, 1, DriftParams::default());
        let b = ParticleSystem::seeded(50, bounds, 2, DriftParams::default());
        assert_ne!(a.positions(), b.positions());
    }

    #[test]
    fn engine_is_object_safe() {
        let system = ParticleSystem::seeded(16, WorldBounds::new(32.0, 32.0), 42, DriftParams::default());
        let mut boxed: Box<dyn Engine> = Box::new(system);
        assert_eq!(boxed.step(0.0).len(), 16);
        assert_eq!(boxed.set_formation(&[DVec2::ONE; 4]), 4);
        boxed.update_bounds(WorldBounds::new(64.0, 64.0));
        assert_eq!(boxed.bounds().width, 64.0);
    }

    // ---- Property-based tests ----

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn extent() -> impl Strategy<Value = f64> {
            8.0_f64..=1024.0
        }

        proptest! {
            #[test]
            fn free_particles_stay_inside_world(
                w in extent(),
                h in extent(),
                seed: u64,
            ) {
                let mut system = ParticleSystem::seeded(64, WorldBounds::new(w, h), seed, DriftParams::default());
                for tick in 0..30 {
                    for p in system.step(tick as f64 * 16.0) {
                        prop_assert!((0.0..=w).contains(&p.x), "x = {} outside [0, {w}]", p.x);
                        prop_assert!((0.0..=h).contains(&p.y), "y = {} outside [0, {h}]", p.y);
                    }
                }
            }

            #[test]
            fn deterministic_across_instances(
                w in extent(),
                h in extent(),
                seed: u64,
            ) {
                let bounds = WorldBounds::new(w, h);
                let mut a = ParticleSystem::seeded(32, bounds, seed, DriftParams::default());
                let mut b = ParticleSystem::seeded(32, bounds, seed, DriftParams::default());
                for tick in 0..10 {
                    a.step(tick as f64 * 16.0);
                    b.step(tick as f64 * 16.0);
                }
                for (pa, pb) in a.positions().iter().zip(b.positions()) {
                    prop_assert_eq!(pa.x.to_bits(), pb.x.to_bits());
                    prop_assert_eq!(pa.y.to_bits(), pb.y.to_bits());
                }
            }

            #[test]
            fn no_nans_produced(
                w in extent(),
                h in extent(),
                seed: u64,
                tx in -500.0_f64..500.0,
                ty in -500.0_f64..500.0,
            ) {
                let mut system = ParticleSystem::seeded(32, WorldBounds::new(w, h), seed, DriftParams::default());
                system.set_formation(&[DVec2::new(tx, ty); 16]);
                for tick in 0..30 {
                    for p in system.step(tick as f64 * 16.0) {
                        prop_assert!(p.is_finite(), "non-finite position {p:?}");
                    }
                }
            }

            #[test]
            fn formation_assigns_min_of_lengths(
                count in 0_usize..64,
                targets in 0_usize..128,
            ) {
                let mut system = ParticleSystem::seeded(count, WorldBounds::new(100.0, 100.0), 5, DriftParams::default());
                let list = vec![DVec2::splat(1.0); targets];
                let assigned = system.set_formation(&list);
                prop_assert_eq!(assigned, count.min(targets));
                prop_assert_eq!(system.targeted_count(), count.min(targets));
                system.clear_formation();
                prop_assert_eq!(system.targeted_count(), 0);
            }
        }
    }
}
