#![deny(unsafe_code)]
//! Core types and traits for drift, a noise-driven particle field.
//!
//! Provides the `Engine` trait hosts drive once per frame, the `Perlin3`
//! gradient noise behind the `NoiseField` trait, the `Xorshift64` PRNG behind
//! `RandomSource`, `WorldBounds`, parameter helpers, and `Seed`.

pub mod bounds;
pub mod engine;
pub mod error;
pub mod noise;
pub mod params;
pub mod prng;
pub mod seed;

pub use bounds::WorldBounds;
pub use engine::Engine;
pub use error::EngineError;
pub use noise::{NoiseField, Perlin3};
pub use prng::{RandomSource, Xorshift64};
pub use seed::{FormationCue, Seed};
