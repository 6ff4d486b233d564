//! Reproducible description of a headless run.
//!
//! A [`Seed`] captures everything a host needs to replay a run bit for bit:
//! world size, parameter overrides, PRNG seed, tick count, the simulated
//! frame interval, and an optional formation cue.

use crate::error::EngineError;
use serde::{Deserialize, Serialize};

/// Frame interval of a 60 Hz display, in milliseconds.
pub const DEFAULT_FRAME_MS: f64 = 1000.0 / 60.0;

/// When to pull particles into a formation mask and when to let them go.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FormationCue {
    /// Path of the bitmap whose lit pixels become targets.
    pub mask: String,
    /// Tick at which targets are assigned.
    pub at_step: usize,
    /// Tick at which targets are cleared, if ever.
    #[serde(default)]
    pub release_step: Option<usize>,
}

/// Reproducible description of a run.
///
/// Two identical `Seed` values fed to the same binary produce bit-identical
/// frames.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Seed {
    pub width: usize,
    pub height: usize,
    pub params: serde_json::Value,
    pub seed: u64,
    pub steps: usize,
    #[serde(default = "default_frame_ms")]
    pub frame_ms: f64,
    #[serde(default)]
    pub formation: Option<FormationCue>,
}

fn default_frame_ms() -> f64 {
    DEFAULT_FRAME_MS
}

impl Seed {
    /// Creates a new Seed with default params (`{}`), zero steps, a 60 Hz
    /// clock, and no formation.
    pub fn new(width: usize, height: usize, seed: u64) -> Self {
        Self {
            width,
            height,
            params: serde_json::Value::Object(serde_json::Map::new()),
            seed,
            steps: 0,
            frame_ms: DEFAULT_FRAME_MS,
            formation: None,
        }
    }

    /// Simulated clock value for tick `step`.
    pub fn clock(&self, step: usize) -> f64 {
        step as f64 * self.frame_ms
    }

    /// Validates dimensions, the frame interval, and formation timing.
    ///
    /// A formation cue must fire inside the run: `at_step < steps`, and a
    /// release, if any, must come after it.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.width == 0 || self.height == 0 {
            return Err(EngineError::InvalidDimensions);
        }
        self.width
            .checked_mul(self.height)
            .ok_or(EngineError::InvalidDimensions)?;
        if !self.params.is_object() {
            return Err(EngineError::Seed("params must be a JSON object".into()));
        }
        if !(self.frame_ms.is_finite() && self.frame_ms > 0.0) {
            return Err(EngineError::Seed(format!(
                "frame_ms must be positive, got {}",
                self.frame_ms
            )));
        }
        if let Some(cue) = &self.formation {
            if cue.at_step >= self.steps {
                return Err(EngineError::Seed(format!(
                    "formation at_step {} never fires in a {}-step run",
                    cue.at_step, self.steps
                )));
            }
            if let Some(release) = cue.release_step {
                if release <= cue.at_step {
                    return Err(EngineError::Seed(format!(
                        "release_step {release} must come after at_step {}",
                        cue.at_step
                    )));
                }
            }
        }
        Ok(())
    }
}
