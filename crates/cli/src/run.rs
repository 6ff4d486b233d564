//! Headless run loop: the host side of the simulation.
//!
//! Acts as the clock (a simulated frame clock from the [`Seed`]), the
//! formation source (a PNG mask) and the renderer (a PNG of the final frame).

use std::path::Path;

use drift_core::{Engine, Seed, WorldBounds};
use drift_particles::ParticleSystem;
use drift_render::snapshot::write_png;
use drift_render::{FormationMask, Frame};
use log::{debug, info};
use serde_json::{json, Value};

use crate::error::CliError;

/// What a finished run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub particles: usize,
    pub steps: usize,
    /// Targets assigned when the formation cue fired, if it did.
    pub formation_targets: Option<usize>,
    /// Particles still seeking a target at the end of the run.
    pub targeted: usize,
    /// Foreground pixels in the written frame.
    pub lit_pixels: usize,
}

impl RunReport {
    pub fn to_json(&self) -> Value {
        json!({
            "particles": self.particles,
            "steps": self.steps,
            "formation_targets": self.formation_targets,
            "targeted": self.targeted,
            "lit_pixels": self.lit_pixels,
        })
    }
}

/// Runs `seed` to completion and writes the final frame to `output`.
pub fn run_seed(seed: &Seed, output: &Path) -> Result<RunReport, CliError> {
    seed.validate()?;
    let bounds = WorldBounds::checked(seed.width as f64, seed.height as f64)?;

    let formation = match &seed.formation {
        Some(cue) => {
            let mask = FormationMask::from_png(Path::new(&cue.mask))?;
            Some((cue, mask.centered_in(bounds)))
        }
        None => None,
    };

    let mut system =
        ParticleSystem::from_json(bounds.width, bounds.height, seed.seed, &seed.params)?;
    let particles = system.len();
    info!(
        "running {particles} particles in {}x{} for {} steps (seed {})",
        seed.width, seed.height, seed.steps, seed.seed
    );

    let engine: &mut dyn Engine = &mut system;
    let mut formation_targets = None;
    for step in 0..seed.steps {
        if let Some((cue, targets)) = &formation {
            if cue.at_step == step {
                let assigned = engine.set_formation(targets);
                info!("step {step}: formation engaged, {assigned} particles assigned");
                formation_targets = Some(assigned);
            }
            if cue.release_step == Some(step) {
                engine.clear_formation();
                info!("step {step}: formation released");
            }
        }
        engine.step(seed.clock(step));
    }

    let frame = Frame::from_engine(&system)?;
    write_png(&frame, output)?;
    let lit_pixels = frame.lit_count();
    debug!("frame has {lit_pixels} lit pixels");

    Ok(RunReport {
        particles,
        steps: seed.steps,
        formation_targets,
        targeted: system.targeted_count(),
        lit_pixels,
    })
}
