#![deny(unsafe_code)]
//! CLI binary for drift.
//!
//! Subcommands:
//! - `render`: run the particle field N steps, optionally forming a mask, write PNG
//! - `replay <seed.json>`: re-run a saved seed
//! - `params`: print the parameter schema

mod error;
mod run;

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use drift_core::seed::DEFAULT_FRAME_MS;
use drift_core::{FormationCue, Seed};
use drift_particles::DriftParams;
use error::CliError;
use log::info;
use run::{run_seed, RunReport};

#[derive(Parser)]
#[command(name = "drift", about = "Noise-driven particle field renderer")]
struct Cli {
    /// Output as JSON instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the simulation for N steps and write the final frame as PNG.
    Render {
        /// World width in pixels.
        #[arg(short = 'W', long, default_value_t = 640)]
        width: usize,

        /// World height in pixels.
        #[arg(short = 'H', long, default_value_t = 360)]
        height: usize,

        /// Number of particles (overrides `count` in --params).
        #[arg(short = 'n', long)]
        particles: Option<usize>,

        /// Number of simulation steps.
        #[arg(short, long, default_value_t = 600)]
        steps: usize,

        /// PRNG seed for deterministic output.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Simulated milliseconds between frames.
        #[arg(long, default_value_t = DEFAULT_FRAME_MS)]
        frame_ms: f64,

        /// Bitmap whose opaque pixels become formation targets.
        #[arg(long)]
        formation: Option<PathBuf>,

        /// Step at which the formation engages.
        #[arg(long, default_value_t = 150, requires = "formation")]
        formation_at: usize,

        /// Step at which the formation is released.
        #[arg(long, requires = "formation")]
        release_at: Option<usize>,

        /// Output file path.
        #[arg(short, long, default_value = "drift.png")]
        output: PathBuf,

        /// Simulation parameters as a JSON string.
        #[arg(long, default_value = "{}")]
        params: String,

        /// Also write the run description to this file for `replay`.
        #[arg(long)]
        save_seed: Option<PathBuf>,
    },
    /// Re-run a seed file written by `render --save-seed`.
    Replay {
        /// Seed JSON file.
        seed: PathBuf,

        /// Output file path.
        #[arg(short, long, default_value = "drift.png")]
        output: PathBuf,
    },
    /// Print every simulation parameter with its default and range.
    Params,
}

#[allow(clippy::too_many_arguments)]
fn build_seed(
    width: usize,
    height: usize,
    particles: Option<usize>,
    steps: usize,
    seed: u64,
    frame_ms: f64,
    formation: Option<(PathBuf, usize, Option<usize>)>,
    params: &str,
) -> Result<Seed, CliError> {
    let mut params: serde_json::Value = serde_json::from_str(params)
        .map_err(|e| CliError::Input(format!("invalid --params JSON: {e}")))?;
    if let Some(count) = particles {
        params
            .as_object_mut()
            .ok_or_else(|| CliError::Input("--params must be a JSON object".into()))?
            .insert("count".into(), count.into());
    }

    let mut s = Seed::new(width, height, seed);
    s.params = params;
    s.steps = steps;
    s.frame_ms = frame_ms;
    s.formation = formation.map(|(mask, at_step, release_step)| FormationCue {
        mask: mask.display().to_string(),
        at_step,
        release_step,
    });
    s.validate()?;
    Ok(s)
}

fn report(json: bool, seed: &Seed, output: &Path, report: &RunReport) -> Result<(), CliError> {
    if json {
        let mut info = report.to_json();
        info["seed"] = serde_json::to_value(seed)?;
        info["output"] = output.display().to_string().into();
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        let formation = match report.formation_targets {
            Some(n) => format!(", {n} in formation"),
            None => String::new(),
        };
        eprintln!(
            "rendered {} particles ({}x{}, {} steps, seed {}{formation}) -> {}",
            report.particles,
            seed.width,
            seed.height,
            report.steps,
            seed.seed,
            output.display()
        );
    }
    Ok(())
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Params => {
            let schema = DriftParams::schema();
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&schema)?);
            } else if let Some(entries) = schema.as_object() {
                println!("Parameters:");
                for (name, entry) in entries {
                    println!(
                        "  {name:<18} default {:<8} range [{}, {}]  {}",
                        entry["default"],
                        entry["min"],
                        entry["max"],
                        entry["description"].as_str().unwrap_or_default()
                    );
                }
            }
        }
        Command::Render {
            width,
            height,
            particles,
            steps,
            seed,
            frame_ms,
            formation,
            formation_at,
            release_at,
            output,
            params,
            save_seed,
        } => {
            let formation = formation.map(|path| (path, formation_at, release_at));
            let seed = build_seed(
                width, height, particles, steps, seed, frame_ms, formation, &params,
            )?;
            if let Some(path) = &save_seed {
                fs::write(path, serde_json::to_string_pretty(&seed)?)?;
                info!("saved seed to {}", path.display());
            }
            let result = run_seed(&seed, &output)?;
            report(cli.json, &seed, &output, &result)?;
        }
        Command::Replay { seed, output } => {
            let text = fs::read_to_string(&seed)?;
            let seed: Seed = serde_json::from_str(&text)
                .map_err(|e| CliError::Input(format!("invalid seed file {}: {e}", seed.display())))?;
            let result = run_seed(&seed, &output)?;
            report(cli.json, &seed, &output, &result)?;
        }
    }

    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let json_mode = cli.json;
    if let Err(e) = run(cli) {
        if json_mode {
            let j = serde_json::json!({"error": e.to_string(), "exit_code": e.exit_code()});
            eprintln!("{}", serde_json::to_string_pretty(&j).unwrap_or_default());
        } else {
            eprintln!("error: {e}");
        }
        process::exit(e.exit_code());
    }
}
