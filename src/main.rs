//! Can Stability Calculator
//!
//! Works out whether a drinks can tips over when the vehicle it stands in
//! accelerates or brakes, and which fill level makes it hardest to tip.

mod error;
mod models;
mod physics;
mod presets;
mod state;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};

use crate::presets::PresetCatalog;

/// Upper bound on rows printed by `sweep-accel`
const MAX_SWEEP_ROWS: usize = 10_000;
use crate::state::SimulationState;

#[derive(Parser)]
#[command(name = "can-stability")]
#[command(about = "Tipping calculator for beverage cans under horizontal acceleration")]
struct Cli {
    /// Directory of additional *.container preset definitions
    #[arg(short, long, global = true)]
    presets_dir: Option<PathBuf>,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Container selection and per-field overrides
#[derive(Args)]
struct ContainerArgs {
    /// Preset to start from (e.g., "redbull", "monster", "cola")
    #[arg(default_value = "redbull")]
    preset: String,

    /// Override can height in mm
    #[arg(long)]
    height: Option<f64>,

    /// Override can radius in mm
    #[arg(long)]
    radius: Option<f64>,

    /// Override empty can mass in g
    #[arg(long)]
    empty_mass: Option<f64>,

    /// Override liquid volume in ml
    #[arg(long)]
    volume: Option<f64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate stability at a fill level and acceleration
    Analyze {
        #[command(flatten)]
        container: ContainerArgs,

        /// Fill level in percent (clamped to 0-100)
        #[arg(short, long, default_value_t = state::DEFAULT_FILL_PERCENT)]
        fill: f64,

        /// Applied horizontal acceleration in m/s²
        #[arg(short, long, default_value_t = state::DEFAULT_ACCELERATION_MPS2, allow_negative_numbers = true)]
        accel: f64,
    },

    /// Find the fill level that maximizes resistance to tipping
    Optimal {
        #[command(flatten)]
        container: ContainerArgs,
    },

    /// Print critical acceleration against fill level
    Curve {
        #[command(flatten)]
        container: ContainerArgs,

        /// Fill step in percent
        #[arg(short, long, default_value = "5.0")]
        step: f64,

        /// Fill level to mark on the chart
        #[arg(short, long, default_value_t = state::DEFAULT_FILL_PERCENT)]
        fill: f64,

        /// Applied acceleration to mark on the chart
        #[arg(short, long, default_value_t = state::DEFAULT_ACCELERATION_MPS2, allow_negative_numbers = true)]
        accel: f64,
    },

    /// Show the tip verdict across a range of applied accelerations
    SweepAccel {
        #[command(flatten)]
        container: ContainerArgs,

        /// Fill level in percent
        #[arg(short, long, default_value_t = state::DEFAULT_FILL_PERCENT)]
        fill: f64,

        /// Highest acceleration to test in m/s²
        #[arg(long, default_value = "10.0")]
        max: f64,

        /// Acceleration step in m/s²
        #[arg(long, default_value = "0.5")]
        step: f64,
    },

    /// List all container presets
    Presets,

    /// Show details for a specific preset
    Preset {
        /// Preset ID
        id: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let mut catalog = PresetCatalog::builtin();
    if let Some(dir) = &cli.presets_dir {
        let stats = presets::load_directory(&mut catalog, dir)
            .with_context(|| format!("Failed to load presets from {}", dir.display()))?;
        log::info!("{}", stats);
    }
    log::debug!("{} presets available", catalog.len());

    match cli.command {
        Commands::Analyze {
            container,
            fill,
            accel,
        } => {
            let mut sim = build_state(&catalog, &container)?;
            sim.set_fill_percent(fill)?;
            sim.set_acceleration_mps2(accel)?;

            let inputs = sim.inputs();
            let result = sim.result();
            println!("{}", physics::format_stability_report(&inputs, &result));

            let optimal = sim.optimal();
            println!(
                "Optimal fill: {:.1}% (critical acceleration {:.2} m/s²)",
                optimal.best_fill_percent, optimal.max_critical_acceleration_mps2
            );
            println!("{}", sim.status());
        }

        Commands::Optimal { container } => {
            let sim = build_state(&catalog, &container)?;
            let optimal = sim.optimal();
            let full = physics::critical_acceleration(sim.container(), 100.0);

            println!("=== {} ===", sim.container().name);
            println!("Optimal fill:           {:.1}%", optimal.best_fill_percent);
            println!(
                "Critical acceleration:  {:.3} m/s²",
                optimal.max_critical_acceleration_mps2
            );
            println!("  (full can:            {:.3} m/s²)", full);
        }

        Commands::Curve {
            container,
            step,
            fill,
            accel,
        } => {
            let mut sim = build_state(&catalog, &container)?;
            sim.set_fill_percent(fill)?;
            sim.set_acceleration_mps2(accel)?;

            let curve = physics::stability_curve(sim.container(), step);
            println!("Stability curve: {}\n", sim.container().name);
            println!(
                "{}",
                physics::format_stability_curve(
                    &curve,
                    sim.fill_percent(),
                    sim.optimal().best_fill_percent,
                    sim.horizontal_acceleration_mps2()
                )
            );
        }

        Commands::SweepAccel {
            container,
            fill,
            max,
            step,
        } => {
            let steps = acceleration_steps(max, step)?;
            let mut sim = build_state(&catalog, &container)?;
            sim.set_fill_percent(fill)?;

            println!(
                "{} at {:.0}% fill (critical {:.3} m/s²)\n",
                sim.container().name,
                sim.fill_percent(),
                sim.result().critical_acceleration_mps2
            );
            println!("{:>10} {:>10} {:>8}", "a (m/s²)", "factor", "tips?");
            println!("{}", "-".repeat(30));

            for i in 0..=steps {
                sim.set_acceleration_mps2(i as f64 * step)?;
                let result = sim.result();
                let factor = if result.stability_factor.is_infinite() {
                    "inf".to_string()
                } else {
                    format!("{:.2}", result.stability_factor)
                };
                println!(
                    "{:>10.2} {:>10} {:>8}",
                    sim.horizontal_acceleration_mps2(),
                    factor,
                    if result.would_tip { "yes" } else { "no" }
                );
            }
        }

        Commands::Presets => {
            println!(
                "{:<12} {:<16} {:>8} {:>8} {:>8} {:>8}",
                "ID", "Name", "H (mm)", "R (mm)", "Mass (g)", "Vol (ml)"
            );
            println!("{}", "-".repeat(66));
            for p in catalog.iter() {
                println!(
                    "{:<12} {:<16} {:>8.0} {:>8.0} {:>8.0} {:>8.0}",
                    p.id, p.name, p.height_mm, p.radius_mm, p.empty_mass_g, p.liquid_volume_ml
                );
            }
        }

        Commands::Preset { id } => {
            if let Some(p) = catalog.get(&id) {
                let optimal = physics::find_optimal_fill(p);
                println!("Preset: {}", p.name);
                println!("  ID: {}", p.id);
                println!("  Height: {} mm", p.height_mm);
                println!("  Radius: {} mm", p.radius_mm);
                println!("  Empty mass: {} g", p.empty_mass_g);
                println!("  Volume: {} ml", p.liquid_volume_ml);
                println!("  Can color: {:?}", p.color);
                println!("  Liquid color: {:?}", p.liquid_color);
                println!("  Optimal fill: {:.1}%", optimal.best_fill_percent);
            } else {
                println!("Preset '{}' not found", id);
            }
        }
    }

    Ok(())
}

/// Select the preset and apply any field overrides
fn build_state(catalog: &PresetCatalog, args: &ContainerArgs) -> Result<SimulationState> {
    let Some(first) = catalog.iter().next().cloned() else {
        bail!("No container presets available");
    };
    let mut sim = SimulationState::new(first)?;
    sim.select_preset(catalog, &args.preset)?;

    if let Some(height) = args.height {
        sim.set_height_mm(height)?;
    }
    if let Some(radius) = args.radius {
        sim.set_radius_mm(radius)?;
    }
    if let Some(mass) = args.empty_mass {
        sim.set_empty_mass_g(mass)?;
    }
    if let Some(volume) = args.volume {
        sim.set_liquid_volume_ml(volume)?;
    }

    Ok(sim)
}

/// Number of steps above zero in an acceleration sweep up to `max`
fn acceleration_steps(max: f64, step: f64) -> Result<usize> {
    if !step.is_finite() || step <= 0.0 {
        bail!("--step must be a finite number greater than zero");
    }
    if !max.is_finite() || max < 0.0 {
        bail!("--max must be a finite, non-negative acceleration");
    }

    let steps = (max / step).floor();
    if steps >= MAX_SWEEP_ROWS as f64 {
        bail!(
            "--max {} with --step {} would print more than {} rows",
            max,
            step,
            MAX_SWEEP_ROWS
        );
    }

    Ok(steps as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sweep_steps_cover_range() {
        assert_eq!(acceleration_steps(10.0, 0.5).unwrap(), 20);
        assert_eq!(acceleration_steps(0.0, 0.5).unwrap(), 0);
        assert_eq!(acceleration_steps(1.2, 0.5).unwrap(), 2);
    }

    #[test]
    fn sweep_rejects_unbounded_ranges() {
        assert!(acceleration_steps(f64::INFINITY, 0.5).is_err());
        assert!(acceleration_steps(f64::NAN, 0.5).is_err());
        assert!(acceleration_steps(-1.0, 0.5).is_err());
        assert!(acceleration_steps(10.0, 0.0).is_err());
        assert!(acceleration_steps(10.0, f64::NAN).is_err());
        assert!(acceleration_steps(1e12, 1e-3).is_err());
        assert!(acceleration_steps(MAX_SWEEP_ROWS as f64, 1.0).is_err());
        assert!(acceleration_steps(MAX_SWEEP_ROWS as f64 - 1.0, 1.0).is_ok());
    }

    #[test]
    fn negative_acceleration_parses_for_analyze_and_curve() {
        for command in ["analyze", "curve"] {
            let cli = Cli::try_parse_from(["can-stability", command, "--accel", "-2"]);
            assert!(cli.is_ok(), "{} should accept a negative acceleration", command);
        }

        match Cli::try_parse_from(["can-stability", "curve", "--accel", "-2"]).unwrap().command {
            Commands::Curve { accel, .. } => assert_eq!(accel, -2.0),
            _ => panic!("expected the curve command"),
        }
    }
}
