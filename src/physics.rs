//! Quasi-static tipping model for a cylindrical container
//!
//! The container is treated as a rigid uniform shell (center of mass at
//! half height) holding liquid that fills it from the bottom. Under a
//! horizontal acceleration `a` the container tips about the edge of its
//! base once `a / g` reaches `radius / com_height`.

use crate::models::{
    ContainerSpec, CurvePoint, OptimalFillResult, SimulationInputs, StabilityCurve,
    StabilityResult,
};

/// Standard gravity in m/s²
pub const GRAVITY_MPS2: f64 = 9.81;

/// Resolution of the optimal fill scan, in fill percentage points
pub const OPTIMAL_FILL_STEP_PERCENT: f64 = 0.5;

/// Mass distribution at a given fill level
#[derive(Debug, Clone, Copy)]
struct MassProfile {
    liquid_height_mm: f64,
    liquid_mass_g: f64,
    total_mass_g: f64,
    center_of_mass_height_mm: f64,
}

fn mass_profile(container: &ContainerSpec, fill_percent: f64) -> MassProfile {
    let fraction = fill_percent / 100.0;
    let liquid_height_mm = fraction * container.height_mm;
    let liquid_mass_g = fraction * container.liquid_volume_ml;
    let total_mass_g = container.empty_mass_g + liquid_mass_g;

    let shell_com = container.height_mm / 2.0;
    let liquid_com = liquid_height_mm / 2.0;

    // No mass to weight: fall back to the empty shell's COM
    let center_of_mass_height_mm = if total_mass_g > 0.0 {
        (container.empty_mass_g * shell_com + liquid_mass_g * liquid_com) / total_mass_g
    } else {
        shell_com
    };

    MassProfile {
        liquid_height_mm,
        liquid_mass_g,
        total_mass_g,
        center_of_mass_height_mm,
    }
}

fn tipping_angle(radius_mm: f64, com_height_mm: f64) -> f64 {
    (radius_mm / com_height_mm).atan()
}

fn critical_from_angle(tipping_angle_radians: f64) -> f64 {
    GRAVITY_MPS2 * tipping_angle_radians.tan()
}

/// Horizontal acceleration at which the container starts to tip, for a
/// given fill level
pub fn critical_acceleration(container: &ContainerSpec, fill_percent: f64) -> f64 {
    let profile = mass_profile(container, fill_percent);
    critical_from_angle(tipping_angle(
        container.radius_mm,
        profile.center_of_mass_height_mm,
    ))
}

/// Evaluate the stability of a container under a horizontal acceleration
///
/// The caller is expected to pass a validated container and a fill level
/// already clamped to `[0, 100]`.
pub fn compute_stability(
    container: &ContainerSpec,
    fill_percent: f64,
    horizontal_acceleration_mps2: f64,
) -> StabilityResult {
    let profile = mass_profile(container, fill_percent);
    let tipping_angle_radians =
        tipping_angle(container.radius_mm, profile.center_of_mass_height_mm);
    let critical_acceleration_mps2 = critical_from_angle(tipping_angle_radians);

    let stability_factor = if horizontal_acceleration_mps2 == 0.0 {
        f64::INFINITY
    } else {
        critical_acceleration_mps2 / horizontal_acceleration_mps2
    };

    StabilityResult {
        liquid_height_mm: profile.liquid_height_mm,
        liquid_mass_g: profile.liquid_mass_g,
        total_mass_g: profile.total_mass_g,
        center_of_mass_height_mm: profile.center_of_mass_height_mm,
        tipping_angle_radians,
        critical_acceleration_mps2,
        stability_factor,
        // Tipping exactly at the threshold counts as a tip
        would_tip: horizontal_acceleration_mps2 >= critical_acceleration_mps2,
    }
}

/// Scan fill levels 0, 0.5, ..., 100 and return the one maximizing `objective`
///
/// Only a strictly greater value replaces the current best, so the lowest
/// fill wins ties. Non-positive objectives leave the result at fill 0.
pub fn find_optimal_fill_by<F>(objective: F) -> OptimalFillResult
where
    F: Fn(f64) -> f64,
{
    let samples = (100.0 / OPTIMAL_FILL_STEP_PERCENT).round() as usize;
    let mut best = OptimalFillResult {
        best_fill_percent: 0.0,
        max_critical_acceleration_mps2: 0.0,
    };

    for i in 0..=samples {
        let fill = i as f64 * OPTIMAL_FILL_STEP_PERCENT;
        let value = objective(fill);
        if value > best.max_critical_acceleration_mps2 {
            best.max_critical_acceleration_mps2 = value;
            best.best_fill_percent = fill;
        }
    }

    best
}

/// Fill level that maximizes the container's resistance to tipping
pub fn find_optimal_fill(container: &ContainerSpec) -> OptimalFillResult {
    let result = find_optimal_fill_by(|fill| critical_acceleration(container, fill));
    log::debug!(
        "optimal fill for {}: {:.1}% ({:.3} m/s²)",
        container.id,
        result.best_fill_percent,
        result.max_critical_acceleration_mps2
    );
    result
}

/// Finest fill step accepted by [`stability_curve`], in percentage points
pub const MIN_CURVE_STEP_PERCENT: f64 = 0.01;

/// Sample critical acceleration from 0 to 100 % fill for plotting
///
/// The step is clamped to `[MIN_CURVE_STEP_PERCENT, 100]` and falls back to
/// 1 % when not a positive number. The last sample is always taken at
/// exactly 100 %.
pub fn stability_curve(container: &ContainerSpec, step_percent: f64) -> StabilityCurve {
    let step = if step_percent > 0.0 && step_percent.is_finite() {
        step_percent.clamp(MIN_CURVE_STEP_PERCENT, 100.0)
    } else {
        1.0
    };

    let intervals = (100.0 / step).ceil() as usize;
    let mut points = Vec::with_capacity(intervals + 1);
    let mut max_critical = 0.0_f64;

    for i in 0..=intervals {
        let fill_percent = (i as f64 * step).min(100.0);
        let critical_acceleration_mps2 = critical_acceleration(container, fill_percent);
        max_critical = max_critical.max(critical_acceleration_mps2);
        points.push(CurvePoint {
            fill_percent,
            critical_acceleration_mps2,
        });
    }

    StabilityCurve {
        points,
        max_critical_acceleration_mps2: max_critical,
    }
}

/// Format a stability result as a readable report
pub fn format_stability_report(inputs: &SimulationInputs, result: &StabilityResult) -> String {
    let mut output = String::new();
    let container = &inputs.container;

    let factor = if result.stability_factor.is_infinite() {
        "∞ (no acceleration)".to_string()
    } else {
        format!("{:.2}x", result.stability_factor)
    };
    let verdict = if result.would_tip { "TIPS OVER" } else { "stays upright" };

    output.push_str(&format!("=== {} ===\n", container.name));
    output.push_str(&format!(
        "Can: {:.0} mm tall, {:.0} mm radius, {:.0} g empty, {:.0} ml\n",
        container.height_mm, container.radius_mm, container.empty_mass_g, container.liquid_volume_ml
    ));
    output.push_str(&format!(
        "Fill: {:.0}%   Applied acceleration: {:.1} m/s²\n\n",
        inputs.fill_percent, inputs.horizontal_acceleration_mps2
    ));
    output.push_str(&format!("  Liquid height:         {:.2} mm\n", result.liquid_height_mm));
    output.push_str(&format!("  Liquid mass:           {:.2} g\n", result.liquid_mass_g));
    output.push_str(&format!("  Total mass:            {:.2} g\n", result.total_mass_g));
    output.push_str(&format!(
        "  Center of mass:        {:.2} mm\n",
        result.center_of_mass_height_mm
    ));
    output.push_str(&format!(
        "  Tipping angle:         {:.2}°\n",
        result.tipping_angle_degrees()
    ));
    output.push_str(&format!(
        "  Critical acceleration: {:.2} m/s²\n",
        result.critical_acceleration_mps2
    ));
    output.push_str(&format!("  Stability factor:      {}\n", factor));
    output.push_str(&format!("  Verdict:               {}\n", verdict));

    output
}

/// Index of the curve sample closest to `fill_percent`; the lower fill wins ties
fn nearest_point(curve: &StabilityCurve, fill_percent: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, point) in curve.points.iter().enumerate() {
        let distance = (point.fill_percent - fill_percent).abs();
        if best.is_none_or(|(_, d)| distance < d) {
            best = Some((i, distance));
        }
    }
    best.map(|(i, _)| i)
}

/// Render a stability curve as a text bar chart
///
/// The current and optimal fills are marked on the nearest sampled row, so
/// they show up even when they fall between samples.
pub fn format_stability_curve(
    curve: &StabilityCurve,
    current_fill: f64,
    optimal_fill: f64,
    applied_acceleration_mps2: f64,
) -> String {
    const BAR_WIDTH: f64 = 50.0;

    let mut output = String::new();
    let ceiling = curve.axis_ceiling();
    let scale = |value: f64| -> usize {
        if ceiling > 0.0 {
            ((value / ceiling) * BAR_WIDTH).round().clamp(0.0, BAR_WIDTH) as usize
        } else {
            0
        }
    };
    let applied_col = scale(applied_acceleration_mps2);
    let current_row = nearest_point(curve, current_fill);
    let optimal_row = nearest_point(curve, optimal_fill);

    output.push_str(&format!("{:>7} {:>10}\n", "Fill %", "a_crit"));
    for (i, point) in curve.points.iter().enumerate() {
        let len = scale(point.critical_acceleration_mps2);
        let mut bar: Vec<char> = "#".repeat(len).chars().collect();
        bar.resize(BAR_WIDTH as usize + 1, ' ');
        bar[applied_col] = '|';
        let bar: String = bar.into_iter().collect::<String>().trim_end().to_string();

        let mut markers = Vec::new();
        if current_row == Some(i) {
            markers.push(format!("current {:.1}%", current_fill));
        }
        if optimal_row == Some(i) {
            markers.push(format!("optimal {:.1}%", optimal_fill));
        }
        let marker = if markers.is_empty() {
            String::new()
        } else {
            format!("  <- {}", markers.join(", "))
        };

        output.push_str(&format!(
            "{:>7.1} {:>10.3} {}{}\n",
            point.fill_percent, point.critical_acceleration_mps2, bar, marker
        ));
    }
    output.push('\n');
    output.push_str(&format!(
        "'|' marks applied acceleration {:.1} m/s²; curve max {:.3} m/s²\n",
        applied_acceleration_mps2, curve.max_critical_acceleration_mps2
    ));

    output
}
