//! Simulation state owned by a single controller

use std::fmt;

use crate::error::ValidationError;
use crate::models::{
    check_non_negative, check_positive, ContainerSpec, OptimalFillResult, SimulationInputs,
    StabilityResult,
};
use crate::physics;
use crate::presets::PresetCatalog;

/// Distance from the optimum, in fill percentage points, still reported as
/// near optimal
pub const NEAR_OPTIMAL_TOLERANCE_PERCENT: f64 = 5.0;

pub const DEFAULT_FILL_PERCENT: f64 = 100.0;
pub const DEFAULT_ACCELERATION_MPS2: f64 = 5.0;

/// Current container, fill level and applied acceleration
///
/// The optimal fill is cached and only recomputed when a container field
/// changes; fill and acceleration are not inputs to the search.
#[derive(Debug, Clone)]
pub struct SimulationState {
    container: ContainerSpec,
    fill_percent: f64,
    horizontal_acceleration_mps2: f64,
    optimal: OptimalFillResult,
}

impl SimulationState {
    pub fn new(container: ContainerSpec) -> Result<Self, ValidationError> {
        container.validate()?;
        let optimal = physics::find_optimal_fill(&container);
        Ok(Self {
            container,
            fill_percent: DEFAULT_FILL_PERCENT,
            horizontal_acceleration_mps2: DEFAULT_ACCELERATION_MPS2,
            optimal,
        })
    }

    pub fn container(&self) -> &ContainerSpec {
        &self.container
    }

    pub fn fill_percent(&self) -> f64 {
        self.fill_percent
    }

    pub fn horizontal_acceleration_mps2(&self) -> f64 {
        self.horizontal_acceleration_mps2
    }

    pub fn optimal(&self) -> OptimalFillResult {
        self.optimal
    }

    pub fn inputs(&self) -> SimulationInputs {
        SimulationInputs {
            container: self.container.clone(),
            fill_percent: self.fill_percent,
            horizontal_acceleration_mps2: self.horizontal_acceleration_mps2,
        }
    }

    /// Evaluate the stability model for the current inputs
    pub fn result(&self) -> StabilityResult {
        physics::compute_stability(
            &self.container,
            self.fill_percent,
            self.horizontal_acceleration_mps2,
        )
    }

    pub fn status(&self) -> StabilityStatus {
        StabilityStatus::evaluate(&self.result(), self.fill_percent, &self.optimal)
    }

    /// Replace every container field with a preset
    pub fn select_preset(&mut self, catalog: &PresetCatalog, id: &str) -> Result<(), ValidationError> {
        let preset = catalog
            .get(id)
            .ok_or_else(|| ValidationError::UnknownPreset(id.to_string()))?;
        self.set_container(preset.clone())
    }

    pub fn set_container(&mut self, container: ContainerSpec) -> Result<(), ValidationError> {
        container.validate()?;
        self.container = container;
        self.refresh_optimal();
        Ok(())
    }

    pub fn set_height_mm(&mut self, height_mm: f64) -> Result<(), ValidationError> {
        check_positive("height_mm", height_mm)?;
        self.container.height_mm = height_mm;
        self.refresh_optimal();
        Ok(())
    }

    pub fn set_radius_mm(&mut self, radius_mm: f64) -> Result<(), ValidationError> {
        check_positive("radius_mm", radius_mm)?;
        self.container.radius_mm = radius_mm;
        self.refresh_optimal();
        Ok(())
    }

    pub fn set_empty_mass_g(&mut self, empty_mass_g: f64) -> Result<(), ValidationError> {
        check_non_negative("empty_mass_g", empty_mass_g)?;
        self.container.empty_mass_g = empty_mass_g;
        self.refresh_optimal();
        Ok(())
    }

    pub fn set_liquid_volume_ml(&mut self, liquid_volume_ml: f64) -> Result<(), ValidationError> {
        check_non_negative("liquid_volume_ml", liquid_volume_ml)?;
        self.container.liquid_volume_ml = liquid_volume_ml;
        self.refresh_optimal();
        Ok(())
    }

    /// Set the fill level, clamped to `[0, 100]`
    pub fn set_fill_percent(&mut self, fill_percent: f64) -> Result<(), ValidationError> {
        if !fill_percent.is_finite() {
            return Err(ValidationError::NonFinite { field: "fill_percent" });
        }
        self.fill_percent = fill_percent.clamp(0.0, 100.0);
        Ok(())
    }

    /// Set the applied acceleration; only its magnitude is kept
    pub fn set_acceleration_mps2(&mut self, acceleration_mps2: f64) -> Result<(), ValidationError> {
        if !acceleration_mps2.is_finite() {
            return Err(ValidationError::NonFinite {
                field: "horizontal_acceleration_mps2",
            });
        }
        self.horizontal_acceleration_mps2 = acceleration_mps2.abs();
        Ok(())
    }

    fn refresh_optimal(&mut self) {
        self.optimal = physics::find_optimal_fill(&self.container);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillDirection {
    Add,
    Remove,
}

impl fmt::Display for FillDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FillDirection::Add => write!(f, "add"),
            FillDirection::Remove => write!(f, "remove"),
        }
    }
}

/// User-facing verdict derived from a stability result and the optimum
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StabilityStatus {
    WouldTip,
    NearOptimal,
    Adjust {
        direction: FillDirection,
        amount_percent: f64,
        target_percent: f64,
    },
}

impl StabilityStatus {
    pub fn evaluate(result: &StabilityResult, fill_percent: f64, optimal: &OptimalFillResult) -> Self {
        if result.would_tip {
            return StabilityStatus::WouldTip;
        }

        let target = optimal.best_fill_percent;
        let distance = (fill_percent - target).abs();
        if distance < NEAR_OPTIMAL_TOLERANCE_PERCENT {
            StabilityStatus::NearOptimal
        } else {
            let direction = if fill_percent < target {
                FillDirection::Add
            } else {
                FillDirection::Remove
            };
            StabilityStatus::Adjust {
                direction,
                amount_percent: distance,
                target_percent: target,
            }
        }
    }
}

impl fmt::Display for StabilityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StabilityStatus::WouldTip => {
                write!(f, "CAN WOULD TIP OVER! Reduce force or adjust fill level.")
            }
            StabilityStatus::NearOptimal => write!(
                f,
                "Near optimal stability! This fill level maximizes resistance to tipping."
            ),
            StabilityStatus::Adjust {
                direction,
                amount_percent,
                target_percent,
            } => write!(
                f,
                "For maximum stability, {} {:.1}% of liquid to reach {:.1}% fill level.",
                direction, amount_percent, target_percent
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn state() -> SimulationState {
        let catalog = PresetCatalog::builtin();
        SimulationState::new(catalog.get("redbull").unwrap().clone()).unwrap()
    }

    #[test]
    fn starts_with_defaults() {
        let s = state();
        assert_eq!(s.fill_percent(), 100.0);
        assert_eq!(s.horizontal_acceleration_mps2(), 5.0);
        assert_eq!(s.optimal().best_fill_percent, 15.0);
        assert!(s.result().would_tip);
    }

    #[test]
    fn fill_is_clamped() {
        let mut s = state();
        s.set_fill_percent(140.0).unwrap();
        assert_eq!(s.fill_percent(), 100.0);
        s.set_fill_percent(-3.0).unwrap();
        assert_eq!(s.fill_percent(), 0.0);
        assert!(s.set_fill_percent(f64::NAN).is_err());
        assert_eq!(s.fill_percent(), 0.0);
    }

    #[test]
    fn acceleration_is_stored_as_magnitude() {
        let mut s = state();
        s.set_acceleration_mps2(-2.5).unwrap();
        assert_eq!(s.horizontal_acceleration_mps2(), 2.5);
        assert!(s.set_acceleration_mps2(f64::INFINITY).is_err());
        assert_eq!(s.horizontal_acceleration_mps2(), 2.5);
    }

    #[test]
    fn fill_and_acceleration_leave_optimum_alone() {
        let mut s = state();
        let before = s.optimal();
        s.set_fill_percent(42.0).unwrap();
        s.set_acceleration_mps2(9.0).unwrap();
        assert_eq!(s.optimal(), before);
    }

    #[test]
    fn container_changes_refresh_optimum() {
        let mut s = state();
        let before = s.optimal();
        s.set_empty_mass_g(60.0).unwrap();
        assert_ne!(s.optimal(), before);
        assert_eq!(s.optimal(), physics::find_optimal_fill(s.container()));

        s.set_radius_mm(40.0).unwrap();
        assert_eq!(s.optimal(), physics::find_optimal_fill(s.container()));
        s.set_height_mm(200.0).unwrap();
        assert_eq!(s.optimal(), physics::find_optimal_fill(s.container()));
        s.set_liquid_volume_ml(250.0).unwrap();
        assert_eq!(s.optimal(), physics::find_optimal_fill(s.container()));
    }

    #[test]
    fn invalid_geometry_leaves_state_untouched() {
        let mut s = state();
        let before = s.container().clone();
        assert!(matches!(
            s.set_radius_mm(0.0),
            Err(ValidationError::NonPositiveDimension { field: "radius_mm", .. })
        ));
        assert!(s.set_height_mm(-10.0).is_err());
        assert!(s.set_empty_mass_g(-1.0).is_err());
        assert_eq!(s.container(), &before);
    }

    #[test]
    fn selecting_preset_replaces_container() {
        let catalog = PresetCatalog::builtin();
        let mut s = state();
        s.set_fill_percent(30.0).unwrap();
        s.select_preset(&catalog, "cola").unwrap();
        assert_eq!(s.container().id, "cola");
        assert_eq!(s.container().height_mm, 123.0);
        assert_eq!(s.fill_percent(), 30.0);
        assert_eq!(s.optimal().best_fill_percent, 16.0);

        assert_eq!(
            s.select_preset(&catalog, "tallboy"),
            Err(ValidationError::UnknownPreset("tallboy".to_string()))
        );
        assert_eq!(s.container().id, "cola");
    }

    #[test]
    fn inputs_snapshot_matches_state() {
        let mut s = state();
        s.set_fill_percent(55.0).unwrap();
        let inputs = s.inputs();
        assert_eq!(inputs.fill_percent, 55.0);
        assert_eq!(inputs.horizontal_acceleration_mps2, 5.0);
        assert_eq!(&inputs.container, s.container());
    }

    #[test]
    fn status_reports_tipping_first() {
        let s = state();
        assert_eq!(s.status(), StabilityStatus::WouldTip);
        assert!(s.status().to_string().contains("TIP OVER"));
    }

    #[test]
    fn status_near_optimal_inside_band() {
        let mut s = state();
        s.set_acceleration_mps2(1.0).unwrap();
        s.set_fill_percent(19.0).unwrap();
        assert_eq!(s.status(), StabilityStatus::NearOptimal);
        s.set_fill_percent(11.0).unwrap();
        assert_eq!(s.status(), StabilityStatus::NearOptimal);
    }

    #[test]
    fn status_suggests_adjustment_outside_band() {
        let mut s = state();
        s.set_acceleration_mps2(1.0).unwrap();
        s.set_fill_percent(20.0).unwrap();
        match s.status() {
            StabilityStatus::Adjust {
                direction,
                amount_percent,
                target_percent,
            } => {
                assert_eq!(direction, FillDirection::Remove);
                assert_relative_eq!(amount_percent, 5.0);
                assert_eq!(target_percent, 15.0);
            }
            other => panic!("unexpected status {:?}", other),
        }

        s.set_fill_percent(5.0).unwrap();
        let status = s.status();
        assert!(matches!(
            status,
            StabilityStatus::Adjust { direction: FillDirection::Add, .. }
        ));
        assert_eq!(
            status.to_string(),
            "For maximum stability, add 10.0% of liquid to reach 15.0% fill level."
        );
    }
}
