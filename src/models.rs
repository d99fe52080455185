//! Data models for containers and stability results

use crate::error::ValidationError;

/// An RGB color triple, used for display only
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

#[derive(Debug, Clone, PartialEq)]
pub struct ContainerSpec {
    pub id: String,
    pub name: String,
    pub height_mm: f64,
    pub radius_mm: f64,
    pub empty_mass_g: f64,
    pub liquid_volume_ml: f64, // 1 ml of liquid weighs 1 g
    pub color: Rgb,
    pub liquid_color: Rgb,
}

impl ContainerSpec {
    /// Reject geometry the stability model cannot evaluate
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_positive("height_mm", self.height_mm)?;
        check_positive("radius_mm", self.radius_mm)?;
        check_non_negative("empty_mass_g", self.empty_mass_g)?;
        check_non_negative("liquid_volume_ml", self.liquid_volume_ml)?;
        Ok(())
    }
}

pub(crate) fn check_positive(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFinite { field });
    }
    if value <= 0.0 {
        return Err(ValidationError::NonPositiveDimension { field, value });
    }
    Ok(())
}

pub(crate) fn check_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFinite { field });
    }
    if value < 0.0 {
        return Err(ValidationError::NegativeQuantity { field, value });
    }
    Ok(())
}

/// Externally driven inputs for one evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationInputs {
    pub container: ContainerSpec,
    pub fill_percent: f64,
    pub horizontal_acceleration_mps2: f64,
}

/// Result of a stability evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct StabilityResult {
    pub liquid_height_mm: f64,
    pub liquid_mass_g: f64,
    pub total_mass_g: f64,
    pub center_of_mass_height_mm: f64,
    pub tipping_angle_radians: f64,
    pub critical_acceleration_mps2: f64,
    pub stability_factor: f64, // +inf when no acceleration is applied
    pub would_tip: bool,
}

impl StabilityResult {
    pub fn tipping_angle_degrees(&self) -> f64 {
        self.tipping_angle_radians.to_degrees()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptimalFillResult {
    pub best_fill_percent: f64,
    pub max_critical_acceleration_mps2: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurvePoint {
    pub fill_percent: f64,
    pub critical_acceleration_mps2: f64,
}

/// Critical acceleration sampled across the fill range, for plotting
#[derive(Debug, Clone)]
pub struct StabilityCurve {
    pub points: Vec<CurvePoint>,
    pub max_critical_acceleration_mps2: f64,
}

impl StabilityCurve {
    /// Upper bound of the plot's acceleration axis
    pub fn axis_ceiling(&self) -> f64 {
        self.max_critical_acceleration_mps2 * 1.1
    }
}
