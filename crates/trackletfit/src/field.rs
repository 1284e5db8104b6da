//! Magnetic-field configuration and the radius → momentum conversion.

use serde::{Deserialize, Serialize};

use crate::error::FitError;

/// Conversion constant from curvature radius (cm) and field strength (T) to
/// transverse momentum (GeV/c): pT = B · 0.00299710 · r.
pub const PT_FACTOR_PER_TESLA: f64 = 0.00299710;

/// Radii with absolute value below this threshold are rejected before being
/// used as divisors.
pub const MIN_RADIUS: f64 = 1e-7;

/// Uniform axial magnetic field, in Tesla.
///
/// Per-instance configuration: each fitter carries its own field value, there
/// is no process-wide state. Defaults to the solenoid's nominal 1.5 T.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MagneticField(f64);

impl Default for MagneticField {
    fn default() -> Self {
        Self(1.5)
    }
}

impl MagneticField {
    /// Field of the given strength in Tesla.
    pub fn new(tesla: f64) -> Self {
        Self(tesla)
    }

    /// Field strength in Tesla.
    pub fn tesla(self) -> f64 {
        self.0
    }

    /// Radius-to-pT conversion factor for this field strength.
    pub fn pt_factor(self) -> f64 {
        self.0 * PT_FACTOR_PER_TESLA
    }

    /// Transverse momentum (GeV/c) of a trajectory with the given curvature
    /// radius in cm. The sign of the radius is preserved.
    pub fn pt(self, radius: f64) -> Result<f64, FitError> {
        if radius.abs() < MIN_RADIUS {
            return Err(FitError::CircleTooSmall { radius });
        }
        Ok(self.pt_factor() * radius)
    }
}
