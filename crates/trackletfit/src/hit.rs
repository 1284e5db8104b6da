//! Hit data model and opt-in tracklet input validators.

use nalgebra::Vector3;

use crate::error::FitError;

/// A single detector hit: 3-D position with per-axis uncertainties.
///
/// Positions and sigmas are in cm. The per-axis sigmas are treated as
/// uncorrelated when deriving fit weights. `sigma_u`/`sigma_v` are the
/// sensor-local 2-D uncertainties, carried for diagnostics and the simplest
/// weighting scheme only.
///
/// Hits are immutable inputs: the fitting routines borrow slices of them and
/// never mutate or retain them beyond the call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    /// Global position (x, y, z).
    pub position: Vector3<f64>,
    /// One standard deviation per axis.
    pub sigma: Vector3<f64>,
    /// Sensor-local u uncertainty.
    pub sigma_u: f64,
    /// Sensor-local v uncertainty.
    pub sigma_v: f64,
}

impl Hit {
    /// Hit with global position and per-axis sigmas; local sigmas zero.
    pub fn new(position: Vector3<f64>, sigma: Vector3<f64>) -> Self {
        Self {
            position,
            sigma,
            sigma_u: 0.0,
            sigma_v: 0.0,
        }
    }

    /// Attach sensor-local uncertainties.
    pub fn with_local_sigma(mut self, sigma_u: f64, sigma_v: f64) -> Self {
        self.sigma_u = sigma_u;
        self.sigma_v = sigma_v;
        self
    }

    /// Transverse distance from the beam axis.
    pub fn perp(&self) -> f64 {
        self.position.xy().norm()
    }
}

/// Check that the transverse radii are monotonic along the tracklet, in
/// either direction.
///
/// The fits themselves trust the caller-supplied ordering and never run this;
/// it is an opt-in defense for callers assembling tracklets from
/// combinatorial candidates.
pub fn check_radial_ordering(hits: &[Hit]) -> Result<(), FitError> {
    let mut increasing = true;
    let mut decreasing = true;
    for pair in hits.windows(2) {
        let delta = pair[1].perp() - pair[0].perp();
        if delta > 0.0 {
            decreasing = false;
        } else if delta < 0.0 {
            increasing = false;
        }
    }
    if increasing || decreasing {
        Ok(())
    } else {
        Err(FitError::UnorderedHits)
    }
}

/// Check that no position appears twice in the tracklet.
pub fn check_duplicate_hits(hits: &[Hit]) -> Result<(), FitError> {
    for (i, hit) in hits.iter().enumerate() {
        for other in &hits[i + 1..] {
            if hit.position == other.position {
                return Err(FitError::DuplicateHit);
            }
        }
    }
    Ok(())
}
