//! Fallback 3-D straight-line fit under the testbeam coordinate convention.
//!
//! The beam/primary direction is along +x and the sensor measurement errors
//! live in y and z only, so two independent weighted regressions
//! Y = a·X + b and Z = c·X + d are sufficient. Used when the helix fit's
//! plane is degenerate (field-free or ultra-high-momentum straight tracks).

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::FitError;
use crate::hit::Hit;
use crate::seed::SeedOptions;

/// Straight-line fit result.
///
/// The four line parameters are retained alongside the direction vector for
/// introspection and validation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LineFit3D {
    /// Combined chi-square of both regressions.
    pub chi2: f64,
    /// Direction of flight, `(1, slope_y, slope_z)` up to orientation and
    /// rescaling.
    pub direction: [f64; 3],
    pub slope_y: f64,
    pub intercept_y: f64,
    pub slope_z: f64,
    pub intercept_z: f64,
}

pub(crate) fn fit(hits: &[Hit], options: &SeedOptions) -> Result<LineFit3D, FitError> {
    let mut sum_wy = 0.0;
    let mut sum_wy_x = 0.0;
    let mut sum_wy_y = 0.0;
    let mut sum_wy_xy = 0.0;
    let mut sum_wy_x2 = 0.0;
    let mut sum_wz = 0.0;
    let mut sum_wz_x = 0.0;
    let mut sum_wz_z = 0.0;
    let mut sum_wz_xz = 0.0;
    let mut sum_wz_x2 = 0.0;

    for hit in hits {
        let p = hit.position;
        let wy = 1.0 / (hit.sigma.y * hit.sigma.y);
        let wz = 1.0 / (hit.sigma.z * hit.sigma.z);

        sum_wy += wy;
        sum_wy_x += wy * p.x;
        sum_wy_y += wy * p.y;
        sum_wy_xy += wy * p.x * p.y;
        sum_wy_x2 += wy * p.x * p.x;

        sum_wz += wz;
        sum_wz_x += wz * p.x;
        sum_wz_z += wz * p.z;
        sum_wz_xz += wz * p.x * p.z;
        sum_wz_x2 += wz * p.x * p.x;
    }

    let det_y = sum_wy_x2 * sum_wy - sum_wy_x * sum_wy_x;
    if det_y == 0.0 {
        return Err(FitError::StraightUp);
    }
    let det_z = sum_wz_x2 * sum_wz - sum_wz_x * sum_wz_x;
    if det_z == 0.0 {
        return Err(FitError::StraightUp);
    }

    let slope_y = (sum_wy * sum_wy_xy - sum_wy_x * sum_wy_y) / det_y;
    let intercept_y = (sum_wy_x2 * sum_wy_y - sum_wy_x * sum_wy_xy) / det_y;
    let slope_z = (sum_wz * sum_wz_xz - sum_wz_x * sum_wz_z) / det_z;
    let intercept_z = (sum_wz_x2 * sum_wz_z - sum_wz_x * sum_wz_xz) / det_z;

    // Chi-squares of the two independent regressions add up.
    let mut chi2 = 0.0;
    for hit in hits {
        let p = hit.position;
        chi2 += ((p.y - slope_y * p.x - intercept_y) / hit.sigma.y).powi(2)
            + ((p.z - slope_z * p.x - intercept_z) / hit.sigma.z).powi(2);
    }

    let mut direction = Vector3::new(1.0, slope_y, slope_z);
    if options.use_backwards {
        direction = -direction;
    }
    if let Some(magnitude) = options.momentum_magnitude {
        direction = direction.normalize() * magnitude;
    }

    Ok(LineFit3D {
        chi2,
        direction: [direction.x, direction.y, direction.z],
        slope_y,
        intercept_y,
        slope_z,
        intercept_z,
    })
}
