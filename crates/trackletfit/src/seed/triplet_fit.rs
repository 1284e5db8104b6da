//! Multiple-scattering-aware triplet fit.
//!
//! Slides a three-hit window along the tracklet, solves each triplet's 3-D
//! curvature radius in closed form, and combines the per-triplet estimates
//! by inverse-variance averaging, where the variance is dominated by the
//! multiple-scattering angle expected from the sensor material.
//!
//! A. Schöning et al., "A New Three-Dimensional Track Fit with Multiple
//! Scattering", arXiv:1606.04990.

use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;

use crate::error::FitError;
use crate::field::MagneticField;
use crate::hit::Hit;

/// Average material budget of an SVD sensor, in radiation lengths.
const SENSOR_X_OVER_X0: f64 = 0.0057;

/// Triplet-fit result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TripletFit {
    /// Combined chi-square: per-triplet minima plus the global
    /// radius-compatibility term.
    pub chi2: f64,
    /// Inverse-variance-weighted mean 3-D curvature radius over all
    /// triplets.
    pub radius_3d: f64,
}

pub(crate) fn fit(hits: &[Hit], field: MagneticField) -> Result<TripletFit, FitError> {
    assert!(hits.len() >= 3, "triplet fit needs at least 3 hits, got {}", hits.len());
    let n_triplets = hits.len() - 2;

    let mut combined_chi2 = 0.0;
    let mut radii = Vec::with_capacity(n_triplets);
    let mut variances = Vec::with_capacity(n_triplets);

    for window in hits.windows(3) {
        let h0 = window[0].position;
        let h1 = window[1].position;
        let h2 = window[2].position;

        let d01_sq = (h1.x - h0.x).powi(2) + (h1.y - h0.y).powi(2);
        let d12_sq = (h2.x - h1.x).powi(2) + (h2.y - h1.y).powi(2);
        let d02_sq = (h2.x - h0.x).powi(2) + (h2.y - h0.y).powi(2);
        let d01 = d01_sq.sqrt();
        let d12 = d12_sq.sqrt();
        let d02 = d02_sq.sqrt();

        let z01 = (h1.z - h0.z).abs();
        let z12 = (h2.z - h1.z).abs();

        // Circumradius of the transverse triangle.
        let r_c = (d01 * d12 * d02)
            / (-d01_sq * d01_sq - d12_sq * d12_sq - d02_sq * d02_sq
                + 2.0 * (d01_sq * d12_sq + d12_sq * d02_sq + d02_sq * d01_sq))
                .sqrt();

        // Central angles of the two chords (small-angle solutions).
        let phi1 = 2.0 * (d01 / (2.0 * r_c)).asin();
        let phi2 = 2.0 * (d12 / (2.0 * r_c)).asin();

        let r3d1 = (r_c * r_c + (z01 * z01) / (phi1 * phi1)).sqrt();
        let r3d2 = (r_c * r_c + (z12 * z12) / (phi2 * phi2)).sqrt();

        let theta1 = (z01 / (phi1 * r3d1)).acos();
        let theta2 = (z12 / (phi2 * r3d2)).acos();
        let theta = 0.5 * (theta1 + theta2);

        let alpha1 = (r_c * r_c * phi1 * phi1 + z01 * z01)
            / (0.5 * r_c * r_c * phi1.powi(3) / (phi1 * 0.5).tan() + z01 * z01);
        let alpha2 = (r_c * r_c * phi2 * phi2 + z12 * z12)
            / (0.5 * r_c * r_c * phi2.powi(3) / (phi2 * 0.5).tan() + z12 * z12);

        // Linearized residual system of the triplet.
        let phi_tilde = -0.5 * (phi1 * alpha1 + phi2 * alpha2);
        let eta = 0.5 * phi1 * alpha1 / r3d1 + 0.5 * phi2 * alpha2 / r3d2;
        let theta_tilde =
            theta2 - theta1 - (1.0 - alpha2) / theta2.tan() + (1.0 - alpha1) / theta1.tan();
        let beta = (1.0 - alpha2) / (r3d2 * theta2.tan()) - (1.0 - alpha1) / (r3d1 * theta1.tan());

        let sin_theta = theta.sin();
        let mut radius_3d = -(eta * phi_tilde * sin_theta * sin_theta + beta * theta_tilde);
        radius_3d /= eta * eta * sin_theta * sin_theta + beta * beta;

        // Multiple-scattering angle from the sensor material, widened for
        // shallow crossings.
        let x_over_x0 = SENSOR_X_OVER_X0 / (FRAC_PI_2 - theta1).cos();
        let scattering_scale = 4.5 / field.tesla() * x_over_x0.sqrt();
        let sigma_ms = scattering_scale / radius_3d;

        let variance =
            sigma_ms * sigma_ms / ((eta * sin_theta).powi(2) + beta * beta);

        let chi2_min = (beta * phi_tilde - eta * theta_tilde).powi(2)
            / (sigma_ms * sigma_ms * (eta * eta + beta * beta / (sin_theta * sin_theta)));

        radii.push(radius_3d);
        variances.push(variance);
        combined_chi2 += chi2_min;
    }

    // Inverse-variance average of the per-triplet radii.
    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for (radius, variance) in radii.iter().zip(&variances) {
        numerator += radius / variance;
        denominator += 1.0 / variance;
    }
    let radius_3d = numerator / denominator;

    // Global compatibility of the per-triplet radii with their average.
    let mut compatibility = 0.0;
    for (radius, variance) in radii.iter().zip(&variances) {
        compatibility += (radius - radius_3d).powi(2) / variance;
    }
    let chi2 = combined_chi2 + compatibility;

    if !chi2.is_finite() || !radius_3d.is_finite() {
        return Err(FitError::NonFiniteResult);
    }

    Ok(TripletFit { chi2, radius_3d })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{circle_hits, line_hits};
    use approx::assert_relative_eq;

    #[test]
    fn test_planar_circle_recovers_radius() {
        // Zero pitch: the 3-D radius equals the transverse circumradius and
        // every triplet agrees exactly.
        let hits = circle_hits([3.0, -5.0], 12.0, 0.2, 0.3, 5, 1.0, 0.0, 0.1);
        let fit = fit(&hits, MagneticField::new(1.5)).expect("fit succeeds");
        assert_relative_eq!(fit.radius_3d, 12.0, epsilon = 1e-9);
        assert_relative_eq!(fit.chi2, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_helix_radius_includes_pitch() {
        // With pitch, the 3-D radius grows over the transverse one.
        let hits = circle_hits([3.0, -5.0], 12.0, 0.2, 0.3, 5, 0.0, 1.8, 0.1);
        let fit = fit(&hits, MagneticField::new(1.5)).expect("fit succeeds");
        let expected = (12.0_f64.powi(2) + (1.8_f64 / 0.3).powi(2)).sqrt();
        assert_relative_eq!(fit.radius_3d, expected, max_relative = 0.15);
        assert!(fit.radius_3d > 12.0);
        assert!(fit.chi2.is_finite());
    }

    #[test]
    fn test_collinear_hits_are_non_finite() {
        let hits = line_hits([0.0, 0.0, 0.0], [1.0, 0.5, 0.2], 2.0, 4, 0.1);
        assert_eq!(
            fit(&hits, MagneticField::new(1.5)).unwrap_err(),
            FitError::NonFiniteResult
        );
    }

    #[test]
    fn test_zero_field_is_non_finite() {
        let hits = circle_hits([3.0, -5.0], 12.0, 0.2, 0.3, 5, 0.0, 1.8, 0.1);
        assert_eq!(
            fit(&hits, MagneticField::new(0.0)).unwrap_err(),
            FitError::NonFiniteResult
        );
    }
}
