//! Closed-form weighted circle fit in the transverse plane.
//!
//! Algebraic (non-iterative) least squares on the weighted means and
//! covariances of x, y and x²+y², following V. Karimäki, NIM A305 (1991).
//! The fit parametrizes the circle through the point of closest approach to
//! the origin: azimuth φ, signed distance d and signed curvature ρ.

use nalgebra::{Vector2, Vector3};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::error::FitError;
use crate::field::MagneticField;
use crate::hit::Hit;
use crate::seed::SeedOptions;
use crate::zigzag::net_curvature;

/// Weight damping constant applied to every hit; 1.0 disables damping.
const WEIGHT_DAMPING: f64 = 1.0;
/// Substitute for non-finite hit weights.
const FALLBACK_WEIGHT: f64 = 1e-9;

/// Transverse circle parameters from the weighted fit.
///
/// φ, d and ρ are kept mutually consistent: their common sign is fixed by
/// the independent curvature-sign vote over the tracklet (Karimäki eq. 23),
/// with positive curvature meaning clockwise bending.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CircleFit {
    /// Chi-square of the fit.
    pub chi2: f64,
    /// Azimuth of the point of closest approach to the origin.
    pub poca_phi: f64,
    /// Signed transverse distance of closest approach.
    pub poca_d: f64,
    /// Signed curvature (1/radius).
    pub curvature: f64,
}

impl CircleFit {
    /// Signed curvature radius.
    pub fn radius(&self) -> f64 {
        1.0 / self.curvature
    }
}

/// Circle-fit momentum seed. Transverse only: the z component of `pt` is
/// zero, and `chi2` is the circle fit's chi-square (never a radius).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CircleSeed {
    /// Chi-square of the underlying circle fit.
    pub chi2: f64,
    /// Signed curvature radius.
    pub radius: f64,
    /// Transverse momentum vector at the anchor hit (GeV/c).
    pub pt: [f64; 3],
}

fn sign_of(value: f64) -> i32 {
    if value > 0.0 {
        1
    } else if value < 0.0 {
        -1
    } else {
        0
    }
}

pub(crate) fn fit_parameters(hits: &[Hit]) -> Result<CircleFit, FitError> {
    let clockwise = net_curvature(hits)?;

    let mut sum_weights = 0.0;
    let mut mean_x = 0.0;
    let mut mean_y = 0.0;
    let mut mean_xy = 0.0;
    let mut mean_x2 = 0.0;
    let mut mean_y2 = 0.0;
    let mut mean_xr2 = 0.0;
    let mut mean_yr2 = 0.0;
    let mut mean_r2 = 0.0;
    let mut mean_r4 = 0.0;

    for hit in hits {
        let sigma = hit.sigma;
        let mut weight =
            1.0 / ((sigma.x * sigma.x + sigma.y * sigma.y).sqrt() * WEIGHT_DAMPING);
        if !weight.is_finite() {
            tracing::error!(
                weight,
                "non-finite circle-fit weight, substituting {FALLBACK_WEIGHT}"
            );
            weight = FALLBACK_WEIGHT;
        }
        sum_weights += weight;

        let x = hit.position.x;
        let y = hit.position.y;
        let r2 = x * x + y * y;
        mean_x += x * weight;
        mean_y += y * weight;
        mean_xy += x * y * weight;
        mean_x2 += x * x * weight;
        mean_y2 += y * y * weight;
        mean_xr2 += x * r2 * weight;
        mean_yr2 += y * r2 * weight;
        mean_r2 += r2 * weight;
        mean_r4 += r2 * r2 * weight;
    }
    let inv_sum = 1.0 / sum_weights;
    mean_x *= inv_sum;
    mean_y *= inv_sum;
    mean_xy *= inv_sum;
    mean_x2 *= inv_sum;
    mean_y2 *= inv_sum;
    mean_xr2 *= inv_sum;
    mean_yr2 *= inv_sum;
    mean_r2 *= inv_sum;
    mean_r4 *= inv_sum;

    let cov_xx = mean_x2 - mean_x * mean_x;
    let cov_xy = mean_xy - mean_x * mean_y;
    let cov_yy = mean_y2 - mean_y * mean_y;
    let cov_xr2 = mean_xr2 - mean_x * mean_r2;
    let cov_yr2 = mean_yr2 - mean_y * mean_r2;
    let cov_r2r2 = mean_r4 - mean_r2 * mean_r2;

    if cov_r2r2 == 0.0 {
        return Err(FitError::CenterIsOrigin);
    }

    let q1 = cov_r2r2 * cov_xy - cov_xr2 * cov_yr2;
    let q2 = cov_r2r2 * (cov_xx - cov_yy) - cov_xr2 * cov_xr2 + cov_yr2 * cov_yr2;

    let mut poca_phi = 0.5 * (2.0 * q1).atan2(q2);
    let (sin_phi, cos_phi) = poca_phi.sin_cos();
    let kappa = (sin_phi * cov_xr2 - cos_phi * cov_yr2) / cov_r2r2;
    let delta = -kappa * mean_r2 + sin_phi * mean_x - cos_phi * mean_y;
    let root = (1.0 - 4.0 * delta * kappa).sqrt();
    let mut curvature = 2.0 * kappa / root;
    let mut poca_d = 2.0 * delta / (1.0 + root);

    // The closed-form solution fixes (ρ, φ, d) only up to a common sign;
    // align it with the independent vote (Karimäki eq. 23).
    if (curvature < 0.0 && clockwise) || (curvature > 0.0 && !clockwise) {
        curvature = -curvature;
        poca_phi += PI;
        poca_d = -poca_d;
    }

    let chi2 = sum_weights
        * (1.0 + curvature * poca_d).powi(2)
        * (sin_phi * sin_phi * cov_xx - 2.0 * sin_phi * cos_phi * cov_xy
            + cos_phi * cos_phi * cov_yy
            - kappa * kappa * cov_r2r2);

    Ok(CircleFit {
        chi2,
        poca_phi,
        poca_d,
        curvature,
    })
}

pub(crate) fn fit_seed(
    hits: &[Hit],
    field: MagneticField,
    options: &SeedOptions,
) -> Result<CircleSeed, FitError> {
    let fit = fit_parameters(hits)?;
    let radius = 1.0 / fit.curvature;
    let abs_radius = radius.abs();

    // POCA position; ψ is the azimuth of the ray from the origin to it. A
    // positive d means (pT, poca) form a right-handed system.
    let psi = if fit.poca_d < 0.0 {
        fit.poca_phi + PI * 0.5
    } else {
        fit.poca_phi - PI * 0.5
    };
    let x_poca = fit.poca_d.abs() * psi.cos();
    let y_poca = fit.poca_d.abs() * psi.sin();

    let toward_center = if sign_of(fit.poca_d) == sign_of(fit.curvature) {
        1.0
    } else {
        -1.0
    };
    let x_center = x_poca + toward_center * abs_radius * psi.cos();
    let y_center = y_poca + toward_center * abs_radius * psi.sin();
    tracing::debug!(
        phi = fit.poca_phi,
        psi,
        x_poca,
        y_poca,
        x_center,
        y_center,
        "circle fit poca and center"
    );

    let anchor = if options.use_backwards {
        hits[0].position
    } else {
        hits[hits.len() - 1].position
    };

    // Tangent direction at the anchor hit, along the direction of travel.
    let to_center = Vector2::new(x_center - anchor.x, y_center - anchor.y);
    let alpha = to_center.y.atan2(to_center.x);
    let beta = if fit.curvature > 0.0 {
        alpha - PI * 0.5
    } else {
        alpha + PI * 0.5
    };

    let magnitude = match options.momentum_magnitude {
        Some(magnitude) => magnitude,
        None => field.pt(abs_radius)?,
    };
    let pt = Vector3::new(magnitude * beta.cos(), magnitude * beta.sin(), 0.0);

    Ok(CircleSeed {
        chi2: fit.chi2,
        radius,
        pt: [pt.x, pt.y, pt.z],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{circle_hits, hits_from_positions};
    use approx::assert_relative_eq;
    use rand::prelude::*;

    #[test]
    fn test_exact_circle_fit_is_noiseless() {
        let hits = circle_hits([14.0, -6.0], 9.0, 0.1, 0.3, 5, 0.0, 0.5, 0.1);
        let fit = fit_parameters(&hits).expect("fit succeeds");
        assert_relative_eq!(fit.chi2, 0.0, epsilon = 1e-6);
        assert_relative_eq!(fit.curvature.abs(), 1.0 / 9.0, epsilon = 1e-9);
        assert_relative_eq!(fit.radius().abs(), 9.0, epsilon = 1e-6);
    }

    #[test]
    fn test_unit_circle_through_origin() {
        // Hits on the unit circle centered at (1, 0); the trajectory passes
        // through the origin, bending counterclockwise along the hit order.
        let hits = hits_from_positions(
            &[[0.0, 0.0, 0.0], [1.0, 1.0, 2.0], [2.0, 0.0, 4.0]],
            0.1,
        );
        let fit = fit_parameters(&hits).expect("fit succeeds");
        assert_relative_eq!(fit.chi2, 0.0, epsilon = 1e-9);
        assert_relative_eq!(fit.poca_d, 0.0, epsilon = 1e-9);
        assert_relative_eq!(fit.poca_phi, 3.0 * PI / 2.0, epsilon = 1e-9);
        assert_relative_eq!(fit.curvature, -1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_small_arc_chi2_is_small() {
        // Narrow 10-degree arc of radius 4.5 centered at (4, 6).
        let step = 5.0_f64.to_radians();
        let hits = hits_from_positions(
            &[
                [4.0 - 4.5, 6.0, 0.0],
                [4.0 - 4.5 * step.cos(), 6.0 + 4.5 * step.sin(), 0.0],
                [
                    4.0 - 4.5 * (2.0 * step).cos(),
                    6.0 + 4.5 * (2.0 * step).sin(),
                    0.0,
                ],
            ],
            0.1,
        );
        let fit = fit_parameters(&hits).expect("fit succeeds");
        assert_relative_eq!(fit.chi2, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_outlier_raises_chi2() {
        let mut hits = circle_hits([14.0, -6.0], 9.0, 0.1, 0.3, 5, 0.0, 0.5, 0.1);
        hits[2].position.x += 0.7;
        let fit = fit_parameters(&hits).expect("fit succeeds");
        assert!(fit.chi2 > 1.0);
    }

    #[test]
    fn test_noisy_circle_recovers_radius() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut hits = circle_hits([20.0, 5.0], 15.0, 0.0, 0.2, 8, 0.0, 0.5, 0.05);
        for hit in &mut hits {
            hit.position.x += (rng.gen::<f64>() - 0.5) * 0.05;
            hit.position.y += (rng.gen::<f64>() - 0.5) * 0.05;
        }
        let fit = fit_parameters(&hits).expect("fit succeeds");
        assert_relative_eq!(fit.radius().abs(), 15.0, epsilon = 0.2);
    }

    #[test]
    fn test_sign_alignment_with_vote() {
        let ccw = circle_hits([14.0, -6.0], 9.0, 0.1, 0.3, 5, 0.0, 0.5, 0.1);
        let mut cw = ccw.clone();
        cw.reverse();
        let ccw_fit = fit_parameters(&ccw).expect("fit succeeds");
        let cw_fit = fit_parameters(&cw).expect("fit succeeds");
        assert_ne!(sign_of(ccw_fit.curvature), sign_of(cw_fit.curvature));
        assert_relative_eq!(ccw_fit.curvature, -cw_fit.curvature, epsilon = 1e-9);
    }

    #[test]
    fn test_concentric_hits_rejected() {
        // All hits exactly equidistant from the origin: the r²-r² covariance
        // vanishes and the circle center is degenerate.
        let hits = hits_from_positions(
            &[[10.0, 0.0, 0.0], [0.0, 10.0, 1.0], [-10.0, 0.0, 2.0], [0.0, -10.0, 3.0]],
            0.1,
        );
        assert_eq!(fit_parameters(&hits), Err(FitError::CenterIsOrigin));
    }

    #[test]
    fn test_seed_points_along_travel_direction() {
        // Counterclockwise quarter-ish arc; anchor at the last hit.
        let hits = circle_hits([10.0, 0.0], 10.0, PI, -0.3, 5, 0.0, 0.5, 0.1);
        let seed = fit_seed(&hits, MagneticField::new(1.5), &SeedOptions::default())
            .expect("seed succeeds");
        assert_relative_eq!(
            (seed.pt[0] * seed.pt[0] + seed.pt[1] * seed.pt[1]).sqrt(),
            MagneticField::new(1.5).pt(10.0).unwrap(),
            epsilon = 1e-6
        );
        assert_relative_eq!(seed.pt[2], 0.0);

        // The tangent at the anchor must continue the chord of the last two
        // hits rather than run against it.
        let chord = (hits[4].position - hits[3].position).xy();
        let dot = chord.x * seed.pt[0] + chord.y * seed.pt[1];
        assert!(dot > 0.0, "seed runs against the direction of travel");
    }

    #[test]
    fn test_seed_fixed_magnitude() {
        let hits = circle_hits([10.0, 0.0], 10.0, PI, -0.3, 5, 0.0, 0.5, 0.1);
        let options = SeedOptions {
            momentum_magnitude: Some(2.5),
            ..SeedOptions::default()
        };
        let seed =
            fit_seed(&hits, MagneticField::new(1.5), &options).expect("seed succeeds");
        assert_relative_eq!(
            (seed.pt[0] * seed.pt[0] + seed.pt[1] * seed.pt[1]).sqrt(),
            2.5,
            epsilon = 1e-9
        );
    }
}
