//! Paraboloid-mapping helix fit.
//!
//! Each hit (x, y, z) is mapped to (x, y, x²+y²): a circle in the transverse
//! plane lies on a plane in the mapped space, so the normal of the best-fit
//! plane — the eigenvector of the smallest eigenvalue of the weighted sample
//! covariance — encodes the circle center and radius. A weighted linear
//! regression of z against arc length along the recovered circle then fixes
//! the longitudinal momentum component.

use nalgebra::{Matrix3, SymmetricEigen, Vector2, Vector3};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::error::FitError;
use crate::field::MagneticField;
use crate::hit::Hit;
use crate::seed::SeedOptions;

/// A plane normal with |n_z| below this is vertical: the mapped points are
/// collinear, i.e. the radius is infinite. Finer than any detector
/// resolution in cm.
const MIN_NORMAL_Z: f64 = 1e-6;
/// Both transverse normal components below this: the recovered circle center
/// degenerates to the origin and the longitudinal fit produces NaN.
const MIN_NORMAL_XY: f64 = 1e-10;
/// Substitute for non-finite hit weights.
const FALLBACK_WEIGHT: f64 = 1e-6;

/// Helix-fit result.
///
/// `radius` is the estimated transverse circle radius (always positive) —
/// it is not a fit chi-square.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HelixFit {
    /// Estimated transverse circle radius.
    pub radius: f64,
    /// Full momentum vector at the seed hit (GeV/c).
    pub momentum: [f64; 3],
}

pub(crate) fn fit(
    hits: &[Hit],
    field: MagneticField,
    options: &SeedOptions,
) -> Result<HelixFit, FitError> {
    let n = hits.len();
    assert!(n >= 3, "helix fit needs at least 3 hits, got {n}");

    // The seed hit is the innermost end of the sequence; the second hit
    // defines the direction of flight.
    let (seed_hit, second_hit) = if options.use_backwards {
        (hits[0].position, hits[1].position)
    } else {
        (hits[n - 1].position, hits[n - 2].position)
    };

    let mut sum_weights = 0.0;
    let mut mean = Vector3::zeros();
    let mut scatter = Matrix3::zeros();
    let mut mapped = Vec::with_capacity(n);
    let mut z_weights = Vec::with_capacity(n);

    for hit in hits {
        let p = hit.position;
        let r2 = p.x * p.x + p.y * p.y;
        let mut weight =
            1.0 / (hit.sigma.x * hit.sigma.x + hit.sigma.y * hit.sigma.y).sqrt();
        if !weight.is_finite() {
            tracing::error!(
                weight,
                "non-finite transverse helix-fit weight, substituting {FALLBACK_WEIGHT}"
            );
            weight = FALLBACK_WEIGHT;
        }
        let mut z_weight = 1.0 / hit.sigma.z;
        if !z_weight.is_finite() {
            tracing::error!(
                z_weight,
                "non-finite longitudinal helix-fit weight, substituting {FALLBACK_WEIGHT}"
            );
            z_weight = FALLBACK_WEIGHT;
        }

        let v = Vector3::new(p.x, p.y, r2);
        sum_weights += weight;
        mean += weight * v;
        scatter += weight * v * v.transpose();
        mapped.push(v);
        z_weights.push(z_weight);
    }
    mean /= sum_weights;
    let covariance = scatter - sum_weights * mean * mean.transpose();

    // Normal of the best-fit plane in mapped space.
    let eigen = SymmetricEigen::new(covariance);
    let mut min_index = 0;
    for i in 1..3 {
        if eigen.eigenvalues[i] < eigen.eigenvalues[min_index] {
            min_index = i;
        }
    }
    let normal = eigen.eigenvectors.column(min_index).into_owned();
    let plane_offset = -mean.dot(&normal);

    let (n1, n2, n3) = (normal.x, normal.y, normal.z);
    if n3.abs() < MIN_NORMAL_Z {
        return Err(FitError::StraightLine);
    }
    if n1.abs() < MIN_NORMAL_XY && n2.abs() < MIN_NORMAL_XY {
        return Err(FitError::CenterIsOrigin);
    }

    // Circle center and radius from the plane parameters.
    let half_inv_n3 = 1.0 / (2.0 * n3);
    let x_center = -n1 * half_inv_n3;
    let y_center = -n2 * half_inv_n3;
    let radius = ((1.0 - n3 * n3 - 4.0 * plane_offset * n3) * half_inv_n3 * half_inv_n3).sqrt();
    tracing::debug!(x_center, y_center, radius, "helix fit circle");

    // Project every hit onto the fitted circle. The local quadratic has two
    // solution branches ("below"/"above" the chord); the whole tracklet uses
    // whichever branch deviates less from the raw hits.
    let b = n1 * n1 + n2 * n2;
    let mut branch_pos = Vec::with_capacity(n);
    let mut branch_neg = Vec::with_capacity(n);
    for v in &mapped {
        let h = plane_offset + v.z * n3;
        let mut t2 = b * v.z - h * h;
        if t2 < 0.0 {
            // Rounding noise: the discriminant of an on-circle point is zero.
            tracing::debug!(t2, "negative branch discriminant clamped to zero");
            t2 = 0.0;
        }
        let t = t2.sqrt();
        branch_pos.push(Vector2::new((-n1 * h + n2 * t) / b, (-n2 * h - n1 * t) / b));
        branch_neg.push(Vector2::new((-n1 * h - n2 * t) / b, (-n2 * h + n1 * t) / b));
    }

    let max_deviation = |branch: &[Vector2<f64>]| -> f64 {
        let mut dx: f64 = 0.0;
        let mut dy: f64 = 0.0;
        for (s, v) in branch.iter().zip(&mapped) {
            dx = dx.max((s.x - v.x).abs());
            dy = dy.max((s.y - v.y).abs());
        }
        dx + dy
    };
    let has_nan =
        |branch: &[Vector2<f64>]| branch.iter().any(|s| !s.x.is_finite() || !s.y.is_finite());

    let pos_nan = has_nan(&branch_pos);
    let neg_nan = has_nan(&branch_neg);
    let projected = if max_deviation(&branch_pos) < max_deviation(&branch_neg) {
        if pos_nan {
            if neg_nan {
                tracing::debug!("both projection branches contain non-finite points");
            }
            &branch_neg
        } else {
            &branch_pos
        }
    } else if neg_nan {
        if pos_nan {
            tracing::debug!("both projection branches contain non-finite points");
        }
        &branch_pos
    } else {
        &branch_neg
    };

    // Cumulative arc length from the first projected point, via the law of
    // cosines on the radius vectors.
    let center = Vector2::new(x_center, y_center);
    let first_radial = projected[0] - center;
    let first_mag = first_radial.norm();
    let mut arc_lengths = Vec::with_capacity(n);
    arc_lengths.push(0.0);
    for (i, point) in projected.iter().enumerate().skip(1) {
        let radial = point - center;
        let s = radius * ((first_radial.dot(&radial) / first_mag) / radial.norm()).acos();
        if s.is_nan() {
            tracing::debug!(i, "non-finite arc length");
        }
        arc_lengths.push(s);
    }

    // Weighted linear regression of z against arc length.
    let mut sum_w = 0.0;
    let mut sum_ws = 0.0;
    let mut sum_ws2 = 0.0;
    let mut sum_wz = 0.0;
    let mut sum_wsz = 0.0;
    for i in 0..n {
        let w = z_weights[i];
        let s = arc_lengths[i];
        let z = hits[i].position.z;
        sum_w += w;
        sum_ws += w * s;
        sum_ws2 += w * s * s;
        sum_wz += w * z;
        sum_wsz += w * s * z;
    }
    let det = sum_w * sum_ws2 - sum_ws * sum_ws;
    let slope = (sum_w * sum_wsz - sum_ws * sum_wz) / det;
    let z_at_first = (sum_ws2 * sum_wz - sum_ws * sum_wsz) / det;

    let mut theta = PI * 0.5 - slope.atan();
    if theta.is_nan() {
        let chord = hits[0].position - hits[n - 1].position;
        theta = chord.xy().norm().atan2(chord.z);
        tracing::debug!(theta, "polar angle from z regression was NaN, using chord direction");
        if theta.is_nan() {
            tracing::error!("helix fit produced no usable polar angle, forcing 0");
            theta = 0.0;
        }
    }

    let pt = field.pt(radius)?;
    let radial = center - seed_hit.xy();
    // Tangent at the seed hit; its sign is fixed by the direction of flight
    // below.
    let tangent = Vector2::new(radial.y, -radial.x).normalize();
    let magnitude = options.momentum_magnitude.unwrap_or(pt);
    let mut transverse = tangent * magnitude;

    let to_second = (second_hit - seed_hit).xy();
    let angle = (to_second.dot(&transverse) / (to_second.norm() * transverse.norm()))
        .clamp(-1.0, 1.0)
        .acos();
    if (options.use_backwards && angle < PI * 0.5)
        || (!options.use_backwards && angle > PI * 0.5)
    {
        transverse = -transverse;
    }

    let pz = pt * slope;
    let momentum = Vector3::new(transverse.x, transverse.y, -pz);
    tracing::debug!(radius, theta, pt, pz, z_at_first, "helix fit momentum");

    if !radius.is_finite() || !momentum.iter().all(|c| c.is_finite()) {
        return Err(FitError::NonFiniteResult);
    }

    Ok(HelixFit {
        radius,
        momentum: [momentum.x, momentum.y, momentum.z],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{circle_hits, hits_from_positions, line_hits};
    use approx::assert_relative_eq;

    fn field() -> MagneticField {
        MagneticField::new(1.5)
    }

    fn options() -> SeedOptions {
        SeedOptions::default()
    }

    #[test]
    fn test_exact_helix_round_trip() {
        // Quarter-ish arc of radius 10 centered off-origin, constant pitch.
        let hits = circle_hits([10.0, 4.0], 10.0, 2.8, -0.35, 5, 0.0, 0.8, 0.1);
        let fit = fit(&hits, field(), &options()).expect("helix fit succeeds");
        assert_relative_eq!(fit.radius, 10.0, epsilon = 1e-6);

        let pt_expected = field().pt(10.0).unwrap();
        let pt_fitted = (fit.momentum[0] * fit.momentum[0]
            + fit.momentum[1] * fit.momentum[1])
            .sqrt();
        assert_relative_eq!(pt_fitted, pt_expected, epsilon = 1e-6);

        // dz/ds = 0.8 / (10 · 0.35) per step.
        let slope_expected = 0.8 / (10.0 * 0.35);
        assert_relative_eq!(
            fit.momentum[2].abs(),
            pt_expected * slope_expected,
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_unit_circle_pitch() {
        // Unit circle centered at (1, 0); z advances 2 per quarter turn, so
        // dz/ds = 2/(π/2) = 4/π.
        let hits = hits_from_positions(
            &[[0.0, 0.0, 0.0], [1.0, 1.0, 2.0], [2.0, 0.0, 4.0]],
            0.1,
        );
        let fit = fit(&hits, field(), &options()).expect("helix fit succeeds");
        assert_relative_eq!(fit.radius, 1.0, epsilon = 1e-9);

        let pt = field().pt(1.0).unwrap();
        assert_relative_eq!(fit.momentum[0], 0.0, epsilon = 1e-9);
        assert_relative_eq!(fit.momentum[1], pt, epsilon = 1e-9);
        assert_relative_eq!(
            fit.momentum[2],
            -field().pt(4.0 / PI).unwrap(),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_descending_z_flips_pz() {
        let hits = hits_from_positions(
            &[[0.0, 0.0, 0.0], [1.0, 1.0, -1.0], [2.0, 0.0, -2.0]],
            0.1,
        );
        let fit = fit(&hits, field(), &options()).expect("helix fit succeeds");
        assert_relative_eq!(
            fit.momentum[2],
            field().pt(2.0 / PI).unwrap(),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_collinear_hits_are_a_straight_line() {
        let hits = line_hits([-6.5, -0.9, -0.15], [1.0, 0.025, 0.003], 2.5, 4, 0.1);
        assert_eq!(
            fit(&hits, field(), &options()).unwrap_err(),
            FitError::StraightLine
        );
    }

    #[test]
    fn test_origin_centered_circle_is_degenerate() {
        // All hits exactly equidistant from the origin: the mapped points
        // share one r² value and the recovered center collapses onto the
        // origin.
        let hits = hits_from_positions(
            &[[10.0, 0.0, 0.0], [0.0, 10.0, 1.0], [-10.0, 0.0, 2.0], [0.0, -10.0, 3.0]],
            0.1,
        );
        assert_eq!(
            fit(&hits, field(), &options()).unwrap_err(),
            FitError::CenterIsOrigin
        );
    }

    #[test]
    fn test_backwards_seed_uses_first_hit() {
        let hits = circle_hits([10.0, 4.0], 10.0, 2.8, -0.35, 5, 0.0, 0.8, 0.1);
        let forward = fit(&hits, field(), &options()).expect("forward fit");
        let backward = fit(
            &hits,
            field(),
            &SeedOptions {
                use_backwards: true,
                ..SeedOptions::default()
            },
        )
        .expect("backward fit");
        assert_relative_eq!(forward.radius, backward.radius, epsilon = 1e-9);
        // Different anchor hits give different tangent directions.
        let dot = forward.momentum[0] * backward.momentum[0]
            + forward.momentum[1] * backward.momentum[1];
        assert!(dot.abs() < forward.momentum[0].hypot(forward.momentum[1]).powi(2));
    }

    #[test]
    fn test_fixed_momentum_magnitude() {
        let hits = circle_hits([10.0, 4.0], 10.0, 2.8, -0.35, 5, 0.0, 0.8, 0.1);
        let fixed = fit(
            &hits,
            field(),
            &SeedOptions {
                momentum_magnitude: Some(3.0),
                ..SeedOptions::default()
            },
        )
        .expect("fit succeeds");
        let pt_fitted = fixed.momentum[0].hypot(fixed.momentum[1]);
        assert_relative_eq!(pt_fitted, 3.0, epsilon = 1e-9);
        // The longitudinal component still scales with the fitted radius.
        let pt_physical = field().pt(10.0).unwrap();
        let slope = 0.8 / (10.0 * 0.35);
        assert_relative_eq!(
            fixed.momentum[2].abs(),
            pt_physical * slope,
            epsilon = 1e-6
        );
    }
}
