//! Tracklet-level combinatorial consistency filters.
//!
//! A physical trajectory in a uniform axial field bends with one curvature
//! sign; an alternation of signs along consecutive hit triplets ("zig-zag")
//! indicates a combinatorially wrong hit association.

use nalgebra::Vector3;

use crate::error::FitError;
use crate::hit::Hit;
use crate::triplet::HitTriplet;

fn signs_disagree(signs: impl Iterator<Item = i32>) -> bool {
    let mut seen = None;
    for sign in signs {
        match seen {
            None => seen = Some(sign),
            Some(prev) if prev != sign => return true,
            _ => {}
        }
    }
    false
}

/// True (reject) when the curvature sign flips anywhere along the tracklet
/// in the transverse projection.
pub fn zigzag_xy(hits: &[Hit]) -> bool {
    signs_disagree(hits.windows(3).map(|w| {
        HitTriplet::curvature_sign(&w[0].position, &w[1].position, &w[2].position)
    }))
}

/// Noise-aware variant of [`zigzag_xy`]: triplets whose bend is inside their
/// sigma band vote 0 and are removed before the uniqueness check, making the
/// filter tolerant of near-straight segments.
pub fn zigzag_xy_with_sigma(hits: &[Hit]) -> bool {
    signs_disagree(
        hits.windows(3)
            .map(|w| {
                HitTriplet::curvature_sign_with_sigma(
                    &w[0].position,
                    &w[1].position,
                    &w[2].position,
                    &w[0].sigma,
                    &w[1].sigma,
                    &w[2].sigma,
                )
            })
            .filter(|&sign| sign != 0),
    )
}

/// Zig-zag test in the (transverse radius, z) projection.
pub fn zigzag_rz(hits: &[Hit]) -> bool {
    let projected: Vec<Vector3<f64>> = hits
        .iter()
        .map(|hit| Vector3::new(hit.perp(), hit.position.z, 0.0))
        .collect();
    signs_disagree(
        projected
            .windows(3)
            .map(|w| HitTriplet::curvature_sign(&w[0], &w[1], &w[2])),
    )
}

/// Net curvature-sign vote over all consecutive triplets: `Ok(true)` for
/// net-clockwise, `Ok(false)` for net-counterclockwise bending.
///
/// A vote of exactly zero is perfectly ambiguous and reported as
/// [`FitError::AmbiguousCurvature`].
pub fn net_curvature(hits: &[Hit]) -> Result<bool, FitError> {
    let mut sum = 0.0;
    for w in hits.windows(3) {
        let ab = (w[0].position - w[1].position).xy();
        let bc = (w[1].position - w[2].position).xy();
        // BC⊥ · AB
        sum += bc.y * ab.x - bc.x * ab.y;
    }
    if sum == 0.0 {
        return Err(FitError::AmbiguousCurvature);
    }
    Ok(sum > 0.0)
}
