//! Four-hit consistency checks between two overlapping triplet circles.

use nalgebra::{Vector2, Vector3};

use crate::error::FitError;
use crate::field::MagneticField;
use crate::hit::Hit;
use crate::triplet::{CircleXy, HitTriplet};

/// The two overlapping circle estimates of a quadruplet: ABC (outer) and
/// BCD (inner).
#[derive(Debug, Clone, Copy)]
pub struct QuadCircles {
    pub outer: CircleXy,
    pub inner: CircleXy,
}

/// Consistency metrics for an ordered (outer A, B, C, inner D) quadruplet.
///
/// Degenerate sub-circles propagate their [`FitError`] unchanged; a quad
/// whose triplets are collinear or whose radii cancel is reported, not
/// silently zeroed.
#[derive(Debug, Clone, Copy)]
pub struct HitQuad {
    a: Vector3<f64>,
    b: Vector3<f64>,
    c: Vector3<f64>,
    d: Vector3<f64>,
}

impl HitQuad {
    pub fn new(a: &Hit, b: &Hit, c: &Hit, d: &Hit) -> Self {
        Self::from_positions(a.position, b.position, c.position, d.position)
    }

    pub fn from_positions(
        a: Vector3<f64>,
        b: Vector3<f64>,
        c: Vector3<f64>,
        d: Vector3<f64>,
    ) -> Self {
        Self { a, b, c, d }
    }

    /// Circle estimates of the two overlapping triplets.
    pub fn circles(&self) -> Result<QuadCircles, FitError> {
        let outer = HitTriplet::from_positions(self.a, self.b, self.c).circle()?;
        let inner = HitTriplet::from_positions(self.b, self.c, self.d).circle()?;
        Ok(QuadCircles { outer, inner })
    }

    /// Momentum-scale discrepancy of the two circle estimates:
    /// |pT(r_ABC − r_BCD)|.
    ///
    /// The radius *difference* is run through the pT conversion, so two
    /// estimates agreeing to better than the radius sanity threshold are
    /// reported as [`FitError::CircleTooSmall`] rather than a zero.
    pub fn delta_pt(&self, field: MagneticField) -> Result<f64, FitError> {
        let circles = self.circles()?;
        Ok(field.pt(circles.outer.radius - circles.inner.radius)?.abs())
    }

    /// Difference of the two circles' distances to the origin:
    /// |‖c_ABC‖ − ‖c_BCD‖|.
    pub fn delta_circle_center_dist(&self) -> Result<f64, FitError> {
        let circles = self.circles()?;
        Ok((Vector2::from(circles.outer.center).norm()
            - Vector2::from(circles.inner.center).norm())
        .abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::circle_positions;
    use approx::assert_relative_eq;

    #[test]
    fn test_consistent_quad_has_zero_center_shift() {
        let pts = circle_positions([5.0, -3.0], 8.0, 0.2, 0.3, 4, 0.0, 0.5);
        let quad = HitQuad::from_positions(pts[3], pts[2], pts[1], pts[0]);
        assert_relative_eq!(
            quad.delta_circle_center_dist().unwrap(),
            0.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_identical_radii_hit_the_divisor_guard() {
        // Both triplet circles are exact, so the radius difference falls
        // below the sanity threshold and the pT conversion reports it.
        let pts = circle_positions([5.0, -3.0], 8.0, 0.2, 0.3, 4, 0.0, 0.5);
        let quad = HitQuad::from_positions(pts[3], pts[2], pts[1], pts[0]);
        assert!(matches!(
            quad.delta_pt(MagneticField::default()),
            Err(FitError::CircleTooSmall { .. })
        ));
    }

    #[test]
    fn test_inconsistent_quad_produces_finite_discrepancy() {
        // Outer triplet on an r = 8 circle, inner hit pulled inward so the
        // BCD circle shrinks.
        let pts = circle_positions([5.0, -3.0], 8.0, 0.2, 0.3, 4, 0.0, 0.5);
        let pulled = Vector3::new(
            5.0 + 6.0 * (0.2f64).cos(),
            -3.0 + 6.0 * (0.2f64).sin(),
            pts[0].z,
        );
        let quad = HitQuad::from_positions(pts[3], pts[2], pts[1], pulled);
        let delta_pt = quad.delta_pt(MagneticField::default()).unwrap();
        assert!(delta_pt.is_finite() && delta_pt > 0.0);
        assert!(quad.delta_circle_center_dist().unwrap() > 0.0);
    }

    #[test]
    fn test_collinear_triplet_propagates() {
        let quad = HitQuad::from_positions(
            Vector3::new(3.0, 3.0, 0.3),
            Vector3::new(2.0, 2.0, 0.2),
            Vector3::new(1.0, 1.0, 0.1),
            Vector3::new(0.0, 0.5, 0.0),
        );
        assert_eq!(
            quad.delta_pt(MagneticField::default()),
            Err(FitError::StraightLine)
        );
    }
}
