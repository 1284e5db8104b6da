//! Per-triplet circle geometry and angle metrics.
//!
//! For an (outer A, center B, inner C) hit triplet:
//! - angle metrics between the chained segments AB and BC in the 3-D,
//!   transverse and R-Z projections,
//! - the closed-form circle through the three transverse positions,
//! - curvature-sign tests (plain and noise-thresholded),
//! - helix-consistency discriminators comparing the angular step per Δz of
//!   the two segments around the circle center.

use nalgebra::{Vector2, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::FitError;
use crate::field::{MagneticField, MIN_RADIUS};
use crate::hit::Hit;
use crate::pair::{nan_to_zero, HitPair};

const RAD_TO_DEG: f64 = 180.0 / std::f64::consts::PI;

/// Circle estimate in the transverse plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CircleXy {
    /// Center (x, y).
    pub center: [f64; 2],
    /// Mean distance of the defining hits to the center.
    pub radius: f64,
}

impl CircleXy {
    /// Transverse distance of closest approach of the circle to the origin
    /// (point of closest approach to the interaction point).
    pub fn dist_to_ip(&self) -> f64 {
        (Vector2::from(self.center).norm() - self.radius).abs()
    }
}

/// Metrics over an (outer A, center B, inner C) hit triplet.
///
/// Construction precomputes the chained displacement vectors AB = A − B and
/// BC = B − C; all circle-derived quantities are recomputed per call and
/// returned as values, so a `HitTriplet` is immutable after construction.
#[derive(Debug, Clone, Copy)]
pub struct HitTriplet {
    a: Vector3<f64>,
    b: Vector3<f64>,
    c: Vector3<f64>,
    ab: Vector3<f64>,
    bc: Vector3<f64>,
}

impl HitTriplet {
    pub fn new(outer: &Hit, center: &Hit, inner: &Hit) -> Self {
        Self::from_positions(outer.position, center.position, inner.position)
    }

    pub fn from_positions(a: Vector3<f64>, b: Vector3<f64>, c: Vector3<f64>) -> Self {
        Self {
            a,
            b,
            c,
            ab: a - b,
            bc: b - c,
        }
    }

    // ── Angle metrics (never fail; non-finite results are zeroed) ──────────

    /// Cosine of the 3-D angle between AB and BC.
    pub fn cos_angle_3d(&self) -> f64 {
        nan_to_zero(self.ab.dot(&self.bc) / (self.ab.norm() * self.bc.norm()))
    }

    /// Full 3-D angle between AB and BC, in degrees.
    pub fn angle_3d_deg(&self) -> f64 {
        nan_to_zero(self.cos_angle_3d().clamp(-1.0, 1.0).acos() * RAD_TO_DEG)
    }

    /// Cosine of the transverse-plane angle between AB and BC.
    pub fn cos_angle_xy(&self) -> f64 {
        let ab = self.ab.xy();
        let bc = self.bc.xy();
        nan_to_zero(ab.dot(&bc) / (ab.norm() * bc.norm()))
    }

    /// Full transverse-plane angle between AB and BC, in degrees.
    pub fn angle_xy_deg(&self) -> f64 {
        nan_to_zero(self.cos_angle_xy().clamp(-1.0, 1.0).acos() * RAD_TO_DEG)
    }

    /// Cosine of the R-Z-projection angle between AB and BC.
    pub fn cos_angle_rz(&self) -> f64 {
        let ab = Vector2::new(self.ab.xy().norm(), self.ab.z);
        let bc = Vector2::new(self.bc.xy().norm(), self.bc.z);
        nan_to_zero(ab.dot(&bc) / (ab.norm() * bc.norm()))
    }

    /// Full R-Z-projection angle between AB and BC, in degrees.
    pub fn angle_rz_deg(&self) -> f64 {
        nan_to_zero(self.cos_angle_rz().clamp(-1.0, 1.0).acos() * RAD_TO_DEG)
    }

    /// Difference of the R-Z slopes of the two segments (kink finder).
    pub fn delta_slope_rz(&self) -> f64 {
        let outer = HitPair::from_positions(self.a, self.b);
        let inner = HitPair::from_positions(self.b, self.c);
        nan_to_zero(outer.slope_rz() - inner.slope_rz())
    }

    // ── Circle geometry ────────────────────────────────────────────────────

    /// Circle center through three transverse positions, solved in closed
    /// form via Cramer's rule on the perpendicular-bisector equations of AB
    /// and BC. An exactly-zero determinant means the three points are
    /// collinear in the transverse plane.
    pub fn circle_center_xy(
        a: &Vector3<f64>,
        b: &Vector3<f64>,
        c: &Vector3<f64>,
    ) -> Result<Vector2<f64>, FitError> {
        // Bisector of PQ: (p − q)·x = (|p|² − |q|²) / 2, transverse components.
        let m00 = a.x - b.x;
        let m01 = a.y - b.y;
        let m10 = b.x - c.x;
        let m11 = b.y - c.y;
        let r0 = 0.5 * ((a.x * a.x + a.y * a.y) - (b.x * b.x + b.y * b.y));
        let r1 = 0.5 * ((b.x * b.x + b.y * b.y) - (c.x * c.x + c.y * c.y));

        let det = m00 * m11 - m01 * m10;
        if det == 0.0 {
            return Err(FitError::StraightLine);
        }
        Ok(Vector2::new(
            (r0 * m11 - r1 * m01) / det,
            (m00 * r1 - m10 * r0) / det,
        ))
    }

    /// Mean transverse distance of the three positions to `center`.
    pub fn circle_radius(
        a: &Vector3<f64>,
        b: &Vector3<f64>,
        c: &Vector3<f64>,
        center: &Vector2<f64>,
    ) -> f64 {
        ((a.xy() - center).norm() + (b.xy() - center).norm() + (c.xy() - center).norm()) / 3.0
    }

    /// Circle through the triplet, with the radius sanity guard applied.
    pub fn circle(&self) -> Result<CircleXy, FitError> {
        let center = Self::circle_center_xy(&self.a, &self.b, &self.c)?;
        let radius = Self::circle_radius(&self.a, &self.b, &self.c, &center);
        if radius.abs() < MIN_RADIUS {
            return Err(FitError::CircleTooSmall { radius });
        }
        Ok(CircleXy {
            center: [center.x, center.y],
            radius,
        })
    }

    /// Transverse distance of closest approach of the triplet circle to the
    /// interaction point.
    pub fn circle_dist_to_ip(&self) -> Result<f64, FitError> {
        Ok(self.circle()?.dist_to_ip())
    }

    /// Transverse momentum implied by the triplet circle.
    pub fn pt(&self, field: MagneticField) -> Result<f64, FitError> {
        field.pt(self.circle()?.radius)
    }

    // ── Helix-consistency discriminators ───────────────────────────────────

    /// Central angles subtended by the AB and BC chords on `circle`.
    fn arc_angles(&self, circle: &CircleXy) -> (f64, f64) {
        let center = Vector2::from(circle.center);
        let ra = self.a.xy() - center;
        let rb = self.b.xy() - center;
        let rc = self.c.xy() - center;
        let phi_ab = (ra.dot(&rb) / (ra.norm() * rb.norm()))
            .clamp(-1.0, 1.0)
            .acos();
        let phi_bc = (rb.dot(&rc) / (rb.norm() * rc.norm()))
            .clamp(-1.0, 1.0)
            .acos();
        (phi_ab, phi_bc)
    }

    /// Division-free comparison of the angular step per Δz of the two
    /// segments: φ_AB·Δz_BC − φ_BC·Δz_AB. Zero on an ideal helix.
    pub fn delta_s_over_z(&self) -> Result<f64, FitError> {
        let circle = self.circle()?;
        let (phi_ab, phi_bc) = self.arc_angles(&circle);
        Ok(nan_to_zero(phi_ab * self.bc.z - phi_bc * self.ab.z))
    }

    /// Difference of the z-vs-arc-length slopes of the two segments.
    /// Zero on an ideal helix.
    pub fn delta_slope_z_over_s(&self) -> Result<f64, FitError> {
        let circle = self.circle()?;
        let (phi_ab, phi_bc) = self.arc_angles(&circle);
        Ok(nan_to_zero(
            self.ab.z.atan2(circle.radius * phi_ab) - self.bc.z.atan2(circle.radius * phi_bc),
        ))
    }

    /// Ratio of the two segments' angular step per Δz; one on an ideal
    /// helix.
    pub fn helix_parameter(&self) -> Result<f64, FitError> {
        let circle = self.circle()?;
        let (phi_ab, phi_bc) = self.arc_angles(&circle);
        Ok(nan_to_zero((phi_ab * self.bc.z) / (phi_bc * self.ab.z)))
    }

    // ── Curvature sign ─────────────────────────────────────────────────────

    /// Sign of the transverse curvature through (a, b, c): the sign of
    /// BC⊥ · AB with z ignored, where BC⊥ = (BC_y, −BC_x). Returns 0 for
    /// exactly collinear transverse positions.
    pub fn curvature_sign(a: &Vector3<f64>, b: &Vector3<f64>, c: &Vector3<f64>) -> i32 {
        let ab = (a - b).xy();
        let bc = (b - c).xy();
        let cross = bc.y * ab.x - bc.x * ab.y;
        if cross > 0.0 {
            1
        } else if cross < 0.0 {
            -1
        } else {
            0
        }
    }

    /// Noise-aware curvature sign: 0 (undetermined/straight) when the
    /// bearing difference of the two segments is within the band expected
    /// from the hit uncertainties, instead of forcing a ±1 decision.
    pub fn curvature_sign_with_sigma(
        a: &Vector3<f64>,
        b: &Vector3<f64>,
        c: &Vector3<f64>,
        sigma_a: &Vector3<f64>,
        sigma_b: &Vector3<f64>,
        sigma_c: &Vector3<f64>,
    ) -> i32 {
        let b2a = (a - b).xy();
        let c2b = (b - c).xy();
        let angle = b2a.x.atan2(b2a.y) - c2b.x.atan2(c2b.y);
        let threshold = (sigma_a.norm() + sigma_b.norm() + sigma_c.norm()) / (3.0 * c2b.norm());
        if angle < -threshold {
            -1
        } else if angle > threshold {
            1
        } else {
            0
        }
    }
}
