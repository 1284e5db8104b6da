//! Trajectory fits and the momentum-seed fallback cascade.
//!
//! [`SeedEstimator`] bundles the magnetic-field configuration with the four
//! fitting strategies (circle, helix, line, triplet) and the cascade that
//! picks the most precise one the geometry allows:
//! helix fit → straight-line fit → circle fit.

mod circle;
mod helix;
mod line;
mod triplet_fit;

pub use circle::{CircleFit, CircleSeed};
pub use helix::HelixFit;
pub use line::LineFit3D;
pub use triplet_fit::TripletFit;

use serde::{Deserialize, Serialize};

use crate::error::FitError;
use crate::field::MagneticField;
use crate::hit::Hit;

/// Per-call options shared by the trajectory fits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SeedOptions {
    /// Which end of the hit sequence is innermost for seeding purposes:
    /// `false` anchors at the last hit, `true` at the first.
    pub use_backwards: bool,
    /// Fix the seed momentum magnitude (GeV/c) instead of deriving it from
    /// the fitted radius.
    pub momentum_magnitude: Option<f64>,
}

/// Which fit produced a momentum seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedMethod {
    Helix,
    Line,
    Circle,
}

/// Momentum seed for one tracklet.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MomentumSeed {
    /// Momentum vector at the seed hit (GeV/c). Produced by the fit named in
    /// `method`; the line fit leaves it unscaled unless a magnitude was
    /// requested, and the circle fit leaves the z component at zero.
    pub momentum: [f64; 3],
    /// Transverse bending sense of the outermost hit triplet: +1 or −1.
    pub curvature_sign: i32,
    /// The fit that survived the fallback cascade.
    pub method: SeedMethod,
}

/// Trajectory fitter for ordered tracklets in a uniform axial field.
///
/// Holds only the field configuration; every fit is a pure function of its
/// inputs and allocates its own scratch state, so a `&SeedEstimator` can be
/// shared across threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeedEstimator {
    field: MagneticField,
}

impl SeedEstimator {
    pub fn new(field: MagneticField) -> Self {
        Self { field }
    }

    pub fn field(&self) -> MagneticField {
        self.field
    }

    /// Replace the magnetic-field configuration, e.g. at a run boundary.
    pub fn set_field(&mut self, field: MagneticField) {
        self.field = field;
    }

    /// Weighted circle fit: transverse circle parameters and chi-square.
    pub fn circle_fit(&self, hits: &[Hit]) -> Result<CircleFit, FitError> {
        circle::fit_parameters(hits)
    }

    /// Circle fit wrapped into a transverse momentum seed.
    pub fn circle_seed(
        &self,
        hits: &[Hit],
        options: &SeedOptions,
    ) -> Result<CircleSeed, FitError> {
        circle::fit_seed(hits, self.field, options)
    }

    /// Full 3-D helix fit.
    pub fn helix_fit(&self, hits: &[Hit], options: &SeedOptions) -> Result<HelixFit, FitError> {
        helix::fit(hits, self.field, options)
    }

    /// Straight-line fallback fit.
    pub fn line_fit(&self, hits: &[Hit], options: &SeedOptions) -> Result<LineFit3D, FitError> {
        line::fit(hits, options)
    }

    /// Multiple-scattering-aware triplet fit.
    pub fn triplet_fit(&self, hits: &[Hit]) -> Result<TripletFit, FitError> {
        triplet_fit::fit(hits, self.field)
    }

    /// Transverse momentum for a known radius.
    pub fn pt(&self, radius: f64) -> Result<f64, FitError> {
        self.field.pt(radius)
    }

    /// Transverse momentum from a fresh circle fit of the tracklet.
    pub fn pt_from_circle(&self, hits: &[Hit]) -> Result<f64, FitError> {
        let fit = self.circle_fit(hits)?;
        self.field.pt(fit.radius().abs())
    }

    /// Momentum-seed cascade.
    ///
    /// Tries the helix fit first; a degenerate plane (collinear hits, circle
    /// through the origin, non-finite output) falls back to the straight-line
    /// fit, and a line fit with an undefined regression axis falls back to
    /// the circle fit. A failure of the final fallback is the cascade's
    /// error. The curvature sign is determined independently of which fit
    /// won, from the cross-product test on the outermost hit triplet.
    ///
    /// Needs at least 3 hits.
    pub fn momentum_seed(
        &self,
        hits: &[Hit],
        options: &SeedOptions,
    ) -> Result<MomentumSeed, FitError> {
        assert!(
            hits.len() >= 3,
            "momentum seed needs at least 3 hits, got {}",
            hits.len()
        );
        let curvature_sign = self.seed_curvature_sign(hits);

        let (momentum, method) = match self.helix_fit(hits, options) {
            Ok(fit) => (fit.momentum, SeedMethod::Helix),
            Err(
                err @ (FitError::StraightLine
                | FitError::CenterIsOrigin
                | FitError::NonFiniteResult),
            ) => {
                tracing::debug!(%err, "helix fit degenerate, falling back to line fit");
                match self.line_fit(hits, options) {
                    Ok(fit) => (fit.direction, SeedMethod::Line),
                    Err(FitError::StraightUp) => {
                        tracing::debug!("line fit degenerate, falling back to circle fit");
                        let fit = self.circle_seed(hits, options)?;
                        (fit.pt, SeedMethod::Circle)
                    }
                    Err(other) => return Err(other),
                }
            }
            Err(other) => return Err(other),
        };

        Ok(MomentumSeed {
            momentum,
            curvature_sign,
            method,
        })
    }

    /// Curvature sign of the outermost hit triplet: the sign of
    /// (p0 − p1)⊥ · (p1 − p2) in the transverse plane. Exactly parallel
    /// segments default to +1, which is expected field-free behavior but a
    /// reportable anomaly inside a magnet.
    fn seed_curvature_sign(&self, hits: &[Hit]) -> i32 {
        let outer = (hits[0].position - hits[1].position).xy();
        let inner = (hits[1].position - hits[2].position).xy();
        let cross = outer.y * inner.x - outer.x * inner.y;
        if cross > 0.0 {
            1
        } else if cross < 0.0 {
            -1
        } else {
            if self.field.tesla() != 0.0 {
                tracing::warn!(
                    field_tesla = self.field.tesla(),
                    "outer hit segments are exactly parallel in a non-zero field; \
                     defaulting curvature sign to +1"
                );
            } else {
                tracing::debug!("parallel hit segments with zero field, curvature sign +1");
            }
            1
        }
    }
}
