//! Degenerate-geometry error taxonomy shared by all fitting stages.

/// Errors reported by the fitting and consistency-check routines.
///
/// The cheap pair/triplet angle metrics never fail (non-finite results are
/// silently zeroed); the fit-producing functions report the specific
/// degeneracy they detected so the caller can retry with a more robust
/// method. [`SeedEstimator::momentum_seed`](crate::SeedEstimator::momentum_seed)
/// is the designated recovery point for that cascade.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FitError {
    /// The hits are collinear in the relevant projection; no circle exists.
    StraightLine,
    /// The fitted circle's center coincides with (or is degenerately close
    /// to) the origin; downstream pT/curvature math is undefined.
    CenterIsOrigin,
    /// The estimated radius is below the numerical-stability threshold and
    /// cannot be used as a divisor.
    CircleTooSmall {
        /// The offending radius.
        radius: f64,
    },
    /// The track is parallel to one of the line-fit axes, making that
    /// regression's slope undefined.
    StraightUp,
    /// The net curvature-sign vote over the tracklet is exactly zero.
    AmbiguousCurvature,
    /// A fit produced a non-finite value despite passing earlier guards.
    NonFiniteResult,
    /// The same hit appears twice in one tracklet.
    DuplicateHit,
    /// Transverse radii are not monotonic along the tracklet.
    UnorderedHits,
}

impl std::fmt::Display for FitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StraightLine => write!(f, "hits are collinear, no circle exists"),
            Self::CenterIsOrigin => write!(f, "fitted circle center coincides with the origin"),
            Self::CircleTooSmall { radius } => {
                write!(f, "radius {} below numerical-stability threshold", radius)
            }
            Self::StraightUp => write!(f, "track parallel to a line-fit axis"),
            Self::AmbiguousCurvature => write!(f, "net curvature-sign vote is exactly zero"),
            Self::NonFiniteResult => write!(f, "fit produced a non-finite result"),
            Self::DuplicateHit => write!(f, "duplicate hit in tracklet"),
            Self::UnorderedHits => write!(f, "transverse radii not monotonic along tracklet"),
        }
    }
}

impl std::error::Error for FitError {}
