//! trackletfit — trajectory-parameter estimation for charged-particle
//! tracklets in a uniform axial magnetic field.
//!
//! Given a short ordered sequence of 3-D detector hits (with per-axis
//! position uncertainties), the crate estimates the trajectory's curvature,
//! momentum vector and fit quality, and provides the combinatorial
//! consistency checks used to reject non-physical hit combinations. The
//! building blocks, leaf first:
//!
//! 1. **Pair metrics** – cheap distance/slope discriminators between two
//!    hits ([`HitPair`]).
//! 2. **Triplet metrics** – closed-form circle through three hits, angle
//!    metrics, curvature-sign tests ([`HitTriplet`]).
//! 3. **Quad metrics** – consistency of two overlapping triplet circles
//!    ([`HitQuad`]).
//! 4. **Zig-zag filters** – curvature-sign consistency along the whole
//!    tracklet ([`zigzag_xy`], [`zigzag_rz`]).
//! 5. **Fits** – weighted circle fit (Karimäki), paraboloid helix fit,
//!    straight-line fallback and a multiple-scattering triplet fit, plus the
//!    momentum-seed fallback cascade ([`SeedEstimator`]).
//!
//! All operations are pure, synchronous and CPU-bound; degenerate geometries
//! surface as typed [`FitError`]s, never as NaN momenta.

mod error;
mod field;
mod hit;
mod pair;
mod quad;
mod seed;
#[cfg(test)]
mod test_utils;
mod triplet;
mod zigzag;

pub use error::FitError;
pub use field::{MagneticField, MIN_RADIUS, PT_FACTOR_PER_TESLA};
pub use hit::{check_duplicate_hits, check_radial_ordering, Hit};
pub use pair::{nan_to_zero, HitPair};
pub use quad::{HitQuad, QuadCircles};
pub use seed::{
    CircleFit, CircleSeed, HelixFit, LineFit3D, MomentumSeed, SeedEstimator, SeedMethod,
    SeedOptions, TripletFit,
};
pub use triplet::{CircleXy, HitTriplet};
pub use zigzag::{net_curvature, zigzag_rz, zigzag_xy, zigzag_xy_with_sigma};

use nalgebra::Vector3;

/// Hit parameters for serialization (position + uncertainties).
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct HitRecord {
    /// Global position (x, y, z) in cm.
    pub position: [f64; 3],
    /// One standard deviation per axis, in cm.
    pub sigma: [f64; 3],
    /// Sensor-local u uncertainty.
    #[serde(default)]
    pub sigma_u: f64,
    /// Sensor-local v uncertainty.
    #[serde(default)]
    pub sigma_v: f64,
}

impl From<&Hit> for HitRecord {
    fn from(hit: &Hit) -> Self {
        Self {
            position: [hit.position.x, hit.position.y, hit.position.z],
            sigma: [hit.sigma.x, hit.sigma.y, hit.sigma.z],
            sigma_u: hit.sigma_u,
            sigma_v: hit.sigma_v,
        }
    }
}

impl From<HitRecord> for Hit {
    fn from(record: HitRecord) -> Self {
        Hit::new(
            Vector3::from(record.position),
            Vector3::from(record.sigma),
        )
        .with_local_sigma(record.sigma_u, record.sigma_v)
    }
}
