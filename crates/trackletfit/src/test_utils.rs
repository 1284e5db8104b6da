//! Shared synthetic-trajectory helpers for unit tests.

use nalgebra::Vector3;

use crate::hit::Hit;

/// Uniform per-axis sigma vector.
pub(crate) fn uniform_sigma(sigma: f64) -> Vector3<f64> {
    Vector3::new(sigma, sigma, sigma)
}

/// Positions on a circular arc in the transverse plane with a linear z
/// progression: point `i` sits at azimuth `phi_start + i·phi_step` on the
/// circle of the given center and radius, at `z = z0 + i·dz`.
pub(crate) fn circle_positions(
    center: [f64; 2],
    radius: f64,
    phi_start: f64,
    phi_step: f64,
    n: usize,
    z0: f64,
    dz: f64,
) -> Vec<Vector3<f64>> {
    (0..n)
        .map(|i| {
            let phi = phi_start + i as f64 * phi_step;
            Vector3::new(
                center[0] + radius * phi.cos(),
                center[1] + radius * phi.sin(),
                z0 + i as f64 * dz,
            )
        })
        .collect()
}

/// [`circle_positions`] wrapped into hits with uniform sigmas.
#[allow(clippy::too_many_arguments)]
pub(crate) fn circle_hits(
    center: [f64; 2],
    radius: f64,
    phi_start: f64,
    phi_step: f64,
    n: usize,
    z0: f64,
    dz: f64,
    sigma: f64,
) -> Vec<Hit> {
    circle_positions(center, radius, phi_start, phi_step, n, z0, dz)
        .into_iter()
        .map(|p| Hit::new(p, uniform_sigma(sigma)))
        .collect()
}

/// Hits at explicit positions with uniform sigmas.
pub(crate) fn hits_from_positions(positions: &[[f64; 3]], sigma: f64) -> Vec<Hit> {
    positions
        .iter()
        .map(|&p| Hit::new(Vector3::from(p), uniform_sigma(sigma)))
        .collect()
}

/// Hits on a straight line `origin + i·step·direction` with uniform sigmas.
pub(crate) fn line_hits(
    origin: [f64; 3],
    direction: [f64; 3],
    step: f64,
    n: usize,
    sigma: f64,
) -> Vec<Hit> {
    let origin = Vector3::from(origin);
    let direction = Vector3::from(direction);
    (0..n)
        .map(|i| Hit::new(origin + direction * (i as f64 * step), uniform_sigma(sigma)))
        .collect()
}
