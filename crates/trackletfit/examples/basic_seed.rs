//! Minimal usage: build a synthetic tracklet and estimate its momentum seed.

use nalgebra::Vector3;
use trackletfit::{MagneticField, SeedEstimator, SeedOptions, Hit};

fn main() {
    // Five hits on a helix of transverse radius 10 cm centered at (12, 3),
    // ordered outermost first, with 1 mm position uncertainties.
    let radius = 10.0;
    let center = (12.0, 3.0);
    let hits: Vec<Hit> = (0..5)
        .map(|i| {
            let phi = 2.9 - 0.3 * i as f64;
            Hit::new(
                Vector3::new(
                    center.0 + radius * phi.cos(),
                    center.1 + radius * phi.sin(),
                    0.5 * i as f64,
                ),
                Vector3::new(0.1, 0.1, 0.1),
            )
        })
        .collect();

    let estimator = SeedEstimator::new(MagneticField::new(1.5));

    if trackletfit::zigzag_xy(&hits) {
        eprintln!("tracklet rejected: curvature sign flips along the hits");
        return;
    }

    let seed = estimator
        .momentum_seed(&hits, &SeedOptions::default())
        .expect("non-degenerate tracklet");

    let [px, py, pz] = seed.momentum;
    println!("method:         {:?}", seed.method);
    println!("curvature sign: {:+}", seed.curvature_sign);
    println!("pT:             {:.4} GeV/c", px.hypot(py));
    println!("pZ:             {:+.4} GeV/c", pz);
}
