use super::*;

/// The three constants of the NDT Gauss mixture approximation, derived
/// once from the outlier ratio and voxel resolution (see spec.md §3 /
/// `ndt_omp_impl.hpp`'s constructor).
#[derive(Debug, Clone, Copy)]
pub struct GaussConstants {
    pub d1: Floating,
    pub d2: Floating,
    pub d3: Floating,
}

impl GaussConstants {
    pub fn new(outlier_ratio: Floating, resolution: Floating) -> Self {
        let gauss_c1 = 10.0 * (1.0 - outlier_ratio);
        let gauss_c2 = outlier_ratio / resolution.powi(3);
        let d3 = -gauss_c2.ln();
        let d1 = -(gauss_c1 + gauss_c2).ln() - d3;
        let d2 = -2.0 * (((-(gauss_c1 * (-0.5f64).exp() + gauss_c2).ln()) - d3) / d1).ln();
        Self { d1, d2, d3 }
    }
}
