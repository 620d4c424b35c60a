use super::*;

/// Outcome of folding one `(point, voxel)` pair's Gauss term into the
/// running score/gradient/Hessian. `None` means the pair was skipped
/// (§7's `w∉[0,1]` / NaN rule) and contributed nothing.
pub type AccumulatorOutcome = Option<Floating>;

/// The Gauss-weighted score increment of one `(point, voxel)` pair, or
/// `None` if the pair is skipped as numerically invalid (§7's `w∉[0,1]`
/// rule). Shared between the derivative accumulator (which also needs the
/// gradient/Hessian weight `w*d1`) and `ScoringQueries`, which needs only
/// the score term but must reproduce this filter exactly to stay
/// consistent with the solver's own reported score.
pub fn score_increment(
    q: &Vector3<Floating>,
    inverse_cov: &Matrix3<Floating>,
    gauss: &GaussConstants,
) -> AccumulatorOutcome {
    let m = q.dot(&(inverse_cov * q));
    let raw = (-gauss.d2 * m / 2.0).exp();
    let score_inc = -gauss.d1 * raw;

    let w = gauss.d2 * raw;
    if !(0.0..=1.0).contains(&w) || w.is_nan() {
        return None;
    }
    Some(score_inc)
}

/// Accumulates the Gauss-weighted contribution of one `(point, voxel)`
/// pair into `grad`/`hess` and returns its score increment, or `None` if
/// the pair was skipped as numerically invalid. `q` is `x_trans - mean`.
#[allow(clippy::too_many_arguments)]
pub fn accumulate(
    q: &Vector3<Floating>,
    inverse_cov: &Matrix3<Floating>,
    jacobian: &PointJacobian,
    hessian_terms: &PointHessianBlocks,
    gauss: &GaussConstants,
    compute_hessian: bool,
    grad: &mut Vector6<Floating>,
    hess: &mut Matrix6<Floating>,
) -> AccumulatorOutcome {
    let m = q.dot(&(inverse_cov * q));
    let raw = (-gauss.d2 * m / 2.0).exp();
    let score_inc = -gauss.d1 * raw;

    let mut w = gauss.d2 * raw;
    if !(0.0..=1.0).contains(&w) || w.is_nan() {
        return None;
    }
    w *= gauss.d1;

    // alpha_i = q^T * Sigma^-1 * J_i, for each of the 6 pose parameters.
    let cinv_j = inverse_cov * jacobian; // 3x6
    let alpha = (q.transpose() * cinv_j).transpose(); // 6x1

    *grad += w * alpha;

    if compute_hessian {
        let qtc = q.transpose() * inverse_cov; // 1x3
        let jtcinvj = jacobian.transpose() * cinv_j; // 6x6, symmetric
        for i in 0..6 {
            for j in 0..6 {
                let h_ij = hessian_terms.block(i, j);
                let term = (qtc * h_ij)[(0, 0)];
                hess[(i, j)] += w * (-gauss.d2 * alpha[i] * alpha[j] + term + jtcinvj[(j, i)]);
            }
        }
    }

    Some(score_inc)
}
