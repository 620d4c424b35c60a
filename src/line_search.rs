use super::*;

const MU: Floating = 1e-4;
const NU: Floating = 0.9;
const MAX_STEP_ITERATIONS: usize = 10;

fn psi(t: Floating, phi_t: Floating, phi_0: Floating, dphi_0: Floating) -> Floating {
    phi_t - phi_0 - MU * t * dphi_0
}

fn dpsi(dphi_t: Floating, dphi_0: Floating) -> Floating {
    dphi_t - MU * dphi_0
}

/// Closed-form minimizer of the cubic interpolating `(ta, f_ta, g_ta)` and
/// `(tb, f_tb, g_tb)` (Moré-Thuente, via Sun & Yuan eq. 2.4.56 — same
/// formula the teacher's `MoreThuente::cubic_minimizer` implements).
fn cubic_minimizer(
    ta: Floating,
    tb: Floating,
    f_ta: Floating,
    f_tb: Floating,
    g_ta: Floating,
    g_tb: Floating,
) -> Floating {
    let s = 3.0 * (f_tb - f_ta) / (tb - ta);
    let z = s - g_ta - g_tb;
    let w = (z * z - g_ta * g_tb).sqrt();
    ta + (tb - ta) * ((w - g_ta - z) / (g_tb - g_ta + 2.0 * w))
}

/// Quadratic minimizer through `(ta, f_ta, g_ta)` and `(tb, f_tb)` (Sun &
/// Yuan eq. 2.4.2) — the case-1 helper.
fn quadratic_minimizer_1(ta: Floating, tb: Floating, f_ta: Floating, f_tb: Floating, g_ta: Floating) -> Floating {
    let lin_int = (f_ta - f_tb) / (ta - tb);
    ta - 0.5 * ((ta - tb) * g_ta / (g_ta - lin_int))
}

/// Quadratic minimizer matching the gradients at `ta` and `tb` (Sun & Yuan
/// eq. 2.4.5) — the case-2/3 helper.
fn quadratic_minimizer_2(ta: Floating, tb: Floating, g_ta: Floating, g_tb: Floating) -> Floating {
    ta - g_ta * ((ta - tb) / (g_ta - g_tb))
}

#[allow(clippy::too_many_arguments)]
fn trial_value_selection(
    a_l: Floating,
    f_l: Floating,
    g_l: Floating,
    a_u: Floating,
    f_u: Floating,
    g_u: Floating,
    a_t: Floating,
    f_t: Floating,
    g_t: Floating,
) -> Floating {
    if f_t > f_l {
        // Case 1: higher function value — cubic, bisected against the
        // quadratic-from-values estimate.
        let a_c = cubic_minimizer(a_l, a_t, f_l, f_t, g_l, g_t);
        let a_q = quadratic_minimizer_1(a_l, a_t, f_l, f_t, g_l);
        if (a_c - a_l).abs() < (a_q - a_l).abs() {
            a_c
        } else {
            0.5 * (a_q + a_c)
        }
    } else if g_t * g_l < 0.0 {
        // Case 2: lower value, opposite-sign slope — cubic vs. secant.
        let a_c = cubic_minimizer(a_l, a_t, f_l, f_t, g_l, g_t);
        let a_s = quadratic_minimizer_2(a_l, a_t, g_l, g_t);
        if (a_c - a_t).abs() >= (a_s - a_t).abs() {
            a_c
        } else {
            a_s
        }
    } else if g_t.abs() <= g_l.abs() {
        // Case 3: lower value, same-sign slope, decreasing magnitude.
        let a_c = cubic_minimizer(a_l, a_t, f_l, f_t, g_l, g_t);
        let a_s = quadratic_minimizer_2(a_l, a_t, g_l, g_t);
        let candidate = if (a_c - a_t).abs() < (a_s - a_t).abs() {
            a_c
        } else {
            a_s
        };
        if a_t > a_l {
            candidate.min(a_t + 0.66 * (a_u - a_t))
        } else {
            candidate.max(a_t + 0.66 * (a_u - a_t))
        }
    } else {
        // Case 4: lower value, same-sign slope, non-decreasing magnitude.
        cubic_minimizer(a_u, a_t, f_u, f_t, g_u, g_t)
    }
}

/// Updates the bracketing interval `[a_l, a_u]` (and its cached
/// function/derivative values) given a new trial point. Returns `true`
/// once the interval has effectively collapsed (converged).
#[allow(clippy::too_many_arguments)]
fn update_interval(
    a_l: &mut Floating,
    f_l: &mut Floating,
    g_l: &mut Floating,
    a_u: &mut Floating,
    f_u: &mut Floating,
    g_u: &mut Floating,
    a_t: Floating,
    f_t: Floating,
    g_t: Floating,
) -> bool {
    if f_t > *f_l {
        // U1
        *a_u = a_t;
        *f_u = f_t;
        *g_u = g_t;
        false
    } else if g_t * (*a_l - a_t) > 0.0 {
        // U2
        *a_l = a_t;
        *f_l = f_t;
        *g_l = g_t;
        false
    } else if g_t * (*a_l - a_t) < 0.0 {
        // U3
        *a_u = *a_l;
        *f_u = *f_l;
        *g_u = *g_l;
        *a_l = a_t;
        *f_l = f_t;
        *g_l = g_t;
        false
    } else {
        *a_l = a_t;
        *f_l = f_t;
        *g_l = g_t;
        true
    }
}

/// More-Thuente step-length search over the ray `p + alpha * direction`.
/// Returns the accepted step length together with the score/gradient/
/// Hessian evaluated there (the Hessian is always fresh, recomputed after
/// the loop if any inner iteration ran beyond the initial trial).
#[allow(clippy::too_many_arguments)]
pub fn search(
    pose: &PoseVector,
    direction: &mut Vector6<Floating>,
    alpha_init: Floating,
    alpha_max: Floating,
    alpha_min: Floating,
    eval0: &DerivativesResult,
    source: &PointCloud,
    transformed: &mut PointCloud,
    target: &dyn TargetVoxelMap,
    gauss: &GaussConstants,
    config: &Config,
    regularizer: Option<&Regularizer>,
    pool: &rayon::ThreadPool,
) -> (Floating, DerivativesResult) {
    let mut d_phi_0 = -direction.dot(&eval0.gradient);
    if d_phi_0 >= 0.0 {
        if d_phi_0 == 0.0 {
            return (0.0, eval0.clone());
        }
        warn!(target: "ndt::line_search", "direction is not a descent direction, flipping it");
        *direction = -*direction;
        d_phi_0 = -d_phi_0;
    }
    let phi_0 = -eval0.score;

    let mut a_l = 0.0;
    let mut f_l = psi(a_l, phi_0, phi_0, d_phi_0);
    let mut g_l = dpsi(d_phi_0, d_phi_0);
    let mut a_u = a_l;
    let mut f_u = f_l;
    let mut g_u = g_l;

    let mut interval_converged = (alpha_max - alpha_min) < 0.0;
    let mut open_interval = true;

    let mut a_t = alpha_init.clamp(alpha_min, alpha_max);

    let eval_at = |a_t: Floating,
                   transformed: &mut PointCloud,
                   compute_hessian: bool|
     -> DerivativesResult {
        let trial_pose = pose + a_t * *direction;
        let t = pose_to_transform(&trial_pose);
        transformed.overwrite_transformed(source, &t);
        let mut eval = compute_derivatives(
            &trial_pose,
            source,
            transformed,
            target,
            gauss,
            config,
            compute_hessian,
            pool,
        );
        if let Some(reg) = regularizer {
            reg.apply(
                &trial_pose,
                eval.neighborhood_count,
                &mut eval.score,
                &mut eval.gradient,
                &mut eval.hessian,
            );
        }
        eval
    };

    let mut eval_t = eval_at(a_t, transformed, true);

    if !config.use_line_search {
        return (a_t, eval_t);
    }

    let mut phi_t = -eval_t.score;
    let mut d_phi_t = -direction.dot(&eval_t.gradient);
    let mut psi_t = psi(a_t, phi_t, phi_0, d_phi_0);
    let mut d_psi_t = dpsi(d_phi_t, d_phi_0);

    let mut step_iterations = 0usize;
    while !interval_converged
        && step_iterations < MAX_STEP_ITERATIONS
        && !(psi_t <= 0.0 && d_phi_t <= -NU * d_phi_0)
    {
        a_t = if open_interval {
            trial_value_selection(a_l, f_l, g_l, a_u, f_u, g_u, a_t, psi_t, d_psi_t)
        } else {
            trial_value_selection(a_l, f_l, g_l, a_u, f_u, g_u, a_t, phi_t, d_phi_t)
        };
        a_t = a_t.clamp(alpha_min, alpha_max);

        eval_t = eval_at(a_t, transformed, false);
        phi_t = -eval_t.score;
        d_phi_t = -direction.dot(&eval_t.gradient);
        psi_t = psi(a_t, phi_t, phi_0, d_phi_0);
        d_psi_t = dpsi(d_phi_t, d_phi_0);

        if open_interval && psi_t <= 0.0 && d_psi_t >= 0.0 {
            open_interval = false;
            f_l += phi_0 - MU * d_phi_0 * a_l;
            g_l += MU * d_phi_0;
            f_u += phi_0 - MU * d_phi_0 * a_u;
            g_u += MU * d_phi_0;
        }

        interval_converged = if open_interval {
            update_interval(&mut a_l, &mut f_l, &mut g_l, &mut a_u, &mut f_u, &mut g_u, a_t, psi_t, d_psi_t)
        } else {
            update_interval(&mut a_l, &mut f_l, &mut g_l, &mut a_u, &mut f_u, &mut g_u, a_t, phi_t, d_phi_t)
        };

        step_iterations += 1;
        trace!(target: "ndt::line_search", "trial {}: a_t={}, psi_t={}, d_psi_t={}", step_iterations, a_t, psi_t, d_psi_t);
    }

    if step_iterations >= MAX_STEP_ITERATIONS {
        warn!(target: "ndt::line_search", "hit the line-search iteration cap, accepting last trial");
    }

    if step_iterations > 0 {
        eval_t = eval_at(a_t, transformed, true);
    }

    (a_t, eval_t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_line_search_returns_initial_alpha() {
        let map = GridVoxelMap::from_points(
            &(0..30)
                .map(|i| Vector3::new((i as Floating) * 0.1, 0.0, 0.0))
                .collect::<Vec<_>>(),
            1.0,
        );
        let gauss = GaussConstants::new(0.55, 1.0);
        let config = Config::default(); // use_line_search = false
        let source = PointCloud::new(vec![Vector3::new(0.0, 0.0, 0.0)]);
        let pool = rayon::ThreadPoolBuilder::new().num_threads(1).build().unwrap();
        let pose = PoseVector::zeros();
        let transformed = source.clone();
        let eval0 = compute_derivatives(&pose, &source, &transformed, &map, &gauss, &config, true, &pool);
        let mut direction = Vector6::new(0.1, 0.0, 0.0, 0.0, 0.0, 0.0);
        let mut scratch = transformed.clone();
        let (alpha, _) = search(
            &pose, &mut direction, 1.0, 10.0, 0.0, &eval0, &source, &mut scratch, &map, &gauss, &config, None, &pool,
        );
        assert_eq!(alpha, 1.0);
    }
}
