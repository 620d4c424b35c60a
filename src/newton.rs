use super::*;

/// Smallest Newton-direction norm worth normalizing and line-searching;
/// below this the gradient is considered flat and the driver stops.
const MIN_DIRECTION_NORM: Floating = 1e-12;

/// Result of running the outer Newton loop to convergence (or exhaustion).
#[derive(Debug, Clone)]
pub struct NewtonOutcome {
    pub final_pose: PoseVector,
    /// `T(p_0)` followed by `T(p_k)` after every accepted step.
    pub trajectory: Vec<Matrix4<Floating>>,
    pub iterations: usize,
    pub converged: bool,
    pub final_score: Floating,
    pub final_gradient: Vector6<Floating>,
    pub final_hessian: Matrix6<Floating>,
    pub final_neighborhood_count: usize,
    pub final_nearest_voxel_likelihood: Floating,
}

/// Solves `H * delta_p = -g` via Jacobi SVD, which degrades gracefully on a
/// rank-deficient Hessian instead of failing outright. When even that
/// leaves no usable solution (fully singular), falls back to plain
/// gradient descent, mirroring the teacher's `try_inverse` match.
fn newton_direction(hessian: &Matrix6<Floating>, gradient: &Vector6<Floating>) -> Vector6<Floating> {
    let svd = hessian.svd(true, true);
    match svd.solve(&(-gradient), 1e-9) {
        Ok(direction) => direction,
        Err(_) => {
            warn!(target: "ndt::newton", "Hessian is singular, using gradient descent direction");
            -gradient
        }
    }
}

/// Runs the Newton loop from `initial_pose` until the step-length norm
/// drops below `config.trans_epsilon` or `config.max_iterations` is
/// exhausted. Ties together `compute_derivatives`, the optional
/// `Regularizer`, and the More-Thuente `search`.
#[allow(clippy::too_many_arguments)]
pub fn align(
    initial_pose: PoseVector,
    source: &PointCloud,
    target: &dyn TargetVoxelMap,
    gauss: &GaussConstants,
    config: &Config,
    regularizer: Option<&Regularizer>,
    pool: &rayon::ThreadPool,
) -> NewtonOutcome {
    let mut pose = initial_pose;
    let mut trajectory = vec![pose_to_transform(&pose)];

    let mut transformed = source.transformed(&pose_to_transform(&pose));
    let mut eval = compute_derivatives(&pose, source, &transformed, target, gauss, config, true, pool);
    if let Some(reg) = regularizer {
        reg.apply(
            &pose,
            eval.neighborhood_count,
            &mut eval.score,
            &mut eval.gradient,
            &mut eval.hessian,
        );
    }

    let mut converged = false;
    let mut iterations = 0usize;

    for _ in 0..config.max_iterations {
        let raw_direction = newton_direction(&eval.hessian, &eval.gradient);
        let delta_p_norm = raw_direction.norm();
        if delta_p_norm.is_nan() {
            warn!(target: "ndt::newton", "Newton direction norm is NaN, stopping without convergence");
            converged = false;
            break;
        }
        if delta_p_norm < MIN_DIRECTION_NORM {
            converged = true;
            break;
        }
        let mut direction = raw_direction / delta_p_norm;

        let alpha_max = config.step_size;
        let alpha_min = config.trans_epsilon / 2.0;
        let (alpha, eval_new) = search(
            &pose,
            &mut direction,
            delta_p_norm,
            alpha_max,
            alpha_min,
            &eval,
            source,
            &mut transformed,
            target,
            gauss,
            config,
            regularizer,
            pool,
        );

        pose += alpha * direction;
        eval = eval_new;
        iterations += 1;
        trajectory.push(pose_to_transform(&pose));

        debug!(
            target: "ndt::newton",
            "iteration {}: alpha={}, score={}, pose={:?}",
            iterations, alpha, eval.score, pose
        );

        if alpha.abs() < config.trans_epsilon {
            converged = true;
            break;
        }
    }

    if !converged {
        info!(target: "ndt::newton", "reached max_iterations ({}) without converging", config.max_iterations);
    }

    NewtonOutcome {
        final_pose: pose,
        trajectory,
        iterations,
        converged,
        final_score: eval.score,
        final_gradient: eval.gradient,
        final_hessian: eval.hessian,
        final_neighborhood_count: eval.neighborhood_count,
        final_nearest_voxel_likelihood: eval.nearest_voxel_likelihood,
    }
}
