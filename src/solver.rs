use super::*;

/// Public entry point: aligns a source cloud to a target voxel map by
/// Newton's method, then answers scoring queries against the result.
/// Generic over the target map implementation rather than a trait object,
/// so callers pay no dynamic-dispatch cost outside the derivatives pass
/// itself (which already type-erases through `&dyn TargetVoxelMap`).
pub struct NdtSolver<T: TargetVoxelMap> {
    config: Config,
    source: Option<PointCloud>,
    target: Option<T>,
    outcome: Option<NewtonOutcome>,
    transformation_probability: Floating,
    nearest_voxel_transformation_likelihood: Floating,
}

impl<T: TargetVoxelMap> Default for NdtSolver<T> {
    fn default() -> Self {
        Self {
            config: Config::default(),
            source: None,
            target: None,
            outcome: None,
            transformation_probability: 0.0,
            nearest_voxel_transformation_likelihood: 0.0,
        }
    }
}

impl<T: TargetVoxelMap> NdtSolver<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_input_source(&mut self, source: PointCloud) {
        self.source = Some(source);
    }

    pub fn set_input_target(&mut self, target: T) {
        self.target = Some(target);
    }

    pub fn set_params(&mut self, config: Config) -> Result<(), RegistrationError> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    pub fn set_regularization_pose(&mut self, pose: Isometry3<Floating>) {
        self.config.regularization_pose = Some(pose);
    }

    /// Runs the Newton loop from `initial_guess` and caches the resulting
    /// trajectory, Hessian, and scoring-query outputs.
    pub fn align(&mut self, initial_guess: PoseVector) -> Result<(), RegistrationError> {
        self.config.validate()?;
        let source = self.source.as_ref().ok_or(RegistrationError::NoInputSource)?;
        let target = self.target.as_ref().ok_or(RegistrationError::NoInputTarget)?;

        let gauss = GaussConstants::new(self.config.outlier_ratio, self.config.resolution);
        let regularizer = Regularizer::from_config(&self.config);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.num_threads)
            .build()
            .map_err(|e| RegistrationError::InvalidConfig(e.to_string()))?;

        let outcome = align(
            initial_guess,
            source,
            target as &dyn TargetVoxelMap,
            &gauss,
            &self.config,
            regularizer.as_ref(),
            &pool,
        );

        let final_cloud = source.transformed(&pose_to_transform(&outcome.final_pose));
        self.transformation_probability =
            calculate_transformation_probability(&final_cloud, target, &gauss, &self.config, &pool);
        // Already computed as a live output of the final derivatives pass
        // inside `newton::align`, so no separate ScoringQueries call is
        // needed here the way `transformation_probability` needs one.
        self.nearest_voxel_transformation_likelihood = outcome.final_nearest_voxel_likelihood;

        info!(
            target: "ndt::solver",
            "align finished after {} iterations, converged={}, trans_probability={}",
            outcome.iterations, outcome.converged, self.transformation_probability
        );

        self.outcome = Some(outcome);
        Ok(())
    }

    pub fn final_transformation(&self) -> Option<Matrix4<Floating>> {
        self.outcome.as_ref().map(|o| pose_to_transform(&o.final_pose))
    }

    pub fn transformation_array(&self) -> Option<&[Matrix4<Floating>]> {
        self.outcome.as_ref().map(|o| o.trajectory.as_slice())
    }

    pub fn transformation_probability(&self) -> Floating {
        self.transformation_probability
    }

    pub fn nearest_voxel_transformation_likelihood(&self) -> Floating {
        self.nearest_voxel_transformation_likelihood
    }

    pub fn final_hessian(&self) -> Option<&Matrix6<Floating>> {
        self.outcome.as_ref().map(|o| &o.final_hessian)
    }

    pub fn has_converged(&self) -> bool {
        self.outcome.as_ref().map(|o| o.converged).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dense_cube() -> GridVoxelMap {
        let mut pts = Vec::new();
        for ix in -3..4 {
            for iy in -3..4 {
                for iz in -3..4 {
                    let base = Vector3::new(ix as Floating, iy as Floating, iz as Floating);
                    for k in 0..5 {
                        pts.push(base + Vector3::new(0.01 * k as Floating, -0.01 * k as Floating, 0.0));
                    }
                }
            }
        }
        GridVoxelMap::from_points(&pts, 1.0)
    }

    #[test]
    fn align_fails_without_source_or_target() {
        let mut solver: NdtSolver<GridVoxelMap> = NdtSolver::new();
        assert!(matches!(
            solver.align(PoseVector::zeros()),
            Err(RegistrationError::NoInputSource)
        ));
        solver.set_input_source(PointCloud::new(vec![Vector3::zeros()]));
        assert!(matches!(
            solver.align(PoseVector::zeros()),
            Err(RegistrationError::NoInputTarget)
        ));
    }

    #[test]
    fn identity_alignment_reports_converged_and_scored() {
        let mut solver: NdtSolver<GridVoxelMap> = NdtSolver::new();
        solver.set_params(Config::default().with_max_iterations(10)).unwrap();

        let mut points = Vec::new();
        for ix in -2..3 {
            for iy in -2..3 {
                points.push(Vector3::new(ix as Floating, iy as Floating, 0.0));
            }
        }
        solver.set_input_source(PointCloud::new(points));
        solver.set_input_target(dense_cube());

        solver.align(PoseVector::zeros()).unwrap();

        assert!(solver.final_transformation().is_some());
        assert!(solver.transformation_array().unwrap().len() >= 1);
        // d1 = ln(c2/(c1+c2)) < 0 for every valid (rho, r), so every
        // per-pair score_inc = -d1*raw is >= 0 and so is the total.
        assert!(solver.transformation_probability() >= 0.0);
    }
}
