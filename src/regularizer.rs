use super::*;

/// Optional longitudinal-distance pose-prior term, penalizing deviation
/// of the current `(tx, ty)` from a fixed prior pose along the prior's
/// heading direction. Disabled when `scale_factor <= 0`.
#[derive(Debug, Clone, Copy)]
pub struct Regularizer {
    scale_factor: Floating,
    prior_x: Floating,
    prior_y: Floating,
}

impl Regularizer {
    /// The prior translation is captured once (from `Config`) rather than
    /// recomputed every iteration, mirroring the original computing
    /// `regularization_pose_translation_` once before the Newton loop.
    pub fn from_config(config: &Config) -> Option<Self> {
        if config.regularization_scale_factor <= 0.0 {
            return None;
        }
        let pose = config.regularization_pose?;
        let t = pose.translation.vector;
        Some(Self {
            scale_factor: config.regularization_scale_factor,
            prior_x: t.x,
            prior_y: t.y,
        })
    }

    /// Adds this term's contribution to `score`/`grad`/`hess` in place.
    /// `neighborhood_count_weight` is the *total* neighbor-pair count
    /// found across the whole pass, not a per-point count.
    pub fn apply(
        &self,
        pose: &PoseVector,
        neighborhood_count_weight: usize,
        score: &mut Floating,
        grad: &mut Vector6<Floating>,
        hess: &mut Matrix6<Floating>,
    ) {
        let dx = self.prior_x - pose[0];
        let dy = self.prior_y - pose[1];
        let (sin_yaw, cos_yaw) = pose[5].sin_cos();
        let longitudinal_distance = dx * cos_yaw + dy * sin_yaw;
        let w = self.scale_factor * neighborhood_count_weight as Floating;

        *score += -w * longitudinal_distance * longitudinal_distance;

        grad[0] += 2.0 * w * cos_yaw * longitudinal_distance;
        grad[1] += 2.0 * w * sin_yaw * longitudinal_distance;

        hess[(0, 0)] += -2.0 * w * cos_yaw * cos_yaw;
        hess[(0, 1)] += -2.0 * w * cos_yaw * sin_yaw;
        hess[(1, 0)] += -2.0 * w * cos_yaw * sin_yaw;
        hess[(1, 1)] += -2.0 * w * sin_yaw * sin_yaw;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Isometry3, Translation3, UnitQuaternion};

    #[test]
    fn disabled_when_scale_factor_zero() {
        let config = Config::default();
        assert!(Regularizer::from_config(&config).is_none());
    }

    #[test]
    fn hessian_block_is_symmetric() {
        let config = Config::default()
            .with_regularization_scale_factor(2.0)
            .with_regularization_pose(Isometry3::from_parts(
                Translation3::new(1.0, 0.5, 0.0),
                UnitQuaternion::identity(),
            ));
        let reg = Regularizer::from_config(&config).unwrap();
        let pose = PoseVector::new(0.2, 0.1, 0.0, 0.0, 0.0, 0.3);
        let mut score = 0.0;
        let mut grad = Vector6::zeros();
        let mut hess = Matrix6::zeros();
        reg.apply(&pose, 10, &mut score, &mut grad, &mut hess);
        assert_eq!(hess[(0, 1)], hess[(1, 0)]);
        assert!(score <= 0.0);
    }
}
