use super::*;

/// A dense set of 3D points. Kept as a thin wrapper (rather than a bare
/// `Vec`) so the transform helpers live next to the data they operate on.
#[derive(Debug, Clone, Default)]
pub struct PointCloud {
    points: Vec<Vector3<Floating>>,
}

impl PointCloud {
    pub fn new(points: Vec<Vector3<Floating>>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[Vector3<Floating>] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Returns a new cloud with every point mapped through `t`.
    pub fn transformed(&self, t: &Matrix4<Floating>) -> PointCloud {
        let r = t.fixed_view::<3, 3>(0, 0);
        let tr = Vector3::new(t[(0, 3)], t[(1, 3)], t[(2, 3)]);
        let points = self.points.iter().map(|p| r * p + tr).collect();
        PointCloud::new(points)
    }

    /// Overwrites `self` in place with `source` transformed by `t`,
    /// reusing the existing allocation — used by the line search and
    /// Newton driver to avoid reallocating a fresh cloud at every trial.
    pub fn overwrite_transformed(&mut self, source: &PointCloud, t: &Matrix4<Floating>) {
        let r = t.fixed_view::<3, 3>(0, 0);
        let tr = Vector3::new(t[(0, 3)], t[(1, 3)], t[(2, 3)]);
        self.points.clear();
        self.points
            .extend(source.points.iter().map(|p| r * p + tr));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_transform_preserves_points() {
        let cloud = PointCloud::new(vec![Vector3::new(1.0, 2.0, 3.0)]);
        let out = cloud.transformed(&Matrix4::identity());
        assert_eq!(out.points()[0], cloud.points()[0]);
    }

    #[test]
    fn translation_shifts_every_point() {
        let cloud = PointCloud::new(vec![Vector3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 1.0, 1.0)]);
        let p = PoseVector::new(1.0, 2.0, 3.0, 0.0, 0.0, 0.0);
        let t = pose_to_transform(&p);
        let out = cloud.transformed(&t);
        assert_eq!(out.points()[0], Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(out.points()[1], Vector3::new(2.0, 3.0, 4.0));
    }
}
