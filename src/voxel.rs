use super::*;

/// A single leaf of the target's voxel grid: a Gaussian fit to the points
/// that fell inside it. Owned by the target map, borrowed read-only here.
#[derive(Debug, Clone, Copy, derive_getters::Getters)]
pub struct GaussianVoxel {
    mean: Vector3<Floating>,
    inverse_cov: Matrix3<Floating>,
    leaf_index: u64,
}

impl GaussianVoxel {
    pub fn new(mean: Vector3<Floating>, inverse_cov: Matrix3<Floating>, leaf_index: u64) -> Self {
        Self {
            mean,
            inverse_cov,
            leaf_index,
        }
    }
}

/// External collaborator supplying the target's Gaussian-mixture voxels.
/// Construction of the grid itself (covariance estimation, a real spatial
/// index) is out of scope for this crate; implementors are expected to
/// wrap whatever indexing structure they already maintain.
///
/// Every query writes into a caller-supplied scratch buffer instead of
/// allocating, so a parallel pass can hand each worker one buffer it
/// reuses across every point it processes (see `ParallelDerivativesPass`).
pub trait TargetVoxelMap: Sync {
    fn radius_search(&self, point: &Vector3<Floating>, radius: Floating, out: &mut Vec<GaussianVoxel>);
    fn neighborhood_26(&self, point: &Vector3<Floating>, out: &mut Vec<GaussianVoxel>);
    fn neighborhood_7(&self, point: &Vector3<Floating>, out: &mut Vec<GaussianVoxel>);
    fn neighborhood_1(&self, point: &Vector3<Floating>, out: &mut Vec<GaussianVoxel>);

    /// Integer leaf index the grid would assign to a point at `mean`.
    /// Used to key `voxel_score_map` during scoring.
    fn leaf_index(&self, mean: &Vector3<Floating>) -> u64;
}

pub type QueryFn = fn(&dyn TargetVoxelMap, &Vector3<Floating>, Floating, &mut Vec<GaussianVoxel>);

/// Resolves `method` to a monomorphic function pointer once per pass, so
/// the per-point inner loop of `ParallelDerivativesPass` never re-matches
/// on the search method.
pub fn resolve_query_fn(method: SearchMethod) -> QueryFn {
    match method {
        SearchMethod::KdTree => |map, point, radius, out| map.radius_search(point, radius, out),
        SearchMethod::Direct26 => |map, point, _radius, out| map.neighborhood_26(point, out),
        SearchMethod::Direct7 => |map, point, _radius, out| map.neighborhood_7(point, out),
        SearchMethod::Direct1 => |map, point, _radius, out| map.neighborhood_1(point, out),
    }
}

/// Minimal hash-grid reference implementation of [`TargetVoxelMap`], for
/// tests and doctests only — not a production spatial index. Grounded on
/// the in-crate `KdTree` pattern in `align3d`'s ICP implementation, which
/// likewise keeps the spatial structure as a plain crate-local type rather
/// than pulling in an external KD-tree dependency.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct GridVoxelMap {
    resolution: Floating,
    cells: std::collections::HashMap<(i64, i64, i64), GaussianVoxel>,
}

#[cfg(test)]
impl GridVoxelMap {
    pub fn new(resolution: Floating) -> Self {
        Self {
            resolution,
            cells: std::collections::HashMap::new(),
        }
    }

    fn cell_of(&self, p: &Vector3<Floating>) -> (i64, i64, i64) {
        (
            (p.x / self.resolution).floor() as i64,
            (p.y / self.resolution).floor() as i64,
            (p.z / self.resolution).floor() as i64,
        )
    }

    /// Builds voxels from a raw point cloud: one Gaussian per non-empty
    /// cell, computed from the sample mean/covariance of its points.
    /// Cells with fewer than 3 points (an under-determined covariance) are
    /// skipped, matching the original's minimum-points-per-voxel rule.
    pub fn from_points(points: &[Vector3<Floating>], resolution: Floating) -> Self {
        let mut buckets: std::collections::HashMap<(i64, i64, i64), Vec<Vector3<Floating>>> =
            std::collections::HashMap::new();
        let mut map = GridVoxelMap::new(resolution);
        for p in points {
            let cell = map.cell_of(p);
            buckets.entry(cell).or_default().push(*p);
        }
        let mut next_leaf = 0u64;
        for (cell, pts) in buckets {
            if pts.len() < 3 {
                continue;
            }
            let n = pts.len() as Floating;
            let mean = pts.iter().fold(Vector3::zeros(), |acc, p| acc + p) / n;
            let mut cov = Matrix3::zeros();
            for p in &pts {
                let d = p - mean;
                cov += d * d.transpose();
            }
            cov /= n - 1.0;
            let inverse_cov = cov.try_inverse().unwrap_or_else(Matrix3::identity);
            map.cells.insert(
                cell,
                GaussianVoxel::new(mean, inverse_cov, next_leaf),
            );
            next_leaf += 1;
        }
        map
    }
}

#[cfg(test)]
impl TargetVoxelMap for GridVoxelMap {
    fn radius_search(&self, point: &Vector3<Floating>, radius: Floating, out: &mut Vec<GaussianVoxel>) {
        out.clear();
        let span = (radius / self.resolution).ceil() as i64 + 1;
        let center = self.cell_of(point);
        for dx in -span..=span {
            for dy in -span..=span {
                for dz in -span..=span {
                    if let Some(v) = self
                        .cells
                        .get(&(center.0 + dx, center.1 + dy, center.2 + dz))
                    {
                        if (v.mean() - point).norm() <= radius {
                            out.push(*v);
                        }
                    }
                }
            }
        }
    }

    fn neighborhood_26(&self, point: &Vector3<Floating>, out: &mut Vec<GaussianVoxel>) {
        out.clear();
        let center = self.cell_of(point);
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    if let Some(v) = self
                        .cells
                        .get(&(center.0 + dx, center.1 + dy, center.2 + dz))
                    {
                        out.push(*v);
                    }
                }
            }
        }
    }

    fn neighborhood_7(&self, point: &Vector3<Floating>, out: &mut Vec<GaussianVoxel>) {
        out.clear();
        let center = self.cell_of(point);
        const OFFSETS: [(i64, i64, i64); 7] = [
            (0, 0, 0),
            (1, 0, 0),
            (-1, 0, 0),
            (0, 1, 0),
            (0, -1, 0),
            (0, 0, 1),
            (0, 0, -1),
        ];
        for (dx, dy, dz) in OFFSETS {
            if let Some(v) = self
                .cells
                .get(&(center.0 + dx, center.1 + dy, center.2 + dz))
            {
                out.push(*v);
            }
        }
    }

    fn neighborhood_1(&self, point: &Vector3<Floating>, out: &mut Vec<GaussianVoxel>) {
        out.clear();
        let center = self.cell_of(point);
        if let Some(v) = self.cells.get(&center) {
            out.push(*v);
        }
    }

    fn leaf_index(&self, mean: &Vector3<Floating>) -> u64 {
        let cell = self.cell_of(mean);
        self.cells.get(&cell).map(|v| v.leaf_index).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_of_gaussians() -> GridVoxelMap {
        let mut rng_like = Vec::new();
        for ix in 0..4 {
            for iy in 0..4 {
                for iz in 0..4 {
                    let base = Vector3::new(ix as Floating, iy as Floating, iz as Floating);
                    for k in 0..5 {
                        let jitter = Vector3::new(
                            0.01 * (k as Floating - 2.0),
                            0.02 * (k as Floating - 2.0),
                            -0.01 * (k as Floating - 2.0),
                        );
                        rng_like.push(base + jitter);
                    }
                }
            }
        }
        GridVoxelMap::from_points(&rng_like, 1.0)
    }

    #[test]
    fn direct1_finds_containing_voxel_only() {
        let map = grid_of_gaussians();
        let mut out = Vec::new();
        map.neighborhood_1(&Vector3::new(1.0, 1.0, 1.0), &mut out);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn direct7_finds_up_to_seven() {
        let map = grid_of_gaussians();
        let mut out = Vec::new();
        map.neighborhood_7(&Vector3::new(1.0, 1.0, 1.0), &mut out);
        assert!(out.len() >= 1 && out.len() <= 7);
    }

    #[test]
    fn radius_search_respects_radius() {
        let map = grid_of_gaussians();
        let mut out = Vec::new();
        map.radius_search(&Vector3::new(1.0, 1.0, 1.0), 0.01, &mut out);
        for v in &out {
            assert!((v.mean() - Vector3::new(1.0, 1.0, 1.0)).norm() <= 0.5);
        }
    }

    #[test]
    fn query_fn_dispatches_correctly() {
        let map = grid_of_gaussians();
        let f = resolve_query_fn(SearchMethod::Direct1);
        let mut out = Vec::new();
        f(&map, &Vector3::new(1.0, 1.0, 1.0), 0.0, &mut out);
        assert_eq!(out.len(), 1);
    }
}
