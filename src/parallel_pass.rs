use super::*;
use rayon::prelude::*;

/// Output of one parallel sweep over the source cloud: the summed score,
/// gradient, and (optionally) Hessian, plus the bookkeeping
/// `ScoringQueries`/`Regularizer` need.
#[derive(Debug, Clone)]
pub struct DerivativesResult {
    pub score: Floating,
    pub gradient: Vector6<Floating>,
    pub hessian: Matrix6<Floating>,
    /// Total number of (point, voxel) pairs visited across the whole
    /// pass — the regularizer's neighborhood-count weight.
    pub neighborhood_count: usize,
    /// Sum of each point's largest `score_inc` across its own neighborhood,
    /// divided by the number of points that had at least one valid
    /// neighbor (`0.0` if none did).
    pub nearest_voxel_likelihood: Floating,
}

impl DerivativesResult {
    fn zero() -> Self {
        Self {
            score: 0.0,
            gradient: Vector6::zeros(),
            hessian: Matrix6::zeros(),
            neighborhood_count: 0,
            nearest_voxel_likelihood: 0.0,
        }
    }
}

struct PointResult {
    score: Floating,
    grad: Vector6<Floating>,
    hess: Matrix6<Floating>,
    neighbor_count: usize,
    nearest_max: Option<Floating>,
}

/// Runs one deterministic parallel sweep: per source point, queries the
/// target for neighbor voxels and accumulates the Gauss term of every
/// `(point, voxel)` pair, then folds every point's result sequentially in
/// source-index order so the total is bit-identical regardless of how
/// many threads computed it.
pub fn compute_derivatives(
    pose: &PoseVector,
    source: &PointCloud,
    transformed: &PointCloud,
    target: &dyn TargetVoxelMap,
    gauss: &GaussConstants,
    config: &Config,
    compute_hessian: bool,
    pool: &rayon::ThreadPool,
) -> DerivativesResult {
    debug_assert_eq!(source.len(), transformed.len());
    if source.is_empty() {
        return DerivativesResult::zero();
    }

    let angles = AngleDerivativeCache::new(pose, compute_hessian);
    let query = resolve_query_fn(config.search_method);
    let radius = config.resolution;

    let per_point: Vec<PointResult> = pool.install(|| {
        source
            .points()
            .par_iter()
            .zip(transformed.points().par_iter())
            .with_min_len(8)
            .map_init(
                Vec::<GaussianVoxel>::new,
                |scratch, (x, x_trans)| {
                    query(target, x_trans, radius, scratch);

                    let mut score = 0.0;
                    let mut grad = Vector6::zeros();
                    let mut hess = Matrix6::zeros();
                    let mut nearest_max: Option<Floating> = None;

                    let jacobian = point_jacobian(x, &angles);
                    let hessian_terms = if compute_hessian {
                        point_hessian_blocks(x, &angles)
                    } else {
                        PointHessianBlocks {
                            a: Vector3::zeros(),
                            b: Vector3::zeros(),
                            c: Vector3::zeros(),
                            d: Vector3::zeros(),
                            e: Vector3::zeros(),
                            f: Vector3::zeros(),
                        }
                    };

                    for voxel in scratch.iter() {
                        let q = x_trans - voxel.mean();
                        if let Some(score_inc) = accumulate(
                            &q,
                            voxel.inverse_cov(),
                            &jacobian,
                            &hessian_terms,
                            gauss,
                            compute_hessian,
                            &mut grad,
                            &mut hess,
                        ) {
                            score += score_inc;
                            nearest_max = Some(nearest_max.map_or(score_inc, |m| m.max(score_inc)));
                        }
                    }

                    PointResult {
                        score,
                        grad,
                        hess,
                        neighbor_count: scratch.len(),
                        nearest_max,
                    }
                },
            )
            .collect()
    });

    let mut result = DerivativesResult::zero();
    let mut nearest_sum = 0.0;
    let mut nearest_count = 0usize;
    for p in per_point {
        result.score += p.score;
        result.gradient += p.grad;
        result.hessian += p.hess;
        result.neighborhood_count += p.neighbor_count;
        if let Some(m) = p.nearest_max {
            nearest_sum += m;
            nearest_count += 1;
        }
    }
    result.nearest_voxel_likelihood = if nearest_count == 0 {
        0.0
    } else {
        nearest_sum / nearest_count as Floating
    };
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_pool(threads: usize) -> rayon::ThreadPool {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .unwrap()
    }

    fn target_map() -> GridVoxelMap {
        let mut pts = Vec::new();
        for ix in -2..3 {
            for iy in -2..3 {
                for iz in -2..3 {
                    let base = Vector3::new(ix as Floating, iy as Floating, iz as Floating);
                    for k in 0..5 {
                        pts.push(base + Vector3::new(0.01 * k as Floating, 0.0, -0.01 * k as Floating));
                    }
                }
            }
        }
        GridVoxelMap::from_points(&pts, 1.0)
    }

    #[test]
    fn empty_source_gives_zero_result() {
        let pool = test_pool(2);
        let map = target_map();
        let gauss = GaussConstants::new(0.55, 1.0);
        let config = Config::default();
        let source = PointCloud::new(vec![]);
        let result = compute_derivatives(
            &PoseVector::zeros(),
            &source,
            &source,
            &map,
            &gauss,
            &config,
            true,
            &pool,
        );
        assert_eq!(result.score, 0.0);
        assert_eq!(result.neighborhood_count, 0);
    }

    #[test]
    fn result_is_deterministic_across_thread_counts() {
        let map = target_map();
        let gauss = GaussConstants::new(0.55, 1.0);
        let config = Config::default();
        let mut points = Vec::new();
        for i in 0..200 {
            let t = i as Floating * 0.01;
            points.push(Vector3::new(t.sin(), t.cos(), 0.3 * t));
        }
        let source = PointCloud::new(points);
        let pose = PoseVector::new(0.1, -0.05, 0.02, 0.01, -0.02, 0.03);
        let transformed = source.transformed(&pose_to_transform(&pose));

        let one = {
            let pool = test_pool(1);
            compute_derivatives(&pose, &source, &transformed, &map, &gauss, &config, true, &pool)
        };
        let many = {
            let pool = test_pool(8);
            compute_derivatives(&pose, &source, &transformed, &map, &gauss, &config, true, &pool)
        };

        assert_eq!(one.score, many.score);
        assert_eq!(one.gradient, many.gradient);
        assert_eq!(one.hessian, many.hessian);
        assert_eq!(one.neighborhood_count, many.neighborhood_count);
        assert_eq!(one.nearest_voxel_likelihood, many.nearest_voxel_likelihood);
    }

    #[test]
    fn nearest_voxel_likelihood_is_nonnegative_for_a_close_match() {
        let pool = test_pool(2);
        let map = target_map();
        let gauss = GaussConstants::new(0.55, 1.0);
        let config = Config::default();
        let source = PointCloud::new(vec![Vector3::new(0.0, 0.0, 0.0)]);
        let result = compute_derivatives(
            &PoseVector::zeros(),
            &source,
            &source,
            &map,
            &gauss,
            &config,
            true,
            &pool,
        );
        assert!(result.nearest_voxel_likelihood >= 0.0);
    }
}
