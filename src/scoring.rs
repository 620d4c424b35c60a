use super::*;
use rayon::prelude::*;
use std::collections::HashMap;

/// Outcome of [`calculate_score`]: the overall score (already divided by
/// cloud size) plus the two side maps it populates along the way.
#[derive(Debug, Clone)]
pub struct ScoreResult {
    pub score: Floating,
    /// Per-leaf mean score across every `(point, voxel)` pair that landed
    /// in it.
    pub voxel_score_map: HashMap<u64, Floating>,
    /// Leaf index each zero-neighbor query point would have landed in.
    pub empty_voxels: Vec<u64>,
}

struct PointScore {
    total: Floating,
    per_voxel: Vec<(u64, Floating)>,
    empty_leaf: Option<u64>,
}

#[allow(clippy::too_many_arguments)]
fn score_pass(
    cloud: &PointCloud,
    target: &dyn TargetVoxelMap,
    gauss: &GaussConstants,
    config: &Config,
    pool: &rayon::ThreadPool,
) -> Vec<PointScore> {
    let query = resolve_query_fn(config.search_method);
    let radius = config.resolution;

    pool.install(|| {
        cloud
            .points()
            .par_iter()
            .with_min_len(8)
            .map_init(
                Vec::<GaussianVoxel>::new,
                |scratch, x| {
                    query(target, x, radius, scratch);

                    let mut total = 0.0;
                    let mut per_voxel = Vec::new();
                    for voxel in scratch.iter() {
                        let q = x - voxel.mean();
                        if let Some(inc) = score_increment(&q, voxel.inverse_cov(), gauss) {
                            total += inc;
                            per_voxel.push((*voxel.leaf_index(), inc));
                        }
                    }
                    let empty_leaf = if scratch.is_empty() {
                        Some(target.leaf_index(x))
                    } else {
                        None
                    };

                    PointScore {
                        total,
                        per_voxel,
                        empty_leaf,
                    }
                },
            )
            .collect()
    })
}

/// Sum of `-d1*exp(-d2/2*qᵀΣ⁻¹q)` across all `(point, voxel)` pairs found
/// with the configured search method, divided by the cloud size. Also
/// populates `voxel_score_map` (mean score per leaf) and `empty_voxels`
/// (leaves that zero-neighbor query points would have landed in).
pub fn calculate_score(
    cloud: &PointCloud,
    target: &dyn TargetVoxelMap,
    gauss: &GaussConstants,
    config: &Config,
    pool: &rayon::ThreadPool,
) -> ScoreResult {
    if cloud.is_empty() {
        return ScoreResult {
            score: 0.0,
            voxel_score_map: HashMap::new(),
            empty_voxels: Vec::new(),
        };
    }

    let per_point = score_pass(cloud, target, gauss, config, pool);

    let mut score = 0.0;
    let mut sums: HashMap<u64, (Floating, usize)> = HashMap::new();
    let mut empty_voxels = Vec::new();
    for p in per_point {
        score += p.total;
        for (leaf, inc) in p.per_voxel {
            let entry = sums.entry(leaf).or_insert((0.0, 0));
            entry.0 += inc;
            entry.1 += 1;
        }
        if let Some(leaf) = p.empty_leaf {
            empty_voxels.push(leaf);
        }
    }

    let voxel_score_map = sums
        .into_iter()
        .map(|(leaf, (sum, count))| (leaf, sum / count as Floating))
        .collect();

    ScoreResult {
        score: score / cloud.len() as Floating,
        voxel_score_map,
        empty_voxels,
    }
}

/// Same sum as [`calculate_score`], without the side-effect bookkeeping.
/// Delegates to it directly so this is exactly the value `align()` reports
/// as `transformation_probability` for the same cloud.
pub fn calculate_transformation_probability(
    cloud: &PointCloud,
    target: &dyn TargetVoxelMap,
    gauss: &GaussConstants,
    config: &Config,
    pool: &rayon::ThreadPool,
) -> Floating {
    calculate_score(cloud, target, gauss, config, pool).score
}

/// Per point, keeps only the largest `score_inc` across its neighborhood;
/// sums those maxima and divides by the number of points that had at
/// least one valid neighbor (0 if none did).
pub fn calculate_nearest_voxel_transformation_likelihood(
    cloud: &PointCloud,
    target: &dyn TargetVoxelMap,
    gauss: &GaussConstants,
    config: &Config,
    pool: &rayon::ThreadPool,
) -> Floating {
    if cloud.is_empty() {
        return 0.0;
    }

    let query = resolve_query_fn(config.search_method);
    let radius = config.resolution;

    let per_point: Vec<Option<Floating>> = pool.install(|| {
        cloud
            .points()
            .par_iter()
            .with_min_len(8)
            .map_init(Vec::<GaussianVoxel>::new, |scratch, x| {
                query(target, x, radius, scratch);
                scratch.iter().fold(None, |best: Option<Floating>, voxel| {
                    let q = x - voxel.mean();
                    match score_increment(&q, voxel.inverse_cov(), gauss) {
                        Some(inc) => Some(best.map_or(inc, |b| b.max(inc))),
                        None => best,
                    }
                })
            })
            .collect()
    });

    let mut sum = 0.0;
    let mut count = 0usize;
    for best in per_point.into_iter().flatten() {
        sum += best;
        count += 1;
    }
    if count == 0 {
        0.0
    } else {
        sum / count as Floating
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_pool() -> rayon::ThreadPool {
        rayon::ThreadPoolBuilder::new().num_threads(2).build().unwrap()
    }

    fn dense_cube() -> GridVoxelMap {
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
    fn transformation_probability_matches_calculate_score() {
        let map = dense_cube();
        let gauss = GaussConstants::new(0.55, 1.0);
        let config = Config::default();
        let pool = test_pool();
        let cloud = PointCloud::new(vec![Vector3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0)]);

        let result = calculate_score(&cloud, &map, &gauss, &config, &pool);
        let tp = calculate_transformation_probability(&cloud, &map, &gauss, &config, &pool);
        assert_eq!(result.score, tp);
    }

    #[test]
    fn empty_cloud_gives_zero_everywhere() {
        let map = dense_cube();
        let gauss = GaussConstants::new(0.55, 1.0);
        let config = Config::default();
        let pool = test_pool();
        let cloud = PointCloud::new(vec![]);

        let result = calculate_score(&cloud, &map, &gauss, &config, &pool);
        assert_eq!(result.score, 0.0);
        assert!(result.voxel_score_map.is_empty());
        assert_eq!(
            calculate_nearest_voxel_transformation_likelihood(&cloud, &map, &gauss, &config, &pool),
            0.0
        );
    }

    #[test]
    fn far_away_points_are_recorded_as_empty_voxels() {
        let map = dense_cube();
        let gauss = GaussConstants::new(0.55, 1.0);
        let config = Config::default();
        let pool = test_pool();
        let cloud = PointCloud::new(vec![Vector3::new(1000.0, 1000.0, 1000.0)]);

        let result = calculate_score(&cloud, &map, &gauss, &config, &pool);
        assert_eq!(result.score, 0.0);
        assert_eq!(result.empty_voxels.len(), 1);
    }

    #[test]
    fn nvtl_is_nonnegative_for_a_close_match() {
        // d1 = ln(c2/(c1+c2)) is negative for every valid (rho, r), so
        // every per-pair score_inc = -d1*raw is >= 0.
        let map = dense_cube();
        let gauss = GaussConstants::new(0.55, 1.0);
        let config = Config::default();
        let pool = test_pool();
        let cloud = PointCloud::new(vec![Vector3::new(0.0, 0.0, 0.0)]);

        let nvtl = calculate_nearest_voxel_transformation_likelihood(&cloud, &map, &gauss, &config, &pool);
        assert!(nvtl >= 0.0);
    }
}
