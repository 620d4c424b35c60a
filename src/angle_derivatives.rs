use super::*;
use nalgebra::{SMatrix, Vector3 as V3};

/// The eight first-order and fifteen second-order trigonometric row
/// vectors used to build a point's Jacobian/Hessian with respect to the
/// three rotation parameters, plus `f32` table copies of the same values.
/// Both precisions are derived from one shared `sin`/`cos` computation at
/// construction, so they cannot drift apart — a pure-Rust crate has no
/// SIMD-padding reason to keep two independently maintained copies the way
/// the original's float/double overloads did.
#[derive(Debug, Clone, Copy)]
pub struct AngleDerivativeCache {
    pub j_ang_a: V3<Floating>,
    pub j_ang_b: V3<Floating>,
    pub j_ang_c: V3<Floating>,
    pub j_ang_d: V3<Floating>,
    pub j_ang_e: V3<Floating>,
    pub j_ang_f: V3<Floating>,
    pub j_ang_g: V3<Floating>,
    pub j_ang_h: V3<Floating>,

    pub h_ang_a2: V3<Floating>,
    pub h_ang_a3: V3<Floating>,
    pub h_ang_b2: V3<Floating>,
    pub h_ang_b3: V3<Floating>,
    pub h_ang_c2: V3<Floating>,
    pub h_ang_c3: V3<Floating>,
    pub h_ang_d1: V3<Floating>,
    pub h_ang_d2: V3<Floating>,
    pub h_ang_d3: V3<Floating>,
    pub h_ang_e1: V3<Floating>,
    pub h_ang_e2: V3<Floating>,
    pub h_ang_e3: V3<Floating>,
    pub h_ang_f1: V3<Floating>,
    pub h_ang_f2: V3<Floating>,
    pub h_ang_f3: V3<Floating>,

    /// `f32` packed table, row-major, one row per `j_ang_*` vector,
    /// columns `[x, y, z, 0]` — kept for parity with callers that want the
    /// SIMD-style layout the original exposed.
    pub j_ang_table: SMatrix<f32, 8, 4>,
    pub h_ang_table: Option<SMatrix<f32, 15, 4>>,
}

impl AngleDerivativeCache {
    pub fn new(p: &PoseVector, compute_hessian: bool) -> Self {
        let (rx, ry, rz) = (p[3], p[4], p[5]);

        let (mut sx, mut cx) = rx.sin_cos();
        let (mut sy, mut cy) = ry.sin_cos();
        let (mut sz, mut cz) = rz.sin_cos();

        if rx.abs() < ANGLE_EPSILON {
            sx = 0.0;
            cx = 1.0;
        }
        if ry.abs() < ANGLE_EPSILON {
            sy = 0.0;
            cy = 1.0;
        }
        if rz.abs() < ANGLE_EPSILON {
            sz = 0.0;
            cz = 1.0;
        }

        let j_ang_a = V3::new(-sx * sz + cx * sy * cz, -sx * cz - cx * sy * sz, -cx * cy);
        let j_ang_b = V3::new(cx * sz + sx * sy * cz, cx * cz - sx * sy * sz, -sx * cy);
        let j_ang_c = V3::new(-sy * cz, sy * sz, cy);
        let j_ang_d = V3::new(sx * cy * cz, -sx * cy * sz, sx * sy);
        let j_ang_e = V3::new(-cx * cy * cz, cx * cy * sz, -cx * sy);
        let j_ang_f = V3::new(-cy * sz, -cy * cz, 0.0);
        let j_ang_g = V3::new(cx * cz - sx * sy * sz, -cx * sz - sx * sy * cz, 0.0);
        let j_ang_h = V3::new(sx * cz + cx * sy * sz, cx * sy * cz - sx * sz, 0.0);

        let rows = [
            j_ang_a, j_ang_b, j_ang_c, j_ang_d, j_ang_e, j_ang_f, j_ang_g, j_ang_h,
        ];
        let mut j_ang_table = SMatrix::<f32, 8, 4>::zeros();
        for (i, row) in rows.iter().enumerate() {
            j_ang_table[(i, 0)] = row.x as f32;
            j_ang_table[(i, 1)] = row.y as f32;
            j_ang_table[(i, 2)] = row.z as f32;
            j_ang_table[(i, 3)] = 0.0;
        }

        let (
            h_ang_a2,
            h_ang_a3,
            h_ang_b2,
            h_ang_b3,
            h_ang_c2,
            h_ang_c3,
            h_ang_d1,
            h_ang_d2,
            h_ang_d3,
            h_ang_e1,
            h_ang_e2,
            h_ang_e3,
            h_ang_f1,
            h_ang_f2,
            h_ang_f3,
        );
        let mut h_ang_table = None;

        if compute_hessian {
            h_ang_a2 = V3::new(-cx * sz - sx * sy * cz, -cx * cz + sx * sy * sz, sx * cy);
            h_ang_a3 = V3::new(-sx * sz + cx * sy * cz, -cx * sy * sz - sx * cz, -cx * cy);
            h_ang_b2 = V3::new(cx * cy * cz, -cx * cy * sz, cx * sy);
            h_ang_b3 = V3::new(sx * cy * cz, -sx * cy * sz, sx * sy);
            h_ang_c2 = V3::new(-sx * cz - cx * sy * sz, sx * sz - cx * sy * cz, 0.0);
            h_ang_c3 = V3::new(cx * cz - sx * sy * sz, -sx * sy * cz - cx * sz, 0.0);
            h_ang_d1 = V3::new(-cy * cz, cy * sz, sy);
            h_ang_d2 = V3::new(-sx * sy * cz, sx * sy * sz, sx * cy);
            h_ang_d3 = V3::new(cx * sy * cz, -cx * sy * sz, -cx * cy);
            h_ang_e1 = V3::new(sy * sz, sy * cz, 0.0);
            h_ang_e2 = V3::new(-sx * cy * sz, -sx * cy * cz, 0.0);
            h_ang_e3 = V3::new(cx * cy * sz, cx * cy * cz, 0.0);
            h_ang_f1 = V3::new(-cy * cz, cy * sz, 0.0);
            h_ang_f2 = V3::new(-cx * sz - sx * sy * cz, -cx * cz + sx * sy * sz, 0.0);
            h_ang_f3 = V3::new(-sx * sz + cx * sy * cz, -cx * sy * sz - sx * cz, 0.0);

            let h_rows = [
                h_ang_a2, h_ang_a3, h_ang_b2, h_ang_b3, h_ang_c2, h_ang_c3, h_ang_d1, h_ang_d2,
                h_ang_d3, h_ang_e1, h_ang_e2, h_ang_e3, h_ang_f1, h_ang_f2, h_ang_f3,
            ];
            let mut table = SMatrix::<f32, 15, 4>::zeros();
            for (i, row) in h_rows.iter().enumerate() {
                table[(i, 0)] = row.x as f32;
                table[(i, 1)] = row.y as f32;
                table[(i, 2)] = row.z as f32;
                table[(i, 3)] = 0.0;
            }
            h_ang_table = Some(table);
        } else {
            h_ang_a2 = V3::zeros();
            h_ang_a3 = V3::zeros();
            h_ang_b2 = V3::zeros();
            h_ang_b3 = V3::zeros();
            h_ang_c2 = V3::zeros();
            h_ang_c3 = V3::zeros();
            h_ang_d1 = V3::zeros();
            h_ang_d2 = V3::zeros();
            h_ang_d3 = V3::zeros();
            h_ang_e1 = V3::zeros();
            h_ang_e2 = V3::zeros();
            h_ang_e3 = V3::zeros();
            h_ang_f1 = V3::zeros();
            h_ang_f2 = V3::zeros();
            h_ang_f3 = V3::zeros();
        }

        Self {
            j_ang_a,
            j_ang_b,
            j_ang_c,
            j_ang_d,
            j_ang_e,
            j_ang_f,
            j_ang_g,
            j_ang_h,
            h_ang_a2,
            h_ang_a3,
            h_ang_b2,
            h_ang_b3,
            h_ang_c2,
            h_ang_c3,
            h_ang_d1,
            h_ang_d2,
            h_ang_d3,
            h_ang_e1,
            h_ang_e2,
            h_ang_e3,
            h_ang_f1,
            h_ang_f2,
            h_ang_f3,
            j_ang_table,
            h_ang_table,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn near_zero_angles_substitute_identity_trig() {
        let p = PoseVector::new(0.0, 0.0, 0.0, 1e-6, 1e-6, 1e-6);
        let cache = AngleDerivativeCache::new(&p, true);
        // j_ang_c = (-sy*cz, sy*sz, cy) -> with sy=0, cy=1: (0, 0, 1)
        assert!((cache.j_ang_c - V3::new(0.0, 0.0, 1.0)).norm() < 1e-12);
    }

    #[test]
    fn f32_table_matches_f64_rows() {
        let p = PoseVector::new(0.0, 0.0, 0.0, 0.3, -0.2, 0.5);
        let cache = AngleDerivativeCache::new(&p, true);
        assert!((cache.j_ang_table[(0, 0)] as Floating - cache.j_ang_a.x).abs() < 1e-6);
        let h_table = cache.h_ang_table.unwrap();
        assert!((h_table[(6, 2)] as Floating - cache.h_ang_d1.z).abs() < 1e-6);
    }

    #[test]
    fn skips_hessian_tables_when_not_requested() {
        let p = PoseVector::new(0.0, 0.0, 0.0, 0.3, -0.2, 0.5);
        let cache = AngleDerivativeCache::new(&p, false);
        assert!(cache.h_ang_table.is_none());
    }
}
