use super::*;

/// A point's Jacobian w.r.t. the 6-DoF pose: the first three columns are
/// the translation identity block, the last three come from the angle
/// cache evaluated at this point. 3x6 double-precision, matching the
/// original's double-precision overload rather than its 4x6 SIMD-padded
/// float one (see [`AngleDerivativeCache`]'s doc comment).
pub type PointJacobian = Matrix3x6<Floating>;

/// The nonzero 3-vector blocks of a point's 6x6 Hessian w.r.t. the pose.
/// Every block involving a translation parameter (index < 3) is the zero
/// vector and is not stored; `block(i, j)` reconstructs the full indexing.
#[derive(Debug, Clone, Copy)]
pub struct PointHessianBlocks {
    pub a: Vector3<Floating>,
    pub b: Vector3<Floating>,
    pub c: Vector3<Floating>,
    pub d: Vector3<Floating>,
    pub e: Vector3<Floating>,
    pub f: Vector3<Floating>,
}

impl PointHessianBlocks {
    /// `∂²T/∂p_i∂p_j` as a 3-vector, for `i,j ∈ 0..6`. Zero whenever
    /// either index addresses a translation parameter.
    pub fn block(&self, i: usize, j: usize) -> Vector3<Floating> {
        match (i, j) {
            (3, 3) => self.a,
            (3, 4) | (4, 3) => self.b,
            (3, 5) | (5, 3) => self.c,
            (4, 4) => self.d,
            (4, 5) | (5, 4) => self.e,
            (5, 5) => self.f,
            _ => Vector3::zeros(),
        }
    }
}

/// Builds the Jacobian (and, if requested, the Hessian blocks) of the
/// transform map at point `x`, given the trig terms already computed for
/// the current pose.
pub fn point_jacobian(x: &Vector3<Floating>, angles: &AngleDerivativeCache) -> PointJacobian {
    let mut j = PointJacobian::zeros();
    j[(0, 0)] = 1.0;
    j[(1, 1)] = 1.0;
    j[(2, 2)] = 1.0;

    j[(1, 3)] = x.dot(&angles.j_ang_a);
    j[(2, 3)] = x.dot(&angles.j_ang_b);
    j[(0, 4)] = x.dot(&angles.j_ang_c);
    j[(1, 4)] = x.dot(&angles.j_ang_d);
    j[(2, 4)] = x.dot(&angles.j_ang_e);
    j[(0, 5)] = x.dot(&angles.j_ang_f);
    j[(1, 5)] = x.dot(&angles.j_ang_g);
    j[(2, 5)] = x.dot(&angles.j_ang_h);
    j
}

pub fn point_hessian_blocks(x: &Vector3<Floating>, angles: &AngleDerivativeCache) -> PointHessianBlocks {
    PointHessianBlocks {
        a: Vector3::new(0.0, x.dot(&angles.h_ang_a2), x.dot(&angles.h_ang_a3)),
        b: Vector3::new(0.0, x.dot(&angles.h_ang_b2), x.dot(&angles.h_ang_b3)),
        c: Vector3::new(0.0, x.dot(&angles.h_ang_c2), x.dot(&angles.h_ang_c3)),
        d: Vector3::new(
            x.dot(&angles.h_ang_d1),
            x.dot(&angles.h_ang_d2),
            x.dot(&angles.h_ang_d3),
        ),
        e: Vector3::new(
            x.dot(&angles.h_ang_e1),
            x.dot(&angles.h_ang_e2),
            x.dot(&angles.h_ang_e3),
        ),
        f: Vector3::new(
            x.dot(&angles.h_ang_f1),
            x.dot(&angles.h_ang_f2),
            x.dot(&angles.h_ang_f3),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translation_columns_are_identity() {
        let p = PoseVector::zeros();
        let angles = AngleDerivativeCache::new(&p, false);
        let j = point_jacobian(&Vector3::new(1.0, 2.0, 3.0), &angles);
        assert_eq!(j.fixed_view::<3, 3>(0, 0), Matrix3::identity());
    }

    #[test]
    fn hessian_block_is_symmetric_in_index_pair() {
        let p = PoseVector::new(0.0, 0.0, 0.0, 0.4, -0.3, 0.2);
        let angles = AngleDerivativeCache::new(&p, true);
        let h = point_hessian_blocks(&Vector3::new(1.0, -1.0, 0.5), &angles);
        assert_eq!(h.block(3, 4), h.block(4, 3));
        assert_eq!(h.block(0, 3), Vector3::zeros());
    }
}
