use super::*;

/// `(tx, ty, tz, rx, ry, rz)`. The rotation is `Rx(rx)·Ry(ry)·Rz(rz)`,
/// applied about the origin before the translation.
pub type PoseVector = Vector6<Floating>;

/// Composes the absolute transform `T(p) = Translation(p0,p1,p2) ·
/// Rx(p3) · Ry(p4) · Rz(p5)`. Evaluated fresh from `p` every time — the
/// solver never chains incremental transforms onto a running composition.
pub fn pose_to_transform(p: &PoseVector) -> Matrix4<Floating> {
    use nalgebra::{Translation3, UnitQuaternion, Vector3 as V3};
    let translation = Translation3::new(p[0], p[1], p[2]);
    let rotation = UnitQuaternion::from_axis_angle(&V3::x_axis(), p[3])
        * UnitQuaternion::from_axis_angle(&V3::y_axis(), p[4])
        * UnitQuaternion::from_axis_angle(&V3::z_axis(), p[5]);
    Isometry3::from_parts(translation, rotation).to_homogeneous()
}

/// Inverse of [`pose_to_transform`]: recovers `(tx,ty,tz,rx,ry,rz)` from a
/// rigid transform, decomposing the rotation block with the same
/// intrinsic X-then-Y-then-Z (proper Tait-Bryan) convention used to build
/// it, so the two functions round-trip. Implemented by hand rather than
/// via `Rotation3::euler_angles` to avoid depending on nalgebra's own
/// Euler convention, which composes in the opposite order.
pub fn transform_to_pose(t: &Matrix4<Floating>) -> PoseVector {
    let r = t.fixed_view::<3, 3>(0, 0);
    let translation = t.fixed_view::<3, 1>(0, 3);

    // R = Rx(a)*Ry(b)*Rz(c):
    //   R[0][2] = sin(b)
    //   R[1][2] = -sin(a)*cos(b), R[2][2] = cos(a)*cos(b)
    //   R[0][1] = -cos(b)*sin(c), R[0][0] = cos(b)*cos(c)
    let ry = r[(0, 2)].clamp(-1.0, 1.0).asin();
    let rx = (-r[(1, 2)]).atan2(r[(2, 2)]);
    let rz = (-r[(0, 1)]).atan2(r[(0, 0)]);

    Vector6::new(translation[0], translation[1], translation[2], rx, ry, rz)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_transform() {
        let p = Vector6::new(1.0, -2.0, 0.5, 0.3, -0.2, 0.7);
        let t = pose_to_transform(&p);
        let p2 = transform_to_pose(&t);
        assert!((p - p2).norm() < 1e-9);
    }

    #[test]
    fn identity_pose_is_identity_transform() {
        let p = Vector6::zeros();
        let t = pose_to_transform(&p);
        assert!((t - Matrix4::identity()).norm() < 1e-12);
    }
}
