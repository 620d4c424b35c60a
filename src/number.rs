use super::*;

pub type Floating = f64;

/// Below this angle magnitude, `computeAngleDerivatives`'s own `sin`/`cos`
/// are substituted with `0.0`/`1.0` rather than trusted near the pole.
pub const ANGLE_EPSILON: Floating = 1e-4;
