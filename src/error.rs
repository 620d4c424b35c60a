use super::*;

#[derive(thiserror::Error, Debug)]
pub enum RegistrationError {
    #[error("no input source cloud set before align()")]
    NoInputSource,
    #[error("no input target voxel map set before align()")]
    NoInputTarget,
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Reserved: the current solver degrades a singular Hessian to a
    /// gradient-descent step rather than failing (see `NewtonDriver`), so
    /// this variant is never constructed today. Kept so a future solver
    /// mode that wants to fail hard has somewhere to report it.
    #[error("Hessian remained singular after fallback")]
    SingularHessianUnrecovered,
}
