//! Normal Distributions Transform (NDT) point-cloud registration.
//!
//! Aligns a source point cloud to a target point cloud represented as a
//! voxelized Gaussian Mixture Model, by Newton's method over a 6-DoF pose
//! with an analytic Jacobian/Hessian and a More-Thuente line search.

use nalgebra::{Isometry3, Matrix3, Matrix3x6, Matrix4, Matrix6, Vector3, Vector6};

use tracing::{debug, info, trace, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

pub mod tracer;
pub use tracer::*;

pub mod number;
pub use number::*;

pub mod error;
pub use error::*;

pub mod config;
pub use config::*;

pub mod pose;
pub use pose::*;

pub mod pointcloud;
pub use pointcloud::*;

pub mod gauss;
pub use gauss::*;

pub mod voxel;
pub use voxel::*;

pub mod angle_derivatives;
pub use angle_derivatives::*;

pub mod point_derivative;
pub use point_derivative::*;

pub mod derivative_accumulator;
pub use derivative_accumulator::*;

pub mod regularizer;
pub use regularizer::*;

pub mod parallel_pass;
pub use parallel_pass::*;

pub mod line_search;
pub use line_search::*;

pub mod newton;
pub use newton::*;

pub mod scoring;
pub use scoring::*;

pub mod solver;
pub use solver::*;
