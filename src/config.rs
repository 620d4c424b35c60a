use super::*;

/// Strategy used to gather the target voxels near a transformed source
/// point. `Direct7` is the original's default: cheaper than a true radius
/// search, at the cost of missing some neighbors `KdTree` would find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMethod {
    KdTree,
    Direct26,
    Direct7,
    Direct1,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub trans_epsilon: Floating,
    pub step_size: Floating,
    pub resolution: Floating,
    pub max_iterations: usize,
    pub search_method: SearchMethod,
    pub num_threads: usize,
    pub regularization_scale_factor: Floating,
    pub use_line_search: bool,
    pub outlier_ratio: Floating,
    pub regularization_pose: Option<Isometry3<Floating>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            trans_epsilon: 0.1,
            step_size: 0.1,
            resolution: 1.0,
            max_iterations: 35,
            search_method: SearchMethod::Direct7,
            num_threads: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            regularization_scale_factor: 0.0,
            use_line_search: false,
            outlier_ratio: 0.55,
            regularization_pose: None,
        }
    }
}

impl Config {
    pub fn with_trans_epsilon(mut self, v: Floating) -> Self {
        self.trans_epsilon = v;
        self
    }
    pub fn with_step_size(mut self, v: Floating) -> Self {
        self.step_size = v;
        self
    }
    pub fn with_resolution(mut self, v: Floating) -> Self {
        self.resolution = v;
        self
    }
    pub fn with_max_iterations(mut self, v: usize) -> Self {
        self.max_iterations = v;
        self
    }
    pub fn with_search_method(mut self, v: SearchMethod) -> Self {
        self.search_method = v;
        self
    }
    pub fn with_num_threads(mut self, v: usize) -> Self {
        self.num_threads = v;
        self
    }
    pub fn with_regularization_scale_factor(mut self, v: Floating) -> Self {
        self.regularization_scale_factor = v;
        self
    }
    pub fn with_use_line_search(mut self, v: bool) -> Self {
        self.use_line_search = v;
        self
    }
    pub fn with_outlier_ratio(mut self, v: Floating) -> Self {
        self.outlier_ratio = v;
        self
    }
    pub fn with_regularization_pose(mut self, v: Isometry3<Floating>) -> Self {
        self.regularization_pose = Some(v);
        self
    }

    pub fn validate(&self) -> Result<(), RegistrationError> {
        if self.trans_epsilon <= 0.0 {
            return Err(RegistrationError::InvalidConfig(
                "trans_epsilon must be > 0".into(),
            ));
        }
        if self.step_size <= 0.0 {
            return Err(RegistrationError::InvalidConfig(
                "step_size must be > 0".into(),
            ));
        }
        if self.resolution <= 0.0 {
            return Err(RegistrationError::InvalidConfig(
                "resolution must be > 0".into(),
            ));
        }
        if self.max_iterations == 0 {
            return Err(RegistrationError::InvalidConfig(
                "max_iterations must be > 0".into(),
            ));
        }
        if !(self.outlier_ratio > 0.0 && self.outlier_ratio < 1.0) {
            return Err(RegistrationError::InvalidConfig(
                "outlier_ratio must lie in (0, 1)".into(),
            ));
        }
        if self.regularization_scale_factor < 0.0 {
            return Err(RegistrationError::InvalidConfig(
                "regularization_scale_factor must be >= 0".into(),
            ));
        }
        if self.num_threads == 0 {
            return Err(RegistrationError::InvalidConfig(
                "num_threads must be > 0".into(),
            ));
        }
        Ok(())
    }
}
