/// Errors produced while configuring the pipeline or processing a frame.
///
/// Only [`Error::InvalidConfig`] (and the loading errors wrapping it) stops the
/// process from starting. Everything else is scoped to a single frame and ends
/// up as a `NotFound` selection.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No planar model gathered any inlier in the current residual.
    #[error("could not estimate a planar model for the given cloud")]
    PlaneFitFailed,

    #[error("cluster has no points")]
    EmptyCluster,

    /// A cluster referenced a point that is not part of the cloud it was
    /// handed together with, i.e. the cluster belongs to another frame.
    #[error("point index {index} out of range for cloud of {len} points")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("input cloud has no points")]
    EmptyInput,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn config<S: Into<String>>(msg: S) -> Self {
        Error::InvalidConfig(msg.into())
    }
}
