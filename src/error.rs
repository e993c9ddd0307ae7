//! Error types for the crate.  Everything fallible happens during setup, before any worker thread
//! is started, so a single enum covers it.
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LineError {
    /// Proximity order must be 1 or 2.
    #[error("Configuration error: order should be either 1 or 2, got {0}")]
    InvalidOrder(usize),

    /// Any other invalid option.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The vertex index refused to grow past its ceiling.
    #[error("Configuration error: vertex capacity of {limit} exceeded")]
    CapacityExceeded { limit: usize },

    #[error("Configuration error: edge {edge} has invalid weight {weight}")]
    InvalidWeight { edge: usize, weight: f64 },

    #[error("Configuration error: graph has no edges")]
    EmptyGraph,

    /// Allocation failure for a table, matrix or the worker pool.
    #[error("Resource error: {0}")]
    Resource(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{line}: Malformed edge file! {message}")]
    Parse { line: usize, message: String },
}

impl LineError {
    pub fn is_configuration(&self) -> bool {
        matches!(self,
            LineError::InvalidOrder(_)
            | LineError::Config(_)
            | LineError::CapacityExceeded { .. }
            | LineError::InvalidWeight { .. }
            | LineError::EmptyGraph)
    }

    pub fn is_resource(&self) -> bool {
        matches!(self, LineError::Resource(_))
    }

    pub(crate) fn alloc(what: &str, len: usize) -> Self {
        LineError::Resource(format!("memory allocation failed for {} ({} entries)", what, len))
    }
}

pub type Result<T> = std::result::Result<T, LineError>;
