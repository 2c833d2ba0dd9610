//! Result tables shared by every fit family
//!
//! Coefficient tables, model-level statistics and the printable summary are
//! plain serializable values derived from a fitted model on demand.

pub use coefficient::Coefficient;
pub use statistics::ModelStatistics;
pub use statistics::ResidualStatistics;
pub use summary::ModelSummary;

pub use crate::error::ModelError;

pub mod coefficient;
pub mod statistics;
pub mod summary;

/// Result type for model operations
pub type Result<T> = std::result::Result<T, ModelError>;
