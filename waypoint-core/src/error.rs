//! Configuration errors for step catalogs

use thiserror::Error;

use crate::domain::catalog::Analyst;

/// Errors raised while building a step catalog
///
/// These are fatal for the job being configured: the caller has to fix the
/// configuration before the job can start.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// The catalog would contain no steps
    #[error("Step catalog is empty")]
    EmptyCatalog,

    /// A step has a blank name
    #[error("Step {index} has an empty name")]
    UnnamedStep { index: usize },

    /// Two steps share a name
    #[error("Duplicate step name: {0}")]
    DuplicateStep(String),

    /// A match pattern has no text and would match every message
    #[error("Step '{step}' has an empty match pattern")]
    EmptyPattern { step: String },

    /// A time estimate is negative or not finite
    #[error("Step '{step}' has an invalid time estimate")]
    InvalidEstimate { step: String },

    /// An analysis was configured without analysts
    #[error("No analysts selected")]
    NoAnalysts,

    /// The same analyst was selected more than once
    #[error("Analyst selected more than once: {0}")]
    DuplicateAnalyst(Analyst),

    /// Research depth outside the supported range
    #[error("Research depth {0} is outside 1..=5")]
    InvalidResearchDepth(u8),

    /// Analyst name that does not match any known analyst
    #[error("Unknown analyst: {0}")]
    UnknownAnalyst(String),

    /// A resumed job was registered with a catalog of a different size
    #[error("Catalog has {actual} steps but the stored job has {expected}")]
    CatalogMismatch { expected: usize, actual: usize },
}
