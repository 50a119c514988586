//! ---
//! drill_section: "03-persistence-replay"
//! drill_subsection: "module"
//! drill_type: "source"
//! drill_scope: "code"
//! drill_description: "Run record model and artifact storage."
//! drill_version: "v0.0.0-prealpha"
//! drill_owner: "tbd"
//! ---
#![warn(missing_docs)]

/// Result alias used throughout the persistence crate.
pub type Result<T> = std::result::Result<T, PersistenceError>;

/// Error type for the persistence subsystem.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// Wrapper for IO errors encountered while reading/writing run artifacts.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Wrapper for JSON serialization issues.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    /// Every collision suffix for a run identity is already taken.
    #[error("no free artifact name left for run {0}")]
    IdentityExhausted(String),
}

pub mod record;
pub mod store;

pub use record::{slugify_note, RunId, RunRecord, StepDetail, StepEntry, StepStatus};
pub use store::RunStore;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_error_display() {
        let err = PersistenceError::IdentityExhausted("20260101T000000.000Z_x".into());
        assert_eq!(
            format!("{err}"),
            "no free artifact name left for run 20260101T000000.000Z_x"
        );
    }
}
