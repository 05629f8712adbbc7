pub mod image_store;
pub mod report_store;

pub use image_store::{ImageStore, StoredImage};
pub use report_store::ReportStore;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("{kind} with ID {id} not found")]
    NotFound { kind: &'static str, id: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Report {id} is corrupt: {source}")]
    Corrupt {
        id: String,
        source: serde_json::Error,
    },
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StorageError {
    pub(crate) fn image_not_found(id: &str) -> Self {
        StorageError::NotFound {
            kind: "Image",
            id: id.to_string(),
        }
    }

    pub(crate) fn report_not_found(id: &str) -> Self {
        StorageError::NotFound {
            kind: "Report",
            id: id.to_string(),
        }
    }
}

/// Identifiers are UUIDs; anything else cannot name a stored file.
pub(crate) fn is_identifier(id: &str) -> bool {
    uuid::Uuid::parse_str(id).is_ok()
}

/// Report files may be placed by hand, so any plain file stem names one.
/// Separators, dot-prefixed names and other punctuation never do.
pub(crate) fn is_report_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
