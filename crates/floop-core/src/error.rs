//! Typed errors surfaced by the graph store and its backends.

/// Failures the graph store can report. Validation issues are not part of
/// this enum — they are advisory and returned as a batch, never thrown.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("missing id")]
    MissingId,

    #[error("behavior not found")]
    NotFound,

    #[error("duplicate content, existing id: {0}")]
    DuplicateContent(String),

    #[error("edge weight must be in (0, 1]")]
    InvalidEdgeWeight,

    #[error("edge created_at must be non-zero")]
    InvalidEdgeCreatedAt,

    #[error("neither edge endpoint could be resolved to a store")]
    EndpointNotFound,

    #[error("structural integrity failure: {0}")]
    IntegrityFailure(String),

    #[error("migration from version {from} to {to} failed: {cause}")]
    MigrationFailed {
        from: i64,
        to: i64,
        cause: String,
    },

    #[error("io failure at {path}: {cause}")]
    IoFailure { path: String, cause: String },

    #[error("both stores failed: local={local}, global={global}")]
    FederationFailure { local: String, global: String },

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;
