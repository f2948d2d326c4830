//! Core error types.

use thiserror::Error;

/// Boxed error raised by a query engine.
pub type EngineError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Which auxiliary count query failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountKind {
    /// Root entities before filtering.
    Total,
    /// Distinct root entities after filtering.
    Filtered,
}

impl std::fmt::Display for CountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CountKind::Total => write!(f, "total"),
            CountKind::Filtered => write!(f, "filtered"),
        }
    }
}

/// Core errors.
#[derive(Debug, Error)]
pub enum Error {
    /// The root entity type is unknown to the metadata provider.
    #[error("unknown entity '{0}'")]
    UnknownEntity(String),

    /// A non-terminal path segment does not name an association.
    #[error("unknown association '{segment}' on entity '{entity}' in column path '{path}'")]
    UnknownAssociation {
        entity: String,
        path: String,
        segment: String,
    },

    /// The terminal path segment does not name a scalar field.
    #[error("unknown field '{field}' on entity '{entity}' in column path '{path}'")]
    UnknownField {
        entity: String,
        path: String,
        field: String,
    },

    /// No requested column resolved to a model field.
    #[error("no column of the request on '{entity}' binds to a model field")]
    EmptyProjection { entity: String },

    /// The engine failed to run the page query.
    #[error("query execution failed: {0}")]
    ExecutionFailed(#[source] EngineError),

    /// The engine failed to run a count query.
    #[error("{kind} count query failed: {source}")]
    CountQueryFailed {
        kind: CountKind,
        #[source]
        source: EngineError,
    },

    /// Storage layer error.
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    /// Protocol error.
    #[error("protocol error: {0}")]
    Protocol(#[from] gridquery_proto::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Invalid data format.
    #[error("invalid data: {0}")]
    InvalidData(String),
}

impl Error {
    /// Whether the error stems from a column path or root type that does not
    /// match the schema.
    pub fn is_schema_mismatch(&self) -> bool {
        matches!(
            self,
            Error::UnknownEntity(_) | Error::UnknownAssociation { .. } | Error::UnknownField { .. }
        )
    }

    /// HTTP-style status code for surfacing the error to a client.
    pub fn status_code(&self) -> u16 {
        if self.is_schema_mismatch() {
            404
        } else {
            500
        }
    }

    /// The column path the error refers to, if any.
    pub fn column_path(&self) -> Option<&str> {
        match self {
            Error::UnknownAssociation { path, .. } | Error::UnknownField { path, .. } => Some(path),
            _ => None,
        }
    }
}
