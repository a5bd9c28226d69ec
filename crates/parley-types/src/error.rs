use thiserror::Error;

use std::fmt;

use crate::chat::ChatId;

/// The three backends a chat lives in, most authoritative first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKind {
    Graph,
    Durable,
    Volatile,
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreKind::Graph => write!(f, "graph"),
            StoreKind::Durable => write!(f, "durable"),
            StoreKind::Volatile => write!(f, "volatile"),
        }
    }
}

/// Errors reported by store adapters.
///
/// Adapters wrap backend-native errors into these kinds with the operation
/// and key attached. They never retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{store} store unreachable during {operation}: {message}")]
    Connectivity {
        store: StoreKind,
        operation: &'static str,
        message: String,
    },

    #[error("{store} store has no record for '{key}'")]
    NotFound { store: StoreKind, key: String },

    #[error("{store} store rejected {operation}: {message}")]
    Write {
        store: StoreKind,
        operation: &'static str,
        message: String,
    },

    #[error("invalid input: {0}")]
    Validation(String),
}

impl StoreError {
    pub fn connectivity(
        store: StoreKind,
        operation: &'static str,
        message: impl fmt::Display,
    ) -> Self {
        StoreError::Connectivity {
            store,
            operation,
            message: message.to_string(),
        }
    }

    pub fn not_found(store: StoreKind, key: impl fmt::Display) -> Self {
        StoreError::NotFound {
            store,
            key: key.to_string(),
        }
    }

    pub fn write(store: StoreKind, operation: &'static str, message: impl fmt::Display) -> Self {
        StoreError::Write {
            store,
            operation,
            message: message.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Errors from multi-store coordinator operations.
///
/// Completed steps of a multi-store sequence are never rolled back; the
/// variants name the step that failed so the caller can see the partial state.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The graph identity was minted but a later create step failed.
    #[error("chat '{chat_id}' exists in the graph store but the {stage} create failed: {source}")]
    PartialCreate {
        chat_id: ChatId,
        stage: StoreKind,
        source: StoreError,
    },

    /// Deletion stopped at `stage`; later stores were not touched.
    #[error("delete stopped at the {stage} store: {source}")]
    Delete { stage: StoreKind, source: StoreError },
}

impl CoordinatorError {
    /// The underlying store failure, whatever step produced it.
    pub fn store_error(&self) -> &StoreError {
        match self {
            CoordinatorError::Store(e) => e,
            CoordinatorError::PartialCreate { source, .. } => source,
            CoordinatorError::Delete { source, .. } => source,
        }
    }
}
