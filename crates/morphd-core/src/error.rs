//! Common error types used throughout morphd.
//!
//! The taxonomy distinguishes failures by when they surface: validation at
//! submission time, not-found/invalid-state at query time, and engine or
//! document failures during asynchronous execution (which are recorded on
//! the job, never thrown to the submitter).

/// Common error type for morphd.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request is malformed: unsupported input/output format or a
    /// missing required field. Surfaced at submission time; no job is
    /// created.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The requested job was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The operation is not allowed in the job's current state, e.g.
    /// cancelling a completed job or downloading an incomplete one.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// An external conversion engine failed: spawn failure, non-zero exit,
    /// timeout, or missing expected output artifact.
    #[error("Engine failure: {tool}: {message}")]
    Engine { tool: String, message: String },

    /// A malformed document or out-of-range page operation.
    #[error("Document error: {0}")]
    Document(String),

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new Validation error.
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a new NotFound error.
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a new InvalidState error.
    pub fn invalid_state<S: Into<String>>(msg: S) -> Self {
        Self::InvalidState(msg.into())
    }

    /// Create a new Engine error.
    pub fn engine<T: Into<String>, M: Into<String>>(tool: T, message: M) -> Self {
        Self::Engine {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create a new Document error.
    pub fn document<S: Into<String>>(msg: S) -> Self {
        Self::Document(msg.into())
    }

    /// Create a new Internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
