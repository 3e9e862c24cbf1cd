/// Error types for the annotation engine.
///
/// Validation and not-found failures are local and synchronous: the operation that
/// raised them left its state untouched. Persistence failures come from the
/// repository and never roll back local edits.

#[derive(Debug, thiserror::Error)]
pub enum AnnotateError {
    #[error("invalid rating for {dimension}: {value} (expected 1..=5)")]
    InvalidRating { dimension: String, value: i64 },

    #[error("invalid label span [{start}, {end}) for {text:?}: {reason}")]
    InvalidSpan {
        text: String,
        start: usize,
        end: usize,
        reason: String,
    },

    #[error("index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("selection is empty")]
    EmptySelection,

    #[error("unknown label category: {0}")]
    UnknownCategory(String),

    #[error("malformed persisted annotation for document {document_id}: {reason}")]
    MalformedRecord { document_id: String, reason: String },

    #[error("session is read-only")]
    ReadOnly,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("no authenticated user")]
    Unauthenticated,

    #[error("workspace seed error: {0}")]
    Seed(String),

    #[error("selection {0:?} does not occur in the document")]
    SelectionNotFound(String),

    #[error("no occurrence of {text:?} starts at offset {hint}")]
    SelectionHintMismatch { text: String, hint: usize },

    #[error("document not found: {0}")]
    DocumentNotFound(String),

    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("persistence failure: {0}")]
    Persistence(String),
}

/// Coarse classification used by callers that only care about who is at fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Persistence,
}

impl AnnotateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SelectionNotFound(_)
            | Self::SelectionHintMismatch { .. }
            | Self::DocumentNotFound(_)
            | Self::UserNotFound(_) => ErrorKind::NotFound,
            Self::Persistence(_) => ErrorKind::Persistence,
            _ => ErrorKind::Validation,
        }
    }
}

pub type Result<T> = std::result::Result<T, AnnotateError>;
