use thiserror::Error;

// ---------------------------------------------------------------------------
// BackendError
// ---------------------------------------------------------------------------

/// Closed error-kind enumeration returned by every [`TargetBackend`]
/// operation.
///
/// The orchestrator branches on these variants, never on message text, so a
/// backend implementation must classify its failures into exactly one of
/// them before returning.
///
/// [`TargetBackend`]: crate::backend::TargetBackend
#[derive(Debug, Error)]
pub enum BackendError {
    /// The target process is (still) alive and blocks the operation.
    #[error("target application is still running")]
    ProcessBusy,

    /// The OS refused to act on the target process (elevation needed).
    #[error("operation blocked by OS permission policy")]
    PermissionDenied,

    /// The entry script could not be located automatically.
    #[error("entry script not found")]
    EntryNotFound,

    /// A user-supplied entry script path failed validation.
    #[error("invalid entry script path: {0}")]
    InvalidPath(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Anything the backend could not classify more precisely.
    #[error("{0}")]
    Other(String),
}

impl BackendError {
    /// Stable machine-readable kind tag. Presentation layers and the usage
    /// snapshot key off this, not off `Display` text.
    pub fn kind(&self) -> &'static str {
        match self {
            BackendError::ProcessBusy => "process-busy",
            BackendError::PermissionDenied => "permission-denied",
            BackendError::EntryNotFound => "entry-not-found",
            BackendError::InvalidPath(_) => "invalid-path",
            BackendError::Io(_) => "io",
            BackendError::Other(_) => "other",
        }
    }
}

// ---------------------------------------------------------------------------
// CoreError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("home directory not found: set HOME environment variable")]
    HomeNotFound,

    #[error("invalid email address: {0}")]
    InvalidEmail(String),

    #[error("unknown history kind: {0}")]
    InvalidHistoryKind(String),

    /// `quick_change` failed *and* the compensating identity restore failed
    /// too — the store may be inconsistent with the target application.
    #[error("account switch failed ({switch}); identity restore also failed ({restore})")]
    CompensationFailed { switch: String, restore: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
