use thiserror::Error;

/// Failure reported by a media operation, with whatever the tool printed.
#[derive(Error, Debug, Clone)]
#[error("{operation} failed{}: {diagnostics}", status_suffix(.status))]
pub struct MediaFailure {
    pub operation: String,
    pub status: Option<i32>,
    pub diagnostics: String,
}

fn status_suffix(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!(" (exit status {})", code),
        None => String::new(),
    }
}

impl MediaFailure {
    pub fn new<S1: Into<String>, S2: Into<String>>(operation: S1, diagnostics: S2) -> Self {
        Self {
            operation: operation.into(),
            status: None,
            diagnostics: diagnostics.into(),
        }
    }

    pub fn with_status(mut self, status: Option<i32>) -> Self {
        self.status = status;
        self
    }
}

#[derive(Error, Debug)]
pub enum KiruError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Could not interpret instruction: {0}")]
    Interpretation(String),

    #[error("Invalid instruction: {0}")]
    Validation(String),

    #[error("Unsupported action: {0}")]
    UnsupportedAction(String),

    /// `stage` names where the plan stopped, e.g. "step 2 of 3 (split segment 2)"
    #[error("Media operation failed at {stage}: {source}")]
    MediaOperation {
        stage: String,
        #[source]
        source: MediaFailure,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Plan timed out after {0} seconds")]
    Timeout(u64),
}

impl KiruError {
    /// Stable code for callers that need to branch on the failure class.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::Http(_) => "http",
            Self::Interpretation(_) => "interpretation",
            Self::Validation(_) => "validation",
            Self::UnsupportedAction(_) => "unsupported_action",
            Self::MediaOperation { .. } => "media_operation",
            Self::NotFound(_) => "not_found",
            Self::Config(_) => "config",
            Self::Timeout(_) => "timeout",
        }
    }
}

pub type Result<T> = std::result::Result<T, KiruError>;
