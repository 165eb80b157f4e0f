use thiserror::Error;

/// Patterns (lowercase) that indicate sensitive data not safe for terminal display.
/// Used by `contains_sensitive()` for case-insensitive matching.
pub(crate) const SENSITIVE_PATTERNS: &[&str] = &[
    "authorization:",
    "api_key=",
    "apikey=",
    "bearer ",
];

/// Returns true if the message contains any sensitive pattern (case-insensitive).
fn contains_sensitive(msg: &str) -> bool {
    let lower = msg.to_ascii_lowercase();
    SENSITIVE_PATTERNS.iter().any(|p| lower.contains(p))
}

/// Sanitizes a message for display.
/// If sensitive content is detected, returns the fallback instead.
fn sanitize_message(msg: &str, fallback: &str) -> String {
    if contains_sensitive(msg) {
        fallback.into()
    } else {
        msg.to_string()
    }
}

/// User-facing error presentation printed by the CLI when a run aborts.
#[derive(Debug, Clone)]
pub struct ErrorPresentation {
    pub title: String,
    pub message: String,
    pub action: Option<String>,
}

/// Crate-wide error type. Every variant ends the run in the `Aborted` state.
#[derive(Debug, Error)]
pub enum AppError {
    // ── Configuration ─────────────────────────────────────────────────────────
    #[error("Configuration error: {0}")]
    Configuration(String),

    // ── Input ─────────────────────────────────────────────────────────────────
    #[error("Input file not found: {0}")]
    InputNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // ── Snap API ──────────────────────────────────────────────────────────────
    #[error("Snap API returned HTTP {status}: {message}")]
    Transport { status: u16, message: String },

    #[error("Unexpected snap response: {0}")]
    ResponseShape(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),

    // ── Output ────────────────────────────────────────────────────────────────
    #[error("Failed to write output: {0}")]
    OutputFailed(String),
}

impl AppError {
    /// Converts the error into a presentation suitable for terminal output.
    /// Never leaks the API key or request headers.
    pub fn to_presentation(&self) -> ErrorPresentation {
        match self {
            AppError::Configuration(msg) => ErrorPresentation {
                title: "Configuration Error".into(),
                message: sanitize_message(msg, "The configuration is invalid."),
                action: Some("Fix the configuration file or flags and run again".into()),
            },

            AppError::InputNotFound(path) => ErrorPresentation {
                title: "Input Not Found".into(),
                message: format!("The file '{}' was not found.", path),
                action: Some("Check the input path".into()),
            },

            AppError::InvalidInput(msg) => ErrorPresentation {
                title: "Invalid Input".into(),
                message: format!("The input file cannot be snapped: {}", msg),
                action: Some("Fix the CSV file and try again".into()),
            },

            AppError::Transport { status, message } => ErrorPresentation {
                title: "Snap Request Failed".into(),
                message: format!(
                    "The snap API rejected the request (HTTP {}). API error details: {}",
                    status,
                    sanitize_message(message, "No specific error message provided.")
                ),
                action: Some(match status {
                    401 | 403 => "Check that the API key is valid and not expired".into(),
                    429 => "Wait and retry, or lower the batch size".into(),
                    _ => "Check the endpoint and retry".into(),
                }),
            },

            AppError::ResponseShape(msg) => ErrorPresentation {
                title: "Unexpected Response".into(),
                message: format!("The snap API returned unexpected data: {}", msg),
                action: Some("Retry, or lower the batch size".into()),
            },

            AppError::Unexpected(msg) => ErrorPresentation {
                title: "Unexpected Error".into(),
                message: sanitize_message(msg, "Something went wrong while calling the snap API."),
                action: Some("Check network and retry".into()),
            },

            AppError::OutputFailed(msg) => ErrorPresentation {
                title: "Write Failed".into(),
                message: sanitize_message(msg, "The output file could not be written."),
                action: Some("Check that the output directory is writable".into()),
            },
        }
    }
}
