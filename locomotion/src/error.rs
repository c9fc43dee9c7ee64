use std::fmt;
use std::io;

/// Setup-time failures. Per-frame work never produces these: a frame without
/// a valid destination, surface or curve is a normal outcome, not an error.
#[derive(Debug)]
pub enum LocomotionError {
    /// Reading a config or scenario file failed
    Io { path: String, source: io::Error },

    /// A config or scenario file was not valid JSON for its type
    Parse {
        context: String,
        source: serde_json::Error,
    },

    /// A value was readable but unusable
    Validation { item: String, reason: String },
}

impl fmt::Display for LocomotionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocomotionError::Io { path, source } => {
                write!(f, "I/O error reading '{}': {}", path, source)
            }
            LocomotionError::Parse { context, source } => {
                write!(f, "Failed to parse {}: {}", context, source)
            }
            LocomotionError::Validation { item, reason } => {
                write!(f, "Validation failed for '{}': {}", item, reason)
            }
        }
    }
}

impl std::error::Error for LocomotionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LocomotionError::Io { source, .. } => Some(source),
            LocomotionError::Parse { source, .. } => Some(source),
            LocomotionError::Validation { .. } => None,
        }
    }
}

impl LocomotionError {
    pub fn validation(item: &str, reason: impl Into<String>) -> Self {
        LocomotionError::Validation {
            item: item.to_string(),
            reason: reason.into(),
        }
    }

    pub fn from_io_error(path: &str, error: io::Error) -> Self {
        LocomotionError::Io {
            path: path.to_string(),
            source: error,
        }
    }

    pub fn from_parse_error(context: &str, error: serde_json::Error) -> Self {
        LocomotionError::Parse {
            context: context.to_string(),
            source: error,
        }
    }
}

pub type LocomotionResult<T> = Result<T, LocomotionError>;
