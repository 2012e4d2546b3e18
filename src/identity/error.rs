use std::fmt;

/// Errors surfaced by identity provider calls and the flows built on them.
///
/// Provider operations return explicit `Result`s; callers branch on the
/// variant instead of probing optional fields.
#[derive(Clone, Debug)]
pub enum IdentityError {
    Config(String),
    Network(String),
    Timeout(String),
    Http { status: u16, message: String },
    Parse(String),
    Validation(String),
    State(String),
}

impl fmt::Display for IdentityError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityError::Config(message) => write!(formatter, "Config error: {message}"),
            IdentityError::Network(message) => write!(formatter, "Network error: {message}"),
            IdentityError::Timeout(message) => write!(formatter, "Timeout: {message}"),
            IdentityError::Http { status, message } => {
                write!(formatter, "Request failed ({status}): {message}")
            }
            IdentityError::Parse(message) => write!(formatter, "Response error: {message}"),
            IdentityError::Validation(message) => {
                write!(formatter, "Validation error: {message}")
            }
            IdentityError::State(message) => write!(formatter, "State error: {message}"),
        }
    }
}

impl std::error::Error for IdentityError {}
