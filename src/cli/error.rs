//! CLI-level errors (wraps application errors)

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::DomainError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Application(#[from] ApplicationError),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("{0}")]
    Usage(String),
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl From<DomainError> for CliError {
    fn from(e: DomainError) -> Self {
        CliError::Application(ApplicationError::Domain(e))
    }
}

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidArgs(_) | CliError::Usage(_) => crate::exitcode::USAGE,
            CliError::Application(e) => match e {
                ApplicationError::Io { .. } => crate::exitcode::NOINPUT,
                ApplicationError::Config { .. } => crate::exitcode::CONFIG,
                ApplicationError::Declaration { .. } => crate::exitcode::DATAERR,
                ApplicationError::Domain(DomainError::Configuration(_)) => {
                    crate::exitcode::DATAERR
                }
                ApplicationError::Domain(DomainError::AttributeNotFound { .. }) => {
                    crate::exitcode::USAGE
                }
                ApplicationError::Domain(_) => crate::exitcode::SOFTWARE,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ConfigurationError;

    #[test]
    fn given_configuration_error_when_exit_code_then_dataerr() {
        let err = CliError::from(ApplicationError::from(ConfigurationError::CyclicParent {
            model: "Model".into(),
            field: "sub".into(),
        }));
        assert_eq!(err.exit_code(), crate::exitcode::DATAERR);
    }

    #[test]
    fn given_unknown_field_when_exit_code_then_usage() {
        let err = CliError::from(DomainError::AttributeNotFound {
            model: "Model".into(),
            attribute: "nope".into(),
        });
        assert_eq!(err.exit_code(), crate::exitcode::USAGE);
    }
}
