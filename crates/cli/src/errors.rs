//! Error display using miette diagnostics

use miette::Diagnostic;
use symvault_secrets::SecretError;
use thiserror::Error;

/// CLI-specific error types with diagnostics
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    #[error("Configuration error: {message}")]
    #[diagnostic(
        code(symvault::cli::config),
        help("Check the --config file and the VAULT_* environment variables")
    )]
    Config { message: String },

    #[error("Invalid input: {message}")]
    #[diagnostic(
        code(symvault::cli::invalid_input),
        help("Input must be a JSON object mapping field names to values")
    )]
    InvalidInput { message: String },

    #[error("Not a vault:// reference: {value}")]
    #[diagnostic(
        code(symvault::cli::invalid_reference),
        help("References look like vault://<path>#<secret>[@<version>]")
    )]
    InvalidReference { value: String },

    #[error("Secret resolution failed")]
    #[diagnostic(code(symvault::cli::resolution_failed))]
    Resolution {
        #[source]
        source: SecretError,
        #[help]
        help_text: Option<String>,
    },

    #[error("Tracing initialization failed: {message}")]
    #[diagnostic(
        code(symvault::cli::tracing_error),
        help("Check RUST_LOG and the --log-level option")
    )]
    Tracing { message: String },
}

impl CliError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn tracing(message: impl Into<String>) -> Self {
        Self::Tracing {
            message: message.into(),
        }
    }
}

impl From<SecretError> for CliError {
    fn from(source: SecretError) -> Self {
        let help_text = match &source {
            SecretError::ChainTooDeep { .. } => {
                Some("The references may form a cycle; raise --max-depth if the chain is legitimately long".to_string())
            }
            SecretError::Cancelled => {
                Some("Resolution was interrupted or hit --timeout".to_string())
            }
            SecretError::Configuration { .. } => {
                Some("Set VAULT_ADDR and VAULT_TOKEN, or log in with the vault CLI".to_string())
            }
            _ => None,
        };
        Self::Resolution { source, help_text }
    }
}
