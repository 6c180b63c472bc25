use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SealfigError {
    #[error("Invalid keypath '{key}': {reason}")]
    InvalidKeyPath { key: String, reason: String },

    #[error("Could not find a value at '{0}'")]
    KeyNotFound(String),

    #[error("Failed to parse {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml_edit::TomlError,
    },

    #[error("Unsupported config format '.{extension}' for {path}, only TOML (.toml) files are supported")]
    UnsupportedFormat { path: PathBuf, extension: String },

    #[error("Config file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Failed to access {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(
        "Unable to store an encrypted value for '{key}', no crypto provider is configured for this file"
    )]
    NoCryptoConfigured { key: String },

    #[error("Unknown provider '{name}' (available: {})", available.join(", "))]
    UnknownProvider {
        name: String,
        available: Vec<String>,
    },

    #[error("Provider '{provider}' failed: {reason}")]
    ProviderError { provider: String, reason: String },

    #[error("Value at '{key}' was encrypted with '{found}' but this file uses '{expected}'")]
    ProviderMismatch {
        key: String,
        expected: String,
        found: String,
    },

    #[error("A crypto provider is already configured: '{0}'")]
    CryptoAlreadyConfigured(String),

    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("{0}")]
    Input(String),

    #[error("Settings error: {0}")]
    Settings(#[from] confique::Error),
}

impl SealfigError {
    /// Whether this error only signals that the keypath has no value.
    ///
    /// The defaults cascade relies on this to tell absence apart from every
    /// other failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SealfigError::KeyNotFound(_))
    }

    /// Whether the caller supplied bad input, as opposed to the tool failing.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            SealfigError::NoCryptoConfigured { .. } | SealfigError::Input(_)
        )
    }

    pub(crate) fn provider(provider: &str, reason: impl ToString) -> Self {
        SealfigError::ProviderError {
            provider: provider.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn invalid_key(key: &str, reason: impl ToString) -> Self {
        SealfigError::InvalidKeyPath {
            key: key.into(),
            reason: reason.to_string(),
        }
    }
}
