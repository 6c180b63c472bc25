//! The tool's own settings, layered with confique: compiled defaults, then
//! `sealfig.toml` in the platform config directory, then `SEALFIG_*`
//! environment variables.

use std::fmt;
use std::path::PathBuf;

use confique::Config;
use serde::Deserialize;

use crate::error::SealfigError;
use crate::file;

#[derive(Config, Debug, Clone)]
pub struct Settings {
    /// Log filter, in `tracing_subscriber::EnvFilter` syntax.
    #[config(env = "SEALFIG_LOG", default = "warn")]
    pub log: String,

    /// Log line format.
    #[config(env = "SEALFIG_LOG_FORMAT", default = "compact")]
    pub log_format: LogFormat,

    /// Credentials handed to crypto providers.
    #[config(nested)]
    pub providers: ProviderSettings,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Compact,
    Full,
}

#[derive(Config, Clone, Default, PartialEq)]
pub struct ProviderSettings {
    /// Password for the `password` provider.
    #[config(env = "SEALFIG_PASSWORD")]
    pub password: Option<String>,

    /// Hex-encoded 256-bit key for the `key` provider.
    #[config(env = "SEALFIG_KEY")]
    pub key: Option<String>,

    /// File holding the hex key, used when neither `SEALFIG_KEY` nor the
    /// document names one.
    #[config(env = "SEALFIG_KEY_FILE")]
    pub key_file: Option<PathBuf>,
}

impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("ProviderSettings")
            .field("password", &redact(&self.password))
            .field("key", &redact(&self.key))
            .field("key_file", &self.key_file)
            .finish()
    }
}

impl Settings {
    /// Load from the environment and the platform settings file, if any.
    pub fn load() -> Result<Self, SealfigError> {
        let mut builder = Settings::builder().env();
        if let Some(path) = file::settings_path() {
            tracing::debug!(path = %path.display(), "settings file");
            builder = builder.file(path);
        }
        Ok(builder.load()?)
    }
}
