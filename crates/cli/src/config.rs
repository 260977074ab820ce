//! Configuration loading and validation for the CLI.
//!
//! Values come from `ENVELOPE_*` environment variables. The process exits with
//! a clear error message if any required variable is missing or invalid.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;
use x509_envelope::CipherConfig;

/// Validated CLI configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Directory holding recipient certificates and private keys. **Required.**
    pub cert_dir: PathBuf,

    /// Symmetric cipher family.
    #[serde(default = "default_algorithm")]
    pub algorithm: String,

    /// Symmetric key size in bits for `encrypt`. `decrypt` takes it from the envelope.
    #[serde(default = "default_key_size")]
    pub key_size: u32,

    /// Symmetric block size in bits.
    #[serde(default = "default_block_size")]
    pub block_size: u32,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_algorithm() -> String {
    "aes".into()
}
fn default_key_size() -> u32 {
    256
}
fn default_block_size() -> u32 {
    128
}
fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from `ENVELOPE_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_environment(config::Environment::with_prefix("ENVELOPE").try_parsing(true))
    }

    fn from_environment(env: config::Environment) -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(env)
            .build()
            .context("failed to build x509-envelope configuration")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise x509-envelope configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// The symmetric configuration selected by `algorithm`, `key_size` and `block_size`.
    pub fn cipher(&self) -> Result<CipherConfig, x509_envelope::EnvelopeError> {
        CipherConfig::from_parts(&self.algorithm, self.key_size, self.block_size)
    }

    fn validate(&self) -> Result<()> {
        if self.cert_dir.as_os_str().is_empty() {
            anyhow::bail!("ENVELOPE_CERT_DIR is required and must not be empty");
        }
        self.cipher().with_context(|| {
            format!(
                "ENVELOPE_ALGORITHM/KEY_SIZE/BLOCK_SIZE ({} / {} / {}) select no supported cipher",
                self.algorithm, self.key_size, self.block_size
            )
        })?;
        Ok(())
    }
}
