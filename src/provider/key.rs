//! Key provider: AES-256-GCM with a raw 256-bit key supplied out of band.
//!
//! The key is hex-encoded. It is taken from the first available of:
//! `SEALFIG_KEY`, the file named by `[crypto] key_file` (relative to the
//! document), or `SEALFIG_KEY_FILE`.

use std::path::{Path, PathBuf};

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use toml_edit::{Item, Table};

use super::{CryptoProvider, InitOptions, ProviderContext, random_nonce, split_nonce};
use crate::error::SealfigError;

pub(super) const NAME: &str = "key";

/// Size of the AES-256 key in bytes.
pub const KEY_SIZE: usize = 32;

const KEY_FILE_KEY: &str = "key_file";

pub struct KeyProvider {
    cipher: Aes256Gcm,
}

impl KeyProvider {
    pub fn new(key: &[u8; KEY_SIZE]) -> Self {
        Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key)),
        }
    }

    /// Build from a hex string, ignoring surrounding whitespace.
    pub fn from_hex(encoded: &str) -> Result<Self, SealfigError> {
        let bytes = hex::decode(encoded.trim())
            .map_err(|e| SealfigError::provider(NAME, format!("key is not hex: {e}")))?;
        let key: [u8; KEY_SIZE] = bytes.try_into().map_err(|bytes: Vec<u8>| {
            SealfigError::provider(
                NAME,
                format!("key must be {KEY_SIZE} bytes, got {}", bytes.len()),
            )
        })?;
        Ok(Self::new(&key))
    }

    pub(super) fn construct(
        ctx: &ProviderContext<'_>,
    ) -> Result<Box<dyn CryptoProvider>, SealfigError> {
        if let Some(key) = ctx.settings.key.as_deref() {
            return Ok(Box::new(Self::from_hex(key)?));
        }
        let key_file = ctx
            .metadata
            .get(KEY_FILE_KEY)
            .and_then(Item::as_str)
            .map(|file| resolve_relative(ctx.base_dir, Path::new(file)))
            .or_else(|| ctx.settings.key_file.clone())
            .ok_or_else(|| {
                SealfigError::provider(NAME, "no key available, set SEALFIG_KEY or SEALFIG_KEY_FILE")
            })?;
        tracing::debug!(path = %key_file.display(), "reading key file");
        let encoded = std::fs::read_to_string(&key_file).map_err(|e| {
            SealfigError::provider(NAME, format!("cannot read {}: {e}", key_file.display()))
        })?;
        Ok(Box::new(Self::from_hex(&encoded)?))
    }

    pub(super) fn initialize(options: &InitOptions, metadata: &mut Table) -> Result<(), SealfigError> {
        if let Some(path) = &options.key_file {
            metadata.insert(KEY_FILE_KEY, toml_edit::value(path.display().to_string()));
        }
        Ok(())
    }
}

fn resolve_relative(base_dir: Option<&Path>, file: &Path) -> PathBuf {
    match base_dir {
        Some(dir) if file.is_relative() => dir.join(file),
        _ => file.to_path_buf(),
    }
}

impl CryptoProvider for KeyProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, SealfigError> {
        let nonce_bytes = random_nonce(NAME)?;
        let sealed = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
            .map_err(|_| SealfigError::provider(NAME, "encryption failed"))?;

        let mut out = Vec::with_capacity(nonce_bytes.len() + sealed.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&sealed);
        Ok(out)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, SealfigError> {
        let (nonce, sealed) = split_nonce(NAME, ciphertext)?;
        self.cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| SealfigError::provider(NAME, "wrong key or corrupted value"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::ProviderSettings;
    use std::fs;
    use tempfile::TempDir;

    const HEX_KEY: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

    #[test]
    fn round_trip() {
        let provider = KeyProvider::from_hex(HEX_KEY).unwrap();
        let sealed = provider.encrypt(b"token").unwrap();
        assert_eq!(provider.decrypt(&sealed).unwrap(), b"token");
    }

    #[test]
    fn short_key_is_rejected() {
        let err = KeyProvider::from_hex("abcd").err().unwrap();
        assert!(err.to_string().contains("32 bytes"));
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let provider = KeyProvider::from_hex(HEX_KEY).unwrap();
        let mut sealed = provider.encrypt(b"token").unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;
        assert!(provider.decrypt(&sealed).is_err());
    }

    #[test]
    fn key_file_is_relative_to_document() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("app.key"), format!("{HEX_KEY}\n")).unwrap();

        let mut metadata = Table::new();
        let options = InitOptions {
            key_file: Some("app.key".into()),
        };
        KeyProvider::initialize(&options, &mut metadata).unwrap();

        let settings = ProviderSettings::default();
        let ctx = ProviderContext {
            settings: &settings,
            metadata: &metadata,
            base_dir: Some(dir.path()),
        };
        let provider = KeyProvider::construct(&ctx).unwrap();
        let sealed = provider.encrypt(b"v").unwrap();
        assert_eq!(KeyProvider::from_hex(HEX_KEY).unwrap().decrypt(&sealed).unwrap(), b"v");
    }

    #[test]
    fn settings_key_wins_over_key_file() {
        let settings = ProviderSettings {
            key: Some(HEX_KEY.into()),
            key_file: Some("/does/not/exist".into()),
            ..ProviderSettings::default()
        };
        let metadata = Table::new();
        let ctx = ProviderContext {
            settings: &settings,
            metadata: &metadata,
            base_dir: None,
        };
        assert!(KeyProvider::construct(&ctx).is_ok());
    }

    #[test]
    fn missing_key_is_provider_error() {
        let settings = ProviderSettings::default();
        let metadata = Table::new();
        let ctx = ProviderContext {
            settings: &settings,
            metadata: &metadata,
            base_dir: None,
        };
        let err = KeyProvider::construct(&ctx).err().unwrap();
        assert!(matches!(err, SealfigError::ProviderError { .. }));
    }
}
