//! Password provider: ChaCha20-Poly1305 keyed from a password and a per-file salt.
//!
//! The salt lives in the document's `[crypto]` table as hex; the password
//! comes from the tool settings (`SEALFIG_PASSWORD`). Ciphertext framing is
//! `nonce (12 bytes) || sealed(plaintext) || tag (16 bytes)`.

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use toml_edit::{Item, Table};

use super::{CryptoProvider, InitOptions, ProviderContext, random_nonce, split_nonce};
use crate::error::SealfigError;

pub(super) const NAME: &str = "password";

/// Size of the random salt written by `init`.
pub const SALT_SIZE: usize = 16;

const SALT_KEY: &str = "salt";
const KDF_CONTEXT: &str = "sealfig password provider v1";

pub struct PasswordProvider {
    cipher: ChaCha20Poly1305,
}

impl PasswordProvider {
    /// Derive the content key from `salt || password` with BLAKE3's KDF mode.
    pub fn new(password: &str, salt: &[u8]) -> Self {
        let mut material = Vec::with_capacity(salt.len() + password.len());
        material.extend_from_slice(salt);
        material.extend_from_slice(password.as_bytes());
        let key = blake3::derive_key(KDF_CONTEXT, &material);
        Self {
            cipher: ChaCha20Poly1305::new(Key::from_slice(&key)),
        }
    }

    pub(super) fn construct(
        ctx: &ProviderContext<'_>,
    ) -> Result<Box<dyn CryptoProvider>, SealfigError> {
        let password = ctx
            .settings
            .password
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| {
                SealfigError::provider(NAME, "no password available, set SEALFIG_PASSWORD")
            })?;
        let salt_hex = ctx
            .metadata
            .get(SALT_KEY)
            .and_then(Item::as_str)
            .ok_or_else(|| SealfigError::provider(NAME, "missing `salt` in [crypto]"))?;
        let salt = hex::decode(salt_hex)
            .map_err(|e| SealfigError::provider(NAME, format!("salt is not hex: {e}")))?;
        Ok(Box::new(Self::new(password, &salt)))
    }

    pub(super) fn initialize(_options: &InitOptions, metadata: &mut Table) -> Result<(), SealfigError> {
        let mut salt = [0u8; SALT_SIZE];
        getrandom::getrandom(&mut salt)
            .map_err(|e| SealfigError::provider(NAME, format!("failed to generate salt: {e}")))?;
        metadata.insert(SALT_KEY, toml_edit::value(hex::encode(salt)));
        Ok(())
    }
}

impl CryptoProvider for PasswordProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, SealfigError> {
        let nonce_bytes = random_nonce(NAME)?;
        let nonce = Nonce::from_slice(&nonce_bytes);
        let sealed = self
            .cipher
            .encrypt(nonce, plaintext)
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
            .map_err(|_| SealfigError::provider(NAME, "wrong password or corrupted value"))
    }
}
