//! Crypto providers: the encrypt/decrypt capability and the registry that
//! names them.
//!
//! A document selects its provider with `[crypto] provider = "<name>"`. The
//! registry is built once at startup, never changes afterwards, and is passed
//! by reference to everything that loads documents. Built-in providers form a
//! closed set ([`ProviderKind`]); tests and embedders can register more
//! through [`RegistryBuilder`] before the registry is frozen.
//!
//! Provider instances are constructed lazily on the first encrypt or decrypt,
//! so documents holding only plaintext never need credentials.

mod key;
mod password;

use std::cell::OnceCell;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use toml_edit::Table;

use crate::error::SealfigError;
use crate::settings::ProviderSettings;

pub use key::KeyProvider;
pub use password::PasswordProvider;

/// Size of the random nonce prepended to every ciphertext.
pub const NONCE_SIZE: usize = 12;

/// Encrypts and decrypts opaque payloads.
///
/// Failures are reported as [`SealfigError::ProviderError`] and never retried.
pub trait CryptoProvider {
    fn name(&self) -> &str;
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, SealfigError>;
    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, SealfigError>;
}

/// Everything a provider may need to build itself.
pub struct ProviderContext<'a> {
    pub settings: &'a ProviderSettings,
    /// The document's `[crypto]` table.
    pub metadata: &'a Table,
    /// Directory of the document, for resolving relative paths in metadata.
    pub base_dir: Option<&'a Path>,
}

/// Options passed to a provider when a document is first set up for it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InitOptions {
    pub key_file: Option<PathBuf>,
}

pub type Constructor = fn(&ProviderContext<'_>) -> Result<Box<dyn CryptoProvider>, SealfigError>;
pub type Initializer = fn(&InitOptions, &mut Table) -> Result<(), SealfigError>;

/// The built-in providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Password,
    Key,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 2] = [ProviderKind::Password, ProviderKind::Key];

    pub fn name(self) -> &'static str {
        match self {
            ProviderKind::Password => password::NAME,
            ProviderKind::Key => key::NAME,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ProviderKind::Password => "ChaCha20-Poly1305 with a key derived from a password",
            ProviderKind::Key => "AES-256-GCM with a raw 256-bit key",
        }
    }

    fn entry(self) -> ProviderEntry {
        let (construct, initialize): (Constructor, Initializer) = match self {
            ProviderKind::Password => (PasswordProvider::construct, PasswordProvider::initialize),
            ProviderKind::Key => (KeyProvider::construct, KeyProvider::initialize),
        };
        ProviderEntry {
            name: self.name().to_string(),
            description: self.description().to_string(),
            construct,
            initialize,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProviderKind {
    type Err = SealfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProviderKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| SealfigError::UnknownProvider {
                name: s.into(),
                available: ProviderKind::ALL.iter().map(|k| k.name().into()).collect(),
            })
    }
}

/// A named provider: how to build it and how to initialize a document for it.
#[derive(Clone)]
pub struct ProviderEntry {
    name: String,
    description: String,
    construct: Constructor,
    initialize: Initializer,
}

impl ProviderEntry {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn construct(&self, ctx: &ProviderContext<'_>) -> Result<Box<dyn CryptoProvider>, SealfigError> {
        (self.construct)(ctx)
    }

    pub fn initialize(&self, options: &InitOptions, metadata: &mut Table) -> Result<(), SealfigError> {
        (self.initialize)(options, metadata)
    }
}

impl fmt::Debug for ProviderEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderEntry").field("name", &self.name).finish()
    }
}

/// Immutable name → provider lookup.
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    entries: Vec<ProviderEntry>,
    settings: ProviderSettings,
}

impl ProviderRegistry {
    /// A registry holding every [`ProviderKind`].
    pub fn builtin(settings: ProviderSettings) -> Self {
        Self::builder(settings).with_builtins().build()
    }

    pub fn builder(settings: ProviderSettings) -> RegistryBuilder {
        RegistryBuilder {
            entries: Vec::new(),
            settings,
        }
    }

    /// Provider names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(ProviderEntry::name).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&ProviderEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    pub fn settings(&self) -> &ProviderSettings {
        &self.settings
    }

    pub(crate) fn lookup(&self, name: &str) -> Result<&ProviderEntry, SealfigError> {
        self.get(name).ok_or_else(|| SealfigError::UnknownProvider {
            name: name.into(),
            available: self.names().into_iter().map(String::from).collect(),
        })
    }
}

pub struct RegistryBuilder {
    entries: Vec<ProviderEntry>,
    settings: ProviderSettings,
}

impl RegistryBuilder {
    pub fn with_builtins(mut self) -> Self {
        for kind in ProviderKind::ALL {
            self = self.push(kind.entry());
        }
        self
    }

    /// Register a provider. A later registration under the same name wins.
    pub fn register(
        self,
        name: &str,
        description: &str,
        construct: Constructor,
        initialize: Initializer,
    ) -> Self {
        self.push(ProviderEntry {
            name: name.into(),
            description: description.into(),
            construct,
            initialize,
        })
    }

    fn push(mut self, entry: ProviderEntry) -> Self {
        self.entries.retain(|existing| existing.name != entry.name);
        self.entries.push(entry);
        self
    }

    pub fn build(self) -> ProviderRegistry {
        ProviderRegistry {
            entries: self.entries,
            settings: self.settings,
        }
    }
}

/// A document's resolved provider, built on first use.
pub(crate) struct ProviderHandle {
    entry: ProviderEntry,
    settings: ProviderSettings,
    metadata: Table,
    base_dir: Option<PathBuf>,
    instance: OnceCell<Box<dyn CryptoProvider>>,
}

impl ProviderHandle {
    pub(crate) fn new(
        registry: &ProviderRegistry,
        entry: &ProviderEntry,
        metadata: Table,
        base_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            entry: entry.clone(),
            settings: registry.settings().clone(),
            metadata,
            base_dir,
            instance: OnceCell::new(),
        }
    }

    pub(crate) fn name(&self) -> &str {
        self.entry.name()
    }

    pub(crate) fn instance(&self) -> Result<&dyn CryptoProvider, SealfigError> {
        if let Some(provider) = self.instance.get() {
            return Ok(provider.as_ref());
        }
        let ctx = ProviderContext {
            settings: &self.settings,
            metadata: &self.metadata,
            base_dir: self.base_dir.as_deref(),
        };
        let provider = self.entry.construct(&ctx)?;
        tracing::debug!(provider = %self.entry.name, "provider ready");
        Ok(self.instance.get_or_init(|| provider).as_ref())
    }
}

/// Fresh random nonce for one AEAD operation.
fn random_nonce(provider: &str) -> Result<[u8; NONCE_SIZE], SealfigError> {
    let mut nonce = [0u8; NONCE_SIZE];
    getrandom::getrandom(&mut nonce)
        .map_err(|e| SealfigError::provider(provider, format!("failed to generate nonce: {e}")))?;
    Ok(nonce)
}

/// Split `nonce || sealed` framing.
fn split_nonce<'a>(provider: &str, data: &'a [u8]) -> Result<(&'a [u8], &'a [u8]), SealfigError> {
    if data.len() < NONCE_SIZE {
        return Err(SealfigError::provider(provider, "ciphertext too short for nonce"));
    }
    Ok(data.split_at(NONCE_SIZE))
}
