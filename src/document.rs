//! Config documents: a format-preserving TOML tree plus its crypto provider.
//!
//! Parsing and serialization go through `toml_edit`, so only the nodes touched
//! by a write are re-rendered. A document written back without changes is
//! byte-identical to its source. After a change, the source's byte-order
//! mark, line endings and final-newline convention are carried over.

use std::fmt;
use std::path::{Path, PathBuf};

use toml_edit::{DocumentMut, Item, Table, Value};

use crate::error::SealfigError;
use crate::file::FileStore;
use crate::keypath::{self, CRYPTO_KEY, KeyPath, LeafKind};
use crate::provider::{InitOptions, ProviderHandle, ProviderRegistry};
use crate::value::{self, EncryptedValue};

const PROVIDER_KEY: &str = "provider";

/// The value found at a keypath.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    /// A plaintext leaf, rendered for display (strings unquoted).
    Plain(String),
    /// A decrypted secret.
    Secret(Vec<u8>),
    /// A mapping; holds the keys directly under it.
    Section(Vec<String>),
}

impl ConfigValue {
    pub fn as_bytes(&self) -> Vec<u8> {
        match self {
            ConfigValue::Plain(s) => s.as_bytes().to_vec(),
            ConfigValue::Secret(bytes) => bytes.clone(),
            ConfigValue::Section(keys) => keys.join("\n").into_bytes(),
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Plain(s) => write!(f, "{s}"),
            ConfigValue::Secret(bytes) => write!(f, "{}", String::from_utf8_lossy(bytes)),
            ConfigValue::Section(keys) => write!(f, "{}", keys.join("\n")),
        }
    }
}

/// On-disk document formats, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Toml,
}

impl Format {
    /// The format implied by `path`'s extension. Files without one are TOML.
    pub fn for_path(path: &Path) -> Result<Self, SealfigError> {
        match path.extension().map(|ext| ext.to_string_lossy()) {
            None => Ok(Format::Toml),
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Ok(Format::Toml),
            Some(ext) => Err(SealfigError::UnsupportedFormat {
                path: path.to_path_buf(),
                extension: ext.into_owned(),
            }),
        }
    }
}

const BOM: &str = "\u{feff}";

/// Byte-level layout that `toml_edit` normalizes away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TextLayout {
    bom: bool,
    crlf: bool,
    final_newline: bool,
}

impl Default for TextLayout {
    fn default() -> Self {
        Self {
            bom: false,
            crlf: false,
            final_newline: true,
        }
    }
}

impl TextLayout {
    /// Detect the layout of `text`. Line endings follow the first line break.
    fn detect(text: &str) -> Self {
        let body = text.strip_prefix(BOM).unwrap_or(text);
        Self {
            bom: body.len() != text.len(),
            crlf: body.find('\n').is_some_and(|i| body[..i].ends_with('\r')),
            final_newline: body.is_empty() || body.ends_with('\n'),
        }
    }

    fn apply(&self, rendered: &str) -> String {
        let mut text = rendered.replace("\r\n", "\n");
        if !self.final_newline && text.ends_with('\n') {
            text.pop();
        }
        if self.crlf {
            text = text.replace('\n', "\r\n");
        }
        if self.bom {
            text.insert_str(0, BOM);
        }
        text
    }
}

/// The source bytes and `toml_edit`'s rendering of them at parse time.
struct Pristine {
    bytes: Vec<u8>,
    rendered: String,
}

pub struct ConfigDocument {
    pub(crate) doc: DocumentMut,
    layout: TextLayout,
    pristine: Option<Pristine>,
    source_path: Option<PathBuf>,
    provider_name: Option<String>,
    pub(crate) provider: Option<ProviderHandle>,
}

impl ConfigDocument {
    /// Parse document bytes. `source_path` is used for error messages and
    /// for resolving paths relative to the document.
    pub fn parse(
        content: &[u8],
        source_path: Option<&Path>,
        registry: &ProviderRegistry,
    ) -> Result<Self, SealfigError> {
        if let Some(path) = source_path {
            Format::for_path(path)?;
        }
        let path = source_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("<memory>"));
        let text = std::str::from_utf8(content).map_err(|e| SealfigError::IoError {
            path: path.clone(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        })?;
        let layout = TextLayout::detect(text);
        let doc: DocumentMut = text
            .strip_prefix(BOM)
            .unwrap_or(text)
            .parse()
            .map_err(|source| SealfigError::ParseError { path, source })?;
        let pristine = Pristine {
            bytes: content.to_vec(),
            rendered: doc.to_string(),
        };

        let mut document = Self {
            doc,
            layout,
            pristine: Some(pristine),
            source_path: source_path.map(Path::to_path_buf),
            provider_name: None,
            provider: None,
        };
        document.refresh_provider(registry);
        Ok(document)
    }

    /// Read and parse the document at `path`.
    pub fn load(
        store: &dyn FileStore,
        path: &Path,
        registry: &ProviderRegistry,
    ) -> Result<Self, SealfigError> {
        Format::for_path(path)?;
        if !store.exists(path) {
            return Err(SealfigError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let content = store.read(path).map_err(|source| SealfigError::IoError {
            path: path.to_path_buf(),
            source,
        })?;
        let document = Self::parse(&content, Some(path), registry)?;
        tracing::debug!(
            path = %path.display(),
            provider = document.provider_name().unwrap_or("<none>"),
            "loaded document"
        );
        Ok(document)
    }

    /// An empty document, for files that do not exist yet.
    pub fn empty(source_path: Option<&Path>) -> Self {
        Self {
            doc: DocumentMut::new(),
            layout: TextLayout::default(),
            pristine: None,
            source_path: source_path.map(Path::to_path_buf),
            provider_name: None,
            provider: None,
        }
    }

    /// Serialize the whole document.
    pub fn to_bytes(&self) -> Vec<u8> {
        let rendered = self.doc.to_string();
        match &self.pristine {
            Some(pristine) if pristine.rendered == rendered => pristine.bytes.clone(),
            _ => self.layout.apply(&rendered).into_bytes(),
        }
    }

    pub fn save(&self, store: &dyn FileStore, path: &Path) -> Result<(), SealfigError> {
        store
            .write(path, &self.to_bytes())
            .map_err(|source| SealfigError::IoError {
                path: path.to_path_buf(),
                source,
            })
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    /// The provider named in `[crypto]`, registered or not.
    pub fn provider_name(&self) -> Option<&str> {
        self.provider_name.as_deref()
    }

    /// Whether the document names a provider that the registry knows.
    pub fn has_crypto(&self) -> bool {
        self.provider.is_some()
    }

    /// Look up `key`, decrypting encrypted leaves with the document's provider.
    pub fn get(&self, key: &str) -> Result<ConfigValue, SealfigError> {
        let path = KeyPath::parse(key)?;
        let item = keypath::resolve(self.doc.as_item(), &path)?;

        if value::is_encrypted(item) {
            let encrypted = EncryptedValue::from_item(item, key)?;
            return self.decrypt(key, &encrypted).map(ConfigValue::Secret);
        }
        if let Some(table) = item.as_table_like() {
            let keys = table.iter().map(|(k, _)| k.to_string()).collect();
            return Ok(ConfigValue::Section(keys));
        }
        Ok(ConfigValue::Plain(value::display_item(item)))
    }

    fn decrypt(&self, key: &str, encrypted: &EncryptedValue) -> Result<Vec<u8>, SealfigError> {
        let handle = self.provider.as_ref().ok_or_else(|| SealfigError::ProviderMismatch {
            key: key.into(),
            expected: self.provider_name.clone().unwrap_or_else(|| "<none>".into()),
            found: encrypted.provider.clone(),
        })?;
        if handle.name() != encrypted.provider {
            return Err(SealfigError::ProviderMismatch {
                key: key.into(),
                expected: handle.name().into(),
                found: encrypted.provider.clone(),
            });
        }
        handle.instance()?.decrypt(&encrypted.ciphertext)
    }

    /// Completion candidates for `partial`. Never mutates the document.
    pub fn possible_sub_keys(&self, partial: &str) -> Result<Vec<String>, SealfigError> {
        keypath::possible_sub_keys(partial, self.doc.as_item())
    }

    /// Every leaf keypath with a display form, in document order.
    pub fn leaf_keypaths(&self) -> Vec<(String, LeafKind)> {
        keypath::leaf_keypaths(self.doc.as_item())
    }

    /// Configure `provider` for this document, writing the `[crypto]` table.
    pub fn init_crypto(
        &mut self,
        provider: &str,
        options: &InitOptions,
        registry: &ProviderRegistry,
    ) -> Result<(), SealfigError> {
        if let Some(existing) = &self.provider_name {
            return Err(SealfigError::CryptoAlreadyConfigured(existing.clone()));
        }
        let entry = registry.lookup(provider)?;

        let crypto = self
            .doc
            .entry(CRYPTO_KEY)
            .or_insert_with(|| Item::Table(Table::new()))
            .as_table_mut()
            .ok_or_else(|| SealfigError::InvalidValue {
                key: CRYPTO_KEY.into(),
                reason: "expected a [crypto] table".into(),
            })?;
        crypto.insert(PROVIDER_KEY, toml_edit::value(entry.name()));
        entry.initialize(options, crypto)?;

        self.refresh_provider(registry);
        Ok(())
    }

    /// Re-read `[crypto]` and resolve the provider against `registry`.
    fn refresh_provider(&mut self, registry: &ProviderRegistry) {
        let metadata = match self.doc.get(CRYPTO_KEY) {
            Some(Item::Table(table)) => table.clone(),
            Some(Item::Value(Value::InlineTable(table))) => table.clone().into_table(),
            _ => Table::new(),
        };
        self.provider_name = metadata
            .get(PROVIDER_KEY)
            .and_then(Item::as_str)
            .filter(|name| !name.is_empty())
            .map(str::to_string);

        self.provider = self.provider_name.as_deref().and_then(|name| {
            let Some(entry) = registry.get(name) else {
                tracing::warn!(provider = name, "document names an unregistered provider");
                return None;
            };
            let base_dir = self
                .source_path
                .as_deref()
                .and_then(Path::parent)
                .map(Path::to_path_buf);
            Some(ProviderHandle::new(registry, entry, metadata.clone(), base_dir))
        });
    }
}

impl fmt::Debug for ConfigDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigDocument")
            .field("source_path", &self.source_path)
            .field("provider_name", &self.provider_name)
            .finish_non_exhaustive()
    }
}
