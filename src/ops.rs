//! Config operations: init, get, set, list, and completion, plus the result
//! type callers use to display them.
//!
//! Every operation is a single document load, an optional in-memory change,
//! and at most one write of the target file (and, for `set`, one best-effort
//! write of its defaults sibling).

use std::fmt;
use std::path::{Path, PathBuf};

use crate::cascade::{self, CascadeOutcome};
use crate::document::{ConfigDocument, ConfigValue, Format};
use crate::error::SealfigError;
use crate::file::FileStore;
use crate::input::{self, SecretReader};
use crate::keypath::{KeyPath, LeafKind};
use crate::provider::{InitOptions, ProviderRegistry};
use crate::types::{FlagCatalog, FlagSpec, SecretSource};

/// Result of a config operation. Returned to the caller for display.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigResult {
    /// A provider was configured for a file.
    Initialized { path: PathBuf, provider: String },
    /// The value found at a keypath.
    Value(ConfigValue),
    /// Confirmation that a value was written.
    ValueSet {
        path: PathBuf,
        key: String,
        encrypted: bool,
        cascade: CascadeOutcome,
    },
    /// Every leaf in a file.
    Listing { entries: Vec<(String, LeafKind)> },
    /// Completion candidates. `prefix` is the already-typed parent keypath.
    Keys {
        prefix: Option<String>,
        keys: Vec<String>,
    },
    /// Provider names.
    Providers(Vec<String>),
    /// Flag completion candidates, with their leading `--`.
    Flags(Vec<String>),
}

impl fmt::Display for ConfigResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigResult::Initialized { path, provider } => {
                write!(f, "Configured provider '{provider}' for {}", path.display())
            }
            ConfigResult::Value(value) => write!(f, "{value}"),
            ConfigResult::ValueSet {
                key,
                encrypted,
                cascade,
                ..
            } => {
                let kind = if *encrypted { "encrypted" } else { "plain text" };
                write!(f, "Value set at {key} ({kind})")?;
                if let CascadeOutcome::PlaceholderAdded { path } = cascade {
                    write!(f, "\nAdded {key} to {}", path.display())?;
                }
                Ok(())
            }
            ConfigResult::Listing { entries } => {
                for (i, (key, leaf)) in entries.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    match leaf {
                        LeafKind::Plain(value) => write!(f, "{key} = {value}")?,
                        LeafKind::Encrypted { provider } => {
                            write!(f, "{key} = <encrypted with {provider}>")?
                        }
                    }
                }
                Ok(())
            }
            ConfigResult::Keys { prefix, keys } => {
                for (i, key) in keys.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    match prefix {
                        Some(prefix) => write!(f, "{prefix}.{key}")?,
                        None => write!(f, "{key}")?,
                    }
                }
                Ok(())
            }
            ConfigResult::Providers(names) => write!(f, "{}", names.join("\n")),
            ConfigResult::Flags(flags) => write!(f, "{}", flags.join("\n")),
        }
    }
}

/// Configure `provider` for the file at `path`, creating the file if needed.
pub fn init_crypto(
    store: &dyn FileStore,
    registry: &ProviderRegistry,
    path: &Path,
    provider: &str,
    options: &InitOptions,
) -> Result<ConfigResult, SealfigError> {
    Format::for_path(path)?;
    let mut doc = if store.exists(path) {
        ConfigDocument::load(store, path, registry)?
    } else {
        ConfigDocument::empty(Some(path))
    };
    doc.init_crypto(provider, options, registry)?;
    doc.save(store, path)?;
    tracing::info!(path = %path.display(), provider, "configured provider");

    Ok(ConfigResult::Initialized {
        path: path.to_path_buf(),
        provider: provider.into(),
    })
}

/// Look up `key`, decrypting it if needed.
pub fn get_value(
    store: &dyn FileStore,
    registry: &ProviderRegistry,
    path: &Path,
    key: &str,
) -> Result<ConfigResult, SealfigError> {
    let doc = ConfigDocument::load(store, path, registry)?;
    doc.get(key).map(ConfigResult::Value)
}

/// Store a value at `key` and cascade the keypath into the defaults sibling.
///
/// The encryption policy is checked before any input is read: without
/// `plain_text`, a file with no usable provider fails with
/// [`SealfigError::NoCryptoConfigured`] and the reader is never asked.
pub fn set_value(
    store: &dyn FileStore,
    registry: &ProviderRegistry,
    reader: &dyn SecretReader,
    path: &Path,
    key: &str,
    source: &SecretSource,
    plain_text: bool,
) -> Result<ConfigResult, SealfigError> {
    let mut doc = ConfigDocument::load(store, path, registry)?;
    KeyPath::parse(key)?;
    if !plain_text && !doc.has_crypto() {
        return Err(SealfigError::NoCryptoConfigured { key: key.into() });
    }

    let secret = input::read_secret(reader, source, key, !plain_text)?;
    if plain_text {
        doc.very_insecurely_set_plaintext(key, &secret)?;
    } else {
        doc.set(key, &secret)?;
    }
    doc.save(store, path)?;
    tracing::info!(path = %path.display(), keypath = key, "value set");

    let cascade = cascade::update_defaults_file(store, registry, path, key);
    Ok(ConfigResult::ValueSet {
        path: path.to_path_buf(),
        key: key.into(),
        encrypted: !plain_text,
        cascade,
    })
}

/// All leaves of the file. Encrypted values are shown by provider only.
pub fn list_values(
    store: &dyn FileStore,
    registry: &ProviderRegistry,
    path: &Path,
) -> Result<ConfigResult, SealfigError> {
    let doc = ConfigDocument::load(store, path, registry)?;
    Ok(ConfigResult::Listing {
        entries: doc.leaf_keypaths(),
    })
}

/// Completion candidates for `partial`, as full keypaths.
pub fn list_keys(
    store: &dyn FileStore,
    registry: &ProviderRegistry,
    path: &Path,
    partial: &str,
) -> Result<ConfigResult, SealfigError> {
    let doc = ConfigDocument::load(store, path, registry)?;
    let keys = doc.possible_sub_keys(partial)?;
    let prefix = partial.rsplit_once('.').map(|(prefix, _)| prefix.to_string());
    Ok(ConfigResult::Keys { prefix, keys })
}

/// Registered provider names starting with `partial`.
pub fn list_providers(registry: &ProviderRegistry, partial: &str) -> ConfigResult {
    ConfigResult::Providers(
        registry
            .names()
            .into_iter()
            .filter(|name| name.starts_with(partial))
            .map(String::from)
            .collect(),
    )
}

/// Flags of `command` (or the global ones) that complete the last of
/// `words`, minus flags already present among the earlier words.
///
/// An unknown command has no candidates.
pub fn list_flags(catalog: &FlagCatalog, command: Option<&str>, words: &[String]) -> ConfigResult {
    let (query, given) = match words.split_last() {
        Some((last, rest)) if last.starts_with('-') => (last.trim_start_matches('-'), rest),
        _ => ("", words),
    };
    let own: &[FlagSpec] = match command {
        Some(name) => match catalog.command(name) {
            Some(flags) => flags,
            None => return ConfigResult::Flags(vec![]),
        },
        None => &[],
    };
    ConfigResult::Flags(
        own.iter()
            .chain(&catalog.global)
            .filter(|flag| flag.long.starts_with(query))
            .filter(|flag| !flag_given(flag, given))
            .map(|flag| format!("--{}", flag.long))
            .collect(),
    )
}

/// Whether `words` already hold `flag`, as `--long`, `--long=value`, or a
/// short cluster such as `-pi`.
fn flag_given(flag: &FlagSpec, words: &[String]) -> bool {
    words.iter().any(|word| {
        if let Some(long) = word.strip_prefix("--") {
            long.split('=').next() == Some(flag.long.as_str())
        } else if let Some(shorts) = word.strip_prefix('-') {
            flag.short.is_some_and(|short| shorts.contains(short))
        } else {
            false
        }
    })
}
