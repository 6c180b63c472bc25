//! Defaults cascade: keep a sibling `default`/`defaults` file aware of every
//! key set in an environment file.
//!
//! After a successful write to `config/app.toml`, the first existing file of
//! `config/default.toml` and `config/defaults.toml` gains the same keypath
//! with an empty plaintext placeholder, unless it already has a value there.
//! The sibling's own provider is irrelevant since only placeholders are written.
//!
//! This step is best-effort. [`update_defaults_file`] reports what happened
//! as a [`CascadeOutcome`] and never returns an error, so a broken defaults
//! file can't undo or mask the primary write.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::document::ConfigDocument;
use crate::error::SealfigError;
use crate::file::FileStore;
use crate::provider::ProviderRegistry;

/// Sibling base names, in lookup order.
pub const DEFAULTS_BASE_NAMES: [&str; 2] = ["default", "defaults"];

/// What the cascade did.
#[derive(Debug, Clone, PartialEq)]
pub enum CascadeOutcome {
    /// The target is itself a defaults file.
    Skipped,
    /// No sibling defaults file exists.
    NoSibling,
    /// The sibling already has the keypath; it was left untouched.
    AlreadyPresent { path: PathBuf },
    /// The keypath was added to the sibling as an empty placeholder.
    PlaceholderAdded { path: PathBuf },
    /// The sibling could not be read, checked, or written.
    Failed { path: PathBuf, reason: String },
}

impl fmt::Display for CascadeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CascadeOutcome::Skipped => write!(f, "target is a defaults file"),
            CascadeOutcome::NoSibling => write!(f, "no defaults file found"),
            CascadeOutcome::AlreadyPresent { path } => {
                write!(f, "already present in {}", path.display())
            }
            CascadeOutcome::PlaceholderAdded { path } => {
                write!(f, "added placeholder to {}", path.display())
            }
            CascadeOutcome::Failed { path, reason } => {
                write!(f, "could not update {}: {reason}", path.display())
            }
        }
    }
}

/// Whether `target`'s file name starts with `default`.
pub fn is_defaults_file(target: &Path) -> bool {
    target
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with("default"))
}

/// Candidate sibling paths for `target`, in lookup order, sharing its
/// directory and extension (and so its format).
pub fn sibling_candidates(target: &Path) -> Vec<PathBuf> {
    let dir = target.parent().unwrap_or_else(|| Path::new(""));
    DEFAULTS_BASE_NAMES
        .iter()
        .map(|base| {
            let mut name = OsString::from(base);
            if let Some(ext) = target.extension() {
                name.push(".");
                name.push(ext);
            }
            dir.join(name)
        })
        .collect()
}

/// Make sure `keypath` exists in `target`'s defaults sibling.
pub fn update_defaults_file(
    store: &dyn FileStore,
    registry: &ProviderRegistry,
    target: &Path,
    keypath: &str,
) -> CascadeOutcome {
    if is_defaults_file(target) {
        tracing::debug!(target = %target.display(), "target is a defaults file, skipping cascade");
        return CascadeOutcome::Skipped;
    }

    let Some(sibling) = sibling_candidates(target)
        .into_iter()
        .find(|candidate| store.exists(candidate))
    else {
        tracing::debug!(target = %target.display(), "no defaults file next to target");
        return CascadeOutcome::NoSibling;
    };
    tracing::debug!(path = %sibling.display(), "found defaults file");

    match add_placeholder(store, registry, &sibling, keypath) {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::debug!(path = %sibling.display(), error = %e, "defaults file not updated");
            CascadeOutcome::Failed {
                path: sibling,
                reason: e.to_string(),
            }
        }
    }
}

fn add_placeholder(
    store: &dyn FileStore,
    registry: &ProviderRegistry,
    sibling: &Path,
    keypath: &str,
) -> Result<CascadeOutcome, SealfigError> {
    let mut defaults = ConfigDocument::load(store, sibling, registry)?;
    match defaults.get(keypath) {
        Ok(_) => Ok(CascadeOutcome::AlreadyPresent {
            path: sibling.to_path_buf(),
        }),
        Err(e) if e.is_not_found() => {
            defaults.very_insecurely_set_plaintext(keypath, &[])?;
            defaults.save(store, sibling)?;
            tracing::info!(path = %sibling.display(), keypath, "updated defaults file");
            Ok(CascadeOutcome::PlaceholderAdded {
                path: sibling.to_path_buf(),
            })
        }
        Err(e) => Err(e),
    }
}
