//! Writing values into a document.
//!
//! [`ConfigDocument::set`] is the only way to store an encrypted value and it
//! refuses outright when the document has no usable provider. Plaintext goes
//! through [`ConfigDocument::very_insecurely_set_plaintext`], whose name is the
//! warning.

use toml_edit::Item;

use crate::document::ConfigDocument;
use crate::error::SealfigError;
use crate::keypath::{self, KeyPath};
use crate::value::{self, EncryptedValue};

impl ConfigDocument {
    /// Encrypt `plaintext` with the document's provider and store it at `key`,
    /// creating intermediate tables as needed.
    ///
    /// Fails with [`SealfigError::NoCryptoConfigured`] before touching the
    /// provider or the document when no provider is configured.
    pub fn set(&mut self, key: &str, plaintext: &[u8]) -> Result<(), SealfigError> {
        let path = writable_path(key)?;
        let handle = self
            .provider
            .as_ref()
            .ok_or_else(|| SealfigError::NoCryptoConfigured { key: key.into() })?;

        let ciphertext = handle.instance()?.encrypt(plaintext)?;
        let item = EncryptedValue {
            ciphertext,
            provider: handle.name().to_string(),
        }
        .to_item();

        tracing::debug!(keypath = %path, provider = handle.name(), "storing encrypted value");
        self.put(&path, item)
    }

    /// Store `plaintext` as-is at `key`. An empty payload stores `""`, which
    /// is how placeholders are created.
    pub fn very_insecurely_set_plaintext(
        &mut self,
        key: &str,
        plaintext: &[u8],
    ) -> Result<(), SealfigError> {
        let path = writable_path(key)?;
        let item = value::plain_item(plaintext, key)?;
        tracing::debug!(keypath = %path, "storing plaintext value");
        self.put(&path, item)
    }

    /// Store `item` at `path`. An existing table is never overwritten by a leaf.
    fn put(&mut self, path: &KeyPath, item: Item) -> Result<(), SealfigError> {
        let table = keypath::resolve_parent_mut(self.doc.as_item_mut(), path, true)?;
        match table.get_mut(path.leaf()).filter(|existing| !existing.is_none()) {
            Some(existing) if existing.is_table_like() && !value::is_encrypted(existing) => {
                return Err(SealfigError::invalid_key(
                    &path.to_string(),
                    "it holds a table, set its keys individually",
                ));
            }
            Some(existing) => replace_keeping_decor(existing, item),
            None => {
                table.insert(path.leaf(), item);
            }
        }
        Ok(())
    }
}

fn writable_path(key: &str) -> Result<KeyPath, SealfigError> {
    let path = KeyPath::parse(key)?;
    if path.is_reserved() {
        return Err(SealfigError::invalid_key(
            key,
            "the [crypto] table is managed by `init`",
        ));
    }
    Ok(path)
}

/// Swap in `new`, keeping the old value's surrounding whitespace and comment.
fn replace_keeping_decor(existing: &mut Item, mut new: Item) {
    if let (Item::Value(old), Item::Value(fresh)) = (&*existing, &mut new) {
        *fresh.decor_mut() = old.decor().clone();
    }
    *existing = new;
}
