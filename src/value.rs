//! Leaf encodings: plaintext strings and encrypted inline tables.
//!
//! An encrypted leaf is stored as
//! `{ encrypted = true, provider = "<name>", ciphertext = "<base64>" }`
//! and always replaced wholesale.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use toml_edit::{InlineTable, Item, Value};

use crate::error::SealfigError;

const ENCRYPTED: &str = "encrypted";
const PROVIDER: &str = "provider";
const CIPHERTEXT: &str = "ciphertext";

/// A leaf holding provider ciphertext.
#[derive(Debug, Clone, PartialEq)]
pub struct EncryptedValue {
    pub ciphertext: Vec<u8>,
    pub provider: String,
}

impl EncryptedValue {
    /// Decode an encrypted leaf. `key` is only used for error messages.
    pub fn from_item(item: &Item, key: &str) -> Result<Self, SealfigError> {
        let invalid = |reason: &str| SealfigError::InvalidValue {
            key: key.into(),
            reason: reason.into(),
        };
        let (Some(provider), Some(encoded)) = (
            provider_of(item),
            item.get(CIPHERTEXT).and_then(Item::as_str),
        ) else {
            return Err(invalid("not an encrypted value"));
        };
        let ciphertext = STANDARD
            .decode(encoded)
            .map_err(|e| invalid(&format!("ciphertext is not base64: {e}")))?;
        Ok(Self {
            ciphertext,
            provider,
        })
    }

    pub fn to_item(&self) -> Item {
        let mut table = InlineTable::new();
        table.insert(ENCRYPTED, Value::from(true));
        table.insert(PROVIDER, Value::from(self.provider.as_str()));
        table.insert(CIPHERTEXT, Value::from(STANDARD.encode(&self.ciphertext)));
        Item::Value(Value::InlineTable(table))
    }
}

/// Whether `item` has the exact shape of an encrypted leaf: `encrypted = true`
/// plus string `provider` and `ciphertext`, and nothing else. A config table
/// that merely carries an `encrypted` flag stays an ordinary mapping.
pub fn is_encrypted(item: &Item) -> bool {
    let Some(table) = item.as_table_like() else {
        return false;
    };
    table.iter().count() == 3
        && table.get(ENCRYPTED).and_then(Item::as_bool) == Some(true)
        && table.get(PROVIDER).and_then(Item::as_str).is_some()
        && table.get(CIPHERTEXT).and_then(Item::as_str).is_some()
}

/// The provider recorded on an encrypted leaf.
pub fn provider_of(item: &Item) -> Option<String> {
    if !is_encrypted(item) {
        return None;
    }
    item.get(PROVIDER)
        .and_then(Item::as_str)
        .map(str::to_string)
}

/// Build a plaintext leaf. An empty payload becomes `""`.
pub fn plain_item(payload: &[u8], key: &str) -> Result<Item, SealfigError> {
    let text = std::str::from_utf8(payload).map_err(|e| SealfigError::InvalidValue {
        key: key.into(),
        reason: format!("plaintext values must be UTF-8: {e}"),
    })?;
    Ok(toml_edit::value(text))
}

/// Render a leaf for display: strings unquoted, everything else as TOML.
pub fn display_item(item: &Item) -> String {
    match item {
        Item::Value(Value::String(s)) => s.value().clone(),
        Item::Value(v) => {
            let mut v = v.clone();
            v.decor_mut().clear();
            v.to_string()
        }
        Item::Table(t) => t.to_string().trim_end().to_string(),
        Item::ArrayOfTables(_) => "<array of tables>".to_string(),
        Item::None => String::new(),
    }
}
