//! Keypath parsing and navigation inside a `toml_edit` tree.
//!
//! A keypath is a dot-separated list of non-empty segments (`database.password`).
//! Navigation treats encrypted leaves as opaque: they are inline tables on disk,
//! but no keypath ever descends into one.
//!
//! Read paths never touch the tree. Write paths create missing intermediate
//! mappings on request, appending them after the parent's existing keys.

use std::fmt;
use std::str::FromStr;

use toml_edit::{InlineTable, Item, Table, TableLike, Value};

use crate::error::SealfigError;
use crate::value;

/// Top-level key reserved for document metadata (`[crypto]`).
pub const CRYPTO_KEY: &str = "crypto";

/// A parsed, validated keypath.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPath {
    segments: Vec<String>,
}

impl KeyPath {
    /// Split `raw` on `.`. Every segment must be non-empty.
    pub fn parse(raw: &str) -> Result<Self, SealfigError> {
        if raw.is_empty() {
            return Err(SealfigError::invalid_key(raw, "keypath is empty"));
        }
        let segments: Vec<String> = raw.split('.').map(str::to_string).collect();
        if let Some(pos) = segments.iter().position(String::is_empty) {
            return Err(SealfigError::invalid_key(
                raw,
                format!("segment {} is empty", pos + 1),
            ));
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// All segments but the last.
    pub fn parent(&self) -> &[String] {
        &self.segments[..self.segments.len() - 1]
    }

    pub fn leaf(&self) -> &str {
        &self.segments[self.segments.len() - 1]
    }

    /// Whether the keypath points into the `[crypto]` metadata table.
    pub fn is_reserved(&self) -> bool {
        self.segments[0] == CRYPTO_KEY
    }

    fn prefix(&self, depth: usize) -> String {
        self.segments[..=depth].join(".")
    }
}

impl FromStr for KeyPath {
    type Err = SealfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KeyPath::parse(s)
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

/// Resolve `path` for reading. Fails with `KeyNotFound` on any missing or
/// non-mapping step.
pub fn resolve<'a>(root: &'a Item, path: &KeyPath) -> Result<&'a Item, SealfigError> {
    let not_found = || SealfigError::KeyNotFound(path.to_string());
    let mut current = root;
    for segment in path.segments() {
        if value::is_encrypted(current) {
            return Err(not_found());
        }
        current = current
            .as_table_like()
            .and_then(|table| table.get(segment))
            .filter(|item| !item.is_none())
            .ok_or_else(not_found)?;
    }
    Ok(current)
}

/// Resolve the mapping that holds `path`'s leaf, for writing.
///
/// With `create_missing`, absent intermediate mappings are created; a step
/// that exists but is not a mapping is an `InvalidKeyPath`. Without it, both
/// cases are `KeyNotFound`.
pub fn resolve_parent_mut<'a>(
    root: &'a mut Item,
    path: &KeyPath,
    create_missing: bool,
) -> Result<&'a mut dyn TableLike, SealfigError> {
    let mut current = root;
    for (depth, segment) in path.parent().iter().enumerate() {
        let inline = current.is_inline_table();
        let table = as_mapping_mut(current, path, depth, create_missing)?;
        if table.get(segment).is_none() {
            if !create_missing {
                return Err(SealfigError::KeyNotFound(path.to_string()));
            }
            tracing::debug!(keypath = %path, segment = %segment, "creating intermediate table");
            table.insert(segment, empty_mapping(inline));
        }
        current = table
            .get_mut(segment)
            .ok_or_else(|| SealfigError::KeyNotFound(path.to_string()))?;
    }
    as_mapping_mut(current, path, path.parent().len(), create_missing)
}

fn as_mapping_mut<'a>(
    item: &'a mut Item,
    path: &KeyPath,
    depth: usize,
    create_missing: bool,
) -> Result<&'a mut dyn TableLike, SealfigError> {
    let conflict = || {
        if create_missing {
            // depth == 0 is the document root, which is always a table
            let holder = path.prefix(depth.saturating_sub(1));
            SealfigError::invalid_key(
                &path.to_string(),
                format!("'{holder}' holds a value, not a table"),
            )
        } else {
            SealfigError::KeyNotFound(path.to_string())
        }
    };
    if value::is_encrypted(item) {
        return Err(conflict());
    }
    item.as_table_like_mut().ok_or_else(conflict)
}

fn empty_mapping(inline: bool) -> Item {
    if inline {
        Item::Value(Value::InlineTable(InlineTable::new()))
    } else {
        let mut table = Table::new();
        table.set_implicit(true);
        Item::Table(table)
    }
}

/// What a flattened leaf holds, for listings.
#[derive(Debug, Clone, PartialEq)]
pub enum LeafKind {
    Plain(String),
    Encrypted { provider: String },
}

/// Flatten the tree into `(keypath, leaf)` pairs in document order.
///
/// The `[crypto]` metadata table is skipped.
pub fn leaf_keypaths(root: &Item) -> Vec<(String, LeafKind)> {
    let mut out = Vec::new();
    collect_leaves(root, "", &mut out);
    out
}

fn collect_leaves(item: &Item, prefix: &str, out: &mut Vec<(String, LeafKind)>) {
    let Some(table) = item.as_table_like() else {
        return;
    };
    for (key, child) in table.iter() {
        if prefix.is_empty() && key == CRYPTO_KEY {
            continue;
        }
        let dotted = if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{prefix}.{key}")
        };
        if value::is_encrypted(child) {
            let provider = value::provider_of(child).unwrap_or_default();
            out.push((dotted, LeafKind::Encrypted { provider }));
        } else if child.is_table_like() {
            collect_leaves(child, &dotted, out);
        } else {
            out.push((dotted, LeafKind::Plain(value::display_item(child))));
        }
    }
}

/// Child keys for progressive completion of `partial`.
///
/// Everything before the last `.` must resolve to a mapping; the keys under it
/// that start with the trailing fragment are returned in document order. A
/// prefix that is missing, resolves to a leaf, or points into the `[crypto]`
/// metadata yields an empty list.
pub fn possible_sub_keys(partial: &str, root: &Item) -> Result<Vec<String>, SealfigError> {
    let (prefix, fragment) = match partial.rsplit_once('.') {
        Some((prefix, fragment)) => (Some(prefix), fragment),
        None => (None, partial),
    };

    let mut current = root;
    if let Some(prefix) = prefix {
        for (depth, segment) in prefix.split('.').enumerate() {
            if segment.is_empty() {
                return Err(SealfigError::invalid_key(partial, "empty segment"));
            }
            if (depth == 0 && segment == CRYPTO_KEY) || value::is_encrypted(current) {
                return Ok(vec![]);
            }
            match current.as_table_like().and_then(|t| t.get(segment)) {
                Some(child) => current = child,
                None => return Ok(vec![]),
            }
        }
    }

    if value::is_encrypted(current) {
        return Ok(vec![]);
    }
    let Some(table) = current.as_table_like() else {
        return Ok(vec![]);
    };

    Ok(table
        .iter()
        .map(|(key, _)| key)
        .filter(|key| prefix.is_some() || *key != CRYPTO_KEY)
        .filter(|key| key.starts_with(fragment))
        .map(str::to_string)
        .collect())
}
