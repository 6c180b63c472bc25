//! Config files with encrypted values, addressed by dotted keypaths.
//!
//! Sealfig edits TOML config files in place. Secrets are stored next to
//! ordinary settings, each one encrypted on its own by the crypto provider the
//! file names in its `[crypto]` table:
//!
//! ```toml
//! [crypto]
//! provider = "password"
//! salt = "9f2c1e..."
//!
//! [database]
//! host = "db.internal"
//! password = { encrypted = true, provider = "password", ciphertext = "..." }
//! ```
//!
//! ```ignore
//! let sealfig = Sealfig::builder().provider_settings(settings).build();
//! sealfig.handle(
//!     &ConfigAction::Set {
//!         path: "config/prod.toml".into(),
//!         key: "database.password".into(),
//!         source: SecretSource::Prompt,
//!         plain_text: false,
//!     },
//!     &TerminalReader,
//! )?;
//! ```
//!
//! # Documents
//!
//! A [`ConfigDocument`] wraps a `toml_edit` tree, so comments, key order, and
//! whitespace survive every edit. Loading a file and writing it back without
//! changes produces identical bytes. A write only re-renders the leaf it
//! touches plus any intermediate tables it had to create, which are appended
//! after the existing keys of their parent. The file's byte-order mark, line
//! endings and final newline (or lack of one) are kept.
//!
//! The format follows the file extension ([`Format::for_path`]). TOML is the
//! only one supported: `.toml` files and files without an extension are
//! accepted, anything else fails with [`SealfigError::UnsupportedFormat`]
//! before the file is read.
//!
//! Keypaths are dot-separated lists of non-empty segments. Navigation never
//! descends into an encrypted leaf even though it is an inline table on disk.
//!
//! # Encryption policy
//!
//! [`ConfigDocument::set`] encrypts and refuses outright
//! ([`SealfigError::NoCryptoConfigured`]) when the file has no usable
//! provider. Storing plaintext takes a separate, loudly named call,
//! [`ConfigDocument::very_insecurely_set_plaintext`]; the CLI only reaches it
//! with `--plain-text`. The policy is checked before the user is prompted for
//! anything.
//!
//! # Providers
//!
//! The [`ProviderRegistry`] maps names to constructors and is frozen once
//! built. Two providers ship with the crate:
//!
//! | Name | Cipher | Key material |
//! |------|--------|--------------|
//! | `password` | ChaCha20-Poly1305 | `SEALFIG_PASSWORD` plus a per-file salt |
//! | `key` | AES-256-GCM | hex key from `SEALFIG_KEY` or a key file |
//!
//! Providers are built lazily, so reading plaintext values never needs
//! credentials. Embedders can register more with
//! [`RegistryBuilder::register`](provider::RegistryBuilder::register).
//!
//! # Defaults cascade
//!
//! After `set` writes `config/prod.toml`, the first existing sibling of
//! `config/default.toml` and `config/defaults.toml` receives the same keypath
//! with an empty placeholder, if it doesn't have one yet. This keeps the
//! defaults file a complete inventory of keys. The step is best-effort: its
//! result is reported as a [`CascadeOutcome`](cascade::CascadeOutcome) and
//! never turns a successful write into a failure.
//!
//! # Settings and logging
//!
//! The tool's own settings ([`settings::Settings`]) are layered with
//! confique from the platform config file (`sealfig/sealfig.toml`) and
//! `SEALFIG_*` environment variables. The library logs through `tracing`;
//! the binary installs a stderr subscriber so stdout stays clean for `get`
//! and completion output.
//!
//! # Clap adapter
//!
//! The `cli` module (behind the `clap` feature, on by default) holds the
//! derive types for the `sealfig` binary and converts them into
//! [`ConfigAction`] values. The core has no dependency on clap: flag
//! completion (`sealfig flags`) reads a [`FlagCatalog`](types::FlagCatalog)
//! that the adapter builds from its own clap definition.
//!
//! # Error handling
//!
//! All fallible operations return [`SealfigError`]. The CLI maps policy and
//! input problems to exit code 3 and everything else to exit code 2.

pub mod cascade;
pub mod error;
pub mod file;
pub mod input;
pub mod keypath;
pub mod provider;
pub mod settings;
pub mod types;
pub mod value;

mod builder;
#[cfg(feature = "clap")]
pub mod cli;
mod document;
mod ops;
mod store;

#[cfg(test)]
mod fixtures;

pub use builder::{Sealfig, SealfigBuilder};
pub use document::{ConfigDocument, ConfigValue, Format};
pub use error::SealfigError;
#[cfg(feature = "clap")]
pub use input::TerminalReader;
pub use input::{NoPrompt, SecretReader};
pub use ops::ConfigResult;
pub use provider::{CryptoProvider, ProviderRegistry};
pub use types::{ConfigAction, FlagCatalog, SecretSource};
