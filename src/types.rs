use std::path::PathBuf;

/// Where `set` gets the value to store.
#[derive(Debug, Clone, PartialEq)]
pub enum SecretSource {
    /// Bytes supplied directly by the caller.
    Value(Vec<u8>),
    /// The whole contents of a file.
    File(PathBuf),
    /// Ask the [`SecretReader`](crate::input::SecretReader).
    Prompt,
}

/// A config operation, independent of any CLI framework.
/// The CLI layer converts parsed clap args into this.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigAction {
    /// Configure a crypto provider for a file, creating the file if needed.
    Init {
        path: PathBuf,
        provider: String,
        key_file: Option<PathBuf>,
    },
    Get {
        path: PathBuf,
        key: String,
    },
    Set {
        path: PathBuf,
        key: String,
        source: SecretSource,
        plain_text: bool,
    },
    /// Every leaf keypath in a file. Secrets are not decrypted.
    List { path: PathBuf },
    /// Completion candidates for a partial keypath.
    Keys { path: PathBuf, partial: String },
    /// Registered provider names starting with `partial`.
    Providers { partial: String },
    /// Flags of `command` (or the top level) for completion. `words` are the
    /// arguments typed so far; a last word starting with `-` is the partial
    /// flag, and flags already among the others are left out.
    Flags {
        command: Option<String>,
        words: Vec<String>,
    },
}

/// A named flag, as offered by completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagSpec {
    pub long: String,
    pub short: Option<char>,
}

/// The flags every command accepts. The CLI layer fills this in from its own
/// definition; the core only reads it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlagCatalog {
    /// Flags accepted everywhere.
    pub global: Vec<FlagSpec>,
    /// Per command: its name plus aliases, and its own flags.
    pub commands: Vec<(Vec<String>, Vec<FlagSpec>)>,
}

impl FlagCatalog {
    /// The flags of the command called `name` (or one of its aliases).
    pub fn command(&self, name: &str) -> Option<&[FlagSpec]> {
        self.commands
            .iter()
            .find(|(names, _)| names.iter().any(|n| n == name))
            .map(|(_, flags)| flags.as_slice())
    }
}
