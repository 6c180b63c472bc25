//! Clap adapter for sealfig.
//!
//! Compiled only with the `clap` Cargo feature (on by default). The only
//! bridge to the core is [`Cli::into_action()`], which turns parsed arguments
//! into a [`ConfigAction`](crate::ConfigAction). Everything else goes through
//! the clap-free [`Sealfig::handle()`](crate::Sealfig::handle).

use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};

use crate::error::SealfigError;
use crate::types::{ConfigAction, FlagCatalog, FlagSpec, SecretSource};

/// Exit code for failures of the tool itself (I/O, parsing, providers).
pub const EXIT_TOOL_ERROR: u8 = 2;
/// Exit code for bad input: missing secret or a policy violation.
pub const EXIT_INPUT_ERROR: u8 = 3;

/// Manage encrypted values in config files.
#[derive(Debug, Parser)]
#[command(name = "sealfig", version)]
pub struct Cli {
    /// Log filter (e.g. "debug", "sealfig=trace"). Overrides SEALFIG_LOG.
    #[arg(long, global = true, value_name = "FILTER")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure a crypto provider for CONFIG_FILE, creating it if needed.
    Init {
        config_file: PathBuf,
        /// Provider name (see `sealfig providers`).
        #[arg(long)]
        provider: String,
        /// Key file recorded for the `key` provider, relative to CONFIG_FILE.
        #[arg(long)]
        key_file: Option<PathBuf>,
    },
    /// Set a config value in CONFIG_FILE.
    ///
    /// Prompts for a value, encrypts it and saves it at KEYPATH.
    #[command(visible_alias = "edit")]
    Set {
        config_file: PathBuf,
        /// Dotted keypath (e.g. "database.password").
        keypath: String,
        /// Save the value as plain text instead of encrypting.
        #[arg(short, long)]
        plain_text: bool,
        /// Read this file instead of prompting for input.
        #[arg(short, long, value_name = "FILE")]
        input_file: Option<PathBuf>,
    },
    /// Print the value at KEYPATH, decrypting it if needed.
    Get {
        config_file: PathBuf,
        keypath: String,
    },
    /// List every keypath in CONFIG_FILE. Secrets stay encrypted.
    List { config_file: PathBuf },
    /// Print completion candidates for a partial keypath.
    Keys {
        config_file: PathBuf,
        #[arg(default_value = "")]
        partial: String,
    },
    /// Print provider names, optionally filtered by prefix.
    Providers {
        #[arg(default_value = "")]
        partial: String,
    },
    /// Print the flags of COMMAND for completion.
    ///
    /// WORDS are the arguments typed after COMMAND. A last word starting with
    /// `-` is completed; flags among the other words are left out.
    Flags {
        #[arg(value_name = "COMMAND", allow_hyphen_values = true)]
        subcommand: Option<String>,
        #[arg(allow_hyphen_values = true)]
        words: Vec<String>,
    },
}

impl Cli {
    /// Convert parsed args into a framework-agnostic `ConfigAction`.
    pub fn into_action(self) -> ConfigAction {
        match self.command {
            Command::Init {
                config_file,
                provider,
                key_file,
            } => ConfigAction::Init {
                path: config_file,
                provider,
                key_file,
            },
            Command::Set {
                config_file,
                keypath,
                plain_text,
                input_file,
            } => ConfigAction::Set {
                path: config_file,
                key: keypath,
                source: input_file.map_or(SecretSource::Prompt, SecretSource::File),
                plain_text,
            },
            Command::Get {
                config_file,
                keypath,
            } => ConfigAction::Get {
                path: config_file,
                key: keypath,
            },
            Command::List { config_file } => ConfigAction::List { path: config_file },
            Command::Keys {
                config_file,
                partial,
            } => ConfigAction::Keys {
                path: config_file,
                partial,
            },
            Command::Providers { partial } => ConfigAction::Providers { partial },
            Command::Flags {
                subcommand,
                mut words,
            } => match subcommand {
                // `sealfig flags --lo` completes top-level flags
                Some(first) if first.starts_with('-') => {
                    words.insert(0, first);
                    ConfigAction::Flags {
                        command: None,
                        words,
                    }
                }
                command => ConfigAction::Flags { command, words },
            },
        }
    }

    /// Visible long flags of every subcommand, read from the clap definition.
    pub fn flag_catalog() -> FlagCatalog {
        let root = Cli::command();
        FlagCatalog {
            global: long_flags(&root, true),
            commands: root
                .get_subcommands()
                .filter(|sub| !sub.is_hide_set())
                .map(|sub| {
                    let names = std::iter::once(sub.get_name())
                        .chain(sub.get_visible_aliases())
                        .map(String::from)
                        .collect();
                    (names, long_flags(sub, false))
                })
                .collect(),
        }
    }
}

fn long_flags(cmd: &clap::Command, global_only: bool) -> Vec<FlagSpec> {
    cmd.get_arguments()
        .filter(|arg| !arg.is_hide_set() && (!global_only || arg.is_global_set()))
        .filter_map(|arg| {
            arg.get_long().map(|long| FlagSpec {
                long: long.to_string(),
                short: arg.get_short(),
            })
        })
        .collect()
}

/// Process exit code for a failed operation.
pub fn exit_code(err: &SealfigError) -> u8 {
    if err.is_input_error() {
        EXIT_INPUT_ERROR
    } else {
        EXIT_TOOL_ERROR
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn parse_set_prompts_by_default() {
        let action = parse(&["sealfig", "set", "app.toml", "db.password"]).into_action();
        assert_eq!(
            action,
            ConfigAction::Set {
                path: PathBuf::from("app.toml"),
                key: "db.password".into(),
                source: SecretSource::Prompt,
                plain_text: false,
            }
        );
    }

    #[test]
    fn parse_set_short_flags() {
        let action =
            parse(&["sealfig", "set", "app.toml", "db.host", "-p", "-i", "host.txt"]).into_action();
        assert_eq!(
            action,
            ConfigAction::Set {
                path: PathBuf::from("app.toml"),
                key: "db.host".into(),
                source: SecretSource::File(PathBuf::from("host.txt")),
                plain_text: true,
            }
        );
    }

    #[test]
    fn parse_edit_alias() {
        let action = parse(&["sealfig", "edit", "app.toml", "a", "--plain-text"]).into_action();
        assert!(matches!(action, ConfigAction::Set { plain_text: true, .. }));
    }

    #[test]
    fn parse_init() {
        let action = parse(&[
            "sealfig",
            "init",
            "app.toml",
            "--provider",
            "key",
            "--key-file",
            "app.key",
        ])
        .into_action();
        assert_eq!(
            action,
            ConfigAction::Init {
                path: PathBuf::from("app.toml"),
                provider: "key".into(),
                key_file: Some(PathBuf::from("app.key")),
            }
        );
    }

    #[test]
    fn init_requires_provider() {
        assert!(Cli::try_parse_from(["sealfig", "init", "app.toml"]).is_err());
    }

    #[test]
    fn parse_keys_partial_defaults_to_empty() {
        let action = parse(&["sealfig", "keys", "app.toml"]).into_action();
        assert_eq!(
            action,
            ConfigAction::Keys {
                path: PathBuf::from("app.toml"),
                partial: String::new(),
            }
        );
    }

    #[test]
    fn parse_providers_with_prefix() {
        let action = parse(&["sealfig", "providers", "pa"]).into_action();
        assert_eq!(
            action,
            ConfigAction::Providers {
                partial: "pa".into()
            }
        );
    }

    #[test]
    fn parse_flags_keeps_hyphen_words() {
        let action = parse(&["sealfig", "flags", "set", "-p", "--in"]).into_action();
        assert_eq!(
            action,
            ConfigAction::Flags {
                command: Some("set".into()),
                words: vec!["-p".into(), "--in".into()],
            }
        );
    }

    #[test]
    fn parse_flags_without_command() {
        let action = parse(&["sealfig", "flags", "--lo"]).into_action();
        assert_eq!(
            action,
            ConfigAction::Flags {
                command: None,
                words: vec!["--lo".into()],
            }
        );
    }

    #[test]
    fn flag_catalog_mirrors_definition() {
        let catalog = Cli::flag_catalog();
        assert_eq!(
            catalog.global,
            [FlagSpec {
                long: "log-level".into(),
                short: None,
            }]
        );

        let set = catalog.command("edit").unwrap();
        assert_eq!(catalog.command("set").unwrap(), set);
        let longs: Vec<(&str, Option<char>)> =
            set.iter().map(|f| (f.long.as_str(), f.short)).collect();
        assert_eq!(longs, [("plain-text", Some('p')), ("input-file", Some('i'))]);

        let init: Vec<&str> = catalog
            .command("init")
            .unwrap()
            .iter()
            .map(|f| f.long.as_str())
            .collect();
        assert_eq!(init, ["provider", "key-file"]);
        assert!(catalog.command("get").unwrap().is_empty());
    }

    #[test]
    fn log_level_is_global() {
        let cli = parse(&["sealfig", "get", "app.toml", "a", "--log-level", "debug"]);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn exit_codes_split_input_from_tool_errors() {
        assert_eq!(
            exit_code(&SealfigError::NoCryptoConfigured { key: "a".into() }),
            EXIT_INPUT_ERROR
        );
        assert_eq!(exit_code(&SealfigError::Input("empty".into())), EXIT_INPUT_ERROR);
        assert_eq!(
            exit_code(&SealfigError::NotFound {
                path: "app.toml".into()
            }),
            EXIT_TOOL_ERROR
        );
    }
}
