//! Reading secret values.
//!
//! The operations layer never touches a terminal directly. It asks a
//! [`SecretReader`] for bytes, which keeps `set` testable and lets embedders
//! supply their own prompt.

use std::path::Path;

use crate::error::SealfigError;
use crate::file;
use crate::types::SecretSource;

/// Supplies secret bytes to `set`.
pub trait SecretReader {
    /// Ask the user for a value. `masked` hides the input as it is typed.
    fn prompt(&self, message: &str, masked: bool) -> Result<Vec<u8>, SealfigError>;

    /// Read a whole file. A leading `~` is expanded.
    fn read_file(&self, path: &Path) -> Result<Vec<u8>, SealfigError> {
        let path = file::expand_home(path);
        std::fs::read(&path)
            .map_err(|e| SealfigError::Input(format!("could not read {}: {e}", path.display())))
    }
}

/// A reader for non-interactive use: prompting is an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPrompt;

impl SecretReader for NoPrompt {
    fn prompt(&self, _message: &str, _masked: bool) -> Result<Vec<u8>, SealfigError> {
        Err(SealfigError::Input(
            "no value given and prompting is disabled".into(),
        ))
    }
}

/// Resolve `source` to the bytes to store at `key`. Empty input is rejected.
pub fn read_secret(
    reader: &dyn SecretReader,
    source: &SecretSource,
    key: &str,
    masked: bool,
) -> Result<Vec<u8>, SealfigError> {
    let bytes = match source {
        SecretSource::Value(bytes) => bytes.clone(),
        SecretSource::File(path) => reader.read_file(path)?,
        SecretSource::Prompt => reader.prompt(&format!("Enter value for \"{key}\": "), masked)?,
    };
    if bytes.is_empty() {
        return Err(SealfigError::Input(format!("no value given for '{key}'")));
    }
    Ok(bytes)
}

/// Strip one trailing `\n` or `\r\n`.
#[cfg_attr(not(feature = "clap"), allow(dead_code))]
pub(crate) fn trim_line_ending(mut line: Vec<u8>) -> Vec<u8> {
    if line.last() == Some(&b'\n') {
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
    }
    line
}

#[cfg(feature = "clap")]
pub use terminal::TerminalReader;

#[cfg(feature = "clap")]
mod terminal {
    use std::io::{BufRead, IsTerminal, Write};

    use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
    use crossterm::terminal::{disable_raw_mode, enable_raw_mode};

    use super::{SecretReader, trim_line_ending};
    use crate::error::SealfigError;

    /// Prompts on stderr. Masked input uses raw mode when stdin is a
    /// terminal; otherwise one line is read from stdin.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct TerminalReader;

    impl SecretReader for TerminalReader {
        fn prompt(&self, message: &str, masked: bool) -> Result<Vec<u8>, SealfigError> {
            let stdin = std::io::stdin();
            if !stdin.is_terminal() {
                return read_line(&mut stdin.lock());
            }

            let mut stderr = std::io::stderr();
            write!(stderr, "{message}").and_then(|_| stderr.flush()).map_err(input_error)?;
            if masked {
                let secret = read_masked();
                let _ = writeln!(stderr);
                secret
            } else {
                read_line(&mut stdin.lock())
            }
        }
    }

    fn read_line(input: &mut impl BufRead) -> Result<Vec<u8>, SealfigError> {
        let mut line = Vec::new();
        input.read_until(b'\n', &mut line).map_err(input_error)?;
        Ok(trim_line_ending(line))
    }

    /// Restores cooked mode when dropped, including on early return.
    struct RawMode;

    impl RawMode {
        fn enable() -> Result<Self, SealfigError> {
            enable_raw_mode().map_err(input_error)?;
            Ok(RawMode)
        }
    }

    impl Drop for RawMode {
        fn drop(&mut self) {
            let _ = disable_raw_mode();
        }
    }

    fn read_masked() -> Result<Vec<u8>, SealfigError> {
        let _raw = RawMode::enable()?;
        let mut secret = String::new();
        loop {
            let Event::Key(key) = event::read().map_err(input_error)? else {
                continue;
            };
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Enter => break,
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    return Err(SealfigError::Input("input cancelled".into()));
                }
                KeyCode::Char(c) => secret.push(c),
                KeyCode::Backspace => {
                    secret.pop();
                }
                KeyCode::Esc => return Err(SealfigError::Input("input cancelled".into())),
                _ => {}
            }
        }
        Ok(secret.into_bytes())
    }

    fn input_error(e: std::io::Error) -> SealfigError {
        SealfigError::Input(format!("could not read input: {e}"))
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::ScriptedReader;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn value_source_passes_through() {
        let bytes = read_secret(&NoPrompt, &SecretSource::Value(b"v".to_vec()), "k", true).unwrap();
        assert_eq!(bytes, b"v");
    }

    #[test]
    fn file_source_reads_bytes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("secret.bin");
        fs::write(&path, [0u8, 159, 146, 150]).unwrap();
        let bytes = read_secret(&NoPrompt, &SecretSource::File(path), "k", true).unwrap();
        assert_eq!(bytes, [0u8, 159, 146, 150]);
    }

    #[test]
    fn missing_file_is_input_error() {
        let source = SecretSource::File("/nonexistent/secret".into());
        let err = read_secret(&NoPrompt, &source, "k", true).unwrap_err();
        assert!(err.is_input_error());
    }

    #[test]
    fn prompt_passes_mask_flag_and_key() {
        let reader = ScriptedReader::new(["hunter2"]);
        let bytes = read_secret(&reader, &SecretSource::Prompt, "db.password", true).unwrap();
        assert_eq!(bytes, b"hunter2");
        assert_eq!(reader.prompts(), [("Enter value for \"db.password\": ".to_string(), true)]);
    }

    #[test]
    fn empty_input_is_rejected() {
        let reader = ScriptedReader::new([""]);
        let err = read_secret(&reader, &SecretSource::Prompt, "k", false).unwrap_err();
        assert!(err.is_input_error());
        let err = read_secret(&reader, &SecretSource::Value(Vec::new()), "k", false).unwrap_err();
        assert!(err.is_input_error());
    }

    #[test]
    fn no_prompt_refuses() {
        let err = read_secret(&NoPrompt, &SecretSource::Prompt, "k", true).unwrap_err();
        assert!(err.is_input_error());
    }

    #[test]
    fn line_endings_are_trimmed_once() {
        assert_eq!(trim_line_ending(b"a\r\n".to_vec()), b"a");
        assert_eq!(trim_line_ending(b"a\n\n".to_vec()), b"a\n");
        assert_eq!(trim_line_ending(b"a".to_vec()), b"a");
    }
}
