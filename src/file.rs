//! Byte-level file access and path helpers.
//!
//! Documents are read and written through [`FileStore`] so that the load/save
//! logic can run against an in-memory store in tests. [`DiskStore`] is the real
//! implementation: writes go to a temp file in the target directory and are
//! renamed over the target, so a document is never left half-written.

use std::io::Write;
use std::path::{Path, PathBuf};

/// Name of the tool's own settings file.
pub const SETTINGS_FILE_NAME: &str = "sealfig.toml";

/// Raw byte storage for config documents.
pub trait FileStore {
    fn exists(&self, path: &Path) -> bool;
    fn read(&self, path: &Path) -> std::io::Result<Vec<u8>>;
    fn write(&self, path: &Path, contents: &[u8]) -> std::io::Result<()>;
}

/// The local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskStore;

impl FileStore for DiskStore {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> std::io::Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(contents)?;
        tmp.as_file().sync_all()?;
        // Keep the original file mode.
        if let Ok(meta) = std::fs::metadata(path) {
            tmp.as_file().set_permissions(meta.permissions())?;
        }
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match directories::UserDirs::new() {
        Some(user) => user.home_dir().join(rest),
        None => path.to_path_buf(),
    }
}

/// Location of the settings file in the platform config directory
/// (e.g. `~/.config/sealfig/sealfig.toml` on Linux).
pub fn settings_path() -> Option<PathBuf> {
    let proj = directories::ProjectDirs::from("", "", "sealfig")?;
    Some(proj.config_dir().join(SETTINGS_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn write_then_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.toml");
        DiskStore.write(&path, b"a = 1\n").unwrap();
        assert!(DiskStore.exists(&path));
        assert_eq!(DiskStore.read(&path).unwrap(), b"a = 1\n");
    }

    #[test]
    fn write_replaces_existing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.toml");
        fs::write(&path, "old").unwrap();
        DiskStore.write(&path, b"new").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
        // No temp files left behind.
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn write_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sub").join("dir").join("app.toml");
        DiskStore.write(&path, b"").unwrap();
        assert!(path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn write_keeps_file_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.toml");
        fs::write(&path, "a = 1\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o600)).unwrap();

        DiskStore.write(&path, b"a = 2\n").unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn directories_do_not_exist_as_files() {
        let dir = TempDir::new().unwrap();
        assert!(!DiskStore.exists(dir.path()));
        assert!(!DiskStore.exists(&dir.path().join("missing.toml")));
    }

    #[test]
    fn expand_home_leaves_plain_paths() {
        assert_eq!(
            expand_home(Path::new("/etc/app.toml")),
            PathBuf::from("/etc/app.toml")
        );
        assert_eq!(
            expand_home(Path::new("config/~app.toml")),
            PathBuf::from("config/~app.toml")
        );
    }

    #[test]
    fn expand_home_replaces_tilde() {
        let expanded = expand_home(Path::new("~/app.toml"));
        if let Some(user) = directories::UserDirs::new() {
            assert_eq!(expanded, user.home_dir().join("app.toml"));
        }
    }

    #[test]
    fn settings_path_uses_file_name() {
        if let Some(path) = settings_path() {
            assert!(path.ends_with(SETTINGS_FILE_NAME));
        }
    }
}
