#[cfg(test)]
pub mod test {
    use std::cell::{Cell, RefCell};
    use std::collections::{BTreeMap, VecDeque};
    use std::io;
    use std::path::{Path, PathBuf};
    use std::rc::Rc;

    use toml_edit::Table;

    use crate::document::ConfigDocument;
    use crate::error::SealfigError;
    use crate::file::FileStore;
    use crate::input::SecretReader;
    use crate::provider::{CryptoProvider, InitOptions, ProviderContext, ProviderRegistry};
    use crate::settings::ProviderSettings;

    /// A small document with comments and a plain `[database]` table.
    pub const SAMPLE_DOC: &str = r#"# Service configuration
[app]
name = "orders"  # shown in logs
debug = false

[database]
host = "localhost"
port = 5432
"#;

    // -- In-memory file store ---------------------------------------------------

    /// A `FileStore` over a shared map. Clones see the same files.
    #[derive(Clone, Default)]
    pub struct MemoryStore {
        files: Rc<RefCell<BTreeMap<PathBuf, Vec<u8>>>>,
        probes: Rc<RefCell<Vec<PathBuf>>>,
        writes: Rc<Cell<usize>>,
        fail_writes: Rc<Cell<bool>>,
    }

    impl MemoryStore {
        pub fn with_file(path: impl AsRef<Path>, content: &str) -> Self {
            let store = Self::default();
            store.insert(path, content);
            store
        }

        pub fn insert(&self, path: impl AsRef<Path>, content: &str) {
            self.files
                .borrow_mut()
                .insert(path.as_ref().to_path_buf(), content.as_bytes().to_vec());
        }

        pub fn contents(&self, path: impl AsRef<Path>) -> Option<String> {
            self.files
                .borrow()
                .get(path.as_ref())
                .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
        }

        /// Paths passed to `exists`, in call order.
        pub fn probes(&self) -> Vec<PathBuf> {
            self.probes.borrow().clone()
        }

        /// Number of successful writes.
        pub fn writes(&self) -> usize {
            self.writes.get()
        }

        /// Make every later write fail.
        pub fn fail_writes(&self) {
            self.fail_writes.set(true);
        }
    }

    impl FileStore for MemoryStore {
        fn exists(&self, path: &Path) -> bool {
            self.probes.borrow_mut().push(path.to_path_buf());
            self.files.borrow().contains_key(path)
        }

        fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
            self.files
                .borrow()
                .get(path)
                .cloned()
                .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
        }

        fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
            if self.fail_writes.get() {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"));
            }
            self.files
                .borrow_mut()
                .insert(path.to_path_buf(), contents.to_vec());
            self.writes.set(self.writes.get() + 1);
            Ok(())
        }
    }

    // -- Fake providers -----------------------------------------------------------

    /// Reversible and deterministic. Not encryption.
    pub struct XorProvider;

    const XOR_MASK: u8 = 0x5a;

    impl XorProvider {
        pub fn construct(
            _ctx: &ProviderContext<'_>,
        ) -> Result<Box<dyn CryptoProvider>, SealfigError> {
            Ok(Box::new(XorProvider))
        }

        pub fn initialize(_options: &InitOptions, _metadata: &mut Table) -> Result<(), SealfigError> {
            Ok(())
        }
    }

    impl CryptoProvider for XorProvider {
        fn name(&self) -> &str {
            "xor"
        }

        fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, SealfigError> {
            Ok(plaintext.iter().map(|b| b ^ XOR_MASK).collect())
        }

        fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, SealfigError> {
            self.encrypt(ciphertext)
        }
    }

    /// Constructs fine, then fails every operation.
    pub struct BrokenProvider;

    impl BrokenProvider {
        pub fn construct(
            _ctx: &ProviderContext<'_>,
        ) -> Result<Box<dyn CryptoProvider>, SealfigError> {
            Ok(Box::new(BrokenProvider))
        }
    }

    impl CryptoProvider for BrokenProvider {
        fn name(&self) -> &str {
            "broken"
        }

        fn encrypt(&self, _plaintext: &[u8]) -> Result<Vec<u8>, SealfigError> {
            Err(SealfigError::provider("broken", "backend unavailable"))
        }

        fn decrypt(&self, _ciphertext: &[u8]) -> Result<Vec<u8>, SealfigError> {
            Err(SealfigError::provider("broken", "backend unavailable"))
        }
    }

    /// Built-ins plus `xor` and `broken`.
    pub fn test_registry() -> ProviderRegistry {
        ProviderRegistry::builder(ProviderSettings::default())
            .with_builtins()
            .register("xor", "test only", XorProvider::construct, XorProvider::initialize)
            .register(
                "broken",
                "always fails",
                BrokenProvider::construct,
                XorProvider::initialize,
            )
            .build()
    }

    /// An otherwise empty document using the `xor` provider.
    pub fn xor_document() -> ConfigDocument {
        ConfigDocument::parse(b"[crypto]\nprovider = \"xor\"\n", None, &test_registry()).unwrap()
    }

    // -- Scripted input -----------------------------------------------------------

    /// Answers prompts from a fixed script and records what was asked.
    #[derive(Default)]
    pub struct ScriptedReader {
        answers: RefCell<VecDeque<String>>,
        prompts: RefCell<Vec<(String, bool)>>,
    }

    impl ScriptedReader {
        pub fn new<'a>(answers: impl IntoIterator<Item = &'a str>) -> Self {
            Self {
                answers: RefCell::new(answers.into_iter().map(String::from).collect()),
                prompts: RefCell::default(),
            }
        }

        /// `(message, masked)` for every prompt shown.
        pub fn prompts(&self) -> Vec<(String, bool)> {
            self.prompts.borrow().clone()
        }
    }

    impl SecretReader for ScriptedReader {
        fn prompt(&self, message: &str, masked: bool) -> Result<Vec<u8>, SealfigError> {
            self.prompts.borrow_mut().push((message.to_string(), masked));
            self.answers
                .borrow_mut()
                .pop_front()
                .map(String::into_bytes)
                .ok_or_else(|| SealfigError::Input("script exhausted".into()))
        }
    }

    #[test]
    fn xor_round_trips() {
        let provider = XorProvider;
        let sealed = provider.encrypt(b"abc").unwrap();
        assert_ne!(sealed, b"abc");
        assert_eq!(provider.decrypt(&sealed).unwrap(), b"abc");
    }

    #[test]
    fn memory_store_clones_share_files() {
        let store = MemoryStore::default();
        let other = store.clone();
        other.write(Path::new("a.toml"), b"x = 1\n").unwrap();
        assert_eq!(store.contents("a.toml").as_deref(), Some("x = 1\n"));
        assert_eq!(store.writes(), 1);
    }
}
