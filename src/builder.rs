use crate::error::SealfigError;
use crate::file::{self, DiskStore, FileStore};
use crate::input::SecretReader;
use crate::ops::{self, ConfigResult};
use crate::provider::{InitOptions, ProviderRegistry};
use crate::settings::ProviderSettings;
use crate::types::{ConfigAction, FlagCatalog};

/// Entry point for working with encrypted config files.
pub struct Sealfig {
    registry: ProviderRegistry,
    store: Box<dyn FileStore>,
    flags: FlagCatalog,
}

impl Sealfig {
    pub fn builder() -> SealfigBuilder {
        SealfigBuilder::default()
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Handle a `ConfigAction` and print the result to stdout.
    pub fn handle_and_print(
        &self,
        action: &ConfigAction,
        reader: &dyn SecretReader,
    ) -> Result<(), SealfigError> {
        let result = self.handle(action, reader)?;
        println!("{result}");
        Ok(())
    }

    /// Handle a `ConfigAction`.
    ///
    /// File paths starting with `~` are expanded to the home directory.
    pub fn handle(
        &self,
        action: &ConfigAction,
        reader: &dyn SecretReader,
    ) -> Result<ConfigResult, SealfigError> {
        let store = self.store.as_ref();
        let registry = &self.registry;
        match action {
            ConfigAction::Init {
                path,
                provider,
                key_file,
            } => {
                let options = InitOptions {
                    key_file: key_file.clone(),
                };
                ops::init_crypto(store, registry, &file::expand_home(path), provider, &options)
            }
            ConfigAction::Get { path, key } => {
                ops::get_value(store, registry, &file::expand_home(path), key)
            }
            ConfigAction::Set {
                path,
                key,
                source,
                plain_text,
            } => ops::set_value(
                store,
                registry,
                reader,
                &file::expand_home(path),
                key,
                source,
                *plain_text,
            ),
            ConfigAction::List { path } => {
                ops::list_values(store, registry, &file::expand_home(path))
            }
            ConfigAction::Keys { path, partial } => {
                ops::list_keys(store, registry, &file::expand_home(path), partial)
            }
            ConfigAction::Providers { partial } => Ok(ops::list_providers(registry, partial)),
            ConfigAction::Flags { command, words } => {
                Ok(ops::list_flags(&self.flags, command.as_deref(), words))
            }
        }
    }
}

/// Builder for [`Sealfig`].
///
/// Without a [`registry()`](Self::registry), the built-in providers are
/// registered with the given [`provider_settings()`](Self::provider_settings).
/// Without a [`store()`](Self::store), files are read from and written to disk.
#[derive(Default)]
pub struct SealfigBuilder {
    settings: Option<ProviderSettings>,
    registry: Option<ProviderRegistry>,
    store: Option<Box<dyn FileStore>>,
    flags: FlagCatalog,
}

impl SealfigBuilder {
    /// Credentials for the built-in providers. Ignored when a registry is set.
    pub fn provider_settings(mut self, settings: ProviderSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Use a prebuilt registry, e.g. one with extra providers.
    pub fn registry(mut self, registry: ProviderRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn store(mut self, store: impl FileStore + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    /// Flags offered by [`ConfigAction::Flags`]. Empty unless set.
    pub fn flag_catalog(mut self, catalog: FlagCatalog) -> Self {
        self.flags = catalog;
        self
    }

    pub fn build(self) -> Sealfig {
        let registry = self.registry.unwrap_or_else(|| {
            ProviderRegistry::builtin(self.settings.unwrap_or_default())
        });
        Sealfig {
            registry,
            store: self.store.unwrap_or_else(|| Box::new(DiskStore)),
            flags: self.flags,
        }
    }
}
