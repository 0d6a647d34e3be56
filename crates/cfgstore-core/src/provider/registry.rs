//! Maps format tags and file extensions to provider factories.
//!
//! The registry only knows how to construct providers; it never loads them.
//! Hosting code typically builds one with [`ProviderRegistry::with_builtin`],
//! registers any extra formats it ships, and then opens one provider per
//! settings file:
//!
//! ```rust
//! use cfgstore_core::{ConfigProvider, ProviderRegistry};
//!
//! let registry = ProviderRegistry::with_builtin();
//! let provider = registry.open_by_extension("settings/mod.toml").unwrap();
//! assert_eq!(provider.format_tag(), "toml");
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::file::FileProvider;
use super::ConfigProvider;
use crate::format::{json::Json, toml::Toml, DocumentFormat};

/// Constructs a root provider bound to the given file.
pub type ProviderFactory = fn(PathBuf) -> Box<dyn ConfigProvider>;

/// Error type for registry operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// Another provider is already registered under this tag.
    #[error("a provider is already registered for format {0:?}")]
    DuplicateTag(String),

    /// Another format already claims this file extension.
    #[error("extension {extension:?} is already claimed by format {tag:?}")]
    DuplicateExtension { extension: String, tag: String },

    /// No provider matches the tag or the file extension.
    #[error("no provider registered for {0:?}")]
    UnknownFormat(String),
}

#[derive(Clone)]
struct Registration {
    extensions: Vec<String>,
    factory: ProviderFactory,
}

/// Tag → factory table.  Tags and extensions are case-insensitive.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    by_tag: BTreeMap<String, Registration>,
}

impl ProviderRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the JSON and TOML providers.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry
            .register_format::<Json>()
            .expect("json format registers into an empty registry");
        registry
            .register_format::<Toml>()
            .expect("toml format does not overlap json");
        registry
    }

    /// Registers `factory` under `tag`, claiming `extensions`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateTag`] if the tag is taken, or
    /// [`RegistryError::DuplicateExtension`] if another format already claims
    /// one of the extensions.  Nothing is registered on error.
    pub fn register(
        &mut self,
        tag: &str,
        extensions: &[&str],
        factory: ProviderFactory,
    ) -> Result<(), RegistryError> {
        let tag = tag.to_ascii_lowercase();
        if self.by_tag.contains_key(&tag) {
            return Err(RegistryError::DuplicateTag(tag));
        }

        let extensions: Vec<String> = extensions
            .iter()
            .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
            .collect();
        for extension in &extensions {
            if let Some(owner) = self.tag_for_extension(extension) {
                return Err(RegistryError::DuplicateExtension {
                    extension: extension.clone(),
                    tag: owner.to_string(),
                });
            }
        }

        self.by_tag.insert(
            tag,
            Registration {
                extensions,
                factory,
            },
        );
        Ok(())
    }

    /// Registers the file-backed provider for format `F`.
    ///
    /// # Errors
    ///
    /// Same as [`register`](Self::register).
    pub fn register_format<F: DocumentFormat>(&mut self) -> Result<(), RegistryError> {
        self.register(F::TAG, F::EXTENSIONS, FileProvider::<F>::boxed)
    }

    /// Looks up the factory registered under `tag`.
    pub fn resolve(&self, tag: &str) -> Option<ProviderFactory> {
        self.by_tag
            .get(&tag.to_ascii_lowercase())
            .map(|registration| registration.factory)
    }

    /// Constructs (but does not load) a provider of format `tag` for `path`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownFormat`] if `tag` is not registered.
    pub fn open(
        &self,
        tag: &str,
        path: impl Into<PathBuf>,
    ) -> Result<Box<dyn ConfigProvider>, RegistryError> {
        let factory = self
            .resolve(tag)
            .ok_or_else(|| RegistryError::UnknownFormat(tag.to_string()))?;
        Ok(factory(path.into()))
    }

    /// Constructs a provider for `path`, choosing the format by extension.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownFormat`] if the path has no extension or
    /// no format claims it.
    pub fn open_by_extension(
        &self,
        path: impl Into<PathBuf>,
    ) -> Result<Box<dyn ConfigProvider>, RegistryError> {
        let path = path.into();
        let extension = extension_of(&path)
            .ok_or_else(|| RegistryError::UnknownFormat(path.display().to_string()))?;
        let tag = self
            .tag_for_extension(&extension)
            .ok_or(RegistryError::UnknownFormat(extension.clone()))?
            .to_string();
        self.open(&tag, path)
    }

    /// The tag of the format claiming `extension`, if any.
    pub fn tag_for_extension(&self, extension: &str) -> Option<&str> {
        let extension = extension.trim_start_matches('.').to_ascii_lowercase();
        self.by_tag
            .iter()
            .find(|(_, registration)| registration.extensions.contains(&extension))
            .map(|(tag, _)| tag.as_str())
    }

    /// Registered tags in sorted order.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.by_tag.keys().map(String::as_str)
    }

    /// Extensions claimed by `tag`.
    pub fn extensions(&self, tag: &str) -> Option<&[String]> {
        self.by_tag
            .get(&tag.to_ascii_lowercase())
            .map(|registration| registration.extensions.as_slice())
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
