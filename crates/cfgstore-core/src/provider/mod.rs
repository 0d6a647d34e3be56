//! The provider contract every format-specific store satisfies.
//!
//! Callers treat JSON, TOML or any other format identically through
//! [`ConfigProvider`]:
//!
//! ```text
//! construct (filename bound)  ──►  load()  ──►  parse / store / dynamic
//!                                                     │
//!                          save()  ◄──  has_changed()?
//! ```
//!
//! The trait is object safe so a registry can hand out
//! `Box<dyn ConfigProvider>`.  The typed entry points `parse::<T>()` and
//! `store(&T)` live on [`ConfigProviderExt`], which every provider gets for
//! free.
//!
//! # Failure semantics
//!
//! - Corrupt file content is recovered inside `load` and never reported as an
//!   error; see [`LoadOutcome::Recovered`].
//! - Calling `save` on a detached provider is a programming error and fails
//!   immediately with [`ConfigError::NotRoot`].
//! - I/O errors propagate unchanged; nothing is retried.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::document::DocumentMut;
use crate::format::FormatError;

pub mod file;
pub mod mock;
pub mod registry;

/// Error type for provider operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `save` (or a file query) was called on a provider with no backing file.
    #[error("provider is not a root document and has no backing file")]
    NotRoot,

    /// The directory that should contain the file could not be determined.
    #[error("could not determine the directory of config file {path}")]
    NoParentDir { path: PathBuf },

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The tree cannot be expressed in the provider's format.
    #[error("failed to render config: {0}")]
    Render(#[from] FormatError),

    /// A typed value does not match the document, or cannot become one.
    #[error("config does not match the requested shape: {0}")]
    Shape(#[source] serde_json::Error),

    /// A stored value did not serialize to an object, so it cannot be the
    /// root of a document.
    #[error("config document root must be an object, got {found}")]
    NotAnObject { found: &'static str },
}

impl ConfigError {
    pub(crate) fn io(path: &Path) -> impl FnOnce(std::io::Error) -> Self + '_ {
        move |source| Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// What `load` found on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The file was parsed.
    Loaded,
    /// No file exists yet; the document is empty and nothing was written.
    Missing,
    /// The file was corrupt; the document is empty and the file was rewritten.
    Recovered,
    /// The provider has no backing file; the document was reset to empty.
    Detached,
}

/// Uniform lifecycle and observable state of a configuration store.
///
/// Implementations are single-owner: no method locks, and every method runs
/// synchronously on the caller's thread.
pub trait ConfigProvider: Send {
    /// Tag of the format this provider reads and writes (e.g. `"json"`).
    fn format_tag(&self) -> &'static str;

    /// The backing file, bound at construction.  `None` for detached providers.
    fn filename(&self) -> Option<&Path>;

    /// Whether this provider stands alone and may be saved.
    fn is_root(&self) -> bool {
        self.filename().is_some()
    }

    /// Reads the backing file into a fresh tree.
    ///
    /// Afterwards the tree is never absent and `in_memory_changed()` is true.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file exists but cannot be read, or
    /// if rewriting a corrupt file fails.
    fn load(&mut self) -> Result<LoadOutcome, ConfigError>;

    /// Writes the tree to the backing file and clears `has_changed()`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::NotRoot`] on a detached provider,
    /// [`ConfigError::NoParentDir`], [`ConfigError::Io`] or
    /// [`ConfigError::Render`] otherwise.
    fn save(&mut self) -> Result<(), ConfigError>;

    /// Renders the tree in this provider's format without touching disk.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Render`] if the format cannot express the tree.
    fn render(&self) -> Result<String, ConfigError>;

    /// Read-only view of the live tree; `None` before the first load or store.
    fn document(&self) -> Option<&Value>;

    /// Mutable handle to the live tree.  Any mutation through it marks the
    /// provider changed.
    fn dynamic(&mut self) -> DocumentMut<'_>;

    /// Replaces the whole tree and marks the provider changed.
    fn replace_document(&mut self, tree: Value);

    /// Changed since the last save.
    fn has_changed(&self) -> bool;

    /// Changed since the last load, including the load itself.
    fn in_memory_changed(&self) -> bool;

    /// Acknowledges the in-memory change signal (or raises it again).
    fn set_in_memory_changed(&mut self, changed: bool);

    /// Modification time of the backing file, read from the file system on
    /// every call.
    ///
    /// # Errors
    ///
    /// [`ConfigError::NotRoot`] on a detached provider, [`ConfigError::Io`] if
    /// the file does not exist or the platform has no modification times.
    fn last_modified(&self) -> Result<SystemTime, ConfigError>;
}

/// Typed access on top of [`ConfigProvider`].
pub trait ConfigProviderExt: ConfigProvider {
    /// Deserializes the tree into `T`.
    ///
    /// Before anything was loaded or stored this returns `T::default()`.  The
    /// change flags are not touched.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Shape`] if the tree does not fit `T`.
    fn parse<T>(&self) -> Result<T, ConfigError>
    where
        T: DeserializeOwned + Default,
    {
        match self.document() {
            None => Ok(T::default()),
            Some(tree) => <T as Deserialize>::deserialize(tree).map_err(ConfigError::Shape),
        }
    }

    /// Replaces the tree with the structure of `value`.  This is a full
    /// overwrite, not a merge; both change flags become true.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Shape`] if `value` cannot be represented as a
    /// tree (e.g. a map with non-string keys), and
    /// [`ConfigError::NotAnObject`] if it serializes to an array, a scalar or
    /// null.  The tree is left unchanged in both cases.
    fn store<T>(&mut self, value: &T) -> Result<(), ConfigError>
    where
        T: Serialize + ?Sized,
    {
        let tree = serde_json::to_value(value).map_err(ConfigError::Shape)?;
        if !tree.is_object() {
            return Err(ConfigError::NotAnObject {
                found: kind_of(&tree),
            });
        }
        self.replace_document(tree);
        Ok(())
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl<P: ConfigProvider + ?Sized> ConfigProviderExt for P {}
