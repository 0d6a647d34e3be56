//! # cfgstore-core
//!
//! Change-tracked configuration documents persisted to disk.
//!
//! Independent modules declare a typed settings schema (any
//! `Serialize + DeserializeOwned` type), and a provider materializes it as a
//! structured document backed by one file.  The document can be mutated at
//! runtime; every mutation is tracked so that a periodic "save what changed"
//! sweep only touches files that actually need writing.
//!
//! # Architecture overview
//!
//! - **`document`** – The in-memory tree (`serde_json::Value`) together with
//!   its two change flags, and the [`DocumentMut`] handle that trips them on
//!   every mutable access.
//!
//! - **`format`** – Text encodings of the tree.  [`Json`] is the reference
//!   format; [`Toml`] proves that the store generalizes to any tree-shaped
//!   format.
//!
//! - **`provider`** – The [`ConfigProvider`] contract, its file-backed
//!   implementation [`FileProvider`], and the [`ProviderRegistry`] that maps a
//!   format tag or file extension to a provider factory.
//!
//! - **`sweep`** – [`ConfigSet`], an owned collection of providers that can
//!   save every changed document or reload files edited by another process.
//!
//! # Lifecycle
//!
//! ```text
//! FileProvider::new(path)     -- filename bound once, no setter
//!   └─ load()                 -- read or recover; tree never absent afterwards
//!   └─ parse::<T>() / store(&T) / dynamic()
//!   └─ has_changed()?  ──►  save()
//! ```

pub mod document;
pub mod format;
pub mod provider;
pub mod sweep;

pub use document::{DocumentMut, PointerError, TrackedDocument};
pub use format::{json::Json, toml::Toml, DocumentFormat, FormatError};
pub use provider::file::{FileProvider, JsonProvider, TomlProvider};
pub use provider::registry::{ProviderFactory, ProviderRegistry, RegistryError};
pub use provider::{ConfigError, ConfigProvider, ConfigProviderExt, LoadOutcome};
pub use sweep::{ConfigSet, SweepReport};
