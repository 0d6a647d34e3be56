//! File-backed document store, generic over the text format.
//!
//! [`FileProvider<F>`] realizes [`ConfigProvider`] for any
//! [`DocumentFormat`].  The filename is bound at construction and can never be
//! reassigned; a provider without a file ([`FileProvider::detached`]) exists
//! only to hand out a typed view and refuses to save.
//!
//! # Load
//!
//! 1. No file: the tree becomes an empty object.  Nothing is written; the file
//!    is created lazily by the first `save`.
//! 2. The file parses: the tree becomes its content.
//! 3. The file is corrupt: an error is logged, the tree becomes an empty
//!    object, and the file is rewritten with that empty object right away so
//!    the same bytes are not parsed again on the next start.
//!
//! In every case `in_memory_changed` ends up `true`.
//!
//! # Save
//!
//! Missing parent directories are created, then the rendered text is written
//! to a sibling temporary file and renamed over the target.  A crash mid-write
//! leaves the previous file intact.

use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde_json::Value;
use tracing::{debug, error};
use uuid::Uuid;

use super::{ConfigError, ConfigProvider, LoadOutcome};
use crate::document::{empty_tree, DocumentMut, TrackedDocument};
use crate::format::{json::Json, toml::Toml, DocumentFormat};

/// Provider persisting JSON documents.
pub type JsonProvider = FileProvider<Json>;

/// Provider persisting TOML documents.
pub type TomlProvider = FileProvider<Toml>;

/// A configuration document stored in one file of format `F`.
pub struct FileProvider<F: DocumentFormat> {
    filename: Option<PathBuf>,
    document: TrackedDocument,
    format: PhantomData<fn() -> F>,
}

impl<F: DocumentFormat> FileProvider<F> {
    /// Creates a root provider bound to `filename`.  Nothing is read until
    /// [`load`](ConfigProvider::load).
    pub fn new(filename: impl Into<PathBuf>) -> Self {
        Self {
            filename: Some(filename.into()),
            document: TrackedDocument::new(),
            format: PhantomData,
        }
    }

    /// Creates a non-root provider around an in-memory tree.
    pub fn detached(tree: Value) -> Self {
        Self {
            filename: None,
            document: TrackedDocument::from_value(tree),
            format: PhantomData,
        }
    }

    /// Registry factory: a boxed root provider for `filename`.
    pub fn boxed(filename: PathBuf) -> Box<dyn ConfigProvider> {
        Box::new(Self::new(filename))
    }

    /// A detached snapshot of the subtree at `pointer`.
    ///
    /// Edits to the snapshot do not flow back into this provider.
    pub fn section(&self, pointer: &str) -> Option<Self> {
        self.document.get(pointer).cloned().map(Self::detached)
    }

    fn rewrite_empty(&self, path: &Path) -> Result<Value, ConfigError> {
        let empty = empty_tree();
        write_atomically(path, &F::render(&empty)?)?;
        Ok(empty)
    }
}

impl<F: DocumentFormat> ConfigProvider for FileProvider<F> {
    fn format_tag(&self) -> &'static str {
        F::TAG
    }

    fn filename(&self) -> Option<&Path> {
        self.filename.as_deref()
    }

    fn load(&mut self) -> Result<LoadOutcome, ConfigError> {
        let Some(path) = self.filename.as_deref() else {
            self.document.install_loaded(empty_tree());
            return Ok(LoadOutcome::Detached);
        };
        debug!(path = %path.display(), format = F::TAG, "loading config file");

        let (tree, outcome) = match fs::read(path) {
            Ok(bytes) => match F::decode(&bytes) {
                Ok(tree) => (tree, LoadOutcome::Loaded),
                Err(e) => {
                    error!(
                        path = %path.display(),
                        format = F::TAG,
                        error = %e,
                        "error parsing config file; resetting to an empty document"
                    );
                    (self.rewrite_empty(path)?, LoadOutcome::Recovered)
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                (empty_tree(), LoadOutcome::Missing)
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        self.document.install_loaded(tree);
        Ok(outcome)
    }

    fn save(&mut self) -> Result<(), ConfigError> {
        let path = self.filename.as_deref().ok_or(ConfigError::NotRoot)?;
        debug!(path = %path.display(), format = F::TAG, "saving config file");

        write_atomically(path, &self.render()?)?;
        self.document.mark_saved();
        Ok(())
    }

    fn render(&self) -> Result<String, ConfigError> {
        let text = match self.document.root() {
            Some(tree) => F::render(tree)?,
            None => F::render(&empty_tree())?,
        };
        Ok(text)
    }

    fn document(&self) -> Option<&Value> {
        self.document.root()
    }

    fn dynamic(&mut self) -> DocumentMut<'_> {
        self.document.edit()
    }

    fn replace_document(&mut self, tree: Value) {
        self.document.install_stored(tree);
    }

    fn has_changed(&self) -> bool {
        self.document.has_changed()
    }

    fn in_memory_changed(&self) -> bool {
        self.document.in_memory_changed()
    }

    fn set_in_memory_changed(&mut self, changed: bool) {
        self.document.set_in_memory_changed(changed);
    }

    fn last_modified(&self) -> Result<SystemTime, ConfigError> {
        let path = self.filename.as_deref().ok_or(ConfigError::NotRoot)?;
        fs::metadata(path)
            .and_then(|meta| meta.modified())
            .map_err(ConfigError::io(path))
    }
}

/// The directory a config file lives in.  A bare file name lives in the
/// current directory.
fn parent_dir(path: &Path) -> Result<&Path, ConfigError> {
    if path.file_name().is_none() {
        return Err(ConfigError::NoParentDir {
            path: path.to_path_buf(),
        });
    }
    match path.parent() {
        Some(dir) if dir.as_os_str().is_empty() => Ok(Path::new(".")),
        Some(dir) => Ok(dir),
        None => Err(ConfigError::NoParentDir {
            path: path.to_path_buf(),
        }),
    }
}

/// Writes `contents` to a temporary sibling of `path`, then renames it over
/// `path`.  Creates the directory chain first.
fn write_atomically(path: &Path, contents: &str) -> Result<(), ConfigError> {
    let dir = parent_dir(path)?;
    fs::create_dir_all(dir).map_err(ConfigError::io(dir))?;

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_path = dir.join(format!(".{file_name}.{}.tmp", Uuid::new_v4().simple()));

    if let Err(source) = fs::write(&temp_path, contents) {
        let _ = fs::remove_file(&temp_path);
        return Err(ConfigError::Io {
            path: temp_path,
            source,
        });
    }
    if let Err(source) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        });
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ConfigProviderExt;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
    struct Options {
        #[serde(default)]
        volume: u32,
        #[serde(default)]
        name: String,
    }

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("cfgstore_test_{}", Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    // ── Filename binding ──────────────────────────────────────────────────────

    #[test]
    fn test_filename_is_the_constructed_path() {
        let provider = JsonProvider::new("settings.cfg");
        assert_eq!(provider.filename(), Some(Path::new("settings.cfg")));
        assert!(provider.is_root());
    }

    #[test]
    fn test_detached_provider_has_no_filename() {
        let provider = JsonProvider::detached(json!({}));
        assert_eq!(provider.filename(), None);
        assert!(!provider.is_root());
    }

    // ── Load ──────────────────────────────────────────────────────────────────

    #[test]
    fn test_load_missing_file_yields_empty_document_without_writing() {
        // Arrange
        let dir = temp_dir();
        let path = dir.join("settings.json");
        let mut provider = JsonProvider::new(&path);

        // Act
        let outcome = provider.load().unwrap();

        // Assert
        assert_eq!(outcome, LoadOutcome::Missing);
        assert_eq!(provider.document(), Some(&json!({})));
        assert!(provider.in_memory_changed());
        assert!(!provider.has_changed());
        assert!(!path.exists(), "load must not create the file");

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_existing_file_parses_it() {
        let dir = temp_dir();
        let path = dir.join("settings.json");
        fs::write(&path, r#"{ "volume": 7, "name": "left" }"#).unwrap();
        let mut provider = JsonProvider::new(&path);

        let outcome = provider.load().unwrap();

        assert_eq!(outcome, LoadOutcome::Loaded);
        assert_eq!(
            provider.parse::<Options>().unwrap(),
            Options {
                volume: 7,
                name: "left".to_string()
            }
        );
        assert!(provider.in_memory_changed());
        assert!(!provider.has_changed());

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_corrupt_file_recovers_and_rewrites_it() {
        // Arrange: truncated JSON
        let dir = temp_dir();
        let path = dir.join("settings.json");
        fs::write(&path, r#"{ "volume": 7, "na"#).unwrap();
        let mut provider = JsonProvider::new(&path);

        // Act
        let outcome = provider.load();

        // Assert
        assert_eq!(outcome.unwrap(), LoadOutcome::Recovered);
        assert_eq!(provider.document(), Some(&json!({})));
        assert_eq!(fs::read_to_string(&path).unwrap(), "{}\n");
        assert!(provider.in_memory_changed());

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_replaces_unsaved_edits() {
        let dir = temp_dir();
        let path = dir.join("settings.json");
        fs::write(&path, r#"{ "volume": 1 }"#).unwrap();
        let mut provider = JsonProvider::new(&path);
        provider.load().unwrap();
        provider.dynamic()["volume"] = json!(9);

        provider.load().unwrap();

        assert_eq!(provider.document(), Some(&json!({ "volume": 1 })));
        assert!(!provider.has_changed());

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_of_directory_is_an_io_error() {
        let dir = temp_dir();
        let mut provider = JsonProvider::new(&dir);

        let err = provider.load().unwrap_err();

        assert!(matches!(err, ConfigError::Io { .. }));
        fs::remove_dir_all(&dir).ok();
    }

    // ── Parse / Store ─────────────────────────────────────────────────────────

    #[test]
    fn test_parse_before_load_returns_default() {
        let provider = JsonProvider::new("never-loaded.json");
        assert_eq!(provider.parse::<Options>().unwrap(), Options::default());
        assert!(!provider.has_changed());
        assert!(!provider.in_memory_changed());
    }

    #[test]
    fn test_store_replaces_document_and_sets_both_flags() {
        // Arrange
        let mut provider = JsonProvider::new("unused.json");
        provider.replace_document(json!({ "stale": true }));
        provider.set_in_memory_changed(false);

        // Act
        let options = Options {
            volume: 5,
            name: "main".to_string(),
        };
        provider.store(&options).unwrap();

        // Assert
        assert_eq!(provider.document(), Some(&json!({ "volume": 5, "name": "main" })));
        assert_eq!(provider.parse::<Options>().unwrap(), options);
        assert!(provider.has_changed());
        assert!(provider.in_memory_changed());
    }

    #[test]
    fn test_parse_with_mismatched_shape_is_shape_error() {
        let mut provider = JsonProvider::new("unused.json");
        provider.replace_document(json!({ "volume": "loud" }));

        let err = provider.parse::<Options>().unwrap_err();

        assert!(matches!(err, ConfigError::Shape(_)));
    }

    // ── Save ──────────────────────────────────────────────────────────────────

    #[test]
    fn test_save_clears_has_changed_but_not_in_memory_changed() {
        let dir = temp_dir();
        let mut provider = JsonProvider::new(dir.join("settings.json"));
        provider.load().unwrap();
        provider.dynamic()["volume"] = json!(3);

        provider.save().unwrap();

        assert!(!provider.has_changed());
        assert!(provider.in_memory_changed());

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_save_creates_missing_directory_chain() {
        let dir = temp_dir();
        let path = dir.join("a").join("b").join("c").join("settings.json");
        let mut provider = JsonProvider::new(&path);
        provider.store(&Options::default()).unwrap();

        provider.save().unwrap();

        assert!(path.exists());
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_save_leaves_no_temporary_files_behind() {
        let dir = temp_dir();
        let mut provider = JsonProvider::new(dir.join("settings.json"));
        provider.store(&json!({ "a": 1 })).unwrap();

        provider.save().unwrap();
        provider.save().unwrap();

        let names: Vec<_> = fs::read_dir(&dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["settings.json".to_string()]);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_save_on_detached_provider_is_not_root_error() {
        let mut provider = JsonProvider::detached(json!({ "a": 1 }));
        assert!(matches!(provider.save(), Err(ConfigError::NotRoot)));
    }

    #[test]
    fn test_save_before_load_writes_empty_object() {
        let dir = temp_dir();
        let path = dir.join("settings.json");
        let mut provider = JsonProvider::new(&path);

        provider.save().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "{}\n");
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_save_where_parent_is_a_file_is_io_error() {
        let dir = temp_dir();
        let blocker = dir.join("blocker");
        fs::write(&blocker, "not a directory").unwrap();
        let mut provider = JsonProvider::new(blocker.join("settings.json"));
        provider.store(&Options::default()).unwrap();

        let err = provider.save().unwrap_err();

        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(provider.has_changed(), "a failed save keeps the dirty flag");
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_toml_save_of_null_fails_and_keeps_previous_file() {
        // Arrange
        let dir = temp_dir();
        let path = dir.join("settings.toml");
        fs::write(&path, "volume = 2\n").unwrap();
        let mut provider = TomlProvider::new(&path);
        provider.load().unwrap();
        provider.dynamic()["volume"] = Value::Null;

        // Act
        let err = provider.save().unwrap_err();

        // Assert
        assert!(matches!(err, ConfigError::Render(_)));
        assert_eq!(fs::read_to_string(&path).unwrap(), "volume = 2\n");
        assert!(provider.has_changed());
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_store_of_non_object_is_rejected_and_tree_kept() {
        // Arrange
        let mut provider = JsonProvider::new("unused.json");
        provider.replace_document(json!({ "volume": 3 }));
        provider.document.mark_saved();

        // Act
        let err = provider.store(&vec!["SongCore", "BSML"]).unwrap_err();

        // Assert
        assert!(matches!(err, ConfigError::NotAnObject { found: "an array" }));
        assert_eq!(provider.document(), Some(&json!({ "volume": 3 })));
        assert!(!provider.has_changed());
        assert!(matches!(
            provider.store(&Option::<u32>::None),
            Err(ConfigError::NotAnObject { found: "null" })
        ));
    }

    #[test]
    fn test_save_of_non_object_root_fails_and_keeps_previous_file() {
        // Arrange
        let dir = temp_dir();
        let path = dir.join("settings.json");
        fs::write(&path, "{\n  \"volume\": 2\n}\n").unwrap();
        let mut provider = JsonProvider::new(&path);
        provider.load().unwrap();
        *provider.dynamic() = json!(["SongCore", "BSML"]);

        // Act
        let err = provider.save().unwrap_err();

        // Assert
        assert!(matches!(err, ConfigError::Render(_)));
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "{\n  \"volume\": 2\n}\n"
        );
        assert!(provider.has_changed());
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_failed_save_leaves_no_temporary_file() {
        // Arrange: the target is a directory, so the final rename fails after
        // the temporary file was written.
        let dir = temp_dir();
        let path = dir.join("settings.json");
        fs::create_dir_all(path.join("occupied")).unwrap();

        // Act
        let err = write_atomically(&path, "{}\n").unwrap_err();

        // Assert
        assert!(matches!(err, ConfigError::Io { .. }));
        let leftovers: Vec<_> = fs::read_dir(&dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "left behind: {leftovers:?}");
        fs::remove_dir_all(&dir).ok();
    }

    // ── Paths and timestamps ──────────────────────────────────────────────────

    #[test]
    fn test_parent_dir_of_bare_file_name_is_current_dir() {
        assert_eq!(parent_dir(Path::new("settings.cfg")).unwrap(), Path::new("."));
    }

    #[test]
    fn test_parent_dir_of_root_is_an_error() {
        assert!(matches!(
            parent_dir(Path::new("/")),
            Err(ConfigError::NoParentDir { .. })
        ));
    }

    #[test]
    fn test_last_modified_of_missing_file_is_io_error() {
        let provider = JsonProvider::new("/nonexistent/path/that/cannot/exist/settings.json");
        assert!(matches!(
            provider.last_modified(),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn test_last_modified_reads_the_file_system_each_time() {
        // Arrange
        let dir = temp_dir();
        let path = dir.join("settings.json");
        let mut provider = JsonProvider::new(&path);
        provider.save().unwrap();
        let past = SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_000_000);
        fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(past)
            .unwrap();

        // Act / Assert: the provider sees the new mtime without reloading
        assert_eq!(provider.last_modified().unwrap(), past);
        provider.save().unwrap();
        assert!(provider.last_modified().unwrap() > past);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_section_is_a_detached_snapshot() {
        let mut provider = JsonProvider::new("unused.json");
        provider.replace_document(json!({ "audio": { "volume": 4 } }));

        let mut audio = provider.section("/audio").unwrap();
        audio.dynamic()["volume"] = json!(10);

        assert_eq!(audio.parse::<Options>().unwrap().volume, 10);
        assert_eq!(provider.document().unwrap()["audio"]["volume"], json!(4));
        assert!(!audio.is_root());
        assert!(provider.section("/video").is_none());
    }
}
