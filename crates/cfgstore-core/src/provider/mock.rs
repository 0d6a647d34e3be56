//! In-memory provider for unit testing.
//!
//! Behaves like a file-backed provider without touching disk: the "file" is a
//! shared slot holding the last saved tree and a fake modification time.
//! Tests can make saves fail, simulate an external edit, and count loads and
//! saves.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use serde_json::Value;

use super::{ConfigError, ConfigProvider, LoadOutcome};
use crate::document::{empty_tree, DocumentMut, TrackedDocument};

#[derive(Debug, Default)]
struct Disk {
    content: Option<Value>,
    modified: Option<SystemTime>,
    fail_saves: bool,
    loads: u32,
    saves: u32,
}

/// A mock implementation of [`ConfigProvider`] backed by a shared in-memory
/// "file".
pub struct MockProvider {
    filename: PathBuf,
    document: TrackedDocument,
    disk: Arc<Mutex<Disk>>,
}

/// Test-side handle onto a [`MockProvider`]'s simulated file.
#[derive(Clone)]
pub struct MockDisk {
    disk: Arc<Mutex<Disk>>,
}

impl MockProvider {
    /// Creates a mock provider whose file does not exist yet.
    pub fn new(filename: impl Into<PathBuf>) -> (Self, MockDisk) {
        let disk = Arc::new(Mutex::new(Disk::default()));
        let provider = Self {
            filename: filename.into(),
            document: TrackedDocument::new(),
            disk: Arc::clone(&disk),
        };
        (provider, MockDisk { disk })
    }
}

impl MockDisk {
    /// Replaces the file content as another process would, bumping its mtime.
    pub fn write_externally(&self, content: Value) {
        let mut disk = self.disk.lock().expect("lock poisoned");
        disk.content = Some(content);
        disk.modified = Some(next_mtime(disk.modified));
    }

    /// Makes every subsequent save fail with a permission error.
    pub fn fail_saves(&self, fail: bool) {
        self.disk.lock().expect("lock poisoned").fail_saves = fail;
    }

    /// The last saved (or externally written) content.
    pub fn content(&self) -> Option<Value> {
        self.disk.lock().expect("lock poisoned").content.clone()
    }

    /// Number of completed loads.
    pub fn loads(&self) -> u32 {
        self.disk.lock().expect("lock poisoned").loads
    }

    /// Number of successful saves.
    pub fn saves(&self) -> u32 {
        self.disk.lock().expect("lock poisoned").saves
    }
}

/// Strictly increasing fake timestamps, independent of clock resolution.
fn next_mtime(previous: Option<SystemTime>) -> SystemTime {
    previous.unwrap_or(SystemTime::UNIX_EPOCH) + Duration::from_secs(1)
}

impl ConfigProvider for MockProvider {
    fn format_tag(&self) -> &'static str {
        "mock"
    }

    fn filename(&self) -> Option<&Path> {
        Some(&self.filename)
    }

    fn load(&mut self) -> Result<LoadOutcome, ConfigError> {
        let mut disk = self.disk.lock().expect("lock poisoned");
        disk.loads += 1;
        let (tree, outcome) = match disk.content.clone() {
            Some(tree) => (tree, LoadOutcome::Loaded),
            None => (empty_tree(), LoadOutcome::Missing),
        };
        drop(disk);
        self.document.install_loaded(tree);
        Ok(outcome)
    }

    fn save(&mut self) -> Result<(), ConfigError> {
        let mut disk = self.disk.lock().expect("lock poisoned");
        if disk.fail_saves {
            return Err(ConfigError::Io {
                path: self.filename.clone(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "mock failure"),
            });
        }
        disk.content = Some(self.document.root().cloned().unwrap_or_else(empty_tree));
        disk.modified = Some(next_mtime(disk.modified));
        disk.saves += 1;
        drop(disk);
        self.document.mark_saved();
        Ok(())
    }

    fn render(&self) -> Result<String, ConfigError> {
        Ok(self
            .document
            .root()
            .map(Value::to_string)
            .unwrap_or_else(|| "{}".to_string()))
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
        self.disk
            .lock()
            .expect("lock poisoned")
            .modified
            .ok_or_else(|| ConfigError::Io {
                path: self.filename.clone(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })
    }
}
