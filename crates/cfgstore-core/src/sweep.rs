//! "Save everything that changed" over a set of providers.
//!
//! Hosting code owns one [`ConfigSet`] and calls [`ConfigSet::save_changed`]
//! periodically or at shutdown.  Deciding what to write is just polling
//! `has_changed()`; no tree is diffed.
//!
//! The set also remembers each file's modification time as of its last load
//! or save, so [`ConfigSet::reload_modified`] can pick up edits another
//! process made on disk.  Providers with unsaved changes are never reloaded,
//! because that would silently drop those changes.
//!
//! Everything runs synchronously on the caller's thread; the set does no
//! locking and spawns nothing.

use std::collections::BTreeMap;
use std::time::SystemTime;

use tracing::{debug, warn};

use crate::provider::{ConfigError, ConfigProvider};

struct Entry {
    provider: Box<dyn ConfigProvider>,
    /// `last_modified()` as observed after the last load or save.
    observed: Option<SystemTime>,
}

impl Entry {
    fn observe(&mut self) {
        self.observed = self.provider.last_modified().ok();
    }
}

/// Result of a sweep: which providers were handled and which failed.
#[derive(Debug, Default)]
pub struct SweepReport {
    /// Names of providers that were saved (or reloaded).
    pub succeeded: Vec<String>,
    /// Names and errors of providers that could not be handled.
    pub failed: Vec<(String, ConfigError)>,
}

impl SweepReport {
    /// `true` when no provider failed.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Named providers owned by one coordinating context.
#[derive(Default)]
pub struct ConfigSet {
    entries: BTreeMap<String, Entry>,
}

impl ConfigSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `provider` under `name`, returning the provider it replaced.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        provider: Box<dyn ConfigProvider>,
    ) -> Option<Box<dyn ConfigProvider>> {
        self.entries
            .insert(
                name.into(),
                Entry {
                    provider,
                    observed: None,
                },
            )
            .map(|entry| entry.provider)
    }

    /// Removes and returns the provider registered under `name`.
    pub fn remove(&mut self, name: &str) -> Option<Box<dyn ConfigProvider>> {
        self.entries.remove(name).map(|entry| entry.provider)
    }

    pub fn get(&self, name: &str) -> Option<&dyn ConfigProvider> {
        self.entries.get(name).map(|entry| entry.provider.as_ref())
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut (dyn ConfigProvider + 'static)> {
        self.entries.get_mut(name).map(|entry| entry.provider.as_mut())
    }

    /// Provider names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Loads every provider and records its modification time.
    ///
    /// # Errors
    ///
    /// Stops at, and returns, the first I/O error.  Corrupt files are
    /// recovered by the providers themselves and do not stop the load.
    pub fn load_all(&mut self) -> Result<(), ConfigError> {
        for (name, entry) in &mut self.entries {
            let outcome = entry.provider.load()?;
            entry.observe();
            debug!(config = %name, ?outcome, "config loaded");
        }
        Ok(())
    }

    /// Saves every root provider whose `has_changed()` is true.
    ///
    /// A failing provider is recorded and logged; the sweep carries on with
    /// the rest.  Nothing is retried.
    pub fn save_changed(&mut self) -> SweepReport {
        let mut report = SweepReport::default();
        for (name, entry) in &mut self.entries {
            if !entry.provider.is_root() || !entry.provider.has_changed() {
                continue;
            }
            match entry.provider.save() {
                Ok(()) => {
                    entry.observe();
                    report.succeeded.push(name.clone());
                }
                Err(e) => {
                    warn!(config = %name, error = %e, "failed to save config");
                    report.failed.push((name.clone(), e));
                }
            }
        }
        report
    }

    /// Reloads clean root providers whose file changed on disk since the set
    /// last loaded or saved it.
    pub fn reload_modified(&mut self) -> SweepReport {
        let mut report = SweepReport::default();
        for (name, entry) in &mut self.entries {
            if !entry.provider.is_root() || entry.provider.has_changed() {
                continue;
            }
            let Ok(current) = entry.provider.last_modified() else {
                continue;
            };
            if entry.observed.is_some_and(|seen| current <= seen) {
                continue;
            }
            match entry.provider.load() {
                Ok(outcome) => {
                    entry.observe();
                    debug!(config = %name, ?outcome, "config reloaded after external change");
                    report.succeeded.push(name.clone());
                }
                Err(e) => {
                    warn!(config = %name, error = %e, "failed to reload config");
                    report.failed.push((name.clone(), e));
                }
            }
        }
        report
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
