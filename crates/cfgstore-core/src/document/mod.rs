//! The tracked in-memory configuration tree.
//!
//! A [`TrackedDocument`] owns the tree and two change flags:
//!
//! - `has_changed` – the tree differs from what was last durably written.
//! - `in_memory_changed` – the tree differs from what the last load produced.
//!   Loading itself sets this flag, because the tree was replaced wholesale
//!   and anyone caching data derived from the old tree must refresh.
//!
//! # Change tracking
//!
//! The tree carries no observers of its own.  Instead, the only way to get a
//! `&mut Value` is through [`DocumentMut`], whose `DerefMut` flips both flags
//! before handing out the reference.  This keeps the dirty-tracking rule in one
//! place: a mutable borrow of the tree *is* a change.  The rule is
//! conservative; a mutable borrow that ends up writing nothing still counts.
//!
//! ```rust
//! use cfgstore_core::TrackedDocument;
//! use serde_json::json;
//!
//! let mut doc = TrackedDocument::from_value(json!({ "volume": 3 }));
//! assert!(!doc.has_changed());
//!
//! doc.edit()["volume"] = json!(5);
//! assert!(doc.has_changed());
//! assert!(doc.in_memory_changed());
//! ```

use std::ops::{Deref, DerefMut};

use serde_json::{Map, Value};

mod pointer;

pub use pointer::PointerError;

static NULL: Value = Value::Null;

/// Returns the empty document: an object with no members.
pub fn empty_tree() -> Value {
    Value::Object(Map::new())
}

/// An in-memory tree plus the flags describing how it relates to disk.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TrackedDocument {
    root: Option<Value>,
    has_changed: bool,
    in_memory_changed: bool,
}

impl TrackedDocument {
    /// Creates a document with no tree yet; both flags are clear.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing tree without marking it changed.
    pub fn from_value(value: Value) -> Self {
        Self {
            root: Some(value),
            has_changed: false,
            in_memory_changed: false,
        }
    }

    /// The live tree, or `None` before the first load or store.
    pub fn root(&self) -> Option<&Value> {
        self.root.as_ref()
    }

    /// Reads the value at a JSON pointer (`""` is the root).
    pub fn get(&self, pointer: &str) -> Option<&Value> {
        self.root.as_ref()?.pointer(pointer)
    }

    pub fn has_changed(&self) -> bool {
        self.has_changed
    }

    pub fn in_memory_changed(&self) -> bool {
        self.in_memory_changed
    }

    /// Lets a caller acknowledge (or re-raise) the in-memory change signal.
    pub fn set_in_memory_changed(&mut self, changed: bool) {
        self.in_memory_changed = changed;
    }

    /// Installs a tree that mirrors the file on disk.
    ///
    /// The tree matches durable storage, so `has_changed` is cleared; its
    /// identity changed, so `in_memory_changed` is set.
    pub fn install_loaded(&mut self, value: Value) {
        self.root = Some(value);
        self.has_changed = false;
        self.in_memory_changed = true;
    }

    /// Replaces the tree wholesale with caller-supplied content.
    pub fn install_stored(&mut self, value: Value) {
        self.root = Some(value);
        self.mark_changed();
    }

    /// Records that the current tree has been durably written.
    pub fn mark_saved(&mut self) {
        self.has_changed = false;
    }

    /// Borrows the tree for mutation.  See the module docs for the tracking rule.
    pub fn edit(&mut self) -> DocumentMut<'_> {
        DocumentMut { doc: self }
    }

    fn mark_changed(&mut self) {
        self.has_changed = true;
        self.in_memory_changed = true;
    }
}

/// Mutable handle to the live tree.
///
/// Reading through the handle (`Deref`) is free; the first mutable access
/// (`DerefMut`, [`set`](Self::set), a successful [`remove`](Self::remove))
/// marks the document changed.  Writing before anything was loaded creates an
/// empty object to write into.
pub struct DocumentMut<'a> {
    doc: &'a mut TrackedDocument,
}

impl DocumentMut<'_> {
    /// Writes `value` at `pointer`, creating intermediate objects as needed.
    ///
    /// Returns the value that was replaced, if any.
    ///
    /// # Errors
    ///
    /// Returns [`PointerError`] if the pointer is malformed, addresses the
    /// root, or runs through a scalar or an invalid array index.
    pub fn set(&mut self, pointer: &str, value: Value) -> Result<Option<Value>, PointerError> {
        let tokens = pointer::tokens(pointer)?;
        if tokens.is_empty() {
            return Err(PointerError::Root);
        }
        pointer::set_at(self, &tokens, value)
    }

    /// Removes the value at `pointer`.  A missing path is not a change.
    ///
    /// # Errors
    ///
    /// Returns [`PointerError`] if the pointer is malformed or addresses the
    /// root.
    pub fn remove(&mut self, pointer: &str) -> Result<Option<Value>, PointerError> {
        if pointer::tokens(pointer)?.is_empty() {
            return Err(PointerError::Root);
        }
        if self.doc.get(pointer).is_none() {
            return Ok(None);
        }
        pointer::remove_at(self, pointer)
    }
}

impl Deref for DocumentMut<'_> {
    type Target = Value;

    fn deref(&self) -> &Value {
        self.doc.root.as_ref().unwrap_or(&NULL)
    }
}

impl DerefMut for DocumentMut<'_> {
    fn deref_mut(&mut self) -> &mut Value {
        self.doc.mark_changed();
        self.doc.root.get_or_insert_with(empty_tree)
    }
}
