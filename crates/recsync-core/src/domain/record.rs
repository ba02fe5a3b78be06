//! Record domain entity
//!
//! A [`Record`] is one external data item: an id, a version and a bag of
//! named attributes. Attributes are either materialized at construction
//! (eager records) or resolved on first read through a deferred loader
//! (lazy records).
//!
//! ## Lazy materialization
//!
//! ```text
//!     ┌──────────┐   first read   ┌─────────┐    Ok     ┌────────┐
//!     │ Unloaded │ ─────────────► │ Loading │ ────────► │ Loaded │
//!     │ (loader) │                └─────────┘           └────────┘
//!     └──────────┘                     │
//!                                      │ Err
//!                                      ▼
//!                                 ┌────────┐
//!                                 │ Failed │
//!                                 └────────┘
//! ```
//!
//! The transition happens under a lock, so concurrent readers observe a
//! single load. `Loaded` and `Failed` are terminal.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use super::errors::RecordError;
use super::newtypes::{RecordId, RecordVersion};

/// Flat attribute map of a record
pub type Attributes = serde_json::Map<String, Value>;

/// Deferred attribute loader of a lazy record
pub type AttributeLoader = Box<dyn FnOnce() -> anyhow::Result<Attributes> + Send>;

// ============================================================================
// Lazy state
// ============================================================================

enum LazyState {
    Unloaded(AttributeLoader),
    Loading,
    Loaded(Arc<Attributes>),
    Failed(String),
}

struct LazyAttributes {
    state: Mutex<LazyState>,
}

impl LazyAttributes {
    fn new(loader: AttributeLoader) -> Self {
        Self {
            state: Mutex::new(LazyState::Unloaded(loader)),
        }
    }

    fn resolve(&self, id: &RecordId) -> Result<Arc<Attributes>, RecordError> {
        let mut state = self.state.lock();
        match std::mem::replace(&mut *state, LazyState::Loading) {
            LazyState::Loaded(attributes) => {
                *state = LazyState::Loaded(Arc::clone(&attributes));
                Ok(attributes)
            }
            LazyState::Failed(reason) => {
                *state = LazyState::Failed(reason.clone());
                Err(RecordError::LazyLoad {
                    id: id.to_string(),
                    reason,
                })
            }
            // Only observable if a loader panicked while holding the lock
            LazyState::Loading => Err(RecordError::LazyLoad {
                id: id.to_string(),
                reason: "loader did not complete".to_string(),
            }),
            LazyState::Unloaded(loader) => {
                tracing::trace!(record_id = %id, "Materializing lazy record");
                match loader() {
                    Ok(attributes) => {
                        let attributes = Arc::new(attributes);
                        *state = LazyState::Loaded(Arc::clone(&attributes));
                        Ok(attributes)
                    }
                    Err(err) => {
                        let reason = format!("{:#}", err);
                        *state = LazyState::Failed(reason.clone());
                        Err(RecordError::LazyLoad {
                            id: id.to_string(),
                            reason,
                        })
                    }
                }
            }
        }
    }

    fn is_loaded(&self) -> bool {
        matches!(*self.state.lock(), LazyState::Loaded(_))
    }
}

#[derive(Clone)]
enum AttributeSource {
    Eager(Arc<Attributes>),
    Lazy(Arc<LazyAttributes>),
}

// ============================================================================
// Record
// ============================================================================

/// One identified, versioned record
///
/// Records are immutable: the `with_*` methods return a modified copy.
/// Cloning is cheap; clones of a lazy record share its materialization
/// state, so a record held in a change set and the one in the loaded
/// record set load at most once between them.
#[derive(Clone)]
pub struct Record {
    id: RecordId,
    version: RecordVersion,
    data: AttributeSource,
}

impl Record {
    /// Create an eager record without version information
    pub fn new(id: impl Into<RecordId>, attributes: Attributes) -> Self {
        Self::with_version(id, RecordVersion::none(), attributes)
    }

    /// Create an eager record
    pub fn with_version(
        id: impl Into<RecordId>,
        version: RecordVersion,
        attributes: Attributes,
    ) -> Self {
        Self {
            id: id.into(),
            version,
            data: AttributeSource::Eager(Arc::new(attributes)),
        }
    }

    /// Create a lazy record whose attributes are produced by `loader` on first read
    pub fn lazy<F>(id: impl Into<RecordId>, version: RecordVersion, loader: F) -> Self
    where
        F: FnOnce() -> anyhow::Result<Attributes> + Send + 'static,
    {
        Self {
            id: id.into(),
            version,
            data: AttributeSource::Lazy(Arc::new(LazyAttributes::new(Box::new(loader)))),
        }
    }

    /// Record identifier
    pub fn id(&self) -> &RecordId {
        &self.id
    }

    /// Record version
    pub fn version(&self) -> RecordVersion {
        self.version
    }

    /// All attributes of the record, materializing them if necessary
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::LazyLoad`] if the deferred loader failed.
    pub fn attributes(&self) -> Result<Arc<Attributes>, RecordError> {
        match &self.data {
            AttributeSource::Eager(attributes) => Ok(Arc::clone(attributes)),
            AttributeSource::Lazy(lazy) => lazy.resolve(&self.id),
        }
    }

    /// Whether the record carries the named attribute
    pub fn has_attribute(&self, name: &str) -> Result<bool, RecordError> {
        Ok(self.attributes()?.contains_key(name))
    }

    /// Value of the named attribute
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::MissingAttribute`] if the attribute is not set.
    pub fn attribute(&self, name: &str) -> Result<Value, RecordError> {
        self.attributes()?
            .get(name)
            .cloned()
            .ok_or_else(|| RecordError::MissingAttribute {
                id: self.id.to_string(),
                attribute: name.to_string(),
            })
    }

    /// Copy of this record under another id; attributes are shared
    #[must_use]
    pub fn with_id(&self, id: impl Into<RecordId>) -> Self {
        Self {
            id: id.into(),
            version: self.version,
            data: self.data.clone(),
        }
    }

    /// Copy of this record with one attribute added or replaced
    ///
    /// The copy is always eager, so a lazy record is materialized first.
    pub fn with_attribute(&self, name: impl Into<String>, value: Value) -> Result<Self, RecordError> {
        let mut attributes = (*self.attributes()?).clone();
        attributes.insert(name.into(), value);
        Ok(Self::with_version(self.id.clone(), self.version, attributes))
    }

    /// Returns true if attributes are resolved through a deferred loader
    pub fn is_lazy(&self) -> bool {
        matches!(self.data, AttributeSource::Lazy(_))
    }

    /// Returns true if attributes are available without invoking a loader
    pub fn is_loaded(&self) -> bool {
        match &self.data {
            AttributeSource::Eager(_) => true,
            AttributeSource::Lazy(lazy) => lazy.is_loaded(),
        }
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("Record");
        debug.field("id", &self.id).field("version", &self.version);
        match &self.data {
            AttributeSource::Eager(attributes) => debug.field("attributes", attributes),
            AttributeSource::Lazy(_) if self.is_loaded() => debug.field("lazy", &"loaded"),
            AttributeSource::Lazy(_) => debug.field("lazy", &"pending"),
        };
        debug.finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
