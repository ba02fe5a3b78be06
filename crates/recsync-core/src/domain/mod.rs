//! Domain entities and business logic
//!
//! This module contains the core value model of recsync:
//! - Newtypes for record identity and versions
//! - Records (eager and lazily materialized)
//! - Record and id collections with set algebra
//! - The change set and its canonical diff
//! - Readiness reports
//! - Domain-specific error types

pub mod change_set;
pub mod errors;
pub mod id_set;
pub mod newtypes;
pub mod record;
pub mod record_set;
pub mod setup_result;

// Re-export commonly used types
pub use change_set::{ChangeOptions, ChangeSet, LocalSnapshot};
pub use errors::{DomainError, RecordError};
pub use id_set::IdSet;
pub use newtypes::{RecordId, RecordVersion};
pub use record::{AttributeLoader, Attributes, Record};
pub use record_set::RecordSet;
pub use setup_result::SetupResult;
