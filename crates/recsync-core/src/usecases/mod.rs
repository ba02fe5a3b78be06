//! Use cases (interactors) for recsync
//!
//! This module contains the application use cases that orchestrate
//! domain values and port interfaces.
//!
//! ## Use Cases
//!
//! - [`ImportService`] - Reconciliation cycle of a preset, full wipe, setup checks

pub mod import_data;

pub use import_data::{ImportError, ImportService, ImportState, ImportSummary, Operation, SkipPolicy};
