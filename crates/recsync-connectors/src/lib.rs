//! recsync Connectors - Reference data sources and targets
//!
//! Provides adapters implementing the ports of `recsync-core`:
//! - Closure and JSON file data sources
//! - In-memory and JSON file data targets with batched writes
//! - A null expression evaluator for plain attribute mappings
//!
//! ## Architecture
//!
//! Every adapter is a driven (secondary) adapter in the hexagonal
//! architecture. Each configurable connector comes with a factory
//! implementing `IDataSourceFactory` or `IDataTargetFactory` so presets can
//! refer to it by name.
//!
//! ## Key Components
//!
//! - [`ClosureSource`] / [`FileSource`] - `IDataSource` implementations
//! - [`MemoryTarget`] / [`JsonFileTarget`] - `IDataTarget` implementations
//! - [`NullExpressionEvaluator`] - `IExpressionEvaluator` without expressions
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use recsync_connectors::{FileSourceFactory, JsonFileTargetFactory, NullExpressionEvaluator};
//! use recsync_core::PresetFactory;
//!
//! let presets = PresetFactory::new(Arc::new(NullExpressionEvaluator))
//!     .with_source_factory("file", Arc::new(FileSourceFactory))
//!     .with_target_factory("json_file", Arc::new(JsonFileTargetFactory))
//!     .with_fixture_source_factory(Arc::new(FileSourceFactory));
//! ```

pub mod evaluator;
pub mod json_file;
pub mod memory;
pub mod source;
mod table;

pub use evaluator::NullExpressionEvaluator;
pub use json_file::{JsonFileTarget, JsonFileTargetFactory};
pub use memory::{MemoryTarget, MemoryTargetFactory};
pub use source::{ClosureSource, FileSource, FileSourceFactory};

/// Errors raised while reading connector options
#[derive(Debug, thiserror::Error)]
pub enum ConnectorError {
    /// An option holds a value the connector cannot use
    #[error("Invalid value for option \"{option}\": {reason}")]
    InvalidOption { option: String, reason: String },
}

/// Default number of buffered writes before a target flushes
pub const DEFAULT_BATCH_SIZE: usize = 100;

pub(crate) fn string_option(
    options: &recsync_core::Options,
    name: &str,
) -> Option<String> {
    options
        .get(name)
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
}

pub(crate) fn batch_size_option(options: &recsync_core::Options) -> Result<usize, ConnectorError> {
    match options.get("batch_size").and_then(serde_json::Value::as_i64) {
        None => Ok(DEFAULT_BATCH_SIZE),
        Some(size) if size > 0 => Ok(size as usize),
        Some(size) => Err(ConnectorError::InvalidOption {
            option: "batch_size".to_string(),
            reason: format!("must be positive, got {}", size),
        }),
    }
}
