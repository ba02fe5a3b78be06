//! Data source port (driving/primary port)
//!
//! This module defines the interface for loading the external collection of
//! records that a reconciliation cycle synchronizes from. Implementations
//! may read files, query databases or call HTTP endpoints.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because loading failures are adapter-specific.
//! - Sources may return lazy records whose attributes are fetched only when
//!   a record is classified as added or updated.

use crate::domain::{RecordSet, SetupResult};

/// Port trait for loading records
#[async_trait::async_trait]
pub trait IDataSource: Send + Sync {
    /// Readiness checks of the source (file readable, endpoint reachable, ...)
    ///
    /// Must not mutate anything.
    async fn setup(&self) -> SetupResult {
        SetupResult::new()
    }

    /// Load the full candidate record set
    async fn load(&self) -> anyhow::Result<RecordSet>;
}
