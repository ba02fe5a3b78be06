//! Connector factory ports
//!
//! Presets name their source and target by factory. A factory declares the
//! options it accepts and builds the connector from validated options.

use std::sync::Arc;

use crate::mapper::FieldMapper;
use crate::options_schema::{Options, OptionsSchema};

use super::data_source::IDataSource;
use super::data_target::IDataTarget;

/// Port trait for building data sources from configuration
pub trait IDataSourceFactory: Send + Sync {
    /// Options accepted by [`IDataSourceFactory::create`]
    fn options_schema(&self) -> OptionsSchema;

    /// Build a source; `options` have been validated against the schema
    fn create(&self, options: &Options) -> anyhow::Result<Arc<dyn IDataSource>>;
}

/// Port trait for building data targets from configuration
pub trait IDataTargetFactory: Send + Sync {
    /// Options accepted by [`IDataTargetFactory::create`]
    fn options_schema(&self) -> OptionsSchema;

    /// Build a target writing records through `mapper`
    fn create(
        &self,
        mapper: Arc<FieldMapper>,
        options: &Options,
    ) -> anyhow::Result<Arc<dyn IDataTarget>>;
}
