//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the domain core
//! depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IDataSource`] - Loads the candidate records of a cycle
//! - [`IDataTarget`] - Local store changes are applied to
//! - [`IExpressionEvaluator`] - Evaluates mapping expressions
//! - [`IImportObserver`] - Lifecycle notifications of the engine
//! - [`IDataSourceFactory`] / [`IDataTargetFactory`] - Build connectors from options

pub mod connector_factory;
pub mod data_source;
pub mod data_target;
pub mod expression;
pub mod observer;

pub use connector_factory::{IDataSourceFactory, IDataTargetFactory};
pub use data_source::IDataSource;
pub use data_target::{ApplyError, ApplyResult, IDataTarget};
pub use expression::IExpressionEvaluator;
pub use observer::{IImportObserver, TracingObserver};
