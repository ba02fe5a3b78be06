//! recsync Core - Reconciliation engine and record model
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain values** - `RecordId`, `RecordVersion`, `Record`, `RecordSet`, `IdSet`, `ChangeSet`
//! - **Use cases** - `ImportService` (load, diff, validate policy, apply, finalize)
//! - **Port definitions** - Traits for adapters: `IDataSource`, `IDataTarget`, `IExpressionEvaluator`
//! - **Wiring** - `Preset`, `FieldMapper`, YAML configuration and preset factories
//!
//! # Architecture
//!
//! This crate follows the hexagonal (ports & adapters) architecture pattern.
//! The domain module contains pure value types with no I/O. Ports define
//! trait interfaces that adapter crates implement. Use cases orchestrate
//! domain values through port interfaces.

pub mod config;
pub mod domain;
pub mod factory;
pub mod mapper;
pub mod options_schema;
pub mod ports;
pub mod preset;
pub mod usecases;

pub use config::{Config, ConfigError, PresetConfig};
pub use factory::{ImportServiceFactory, PresetFactory};
pub use mapper::{FieldMapper, MappingError};
pub use options_schema::{OptionType, Options, OptionsError, OptionsSchema};
pub use preset::{DataProcessor, Preset, PresetOptions};
pub use usecases::{ImportError, ImportService, ImportState, ImportSummary};
