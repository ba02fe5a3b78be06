//! CLI command implementations

pub mod preset;
pub mod presets;
pub mod prune;
pub mod run;
pub mod setup;

use recsync_core::{Config, ImportServiceFactory, Options};
use serde_json::Value;

use crate::output::{get_formatter, OutputFormat, OutputFormatter};
use crate::registry;

/// State shared by every command
#[derive(Debug)]
pub struct CommandContext {
    pub format: OutputFormat,
    pub quiet: bool,
    pub config: Config,
}

impl CommandContext {
    pub fn formatter(&self) -> Box<dyn OutputFormatter> {
        get_formatter(self.format)
    }

    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    /// Service factory over the loaded configuration
    pub fn services(&self) -> ImportServiceFactory {
        registry::service_factory(self.config.clone())
    }
}

/// Parse a connector option override given as a JSON object
pub fn parse_options(raw: &str) -> Result<Options, String> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(options)) => Ok(options),
        Ok(_) => Err("expected a JSON object".to_string()),
        Err(err) => Err(format!("invalid JSON: {}", err)),
    }
}
