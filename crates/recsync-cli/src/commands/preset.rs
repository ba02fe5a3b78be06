//! Preset command - Show the resolved configuration of a preset
//!
//! The preset is shown with its template merged in, the way it is wired.

use anyhow::{Context, Result};
use clap::Args;

use super::CommandContext;

#[derive(Debug, Args)]
pub struct PresetCommand {
    /// Name of the preset to show
    pub preset: String,
}

impl PresetCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let formatter = ctx.formatter();
        let preset = ctx.config.preset_config(&self.preset)?;

        if ctx.is_json() {
            let json = serde_json::to_value(&preset)
                .context("Failed to serialize preset configuration to JSON")?;
            formatter.print_json(&json);
        } else {
            formatter.success(&format!("Preset \"{}\"", self.preset));
            formatter.info("");
            let yaml = serde_yaml::to_string(&preset)
                .context("Failed to serialize preset configuration to YAML")?;
            for line in yaml.lines() {
                formatter.info(line);
            }
        }
        Ok(())
    }
}
