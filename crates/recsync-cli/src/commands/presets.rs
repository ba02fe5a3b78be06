//! Presets command - List configured presets

use anyhow::Result;
use clap::Args;

use super::CommandContext;

#[derive(Debug, Args)]
pub struct PresetsCommand {}

impl PresetsCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let formatter = ctx.formatter();
        let names = ctx.config.preset_names();

        if ctx.is_json() {
            formatter.print_json(&serde_json::json!(names));
        } else if names.is_empty() {
            formatter.warn("No presets configured");
        } else {
            formatter.success(&format!("{} presets configured", names.len()));
            for name in &names {
                formatter.info(name);
            }
        }
        Ok(())
    }
}
