//! Prune command - Remove every record of a preset's target

use anyhow::{bail, Context, Result};
use clap::Args;
use tracing::warn;

use super::CommandContext;

#[derive(Debug, Args)]
pub struct PruneCommand {
    /// Name of the preset whose target is wiped
    pub preset: String,

    /// Confirm the removal
    #[arg(long)]
    pub yes: bool,
}

impl PruneCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        if !self.yes {
            bail!(
                "Refusing to remove all records of preset \"{}\" without --yes",
                self.preset
            );
        }

        let formatter = ctx.formatter();
        let service = ctx
            .services()
            .create(&self.preset, None, None)
            .with_context(|| format!("Failed to set up preset \"{}\"", self.preset))?;

        warn!(preset = %self.preset, "Removing all records");
        let removed = service
            .remove_all_data()
            .await
            .with_context(|| format!("Failed to prune preset \"{}\"", self.preset))?;

        if ctx.is_json() {
            formatter.print_json(&serde_json::json!({
                "preset": self.preset,
                "removed": removed,
            }));
        } else {
            formatter.success(&format!(
                "Removed {} records of preset \"{}\"",
                removed, self.preset
            ));
        }
        Ok(())
    }
}
