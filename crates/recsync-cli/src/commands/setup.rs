//! Setup command - Check that a preset is ready to run
//!
//! Exits non-zero when the source or the target reports errors or warnings.

use anyhow::{bail, Context, Result};
use clap::Args;

use super::CommandContext;

#[derive(Debug, Args)]
pub struct SetupCommand {
    /// Name of the preset to check
    pub preset: String,
}

impl SetupCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let formatter = ctx.formatter();
        let service = ctx
            .services()
            .create(&self.preset, None, None)
            .with_context(|| format!("Failed to set up preset \"{}\"", self.preset))?;

        let result = service.setup().await;
        formatter.setup_report(&self.preset, &result);

        if result.has_errors() || result.has_warnings() {
            bail!(
                "Setup of preset \"{}\" reported {} errors and {} warnings",
                self.preset,
                result.errors().len(),
                result.warnings().len()
            );
        }
        Ok(())
    }
}
