//! Run command - Import the records of a preset
//!
//! Provides the `recsync run` CLI command which:
//! 1. Builds the import service of the preset, optionally reading from its
//!    fixture file or with connector option overrides
//! 2. Runs one reconciliation cycle, printing stage lines and record errors
//! 3. Prints the summary of the run

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use recsync_core::ports::TracingObserver;
use recsync_core::Options;

use super::{parse_options, CommandContext};
use crate::observer::ConsoleObserver;

#[derive(Debug, Args)]
pub struct RunCommand {
    /// Name of the preset to run
    pub preset: String,

    /// Update every existing record regardless of its version
    #[arg(long)]
    pub force_updates: bool,

    /// Read from the fixture file configured for the preset
    #[arg(long, conflicts_with = "override_source_options")]
    pub from_fixture: bool,

    /// JSON object merged over the configured source options
    #[arg(long, value_name = "JSON", value_parser = parse_options)]
    pub override_source_options: Option<Options>,

    /// JSON object merged over the configured target options
    #[arg(long, value_name = "JSON", value_parser = parse_options)]
    pub override_target_options: Option<Options>,
}

impl RunCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let formatter = ctx.formatter();
        let mut factory = ctx
            .services()
            .with_observer(Arc::new(ConsoleObserver::new(ctx.format, ctx.quiet)));
        if ctx.is_json() {
            // progress lines are not printed in JSON mode, log them instead
            factory = factory.with_observer(Arc::new(TracingObserver));
        }

        let created = if self.from_fixture {
            factory.create_with_fixture(&self.preset, self.override_target_options.as_ref())
        } else {
            factory.create(
                &self.preset,
                self.override_source_options.as_ref(),
                self.override_target_options.as_ref(),
            )
        };
        let service =
            created.with_context(|| format!("Failed to set up preset \"{}\"", self.preset))?;

        info!(
            preset = %self.preset,
            force_updates = self.force_updates,
            from_fixture = self.from_fixture,
            "Running import"
        );

        let summary = service
            .import_data(self.force_updates)
            .await
            .with_context(|| format!("Import of preset \"{}\" failed", self.preset))?;

        if ctx.is_json() {
            let mut json = serde_json::to_value(&summary).context("Failed to serialize summary")?;
            if let Some(object) = json.as_object_mut() {
                object.insert("preset".to_string(), serde_json::json!(self.preset));
            }
            formatter.print_json(&json);
        } else if !ctx.quiet {
            formatter.success(&format!(
                "Imported preset \"{}\": {} added, {} updated, {} removed, {} errors ({} ms)",
                self.preset,
                summary.added,
                summary.updated,
                summary.removed,
                summary.errors.len(),
                summary.duration_ms
            ));
        }

        Ok(())
    }
}
