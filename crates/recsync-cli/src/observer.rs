//! Console observer printing import progress lines

use recsync_core::domain::{ChangeSet, IdSet, RecordSet};
use recsync_core::ports::IImportObserver;

use crate::output::{get_formatter, OutputFormat, OutputFormatter};

/// Prints one line per import stage
///
/// Record failures are always printed; stage lines are suppressed when
/// `quiet` is set.
pub struct ConsoleObserver {
    formatter: Box<dyn OutputFormatter>,
    quiet: bool,
}

impl ConsoleObserver {
    pub fn new(format: OutputFormat, quiet: bool) -> Self {
        Self {
            formatter: get_formatter(format),
            quiet,
        }
    }

    fn line(&self, message: &str) {
        if !self.quiet {
            self.formatter.info(message);
        }
    }
}

impl IImportObserver for ConsoleObserver {
    fn records_loaded(&self, records: &RecordSet) {
        self.line(&format!("Loaded {} records", records.len()));
    }

    fn changes_computed(&self, changes: &ChangeSet) {
        self.line(&format!(
            "Changes: {} added, {} updated, {} removed",
            changes.added().len(),
            changes.updated().len(),
            changes.removed_ids().len()
        ));
    }

    fn adding_started(&self, records: &RecordSet) {
        self.line(&format!("Adding {} records", records.len()));
    }

    fn updating_started(&self, records: &RecordSet, forced: bool) {
        let suffix = if forced { " (forced)" } else { "" };
        self.line(&format!("Updating {} records{}", records.len(), suffix));
    }

    fn removing_started(&self, ids: &IdSet) {
        self.line(&format!("Removing {} records", ids.len()));
    }

    fn error(&self, message: &str) {
        self.formatter.error(message);
    }
}
