//! JsonFileTarget - IDataTarget persisting rows to a JSON file
//!
//! The file holds one JSON object keyed by record id; each value is the
//! mapped row. A missing file is an empty table. Every flush rewrites the
//! whole file, so its content always reflects the flushed state.
//!
//! Flushes write a sibling temporary file and rename it over the target, so
//! an interrupted flush leaves the previous content in place. The file is
//! re-read at the start of every cycle.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use recsync_core::domain::{Attributes, LocalSnapshot, Record, RecordId, SetupResult};
use recsync_core::ports::{ApplyError, ApplyResult, IDataTarget, IDataTargetFactory};
use recsync_core::{FieldMapper, OptionType, Options, OptionsSchema};

use crate::table::RowTable;
use crate::{batch_size_option, string_option, DEFAULT_BATCH_SIZE};

/// Data target writing to a JSON file
#[derive(Debug)]
pub struct JsonFileTarget {
    path: PathBuf,
    mapper: Arc<FieldMapper>,
    table: Mutex<RowTable>,
    loaded: OnceCell<()>,
}

impl JsonFileTarget {
    pub fn new(path: impl Into<PathBuf>, mapper: Arc<FieldMapper>) -> Self {
        Self {
            path: path.into(),
            mapper,
            table: Mutex::new(RowTable::new(DEFAULT_BATCH_SIZE, None)),
            loaded: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn with_version_column(self, column: impl Into<String>) -> Self {
        self.table.lock().set_version_column(Some(column.into()));
        self
    }

    #[must_use]
    pub fn with_batch_size(self, batch_size: usize) -> Self {
        self.table.lock().set_batch_size(batch_size);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file into the table once
    async fn ensure_loaded(&self) -> anyhow::Result<()> {
        self.loaded
            .get_or_try_init(|| async {
                let rows = read_rows(&self.path).await?;
                debug!(path = %self.path.display(), rows = rows.len(), "Target file loaded");
                self.table.lock().replace_rows(rows);
                Ok::<(), anyhow::Error>(())
            })
            .await?;
        Ok(())
    }

    async fn write(&self, content: Value) -> anyhow::Result<()> {
        let bytes = serde_json::to_vec_pretty(&content)?;
        let staging = staging_path(&self.path);
        tokio::fs::write(&staging, bytes)
            .await
            .with_context(|| format!("Failed to write {}", staging.display()))?;
        tokio::fs::rename(&staging, &self.path)
            .await
            .with_context(|| format!("Failed to replace {}", self.path.display()))
    }

    /// Flush pending writes to disk if `due`
    async fn flush_if(&self, due: bool) -> anyhow::Result<()> {
        if !due {
            return Ok(());
        }
        let content = {
            let mut table = self.table.lock();
            if !table.flush() {
                return Ok(());
            }
            table.to_json()
        };
        self.write(content).await?;
        debug!(path = %self.path.display(), "Batch flushed");
        Ok(())
    }

    async fn stage<F>(&self, operation: F) -> ApplyResult
    where
        F: FnOnce(&mut RowTable) -> Result<bool, ApplyError> + Send,
    {
        self.ensure_loaded().await?;
        let due = {
            let mut table = self.table.lock();
            operation(&mut table)?
        };
        self.flush_if(due).await?;
        Ok(())
    }
}

/// Sibling file flushes are written to before replacing `path`
fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

async fn read_rows(path: &Path) -> anyhow::Result<BTreeMap<RecordId, Attributes>> {
    let content = match tokio::fs::read(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(err) => {
            return Err(err).with_context(|| format!("Failed to read {}", path.display()));
        }
    };

    let table: serde_json::Map<String, Value> = serde_json::from_slice(&content)
        .with_context(|| format!("{} does not contain a JSON object", path.display()))?;
    table
        .into_iter()
        .map(|(id, row)| match row {
            Value::Object(row) => Ok((RecordId::new(id), row)),
            _ => anyhow::bail!("Row {} in {} is not an object", id, path.display()),
        })
        .collect()
}

#[async_trait::async_trait]
impl IDataTarget for JsonFileTarget {
    async fn setup(&self) -> SetupResult {
        let mut result = SetupResult::new();
        match read_rows(&self.path).await {
            Ok(rows) if rows.is_empty() => result.add_notice(format!(
                "{} is empty or will be created",
                self.path.display()
            )),
            Ok(rows) => result.add_notice(format!(
                "{} holds {} rows",
                self.path.display(),
                rows.len()
            )),
            Err(err) => result.add_error(format!("{:#}", err)),
        }

        let parent = self.path.parent().filter(|p| !p.as_os_str().is_empty());
        if let Some(parent) = parent {
            if tokio::fs::metadata(parent).await.is_err() {
                result.add_error(format!("Directory {} does not exist", parent.display()));
            }
        }
        result
    }

    async fn begin_cycle(&self) -> anyhow::Result<()> {
        let rows = read_rows(&self.path).await?;
        let dropped = {
            let mut table = self.table.lock();
            let dropped = table.begin_cycle();
            table.replace_rows(rows);
            dropped
        };
        // a set cell only means the table was already loaded
        let _ = self.loaded.set(());
        if dropped > 0 {
            warn!(path = %self.path.display(), dropped, "Discarded writes left unflushed by an earlier run");
        }
        debug!(path = %self.path.display(), "Target file reloaded");
        Ok(())
    }

    async fn local_snapshot(&self) -> anyhow::Result<LocalSnapshot> {
        self.ensure_loaded().await?;
        let mut table = self.table.lock();
        table
            .snapshot()
            .with_context(|| format!("Invalid version in {}", self.path.display()))
    }

    async fn add_record(&self, record: &Record) -> ApplyResult {
        let mapper = Arc::clone(&self.mapper);
        self.stage(|table| {
            let row = table.row_for(&mapper, record)?;
            table.add(record.id(), row)
        })
        .await
    }

    async fn update_record(&self, record: &Record) -> ApplyResult {
        let mapper = Arc::clone(&self.mapper);
        self.stage(|table| {
            let row = table.row_for(&mapper, record)?;
            table.update(record.id(), row)
        })
        .await
    }

    async fn remove_record(&self, id: &RecordId) -> ApplyResult {
        self.stage(|table| table.remove(id)).await
    }

    async fn remove_all(&self) -> anyhow::Result<u64> {
        self.ensure_loaded().await?;
        let (removed, content) = {
            let mut table = self.table.lock();
            let removed = table.clear();
            (removed, table.to_json())
        };
        self.write(content).await?;
        info!(path = %self.path.display(), removed, "Target file cleared");
        Ok(removed)
    }

    async fn finalize(&self) -> anyhow::Result<()> {
        self.flush_if(true).await?;
        self.table.lock().invalidate_snapshot();
        Ok(())
    }
}

/// Factory of [`JsonFileTarget`]s
///
/// Options: `file_path` (required), `version_column` and `batch_size`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFileTargetFactory;

impl IDataTargetFactory for JsonFileTargetFactory {
    fn options_schema(&self) -> OptionsSchema {
        OptionsSchema::new()
            .requires("file_path", OptionType::String)
            .has("version_column", OptionType::String)
            .has("batch_size", OptionType::Integer)
    }

    fn create(
        &self,
        mapper: Arc<FieldMapper>,
        options: &Options,
    ) -> anyhow::Result<Arc<dyn IDataTarget>> {
        let path = string_option(options, "file_path").context("Missing option \"file_path\"")?;
        let mut target =
            JsonFileTarget::new(path, mapper).with_batch_size(batch_size_option(options)?);
        if let Some(column) = string_option(options, "version_column") {
            target = target.with_version_column(column);
        }
        Ok(Arc::new(target))
    }
}
