//! Data sources: closures and JSON files
//!
//! [`FileSource`] reads a JSON array of objects. Every object becomes an
//! eager record identified by the configured id attribute:
//!
//! ```json
//! [
//!   {"id": 1, "name": "Chair", "updated_at": "2024-03-01 10:00:00"},
//!   {"id": 2, "name": "Table", "updated_at": "2024-03-02 08:30:00"}
//! ]
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use tracing::debug;

use recsync_core::domain::{Attributes, RecordSet, SetupResult};
use recsync_core::ports::{IDataSource, IDataSourceFactory};
use recsync_core::{OptionType, Options, OptionsSchema};

use crate::string_option;

// ============================================================================
// ClosureSource
// ============================================================================

type Loader = Box<dyn Fn() -> anyhow::Result<RecordSet> + Send + Sync>;

/// Source loading records by invoking a closure
pub struct ClosureSource {
    loader: Loader,
}

impl ClosureSource {
    pub fn new<F>(loader: F) -> Self
    where
        F: Fn() -> anyhow::Result<RecordSet> + Send + Sync + 'static,
    {
        Self {
            loader: Box::new(loader),
        }
    }
}

impl fmt::Debug for ClosureSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClosureSource").finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl IDataSource for ClosureSource {
    async fn load(&self) -> anyhow::Result<RecordSet> {
        (self.loader)()
    }
}

// ============================================================================
// FileSource
// ============================================================================

/// Source reading a JSON array of objects from a file
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    id_attribute: String,
    version_attribute: Option<String>,
}

impl FileSource {
    /// Source reading `path` with records identified by `id`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            id_attribute: "id".to_string(),
            version_attribute: None,
        }
    }

    #[must_use]
    pub fn with_id_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.id_attribute = attribute.into();
        self
    }

    #[must_use]
    pub fn with_version_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.version_attribute = Some(attribute.into());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl IDataSource for FileSource {
    async fn setup(&self) -> SetupResult {
        let mut result = SetupResult::new();
        match tokio::fs::File::open(&self.path).await {
            Ok(_) => result.add_notice(format!("Reading records from {}", self.path.display())),
            Err(err) => result.add_error(format!(
                "File {} is not readable: {}",
                self.path.display(),
                err
            )),
        }
        result
    }

    async fn load(&self) -> anyhow::Result<RecordSet> {
        let content = tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let rows: Vec<Attributes> = serde_json::from_slice(&content).with_context(|| {
            format!(
                "{} does not contain a JSON array of objects",
                self.path.display()
            )
        })?;

        let records = RecordSet::from_raw_rows(
            rows,
            &self.id_attribute,
            self.version_attribute.as_deref(),
        )
        .with_context(|| format!("Invalid record in {}", self.path.display()))?;

        debug!(path = %self.path.display(), count = records.len(), "Records read");
        Ok(records)
    }
}

/// Factory of [`FileSource`]s
///
/// Options: `file_path` (required), `id_attribute` (default `id`) and
/// `version_attribute`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSourceFactory;

impl IDataSourceFactory for FileSourceFactory {
    fn options_schema(&self) -> OptionsSchema {
        OptionsSchema::new()
            .requires("file_path", OptionType::String)
            .has("id_attribute", OptionType::String)
            .has("version_attribute", OptionType::String)
    }

    fn create(&self, options: &Options) -> anyhow::Result<Arc<dyn IDataSource>> {
        let path = string_option(options, "file_path").context("Missing option \"file_path\"")?;
        let mut source = FileSource::new(path);
        if let Some(attribute) = string_option(options, "id_attribute") {
            source = source.with_id_attribute(attribute);
        }
        if let Some(attribute) = string_option(options, "version_attribute") {
            source = source.with_version_attribute(attribute);
        }
        Ok(Arc::new(source))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use recsync_core::domain::{RecordId, RecordVersion};

    use super::*;

    fn write_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[tokio::test]
    async fn test_closure_source() {
        let source = ClosureSource::new(|| Ok(RecordSet::new()));
        assert!(source.load().await.unwrap().is_empty());
        assert!(source.setup().await.is_empty());
    }

    #[tokio::test]
    async fn test_file_source_reads_rows() {
        let file = write_file(
            r#"[{"uid": 7, "tstamp": 1700000000, "name": "a"},
                {"uid": "x", "tstamp": null, "name": "b"}]"#,
        );
        let source = FileSource::new(file.path())
            .with_id_attribute("uid")
            .with_version_attribute("tstamp");

        let records = source.load().await.unwrap();

        assert_eq!(records.len(), 2);
        let first = records.get(&RecordId::new("7")).unwrap();
        assert_eq!(first.version(), RecordVersion::Set(1_700_000_000));
        assert!(records.get(&RecordId::new("x")).unwrap().version().is_not_set());
    }

    #[tokio::test]
    async fn test_file_source_rejects_rows_without_id() {
        let file = write_file(r#"[{"name": "a"}]"#);
        let err = FileSource::new(file.path()).load().await.unwrap_err();
        assert!(err.to_string().starts_with("Invalid record in"));
    }

    #[tokio::test]
    async fn test_file_source_rejects_non_arrays() {
        let file = write_file(r#"{"id": 1}"#);
        let err = FileSource::new(file.path()).load().await.unwrap_err();
        assert!(err.to_string().contains("does not contain a JSON array"));
    }

    #[tokio::test]
    async fn test_setup_reports_readability() {
        let file = write_file("[]");
        let ok = FileSource::new(file.path()).setup().await;
        assert_eq!(ok.notices().len(), 1);
        assert!(!ok.has_errors());

        let missing = FileSource::new("/nonexistent/records.json").setup().await;
        assert!(missing.has_errors());
    }

    #[test]
    fn test_factory_schema_requires_file_path() {
        let schema = FileSourceFactory.options_schema();
        assert!(schema.validate(&Options::new()).is_err());

        let mut options = Options::new();
        options.insert("file_path".to_string(), serde_json::json!("/tmp/x.json"));
        assert!(schema.validate(&options).is_ok());
        assert!(FileSourceFactory.create(&options).is_ok());
    }
}
