use anyhow::Result;
use async_trait::async_trait;

use super::{RecordStatus, RunRecord, RunSummary};

/// Storage backend for run records
#[async_trait]
pub trait RunStore: Send + Sync {
    /// Save a record, replacing any with the same ID
    async fn save(&self, record: &RunRecord) -> Result<()>;

    /// Load a record by ID
    async fn load(&self, id: &str) -> Result<Option<RunRecord>>;

    /// List records, newest first (summaries, not transcripts)
    async fn list(&self, status: Option<RecordStatus>) -> Result<Vec<RunSummary>>;

    /// Delete a record
    async fn delete(&self, id: &str) -> Result<()>;
}
