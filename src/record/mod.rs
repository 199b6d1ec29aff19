mod sqlite;
mod state;
mod storage;

pub use sqlite::SqliteRunStore;
pub use state::{RecordStatus, RunRecord, RunSummary};
pub use storage::RunStore;
