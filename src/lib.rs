// clubview - Collection view engine for club administration dashboards

pub mod backend;
pub mod collection;
pub mod config;
pub mod error;
pub mod filter;
pub mod models;
pub mod record;
pub mod selection;
pub mod sort;
pub mod state;
pub mod store;
pub mod view;

// Re-export main types for convenience
pub use backend::{BulkFailure, BulkOutcome, Collaborator, JsonlCollaborator, MemoryCollaborator, Patch, RestCollaborator};
pub use collection::{CollectionView, LoadState};
pub use config::{Config, SelectionPolicy};
pub use error::{Error, Result};
pub use filter::{FilterRule, FilterSpec, Predicate, compile, compile_at};
pub use record::{FieldValue, JsonRecord, Record};
pub use selection::Selection;
pub use sort::{Comparator, SortDirection, SortSpec};
pub use state::ViewState;
pub use store::RecordStore;
pub use view::{Metric, Page, Stats, StatsSpec, compute_stats, compute_view, paginate};

/// Current wall-clock time in Unix milliseconds
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
