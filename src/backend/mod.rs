// Collaborator boundary: where records are loaded from and mutated through

pub mod jsonl;
pub mod memory;
pub mod rest;

pub use jsonl::JsonlCollaborator;
pub use memory::MemoryCollaborator;
pub use rest::{AuthContext, RestCollaborator};

use crate::record::Record;
use eyre::{Context, Result, eyre};
use serde_json::{Map, Value};
use tracing::warn;

/// Shallow field patch applied to a record
pub type Patch = Map<String, Value>;

/// Backend that owns the records a collection view displays
///
/// Any JSON-over-HTTP, file or in-process source satisfying these
/// operations is conformant.
pub trait Collaborator<R: Record> {
    /// Load the full collection
    fn load(&self) -> Result<Vec<R>>;

    /// Apply `patch` to record `id` and return the updated record
    fn mutate(&self, id: &str, patch: &Patch) -> Result<R>;

    /// Remove record `id`
    fn remove(&self, id: &str) -> Result<()>;

    /// Apply `patch` to every id. One failure never aborts the rest.
    ///
    /// The default issues one `mutate` at a time, in order.
    fn bulk_mutate(&self, ids: &[String], patch: &Patch) -> BulkOutcome<R> {
        let mut outcome = BulkOutcome::default();
        for id in ids {
            match self.mutate(id, patch) {
                Ok(record) => outcome.succeeded.push(record),
                Err(e) => {
                    warn!(id = %id, error = %e, "Bulk mutate failed for record");
                    outcome.failed.push(BulkFailure::new(id, &e));
                }
            }
        }
        outcome
    }
}

/// Result of a bulk action: successes and failures, both reported
#[derive(Debug, Clone, PartialEq)]
pub struct BulkOutcome<T> {
    pub succeeded: Vec<T>,
    pub failed: Vec<BulkFailure>,
}

impl<T> Default for BulkOutcome<T> {
    fn default() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }
}

impl<T> BulkOutcome<T> {
    pub fn succeeded_count(&self) -> usize {
        self.succeeded.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// One failed item of a bulk action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkFailure {
    pub id: String,
    pub reason: String,
}

impl BulkFailure {
    pub fn new(id: &str, report: &eyre::Report) -> Self {
        Self {
            id: id.to_string(),
            reason: format!("{:#}", report),
        }
    }
}

/// Merge `patch` into `record`. The id cannot be changed by a patch.
pub fn apply_patch<R: Record>(record: &R, patch: &Patch) -> Result<R> {
    let mut value = serde_json::to_value(record).context("Failed to serialize record")?;
    let obj = value
        .as_object_mut()
        .ok_or_else(|| eyre!("Record {} does not serialize to an object", record.id()))?;
    for (key, v) in patch {
        obj.insert(key.clone(), v.clone());
    }
    let patched: R = serde_json::from_value(value).context("Patched record does not match its type")?;
    if patched.id() != record.id() {
        return Err(eyre!("Patch cannot change record id {}", record.id()));
    }
    Ok(patched)
}

/// Parse `key=value` pairs into a patch; values are read as JSON when possible
pub fn patch_from_pairs<I, S>(pairs: I) -> Result<Patch>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut patch = Patch::new();
    for pair in pairs {
        let pair = pair.as_ref();
        let (key, raw) = pair
            .split_once('=')
            .ok_or_else(|| eyre!("Expected key=value, got: {}", pair))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(eyre!("Empty key in: {}", pair));
        }
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        patch.insert(key.to_string(), value);
    }
    Ok(patch)
}
