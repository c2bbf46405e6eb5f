// JSONL file collaborator: append-only log, last line per id wins

use super::{Collaborator, Patch, apply_patch};
use crate::record::{Record, id_of};
use crate::now_ms;
use eyre::{Context, Result, eyre};
use fs2::FileExt;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Collection stored as one `<collection>.jsonl` file
///
/// Every mutation appends a full record line; removals append a tombstone
/// (`{"id": .., "deleted": true}`). Reading keeps the latest line per id in
/// first-seen order.
#[derive(Debug)]
pub struct JsonlCollaborator<R: Record> {
    path: PathBuf,
    _record: PhantomData<R>,
}

impl<R: Record> JsonlCollaborator<R> {
    /// Use `<dir>/<collection>.jsonl`, creating the directory if needed
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let collection = R::collection_name();
        validate_collection_name(collection)?;
        let dir = dir.as_ref();
        fs::create_dir_all(dir).context("Failed to create collection directory")?;
        Ok(Self::with_file(dir.join(format!("{}.jsonl", collection))))
    }

    /// Use an explicit file path
    pub fn with_file<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            _record: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a new or replacement record
    pub fn insert(&self, record: &R) -> Result<()> {
        validate_id(record.id())?;
        append_jsonl(&self.path, record)
    }

    fn find(&self, id: &str) -> Result<R> {
        self.load()?
            .into_iter()
            .find(|r| r.id() == id)
            .ok_or_else(|| eyre!("Record {} not found", id))
    }
}

impl<R: Record> Collaborator<R> for JsonlCollaborator<R> {
    fn load(&self) -> Result<Vec<R>> {
        let latest = read_jsonl_latest(&self.path)?;
        let mut records = Vec::with_capacity(latest.len());
        for (line_id, value) in latest {
            match serde_json::from_value::<R>(value) {
                Ok(r) => records.push(r),
                Err(e) => {
                    warn!(
                        file = ?self.path,
                        id = %line_id,
                        error = ?e,
                        "Skipping record that doesn't match type"
                    );
                }
            }
        }
        Ok(records)
    }

    fn mutate(&self, id: &str, patch: &Patch) -> Result<R> {
        let current = self.find(id)?;
        let updated = apply_patch(&current, patch)?;
        append_jsonl(&self.path, &updated)?;
        debug!(file = ?self.path, id, fields = patch.len(), "Appended patched record");
        Ok(updated)
    }

    fn remove(&self, id: &str) -> Result<()> {
        self.find(id)?;
        let tombstone = serde_json::json!({
            "id": id,
            "deleted": true,
            "updated_at": now_ms(),
        });
        append_jsonl(&self.path, &tombstone)?;
        debug!(file = ?self.path, id, "Appended tombstone");
        Ok(())
    }
}

/// Append a record to a JSONL file under an exclusive lock
pub fn append_jsonl<T: Serialize>(path: &Path, record: &T) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .context("Failed to open JSONL file for appending")?;

    file.lock_exclusive().context("Failed to acquire file lock")?;

    let json = serde_json::to_string(record)?;
    writeln!(file, "{}", json)?;
    file.sync_all()?; // Ensure data is flushed to disk

    // Lock is released when file is dropped
    Ok(())
}

/// Read all lines, returning the latest value per id in first-seen order
///
/// Lines are keyed by `id` (or `_id`). Tombstones drop the id; a later line
/// brings it back at the end. Unreadable or malformed lines are skipped.
pub fn read_jsonl_latest(path: &Path) -> Result<Vec<(String, Value)>> {
    if !path.exists() {
        // File doesn't exist yet, empty collection
        return Ok(Vec::new());
    }

    let file = File::open(path).context("Failed to open JSONL file")?;
    let reader = BufReader::new(file);
    let mut order: Vec<String> = Vec::new();
    let mut latest: HashMap<String, Value> = HashMap::new();

    for (line_num, line) in reader.lines().enumerate() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                warn!(
                    file = ?path,
                    line = line_num + 1,
                    error = ?e,
                    "Failed to read line, skipping"
                );
                continue;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        let value: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                warn!(
                    file = ?path,
                    line = line_num + 1,
                    error = ?e,
                    "Failed to parse JSON, skipping"
                );
                continue;
            }
        };

        let Some(id) = line_id(&value) else {
            warn!(file = ?path, line = line_num + 1, "Line has no id, skipping");
            continue;
        };

        if value.get("deleted").and_then(Value::as_bool).unwrap_or(false) {
            if latest.remove(&id).is_some() {
                order.retain(|o| o != &id);
            }
            continue;
        }

        if latest.insert(id.clone(), value).is_none() {
            order.push(id);
        }
    }

    info!(file = ?path, count = order.len(), "Loaded latest records from JSONL");

    Ok(order
        .into_iter()
        .filter_map(|id| latest.remove(&id).map(|v| (id, v)))
        .collect())
}

fn line_id(value: &Value) -> Option<String> {
    value.as_object().and_then(id_of)
}

fn validate_collection_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(eyre!("Collection name cannot be empty"));
    }
    if name.len() > 64 {
        return Err(eyre!("Collection name too long: {} (max 64 chars)", name));
    }
    if !name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
        return Err(eyre!(
            "Invalid collection name: {} (must be alphanumeric with _/-)",
            name
        ));
    }
    Ok(())
}

fn validate_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(eyre!("Record ID cannot be empty or whitespace-only"));
    }
    if id.len() > 256 {
        return Err(eyre!("Record ID too long: {} chars (max 256)", id.len()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::patch_from_pairs;
    use crate::models::{Member, MemberStatus};
    use crate::record::JsonRecord;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn member(id: &str, name: &str) -> Member {
        Member {
            id: id.to_string(),
            name: name.to_string(),
            username: name.to_lowercase(),
            email: format!("{}@club.test", name.to_lowercase()),
            role: "member".to_string(),
            status: MemberStatus::Active,
            join_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        }
    }

    #[test]
    fn test_open_uses_collection_file() {
        let temp = TempDir::new().unwrap();
        let backend = JsonlCollaborator::<Member>::open(temp.path().join("data")).unwrap();
        assert!(backend.path().ends_with("data/members.jsonl"));
        assert!(backend.load().unwrap().is_empty());
    }

    #[test]
    fn test_insert_load_keeps_first_seen_order() {
        let temp = TempDir::new().unwrap();
        let backend = JsonlCollaborator::<Member>::open(temp.path()).unwrap();

        backend.insert(&member("m1", "Ann")).unwrap();
        backend.insert(&member("m2", "Ben")).unwrap();
        backend.insert(&member("m1", "Annie")).unwrap();

        let loaded = backend.load().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id, "m1");
        assert_eq!(loaded[0].name, "Annie");
        assert_eq!(loaded[1].id, "m2");
    }

    #[test]
    fn test_mutate_appends_patched_record() {
        let temp = TempDir::new().unwrap();
        let backend = JsonlCollaborator::<Member>::open(temp.path()).unwrap();
        backend.insert(&member("m1", "Ann")).unwrap();

        let patch = patch_from_pairs(["status=suspended"]).unwrap();
        let updated = backend.mutate("m1", &patch).unwrap();
        assert_eq!(updated.status, MemberStatus::Suspended);

        let content = fs::read_to_string(backend.path()).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert_eq!(backend.load().unwrap()[0].status, MemberStatus::Suspended);

        assert!(backend.mutate("missing", &patch).is_err());
    }

    #[test]
    fn test_remove_writes_tombstone() {
        let temp = TempDir::new().unwrap();
        let backend = JsonlCollaborator::<Member>::open(temp.path()).unwrap();
        backend.insert(&member("m1", "Ann")).unwrap();
        backend.insert(&member("m2", "Ben")).unwrap();

        backend.remove("m1").unwrap();
        let loaded = backend.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, "m2");

        let content = fs::read_to_string(backend.path()).unwrap();
        assert!(content.contains("\"deleted\":true"));

        assert!(backend.remove("m1").is_err());
    }

    #[test]
    fn test_insert_rejects_blank_id() {
        let temp = TempDir::new().unwrap();
        let backend = JsonlCollaborator::<Member>::open(temp.path()).unwrap();
        assert!(backend.insert(&member("  ", "Ann")).is_err());
    }

    #[test]
    fn test_read_jsonl_malformed_line() {
        let temp = TempDir::new().unwrap();
        let jsonl_path = temp.path().join("records.jsonl");

        fs::write(
            &jsonl_path,
            r#"{"id":"r1","name":"Valid"}
{malformed json}
{"name":"no id"}
{"_id":7,"name":"Legacy id"}
"#,
        )
        .unwrap();

        let backend = JsonlCollaborator::<JsonRecord>::with_file(&jsonl_path);
        let loaded = backend.load().unwrap();
        let ids: Vec<&str> = loaded.iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["r1", "7"]);
    }

    #[test]
    fn test_records_not_matching_type_are_skipped() {
        let temp = TempDir::new().unwrap();
        let backend = JsonlCollaborator::<Member>::open(temp.path()).unwrap();
        fs::write(backend.path(), "{\"id\":\"x\",\"unexpected\":true}\n").unwrap();
        backend.insert(&member("m1", "Ann")).unwrap();

        let loaded = backend.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, "m1");
    }

    #[test]
    fn test_validate_collection_name() {
        assert!(validate_collection_name("valid_name").is_ok());
        assert!(validate_collection_name("valid-name").is_ok());
        assert!(validate_collection_name("invalid/name").is_err());
        assert!(validate_collection_name("").is_err());
        assert!(validate_collection_name(&"a".repeat(65)).is_err());
    }
}
