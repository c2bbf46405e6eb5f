// Persisted view state: {filter, sort} as flat JSON

use crate::filter::FilterSpec;
use crate::sort::SortSpec;
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::warn;

/// The query half of a view, safe to persist between sessions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    #[serde(default)]
    pub filter: FilterSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortSpec>,
}

impl ViewState {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).context("Failed to serialize view state")
    }

    /// Lenient load: unknown keys are ignored, malformed parts are reset
    pub fn from_json_lenient(raw: &str) -> Self {
        let value: Value = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "View state is not valid JSON, resetting");
                return Self::default();
            }
        };
        let Some(obj) = value.as_object() else {
            warn!("View state is not an object, resetting");
            return Self::default();
        };

        let filter = obj.get("filter").map(FilterSpec::from_json_lenient).unwrap_or_default();
        let sort = match obj.get("sort") {
            None | Some(Value::Null) => None,
            Some(raw) => match serde_json::from_value::<SortSpec>(raw.clone()) {
                Ok(s) if !s.field.trim().is_empty() => Some(s),
                Ok(_) => {
                    warn!("Sort state has an empty field, dropping");
                    None
                }
                Err(e) => {
                    warn!(error = %e, "Malformed sort state, dropping");
                    None
                }
            },
        };
        Self { filter, sort }
    }

    /// Load from a file; a missing file yields the default state
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path).with_context(|| format!("Failed to read view state {:?}", path))?;
        Ok(Self::from_json_lenient(&raw))
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.to_json()?).with_context(|| format!("Failed to write view state {:?}", path))
    }
}
