// Selection tracking for bulk actions

use std::collections::BTreeSet;
use tracing::debug;

/// Set of selected record ids
///
/// Each id is either selected or not; it changes state only through
/// `toggle`, `select_all`, `clear`, and the removal hooks used when records
/// leave the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: BTreeSet<String>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select `id` if absent, deselect it if present.
    /// Returns whether the id is selected afterwards.
    pub fn toggle(&mut self, id: &str) -> bool {
        if self.ids.remove(id) {
            false
        } else {
            self.ids.insert(id.to_string());
            true
        }
    }

    /// Replace the selection with exactly `ids`
    pub fn select_all<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ids = ids.into_iter().map(Into::into).collect();
        debug!(selected = self.ids.len(), "Selection replaced");
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Drop a single id, e.g. after its record was deleted
    pub fn remove(&mut self, id: &str) -> bool {
        self.ids.remove(id)
    }

    /// Keep only ids for which `keep` returns true. Returns how many were dropped.
    pub fn retain<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&str) -> bool,
    {
        let before = self.ids.len();
        self.ids.retain(|id| keep(id));
        before - self.ids.len()
    }

    /// Selected ids in sorted order
    pub fn ids(&self) -> Vec<String> {
        self.ids.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_pair_is_noop() {
        let mut sel = Selection::new();
        assert!(sel.toggle("1"));
        assert!(sel.is_selected("1"));
        assert!(!sel.toggle("1"));
        assert!(!sel.is_selected("1"));
        assert!(sel.is_empty());
    }

    #[test]
    fn test_select_all_replaces() {
        let mut sel = Selection::new();
        sel.select_all(["1", "2", "3"]);
        sel.select_all(["3", "4"]);
        assert_eq!(sel.ids(), vec!["3", "4"]);
        assert!(!sel.is_selected("1"));
    }

    #[test]
    fn test_clear() {
        let mut sel = Selection::new();
        sel.select_all(["a", "b"]);
        sel.clear();
        assert!(sel.is_empty());
        assert_eq!(sel.len(), 0);
    }

    #[test]
    fn test_remove_and_retain() {
        let mut sel = Selection::new();
        sel.select_all(["1", "2", "3"]);
        assert!(sel.remove("1"));
        assert!(!sel.remove("1"));

        let dropped = sel.retain(|id| id != "3");
        assert_eq!(dropped, 1);
        assert_eq!(sel.iter().collect::<Vec<_>>(), vec!["2"]);
    }
}
