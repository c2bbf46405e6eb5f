// Collection view session: store + filter + sort + selection over a collaborator

use crate::backend::{BulkFailure, BulkOutcome, Collaborator, Patch};
use crate::config::{SelectionPolicy, ViewConfig};
use crate::error::{Error, Result};
use crate::filter::{FilterRule, FilterSpec};
use crate::record::Record;
use crate::selection::Selection;
use crate::sort::SortSpec;
use crate::state::ViewState;
use crate::store::RecordStore;
use crate::view::{Page, Stats, StatsSpec, ViewCache, compute_stats, paginate};
use tracing::{debug, info, warn};

/// Outcome of the most recent load
#[derive(Debug, Clone, PartialEq)]
pub enum LoadState {
    /// Nothing loaded yet
    Idle,
    Loaded { count: usize },
    /// Last load failed; the store still holds the previous records
    Failed { reason: String },
}

/// One admin table: the records, the query over them, and the selection
///
/// The view is derived from the store, filter and sort on demand. The only
/// independent state is the selection.
pub struct CollectionView<R: Record, C: Collaborator<R>> {
    backend: C,
    store: RecordStore<R>,
    filter: FilterSpec,
    sort: Option<SortSpec>,
    selection: Selection,
    policy: SelectionPolicy,
    stats_spec: StatsSpec,
    cache: ViewCache,
    load_state: LoadState,
}

impl<R: Record, C: Collaborator<R>> CollectionView<R, C> {
    pub fn new(backend: C) -> Self {
        Self {
            backend,
            store: RecordStore::new(),
            filter: FilterSpec::new(),
            sort: None,
            selection: Selection::new(),
            policy: SelectionPolicy::default(),
            stats_spec: StatsSpec::new(),
            cache: ViewCache::new(),
            load_state: LoadState::Idle,
        }
    }

    /// Apply default sort and selection policy from config
    pub fn with_config(mut self, config: &ViewConfig) -> Self {
        self.sort = config.default_sort.clone();
        self.policy = config.selection_policy;
        self
    }

    pub fn with_stats(mut self, spec: StatsSpec) -> Self {
        self.stats_spec = spec;
        self
    }

    pub fn with_policy(mut self, policy: SelectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn backend(&self) -> &C {
        &self.backend
    }

    pub fn store(&self) -> &RecordStore<R> {
        &self.store
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load_state
    }

    pub fn filter(&self) -> &FilterSpec {
        &self.filter
    }

    pub fn sort(&self) -> Option<&SortSpec> {
        self.sort.as_ref()
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Reload the full collection from the backend
    ///
    /// On failure the store keeps its previous records and the failure is
    /// recorded in [`LoadState::Failed`].
    pub fn refresh(&mut self) -> Result<usize> {
        let collection = R::collection_name();
        match self.backend.load() {
            Ok(records) => {
                let count = records.len();
                self.store.replace(records);
                self.load_state = LoadState::Loaded { count };
                info!(collection, count, "Collection loaded");
                Ok(count)
            }
            Err(e) => {
                let err = Error::load(collection, &e);
                warn!(collection, error = %e, kept = self.store.len(), "Load failed, keeping previous records");
                self.load_state = LoadState::Failed { reason: err.to_string() };
                Err(err)
            }
        }
    }

    // ========================================================================
    // Query
    // ========================================================================

    /// Replace the whole filter
    pub fn set_filter(&mut self, filter: FilterSpec) {
        self.filter = filter;
        self.after_filter_change();
    }

    /// Set or replace one rule
    pub fn set_rule(&mut self, key: impl Into<String>, rule: FilterRule) {
        self.filter.set(key, rule);
        self.after_filter_change();
    }

    /// Drop one rule
    pub fn clear_rule(&mut self, key: &str) {
        if self.filter.remove(key).is_some() {
            self.after_filter_change();
        }
    }

    pub fn set_sort(&mut self, sort: Option<SortSpec>) {
        self.sort = sort;
    }

    fn after_filter_change(&mut self) {
        if self.policy == SelectionPolicy::IntersectOnFilter && !self.selection.is_empty() {
            let visible = self.view_ids();
            let dropped = self.selection.retain(|id| visible.iter().any(|v| v == id));
            if dropped > 0 {
                debug!(dropped, "Filter change hid selected records, deselected them");
            }
        }
    }

    /// The current filtered and sorted view
    pub fn view(&mut self) -> Vec<&R> {
        let records = self.store.records();
        let indices = self
            .cache
            .indices(self.store.generation(), records, &self.filter, self.sort.as_ref());
        indices.iter().map(|&i| &records[i]).collect()
    }

    pub fn view_ids(&mut self) -> Vec<String> {
        self.view().into_iter().map(|r| r.id().to_string()).collect()
    }

    /// One page of the current view
    pub fn page(&mut self, page: usize, per_page: usize) -> Page<&R> {
        let view = self.view();
        paginate(&view, page, per_page)
    }

    /// Aggregate stats over the full store, regardless of the filter
    pub fn stats(&self) -> Stats {
        compute_stats(self.store.records(), &self.stats_spec)
    }

    pub fn view_state(&self) -> ViewState {
        ViewState {
            filter: self.filter.clone(),
            sort: self.sort.clone(),
        }
    }

    pub fn apply_view_state(&mut self, state: ViewState) {
        self.sort = state.sort;
        self.set_filter(state.filter);
    }

    // ========================================================================
    // Selection
    // ========================================================================

    /// Drop selected ids whose records left the store
    fn prune_selection(&mut self) {
        if self.selection.is_empty() {
            return;
        }
        let store = &self.store;
        let dropped = self.selection.retain(|id| store.contains(id));
        if dropped > 0 {
            debug!(dropped, "Pruned stale ids from selection");
        }
    }

    pub fn toggle(&mut self, id: &str) -> bool {
        self.prune_selection();
        self.selection.toggle(id)
    }

    /// Select exactly the records in the current view
    pub fn select_all_in_view(&mut self) {
        let ids = self.view_ids();
        self.selection.select_all(ids);
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selection.is_selected(id)
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Selected ids that still exist in the store
    pub fn selected_ids(&mut self) -> Vec<String> {
        self.prune_selection();
        self.selection.ids()
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Patch one record through the backend and update the store
    pub fn update(&mut self, id: &str, patch: &Patch) -> Result<R> {
        check_id(id)?;
        match self.backend.mutate(id, patch) {
            Ok(record) => {
                self.store.upsert(record.clone());
                Ok(record)
            }
            Err(e) => {
                warn!(id, error = %e, "Update failed");
                Err(Error::mutation("update", id, &e))
            }
        }
    }

    /// Remove one record through the backend; its id leaves the selection
    pub fn remove(&mut self, id: &str) -> Result<()> {
        check_id(id)?;
        match self.backend.remove(id) {
            Ok(()) => {
                self.store.remove(id);
                self.selection.remove(id);
                Ok(())
            }
            Err(e) => {
                warn!(id, error = %e, "Remove failed");
                Err(Error::mutation("remove", id, &e))
            }
        }
    }

    /// Patch every id; failures are collected, never abort the batch
    pub fn bulk_update(&mut self, ids: &[String], patch: &Patch) -> BulkOutcome<R> {
        let outcome = self.backend.bulk_mutate(ids, patch);
        for record in &outcome.succeeded {
            self.store.upsert(record.clone());
        }
        info!(
            succeeded = outcome.succeeded_count(),
            failed = outcome.failed_count(),
            "Bulk update finished"
        );
        outcome
    }

    /// Remove every id, one call at a time; failures are collected
    pub fn bulk_remove(&mut self, ids: &[String]) -> BulkOutcome<String> {
        let mut outcome = BulkOutcome::default();
        for id in ids {
            match self.backend.remove(id) {
                Ok(()) => {
                    self.store.remove(id);
                    self.selection.remove(id);
                    outcome.succeeded.push(id.clone());
                }
                Err(e) => {
                    warn!(id = %id, error = %e, "Bulk remove failed for record");
                    outcome.failed.push(BulkFailure::new(id, &e));
                }
            }
        }
        info!(
            succeeded = outcome.succeeded_count(),
            failed = outcome.failed_count(),
            "Bulk remove finished"
        );
        outcome
    }

    pub fn bulk_update_selected(&mut self, patch: &Patch) -> BulkOutcome<R> {
        let ids = self.selected_ids();
        self.bulk_update(&ids, patch)
    }

    pub fn bulk_remove_selected(&mut self) -> BulkOutcome<String> {
        let ids = self.selected_ids();
        self.bulk_remove(&ids)
    }
}

fn check_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(Error::validation("record id", "cannot be empty"));
    }
    Ok(())
}
