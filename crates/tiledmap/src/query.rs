//! Shared query state.
//!
//! The query state is owned by the host application and read and written by
//! several unrelated views (search box, filter editor, grid, this map). Every
//! mutation that actually changes something emits [`QueryState::changed`].
//!
//! The map view only ever writes the geometry slot, through
//! [`QueryState::replace_geometry`]; everything else it treats as read-only.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tiledmap_core::logging::targets;
use tiledmap_core::{Property, Signal};

/// A field/term equality filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub term: String,
}

impl Filter {
    pub fn term(field: impl Into<String>, term: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            term: term.into(),
        }
    }
}

/// What a change notification was about.
///
/// Informational only: subscribers must re-read the whole state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryChange {
    Term,
    Filters,
    Geometry,
}

/// An immutable copy of the query state at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuerySnapshot {
    pub q: String,
    pub filters: Vec<Filter>,
    pub geometry: Option<String>,
}

/// The shared, observable query state.
pub struct QueryState {
    q: Property<String>,
    filters: Property<Vec<Filter>>,
    geometry: Property<Option<String>>,
    changed: Arc<Signal<QueryChange>>,
}

impl Default for QueryState {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryState {
    pub fn new() -> Self {
        Self {
            q: Property::new(String::new()),
            filters: Property::new(Vec::new()),
            geometry: Property::new(None),
            changed: Arc::new(Signal::new()),
        }
    }

    /// Build a state pre-populated without emitting anything.
    pub fn with_values(q: impl Into<String>, filters: Vec<Filter>) -> Self {
        let state = Self::new();
        state.q.set_silent(q.into());
        state.filters.set_silent(filters);
        state
    }

    /// The change notification signal.
    pub fn changed(&self) -> &Arc<Signal<QueryChange>> {
        &self.changed
    }

    pub fn q(&self) -> String {
        self.q.get()
    }

    pub fn filters(&self) -> Vec<Filter> {
        self.filters.get()
    }

    pub fn geometry(&self) -> Option<String> {
        self.geometry.get()
    }

    pub fn snapshot(&self) -> QuerySnapshot {
        QuerySnapshot {
            q: self.q.get(),
            filters: self.filters.get(),
            geometry: self.geometry.get(),
        }
    }

    /// Set the free-text term. Returns whether anything changed.
    pub fn set_q(&self, q: impl Into<String>) -> bool {
        let changed = self.q.set(q.into());
        if changed {
            self.notify(QueryChange::Term);
        }
        changed
    }

    /// Replace the whole filter collection.
    pub fn set_filters(&self, filters: Vec<Filter>) -> bool {
        let changed = self.filters.set(filters);
        if changed {
            self.notify(QueryChange::Filters);
        }
        changed
    }

    /// Append a filter unless an identical one is already present.
    pub fn add_filter(&self, filter: Filter) -> bool {
        let changed = self.filters.update(|filters| {
            if filters.contains(&filter) {
                false
            } else {
                filters.push(filter);
                true
            }
        });
        if changed {
            self.notify(QueryChange::Filters);
        }
        changed
    }

    /// Drop every filter on the given field.
    pub fn remove_filters_for(&self, field: &str) -> bool {
        let changed = self.filters.update(|filters| {
            let before = filters.len();
            filters.retain(|filter| filter.field != field);
            filters.len() != before
        });
        if changed {
            self.notify(QueryChange::Filters);
        }
        changed
    }

    pub fn clear_filters(&self) -> bool {
        self.set_filters(Vec::new())
    }

    /// Replace the geometry filter.
    ///
    /// Always notifies: a newly drawn shape is a mutation even when it
    /// encodes to the same text as the previous one.
    pub fn replace_geometry(&self, wkt: Option<String>) {
        self.geometry.set_silent(wkt);
        self.notify(QueryChange::Geometry);
    }

    fn notify(&self, change: QueryChange) {
        tracing::debug!(target: targets::QUERY, ?change, subscribers = self.changed.connection_count(), "query state changed");
        self.changed.emit(change);
    }
}

impl std::fmt::Debug for QueryState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryState")
            .field("q", &self.q.get())
            .field("filters", &self.filters.get())
            .field("geometry", &self.geometry.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn recorder(state: &QueryState) -> Arc<Mutex<Vec<QueryChange>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        state.changed().connect(move |&change| seen_clone.lock().push(change));
        seen
    }

    #[test]
    fn test_only_real_changes_notify() {
        let state = QueryState::new();
        let seen = recorder(&state);

        assert!(state.set_q("lion"));
        assert!(!state.set_q("lion"));
        assert!(state.add_filter(Filter::term("species", "Panthera leo")));
        assert!(!state.add_filter(Filter::term("species", "Panthera leo")));
        assert!(!state.remove_filters_for("country"));
        assert!(state.remove_filters_for("species"));

        assert_eq!(
            *seen.lock(),
            vec![QueryChange::Term, QueryChange::Filters, QueryChange::Filters]
        );
    }

    #[test]
    fn test_geometry_always_notifies() {
        let state = QueryState::new();
        let seen = recorder(&state);

        let wkt = "POLYGON ((0 0, 0 1, 1 1, 0 0))".to_string();
        state.replace_geometry(Some(wkt.clone()));
        state.replace_geometry(Some(wkt.clone()));

        assert_eq!(seen.lock().len(), 2);
        assert_eq!(state.geometry(), Some(wkt));
    }

    #[test]
    fn test_snapshot_equality() {
        let a = QueryState::with_values("lion", vec![Filter::term("country", "Kenya")]);
        let b = QueryState::with_values("lion", vec![Filter::term("country", "Kenya")]);
        assert_eq!(a.snapshot(), b.snapshot());

        b.set_q("tiger");
        assert_ne!(a.snapshot(), b.snapshot());
    }

    #[test]
    fn test_with_values_is_silent() {
        let state = QueryState::with_values("lion", Vec::new());
        assert_eq!(state.changed().emission_count(), 0);
        assert_eq!(state.q(), "lion");
    }

    #[test]
    fn test_other_subscribers_keep_working() {
        let state = QueryState::new();
        let first = recorder(&state);
        let second = recorder(&state);

        state.clear_filters();
        state.set_filters(vec![Filter::term("family", "Felidae")]);

        assert_eq!(*first.lock(), vec![QueryChange::Filters]);
        assert_eq!(*second.lock(), vec![QueryChange::Filters]);
    }
}
