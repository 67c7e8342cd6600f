//! Entity controllers: the `{data, loading, error}` state machines behind
//! every dashboard view.
//!
//! Shared machinery lives here; one module per entity kind wraps it with
//! domain verbs. The common protocol for every async verb:
//! set `loading`, clear `error`, round-trip through [`crate::api::FleetApi`],
//! then commit, unless the call is stale (a newer call already finished,
//! last-write-wins) or the owning view was torn down (cancellation token).
//! Failures keep the previous data; only the `error` string changes.
//! `Unauthorized` never lands in `error`; the gateway already handled it.

pub mod alerts;
pub mod health;
pub mod ml_events;
pub mod ota;
pub mod telemetry;
pub mod trucks;

pub use alerts::AlertController;
pub use health::HealthController;
pub use ml_events::MlEventController;
pub use ota::OtaController;
pub use telemetry::TelemetryController;
pub use trucks::TruckController;

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::ApiError;
use crate::store::Entity;
use crate::transport::envelope::Paginated;

/// List-shaped controller state.
#[derive(Debug, Clone)]
pub struct ListState<T> {
    pub items: Vec<T>,
    /// Filtered total from the last successful fetch, before paging.
    pub total: u64,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> Default for ListState<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            loading: false,
            error: None,
        }
    }
}

/// Detail-shaped controller state.
#[derive(Debug, Clone)]
pub struct DetailState<T> {
    pub item: Option<T>,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> Default for DetailState<T> {
    fn default() -> Self {
        Self {
            item: None,
            loading: false,
            error: None,
        }
    }
}

/// Monotonic call sequencing: the latest issued call is the only one
/// allowed to commit its result (last-write-wins, FIFO explicitly not
/// guaranteed).
#[derive(Default)]
pub(crate) struct CallTracker {
    seq: AtomicU64,
}

impl CallTracker {
    fn begin(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, ticket: u64) -> bool {
        self.seq.load(Ordering::SeqCst) == ticket
    }
}

/// Run a list fetch under the shared verb protocol.
pub(crate) async fn run_list_fetch<T, Fut>(
    state: &RwLock<ListState<T>>,
    tracker: &CallTracker,
    cancel: &CancellationToken,
    call: Fut,
) where
    T: Clone,
    Fut: Future<Output = Result<Paginated<T>, ApiError>>,
{
    if cancel.is_cancelled() {
        return;
    }
    let ticket = tracker.begin();
    if let Ok(mut guard) = state.write() {
        guard.loading = true;
        guard.error = None;
    }

    let result = call.await;

    if cancel.is_cancelled() || !tracker.is_current(ticket) {
        debug!(ticket, "Discarding stale list result");
        return;
    }
    let Ok(mut guard) = state.write() else { return };
    match result {
        Ok(page) => {
            guard.items = page.data;
            guard.total = page.total;
            guard.loading = false;
            guard.error = None;
        }
        Err(e) => {
            guard.loading = false;
            if e.is_surfaceable() {
                guard.error = Some(e.to_string());
            }
        }
    }
}

/// Run a detail fetch under the shared verb protocol.
pub(crate) async fn run_detail_fetch<T, Fut>(
    state: &RwLock<DetailState<T>>,
    tracker: &CallTracker,
    cancel: &CancellationToken,
    call: Fut,
) where
    T: Clone,
    Fut: Future<Output = Result<T, ApiError>>,
{
    if cancel.is_cancelled() {
        return;
    }
    let ticket = tracker.begin();
    if let Ok(mut guard) = state.write() {
        guard.loading = true;
        guard.error = None;
    }

    let result = call.await;

    if cancel.is_cancelled() || !tracker.is_current(ticket) {
        debug!(ticket, "Discarding stale detail result");
        return;
    }
    let Ok(mut guard) = state.write() else { return };
    match result {
        Ok(item) => {
            guard.item = Some(item);
            guard.loading = false;
            guard.error = None;
        }
        Err(e) => {
            guard.loading = false;
            if e.is_surfaceable() {
                guard.error = Some(e.to_string());
            }
        }
    }
}

/// Clone-out accessor for list state.
pub(crate) fn snapshot_list<T: Clone>(state: &RwLock<ListState<T>>) -> ListState<T> {
    state.read().map(|s| s.clone()).unwrap_or_default()
}

/// Clone-out accessor for detail state.
pub(crate) fn snapshot_detail<T: Clone>(state: &RwLock<DetailState<T>>) -> DetailState<T> {
    state.read().map(|s| s.clone()).unwrap_or_default()
}

/// Find a record by id in the current list state.
pub(crate) fn find_in_list<T: Entity>(state: &RwLock<ListState<T>>, id: &str) -> Option<T> {
    state
        .read()
        .ok()
        .and_then(|s| s.items.iter().find(|r| r.id() == id).cloned())
}

/// Replace a record in place when present; used by optimistic applies and
/// confirmations of records already on screen.
pub(crate) fn replace_in_list<T: Entity>(state: &RwLock<ListState<T>>, record: &T) {
    if let Ok(mut guard) = state.write() {
        if let Some(slot) = guard.items.iter_mut().find(|r| r.id() == record.id()) {
            *slot = record.clone();
        }
    }
}

/// Merge a record by id, prepending when absent (server pushes show new
/// records first) and bumping the filtered total.
pub(crate) fn merge_into_list<T: Entity>(state: &RwLock<ListState<T>>, record: &T) {
    if let Ok(mut guard) = state.write() {
        match guard.items.iter_mut().find(|r| r.id() == record.id()) {
            Some(slot) => *slot = record.clone(),
            None => {
                guard.items.insert(0, record.clone());
                guard.total += 1;
            }
        }
    }
}

/// Drop a record by id, decrementing the total when it was present.
pub(crate) fn remove_from_list<T: Entity>(state: &RwLock<ListState<T>>, id: &str) {
    if let Ok(mut guard) = state.write() {
        let before = guard.items.len();
        guard.items.retain(|r| r.id() != id);
        if guard.items.len() != before {
            guard.total = guard.total.saturating_sub(1);
        }
    }
}

/// Enter the verb protocol for a mutation: loading on, error cleared.
pub(crate) fn begin_mutation<T>(state: &RwLock<ListState<T>>) {
    if let Ok(mut guard) = state.write() {
        guard.loading = true;
        guard.error = None;
    }
}

/// Leave the verb protocol after a successful mutation.
pub(crate) fn end_mutation<T>(state: &RwLock<ListState<T>>) {
    if let Ok(mut guard) = state.write() {
        guard.loading = false;
    }
}

/// Surface an error on a list state outside the fetch protocol (used by
/// mutation verbs).
pub(crate) fn set_list_error<T>(state: &RwLock<ListState<T>>, error: &ApiError) {
    if let Ok(mut guard) = state.write() {
        guard.loading = false;
        if error.is_surfaceable() {
            guard.error = Some(error.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stale_list_result_is_discarded() {
        let state: RwLock<ListState<crate::types::Truck>> = RwLock::new(ListState::default());
        let tracker = CallTracker::default();
        let cancel = CancellationToken::new();

        run_list_fetch(&state, &tracker, &cancel, async {
            // A newer call starts while this one is still in flight; this
            // result must not commit.
            tracker.begin();
            Ok(Paginated {
                data: Vec::new(),
                total: 99,
                page: 1,
                limit: 10,
            })
        })
        .await;

        assert_eq!(snapshot_list(&state).total, 0);
    }

    #[tokio::test]
    async fn failed_fetch_keeps_previous_items() {
        let state: RwLock<ListState<crate::types::Truck>> = RwLock::new(ListState::default());
        let tracker = CallTracker::default();
        let cancel = CancellationToken::new();

        run_list_fetch(&state, &tracker, &cancel, async {
            Ok(Paginated {
                data: Vec::new(),
                total: 0,
                page: 1,
                limit: 10,
            })
        })
        .await;

        run_list_fetch(&state, &tracker, &cancel, async {
            Err(ApiError::Timeout)
        })
        .await;

        let snapshot = snapshot_list(&state);
        assert!(!snapshot.loading);
        assert_eq!(snapshot.error.as_deref(), Some("request timed out"));
    }

    #[tokio::test]
    async fn unauthorized_never_lands_in_error() {
        let state: RwLock<ListState<crate::types::Truck>> = RwLock::new(ListState::default());
        let tracker = CallTracker::default();
        let cancel = CancellationToken::new();

        run_list_fetch(&state, &tracker, &cancel, async {
            Err(ApiError::Unauthorized)
        })
        .await;

        let snapshot = snapshot_list(&state);
        assert!(snapshot.error.is_none());
        assert!(!snapshot.loading);
    }

    #[tokio::test]
    async fn cancelled_controller_does_not_touch_state() {
        let state: RwLock<ListState<crate::types::Truck>> = RwLock::new(ListState::default());
        let tracker = CallTracker::default();
        let cancel = CancellationToken::new();
        cancel.cancel();

        run_list_fetch(&state, &tracker, &cancel, async {
            Err(ApiError::Timeout)
        })
        .await;

        let snapshot = snapshot_list(&state);
        assert!(!snapshot.loading);
        assert!(snapshot.error.is_none());
    }
}
