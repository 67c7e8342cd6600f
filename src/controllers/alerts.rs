//! Alert controller: list/detail fetches plus the optimistic
//! acknowledge/resolve verbs.

use chrono::Utc;
use std::sync::{Arc, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::api::FleetApi;
use crate::bus::{EventBus, EventKind, EventMessage, Subscription};
use crate::error::ApiError;
use crate::query::{FilterSpec, PageRequest, SortSpec};
use crate::types::{Alert, AlertStatus};

use super::{
    begin_mutation, end_mutation, find_in_list, merge_into_list, replace_in_list,
    run_detail_fetch, run_list_fetch, set_list_error, snapshot_detail, snapshot_list, CallTracker,
    DetailState, ListState,
};

pub struct AlertController {
    api: Arc<dyn FleetApi>,
    list: RwLock<ListState<Alert>>,
    detail: RwLock<DetailState<Alert>>,
    list_calls: CallTracker,
    detail_calls: CallTracker,
    cancel: CancellationToken,
}

impl AlertController {
    pub fn new(api: Arc<dyn FleetApi>) -> Self {
        Self {
            api,
            list: RwLock::new(ListState::default()),
            detail: RwLock::new(DetailState::default()),
            list_calls: CallTracker::default(),
            detail_calls: CallTracker::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn list(&self) -> ListState<Alert> {
        snapshot_list(&self.list)
    }

    pub fn detail(&self) -> DetailState<Alert> {
        snapshot_detail(&self.detail)
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub async fn fetch_list(
        &self,
        filter: &FilterSpec,
        sort: Option<&SortSpec>,
        page: PageRequest,
    ) {
        run_list_fetch(
            &self.list,
            &self.list_calls,
            &self.cancel,
            self.api.list_alerts(filter, sort, page),
        )
        .await;
    }

    pub async fn fetch_one(&self, id: &str) {
        run_detail_fetch(
            &self.detail,
            &self.detail_calls,
            &self.cancel,
            self.api.get_alert(id),
        )
        .await;
    }

    /// Acknowledge an alert, optimistically.
    pub async fn acknowledge(&self, id: &str) -> Option<Alert> {
        self.transition(id, AlertStatus::Acknowledged).await
    }

    /// Resolve an alert, optimistically.
    pub async fn resolve(&self, id: &str) -> Option<Alert> {
        self.transition(id, AlertStatus::Resolved).await
    }

    /// Suppress a triggered alert.
    pub async fn suppress(&self, id: &str) -> Option<Alert> {
        self.transition(id, AlertStatus::Suppressed).await
    }

    /// Optimistic status transition: validate forward-only movement against
    /// the locally known record, apply the new status (and its timestamp)
    /// to in-memory state immediately, then confirm against the backend.
    /// On failure the pre-mutation snapshot is restored; against the local
    /// reference backend this rollback never fires, but any real backend
    /// relies on it.
    async fn transition(&self, id: &str, next: AlertStatus) -> Option<Alert> {
        let snapshot = self.known_record(id);

        if let Some(known) = &snapshot {
            if !known.status.can_advance_to(next) {
                set_list_error(
                    &self.list,
                    &ApiError::Validation(format!(
                        "alert cannot move from {} to {}",
                        known.status, next
                    )),
                );
                return None;
            }
        }

        begin_mutation(&self.list);
        if let Some(known) = &snapshot {
            let mut optimistic = known.clone();
            optimistic.advance(next, Utc::now());
            self.commit(&optimistic);
        }

        let result = self.api.set_alert_status(id, next).await;
        if self.cancel.is_cancelled() {
            return None;
        }
        match result {
            Ok(confirmed) => {
                self.commit(&confirmed);
                end_mutation(&self.list);
                Some(confirmed)
            }
            Err(e) => {
                if let Some(previous) = snapshot {
                    warn!(alert = id, error = %e, "Status transition rejected, rolling back");
                    self.commit(&previous);
                }
                set_list_error(&self.list, &e);
                None
            }
        }
    }

    /// Merge a server-pushed alert into resolved state without a refetch.
    pub fn apply_event(&self, message: &EventMessage) {
        if message.kind != EventKind::Alert {
            return;
        }
        match serde_json::from_value::<Alert>(message.data.clone()) {
            Ok(alert) => merge_into_list(&self.list, &alert),
            Err(e) => warn!(error = %e, "Ignoring malformed alert push"),
        }
    }

    /// Feed this controller from the event bus for its lifetime.
    pub fn bind_to_bus(self: &Arc<Self>, bus: &EventBus) -> Subscription {
        let weak = Arc::downgrade(self);
        bus.subscribe(EventKind::Alert, move |message| {
            if let Some(controller) = weak.upgrade() {
                controller.apply_event(message);
            }
        })
    }

    fn known_record(&self, id: &str) -> Option<Alert> {
        find_in_list(&self.list, id).or_else(|| {
            self.detail
                .read()
                .ok()
                .and_then(|d| d.item.clone())
                .filter(|a| a.id == id)
        })
    }

    fn commit(&self, alert: &Alert) {
        replace_in_list(&self.list, alert);
        if let Ok(mut detail) = self.detail.write() {
            if detail.item.as_ref().map(|a| a.id.as_str()) == Some(alert.id.as_str()) {
                detail.item = Some(alert.clone());
            }
        }
    }
}
