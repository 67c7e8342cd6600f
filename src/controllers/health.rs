//! Health controller: snapshot history plus live status merges.

use std::sync::{Arc, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::api::FleetApi;
use crate::bus::{EventBus, EventKind, EventMessage, Subscription};
use crate::query::{FilterSpec, PageRequest, SortSpec};
use crate::types::HealthStatus;

use super::{
    merge_into_list, run_detail_fetch, run_list_fetch, snapshot_detail, snapshot_list,
    CallTracker, DetailState, ListState,
};

pub struct HealthController {
    api: Arc<dyn FleetApi>,
    list: RwLock<ListState<HealthStatus>>,
    detail: RwLock<DetailState<HealthStatus>>,
    list_calls: CallTracker,
    detail_calls: CallTracker,
    cancel: CancellationToken,
}

impl HealthController {
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

    pub fn list(&self) -> ListState<HealthStatus> {
        snapshot_list(&self.list)
    }

    pub fn detail(&self) -> DetailState<HealthStatus> {
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
            self.api.list_health(filter, sort, page),
        )
        .await;
    }

    pub async fn fetch_one(&self, id: &str) {
        run_detail_fetch(
            &self.detail,
            &self.detail_calls,
            &self.cancel,
            self.api.get_health(id),
        )
        .await;
    }

    pub fn apply_event(&self, message: &EventMessage) {
        if message.kind != EventKind::HealthStatus {
            return;
        }
        match serde_json::from_value::<HealthStatus>(message.data.clone()) {
            Ok(snapshot) => merge_into_list(&self.list, &snapshot),
            Err(e) => warn!(error = %e, "Ignoring malformed health push"),
        }
    }

    pub fn bind_to_bus(self: &Arc<Self>, bus: &EventBus) -> Subscription {
        let weak = Arc::downgrade(self);
        bus.subscribe(EventKind::HealthStatus, move |message| {
            if let Some(controller) = weak.upgrade() {
                controller.apply_event(message);
            }
        })
    }
}
