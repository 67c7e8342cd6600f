//! ML event controller: inference history with clamped live merges.

use std::sync::{Arc, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::api::FleetApi;
use crate::bus::{EventBus, EventKind, EventMessage, Subscription};
use crate::query::{FilterSpec, PageRequest, SortSpec};
use crate::types::MlEvent;

use super::{
    merge_into_list, run_detail_fetch, run_list_fetch, snapshot_detail, snapshot_list,
    CallTracker, DetailState, ListState,
};

pub struct MlEventController {
    api: Arc<dyn FleetApi>,
    list: RwLock<ListState<MlEvent>>,
    detail: RwLock<DetailState<MlEvent>>,
    list_calls: CallTracker,
    detail_calls: CallTracker,
    cancel: CancellationToken,
}

impl MlEventController {
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

    pub fn list(&self) -> ListState<MlEvent> {
        snapshot_list(&self.list)
    }

    pub fn detail(&self) -> DetailState<MlEvent> {
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
            self.api.list_ml_events(filter, sort, page),
        )
        .await;
    }

    pub async fn fetch_one(&self, id: &str) {
        run_detail_fetch(
            &self.detail,
            &self.detail_calls,
            &self.cancel,
            self.api.get_ml_event(id),
        )
        .await;
    }

    /// Merge a pushed inference event; confidence is clamped at merge time
    /// so out-of-range server values never reach the UI.
    pub fn apply_event(&self, message: &EventMessage) {
        if message.kind != EventKind::MlEvent {
            return;
        }
        match serde_json::from_value::<MlEvent>(message.data.clone()) {
            Ok(mut event) => {
                event.clamp_confidence();
                merge_into_list(&self.list, &event);
            }
            Err(e) => warn!(error = %e, "Ignoring malformed ML event push"),
        }
    }

    pub fn bind_to_bus(self: &Arc<Self>, bus: &EventBus) -> Subscription {
        let weak = Arc::downgrade(self);
        bus.subscribe(EventKind::MlEvent, move |message| {
            if let Some(controller) = weak.upgrade() {
                controller.apply_event(message);
            }
        })
    }
}
