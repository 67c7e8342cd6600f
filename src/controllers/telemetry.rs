//! Telemetry controller: per-truck history pages plus live merges from the
//! event bus.

use std::sync::{Arc, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::api::FleetApi;
use crate::bus::{EventBus, EventKind, EventMessage, Subscription};
use crate::config::defaults;
use crate::query::{FilterSpec, PageRequest};
use crate::types::TelemetryRecord;

use super::{
    merge_into_list, run_list_fetch, snapshot_list, CallTracker, ListState,
};

pub struct TelemetryController {
    api: Arc<dyn FleetApi>,
    list: RwLock<ListState<TelemetryRecord>>,
    /// Truck whose history is currently loaded; live pushes for other
    /// trucks are ignored.
    truck_id: RwLock<Option<String>>,
    list_calls: CallTracker,
    cancel: CancellationToken,
}

impl TelemetryController {
    pub fn new(api: Arc<dyn FleetApi>) -> Self {
        Self {
            api,
            list: RwLock::new(ListState::default()),
            truck_id: RwLock::new(None),
            list_calls: CallTracker::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn list(&self) -> ListState<TelemetryRecord> {
        snapshot_list(&self.list)
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Page through one truck's telemetry, newest window by default. The
    /// date range (when any) rides in `filter`.
    pub async fn fetch_for_truck(&self, truck_id: &str, filter: &FilterSpec, page: PageRequest) {
        if let Ok(mut current) = self.truck_id.write() {
            *current = Some(truck_id.to_string());
        }
        run_list_fetch(
            &self.list,
            &self.list_calls,
            &self.cancel,
            self.api.truck_telemetry(truck_id, filter, page),
        )
        .await;
    }

    /// Default page size for telemetry views.
    pub fn default_page() -> PageRequest {
        PageRequest::new(1, defaults::TELEMETRY_PAGE_SIZE)
    }

    /// Merge a pushed sample into the loaded history when it belongs to
    /// the truck on screen.
    pub fn apply_event(&self, message: &EventMessage) {
        if message.kind != EventKind::Telemetry {
            return;
        }
        let record = match serde_json::from_value::<TelemetryRecord>(message.data.clone()) {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "Ignoring malformed telemetry push");
                return;
            }
        };
        let watching = self
            .truck_id
            .read()
            .ok()
            .and_then(|t| t.clone());
        if watching.as_deref() == Some(record.truck_id.as_str()) {
            merge_into_list(&self.list, &record);
        }
    }

    pub fn bind_to_bus(self: &Arc<Self>, bus: &EventBus) -> Subscription {
        let weak = Arc::downgrade(self);
        bus.subscribe(EventKind::Telemetry, move |message| {
            if let Some(controller) = weak.upgrade() {
                controller.apply_event(message);
            }
        })
    }
}
