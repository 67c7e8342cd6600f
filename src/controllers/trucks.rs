//! Truck controller: registry CRUD plus list/detail fetches.

use std::sync::{Arc, RwLock};
use tokio_util::sync::CancellationToken;

use crate::api::FleetApi;
use crate::query::{FilterSpec, PageRequest, SortSpec};
use crate::types::{CreateTruckRequest, Truck, UpdateTruckRequest};

use super::{
    begin_mutation, end_mutation, find_in_list, merge_into_list, remove_from_list,
    replace_in_list, run_detail_fetch, run_list_fetch, set_list_error, snapshot_detail,
    snapshot_list, CallTracker, DetailState, ListState,
};

pub struct TruckController {
    api: Arc<dyn FleetApi>,
    list: RwLock<ListState<Truck>>,
    detail: RwLock<DetailState<Truck>>,
    list_calls: CallTracker,
    detail_calls: CallTracker,
    cancel: CancellationToken,
}

impl TruckController {
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

    /// Current list state (cloned snapshot).
    pub fn list(&self) -> ListState<Truck> {
        snapshot_list(&self.list)
    }

    /// Current detail state (cloned snapshot).
    pub fn detail(&self) -> DetailState<Truck> {
        snapshot_detail(&self.detail)
    }

    /// Tear down: in-flight results are no longer applied.
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
            self.api.list_trucks(filter, sort, page),
        )
        .await;
    }

    pub async fn fetch_one(&self, id: &str) {
        run_detail_fetch(
            &self.detail,
            &self.detail_calls,
            &self.cancel,
            self.api.get_truck(id),
        )
        .await;
    }

    /// Create a truck; the new record is shown first in the list.
    pub async fn create(&self, request: CreateTruckRequest) -> Option<Truck> {
        begin_mutation(&self.list);
        match self.api.create_truck(request).await {
            Ok(truck) => {
                if !self.cancel.is_cancelled() {
                    merge_into_list(&self.list, &truck);
                    end_mutation(&self.list);
                }
                Some(truck)
            }
            Err(e) => {
                set_list_error(&self.list, &e);
                None
            }
        }
    }

    pub async fn update(&self, id: &str, request: UpdateTruckRequest) -> Option<Truck> {
        begin_mutation(&self.list);
        match self.api.update_truck(id, request).await {
            Ok(truck) => {
                if !self.cancel.is_cancelled() {
                    replace_in_list(&self.list, &truck);
                    if let Ok(mut detail) = self.detail.write() {
                        if detail.item.as_ref().map(|t| t.id.as_str()) == Some(id) {
                            detail.item = Some(truck.clone());
                        }
                    }
                    end_mutation(&self.list);
                }
                Some(truck)
            }
            Err(e) => {
                set_list_error(&self.list, &e);
                None
            }
        }
    }

    pub async fn delete(&self, id: &str) -> bool {
        begin_mutation(&self.list);
        match self.api.delete_truck(id).await {
            Ok(()) => {
                if !self.cancel.is_cancelled() {
                    remove_from_list(&self.list, id);
                    if let Ok(mut detail) = self.detail.write() {
                        if detail.item.as_ref().map(|t| t.id.as_str()) == Some(id) {
                            detail.item = None;
                        }
                    }
                    end_mutation(&self.list);
                }
                true
            }
            Err(e) => {
                set_list_error(&self.list, &e);
                false
            }
        }
    }

    /// Whether a given truck id is currently known to this controller.
    pub fn contains(&self, id: &str) -> bool {
        find_in_list(&self.list, id).is_some()
    }
}
