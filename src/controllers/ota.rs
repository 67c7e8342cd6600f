//! OTA controller: update rollouts and remote commands behind one view,
//! mirroring the operations page that shows both.
//!
//! Both collections get the optimistic-transition treatment: the new
//! status lands in memory first, the backend confirms, and a rejection
//! restores the snapshot.

use chrono::Utc;
use std::sync::{Arc, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::api::FleetApi;
use crate::error::ApiError;
use crate::query::{FilterSpec, PageRequest, SortSpec};
use crate::types::{
    CommandStatus, CreateOtaUpdateRequest, CreateRemoteCommandRequest, OtaStatus, OtaUpdate,
    RemoteCommand,
};

use super::{
    begin_mutation, end_mutation, find_in_list, merge_into_list, replace_in_list, run_list_fetch,
    set_list_error, snapshot_list, CallTracker, ListState,
};

pub struct OtaController {
    api: Arc<dyn FleetApi>,
    updates: RwLock<ListState<OtaUpdate>>,
    commands: RwLock<ListState<RemoteCommand>>,
    update_calls: CallTracker,
    command_calls: CallTracker,
    cancel: CancellationToken,
}

impl OtaController {
    pub fn new(api: Arc<dyn FleetApi>) -> Self {
        Self {
            api,
            updates: RwLock::new(ListState::default()),
            commands: RwLock::new(ListState::default()),
            update_calls: CallTracker::default(),
            command_calls: CallTracker::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn updates(&self) -> ListState<OtaUpdate> {
        snapshot_list(&self.updates)
    }

    pub fn commands(&self) -> ListState<RemoteCommand> {
        snapshot_list(&self.commands)
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    // ------------------------------------------------------------------
    // OTA updates
    // ------------------------------------------------------------------

    pub async fn fetch_updates(
        &self,
        filter: &FilterSpec,
        sort: Option<&SortSpec>,
        page: PageRequest,
    ) {
        run_list_fetch(
            &self.updates,
            &self.update_calls,
            &self.cancel,
            self.api.list_ota_updates(filter, sort, page),
        )
        .await;
    }

    pub async fn create_update(&self, request: CreateOtaUpdateRequest) -> Option<OtaUpdate> {
        begin_mutation(&self.updates);
        match self.api.create_ota_update(request).await {
            Ok(update) => {
                if !self.cancel.is_cancelled() {
                    merge_into_list(&self.updates, &update);
                    end_mutation(&self.updates);
                }
                Some(update)
            }
            Err(e) => {
                set_list_error(&self.updates, &e);
                None
            }
        }
    }

    /// Advance an update along its pipeline, optimistically.
    pub async fn advance_update(&self, id: &str, next: OtaStatus) -> Option<OtaUpdate> {
        let snapshot = find_in_list(&self.updates, id);

        if let Some(known) = &snapshot {
            if !known.status.can_advance_to(next) {
                set_list_error(
                    &self.updates,
                    &ApiError::Validation(format!(
                        "OTA update cannot move from {} to {}",
                        known.status, next
                    )),
                );
                return None;
            }
        }

        begin_mutation(&self.updates);
        if let Some(known) = &snapshot {
            let mut optimistic = known.clone();
            optimistic.advance(next, Utc::now());
            replace_in_list(&self.updates, &optimistic);
        }

        let result = self.api.set_ota_status(id, next).await;
        if self.cancel.is_cancelled() {
            return None;
        }
        match result {
            Ok(mut confirmed) => {
                confirmed.clamp_progress();
                replace_in_list(&self.updates, &confirmed);
                end_mutation(&self.updates);
                Some(confirmed)
            }
            Err(e) => {
                if let Some(previous) = snapshot {
                    warn!(update = id, error = %e, "Update transition rejected, rolling back");
                    replace_in_list(&self.updates, &previous);
                }
                set_list_error(&self.updates, &e);
                None
            }
        }
    }

    // ------------------------------------------------------------------
    // Remote commands
    // ------------------------------------------------------------------

    pub async fn fetch_commands(
        &self,
        filter: &FilterSpec,
        sort: Option<&SortSpec>,
        page: PageRequest,
    ) {
        run_list_fetch(
            &self.commands,
            &self.command_calls,
            &self.cancel,
            self.api.list_remote_commands(filter, sort, page),
        )
        .await;
    }

    pub async fn create_command(
        &self,
        request: CreateRemoteCommandRequest,
    ) -> Option<RemoteCommand> {
        begin_mutation(&self.commands);
        match self.api.create_remote_command(request).await {
            Ok(command) => {
                if !self.cancel.is_cancelled() {
                    merge_into_list(&self.commands, &command);
                    end_mutation(&self.commands);
                }
                Some(command)
            }
            Err(e) => {
                set_list_error(&self.commands, &e);
                None
            }
        }
    }

    /// Advance a command, optimistically.
    pub async fn advance_command(&self, id: &str, next: CommandStatus) -> Option<RemoteCommand> {
        let snapshot = find_in_list(&self.commands, id);

        if let Some(known) = &snapshot {
            if !known.status.can_advance_to(next) {
                set_list_error(
                    &self.commands,
                    &ApiError::Validation(format!(
                        "remote command cannot move from {} to {}",
                        known.status.as_str(),
                        next.as_str()
                    )),
                );
                return None;
            }
        }

        begin_mutation(&self.commands);
        if let Some(known) = &snapshot {
            let mut optimistic = known.clone();
            optimistic.advance(next, Utc::now());
            replace_in_list(&self.commands, &optimistic);
        }

        let result = self.api.set_command_status(id, next).await;
        if self.cancel.is_cancelled() {
            return None;
        }
        match result {
            Ok(confirmed) => {
                replace_in_list(&self.commands, &confirmed);
                end_mutation(&self.commands);
                Some(confirmed)
            }
            Err(e) => {
                if let Some(previous) = snapshot {
                    warn!(command = id, error = %e, "Command transition rejected, rolling back");
                    replace_in_list(&self.commands, &previous);
                }
                set_list_error(&self.commands, &e);
                None
            }
        }
    }

    /// Cancel a command that has not finished yet.
    pub async fn cancel_command(&self, id: &str) -> Option<RemoteCommand> {
        self.advance_command(id, CommandStatus::Cancelled).await
    }
}
