//! Gateway-backed implementation of [`FleetApi`] for real deployments.
//!
//! Paths mirror the server surface one-to-one; filters become query
//! parameters, status transitions become `PUT {"status": ...}` bodies.
//! Authorization and failure normalization live entirely in the gateway.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use crate::error::ApiError;
use crate::query::{FilterSpec, PageRequest, SortDir, SortSpec};
use crate::transport::envelope::Paginated;
use crate::transport::Gateway;
use crate::types::{
    Alert, AlertStatus, CommandStatus, CreateOtaUpdateRequest, CreateRemoteCommandRequest,
    CreateTruckRequest, HealthStatus, LoginResponse, MlEvent, OtaStatus, OtaUpdate, RemoteCommand,
    TelemetryRecord, Truck, UpdateTruckRequest, User,
};

use super::FleetApi;

/// REST-backed implementation of [`FleetApi`].
pub struct RestApi {
    gateway: Arc<Gateway>,
}

/// Payload shape of `GET /auth/validate`.
#[derive(Debug, Deserialize)]
struct ValidatePayload {
    user: User,
}

impl RestApi {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &Arc<Gateway> {
        &self.gateway
    }

    fn list_params(
        filter: &FilterSpec,
        sort: Option<&SortSpec>,
        page: PageRequest,
    ) -> Vec<(String, String)> {
        let mut params = filter.to_query_params();
        params.push(("page".to_string(), page.page.to_string()));
        params.push(("limit".to_string(), page.page_size.to_string()));
        if let Some(sort) = sort {
            params.push(("sort_by".to_string(), sort.field.clone()));
            params.push((
                "order".to_string(),
                match sort.dir {
                    SortDir::Asc => "asc".to_string(),
                    SortDir::Desc => "desc".to_string(),
                },
            ));
        }
        params
    }
}

#[async_trait]
impl FleetApi for RestApi {
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let response: LoginResponse = self
            .gateway
            .post(
                "/auth/login",
                &serde_json::json!({"username": username, "password": password}),
            )
            .await?;
        // The gateway owns the bearer token from here on.
        self.gateway.set_token(response.token.clone());
        Ok(response)
    }

    async fn validate_token(&self) -> Result<User, ApiError> {
        let payload: ValidatePayload = self.gateway.get("/auth/validate", &[]).await?;
        Ok(payload.user)
    }

    async fn list_trucks(
        &self,
        filter: &FilterSpec,
        sort: Option<&SortSpec>,
        page: PageRequest,
    ) -> Result<Paginated<Truck>, ApiError> {
        self.gateway
            .get("/trucks", &Self::list_params(filter, sort, page))
            .await
    }

    async fn get_truck(&self, id: &str) -> Result<Truck, ApiError> {
        self.gateway.get(&format!("/trucks/{id}"), &[]).await
    }

    async fn create_truck(&self, request: CreateTruckRequest) -> Result<Truck, ApiError> {
        self.gateway.post("/trucks", &request).await
    }

    async fn update_truck(
        &self,
        id: &str,
        request: UpdateTruckRequest,
    ) -> Result<Truck, ApiError> {
        self.gateway.put(&format!("/trucks/{id}"), &request).await
    }

    async fn delete_truck(&self, id: &str) -> Result<(), ApiError> {
        self.gateway.delete(&format!("/trucks/{id}")).await
    }

    async fn truck_telemetry(
        &self,
        truck_id: &str,
        filter: &FilterSpec,
        page: PageRequest,
    ) -> Result<Paginated<TelemetryRecord>, ApiError> {
        self.gateway
            .get(
                &format!("/trucks/{truck_id}/telemetry"),
                &Self::list_params(filter, None, page),
            )
            .await
    }

    async fn list_alerts(
        &self,
        filter: &FilterSpec,
        sort: Option<&SortSpec>,
        page: PageRequest,
    ) -> Result<Paginated<Alert>, ApiError> {
        self.gateway
            .get("/alerts", &Self::list_params(filter, sort, page))
            .await
    }

    async fn get_alert(&self, id: &str) -> Result<Alert, ApiError> {
        self.gateway.get(&format!("/alerts/{id}"), &[]).await
    }

    async fn set_alert_status(&self, id: &str, status: AlertStatus) -> Result<Alert, ApiError> {
        self.gateway
            .put(
                &format!("/alerts/{id}"),
                &serde_json::json!({"status": status}),
            )
            .await
    }

    async fn list_ml_events(
        &self,
        filter: &FilterSpec,
        sort: Option<&SortSpec>,
        page: PageRequest,
    ) -> Result<Paginated<MlEvent>, ApiError> {
        self.gateway
            .get("/ml-events", &Self::list_params(filter, sort, page))
            .await
    }

    async fn get_ml_event(&self, id: &str) -> Result<MlEvent, ApiError> {
        self.gateway.get(&format!("/ml-events/{id}"), &[]).await
    }

    async fn list_health(
        &self,
        filter: &FilterSpec,
        sort: Option<&SortSpec>,
        page: PageRequest,
    ) -> Result<Paginated<HealthStatus>, ApiError> {
        self.gateway
            .get("/health", &Self::list_params(filter, sort, page))
            .await
    }

    async fn get_health(&self, id: &str) -> Result<HealthStatus, ApiError> {
        self.gateway.get(&format!("/health/{id}"), &[]).await
    }

    async fn list_ota_updates(
        &self,
        filter: &FilterSpec,
        sort: Option<&SortSpec>,
        page: PageRequest,
    ) -> Result<Paginated<OtaUpdate>, ApiError> {
        self.gateway
            .get("/ota/updates", &Self::list_params(filter, sort, page))
            .await
    }

    async fn create_ota_update(
        &self,
        request: CreateOtaUpdateRequest,
    ) -> Result<OtaUpdate, ApiError> {
        self.gateway.post("/ota/updates", &request).await
    }

    async fn set_ota_status(&self, id: &str, status: OtaStatus) -> Result<OtaUpdate, ApiError> {
        self.gateway
            .put(
                &format!("/ota/updates/{id}"),
                &serde_json::json!({"status": status}),
            )
            .await
    }

    async fn list_remote_commands(
        &self,
        filter: &FilterSpec,
        sort: Option<&SortSpec>,
        page: PageRequest,
    ) -> Result<Paginated<RemoteCommand>, ApiError> {
        self.gateway
            .get("/ota/commands", &Self::list_params(filter, sort, page))
            .await
    }

    async fn create_remote_command(
        &self,
        request: CreateRemoteCommandRequest,
    ) -> Result<RemoteCommand, ApiError> {
        self.gateway.post("/ota/commands", &request).await
    }

    async fn set_command_status(
        &self,
        id: &str,
        status: CommandStatus,
    ) -> Result<RemoteCommand, ApiError> {
        self.gateway
            .put(
                &format!("/ota/commands/{id}"),
                &serde_json::json!({"status": status}),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn list_params_carry_filters_pagination_and_sort() {
        let filter = FilterSpec::new()
            .equals("severity", "Critical")
            .min("cpu_percent", 50.0)
            .date_range("triggered_at", Some(Utc::now()), None);
        let params = RestApi::list_params(
            &filter,
            Some(&SortSpec::desc("triggered_at")),
            PageRequest::new(2, 25),
        );

        let keys: Vec<&str> = params.iter().map(|(k, _)| k.as_str()).collect();
        assert!(keys.contains(&"severity"));
        assert!(keys.contains(&"min_cpu_percent"));
        assert!(keys.contains(&"start_date"));
        assert!(keys.contains(&"page"));
        assert!(keys.contains(&"limit"));
        assert!(keys.contains(&"sort_by"));
        assert!(keys.contains(&"order"));

        let page = params.iter().find(|(k, _)| k == "page").unwrap();
        assert_eq!(page.1, "2");
    }
}
