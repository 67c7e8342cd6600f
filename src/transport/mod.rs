//! Transport gateway: the single choke point for outbound REST calls.
//!
//! Every call attaches the current bearer token when present and carries a
//! fixed timeout. Authorization failures (401) are intercepted here: the
//! stored token is cleared and a process-wide logout signal fires exactly
//! once, so entity controllers never see "unauthenticated" as a data error.

pub mod envelope;

use arc_swap::ArcSwapOption;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::config::ApiConfig;
use crate::error::ApiError;
use envelope::ApiEnvelope;

/// HTTP gateway to the fleet REST surface.
pub struct Gateway {
    http: reqwest::Client,
    base_url: String,
    token: ArcSwapOption<String>,
    logout_tx: watch::Sender<bool>,
}

impl Gateway {
    /// Build a gateway against the configured base URL.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ApiError::Unknown(e.to_string()))?;
        let (logout_tx, _) = watch::channel(false);

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: ArcSwapOption::empty(),
            logout_tx,
        })
    }

    /// Install the bearer token attached to subsequent requests.
    pub fn set_token(&self, token: impl Into<String>) {
        self.token.store(Some(Arc::new(token.into())));
    }

    /// Drop the stored bearer token without firing the logout signal
    /// (explicit user-initiated logout).
    pub fn clear_token(&self) {
        self.token.store(None);
    }

    pub fn has_token(&self) -> bool {
        self.token.load().is_some()
    }

    /// Subscribe to the global logout signal. Fires when a request comes
    /// back 401 while a token was installed.
    pub fn logout_signal(&self) -> watch::Receiver<bool> {
        self.logout_tx.subscribe()
    }

    /// GET a JSON payload.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> Result<T, ApiError> {
        let request = self.http.get(self.url(path)).query(params);
        self.execute(path, request).await
    }

    /// POST a JSON body, returning the JSON payload.
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let request = self.http.post(self.url(path)).json(body);
        self.execute(path, request).await
    }

    /// PUT a JSON body, returning the JSON payload.
    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let request = self.http.put(self.url(path)).json(body);
        self.execute(path, request).await
    }

    /// DELETE, ignoring any payload beyond the envelope itself.
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let request = self.http.delete(self.url(path));
        let _: serde_json::Value = self.execute(path, request).await?;
        Ok(())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        path: &str,
        mut request: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        if let Some(token) = self.token.load_full() {
            request = request.bearer_auth(token.as_str());
        }

        let response = request.send().await.map_err(map_transport_error)?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            self.intercept_unauthorized();
            return Err(ApiError::Unauthorized);
        }

        let body = response.text().await.map_err(map_transport_error)?;
        if !status.is_success() {
            let message = serde_json::from_str::<ApiEnvelope<serde_json::Value>>(&body)
                .ok()
                .map(|e| e.error_text());
            return Err(map_error_status(status, path, message));
        }

        let envelope: ApiEnvelope<T> = serde_json::from_str(&body)
            .map_err(|e| ApiError::Unknown(format!("malformed response for {path}: {e}")))?;
        if !envelope.success {
            return Err(ApiError::Unknown(envelope.error_text()));
        }
        debug!(path, "Request complete");
        envelope
            .data
            .ok_or_else(|| ApiError::Unknown(format!("response for {path} carried no data")))
    }

    /// 401 handling: clear the token and fire the logout signal, but only
    /// when a token was actually installed. Repeated 401s while already
    /// logged out stay silent.
    fn intercept_unauthorized(&self) {
        if self.token.swap(None).is_some() {
            warn!("Authorization failure, clearing session");
            let _ = self.logout_tx.send(true);
        }
    }
}

fn map_transport_error(error: reqwest::Error) -> ApiError {
    if error.is_timeout() {
        ApiError::Timeout
    } else {
        ApiError::Network(error.to_string())
    }
}

/// Map a non-success, non-401 status onto the error taxonomy.
fn map_error_status(status: StatusCode, path: &str, message: Option<String>) -> ApiError {
    match status {
        StatusCode::NOT_FOUND => {
            ApiError::NotFound(message.unwrap_or_else(|| format!("{path} not found")))
        }
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            ApiError::Validation(message.unwrap_or_else(|| "invalid request".to_string()))
        }
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => ApiError::Timeout,
        status => ApiError::Unknown(
            message.unwrap_or_else(|| format!("server returned status {status}")),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;

    fn gateway() -> Gateway {
        Gateway::new(&ApiConfig::default()).unwrap()
    }

    #[test]
    fn status_mapping_covers_the_taxonomy() {
        assert!(matches!(
            map_error_status(StatusCode::NOT_FOUND, "/trucks/x", None),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            map_error_status(StatusCode::BAD_REQUEST, "/trucks", None),
            ApiError::Validation(_)
        ));
        assert!(matches!(
            map_error_status(StatusCode::GATEWAY_TIMEOUT, "/trucks", None),
            ApiError::Timeout
        ));
        assert!(matches!(
            map_error_status(StatusCode::INTERNAL_SERVER_ERROR, "/trucks", None),
            ApiError::Unknown(_)
        ));
    }

    #[test]
    fn unauthorized_interception_fires_logout_exactly_once() {
        let gateway = gateway();
        let mut logout = gateway.logout_signal();
        assert!(!*logout.borrow_and_update());

        gateway.set_token("bearer-abc");
        gateway.intercept_unauthorized();

        assert!(logout.has_changed().unwrap());
        assert!(*logout.borrow_and_update());
        assert!(!gateway.has_token());

        // A second 401 with no token installed stays silent.
        gateway.intercept_unauthorized();
        assert!(!logout.has_changed().unwrap());
    }

    #[test]
    fn explicit_clear_does_not_fire_logout() {
        let gateway = gateway();
        let mut logout = gateway.logout_signal();

        gateway.set_token("bearer-abc");
        gateway.clear_token();

        assert!(!gateway.has_token());
        assert!(!logout.has_changed().unwrap());
    }

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let config = ApiConfig {
            base_url: "http://localhost:8080/api/".into(),
            ..ApiConfig::default()
        };
        let gateway = Gateway::new(&config).unwrap();
        assert_eq!(gateway.url("/trucks"), "http://localhost:8080/api/trucks");
    }
}
