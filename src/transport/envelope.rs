//! Response envelope shared by every REST endpoint.
//!
//! Every response is wrapped as `{ data, success, message?, error? }`;
//! list endpoints wrap their payload additionally as
//! `{ data: [...], total, page, limit }`.

use serde::{Deserialize, Serialize};

/// Uniform response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub data: Option<T>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiEnvelope<T> {
    /// Wrap a successful payload.
    pub fn ok(data: T) -> Self {
        Self {
            data: Some(data),
            success: true,
            message: None,
            error: None,
        }
    }

    /// The error text to surface for a failed envelope.
    pub fn error_text(&self) -> String {
        self.error
            .clone()
            .or_else(|| self.message.clone())
            .unwrap_or_else(|| "request failed".to_string())
    }
}

/// List payload: one page of records plus the pre-paging total.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    /// Count after filtering, before paging.
    pub total: u64,
    /// 1-indexed page number this slice came from.
    pub page: u64,
    pub limit: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_round_trips_success_shape() {
        let envelope = ApiEnvelope::ok(serde_json::json!({"hello": "world"}));
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["success"], true);
        assert!(json.get("error").is_none());
        assert_eq!(json["data"]["hello"], "world");
    }

    #[test]
    fn envelope_error_text_prefers_error_over_message() {
        let envelope: ApiEnvelope<()> = ApiEnvelope {
            data: None,
            success: false,
            message: Some("context".into()),
            error: Some("boom".into()),
        };
        assert_eq!(envelope.error_text(), "boom");

        let envelope: ApiEnvelope<()> = ApiEnvelope {
            data: None,
            success: false,
            message: Some("context".into()),
            error: None,
        };
        assert_eq!(envelope.error_text(), "context");
    }

    #[test]
    fn paginated_deserializes_wire_shape() {
        let raw = r#"{"data":[1,2,3],"total":23,"page":2,"limit":10}"#;
        let page: Paginated<u32> = serde_json::from_str(raw).unwrap();
        assert_eq!(page.data, vec![1, 2, 3]);
        assert_eq!(page.total, 23);
        assert_eq!(page.page, 2);
    }
}
