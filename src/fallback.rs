//! Console test helper: resend a failed listing through the bypass endpoint.
//!
//! Offered only after a 500 that points at a foreign key violation. The
//! request goes to `{api_base}/create?console_test=1` with no Authorization
//! header. This is an escape hatch for a known backend integrity gap, not a
//! retry policy.

use metrics::counter;

use crate::domain::payload::ListingPayload;
use crate::domain::submission::{Attempt, AttemptId, Failed, FailureReason, classify_response};
use crate::http::{ApiRequest, HttpClient, HttpResponse};

/// The helper's action control.
#[derive(Debug, Clone)]
pub struct ConsoleTestHelper {
    offered_by: AttemptId,
    payload: ListingPayload,
    enabled: bool,
}

impl ConsoleTestHelper {
    /// Helper for a failed attempt, if its failure qualifies.
    pub fn offer(attempt: &Attempt<Failed>) -> Option<Self> {
        attempt
            .state
            .reason
            .offers_console_test()
            .then(|| Self {
                offered_by: attempt.id,
                payload: attempt.state.payload.clone(),
                enabled: true,
            })
    }

    pub fn offered_by(&self) -> AttemptId {
        self.offered_by
    }

    pub fn payload(&self) -> &ListingPayload {
        &self.payload
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Send the stored payload to the bypass endpoint, without credentials.
    pub async fn send<H: HttpClient + ?Sized>(
        &self,
        http_client: &H,
        endpoint: &str,
        path: &str,
        timeout_ms: u64,
    ) -> Result<HttpResponse, FailureReason> {
        let body = self
            .payload
            .to_json()
            .map_err(|e| FailureReason::InvalidPayload {
                error: e.to_string(),
            })?;
        let request = ApiRequest::post_json(endpoint, path, body);

        tracing::info!(attempt_id = %self.offered_by, path = %path, "Sending console test listing");

        let result = match http_client.execute(&request, "", timeout_ms).await {
            Ok(response) => classify_response(&response).map(|()| response),
            Err(e) => Err(FailureReason::NetworkError {
                error: e.to_string(),
            }),
        };

        let outcome = match &result {
            Ok(_) => "success",
            Err(reason) => reason.label(),
        };
        counter!("listing_console_tests_total", "outcome" => outcome).increment(1);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::submission::ServerMessage;
    use crate::http::MockHttpClient;
    use serde_json::json;

    fn failed(reason: FailureReason) -> Attempt<Failed> {
        let now = chrono::Utc::now();
        Attempt {
            id: AttemptId::new(),
            state: Failed {
                reason,
                payload: serde_json::from_value(json!({
                    "seller_id": 1, "uid": "ABC123", "title": "t", "description": "",
                    "rank": "", "level": 80, "mythic_count": 0, "legendary_count": 0,
                    "xsuit_count": 0, "gilt_count": 0, "honor_gilt_set": 0,
                    "upgradable_guns": 0, "rare_glider": 0, "vehicle_skin": 0,
                    "special_titles": 0, "images": ["ph"]
                }))
                .unwrap(),
                started_at: now,
                failed_at: now,
            },
        }
    }

    fn foreign_key_failure() -> FailureReason {
        FailureReason::ServerError {
            body: ServerMessage {
                details: Some("violates foreign key constraint".to_string()),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_offer_requires_foreign_key_failure() {
        assert!(ConsoleTestHelper::offer(&failed(foreign_key_failure())).is_some());
        assert!(
            ConsoleTestHelper::offer(&failed(FailureReason::NetworkError {
                error: "refused".to_string()
            }))
            .is_none()
        );
    }

    #[tokio::test]
    async fn test_send_omits_bearer() {
        let mock = MockHttpClient::new();
        mock.add_json_response("POST /create?console_test=1", 200, json!({"ok": true}));

        let helper = ConsoleTestHelper::offer(&failed(foreign_key_failure())).unwrap();
        let response = helper
            .send(&mock, "https://api.example.com", "/create?console_test=1", 1000)
            .await
            .unwrap();
        assert_eq!(response.status, 200);

        let calls = mock.get_calls();
        assert_eq!(calls.len(), 1);
        assert!(!calls[0].has_authorization());
        assert_eq!(calls[0].json()["level"], json!(80));
    }

    #[tokio::test]
    async fn test_send_failure_is_reported() {
        let mock = MockHttpClient::new();
        mock.add_json_response("POST /create?console_test=1", 500, json!({"error": "still broken"}));

        let helper = ConsoleTestHelper::offer(&failed(foreign_key_failure())).unwrap();
        let result = helper
            .send(&mock, "https://api.example.com", "/create?console_test=1", 1000)
            .await;
        assert!(matches!(result, Err(FailureReason::ServerError { .. })));
    }
}
