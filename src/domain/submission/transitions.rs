//! State transitions for a submission attempt.
//!
//! ```text
//! Attempt<Idle> ──begin()──> Attempt<Validating> ──validate()──> Attempt<Submitting>
//!       │                            │                                  │
//!       └── Blocked(LoginRequired)   └── Blocked(Invalid)               ├──send()──> Attempt<Succeeded>
//!                                                                       └──send()──> Attempt<Failed>
//! ```
//!
//! Nothing here retries. Each submit starts again from `Attempt<Idle>`.

use metrics::counter;

use super::state::{
    Attempt, AttemptBlocked, AttemptId, Failed, FailureReason, Idle, ServerMessage, Submitting,
    SubmissionOutcome, Succeeded, Validating,
};
use crate::config::CREATE_PATH;
use crate::domain::form::ListingForm;
use crate::domain::payload::ListingPayload;
use crate::domain::validation::validate;
use crate::http::{ApiRequest, HttpClient, HttpResponse};
use crate::session::Session;

impl Default for Attempt<Idle> {
    fn default() -> Self {
        Self::new()
    }
}

impl Attempt<Idle> {
    pub fn new() -> Self {
        Attempt {
            id: AttemptId::new(),
            state: Idle {},
        }
    }

    /// Snapshot the form. Without a session the attempt stops here.
    pub fn begin(
        self,
        session: Option<&Session>,
        form: &ListingForm,
        images: &[String],
    ) -> Result<Attempt<Validating>, AttemptBlocked> {
        let Some(session) = session else {
            tracing::debug!(attempt_id = %self.id, "Submit without session");
            return Err(AttemptBlocked::LoginRequired);
        };

        Ok(Attempt {
            id: self.id,
            state: Validating {
                session: session.clone(),
                form: form.clone(),
                images: images.to_vec(),
            },
        })
    }
}

impl Attempt<Validating> {
    /// Run the validator and, when it passes, assemble the payload.
    pub fn validate(self, placeholder: &str) -> Result<Attempt<Submitting>, AttemptBlocked> {
        let report = validate(&self.state.form);
        if !report.is_valid() {
            tracing::debug!(
                attempt_id = %self.id,
                invalid = ?report.invalid_fields(),
                "Validation failed"
            );
            return Err(AttemptBlocked::Invalid(report));
        }

        let Validating {
            session,
            form,
            images,
        } = self.state;
        let payload = ListingPayload::build(&session.user, &form, &images, placeholder);

        tracing::debug!(
            attempt_id = %self.id,
            images = payload.images.len(),
            "Payload assembled"
        );

        Ok(Attempt {
            id: self.id,
            state: Submitting {
                token: session.token,
                payload,
                started_at: chrono::Utc::now(),
            },
        })
    }
}

impl Attempt<Submitting> {
    /// POST the payload to the create endpoint with the session's bearer token.
    pub async fn send<H: HttpClient + ?Sized>(
        self,
        http_client: &H,
        endpoint: &str,
        timeout_ms: u64,
    ) -> SubmissionOutcome {
        let result = match self.state.payload.to_json() {
            Ok(body) => {
                let request = ApiRequest::post_json(endpoint, CREATE_PATH, body);
                http_client
                    .execute(&request, &self.state.token, timeout_ms)
                    .await
                    .map_err(|e| FailureReason::NetworkError {
                        error: e.to_string(),
                    })
            }
            Err(e) => Err(FailureReason::InvalidPayload {
                error: e.to_string(),
            }),
        };

        let result =
            result.and_then(|response| classify_response(&response).map(|()| response));

        let outcome = match result {
            Ok(response) => {
                tracing::info!(attempt_id = %self.id, status = response.status, "Listing created");
                SubmissionOutcome::Succeeded(Attempt {
                    id: self.id,
                    state: Succeeded {
                        status: response.status,
                        body: response.body,
                        started_at: self.state.started_at,
                        completed_at: chrono::Utc::now(),
                    },
                })
            }
            Err(reason) => {
                match &reason {
                    FailureReason::NetworkError { error } => {
                        tracing::error!(
                            attempt_id = %self.id,
                            error = %error,
                            "Create listing request failed"
                        );
                    }
                    other => {
                        tracing::warn!(
                            attempt_id = %self.id,
                            status = ?other.status(),
                            reason = other.label(),
                            "Create listing rejected"
                        );
                    }
                }
                SubmissionOutcome::Failed(Attempt {
                    id: self.id,
                    state: Failed {
                        reason,
                        payload: self.state.payload,
                        started_at: self.state.started_at,
                        failed_at: chrono::Utc::now(),
                    },
                })
            }
        };

        counter!("listing_submissions_total", "outcome" => outcome.label()).increment(1);
        outcome
    }
}

/// Map a response onto success or a [`FailureReason`].
pub fn classify_response(response: &HttpResponse) -> Result<(), FailureReason> {
    if response.is_success() {
        return Ok(());
    }
    let body = ServerMessage::parse(&response.body);
    Err(match response.status {
        401 => FailureReason::Unauthorized { body },
        500 => FailureReason::ServerError { body },
        status => FailureReason::Rejected { status, body },
    })
}
