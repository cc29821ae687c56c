//! Submission attempt types using the typestate pattern.
//!
//! Each press of the submit button is one independent `Attempt`, which moves
//! through distinct states enforced at compile time. The page itself only
//! remembers a [`SubmissionPhase`] for display.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::form::ListingForm;
use crate::domain::payload::ListingPayload;
use crate::domain::validation::ValidationReport;
use crate::session::Session;

/// Coarse phase of the page's submission state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionPhase {
    Idle,
    Validating,
    Submitting,
    Succeeded,
    Failed,
}

/// Unique identifier for a submission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttemptId(pub Uuid);

impl AttemptId {
    pub fn new() -> Self {
        AttemptId(Uuid::new_v4())
    }
}

impl Default for AttemptId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// Marker trait for valid attempt states.
pub trait AttemptState: Send + Sync {}

/// One submission attempt in state `T`.
#[derive(Debug, Clone)]
pub struct Attempt<T: AttemptState> {
    pub id: AttemptId,
    pub state: T,
}

// ============================================================================
// Attempt States
// ============================================================================

/// Nothing has happened yet.
#[derive(Debug, Clone, Default)]
pub struct Idle {}

impl AttemptState for Idle {}

/// A session exists; the form snapshot is about to be checked.
#[derive(Debug, Clone)]
pub struct Validating {
    pub session: Session,
    pub form: ListingForm,
    pub images: Vec<String>,
}

impl AttemptState for Validating {}

/// The payload is assembled and the create call is (about to be) in flight.
#[derive(Debug, Clone)]
pub struct Submitting {
    pub token: String,
    pub payload: ListingPayload,
    pub started_at: DateTime<Utc>,
}

impl AttemptState for Submitting {}

/// The listing was created.
#[derive(Debug, Clone)]
pub struct Succeeded {
    pub status: u16,
    pub body: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl AttemptState for Succeeded {}

/// The create call did not succeed. Keeps the payload so the bypass helper can resend it.
#[derive(Debug, Clone)]
pub struct Failed {
    pub reason: FailureReason,
    pub payload: ListingPayload,
    pub started_at: DateTime<Utc>,
    pub failed_at: DateTime<Utc>,
}

impl AttemptState for Failed {}

/// Why an attempt never reached the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptBlocked {
    /// No session was available.
    LoginRequired,
    /// The validator flagged at least one field.
    Invalid(ValidationReport),
}

impl AttemptBlocked {
    pub fn notice_text(&self) -> &'static str {
        match self {
            AttemptBlocked::LoginRequired => "Please log in before listing an account",
            AttemptBlocked::Invalid(_) => "Please fix the highlighted fields",
        }
    }
}

/// Error fields a server may put in a JSON error body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerMessage {
    pub error: Option<String>,
    pub message: Option<String>,
    pub details: Option<String>,
    /// Machine-readable error code, when the server sends one
    pub code: Option<String>,
}

impl ServerMessage {
    /// Parse an error body. Non-JSON bodies and non-text fields are ignored.
    pub fn parse(body: &str) -> Self {
        let value: Value = match serde_json::from_str(body) {
            Ok(value) => value,
            Err(_) => return Self::default(),
        };
        let text = |key: &str| match value.get(key) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        Self {
            error: text("error"),
            message: text("message"),
            details: text("details"),
            code: text("code"),
        }
    }
}

/// Reason why an attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "details")]
pub enum FailureReason {
    /// 401: the token is no longer accepted.
    Unauthorized { body: ServerMessage },

    /// 500: the server failed, possibly on a foreign key constraint.
    ServerError { body: ServerMessage },

    /// Any other non-2xx status.
    Rejected { status: u16, body: ServerMessage },

    /// No response at all (connection refused, timeout, DNS...).
    NetworkError { error: String },

    /// The payload could not be encoded.
    InvalidPayload { error: String },
}

/// PostgreSQL's SQLSTATE for foreign_key_violation.
pub const FOREIGN_KEY_SQLSTATE: &str = "23503";

/// Whether server detail text describes a foreign key violation.
pub fn is_foreign_key_error(detail: &str) -> bool {
    detail.to_lowercase().contains("foreign key")
}

impl FailureReason {
    pub fn status(&self) -> Option<u16> {
        match self {
            FailureReason::Unauthorized { .. } => Some(401),
            FailureReason::ServerError { .. } => Some(500),
            FailureReason::Rejected { status, .. } => Some(*status),
            FailureReason::NetworkError { .. } | FailureReason::InvalidPayload { .. } => None,
        }
    }

    /// Metric label for this failure.
    pub fn label(&self) -> &'static str {
        match self {
            FailureReason::Unauthorized { .. } => "unauthorized",
            FailureReason::ServerError { .. } => "server_error",
            FailureReason::Rejected { .. } => "rejected",
            FailureReason::NetworkError { .. } => "network_error",
            FailureReason::InvalidPayload { .. } => "invalid_payload",
        }
    }

    /// Text shown to the seller.
    pub fn notice_text(&self) -> String {
        match self {
            FailureReason::Unauthorized { .. } => "Unauthorized, please login again".to_string(),
            FailureReason::ServerError { body } => {
                match body.message.as_deref().or(body.error.as_deref()) {
                    Some(message) => format!("Server error: {message}"),
                    None => "Server error, please try again later".to_string(),
                }
            }
            FailureReason::Rejected { body, .. } => body
                .error
                .clone()
                .or_else(|| body.message.clone())
                .unwrap_or_else(|| "Failed to list account".to_string()),
            FailureReason::NetworkError { .. } => {
                "Network request failed, please check your connection".to_string()
            }
            FailureReason::InvalidPayload { .. } => "Failed to list account".to_string(),
        }
    }

    /// Whether this failure should surface the console test helper.
    ///
    /// Only 500s qualify: either the structured code says foreign key
    /// violation, or the detail text mentions one.
    pub fn offers_console_test(&self) -> bool {
        let FailureReason::ServerError { body } = self else {
            return false;
        };
        let coded = body.code.as_deref().is_some_and(|code| {
            code == FOREIGN_KEY_SQLSTATE || code.eq_ignore_ascii_case("FOREIGN_KEY_VIOLATION")
        });
        coded || body.details.as_deref().is_some_and(is_foreign_key_error)
    }
}

/// Where a submit ended up.
#[derive(Debug, Clone)]
pub enum SubmissionOutcome {
    /// Stopped before any network call.
    Blocked(AttemptBlocked),
    Succeeded(Attempt<Succeeded>),
    Failed(Attempt<Failed>),
}

impl SubmissionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SubmissionOutcome::Succeeded(_))
    }

    pub fn failure(&self) -> Option<&FailureReason> {
        match self {
            SubmissionOutcome::Failed(attempt) => Some(&attempt.state.reason),
            _ => None,
        }
    }

    pub fn phase(&self) -> SubmissionPhase {
        match self {
            SubmissionOutcome::Blocked(_) | SubmissionOutcome::Failed(_) => SubmissionPhase::Failed,
            SubmissionOutcome::Succeeded(_) => SubmissionPhase::Succeeded,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SubmissionOutcome::Blocked(AttemptBlocked::LoginRequired) => "login_required",
            SubmissionOutcome::Blocked(AttemptBlocked::Invalid(_)) => "invalid",
            SubmissionOutcome::Succeeded(_) => "success",
            SubmissionOutcome::Failed(attempt) => attempt.state.reason.label(),
        }
    }
}
