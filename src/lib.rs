//! Client-side listing submission for a game-account marketplace.
//!
//! This crate drives the "sell your account" form: it gates the page on a stored
//! session, estimates a price from account stats, collects images into an
//! ordered gallery, validates the form, and submits the listing to the
//! marketplace API, mapping each kind of failure onto a notice for the seller.
//! A foreign key failure on the server additionally offers a one-off bypass
//! submission.
//!
//! The page surface is abstracted behind [`ListingView`] and the network behind
//! [`HttpClient`], so the whole workflow runs without a browser.

pub mod config;
pub mod domain;
pub mod error;
pub mod fallback;
pub mod gallery;
pub mod http;
pub mod metrics;
pub mod page;
pub mod session;
pub mod view;

// Re-export commonly used types
pub use config::ListingConfig;
pub use domain::form::{FormField, ListingForm, StatField};
pub use domain::payload::ListingPayload;
pub use domain::submission::{
    AttemptBlocked, FailureReason, SubmissionOutcome, SubmissionPhase, is_foreign_key_error,
};
pub use error::{ListingError, Result};
pub use fallback::ConsoleTestHelper;
pub use gallery::{DataUrlDecoder, FileDecoder, Gallery, ImageFile, MockFileDecoder};
pub use http::{HttpClient, HttpResponse, MockHttpClient, ReqwestHttpClient};
#[cfg(feature = "metrics")]
pub use crate::metrics::ListingMetrics;
pub use page::ListingPage;
pub use session::{FileStore, MemoryStore, Session, SessionStore, SessionUser};
pub use view::{ListingView, Notice, NoticeKind, RecordingView};
