//! The sell-your-account page: session guard, estimator, image intake,
//! validator and submission controller wired to a view.
//!
//! A page only exists once the session guard passed (see [`ListingPage::init`]);
//! when it fails the view is sent to the login page and nothing else runs.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use metrics::counter;
use tokio::task::JoinHandle;

use crate::config::ListingConfig;
use crate::domain::estimate::{estimate, price_display};
use crate::domain::form::{FormField, ListingForm};
use crate::domain::submission::{
    Attempt, AttemptBlocked, FailureReason, SubmissionOutcome, SubmissionPhase,
};
use crate::domain::validation::{CHECKED_FIELDS, ValidationReport, validate};
use crate::error::Result;
use crate::fallback::ConsoleTestHelper;
use crate::gallery::{FileDecoder, Gallery, ImageFile};
use crate::http::HttpClient;
#[cfg(feature = "metrics")]
use crate::metrics::ListingMetrics;
use crate::session::{Session, SessionStore};
use crate::view::{ListingView, Notice, NoticeKind, SubmitControl};

/// Restores the form's controls when a submit finishes, whichever way it ends.
struct SubmittingGuard<V: ListingView> {
    view: Arc<V>,
}

impl<V: ListingView> SubmittingGuard<V> {
    fn engage(view: Arc<V>) -> Self {
        view.set_loading(true);
        view.set_submit_control(SubmitControl::Busy);
        Self { view }
    }
}

impl<V: ListingView> Drop for SubmittingGuard<V> {
    fn drop(&mut self) {
        self.view.set_loading(false);
        self.view.set_submit_control(SubmitControl::Ready);
    }
}

/// State and behaviour behind the listing form.
pub struct ListingPage<H, V, D>
where
    H: HttpClient,
    V: ListingView,
    D: FileDecoder,
{
    session: Option<Session>,
    config: ListingConfig,
    http_client: Arc<H>,
    view: Arc<V>,
    decoder: Arc<D>,
    form: ListingForm,
    gallery: Gallery,
    console_helper: Option<ConsoleTestHelper>,
    redirect: Option<JoinHandle<()>>,
    #[cfg(feature = "metrics")]
    metrics: Option<ListingMetrics>,
}

impl<H, V, D> ListingPage<H, V, D>
where
    H: HttpClient + 'static,
    V: ListingView + 'static,
    D: FileDecoder + 'static,
{
    /// Run the session guard and build the page.
    ///
    /// Without a usable session the view navigates to the login page and the
    /// error is returned; no page exists to receive events.
    pub fn init(
        store: &dyn SessionStore,
        config: ListingConfig,
        http_client: Arc<H>,
        view: Arc<V>,
        decoder: Arc<D>,
    ) -> Result<Self> {
        match Session::load(store) {
            Ok(session) => Ok(Self::new(Some(session), config, http_client, view, decoder)),
            Err(e) => {
                tracing::warn!(error = %e, login = %config.login_path, "No session, redirecting to login");
                view.navigate(&config.login_path);
                Err(e)
            }
        }
    }

    /// Build a page around an explicit session.
    pub fn new(
        session: Option<Session>,
        config: ListingConfig,
        http_client: Arc<H>,
        view: Arc<V>,
        decoder: Arc<D>,
    ) -> Self {
        Self {
            session,
            config,
            http_client,
            view,
            decoder,
            form: ListingForm::new(),
            gallery: Gallery::new(),
            console_helper: None,
            redirect: None,
            #[cfg(feature = "metrics")]
            metrics: None,
        }
    }

    #[cfg(feature = "metrics")]
    pub fn with_metrics(mut self, metrics: ListingMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn config(&self) -> &ListingConfig {
        &self.config
    }

    pub fn form(&self) -> &ListingForm {
        &self.form
    }

    pub fn set_field(&mut self, field: FormField, value: impl Into<String>) {
        self.form.set(field, value);
    }

    pub fn gallery(&self) -> &Gallery {
        &self.gallery
    }

    pub fn console_helper(&self) -> Option<&ConsoleTestHelper> {
        self.console_helper.as_ref()
    }

    /// Take the handle of a scheduled login redirect, if one is pending.
    pub fn take_redirect(&mut self) -> Option<JoinHandle<()>> {
        self.redirect.take()
    }

    fn notify(&self, kind: NoticeKind, text: impl Into<String>) {
        self.view.notify(Notice {
            kind,
            text: text.into(),
            duration_ms: self.config.notice_duration_ms,
        });
    }

    // ------------------------------------------------------------------------
    // Price estimator
    // ------------------------------------------------------------------------

    /// Compute the estimate and show it, or clear the display when it is zero.
    pub fn estimate(&self) -> i64 {
        let total = estimate(&self.form);
        tracing::debug!(total, "Price estimated");
        self.view.set_price(price_display(total));
        total
    }

    // ------------------------------------------------------------------------
    // Form validator
    // ------------------------------------------------------------------------

    /// Validate the form and update every field marker from scratch.
    pub fn validate(&self) -> bool {
        let report = validate(&self.form);
        self.mark_fields(&report);
        report.is_valid()
    }

    fn mark_fields(&self, report: &ValidationReport) {
        for field in CHECKED_FIELDS {
            self.view.set_field_invalid(field, report.is_invalid(field));
        }
    }

    // ------------------------------------------------------------------------
    // Image intake
    // ------------------------------------------------------------------------

    /// Offer files to the gallery.
    ///
    /// Non-images are rejected one by one with a notice. Accepted files decode
    /// concurrently and are appended in the order their decodes finish, which
    /// need not match the order given. Returns how many were added.
    pub async fn add_files(&mut self, files: Vec<ImageFile>) -> usize {
        let mut pending = FuturesUnordered::new();

        for file in files {
            if !file.is_image() {
                tracing::warn!(file = %file.name, mime = %file.mime, "Rejected non-image file");
                self.record_image_rejected();
                self.notify(
                    NoticeKind::Error,
                    format!("{} is not an image file", file.name),
                );
                continue;
            }
            let decoder = Arc::clone(&self.decoder);
            pending.push(async move {
                let result = decoder.decode(&file).await;
                (file.name, result)
            });
        }

        let mut added = 0;
        while let Some((name, result)) = pending.next().await {
            match result {
                Ok(data) => {
                    self.gallery.push(data);
                    added += 1;
                    tracing::debug!(file = %name, images = self.gallery.len(), "Image added");
                    self.render_gallery();
                }
                Err(e) => {
                    tracing::warn!(file = %name, error = %e, "Image could not be read");
                    self.record_image_rejected();
                    self.notify(NoticeKind::Error, format!("Could not read {name}"));
                }
            }
        }
        added
    }

    /// Remove the image at `index` and re-render. Out-of-range is a no-op.
    pub fn remove_image(&mut self, index: usize) -> Option<String> {
        let removed = self.gallery.remove_at(index);
        if removed.is_some() {
            self.render_gallery();
        } else {
            tracing::warn!(index, images = self.gallery.len(), "No image at index");
        }
        removed
    }

    /// Open the full-size viewer on the image at `index`.
    pub fn view_image(&self, index: usize) -> bool {
        match self.gallery.get(index) {
            Some(src) => {
                self.view.open_viewer(src);
                true
            }
            None => false,
        }
    }

    pub fn render_gallery(&self) {
        self.view.render_gallery(&self.gallery.thumbnails());
    }

    fn record_image_rejected(&self) {
        counter!("listing_images_rejected_total").increment(1);
        #[cfg(feature = "metrics")]
        if let Some(metrics) = &self.metrics {
            metrics.record_image_rejected();
        };
    }

    // ------------------------------------------------------------------------
    // Submission controller
    // ------------------------------------------------------------------------

    /// Handle one press of the submit button.
    ///
    /// Each call is an independent attempt; nothing is retried. While the
    /// create call is in flight the loading overlay is shown and the submit
    /// button is disabled, and both are restored however the attempt ends.
    pub async fn submit(&mut self) -> SubmissionOutcome {
        let attempt = Attempt::new();
        let attempt_id = attempt.id;
        tracing::debug!(attempt_id = %attempt_id, phase = ?SubmissionPhase::Validating, "Submit pressed");

        let submitting = match attempt
            .begin(self.session.as_ref(), &self.form, self.gallery.images())
            .and_then(|validating| validating.validate(&self.config.placeholder_image))
        {
            Ok(submitting) => {
                self.mark_fields(&ValidationReport::default());
                submitting
            }
            Err(blocked) => {
                if let AttemptBlocked::Invalid(report) = &blocked {
                    self.mark_fields(report);
                }
                self.notify(NoticeKind::Error, blocked.notice_text());
                let outcome = SubmissionOutcome::Blocked(blocked);
                counter!("listing_submissions_total", "outcome" => outcome.label()).increment(1);
                self.record_submission(&outcome, None);
                return outcome;
            }
        };

        tracing::debug!(attempt_id = %attempt_id, phase = ?SubmissionPhase::Submitting, "Sending listing");
        let _guard = SubmittingGuard::engage(Arc::clone(&self.view));
        let started = std::time::Instant::now();

        let outcome = submitting
            .send(
                self.http_client.as_ref(),
                self.config.endpoint(),
                self.config.timeout_ms,
            )
            .await;

        match &outcome {
            SubmissionOutcome::Succeeded(_) => {
                self.notify(NoticeKind::Success, "Account listed successfully!");
                self.form.reset();
                self.view.reset_form();
                self.gallery.clear();
                self.render_gallery();
                self.view.set_price(None);
            }
            SubmissionOutcome::Failed(attempt) => {
                let reason = &attempt.state.reason;
                self.notify(NoticeKind::Error, reason.notice_text());
                if matches!(reason, FailureReason::Unauthorized { .. }) {
                    self.schedule_login_redirect();
                }
                if let Some(helper) = ConsoleTestHelper::offer(attempt) {
                    self.present_console_helper(helper);
                }
            }
            SubmissionOutcome::Blocked(_) => {}
        }

        tracing::debug!(
            attempt_id = %attempt_id,
            phase = ?outcome.phase(),
            outcome = outcome.label(),
            "Submit finished"
        );
        self.record_submission(&outcome, Some(started.elapsed()));
        outcome
    }

    fn schedule_login_redirect(&mut self) {
        let view = Arc::clone(&self.view);
        let login = self.config.login_path.clone();
        let delay = Duration::from_millis(self.config.unauthorized_redirect_delay_ms);
        self.redirect = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tracing::info!(login = %login, "Session expired, redirecting to login");
            view.navigate(&login);
        }));
    }

    /// Show the helper unless one is already on the page.
    fn present_console_helper(&mut self, helper: ConsoleTestHelper) {
        if self.console_helper.is_some() {
            tracing::debug!("Console test helper already present");
            return;
        }
        tracing::info!(attempt_id = %helper.offered_by(), "Offering console test helper");
        self.console_helper = Some(helper);
        self.view.show_console_helper();
    }

    /// Activate the console test helper.
    ///
    /// Returns `None` when no helper is present, otherwise whether the bypass
    /// submission succeeded. On success the helper is removed; on failure its
    /// action is re-enabled for another try.
    pub async fn run_console_test(&mut self) -> Option<bool> {
        let mut helper = self.console_helper.clone()?;
        if !helper.is_enabled() {
            return Some(false);
        }

        helper.set_enabled(false);
        self.console_helper = Some(helper.clone());
        self.view.set_console_helper_enabled(false);

        let result = helper
            .send(
                self.http_client.as_ref(),
                self.config.endpoint(),
                &self.config.console_test_path(),
                self.config.timeout_ms,
            )
            .await;

        match result {
            Ok(_) => {
                self.notify(NoticeKind::Success, "Console test listing created");
                self.console_helper = None;
                self.view.remove_console_helper();
                Some(true)
            }
            Err(reason) => {
                self.notify(
                    NoticeKind::Error,
                    format!("Console test failed: {}", reason.notice_text()),
                );
                helper.set_enabled(true);
                self.console_helper = Some(helper);
                self.view.set_console_helper_enabled(true);
                Some(false)
            }
        }
    }

    #[cfg(feature = "metrics")]
    fn record_submission(&self, outcome: &SubmissionOutcome, duration: Option<Duration>) {
        if let Some(metrics) = &self.metrics {
            metrics.record_submission(outcome.label(), duration);
        }
    }

    #[cfg(not(feature = "metrics"))]
    fn record_submission(&self, _outcome: &SubmissionOutcome, _duration: Option<Duration>) {}
}
