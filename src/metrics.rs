//! Prometheus metrics for listing submissions.
//!
//! Tracks how submit attempts end and how long the create call takes. The
//! `metrics` facade counters emitted by the transitions are always on; this
//! registry is only built with the `metrics` feature.

#[cfg(feature = "metrics")]
use prometheus::{CounterVec, Histogram, HistogramOpts, Opts, Registry};
#[cfg(feature = "metrics")]
use std::time::Duration;

#[cfg(feature = "metrics")]
use crate::error::Result;

/// Prometheus metrics registry for the listing page.
#[cfg(feature = "metrics")]
#[derive(Clone)]
pub struct ListingMetrics {
    registry: Registry,
    submissions_total: CounterVec,
    images_rejected_total: prometheus::Counter,
    submit_duration_seconds: Histogram,
}

#[cfg(feature = "metrics")]
impl ListingMetrics {
    /// Create a new ListingMetrics instance with the given registry.
    ///
    /// # Errors
    ///
    /// Returns an error if metrics fail to register (e.g., duplicate registration).
    pub fn new(registry: Registry) -> Result<Self> {
        let submissions_total = CounterVec::new(
            Opts::new(
                "listing_submissions_total",
                "Total number of submit attempts by outcome",
            ),
            &["outcome"],
        )
        .map_err(|e| anyhow::anyhow!("Failed to create submissions_total counter: {}", e))?;

        let images_rejected_total = prometheus::Counter::new(
            "listing_images_rejected_total",
            "Files refused by image intake (wrong type or unreadable)",
        )
        .map_err(|e| anyhow::anyhow!("Failed to create images_rejected_total counter: {}", e))?;

        let submit_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "listing_submit_duration_seconds",
                "Duration of the create-listing call in seconds",
            )
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        )
        .map_err(|e| anyhow::anyhow!("Failed to create submit_duration_seconds histogram: {}", e))?;

        registry
            .register(Box::new(submissions_total.clone()))
            .map_err(|e| anyhow::anyhow!("Failed to register submissions_total: {}", e))?;
        registry
            .register(Box::new(images_rejected_total.clone()))
            .map_err(|e| anyhow::anyhow!("Failed to register images_rejected_total: {}", e))?;
        registry
            .register(Box::new(submit_duration_seconds.clone()))
            .map_err(|e| anyhow::anyhow!("Failed to register submit_duration_seconds: {}", e))?;

        Ok(Self {
            registry,
            submissions_total,
            images_rejected_total,
            submit_duration_seconds,
        })
    }

    /// Get the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Record how an attempt ended. `duration` is `None` when no request was sent.
    pub fn record_submission(&self, outcome: &str, duration: Option<Duration>) {
        self.submissions_total.with_label_values(&[outcome]).inc();
        if let Some(duration) = duration {
            self.submit_duration_seconds.observe(duration.as_secs_f64());
        }
    }

    pub fn record_image_rejected(&self) {
        self.images_rejected_total.inc();
    }
}
