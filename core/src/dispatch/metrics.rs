// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Prometheus metrics for the dispatch platform, served from `/metrics`.
//! Grounded in the teacher's direct `prometheus` crate usage in
//! `monitoring::PrometheusExporter`, narrowed to the dispatch domain's
//! own counters and gauges.

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

/// Owns the Prometheus [`Registry`] and every metric the dispatch
/// platform reports.
pub struct DispatchMetrics {
    registry: Registry,
    pub jobs_submitted_total: IntCounter,
    pub jobs_completed_total: IntCounter,
    pub jobs_failed_total: IntCounter,
    pub jobs_cancelled_total: IntCounter,
    pub jobs_by_status: IntGaugeVec,
    pub workers_registered: IntGauge,
    pub scheduler_tick_seconds: Histogram,
    pub scheduler_runs_total: IntCounter,
}

/// Re-exported so callers touching per-status gauges don't need a direct
/// `prometheus` dependency of their own.
pub use prometheus::IntGaugeVec;

impl DispatchMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let jobs_submitted_total = IntCounter::with_opts(Opts::new(
            "jobmesh_jobs_submitted_total",
            "Total jobs created",
        ))
        .expect("valid metric opts");
        let jobs_completed_total = IntCounter::with_opts(Opts::new(
            "jobmesh_jobs_completed_total",
            "Total jobs that reached COMPLETED",
        ))
        .expect("valid metric opts");
        let jobs_failed_total = IntCounter::with_opts(Opts::new(
            "jobmesh_jobs_failed_total",
            "Total jobs that reached FAILED",
        ))
        .expect("valid metric opts");
        let jobs_cancelled_total = IntCounter::with_opts(Opts::new(
            "jobmesh_jobs_cancelled_total",
            "Total jobs that reached CANCELLED",
        ))
        .expect("valid metric opts");
        let jobs_by_status = IntGaugeVec::new(
            Opts::new("jobmesh_jobs_by_status", "Current job count by status"),
            &["status"],
        )
        .expect("valid metric opts");
        let workers_registered = IntGauge::with_opts(Opts::new(
            "jobmesh_workers_registered",
            "Currently registered workers",
        ))
        .expect("valid metric opts");
        let scheduler_tick_seconds = Histogram::with_opts(HistogramOpts::new(
            "jobmesh_scheduler_tick_seconds",
            "Duration of a single scheduler run",
        ))
        .expect("valid metric opts");
        let scheduler_runs_total = IntCounter::with_opts(Opts::new(
            "jobmesh_scheduler_runs_total",
            "Total scheduler runs executed",
        ))
        .expect("valid metric opts");

        for collector in [
            Box::new(jobs_submitted_total.clone()) as Box<dyn prometheus::core::Collector>,
            Box::new(jobs_completed_total.clone()),
            Box::new(jobs_failed_total.clone()),
            Box::new(jobs_cancelled_total.clone()),
            Box::new(jobs_by_status.clone()),
            Box::new(workers_registered.clone()),
            Box::new(scheduler_tick_seconds.clone()),
            Box::new(scheduler_runs_total.clone()),
        ] {
            registry
                .register(collector)
                .expect("metric names are unique");
        }

        Self {
            registry,
            jobs_submitted_total,
            jobs_completed_total,
            jobs_failed_total,
            jobs_cancelled_total,
            jobs_by_status,
            workers_registered,
            scheduler_tick_seconds,
            scheduler_runs_total,
        }
    }

    /// Render the current metric set in Prometheus text exposition format.
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .expect("encoding metrics never fails");
        String::from_utf8(buffer).expect("prometheus text output is valid utf8")
    }
}

impl Default for DispatchMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_includes_registered_metric_names() {
        let metrics = DispatchMetrics::new();
        metrics.jobs_submitted_total.inc();
        let rendered = metrics.render();
        assert!(rendered.contains("jobmesh_jobs_submitted_total"));
    }

    #[test]
    fn jobs_by_status_gauge_tracks_labels_independently() {
        let metrics = DispatchMetrics::new();
        metrics.jobs_by_status.with_label_values(&["QUEUED"]).set(3);
        metrics.jobs_by_status.with_label_values(&["RUNNING"]).set(1);
        let rendered = metrics.render();
        assert!(rendered.contains("QUEUED"));
        assert!(rendered.contains("RUNNING"));
    }
}
