use prometheus::{Counter, CounterVec, Gauge, Histogram, HistogramOpts, Opts, Registry};
use std::sync::Arc;

/// Prometheus metrics for the tracker subsystem
#[derive(Clone)]
pub struct TrackerMetrics {
    // Counters
    pub commits_total: CounterVec,
    pub commit_failures: Counter,
    pub snapshots_acquired: Counter,
    pub snapshots_released: Counter,
    pub double_releases: Counter,

    // Gauges
    pub active_snapshots: Gauge,
    pub open_generations: Gauge,
    pub retired_generations: Gauge,

    // Histograms
    pub commit_latency: Histogram,

    // Registry
    registry: Arc<Registry>,
}

impl TrackerMetrics {
    /// Create a new TrackerMetrics instance
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        // Counters
        let commits_total = CounterVec::new(
            Opts::new(
                "cuttle_commits_total",
                "Total number of commits by language",
            ),
            &["language"],
        )?;
        registry.register(Box::new(commits_total.clone()))?;

        let commit_failures = Counter::with_opts(Opts::new(
            "cuttle_commit_failures_total",
            "Total number of failed commits",
        ))?;
        registry.register(Box::new(commit_failures.clone()))?;

        let snapshots_acquired = Counter::with_opts(Opts::new(
            "cuttle_snapshots_acquired_total",
            "Total number of snapshots handed to callers",
        ))?;
        registry.register(Box::new(snapshots_acquired.clone()))?;

        let snapshots_released = Counter::with_opts(Opts::new(
            "cuttle_snapshots_released_total",
            "Total number of snapshots released by callers",
        ))?;
        registry.register(Box::new(snapshots_released.clone()))?;

        let double_releases = Counter::with_opts(Opts::new(
            "cuttle_double_releases_total",
            "Detected attempts to release an already-released snapshot",
        ))?;
        registry.register(Box::new(double_releases.clone()))?;

        // Gauges
        let active_snapshots = Gauge::with_opts(Opts::new(
            "cuttle_active_snapshots",
            "Snapshots currently held by callers",
        ))?;
        registry.register(Box::new(active_snapshots.clone()))?;

        let open_generations = Gauge::with_opts(Opts::new(
            "cuttle_open_generations",
            "Generations whose readers are still open, across all trackers",
        ))?;
        registry.register(Box::new(open_generations.clone()))?;

        let retired_generations = Gauge::with_opts(Opts::new(
            "cuttle_retired_generations",
            "Retired generations pinned by outstanding references",
        ))?;
        registry.register(Box::new(retired_generations.clone()))?;

        // Histograms
        let commit_latency = Histogram::with_opts(
            HistogramOpts::new("cuttle_commit_latency_seconds", "Commit latency")
                .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]),
        )?;
        registry.register(Box::new(commit_latency.clone()))?;

        Ok(Self {
            commits_total,
            commit_failures,
            snapshots_acquired,
            snapshots_released,
            double_releases,
            active_snapshots,
            open_generations,
            retired_generations,
            commit_latency,
            registry: Arc::new(registry),
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Record a successful commit
    pub fn record_commit(&self, language: &str, duration_secs: f64) {
        self.commits_total.with_label_values(&[language]).inc();
        self.commit_latency.observe(duration_secs);
    }
}
