use once_cell::sync::Lazy;
use prometheus::{register_counter_vec, register_histogram_vec, CounterVec, HistogramVec};

pub static UPSTREAM_REQUESTS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "linkdesk_upstream_requests_total",
        "Total number of requests made to the shortener API",
        &["endpoint", "outcome"]
    )
    .unwrap()
});

pub static UPSTREAM_LATENCY: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "linkdesk_upstream_latency_seconds",
        "Shortener API latency in seconds",
        &["endpoint"],
        vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]
    )
    .unwrap()
});

pub static GUARD_DECISIONS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "linkdesk_guard_decisions_total",
        "Session guard decisions for protected pages",
        &["decision"]
    )
    .unwrap()
});

pub static REDIRECTS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "linkdesk_redirects_total",
        "Short link resolutions by outcome",
        &["outcome"]
    )
    .unwrap()
});
