use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Histogram, IntGaugeVec, register_counter, register_counter_vec,
    register_histogram, register_int_gauge_vec,
};

lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("gateway_requests_total", "Total number of requests").unwrap();
    pub static ref ADMITTED: CounterVec = register_counter_vec!(
        "gateway_admitted_total",
        "Requests admitted by the rate limiter",
        &["class"]
    )
    .unwrap();
    pub static ref RATE_LIMITED: CounterVec = register_counter_vec!(
        "gateway_rate_limited_total",
        "Requests rejected by the rate limiter",
        &["class"]
    )
    .unwrap();
    pub static ref TRACKED_IDENTIFIERS: IntGaugeVec = register_int_gauge_vec!(
        "gateway_tracked_identifiers",
        "Identifiers currently holding a rate window",
        &["class"]
    )
    .unwrap();
    pub static ref SWEEP_EVICTED: Counter = register_counter!(
        "gateway_sweep_evicted_total",
        "Idle identifiers evicted by the sweeper"
    )
    .unwrap();
    pub static ref REQUEST_LATENCY: Histogram = register_histogram!(
        "gateway_request_latency_seconds",
        "Request latency in seconds"
    )
    .unwrap();
}
