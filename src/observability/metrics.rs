use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

pub const TRANSPORT_LABEL: &str = "transport";
pub const SESSION_EXPIRED_LABEL: &str = "session_expired";
pub const BANNED_LABEL: &str = "banned";

/// Per-session request metrics. Each `AuthSession` owns its own registry, so
/// isolated sessions never share counters.
#[derive(Clone)]
pub struct ClientMetrics {
    pub registry: Registry,

    // Request metrics
    pub requests: IntCounterVec,
    pub request_duration: HistogramVec,
    pub transport_errors: IntCounter,

    // Auth metrics
    pub refresh_attempts: IntCounterVec,
    pub auth_failures: IntCounterVec,
}

impl ClientMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new_custom(Some("adminclient".into()), None)?;

        let metrics = Self {
            requests: IntCounterVec::new(Opts::new("requests_total", "Requests sent by method and response status"), &["method", "status"])?,
            request_duration: HistogramVec::new(HistogramOpts::new("request_duration_seconds", "Request duration seconds").buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]), &["method"])?,
            transport_errors: IntCounter::new("transport_errors_total", "Requests that never received a response")?,
            refresh_attempts: IntCounterVec::new(Opts::new("refresh_attempts_total", "Refresh calls sent to the backend by outcome"), &["outcome"])?,
            auth_failures: IntCounterVec::new(Opts::new("auth_failures_total", "Terminal authentication failures by reason"), &["reason"])?,
            registry,
        };

        let reg = &metrics.registry;
        reg.register(Box::new(metrics.requests.clone()))?;
        reg.register(Box::new(metrics.request_duration.clone()))?;
        reg.register(Box::new(metrics.transport_errors.clone()))?;
        reg.register(Box::new(metrics.refresh_attempts.clone()))?;
        reg.register(Box::new(metrics.auth_failures.clone()))?;

        Ok(metrics)
    }

    /// Refresh calls that actually reached the wire, whatever their outcome.
    pub fn refresh_count(&self) -> u64 {
        ["succeeded", "failed"]
            .iter()
            .map(|outcome| self.refresh_attempts.with_label_values(&[*outcome]).get())
            .sum()
    }

    /// Prometheus text exposition of the session registry.
    pub fn encode(&self) -> prometheus::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl std::fmt::Debug for ClientMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientMetrics").finish_non_exhaustive()
    }
}
