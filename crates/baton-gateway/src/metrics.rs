//! Prometheus metrics recording and endpoint.
//!
//! The recording helpers compile to no-ops without the `metrics` feature.

#[cfg(feature = "metrics")]
use std::sync::OnceLock;

#[cfg(feature = "metrics")]
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder on first call and return its handle.
///
/// Only one recorder can exist per process; later calls reuse it. Returns
/// `None` if another recorder was installed first.
#[cfg(feature = "metrics")]
pub fn prometheus_handle() -> Option<PrometheusHandle> {
    static HANDLE: OnceLock<Option<PrometheusHandle>> = OnceLock::new();
    HANDLE
        .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::warn!(%e, "Failed to install Prometheus recorder");
                None
            }
        })
        .clone()
}

/// Record a participant joining a session.
pub fn record_connect() {
    #[cfg(feature = "metrics")]
    metrics::gauge!("baton_participants_connected").increment(1.0);
}

/// Record a participant leaving a session.
pub fn record_disconnect() {
    #[cfg(feature = "metrics")]
    metrics::gauge!("baton_participants_connected").decrement(1.0);
}

/// Record a new session in the registry.
pub fn record_session_created() {
    #[cfg(feature = "metrics")]
    metrics::gauge!("baton_sessions").increment(1.0);
}

/// Record a command and whether its sender held control.
#[cfg_attr(not(feature = "metrics"), allow(unused_variables))]
pub fn record_command(command: &str, accepted: bool) {
    #[cfg(feature = "metrics")]
    {
        let labels = [
            ("command", command.to_string()),
            ("accepted", accepted.to_string()),
        ];
        metrics::counter!("baton_commands_total", &labels).increment(1);
    }
}

/// Record frames queued by one broadcast.
#[cfg_attr(not(feature = "metrics"), allow(unused_variables))]
pub fn record_broadcast(frames: usize) {
    #[cfg(feature = "metrics")]
    metrics::counter!("baton_broadcast_frames_total").increment(frames as u64);
}

/// Record a frame dropped because its recipient's queue was full.
pub fn record_frame_dropped() {
    #[cfg(feature = "metrics")]
    metrics::counter!("baton_dropped_frames_total").increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorders_do_not_panic() {
        // No recorder installed: the metrics facade falls back to a no-op
        record_connect();
        record_disconnect();
        record_session_created();
        record_command("start", true);
        record_broadcast(3);
        record_frame_dropped();
    }

    #[cfg(feature = "metrics")]
    #[test]
    fn test_prometheus_handle_is_shared() {
        let first = prometheus_handle();
        let second = prometheus_handle();
        assert_eq!(first.is_some(), second.is_some());
    }
}
