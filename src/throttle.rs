//! Throttle times reported by brokers.
//!
//! Every command issues a fixed number of round trips, so a throttle is only reported and never waited for.

use tracing::warn;

use crate::protocol::api_key::ApiKey;

/// Logs a non-zero `throttle_time_ms` from a response to `api_key`.
///
/// `broker` is `None` when the response came from an arbitrary broker.
pub fn log_throttle(api_key: ApiKey, broker: Option<i32>, throttle_time_ms: Option<i32>) {
    let throttle_time_ms = throttle_time_ms.unwrap_or_default();
    match u64::try_from(throttle_time_ms) {
        Ok(0) => {}
        Ok(throttle_time_ms) => {
            warn!(
                ?api_key,
                ?broker,
                throttle_time_ms,
                "Broker throttled request due to quota violation",
            );
        }
        Err(_) => {
            warn!(?api_key, ?broker, throttle_time_ms, "Invalid throttle time");
        }
    }
}
