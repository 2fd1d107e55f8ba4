use std::time::Duration;

/// Default keepalive grace factor: the broker allows `keepalive_seconds * 1.25`
/// of silence before treating the connection as dead.
pub const DEFAULT_KEEPALIVE_FACTOR: f64 = 1.25;

/// Computes the keepalive supervision interval for a given CONNECT keepalive
/// value. `0` disables keepalive supervision entirely (`None`), per the
/// protocol's "a value of zero... disables" clause.
pub fn arm_interval(keepalive_seconds: u16, factor: f64) -> Option<Duration> {
    if keepalive_seconds == 0 {
        return None;
    }
    let seconds = (keepalive_seconds as f64 * factor).ceil() as u64;
    Some(Duration::from_secs(seconds))
}
