//! Utility functions for miniauction

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Parse duration string (e.g., "500ms", "30s", "5m", "1h", "7d")
pub fn parse_duration(s: &str) -> crate::Result<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return Err(crate::Error::InvalidConfig("empty duration".into()));
    }

    let split = s
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| crate::Error::InvalidConfig(format!("missing duration unit: {}", s)))?;
    let (num_str, unit) = s.split_at(split);

    let num: u64 = num_str
        .parse()
        .map_err(|_| crate::Error::InvalidConfig(format!("invalid duration: {}", s)))?;

    let secs_per_unit = match unit {
        "ms" => return Ok(Duration::from_millis(num)),
        "s" => 1,
        "m" => 60,
        "h" => 3600,
        "d" => 86400,
        _ => {
            return Err(crate::Error::InvalidConfig(format!(
                "unknown duration unit: {}",
                unit
            )))
        }
    };

    num.checked_mul(secs_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| crate::Error::InvalidConfig(format!("duration out of range: {}", s)))
}

/// Wall-clock instant `duration` from now
pub fn deadline_after(duration: Duration) -> crate::Result<DateTime<Utc>> {
    let delta = chrono::Duration::from_std(duration)
        .map_err(|e| crate::Error::InvalidConfig(format!("auction duration out of range: {}", e)))?;
    Utc::now()
        .checked_add_signed(delta)
        .ok_or_else(|| crate::Error::InvalidConfig("auction deadline out of range".into()))
}

/// Turn `host:port` into a URI tonic can dial
pub fn peer_uri(addr: &str) -> String {
    let addr = addr.trim();
    if addr.starts_with("http://") || addr.starts_with("https://") {
        addr.to_string()
    } else {
        format!("http://{}", addr)
    }
}
