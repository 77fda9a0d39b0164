// Time display for post headers. Absolute text is always produced;
// relative text is derived against the caller-supplied clock so the
// engine stays deterministic under test.

use chrono::{TimeZone, Utc};

pub fn readable_time(time: f64) -> String {
    match Utc.timestamp_opt(time as i64, 0).single() {
        Some(datetime) => datetime.format("%d %b %Y (%a) %H:%M").to_string(),
        None => "??".to_string(),
    }
}

pub fn relative_time(time: f64, now: f64) -> String {
    let ago = now >= time;
    let diff = (now - time).abs();

    if diff < 60.0 {
        return "just now".to_string();
    }

    let (value, unit) = if diff < 3600.0 {
        (diff / 60.0, "minute")
    } else if diff < 86400.0 {
        (diff / 3600.0, "hour")
    } else if diff < 30.0 * 86400.0 {
        (diff / 86400.0, "day")
    } else if diff < 365.0 * 86400.0 {
        (diff / (30.0 * 86400.0), "month")
    } else {
        (diff / (365.0 * 86400.0), "year")
    };
    let value = value as u64;
    let plural = if value == 1 { "" } else { "s" };

    if ago {
        format!("{} {}{} ago", value, unit, plural)
    } else {
        format!("in {} {}{}", value, unit, plural)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readable_time() {
        // 2023-05-02 04:00:00 UTC
        assert_eq!(readable_time(1683000000.0), "02 May 2023 (Tue) 04:00");
    }

    #[test]
    fn test_relative_time_recent() {
        assert_eq!(relative_time(1000.0, 1030.0), "just now");
    }

    #[test]
    fn test_relative_time_units() {
        assert_eq!(relative_time(0.0, 120.0), "2 minutes ago");
        assert_eq!(relative_time(0.0, 3600.0), "1 hour ago");
        assert_eq!(relative_time(0.0, 3.0 * 86400.0), "3 days ago");
    }

    #[test]
    fn test_relative_time_future() {
        assert_eq!(relative_time(7200.0, 0.0), "in 2 hours");
    }
}
