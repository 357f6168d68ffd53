//! Time formatting helpers.

/// Format a duration in seconds to a human-readable string.
pub fn format_duration(secs: u64) -> String {
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs < 86400 {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    } else {
        format!("{}d {}h", secs / 86400, (secs % 86400) / 3600)
    }
}

/// "3h 20m left" until `deadline`, or "ended" once it has passed.
pub fn format_remaining(now: u64, deadline: u64) -> String {
    match deadline.checked_sub(now) {
        Some(0) | None => "ended".to_string(),
        Some(secs) => format!("{} left", format_duration(secs)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations() {
        assert_eq!(format_duration(59), "59s");
        assert_eq!(format_duration(61), "1m 1s");
        assert_eq!(format_duration(3 * 3600 + 20 * 60), "3h 20m");
        assert_eq!(format_duration(2 * 86400 + 3600), "2d 1h");
    }

    #[test]
    fn remaining() {
        assert_eq!(format_remaining(100, 160), "1m 0s left");
        assert_eq!(format_remaining(100, 100), "ended");
        assert_eq!(format_remaining(200, 100), "ended");
    }
}
