use chrono::{DateTime, Utc};

/// Truncates to microseconds, the precision timestamps survive a store round-trip with.
pub fn storage_precision(ts: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(ts.timestamp_micros()).unwrap_or(ts)
}

pub fn normalize_optional_text(value: Option<String>) -> Option<String> {
    value.and_then(|raw| {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_precision_drops_nanoseconds() {
        let ts = DateTime::from_timestamp(1_700_000_000, 123_456_789).expect("timestamp");
        let truncated = storage_precision(ts);
        assert_eq!(truncated.timestamp_subsec_nanos(), 123_456_000);
    }

    #[test]
    fn blank_text_is_dropped() {
        assert_eq!(normalize_optional_text(Some("   ".to_string())), None);
        assert_eq!(
            normalize_optional_text(Some(" late arrival ".to_string())),
            Some("late arrival".to_string())
        );
    }
}
