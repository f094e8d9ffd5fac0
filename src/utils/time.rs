use std::time::{SystemTime, UNIX_EPOCH};

pub fn current_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("System time is before Unix epoch")
        .as_secs() as i64
}

pub fn elapsed_seconds(start: i64, end: i64) -> i64 {
    end - start
}


pub fn is_expired(timestamp: i64, timeout: i64, current_time: i64) -> bool {
    elapsed_seconds(timestamp, current_time) > timeout
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_timestamp() {
        let ts = current_timestamp();
        // Should be a reasonable timestamp (after 2020-01-01)
        assert!(ts > 1577836800);
        // Should be before 2100-01-01
        assert!(ts < 4102444800);
    }

    #[test]
    fn test_elapsed_seconds() {
        assert_eq!(elapsed_seconds(100, 150), 50);
        assert_eq!(elapsed_seconds(1000, 1000), 0);
        assert_eq!(elapsed_seconds(200, 100), -100);
    }

    #[test]
    fn test_is_expired() {
        let current = 1000;

        // Not expired: timestamp is recent
        assert!(!is_expired(950, 100, current));

        // Expired: timestamp is old
        assert!(is_expired(800, 100, current));

        // Edge case: exactly at timeout
        assert!(!is_expired(900, 100, current));

        // Edge case: just over timeout
        assert!(is_expired(899, 100, current));
    }

    #[test]
    fn test_is_expired_stale_record() {
        // Simulate the record staleness window used by the sync gate
        let stale_window = 300; // 5 minutes
        let current_time = current_timestamp();

        // Record written 2 minutes ago - still fresh
        let recent_write = current_time - 120;
        assert!(!is_expired(recent_write, stale_window, current_time));

        // Record written 10 minutes ago - stale, must be refreshed
        let old_write = current_time - 600;
        assert!(is_expired(old_write, stale_window, current_time));
    }
}
