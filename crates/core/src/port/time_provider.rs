// Time Provider Port (for testability)

/// Time provider interface (allows mocking in tests)
pub trait TimeProvider: Send + Sync {
    /// Get current time in milliseconds since epoch
    fn now_millis(&self) -> i64;

    /// Current wall-clock time as an RFC 3339 string (report timestamps)
    fn now_rfc3339(&self) -> String;
}

/// System time provider (production)
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    fn now_rfc3339(&self) -> String {
        chrono::Utc::now().to_rfc3339()
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Mock clock starting at a fixed epoch, advanced manually
    pub struct MockTimeProvider {
        millis: Arc<Mutex<i64>>,
    }

    impl MockTimeProvider {
        pub fn new(start_millis: i64) -> Self {
            Self {
                millis: Arc::new(Mutex::new(start_millis)),
            }
        }

        pub fn advance(&self, delta_millis: i64) {
            *self.millis.lock().unwrap() += delta_millis;
        }
    }

    impl TimeProvider for MockTimeProvider {
        fn now_millis(&self) -> i64 {
            *self.millis.lock().unwrap()
        }

        fn now_rfc3339(&self) -> String {
            let millis = *self.millis.lock().unwrap();
            chrono::DateTime::from_timestamp_millis(millis)
                .map(|dt| dt.to_rfc3339())
                .unwrap_or_default()
        }
    }
}
