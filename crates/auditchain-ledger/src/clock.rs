/// Timestamp layout written into entries: local time with microseconds.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Source of entry timestamps.
pub trait Clock: Send + Sync {
    fn timestamp(&self) -> String;
}

/// Local wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn timestamp(&self) -> String {
        chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
    }
}

/// Always returns the same timestamp. Used to make hashes reproducible.
#[derive(Clone, Debug)]
pub struct FixedClock(pub String);

impl FixedClock {
    pub fn new(timestamp: impl Into<String>) -> Self {
        Self(timestamp.into())
    }
}

impl Clock for FixedClock {
    fn timestamp(&self) -> String {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_layout() {
        let ts = SystemClock.timestamp();
        assert!(chrono::NaiveDateTime::parse_from_str(&ts, TIMESTAMP_FORMAT).is_ok());
        // "YYYY-MM-DD HH:MM:SS.ffffff"
        assert_eq!(ts.len(), 26);
    }

    #[test]
    fn fixed_clock_repeats() {
        let clock = FixedClock::new("2024-01-01 00:00:00.000000");
        assert_eq!(clock.timestamp(), clock.timestamp());
    }
}
