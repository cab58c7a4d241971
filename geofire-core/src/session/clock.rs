//! Write timestamps.

use chrono::Utc;

/// Hands out strictly increasing millisecond timestamps.
///
/// Wall-clock time is used when it moves forward; otherwise the previous
/// value plus one, so two writes in the same millisecond (or across a clock
/// step backwards) still order correctly.
#[derive(Debug, Default)]
pub struct WriteClock {
    last: i64,
}

impl WriteClock {
    /// Creates a clock that has not issued any timestamp yet.
    #[must_use]
    pub const fn new() -> Self {
        Self { last: 0 }
    }

    /// Returns the next timestamp in milliseconds since the Unix epoch.
    pub fn next(&mut self) -> i64 {
        self.next_after(Utc::now().timestamp_millis())
    }

    fn next_after(&mut self, now: i64) -> i64 {
        self.last = now.max(self.last + 1);
        self.last
    }
}
