//! Strictly monotonic timestamp source

use chrono::Utc;
use leads_common::Time;
use std::sync::atomic::{AtomicI64, Ordering};

/// Issues nanosecond timestamps that never repeat and never go backwards,
/// even when the wall clock is coarse or steps back.
#[derive(Debug)]
pub struct Clock {
    last: AtomicI64,
}

impl Clock {
    pub fn new() -> Self {
        Self::starting_after(0)
    }

    /// A clock whose first reading is later than `floor`
    pub fn starting_after(floor: Time) -> Self {
        Self {
            last: AtomicI64::new(floor),
        }
    }

    /// Current time in nanoseconds, strictly greater than any earlier reading
    pub fn now(&self) -> Time {
        let wall = wall_clock_nanos();
        let next = |prev: Time| wall.max(prev.saturating_add(1));

        match self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |prev| Some(next(prev)))
        {
            Ok(prev) | Err(prev) => next(prev),
        }
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

fn wall_clock_nanos() -> Time {
    // Out of range only after the year 2262
    Utc::now().timestamp_nanos_opt().unwrap_or(Time::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readings_strictly_increase() {
        let clock = Clock::new();
        let mut prev = clock.now();
        for _ in 0..10_000 {
            let next = clock.now();
            assert!(next > prev);
            prev = next;
        }
    }

    #[test]
    fn test_floor_in_the_future_is_respected() {
        let floor = wall_clock_nanos() + 1_000_000_000_000;
        let clock = Clock::starting_after(floor);
        assert_eq!(clock.now(), floor + 1);
        assert_eq!(clock.now(), floor + 2);
    }

    #[test]
    fn test_tracks_wall_clock() {
        let before = wall_clock_nanos();
        let reading = Clock::new().now();
        assert!(reading >= before);
    }
}
