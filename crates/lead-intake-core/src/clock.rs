//! Wall-clock abstraction.
//!
//! Scoring depends on the local hour and the canonicalizer stamps receive
//! times, so both take a [`Clock`] instead of reading the system time
//! directly.

use chrono::{DateTime, FixedOffset, Local, TimeZone, Timelike, Utc};

pub trait Clock: Send + Sync {
    /// Current time in the clock's local offset.
    fn now(&self) -> DateTime<FixedOffset>;

    fn now_utc(&self) -> DateTime<Utc> {
        self.now().with_timezone(&Utc)
    }

    fn local_hour(&self) -> u32 {
        self.now().hour()
    }
}

/// The host's local clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<FixedOffset>);

impl FixedClock {
    /// A UTC clock frozen at `hour:00` on 2024-01-15.
    pub fn at_hour(hour: u32) -> Self {
        let at = Utc
            .with_ymd_and_hms(2024, 1, 15, hour, 0, 0)
            .single()
            .unwrap_or_default();
        Self(at.fixed_offset())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock_hour() {
        assert_eq!(FixedClock::at_hour(10).local_hour(), 10);
        assert_eq!(FixedClock::at_hour(23).local_hour(), 23);
    }
}
