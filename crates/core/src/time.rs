use chrono::{DateTime, Duration, Utc};

/// Source of wall-clock timestamps for training events.
///
/// Services take a `Clock` instead of calling `Utc::now()` so tests can pin time.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    System,
    Fixed(DateTime<Utc>),
}

impl Clock {
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::System => Utc::now(),
            Clock::Fixed(at) => *at,
        }
    }

    /// Moves a fixed clock forward. System clocks ignore this.
    pub fn advance(&mut self, delta: Duration) {
        if let Clock::Fixed(at) = self {
            *at += delta;
        }
    }
}

/// Unix timestamp used by tests (2024-03-01T09:00:00Z).
pub const TEST_EPOCH: i64 = 1_709_283_600;

/// Deterministic timestamp for tests.
///
/// # Panics
///
/// Panics if `TEST_EPOCH` is out of chrono's range, which it is not.
#[must_use]
pub fn test_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(TEST_EPOCH, 0).expect("test epoch is representable")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_advances_but_system_does_not_panic() {
        let mut clock = Clock::fixed(test_now());
        clock.advance(Duration::seconds(90));
        assert_eq!(clock.now(), test_now() + Duration::seconds(90));

        let mut system = Clock::System;
        system.advance(Duration::seconds(90));
        assert!(system.now() > test_now());
    }
}
