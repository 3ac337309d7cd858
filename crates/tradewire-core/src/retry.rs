//! Delay schedule between retry attempts.

use std::time::Duration;

/// Backoff strategy for retrying failed requests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// Uses a fixed delay between retries.
    Fixed {
        /// Delay between retries.
        delay: Duration,
    },
    /// Uses an exponential delay between retries.
    ///
    /// The delay is calculated as `base * (factor ^ attempt)`, capped at `max`.
    Exponential {
        /// The initial backoff duration.
        base: Duration,
        /// The multiplicative factor for each subsequent retry.
        factor: f64,
        /// The maximum duration to wait between retries.
        max: Duration,
        /// Adds up to +50% random delay (never more than `factor - 1`),
        /// still capped at `max`.
        jitter: bool,
    },
}

impl Default for Backoff {
    /// One second, doubling per attempt: 1s, 2s, 4s, ...
    fn default() -> Self {
        Self::Exponential {
            base: Duration::from_secs(1),
            factor: 2.0,
            max: Duration::from_secs(60),
            jitter: false,
        }
    }
}

impl Backoff {
    /// Delay before retry number `attempt` (0-based).
    pub fn delay(self, attempt: u32) -> Duration {
        match self {
            Self::Fixed { delay } => delay,
            Self::Exponential {
                base,
                factor,
                max,
                jitter,
            } => {
                let factor = factor.max(1.0);
                let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
                let seconds = base.as_secs_f64() * factor.powi(exponent);
                let capped = seconds.min(max.as_secs_f64());

                // A stretched delay stays at or below the next unstretched
                // one, so the sequence never shrinks for any factor.
                let stretched = if jitter {
                    let spread = (factor - 1.0).min(0.5);
                    (capped * (1.0 + fastrand::f64() * spread)).min(max.as_secs_f64())
                } else {
                    capped
                };

                Duration::from_secs_f64(stretched)
            }
        }
    }

    /// Delays for `max_retries` consecutive retries.
    pub fn schedule(self, max_retries: u32) -> Vec<Duration> {
        (0..max_retries).map(|attempt| self.delay(attempt)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_backoff_doubles_from_one_second() {
        let backoff = Backoff::default();

        assert_eq!(
            backoff.schedule(4),
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4),
                Duration::from_secs(8),
            ]
        );
    }

    #[test]
    fn test_fixed_backoff() {
        let backoff = Backoff::Fixed {
            delay: Duration::from_millis(100),
        };

        assert_eq!(backoff.delay(0), Duration::from_millis(100));
        assert_eq!(backoff.delay(10), Duration::from_millis(100));
    }

    #[test]
    fn test_exponential_backoff_is_capped() {
        let backoff = Backoff::Exponential {
            base: Duration::from_millis(100),
            factor: 2.0,
            max: Duration::from_secs(1),
            jitter: false,
        };

        assert_eq!(backoff.delay(3), Duration::from_millis(800));
        assert_eq!(backoff.delay(4), Duration::from_secs(1));
        assert_eq!(backoff.delay(u32::MAX), Duration::from_secs(1));
    }

    #[test]
    fn test_jittered_schedule_never_decreases() {
        let backoff = Backoff::Exponential {
            base: Duration::from_millis(100),
            factor: 2.0,
            max: Duration::from_secs(2),
            jitter: true,
        };

        for _ in 0..20 {
            let schedule = backoff.schedule(8);
            for pair in schedule.windows(2) {
                assert!(pair[0] <= pair[1], "schedule shrank: {schedule:?}");
            }
            assert!(schedule[0] >= Duration::from_millis(100));
            assert!(schedule.iter().all(|delay| *delay <= Duration::from_secs(2)));
        }
    }

    #[test]
    fn test_jitter_with_gentle_factor_never_decreases() {
        let backoff = Backoff::Exponential {
            base: Duration::from_secs(1),
            factor: 1.2,
            max: Duration::from_secs(60),
            jitter: true,
        };

        for _ in 0..200 {
            let schedule = backoff.schedule(10);
            for pair in schedule.windows(2) {
                assert!(pair[0] <= pair[1], "schedule shrank: {schedule:?}");
            }
        }
    }

    #[test]
    fn test_unit_factor_ignores_jitter() {
        let backoff = Backoff::Exponential {
            base: Duration::from_millis(250),
            factor: 1.0,
            max: Duration::from_secs(1),
            jitter: true,
        };

        assert_eq!(backoff.schedule(3), vec![Duration::from_millis(250); 3]);
    }
}
