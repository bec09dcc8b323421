use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Mutex;

use crate::AnalysisError;

struct BudgetState {
    used: u32,
    day: NaiveDate,
}

/// Daily call budget for a rate-limited external service (e.g. LLM calls/day).
///
/// The counter resets on the first call after a UTC midnight boundary.
/// Check-and-consume happens under one lock so concurrent callers never
/// overspend.
pub struct RateLimiter {
    daily_limit: u32,
    state: Mutex<BudgetState>,
}

impl RateLimiter {
    pub fn new(daily_limit: u32) -> Self {
        Self::starting_at(daily_limit, Utc::now())
    }

    pub fn starting_at(daily_limit: u32, now: DateTime<Utc>) -> Self {
        Self {
            daily_limit,
            state: Mutex::new(BudgetState { used: 0, day: now.date_naive() }),
        }
    }

    /// Limit from `var`, falling back to `default` when unset or unparsable.
    pub fn from_env(var: &str, default: u32) -> Self {
        let limit = std::env::var(var)
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default);
        Self::new(limit)
    }

    pub fn daily_limit(&self) -> u32 {
        self.daily_limit
    }

    pub fn try_consume(&self) -> bool {
        self.try_consume_at(Utc::now())
    }

    pub fn try_consume_at(&self, now: DateTime<Utc>) -> bool {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        Self::roll_over(&mut state, now);
        if state.used < self.daily_limit {
            state.used += 1;
            true
        } else {
            false
        }
    }

    /// Like `try_consume`, reporting exhaustion as `BudgetExhausted`.
    pub fn consume(&self) -> Result<(), AnalysisError> {
        if self.try_consume() {
            Ok(())
        } else {
            Err(AnalysisError::BudgetExhausted(format!(
                "daily limit of {} calls reached",
                self.daily_limit
            )))
        }
    }

    pub fn remaining_at(&self, now: DateTime<Utc>) -> u32 {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        Self::roll_over(&mut state, now);
        self.daily_limit.saturating_sub(state.used)
    }

    pub fn remaining(&self) -> u32 {
        self.remaining_at(Utc::now())
    }

    pub fn reset(&self) {
        self.reset_at(Utc::now());
    }

    pub fn reset_at(&self, now: DateTime<Utc>) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.used = 0;
        state.day = now.date_naive();
    }

    fn roll_over(state: &mut BudgetState, now: DateTime<Utc>) {
        let today = now.date_naive();
        if today != state.day {
            tracing::debug!("Call budget rolled over from {} to {}", state.day, today);
            state.used = 0;
            state.day = today;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Arc;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_consumes_up_to_limit() {
        let limiter = RateLimiter::starting_at(2, at(1, 9));
        assert!(limiter.try_consume_at(at(1, 10)));
        assert!(limiter.try_consume_at(at(1, 11)));
        assert!(!limiter.try_consume_at(at(1, 12)));
        assert_eq!(limiter.remaining_at(at(1, 12)), 0);
    }

    #[test]
    fn test_resets_at_midnight() {
        let limiter = RateLimiter::starting_at(1, at(1, 23));
        assert!(limiter.try_consume_at(at(1, 23)));
        assert!(!limiter.try_consume_at(at(1, 23)));
        assert!(limiter.try_consume_at(at(2, 0)));
    }

    #[test]
    fn test_explicit_reset() {
        let limiter = RateLimiter::starting_at(1, at(5, 8));
        assert!(limiter.try_consume_at(at(5, 8)));
        limiter.reset_at(at(5, 9));
        assert_eq!(limiter.remaining_at(at(5, 9)), 1);
    }

    #[test]
    fn test_zero_limit_reports_exhausted() {
        let limiter = RateLimiter::new(0);
        assert!(matches!(limiter.consume(), Err(AnalysisError::BudgetExhausted(_))));
    }

    #[test]
    fn test_concurrent_consumers_never_overspend() {
        let limiter = Arc::new(RateLimiter::new(50));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                std::thread::spawn(move || (0..20).filter(|_| limiter.try_consume()).count())
            })
            .collect();
        let granted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(granted, 50);
    }
}
