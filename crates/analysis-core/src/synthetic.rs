//! Seeded synthetic candle series for tests and offline demos.
//!
//! Nothing in the production fusion or backtest paths falls back to these
//! generators; callers must opt in explicitly.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::{PriceCandle, Timeframe};

/// Deterministic random source
pub struct SeededRng {
    rng: StdRng,
}

impl SeededRng {
    pub fn new(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed) }
    }

    /// Uniform in [low, high).
    pub fn range(&mut self, low: f64, high: f64) -> f64 {
        if high <= low {
            return low;
        }
        self.rng.gen_range(low..high)
    }
}

fn candle(timestamp: DateTime<Utc>, open: f64, close: f64, wick: f64, volume: f64) -> PriceCandle {
    PriceCandle {
        timestamp,
        open,
        high: open.max(close) * (1.0 + wick),
        low: open.min(close) * (1.0 - wick),
        close,
        volume,
    }
}

/// Geometric random walk: each close moves by `drift` plus a uniform shock of
/// at most `volatility` (both fractional).
pub fn random_walk(
    rng: &mut SeededRng,
    start_price: f64,
    len: usize,
    drift: f64,
    volatility: f64,
    start: DateTime<Utc>,
    timeframe: Timeframe,
) -> Vec<PriceCandle> {
    let step = Duration::minutes(timeframe.to_minutes());
    let mut candles = Vec::with_capacity(len);
    let mut prev_close = start_price;

    for i in 0..len {
        let shock = rng.range(-volatility, volatility);
        let close = (prev_close * (1.0 + drift + shock)).max(0.01);
        let wick = rng.range(0.0, volatility.max(0.001) / 2.0);
        let volume = rng.range(100_000.0, 1_000_000.0);
        candles.push(candle(start + step * i as i32, prev_close, close, wick, volume));
        prev_close = close;
    }

    candles
}

/// Strictly monotonic series compounding by `step_pct` per candle
/// (negative for a falling series).
pub fn trending(
    start_price: f64,
    len: usize,
    step_pct: f64,
    start: DateTime<Utc>,
    timeframe: Timeframe,
) -> Vec<PriceCandle> {
    let step = Duration::minutes(timeframe.to_minutes());
    let mut candles = Vec::with_capacity(len);
    let mut prev_close = start_price;

    for i in 0..len {
        let close = prev_close * (1.0 + step_pct);
        candles.push(candle(start + step * i as i32, prev_close, close, 0.001, 1_000_000.0));
        prev_close = close;
    }

    candles
}

/// Flat series at `price`.
pub fn flat(price: f64, len: usize, start: DateTime<Utc>, timeframe: Timeframe) -> Vec<PriceCandle> {
    trending(price, len, 0.0, start, timeframe)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_same_seed_same_series() {
        let a = random_walk(&mut SeededRng::new(7), 100.0, 60, 0.0, 0.02, start(), Timeframe::Day1);
        let b = random_walk(&mut SeededRng::new(7), 100.0, 60, 0.0, 0.02, start(), Timeframe::Day1);
        assert_eq!(a, b);
    }

    #[test]
    fn test_random_walk_candles_are_consistent() {
        let candles = random_walk(&mut SeededRng::new(3), 50.0, 100, 0.001, 0.03, start(), Timeframe::Hour1);
        assert_eq!(candles.len(), 100);
        for w in candles.windows(2) {
            assert!(w[1].timestamp > w[0].timestamp);
            assert_eq!(w[1].open, w[0].close);
        }
        for c in &candles {
            assert!(c.high >= c.open.max(c.close));
            assert!(c.low <= c.open.min(c.close));
            assert!(c.close > 0.0);
        }
    }

    #[test]
    fn test_trending_is_strictly_monotonic() {
        let rising = trending(100.0, 30, 0.01, start(), Timeframe::Day1);
        assert!(rising.windows(2).all(|w| w[1].close > w[0].close));
        let falling = trending(100.0, 30, -0.01, start(), Timeframe::Day1);
        assert!(falling.windows(2).all(|w| w[1].close < w[0].close));
    }
}
