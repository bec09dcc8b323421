use analysis_core::{AnalysisError, PriceProvider, Timeframe};
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::accuracy::quick_accuracy;
use crate::engine::BacktestEngine;
use crate::models::*;
use crate::store::TradeRepository;

/// Fetches history through a `PriceProvider` and drives the engine.
pub struct BacktestRunner {
    prices: Arc<dyn PriceProvider>,
    engine: BacktestEngine,
    trades: Option<Arc<dyn TradeRepository>>,
    timeframe: Timeframe,
    accuracy: QuickAccuracyConfig,
}

impl BacktestRunner {
    pub fn new(prices: Arc<dyn PriceProvider>, engine: BacktestEngine) -> Self {
        Self {
            prices,
            engine,
            trades: None,
            timeframe: Timeframe::Day1,
            accuracy: QuickAccuracyConfig::default(),
        }
    }

    pub fn with_trade_repository(mut self, repository: Arc<dyn TradeRepository>) -> Self {
        self.trades = Some(repository);
        self
    }

    pub fn with_timeframe(mut self, timeframe: Timeframe) -> Self {
        self.timeframe = timeframe;
        self
    }

    pub fn with_accuracy_config(mut self, config: QuickAccuracyConfig) -> Self {
        self.accuracy = config;
        self
    }

    pub async fn run_backtest(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        initial_balance: f64,
    ) -> Result<BacktestResult, AnalysisError> {
        if end <= start {
            return Err(AnalysisError::InvalidData(format!(
                "backtest range is empty: {} .. {}",
                start, end
            )));
        }

        // Providers return the most recent `limit` candles, so the fetch has to
        // reach from `start` up to now for a range that ends in the past.
        let horizon = end.max(Utc::now());
        let span = (horizon - start).num_minutes() / self.timeframe.to_minutes().max(1);
        let limit = usize::try_from(span).unwrap_or(0).saturating_add(1);

        let candles: Vec<_> = self
            .prices
            .get_price_history(symbol, self.timeframe, limit)
            .await?
            .into_iter()
            .filter(|c| c.timestamp >= start && c.timestamp <= end)
            .collect();

        tracing::info!(
            "Loaded {} candles for {} between {} and {}",
            candles.len(),
            symbol,
            start.date_naive(),
            end.date_naive()
        );

        let mut result = self.engine.run(symbol, &candles, initial_balance)?;
        result.period = Period { start, end };

        if let Some(repository) = &self.trades {
            if let Err(e) = repository.save_trades(symbol, &result.trades).await {
                tracing::warn!("Failed to store trades for {}: {}", symbol, e);
            }
        }

        Ok(result)
    }

    /// Quick accuracy over the most recent candles.
    pub async fn quick_accuracy_test(&self, symbol: &str) -> Result<QuickAccuracy, AnalysisError> {
        let candles = self
            .prices
            .get_price_history(symbol, self.timeframe, self.accuracy.history_limit)
            .await?;
        if candles.is_empty() {
            return Err(AnalysisError::InsufficientData(format!("no candles for {}", symbol)));
        }

        let result = quick_accuracy(self.engine.generator(), symbol, &candles, &self.accuracy);
        tracing::info!(
            "Quick accuracy for {}: {:.1}% over {} samples",
            symbol,
            result.accuracy,
            result.samples
        );
        Ok(result)
    }
}
