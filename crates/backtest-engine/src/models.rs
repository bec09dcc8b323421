use analysis_core::{AnalysisError, Direction};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Configuration for a backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestConfig {
    /// Candles fed to the signal path at each step.
    pub window: usize,
    /// Fraction of the balance committed to a new position.
    pub capital_reserve: f64,
    pub stop_loss_pct: f64,   // as decimal, e.g. 0.05 = 5%
    pub take_profit_pct: f64, // as decimal, e.g. 0.10 = 10%
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            window: 50,
            capital_reserve: 0.95,
            stop_loss_pct: 0.05,
            take_profit_pct: 0.10,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

impl BacktestConfig {
    /// Defaults overridden by `FUSION_BACKTEST_*` environment variables.
    pub fn from_env() -> Result<Self, AnalysisError> {
        let defaults = Self::default();
        let config = Self {
            window: env_parse("FUSION_BACKTEST_WINDOW").unwrap_or(defaults.window),
            capital_reserve: env_parse("FUSION_BACKTEST_CAPITAL_RESERVE")
                .unwrap_or(defaults.capital_reserve),
            stop_loss_pct: env_parse("FUSION_STOP_LOSS_PCT").unwrap_or(defaults.stop_loss_pct),
            take_profit_pct: env_parse("FUSION_TAKE_PROFIT_PCT")
                .unwrap_or(defaults.take_profit_pct),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.window == 0 {
            return Err(AnalysisError::Configuration("backtest window must be > 0".to_string()));
        }
        if !(self.capital_reserve > 0.0 && self.capital_reserve <= 1.0) {
            return Err(AnalysisError::Configuration(format!(
                "capital reserve {} outside (0, 1]",
                self.capital_reserve
            )));
        }
        if self.stop_loss_pct <= 0.0 || self.take_profit_pct <= 0.0 {
            return Err(AnalysisError::Configuration(
                "stop loss and take profit must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Why a simulated position was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitReason {
    OpposingSignal,
    StopLoss,
    TakeProfit,
    EndOfData,
}

/// A round-trip trade (entry + exit) from the backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestTrade {
    pub entry_date: DateTime<Utc>,
    pub exit_date: DateTime<Utc>,
    /// Buy = long, Sell = short
    pub action: Direction,
    pub entry_price: f64,
    pub exit_price: f64,
    pub shares: f64,
    pub return_abs: f64,
    pub return_pct: f64,
    pub confidence: f64,
    pub exit_reason: ExitReason,
    pub reasoning: String,
}

impl BacktestTrade {
    pub fn is_win(&self) -> bool {
        self.return_abs > 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Period {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Result of a completed backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub symbol: String,
    pub period: Period,
    pub initial_balance: f64,
    pub final_balance: f64,
    pub total_trades: u32,
    pub winning_trades: u32,
    pub losing_trades: u32,
    pub win_rate: f64, // 0-100 percentage
    pub total_return_pct: f64,
    pub max_drawdown_pct: f64,
    /// Mean trade return in percent.
    pub average_return: f64,
    pub sharpe_ratio: f64,
    /// Windows whose signal could not be produced.
    pub skipped_steps: u32,
    pub trades: Vec<BacktestTrade>,
}

/// Sampling plan for the quick accuracy check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuickAccuracyConfig {
    pub offset: usize,
    pub stride: usize,
    pub lookahead: usize,
    pub window: usize,
    /// Reported when no directional sample was taken.
    pub default_accuracy: f64,
    pub confidence_per_sample: f64,
    pub max_confidence: f64,
    /// Candles fetched by `BacktestRunner::quick_accuracy_test`.
    pub history_limit: usize,
}

impl Default for QuickAccuracyConfig {
    fn default() -> Self {
        Self {
            offset: 20,
            stride: 5,
            lookahead: 3,
            window: 20,
            default_accuracy: 65.0,
            confidence_per_sample: 15.0,
            max_confidence: 95.0,
            history_limit: 100,
        }
    }
}

/// Directional hit rate over sampled points. Diagnostic only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuickAccuracy {
    pub accuracy: f64,
    pub confidence: f64,
    pub samples: u32,
    pub wins: u32,
}
