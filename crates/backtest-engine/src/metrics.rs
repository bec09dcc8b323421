use statrs::statistics::Statistics;

use crate::models::BacktestTrade;

/// Trade-level aggregates of a finished run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradeMetrics {
    pub total_trades: u32,
    pub winning_trades: u32,
    pub losing_trades: u32,
    pub win_rate: f64,
    pub average_return: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown_pct: f64,
}

/// Largest peak-to-trough decline of the running balance, in percent.
/// The balance is sampled at the start and after every closed trade.
pub fn max_drawdown_pct(initial_balance: f64, trades: &[BacktestTrade]) -> f64 {
    let mut balance = initial_balance;
    let mut peak = initial_balance;
    let mut max_drawdown: f64 = 0.0;

    for trade in trades {
        balance += trade.return_abs;
        if balance > peak {
            peak = balance;
        } else if peak > 0.0 {
            max_drawdown = max_drawdown.max((peak - balance) / peak * 100.0);
        }
    }
    max_drawdown
}

/// Mean over population standard deviation of trade returns (percent).
/// A zero or undefined deviation counts as 1; no trades gives 0.
pub fn sharpe_ratio(returns: &[f64]) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let mean = returns.mean();
    let std_dev = returns.population_std_dev();
    if std_dev.is_finite() && std_dev > 0.0 {
        mean / std_dev
    } else {
        mean
    }
}

pub fn summarize(initial_balance: f64, trades: &[BacktestTrade]) -> TradeMetrics {
    let total_trades = trades.len() as u32;
    let winning_trades = trades.iter().filter(|t| t.is_win()).count() as u32;
    let returns: Vec<f64> = trades.iter().map(|t| t.return_pct).collect();

    TradeMetrics {
        total_trades,
        winning_trades,
        losing_trades: total_trades - winning_trades,
        win_rate: if total_trades > 0 {
            winning_trades as f64 / total_trades as f64 * 100.0
        } else {
            0.0
        },
        average_return: if returns.is_empty() { 0.0 } else { returns.as_slice().mean() },
        sharpe_ratio: sharpe_ratio(&returns),
        max_drawdown_pct: max_drawdown_pct(initial_balance, trades),
    }
}
