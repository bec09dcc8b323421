use analysis_core::AnalysisError;
use async_trait::async_trait;
use dashmap::DashMap;

use crate::models::BacktestTrade;

/// Persistence for simulated trades
#[async_trait]
pub trait TradeRepository: Send + Sync {
    async fn save_trades(&self, symbol: &str, trades: &[BacktestTrade]) -> Result<(), AnalysisError>;

    async fn trades(&self, symbol: &str) -> Result<Vec<BacktestTrade>, AnalysisError>;
}

#[derive(Default)]
pub struct InMemoryTradeRepository {
    by_symbol: DashMap<String, Vec<BacktestTrade>>,
}

impl InMemoryTradeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_trades(&self) -> usize {
        self.by_symbol.iter().map(|entry| entry.value().len()).sum()
    }
}

#[async_trait]
impl TradeRepository for InMemoryTradeRepository {
    async fn save_trades(&self, symbol: &str, trades: &[BacktestTrade]) -> Result<(), AnalysisError> {
        self.by_symbol
            .entry(symbol.to_uppercase())
            .or_default()
            .extend(trades.iter().cloned());
        Ok(())
    }

    async fn trades(&self, symbol: &str) -> Result<Vec<BacktestTrade>, AnalysisError> {
        Ok(self
            .by_symbol
            .get(&symbol.to_uppercase())
            .map(|t| t.value().clone())
            .unwrap_or_default())
    }
}
