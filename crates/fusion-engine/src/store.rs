use analysis_core::{AnalysisError, FusionSignal};
use async_trait::async_trait;
use dashmap::DashMap;

/// Persistence for generated signals
#[async_trait]
pub trait SignalRepository: Send + Sync {
    /// Store `signal` as the active one for its symbol, deactivating older ones.
    async fn save(&self, signal: FusionSignal) -> Result<(), AnalysisError>;

    async fn active(&self, symbol: &str) -> Result<Option<FusionSignal>, AnalysisError>;

    /// All stored signals for `symbol`, oldest first.
    async fn history(&self, symbol: &str) -> Result<Vec<FusionSignal>, AnalysisError>;
}

#[derive(Default)]
pub struct InMemorySignalRepository {
    by_symbol: DashMap<String, Vec<FusionSignal>>,
}

impl InMemorySignalRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_signals(&self) -> Vec<FusionSignal> {
        self.by_symbol
            .iter()
            .filter_map(|entry| entry.value().iter().rev().find(|s| s.is_active).cloned())
            .collect()
    }
}

#[async_trait]
impl SignalRepository for InMemorySignalRepository {
    async fn save(&self, mut signal: FusionSignal) -> Result<(), AnalysisError> {
        let key = signal.symbol.to_uppercase();
        let mut stored = self.by_symbol.entry(key).or_default();
        for old in stored.iter_mut() {
            old.is_active = false;
        }
        signal.is_active = true;
        stored.push(signal);
        Ok(())
    }

    async fn active(&self, symbol: &str) -> Result<Option<FusionSignal>, AnalysisError> {
        Ok(self
            .by_symbol
            .get(&symbol.to_uppercase())
            .and_then(|signals| signals.iter().rev().find(|s| s.is_active).cloned()))
    }

    async fn history(&self, symbol: &str) -> Result<Vec<FusionSignal>, AnalysisError> {
        Ok(self
            .by_symbol
            .get(&symbol.to_uppercase())
            .map(|signals| signals.clone())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::{fuse, FusionInput};
    use analysis_core::{FusionConfig, PerSource, SourceScore};
    use chrono::Utc;

    fn signal(symbol: &str, score: f64) -> FusionSignal {
        let mut sources = PerSource::<SourceScore>::default();
        sources.technical = SourceScore::new(score, 0);
        fuse(&FusionConfig::default(), &FusionInput::new(symbol, sources, Utc::now()))
    }

    #[tokio::test]
    async fn test_new_signal_supersedes_old() {
        let repo = InMemorySignalRepository::new();
        repo.save(signal("AAPL", 0.9)).await.unwrap();
        repo.save(signal("aapl", -0.9)).await.unwrap();

        let history = repo.history("AAPL").await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(!history[0].is_active);
        assert!(history[1].is_active);

        let active = repo.active("AAPL").await.unwrap().unwrap();
        assert!(active.final_score < 0.0);
    }

    #[tokio::test]
    async fn test_symbols_are_independent() {
        let repo = InMemorySignalRepository::new();
        repo.save(signal("AAPL", 0.5)).await.unwrap();
        repo.save(signal("MSFT", 0.5)).await.unwrap();

        assert_eq!(repo.active_signals().len(), 2);
        assert!(repo.active("TSLA").await.unwrap().is_none());
        assert!(repo.history("TSLA").await.unwrap().is_empty());
    }
}
