use analysis_core::{AnalysisError, SourceKind, SourceScore, SourceScorer};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;

/// Table of already-scored values for one source, keyed by symbol
/// (case-insensitive). Ingestion jobs update it while scorers read.
pub struct PrecomputedScorer {
    kind: SourceKind,
    table: DashMap<String, SourceScore>,
}

impl PrecomputedScorer {
    pub fn new(kind: SourceKind) -> Self {
        Self { kind, table: DashMap::new() }
    }

    pub fn from_map(kind: SourceKind, scores: HashMap<String, SourceScore>) -> Self {
        let scorer = Self::new(kind);
        for (symbol, score) in scores {
            scorer.update(&symbol, score);
        }
        scorer
    }

    /// Insert or replace, re-clamping the score.
    pub fn update(&self, symbol: &str, score: SourceScore) {
        self.table.insert(
            symbol.trim().to_uppercase(),
            SourceScore::new(score.score, score.mention_count),
        );
    }

    pub fn remove(&self, symbol: &str) -> Option<SourceScore> {
        self.table.remove(&symbol.trim().to_uppercase()).map(|(_, s)| s)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

#[async_trait]
impl SourceScorer for PrecomputedScorer {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn score(&self, symbol: &str) -> Result<SourceScore, AnalysisError> {
        self.table
            .get(&symbol.trim().to_uppercase())
            .map(|s| *s.value())
            .ok_or_else(|| {
                AnalysisError::SourceUnavailable(format!("no {} score for {}", self.kind, symbol))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lookup_is_case_insensitive() {
        let scorer = PrecomputedScorer::new(SourceKind::Social);
        scorer.update("btc", SourceScore::new(0.6, 80));

        let score = scorer.score("BTC").await.unwrap();
        assert_eq!(score, SourceScore::new(0.6, 80));
        assert_eq!(scorer.kind(), SourceKind::Social);
    }

    #[tokio::test]
    async fn test_missing_symbol_is_unavailable() {
        let scorer = PrecomputedScorer::new(SourceKind::Messaging);
        assert!(matches!(
            scorer.score("ETH").await,
            Err(AnalysisError::SourceUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_from_map_and_remove() {
        let mut map = HashMap::new();
        map.insert("eth".to_string(), SourceScore { score: 3.0, mention_count: 5 });
        let scorer = PrecomputedScorer::from_map(SourceKind::News, map);

        assert_eq!(scorer.len(), 1);
        assert_eq!(scorer.score("ETH").await.unwrap().score, 1.0);
        assert!(scorer.remove("Eth").is_some());
        assert!(scorer.is_empty());
    }
}
