use analysis_core::{AnalysisError, Headline, HeadlineSource};
use async_trait::async_trait;
use dashmap::DashMap;

/// In-memory headline feed keyed by upper-cased symbol. Collectors push into
/// it; scorers read from it.
#[derive(Default)]
pub struct StaticHeadlines {
    by_symbol: DashMap<String, Vec<Headline>>,
}

impl StaticHeadlines {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the headlines held for `symbol`.
    pub fn insert(&self, symbol: &str, headlines: Vec<Headline>) {
        self.by_symbol.insert(symbol.to_uppercase(), headlines);
    }

    pub fn push(&self, symbol: &str, headline: Headline) {
        self.by_symbol.entry(symbol.to_uppercase()).or_default().push(headline);
    }

    pub fn len(&self) -> usize {
        self.by_symbol.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_symbol.is_empty()
    }
}

#[async_trait]
impl HeadlineSource for StaticHeadlines {
    async fn headlines(&self, symbol: &str) -> Result<Vec<Headline>, AnalysisError> {
        Ok(self
            .by_symbol
            .get(&symbol.to_uppercase())
            .map(|h| h.value().clone())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_push_and_case_insensitive_lookup() {
        let feed = StaticHeadlines::new();
        feed.push("btc", Headline { title: "a".into(), description: None, published_at: None });
        feed.push("BTC", Headline { title: "b".into(), description: None, published_at: None });

        assert_eq!(feed.len(), 1);
        assert_eq!(feed.headlines("Btc").await.unwrap().len(), 2);
        assert!(feed.headlines("ETH").await.unwrap().is_empty());
    }
}
