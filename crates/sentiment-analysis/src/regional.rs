use analysis_core::{AnalysisError, FusionConfig, SourceKind, SourceScore, SourceScorer};
use async_trait::async_trait;
use std::collections::HashSet;

/// Restricts an inner scorer to the regional-equity membership list.
/// Other symbols get no regional-market contribution at all.
pub struct RegionalMarketScorer<S: SourceScorer> {
    inner: S,
    members: HashSet<String>,
}

impl<S: SourceScorer> RegionalMarketScorer<S> {
    pub fn new<I, T>(inner: S, members: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        Self {
            inner,
            members: members.into_iter().map(|m| m.as_ref().trim().to_uppercase()).collect(),
        }
    }

    pub fn from_config(inner: S, config: &FusionConfig) -> Self {
        Self::new(inner, &config.regional_symbols)
    }
}

#[async_trait]
impl<S: SourceScorer> SourceScorer for RegionalMarketScorer<S> {
    fn kind(&self) -> SourceKind {
        SourceKind::RegionalMarket
    }

    fn applies_to(&self, symbol: &str) -> bool {
        self.members.contains(&symbol.trim().to_uppercase())
    }

    async fn score(&self, symbol: &str) -> Result<SourceScore, AnalysisError> {
        if !self.applies_to(symbol) {
            return Err(AnalysisError::SourceUnavailable(format!(
                "{} is not a regional-equity symbol",
                symbol
            )));
        }
        self.inner.score(symbol).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PrecomputedScorer;

    fn inner() -> PrecomputedScorer {
        let table = PrecomputedScorer::new(SourceKind::RegionalMarket);
        table.update("SCOM", SourceScore::new(0.5, 12));
        table.update("AAPL", SourceScore::new(0.9, 40));
        table
    }

    #[tokio::test]
    async fn test_member_symbols_pass_through() {
        let scorer = RegionalMarketScorer::from_config(inner(), &FusionConfig::default());
        assert!(scorer.applies_to("scom"));
        assert_eq!(scorer.score("SCOM").await.unwrap().score, 0.5);
    }

    #[tokio::test]
    async fn test_non_members_are_gated() {
        let scorer = RegionalMarketScorer::new(inner(), ["SCOM"]);
        assert!(!scorer.applies_to("AAPL"));
        assert!(matches!(
            scorer.score("AAPL").await,
            Err(AnalysisError::SourceUnavailable(_))
        ));
    }
}
