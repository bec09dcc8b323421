use async_trait::async_trait;
use crate::{AnalysisError, Headline, LlmAssessment, PriceCandle, SourceKind, SourceScore, Timeframe};

/// Live or historical OHLCV provider
#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Most recent `limit` candles, oldest first.
    async fn get_price_history(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<PriceCandle>, AnalysisError>;

    async fn get_current_price(&self, symbol: &str) -> Result<f64, AnalysisError>;
}

/// One independently queryable, independently failable scoring source
#[async_trait]
pub trait SourceScorer: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Whether this source has anything to say about `symbol` at all.
    fn applies_to(&self, _symbol: &str) -> bool {
        true
    }

    async fn score(&self, symbol: &str) -> Result<SourceScore, AnalysisError>;
}

/// Feed of already-collected headlines for a symbol
#[async_trait]
pub trait HeadlineSource: Send + Sync {
    async fn headlines(&self, symbol: &str) -> Result<Vec<Headline>, AnalysisError>;
}

/// Trait for LLM-backed text scoring
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn score_headlines(&self, symbol: &str, headlines: &[Headline]) -> Result<LlmAssessment, AnalysisError>;
}

#[async_trait]
impl<T: HeadlineSource + ?Sized> HeadlineSource for std::sync::Arc<T> {
    async fn headlines(&self, symbol: &str) -> Result<Vec<Headline>, AnalysisError> {
        (**self).headlines(symbol).await
    }
}
