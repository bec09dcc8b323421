use analysis_core::{
    AnalysisError, Headline, HeadlineSource, LlmClient, RateLimiter, SourceKind, SourceScore,
    SourceScorer,
};
use async_trait::async_trait;
use std::sync::Arc;

use crate::Lexicon;

/// News scorer backed by an LLM, metered by a daily call budget.
///
/// Each call spends one budget unit before touching the LLM. When the budget
/// is gone or the LLM errors, the headlines are scored with the local lexicon
/// instead; if that fails too the source reports neutral.
pub struct LlmNewsScorer {
    headlines: Arc<dyn HeadlineSource>,
    llm: Arc<dyn LlmClient>,
    budget: Arc<RateLimiter>,
    lexicon: Lexicon,
}

impl LlmNewsScorer {
    pub fn new(
        headlines: Arc<dyn HeadlineSource>,
        llm: Arc<dyn LlmClient>,
        budget: Arc<RateLimiter>,
    ) -> Self {
        Self {
            headlines,
            llm,
            budget,
            lexicon: Lexicon::financial(),
        }
    }

    fn local_fallback(&self, symbol: &str, headlines: &[Headline]) -> SourceScore {
        match self.lexicon.score_headlines(headlines) {
            Ok(score) => score,
            Err(e) => {
                tracing::warn!("Local news fallback failed for {}: {}", symbol, e);
                SourceScore::neutral()
            }
        }
    }
}

#[async_trait]
impl SourceScorer for LlmNewsScorer {
    fn kind(&self) -> SourceKind {
        SourceKind::News
    }

    async fn score(&self, symbol: &str) -> Result<SourceScore, AnalysisError> {
        let headlines = self.headlines.headlines(symbol).await?;
        if headlines.is_empty() {
            return Err(AnalysisError::SourceUnavailable(format!("no headlines for {}", symbol)));
        }

        if let Err(e) = self.budget.consume() {
            tracing::warn!("LLM scoring skipped for {}: {}", symbol, e);
            return Ok(self.local_fallback(symbol, &headlines));
        }
        tracing::debug!("LLM budget: {} calls left today", self.budget.remaining());

        match self.llm.score_headlines(symbol, &headlines).await {
            Ok(assessment) => {
                tracing::debug!(
                    "LLM news score for {}: {:.3} ({})",
                    symbol,
                    assessment.score,
                    assessment.label
                );
                Ok(SourceScore::new(assessment.score, headlines.len() as u32))
            }
            Err(e) => {
                tracing::warn!("LLM scoring failed for {}, using lexicon: {}", symbol, e);
                Ok(self.local_fallback(symbol, &headlines))
            }
        }
    }
}
