use analysis_core::{AnalysisError, SourceKind, SourceScore, SourceScorer};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct ScoreResponse {
    score: f64,
    #[serde(default)]
    mention_count: u32,
}

/// Scorer for a source computed by a remote collector service
/// (social, messaging or regional-market sentiment).
#[derive(Clone)]
pub struct HttpSourceScorer {
    kind: SourceKind,
    client: reqwest::Client,
    base_url: String,
}

impl HttpSourceScorer {
    pub fn new(kind: SourceKind, base_url: impl Into<String>, timeout: Duration) -> Result<Self, AnalysisError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AnalysisError::Configuration(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            kind,
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, symbol: &str) -> String {
        format!(
            "{}/scores/{}/{}",
            self.base_url,
            self.kind.label().replace(' ', "-"),
            symbol.to_uppercase()
        )
    }
}

fn map_request_error(e: reqwest::Error) -> AnalysisError {
    if e.is_timeout() {
        AnalysisError::Timeout(e.to_string())
    } else {
        AnalysisError::SourceUnavailable(format!("request failed: {}", e))
    }
}

#[async_trait]
impl SourceScorer for HttpSourceScorer {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn score(&self, symbol: &str) -> Result<SourceScore, AnalysisError> {
        let response = self
            .client
            .get(self.url(symbol))
            .send()
            .await
            .map_err(map_request_error)?;

        if !response.status().is_success() {
            return Err(AnalysisError::SourceUnavailable(format!(
                "{} scores for {}: status {}",
                self.kind,
                symbol,
                response.status()
            )));
        }

        let body = response
            .json::<ScoreResponse>()
            .await
            .map_err(|e| AnalysisError::ApiError(format!("invalid score payload: {}", e)))?;

        Ok(SourceScore::new(body.score, body.mention_count))
    }
}
