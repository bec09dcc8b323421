//! File-backed inputs for the CLI: candle histories, precomputed source
//! scores, and headline feeds, plus an HTTP LLM client.

use analysis_core::{
    AnalysisError, Headline, LlmAssessment, LlmClient, PerSource, PriceCandle, PriceProvider,
    SourceKind, SourceScore, Timeframe,
};
use anyhow::Context;
use async_trait::async_trait;
use sentiment_analysis::{PrecomputedScorer, StaticHeadlines};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// On-disk price file: `{ "SYMBOL": [candle, ...] }`, optionally tagged as
/// seeded synthetic data.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PriceFile {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub synthetic: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(flatten)]
    pub series: HashMap<String, Vec<PriceCandle>>,
}

/// Price provider over a [`PriceFile`].
///
/// The timeframe argument is ignored; the file is assumed to already hold
/// candles at the timeframe the caller asks for.
pub struct JsonPriceProvider {
    candles: HashMap<String, Vec<PriceCandle>>,
}

impl JsonPriceProvider {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading price file {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("parsing price file {}", path.display()))
    }

    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        let parsed: PriceFile = serde_json::from_str(raw)?;
        if parsed.synthetic {
            tracing::warn!("Price file holds synthetic candles (seed {:?})", parsed.seed);
        }
        Ok(Self::from_map(parsed.series))
    }

    pub fn from_map(map: HashMap<String, Vec<PriceCandle>>) -> Self {
        let candles = map
            .into_iter()
            .map(|(symbol, mut series)| {
                series.sort_by_key(|c| c.timestamp);
                (symbol.trim().to_uppercase(), series)
            })
            .collect();
        Self { candles }
    }

    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.candles.keys().cloned().collect();
        symbols.sort();
        symbols
    }

    /// Coarsest timeframe that still fits the tightest gap between
    /// consecutive candles of `symbol`. `None` with fewer than two candles.
    pub fn timeframe_of(&self, symbol: &str) -> Option<Timeframe> {
        let series = self.series(symbol).ok()?;
        let gap = series
            .windows(2)
            .map(|w| (w[1].timestamp - w[0].timestamp).num_minutes())
            .filter(|m| *m > 0)
            .min()?;
        [
            Timeframe::Week1,
            Timeframe::Day1,
            Timeframe::Hour4,
            Timeframe::Hour1,
            Timeframe::Minute30,
            Timeframe::Minute15,
            Timeframe::Minute5,
            Timeframe::Minute1,
        ]
        .into_iter()
        .find(|tf| tf.to_minutes() <= gap)
        .or(Some(Timeframe::Minute1))
    }

    fn series(&self, symbol: &str) -> Result<&Vec<PriceCandle>, AnalysisError> {
        self.candles
            .get(&symbol.trim().to_uppercase())
            .ok_or_else(|| AnalysisError::SourceUnavailable(format!("no price history for {}", symbol)))
    }
}

#[async_trait]
impl PriceProvider for JsonPriceProvider {
    async fn get_price_history(
        &self,
        symbol: &str,
        _timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<PriceCandle>, AnalysisError> {
        let series = self.series(symbol)?;
        let skip = series.len().saturating_sub(limit);
        Ok(series[skip..].to_vec())
    }

    async fn get_current_price(&self, symbol: &str) -> Result<f64, AnalysisError> {
        self.series(symbol)?
            .last()
            .map(|c| c.close)
            .ok_or_else(|| AnalysisError::SourceUnavailable(format!("empty price history for {}", symbol)))
    }
}

fn parse_kind(name: &str) -> Option<SourceKind> {
    match name.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
        "social" => Some(SourceKind::Social),
        "messaging" => Some(SourceKind::Messaging),
        "regional_market" | "regional" => Some(SourceKind::RegionalMarket),
        "news" => Some(SourceKind::News),
        "technical" => Some(SourceKind::Technical),
        _ => None,
    }
}

/// Precomputed per-source scores loaded from
/// `{ "social": { "BTC": { "score": 0.4, "mention_count": 40 } }, ... }`.
#[derive(Debug, Default)]
pub struct ScoreTables {
    tables: HashMap<SourceKind, HashMap<String, SourceScore>>,
}

impl ScoreTables {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading score file {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("parsing score file {}", path.display()))
    }

    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        let parsed: HashMap<String, HashMap<String, SourceScore>> = serde_json::from_str(raw)?;
        let mut tables = HashMap::new();
        for (name, scores) in parsed {
            let kind = parse_kind(&name).with_context(|| format!("unknown source '{}'", name))?;
            if kind == SourceKind::Technical {
                tracing::warn!("Ignoring precomputed technical scores; technical is always computed from candles");
                continue;
            }
            let normalized = scores
                .into_iter()
                .map(|(symbol, s)| (symbol.trim().to_uppercase(), SourceScore::new(s.score, s.mention_count)))
                .collect();
            tables.insert(kind, normalized);
        }
        Ok(Self { tables })
    }

    pub fn contains(&self, kind: SourceKind) -> bool {
        self.tables.contains_key(&kind)
    }

    pub fn scorers(&self) -> Vec<PrecomputedScorer> {
        let mut kinds: Vec<SourceKind> = self.tables.keys().copied().collect();
        kinds.sort_by_key(|k| SourceKind::ALL.iter().position(|a| a == k));
        kinds
            .into_iter()
            .map(|kind| PrecomputedScorer::from_map(kind, self.tables[&kind].clone()))
            .collect()
    }

    /// Fixed non-technical scores for one symbol, as replayed by a fusion
    /// backtest. Missing sources are neutral.
    pub fn snapshot(&self, symbol: &str) -> PerSource<SourceScore> {
        let symbol = symbol.trim().to_uppercase();
        let mut snapshot = PerSource::<SourceScore>::default();
        for (kind, scores) in &self.tables {
            if let Some(score) = scores.get(&symbol) {
                snapshot.set(*kind, *score);
            }
        }
        snapshot
    }
}

/// Headlines from `{ "SYMBOL": [ { "title": ..., "description": ... } ] }`.
pub fn load_headlines(path: impl AsRef<Path>) -> anyhow::Result<StaticHeadlines> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading headline file {}", path.display()))?;
    let parsed: HashMap<String, Vec<Headline>> =
        serde_json::from_str(&raw).with_context(|| format!("parsing headline file {}", path.display()))?;

    let feed = StaticHeadlines::new();
    for (symbol, headlines) in parsed {
        feed.insert(&symbol, headlines);
    }
    Ok(feed)
}

#[derive(Serialize)]
struct AssessRequest<'a> {
    symbol: &'a str,
    headlines: &'a [Headline],
}

/// LLM scoring service reached over HTTP: `POST {base}/assess`.
pub struct HttpLlmClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpLlmClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, AnalysisError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AnalysisError::Configuration(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn score_headlines(&self, symbol: &str, headlines: &[Headline]) -> Result<LlmAssessment, AnalysisError> {
        let url = format!("{}/assess", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&AssessRequest { symbol, headlines })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AnalysisError::Timeout(format!("LLM request for {}", symbol))
                } else {
                    AnalysisError::ApiError(format!("LLM request failed: {}", e))
                }
            })?;

        if !response.status().is_success() {
            return Err(AnalysisError::ApiError(format!(
                "LLM returned status {} for {}",
                response.status(),
                symbol
            )));
        }

        let mut assessment: LlmAssessment = response
            .json()
            .await
            .map_err(|e| AnalysisError::ApiError(format!("malformed LLM response: {}", e)))?;
        assessment.score = assessment.score.clamp(-1.0, 1.0);
        Ok(assessment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::SourceScorer;

    const PRICES: &str = r#"{
        "aapl": [
            {"timestamp": "2024-01-03T00:00:00Z", "open": 11.0, "high": 12.0, "low": 10.0, "close": 11.5, "volume": 1000.0},
            {"timestamp": "2024-01-01T00:00:00Z", "open": 9.0, "high": 10.5, "low": 8.5, "close": 10.0, "volume": 900.0},
            {"timestamp": "2024-01-02T00:00:00Z", "open": 10.0, "high": 11.5, "low": 9.5, "close": 11.0, "volume": 950.0}
        ]
    }"#;

    const SCORES: &str = r#"{
        "social": { "btc": { "score": 0.4, "mention_count": 40 } },
        "regional-market": { "SCOM": { "score": 1.7, "mention_count": 3 } }
    }"#;

    #[tokio::test]
    async fn test_price_file_sorted_and_limited() {
        let provider = JsonPriceProvider::from_json(PRICES).unwrap();
        assert_eq!(provider.symbols(), vec!["AAPL".to_string()]);

        let history = provider.get_price_history("AAPL", Timeframe::Day1, 2).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].close, 11.0);
        assert_eq!(history[1].close, 11.5);

        let current = provider.get_current_price("aapl").await.unwrap();
        assert_eq!(current, 11.5);
    }

    #[test]
    fn test_synthetic_tag_not_a_symbol() {
        let raw = r#"{ "synthetic": true, "seed": 7, "DEMO": [] }"#;
        let provider = JsonPriceProvider::from_json(raw).unwrap();
        assert_eq!(provider.symbols(), vec!["DEMO".to_string()]);
    }

    #[test]
    fn test_timeframe_inferred_from_candle_spacing() {
        let provider = JsonPriceProvider::from_json(PRICES).unwrap();
        assert_eq!(provider.timeframe_of("AAPL"), Some(Timeframe::Day1));
        assert_eq!(provider.timeframe_of("MSFT"), None);

        let hourly = analysis_core::synthetic::flat(10.0, 5, chrono::Utc::now(), Timeframe::Hour1);
        let provider = JsonPriceProvider::from_map([("X".to_string(), hourly)].into_iter().collect());
        assert_eq!(provider.timeframe_of("x"), Some(Timeframe::Hour1));
    }

    #[tokio::test]
    async fn test_unknown_symbol_unavailable() {
        let provider = JsonPriceProvider::from_json(PRICES).unwrap();
        let err = provider.get_current_price("MSFT").await.unwrap_err();
        assert!(matches!(err, AnalysisError::SourceUnavailable(_)));
    }

    #[tokio::test]
    async fn test_score_tables_build_scorers() {
        let tables = ScoreTables::from_json(SCORES).unwrap();
        assert!(tables.contains(SourceKind::Social));
        assert!(tables.contains(SourceKind::RegionalMarket));
        assert!(!tables.contains(SourceKind::News));

        let scorers = tables.scorers();
        assert_eq!(scorers.len(), 2);
        assert_eq!(scorers[0].kind(), SourceKind::Social);

        let social = scorers[0].score("BTC").await.unwrap();
        assert_eq!(social.score, 0.4);
        assert_eq!(social.mention_count, 40);
    }

    #[test]
    fn test_snapshot_clamps_and_defaults_neutral() {
        let tables = ScoreTables::from_json(SCORES).unwrap();
        let snapshot = tables.snapshot("scom");
        assert_eq!(snapshot.regional_market.score, 1.0);
        assert_eq!(snapshot.social.score, 0.0);
        assert_eq!(snapshot.news.mention_count, 0);
    }

    #[test]
    fn test_unknown_source_rejected() {
        let err = ScoreTables::from_json(r#"{ "forum": {} }"#).unwrap_err();
        assert!(err.to_string().contains("forum"));
    }
}
