use analysis_core::{
    AnalysisError, FusionConfig, FusionSignal, PerSource, PriceCandle, PriceProvider, SourceKind,
    SourceScore, SourceScorer,
};
use chrono::Utc;
use futures::future::join_all;
use futures::stream::{self, StreamExt};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

pub mod scoring;
pub mod store;


pub use scoring::{
    direction_for, fuse, fuse_degraded, simplified_estimate, FusionInput, SimplifiedEstimate,
};
pub use store::{InMemorySignalRepository, SignalRepository};

/// Result of one collaborator call bounded by its own timeout and the
/// request deadline, whichever comes first.
async fn bounded<T, F>(
    what: &str,
    fut: F,
    per_source: Duration,
    deadline: Instant,
) -> Result<T, AnalysisError>
where
    F: Future<Output = Result<T, AnalysisError>>,
{
    let limit = (Instant::now() + per_source).min(deadline);
    match tokio::time::timeout_at(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(AnalysisError::Timeout(format!("{} timed out", what))),
    }
}

/// Technical source outcome for one request
enum TechnicalOutcome {
    Scored(f64),
    TooShort(Vec<f64>),
    Unavailable,
}

fn technical_outcome(symbol: &str, candles: &[PriceCandle]) -> TechnicalOutcome {
    match technical_analysis::analyze(candles) {
        Ok(reading) => TechnicalOutcome::Scored(reading.score.total),
        Err(AnalysisError::InsufficientData(reason)) => {
            match technical_analysis::validated_closes(candles) {
                Ok(closes) => {
                    tracing::warn!("Falling back to simplified estimate for {}: {}", symbol, reason);
                    TechnicalOutcome::TooShort(closes)
                }
                Err(e) => {
                    tracing::warn!("Unusable price history for {}: {}", symbol, e);
                    TechnicalOutcome::Unavailable
                }
            }
        }
        Err(e) => {
            tracing::warn!("Technical analysis failed for {}: {}", symbol, e);
            TechnicalOutcome::Unavailable
        }
    }
}

/// Combines price action and external sentiment sources into one signal.
pub struct FusionEngine {
    prices: Arc<dyn PriceProvider>,
    scorers: Vec<Arc<dyn SourceScorer>>,
    signals: Option<Arc<dyn SignalRepository>>,
    config: Arc<FusionConfig>,
}

impl FusionEngine {
    pub fn new(prices: Arc<dyn PriceProvider>, config: FusionConfig) -> Self {
        Self {
            prices,
            scorers: Vec::new(),
            signals: None,
            config: Arc::new(config),
        }
    }

    /// Register an external source. Technical scores always come from price
    /// history, so a scorer of that kind is ignored.
    pub fn with_scorer(mut self, scorer: Arc<dyn SourceScorer>) -> Self {
        if scorer.kind() == SourceKind::Technical {
            tracing::warn!("Ignoring external technical scorer; technical score is derived from candles");
        } else {
            self.scorers.push(scorer);
        }
        self
    }

    pub fn with_signal_repository(mut self, repository: Arc<dyn SignalRepository>) -> Self {
        self.signals = Some(repository);
        self
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// Generate a fused signal within the configured request timeout.
    pub async fn generate_fusion_signal(&self, symbol: &str) -> Result<FusionSignal, AnalysisError> {
        let deadline = Instant::now() + self.config.request_timeout;
        self.generate_fusion_signal_with_deadline(symbol, deadline).await
    }

    pub async fn generate_fusion_signal_with_deadline(
        &self,
        symbol: &str,
        deadline: Instant,
    ) -> Result<FusionSignal, AnalysisError> {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(AnalysisError::InvalidData("empty symbol".to_string()));
        }
        let config = &self.config;
        let per_source = config.source_timeout;

        tracing::info!("Generating fusion signal for {}", symbol);

        let applicable: Vec<&Arc<dyn SourceScorer>> =
            self.scorers.iter().filter(|s| s.applies_to(&symbol)).collect();

        let symbol_ref = symbol.as_str();
        let source_futures = applicable.iter().map(|scorer| async move {
            let kind = scorer.kind();
            (kind, bounded(kind.label(), scorer.score(symbol_ref), per_source, deadline).await)
        });

        let (history, current_price, scored) = tokio::join!(
            bounded(
                "price history",
                self.prices.get_price_history(&symbol, config.history_timeframe, config.history_limit),
                per_source,
                deadline,
            ),
            bounded("current price", self.prices.get_current_price(&symbol), per_source, deadline),
            join_all(source_futures),
        );

        let mut sources = PerSource::<SourceScore>::default();
        let mut used = Vec::new();
        let mut unavailable = Vec::new();

        let candles = match history {
            Ok(candles) if candles.is_empty() => {
                return Err(AnalysisError::InsufficientData(format!(
                    "no price history for {}",
                    symbol
                )));
            }
            Ok(candles) => candles,
            Err(e) => {
                tracing::warn!("Price history unavailable for {}: {}", symbol, e);
                Vec::new()
            }
        };

        let outcome = if candles.is_empty() {
            TechnicalOutcome::Unavailable
        } else {
            technical_outcome(&symbol, &candles)
        };
        match &outcome {
            TechnicalOutcome::Scored(score) => {
                sources.technical = SourceScore::new(*score, 0);
                used.push(SourceKind::Technical);
            }
            TechnicalOutcome::TooShort(_) => {}
            TechnicalOutcome::Unavailable => unavailable.push(SourceKind::Technical),
        }

        for (kind, result) in scored {
            match result {
                Ok(score) => {
                    sources.set(kind, score);
                    if !used.contains(&kind) {
                        used.push(kind);
                    }
                }
                Err(e) => {
                    tracing::warn!("{} source failed for {}: {}", kind, symbol, e);
                    if !unavailable.contains(&kind) {
                        unavailable.push(kind);
                    }
                }
            }
        }

        let last_close = candles.last().map(|c| c.close);
        let price = match current_price {
            Ok(p) if p.is_finite() && p > 0.0 => Some(p),
            Ok(p) => {
                tracing::warn!("Ignoring invalid current price {} for {}", p, symbol);
                last_close
            }
            Err(e) => {
                tracing::debug!("Current price unavailable for {}, using last close: {}", symbol, e);
                last_close
            }
        };

        let input = FusionInput {
            symbol: symbol.clone(),
            sources,
            data_sources_used: used,
            unavailable,
            price,
            timestamp: Utc::now(),
        };

        let signal = match outcome {
            TechnicalOutcome::TooShort(closes) => {
                let reference = price.or(last_close).unwrap_or_default();
                let estimate =
                    simplified_estimate(&closes, reference, sources.news.score, sources.social.score)?;
                fuse_degraded(config, &input, &estimate)
            }
            _ => fuse(config, &input),
        };

        tracing::info!(
            "Fusion signal for {}: {} (score {:.3}, confidence {:.0}, sources {}{})",
            signal.symbol,
            signal.direction.to_label(),
            signal.final_score,
            signal.confidence,
            signal.data_sources_used.len(),
            if signal.degraded { ", degraded" } else { "" }
        );

        if let Some(repository) = &self.signals {
            if let Err(e) = repository.save(signal.clone()).await {
                tracing::warn!("Failed to store signal for {}: {}", symbol, e);
            }
        }

        Ok(signal)
    }

    /// Signals for many symbols with bounded concurrency, in input order.
    /// Symbols that fail are logged and left out.
    pub async fn run_fusion_analysis<S: AsRef<str>>(&self, symbols: &[S]) -> Vec<FusionSignal> {
        tracing::info!("Running fusion analysis for {} symbols", symbols.len());

        let results: Vec<(String, Result<FusionSignal, AnalysisError>)> = stream::iter(symbols)
            .map(|symbol| async move {
                let symbol = symbol.as_ref().to_string();
                let result = self.generate_fusion_signal(&symbol).await;
                (symbol, result)
            })
            .buffered(self.config.batch_concurrency.max(1))
            .collect()
            .await;

        let total = results.len();
        let signals: Vec<FusionSignal> = results
            .into_iter()
            .filter_map(|(symbol, result)| match result {
                Ok(signal) => Some(signal),
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", symbol, e);
                    None
                }
            })
            .collect();

        tracing::info!("Fusion analysis complete: {}/{} signals", signals.len(), total);
        signals
    }
}
