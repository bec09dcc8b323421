use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{AnalysisError, SourceKind, Timeframe};

/// Scores strictly above this are BUY, strictly below its negation SELL.
pub const DIRECTION_THRESHOLD: f64 = 0.15;

/// Minimum candles for the full indicator set (SMA50 is the longest lookback).
pub const MIN_INDICATOR_CANDLES: usize = 50;

const DEFAULT_CRYPTO_SYMBOLS: &[&str] = &[
    "BTC", "ETH", "SOL", "XRP", "BNB", "ADA", "DOGE", "AVAX", "DOT", "MATIC",
    "LINK", "LTC", "TRX", "ATOM", "XLM", "SHIB", "UNI", "TON",
];

// Nairobi Securities Exchange listings
const DEFAULT_REGIONAL_SYMBOLS: &[&str] = &[
    "SCOM", "EQTY", "KCB", "EABL", "COOP", "ABSA", "SCBK", "BAT", "KEGN", "KPLC",
    "NCBA", "SBIC", "BAMB", "JUB", "BRIT",
];

const CRYPTO_QUOTE_SUFFIXES: &[&str] = &["-USDT", "/USDT", "USDT", "-USD", "/USD"];

/// Per-source fusion weights. Each table must sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusionWeights {
    pub technical: f64,
    pub social: f64,
    pub messaging: f64,
    pub regional_market: f64,
    pub news: f64,
}

impl FusionWeights {
    pub const DEFAULT: FusionWeights = FusionWeights {
        technical: 0.30,
        social: 0.25,
        messaging: 0.25,
        regional_market: 0.10,
        news: 0.10,
    };

    pub const CRYPTO: FusionWeights = FusionWeights {
        technical: 0.25,
        social: 0.30,
        messaging: 0.30,
        regional_market: 0.05,
        news: 0.10,
    };

    pub const REGIONAL_EQUITY: FusionWeights = FusionWeights {
        technical: 0.35,
        social: 0.15,
        messaging: 0.10,
        regional_market: 0.35,
        news: 0.05,
    };

    pub fn get(&self, kind: SourceKind) -> f64 {
        match kind {
            SourceKind::Technical => self.technical,
            SourceKind::Social => self.social,
            SourceKind::Messaging => self.messaging,
            SourceKind::RegionalMarket => self.regional_market,
            SourceKind::News => self.news,
        }
    }

    pub fn sum(&self) -> f64 {
        SourceKind::ALL.iter().map(|k| self.get(*k)).sum()
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        if SourceKind::ALL.iter().any(|k| self.get(*k) < 0.0) {
            return Err(AnalysisError::Configuration("negative fusion weight".to_string()));
        }
        let sum = self.sum();
        if (sum - 1.0).abs() > 1e-9 {
            return Err(AnalysisError::Configuration(format!(
                "fusion weights sum to {:.4}, expected 1.0",
                sum
            )));
        }
        Ok(())
    }
}

/// Symbol classes with their own weight tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SymbolClass {
    Standard,
    Crypto,
    RegionalEquity,
}

/// Sentiment-consistency bounds used by the risk classification
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskThresholds {
    /// Social + messaging mentions above this can be LOW risk.
    pub high_volume_mentions: u32,
    /// Social + messaging mentions below this are HIGH risk.
    pub low_volume_mentions: u32,
    pub consistent_spread: f64,
    pub divergent_spread: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            high_volume_mentions: 50,
            low_volume_mentions: 10,
            consistent_spread: 0.3,
            divergent_spread: 0.7,
        }
    }
}

/// Product-tuned constants of the fusion engine. `Default` reproduces the
/// production values; every field can be overridden.
#[derive(Debug, Clone)]
pub struct FusionConfig {
    pub default_weights: FusionWeights,
    pub crypto_weights: FusionWeights,
    pub regional_weights: FusionWeights,
    pub direction_threshold: f64,
    pub risk: RiskThresholds,
    /// |technical| + |social| + |messaging| above this is a SHORT horizon.
    pub short_horizon_sum: f64,
    /// ...and below this a LONG one.
    pub long_horizon_sum: f64,
    pub market_condition_band: f64,
    /// Factors at or above this magnitude are listed in the reasoning.
    pub reasoning_threshold: f64,
    pub entry_offset_pct: f64,
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    pub crypto_symbols: Vec<String>,
    pub regional_symbols: Vec<String>,
    pub source_timeout: Duration,
    pub request_timeout: Duration,
    pub history_timeframe: Timeframe,
    pub history_limit: usize,
    pub batch_concurrency: usize,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            default_weights: FusionWeights::DEFAULT,
            crypto_weights: FusionWeights::CRYPTO,
            regional_weights: FusionWeights::REGIONAL_EQUITY,
            direction_threshold: DIRECTION_THRESHOLD,
            risk: RiskThresholds::default(),
            short_horizon_sum: 1.5,
            long_horizon_sum: 0.5,
            market_condition_band: 0.2,
            reasoning_threshold: 0.3,
            entry_offset_pct: 0.01,
            stop_loss_pct: 0.05,
            take_profit_pct: 0.10,
            crypto_symbols: DEFAULT_CRYPTO_SYMBOLS.iter().map(|s| s.to_string()).collect(),
            regional_symbols: DEFAULT_REGIONAL_SYMBOLS.iter().map(|s| s.to_string()).collect(),
            source_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(15),
            history_timeframe: Timeframe::Hour1,
            history_limit: 100,
            batch_concurrency: 5,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn env_list(key: &str) -> Option<Vec<String>> {
    std::env::var(key).ok().map(|v| {
        v.split(',')
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect()
    })
}

impl FusionConfig {
    /// Defaults overridden by `FUSION_*` environment variables.
    pub fn from_env() -> Result<Self, AnalysisError> {
        let defaults = Self::default();
        let config = Self {
            direction_threshold: env_parse("FUSION_DIRECTION_THRESHOLD")
                .unwrap_or(defaults.direction_threshold),
            stop_loss_pct: env_parse("FUSION_STOP_LOSS_PCT").unwrap_or(defaults.stop_loss_pct),
            take_profit_pct: env_parse("FUSION_TAKE_PROFIT_PCT")
                .unwrap_or(defaults.take_profit_pct),
            crypto_symbols: env_list("FUSION_CRYPTO_SYMBOLS")
                .unwrap_or_else(|| defaults.crypto_symbols.clone()),
            regional_symbols: env_list("FUSION_REGIONAL_SYMBOLS")
                .unwrap_or_else(|| defaults.regional_symbols.clone()),
            source_timeout: env_parse("FUSION_SOURCE_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.source_timeout),
            request_timeout: env_parse("FUSION_REQUEST_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.request_timeout),
            history_timeframe: std::env::var("FUSION_HISTORY_TIMEFRAME")
                .ok()
                .and_then(|v| Timeframe::parse(&v))
                .unwrap_or(defaults.history_timeframe),
            history_limit: env_parse("FUSION_HISTORY_LIMIT").unwrap_or(defaults.history_limit),
            batch_concurrency: env_parse("FUSION_BATCH_CONCURRENCY")
                .unwrap_or(defaults.batch_concurrency),
            ..defaults
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        self.default_weights.validate()?;
        self.crypto_weights.validate()?;
        self.regional_weights.validate()?;
        if !(0.0..1.0).contains(&self.direction_threshold) {
            return Err(AnalysisError::Configuration(format!(
                "direction threshold {} outside [0, 1)",
                self.direction_threshold
            )));
        }
        if self.batch_concurrency == 0 {
            return Err(AnalysisError::Configuration("batch concurrency must be > 0".to_string()));
        }
        Ok(())
    }

    pub fn classify(&self, symbol: &str) -> SymbolClass {
        let upper = symbol.trim().to_uppercase();
        let base = CRYPTO_QUOTE_SUFFIXES
            .iter()
            .find_map(|suffix| upper.strip_suffix(suffix))
            .filter(|b| !b.is_empty())
            .unwrap_or(upper.as_str());

        if self.crypto_symbols.iter().any(|s| s == base) {
            SymbolClass::Crypto
        } else if self.regional_symbols.iter().any(|s| *s == upper) {
            SymbolClass::RegionalEquity
        } else {
            SymbolClass::Standard
        }
    }

    pub fn is_regional(&self, symbol: &str) -> bool {
        self.classify(symbol) == SymbolClass::RegionalEquity
    }

    pub fn weights_for(&self, class: SymbolClass) -> &FusionWeights {
        match class {
            SymbolClass::Standard => &self.default_weights,
            SymbolClass::Crypto => &self.crypto_weights,
            SymbolClass::RegionalEquity => &self.regional_weights,
        }
    }
}
