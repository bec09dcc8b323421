use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// OHLCV candle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceCandle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// News headline handed to the news scorers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Headline {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

/// Opaque verdict returned by an LLM text scorer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmAssessment {
    pub score: f64,
    pub label: String,
}

/// The five independent inputs of a fusion signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceKind {
    Technical,
    Social,
    Messaging,
    RegionalMarket,
    News,
}

impl SourceKind {
    pub const ALL: [SourceKind; 5] = [
        SourceKind::Technical,
        SourceKind::Social,
        SourceKind::Messaging,
        SourceKind::RegionalMarket,
        SourceKind::News,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SourceKind::Technical => "technical",
            SourceKind::Social => "social",
            SourceKind::Messaging => "messaging",
            SourceKind::RegionalMarket => "regional market",
            SourceKind::News => "news",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Score reported by a single source for one symbol at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SourceScore {
    pub score: f64, // -1.0 to 1.0
    pub mention_count: u32,
}

impl SourceScore {
    /// Builds a score, clamping into [-1, 1]. Non-finite input collapses to neutral.
    pub fn new(score: f64, mention_count: u32) -> Self {
        let score = if score.is_finite() { score.clamp(-1.0, 1.0) } else { 0.0 };
        Self { score, mention_count }
    }

    pub fn neutral() -> Self {
        Self { score: 0.0, mention_count: 0 }
    }
}

impl Default for SourceScore {
    fn default() -> Self {
        Self::neutral()
    }
}

/// One value per source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerSource<T> {
    pub technical: T,
    pub social: T,
    pub messaging: T,
    pub regional_market: T,
    pub news: T,
}

impl<T: Copy> PerSource<T> {
    pub fn get(&self, kind: SourceKind) -> T {
        match kind {
            SourceKind::Technical => self.technical,
            SourceKind::Social => self.social,
            SourceKind::Messaging => self.messaging,
            SourceKind::RegionalMarket => self.regional_market,
            SourceKind::News => self.news,
        }
    }

    pub fn set(&mut self, kind: SourceKind, value: T) {
        match kind {
            SourceKind::Technical => self.technical = value,
            SourceKind::Social => self.social = value,
            SourceKind::Messaging => self.messaging = value,
            SourceKind::RegionalMarket => self.regional_market = value,
            SourceKind::News => self.news = value,
        }
    }
}

impl PerSource<SourceScore> {
    pub fn scores(&self) -> PerSource<f64> {
        PerSource {
            technical: self.technical.score,
            social: self.social.score,
            messaging: self.messaging.score,
            regional_market: self.regional_market.score,
            news: self.news.score,
        }
    }

    pub fn mentions(&self) -> PerSource<u32> {
        PerSource {
            technical: self.technical.mention_count,
            social: self.social.mention_count,
            messaging: self.messaging.mention_count,
            regional_market: self.regional_market.mention_count,
            news: self.news.mention_count,
        }
    }
}

/// Trading direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Buy,
    Sell,
    Hold,
}

impl Direction {
    pub fn is_directional(&self) -> bool {
        !matches!(self, Direction::Hold)
    }

    /// True for Buy vs Sell in either order.
    pub fn opposes(&self, other: Direction) -> bool {
        matches!(
            (self, other),
            (Direction::Buy, Direction::Sell) | (Direction::Sell, Direction::Buy)
        )
    }

    pub fn to_label(&self) -> &'static str {
        match self {
            Direction::Buy => "BUY",
            Direction::Sell => "SELL",
            Direction::Hold => "HOLD",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeHorizon {
    Short,
    Medium,
    Long,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketCondition {
    Bullish,
    Bearish,
    Neutral,
}

/// Trend flag derived from the moving averages and MACD
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Bullish,
    Bearish,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdValues {
    pub value: f64,
    pub signal: f64,
    pub histogram: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BollingerValues {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

/// Latest indicator readings for a candle series. Recomputed on every query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TechnicalIndicators {
    pub close: f64,
    pub rsi: f64,
    pub macd: MacdValues,
    pub sma20: f64,
    pub sma50: f64,
    pub ema12: f64,
    pub ema26: f64,
    pub bollinger: BollingerValues,
    pub trend: Trend,
}

/// Suggested order levels for a directional signal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradingParameters {
    pub entry: f64,
    pub stop_loss: f64,
    pub target: f64,
    pub position_size_percent: f64,
}

/// Fused trading signal for one symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionSignal {
    pub symbol: String,
    pub direction: Direction,
    pub confidence: f64, // 0 to 100
    pub final_score: f64, // -1.0 to 1.0
    pub scores: PerSource<f64>,
    pub mention_counts: PerSource<u32>,
    pub sentiment_momentum: f64,
    pub volume_indicator: f64,
    pub risk_level: RiskLevel,
    pub time_horizon: TimeHorizon,
    pub market_condition: MarketCondition,
    #[serde(default)]
    pub trading: Option<TradingParameters>,
    pub data_sources_used: Vec<SourceKind>,
    /// Produced by the simplified estimator because the indicator window was too short
    #[serde(default)]
    pub degraded: bool,
    pub reasoning: String,
    pub timestamp: DateTime<Utc>,
    pub is_active: bool,
}

/// Timeframe for analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Timeframe {
    Minute1,
    Minute5,
    Minute15,
    Minute30,
    Hour1,
    Hour4,
    Day1,
    Week1,
}

impl Timeframe {
    pub fn to_minutes(&self) -> i64 {
        match self {
            Timeframe::Minute1 => 1,
            Timeframe::Minute5 => 5,
            Timeframe::Minute15 => 15,
            Timeframe::Minute30 => 30,
            Timeframe::Hour1 => 60,
            Timeframe::Hour4 => 240,
            Timeframe::Day1 => 1440,
            Timeframe::Week1 => 10080,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "1m" => Some(Timeframe::Minute1),
            "5m" => Some(Timeframe::Minute5),
            "15m" => Some(Timeframe::Minute15),
            "30m" => Some(Timeframe::Minute30),
            "1h" => Some(Timeframe::Hour1),
            "4h" => Some(Timeframe::Hour4),
            "1d" => Some(Timeframe::Day1),
            "1w" => Some(Timeframe::Week1),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_score_clamps() {
        assert_eq!(SourceScore::new(1.7, 3).score, 1.0);
        assert_eq!(SourceScore::new(-4.0, 3).score, -1.0);
        assert_eq!(SourceScore::new(f64::NAN, 3).score, 0.0);
        assert_eq!(SourceScore::new(0.25, 3).mention_count, 3);
    }

    #[test]
    fn test_direction_opposes() {
        assert!(Direction::Buy.opposes(Direction::Sell));
        assert!(Direction::Sell.opposes(Direction::Buy));
        assert!(!Direction::Buy.opposes(Direction::Hold));
        assert!(!Direction::Hold.opposes(Direction::Hold));
    }

    #[test]
    fn test_per_source_get_set() {
        let mut scores = PerSource::<f64>::default();
        scores.set(SourceKind::RegionalMarket, 0.4);
        assert_eq!(scores.get(SourceKind::RegionalMarket), 0.4);
        assert_eq!(scores.get(SourceKind::News), 0.0);
    }

    #[test]
    fn test_direction_serializes_uppercase() {
        let json = serde_json::to_string(&Direction::Buy).unwrap();
        assert_eq!(json, "\"BUY\"");
        let kind = serde_json::to_string(&SourceKind::RegionalMarket).unwrap();
        assert_eq!(kind, "\"REGIONAL_MARKET\"");
    }

    #[test]
    fn test_timeframe_parse() {
        assert_eq!(Timeframe::parse("1D"), Some(Timeframe::Day1));
        assert_eq!(Timeframe::parse("4h").map(|t| t.to_minutes()), Some(240));
        assert_eq!(Timeframe::parse("2y"), None);
    }
}
