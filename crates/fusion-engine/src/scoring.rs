//! Pure fusion rules. Everything here is deterministic given its inputs, so
//! the live engine and the backtester share one decision path.

use analysis_core::{
    AnalysisError, Direction, FusionConfig, FusionSignal, FusionWeights, MarketCondition,
    PerSource, RiskLevel, RiskThresholds, SourceKind, SourceScore, TimeHorizon, TradingParameters,
};
use chrono::{DateTime, Utc};

/// Everything `fuse` needs to know about one symbol at one instant.
#[derive(Debug, Clone)]
pub struct FusionInput {
    pub symbol: String,
    pub sources: PerSource<SourceScore>,
    /// Sources that actually returned a score.
    pub data_sources_used: Vec<SourceKind>,
    /// Sources that were asked and failed or timed out.
    pub unavailable: Vec<SourceKind>,
    /// Reference price for trading parameters.
    pub price: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl FusionInput {
    pub fn new(symbol: impl Into<String>, sources: PerSource<SourceScore>, timestamp: DateTime<Utc>) -> Self {
        Self {
            symbol: symbol.into(),
            sources,
            data_sources_used: SourceKind::ALL.to_vec(),
            unavailable: Vec::new(),
            price: None,
            timestamp,
        }
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }
}

/// Low-confidence bias used when the indicator window is too short
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimplifiedEstimate {
    /// (price - mean) / mean
    pub deviation: f64,
    pub score: f64,
    /// Always within [40, 60].
    pub confidence: f64,
    pub candles: usize,
}

pub fn weighted_score(weights: &FusionWeights, scores: &PerSource<f64>) -> f64 {
    let total: f64 = SourceKind::ALL
        .iter()
        .map(|k| weights.get(*k) * scores.get(*k))
        .sum();
    total.clamp(-1.0, 1.0)
}

pub fn direction_for(score: f64, threshold: f64) -> Direction {
    if score > threshold {
        Direction::Buy
    } else if score < -threshold {
        Direction::Sell
    } else {
        Direction::Hold
    }
}

pub fn confidence_for(score: f64, direction: Direction) -> f64 {
    let confidence = (score.abs() * 100.0).clamp(50.0, 100.0);
    if direction == Direction::Hold {
        confidence.min(60.0)
    } else {
        confidence
    }
}

pub fn risk_level(thresholds: &RiskThresholds, sources: &PerSource<SourceScore>) -> RiskLevel {
    let mentions = sources.social.mention_count + sources.messaging.mention_count;
    let spread = (sources.social.score - sources.messaging.score).abs();

    if mentions > thresholds.high_volume_mentions && spread < thresholds.consistent_spread {
        RiskLevel::Low
    } else if mentions < thresholds.low_volume_mentions || spread > thresholds.divergent_spread {
        RiskLevel::High
    } else {
        RiskLevel::Medium
    }
}

pub fn time_horizon(config: &FusionConfig, scores: &PerSource<f64>) -> TimeHorizon {
    let intensity = scores.technical.abs() + scores.social.abs() + scores.messaging.abs();
    if intensity > config.short_horizon_sum {
        TimeHorizon::Short
    } else if intensity < config.long_horizon_sum {
        TimeHorizon::Long
    } else {
        TimeHorizon::Medium
    }
}

pub fn market_condition(band: f64, scores: &PerSource<f64>) -> MarketCondition {
    let mean = (scores.social + scores.messaging + scores.technical) / 3.0;
    if mean > band {
        MarketCondition::Bullish
    } else if mean < -band {
        MarketCondition::Bearish
    } else {
        MarketCondition::Neutral
    }
}

/// Entry/stop/target around `price`. HOLD and unpriced signals get none.
pub fn trading_parameters(
    config: &FusionConfig,
    direction: Direction,
    price: Option<f64>,
    confidence: f64,
) -> Option<TradingParameters> {
    let price = price.filter(|p| p.is_finite() && *p > 0.0)?;
    let (entry, stop_loss, target) = match direction {
        Direction::Buy => (
            price * (1.0 + config.entry_offset_pct),
            price * (1.0 - config.stop_loss_pct),
            price * (1.0 + config.take_profit_pct),
        ),
        Direction::Sell => (
            price * (1.0 - config.entry_offset_pct),
            price * (1.0 + config.stop_loss_pct),
            price * (1.0 - config.take_profit_pct),
        ),
        Direction::Hold => return None,
    };

    Some(TradingParameters {
        entry,
        stop_loss,
        target,
        position_size_percent: (confidence / 20.0).clamp(1.0, 5.0),
    })
}

/// Social/messaging average, damped by how much the two disagree.
pub fn sentiment_momentum(social: f64, messaging: f64) -> f64 {
    ((social + messaging) / 2.0) * (1.0 - (social - messaging).abs() / 2.0)
}

pub fn volume_indicator(mentions: &PerSource<u32>) -> f64 {
    let total: u32 = SourceKind::ALL.iter().map(|k| mentions.get(*k)).sum();
    (total as f64 / 100.0).min(1.0)
}

fn factor_label(kind: SourceKind) -> &'static str {
    match kind {
        SourceKind::Technical => "Technical indicators",
        SourceKind::Social => "Social sentiment",
        SourceKind::Messaging => "Messaging chatter",
        SourceKind::RegionalMarket => "Regional market",
        SourceKind::News => "News flow",
    }
}

pub fn build_reasoning(
    threshold: f64,
    scores: &PerSource<f64>,
    unavailable: &[SourceKind],
    degraded: Option<&SimplifiedEstimate>,
    final_score: f64,
) -> String {
    let mut parts: Vec<String> = SourceKind::ALL
        .iter()
        .filter(|k| scores.get(**k).abs() >= threshold)
        .map(|k| {
            let score = scores.get(*k);
            format!(
                "{} {} ({:+.0}%)",
                factor_label(*k),
                if score > 0.0 { "bullish" } else { "bearish" },
                score * 100.0
            )
        })
        .collect();

    if let Some(estimate) = degraded {
        parts.push(format!(
            "Degraded: simplified estimate from {} candles, price {:+.1}% vs mean",
            estimate.candles,
            estimate.deviation * 100.0
        ));
    }

    if !unavailable.is_empty() {
        let names: Vec<&str> = unavailable.iter().map(|k| k.label()).collect();
        parts.push(format!("Unavailable: {}", names.join(", ")));
    }

    parts.push(format!("Final score {:+.1}%", final_score * 100.0));
    parts.join("; ")
}

/// Price-deviation estimate for series too short for the indicator set.
pub fn simplified_estimate(
    closes: &[f64],
    price: f64,
    news: f64,
    social: f64,
) -> Result<SimplifiedEstimate, AnalysisError> {
    if closes.is_empty() {
        return Err(AnalysisError::InsufficientData("no closes for simplified estimate".to_string()));
    }
    let mean = closes.iter().sum::<f64>() / closes.len() as f64;
    if !(mean.is_finite() && mean > 0.0 && price.is_finite()) {
        return Err(AnalysisError::InvalidData(format!(
            "cannot estimate from mean {} and price {}",
            mean, price
        )));
    }

    let deviation = (price - mean) / mean;
    let price_component = (deviation * 5.0).clamp(-1.0, 1.0);
    let score = (0.5 * price_component + 0.25 * news + 0.25 * social).clamp(-1.0, 1.0);

    Ok(SimplifiedEstimate {
        deviation,
        score,
        confidence: 40.0 + 20.0 * score.abs(),
        candles: closes.len(),
    })
}

fn assemble(
    config: &FusionConfig,
    input: &FusionInput,
    final_score: f64,
    confidence: f64,
    degraded: Option<&SimplifiedEstimate>,
) -> FusionSignal {
    let scores = input.sources.scores();
    let mention_counts = input.sources.mentions();
    let direction = direction_for(final_score, config.direction_threshold);

    FusionSignal {
        symbol: input.symbol.clone(),
        direction,
        confidence,
        final_score,
        scores,
        mention_counts,
        sentiment_momentum: sentiment_momentum(scores.social, scores.messaging),
        volume_indicator: volume_indicator(&mention_counts),
        risk_level: risk_level(&config.risk, &input.sources),
        time_horizon: time_horizon(config, &scores),
        market_condition: market_condition(config.market_condition_band, &scores),
        trading: trading_parameters(config, direction, input.price, confidence),
        data_sources_used: input.data_sources_used.clone(),
        degraded: degraded.is_some(),
        reasoning: build_reasoning(
            config.reasoning_threshold,
            &scores,
            &input.unavailable,
            degraded,
            final_score,
        ),
        timestamp: input.timestamp,
        is_active: true,
    }
}

/// Combine the five source scores with the weight table of the symbol's class.
pub fn fuse(config: &FusionConfig, input: &FusionInput) -> FusionSignal {
    let weights = config.weights_for(config.classify(&input.symbol));
    let final_score = weighted_score(weights, &input.sources.scores());
    let direction = direction_for(final_score, config.direction_threshold);
    assemble(config, input, final_score, confidence_for(final_score, direction), None)
}

/// Signal from a simplified estimate, flagged as degraded.
pub fn fuse_degraded(config: &FusionConfig, input: &FusionInput, estimate: &SimplifiedEstimate) -> FusionSignal {
    assemble(config, input, estimate.score, estimate.confidence, Some(estimate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const DIRECTION: f64 = analysis_core::DIRECTION_THRESHOLD;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn sources(t: f64, s: f64, m: f64, r: f64, n: f64) -> PerSource<SourceScore> {
        PerSource {
            technical: SourceScore::new(t, 0),
            social: SourceScore::new(s, 30),
            messaging: SourceScore::new(m, 30),
            regional_market: SourceScore::new(r, 0),
            news: SourceScore::new(n, 5),
        }
    }

    #[test]
    fn test_crypto_scenario() {
        let config = FusionConfig::default();
        let input = FusionInput::new("BTC", sources(0.6, 0.4, 0.5, 0.0, 0.1), at()).with_price(100.0);
        let signal = fuse(&config, &input);

        assert!((signal.final_score - 0.43).abs() < 1e-9, "got {}", signal.final_score);
        assert_eq!(signal.direction, Direction::Buy);
        assert_eq!(signal.confidence, 50.0);
        assert!(!signal.degraded);
        assert!(signal.is_active);
    }

    #[test]
    fn test_weight_tables_sum_to_one() {
        for weights in [FusionWeights::DEFAULT, FusionWeights::CRYPTO, FusionWeights::REGIONAL_EQUITY] {
            assert!((weights.sum() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_final_score_stays_in_range() {
        let config = FusionConfig::default();
        let grid = [-1.0, -0.5, 0.0, 0.5, 1.0];
        for symbol in ["AAPL", "ETH", "SCOM"] {
            for &a in &grid {
                for &b in &grid {
                    let input = FusionInput::new(symbol, sources(a, b, -a, b, a), at());
                    let signal = fuse(&config, &input);
                    assert!((-1.0..=1.0).contains(&signal.final_score));
                    assert!((0.0..=100.0).contains(&signal.confidence));
                }
            }
        }
        let all_bull = fuse(&config, &FusionInput::new("AAPL", sources(1.0, 1.0, 1.0, 1.0, 1.0), at()));
        assert!((all_bull.final_score - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_direction_band_edges() {
        assert_eq!(direction_for(0.15, DIRECTION), Direction::Hold);
        assert_eq!(direction_for(0.150001, DIRECTION), Direction::Buy);
        assert_eq!(direction_for(-0.15, DIRECTION), Direction::Hold);
        assert_eq!(direction_for(-0.2, DIRECTION), Direction::Sell);
    }

    #[test]
    fn test_direction_is_monotonic_in_each_source() {
        let config = FusionConfig::default();
        let rank = |d: Direction| match d {
            Direction::Sell => 0,
            Direction::Hold => 1,
            Direction::Buy => 2,
        };
        for kind in SourceKind::ALL {
            let mut prev = 0;
            for step in 0..=20 {
                let value = -1.0 + step as f64 * 0.1;
                let mut s = sources(0.1, 0.1, 0.1, 0.1, 0.1);
                s.set(kind, SourceScore::new(value, 30));
                let d = fuse(&config, &FusionInput::new("AAPL", s, at())).direction;
                assert!(rank(d) >= prev, "{:?} went backwards at {}", kind, value);
                prev = rank(d);
            }
        }
    }

    #[test]
    fn test_confidence_floor_and_hold_cap() {
        assert_eq!(confidence_for(0.2, Direction::Buy), 50.0);
        assert_eq!(confidence_for(-0.85, Direction::Sell), 85.0);
        assert_eq!(confidence_for(0.9, Direction::Hold), 60.0);
    }

    #[test]
    fn test_risk_levels() {
        let t = RiskThresholds::default();
        let mut s = sources(0.0, 0.5, 0.4, 0.0, 0.0);
        assert_eq!(risk_level(&t, &s), RiskLevel::Low);

        s.social.mention_count = 2;
        s.messaging.mention_count = 3;
        assert_eq!(risk_level(&t, &s), RiskLevel::High);

        let divergent = sources(0.0, 0.8, -0.2, 0.0, 0.0);
        assert_eq!(risk_level(&t, &divergent), RiskLevel::High);

        let mut medium = sources(0.0, 0.5, 0.0, 0.0, 0.0);
        medium.social.mention_count = 10;
        medium.messaging.mention_count = 10;
        assert_eq!(risk_level(&t, &medium), RiskLevel::Medium);
    }

    #[test]
    fn test_horizon_and_market_condition() {
        let config = FusionConfig::default();
        let strong = sources(0.6, 0.6, 0.6, 0.0, 0.0).scores();
        assert_eq!(time_horizon(&config, &strong), TimeHorizon::Short);
        assert_eq!(market_condition(0.2, &strong), MarketCondition::Bullish);

        let quiet = sources(0.1, 0.1, -0.1, 0.0, 0.0).scores();
        assert_eq!(time_horizon(&config, &quiet), TimeHorizon::Long);
        assert_eq!(market_condition(0.2, &quiet), MarketCondition::Neutral);

        let bear = sources(-0.4, -0.3, -0.3, 0.0, 0.0).scores();
        assert_eq!(time_horizon(&config, &bear), TimeHorizon::Medium);
        assert_eq!(market_condition(0.2, &bear), MarketCondition::Bearish);
    }

    #[test]
    fn test_trading_parameters() {
        let config = FusionConfig::default();
        let buy = trading_parameters(&config, Direction::Buy, Some(100.0), 80.0).unwrap();
        assert!((buy.entry - 101.0).abs() < 1e-9);
        assert!((buy.stop_loss - 95.0).abs() < 1e-9);
        assert!((buy.target - 110.0).abs() < 1e-9);
        assert_eq!(buy.position_size_percent, 4.0);

        let sell = trading_parameters(&config, Direction::Sell, Some(100.0), 120.0).unwrap();
        assert!((sell.entry - 99.0).abs() < 1e-9);
        assert!((sell.stop_loss - 105.0).abs() < 1e-9);
        assert!((sell.target - 90.0).abs() < 1e-9);
        assert_eq!(sell.position_size_percent, 5.0);

        assert!(trading_parameters(&config, Direction::Hold, Some(100.0), 50.0).is_none());
        assert!(trading_parameters(&config, Direction::Buy, None, 50.0).is_none());
        assert_eq!(
            trading_parameters(&config, Direction::Buy, Some(10.0), 10.0).unwrap().position_size_percent,
            1.0
        );
    }

    #[test]
    fn test_momentum_and_volume() {
        assert!((sentiment_momentum(0.6, 0.6) - 0.6).abs() < 1e-12);
        assert!((sentiment_momentum(1.0, -1.0)).abs() < 1e-12);
        assert!((sentiment_momentum(0.8, 0.4) - 0.6 * 0.8).abs() < 1e-12);

        let mut mentions = PerSource::<u32>::default();
        mentions.social = 30;
        mentions.news = 20;
        assert!((volume_indicator(&mentions) - 0.5).abs() < 1e-12);
        mentions.messaging = 500;
        assert_eq!(volume_indicator(&mentions), 1.0);
    }

    #[test]
    fn test_reasoning_lists_significant_factors_in_order() {
        let scores = sources(0.6, -0.4, 0.1, 0.0, 0.3).scores();
        let text = build_reasoning(0.3, &scores, &[SourceKind::RegionalMarket], None, 0.25);
        assert_eq!(
            text,
            "Technical indicators bullish (+60%); Social sentiment bearish (-40%); \
             News flow bullish (+30%); Unavailable: regional market; Final score +25.0%"
        );
    }

    #[test]
    fn test_simplified_estimate() {
        let closes = [100.0, 100.0, 100.0, 100.0];
        let est = simplified_estimate(&closes, 110.0, 0.2, 0.4).unwrap();
        assert!((est.deviation - 0.1).abs() < 1e-12);
        // 0.5 * 0.5 + 0.25 * 0.2 + 0.25 * 0.4
        assert!((est.score - 0.4).abs() < 1e-12);
        assert!((est.confidence - 48.0).abs() < 1e-9);
        assert_eq!(est.candles, 4);

        let capped = simplified_estimate(&closes, 200.0, 1.0, 1.0).unwrap();
        assert_eq!(capped.score, 1.0);
        assert_eq!(capped.confidence, 60.0);

        assert!(matches!(
            simplified_estimate(&[], 1.0, 0.0, 0.0),
            Err(AnalysisError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_degraded_signal_is_flagged() {
        let config = FusionConfig::default();
        let est = simplified_estimate(&[100.0; 10], 90.0, -0.2, -0.2).unwrap();
        let input = FusionInput::new("AAPL", sources(0.0, -0.2, 0.0, 0.0, -0.2), at()).with_price(90.0);
        let signal = fuse_degraded(&config, &input, &est);

        assert!(signal.degraded);
        assert_eq!(signal.direction, Direction::Sell);
        assert!((40.0..=60.0).contains(&signal.confidence));
        assert!(signal.reasoning.contains("Degraded"));
        let trading = signal.trading.unwrap();
        assert!(trading.stop_loss > trading.entry);
    }
}
