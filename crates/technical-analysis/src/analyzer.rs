use analysis_core::{
    AnalysisError, BollingerValues, MacdValues, PriceCandle, TechnicalIndicators, Trend,
    MIN_INDICATOR_CANDLES,
};
use serde::{Deserialize, Serialize};

use crate::indicators::*;

/// Number of factors the technical score averages over, contributing or not.
const SCORE_FACTORS: f64 = 5.0;

/// Per-factor contributions to the technical score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TechnicalScore {
    pub rsi: f64,
    pub macd: f64,
    pub moving_averages: f64,
    pub bollinger: f64,
    pub trend: f64,
    /// Sum of the factors over five, in [-1, 1].
    pub total: f64,
}

/// Indicator snapshot plus the score derived from it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TechnicalReading {
    pub indicators: TechnicalIndicators,
    pub score: TechnicalScore,
}

/// Closing prices, rejecting empty, non-finite or non-positive input.
pub fn validated_closes(candles: &[PriceCandle]) -> Result<Vec<f64>, AnalysisError> {
    if candles.is_empty() {
        return Err(AnalysisError::InsufficientData("no candles supplied".to_string()));
    }
    candles
        .iter()
        .map(|c| {
            if c.close.is_finite() && c.close > 0.0 {
                Ok(c.close)
            } else {
                Err(AnalysisError::InvalidData(format!(
                    "invalid close {} at {}",
                    c.close, c.timestamp
                )))
            }
        })
        .collect()
}

/// Compute RSI(14), MACD(12,26,9), SMA20/50, EMA12/26, Bollinger(20, 2σ) and
/// the trend flag as of the last candle. Needs at least 50 candles.
pub fn calculate_technical_indicators(
    candles: &[PriceCandle],
) -> Result<TechnicalIndicators, AnalysisError> {
    if candles.len() < MIN_INDICATOR_CANDLES {
        return Err(AnalysisError::InsufficientData(format!(
            "need at least {} candles for technical indicators, got {}",
            MIN_INDICATOR_CANDLES,
            candles.len()
        )));
    }

    let closes = validated_closes(candles)?;
    let close = closes[closes.len() - 1];

    let last = |series: Vec<f64>, name: &str| {
        series.last().copied().ok_or_else(|| {
            AnalysisError::InsufficientData(format!("not enough candles for {}", name))
        })
    };

    let rsi = last(rsi(&closes, 14), "RSI(14)")?;
    let macd_result = macd(&closes, 12, 26, 9);
    let macd = MacdValues {
        value: last(macd_result.macd_line, "MACD line")?,
        signal: last(macd_result.signal_line, "MACD signal")?,
        histogram: last(macd_result.histogram, "MACD histogram")?,
    };
    let sma20 = last(sma(&closes, 20), "SMA(20)")?;
    let sma50 = last(sma(&closes, 50), "SMA(50)")?;
    let ema12 = last(ema(&closes, 12), "EMA(12)")?;
    let ema26 = last(ema(&closes, 26), "EMA(26)")?;

    let bands = bollinger_bands(&closes, 20, 2.0);
    let bollinger = BollingerValues {
        upper: last(bands.upper, "Bollinger upper")?,
        middle: last(bands.middle, "Bollinger middle")?,
        lower: last(bands.lower, "Bollinger lower")?,
    };

    let trend = if ema12 > ema26 && close > sma20 && macd.value > 0.0 {
        Trend::Bullish
    } else if ema12 < ema26 && close < sma20 && macd.value < 0.0 {
        Trend::Bearish
    } else {
        Trend::Neutral
    };

    Ok(TechnicalIndicators {
        close,
        rsi,
        macd,
        sma20,
        sma50,
        ema12,
        ema26,
        bollinger,
        trend,
    })
}

/// Derive the technical score from an indicator snapshot.
pub fn technical_score(indicators: &TechnicalIndicators) -> TechnicalScore {
    let ind = indicators;

    // Oversold reads bullish, overbought bearish
    let rsi = if ind.rsi < 30.0 {
        0.8
    } else if ind.rsi > 70.0 {
        -0.8
    } else {
        (50.0 - ind.rsi) / 50.0
    };

    let macd = if ind.macd.value > ind.macd.signal && ind.macd.histogram > 0.0 {
        0.7
    } else if ind.macd.value < ind.macd.signal && ind.macd.histogram < 0.0 {
        -0.7
    } else {
        0.0
    };

    let moving_averages = if ind.close > ind.sma20 && ind.sma20 > ind.sma50 {
        0.6
    } else if ind.close < ind.sma20 && ind.sma20 < ind.sma50 {
        -0.6
    } else {
        0.0
    };

    let width = ind.bollinger.upper - ind.bollinger.lower;
    let bollinger = if width > 0.0 {
        let position = (ind.close - ind.bollinger.lower) / width;
        if position < 0.2 {
            0.5
        } else if position > 0.8 {
            -0.5
        } else {
            0.0
        }
    } else {
        0.0
    };

    let trend = match ind.trend {
        Trend::Bullish => 0.4,
        Trend::Bearish => -0.4,
        Trend::Neutral => 0.0,
    };

    let total = ((rsi + macd + moving_averages + bollinger + trend) / SCORE_FACTORS).clamp(-1.0, 1.0);

    TechnicalScore {
        rsi,
        macd,
        moving_averages,
        bollinger,
        trend,
        total,
    }
}

/// Indicators and score in one pass.
pub fn analyze(candles: &[PriceCandle]) -> Result<TechnicalReading, AnalysisError> {
    let indicators = calculate_technical_indicators(candles)?;
    let score = technical_score(&indicators);
    Ok(TechnicalReading { indicators, score })
}
