use analysis_core::{Direction, PriceCandle};

use crate::engine::SignalGenerator;
use crate::models::{QuickAccuracy, QuickAccuracyConfig};

/// Cheap directional hit rate: sample every `stride`-th candle from `offset`,
/// signal on the trailing window, and check the close `lookahead` candles
/// later. Not meant for position sizing.
pub fn quick_accuracy(
    generator: &dyn SignalGenerator,
    symbol: &str,
    candles: &[PriceCandle],
    config: &QuickAccuracyConfig,
) -> QuickAccuracy {
    let mut samples: u32 = 0;
    let mut wins: u32 = 0;
    let stride = config.stride.max(1);
    let window = config.window.max(1);

    let mut i = config.offset;
    while i + config.lookahead < candles.len() {
        if i + 1 >= window {
            let slice = &candles[i + 1 - window..=i];
            match generator.generate(symbol, slice) {
                Ok(signal) if signal.direction.is_directional() => {
                    let now = candles[i].close;
                    let later = candles[i + config.lookahead].close;
                    samples += 1;
                    let hit = match signal.direction {
                        Direction::Buy => later > now,
                        Direction::Sell => later < now,
                        Direction::Hold => false,
                    };
                    if hit {
                        wins += 1;
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::debug!("Accuracy sample {} for {} skipped: {}", i, symbol, e),
            }
        }
        i += stride;
    }

    let accuracy = if samples > 0 {
        wins as f64 / samples as f64 * 100.0
    } else {
        config.default_accuracy
    };

    QuickAccuracy {
        accuracy,
        confidence: (samples as f64 * config.confidence_per_sample).min(config.max_confidence),
        samples,
        wins,
    }
}
