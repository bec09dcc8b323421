#[cfg(test)]
mod tests {
    use super::super::indicators::*;

    // Wilder's classic RSI worked example closes
    fn sample_prices() -> Vec<f64> {
        vec![
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08,
            45.89, 46.03, 45.61, 46.28, 46.28, 46.00, 46.03, 46.41, 46.22, 45.64,
        ]
    }

    fn long_series() -> Vec<f64> {
        (0..60)
            .map(|i| 100.0 + (i as f64 * 0.7).sin() * 5.0 + i as f64 * 0.1)
            .collect()
    }

    #[test]
    fn test_sma_basic() {
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let result = sma(&data, 3);

        assert_eq!(result.len(), 3);
        assert!((result[0] - 2.0).abs() < 1e-9);
        assert!((result[1] - 3.0).abs() < 1e-9);
        assert!((result[2] - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_sma_insufficient_data() {
        assert!(sma(&[1.0, 2.0], 5).is_empty());
        assert!(sma(&[1.0, 2.0], 0).is_empty());
    }

    #[test]
    fn test_sma_real_prices() {
        let prices = sample_prices();
        let result = sma(&prices, 5);

        let expected_first = (44.34 + 44.09 + 44.15 + 43.61 + 44.33) / 5.0;
        assert!((result[0] - expected_first).abs() < 1e-9);
        let expected_last = prices[15..].iter().sum::<f64>() / 5.0;
        assert!((result.last().unwrap() - expected_last).abs() < 1e-9);
    }

    #[test]
    fn test_ema_seeded_with_sma() {
        let data = vec![22.0, 24.0, 23.0, 25.0, 26.0];
        let result = ema(&data, 3);

        assert_eq!(result.len(), 3);
        let seed = (22.0 + 24.0 + 23.0) / 3.0;
        assert!((result[0] - seed).abs() < 1e-9);
        // multiplier 2/(3+1) = 0.5
        let next = (25.0 - seed) * 0.5 + seed;
        assert!((result[1] - next).abs() < 1e-9);
    }

    #[test]
    fn test_ema_empty_data() {
        assert!(ema(&[], 5).is_empty());
    }

    #[test]
    fn test_ema_increases_with_uptrend() {
        let data: Vec<f64> = (1..=10).map(|v| v as f64).collect();
        let result = ema(&data, 3);

        for i in 1..result.len() {
            assert!(result[i] > result[i - 1]);
        }
    }

    #[test]
    fn test_rsi_in_range() {
        let result = rsi(&sample_prices(), 14);

        assert_eq!(result.len(), sample_prices().len() - 14);
        for &value in &result {
            assert!((0.0..=100.0).contains(&value));
        }
    }

    #[test]
    fn test_rsi_insufficient_data() {
        assert!(rsi(&[1.0, 2.0, 3.0], 14).is_empty());
    }

    #[test]
    fn test_rsi_first_value_matches_wilder() {
        // First RSI(14) of the worked example is ~70.46
        let result = rsi(&sample_prices(), 14);
        assert!((result[0] - 70.46).abs() < 0.1, "got {}", result[0]);
    }

    #[test]
    fn test_rsi_extremes() {
        let up: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        assert_eq!(*rsi(&up, 14).last().unwrap(), 100.0);

        let down: Vec<f64> = (0..20).map(|i| 100.0 - i as f64).collect();
        assert_eq!(*rsi(&down, 14).last().unwrap(), 0.0);

        assert_eq!(*rsi(&[5.0; 20], 14).last().unwrap(), 50.0);
    }

    #[test]
    fn test_macd_lengths() {
        let data = long_series();
        let result = macd(&data, 12, 26, 9);

        assert_eq!(result.macd_line.len(), data.len() - 25);
        assert_eq!(result.signal_line.len(), result.macd_line.len() - 8);
        assert_eq!(result.histogram.len(), result.signal_line.len());
    }

    #[test]
    fn test_macd_line_is_ema_difference() {
        let data = long_series();
        let result = macd(&data, 12, 26, 9);
        let fast = ema(&data, 12);
        let slow = ema(&data, 26);

        let expected = fast.last().unwrap() - slow.last().unwrap();
        assert!((result.macd_line.last().unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_macd_histogram() {
        let result = macd(&long_series(), 12, 26, 9);
        let offset = result.macd_line.len() - result.signal_line.len();

        for (i, &hist) in result.histogram.iter().enumerate() {
            let expected = result.macd_line[i + offset] - result.signal_line[i];
            assert!((hist - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn test_macd_short_input_is_empty() {
        let result = macd(&sample_prices(), 12, 26, 9);
        assert!(result.macd_line.is_empty());
        assert!(result.histogram.is_empty());
    }

    #[test]
    fn test_bollinger_bands_ordering() {
        let result = bollinger_bands(&sample_prices(), 10, 2.0);

        assert_eq!(result.upper.len(), result.middle.len());
        assert_eq!(result.middle.len(), result.lower.len());
        for i in 0..result.upper.len() {
            assert!(result.upper[i] > result.middle[i]);
            assert!(result.middle[i] > result.lower[i]);
        }
    }

    #[test]
    fn test_bollinger_bands_population_std() {
        let data = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let result = bollinger_bands(&data, 8, 2.0);

        // mean 5, population stddev 2
        assert!((result.middle[0] - 5.0).abs() < 1e-9);
        assert!((result.upper[0] - 9.0).abs() < 1e-9);
        assert!((result.lower[0] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_bollinger_bands_constant_prices_collapse() {
        let result = bollinger_bands(&[100.0; 20], 10, 2.0);

        for i in 0..result.upper.len() {
            assert_eq!(result.upper[i], result.lower[i]);
        }
    }
}
