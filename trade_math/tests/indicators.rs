use rstest::rstest;
use trade_math::moving_averages::sma_series;
use trade_math::oscillators::{macd_series, rsi_series};
use trade_math::volatility::bollinger_series;

fn wave(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 100.0 + (i as f64 * 0.4).sin() * 3.0 + i as f64 * 0.05)
        .collect()
}

#[rstest]
#[case(5, 1.0)]
#[case(10, 2.0)]
#[case(20, 2.5)]
fn bands_are_ordered(#[case] period: usize, #[case] k: f64) {
    let prices = wave(60);
    let bands = bollinger_series(&prices, period, k).unwrap();

    assert_eq!(bands.middle.len(), prices.len() - period + 1);
    for i in 0..bands.middle.len() {
        assert!(bands.upper[i] > bands.middle[i]);
        assert!(bands.middle[i] > bands.lower[i]);
    }
}

#[rstest]
#[case(3)]
#[case(7)]
#[case(30)]
fn sma_matches_window_mean(#[case] window: usize) {
    let prices = wave(40);
    let sma = sma_series(&prices, window).unwrap();

    assert_eq!(sma.len(), prices.len() - window + 1);
    for (i, value) in sma.iter().enumerate() {
        let expected = prices[i..i + window].iter().sum::<f64>() / window as f64;
        assert!((value - expected).abs() < 1e-9);
    }
}

#[test]
fn short_input_degrades_to_empty() {
    let prices = wave(5);
    assert!(rsi_series(&prices, 14).unwrap().is_empty());

    let macd = macd_series(&prices, 12, 26, 9).unwrap();
    assert!(macd.macd.is_empty());
    assert!(macd.signal.is_empty());
}

#[test]
fn macd_signal_lags_by_signal_period() {
    let prices = wave(80);
    let macd = macd_series(&prices, 12, 26, 9).unwrap();

    assert_eq!(macd.macd.len(), 80 - 26 + 1);
    assert_eq!(macd.signal.len(), macd.macd.len() - 8);

    let offset = macd.macd.len() - macd.signal.len();
    for (i, hist) in macd.histogram.iter().enumerate() {
        let expected = macd.macd[i + offset] - macd.signal[i];
        assert!((hist - expected).abs() < 1e-12);
    }
}
