use std::sync::Arc;
use std::thread;
use std::time::Duration;

use pretty_assertions::assert_eq;
use risk_analytics::{IndicatorParams, PortfolioAsset, RiskCalculator, RiskError, VarMethod};
use trade_math::{CacheStore, EngineConfig, Frequency, ManualClock, TtlCache};

fn prices(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 100.0 + i as f64 * 0.2 + (i as f64 * 0.4).sin() * 3.0)
        .collect()
}

fn returns() -> Vec<f64> {
    (0..60)
        .map(|i| ((i * 17) % 23) as f64 / 1000.0 - 0.011)
        .collect()
}

fn calculator_with_clock() -> (RiskCalculator, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let cache = Arc::new(TtlCache::with_clock(Duration::from_secs(300), clock.clone()));
    let calc = RiskCalculator::with_cache(EngineConfig::default(), cache).unwrap();
    (calc, clock)
}

#[test]
fn test_cache_hit_is_reference_equal() {
    let calc = RiskCalculator::new(EngineConfig::default()).unwrap();
    let r = returns();

    let first = calc.calculate_var(&r, 0.95, VarMethod::MonteCarlo).unwrap();
    let second = calc.calculate_var(&r, 0.95, VarMethod::MonteCarlo).unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    // A different parameter is a different entry
    let other = calc.calculate_var(&r, 0.90, VarMethod::MonteCarlo).unwrap();
    assert!(!Arc::ptr_eq(&first, &other));
}

#[test]
fn test_clear_cache_forces_recompute() {
    let calc = RiskCalculator::new(EngineConfig::default()).unwrap();
    let r = returns();

    let first = calc.calculate_returns(&r, None).unwrap();
    calc.clear_cache();
    assert!(calc.cache().is_empty());

    let second = calc.calculate_returns(&r, None).unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(*first, *second);
}

#[test]
fn test_entries_expire_after_ttl() {
    let (calc, clock) = calculator_with_clock();
    let p = prices(40);

    let first = calc.calculate_rsi(&p, 14).unwrap();
    clock.advance(Duration::from_secs(299));
    assert!(Arc::ptr_eq(&first, &calc.calculate_rsi(&p, 14).unwrap()));

    clock.advance(Duration::from_secs(2));
    assert!(!Arc::ptr_eq(&first, &calc.calculate_rsi(&p, 14).unwrap()));
}

#[test]
fn test_errors_leave_cache_untouched() {
    let calc = RiskCalculator::new(EngineConfig::default()).unwrap();
    let result = calc.calculate_var(&[0.01, 0.02], 0.95, VarMethod::Historical);
    assert!(matches!(result, Err(RiskError::InsufficientData(_))));
    assert!(calc.cache().is_empty());
}

#[test]
fn test_config_defaults_apply() {
    let config = EngineConfig {
        frequency: Frequency::Monthly,
        risk_free_rate: 0.0,
        ..EngineConfig::default()
    };
    let calc = RiskCalculator::new(config).unwrap();
    let r = returns();

    let stats = calc.calculate_returns(&r, None).unwrap();
    assert_eq!(stats.frequency, Frequency::Monthly);

    let explicit = calc
        .calculate_sharpe_ratio(&r, Some(Frequency::Monthly), Some(0.0), None)
        .unwrap();
    let implied = calc.calculate_sharpe_ratio(&r, None, None, None).unwrap();
    assert_eq!(explicit, implied);
}

#[test]
fn test_risk_metrics_follow_requested_frequency() {
    let calc = RiskCalculator::new(EngineConfig::default()).unwrap();
    let r = returns();

    let stats = calc.calculate_returns(&r, Some(Frequency::Monthly)).unwrap();
    let metrics = calc
        .calculate_risk_metrics(&r, Some(Frequency::Monthly), Some(0.02), None)
        .unwrap();
    let expected = (stats.annualized_return - 0.02) / stats.volatility;
    assert!((metrics.sharpe_ratio - expected).abs() < 1e-12);

    let sharpe = calc
        .calculate_sharpe_ratio(&r, Some(Frequency::Monthly), Some(0.02), None)
        .unwrap();
    assert_eq!(sharpe, metrics.sharpe_ratio);

    // Daily annualization is a different result, not a cache hit
    let daily = calc
        .calculate_risk_metrics(&r, Some(Frequency::Daily), Some(0.02), None)
        .unwrap();
    assert!((daily.sharpe_ratio - metrics.sharpe_ratio).abs() > 1e-6);
}

#[test]
fn test_portfolio_uses_asset_weights_by_default() {
    let calc = RiskCalculator::new(EngineConfig::default()).unwrap();
    let r = returns();
    let shifted: Vec<f64> = r.iter().rev().copied().collect();
    let assets = vec![
        PortfolioAsset::from_returns("A", 0.7, r, Frequency::Daily),
        PortfolioAsset::from_returns("B", 0.3, shifted, Frequency::Daily),
    ];

    let implicit = calc.analyze_portfolio(&assets, None).unwrap();
    let explicit = calc.analyze_portfolio(&assets, Some(&[0.7, 0.3][..])).unwrap();
    assert!(Arc::ptr_eq(&implicit, &explicit));
    assert_eq!(implicit.weights, vec![0.7, 0.3]);

    let corr = calc.calculate_correlation_matrix(&assets).unwrap();
    assert_eq!(corr.values, implicit.correlation.values);
}

#[test]
fn test_indicator_set_lengths() {
    let calc = RiskCalculator::new(EngineConfig::default()).unwrap();
    let p = prices(250);
    let set = calc
        .calculate_indicators(&p, &IndicatorParams::default())
        .unwrap();

    assert_eq!(set.moving_averages[&20].len(), 231);
    assert_eq!(set.moving_averages[&50].len(), 201);
    assert_eq!(set.moving_averages[&200].len(), 51);
    assert_eq!(set.rsi.len(), 236);
    assert_eq!(set.bollinger.middle.len(), 231);
    assert_eq!(set.macd.macd.len(), 225);
    assert_eq!(set.macd.signal.len(), 225 - 8);

    for i in 0..set.bollinger.middle.len() {
        assert!(set.bollinger.upper[i] >= set.bollinger.middle[i]);
        assert!(set.bollinger.middle[i] >= set.bollinger.lower[i]);
    }
}

#[test]
fn test_short_indicator_input_is_empty() {
    let calc = RiskCalculator::new(EngineConfig::default()).unwrap();
    let p = prices(10);
    assert!(calc.calculate_rsi(&p, 14).unwrap().is_empty());
    assert!(calc.calculate_moving_averages(&p, &[20]).unwrap()[&20].is_empty());
    assert!(matches!(
        calc.calculate_rsi(&p, 0),
        Err(RiskError::InvalidArgument(_))
    ));
}

#[test]
fn test_concurrent_callers_agree() {
    let calc = Arc::new(RiskCalculator::new(EngineConfig::default()).unwrap());
    let r = Arc::new(returns());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let calc = Arc::clone(&calc);
            let r = Arc::clone(&r);
            thread::spawn(move || {
                let var = calc.calculate_var(&r, 0.99, VarMethod::MonteCarlo).unwrap();
                let bands = calc.calculate_bollinger_bands(&r, 10, 2.0).unwrap();
                ((*var).clone(), (*bands).clone())
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for result in &results[1..] {
        assert_eq!(result, &results[0]);
    }
}

#[test]
fn test_results_serialize_to_json() {
    let calc = RiskCalculator::new(EngineConfig::default()).unwrap();
    let r = returns();

    let metrics = calc.calculate_risk_metrics(&r, None, None, None).unwrap();
    let json = serde_json::to_value(&*metrics).unwrap();
    assert!(json["sharpe_ratio"].is_number());
    assert!(json["beta"].is_null());

    let macd = calc.calculate_macd(&prices(60), 12, 26, 9).unwrap();
    let json = serde_json::to_value(&*macd).unwrap();
    assert_eq!(json["macd"].as_array().unwrap().len(), 35);
}
