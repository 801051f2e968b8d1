use std::io::Write;

use pretty_assertions::assert_eq;
use quant_engine::data::load_prices;
use quant_engine::{EngineError, QuantEngine, ReportOptions};
use forecast_engine::{ArimaOrder, ForecastModel};
use tempfile::NamedTempFile;
use trade_math::{EngineConfig, Frequency};

fn prices(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let t = i as f64;
            100.0 + 0.15 * t + (t * 0.45).sin() * 2.5 + (t * t * 0.37).sin() * 0.8
        })
        .collect()
}

fn price_file(values: &[f64]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "date,open,close").unwrap();
    for (i, v) in values.iter().enumerate() {
        writeln!(file, "day{},{},{}", i, v - 0.5, v).unwrap();
    }
    file
}

#[test]
fn test_full_report_from_csv() {
    let values = prices(260);
    let file = price_file(&values);
    let loaded = load_prices(file.path(), "close").unwrap();
    assert_eq!(loaded.len(), 260);

    let engine = QuantEngine::new(EngineConfig::default()).unwrap();
    let report = engine.analyze_prices(&loaded, &ReportOptions::default()).unwrap();

    assert_eq!(report.observations, 260);
    assert_eq!(report.returns.periods(), 259);
    assert!(report.var.var99 <= report.var.var95);
    assert_eq!(report.indicators.moving_averages[&200].len(), 61);
    assert_eq!(report.models.len(), 4);
    for model in &report.models {
        let forecast = model.forecast.as_ref().expect("every default model fits");
        assert_eq!(forecast.horizon(), 12);
        assert!(model.error.is_none());
    }

    let json = serde_json::to_value(&report).unwrap();
    assert!(json["models"][0]["forecast"]["forecasts"].is_array());
    assert!(!report.summary(2).is_empty());
}

#[test]
fn test_failed_model_does_not_abort_the_report() {
    let engine = QuantEngine::new(EngineConfig::default()).unwrap();
    let options = ReportOptions {
        horizon: Some(3),
        models: vec![
            ForecastModel::Arima(ArimaOrder::new(1, 1, 0)),
            ForecastModel::Arima(ArimaOrder::new(40, 1, 40)),
        ],
        ..ReportOptions::default()
    };
    let report = engine.analyze_prices(&prices(60), &options).unwrap();

    assert!(report.models[0].forecast.is_some());
    assert!(report.models[1].forecast.is_none());
    assert!(report.models[1].error.as_deref().unwrap().contains("Insufficient data"));

    let summary = report.summary(3);
    let lines: Vec<&str> = summary.lines().collect();
    assert_eq!(lines.len(), 6);
    assert_eq!(lines[0], "observations: 60");
    assert!(lines[4].contains("rmse"));
    assert!(lines[5].contains("failed (Insufficient data"));
}

#[test]
fn test_engine_from_config_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "forecast_horizon = 3\nprecision = 2").unwrap();

    let engine = QuantEngine::from_config_file(file.path()).unwrap();
    assert_eq!(engine.config().forecast_horizon, 3);
    assert_eq!(engine.config().cache_timeout_secs, 300);

    let mut bad = NamedTempFile::new().unwrap();
    writeln!(bad, "forecast_horizon = 0").unwrap();
    assert!(matches!(
        QuantEngine::from_config_file(bad.path()),
        Err(EngineError::Math(_))
    ));
}

#[test]
fn test_shared_cache_serves_repeat_reports() {
    let engine = QuantEngine::new(EngineConfig::default()).unwrap();
    let options = ReportOptions {
        models: vec![ForecastModel::Arima(ArimaOrder::new(1, 1, 0))],
        ..ReportOptions::default()
    };
    let first = engine.analyze_prices(&prices(120), &options).unwrap();
    let entries = engine.cached_entries();
    let second = engine.analyze_prices(&prices(120), &options).unwrap();

    assert_eq!(first, second);
    assert_eq!(engine.cached_entries(), entries);
}

#[test]
fn test_risk_block_uses_report_frequency() {
    let engine = QuantEngine::new(EngineConfig::default()).unwrap();
    let options = ReportOptions {
        frequency: Some(Frequency::Monthly),
        models: Vec::new(),
        ..ReportOptions::default()
    };
    let report = engine.analyze_prices(&prices(120), &options).unwrap();

    assert_eq!(report.returns.frequency, Frequency::Monthly);
    let rf = engine.config().risk_free_rate;
    let expected = (report.returns.annualized_return - rf) / report.returns.volatility;
    assert!((report.risk.sharpe_ratio - expected).abs() < 1e-9);
}
