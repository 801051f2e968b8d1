use approx::{assert_abs_diff_eq, assert_relative_eq};
use forecast_engine::models::arima::Arima;
use forecast_engine::models::exponential_smoothing::ExponentialSmoothing;
use forecast_engine::{
    ArimaOrder, FittedModel, ForecastError, ForecastModel, Forecaster, SmoothingMode,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rstest::rstest;

fn linear(n: usize) -> Vec<f64> {
    (0..n).map(|i| 10.0 + 3.0 * i as f64).collect()
}

/// `y_t = 5 + 0.5·y_{t-1} + u_t`, `u_t ~ U(-0.5, 0.5)`
fn ar1_series(n: usize) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(11);
    let mut y = vec![10.0];
    for _ in 1..n {
        let prev = *y.last().unwrap();
        y.push(5.0 + 0.5 * prev + rng.gen_range(-0.5..0.5));
    }
    y
}

fn random_walk(n: usize) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(3);
    let mut level = 100.0;
    (0..n)
        .map(|_| {
            level += 0.2 + rng.gen_range(-1.0..1.0);
            level
        })
        .collect()
}

fn assert_widening(model: &dyn FittedModel, horizon: usize) {
    let points = model.forecast(horizon).unwrap();
    assert_eq!(points.len(), horizon);
    for p in &points {
        assert!(p.lower_bound < p.value && p.value < p.upper_bound);
    }
    for pair in points.windows(2) {
        let w0 = pair[0].upper_bound - pair[0].lower_bound;
        let w1 = pair[1].upper_bound - pair[1].lower_bound;
        assert!(w1 >= w0 - 1e-12);
    }
}

#[test]
fn test_random_walk_with_drift_extends_the_line() {
    let model = Arima::new(ArimaOrder::new(0, 1, 0)).fit(&linear(30)).unwrap();
    let values: Vec<f64> = model.forecast(3).unwrap().iter().map(|p| p.value).collect();

    // Last value 97, constant difference 3
    assert_abs_diff_eq!(values[0], 100.0, epsilon = 1e-9);
    assert_abs_diff_eq!(values[1], 103.0, epsilon = 1e-9);
    assert_abs_diff_eq!(values[2], 106.0, epsilon = 1e-9);
    assert_eq!(model.fitted().len(), 29);
    assert_eq!(model.name(), "ARIMA(0,1,0)");
}

#[test]
fn test_ar1_coefficient_is_recovered() {
    let model = Arima::new(ArimaOrder::new(1, 0, 0)).fit(&ar1_series(500)).unwrap();
    let params = model.parameters();

    assert!((params["ar1"] - 0.5).abs() < 0.15, "ar1 = {}", params["ar1"]);
    assert!(params["sigma2"] > 0.0);
    assert_widening(&model, 8);

    let points = model.forecast(5).unwrap();
    let first = points[0].upper_bound - points[0].lower_bound;
    let fifth = points[4].upper_bound - points[4].lower_bound;
    assert!(fifth > first);
}

#[test]
fn test_arma_terms_are_estimated() {
    let model = Arima::new(ArimaOrder::new(1, 1, 1)).fit(&random_walk(120)).unwrap();
    let params = model.parameters();

    for name in ["intercept", "ar1", "ma1", "sigma2"] {
        assert!(params.contains_key(name), "missing {}", name);
    }
    assert!(params["ma1"].abs() <= 0.98);
    let ic = model.information_criteria().unwrap();
    assert!(ic.aic.is_finite() && ic.bic.is_finite());
    assert!(ic.bic > ic.aic);
    assert_widening(&model, 10);
}

#[test]
fn test_short_sample_falls_back_to_mean() {
    let series = [1.0, 2.0, 4.0, 3.0, 5.0];
    let model = Arima::new(ArimaOrder::new(0, 0, 2)).fit(&series).unwrap();
    let params = model.parameters();

    assert_eq!(params["ma1"], 0.0);
    assert_eq!(params["ma2"], 0.0);
    assert_relative_eq!(params["intercept"], 3.0, epsilon = 1e-12);
}

#[test]
fn test_arima_needs_enough_observations() {
    let result = Arima::new(ArimaOrder::new(2, 1, 2)).fit(&[1.0, 2.0, 3.0, 4.0]);
    assert!(matches!(result, Err(ForecastError::InsufficientData(_))));
}

#[rstest]
#[case(SmoothingMode::Simple)]
#[case(SmoothingMode::Double { beta: 0.3 })]
#[case(SmoothingMode::Triple { beta: 0.2, gamma: 0.4, season_length: 4 })]
fn test_constant_series_forecasts_constant(#[case] mode: SmoothingMode) {
    for alpha in [0.1, 0.3, 0.77, 1.0] {
        let model = ExponentialSmoothing::new(alpha, mode)
            .unwrap()
            .fit(&[7.5; 20])
            .unwrap();
        for point in model.forecast(15).unwrap() {
            assert_eq!(point.value, 7.5);
        }
    }
}

#[test]
fn test_holt_follows_a_linear_trend() {
    let series = linear(20);
    let model = ExponentialSmoothing::new(0.4, SmoothingMode::Double { beta: 0.3 })
        .unwrap()
        .fit(&series)
        .unwrap();

    let values: Vec<f64> = model.forecast(3).unwrap().iter().map(|p| p.value).collect();
    assert_abs_diff_eq!(values[0], 70.0, epsilon = 1e-9);
    assert_abs_diff_eq!(values[2], 76.0, epsilon = 1e-9);
    assert_eq!(model.fitted().len(), series.len());

    let components = model.components().unwrap();
    assert_eq!(components.level.len(), 20);
    assert!(components.trend.is_some());
    assert!(components.seasonal.is_none());
}

#[test]
fn test_holt_winters_repeats_the_season() {
    let pattern = [1.0, 5.0, 3.0];
    let series: Vec<f64> = (0..24).map(|i| pattern[i % 3]).collect();
    let mode = SmoothingMode::Triple {
        beta: 0.1,
        gamma: 0.1,
        season_length: 3,
    };
    let model = ExponentialSmoothing::new(0.5, mode)
        .unwrap()
        .fit(&series)
        .unwrap();

    let values: Vec<f64> = model.forecast(6).unwrap().iter().map(|p| p.value).collect();
    assert_eq!(values, vec![1.0, 5.0, 3.0, 1.0, 5.0, 3.0]);
    // The first season only initializes
    assert_eq!(model.fitted().len(), 21);
    assert_eq!(
        model.components().unwrap().seasonal,
        Some(vec![-2.0, 2.0, 0.0])
    );
}

#[test]
fn test_holt_winters_needs_a_full_season() {
    let mode = SmoothingMode::Triple {
        beta: 0.1,
        gamma: 0.1,
        season_length: 12,
    };
    let result = ExponentialSmoothing::new(0.5, mode)
        .unwrap()
        .fit(&[1.0; 12]);
    assert!(matches!(result, Err(ForecastError::InsufficientData(_))));
}

#[test]
fn test_simple_smoothing_is_flat() {
    let model = ExponentialSmoothing::new(0.3, SmoothingMode::Simple)
        .unwrap()
        .fit(&random_walk(50))
        .unwrap();
    let points = model.forecast(4).unwrap();
    assert!(points.iter().all(|p| p.value == points[0].value));
    assert_widening(&model, 4);
}

#[rstest]
#[case(ForecastModel::Arima(ArimaOrder::new(1, 1, 0)))]
#[case(ForecastModel::ExponentialSmoothing { alpha: 0.5, mode: SmoothingMode::Double { beta: 0.1 } })]
#[case(ForecastModel::MultipleRegression { lags: 3 })]
#[case(ForecastModel::RandomForest {
    params: forecast_engine::ForestParams { n_estimators: 10, seed: Some(5), ..Default::default() },
    lags: 3,
})]
fn test_every_model_produces_a_forecast_result(#[case] model: ForecastModel) {
    let fitted = model.fit(&random_walk(80)).unwrap();
    let result = fitted.forecast_result(6).unwrap();

    assert_eq!(result.horizon(), 6);
    assert_eq!(result.fitted.len(), result.residuals.len());
    assert!(result.accuracy.rmse >= 0.0);
    assert!(result.accuracy.mae <= result.accuracy.rmse + 1e-12);
    for p in &result.forecasts {
        assert!(p.lower_bound < p.value && p.value < p.upper_bound);
    }
    assert!(matches!(
        fitted.forecast_result(0),
        Err(ForecastError::InvalidArgument(_))
    ));
}

#[test]
fn test_model_spec_from_json() {
    let model: ForecastModel =
        serde_json::from_str(r#"{"model":"arima","p":2,"d":1,"q":1}"#).unwrap();
    assert_eq!(model, ForecastModel::Arima(ArimaOrder::new(2, 1, 1)));

    let model: ForecastModel = serde_json::from_str(
        r#"{"model":"exponential_smoothing","alpha":0.5,"mode":{"kind":"triple","beta":0.1,"gamma":0.2,"season_length":7}}"#,
    )
    .unwrap();
    assert!(matches!(
        model,
        ForecastModel::ExponentialSmoothing {
            mode: SmoothingMode::Triple { season_length: 7, .. },
            ..
        }
    ));

    let model: ForecastModel =
        serde_json::from_str(r#"{"model":"random_forest","params":{"n_estimators":5},"lags":2}"#)
            .unwrap();
    match model {
        ForecastModel::RandomForest { params, lags } => {
            assert_eq!(params.n_estimators, 5);
            assert_eq!(params.max_depth, 10);
            assert_eq!(lags, 2);
        }
        other => panic!("unexpected model {:?}", other),
    }
}
