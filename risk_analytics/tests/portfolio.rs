use approx::assert_relative_eq;
use risk_analytics::portfolio::{
    analyze_portfolio, calculate_correlation_matrix, stress_test_portfolio,
};
use risk_analytics::{PortfolioAsset, RiskError, StressScenario};
use trade_math::{stats, Frequency};

fn assets() -> Vec<PortfolioAsset> {
    vec![
        PortfolioAsset::from_returns(
            "AAA",
            0.6,
            vec![0.010, -0.020, 0.015, 0.007, -0.004, 0.011, -0.008],
            Frequency::Daily,
        ),
        PortfolioAsset::from_returns(
            "BBB",
            0.4,
            vec![0.002, 0.012, -0.006, 0.009, 0.001, -0.013, 0.004],
            Frequency::Daily,
        ),
        PortfolioAsset::from_returns(
            "CCC",
            0.0,
            vec![0.020, -0.040, 0.030, 0.014, -0.008, 0.022, -0.016],
            Frequency::Daily,
        ),
    ]
}

#[test]
fn test_covariance_volatility_matches_portfolio_series() {
    let assets = assets();
    let analysis = analyze_portfolio(&assets, &[0.5, 0.3, 0.2], Frequency::Daily, 0.02).unwrap();

    // √(wᵀΣw) is the sample std of the weighted return series
    let direct = stats::std_dev(&analysis.portfolio_returns) * 252f64.sqrt();
    assert_relative_eq!(analysis.metrics.volatility, direct, epsilon = 1e-12);

    let expected_return = stats::mean(&analysis.portfolio_returns) * 252.0;
    assert_relative_eq!(analysis.metrics.expected_return, expected_return, epsilon = 1e-12);

    let sharpe = analysis.metrics.sharpe_ratio.unwrap();
    assert_relative_eq!(
        sharpe,
        (expected_return - 0.02) / analysis.metrics.volatility,
        epsilon = 1e-12
    );
}

#[test]
fn test_risk_contributions_add_up() {
    let analysis = analyze_portfolio(&assets(), &[0.5, 0.3, 0.2], Frequency::Daily, 0.0).unwrap();

    let components: f64 = analysis.risk_contributions.iter().map(|c| c.component).sum();
    let percents: f64 = analysis.risk_contributions.iter().map(|c| c.percent).sum();
    assert_relative_eq!(components, analysis.metrics.volatility, epsilon = 1e-12);
    assert_relative_eq!(percents, 1.0, epsilon = 1e-12);

    // Long-only weights never sum to less than the portfolio volatility
    assert!(analysis.diversification_ratio.unwrap() >= 1.0 - 1e-12);
}

#[test]
fn test_correlation_matrix_shape() {
    let matrix = calculate_correlation_matrix(&assets()).unwrap();
    assert_eq!(matrix.len(), 3);
    for i in 0..3 {
        assert_eq!(matrix.get(i, i), Some(1.0));
        for j in 0..3 {
            let v = matrix.get(i, j).unwrap();
            assert_eq!(v, matrix.get(j, i).unwrap());
            assert!((-1.0..=1.0).contains(&v));
        }
    }

    // CCC is exactly twice AAA
    assert_relative_eq!(matrix.between("AAA", "CCC").unwrap(), 1.0, epsilon = 1e-12);
}

#[test]
fn test_zero_variance_asset_correlates_at_zero() {
    let assets = vec![
        PortfolioAsset::from_returns("CASH", 0.5, vec![0.0; 4], Frequency::Daily),
        PortfolioAsset::from_returns("EQ", 0.5, vec![0.01, -0.02, 0.03, 0.0], Frequency::Daily),
    ];
    let matrix = calculate_correlation_matrix(&assets).unwrap();
    assert_eq!(matrix.get(0, 1), Some(0.0));
    assert_eq!(matrix.get(0, 0), Some(1.0));
}

#[test]
fn test_weight_validation() {
    let assets = assets();
    assert!(matches!(
        analyze_portfolio(&assets, &[0.5, 0.5], Frequency::Daily, 0.0),
        Err(RiskError::InvalidArgument(_))
    ));
    assert!(matches!(
        analyze_portfolio(&assets, &[0.5, f64::NAN, 0.5], Frequency::Daily, 0.0),
        Err(RiskError::InvalidArgument(_))
    ));
    assert!(matches!(
        analyze_portfolio(&[], &[], Frequency::Daily, 0.0),
        Err(RiskError::InvalidArgument(_))
    ));
}

#[test]
fn test_ragged_returns_rejected() {
    let mut assets = assets();
    assets[1].returns.pop();
    assert!(matches!(
        calculate_correlation_matrix(&assets),
        Err(RiskError::InvalidArgument(_))
    ));
}

#[test]
fn test_stress_scenarios() {
    let assets = assets();
    let scenarios = vec![
        StressScenario::new("equity crash")
            .shock("AAA", -0.2)
            .with_default_shock(-0.05),
        StressScenario::new("flat"),
    ];
    let results = stress_test_portfolio(&assets, &[0.6, 0.4, 0.0], &scenarios).unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].scenario, "equity crash");
    assert_relative_eq!(results[0].portfolio_return, -0.14, epsilon = 1e-12);
    assert_eq!(results[0].asset_impacts[1].shock, -0.05);
    assert_eq!(results[1].portfolio_return, 0.0);
}
