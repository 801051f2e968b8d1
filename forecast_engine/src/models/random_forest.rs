//! Random forest regression
//!
//! Each tree is grown on a bootstrap resample of the rows, trying a random
//! subset of features at every node and splitting where the sum of squared
//! errors drops the most. Predictions are the mean over trees.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use trade_math::series::{ensure_finite, ensure_min_len, ensure_rectangular};
use trade_math::stats;
use tracing::{debug, info};

use crate::error::{ForecastError, Result};
use crate::metrics::{calculate_forecast_accuracy, AccuracyMetrics};
use crate::models::{lag_matrix, latest_lags, FittedModel, ForecastPoint, Forecaster};

/// Forest hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestParams {
    /// Number of trees in the forest
    pub n_estimators: usize,
    /// Maximum depth of each tree
    pub max_depth: usize,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Features tried per node; a third of the columns (at least one) if None
    pub max_features: Option<usize>,
    /// Seed for bootstrap draws and feature subsets
    pub seed: Option<u64>,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 10,
            min_samples_split: 2,
            max_features: None,
            seed: None,
        }
    }
}

impl ForestParams {
    pub fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(ForecastError::InvalidArgument(
                "n_estimators must be at least 1".to_string(),
            ));
        }
        if self.max_depth == 0 {
            return Err(ForecastError::InvalidArgument(
                "max_depth must be at least 1".to_string(),
            ));
        }
        if self.min_samples_split < 2 {
            return Err(ForecastError::InvalidArgument(format!(
                "min_samples_split must be at least 2, got {}",
                self.min_samples_split
            )));
        }
        if self.max_features == Some(0) {
            return Err(ForecastError::InvalidArgument(
                "max_features must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    fn features_per_node(&self, n_features: usize) -> usize {
        self.max_features
            .unwrap_or(n_features / 3)
            .clamp(1, n_features)
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf(f64),
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

const PURE_NODE_TOLERANCE: f64 = 1e-12;

/// Sum of squared deviations from the mean
fn sse(sum: f64, sum_sq: f64, count: f64) -> f64 {
    (sum_sq - sum * sum / count).max(0.0)
}

/// Regression tree grown on one bootstrap sample
#[derive(Debug, Clone)]
struct DecisionTree {
    root: Node,
    /// Total SSE reduction credited to each feature
    importance: Vec<f64>,
}

struct TreeBuilder<'a> {
    features: &'a [Vec<f64>],
    targets: &'a [f64],
    max_depth: usize,
    min_samples_split: usize,
    features_per_node: usize,
    importance: Vec<f64>,
    rng: StdRng,
}

impl TreeBuilder<'_> {
    fn build(&mut self, indices: &mut [usize], depth: usize) -> Node {
        let n = indices.len() as f64;
        let (sum, sum_sq) = indices.iter().fold((0.0, 0.0), |(s, q), &i| {
            let y = self.targets[i];
            (s + y, q + y * y)
        });
        let mean = sum / n;
        let parent = sse(sum, sum_sq, n);

        // Pure node: the spread is rounding noise relative to the targets' scale
        if depth >= self.max_depth
            || indices.len() < self.min_samples_split
            || parent <= PURE_NODE_TOLERANCE * sum_sq
        {
            return Node::Leaf(mean);
        }

        let Some(best) = self.best_split(indices, parent) else {
            return Node::Leaf(mean);
        };
        self.importance[best.feature] += best.gain;

        let (mut left, mut right): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| self.features[i][best.feature] <= best.threshold);

        Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left: Box::new(self.build(&mut left, depth + 1)),
            right: Box::new(self.build(&mut right, depth + 1)),
        }
    }

    /// Best midpoint split over a random feature subset, by a sorted sweep
    fn best_split(&mut self, indices: &mut [usize], parent: f64) -> Option<SplitCandidate> {
        let n_features = self.features[0].len();
        let mut candidates: Vec<usize> = (0..n_features).collect();
        candidates.shuffle(&mut self.rng);
        candidates.truncate(self.features_per_node);

        let total = indices.len();
        let mut best: Option<SplitCandidate> = None;

        for feature in candidates {
            indices.sort_by(|&a, &b| self.features[a][feature].total_cmp(&self.features[b][feature]));

            let (total_sum, total_sq) = indices.iter().fold((0.0, 0.0), |(s, q), &i| {
                let y = self.targets[i];
                (s + y, q + y * y)
            });
            let (mut left_sum, mut left_sq) = (0.0, 0.0);

            for pos in 0..total - 1 {
                let y = self.targets[indices[pos]];
                left_sum += y;
                left_sq += y * y;

                let here = self.features[indices[pos]][feature];
                let next = self.features[indices[pos + 1]][feature];
                if here == next {
                    continue;
                }

                let n_left = (pos + 1) as f64;
                let n_right = (total - pos - 1) as f64;
                let children = sse(left_sum, left_sq, n_left)
                    + sse(total_sum - left_sum, total_sq - left_sq, n_right);
                let gain = parent - children;

                if gain > best.as_ref().map_or(0.0, |b| b.gain) {
                    best = Some(SplitCandidate {
                        feature,
                        threshold: (here + next) / 2.0,
                        gain,
                    });
                }
            }
        }

        best
    }
}

impl DecisionTree {
    fn fit(features: &[Vec<f64>], targets: &[f64], params: &ForestParams, seed: u64) -> Self {
        let n_features = features[0].len();
        let mut rng = StdRng::seed_from_u64(seed);
        let n = targets.len();
        let mut sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();

        let mut builder = TreeBuilder {
            features,
            targets,
            max_depth: params.max_depth,
            min_samples_split: params.min_samples_split,
            features_per_node: params.features_per_node(n_features),
            importance: vec![0.0; n_features],
            rng,
        };
        let root = builder.build(&mut sample, 0);
        Self {
            root,
            importance: builder.importance,
        }
    }

    fn predict_one(&self, row: &[f64]) -> f64 {
        let mut node = &self.root;
        loop {
            match node {
                Node::Leaf(value) => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold { left } else { right };
                }
            }
        }
    }
}

/// Trained random forest
#[derive(Debug, Clone)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    n_features: usize,
    feature_importance: Vec<f64>,
}

fn validate_training_set(features: &[Vec<f64>], targets: &[f64]) -> Result<usize> {
    let width = ensure_rectangular(features, "features")?;
    if features.len() != targets.len() {
        return Err(ForecastError::InvalidArgument(format!(
            "{} feature rows but {} targets",
            features.len(),
            targets.len()
        )));
    }
    if targets.len() < 2 {
        return Err(ForecastError::InvalidArgument(
            "Random forest needs at least 2 observations".to_string(),
        ));
    }
    ensure_finite(targets, "targets")?;
    Ok(width)
}

impl RandomForest {
    /// Grow `params.n_estimators` trees in parallel
    ///
    /// Tree `i` is seeded with `seed + i`, so results do not depend on thread
    /// scheduling. A `None` seed draws one at random.
    pub fn fit(features: &[Vec<f64>], targets: &[f64], params: &ForestParams) -> Result<Self> {
        params.validate()?;
        let n_features = validate_training_set(features, targets)?;
        let seed = params.seed.unwrap_or_else(rand::random);

        debug!(
            n_estimators = params.n_estimators,
            rows = targets.len(),
            n_features,
            seed,
            "growing random forest"
        );

        let trees: Vec<DecisionTree> = (0..params.n_estimators)
            .into_par_iter()
            .map(|i| DecisionTree::fit(features, targets, params, seed.wrapping_add(i as u64)))
            .collect();

        let mut feature_importance = vec![0.0; n_features];
        for tree in &trees {
            let total: f64 = tree.importance.iter().sum();
            if total > 0.0 {
                for (acc, imp) in feature_importance.iter_mut().zip(&tree.importance) {
                    *acc += imp / total;
                }
            }
        }
        let total: f64 = feature_importance.iter().sum();
        if total > 0.0 {
            feature_importance.iter_mut().for_each(|v| *v /= total);
        } else {
            // No tree ever split
            feature_importance = vec![1.0 / n_features as f64; n_features];
        }

        Ok(Self {
            trees,
            n_features,
            feature_importance,
        })
    }

    /// Mean prediction over all trees
    pub fn predict_one(&self, row: &[f64]) -> Result<f64> {
        if row.len() != self.n_features {
            return Err(ForecastError::InvalidArgument(format!(
                "Row has {} features, forest was trained on {}",
                row.len(),
                self.n_features
            )));
        }
        let sum: f64 = self.trees.iter().map(|t| t.predict_one(row)).sum();
        Ok(sum / self.trees.len() as f64)
    }

    pub fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>> {
        rows.par_iter().map(|row| self.predict_one(row)).collect()
    }

    /// Normalized SSE reduction per feature; non-negative, sums to one
    pub fn feature_importance(&self) -> &[f64] {
        &self.feature_importance
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

/// Forest trained on an explicit feature matrix, scored in-sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestResult {
    pub feature_importance: Vec<f64>,
    /// Accuracy of `predictions` against the training targets
    pub performance: AccuracyMetrics,
    pub predictions: Vec<f64>,
    pub n_estimators: usize,
    pub max_depth: usize,
}

pub fn random_forest(
    features: &[Vec<f64>],
    targets: &[f64],
    params: &ForestParams,
) -> Result<RandomForestResult> {
    let forest = RandomForest::fit(features, targets, params)?;
    let predictions = forest.predict(features)?;
    let performance = calculate_forecast_accuracy(targets, &predictions)?;

    info!(
        n_estimators = params.n_estimators,
        rows = targets.len(),
        rmse = performance.rmse,
        "trained random forest"
    );

    Ok(RandomForestResult {
        feature_importance: forest.feature_importance.clone(),
        performance,
        predictions,
        n_estimators: forest.n_trees(),
        max_depth: params.max_depth,
    })
}

/// Random forest on the previous `lags` values of a series
#[derive(Debug, Clone)]
pub struct LaggedForest {
    params: ForestParams,
    lags: usize,
}

#[derive(Debug, Clone)]
pub struct FittedLaggedForest {
    params: ForestParams,
    lags: usize,
    forest: RandomForest,
    /// In-sample residual standard deviation
    sigma: f64,
    history: Vec<f64>,
    actual: Vec<f64>,
    fitted: Vec<f64>,
}

impl LaggedForest {
    pub fn new(params: ForestParams, lags: usize) -> Result<Self> {
        params.validate()?;
        if lags == 0 {
            return Err(ForecastError::InvalidArgument(
                "Lagged forest needs at least one lag".to_string(),
            ));
        }
        Ok(Self { params, lags })
    }
}

impl Forecaster for LaggedForest {
    type Fitted = FittedLaggedForest;

    fn fit(&self, series: &[f64]) -> Result<FittedLaggedForest> {
        ensure_min_len(series, self.lags + 2, "series")?;
        let (rows, targets) = lag_matrix(series, self.lags);
        let forest = RandomForest::fit(&rows, &targets, &self.params)?;
        let fitted = forest.predict(&rows)?;

        let residuals: Vec<f64> = targets.iter().zip(&fitted).map(|(a, f)| a - f).collect();
        let sigma = stats::std_dev(&residuals);

        info!(
            lags = self.lags,
            n_estimators = self.params.n_estimators,
            n = series.len(),
            sigma,
            "fitted lagged random forest"
        );

        Ok(FittedLaggedForest {
            params: self.params.clone(),
            lags: self.lags,
            forest,
            sigma,
            history: series.to_vec(),
            actual: targets,
            fitted,
        })
    }
}

impl FittedLaggedForest {
    pub fn feature_importance(&self) -> &[f64] {
        self.forest.feature_importance()
    }
}

impl FittedModel for FittedLaggedForest {
    fn name(&self) -> String {
        format!(
            "Random Forest (trees={}, depth={}, lags={})",
            self.params.n_estimators, self.params.max_depth, self.lags
        )
    }

    fn parameters(&self) -> BTreeMap<String, f64> {
        let mut params = BTreeMap::new();
        params.insert("n_estimators".to_string(), self.params.n_estimators as f64);
        params.insert("max_depth".to_string(), self.params.max_depth as f64);
        params.insert("sigma".to_string(), self.sigma);
        for (j, imp) in self.forest.feature_importance().iter().enumerate() {
            params.insert(format!("importance_lag{}", j + 1), *imp);
        }
        params
    }

    fn actual(&self) -> &[f64] {
        &self.actual
    }

    fn fitted(&self) -> &[f64] {
        &self.fitted
    }

    fn forecast(&self, horizon: usize) -> Result<Vec<ForecastPoint>> {
        let mut history = self.history.clone();
        (1..=horizon)
            .map(|h| {
                let value = self.forest.predict_one(&latest_lags(&history, self.lags))?;
                history.push(value);
                Ok(ForecastPoint::with_standard_error(
                    value,
                    self.sigma * (h as f64).sqrt(),
                ))
            })
            .collect()
    }
}
