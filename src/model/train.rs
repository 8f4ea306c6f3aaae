//! Training pipeline: label → aggregate → derive → stratified split → grid search → holdout
//! evaluation → cross-validation report → bundle.

use super::metrics::{self, ClassificationReport};
use super::{Classifier, ForestParams, RandomForest, TrainedModel};
use crate::config::{ParamGrid, TrainingConfig};
use crate::data::{aggregate_hits, Hit, Session};
use crate::error::TrainError;
use crate::features::{CityStatistics, FeatureDeriver, FEATURE_NAMES};
use crate::labels::TargetActionSet;
use ndarray::{Array2, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use tracing::{debug, info};

/// Split indices into (train, test), keeping the class ratio in both parts.
pub fn stratified_split(y: &[u8], test_size: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let (mut train, mut test) = (Vec::new(), Vec::new());
    for class in [0u8, 1] {
        let mut idx: Vec<usize> = (0..y.len()).filter(|&i| y[i] == class).collect();
        idx.shuffle(&mut rng);
        let n_test = (idx.len() as f64 * test_size).round() as usize;
        test.extend_from_slice(&idx[..n_test.min(idx.len())]);
        train.extend_from_slice(&idx[n_test.min(idx.len())..]);
    }
    train.sort_unstable();
    test.sort_unstable();
    (train, test)
}

/// Stratified k-fold: returns the held-out indices of each fold.
pub fn stratified_folds(y: &[u8], k: usize, seed: u64) -> Vec<Vec<usize>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut folds = vec![Vec::new(); k];
    for class in [0u8, 1] {
        let mut idx: Vec<usize> = (0..y.len()).filter(|&i| y[i] == class).collect();
        idx.shuffle(&mut rng);
        for (j, i) in idx.into_iter().enumerate() {
            folds[j % k].push(i);
        }
    }
    for f in &mut folds {
        f.sort_unstable();
    }
    folds
}

fn complement(n: usize, held_out: &[usize]) -> Vec<usize> {
    let mut mask = vec![true; n];
    for &i in held_out {
        mask[i] = false;
    }
    (0..n).filter(|&i| mask[i]).collect()
}

fn take(x: ArrayView2<'_, f64>, y: &[u8], idx: &[usize]) -> (Array2<f64>, Vec<u8>) {
    (x.select(Axis(0), idx), idx.iter().map(|&i| y[i]).collect())
}

fn predict_all(model: &impl Classifier, x: ArrayView2<'_, f64>) -> (Vec<u8>, Vec<f64>) {
    x.outer_iter()
        .map(|row| {
            let r = row.to_vec();
            (model.predict(&r), model.predict_proba(&r))
        })
        .unzip()
}

struct FoldScores {
    roc_auc: Vec<f64>,
    precision: Vec<f64>,
    recall: Vec<f64>,
}

fn run_folds(
    x: ArrayView2<'_, f64>,
    y: &[u8],
    params: ForestParams,
    k: usize,
    seed: u64,
) -> Result<FoldScores, TrainError> {
    if k < 2 {
        return Err(TrainError::TooFewFolds(k));
    }
    let mut scores = FoldScores {
        roc_auc: Vec::with_capacity(k),
        precision: Vec::with_capacity(k),
        recall: Vec::with_capacity(k),
    };
    for held_out in stratified_folds(y, k, seed) {
        let (x_tr, y_tr) = take(x, y, &complement(y.len(), &held_out));
        let (x_te, y_te) = take(x, y, &held_out);
        let forest = RandomForest::fit(x_tr.view(), &y_tr, params, seed);
        let (pred, proba) = predict_all(&forest, x_te.view());
        let c = metrics::Confusion::from_labels(&y_te, &pred);
        if let Some(auc) = metrics::roc_auc(&y_te, &proba) {
            scores.roc_auc.push(auc);
        }
        scores.precision.push(metrics::precision(&c));
        scores.recall.push(metrics::recall(&c));
    }
    Ok(scores)
}

fn candidates(grid: &ParamGrid) -> Vec<ForestParams> {
    let mut out = Vec::new();
    for &n_estimators in &grid.n_estimators {
        for &max_depth in &grid.max_depth {
            for &min_samples_split in &grid.min_samples_split {
                for &min_samples_leaf in &grid.min_samples_leaf {
                    out.push(ForestParams {
                        n_estimators,
                        max_depth,
                        min_samples_split,
                        min_samples_leaf,
                    });
                }
            }
        }
    }
    out
}

/// Pick the grid point with the best mean k-fold ROC-AUC. Earlier candidates win ties.
pub fn grid_search(
    x: ArrayView2<'_, f64>,
    y: &[u8],
    grid: &ParamGrid,
    k: usize,
    seed: u64,
) -> Result<(ForestParams, f64), TrainError> {
    let mut best: Option<(ForestParams, f64)> = None;
    for params in candidates(grid) {
        let scores = run_folds(x, y, params, k, seed)?;
        let (auc, _) = metrics::mean_std(&scores.roc_auc);
        debug!(?params, roc_auc = auc, "grid candidate");
        if best.map_or(true, |(_, b)| auc > b) {
            best = Some((params, auc));
        }
    }
    best.ok_or(TrainError::EmptyGrid)
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CvReport {
    pub folds: usize,
    pub roc_auc_mean: f64,
    pub roc_auc_std: f64,
    pub precision_mean: f64,
    pub precision_std: f64,
    pub recall_mean: f64,
    pub recall_std: f64,
}

pub fn cross_validate(
    x: ArrayView2<'_, f64>,
    y: &[u8],
    params: ForestParams,
    k: usize,
    seed: u64,
) -> Result<CvReport, TrainError> {
    let s = run_folds(x, y, params, k, seed)?;
    let (roc_auc_mean, roc_auc_std) = metrics::mean_std(&s.roc_auc);
    let (precision_mean, precision_std) = metrics::mean_std(&s.precision);
    let (recall_mean, recall_std) = metrics::mean_std(&s.recall);
    Ok(CvReport {
        folds: k,
        roc_auc_mean,
        roc_auc_std,
        precision_mean,
        precision_std,
        recall_mean,
        recall_std,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    pub sessions: usize,
    pub skipped_sessions: usize,
    pub conversion_rate: f64,
    pub train_rows: usize,
    pub test_rows: usize,
    pub best_params: ForestParams,
    pub search_roc_auc: f64,
    pub holdout: ClassificationReport,
    pub cross_validation: Option<CvReport>,
    /// (feature, importance), most important first
    pub importances: Vec<(String, f64)>,
}

pub struct TrainingOutcome {
    pub model: TrainedModel,
    pub report: TrainingReport,
}

pub struct Trainer {
    config: TrainingConfig,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn run(&self, sessions: &[Session], hits: &[Hit]) -> Result<TrainingOutcome, TrainError> {
        let cfg = &self.config;
        info!(sessions = sessions.len(), hits = hits.len(), "training started");

        let target_actions = TargetActionSet::from_hits(hits);
        let target_hits = hits
            .iter()
            .filter_map(|h| h.event_action.as_deref())
            .filter(|a| target_actions.contains(a))
            .count();
        info!(
            target_actions = target_actions.len(),
            examples = ?&target_actions.actions()[..target_actions.len().min(5)],
            target_hits,
            target_hit_share = target_hits as f64 / hits.len().max(1) as f64,
            "target actions defined"
        );

        let aggregates = aggregate_hits(hits);
        let cities = CityStatistics::from_sessions(sessions, &aggregates);
        let dataset = FeatureDeriver::new(&cities).build_dataset(sessions, &aggregates);
        let (x, y) = (dataset.x, dataset.y);
        if y.is_empty() {
            return Err(TrainError::EmptyDataset);
        }
        let positives = y.iter().filter(|&&v| v == 1).count();
        if positives == 0 || positives == y.len() {
            return Err(TrainError::SingleClass(y[0]));
        }
        let conversion_rate = positives as f64 / y.len() as f64;
        info!(
            rows = y.len(),
            features = x.ncols(),
            cities = cities.len(),
            conversion_rate,
            "features prepared"
        );

        let (train_idx, test_idx) = stratified_split(&y, cfg.test_size, cfg.seed);
        let (x_train, y_train) = take(x.view(), &y, &train_idx);
        let (x_test, y_test) = take(x.view(), &y, &test_idx);

        let (best_params, search_roc_auc) =
            grid_search(x_train.view(), &y_train, &cfg.grid, cfg.search_folds, cfg.seed)?;
        info!(?best_params, roc_auc = search_roc_auc, "grid search finished");

        let forest = RandomForest::fit(x_train.view(), &y_train, best_params, cfg.seed);
        let (pred, proba) = predict_all(&forest, x_test.view());
        let holdout = ClassificationReport::evaluate(&y_test, &pred, &proba);
        info!(
            roc_auc = ?holdout.roc_auc,
            precision = holdout.precision,
            recall = holdout.recall,
            f1 = holdout.f1_score,
            accuracy = holdout.accuracy,
            specificity = holdout.specificity,
            balanced_accuracy = holdout.balanced_accuracy,
            kappa = holdout.kappa,
            mcc = holdout.mcc,
            avg_precision = ?holdout.avg_precision,
            brier = holdout.brier_score,
            "holdout evaluation"
        );

        let mut importances: Vec<(String, f64)> = FEATURE_NAMES
            .iter()
            .zip(forest.feature_importances())
            .map(|(n, &v)| (n.to_string(), v))
            .collect();
        importances.sort_by(|a, b| b.1.total_cmp(&a.1));
        for (name, value) in importances.iter().take(20) {
            debug!(feature = %name, importance = value, "feature importance");
        }

        let cross_validation = if cfg.report_folds >= 2 {
            let cv = cross_validate(x.view(), &y, best_params, cfg.report_folds, cfg.seed)?;
            info!(
                folds = cv.folds,
                roc_auc = cv.roc_auc_mean,
                roc_auc_ci = cv.roc_auc_std * 2.0,
                precision = cv.precision_mean,
                recall = cv.recall_mean,
                "cross-validation"
            );
            Some(cv)
        } else {
            None
        };

        let model = TrainedModel::new(
            forest,
            FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            target_actions,
            cities,
        );
        let report = TrainingReport {
            sessions: sessions.len(),
            skipped_sessions: dataset.skipped,
            conversion_rate,
            train_rows: train_idx.len(),
            test_rows: test_idx.len(),
            best_params,
            search_roc_auc,
            holdout,
            cross_validation,
            importances,
        };
        Ok(TrainingOutcome { model, report })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_keeps_class_ratio() {
        let y: Vec<u8> = (0..100).map(|i| u8::from(i % 10 == 0)).collect();
        let (train, test) = stratified_split(&y, 0.2, 42);
        assert_eq!(train.len() + test.len(), 100);
        assert_eq!(test.len(), 20);
        assert_eq!(test.iter().filter(|&&i| y[i] == 1).count(), 2);
        assert!(train.iter().all(|i| !test.contains(i)));
    }

    #[test]
    fn folds_partition_indices() {
        let y: Vec<u8> = (0..30).map(|i| u8::from(i < 6)).collect();
        let folds = stratified_folds(&y, 3, 1);
        let mut all: Vec<usize> = folds.iter().flatten().copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..30).collect::<Vec<_>>());
        for f in &folds {
            assert_eq!(f.iter().filter(|&&i| y[i] == 1).count(), 2);
        }
    }

    #[test]
    fn grid_expands_cartesian_product() {
        let grid = ParamGrid::default();
        assert_eq!(candidates(&grid).len(), 4);
        let empty = ParamGrid {
            n_estimators: vec![],
            ..ParamGrid::default()
        };
        assert!(candidates(&empty).is_empty());
    }
}
