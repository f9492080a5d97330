// src/evaluation/mod.rs
//! Accuracy of a feature subset
//!
//! A fresh classifier is trained on the training split restricted to the
//! subset's columns and scored with micro-averaged F1. Two protocols are
//! supported:
//!
//! * holdout: `num_trials` seeded classifiers scored on the validation
//!   split, test F1 taken from the last one;
//! * subject-held-out cross-validation: all three splits are pooled, the
//!   subject of the first row is set aside as the test set and the rest is
//!   scored with unshuffled k-fold.
//!
//! The empty subset never trains anything; it maps to the configured
//! random-guess accuracy.

use std::collections::BTreeSet;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};
use ndarray::{Array2, Axis};
use serde::Serialize;
use tracing::{debug, info};

use crate::classifier::{f1_score, Average, Classifier, RandomForestClassifier};
use crate::config::{EvaluationConfig, ScoringConfig};
use crate::dataset::{Dataset, SplitData};
use crate::error::{EvaluationStage, SelectionErrorBuilder, SelectionResult};
use crate::selection::FeatureSubset;

/// Validation and test F1 of one subset
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EvaluationResult {
    pub validation: f64,
    pub test: f64,
}

impl EvaluationResult {
    pub fn new(validation: f64, test: f64) -> Self {
        Self { validation, test }
    }
}

/// Anything that can put an accuracy on a feature subset
pub trait Evaluator: Send + Sync {
    fn eval_accuracy(&self, subset: &FeatureSubset) -> SelectionResult<EvaluationResult>;
}

/// Classifier factory used by the forest-backed evaluator
pub type ForestFactory = Box<dyn Fn(u64) -> RandomForestClassifier + Send + Sync>;

/// Evaluator backed by the class-balanced random forest
pub type ForestEvaluator<'a> = ModelEvaluator<'a, RandomForestClassifier, ForestFactory>;

/// Labels mapped onto dense class indexes
#[derive(Debug, Clone)]
struct EncodedSplit {
    data: SplitData,
    y: Vec<usize>,
}

impl EncodedSplit {
    fn new(data: SplitData, classes: &[u32]) -> Self {
        let y = data
            .labels
            .iter()
            .map(|label| classes.binary_search(label).unwrap_or(0))
            .collect();
        Self { data, y }
    }
}

#[derive(Debug, Clone)]
enum Protocol {
    Holdout {
        trials: usize,
        train: EncodedSplit,
        validation: EncodedSplit,
        test: EncodedSplit,
    },
    CrossValidation {
        folds: usize,
        held_out_subject: u32,
        pool: EncodedSplit,
        held_out: EncodedSplit,
    },
}

/// Classifier-backed evaluator over one dataset
pub struct ModelEvaluator<'a, C, F> {
    dataset: &'a Dataset,
    protocol: Protocol,
    random_accuracy: f64,
    factory: F,
    trainings: AtomicUsize,
    _classifier: PhantomData<fn() -> C>,
}

impl<'a> ModelEvaluator<'a, RandomForestClassifier, ForestFactory> {
    /// Evaluator training `num_trees`-tree class-balanced forests
    pub fn random_forest(
        dataset: &'a Dataset,
        evaluation: &EvaluationConfig,
        scoring: &ScoringConfig,
    ) -> SelectionResult<Self> {
        let num_trees = evaluation.num_trees;
        let min_samples_split = evaluation.min_samples_split;
        let parallel = evaluation.parallel_trees;

        let factory: ForestFactory = Box::new(move |seed| {
            RandomForestClassifier::new(num_trees)
                .with_random_state(seed)
                .with_min_samples_split(min_samples_split)
                .with_balanced_class_weight(true)
                .with_parallel(parallel)
        });

        Self::new(dataset, evaluation, scoring, factory)
    }
}

impl<'a, C, F> ModelEvaluator<'a, C, F>
where
    C: Classifier,
    F: Fn(u64) -> C + Send + Sync,
{
    pub fn new(
        dataset: &'a Dataset,
        evaluation: &EvaluationConfig,
        scoring: &ScoringConfig,
        factory: F,
    ) -> SelectionResult<Self> {
        let classes: Vec<u32> = dataset
            .splits()
            .iter()
            .flat_map(|(_, split)| split.labels.iter().copied())
            .collect::<BTreeSet<u32>>()
            .into_iter()
            .collect();

        let protocol = if evaluation.use_cross_validation {
            Self::cross_validation_protocol(dataset, evaluation.num_folds, &classes)?
        } else {
            if evaluation.num_trials == 0 {
                return Err(SelectionErrorBuilder::new("evaluator", "new")
                    .configuration("at least one evaluation trial is required"));
            }
            Protocol::Holdout {
                trials: evaluation.num_trials,
                train: EncodedSplit::new(dataset.train.clone(), &classes),
                validation: EncodedSplit::new(dataset.validation.clone(), &classes),
                test: EncodedSplit::new(dataset.test.clone(), &classes),
            }
        };

        Ok(Self {
            dataset,
            protocol,
            random_accuracy: scoring.random_accuracy,
            factory,
            trainings: AtomicUsize::new(0),
            _classifier: PhantomData,
        })
    }

    fn cross_validation_protocol(
        dataset: &Dataset,
        folds: usize,
        classes: &[u32],
    ) -> SelectionResult<Protocol> {
        let all = SplitData::concat(&[&dataset.train, &dataset.validation, &dataset.test])
            .map_err(|reason| {
                SelectionErrorBuilder::new("evaluator", "cross_validation")
                    .evaluation(EvaluationStage::CrossValidation, &reason)
            })?;

        let Some(&held_out_subject) = all.subjects.first() else {
            return Err(SelectionErrorBuilder::new("evaluator", "cross_validation")
                .evaluation(EvaluationStage::CrossValidation, "dataset has no rows"));
        };

        let (held_out, pool) = all.partition_by_subject(|subject| subject == held_out_subject);
        if pool.n_rows() < folds {
            return Err(SelectionErrorBuilder::new("evaluator", "cross_validation")
                .with_info("rows", pool.n_rows())
                .with_info("folds", folds)
                .evaluation(
                    EvaluationStage::CrossValidation,
                    &format!("{} rows cannot be split into {} folds", pool.n_rows(), folds),
                ));
        }

        info!(
            subject = held_out_subject,
            held_out_rows = held_out.n_rows(),
            pool_rows = pool.n_rows(),
            folds,
            "subject left out for cross-validation"
        );

        Ok(Protocol::CrossValidation {
            folds,
            held_out_subject,
            pool: EncodedSplit::new(pool, classes),
            held_out: EncodedSplit::new(held_out, classes),
        })
    }

    /// Number of classifier fits performed so far
    pub fn trainings(&self) -> usize {
        self.trainings.load(Ordering::Relaxed)
    }

    /// Subject used as the pseudo-test set in cross-validation mode
    pub fn held_out_subject(&self) -> Option<u32> {
        match &self.protocol {
            Protocol::CrossValidation { held_out_subject, .. } => Some(*held_out_subject),
            Protocol::Holdout { .. } => None,
        }
    }

    fn fit(&self, seed: u64, x: &Array2<f64>, y: &[usize]) -> SelectionResult<C> {
        let mut classifier = (self.factory)(seed);
        classifier.fit(x.view(), y)?;
        self.trainings.fetch_add(1, Ordering::Relaxed);
        Ok(classifier)
    }

    fn f1(classifier: &C, x: &Array2<f64>, y: &[usize]) -> SelectionResult<f64> {
        let prediction = classifier.predict(x.view())?;
        Ok(f1_score(y, &prediction, Average::Micro)?)
    }

    fn holdout(
        &self,
        columns: &[usize],
        trials: usize,
        train: &EncodedSplit,
        validation: &EncodedSplit,
        test: &EncodedSplit,
    ) -> SelectionResult<EvaluationResult> {
        let x_train = train.data.select_columns(columns);
        let x_validation = validation.data.select_columns(columns);

        let mut validation_sum = 0.0;
        let mut last = None;
        for trial in 0..trials {
            let classifier = self.fit(trial as u64, &x_train, &train.y)?;
            validation_sum += Self::f1(&classifier, &x_validation, &validation.y)?;
            last = Some(classifier);
        }

        let classifier = last.ok_or_else(|| {
            SelectionErrorBuilder::new("evaluator", "holdout")
                .evaluation(EvaluationStage::Training, "no trial was run")
        })?;
        let test_score = Self::f1(&classifier, &test.data.select_columns(columns), &test.y)?;

        Ok(EvaluationResult::new(validation_sum / trials as f64, test_score))
    }

    fn cross_validate(
        &self,
        columns: &[usize],
        folds: usize,
        pool: &EncodedSplit,
        held_out: &EncodedSplit,
    ) -> SelectionResult<EvaluationResult> {
        let x = pool.data.select_columns(columns);
        let x_held_out = held_out.data.select_columns(columns);

        let mut validation_sum = 0.0;
        let mut test_sum = 0.0;
        for (fit_rows, score_rows) in kfold_indices(x.nrows(), folds) {
            let x_fit = x.select(Axis(0), &fit_rows);
            let y_fit: Vec<usize> = fit_rows.iter().map(|&i| pool.y[i]).collect();
            let x_score = x.select(Axis(0), &score_rows);
            let y_score: Vec<usize> = score_rows.iter().map(|&i| pool.y[i]).collect();

            // One seed for every fold
            let classifier = self.fit(0, &x_fit, &y_fit)?;
            validation_sum += Self::f1(&classifier, &x_score, &y_score)?;
            test_sum += Self::f1(&classifier, &x_held_out, &held_out.y)?;
        }

        Ok(EvaluationResult::new(
            validation_sum / folds as f64,
            test_sum / folds as f64,
        ))
    }

    /// Forests trained on every column of the training split with seeds
    /// `0..trials`, scored on validation and test
    pub fn evaluate_baseline(&self, trials: usize) -> SelectionResult<BaselineReport> {
        let classes: Vec<u32> = self
            .dataset
            .splits()
            .iter()
            .flat_map(|(_, split)| split.labels.iter().copied())
            .collect::<BTreeSet<u32>>()
            .into_iter()
            .collect();
        let train = EncodedSplit::new(self.dataset.train.clone(), &classes);
        let validation = EncodedSplit::new(self.dataset.validation.clone(), &classes);
        let test = EncodedSplit::new(self.dataset.test.clone(), &classes);

        let mut validation_scores = Vec::with_capacity(trials);
        let mut test_scores = Vec::with_capacity(trials);
        for seed in 0..trials {
            let classifier = self.fit(seed as u64, &train.data.features, &train.y)?;
            validation_scores.push(Self::f1(&classifier, &validation.data.features, &validation.y)?);
            test_scores.push(Self::f1(&classifier, &test.data.features, &test.y)?);
        }

        Ok(BaselineReport::new(validation_scores, test_scores))
    }
}

impl<'a, C, F> Evaluator for ModelEvaluator<'a, C, F>
where
    C: Classifier,
    F: Fn(u64) -> C + Send + Sync,
{
    fn eval_accuracy(&self, subset: &FeatureSubset) -> SelectionResult<EvaluationResult> {
        if subset.is_empty() {
            return Ok(EvaluationResult::new(self.random_accuracy, self.random_accuracy));
        }

        let columns = self.dataset.catalog.columns_for(subset.indexes());
        if columns.is_empty() {
            return Err(SelectionErrorBuilder::new("evaluator", "eval_accuracy").evaluation(
                EvaluationStage::ColumnSelection,
                &format!("subset {} selects no columns", subset),
            ));
        }

        let result = match &self.protocol {
            Protocol::Holdout { trials, train, validation, test } => {
                self.holdout(&columns, *trials, train, validation, test)?
            }
            Protocol::CrossValidation { folds, pool, held_out, .. } => {
                self.cross_validate(&columns, *folds, pool, held_out)?
            }
        };

        debug!(
            subset = %subset,
            columns = columns.len(),
            validation = result.validation,
            test = result.test,
            "subset evaluated"
        );
        Ok(result)
    }
}

/// Unshuffled k-fold: consecutive folds, the first `n % k` one row larger
pub fn kfold_indices(n: usize, k: usize) -> Vec<(Vec<usize>, Vec<usize>)> {
    let k = k.max(1);
    let mut folds = Vec::with_capacity(k);
    let mut start = 0;
    for fold in 0..k {
        let size = n / k + usize::from(fold < n % k);
        let end = start + size;
        let fit: Vec<usize> = (0..start).chain(end..n).collect();
        folds.push((fit, (start..end).collect()));
        start = end;
    }
    folds
}

/// All-features accuracy over several seeds
#[derive(Debug, Clone, Serialize)]
pub struct BaselineReport {
    pub validation_mean: f64,
    pub test_mean: f64,
    pub validation_scores: Vec<f64>,
    pub test_scores: Vec<f64>,
}

impl BaselineReport {
    pub fn new(validation_scores: Vec<f64>, test_scores: Vec<f64>) -> Self {
        let mean = |scores: &[f64]| {
            if scores.is_empty() {
                0.0
            } else {
                scores.iter().sum::<f64>() / scores.len() as f64
            }
        };
        Self {
            validation_mean: mean(&validation_scores),
            test_mean: mean(&test_scores),
            validation_scores,
            test_scores,
        }
    }
}

impl fmt::Display for BaselineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let list = |scores: &[f64]| {
            scores
                .iter()
                .map(|s| format!("{:.4}", s))
                .collect::<Vec<_>>()
                .join(", ")
        };
        writeln!(f, "validation: {:.4} [{}]", self.validation_mean, list(&self.validation_scores))?;
        write!(f, "test      : {:.4} [{}]", self.test_mean, list(&self.test_scores))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{FeatureCatalog, GroupingMode};
    use ndarray::array;

    fn dataset() -> Dataset {
        let catalog = FeatureCatalog::from_names(
            ["tSignal-mean()-X", "tNoise-mean()-X"],
            GroupingMode::Group,
            &[],
        );
        let split = |x: Array2<f64>, y: Vec<u32>, s: Vec<u32>| SplitData::new(x, y, s).unwrap();

        let train = split(
            array![[0.1, 0.5], [0.2, 0.1], [0.3, 0.9], [2.1, 0.4], [2.2, 0.8], [2.3, 0.2]],
            vec![1, 1, 1, 2, 2, 2],
            vec![1, 1, 2, 2, 3, 3],
        );
        let validation = split(array![[0.15, 0.3], [2.15, 0.3]], vec![1, 2], vec![4, 4]);
        let test = split(array![[0.25, 0.6], [2.25, 0.6]], vec![1, 2], vec![5, 5]);

        Dataset::new("synthetic", catalog, train, validation, test).unwrap()
    }

    fn small_config() -> EvaluationConfig {
        EvaluationConfig {
            num_trees: 5,
            parallel_trees: false,
            ..EvaluationConfig::default()
        }
    }

    #[test]
    fn test_empty_subset_skips_training() {
        let data = dataset();
        let evaluator =
            ModelEvaluator::random_forest(&data, &small_config(), &ScoringConfig::default()).unwrap();

        let result = evaluator.eval_accuracy(&FeatureSubset::empty()).unwrap();
        assert_eq!(result, EvaluationResult::new(0.4, 0.4));
        assert_eq!(evaluator.trainings(), 0);
    }

    #[test]
    fn test_separating_group_scores_perfectly() {
        let data = dataset();
        let evaluator =
            ModelEvaluator::random_forest(&data, &small_config(), &ScoringConfig::default()).unwrap();

        let subset = FeatureSubset::new([0], 2).unwrap();
        let result = evaluator.eval_accuracy(&subset).unwrap();
        assert_eq!(result, EvaluationResult::new(1.0, 1.0));
        assert_eq!(evaluator.trainings(), 1);
    }

    #[test]
    fn test_cross_validation_holds_out_first_subject() {
        let data = dataset();
        let config = EvaluationConfig {
            use_cross_validation: true,
            num_folds: 2,
            ..small_config()
        };
        let evaluator =
            ModelEvaluator::random_forest(&data, &config, &ScoringConfig::default()).unwrap();
        assert_eq!(evaluator.held_out_subject(), Some(1));

        let result = evaluator.eval_accuracy(&FeatureSubset::new([0], 2).unwrap()).unwrap();
        assert!((0.0..=1.0).contains(&result.validation));
        assert!((0.0..=1.0).contains(&result.test));
        // One fit per fold
        assert_eq!(evaluator.trainings(), 2);
    }

    #[test]
    fn test_kfold_indices() {
        let folds = kfold_indices(7, 3);
        let sizes: Vec<usize> = folds.iter().map(|(_, score)| score.len()).collect();
        assert_eq!(sizes, vec![3, 2, 2]);
        assert_eq!(folds[1].1, vec![3, 4]);
        assert_eq!(folds[1].0, vec![0, 1, 2, 5, 6]);
    }

    #[test]
    fn test_baseline_report() {
        let data = dataset();
        let evaluator =
            ModelEvaluator::random_forest(&data, &small_config(), &ScoringConfig::default()).unwrap();

        let report = evaluator.evaluate_baseline(3).unwrap();
        assert_eq!(report.validation_scores.len(), 3);
        assert!(report.to_string().starts_with("validation: "));
    }
}
