// src/classifier/forest.rs
//! Class-balanced random forest
//!
//! Trees are grown on bootstrap samples with weighted Gini impurity, trying
//! `sqrt(n_features)` randomly ordered non-constant features per node.
//! Leaves keep the weighted class distribution and the forest averages
//! those distributions before taking the arg-max.

use ndarray::ArrayView2;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::trace;

use super::{Classifier, ClassifierError};
use crate::config::constants::evaluation::MIN_SAMPLES_SPLIT;

const IMPURITY_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        distribution: Vec<f64>,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Growth limits shared by all trees of a forest
#[derive(Debug, Clone)]
pub struct TreeParams {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    /// Features tried per node; `None` means `sqrt(n_features)`
    pub max_features: Option<usize>,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: MIN_SAMPLES_SPLIT,
            max_features: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Split {
    feature: usize,
    threshold: f64,
    /// Weighted impurity of both children, lower is better
    score: f64,
}

fn gini(counts: &[f64], total: f64) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }
    1.0 - counts.iter().map(|c| (c / total).powi(2)).sum::<f64>()
}

/// Single classification tree stored as a flat node arena
#[derive(Debug, Clone)]
pub struct DecisionTree {
    nodes: Vec<Node>,
    n_classes: usize,
}

impl DecisionTree {
    /// Grow a tree on `samples` (row indices into `x`, repeats allowed)
    pub fn grow<R: Rng>(
        x: ArrayView2<'_, f64>,
        y: &[usize],
        sample_weight: &[f64],
        samples: Vec<usize>,
        n_classes: usize,
        params: &TreeParams,
        rng: &mut R,
    ) -> Self {
        let n_features = x.ncols();
        let mtry = params
            .max_features
            .unwrap_or_else(|| (n_features as f64).sqrt() as usize)
            .clamp(1, n_features.max(1));

        let mut nodes = vec![Node::Leaf { distribution: Vec::new() }];
        let mut stack = vec![(0usize, samples, 0usize)];

        while let Some((node_id, samples, depth)) = stack.pop() {
            let mut counts = vec![0.0; n_classes];
            for &i in &samples {
                counts[y[i]] += sample_weight[i];
            }
            let total: f64 = counts.iter().sum();

            let can_split = samples.len() >= params.min_samples_split
                && params.max_depth.map_or(true, |d| depth < d)
                && gini(&counts, total) > IMPURITY_EPSILON;

            let split = if can_split {
                best_split(x, y, sample_weight, &samples, &counts, mtry, rng)
            } else {
                None
            };

            match split {
                Some(split) => {
                    let (left_samples, right_samples): (Vec<usize>, Vec<usize>) = samples
                        .into_iter()
                        .partition(|&i| x[[i, split.feature]] <= split.threshold);

                    let left = nodes.len();
                    let right = left + 1;
                    nodes.push(Node::Leaf { distribution: Vec::new() });
                    nodes.push(Node::Leaf { distribution: Vec::new() });
                    nodes[node_id] = Node::Split {
                        feature: split.feature,
                        threshold: split.threshold,
                        left,
                        right,
                    };

                    stack.push((right, right_samples, depth + 1));
                    stack.push((left, left_samples, depth + 1));
                }
                None => {
                    let distribution = if total > 0.0 {
                        counts.iter().map(|c| c / total).collect()
                    } else {
                        vec![0.0; n_classes]
                    };
                    nodes[node_id] = Node::Leaf { distribution };
                }
            }
        }

        Self { nodes, n_classes }
    }

    /// Class distribution of the leaf a row falls into
    pub fn predict_row(&self, row: &[f64]) -> &[f64] {
        let mut node_id = 0;
        loop {
            match &self.nodes[node_id] {
                Node::Leaf { distribution } => return distribution,
                Node::Split { feature, threshold, left, right } => {
                    node_id = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }
}

fn best_split<R: Rng>(
    x: ArrayView2<'_, f64>,
    y: &[usize],
    sample_weight: &[f64],
    samples: &[usize],
    parent_counts: &[f64],
    mtry: usize,
    rng: &mut R,
) -> Option<Split> {
    let mut features: Vec<usize> = (0..x.ncols()).collect();
    features.shuffle(rng);

    let parent_total: f64 = parent_counts.iter().sum();
    let mut best: Option<Split> = None;
    let mut visited = 0;
    let mut sorted: Vec<(f64, usize)> = Vec::with_capacity(samples.len());

    for feature in features {
        if visited >= mtry && best.is_some() {
            break;
        }

        sorted.clear();
        sorted.extend(samples.iter().map(|&i| (x[[i, feature]], i)));
        sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

        let (Some(first), Some(last)) = (sorted.first(), sorted.last()) else {
            continue;
        };
        // Constant features do not count towards mtry
        if first.0 >= last.0 {
            continue;
        }
        visited += 1;

        let mut left = vec![0.0; parent_counts.len()];
        let mut right = parent_counts.to_vec();
        let mut left_total = 0.0;
        let mut right_total = parent_total;

        for k in 0..sorted.len() - 1 {
            let (value, i) = sorted[k];
            let w = sample_weight[i];
            left[y[i]] += w;
            right[y[i]] -= w;
            left_total += w;
            right_total -= w;

            let next = sorted[k + 1].0;
            if next <= value {
                continue;
            }

            let score = left_total * gini(&left, left_total) + right_total * gini(&right, right_total);
            if best.map_or(true, |b| score < b.score) {
                let mut threshold = value + (next - value) / 2.0;
                if threshold >= next {
                    threshold = value;
                }
                best = Some(Split { feature, threshold, score });
            }
        }
    }

    best
}

fn tree_seed(random_state: u64, tree: usize) -> u64 {
    random_state
        .wrapping_mul(0x9E37_79B9_7F4A_7C15)
        .wrapping_add(tree as u64)
}

/// Random forest with optional "balanced" class weighting
#[derive(Debug, Clone)]
pub struct RandomForestClassifier {
    n_estimators: usize,
    params: TreeParams,
    balanced: bool,
    bootstrap: bool,
    parallel: bool,
    random_state: u64,
    trees: Vec<DecisionTree>,
    n_classes: usize,
    n_features: Option<usize>,
}

impl RandomForestClassifier {
    pub fn new(n_estimators: usize) -> Self {
        Self {
            n_estimators,
            params: TreeParams::default(),
            balanced: true,
            bootstrap: true,
            parallel: true,
            random_state: 0,
            trees: Vec::new(),
            n_classes: 0,
            n_features: None,
        }
    }

    pub fn with_random_state(mut self, random_state: u64) -> Self {
        self.random_state = random_state;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.params.max_depth = Some(max_depth);
        self
    }

    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.params.min_samples_split = min_samples_split.max(2);
        self
    }

    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.params.max_features = Some(max_features);
        self
    }

    /// Weight classes inversely to their frequency
    pub fn with_balanced_class_weight(mut self, balanced: bool) -> Self {
        self.balanced = balanced;
        self
    }

    pub fn with_bootstrap(mut self, bootstrap: bool) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    /// Grow trees on the rayon pool
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// `n / (n_present_classes * count_c)` per class, zero for absent classes
    pub fn balanced_class_weights(y: &[usize], n_classes: usize) -> Vec<f64> {
        let mut counts = vec![0usize; n_classes];
        for &label in y {
            counts[label] += 1;
        }
        let present = counts.iter().filter(|&&c| c > 0).count();

        counts
            .iter()
            .map(|&c| {
                if c == 0 {
                    0.0
                } else {
                    y.len() as f64 / (present * c) as f64
                }
            })
            .collect()
    }

    /// Averaged leaf distributions, one row per sample
    pub fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Vec<Vec<f64>>, ClassifierError> {
        let expected = self.n_features.ok_or(ClassifierError::NotFitted)?;
        if x.ncols() != expected {
            return Err(ClassifierError::FeatureMismatch { expected, actual: x.ncols() });
        }

        let scale = 1.0 / self.trees.len() as f64;
        let mut row = vec![0.0; expected];

        let probabilities = x
            .rows()
            .into_iter()
            .map(|sample| {
                for (dst, src) in row.iter_mut().zip(sample.iter()) {
                    *dst = *src;
                }
                let mut proba = vec![0.0; self.n_classes];
                for tree in &self.trees {
                    for (p, q) in proba.iter_mut().zip(tree.predict_row(&row)) {
                        *p += q * scale;
                    }
                }
                proba
            })
            .collect();

        Ok(probabilities)
    }
}

impl Classifier for RandomForestClassifier {
    fn fit(&mut self, x: ArrayView2<'_, f64>, y: &[usize]) -> Result<(), ClassifierError> {
        let n_samples = x.nrows();
        if n_samples == 0 {
            return Err(ClassifierError::EmptyTrainingSet);
        }
        if y.len() != n_samples {
            return Err(ClassifierError::LabelMismatch { samples: n_samples, labels: y.len() });
        }
        if self.n_estimators == 0 {
            return Err(ClassifierError::InvalidParameter("n_estimators must be at least 1".to_string()));
        }

        let n_classes = y.iter().max().map_or(0, |&m| m + 1);
        let sample_weight: Vec<f64> = if self.balanced {
            let class_weight = Self::balanced_class_weights(y, n_classes);
            y.iter().map(|&label| class_weight[label]).collect()
        } else {
            vec![1.0; n_samples]
        };

        let grow_tree = |tree: usize| {
            let mut rng = StdRng::seed_from_u64(tree_seed(self.random_state, tree));
            let samples: Vec<usize> = if self.bootstrap {
                (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
            } else {
                (0..n_samples).collect()
            };
            DecisionTree::grow(x, y, &sample_weight, samples, n_classes, &self.params, &mut rng)
        };

        let trees: Vec<DecisionTree> = if self.parallel {
            (0..self.n_estimators).into_par_iter().map(grow_tree).collect()
        } else {
            (0..self.n_estimators).map(grow_tree).collect()
        };

        trace!(
            trees = trees.len(),
            nodes = trees.iter().map(DecisionTree::node_count).sum::<usize>(),
            "forest grown"
        );

        self.trees = trees;
        self.n_classes = n_classes;
        self.n_features = Some(x.ncols());
        Ok(())
    }

    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Vec<usize>, ClassifierError> {
        let proba = self.predict_proba(x)?;
        Ok(proba
            .iter()
            .map(|p| {
                // First maximum wins
                p.iter()
                    .enumerate()
                    .fold((0, f64::NEG_INFINITY), |(best, best_p), (c, &v)| {
                        if v > best_p { (c, v) } else { (best, best_p) }
                    })
                    .0
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    fn separable() -> (Array2<f64>, Vec<usize>) {
        let x = array![
            [0.1, 5.0],
            [0.4, 3.0],
            [0.7, 4.0],
            [2.2, 5.0],
            [2.5, 3.0],
            [2.9, 4.0],
        ];
        (x, vec![0, 0, 0, 1, 1, 1])
    }

    #[test]
    fn test_fits_separable_data() {
        let (x, y) = separable();
        let mut forest = RandomForestClassifier::new(10).with_random_state(3);
        forest.fit(x.view(), &y).unwrap();

        assert_eq!(forest.predict(x.view()).unwrap(), y);
        assert_eq!(forest.predict(array![[0.0, 4.0], [3.0, 4.0]].view()).unwrap(), vec![0, 1]);
    }

    #[test]
    fn test_parallel_and_sequential_agree() {
        let (x, y) = separable();
        let mut a = RandomForestClassifier::new(8).with_random_state(11).with_parallel(true);
        let mut b = RandomForestClassifier::new(8).with_random_state(11).with_parallel(false);
        a.fit(x.view(), &y).unwrap();
        b.fit(x.view(), &y).unwrap();

        let probe = array![[1.0, 4.0], [1.5, 3.0], [2.0, 5.0]];
        assert_eq!(a.predict_proba(probe.view()).unwrap(), b.predict_proba(probe.view()).unwrap());
    }

    #[test]
    fn test_balanced_weights() {
        let weights = RandomForestClassifier::balanced_class_weights(&[0, 0, 0, 2], 3);
        // 4 samples, 2 present classes
        assert_eq!(weights, vec![4.0 / 6.0, 0.0, 2.0]);
    }

    #[test]
    fn test_proba_rows_sum_to_one() {
        let (x, y) = separable();
        let mut forest = RandomForestClassifier::new(5).with_max_depth(1);
        forest.fit(x.view(), &y).unwrap();

        for row in forest.predict_proba(x.view()).unwrap() {
            assert!((row.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_errors() {
        let forest = RandomForestClassifier::new(3);
        assert_eq!(forest.predict(array![[1.0]].view()), Err(ClassifierError::NotFitted));

        let mut forest = RandomForestClassifier::new(3);
        let empty = Array2::<f64>::zeros((0, 2));
        assert_eq!(forest.fit(empty.view(), &[]), Err(ClassifierError::EmptyTrainingSet));

        let (x, y) = separable();
        forest.fit(x.view(), &y).unwrap();
        assert!(matches!(
            forest.predict(array![[1.0, 2.0, 3.0]].view()),
            Err(ClassifierError::FeatureMismatch { expected: 2, actual: 3 })
        ));
    }
}
