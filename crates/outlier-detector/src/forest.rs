//! Seeded 1-D Isolation Forest

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

const EULER_MASCHERONI: f64 = 0.577_215_664_901_532_9;

/// Forest parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    /// Number of trees in the ensemble (default: 100)
    pub num_trees: usize,
    /// Sub-sample size per tree, capped at the batch size (default: 256)
    pub sample_size: usize,
    /// Expected fraction of outliers per batch (default: 0.05)
    pub contamination: f64,
    /// RNG seed; fixed so a given (seed, batch) pair always labels identically
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            num_trees: 100,
            sample_size: 256,
            contamination: 0.05,
            seed: 42,
        }
    }
}

enum Tree {
    Split {
        at: f64,
        left: Box<Tree>,
        right: Box<Tree>,
    },
    Leaf {
        size: usize,
    },
}

/// Ensemble of randomly split trees over seeded sub-samples.
///
/// Anomaly score is `2^(-E[h(x)] / c(n))`: short average isolation paths give
/// scores near 1, average points sit near 0.5.
pub struct IsolationForest {
    trees: Vec<Tree>,
    normalizer: f64,
}

impl IsolationForest {
    /// Fit a fresh forest on one batch of values.
    pub fn fit(config: &ForestConfig, values: &[f64]) -> Self {
        if values.is_empty() || config.num_trees == 0 {
            return Self {
                trees: Vec::new(),
                normalizer: 0.0,
            };
        }

        let mut rng = StdRng::seed_from_u64(config.seed);
        let sample_n = config.sample_size.min(values.len()).max(1);
        let max_depth = (sample_n as f64).log2().ceil() as usize;

        let trees = (0..config.num_trees)
            .map(|_| {
                let sample = sample_values(values, sample_n, &mut rng);
                build_tree(sample, 0, max_depth, &mut rng)
            })
            .collect();

        Self {
            trees,
            normalizer: average_path_length(sample_n),
        }
    }

    /// Anomaly score for one value.
    pub fn score(&self, value: f64) -> f64 {
        if self.trees.is_empty() || self.normalizer <= 0.0 {
            return 0.5;
        }
        let total: f64 = self
            .trees
            .iter()
            .map(|tree| path_length(tree, value, 0))
            .sum();
        let mean = total / self.trees.len() as f64;
        2f64.powf(-mean / self.normalizer)
    }

    /// Fit on a batch and label its outliers: the `ceil(contamination * n)`
    /// highest-scoring values of the batch.
    pub fn fit_predict(config: &ForestConfig, values: &[f64]) -> Vec<bool> {
        let forest = Self::fit(config, values);
        let scores: Vec<f64> = values.iter().map(|v| forest.score(*v)).collect();
        label_outliers(&scores, config.contamination)
    }
}

fn sample_values(values: &[f64], amount: usize, rng: &mut StdRng) -> Vec<f64> {
    rand::seq::index::sample(rng, values.len(), amount)
        .iter()
        .map(|i| values[i])
        .collect()
}

fn build_tree(values: Vec<f64>, depth: usize, max_depth: usize, rng: &mut StdRng) -> Tree {
    if values.len() <= 1 || depth >= max_depth {
        return Tree::Leaf {
            size: values.len(),
        };
    }

    let min = values.iter().cloned().fold(f64::MAX, f64::min);
    let max = values.iter().cloned().fold(f64::MIN, f64::max);
    if !(min < max) {
        // All values equal: nothing left to split on.
        return Tree::Leaf {
            size: values.len(),
        };
    }

    let at = rng.gen_range(min..max);
    let (left, right): (Vec<f64>, Vec<f64>) = values.into_iter().partition(|v| *v < at);
    Tree::Split {
        at,
        left: Box::new(build_tree(left, depth + 1, max_depth, rng)),
        right: Box::new(build_tree(right, depth + 1, max_depth, rng)),
    }
}

fn path_length(tree: &Tree, value: f64, depth: usize) -> f64 {
    match tree {
        Tree::Leaf { size } => depth as f64 + average_path_length(*size),
        Tree::Split { at, left, right } => {
            if value < *at {
                path_length(left, value, depth + 1)
            } else {
                path_length(right, value, depth + 1)
            }
        }
    }
}

/// Expected path length of an unsuccessful BST search over `n` points, the
/// standard isolation-forest normalization term.
fn average_path_length(n: usize) -> f64 {
    if n <= 1 {
        return 0.0;
    }
    let n = n as f64;
    2.0 * ((n - 1.0).ln() + EULER_MASCHERONI) - 2.0 * (n - 1.0) / n
}

fn label_outliers(scores: &[f64], contamination: f64) -> Vec<bool> {
    let n = scores.len();
    let mut labels = vec![false; n];
    if n == 0 || contamination <= 0.0 {
        return labels;
    }

    let flagged = ((n as f64) * contamination).ceil() as usize;
    let flagged = flagged.min(n);

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|a, b| {
        scores[*b]
            .partial_cmp(&scores[*a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    for &i in order.iter().take(flagged) {
        labels[i] = true;
    }
    labels
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clustered_batch() -> Vec<f64> {
        vec![20.1, 19.8, 20.4, 19.6, 20.0, 20.3, 19.9, 20.2, 19.7, 9999.0]
    }

    #[test]
    fn test_outlier_scores_highest() {
        let config = ForestConfig::default();
        let values = clustered_batch();
        let forest = IsolationForest::fit(&config, &values);

        let outlier_score = forest.score(9999.0);
        for v in &values[..9] {
            assert!(
                outlier_score > forest.score(*v),
                "9999.0 should isolate faster than {v}"
            );
        }
        assert!(outlier_score > 0.6);
    }

    #[test]
    fn test_fit_predict_flags_only_the_outlier() {
        let labels = IsolationForest::fit_predict(&ForestConfig::default(), &clustered_batch());

        assert_eq!(labels.len(), 10);
        assert!(labels[9]);
        assert_eq!(labels.iter().filter(|flag| **flag).count(), 1);
    }

    #[test]
    fn test_labelling_is_deterministic_under_fixed_seed() {
        let config = ForestConfig::default();
        let values = clustered_batch();

        let first = IsolationForest::fit_predict(&config, &values);
        let second = IsolationForest::fit_predict(&config, &values);
        assert_eq!(first, second);
    }

    #[test]
    fn test_contamination_governs_label_count() {
        let values: Vec<f64> = (0..100).map(|i| (i % 10) as f64).collect();
        let labels = IsolationForest::fit_predict(&ForestConfig::default(), &values);

        // ceil(0.05 * 100) = 5
        assert_eq!(labels.iter().filter(|flag| **flag).count(), 5);
    }

    #[test]
    fn test_constant_batch_does_not_panic() {
        let values = vec![5.0; 20];
        let forest = IsolationForest::fit(&ForestConfig::default(), &values);
        assert!((forest.score(5.0) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_empty_batch_scores_neutral() {
        let forest = IsolationForest::fit(&ForestConfig::default(), &[]);
        assert_eq!(forest.score(1.0), 0.5);
    }
}
