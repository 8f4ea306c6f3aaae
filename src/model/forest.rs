//! Bagged CART random forest (Gini impurity) for the binary conversion label.
//! Input: row-major f64 matrix in feature order. Output: averaged class distribution.

use super::Classifier;
use ndarray::ArrayView2;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 10,
            min_samples_split: 50,
            min_samples_leaf: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Node {
    /// Class distribution [p(0), p(1)] of the training samples that reached this leaf
    Leaf { dist: [f64; 2] },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Nodes live in one arena; index 0 is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    fn leaf_dist(&self, row: &[f64]) -> [f64; 2] {
        let mut i = 0;
        loop {
            match &self.nodes[i] {
                Node::Leaf { dist } => return *dist,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let v = row.get(*feature).copied().unwrap_or(0.0);
                    i = if v <= *threshold { *left } else { *right };
                }
            }
        }
    }
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    /// Samples going left after sorting by the split feature
    n_left: usize,
    /// Weighted child impurity (sum of n_child * gini_child)
    child_impurity: f64,
}

struct TreeBuilder<'a> {
    x: ArrayView2<'a, f64>,
    y: &'a [u8],
    params: ForestParams,
    max_features: usize,
    rng: StdRng,
    nodes: Vec<Node>,
    /// Unnormalized impurity decrease per feature
    importances: Vec<f64>,
}

fn gini(pos: usize, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let p = pos as f64 / n as f64;
    1.0 - p * p - (1.0 - p) * (1.0 - p)
}

impl<'a> TreeBuilder<'a> {
    fn positives(&self, idx: &[usize]) -> usize {
        idx.iter().filter(|&&i| self.y[i] == 1).count()
    }

    fn leaf(&mut self, pos: usize, n: usize) -> usize {
        let p1 = if n == 0 { 0.0 } else { pos as f64 / n as f64 };
        self.nodes.push(Node::Leaf {
            dist: [1.0 - p1, p1],
        });
        self.nodes.len() - 1
    }

    fn build(&mut self, idx: &mut [usize], depth: usize) -> usize {
        let n = idx.len();
        let pos = self.positives(idx);
        let p = self.params;
        if depth >= p.max_depth
            || n < p.min_samples_split
            || n < 2 * p.min_samples_leaf.max(1)
            || pos == 0
            || pos == n
        {
            return self.leaf(pos, n);
        }

        let Some(best) = self.best_split(idx) else {
            return self.leaf(pos, n);
        };

        let parent = n as f64 * gini(pos, n);
        self.importances[best.feature] += (parent - best.child_impurity).max(0.0);

        let f = best.feature;
        let x = self.x;
        idx.sort_by(|&a, &b| x[[a, f]].total_cmp(&x[[b, f]]));

        // Reserve the split slot so children get higher indices.
        let slot = self.nodes.len();
        self.nodes.push(Node::Leaf { dist: [0.0, 0.0] });
        let (l, r) = idx.split_at_mut(best.n_left);
        let left = self.build(l, depth + 1);
        let right = self.build(r, depth + 1);
        self.nodes[slot] = Node::Split {
            feature: f,
            threshold: best.threshold,
            left,
            right,
        };
        slot
    }

    /// Visit features in random order; stop after `max_features` once a valid split exists.
    /// Constant features in the node do not use up the budget.
    fn best_split(&mut self, idx: &[usize]) -> Option<BestSplit> {
        let n = idx.len();
        let min_leaf = self.params.min_samples_leaf.max(1);
        let mut order: Vec<usize> = (0..self.x.ncols()).collect();
        order.shuffle(&mut self.rng);
        let total_pos = self.positives(idx);

        let mut best: Option<BestSplit> = None;
        let mut visited = 0usize;
        let mut column: Vec<(f64, u8)> = Vec::with_capacity(n);
        for f in order {
            if visited >= self.max_features && best.is_some() {
                break;
            }
            column.clear();
            column.extend(idx.iter().map(|&i| (self.x[[i, f]], self.y[i])));
            column.sort_by(|a, b| a.0.total_cmp(&b.0));
            if column.first().map(|c| c.0) == column.last().map(|c| c.0) {
                continue;
            }
            visited += 1;

            let mut left_pos = 0usize;
            for i in 1..n {
                left_pos += usize::from(column[i - 1].1);
                let (lo, hi) = (column[i - 1].0, column[i].0);
                if i < min_leaf || n - i < min_leaf || lo >= hi {
                    continue;
                }
                let impurity = i as f64 * gini(left_pos, i)
                    + (n - i) as f64 * gini(total_pos - left_pos, n - i);
                if best.as_ref().map_or(true, |b| impurity < b.child_impurity) {
                    let mid = lo + (hi - lo) / 2.0;
                    let threshold = if mid >= hi { lo } else { mid };
                    best = Some(BestSplit {
                        feature: f,
                        threshold,
                        n_left: i,
                        child_impurity: impurity,
                    });
                }
            }
        }
        best
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    params: ForestParams,
    n_features: usize,
    trees: Vec<DecisionTree>,
    /// Mean decrease in impurity, normalized to sum to 1
    importances: Vec<f64>,
}

impl RandomForest {
    /// Fit on `x` (rows = samples) and binary labels `y`. Deterministic for a given seed.
    pub fn fit<'a>(x: ArrayView2<'a, f64>, y: &'a [u8], params: ForestParams, seed: u64) -> Self {
        let n = x.nrows();
        let n_features = x.ncols();
        let max_features = ((n_features as f64).sqrt() as usize).clamp(1, n_features.max(1));
        let mut master = StdRng::seed_from_u64(seed);
        let mut trees = Vec::with_capacity(params.n_estimators);
        let mut importances = vec![0.0; n_features];

        for _ in 0..params.n_estimators {
            let tree_seed: u64 = master.gen();
            let mut rng = StdRng::seed_from_u64(tree_seed);
            // Bootstrap sample, drawn with replacement.
            let mut idx: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
            let mut b = TreeBuilder {
                x,
                y,
                params,
                max_features,
                rng,
                nodes: Vec::new(),
                importances: vec![0.0; n_features],
            };
            b.build(&mut idx, 0);

            let total: f64 = b.importances.iter().sum();
            if total > 0.0 {
                for (acc, v) in importances.iter_mut().zip(&b.importances) {
                    *acc += v / total;
                }
            }
            trees.push(DecisionTree { nodes: b.nodes });
        }

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            importances.iter_mut().for_each(|v| *v /= total);
        }

        Self {
            params,
            n_features,
            trees,
            importances,
        }
    }

    /// Averaged [p(0), p(1)] over all trees.
    pub fn predict_dist(&self, row: &[f64]) -> [f64; 2] {
        if self.trees.is_empty() {
            return [1.0, 0.0];
        }
        let mut acc = [0.0, 0.0];
        for t in &self.trees {
            let d = t.leaf_dist(row);
            acc[0] += d[0];
            acc[1] += d[1];
        }
        let k = self.trees.len() as f64;
        [acc[0] / k, acc[1] / k]
    }

    pub fn feature_importances(&self) -> &[f64] {
        &self.importances
    }

    pub fn params(&self) -> ForestParams {
        self.params
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl Classifier for RandomForest {
    fn predict_proba(&self, row: &[f64]) -> f64 {
        self.predict_dist(row)[1].clamp(0.0, 1.0)
    }

    /// Argmax of the averaged distribution; ties go to class 0.
    fn predict(&self, row: &[f64]) -> u8 {
        let d = self.predict_dist(row);
        u8::from(d[1] > d[0])
    }
}
