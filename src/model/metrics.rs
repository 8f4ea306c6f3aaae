//! Binary classification metrics for holdout evaluation and cross-validation.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confusion {
    pub tp: u64,
    pub fp: u64,
    pub tn: u64,
    pub fn_: u64,
}

impl Confusion {
    pub fn from_labels(y_true: &[u8], y_pred: &[u8]) -> Self {
        let mut c = Confusion::default();
        for (&t, &p) in y_true.iter().zip(y_pred) {
            match (t == 1, p == 1) {
                (true, true) => c.tp += 1,
                (false, true) => c.fp += 1,
                (false, false) => c.tn += 1,
                (true, false) => c.fn_ += 1,
            }
        }
        c
    }

    fn n(&self) -> f64 {
        (self.tp + self.fp + self.tn + self.fn_) as f64
    }
}

fn ratio(num: u64, den: u64) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

pub fn precision(c: &Confusion) -> f64 {
    ratio(c.tp, c.tp + c.fp)
}

pub fn recall(c: &Confusion) -> f64 {
    ratio(c.tp, c.tp + c.fn_)
}

pub fn specificity(c: &Confusion) -> f64 {
    ratio(c.tn, c.tn + c.fp)
}

pub fn f1(c: &Confusion) -> f64 {
    let (p, r) = (precision(c), recall(c));
    if p + r == 0.0 {
        0.0
    } else {
        2.0 * p * r / (p + r)
    }
}

pub fn accuracy(c: &Confusion) -> f64 {
    ratio(c.tp + c.tn, c.tp + c.fp + c.tn + c.fn_)
}

pub fn balanced_accuracy(c: &Confusion) -> f64 {
    (recall(c) + specificity(c)) / 2.0
}

pub fn cohen_kappa(c: &Confusion) -> f64 {
    let n = c.n();
    if n == 0.0 {
        return 0.0;
    }
    let po = (c.tp + c.tn) as f64 / n;
    let pe = ((c.tp + c.fp) as f64 * (c.tp + c.fn_) as f64
        + (c.tn + c.fn_) as f64 * (c.tn + c.fp) as f64)
        / (n * n);
    if pe >= 1.0 {
        0.0
    } else {
        (po - pe) / (1.0 - pe)
    }
}

pub fn matthews_corrcoef(c: &Confusion) -> f64 {
    let (tp, fp, tn, fn_) = (c.tp as f64, c.fp as f64, c.tn as f64, c.fn_ as f64);
    let den = ((tp + fp) * (tp + fn_) * (tn + fp) * (tn + fn_)).sqrt();
    if den == 0.0 {
        0.0
    } else {
        (tp * tn - fp * fn_) / den
    }
}

/// Rank-based ROC-AUC with tied scores sharing their average rank.
/// `None` when only one class is present.
pub fn roc_auc(y_true: &[u8], scores: &[f64]) -> Option<f64> {
    let pos = y_true.iter().filter(|&&y| y == 1).count();
    let neg = y_true.len() - pos;
    if pos == 0 || neg == 0 {
        return None;
    }
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut rank_sum_pos = 0.0;
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        // Ranks are 1-based; the tie group i..=j shares the mean rank.
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        for &k in &order[i..=j] {
            if y_true[k] == 1 {
                rank_sum_pos += avg_rank;
            }
        }
        i = j + 1;
    }
    let (p, n) = (pos as f64, neg as f64);
    Some((rank_sum_pos - p * (p + 1.0) / 2.0) / (p * n))
}

/// Area under the precision-recall step curve: sum over thresholds of (R_k - R_{k-1}) * P_k.
pub fn average_precision(y_true: &[u8], scores: &[f64]) -> Option<f64> {
    let pos = y_true.iter().filter(|&&y| y == 1).count();
    if pos == 0 {
        return None;
    }
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    let (mut tp, mut fp) = (0usize, 0usize);
    let mut prev_recall = 0.0;
    let mut ap = 0.0;
    let mut i = 0;
    while i < order.len() {
        let s = scores[order[i]];
        while i < order.len() && scores[order[i]] == s {
            if y_true[order[i]] == 1 {
                tp += 1;
            } else {
                fp += 1;
            }
            i += 1;
        }
        let recall = tp as f64 / pos as f64;
        let precision = tp as f64 / (tp + fp) as f64;
        ap += (recall - prev_recall) * precision;
        prev_recall = recall;
    }
    Some(ap)
}

pub fn brier_score(y_true: &[u8], probs: &[f64]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let sum: f64 = y_true
        .iter()
        .zip(probs)
        .map(|(&y, &p)| (p - f64::from(y)).powi(2))
        .sum();
    sum / y_true.len() as f64
}

/// Mean and population standard deviation.
pub fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

/// Holdout evaluation of one fitted classifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub confusion: Confusion,
    pub roc_auc: Option<f64>,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub accuracy: f64,
    pub specificity: f64,
    pub balanced_accuracy: f64,
    pub kappa: f64,
    pub mcc: f64,
    pub avg_precision: Option<f64>,
    pub brier_score: f64,
}

impl ClassificationReport {
    pub fn evaluate(y_true: &[u8], y_pred: &[u8], probs: &[f64]) -> Self {
        let c = Confusion::from_labels(y_true, y_pred);
        Self {
            confusion: c,
            roc_auc: roc_auc(y_true, probs),
            precision: precision(&c),
            recall: recall(&c),
            f1_score: f1(&c),
            accuracy: accuracy(&c),
            specificity: specificity(&c),
            balanced_accuracy: balanced_accuracy(&c),
            kappa: cohen_kappa(&c),
            mcc: matthews_corrcoef(&c),
            avg_precision: average_precision(y_true, probs),
            brier_score: brier_score(y_true, probs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    #[test]
    fn auc_handles_ties() {
        let y = [0, 0, 1, 1];
        assert!((roc_auc(&y, &[0.1, 0.4, 0.35, 0.8]).unwrap() - 0.75).abs() < EPS);
        assert!((roc_auc(&y, &[0.5, 0.5, 0.5, 0.5]).unwrap() - 0.5).abs() < EPS);
        assert!((roc_auc(&y, &[0.0, 0.1, 0.9, 1.0]).unwrap() - 1.0).abs() < EPS);
        assert_eq!(roc_auc(&[1, 1], &[0.2, 0.3]), None);
    }

    #[test]
    fn average_precision_matches_step_definition() {
        let y = [0, 0, 1, 1];
        let ap = average_precision(&y, &[0.1, 0.4, 0.35, 0.8]).unwrap();
        // thresholds 0.8: P=1 R=.5; 0.4: P=.5; 0.35: P=2/3 R=1
        assert!((ap - (0.5 * 1.0 + 0.5 * (2.0 / 3.0))).abs() < EPS);
    }

    #[test]
    fn confusion_derived_metrics() {
        let y_true = [1, 1, 1, 0, 0, 0, 0, 0];
        let y_pred = [1, 1, 0, 1, 0, 0, 0, 0];
        let c = Confusion::from_labels(&y_true, &y_pred);
        assert_eq!(
            c,
            Confusion {
                tp: 2,
                fp: 1,
                tn: 4,
                fn_: 1
            }
        );
        assert!((precision(&c) - 2.0 / 3.0).abs() < EPS);
        assert!((recall(&c) - 2.0 / 3.0).abs() < EPS);
        assert!((specificity(&c) - 0.8).abs() < EPS);
        assert!((accuracy(&c) - 0.75).abs() < EPS);
        assert!(cohen_kappa(&c) > 0.0 && cohen_kappa(&c) < 1.0);
        assert!(matthews_corrcoef(&c) > 0.0);
    }

    #[test]
    fn degenerate_inputs_do_not_divide_by_zero() {
        let c = Confusion::default();
        assert_eq!(precision(&c), 0.0);
        assert_eq!(f1(&c), 0.0);
        assert_eq!(cohen_kappa(&c), 0.0);
        assert_eq!(matthews_corrcoef(&c), 0.0);
        assert_eq!(brier_score(&[], &[]), 0.0);
    }

    #[test]
    fn brier_and_mean_std() {
        assert!((brier_score(&[1, 0], &[0.5, 0.5]) - 0.25).abs() < EPS);
        let (m, s) = mean_std(&[1.0, 3.0]);
        assert_eq!(m, 2.0);
        assert_eq!(s, 1.0);
    }
}
