// src/classifier/metrics.rs
//! Classification metrics

use super::ClassifierError;

/// Averaging strategy for multi-class F1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Average {
    /// Pool true/false positives over all classes
    Micro,
    /// Unweighted mean of per-class F1
    Macro,
}

fn class_f1(tp: usize, fp: usize, fn_count: usize) -> f64 {
    let precision = if tp + fp == 0 { 0.0 } else { tp as f64 / (tp + fp) as f64 };
    let recall = if tp + fn_count == 0 { 0.0 } else { tp as f64 / (tp + fn_count) as f64 };
    if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}

/// Per-class true positive, false positive and false negative counts
fn confusion_counts(y_true: &[usize], y_pred: &[usize]) -> (Vec<usize>, Vec<usize>, Vec<usize>) {
    let n_classes = y_true
        .iter()
        .chain(y_pred.iter())
        .max()
        .map_or(0, |&m| m + 1);

    let mut tp = vec![0; n_classes];
    let mut fp = vec![0; n_classes];
    let mut fn_counts = vec![0; n_classes];

    for (&truth, &pred) in y_true.iter().zip(y_pred) {
        if truth == pred {
            tp[truth] += 1;
        } else {
            fp[pred] += 1;
            fn_counts[truth] += 1;
        }
    }

    (tp, fp, fn_counts)
}

/// F1 score in [0, 1]. Micro averaging over single-label predictions
/// equals plain accuracy.
pub fn f1_score(y_true: &[usize], y_pred: &[usize], average: Average) -> Result<f64, ClassifierError> {
    if y_true.len() != y_pred.len() {
        return Err(ClassifierError::LabelMismatch {
            samples: y_pred.len(),
            labels: y_true.len(),
        });
    }
    if y_true.is_empty() {
        return Err(ClassifierError::EmptyEvaluationSet);
    }

    let (tp, fp, fn_counts) = confusion_counts(y_true, y_pred);

    let score = match average {
        Average::Micro => class_f1(
            tp.iter().sum(),
            fp.iter().sum(),
            fn_counts.iter().sum(),
        ),
        Average::Macro => {
            // Classes that never occur in either vector do not count
            let present: Vec<usize> = (0..tp.len())
                .filter(|&c| tp[c] + fp[c] + fn_counts[c] > 0)
                .collect();
            present
                .iter()
                .map(|&c| class_f1(tp[c], fp[c], fn_counts[c]))
                .sum::<f64>()
                / present.len() as f64
        }
    };

    Ok(score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_micro_f1_is_accuracy() {
        let y_true = [0, 1, 2, 0, 1, 2];
        let y_pred = [0, 2, 1, 0, 0, 1];
        let f1 = f1_score(&y_true, &y_pred, Average::Micro).unwrap();
        assert_relative_eq!(f1, 2.0 / 6.0, epsilon = 1e-12);
    }

    #[test]
    fn test_perfect_prediction() {
        let y = [3, 1, 1, 0];
        assert_eq!(f1_score(&y, &y, Average::Micro).unwrap(), 1.0);
        assert_eq!(f1_score(&y, &y, Average::Macro).unwrap(), 1.0);
    }

    #[test]
    fn test_macro_f1() {
        // class 0: tp=1 fp=0 fn=1 -> 2/3; class 1: tp=1 fp=1 fn=0 -> 2/3
        let f1 = f1_score(&[0, 0, 1], &[0, 1, 1], Average::Macro).unwrap();
        assert_relative_eq!(f1, 2.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            f1_score(&[0, 1], &[0], Average::Micro),
            Err(ClassifierError::LabelMismatch { .. })
        ));
        assert!(matches!(
            f1_score(&[], &[], Average::Micro),
            Err(ClassifierError::EmptyEvaluationSet)
        ));
    }
}
