// ============================================================
// Layer 5: Classification Metrics
// ============================================================
// Pure Rust scoring over flat label lists. No Burn types here,
// so everything is testable without a backend.
//
// For every class c in (true labels ∪ predicted labels):
//   precision_c = tp / (tp + fp)
//   recall_c    = tp / (tp + fn)
//   f1_c        = 2·p·r / (p + r)
// A zero denominator scores 0.0.
//
// Averages:
//   macro:    plain mean over classes
//   weighted: mean weighted by each class's true support, so a
//              class that never occurs in the truth contributes
//              nothing even if it was predicted
//
// Example report (digits = 2):
//
//                 precision    recall  f1-score   support
//
//              0       1.00      0.50      0.67         2
//              1       0.67      1.00      0.80         2
//
//       accuracy                           0.75         4
//      macro avg       0.83      0.75      0.73         4
//   weighted avg       0.83      0.75      0.73         4

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};

use crate::domain::relation_map::RelationMap;

const HEADERS: [&str; 4] = ["precision", "recall", "f1-score", "support"];

/// Scores for one class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassScore {
    pub label:     i64,
    pub precision: f64,
    pub recall:    f64,
    pub f1:        f64,
    /// Number of true occurrences of this label
    pub support:   usize,
}

/// Precision / recall / F1 triple for an averaged row
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Averages {
    pub precision: f64,
    pub recall:    f64,
    pub f1:        f64,
}

/// Per-class scores plus accuracy and both averages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub classes:       Vec<ClassScore>,
    pub accuracy:      f64,
    pub macro_avg:     Averages,
    pub weighted_avg:  Averages,
    pub total_support: usize,
}

#[derive(Default, Clone, Copy)]
struct Counts {
    tp: usize,
    fp: usize,
    fn_count: usize,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

fn harmonic(p: f64, r: f64) -> f64 {
    if p + r > 0.0 { 2.0 * p * r / (p + r) } else { 0.0 }
}

/// Score `predicted` against `truth`, position by position.
///
/// Fails if the two slices differ in length.
pub fn classification_report(truth: &[i64], predicted: &[i64]) -> Result<ClassificationReport> {
    if truth.len() != predicted.len() {
        bail!(
            "truth has {} labels but predicted has {}",
            truth.len(),
            predicted.len()
        );
    }

    // BTreeMap keeps classes sorted by label id
    let mut counts: BTreeMap<i64, Counts> = BTreeMap::new();
    let mut correct = 0usize;

    for (&t, &p) in truth.iter().zip(predicted) {
        if t == p {
            correct += 1;
            counts.entry(t).or_default().tp += 1;
        } else {
            counts.entry(t).or_default().fn_count += 1;
            counts.entry(p).or_default().fp += 1;
        }
    }

    let classes: Vec<ClassScore> = counts
        .into_iter()
        .map(|(label, c)| {
            let precision = ratio(c.tp, c.tp + c.fp);
            let recall    = ratio(c.tp, c.tp + c.fn_count);
            ClassScore {
                label,
                precision,
                recall,
                f1: harmonic(precision, recall),
                support: c.tp + c.fn_count,
            }
        })
        .collect();

    let total_support = truth.len();
    let n_classes = classes.len() as f64;

    let macro_avg = if classes.is_empty() {
        Averages::default()
    } else {
        Averages {
            precision: classes.iter().map(|c| c.precision).sum::<f64>() / n_classes,
            recall:    classes.iter().map(|c| c.recall).sum::<f64>() / n_classes,
            f1:        classes.iter().map(|c| c.f1).sum::<f64>() / n_classes,
        }
    };

    let weighted_avg = if total_support == 0 {
        Averages::default()
    } else {
        let w = |f: fn(&ClassScore) -> f64| {
            classes.iter().map(|c| f(c) * c.support as f64).sum::<f64>() / total_support as f64
        };
        Averages {
            precision: w(|c| c.precision),
            recall:    w(|c| c.recall),
            f1:        w(|c| c.f1),
        }
    };

    Ok(ClassificationReport {
        classes,
        accuracy: ratio(correct, total_support),
        macro_avg,
        weighted_avg,
        total_support,
    })
}

/// Support-weighted precision, recall and F1.
pub fn precision_recall_f1_weighted(truth: &[i64], predicted: &[i64]) -> Result<Averages> {
    Ok(classification_report(truth, predicted)?.weighted_avg)
}

impl ClassificationReport {
    /// Render the text table, naming rows through `names` when given.
    pub fn render(&self, names: Option<&RelationMap>) -> String {
        let digits = 2;
        let row_names: Vec<String> = self
            .classes
            .iter()
            .map(|c| {
                names
                    .and_then(|m| m.name(c.label))
                    .map(str::to_string)
                    .unwrap_or_else(|| c.label.to_string())
            })
            .collect();

        let width = row_names
            .iter()
            .map(String::len)
            .chain(["weighted avg".len(), digits])
            .max()
            .unwrap_or(digits);

        let mut out = format!("{:>width$} ", "");
        for h in HEADERS {
            out.push_str(&format!(" {h:>9}"));
        }
        out.push_str("\n\n");

        let row = |name: &str, p: f64, r: f64, f: f64, support: usize| {
            format!("{name:>width$}  {p:>9.digits$} {r:>9.digits$} {f:>9.digits$} {support:>9}\n")
        };

        for (name, c) in row_names.iter().zip(&self.classes) {
            out.push_str(&row(name, c.precision, c.recall, c.f1, c.support));
        }
        out.push('\n');

        out.push_str(&format!(
            "{:>width$}  {:>9} {:>9} {:>9.digits$} {:>9}\n",
            "accuracy", "", "", self.accuracy, self.total_support
        ));
        for (name, avg) in [("macro avg", self.macro_avg), ("weighted avg", self.weighted_avg)] {
            out.push_str(&row(name, avg.precision, avg.recall, avg.f1, self.total_support));
        }

        out
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(None))
    }
}
