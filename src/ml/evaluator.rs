// ============================================================
// Layer 5: Evaluation Loop
// ============================================================
// Runs a classifier over every test batch and turns the logits
// into aggregate metrics.
//
// Per batch:
//   attention_mask = (input_ids != pad_id) as float
//   token_type_ids = zeros
//   logits         = model.classify(...)
//   prediction     = argmax(softmax(logits), dim 1)
//   rows labelled ignore_idx are dropped before scoring
//
// Batch accuracy divides the correct kept rows by the FULL batch
// size, so a batch with ignored rows can never reach 1.0. The
// overall accuracy is the mean of the batch accuracies; precision,
// recall and F1 are support-weighted over all kept labels.
//
// The model must live on a non-autodiff backend (call .valid()
// first) so no gradients are tracked here.
//
// Reference: Burn Book §5 (Training, validation step)

use anyhow::{bail, Result};
use burn::{prelude::*, tensor::activation::softmax};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::data::batcher::RelationBatch;
use crate::domain::relation_map::RelationMap;
use crate::ml::metrics::{classification_report, ClassificationReport};
use crate::ml::model::RelationClassifier;

/// Outcome of scoring a single batch
#[derive(Debug, Clone, PartialEq)]
pub struct BatchEvaluation {
    pub accuracy:  f64,
    /// Predicted class per kept row
    pub predicted: Vec<i64>,
    /// True class per kept row
    pub truth:     Vec<i64>,
}

/// Aggregate results of a full evaluation pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalResults {
    /// Mean of the per-batch accuracies
    pub accuracy:  f64,
    pub precision: f64,
    pub recall:    f64,
    pub f1:        f64,
    /// Rendered per-class table
    pub report:    String,
    /// Structured form of `report`
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub details:   Option<ClassificationReport>,
}

impl EvalResults {
    /// Metric name → printable value, sorted by name.
    pub fn entries(&self) -> BTreeMap<&'static str, String> {
        BTreeMap::from([
            ("accuracy",  self.accuracy.to_string()),
            ("f1",        self.f1.to_string()),
            ("precision", self.precision.to_string()),
            ("recall",    self.recall.to_string()),
            ("report",    self.report.clone()),
        ])
    }
}

/// Score one batch of logits against its labels.
///
/// logits: [batch, num_classes], labels: [batch]
pub fn evaluate_batch<B: Backend>(
    logits:     Tensor<B, 2>,
    labels:     Tensor<B, 1, Int>,
    ignore_idx: i64,
) -> BatchEvaluation {
    let batch_size = labels.dims()[0];

    // argmax(1) returns [batch, 1], flatten to [batch]
    let predictions = softmax(logits, 1).argmax(1).flatten::<1>(0, 1);

    let labels: Vec<i64> = labels.into_data().iter::<i64>().collect();
    let predictions: Vec<i64> = predictions.into_data().iter::<i64>().collect();

    let (truth, predicted): (Vec<i64>, Vec<i64>) = labels
        .into_iter()
        .zip(predictions)
        .filter(|(l, _)| *l != ignore_idx)
        .unzip();

    let correct = truth.iter().zip(&predicted).filter(|(l, o)| l == o).count();

    let accuracy = if batch_size > 1 {
        correct as f64 / batch_size as f64
    } else {
        correct as f64
    };

    BatchEvaluation { accuracy, predicted, truth }
}

/// Evaluate `model` over every batch and aggregate the metrics.
///
/// Fails if `batches` yields nothing, since no accuracy can be averaged.
pub fn evaluate_results<B, M, I>(
    model:      &M,
    batches:    I,
    pad_id:     u32,
    ignore_idx: i64,
    names:      Option<&RelationMap>,
) -> Result<EvalResults>
where
    B: Backend,
    M: RelationClassifier<B>,
    I: IntoIterator<Item = RelationBatch<B>>,
{
    tracing::info!("Evaluating test samples...");

    let mut acc_sum     = 0.0f64;
    let mut num_batches = 0usize;
    let mut out_labels:  Vec<Vec<i64>> = Vec::new();
    let mut true_labels: Vec<Vec<i64>> = Vec::new();

    for batch in batches {
        let [batch_size, seq_len] = batch.input_ids.dims();
        let device = batch.input_ids.device();

        let attention_mask = batch
            .input_ids
            .clone()
            .equal_elem(pad_id as i64)
            .bool_not()
            .float();
        let token_type_ids = Tensor::<B, 2, Int>::zeros([batch_size, seq_len], &device);

        let logits = model.classify(
            batch.input_ids,
            token_type_ids,
            attention_mask,
            batch.e1_e2_start,
        );

        let eval = evaluate_batch(logits, batch.labels, ignore_idx);
        tracing::debug!(
            "Batch {}: accuracy={:.4} ({} scored of {})",
            num_batches,
            eval.accuracy,
            eval.truth.len(),
            batch_size
        );

        acc_sum += eval.accuracy;
        num_batches += 1;
        out_labels.push(eval.predicted);
        true_labels.push(eval.truth);
    }

    if num_batches == 0 {
        bail!("Test loader produced no batches; nothing to evaluate");
    }

    let true_flat: Vec<i64> = true_labels.into_iter().flatten().collect();
    let out_flat:  Vec<i64> = out_labels.into_iter().flatten().collect();

    tracing::info!("Batches evaluated: {}", num_batches);
    tracing::info!("Scored predictions: {}", true_flat.len());

    let report = classification_report(&true_flat, &out_flat)?;
    let results = EvalResults {
        accuracy:  acc_sum / num_batches as f64,
        precision: report.weighted_avg.precision,
        recall:    report.weighted_avg.recall,
        f1:        report.weighted_avg.f1,
        report:    report.render(names),
        details:   Some(report),
    };

    tracing::info!("***** Eval results *****");
    for (key, value) in results.entries() {
        tracing::info!("  {} = {}", key, value);
    }

    Ok(results)
}
