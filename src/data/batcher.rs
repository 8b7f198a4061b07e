// ============================================================
// Layer 4: Relation Batcher
// ============================================================
// Implements Burn's Batcher trait to turn a Vec<RelationExample>
// into tensors for one forward pass.
//
// Unlike fixed-length inputs, relation sentences vary in length,
// so every batch is padded to its own longest row:
//
//   row 0: [101, 7, 8, 9, 102]        → [101, 7, 8, 9, 102]
//   row 1: [101, 5, 102]              → [101, 5, 102, PAD, PAD]
//
// The padding id is configurable; the evaluator later rebuilds
// the attention mask from it (input_ids != pad_id).
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
    tensor::TensorData,
};

use crate::domain::relation::RelationExample;

// ─── RelationBatch ────────────────────────────────────────────────────────────
/// A padded batch of relation examples.
#[derive(Debug, Clone)]
pub struct RelationBatch<B: Backend> {
    /// Token ids: shape: [batch_size, max_len]
    pub input_ids: Tensor<B, 2, Int>,

    /// Entity-start positions: shape: [batch_size, 2]
    pub e1_e2_start: Tensor<B, 2, Int>,

    /// Relation labels: shape: [batch_size]
    /// IGNORE_INDEX marks rows excluded from scoring
    pub labels: Tensor<B, 1, Int>,
}

// ─── RelationBatcher ──────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct RelationBatcher<B: Backend> {
    pub device: B::Device,
    pub pad_id: u32,
}

impl<B: Backend> RelationBatcher<B> {
    pub fn new(device: B::Device, pad_id: u32) -> Self {
        Self { device, pad_id }
    }
}

impl<B: Backend> Batcher<B, RelationExample, RelationBatch<B>> for RelationBatcher<B> {
    fn batch(&self, items: Vec<RelationExample>, _device: &B::Device) -> RelationBatch<B> {
        let batch_size = items.len();
        let max_len = items.iter().map(RelationExample::len).max().unwrap_or(0);

        // ── Pad and flatten token ids ─────────────────────────────────────────
        // Widened to i64 so no id, position or label can wrap
        let pad = i64::from(self.pad_id);
        let input_flat: Vec<i64> = items
            .iter()
            .flat_map(|e| {
                e.token_ids
                    .iter()
                    .map(|&t| i64::from(t))
                    .chain(std::iter::repeat(pad).take(max_len - e.len()))
            })
            .collect();

        let starts_flat: Vec<i64> = items
            .iter()
            .flat_map(|e| e.e1_e2_start.iter().map(|&p| p as i64))
            .collect();

        let labels: Vec<i64> = items.iter().map(|e| e.label).collect();

        let input_ids = Tensor::<B, 2, Int>::from_data(
            TensorData::new(input_flat, [batch_size, max_len]),
            &self.device,
        );

        let e1_e2_start = Tensor::<B, 2, Int>::from_data(
            TensorData::new(starts_flat, [batch_size, 2]),
            &self.device,
        );

        let labels = Tensor::<B, 1, Int>::from_data(
            TensorData::new(labels, [batch_size]),
            &self.device,
        );

        RelationBatch { input_ids, e1_e2_start, labels }
    }
}
