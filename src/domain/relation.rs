// ============================================================
// Layer 3: RelationExample Domain Type
// ============================================================
// One sentence, already tokenised, with the positions of the
// two entity-start markers and the relation class between them.
//
// Example (token ids abbreviated):
//   tokens:      [CLS] [E1] Paris [/E1] is the capital of [E2] France [/E2] [SEP]
//   e1_e2_start: [1, 8]
//   label:       3   (e.g. "capital_of")
//
// A label of IGNORE_INDEX (-1) keeps the row in the batch but
// removes it from every metric.

use serde::{Deserialize, Serialize};

use crate::domain::IGNORE_INDEX;

/// A labelled relation classification example.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationExample {
    /// Token ids of the full marked-up sentence
    pub token_ids: Vec<u32>,

    /// Index of the first and second entity-start marker
    /// inside `token_ids`
    pub e1_e2_start: [usize; 2],

    /// Relation class id, or IGNORE_INDEX
    pub label: i64,
}

impl RelationExample {
    pub fn new(token_ids: Vec<u32>, e1_e2_start: [usize; 2], label: i64) -> Self {
        Self { token_ids, e1_e2_start, label }
    }

    /// Number of tokens before padding
    pub fn len(&self) -> usize {
        self.token_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.token_ids.is_empty()
    }

    /// True if this row takes part in scoring
    pub fn is_scored(&self) -> bool {
        self.label != IGNORE_INDEX
    }

    /// Both entity markers must point inside the token sequence,
    /// otherwise the classifier would gather past the end of the row.
    pub fn markers_in_bounds(&self) -> bool {
        self.e1_e2_start.iter().all(|&p| p < self.token_ids.len())
    }
}
