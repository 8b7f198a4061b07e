use burn::data::dataset::Dataset;

use crate::domain::relation::RelationExample;

/// In-memory relation examples exposed through Burn's Dataset trait
/// so a DataLoader can index into them.
pub struct RelationDataset {
    examples: Vec<RelationExample>,
}

impl RelationDataset {
    pub fn new(examples: Vec<RelationExample>) -> Self { Self { examples } }

    pub fn scored_count(&self) -> usize {
        self.examples.iter().filter(|e| e.is_scored()).count()
    }
}

impl Dataset<RelationExample> for RelationDataset {
    fn get(&self, index: usize) -> Option<RelationExample> {
        self.examples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.examples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::IGNORE_INDEX;

    #[test]
    fn test_dataset_indexing() {
        let ds = RelationDataset::new(vec![
            RelationExample::new(vec![1, 2], [0, 1], 0),
            RelationExample::new(vec![3, 4], [0, 1], IGNORE_INDEX),
        ]);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.scored_count(), 1);
        assert_eq!(ds.get(1).map(|e| e.label), Some(IGNORE_INDEX));
        assert!(ds.get(2).is_none());
    }
}
