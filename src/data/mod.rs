// ============================================================
// Layer 4: Data Pipeline
// ============================================================
// From a JSON Lines test file to padded tensor batches:
//
//   test.jsonl
//       │
//       ▼
//   JsonlLoader       → parses and validates RelationExamples
//       │
//       ▼
//   RelationDataset   → implements Burn's Dataset trait
//       │
//       ▼
//   RelationBatcher   → pads each batch to its longest row
//       │
//       ▼
//   DataLoader        → feeds batches to the evaluator
//
// Tokenisation happens upstream; examples arrive as token ids.
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads pre-tokenised examples from JSON Lines
pub mod loader;

/// Implements Burn's Dataset trait for relation examples
pub mod dataset;

/// Implements Burn's Batcher trait with dynamic padding
pub mod batcher;
