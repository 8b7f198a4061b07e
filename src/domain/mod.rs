// ============================================================
// Layer 3: Domain Layer
// ============================================================
// Plain Rust structs and traits describing relation
// classification data. Nothing in here touches Burn, the
// filesystem layout of checkpoints, or tensors.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO checkpoint or results file handling
//   - Only plain Rust structs, enums, and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// A labelled, pre-tokenised relation example
pub mod relation;

// Relation name <-> class id mapping
pub mod relation_map;

// Core abstractions (traits) that other layers implement
pub mod traits;

/// Label value that marks a row as unscored.
/// Evaluation drops these rows before comparing predictions.
pub const IGNORE_INDEX: i64 = -1;
