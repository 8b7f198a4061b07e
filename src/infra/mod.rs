// ============================================================
// Layer 6: Infrastructure Layer
// ============================================================
// Everything that persists training state between runs:
//
//   checkpoint.rs  latest/best checkpoint slots. Model,
//                  optimizer and scheduler records via Burn's
//                  CompactRecorder, plus epoch / best score /
//                  amp bookkeeping and the model config JSON
//
//   results.rs     per-epoch loss, accuracy and F1 history
//                  cached as JSON, with CSV export
//
// Reference: Burn Book §5 (Checkpointing)
//            Rust Book §9 (Error Handling with anyhow)

/// Checkpoint saving and resuming
pub mod checkpoint;

/// Cached per-epoch results
pub mod results;
