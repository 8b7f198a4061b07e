// ============================================================
// Layer 5: ML Layer (Burn)
// ============================================================
// Everything that touches tensors lives here, plus the pure
// metric code the evaluator feeds.
//
//   model.rs     RelationClassifier trait and the entity-marker
//                classifier used to exercise it
//
//   metrics.rs   precision / recall / F1 per class, macro and
//                support-weighted averages, text report
//                (plain Rust, no Burn types)
//
//   evaluator.rs the evaluation loop: logits → predictions,
//                ignore-label masking, aggregate results
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)

/// Relation classifier trait and model
pub mod model;

/// Classification metrics and report rendering
pub mod metrics;

/// Batch and full-loader evaluation
pub mod evaluator;
