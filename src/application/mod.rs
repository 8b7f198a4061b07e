// ============================================================
// Layer 2: Application / Use Cases
// ============================================================
// Workflow coordination only: no tensor math, no printing,
// no file formats. Each use case wires Layers 4–6 together.
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// Score a checkpoint on a test file
pub mod evaluate_use_case;

// Inspect and export the cached training history
pub mod results_use_case;
