// ============================================================
// Layer 3: Core Traits (Abstractions)
// ============================================================
// The application layer loads examples through this trait so
// it never needs to know the on-disk format. JsonlLoader is
// the only implementation today.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;

use crate::domain::relation::RelationExample;

// ─── ExampleSource ────────────────────────────────────────────────────────────
/// Any component that can produce labelled relation examples.
pub trait ExampleSource {
    /// Load every available example from this source
    fn load_all(&self) -> Result<Vec<RelationExample>>;
}
