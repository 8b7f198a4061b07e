// ============================================================
// Layer 3: Relation Map
// ============================================================
// Maps relation names to the class ids the classifier emits.
// Stored on disk as a flat JSON object:
//
//   { "Other": 0, "Cause-Effect(e1,e2)": 1, ... }
//
// Only used for presentation: the classification report can
// print "Cause-Effect(e1,e2)" instead of "1".

use anyhow::{bail, Context, Result};
use std::{collections::BTreeMap, fs, path::Path};

/// Class id -> relation name, for labelling report rows.
#[derive(Debug, Clone, Default)]
pub struct RelationMap {
    id_to_name: BTreeMap<i64, String>,
}

impl RelationMap {
    /// Build from (name, id) pairs.
    /// Two names claiming the same id is an error.
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, i64)>,
        S: Into<String>,
    {
        let mut id_to_name = BTreeMap::new();
        for (name, id) in pairs {
            let name = name.into();
            if let Some(prev) = id_to_name.insert(id, name.clone()) {
                bail!("relations '{prev}' and '{name}' share id {id}");
            }
        }
        Ok(Self { id_to_name })
    }

    /// Load a `{"name": id}` JSON object from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("Cannot read relation map '{}'", path.display()))?;
        let raw: BTreeMap<String, i64> = serde_json::from_str(&json)
            .with_context(|| format!("Invalid relation map JSON in '{}'", path.display()))?;
        let map = Self::from_pairs(raw)?;
        tracing::debug!("Loaded {} relations from '{}'", map.len(), path.display());
        Ok(map)
    }

    pub fn name(&self, id: i64) -> Option<&str> {
        self.id_to_name.get(&id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.id_to_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_name.is_empty()
    }
}
