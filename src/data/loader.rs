// ============================================================
// Layer 4: JSONL Example Loader
// ============================================================
// Reads pre-tokenised relation examples, one JSON object per
// line:
//
//   {"token_ids": [101, 1, 2034, 2, ...], "e1_e2_start": [1, 6], "label": 3}
//
// Blank lines are skipped. Any malformed line fails the whole
// load with its line number, because silently dropping test
// rows would change the reported metrics.
//
// Reference: serde_json crate documentation
//            Rust Book §9 (Error Handling)

use anyhow::{bail, Context, Result};
use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::PathBuf,
};

use crate::domain::relation::RelationExample;
use crate::domain::traits::ExampleSource;

/// Loads relation examples from a JSON Lines file.
pub struct JsonlLoader {
    path: PathBuf,
}

impl JsonlLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ExampleSource for JsonlLoader {
    fn load_all(&self) -> Result<Vec<RelationExample>> {
        let file = File::open(&self.path)
            .with_context(|| format!("Cannot open examples file '{}'", self.path.display()))?;

        let mut examples = Vec::new();

        for (i, line) in BufReader::new(file).lines().enumerate() {
            let line_no = i + 1;
            let line = line.with_context(|| {
                format!("Cannot read line {line_no} of '{}'", self.path.display())
            })?;
            if line.trim().is_empty() {
                continue;
            }

            let example: RelationExample = serde_json::from_str(&line).with_context(|| {
                format!("Malformed example on line {line_no} of '{}'", self.path.display())
            })?;

            if example.is_empty() {
                bail!("Example on line {line_no} has no tokens");
            }
            if !example.markers_in_bounds() {
                bail!(
                    "Example on line {line_no}: entity markers {:?} outside {} tokens",
                    example.e1_e2_start,
                    example.len()
                );
            }

            examples.push(example);
        }

        tracing::info!(
            "Loaded {} examples from '{}' ({} scored)",
            examples.len(),
            self.path.display(),
            examples.iter().filter(|e| e.is_scored()).count()
        );
        Ok(examples)
    }
}
