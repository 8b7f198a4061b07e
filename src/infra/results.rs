// ============================================================
// Layer 6: Results Buffer
// ============================================================
// Per-epoch training history, cached on disk so a resumed run
// keeps its learning curves.
//
// Files (one JSON array each) for model number n:
//   data/task_test_losses_per_epoch_{n}.json
//   data/task_train_accuracy_per_epoch_{n}.json
//   data/task_test_f1_per_epoch_{n}.json
//
// The three lists are only loaded together. If any file is
// missing the buffer starts empty, so the lists can never drift
// out of step with each other.
//
// write_csv() exports the history for plotting:
//   epoch,loss,accuracy,f1
//   1,0.912300,0.610000,0.580000
//   2,0.701200,0.680000,0.650000
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

const LOSSES:   &str = "task_test_losses_per_epoch";
const ACCURACY: &str = "task_train_accuracy_per_epoch";
const F1:       &str = "task_test_f1_per_epoch";

/// Loss, accuracy and F1 history, one entry per epoch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultsBuffer {
    pub losses_per_epoch:   Vec<f64>,
    pub accuracy_per_epoch: Vec<f64>,
    pub f1_per_epoch:       Vec<f64>,
}

fn buffer_path(dir: &Path, stem: &str, model_no: usize) -> PathBuf {
    dir.join(format!("{stem}_{model_no}.json"))
}

fn read_series(path: &Path) -> Result<Vec<f64>> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Cannot read results file '{}'", path.display()))?;
    serde_json::from_str(&json)
        .with_context(|| format!("Corrupt results file '{}'", path.display()))
}

fn write_series(path: &Path, values: &[f64]) -> Result<()> {
    fs::write(path, serde_json::to_string(values)?)
        .with_context(|| format!("Cannot write results file '{}'", path.display()))
}

impl ResultsBuffer {
    /// Load the cached history, or start empty if any file is missing.
    pub fn load(dir: impl AsRef<Path>, model_no: usize) -> Result<Self> {
        let dir = dir.as_ref();
        let losses   = buffer_path(dir, LOSSES, model_no);
        let accuracy = buffer_path(dir, ACCURACY, model_no);
        let f1       = buffer_path(dir, F1, model_no);

        if !(losses.is_file() && accuracy.is_file() && f1.is_file()) {
            tracing::debug!("No complete results buffer for model {}", model_no);
            return Ok(Self::default());
        }

        let buffer = Self {
            losses_per_epoch:   read_series(&losses)?,
            accuracy_per_epoch: read_series(&accuracy)?,
            f1_per_epoch:       read_series(&f1)?,
        };
        tracing::info!("Loaded results buffer");
        Ok(buffer)
    }

    /// Write all three lists
    pub fn save(&self, dir: impl AsRef<Path>, model_no: usize) -> Result<()> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create data dir '{}'", dir.display()))?;

        write_series(&buffer_path(dir, LOSSES, model_no), &self.losses_per_epoch)?;
        write_series(&buffer_path(dir, ACCURACY, model_no), &self.accuracy_per_epoch)?;
        write_series(&buffer_path(dir, F1, model_no), &self.f1_per_epoch)?;

        tracing::debug!("Saved results buffer ({} epochs)", self.epochs());
        Ok(())
    }

    /// Append one epoch's numbers
    pub fn push_epoch(&mut self, loss: f64, accuracy: f64, f1: f64) {
        self.losses_per_epoch.push(loss);
        self.accuracy_per_epoch.push(accuracy);
        self.f1_per_epoch.push(f1);
    }

    /// Number of complete epochs recorded
    pub fn epochs(&self) -> usize {
        self.losses_per_epoch
            .len()
            .min(self.accuracy_per_epoch.len())
            .min(self.f1_per_epoch.len())
    }

    pub fn is_empty(&self) -> bool {
        self.epochs() == 0
    }

    /// (1-based epoch, f1) of the best F1 so far
    pub fn best_f1(&self) -> Option<(usize, f64)> {
        self.f1_per_epoch
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, f)| !f.is_nan())
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, f)| (i + 1, f))
    }

    /// Export the history as CSV with six decimals per value.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if self.losses_per_epoch.len() != self.epochs()
            || self.accuracy_per_epoch.len() != self.epochs()
        {
            bail!("Results buffer lists have different lengths; refusing to export");
        }

        let mut f = fs::File::create(path)
            .with_context(|| format!("Cannot create CSV '{}'", path.display()))?;
        writeln!(f, "epoch,loss,accuracy,f1")?;
        for i in 0..self.epochs() {
            writeln!(
                f,
                "{},{:.6},{:.6},{:.6}",
                i + 1,
                self.losses_per_epoch[i],
                self.accuracy_per_epoch[i],
                self.f1_per_epoch[i],
            )?;
        }

        tracing::debug!("Wrote {} epochs to '{}'", self.epochs(), path.display());
        Ok(())
    }
}
