// ============================================================
// Layer 2: ResultsUseCase
// ============================================================
// Loads the cached per-epoch history and, if asked, exports it
// as CSV. Printing is left to the CLI layer.

use anyhow::Result;
use std::path::PathBuf;

use crate::infra::results::ResultsBuffer;

pub struct ResultsUseCase {
    data_dir: PathBuf,
    model_no: usize,
}

impl ResultsUseCase {
    pub fn new(data_dir: impl Into<PathBuf>, model_no: usize) -> Self {
        Self { data_dir: data_dir.into(), model_no }
    }

    pub fn execute(&self, csv: Option<&PathBuf>) -> Result<ResultsBuffer> {
        let buffer = ResultsBuffer::load(&self.data_dir, self.model_no)?;
        if buffer.is_empty() {
            tracing::warn!("No results recorded for model {}", self.model_no);
        }

        if let Some(path) = csv {
            buffer.write_csv(path)?;
            tracing::info!("History exported to '{}'", path.display());
        }
        Ok(buffer)
    }
}
