// ============================================================
// Layer 2: EvaluateUseCase
// ============================================================
// Scores a saved classifier on a held-out test file:
//
//   Step 1: Load test examples          (Layer 4 - data)
//   Step 2: Rebuild model from config   (Layer 6 - infra)
//   Step 3: Restore checkpoint weights  (Layer 6 - infra)
//   Step 4: Build the data loader       (Layer 4 - data)
//   Step 5: Run the evaluation loop     (Layer 5 - ml)
//   Step 6: Optionally write results    (JSON)
//
// Reference: Burn Book §5 (Inference)

use anyhow::{bail, Context, Result};
use burn::{data::dataloader::DataLoaderBuilder, prelude::*};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

use crate::data::{batcher::RelationBatcher, dataset::RelationDataset, loader::JsonlLoader};
use crate::domain::{
    relation::RelationExample, relation_map::RelationMap, traits::ExampleSource, IGNORE_INDEX,
};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::evaluator::{evaluate_results, EvalResults};
use crate::ml::model::{EntityMarkerClassifier, RelationClassifierConfig};

type CpuBackend = burn::backend::NdArray;
type GpuBackend = burn::backend::Wgpu;

// ─── Evaluation Configuration ────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalConfig {
    pub data_dir:   PathBuf,
    pub model_no:   usize,
    pub test_file:  PathBuf,
    pub batch_size: usize,
    pub pad_id:     u32,
    pub load_best:  bool,
    pub gpu:        bool,
    pub relations:  Option<PathBuf>,
    pub output:     Option<PathBuf>,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            data_dir:   PathBuf::from("./data/"),
            model_no:   0,
            test_file:  PathBuf::from("./data/test.jsonl"),
            batch_size: 32,
            pad_id:     0,
            load_best:  false,
            gpu:        false,
            relations:  None,
            output:     None,
        }
    }
}

pub struct EvaluateUseCase {
    config: EvalConfig,
}

impl EvaluateUseCase {
    pub fn new(config: EvalConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<EvalResults> {
        let results = if self.config.gpu {
            let device = burn::backend::wgpu::WgpuDevice::default();
            tracing::info!("Using WGPU device: {:?}", device);
            self.run::<GpuBackend>(device)?
        } else {
            self.run::<CpuBackend>(Default::default())?
        };

        if let Some(path) = &self.config.output {
            fs::write(path, serde_json::to_string_pretty(&results)?)
                .with_context(|| format!("Cannot write results to '{}'", path.display()))?;
            tracing::info!("Results written to '{}'", path.display());
        }

        Ok(results)
    }

    fn run<B: Backend>(&self, device: B::Device) -> Result<EvalResults> {
        let cfg = &self.config;

        if cfg.batch_size == 0 {
            bail!("Batch size must be at least 1");
        }

        // ── Step 1: Load test examples ───────────────────────────────────────
        let examples = JsonlLoader::new(&cfg.test_file).load_all()?;
        let names = cfg.relations.as_ref().map(|p| RelationMap::load(p)).transpose()?;

        // ── Step 2: Rebuild the model architecture ───────────────────────────
        let ckpt      = CheckpointManager::new(&cfg.data_dir, cfg.model_no);
        let model_cfg = ckpt.load_config()?;
        check_inputs(&examples, cfg.pad_id, &model_cfg)?;
        let model: EntityMarkerClassifier<B> = model_cfg.init(&device);

        let dataset = RelationDataset::new(examples);
        tracing::info!("Test set: {} scored examples", dataset.scored_count());

        // ── Step 3: Restore weights ──────────────────────────────────────────
        let (model, state) = ckpt.load_model::<B, _>(model, cfg.load_best, &device)?;
        match state.source {
            Some(kind) => tracing::info!(
                "Evaluating {:?} checkpoint from epoch {} (best score {:.4})",
                kind, state.start_epoch, state.best_pred
            ),
            None => tracing::warn!(
                "No checkpoint for model {} in '{}', evaluating untrained weights",
                cfg.model_no,
                cfg.data_dir.display()
            ),
        }

        // ── Step 4: Data loader ──────────────────────────────────────────────
        let batcher = RelationBatcher::<B>::new(device, cfg.pad_id);
        let loader  = DataLoaderBuilder::new(batcher)
            .batch_size(cfg.batch_size)
            .num_workers(1)
            .build(dataset);

        // ── Step 5: Evaluate ─────────────────────────────────────────────────
        evaluate_results(&model, loader.iter(), cfg.pad_id, IGNORE_INDEX, names.as_ref())
    }
}

/// Reject token ids the model cannot embed and labels it cannot score.
fn check_inputs(
    examples:  &[RelationExample],
    pad_id:    u32,
    model_cfg: &RelationClassifierConfig,
) -> Result<()> {
    let vocab = model_cfg.vocab_size;
    if pad_id as usize >= vocab {
        bail!("Pad id {pad_id} is outside the model vocabulary of {vocab} tokens");
    }

    let classes = 0..model_cfg.num_classes as i64;
    for (i, example) in examples.iter().enumerate() {
        if let Some(&id) = example.token_ids.iter().find(|&&id| id as usize >= vocab) {
            bail!(
                "Test example {}: token id {id} is outside the model vocabulary of {vocab} tokens",
                i + 1
            );
        }
        if example.is_scored() && !classes.contains(&example.label) {
            bail!(
                "Test example {}: label {} is not one of the model's {} classes",
                i + 1,
                example.label,
                model_cfg.num_classes
            );
        }
    }
    Ok(())
}
