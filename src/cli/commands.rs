// ============================================================
// Layer 1: CLI Commands and Arguments
// ============================================================
// Two subcommands: `evaluate` and `results`.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{builder::RangedU64ValueParser, Args, Subcommand};
use std::path::PathBuf;

use crate::application::evaluate_use_case::EvalConfig;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Score a saved checkpoint on a JSONL test file
    Evaluate(EvaluateArgs),

    /// Show the cached per-epoch loss / accuracy / F1 history
    Results(ResultsArgs),
}

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Directory holding checkpoints, model configs and result buffers
    #[arg(long, default_value = "./data/")]
    pub data_dir: PathBuf,

    /// Model number used in checkpoint and result file names
    #[arg(long, default_value_t = 0)]
    pub model_no: usize,

    /// Pre-tokenised test examples, one JSON object per line
    #[arg(long)]
    pub test_file: PathBuf,

    /// Examples per batch, at least 1
    #[arg(long, default_value_t = 32, value_parser = RangedU64ValueParser::<usize>::new().range(1..))]
    pub batch_size: usize,

    /// Token id used for padding; masked out of attention
    #[arg(long, default_value_t = 0)]
    pub pad_id: u32,

    /// Prefer the best checkpoint over the latest one
    #[arg(long)]
    pub best: bool,

    /// Run on the GPU (wgpu) instead of the CPU
    #[arg(long)]
    pub gpu: bool,

    /// JSON object mapping relation names to class ids, for the report
    #[arg(long)]
    pub relations: Option<PathBuf>,

    /// Write the results as JSON to this file
    #[arg(long)]
    pub output: Option<PathBuf>,
}

/// The application layer never sees clap types.
impl From<EvaluateArgs> for EvalConfig {
    fn from(a: EvaluateArgs) -> Self {
        EvalConfig {
            data_dir:   a.data_dir,
            model_no:   a.model_no,
            test_file:  a.test_file,
            batch_size: a.batch_size,
            pad_id:     a.pad_id,
            load_best:  a.best,
            gpu:        a.gpu,
            relations:  a.relations,
            output:     a.output,
        }
    }
}

#[derive(Args, Debug)]
pub struct ResultsArgs {
    #[arg(long, default_value = "./data/")]
    pub data_dir: PathBuf,

    #[arg(long, default_value_t = 0)]
    pub model_no: usize,

    /// Also export the history to this CSV file
    #[arg(long)]
    pub csv: Option<PathBuf>,
}
