// ============================================================
// Layer 1: CLI / Presentation Layer
// ============================================================
// Parses arguments with clap and routes to Layer 2. The only
// printing in the crate happens here.
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EvaluateArgs, ResultsArgs};

#[derive(Parser, Debug)]
#[command(
    name = "relex-train",
    version,
    about = "Checkpoint, result-buffer and evaluation tooling for a relation classifier."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Evaluate(args) => run_evaluate(args),
            Commands::Results(args)  => run_results(args),
        }
    }
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    use crate::application::evaluate_use_case::EvaluateUseCase;

    tracing::info!("Evaluating model {} on '{}'", args.model_no, args.test_file.display());

    let results = EvaluateUseCase::new(args.into()).execute()?;

    println!("accuracy  = {:.4}", results.accuracy);
    println!("precision = {:.4}", results.precision);
    println!("recall    = {:.4}", results.recall);
    println!("f1        = {:.4}", results.f1);
    println!("\n{}", results.report);
    Ok(())
}

fn run_results(args: ResultsArgs) -> Result<()> {
    use crate::application::results_use_case::ResultsUseCase;

    let buffer = ResultsUseCase::new(args.data_dir, args.model_no).execute(args.csv.as_ref())?;
    if buffer.is_empty() {
        println!("No results recorded for model {}.", args.model_no);
        return Ok(());
    }

    println!("{:>5} | {:>10} | {:>10} | {:>10}", "epoch", "loss", "accuracy", "f1");
    for i in 0..buffer.epochs() {
        println!(
            "{:>5} | {:>10.4} | {:>10.4} | {:>10.4}",
            i + 1,
            buffer.losses_per_epoch[i],
            buffer.accuracy_per_epoch[i],
            buffer.f1_per_epoch[i],
        );
    }
    if let Some((epoch, f1)) = buffer.best_f1() {
        println!("Best F1 {:.4} at epoch {}", f1, epoch);
    }
    Ok(())
}
