//! Batch command implementation

use crate::batch::{run_batch, write_results, BatchFile};
use crate::cli::BatchArgs;
use crate::config_loader;
use crate::errors;
use crate::output::OutputWriter;
use crate::output_types::BatchOutput;
use crate::progress;
use anyhow::Result;
use maintrag_core::config::LayeredConfig;

pub fn execute(args: BatchArgs, config: &LayeredConfig, output: &OutputWriter) -> Result<()> {
    let file = BatchFile::load(&args.file)
        .map_err(|e| errors::batch_file_invalid(&args.file.display().to_string(), &format!("{:#}", e)))?;

    let pipeline = config_loader::build_pipeline(config, false)?;

    let progress = if output.is_json() {
        progress::hidden()
    } else {
        progress::create_progress_bar(file.question_count() as u64, "Answering questions")
    };
    let results = run_batch(&pipeline, &file, &progress);
    progress::finish_success(&progress, "Batch complete");

    let (json_path, text_path) = write_results(&results, &args.out)?;
    let summary = &results.summary;

    if output.is_json() {
        output.result(BatchOutput {
            questions: summary.questions,
            answered: summary.answered,
            with_expectation: summary.with_expectation,
            matched: summary.matched,
            json_path: json_path.display().to_string(),
            text_path: text_path.display().to_string(),
        })?;
    } else {
        output.success(format!("Answered {} of {} questions", summary.answered, summary.questions));
        if summary.with_expectation > 0 {
            output.kv(
                "Matched expectations",
                format!("{}/{}", summary.matched, summary.with_expectation),
            );
        }
        output.kv("JSON results", json_path.display());
        output.kv("Text results", text_path.display());
    }

    Ok(())
}
