//! Response collection: build prompts from query rows and ask each model

pub mod collector;
pub mod progress;
pub mod prompt;

pub use collector::{
    error_marker, is_error_marker, response_column_name, GenerationParams, ModelCollection,
    ResponseCollector, ERROR_PREFIX, PROMPT_COLUMN,
};
pub use progress::{ConsoleProgress, NoOpProgress, ProgressCallback};
pub use prompt::{build_prompt, QueryRecord, QUERY_COLUMN};

use std::path::Path;

use crate::config::Config;
use crate::error::PipelineResult;
use crate::providers::LLMProvider;
use crate::table::Table;

/// Read `input`, query every model in `models`, write `output`
pub async fn run_collect(
    provider: &dyn LLMProvider,
    config: &Config,
    models: &[String],
    input: &Path,
    output: &Path,
    progress: impl ProgressCallback + 'static,
) -> PipelineResult<Vec<ModelCollection>> {
    let mut table = Table::read_csv(input)?;
    tracing::info!("Loaded {} queries from {}", table.len(), input.display());

    let collector = ResponseCollector::new(provider, GenerationParams::from(&config.generation))
        .with_persisted_prompts(config.generation.persist_prompts)
        .with_progress(progress);

    let summaries = collector.collect(&mut table, models).await?;

    table.write_csv(output)?;
    tracing::info!("Saved responses to {}", output.display());
    Ok(summaries)
}
