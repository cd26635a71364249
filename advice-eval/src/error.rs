//! Stage-level error type

use crate::analysis::StatsError;
use crate::config::ConfigError;
use crate::process::SentimentError;
use crate::providers::ProviderError;
use crate::stance::StanceError;
use crate::table::TableError;

/// Any error a pipeline stage can surface to the CLI
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Sentiment(#[from] SentimentError),

    #[error(transparent)]
    Stats(#[from] StatsError),

    #[error(transparent)]
    Stance(#[from] StanceError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No columns matched {0}")]
    NoColumns(String),
}

pub type PipelineResult<T> = Result<T, PipelineError>;
