//! Sequential response collection against a chat provider

use std::fmt::Display;

use crate::config::GenerationConfig;
use crate::providers::{CompletionRequest, LLMProvider, Message};
use crate::table::{Table, TableResult};

use super::progress::{NoOpProgress, ProgressCallback};
use super::prompt::{build_prompt, QueryRecord};

/// Prefix that marks a failed request in a response cell
pub const ERROR_PREFIX: &str = "[Error]";

/// Column holding the built prompt when prompts are persisted
pub const PROMPT_COLUMN: &str = "full_prompt";

/// Name of the column holding `model`'s answers
pub fn response_column_name(model: &str) -> String {
    format!("{} response", model)
}

/// Inline sentinel recorded instead of a response when a request fails
pub fn error_marker(message: impl Display) -> String {
    format!("{}: {}", ERROR_PREFIX, message)
}

pub fn is_error_marker(text: &str) -> bool {
    text.starts_with(ERROR_PREFIX)
}

/// Sampling parameters sent with every request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 750,
        }
    }
}

impl From<&GenerationConfig> for GenerationParams {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

/// Outcome of collecting one model's column
#[derive(Debug, Clone, PartialEq)]
pub struct ModelCollection {
    pub model: String,
    pub column: String,
    pub rows: usize,
    pub failures: usize,
}

/// Queries each model once per row, in row order, with no retries.
///
/// A failed request never aborts the batch: it is recorded in the cell as
/// `"[Error]: <message>"`.
pub struct ResponseCollector<'a> {
    provider: &'a dyn LLMProvider,
    params: GenerationParams,
    progress: Box<dyn ProgressCallback + 'a>,
    persist_prompts: bool,
}

impl<'a> ResponseCollector<'a> {
    pub fn new(provider: &'a dyn LLMProvider, params: GenerationParams) -> Self {
        Self {
            provider,
            params,
            progress: Box::new(NoOpProgress),
            persist_prompts: false,
        }
    }

    pub fn with_progress(mut self, progress: impl ProgressCallback + 'a) -> Self {
        self.progress = Box::new(progress);
        self
    }

    /// Keep the built prompts in a `full_prompt` column
    pub fn with_persisted_prompts(mut self, persist: bool) -> Self {
        self.persist_prompts = persist;
        self
    }

    /// Send one prompt to `model` and return the answer or an error marker
    pub async fn query(&self, model: &str, prompt: &str) -> String {
        let request = CompletionRequest::new(vec![Message::user(prompt)], self.params.max_tokens)
            .with_model(model)
            .with_temperature(self.params.temperature);

        match self.provider.complete(&request).await {
            Ok(response) => {
                tracing::debug!(
                    "{} (served by {}) answered in {}ms ({} in / {} out tokens, finish={})",
                    model,
                    response.model,
                    response.latency_ms,
                    response.input_tokens,
                    response.output_tokens,
                    response.finish_reason
                );
                response.content
            }
            Err(e) => {
                tracing::warn!("Request to {} failed: {}", model, e);
                error_marker(e)
            }
        }
    }

    /// Prompts for every row. An existing `full_prompt` column is reused as-is.
    pub fn prompts_for(&self, table: &Table) -> TableResult<Vec<String>> {
        if table.has_column(PROMPT_COLUMN) {
            return Ok(table
                .column(PROMPT_COLUMN)?
                .into_iter()
                .map(str::to_string)
                .collect());
        }

        Ok(QueryRecord::from_table(table)?
            .iter()
            .map(build_prompt)
            .collect())
    }

    /// Append (or replace) one `<model> response` column per model
    pub async fn collect(&self, table: &mut Table, models: &[String]) -> TableResult<Vec<ModelCollection>> {
        let prompts = self.prompts_for(table)?;

        if self.persist_prompts && !table.has_column(PROMPT_COLUMN) {
            table.set_column(PROMPT_COLUMN, prompts.clone())?;
        }

        let mut summaries = Vec::with_capacity(models.len());

        for model in models {
            tracing::info!("Querying model: {}", model);
            self.progress.on_model_start(model, prompts.len());

            let mut responses = Vec::with_capacity(prompts.len());
            let mut failures = 0;

            for (row, prompt) in prompts.iter().enumerate() {
                let response = self.query(model, prompt).await;
                let ok = !is_error_marker(&response);
                if !ok {
                    failures += 1;
                }
                self.progress.on_row_complete(model, row, ok);
                responses.push(response);
            }

            let column = response_column_name(model);
            table.set_column(&column, responses)?;
            self.progress.on_model_complete(model, failures, prompts.len());

            summaries.push(ModelCollection {
                model: model.clone(),
                column,
                rows: prompts.len(),
                failures,
            });
        }

        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{CompletionResponse, ProviderError, ProviderResult};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Answers with the prompt length, fails whenever the prompt mentions "fail"
    struct EchoProvider {
        seen: Mutex<Vec<(String, Option<f32>, u32)>>,
    }

    #[async_trait]
    impl LLMProvider for EchoProvider {
        fn name(&self) -> &str {
            "echo"
        }

        fn default_model(&self) -> &str {
            "echo-1"
        }

        async fn complete(&self, request: &CompletionRequest) -> ProviderResult<CompletionResponse> {
            let prompt = request.messages[0].content.clone();
            self.seen.lock().unwrap().push((
                request.model.clone().unwrap_or_default(),
                request.temperature,
                request.max_tokens,
            ));
            if prompt.contains("fail") {
                return Err(ProviderError::Api {
                    status: 500,
                    message: "upstream exploded".to_string(),
                });
            }
            Ok(CompletionResponse {
                content: format!("answer of {} chars", prompt.len()),
                model: request.model.clone().unwrap_or_default(),
                input_tokens: 0,
                output_tokens: 0,
                finish_reason: "stop".to_string(),
                latency_ms: 1,
            })
        }
    }

    fn echo() -> EchoProvider {
        EchoProvider {
            seen: Mutex::new(Vec::new()),
        }
    }

    #[test]
    fn test_error_marker_shape() {
        let marker = error_marker("timeout");
        assert_eq!(marker, "[Error]: timeout");
        assert!(is_error_marker(&marker));
        assert!(!is_error_marker("Headaches have many causes."));
    }

    #[tokio::test]
    async fn test_failures_become_inline_markers_and_batch_continues() {
        let provider = echo();
        let collector = ResponseCollector::new(&provider, GenerationParams::default());

        let mut table = Table::new(["patient_query"]);
        table.push_row(["please fail"]);
        table.push_row(["What causes headaches?"]);

        let summary = collector
            .collect(&mut table, &["m1".to_string()])
            .await
            .unwrap();

        let col = table.column("m1 response").unwrap();
        assert_eq!(col[0], "[Error]: API error: 500 - upstream exploded");
        assert!(col[1].starts_with("answer of"));
        assert_eq!(summary[0].failures, 1);
        assert_eq!(summary[0].rows, 2);
    }

    #[tokio::test]
    async fn test_generation_params_are_forwarded() {
        let provider = echo();
        let params = GenerationParams {
            temperature: 0.2,
            max_tokens: 64,
        };
        let collector = ResponseCollector::new(&provider, params);
        collector.query("m2", "hello").await;

        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen[0], ("m2".to_string(), Some(0.2), 64));
    }

    #[tokio::test]
    async fn test_models_are_queried_in_order_and_rows_preserved() {
        let provider = echo();
        let collector = ResponseCollector::new(&provider, GenerationParams::default());

        let mut table = Table::new(["patient_query", "category"]);
        table.push_row(["a", "x"]);
        table.push_row(["b", "y"]);
        let original = table.clone();

        collector
            .collect(&mut table, &["m1".to_string(), "m2".to_string()])
            .await
            .unwrap();

        assert_eq!(table.headers(), &["patient_query", "category", "m1 response", "m2 response"]);
        assert_eq!(table.column("category").unwrap(), original.column("category").unwrap());
        let order: Vec<String> = provider.seen.lock().unwrap().iter().map(|s| s.0.clone()).collect();
        assert_eq!(order, vec!["m1", "m1", "m2", "m2"]);
    }

    #[tokio::test]
    async fn test_persisted_prompts_column() {
        let provider = echo();
        let collector = ResponseCollector::new(&provider, GenerationParams::default())
            .with_persisted_prompts(true);

        let mut table = Table::new(["patient_query"]);
        table.push_row(["Why?"]);
        collector.collect(&mut table, &[]).await.unwrap();

        let prompt = table.cell(0, PROMPT_COLUMN).unwrap();
        assert!(prompt.contains("Patient question: Why?"));
    }
}
