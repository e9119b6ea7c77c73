//! Question pools generated in concurrent batches over a completion client.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use tracing::instrument;

use certexam_core::error::GenerationError;
use certexam_core::model::FinalExamQuestion;
use certexam_core::traits::{
    CompletionClient, CompletionPrompt, GenerationRequest, QuestionPoolGenerator,
};

use crate::prompt::build_prompt;
use crate::response::parse_questions;

/// Largest batch requested in one completion call.
pub const MAX_BATCH_SIZE: u32 = 15;

const DEFAULT_PARALLELISM: usize = 2;
const DEFAULT_TEMPERATURE: f64 = 0.7;
const DEFAULT_MAX_TOKENS: u32 = 8192;

/// Split `total` into batches of at most `batch_size`.
pub fn batch_sizes(total: u32, batch_size: u32) -> Vec<u32> {
    let batch_size = batch_size.max(1);
    let mut sizes = Vec::with_capacity(total.div_ceil(batch_size) as usize);
    let mut remaining = total;
    while remaining > 0 {
        let n = remaining.min(batch_size);
        sizes.push(n);
        remaining -= n;
    }
    sizes
}

/// Generates a pool by asking a [`CompletionClient`] for several small
/// batches at once.
///
/// A batch that fails or cannot be parsed is skipped. The pool is only an
/// error when too few questions survive across all batches.
pub struct BatchedGenerator<C> {
    client: Arc<C>,
    batch_size: u32,
    parallelism: usize,
    temperature: f64,
    max_tokens: u32,
}

impl<C: CompletionClient + 'static> BatchedGenerator<C> {
    pub fn new(client: C) -> Self {
        Self::from_arc(Arc::new(client))
    }

    pub fn from_arc(client: Arc<C>) -> Self {
        Self {
            client,
            batch_size: MAX_BATCH_SIZE,
            parallelism: DEFAULT_PARALLELISM,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Batch size, clamped to `1..=MAX_BATCH_SIZE`.
    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = batch_size.clamp(1, MAX_BATCH_SIZE);
        self
    }

    /// Completion calls allowed in flight at once.
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    fn prompt(&self, request: &GenerationRequest, count: u32) -> CompletionPrompt {
        CompletionPrompt {
            system: None,
            prompt: build_prompt(request, count),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}

#[async_trait]
impl<C: CompletionClient + 'static> QuestionPoolGenerator for BatchedGenerator<C> {
    fn name(&self) -> &str {
        "batched"
    }

    #[instrument(skip(self, request), fields(skill = %request.skill_name, level = %request.level))]
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> anyhow::Result<Vec<FinalExamQuestion>> {
        let sizes = batch_sizes(request.question_count, self.batch_size);
        let semaphore = Arc::new(Semaphore::new(self.parallelism));

        let mut futures = FuturesUnordered::new();
        for (batch, count) in sizes.iter().copied().enumerate() {
            let client = Arc::clone(&self.client);
            let semaphore = Arc::clone(&semaphore);
            let prompt = self.prompt(request, count);
            futures.push(async move {
                let result = async {
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .map_err(|_| anyhow::anyhow!("semaphore closed"))?;
                    let text = client.complete(&prompt).await?;
                    Ok::<_, anyhow::Error>(parse_questions(&text)?)
                }
                .await;
                (batch, result)
            });
        }

        let mut batches: Vec<(usize, Vec<FinalExamQuestion>)> = Vec::with_capacity(sizes.len());
        let mut rate_limit: Option<u64> = None;
        while let Some((batch, result)) = futures.next().await {
            match result {
                Ok(questions) => {
                    tracing::debug!(batch, questions = questions.len(), "batch generated");
                    batches.push((batch, questions));
                }
                Err(e) => {
                    if let Some(gen_err) = e.downcast_ref::<GenerationError>() {
                        if gen_err.is_permanent() {
                            return Err(e);
                        }
                        if let Some(ms) = gen_err.retry_after_ms() {
                            rate_limit = Some(rate_limit.map_or(ms, |r| r.max(ms)));
                        }
                    }
                    tracing::warn!(batch, "skipping failed generation batch: {e:#}");
                }
            }
        }

        // Keep batch order stable regardless of completion order.
        batches.sort_by_key(|(batch, _)| *batch);
        let questions: Vec<FinalExamQuestion> =
            batches.into_iter().flat_map(|(_, qs)| qs).collect();

        let required = request.min_questions as usize;
        if questions.len() < required {
            if let (true, Some(retry_after_ms)) = (questions.is_empty(), rate_limit) {
                return Err(GenerationError::RateLimited { retry_after_ms }.into());
            }
            return Err(GenerationError::InsufficientPool {
                available: questions.len(),
                required,
            }
            .into());
        }

        tracing::info!(
            questions = questions.len(),
            batches = sizes.len(),
            "generated question pool"
        );
        Ok(questions)
    }
}
