//! Mock collaborators for testing.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use certexam_core::error::GenerationError;
use certexam_core::model::FinalExamQuestion;
use certexam_core::traits::{
    CompletionClient, CompletionPrompt, GenerationRequest, QuestionPoolGenerator,
};

/// A completion client that answers from canned text.
///
/// Queued failures are returned first, one per call. After that the
/// response is picked by prompt substring, or the default.
pub struct MockCompletionClient {
    /// Map of prompt substring → response text.
    responses: HashMap<String, String>,
    default_response: String,
    failures: Mutex<VecDeque<GenerationError>>,
    call_count: AtomicU32,
    last_prompt: Mutex<Option<CompletionPrompt>>,
}

impl MockCompletionClient {
    pub fn new(responses: HashMap<String, String>) -> Self {
        Self {
            responses,
            default_response: r#"{"questions": []}"#.to_string(),
            failures: Mutex::new(VecDeque::new()),
            call_count: AtomicU32::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    /// A client that always returns `response`.
    pub fn with_fixed_response(response: &str) -> Self {
        let mut client = Self::new(HashMap::new());
        client.default_response = response.to_string();
        client
    }

    /// Fail the next call with `error`. Failures queue up in order.
    pub fn fail_next(&self, error: GenerationError) {
        self.failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(error);
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    pub fn last_prompt(&self) -> Option<CompletionPrompt> {
        self.last_prompt
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl CompletionClient for MockCompletionClient {
    async fn complete(&self, prompt: &CompletionPrompt) -> anyhow::Result<String> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        *self.last_prompt.lock().unwrap_or_else(|e| e.into_inner()) = Some(prompt.clone());

        let failure = self
            .failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        if let Some(error) = failure {
            return Err(error.into());
        }

        Ok(self
            .responses
            .iter()
            .find(|(key, _)| prompt.prompt.contains(key.as_str()))
            .map(|(_, v)| v.clone())
            .unwrap_or_else(|| self.default_response.clone()))
    }
}

/// A generator that hands back a fixed pool, optionally failing first.
pub struct MockGenerator {
    pool: Vec<FinalExamQuestion>,
    failures: Mutex<VecDeque<GenerationError>>,
    call_count: AtomicU32,
    last_request: Mutex<Option<GenerationRequest>>,
}

impl MockGenerator {
    pub fn new(pool: Vec<FinalExamQuestion>) -> Self {
        Self {
            pool,
            failures: Mutex::new(VecDeque::new()),
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Fail the next call with `error`. Failures queue up in order.
    pub fn fail_next(&self, error: GenerationError) {
        self.failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(error);
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    pub fn last_request(&self) -> Option<GenerationRequest> {
        self.last_request
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl QuestionPoolGenerator for MockGenerator {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> anyhow::Result<Vec<FinalExamQuestion>> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        *self.last_request.lock().unwrap_or_else(|e| e.into_inner()) = Some(request.clone());

        let failure = self
            .failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        match failure {
            Some(error) => Err(error.into()),
            None => Ok(self.pool.clone()),
        }
    }
}
