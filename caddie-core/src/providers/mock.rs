//! Scripted provider for tests and offline runs.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use super::GenerationProvider;
use crate::error::GenerationError;
use crate::types::ProviderId;

/// A provider that replays queued outcomes instead of calling a service.
///
/// Queued replies and errors are returned in order. Once the queue is empty
/// the default reply is used, if one was set; otherwise the call fails with
/// `GenerationError::EmptyReply`. An optional delay makes each call take
/// that long before it answers.
pub struct MockProvider {
    id: ProviderId,
    model: String,
    queue: Mutex<VecDeque<Result<String, GenerationError>>>,
    default_reply: Option<String>,
    delay: Option<Duration>,
    prompts: Mutex<Vec<String>>,
    completed: AtomicUsize,
}

impl MockProvider {
    pub fn new(id: ProviderId) -> Self {
        Self {
            id,
            model: "mock-model".to_string(),
            queue: Mutex::new(VecDeque::new()),
            default_reply: None,
            delay: None,
            prompts: Mutex::new(Vec::new()),
            completed: AtomicUsize::new(0),
        }
    }

    /// A provider that always answers with `text`.
    pub fn with_response(id: ProviderId, text: &str) -> Self {
        Self {
            default_reply: Some(text.to_string()),
            ..Self::new(id)
        }
    }

    /// Wait `delay` inside every call before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn queue_reply(&self, text: &str) {
        lock(&self.queue).push_back(Ok(text.to_string()));
    }

    pub fn queue_error(&self, err: GenerationError) {
        lock(&self.queue).push_back(Err(err));
    }

    /// Every prompt received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }

    /// Calls that have run to the end, whatever their outcome.
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[async_trait]
impl GenerationProvider for MockProvider {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        lock(&self.prompts).push(prompt.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = lock(&self.queue).pop_front();
        let outcome = match next {
            Some(outcome) => outcome,
            None => self
                .default_reply
                .clone()
                .ok_or_else(|| GenerationError::EmptyReply {
                    provider: self.id.to_string(),
                }),
        };
        self.completed.fetch_add(1, Ordering::SeqCst);
        outcome
    }

    fn provider_id(&self) -> ProviderId {
        self.id
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
