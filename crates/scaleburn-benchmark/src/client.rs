use std::sync::Arc;

use async_trait::async_trait;
use scaleburn_core::{ChatMessage, RequestOutcome, Result};

/// Response to a single chat completion call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    pub content: String,
    pub usage: RequestOutcome,
}

/// One request/response completion call against the target service.
///
/// Implementations own transport concerns such as timeouts and auth; the
/// runner never retries a failed call.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
        max_tokens: u32,
    ) -> Result<Completion>;
}

#[async_trait]
impl<T: CompletionClient + ?Sized> CompletionClient for Arc<T> {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
        max_tokens: u32,
    ) -> Result<Completion> {
        (**self).complete(messages, temperature, max_tokens).await
    }
}
