use async_trait::async_trait;

use crate::error::CompletionError;

/// A text-generation backend. No schema is enforced on the reply.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}
