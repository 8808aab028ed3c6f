pub mod connection;
pub mod endpoints;
pub mod scripted;

use async_trait::async_trait;

pub use connection::{ApiConnectionError, ApiKey, ChatCompletionGateway, ProxyGateway};
pub use scripted::{ScriptedGateway, ScriptedReply};

/// One prompt in, one free-text completion out.
///
/// Implementations make a single attempt per call: no retries, no caching
/// and no timeout beyond what the transport itself enforces.
#[async_trait]
pub trait InferenceGateway: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, ApiConnectionError>;
}
