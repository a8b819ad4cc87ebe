pub mod openai;
pub mod traits;

pub use openai::OpenAiCompatibleProvider;
pub use traits::{ChatMessage, ChatResponse, Provider, ToolCall};

use crate::config::ProviderConfig;
use crate::util::{scrub_credentials, truncate_with_ellipsis};

/// Max characters of an error body carried into operator-facing messages.
const MAX_API_ERROR_CHARS: usize = 300;

/// Scrub secrets from a provider error body and cap its length.
pub fn sanitize_api_error(input: &str) -> String {
    truncate_with_ellipsis(&scrub_credentials(input.trim()), MAX_API_ERROR_CHARS)
}

/// Build an error from a non-success provider response.
pub async fn api_error(provider: &str, response: reqwest::Response) -> anyhow::Error {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read provider error body>".to_string());
    anyhow::anyhow!("{provider} API error ({status}): {}", sanitize_api_error(&body))
}

/// Construct the configured chat completion provider.
pub fn create_provider(config: &ProviderConfig) -> anyhow::Result<Box<dyn Provider>> {
    Ok(Box::new(OpenAiCompatibleProvider::new(config)?))
}
