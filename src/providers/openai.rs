use crate::config::{ProviderConfig, ProviderKind};
use crate::providers::traits::{ChatMessage, ChatResponse, Provider, ToolCall};
use crate::tools::traits::ToolSpec;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// `OpenAI`-dialect chat completions client with native function calling.
///
/// Also serves Azure `OpenAI` deployments, which differ only in URL shape,
/// auth header and the `api-version` query parameter.
pub struct OpenAiCompatibleProvider {
    name: &'static str,
    url: String,
    auth: ProviderAuth,
    client: Client,
}

enum ProviderAuth {
    Bearer(String),
    AzureApiKey(String),
}

#[derive(Debug, Serialize)]
struct NativeChatRequest<'a> {
    model: &'a str,
    messages: Vec<NativeMessage>,
    temperature: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<NativeToolSpec<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
}

#[derive(Debug, Serialize)]
struct NativeMessage {
    role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<NativeToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct NativeToolSpec<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: NativeFunctionSpec<'a>,
}

#[derive(Debug, Serialize)]
struct NativeFunctionSpec<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct NativeToolCall {
    #[serde(default)]
    id: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    function: NativeFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct NativeFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct NativeChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<NativeToolCall>>,
}

impl OpenAiCompatibleProvider {
    pub fn new(config: &ProviderConfig) -> anyhow::Result<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Chat completion API key not configured. Set DIRCHAT_API_KEY or [provider].api_key."
                )
            })?
            .to_string();

        let endpoint = config.endpoint.trim_end_matches('/');
        if endpoint.is_empty() {
            anyhow::bail!("Chat completion endpoint not configured. Set DIRCHAT_ENDPOINT or [provider].endpoint.");
        }

        let (name, url, auth) = match config.kind {
            ProviderKind::Openai => (
                "openai",
                format!("{endpoint}/chat/completions"),
                ProviderAuth::Bearer(api_key),
            ),
            ProviderKind::AzureOpenai => {
                let deployment = config.deployment.as_deref().unwrap_or(&config.model);
                (
                    "azure-openai",
                    format!(
                        "{endpoint}/openai/deployments/{deployment}/chat/completions?api-version={}",
                        config.api_version
                    ),
                    ProviderAuth::AzureApiKey(api_key),
                )
            }
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            name,
            url,
            auth,
            client,
        })
    }

    fn convert_messages(messages: &[ChatMessage]) -> Vec<NativeMessage> {
        messages
            .iter()
            .map(|message| match message {
                ChatMessage::System { content } | ChatMessage::User { content } => NativeMessage {
                    role: message.role(),
                    content: Some(content.clone()),
                    tool_calls: None,
                    tool_call_id: None,
                },
                ChatMessage::Assistant {
                    content,
                    tool_calls,
                } => NativeMessage {
                    role: "assistant",
                    content: content.clone(),
                    tool_calls: (!tool_calls.is_empty()).then(|| {
                        tool_calls
                            .iter()
                            .map(|call| NativeToolCall {
                                id: Some(call.id.clone()),
                                kind: Some("function".into()),
                                function: NativeFunctionCall {
                                    name: call.name.clone(),
                                    arguments: call.arguments.clone(),
                                },
                            })
                            .collect()
                    }),
                    tool_call_id: None,
                },
                ChatMessage::Tool {
                    tool_call_id,
                    content,
                } => NativeMessage {
                    role: "tool",
                    content: Some(content.clone()),
                    tool_calls: None,
                    tool_call_id: Some(tool_call_id.clone()),
                },
            })
            .collect()
    }

    fn convert_tools(tools: &[ToolSpec]) -> Vec<NativeToolSpec<'_>> {
        tools
            .iter()
            .map(|tool| NativeToolSpec {
                kind: "function",
                function: NativeFunctionSpec {
                    name: &tool.name,
                    description: &tool.description,
                    parameters: &tool.parameters,
                },
            })
            .collect()
    }

    fn parse_response(response: NativeChatResponse) -> anyhow::Result<ChatResponse> {
        let message = response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| anyhow::anyhow!("No choices in chat completion response"))?;

        let tool_calls = message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(index, call)| ToolCall {
                id: call
                    .id
                    .filter(|id| !id.is_empty())
                    .unwrap_or_else(|| format!("call_{index}")),
                name: call.function.name,
                arguments: call.function.arguments,
            })
            .collect();

        Ok(ChatResponse {
            text: message.content.filter(|text| !text.is_empty()),
            tool_calls,
        })
    }
}

#[async_trait]
impl Provider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        self.name
    }

    async fn chat_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
        model: &str,
        temperature: f64,
    ) -> anyhow::Result<ChatResponse> {
        let request = NativeChatRequest {
            model,
            messages: Self::convert_messages(messages),
            temperature,
            tools: Self::convert_tools(tools),
            tool_choice: (!tools.is_empty()).then_some("auto"),
        };

        let builder = self.client.post(&self.url).json(&request);
        let builder = match &self.auth {
            ProviderAuth::Bearer(key) => builder.bearer_auth(key),
            ProviderAuth::AzureApiKey(key) => builder.header("api-key", key),
        };

        let response = builder.send().await?;
        if !response.status().is_success() {
            return Err(super::api_error(self.name, response).await);
        }

        let native: NativeChatResponse = response.json().await?;
        Self::parse_response(native)
    }
}
