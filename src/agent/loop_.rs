use crate::observability::{Observer, ObserverEvent};
use crate::providers::{sanitize_api_error, ChatMessage, Provider};
use crate::tools::{ToolInvoker, ToolSpec};
use std::sync::Arc;
use std::time::Instant;

/// Completion round trips allowed per user turn.
pub const DEFAULT_MAX_TOOL_ITERATIONS: usize = 10;

/// How a user turn ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The model produced a final text answer.
    Answered(String),
    /// Every round trip asked for more tool calls.
    IterationLimit { iterations: usize },
    /// The completion call itself failed; the turn was abandoned.
    Failed(String),
}

/// Per-session settings for a [`Conversation`].
#[derive(Debug, Clone)]
pub struct ConversationOptions {
    pub system_prompt: String,
    pub model: String,
    pub temperature: f64,
    /// Zero falls back to [`DEFAULT_MAX_TOOL_ITERATIONS`].
    pub max_tool_iterations: usize,
}

/// One chat session: the append-only history plus everything a turn needs.
pub struct Conversation {
    provider: Box<dyn Provider>,
    invoker: ToolInvoker,
    tool_specs: Vec<ToolSpec>,
    observer: Arc<dyn Observer>,
    model: String,
    temperature: f64,
    max_tool_iterations: usize,
    history: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new(
        provider: Box<dyn Provider>,
        invoker: ToolInvoker,
        observer: Arc<dyn Observer>,
        options: ConversationOptions,
    ) -> Self {
        let tool_specs = invoker.specs();
        let max_tool_iterations = if options.max_tool_iterations == 0 {
            DEFAULT_MAX_TOOL_ITERATIONS
        } else {
            options.max_tool_iterations
        };
        Self {
            provider,
            invoker,
            tool_specs,
            observer,
            model: options.model,
            temperature: options.temperature,
            max_tool_iterations,
            history: vec![ChatMessage::system(options.system_prompt)],
        }
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Run one user turn until a final answer, the iteration limit, or a
    /// completion fault. History appended so far is kept in every case.
    pub async fn handle_user_turn(&mut self, text: &str) -> TurnOutcome {
        self.history.push(ChatMessage::user(text));

        for iteration in 1..=self.max_tool_iterations {
            self.observer.record_event(&ObserverEvent::LlmRequest {
                provider: self.provider.name().to_string(),
                model: self.model.clone(),
                messages_count: self.history.len(),
                iteration,
            });

            let llm_started_at = Instant::now();
            let response = match self
                .provider
                .chat_with_tools(&self.history, &self.tool_specs, &self.model, self.temperature)
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    let message = sanitize_api_error(&format!("{e:#}"));
                    self.observer.record_event(&ObserverEvent::LlmResponse {
                        provider: self.provider.name().to_string(),
                        model: self.model.clone(),
                        duration: llm_started_at.elapsed(),
                        success: false,
                        tool_calls: 0,
                        error_message: Some(message.clone()),
                    });
                    self.observer.record_event(&ObserverEvent::TurnError {
                        message: message.clone(),
                    });
                    return TurnOutcome::Failed(message);
                }
            };

            self.observer.record_event(&ObserverEvent::LlmResponse {
                provider: self.provider.name().to_string(),
                model: self.model.clone(),
                duration: llm_started_at.elapsed(),
                success: true,
                tool_calls: response.tool_calls.len(),
                error_message: None,
            });

            if !response.has_tool_calls() {
                let answer = response.text_or_empty().to_string();
                self.history.push(ChatMessage::assistant(answer.clone()));
                self.observer
                    .record_event(&ObserverEvent::TurnComplete { iterations: iteration });
                return TurnOutcome::Answered(answer);
            }

            let calls = response.tool_calls;
            self.history.push(ChatMessage::assistant_with_tool_calls(
                response.text.filter(|t| !t.is_empty()),
                calls.clone(),
            ));

            // Sequential: results must follow the order the calls were emitted.
            for call in &calls {
                self.observer.record_event(&ObserverEvent::ToolCallStart {
                    tool: call.name.clone(),
                    arguments: call.arguments.clone(),
                });
                let started_at = Instant::now();
                let invocation = self.invoker.invoke(call).await;
                self.observer.record_event(&ObserverEvent::ToolCall {
                    tool: call.name.clone(),
                    duration: started_at.elapsed(),
                    success: !invocation.result.is_error,
                });
                if let Some(diagnostic) = invocation.diagnostic {
                    self.observer
                        .record_event(&ObserverEvent::ToolDiagnostic(diagnostic));
                }
                self.history.push(ChatMessage::tool(
                    invocation.result.call_id,
                    invocation.result.content,
                ));
            }
        }

        self.observer.record_event(&ObserverEvent::IterationLimit {
            iterations: self.max_tool_iterations,
        });
        TurnOutcome::IterationLimit {
            iterations: self.max_tool_iterations,
        }
    }
}
