pub mod loop_;
pub mod session;

pub use loop_::{Conversation, ConversationOptions, TurnOutcome, DEFAULT_MAX_TOOL_ITERATIONS};
pub use session::run_session;

use crate::auth;
use crate::config::Config;
use crate::mcp::{self, ToolSource};
use crate::observability::{self, Observer, ObserverEvent};
use crate::providers;
use crate::tools::ToolInvoker;
use anyhow::{anyhow, bail, Result};
use std::sync::Arc;

/// Command-line overrides for a chat session.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Single message mode: answer once and exit.
    pub message: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f64>,
}

/// Connect to the tool server configured in `config`.
pub async fn connect(config: &Config) -> Result<Arc<dyn ToolSource>> {
    let tokens = auth::create_token_provider(&config.auth)?;
    mcp::connect_tool_source(&config.mcp, tokens.as_ref()).await
}

pub async fn run(config: Config, options: RunOptions) -> Result<()> {
    // ── Wire up collaborators ────────────────────────────────────
    let observer: Arc<dyn Observer> =
        Arc::from(observability::create_observer(&config.observability));
    let provider = providers::create_provider(&config.provider)?;
    let source = connect(&config).await?;
    let invoker = ToolInvoker::discover(source).await?;

    let model = options
        .model
        .unwrap_or_else(|| config.provider.model.clone());
    let temperature = options.temperature.unwrap_or(config.provider.temperature);

    observer.record_event(&ObserverEvent::SessionStart {
        provider: provider.name().to_string(),
        model: model.clone(),
        tool_count: invoker.tools().len(),
    });

    let mut conversation = Conversation::new(
        provider,
        invoker,
        observer.clone(),
        ConversationOptions {
            system_prompt: config.agent.system_prompt.clone(),
            model,
            temperature,
            max_tool_iterations: config.effective_max_tool_iterations(),
        },
    );

    // ── Execute ──────────────────────────────────────────────────
    let result = if let Some(message) = options.message {
        let message = message.trim();
        if message.is_empty() {
            bail!("Message is empty");
        }
        match conversation.handle_user_turn(message).await {
            TurnOutcome::Answered(answer) => {
                println!("{answer}");
                Ok(())
            }
            TurnOutcome::IterationLimit { iterations } => Err(anyhow!(
                "No final answer after {iterations} iterations"
            )),
            TurnOutcome::Failed(message) => Err(anyhow!("{message}")),
        }
    } else {
        println!("dirchat interactive mode. Ask about your directory; type 'exit' or 'quit' to leave.\n");
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        run_session(&mut conversation, stdin, tokio::io::stdout()).await
    };

    observer.flush();
    result
}
