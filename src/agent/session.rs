use super::loop_::{Conversation, TurnOutcome};
use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

const PROMPT: &str = "> ";

/// True for the words that end the session.
pub fn is_exit_command(line: &str) -> bool {
    line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit")
}

/// Read lines from `input` and run each non-empty one as a user turn.
///
/// Answers go to `output`; warnings and errors are reported by the
/// conversation's observer. Ends on EOF or an exit command.
pub async fn run_session<R, W>(
    conversation: &mut Conversation,
    mut input: R,
    mut output: W,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut line = String::new();
    loop {
        output.write_all(PROMPT.as_bytes()).await?;
        output.flush().await?;

        line.clear();
        if input.read_line(&mut line).await? == 0 {
            break;
        }
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if is_exit_command(text) {
            break;
        }

        match conversation.handle_user_turn(text).await {
            TurnOutcome::Answered(answer) => {
                output.write_all(format!("\n{answer}\n\n").as_bytes()).await?;
            }
            TurnOutcome::IterationLimit { iterations } => {
                tracing::debug!(iterations, "Turn stopped at iteration limit");
            }
            TurnOutcome::Failed(message) => {
                tracing::debug!(error = %message, "Turn failed");
            }
        }
    }
    output.flush().await?;
    Ok(())
}
