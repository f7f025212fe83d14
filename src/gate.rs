//! Confirmation gate
//!
//! Activating a repository or an organization is gated behind an explicit
//! user confirmation. The gate is an injected capability so each front end
//! can ask in its own way: a modal in the dashboard, a line prompt on the
//! command line, or nothing at all with `--yes`.

use async_trait::async_trait;
use std::fmt;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::debug;

/// What is being confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmPrompt {
    ActivateRepo { slug: String },
    ActivateOrg { login: String },
    DeleteAccount { login: String },
}

impl ConfirmPrompt {
    pub fn title(&self) -> &'static str {
        match self {
            ConfirmPrompt::ActivateRepo { .. } => "Enable repository",
            ConfirmPrompt::ActivateOrg { .. } => "Enable organization",
            ConfirmPrompt::DeleteAccount { .. } => "Delete account",
        }
    }
}

impl fmt::Display for ConfirmPrompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfirmPrompt::ActivateRepo { slug } => write!(
                f,
                "Enable approvals for {}? A webhook will be installed and pull requests will require sign-off.",
                slug
            ),
            ConfirmPrompt::ActivateOrg { login } => write!(
                f,
                "Enable approvals for every repository in {}? A webhook will be installed on the organization.",
                login
            ),
            ConfirmPrompt::DeleteAccount { login } => write!(
                f,
                "Delete the account {} and sign out? Enabled repositories stop being checked.",
                login
            ),
        }
    }
}

/// Outcome of a confirmation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
    Accepted,
    /// Not an error: the caller rolls back its optimistic change.
    Declined(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait(?Send)]
pub trait ConfirmationGate {
    async fn open_confirm(&self, prompt: &ConfirmPrompt) -> Confirmation;
}

/// Accepts everything; backs `--yes` and `ui.confirm_activation: false`.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoConfirm;

#[async_trait(?Send)]
impl ConfirmationGate for AutoConfirm {
    async fn open_confirm(&self, prompt: &ConfirmPrompt) -> Confirmation {
        debug!("Auto-confirming: {}", prompt.title());
        Confirmation::Accepted
    }
}

/// Asks on the controlling terminal with a `[y/N]` prompt.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalConfirm;

#[async_trait(?Send)]
impl ConfirmationGate for TerminalConfirm {
    async fn open_confirm(&self, prompt: &ConfirmPrompt) -> Confirmation {
        let mut stderr = tokio::io::stderr();
        let question = format!("{}\n{} [y/N] ", prompt.title(), prompt);
        if let Err(e) = show_prompt(&mut stderr, &question).await {
            debug!("Could not show confirmation prompt: {}", e);
            return Confirmation::Declined("terminal unavailable".to_string());
        }

        let mut line = String::new();
        let mut stdin = BufReader::new(tokio::io::stdin());
        match stdin.read_line(&mut line).await {
            Ok(_) => parse_answer(&line),
            Err(e) => Confirmation::Declined(format!("failed to read answer: {}", e)),
        }
    }
}

/// The prompt only counts as shown once it is flushed.
async fn show_prompt<W: AsyncWrite + Unpin>(out: &mut W, question: &str) -> std::io::Result<()> {
    out.write_all(question.as_bytes()).await?;
    out.flush().await
}

fn parse_answer(line: &str) -> Confirmation {
    match line.trim().to_lowercase().as_str() {
        "y" | "yes" => Confirmation::Accepted,
        "" => Confirmation::Declined("no answer".to_string()),
        other => Confirmation::Declined(format!("answered '{}'", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    #[test]
    fn test_parse_answer() {
        assert_eq!(parse_answer("y\n"), Confirmation::Accepted);
        assert_eq!(parse_answer(" YES "), Confirmation::Accepted);
        assert!(matches!(parse_answer("\n"), Confirmation::Declined(_)));
        assert!(matches!(parse_answer("nope"), Confirmation::Declined(_)));
    }

    struct FlushFails;

    impl AsyncWrite for FlushFails {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<std::io::Result<usize>> {
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed")))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_show_prompt_reports_flush_failure() {
        let err = show_prompt(&mut FlushFails, "Enable? [y/N] ").await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::BrokenPipe);

        let mut written = Vec::new();
        show_prompt(&mut written, "Enable? [y/N] ").await.unwrap();
        assert_eq!(written, b"Enable? [y/N] ");
    }

    #[tokio::test]
    async fn test_auto_confirm_accepts() {
        let prompt = ConfirmPrompt::ActivateOrg {
            login: "acme".to_string(),
        };
        assert_eq!(AutoConfirm.open_confirm(&prompt).await, Confirmation::Accepted);
    }

    #[test]
    fn test_prompt_mentions_subject() {
        let prompt = ConfirmPrompt::ActivateRepo {
            slug: "acme/api".to_string(),
        };
        assert!(prompt.to_string().contains("acme/api"));
        assert_eq!(prompt.title(), "Enable repository");
    }
}
