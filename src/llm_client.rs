use async_trait::async_trait;
use serde::Serialize;

use crate::history::Role;

/// One turn handed to the model: role and content only, timestamps dropped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Errors raised by a model invocation.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("model request failed")]
    Http(#[from] reqwest::Error),
    #[error("model API returned status {status}: {body}")]
    Api { status: u16, body: String },
}

/// Common interface for chat completion models.
///
/// `complete` returns the first textual block of the model's answer, or
/// `None` when the answer carried no text at all.
///
/// # Examples
/// ```
/// use async_trait::async_trait;
/// use replied::{ChatMessage, LLMClient, LlmError};
///
/// struct Canned;
///
/// #[async_trait]
/// impl LLMClient for Canned {
///     async fn complete(
///         &self,
///         _system: &str,
///         _messages: &[ChatMessage],
///         _max_tokens: u32,
///     ) -> Result<Option<String>, LlmError> {
///         Ok(Some("hello".into()))
///     }
/// }
///
/// # tokio_test::block_on(async {
/// let reply = Canned
///     .complete("persona", &[ChatMessage::user("hi")], 64)
///     .await
///     .unwrap();
/// assert_eq!(reply.as_deref(), Some("hello"));
/// # });
/// ```
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Ask the model for one reply to `messages` under the `system`
    /// instruction, generating at most `max_tokens` tokens.
    async fn complete(
        &self,
        system: &str,
        messages: &[ChatMessage],
        max_tokens: u32,
    ) -> Result<Option<String>, LlmError>;
}
