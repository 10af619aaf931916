use std::sync::Arc;

use crate::history::HistoryStore;
use crate::llm_client::{ChatMessage, LLMClient};

/// System instruction sent with every model call.
const PERSONA: &str = "You are Remy, a friendly assistant chatting over Telegram. \
Keep replies short, warm and conversational.";

/// Returned verbatim when the model answers with no text at all.
pub const FALLBACK_REPLY: &str = "Sorry, I could not generate a response.";

/// Sequences one exchange: load history, window it, call the model.
///
/// `respond` never writes to the store; the surrounding loop records both
/// sides of the exchange after the reply has been delivered. The context
/// window therefore only ever contains prior turns, never the message
/// currently being answered.
pub struct Conversation {
    llm: Arc<dyn LLMClient>,
    history: Arc<dyn HistoryStore>,
    context_window: usize,
    max_tokens: u32,
}

impl Conversation {
    /// Create an orchestrator with the default window of 20 prior turns and
    /// replies capped at 1024 tokens.
    pub fn new(llm: Arc<dyn LLMClient>, history: Arc<dyn HistoryStore>) -> Self {
        Self {
            llm,
            history,
            context_window: 20,
            max_tokens: 1024,
        }
    }

    /// Override how many prior records are sent as context.
    pub fn context_window(mut self, context_window: usize) -> Self {
        self.context_window = context_window;
        self
    }

    /// Override the maximum number of tokens the model may generate.
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Produce one reply to `user_message` using bounded prior context.
    pub async fn respond(&self, user_message: &str) -> anyhow::Result<String> {
        let records = self.history.load().await?;
        let start = records.len().saturating_sub(self.context_window);
        let mut messages: Vec<ChatMessage> = records[start..]
            .iter()
            .map(|r| ChatMessage {
                role: r.role,
                content: r.content.clone(),
            })
            .collect();
        messages.push(ChatMessage::user(user_message));
        tracing::debug!(context = messages.len() - 1, "calling model");

        let reply = self
            .llm
            .complete(PERSONA, &messages, self.max_tokens)
            .await?;
        Ok(reply.unwrap_or_else(|| FALLBACK_REPLY.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{MemoryHistory, Role};
    use crate::llm_client::LlmError;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;

    /// Records the request it was given and answers with a fixed reply.
    struct StaticLLM {
        reply: Option<String>,
        seen: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl StaticLLM {
        fn new(reply: Option<&str>) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.map(str::to_string),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn last_request(&self) -> Vec<ChatMessage> {
            self.seen.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl LLMClient for StaticLLM {
        async fn complete(
            &self,
            _system: &str,
            messages: &[ChatMessage],
            _max_tokens: u32,
        ) -> Result<Option<String>, LlmError> {
            self.seen.lock().unwrap().push(messages.to_vec());
            Ok(self.reply.clone())
        }
    }

    #[tokio::test]
    async fn empty_history_sends_only_the_new_message() {
        let llm = StaticLLM::new(Some("hello"));
        let history = Arc::new(MemoryHistory::new(100));
        let conversation = Conversation::new(llm.clone(), history);

        let reply = conversation.respond("hi").await.unwrap();
        assert_eq!(reply, "hello");
        assert_eq!(llm.last_request(), vec![ChatMessage::user("hi")]);
    }

    #[tokio::test]
    async fn context_is_the_last_k_prior_records() {
        let llm = StaticLLM::new(Some("ok"));
        let history = Arc::new(MemoryHistory::new(100));
        for i in 0..4 {
            let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
            history
                .append(role, &format!("m{i}"), Utc::now())
                .await
                .unwrap();
        }
        let conversation = Conversation::new(llm.clone(), history).context_window(2);

        conversation.respond("new").await.unwrap();
        let sent = llm.last_request();
        assert_eq!(
            sent,
            vec![
                ChatMessage::user("m2"),
                ChatMessage::assistant("m3"),
                ChatMessage::user("new"),
            ]
        );
    }

    #[tokio::test]
    async fn respond_does_not_write_history() {
        let llm = StaticLLM::new(Some("ok"));
        let history = Arc::new(MemoryHistory::new(100));
        let conversation = Conversation::new(llm, history.clone());

        conversation.respond("hi").await.unwrap();
        assert!(history.records().is_empty());
    }

    #[tokio::test]
    async fn empty_model_answer_falls_back() {
        let llm = StaticLLM::new(None);
        let history = Arc::new(MemoryHistory::new(100));
        let conversation = Conversation::new(llm, history);

        let reply = conversation.respond("hi").await.unwrap();
        assert_eq!(reply, FALLBACK_REPLY);
    }
}
