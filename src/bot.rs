use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::conversation::Conversation;
use crate::history::{HistoryStore, Role};
use crate::shutdown::shutdown_signal;
use crate::telegram::TelegramClient;

/// Label prefixed to every outbound reply.
pub const ASSISTANT_NAME: &str = "Remy";

/// Sent when a message cycle fails for any reason.
pub const APOLOGY_REPLY: &str = "Sorry, something went wrong. Please try again.";

/// Reply to the `/start` command.
pub const GREETING: &str = "Hi, I'm Remy! Send me a message and I'll reply.";

const POLL_TIMEOUT_SECS: u64 = 50;
const POLL_RETRY_DELAY: Duration = Duration::from_secs(2);

/// The long-running update loop: one update at a time, one reply per inbound
/// message, both sides of a successful exchange recorded to history.
pub struct Bot {
    telegram: TelegramClient,
    conversation: Conversation,
    history: Arc<dyn HistoryStore>,
}

impl Bot {
    pub fn new(
        telegram: TelegramClient,
        conversation: Conversation,
        history: Arc<dyn HistoryStore>,
    ) -> Self {
        Self {
            telegram,
            conversation,
            history,
        }
    }

    /// Poll for updates until Ctrl-C or SIGTERM.
    pub async fn run(&self) -> anyhow::Result<()> {
        tracing::info!("polling for updates");
        let mut offset = 0i64;
        loop {
            let polled = tokio::select! {
                _ = shutdown_signal() => break,
                polled = self.telegram.get_updates(offset, POLL_TIMEOUT_SECS) => polled,
            };
            let updates = match polled {
                Ok(updates) => updates,
                Err(e) => {
                    tracing::error!(error = ?e, "update poll failed");
                    tokio::time::sleep(POLL_RETRY_DELAY).await;
                    continue;
                }
            };
            for update in updates {
                offset = offset.max(update.update_id + 1);
                let Some(message) = update.message else { continue };
                let Some(text) = message.text else { continue };
                self.handle_text(message.chat.id, &text).await;
            }
        }
        tracing::info!("shutting down");
        Ok(())
    }

    /// Process one inbound text. Commands other than `/start` are dropped
    /// without a reply; any failure in the exchange is answered with the
    /// fixed apology and recorded nowhere.
    pub async fn handle_text(&self, chat_id: i64, text: &str) {
        if let Some(rest) = text.strip_prefix('/') {
            let command = rest
                .split_whitespace()
                .next()
                .and_then(|token| token.split('@').next())
                .unwrap_or("");
            if command == "start" {
                if let Err(e) = self.telegram.send_message(chat_id, GREETING).await {
                    tracing::error!(error = ?e, "failed to send greeting");
                }
            } else {
                tracing::debug!(%command, "ignoring command");
            }
            return;
        }
        if let Err(e) = self.exchange(chat_id, text).await {
            tracing::error!(error = ?e, "message cycle failed");
            if let Err(e) = self.telegram.send_message(chat_id, APOLOGY_REPLY).await {
                tracing::error!(error = ?e, "failed to deliver apology");
            }
        }
    }

    async fn exchange(&self, chat_id: i64, text: &str) -> anyhow::Result<()> {
        let arrival = Utc::now();
        // The indicator is cosmetic; a failure here must not cost the reply.
        if let Err(e) = self.telegram.send_typing(chat_id).await {
            tracing::debug!(error = ?e, "typing indicator failed");
        }
        let reply = self.conversation.respond(text).await?;
        self.telegram
            .send_message(chat_id, &format!("{ASSISTANT_NAME}: {reply}"))
            .await?;
        self.history.append(Role::User, text, arrival).await?;
        self.history
            .append(Role::Assistant, &reply, Utc::now())
            .await?;
        Ok(())
    }
}
