//! Telegram chat daemon backed by the Anthropic Messages API.
//!
//! Inbound messages are answered with bounded recent context drawn from a
//! JSON Lines conversation log; both sides of each successful exchange are
//! appended back to the log.

mod anthropic_llm;
mod bot;
mod conversation;
mod history;
mod llm_client;
mod shutdown;
mod telegram;

pub use anthropic_llm::AnthropicLLM;
pub use bot::{APOLOGY_REPLY, ASSISTANT_NAME, Bot, GREETING};
pub use conversation::{Conversation, FALLBACK_REPLY};
pub use history::{
    FileHistoryStore, HistoryError, HistoryStore, MemoryHistory, MessageRecord, Role,
};
pub use llm_client::{ChatMessage, LLMClient, LlmError};
pub use shutdown::shutdown_signal;
pub use telegram::{Chat, Message, TelegramClient, TelegramError, Update};
