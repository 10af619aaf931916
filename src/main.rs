use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use replied::{AnthropicLLM, Bot, Conversation, FileHistoryStore, HistoryStore, TelegramClient};

#[derive(Copy, Clone, Debug, Default, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for tracing_subscriber::filter::LevelFilter {
    fn from(level: LogLevel) -> Self {
        use tracing_subscriber::filter::LevelFilter;
        match level {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "replied", about = "Telegram chat daemon backed by the Anthropic API")]
struct Cli {
    /// Telegram bot token
    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    telegram_token: String,

    /// Anthropic API key
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    anthropic_api_key: String,

    /// Model used for replies
    #[arg(long, default_value = "claude-sonnet-4-20250514")]
    model: String,

    /// Path of the conversation log
    #[arg(long, default_value = "history.jsonl")]
    history_file: PathBuf,

    /// Maximum number of records kept in the log
    #[arg(long, default_value_t = 100)]
    max_history: usize,

    /// Number of prior records sent to the model as context
    #[arg(long, default_value_t = 20)]
    context_window: usize,

    /// Maximum tokens the model may generate per reply
    #[arg(long, default_value_t = 1024)]
    max_tokens: u32,

    /// Logging verbosity level
    #[arg(long, default_value = "info")]
    log_level: LogLevel,

    /// Run as a background daemon
    #[arg(short = 'd', long)]
    daemon: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(tracing_subscriber::filter::LevelFilter::from(cli.log_level))
        .init();
    if cli.daemon {
        daemonize::Daemonize::new()
            .start()
            .map_err(|e| anyhow::anyhow!(e))?;
    }

    let history: Arc<dyn HistoryStore> =
        Arc::new(FileHistoryStore::new(cli.history_file, cli.max_history));
    let llm = Arc::new(AnthropicLLM::new(cli.anthropic_api_key, cli.model));
    let conversation = Conversation::new(llm, history.clone())
        .context_window(cli.context_window)
        .max_tokens(cli.max_tokens);
    let telegram = TelegramClient::new(&cli.telegram_token);

    Bot::new(telegram, conversation, history).run().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults() {
        let cli = Cli::try_parse_from([
            "replied",
            "--telegram-token",
            "t",
            "--anthropic-api-key",
            "k",
        ])
        .unwrap();
        assert!(matches!(cli.log_level, LogLevel::Info));
        assert_eq!(cli.max_history, 100);
        assert_eq!(cli.context_window, 20);
        assert_eq!(cli.history_file, PathBuf::from("history.jsonl"));
    }

    #[test]
    fn missing_credentials_fail_parsing() {
        // Only meaningful when the env fallbacks are unset.
        if std::env::var_os("TELEGRAM_BOT_TOKEN").is_none()
            && std::env::var_os("ANTHROPIC_API_KEY").is_none()
        {
            assert!(Cli::try_parse_from(["replied"]).is_err());
        }
    }
}
