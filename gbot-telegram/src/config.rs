//! Minimal config: token, identity handles, check delay, log path.
//! Loaded from environment variables: BOT_TOKEN, BOT_USERNAME, OPERATOR_HANDLE,
//! VERIFICATION_TIMEOUT_SECS, LOG_FILE.

use anyhow::Result;
use std::env;

/// Telegram escrow bot configuration.
pub struct TelegramConfig {
    pub bot_token: String,
    /// Username used in buyer share links; refined via get_me at startup.
    pub bot_username: String,
    /// Operator contact handle; also the payout address stored for Stars.
    pub operator_handle: String,
    /// Seconds between gift-sent confirmation and the automated check.
    pub verification_timeout_secs: u64,
    pub log_file: Option<String>,
}

const DEFAULT_TIMEOUT_SECS: u64 = 600;

impl TelegramConfig {
    /// Loads from environment: BOT_TOKEN required, everything else optional with defaults.
    pub fn from_env() -> Result<Self> {
        let bot_token = env::var("BOT_TOKEN").map_err(|_| anyhow::anyhow!("BOT_TOKEN not set"))?;
        let bot_username = env::var("BOT_USERNAME").unwrap_or_else(|_| "escrow_bot".to_string());
        let operator_handle =
            env::var("OPERATOR_HANDLE").unwrap_or_else(|_| "@EscrowOperator".to_string());
        let verification_timeout_secs = env::var("VERIFICATION_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        let log_file = env::var("LOG_FILE").ok();
        Ok(Self {
            bot_token,
            bot_username,
            operator_handle,
            verification_timeout_secs,
            log_file,
        })
    }

    /// Constructs with the given token, defaults for everything else.
    pub fn with_token(bot_token: String) -> Self {
        Self {
            bot_token,
            bot_username: "escrow_bot".to_string(),
            operator_handle: "@EscrowOperator".to_string(),
            verification_timeout_secs: DEFAULT_TIMEOUT_SECS,
            log_file: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_token() {
        let config = TelegramConfig::with_token("test_token".to_string());
        assert_eq!(config.bot_token, "test_token");
        assert_eq!(config.verification_timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert!(config.log_file.is_none());
    }
}
