//! Wraps teloxide::Bot and implements [`gbot_core::Notifier`]. Production code
//! delivers directives via Telegram; tests substitute another Notifier impl.

use async_trait::async_trait;
use gbot_core::{Directive, EscrowError, Notifier, Result};
use teloxide::prelude::*;
use teloxide::types::ChatId;

use crate::keyboards::actions_keyboard;

/// Thin wrapper around teloxide::Bot that delivers escrow directives.
pub struct TelegramNotifier {
    bot: teloxide::Bot,
}

impl TelegramNotifier {
    pub fn new(bot: teloxide::Bot) -> Self {
        Self { bot }
    }

    /// Returns the underlying teloxide::Bot for direct API use when needed.
    pub fn inner(&self) -> &teloxide::Bot {
        &self.bot
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, directive: Directive) -> Result<()> {
        let Directive::Notify {
            user_id,
            text,
            actions,
        } = directive;

        // Private chats share the user's id, so directives address chats directly.
        let request = self.bot.send_message(ChatId(user_id), text);
        if actions.is_empty() {
            request.await.map_err(|e| EscrowError::Notify(e.to_string()))?;
        } else {
            request
                .reply_markup(actions_keyboard(&actions))
                .await
                .map_err(|e| EscrowError::Notify(e.to_string()))?;
        }
        Ok(())
    }
}
