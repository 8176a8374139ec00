//! # gbot-telegram
//!
//! Telegram layer for the escrow bot: teloxide adapters, [`gbot_core::Notifier`]
//! implementation, keyboards, minimal config, and the dispatcher runner. Handles
//! only Telegram connectivity; all deal logic lives in gbot-escrow.

mod adapters;
mod config;
mod keyboards;
mod notifier;
mod runner;

pub use adapters::{
    encode_action, parse_command_arg, parse_start_payload, to_core_user, CallbackCommand,
};
pub use config::TelegramConfig;
pub use notifier::TelegramNotifier;
pub use runner::run_bot;
