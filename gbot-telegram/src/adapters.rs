//! Adapters between Telegram (teloxide) shapes and core types: user conversion,
//! `/start` payload parsing, and callback-data encoding for actions.

use gbot_core::{Action, DealId, User};

/// Converts a teloxide user to the core [`User`].
pub fn to_core_user(user: &teloxide::types::User) -> User {
    User {
        id: user.id.0 as i64,
        username: user.username.clone(),
        first_name: Some(user.first_name.clone()),
        last_name: user.last_name.clone(),
    }
}

/// Extracts the deal id from a `/start deal<id>` message, the way share links
/// deliver it. Returns `None` for a plain `/start` or any other payload.
pub fn parse_start_payload(text: &str) -> Option<DealId> {
    let payload = text.strip_prefix("/start")?.trim();
    let id = payload.strip_prefix("deal")?;
    if id.is_empty() {
        return None;
    }
    Some(DealId::new(id))
}

/// Returns the argument of `command` when it is the whole first token of
/// `text`. A bare command yields `Some("")` so the caller can print usage.
/// `/buyers` is not `/buy`, so prefixes with a longer first token get `None`.
pub fn parse_command_arg<'a>(text: &'a str, command: &str) -> Option<&'a str> {
    if text == command {
        return Some("");
    }
    text.strip_prefix(command)?.strip_prefix(' ').map(str::trim)
}

/// Callback-data command sent back when a user presses an inline button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackCommand {
    ConfirmPayment(DealId),
    ExitDeal(DealId),
    ConfirmGiftSent(DealId),
}

impl CallbackCommand {
    /// Parses the wire form produced by [`encode_action`].
    pub fn parse(data: &str) -> Option<Self> {
        if let Some(id) = data.strip_prefix("confirm_") {
            return Some(CallbackCommand::ConfirmPayment(DealId::new(id)));
        }
        if let Some(id) = data.strip_prefix("exit_") {
            return Some(CallbackCommand::ExitDeal(DealId::new(id)));
        }
        if let Some(id) = data.strip_prefix("gift_") {
            return Some(CallbackCommand::ConfirmGiftSent(DealId::new(id)));
        }
        None
    }
}

/// Callback data for an action button.
pub fn encode_action(action: &Action) -> String {
    match action {
        Action::ConfirmPayment(id) => format!("confirm_{}", id),
        Action::ExitDeal(id) => format!("exit_{}", id),
        Action::ConfirmGiftSent(id) => format!("gift_{}", id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_start_payload() {
        assert_eq!(
            parse_start_payload("/start dealab12cd"),
            Some(DealId::new("ab12cd"))
        );
        assert_eq!(parse_start_payload("/start"), None);
        assert_eq!(parse_start_payload("/start ref123"), None);
        assert_eq!(parse_start_payload("/start deal"), None);
        assert_eq!(parse_start_payload("hello"), None);
    }

    #[test]
    fn test_parse_command_arg_matches_whole_first_token_only() {
        assert_eq!(parse_command_arg("/buy ab12cd", "/buy"), Some("ab12cd"));
        assert_eq!(parse_command_arg("/buy  #ab12cd ", "/buy"), Some("#ab12cd"));
        assert_eq!(parse_command_arg("/buy", "/buy"), Some(""));
        assert_eq!(parse_command_arg("/buyers", "/buy"), None);
        assert_eq!(parse_command_arg("/buyfoo ab12cd", "/buy"), None);
        assert_eq!(parse_command_arg("/verifyall", "/verify"), None);
        assert_eq!(parse_command_arg("/verify ab12cd", "/verify"), Some("ab12cd"));
    }

    #[test]
    fn test_callback_round_trip() {
        let id = DealId::new("ab12cd");
        for (action, expected) in [
            (
                Action::ConfirmPayment(id.clone()),
                CallbackCommand::ConfirmPayment(id.clone()),
            ),
            (
                Action::ExitDeal(id.clone()),
                CallbackCommand::ExitDeal(id.clone()),
            ),
            (
                Action::ConfirmGiftSent(id.clone()),
                CallbackCommand::ConfirmGiftSent(id.clone()),
            ),
        ] {
            let data = encode_action(&action);
            assert_eq!(CallbackCommand::parse(&data), Some(expected));
        }
        assert_eq!(CallbackCommand::parse("unknown_x"), None);
    }

    #[test]
    fn test_to_core_user() {
        let user = teloxide::types::User {
            id: teloxide::types::UserId(123),
            is_bot: false,
            first_name: "Test".to_string(),
            last_name: Some("User".to_string()),
            username: Some("testuser".to_string()),
            language_code: Some("en".to_string()),
            is_premium: false,
            added_to_attachment_menu: false,
        };

        let core_user = to_core_user(&user);
        assert_eq!(core_user.id, 123);
        assert_eq!(core_user.username, Some("testuser".to_string()));
        assert_eq!(core_user.first_name, Some("Test".to_string()));
        assert_eq!(core_user.last_name, Some("User".to_string()));
    }
}
