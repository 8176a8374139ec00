//! Reply and inline keyboard layouts.

use gbot_core::{Action, Currency};
use teloxide::types::{
    InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup,
};

use crate::adapters::encode_action;

pub const BTN_MANAGE_WALLET: &str = "Manage payout details";
pub const BTN_CREATE_DEAL: &str = "Create deal";
pub const BTN_SUPPORT: &str = "Support";

/// Main menu shown on /start.
pub fn main_keyboard() -> KeyboardMarkup {
    let mut kb = KeyboardMarkup::new(vec![
        vec![
            KeyboardButton::new(BTN_MANAGE_WALLET),
            KeyboardButton::new(BTN_CREATE_DEAL),
        ],
        vec![KeyboardButton::new(BTN_SUPPORT)],
    ]);
    kb.resize_keyboard = true;
    kb
}

/// One button per supported currency, in registry order.
pub fn currency_keyboard() -> KeyboardMarkup {
    let rows: Vec<Vec<KeyboardButton>> = Currency::ALL
        .iter()
        .map(|c| vec![KeyboardButton::new(c.as_str())])
        .collect();
    let mut kb = KeyboardMarkup::new(rows);
    kb.resize_keyboard = true;
    kb
}

/// Inline keyboard rendering directive actions, one button per row.
pub fn actions_keyboard(actions: &[Action]) -> InlineKeyboardMarkup {
    let rows: Vec<Vec<InlineKeyboardButton>> = actions
        .iter()
        .map(|a| vec![InlineKeyboardButton::callback(a.label(), encode_action(a))])
        .collect();
    InlineKeyboardMarkup::new(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gbot_core::DealId;

    #[test]
    fn test_main_keyboard_layout() {
        let kb = main_keyboard();
        assert_eq!(kb.keyboard.len(), 2);
        assert_eq!(kb.keyboard[0].len(), 2);
        assert!(kb.resize_keyboard);
    }

    #[test]
    fn test_currency_keyboard_covers_all_currencies() {
        let kb = currency_keyboard();
        assert_eq!(kb.keyboard.len(), Currency::ALL.len());
    }

    #[test]
    fn test_actions_keyboard_one_button_per_row() {
        let id = DealId::new("ab12cd");
        let kb = actions_keyboard(&[
            Action::ConfirmPayment(id.clone()),
            Action::ExitDeal(id),
        ]);
        assert_eq!(kb.inline_keyboard.len(), 2);
        assert_eq!(kb.inline_keyboard[0].len(), 1);
    }
}
