//! Core types: user, currency, deal id, inbound events, and outbound directives.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::EscrowError;

/// User identity (id, username, names).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl User {
    /// Display name for notifications: @username when set, otherwise the numeric id.
    pub fn display_name(&self) -> String {
        match &self.username {
            Some(name) => format!("@{}", name),
            None => self.id.to_string(),
        }
    }
}

/// Payout currency. Closed set; anything else fails to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Currency {
    Usd,
    Rub,
    Uah,
    Usdt,
    Btc,
    Ton,
    Stars,
}

impl Currency {
    /// All currencies, in the order the currency keyboard shows them.
    pub const ALL: [Currency; 7] = [
        Currency::Usd,
        Currency::Rub,
        Currency::Uah,
        Currency::Usdt,
        Currency::Btc,
        Currency::Ton,
        Currency::Stars,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Rub => "RUB",
            Currency::Uah => "UAH",
            Currency::Usdt => "USDT",
            Currency::Btc => "BTC",
            Currency::Ton => "TON",
            Currency::Stars => "Stars",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Currency {
    type Err = EscrowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Currency::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| EscrowError::Validation(format!("unknown currency: {}", s)))
    }
}

/// Opaque deal identifier. Generated once at deal creation, never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DealId(String);

impl DealId {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DealId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Inbound events routed to the escrow service. Produced by the chat transport
/// (message/callback arrivals) or the out-of-band admin bootstrap.
#[derive(Debug, Clone)]
pub enum Event {
    RegisterWallet {
        user_id: i64,
        currency: Currency,
        address: String,
    },
    CreateDeal {
        user: User,
        amount: u64,
        description: String,
    },
    JoinDeal {
        user: User,
        deal_id: DealId,
    },
    ExitDeal {
        user_id: i64,
        deal_id: DealId,
    },
    AdminConfirmPayment {
        caller_id: i64,
        deal_id: DealId,
    },
    SellerConfirmGiftSent {
        user_id: i64,
        deal_id: DealId,
    },
    AdminVerifyTransfer {
        caller_id: i64,
        deal_id: DealId,
    },
    GrantAdmin {
        user_id: i64,
    },
}

impl Event {
    /// The user whose action produced this event; error messages go back to them.
    pub fn actor_id(&self) -> i64 {
        match self {
            Event::RegisterWallet { user_id, .. } => *user_id,
            Event::CreateDeal { user, .. } => user.id,
            Event::JoinDeal { user, .. } => user.id,
            Event::ExitDeal { user_id, .. } => *user_id,
            Event::AdminConfirmPayment { caller_id, .. } => *caller_id,
            Event::SellerConfirmGiftSent { user_id, .. } => *user_id,
            Event::AdminVerifyTransfer { caller_id, .. } => *caller_id,
            Event::GrantAdmin { user_id } => *user_id,
        }
    }
}

/// Named interactive control attached to a notification. The transport renders
/// these as buttons and routes presses back as inbound events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    ConfirmPayment(DealId),
    ExitDeal(DealId),
    ConfirmGiftSent(DealId),
}

impl Action {
    /// Button label shown to the user.
    pub fn label(&self) -> &'static str {
        match self {
            Action::ConfirmPayment(_) => "✅ Confirm payment",
            Action::ExitDeal(_) => "🚪 Exit deal",
            Action::ConfirmGiftSent(_) => "🎁 Gift handed to operator",
        }
    }
}

/// Outbound directive consumed by the messaging transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Notify {
        user_id: i64,
        text: String,
        actions: Vec<Action>,
    },
}

impl Directive {
    /// Plain notification with no actions.
    pub fn text(user_id: i64, text: impl Into<String>) -> Self {
        Directive::Notify {
            user_id,
            text: text.into(),
            actions: Vec::new(),
        }
    }

    /// Notification with interactive actions.
    pub fn with_actions(user_id: i64, text: impl Into<String>, actions: Vec<Action>) -> Self {
        Directive::Notify {
            user_id,
            text: text.into(),
            actions,
        }
    }
}
