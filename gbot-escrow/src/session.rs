//! Per-user conversation sessions for wallet setup and deal creation.
//!
//! Each user has at most one active [`Session`], a tagged union advanced only by
//! [`SessionStore::advance`]. This replaces the ad hoc waiting-flags style of
//! conversation state: every step and its legal inputs are explicit.

use gbot_core::Currency;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;

/// Conversation step a user is currently in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Session {
    /// Wallet setup: waiting for a currency pick.
    AwaitingCurrency,
    /// Wallet setup: currency chosen, waiting for the receiving address.
    AwaitingAddress { currency: Currency },
    /// Deal creation: waiting for the amount.
    AwaitingAmount,
    /// Deal creation: amount entered, waiting for the item description.
    AwaitingDescription { amount: u64 },
}

/// Result of feeding one text input into a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Currency accepted; an address entry step follows.
    CurrencyChosen { currency: Currency },
    /// Wallet setup finished: for `Stars` immediately (address ignored later),
    /// otherwise after the address step.
    WalletReady { currency: Currency, address: String },
    /// Amount accepted; a description step follows.
    AmountAccepted { amount: u64 },
    /// Deal creation input complete.
    DealReady { amount: u64, description: String },
    /// Input rejected; the session stays on the same step. `reply` is the
    /// retry message for the user.
    Rejected { reply: String },
}

/// Owns all active sessions, keyed by user id.
pub struct SessionStore {
    sessions: Mutex<HashMap<i64, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Starts (or restarts) the wallet-setup conversation.
    pub async fn begin_wallet_setup(&self, user_id: i64) {
        self.sessions
            .lock()
            .await
            .insert(user_id, Session::AwaitingCurrency);
    }

    /// Starts (or restarts) the deal-creation conversation.
    pub async fn begin_deal_creation(&self, user_id: i64) {
        self.sessions
            .lock()
            .await
            .insert(user_id, Session::AwaitingAmount);
    }

    /// Drops any active session for the user.
    pub async fn clear(&self, user_id: i64) {
        self.sessions.lock().await.remove(&user_id);
    }

    pub async fn current(&self, user_id: i64) -> Option<Session> {
        self.sessions.lock().await.get(&user_id).cloned()
    }

    /// Feeds one text input into the user's session. Returns `None` when the
    /// user has no active session (the input belongs to someone else's flow).
    /// Completed sessions are cleared before returning.
    pub async fn advance(&self, user_id: i64, text: &str) -> Option<SessionOutcome> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions.get(&user_id)?.clone();

        let outcome = match session {
            Session::AwaitingCurrency => match text.parse::<Currency>() {
                Ok(Currency::Stars) => {
                    sessions.remove(&user_id);
                    SessionOutcome::WalletReady {
                        currency: Currency::Stars,
                        address: String::new(),
                    }
                }
                Ok(currency) => {
                    sessions.insert(user_id, Session::AwaitingAddress { currency });
                    SessionOutcome::CurrencyChosen { currency }
                }
                Err(_) => SessionOutcome::Rejected {
                    reply: "❌ Pick a currency from the list.".to_string(),
                },
            },
            Session::AwaitingAddress { currency } => {
                sessions.remove(&user_id);
                SessionOutcome::WalletReady {
                    currency,
                    address: text.to_string(),
                }
            }
            Session::AwaitingAmount => match text.parse::<u64>() {
                Ok(amount) if amount > 0 => {
                    sessions.insert(user_id, Session::AwaitingDescription { amount });
                    SessionOutcome::AmountAccepted { amount }
                }
                _ => SessionOutcome::Rejected {
                    reply: "❌ Enter the amount as a number, e.g. 100.".to_string(),
                },
            },
            Session::AwaitingDescription { amount } => {
                sessions.remove(&user_id);
                SessionOutcome::DealReady {
                    amount,
                    description: text.to_string(),
                }
            }
        };

        debug!(user_id, outcome = ?outcome, "session advanced");
        Some(outcome)
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
