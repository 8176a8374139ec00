//! Deal records and the registry that owns them.
//!
//! [`DealRegistry`] is the single source of truth for deal state. Every deal lives
//! behind its own `tokio::sync::Mutex`, which serializes all transitions on that
//! deal id; the outer map is only locked to insert or look up entries.

use chrono::{DateTime, Utc};
use gbot_core::{Currency, DealId, EscrowError, Result, User};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::info;

use crate::ids::DealIdGenerator;
use crate::wallet::WalletRegistry;

/// Lifecycle state of a deal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DealState {
    /// Seller created the deal, no buyer yet.
    Open,
    /// A buyer attached via the share link.
    BuyerJoined,
    /// Admin verified the buyer's payment.
    PaymentConfirmed,
    /// Seller confirmed the gift was handed to the operator; verification pending.
    GiftSent,
    /// Transfer verification succeeded.
    Verified,
    /// The timeout check elapsed without verification.
    Flagged,
    /// The buyer exited before payment confirmation.
    Cancelled,
}

impl DealState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DealState::Verified | DealState::Flagged | DealState::Cancelled
        )
    }
}

/// One escrow deal. Everything except `buyer_*` and `state` is immutable after
/// creation; `currency` and `payout_address` are a snapshot of the seller's
/// wallet at creation time, not a live reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deal {
    pub id: DealId,
    pub seller_id: i64,
    pub seller_display_name: String,
    pub buyer_id: Option<i64>,
    pub buyer_display_name: Option<String>,
    pub currency: Currency,
    pub payout_address: String,
    pub amount: u64,
    pub description: String,
    /// Payment-reference hint, derived from the id and seller id.
    pub memo: String,
    pub state: DealState,
    pub created_at: DateTime<Utc>,
}

pub type SharedDeal = Arc<Mutex<Deal>>;

/// Owns all deal records, keyed by deal id. Deals are never removed, so closed
/// deals stay queryable and ids are never reused.
pub struct DealRegistry {
    wallets: Arc<WalletRegistry>,
    ids: DealIdGenerator,
    deals: RwLock<HashMap<DealId, SharedDeal>>,
}

impl DealRegistry {
    pub fn new(wallets: Arc<WalletRegistry>) -> Self {
        Self {
            wallets,
            ids: DealIdGenerator::new(),
            deals: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a deal in `Open` for the given seller. Requires a complete wallet
    /// profile; the profile's currency and address are copied into the deal.
    /// Generates a fresh id, re-rolling under the write lock until it is unused.
    pub async fn create(&self, seller: &User, amount: u64, description: String) -> Result<Deal> {
        let profile = self
            .wallets
            .get_wallet(seller.id)
            .await
            .ok_or(EscrowError::WalletNotConfigured(seller.id))?;

        if amount == 0 {
            return Err(EscrowError::Validation(
                "deal amount must be a positive number".to_string(),
            ));
        }

        let mut deals = self.deals.write().await;
        let id = loop {
            let candidate = self.ids.next();
            if !deals.contains_key(&candidate) {
                break candidate;
            }
        };

        let deal = Deal {
            memo: format!("{}{}", id, seller.id),
            id: id.clone(),
            seller_id: seller.id,
            seller_display_name: seller.display_name(),
            buyer_id: None,
            buyer_display_name: None,
            currency: profile.currency,
            payout_address: profile.address,
            amount,
            description,
            state: DealState::Open,
            created_at: Utc::now(),
        };
        deals.insert(id.clone(), Arc::new(Mutex::new(deal.clone())));

        info!(
            deal_id = %id,
            seller_id = seller.id,
            amount,
            currency = %deal.currency,
            "deal created"
        );
        Ok(deal)
    }

    /// Looks up a deal. Callers lock the returned mutex before reading or
    /// mutating; that lock is the per-deal transition discipline.
    pub async fn get(&self, id: &DealId) -> Option<SharedDeal> {
        self.deals.read().await.get(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gbot_core::Currency;

    fn seller() -> User {
        User {
            id: 10,
            username: Some("seller".to_string()),
            first_name: None,
            last_name: None,
        }
    }

    #[tokio::test]
    async fn test_create_requires_wallet() {
        let wallets = Arc::new(WalletRegistry::new("@Op"));
        let registry = DealRegistry::new(wallets);

        let err = registry
            .create(&seller(), 100, "game key".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, EscrowError::WalletNotConfigured(10)));
    }

    #[tokio::test]
    async fn test_create_rejects_zero_amount() {
        let wallets = Arc::new(WalletRegistry::new("@Op"));
        wallets.set_wallet(10, Currency::Ton, "addr1").await;
        let registry = DealRegistry::new(wallets);

        let err = registry
            .create(&seller(), 0, "game key".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, EscrowError::Validation(_)));
    }

    #[tokio::test]
    async fn test_create_snapshots_wallet_and_derives_memo() {
        let wallets = Arc::new(WalletRegistry::new("@Op"));
        wallets.set_wallet(10, Currency::Ton, "addr1").await;
        let registry = DealRegistry::new(wallets.clone());

        let deal = registry
            .create(&seller(), 100, "game key".to_string())
            .await
            .unwrap();
        assert_eq!(deal.state, DealState::Open);
        assert_eq!(deal.currency, Currency::Ton);
        assert_eq!(deal.payout_address, "addr1");
        assert_eq!(deal.memo, format!("{}10", deal.id));

        // Changing the wallet afterwards must not touch the open deal.
        wallets.set_wallet(10, Currency::Btc, "other").await;
        let stored = registry.get(&deal.id).await.unwrap();
        let stored = stored.lock().await;
        assert_eq!(stored.currency, Currency::Ton);
        assert_eq!(stored.payout_address, "addr1");
    }

    #[tokio::test]
    async fn test_ids_unique_across_creates() {
        let wallets = Arc::new(WalletRegistry::new("@Op"));
        wallets.set_wallet(10, Currency::Ton, "addr1").await;
        let registry = DealRegistry::new(wallets);

        let mut seen = std::collections::HashSet::new();
        for _ in 0..50 {
            let deal = registry
                .create(&seller(), 1, "item".to_string())
                .await
                .unwrap();
            assert!(seen.insert(deal.id));
        }
    }
}
