//! Wallet registry: per-user payout currency and receiving address.

use gbot_core::Currency;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::info;

/// A user's declared payout configuration. Replaced wholesale on re-registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletProfile {
    pub currency: Currency,
    pub address: String,
}

/// Owns all wallet profiles, keyed by user id. Last write wins per user;
/// profiles are never deleted.
pub struct WalletRegistry {
    /// Fixed receiving handle stored for `Stars` regardless of the supplied address.
    operator_handle: String,
    wallets: RwLock<HashMap<i64, WalletProfile>>,
}

impl WalletRegistry {
    pub fn new(operator_handle: impl Into<String>) -> Self {
        Self {
            operator_handle: operator_handle.into(),
            wallets: RwLock::new(HashMap::new()),
        }
    }

    /// Stores (or replaces) the profile for `user_id`. For `Stars` the supplied
    /// address is ignored and the operator handle is stored instead.
    pub async fn set_wallet(&self, user_id: i64, currency: Currency, address: &str) -> WalletProfile {
        let profile = WalletProfile {
            currency,
            address: if currency == Currency::Stars {
                self.operator_handle.clone()
            } else {
                address.to_string()
            },
        };
        self.wallets.write().await.insert(user_id, profile.clone());
        info!(user_id, currency = %currency, "wallet profile stored");
        profile
    }

    pub async fn get_wallet(&self, user_id: i64) -> Option<WalletProfile> {
        self.wallets.read().await.get(&user_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_get_wallet() {
        let registry = WalletRegistry::new("@Operator");
        registry.set_wallet(1, Currency::Ton, "addr1").await;

        let profile = registry.get_wallet(1).await.unwrap();
        assert_eq!(profile.currency, Currency::Ton);
        assert_eq!(profile.address, "addr1");
        assert!(registry.get_wallet(2).await.is_none());
    }

    #[tokio::test]
    async fn test_stars_forces_operator_handle() {
        let registry = WalletRegistry::new("@Operator");
        registry.set_wallet(1, Currency::Stars, "ignored").await;

        let profile = registry.get_wallet(1).await.unwrap();
        assert_eq!(profile.address, "@Operator");
    }

    #[tokio::test]
    async fn test_non_stars_currencies_store_address_verbatim() {
        let registry = WalletRegistry::new("@Operator");
        for currency in Currency::ALL.into_iter().filter(|c| *c != Currency::Stars) {
            registry.set_wallet(1, currency, "  entered text 42  ").await;
            let profile = registry.get_wallet(1).await.unwrap();
            assert_eq!(profile.address, "  entered text 42  ", "{currency}");
        }
    }

    #[tokio::test]
    async fn test_reregistration_replaces_wholesale() {
        let registry = WalletRegistry::new("@Operator");
        registry.set_wallet(1, Currency::Btc, "btc-addr").await;
        registry.set_wallet(1, Currency::Usdt, "usdt-addr").await;

        let profile = registry.get_wallet(1).await.unwrap();
        assert_eq!(profile.currency, Currency::Usdt);
        assert_eq!(profile.address, "usdt-addr");
    }
}
