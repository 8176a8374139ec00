//! Escrow state machine: transition logic and guards over the deal registry.
//!
//! [`EscrowService`] consumes inbound [`Event`]s, validates the acting party and
//! the current deal state, mutates the registry under the per-deal lock, and
//! emits notifications through the injected [`Notifier`]. Every rejected event is
//! surfaced back to the actor as a message; nothing here is fatal.

use gbot_core::{
    Action, Currency, DealId, Directive, EscrowError, Event, Notifier, Result, User,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, warn};

use crate::deal::{Deal, DealRegistry, DealState};
use crate::timeout::TimeoutScheduler;
use crate::verify::TransferVerifier;
use crate::wallet::{WalletProfile, WalletRegistry};

/// Service-level settings.
pub struct EscrowConfig {
    /// Bot username used in buyer share links.
    pub bot_username: String,
    /// Operator contact handle; also the stored payout address for `Stars`.
    pub operator_handle: String,
    /// Delay between gift-sent confirmation and the automated verification check.
    pub verification_timeout: Duration,
}

impl EscrowConfig {
    /// Shareable join link embedding the deal id.
    pub fn share_link(&self, deal_id: &DealId) -> String {
        format!("https://t.me/{}?start=deal{}", self.bot_username, deal_id)
    }
}

/// The escrow deal lifecycle state machine plus its registries.
pub struct EscrowService {
    config: EscrowConfig,
    wallets: Arc<WalletRegistry>,
    deals: DealRegistry,
    admins: RwLock<HashSet<i64>>,
    scheduler: Arc<TimeoutScheduler>,
    verifier: Arc<dyn TransferVerifier>,
    notifier: Arc<dyn Notifier>,
}

impl EscrowService {
    /// Builds the service with fresh registries. Returned in an `Arc` because
    /// timeout checks hold a reference back into the service.
    pub fn new(
        config: EscrowConfig,
        notifier: Arc<dyn Notifier>,
        verifier: Arc<dyn TransferVerifier>,
    ) -> Arc<Self> {
        let wallets = Arc::new(WalletRegistry::new(config.operator_handle.clone()));
        let deals = DealRegistry::new(Arc::clone(&wallets));
        Arc::new(Self {
            config,
            wallets,
            deals,
            admins: RwLock::new(HashSet::new()),
            scheduler: Arc::new(TimeoutScheduler::new()),
            verifier,
            notifier,
        })
    }

    pub fn config(&self) -> &EscrowConfig {
        &self.config
    }

    pub async fn wallet_of(&self, user_id: i64) -> Option<WalletProfile> {
        self.wallets.get_wallet(user_id).await
    }

    pub async fn is_admin(&self, user_id: i64) -> bool {
        self.admins.read().await.contains(&user_id)
    }

    /// Current snapshot of a deal record.
    pub async fn deal_snapshot(&self, deal_id: &DealId) -> Option<Deal> {
        match self.deals.get(deal_id).await {
            Some(shared) => Some(shared.lock().await.clone()),
            None => None,
        }
    }

    /// Whether a verification check is still pending for the deal.
    pub async fn check_pending(&self, deal_id: &DealId) -> bool {
        self.scheduler.is_pending(deal_id).await
    }

    /// Routes one inbound event. Guard failures are logged and reported back to
    /// the acting user; they never propagate.
    #[instrument(skip(self, event))]
    pub async fn handle(self: &Arc<Self>, event: Event) {
        let actor_id = event.actor_id();
        let result = match &event {
            Event::RegisterWallet {
                user_id,
                currency,
                address,
            } => self.register_wallet(*user_id, *currency, address).await,
            Event::CreateDeal {
                user,
                amount,
                description,
            } => self
                .create_deal(user, *amount, description.clone())
                .await
                .map(|_| ()),
            Event::JoinDeal { user, deal_id } => self.join_deal(user, deal_id).await,
            Event::ExitDeal { user_id, deal_id } => self.exit_deal(*user_id, deal_id).await,
            Event::AdminConfirmPayment { caller_id, deal_id } => {
                self.confirm_payment(*caller_id, deal_id).await
            }
            Event::SellerConfirmGiftSent { user_id, deal_id } => {
                self.confirm_gift_sent(*user_id, deal_id).await
            }
            Event::AdminVerifyTransfer { caller_id, deal_id } => {
                self.verify_transfer(*caller_id, deal_id).await
            }
            Event::GrantAdmin { user_id } => self.grant_admin(*user_id).await,
        };

        if let Err(err) = result {
            warn!(user_id = actor_id, error = %err, "event rejected");
            let text = Self::rejection_text(&event, &err);
            self.send(Directive::text(actor_id, text)).await;
        }
    }

    /// Stores (or replaces) the user's payout profile and acknowledges it.
    pub async fn register_wallet(
        &self,
        user_id: i64,
        currency: Currency,
        address: &str,
    ) -> Result<()> {
        let profile = self.wallets.set_wallet(user_id, currency, address).await;
        let text = if currency == Currency::Stars {
            "✅ Currency set: Stars".to_string()
        } else {
            format!(
                "✅ Payout details saved: {} ({})",
                profile.address, profile.currency
            )
        };
        self.send(Directive::text(user_id, text)).await;
        Ok(())
    }

    /// Creates a deal for the seller and sends back the buyer share link.
    pub async fn create_deal(
        &self,
        seller: &User,
        amount: u64,
        description: String,
    ) -> Result<Deal> {
        let deal = self.deals.create(seller, amount, description).await?;
        let text = format!(
            "✅ Deal created!\n\n\
             💰 Amount: {} {}\n\
             📜 Description: {}\n\
             🔗 Buyer link: {}",
            deal.amount,
            deal.currency,
            deal.description,
            self.config.share_link(&deal.id),
        );
        self.send(Directive::text(seller.id, text)).await;
        Ok(deal)
    }

    /// Attaches a buyer to an open deal, or re-discloses the deal to its already
    /// assigned buyer. Anyone else gets `DealNotFound` so closed or taken deals
    /// leak nothing.
    pub async fn join_deal(&self, candidate: &User, deal_id: &DealId) -> Result<()> {
        let shared = self
            .deals
            .get(deal_id)
            .await
            .ok_or_else(|| EscrowError::DealNotFound(deal_id.clone()))?;
        let mut deal = shared.lock().await;

        if candidate.id == deal.seller_id {
            return Err(EscrowError::SelfDeal(deal_id.clone()));
        }

        let directives = match deal.state {
            DealState::Open => {
                deal.buyer_id = Some(candidate.id);
                deal.buyer_display_name = Some(candidate.display_name());
                deal.state = DealState::BuyerJoined;
                info!(deal_id = %deal.id, buyer_id = candidate.id, "buyer joined deal");
                vec![
                    Directive::text(
                        deal.seller_id,
                        format!(
                            "👤 Buyer {} joined your deal #{}",
                            candidate.display_name(),
                            deal.id
                        ),
                    ),
                    Self::deal_info_for_buyer(candidate.id, &deal),
                ]
            }
            DealState::BuyerJoined if deal.buyer_id == Some(candidate.id) => {
                // Re-entering the link: show the info again, no transition.
                vec![Self::deal_info_for_buyer(candidate.id, &deal)]
            }
            _ => return Err(EscrowError::DealNotFound(deal_id.clone())),
        };

        drop(deal);
        self.send_all(directives).await;
        Ok(())
    }

    /// Buyer exit. Allowed only before payment confirmation; cancels the deal
    /// permanently (no second buyer may join a cancelled deal).
    pub async fn exit_deal(&self, user_id: i64, deal_id: &DealId) -> Result<()> {
        let shared = self
            .deals
            .get(deal_id)
            .await
            .ok_or_else(|| EscrowError::DealNotFound(deal_id.clone()))?;
        let mut deal = shared.lock().await;

        let directives = match deal.state {
            DealState::Open | DealState::BuyerJoined => {
                if deal.state == DealState::BuyerJoined && deal.buyer_id != Some(user_id) {
                    return Err(EscrowError::Forbidden(
                        "only the joined buyer can exit this deal".to_string(),
                    ));
                }
                deal.state = DealState::Cancelled;
                info!(deal_id = %deal.id, user_id, "deal cancelled by buyer exit");

                let mut out = vec![Directive::text(
                    user_id,
                    format!("🚪 You left deal #{}. The deal is cancelled.", deal.id),
                )];
                if deal.seller_id != user_id {
                    out.push(Directive::text(
                        deal.seller_id,
                        format!(
                            "🚪 The buyer left your deal #{}. The deal is cancelled.",
                            deal.id
                        ),
                    ));
                }
                out
            }
            DealState::PaymentConfirmed | DealState::GiftSent => {
                return Err(EscrowError::Forbidden(
                    "the buyer slot is locked once payment is confirmed".to_string(),
                ))
            }
            DealState::Verified | DealState::Flagged | DealState::Cancelled => {
                return Err(EscrowError::Validation(format!(
                    "deal {} is already closed",
                    deal.id
                )))
            }
        };

        drop(deal);
        self.send_all(directives).await;
        Ok(())
    }

    /// Admin-only: marks the buyer's payment as received. Sends the seller the
    /// transfer instructions (with memo) and acknowledges the buyer.
    pub async fn confirm_payment(&self, caller_id: i64, deal_id: &DealId) -> Result<()> {
        if !self.is_admin(caller_id).await {
            warn!(user_id = caller_id, deal_id = %deal_id, "non-admin payment confirmation attempt");
            return Err(EscrowError::Forbidden(
                "payment confirmation requires an admin".to_string(),
            ));
        }

        let shared = self
            .deals
            .get(deal_id)
            .await
            .ok_or_else(|| EscrowError::DealNotFound(deal_id.clone()))?;
        let mut deal = shared.lock().await;

        if deal.state != DealState::BuyerJoined {
            return Err(EscrowError::Validation(format!(
                "deal {} is not awaiting payment confirmation",
                deal.id
            )));
        }
        deal.state = DealState::PaymentConfirmed;
        info!(deal_id = %deal.id, admin_id = caller_id, "payment confirmed");

        let mut directives = vec![Directive::with_actions(
            deal.seller_id,
            format!(
                "💰 Payment for deal #{} confirmed.\n\
                 🧾 Memo: {}\n\
                 🎁 Hand the gift to the operator {} and press the button below.",
                deal.id, deal.memo, self.config.operator_handle
            ),
            vec![Action::ConfirmGiftSent(deal.id.clone())],
        )];
        if let Some(buyer_id) = deal.buyer_id {
            directives.push(Directive::text(
                buyer_id,
                format!(
                    "💰 Your payment for deal #{} is confirmed (memo {}). \
                     Waiting for the seller to hand the gift to the operator.",
                    deal.id, deal.memo
                ),
            ));
        }

        drop(deal);
        self.send_all(directives).await;
        Ok(())
    }

    /// Seller-only: confirms the gift was handed to the operator and schedules
    /// the one-shot verification check.
    pub async fn confirm_gift_sent(self: &Arc<Self>, user_id: i64, deal_id: &DealId) -> Result<()> {
        let shared = self
            .deals
            .get(deal_id)
            .await
            .ok_or_else(|| EscrowError::DealNotFound(deal_id.clone()))?;
        let mut deal = shared.lock().await;

        if deal.seller_id != user_id {
            return Err(EscrowError::Forbidden(
                "only the seller can confirm the gift transfer".to_string(),
            ));
        }
        if deal.state != DealState::PaymentConfirmed {
            return Err(EscrowError::Validation(format!(
                "deal {} is not awaiting the gift transfer",
                deal.id
            )));
        }
        deal.state = DealState::GiftSent;
        info!(deal_id = %deal.id, "gift transfer confirmed, scheduling verification check");

        let service = Arc::clone(self);
        let check_id = deal.id.clone();
        self.scheduler
            .schedule(
                deal.id.clone(),
                self.config.verification_timeout,
                async move {
                    service.run_timeout_check(check_id).await;
                },
            )
            .await;

        let mut directives = vec![Directive::text(
            deal.seller_id,
            format!("✅ Noted. Verification for deal #{} started.", deal.id),
        )];
        if let Some(buyer_id) = deal.buyer_id {
            directives.push(Directive::text(
                buyer_id,
                format!(
                    "🎁 The seller handed the gift to the operator for deal #{}. \
                     Verification in progress.",
                    deal.id
                ),
            ));
        }

        drop(deal);
        self.send_all(directives).await;
        Ok(())
    }

    /// Admin-only: external verification succeeded. Moves the deal to `Verified`
    /// and cancels the pending check atomically with the transition (the deal
    /// lock is held across the cancel).
    pub async fn verify_transfer(&self, caller_id: i64, deal_id: &DealId) -> Result<()> {
        if !self.is_admin(caller_id).await {
            warn!(user_id = caller_id, deal_id = %deal_id, "non-admin verification attempt");
            return Err(EscrowError::Forbidden(
                "transfer verification requires an admin".to_string(),
            ));
        }

        let shared = self
            .deals
            .get(deal_id)
            .await
            .ok_or_else(|| EscrowError::DealNotFound(deal_id.clone()))?;
        let mut deal = shared.lock().await;

        if deal.state != DealState::GiftSent {
            return Err(EscrowError::Validation(format!(
                "deal {} is not awaiting verification",
                deal.id
            )));
        }
        deal.state = DealState::Verified;
        self.scheduler.cancel(&deal.id).await;
        info!(deal_id = %deal.id, admin_id = caller_id, "transfer verified manually");

        let directives = Self::closing_notifications(
            &deal,
            format!(
                "✅ Transfer for deal #{} verified. The deal is complete.",
                deal.id
            ),
        );
        drop(deal);
        self.send_all(directives).await;
        Ok(())
    }

    /// Adds the user to the admin allow-list (out-of-band bootstrap event).
    pub async fn grant_admin(&self, user_id: i64) -> Result<()> {
        self.admins.write().await.insert(user_id);
        info!(user_id, "admin granted");
        self.send(Directive::text(
            user_id,
            "✅ Welcome, operator!\n\n\
             🔹 /buy <deal_id> — confirm payment.\n\
             🔹 /verify <deal_id> — confirm transfer verification.",
        ))
        .await;
        Ok(())
    }

    /// The delayed check scheduled after gift-sent confirmation. Re-reads state:
    /// a deal that already left `GiftSent` makes this a silent no-op. Otherwise
    /// the verifier decides between `Verified` and `Flagged`.
    async fn run_timeout_check(&self, deal_id: DealId) {
        let Some(shared) = self.deals.get(&deal_id).await else {
            return;
        };
        let mut deal = shared.lock().await;

        if deal.state != DealState::GiftSent {
            debug!(deal_id = %deal.id, state = ?deal.state, "stale timeout check skipped");
            return;
        }

        let directives = if self.verifier.verify(&deal).await {
            deal.state = DealState::Verified;
            info!(deal_id = %deal.id, "timeout check: transfer verified");
            Self::closing_notifications(
                &deal,
                format!(
                    "✅ Transfer for deal #{} verified. The deal is complete.",
                    deal.id
                ),
            )
        } else {
            deal.state = DealState::Flagged;
            warn!(deal_id = %deal.id, "timeout check: transfer unverified, deal flagged");
            Self::closing_notifications(
                &deal,
                format!(
                    "⚠️ Deal #{}: the transfer was not verified in time. \
                     The deal is flagged; contact support {}.",
                    deal.id, self.config.operator_handle
                ),
            )
        };

        drop(deal);
        self.send_all(directives).await;
    }

    fn closing_notifications(deal: &Deal, text: String) -> Vec<Directive> {
        let mut out = vec![Directive::text(deal.seller_id, text.clone())];
        if let Some(buyer_id) = deal.buyer_id {
            out.push(Directive::text(buyer_id, text));
        }
        out
    }

    fn deal_info_for_buyer(buyer_id: i64, deal: &Deal) -> Directive {
        let stars_note = if deal.currency == Currency::Stars {
            "Transfer method: send gifts in batches of 100 stars\n"
        } else {
            ""
        };
        let text = format!(
            "💳 Deal #{id}\n\n\
             👤 You are the buyer in this deal.\n\
             📌 Seller: {seller} ({seller_id})\n\
             • You are buying: {description}\n\n\
             🏦 Payment address: {address}\n\
             {stars_note}\
             💰 Amount due: {amount} {currency}\n\
             🧾 Payment memo: {memo}\n\
             ⚠️ Double-check the details before paying.",
            id = deal.id,
            seller = deal.seller_display_name,
            seller_id = deal.seller_id,
            description = deal.description,
            address = deal.payout_address,
            stars_note = stars_note,
            amount = deal.amount,
            currency = deal.currency,
            memo = deal.memo,
        );
        Directive::with_actions(
            buyer_id,
            text,
            vec![
                Action::ConfirmPayment(deal.id.clone()),
                Action::ExitDeal(deal.id.clone()),
            ],
        )
    }

    /// Maps a rejected event to the message shown to the actor.
    fn rejection_text(event: &Event, err: &EscrowError) -> String {
        match (event, err) {
            // A buyer pressing "confirm payment" is not an admin; the payment
            // simply has not been located by the operator yet.
            (Event::AdminConfirmPayment { .. }, EscrowError::Forbidden(_)) => {
                "❌ Payment not found.".to_string()
            }
            (_, EscrowError::Validation(msg)) => format!("❌ {}", msg),
            (_, EscrowError::DealNotFound(_)) => "❌ Deal not found.".to_string(),
            (_, EscrowError::Forbidden(_)) => "❌ You are not allowed to do that.".to_string(),
            (_, EscrowError::WalletNotConfigured(_)) => {
                "Set your wallet currency first via 'Manage payout details'.".to_string()
            }
            (_, EscrowError::SelfDeal(_)) => {
                "❌ You cannot join your own deal as the buyer.".to_string()
            }
            (_, EscrowError::Notify(msg)) => format!("❌ Delivery error: {}", msg),
        }
    }

    /// Delivers one directive; transport failures are logged, never propagated,
    /// so a dead chat cannot wedge a transition that already happened.
    async fn send(&self, directive: Directive) {
        if let Err(err) = self.notifier.notify(directive).await {
            error!(error = %err, "failed to deliver notification");
        }
    }

    async fn send_all(&self, directives: Vec<Directive>) {
        for directive in directives {
            self.send(directive).await;
        }
    }
}
