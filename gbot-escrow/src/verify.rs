//! Transfer verification extension point.

use crate::deal::Deal;
use async_trait::async_trait;

/// Consulted when a deal's timeout check fires while the deal is still in
/// `GiftSent`. Returning `true` moves the deal to `Verified`, `false` to
/// `Flagged`. Real implementations would query an external system; the default
/// never verifies.
#[async_trait]
pub trait TransferVerifier: Send + Sync {
    async fn verify(&self, deal: &Deal) -> bool;
}

/// Default verifier: no external check exists, so nothing ever verifies
/// automatically and unresolved deals are flagged.
pub struct NoVerification;

#[async_trait]
impl TransferVerifier for NoVerification {
    async fn verify(&self, _deal: &Deal) -> bool {
        false
    }
}
