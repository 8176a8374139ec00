use crate::types::DealId;
use thiserror::Error;

/// Errors raised by escrow operations. None of these are fatal: the service
/// recovers at the offending action and surfaces a message to the actor.
#[derive(Error, Debug)]
pub enum EscrowError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Deal not found: {0}")]
    DealNotFound(DealId),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Wallet not configured for user {0}")]
    WalletNotConfigured(i64),

    #[error("Cannot join own deal {0}")]
    SelfDeal(DealId),

    #[error("Notify error: {0}")]
    Notify(String),
}

pub type Result<T> = std::result::Result<T, EscrowError>;
