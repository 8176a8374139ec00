//! Notifier abstraction for delivering outbound directives.
//!
//! [`Notifier`] is transport-agnostic; the telegram crate implements it via teloxide,
//! tests substitute a recording implementation.

use crate::error::Result;
use crate::types::Directive;
use async_trait::async_trait;

/// Sink for outbound directives. Implementations map to a transport (e.g. Telegram).
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers one directive to its addressee.
    async fn notify(&self, directive: Directive) -> Result<()>;
}
