//! # gbot-escrow
//!
//! Escrow domain core: wallet registry, deal registry and id generation, the deal
//! lifecycle state machine, the timeout scheduler, and the per-user conversation
//! sessions. Consumes inbound [`gbot_core::Event`]s and emits outbound
//! [`gbot_core::Directive`]s through an injected [`gbot_core::Notifier`];
//! no transport code lives here.

pub mod deal;
pub mod ids;
pub mod service;
pub mod session;
pub mod timeout;
pub mod verify;
pub mod wallet;

pub use deal::{Deal, DealRegistry, DealState};
pub use ids::DealIdGenerator;
pub use service::{EscrowConfig, EscrowService};
pub use session::{Session, SessionOutcome, SessionStore};
pub use timeout::TimeoutScheduler;
pub use verify::{NoVerification, TransferVerifier};
pub use wallet::{WalletProfile, WalletRegistry};
