//! # gbot-core
//!
//! Core types and traits for the escrow bot: [`Notifier`], inbound [`Event`] and outbound
//! [`Directive`] shapes, user and currency types, the error taxonomy, and tracing
//! initialization. Transport-agnostic; used by gbot-escrow and gbot-telegram.

pub mod error;
pub mod logger;
pub mod notifier;
pub mod types;

pub use error::{EscrowError, Result};
pub use logger::init_tracing;
pub use notifier::Notifier;
pub use types::{Action, Currency, DealId, Directive, Event, User};
