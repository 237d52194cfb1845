//! Shared helpers for the Wallet and Order.
//!
//! Both sides must agree on these layouts byte for byte: addresses are
//! derived from them and fees are priced on them.

pub mod layout;
pub mod messages;
