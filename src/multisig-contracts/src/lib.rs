//! Multisig Wallet and Order contracts.
//!
//! A Wallet holds funds and an authorization context (threshold, signers,
//! proposers). Every proposal becomes a separate Order account at an
//! address derived from the Wallet and a sequence number; the Order
//! collects approvals and, on quorum, sends its action batch back to the
//! Wallet for execution. [`fees::FeeEstimator`] prices that round trip and
//! [`chain::Blockchain`] runs it.

pub mod chain;
pub mod constants;
pub mod decoder;
pub mod dispatch;
pub mod errors;
pub mod fees;
pub mod order;
pub mod utils;
pub mod wallet;

pub use chain::{Blockchain, ChainError, Trace, Transaction};
pub use errors::{exit_code, DecodeError, EstimateError, OrderError, WalletError};
pub use fees::{FeeEstimator, FeeQuote, OrderProposal};
pub use order::Order;
pub use utils::layout::{order_address, OrderBody, OrderState, WalletState};
pub use wallet::Wallet;
