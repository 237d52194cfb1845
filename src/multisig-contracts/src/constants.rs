//! Gas charged per handler path, and other protocol constants.
//!
//! The Fee Estimator prices the Wallet -> Order -> Wallet round trip from
//! this same table, so a path's cost must be charged exactly once and only
//! through [`crate::chain::TxContext::consume_gas`].

pub const WALLET_NEW_ORDER_GAS: u64 = 10_152;
pub const WALLET_EXECUTE_GAS: u64 = 7_076;
pub const WALLET_EXECUTE_INTERNAL_GAS: u64 = 3_888;
pub const WALLET_TOP_UP_GAS: u64 = 309;

pub const ORDER_INIT_GAS: u64 = 4_906;
pub const ORDER_APPROVE_GAS: u64 = 3_214;
/// Extra cost of the approval that reaches the threshold.
pub const ORDER_EXECUTE_GAS: u64 = 7_786;

/// Text comment accepted as an approval.
pub const APPROVE_COMMENT: &[u8] = b"approve";

pub const APPROVALS_MASK_BITS: usize = 255;
