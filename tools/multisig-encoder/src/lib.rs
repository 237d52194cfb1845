//! Client-side encoders for the multisig Wallet: batched actions, order
//! packing with large-batch chaining, and the bodies signers and proposers
//! send.

pub mod encoder;
pub mod types;

mod tests;

pub use encoder::{
    approve_body, approve_comment, comment, encode_action, execute_internal_body, new_order_body,
    pack_large, pack_order, transfer_action, update_action, EncodeError, CHAINED_EXECUTION_VALUE,
};
pub use types::{ActionRequest, TransferRequest, UpdateRequest};
