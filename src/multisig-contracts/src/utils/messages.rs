//! Messages the Wallet and Orders send each other.
//!
//! The Fee Estimator rebuilds the same messages with these functions, so
//! what it prices is bit-for-bit what the contracts emit.

use alloy_primitives::B256;

use multisig_types::{
    Address, AuthorizationSnapshot, BodyLayout, Cell, CellBuilder, CellError, DictError,
    InternalMessage, OrderOp, StateInit, WalletOp, EXPIRATION_BITS,
};


/// Body of the Order `init` message.
pub fn order_init_body(
    query_id: u64,
    snapshot: &AuthorizationSnapshot,
    expiration: u64,
    order: &Cell,
    approve_on_init: Option<u8>,
) -> Result<Cell, DictError> {
    let signers = snapshot
        .signers
        .to_dict()?
        .ok_or(CellError::Malformed("snapshot without signers"))?;
    let mut b = CellBuilder::new();
    b.store_uint(OrderOp::Init as u64, 32)?
        .store_uint(query_id, 64)?
        .store_uint(snapshot.threshold as u64, 8)?
        .store_ref(signers)?
        .store_uint(snapshot.signers.len() as u64, 8)?
        .store_uint(expiration, EXPIRATION_BITS)?
        .store_ref(order.clone())?;
    match approve_on_init {
        Some(index) => {
            b.store_bit(true)?.store_uint(index as u64, 8)?;
        }
        None => {
            b.store_bit(false)?;
        }
    }
    Ok(b.build()?)
}

/// Deploys the Order and initializes it in one message.
pub fn order_init_message(order: Address, state_init: StateInit, body: Cell) -> InternalMessage {
    InternalMessage::new(order, 0, true, body)
        .with_init(state_init)
        .with_body_layout(BodyLayout::Ref)
}

pub fn execute_body(
    query_id: u64,
    seqno: u32,
    expiration: u64,
    signers_hash: B256,
    order: &Cell,
) -> Result<Cell, CellError> {
    CellBuilder::new()
        .store_uint(WalletOp::Execute as u64, 32)?
        .store_uint(query_id, 64)?
        .store_uint(seqno as u64, 32)?
        .store_uint(expiration, EXPIRATION_BITS)?
        .store_bytes(signers_hash.as_slice())?
        .store_ref(order.clone())?
        .build()
}

pub fn execute_message(wallet: Address, body: Cell) -> InternalMessage {
    InternalMessage::new(wallet, 0, true, body).with_body_layout(BodyLayout::Ref)
}

/// `approved`, `expired` or `already_executed` notice; fits in the root.
pub fn ack_message(dest: Address, op: OrderOp, query_id: u64) -> Result<InternalMessage, CellError> {
    let body = CellBuilder::new()
        .store_uint(op as u64, 32)?
        .store_uint(query_id, 64)?
        .build()?;
    Ok(InternalMessage::new(dest, 0, false, body).with_body_layout(BodyLayout::Inline))
}
