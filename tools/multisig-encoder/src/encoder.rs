use multisig_types::{
    dict::build_index_dict, send_mode, Action, ActionOp, Address, AuthError, AuthorizationUpdate,
    BodyLayout, Cell, CellBuilder, CellError, DictError, InternalMessage, OrderOp, PartyList,
    WalletOp, CHAINED_CHUNK_SIZE, EXPIRATION_BITS, MAX_ACTIONS_PER_ORDER,
};

/// Value attached to each self-call that continues a chained batch, in
/// nanotons. Covers the Wallet's compute for one `execute_internal` hop.
pub const CHAINED_EXECUTION_VALUE: u128 = 10_000_000;

const ORDER_KEY_BITS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    #[error("an order needs at least one action")]
    EmptyOrder,
    #[error("{0} actions do not fit one order; chain them with pack_large")]
    TooManyActions(usize),
    #[error(transparent)]
    Cell(#[from] CellError),
    #[error(transparent)]
    Dict(#[from] DictError),
    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Encode one action cell.
pub fn encode_action(action: &Action) -> Result<Cell, EncodeError> {
    let mut b = CellBuilder::new();
    match action {
        Action::Transfer { send_mode, message } => {
            b.store_uint(ActionOp::SendMessage as u64, 32)?
                .store_uint(*send_mode as u64, 8)?
                .store_ref(message.clone())?;
        }
        Action::UpdateAuthorization(update) => {
            b.store_uint(ActionOp::UpdateMultisigParams as u64, 32)?
                .store_uint(update.threshold as u64, 8)?
                .store_maybe_ref(update.signers.as_ref())?
                .store_maybe_ref(update.proposers.as_ref())?
                .store_maybe_ref(update.modules.as_ref())?
                .store_maybe_ref(update.guard.as_ref())?;
        }
    }
    Ok(b.build()?)
}

pub fn transfer_action(send_mode: u8, message: &InternalMessage) -> Result<Action, EncodeError> {
    Ok(Action::Transfer {
        send_mode,
        message: message.to_cell()?,
    })
}

/// Replace the Wallet's authorization with the given lists.
pub fn update_action(
    threshold: u8,
    signers: &[Address],
    proposers: &[Address],
    modules: Option<Cell>,
    guard: Option<Cell>,
) -> Result<Action, EncodeError> {
    Ok(Action::UpdateAuthorization(AuthorizationUpdate {
        threshold,
        signers: PartyList::new(signers.to_vec())?.to_dict()?,
        proposers: PartyList::new(proposers.to_vec())?.to_dict()?,
        modules,
        guard,
    }))
}

/// Pack up to 255 actions into one batch dictionary keyed `0..n`.
pub fn pack_order(actions: &[Action]) -> Result<Cell, EncodeError> {
    if actions.is_empty() {
        return Err(EncodeError::EmptyOrder);
    }
    if actions.len() > MAX_ACTIONS_PER_ORDER {
        return Err(EncodeError::TooManyActions(actions.len()));
    }
    let cells = actions
        .iter()
        .map(encode_action)
        .collect::<Result<Vec<_>, _>>()?;
    let root = build_index_dict(&cells, ORDER_KEY_BITS, |b, cell| {
        b.store_ref(cell.clone()).map(|_| ())
    })?;
    root.ok_or(EncodeError::EmptyOrder)
}

/// Pack any number of actions. Batches over 255 actions are split into
/// chunks; every chunk but the last ends with a self-transfer to `wallet`
/// carrying `execute_internal` of the next chunk.
pub fn pack_large(actions: &[Action], wallet: &Address) -> Result<Cell, EncodeError> {
    if actions.len() <= MAX_ACTIONS_PER_ORDER {
        return pack_order(actions);
    }
    let mut chunks = actions.chunks(CHAINED_CHUNK_SIZE).rev();
    let mut tail = match chunks.next() {
        Some(last) => pack_order(last)?,
        None => return Err(EncodeError::EmptyOrder),
    };
    for chunk in chunks {
        let body = execute_internal_body(&tail, 0)?;
        let hop = InternalMessage::new(*wallet, CHAINED_EXECUTION_VALUE, true, body)
            .with_body_layout(BodyLayout::Ref);
        let mut batch = chunk.to_vec();
        batch.push(transfer_action(send_mode::PAY_FEES_SEPARATELY, &hop)?);
        tail = pack_order(&batch)?;
    }
    Ok(tail)
}

pub fn new_order_body(
    order: &Cell,
    expiration: u64,
    is_signer: bool,
    index: u8,
    query_id: u64,
) -> Result<Cell, EncodeError> {
    Ok(CellBuilder::new()
        .store_uint(WalletOp::NewOrder as u64, 32)?
        .store_uint(query_id, 64)?
        .store_bit(is_signer)?
        .store_uint(index as u64, 8)?
        .store_uint(expiration, EXPIRATION_BITS)?
        .store_ref(order.clone())?
        .build()?)
}

pub fn execute_internal_body(order: &Cell, query_id: u64) -> Result<Cell, EncodeError> {
    Ok(CellBuilder::new()
        .store_uint(WalletOp::ExecuteInternal as u64, 32)?
        .store_uint(query_id, 64)?
        .store_ref(order.clone())?
        .build()?)
}

pub fn approve_body(index: u8, query_id: u64) -> Result<Cell, EncodeError> {
    Ok(CellBuilder::new()
        .store_uint(OrderOp::Approve as u64, 32)?
        .store_uint(query_id, 64)?
        .store_uint(index as u64, 8)?
        .build()?)
}

/// Text comment `approve`, for signers that can only send comments.
pub fn approve_comment() -> Result<Cell, EncodeError> {
    comment("approve")
}

pub fn comment(text: &str) -> Result<Cell, EncodeError> {
    Ok(CellBuilder::new()
        .store_uint(0, 32)?
        .store_bytes(text.as_bytes())?
        .build()?)
}
