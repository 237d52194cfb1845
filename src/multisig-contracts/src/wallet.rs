//! The Wallet contract.
//!
//! Holds funds and the live authorization context, allocates Order
//! sequence numbers, deploys Orders and executes their batches once an
//! Order reports quorum.

use tracing::debug;

use multisig_types::{
    opcodes::COMMENT_OP, send_mode, Address, Cell, CellError, CellSlice, NetworkConfig, WalletOp,
};

use crate::{
    chain::{Abort, Contract, InboundMessage, TxContext},
    constants::{
        WALLET_EXECUTE_GAS, WALLET_EXECUTE_INTERNAL_GAS, WALLET_NEW_ORDER_GAS, WALLET_TOP_UP_GAS,
    },
    decoder::{decode_action_list, decode_execute, decode_execute_internal, decode_new_order},
    dispatch::dispatch_actions,
    errors::{DecodeError, WalletError},
    fees::{FeeEstimator, FeeQuote, OrderProposal},
    utils::{
        layout::{order_address, order_state_init, wallet_code, WalletState},
        messages::{order_init_body, order_init_message},
    },
};

pub struct Wallet;

impl Wallet {
    /// Address of the Order `wallet` deploys for `seqno`.
    pub fn order_address(wallet: &Address, seqno: u32) -> Result<Address, CellError> {
        order_address(wallet, seqno)
    }

    pub fn wallet_data(data: &Cell) -> Result<WalletState, DecodeError> {
        WalletState::from_cell(data)
    }

    /// Quote for the next order of the Wallet holding `data`.
    ///
    /// Prices the order as if the first signer proposed it.
    pub fn order_estimate(
        config: &NetworkConfig,
        wallet: &Address,
        data: &Cell,
        order: &Cell,
        now: u64,
        expiration: u64,
    ) -> Result<FeeQuote, WalletError> {
        let state = WalletState::from_cell(data)?;
        let snapshot = state.auth.snapshot()?;
        let proposal = OrderProposal {
            wallet: *wallet,
            seqno: state.next_order_seqno,
            snapshot: &snapshot,
            order,
            approve_on_init: Some(0),
        };
        Ok(FeeEstimator::new(config).estimate(&proposal, now, expiration)?)
    }

    /// Deploys the next Order. All-or-nothing: on any rejection, including
    /// `not_enough_ton`, nothing is persisted and `next_order_seqno` is not
    /// consumed, so the next accepted order takes the same seqno.
    fn new_order(
        ctx: &mut TxContext<'_>,
        mut state: WalletState,
        msg: &InboundMessage,
        query_id: u64,
        body: &mut CellSlice,
    ) -> Result<Cell, WalletError> {
        let request = decode_new_order(body)?;
        ctx.consume_gas(WALLET_NEW_ORDER_GAS);

        let seqno = state.next_order_seqno;
        let next_seqno = seqno.checked_add(1).ok_or(WalletError::SeqnoExhausted)?;
        let parties = if request.is_signer {
            &state.auth.signers
        } else {
            &state.auth.proposers
        };
        if parties.get(request.index) != Some(&msg.src) {
            return Err(WalletError::UnauthorizedNewOrder);
        }
        if request.expiration <= ctx.now as u64 {
            return Err(WalletError::Expired);
        }
        decode_action_list(&request.order).map_err(|_| WalletError::InvalidNewOrder)?;

        let snapshot = state.auth.snapshot()?;
        let approve_on_init = request.is_signer.then_some(request.index);
        let quote = FeeEstimator::new(ctx.config).estimate(
            &OrderProposal {
                wallet: ctx.address,
                seqno,
                snapshot: &snapshot,
                order: &request.order,
                approve_on_init,
            },
            ctx.now as u64,
            request.expiration,
        )?;
        if msg.value < quote.total {
            return Err(WalletError::NotEnoughTon {
                required: quote.total,
                provided: msg.value,
            });
        }

        let init = order_state_init(&ctx.address, seqno)?;
        let order = init.address(ctx.address.workchain)?;
        let init_body = order_init_body(
            query_id,
            &snapshot,
            request.expiration,
            &request.order,
            approve_on_init,
        )?;
        ctx.send(
            &order_init_message(order, init, init_body),
            send_mode::CARRY_REMAINING_VALUE,
        )?;
        state.next_order_seqno = next_seqno;
        debug!(seqno, %order, required = quote.total, "order created");
        Ok(state.to_cell()?)
    }

    /// Checks an `execute` from an Order and returns its batch.
    fn authorize_execute(
        ctx: &mut TxContext<'_>,
        state: &WalletState,
        msg: &InboundMessage,
        body: &mut CellSlice,
    ) -> Result<Cell, WalletError> {
        let request = decode_execute(body)?;
        ctx.consume_gas(WALLET_EXECUTE_GAS);

        if msg.src != order_address(&ctx.address, request.seqno)? {
            return Err(WalletError::UnauthorizedExecute);
        }
        if state.auth.signers_hash()? != request.signers_hash {
            return Err(WalletError::SignersOutdated);
        }
        if request.expiration < ctx.now as u64 {
            return Err(WalletError::Expired);
        }
        Ok(request.order)
    }

    fn authorize_execute_internal(
        ctx: &mut TxContext<'_>,
        msg: &InboundMessage,
        body: &mut CellSlice,
    ) -> Result<Cell, WalletError> {
        if msg.src != ctx.address {
            return Err(WalletError::UnauthorizedExecute);
        }
        let order = decode_execute_internal(body)?;
        ctx.consume_gas(WALLET_EXECUTE_INTERNAL_GAS);
        Ok(order)
    }

    /// Dispatches `order`. A failing action keeps what came before it.
    fn run_batch(
        ctx: &mut TxContext<'_>,
        mut state: WalletState,
        order: &Cell,
    ) -> Result<Cell, Abort> {
        let actions = decode_action_list(order).map_err(WalletError::from)?;
        match dispatch_actions(ctx, &mut state.auth, &actions) {
            Ok(()) => Ok(state.to_cell().map_err(WalletError::from)?),
            Err(halt) => {
                debug!(index = halt.index, error = %halt.error, "batch halted");
                let data = state.to_cell().map_err(WalletError::from)?;
                Err(Abort::commit(halt.error.exit_code(), data))
            }
        }
    }
}

impl Contract for Wallet {
    fn name(&self) -> &'static str {
        "wallet"
    }

    fn code(&self) -> Result<Cell, CellError> {
        wallet_code()
    }

    fn receive(
        &self,
        ctx: &mut TxContext<'_>,
        data: Cell,
        msg: &InboundMessage,
    ) -> Result<Cell, Abort> {
        if msg.bounced {
            return Ok(data);
        }
        let mut body = msg.body.as_slice();
        if body.remaining_bits() < 32 {
            ctx.consume_gas(WALLET_TOP_UP_GAS);
            return Ok(data);
        }
        let op = body.load_u32().map_err(WalletError::from)?;
        if op == COMMENT_OP {
            ctx.consume_gas(WALLET_TOP_UP_GAS);
            return Ok(data);
        }
        let query_id = body.load_u64().map_err(WalletError::from)?;
        let state = WalletState::from_cell(&data).map_err(WalletError::from)?;

        let result = match WalletOp::try_from(op) {
            Ok(WalletOp::NewOrder) => {
                Self::new_order(ctx, state, msg, query_id, &mut body).map_err(Abort::from)
            }
            Ok(WalletOp::Execute) => Self::authorize_execute(ctx, &state, msg, &mut body)
                .map_err(Abort::from)
                .and_then(|order| Self::run_batch(ctx, state, &order)),
            Ok(WalletOp::ExecuteInternal) => {
                Self::authorize_execute_internal(ctx, msg, &mut body)
                    .map_err(Abort::from)
                    .and_then(|order| Self::run_batch(ctx, state, &order))
            }
            Err(()) => Err(WalletError::UnknownOp(op).into()),
        };
        if let Err(abort) = &result {
            debug!(op, query_id, src = %msg.src, exit_code = abort.exit_code, "wallet rejected");
        }
        result
    }
}
