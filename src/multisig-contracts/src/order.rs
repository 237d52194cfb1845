//! The Order contract.
//!
//! One proposal: deployed and initialized by the Wallet, collects signer
//! approvals against the snapshot it was created with, and sends the batch
//! back to the Wallet exactly once when the threshold is reached.

use tracing::debug;

use multisig_types::{
    opcodes::COMMENT_OP, send_mode, Address, AuthorizationSnapshot, Cell, CellError, CellSlice,
    OrderOp, PartyList,
};

use crate::{
    chain::{Abort, Contract, InboundMessage, TxContext},
    constants::{ORDER_APPROVE_GAS, ORDER_EXECUTE_GAS, ORDER_INIT_GAS},
    decoder::{decode_approve, decode_init, is_approve_comment},
    errors::{DecodeError, OrderError},
    utils::{
        layout::{order_code, OrderBody, OrderState},
        messages::{ack_message, execute_body, execute_message},
    },
};

pub struct Order;

impl Order {
    pub fn order_data(data: &Cell) -> Result<OrderState, DecodeError> {
        OrderState::from_cell(data)
    }

    fn init(
        ctx: &mut TxContext<'_>,
        mut state: OrderState,
        msg: &InboundMessage,
        query_id: u64,
        body: &mut CellSlice,
    ) -> Result<Cell, OrderError> {
        if msg.src != state.wallet {
            return Err(OrderError::UnauthorizedInit);
        }
        if state.body.is_some() {
            return Err(OrderError::AlreadyInited);
        }
        let request = decode_init(body)?;
        ctx.consume_gas(ORDER_INIT_GAS);

        let signers = PartyList::from_dict(Some(&request.signers))?;
        if signers.len() != request.signers_num as usize {
            return Err(OrderError::InconsistentData);
        }
        let snapshot = AuthorizationSnapshot::new(request.threshold, signers)?;
        if request.expiration < ctx.now as u64 {
            return Err(OrderError::Expired);
        }

        let mut order = OrderBody::new(snapshot, request.expiration, request.order);
        if let Some(index) = request.approve_on_init {
            ctx.consume_gas(ORDER_APPROVE_GAS);
            if order.snapshot.signers.get(index).is_none() {
                return Err(OrderError::InconsistentData);
            }
            order.record_approval(index);
            if order.threshold_reached() {
                Self::fire(ctx, &state.wallet, state.seqno, &mut order, query_id)?;
            }
        }
        debug!(seqno = state.seqno, approvals = order.approvals_num, "order initialized");
        state.body = Some(order);
        Ok(state.to_cell()?)
    }

    /// Approval by the signer at `index`, already authenticated as the sender.
    fn approve(
        ctx: &mut TxContext<'_>,
        mut state: OrderState,
        index: u8,
        sender: Address,
        query_id: u64,
    ) -> Result<Cell, OrderError> {
        ctx.consume_gas(ORDER_APPROVE_GAS);
        let Some(order) = state.body.as_mut() else {
            return Err(OrderError::UnauthorizedSign);
        };

        if order.executed {
            ctx.send(
                &ack_message(sender, OrderOp::AlreadyExecuted, query_id)?,
                send_mode::CARRY_REMAINING_VALUE,
            )?;
            return Ok(state.to_cell()?);
        }
        if ctx.now as u64 > order.expiration {
            ctx.send(
                &ack_message(sender, OrderOp::Expired, query_id)?,
                send_mode::CARRY_REMAINING_VALUE,
            )?;
            ctx.send(
                &ack_message(state.wallet, OrderOp::Expired, query_id)?,
                send_mode::CARRY_ALL_BALANCE,
            )?;
            debug!(seqno = state.seqno, "late approval refunded");
            return Ok(state.to_cell()?);
        }
        if !order.record_approval(index) {
            return Err(OrderError::AlreadyApproved);
        }
        ctx.send(
            &ack_message(sender, OrderOp::Approved, query_id)?,
            send_mode::CARRY_REMAINING_VALUE,
        )?;
        if order.threshold_reached() {
            Self::fire(ctx, &state.wallet, state.seqno, order, query_id)?;
        }
        Ok(state.to_cell()?)
    }

    /// Sends the batch to the Wallet with everything the Order holds.
    fn fire(
        ctx: &mut TxContext<'_>,
        wallet: &Address,
        seqno: u32,
        order: &mut OrderBody,
        query_id: u64,
    ) -> Result<(), OrderError> {
        ctx.consume_gas(ORDER_EXECUTE_GAS);
        let body = execute_body(
            query_id,
            seqno,
            order.expiration,
            order.snapshot.signers_hash(),
            &order.order,
        )?;
        ctx.send(&execute_message(*wallet, body), send_mode::CARRY_ALL_BALANCE)?;
        order.executed = true;
        debug!(seqno, approvals = order.approvals_num, "order executed");
        Ok(())
    }
}

impl Contract for Order {
    fn name(&self) -> &'static str {
        "order"
    }

    fn code(&self) -> Result<Cell, CellError> {
        order_code()
    }

    fn receive(
        &self,
        ctx: &mut TxContext<'_>,
        data: Cell,
        msg: &InboundMessage,
    ) -> Result<Cell, Abort> {
        let mut body = msg.body.as_slice();
        if msg.bounced || body.remaining_bits() < 32 {
            return Ok(data);
        }
        let op = body.load_u32().map_err(OrderError::from)?;
        let state = OrderState::from_cell(&data).map_err(OrderError::from)?;

        let result = if op == COMMENT_OP {
            if !is_approve_comment(&body) {
                return Err(OrderError::UnknownOp(op).into());
            }
            let index = state
                .body
                .as_ref()
                .and_then(|order| order.snapshot.signers.position(&msg.src))
                .ok_or(OrderError::UnauthorizedSign);
            index.and_then(|index| Self::approve(ctx, state, index, msg.src, 0))
        } else {
            let query_id = body.load_u64().map_err(OrderError::from)?;
            match OrderOp::try_from(op) {
                Ok(OrderOp::Init) => Self::init(ctx, state, msg, query_id, &mut body),
                Ok(OrderOp::Approve) => decode_approve(&mut body)
                    .map_err(OrderError::from)
                    .and_then(|index| {
                        let signer = state
                            .body
                            .as_ref()
                            .and_then(|order| order.snapshot.signers.get(index));
                        if signer != Some(&msg.src) {
                            return Err(OrderError::UnauthorizedSign);
                        }
                        Self::approve(ctx, state, index, msg.src, query_id)
                    }),
                _ => Err(OrderError::UnknownOp(op)),
            }
        };
        result.map_err(|e| {
            debug!(op, src = %msg.src, error = %e, "order rejected");
            Abort::from(e)
        })
    }
}
