mod common;

use multisig_contracts::{
    constants::ORDER_APPROVE_GAS,
    exit_code,
    utils::{layout::order_state_init, messages::order_init_body},
    Transaction,
};
use multisig_encoder::pack_order;
use multisig_types::{opcodes::BOUNCE_OP, InternalMessage, OrderOp, WalletOp};

use common::{recipient, setup, text_comment, transfer, Harness, HOUR, NOW, TON};

/// 2-of-3 wallet with one proposed (not yet approved) transfer at seqno 0.
fn proposed() -> eyre::Result<(Harness, eyre::Result<()>)> {
    let mut h = setup(2, 3, 1)?;
    let order = pack_order(&[transfer(recipient(1), TON)?])?;
    let trace = h.new_order(h.proposers[0], false, 0, &order, h.expiration(), TON)?;
    let init = trace.find(&h.wallet, &h.order_address(0)?).map(|tx| tx.success);
    let check = match init {
        Some(true) => Ok(()),
        other => Err(eyre::eyre!("init failed: {other:?}")),
    };
    Ok((h, check))
}

/// What an acknowledgement carries back: the attached value less the gas
/// of an approval that does not fire and the flat forward fee of the
/// inline ack.
fn refund(h: &Harness, approval: &Transaction) -> u128 {
    let config = h.chain.config();
    assert_eq!(approval.gas_fees, config.gas.compute_fee(ORDER_APPROVE_GAS));
    TON / 10 - config.gas.compute_fee(ORDER_APPROVE_GAS) - config.msg.flat_forward_fee()
}

#[test]
fn quorum_executes_once() -> eyre::Result<()> {
    let (mut h, init) = proposed()?;
    init?;
    let order = h.order_address(0)?;

    let trace = h.approve(0, order)?;
    let ack = trace.find(&order, &h.signers[0]).expect("ack");
    assert_eq!(ack.op, Some(OrderOp::Approved as u32));
    assert_eq!(ack.value, refund(&h, &trace.transactions[0]));
    assert_eq!(h.chain.balance(&recipient(1)), 0);

    let trace = h.approve(2, order)?;
    assert!(trace.find_op(&h.wallet, WalletOp::Execute as u32).is_some());
    assert_eq!(h.chain.balance(&recipient(1)), TON);

    let state = h.order_state(&order)?.body.expect("initialized");
    assert!(state.executed);
    assert_eq!(state.approvals_num, 2);
    assert!(state.is_approved_by(0) && state.is_approved_by(2));
    assert!(!state.is_approved_by(1));

    // a late third approval is answered, not counted
    let trace = h.approve(1, order)?;
    let ack = trace.find(&order, &h.signers[1]).expect("ack");
    assert_eq!(ack.op, Some(OrderOp::AlreadyExecuted as u32));
    assert_eq!(ack.value, refund(&h, &trace.transactions[0]));
    assert!(trace.find_op(&h.wallet, WalletOp::Execute as u32).is_none());
    assert_eq!(h.order_state(&order)?.body.expect("initialized").approvals_num, 2);
    assert_eq!(h.chain.balance(&recipient(1)), TON);
    Ok(())
}

#[test]
fn duplicate_approval_bounces() -> eyre::Result<()> {
    let (mut h, init) = proposed()?;
    init?;
    let order = h.order_address(0)?;
    h.approve(0, order)?;

    let trace = h.approve(0, order)?;
    let tx = &trace.transactions[0];
    assert_eq!(tx.exit_code, Some(exit_code::ALREADY_APPROVED));
    let bounce = trace.find(&order, &h.signers[0]).expect("bounce");
    assert!(bounce.bounced);
    assert_eq!(bounce.op, Some(BOUNCE_OP));
    assert_eq!(h.order_state(&order)?.body.expect("initialized").approvals_num, 1);
    Ok(())
}

#[test]
fn approval_checks_signer_index() -> eyre::Result<()> {
    let (mut h, init) = proposed()?;
    init?;
    let order = h.order_address(0)?;

    // signer 0 using signer 1's slot
    let body = multisig_encoder::approve_body(1, 0)?;
    let trace = h.send(h.signers[0], order, TON / 10, body)?;
    assert_eq!(trace.transactions[0].exit_code, Some(exit_code::UNAUTHORIZED_SIGN));

    // proposers cannot approve
    let body = multisig_encoder::approve_body(0, 0)?;
    let trace = h.send(h.proposers[0], order, TON / 10, body)?;
    assert_eq!(trace.transactions[0].exit_code, Some(exit_code::UNAUTHORIZED_SIGN));

    assert_eq!(h.order_state(&order)?.body.expect("initialized").approvals_num, 0);
    Ok(())
}

#[test]
fn comment_approval_must_be_exact() -> eyre::Result<()> {
    let (mut h, init) = proposed()?;
    init?;
    let order = h.order_address(0)?;

    for (text, with_ref) in [
        (&b"approve "[..], false),
        (&b"approvE"[..], false),
        (&b"approv"[..], false),
        (&b"approve"[..], true),
    ] {
        let trace = h.send(h.signers[1], order, TON / 10, text_comment(text, with_ref)?)?;
        assert_eq!(trace.transactions[0].exit_code, Some(exit_code::UNKNOWN_OP));
    }
    assert_eq!(h.order_state(&order)?.body.expect("initialized").approvals_num, 0);

    let trace = h.send(h.signers[1], order, TON / 10, text_comment(b"approve", false)?)?;
    assert!(trace.transactions[0].success);
    let ack = trace.find(&order, &h.signers[1]).expect("ack");
    assert_eq!(ack.op, Some(OrderOp::Approved as u32));
    let state = h.order_state(&order)?.body.expect("initialized");
    assert!(state.is_approved_by(1));

    let trace = h.send(h.deployer, order, TON / 10, text_comment(b"approve", false)?)?;
    assert_eq!(trace.transactions[0].exit_code, Some(exit_code::UNAUTHORIZED_SIGN));
    Ok(())
}

#[test]
fn late_approval_refunds() -> eyre::Result<()> {
    let (mut h, init) = proposed()?;
    init?;
    let order = h.order_address(0)?;
    h.approve(0, order)?;

    h.chain.set_now(NOW + 2 * HOUR as u32);
    let trace = h.approve(1, order)?;

    let to_signer = trace.find(&order, &h.signers[1]).expect("signer notice");
    assert_eq!(to_signer.op, Some(OrderOp::Expired as u32));
    assert_eq!(to_signer.value, refund(&h, &trace.transactions[0]));
    let to_wallet = trace.find(&order, &h.wallet).expect("wallet notice");
    assert_eq!(to_wallet.op, Some(OrderOp::Expired as u32));
    assert_eq!(h.chain.balance(&order), 0);

    let state = h.order_state(&order)?.body.expect("initialized");
    assert!(!state.executed);
    assert_eq!(state.approvals_num, 1);
    assert_eq!(h.chain.balance(&recipient(1)), 0);
    Ok(())
}

#[test]
fn init_is_accepted_once_and_only_from_the_wallet() -> eyre::Result<()> {
    let (mut h, init) = proposed()?;
    init?;
    let order = h.order_address(0)?;
    let data_before = h.chain.data(&order).cloned();

    let state = h.wallet_state()?;
    let snapshot = state.auth.snapshot()?;
    let batch = pack_order(&[transfer(recipient(7), TON)?])?;
    let body = order_init_body(0, &snapshot, h.expiration(), &batch, None)?;

    let trace = h.send(h.wallet, order, TON / 10, body.clone())?;
    assert_eq!(trace.transactions[0].exit_code, Some(exit_code::ALREADY_INITED));
    assert_eq!(h.chain.data(&order).cloned(), data_before);

    // a fresh order address deployed by an outsider
    let stray = order_state_init(&h.wallet, 42)?;
    let stray_addr = stray.address(0)?;
    let msg = InternalMessage::new(stray_addr, TON / 10, true, body)
        .with_init(stray)
        .with_src(h.signers[0]);
    let trace = h.chain.send(msg)?;
    let tx = &trace.transactions[0];
    assert_eq!(tx.exit_code, Some(exit_code::UNAUTHORIZED_INIT));
    assert!(!tx.deployed);
    assert!(h.chain.data(&stray_addr).is_none());
    Ok(())
}

#[test]
fn bounced_messages_are_ignored() -> eyre::Result<()> {
    let (mut h, init) = proposed()?;
    init?;
    let order = h.order_address(0)?;
    let before = h.chain.data(&order).cloned();

    let mut msg = InternalMessage::new(order, TON / 10, false, multisig_encoder::approve_body(0, 0)?)
        .with_src(h.signers[0]);
    msg.bounced = true;
    let trace = h.chain.send(msg)?;
    assert!(trace.transactions[0].success);
    assert_eq!(h.chain.data(&order).cloned(), before);
    Ok(())
}
