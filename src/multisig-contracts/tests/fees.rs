mod common;

use multisig_contracts::{FeeQuote, Wallet};
use multisig_encoder::pack_order;
use multisig_types::{Address, NetworkConfig, WalletOp};

use common::{recipient, setup, setup_with, transfer, Harness, NOW, TON};

/// Fees actually collected along one proposal's path, itemized like a quote.
fn collected(
    h: &mut Harness,
    proposer: Address,
    is_signer: bool,
    index: u8,
    approver: usize,
) -> eyre::Result<(FeeQuote, FeeQuote)> {
    let batch = pack_order(&[transfer(recipient(1), TON)?, transfer(recipient(2), TON)?])?;
    let expiration = h.expiration();
    let quote = h.quote(&batch, expiration, is_signer.then_some(index))?;
    let order = h.order_address(h.wallet_state()?.next_order_seqno)?;

    let created = h.new_order(proposer, is_signer, index, &batch, expiration, quote.total)?;
    let new_order = &created.transactions[0];
    assert!(new_order.success);
    let init = created.find(&h.wallet, &order).expect("init");
    assert!(init.success && init.deployed);
    // only the order init is forwarded out of new_order
    let init_forward = new_order
        .out_messages
        .iter()
        .find(|m| m.dest == order)
        .map(|m| m.fwd_fee.total)
        .expect("init message");

    h.chain.set_now(expiration as u32);
    let approved = h.approve(approver, order)?;
    let approve = &approved.transactions[0];
    let execute = approved
        .find_op(&h.wallet, WalletOp::Execute as u32)
        .expect("execute");
    assert!(execute.success);
    assert_eq!(h.chain.balance(&recipient(2)), TON);
    let execute_forward = approve
        .out_messages
        .iter()
        .find(|m| m.dest == h.wallet)
        .map(|m| m.fwd_fee.total)
        .expect("execute message");

    let gas = new_order.gas_fees + init.gas_fees + approve.gas_fees + execute.gas_fees;
    let forward = init_forward + execute_forward;
    let actual = FeeQuote {
        gas,
        forward,
        storage: approve.storage_fees,
        total: gas + forward + approve.storage_fees,
    };
    Ok((quote, actual))
}

#[test]
fn quote_matches_the_round_trip() -> eyre::Result<()> {
    let mut h = setup(1, 1, 1)?;
    let proposer = h.proposers[0];
    let (quote, actual) = collected(&mut h, proposer, false, 0, 0)?;
    assert_eq!(actual, quote);
    Ok(())
}

#[test]
fn quote_matches_when_a_signer_proposes() -> eyre::Result<()> {
    let mut h = setup(2, 2, 0)?;
    let proposer = h.signers[0];
    let (quote, actual) = collected(&mut h, proposer, true, 0, 1)?;
    assert_eq!(actual, quote);
    Ok(())
}

#[test]
fn quote_matches_under_flat_gas_pricing() -> eyre::Result<()> {
    let mut config = NetworkConfig::default();
    config.gas.flat_gas_limit = 1_000;
    config.gas.flat_gas_price = 2_000_000;

    let mut h = setup_with(config.clone(), 1, 1, 1)?;
    let proposer = h.proposers[0];
    let (quote, actual) = collected(&mut h, proposer, false, 0, 0)?;
    assert_eq!(actual, quote);

    let mut h = setup_with(config, 2, 2, 0)?;
    let proposer = h.signers[1];
    let (quote, actual) = collected(&mut h, proposer, true, 1, 0)?;
    assert_eq!(actual, quote);
    Ok(())
}

#[test]
fn signer_estimate_covers_a_proposer() -> eyre::Result<()> {
    let h = setup(2, 3, 1)?;
    let batch = pack_order(&[transfer(recipient(1), TON)?])?;
    let expiration = h.expiration();

    let data = h.chain.data(&h.wallet).expect("wallet deployed");
    let estimate = Wallet::order_estimate(h.chain.config(), &h.wallet, data, &batch, NOW as u64, expiration)?;
    assert_eq!(estimate, h.quote(&batch, expiration, Some(0))?);
    assert!(estimate.total >= h.quote(&batch, expiration, None)?.total);
    Ok(())
}

#[test]
fn storage_quote_tracks_lifetime() -> eyre::Result<()> {
    let h = setup(1, 1, 0)?;
    let batch = pack_order(&[transfer(recipient(1), TON)?])?;

    let short = h.quote(&batch, NOW as u64 + 60, Some(0))?;
    let long = h.quote(&batch, NOW as u64 + 30 * 86_400, Some(0))?;
    assert_eq!(short.gas, long.gas);
    assert_eq!(short.forward, long.forward);
    assert!(long.storage > short.storage);
    Ok(())
}
