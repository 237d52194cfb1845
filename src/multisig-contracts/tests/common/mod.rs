#![allow(dead_code)]

use alloy_primitives::B256;
use tracing_subscriber::EnvFilter;

use multisig_contracts::{
    chain::Blockchain, FeeEstimator, FeeQuote, Order, OrderProposal, OrderState, Trace, Wallet,
    WalletState,
};
use multisig_encoder::{approve_body, new_order_body, transfer_action};
use multisig_types::{
    send_mode, Action, Address, AuthorizationContext, Cell, CellBuilder, InternalMessage,
    NetworkConfig, PartyList,
};

pub const NOW: u32 = 1_700_000_000;
pub const TON: u128 = 1_000_000_000;
pub const HOUR: u64 = 3_600;

pub struct Harness {
    pub chain: Blockchain,
    pub wallet: Address,
    pub signers: Vec<Address>,
    pub proposers: Vec<Address>,
    pub deployer: Address,
}

/// Deploys a Wallet with `signers` signers and `proposers` proposers, each a
/// funded treasury, and 10 TON on the Wallet.
pub fn setup(threshold: u8, signers: usize, proposers: usize) -> eyre::Result<Harness> {
    setup_with(NetworkConfig::default(), threshold, signers, proposers)
}

pub fn setup_with(
    config: NetworkConfig,
    threshold: u8,
    signers: usize,
    proposers: usize,
) -> eyre::Result<Harness> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let mut chain = Blockchain::new(config, NOW)?;
    let signers = (0..signers)
        .map(|i| chain.treasury(&format!("signer-{i}")))
        .collect::<Result<Vec<_>, _>>()?;
    let proposers = (0..proposers)
        .map(|i| chain.treasury(&format!("proposer-{i}")))
        .collect::<Result<Vec<_>, _>>()?;
    let deployer = chain.treasury("deployer")?;

    let auth = AuthorizationContext::new(
        threshold,
        PartyList::new(signers.clone())?,
        PartyList::new(proposers.clone())?,
    )?;
    let init = WalletState::new(auth).state_init()?;
    let (wallet, trace) = chain.deploy(deployer, init, 10 * TON, Cell::empty())?;
    assert!(trace.transactions[0].deployed);

    Ok(Harness {
        chain,
        wallet,
        signers,
        proposers,
        deployer,
    })
}

pub fn recipient(n: u32) -> Address {
    let mut hash = [0xaa; 32];
    hash[28..].copy_from_slice(&n.to_be_bytes());
    Address::new(0, B256::from(hash))
}

pub fn transfer(to: Address, value: u128) -> eyre::Result<Action> {
    let msg = InternalMessage::new(to, value, false, Cell::empty());
    Ok(transfer_action(send_mode::PAY_FEES_SEPARATELY, &msg)?)
}

impl Harness {
    pub fn expiration(&self) -> u64 {
        self.chain.now() as u64 + HOUR
    }

    pub fn send(&mut self, from: Address, to: Address, value: u128, body: Cell) -> eyre::Result<Trace> {
        let msg = InternalMessage::new(to, value, true, body).with_src(from);
        Ok(self.chain.send(msg)?)
    }

    pub fn new_order(
        &mut self,
        from: Address,
        is_signer: bool,
        index: u8,
        order: &Cell,
        expiration: u64,
        value: u128,
    ) -> eyre::Result<Trace> {
        let body = new_order_body(order, expiration, is_signer, index, 0)?;
        self.send(from, self.wallet, value, body)
    }

    pub fn approve(&mut self, signer: usize, order: Address) -> eyre::Result<Trace> {
        let body = approve_body(signer as u8, 0)?;
        self.send(self.signers[signer], order, TON / 10, body)
    }

    pub fn order_address(&self, seqno: u32) -> eyre::Result<Address> {
        Ok(Wallet::order_address(&self.wallet, seqno)?)
    }

    pub fn wallet_state(&self) -> eyre::Result<WalletState> {
        let data = self
            .chain
            .data(&self.wallet)
            .ok_or_else(|| eyre::eyre!("wallet not deployed"))?;
        Ok(Wallet::wallet_data(data)?)
    }

    pub fn order_state(&self, order: &Address) -> eyre::Result<OrderState> {
        let data = self
            .chain
            .data(order)
            .ok_or_else(|| eyre::eyre!("order {order} not deployed"))?;
        Ok(Order::order_data(data)?)
    }

    /// Quote the Wallet computes for its next order.
    pub fn quote(&self, order: &Cell, expiration: u64, approve_on_init: Option<u8>) -> eyre::Result<FeeQuote> {
        let state = self.wallet_state()?;
        let snapshot = state.auth.snapshot()?;
        let proposal = OrderProposal {
            wallet: self.wallet,
            seqno: state.next_order_seqno,
            snapshot: &snapshot,
            order,
            approve_on_init,
        };
        Ok(FeeEstimator::new(self.chain.config()).estimate(
            &proposal,
            self.chain.now() as u64,
            expiration,
        )?)
    }
}

pub fn text_comment(text: &[u8], with_ref: bool) -> eyre::Result<Cell> {
    let mut b = CellBuilder::new();
    b.store_uint(0, 32)?.store_bytes(text)?;
    if with_ref {
        b.store_ref(Cell::empty())?;
    }
    Ok(b.build()?)
}
