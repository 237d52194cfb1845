//! Fee Estimator.
//!
//! Quotes what a proposal costs end to end: compute gas along the
//! `new_order -> init -> approve -> execute` path, forwarding of the two
//! contract-to-contract messages, and the Order's storage rent until
//! expiration. The Wallet requires at least this much on `new_order`.

use serde::Serialize;

use multisig_types::{
    Address, AuthorizationSnapshot, Cell, ForwardFee, MsgPrices, NetworkConfig, StatsCollector,
    StorageStats, StoragePrices,
};

use crate::{
    constants::{
        ORDER_APPROVE_GAS, ORDER_EXECUTE_GAS, ORDER_INIT_GAS, WALLET_EXECUTE_GAS,
        WALLET_NEW_ORDER_GAS,
    },
    errors::EstimateError,
    utils::{
        layout::{order_code, order_state_init, OrderBody, OrderState},
        messages::{execute_body, execute_message, order_init_body, order_init_message},
    },
};

/// Itemized quote, in nanotons.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FeeQuote {
    pub gas: u128,
    pub forward: u128,
    pub storage: u128,
    pub total: u128,
}

/// What is being proposed, as the Wallet sees it when `new_order` arrives.
#[derive(Debug, Clone, Copy)]
pub struct OrderProposal<'a> {
    pub wallet: Address,
    pub seqno: u32,
    pub snapshot: &'a AuthorizationSnapshot,
    pub order: &'a Cell,
    pub approve_on_init: Option<u8>,
}

pub struct FeeEstimator<'a> {
    config: &'a NetworkConfig,
}

impl<'a> FeeEstimator<'a> {
    pub fn new(config: &'a NetworkConfig) -> Self {
        Self { config }
    }

    pub fn gas_fee(&self, gas: u64) -> u128 {
        self.config.gas.compute_fee(gas)
    }

    pub fn forward_fee(&self, message: &Cell) -> ForwardFee {
        message_forward_fee(&self.config.msg, message)
    }

    pub fn storage_fee(&self, code: &Cell, data: &Cell, seconds: u64) -> u128 {
        account_storage_fee(&self.config.storage, code, data, seconds)
    }

    /// Quote for `proposal` created at `now` and living until `expiration`.
    ///
    /// Every priced field is fixed width, so the result does not depend on
    /// the query id or the attached value.
    pub fn estimate(
        &self,
        proposal: &OrderProposal<'_>,
        now: u64,
        expiration: u64,
    ) -> Result<FeeQuote, EstimateError> {
        let gas = transaction_gas(proposal)
            .into_iter()
            .map(|g| self.gas_fee(g))
            .sum::<u128>();

        let state_init = order_state_init(&proposal.wallet, proposal.seqno)?;
        let order_addr = state_init.address(proposal.wallet.workchain)?;
        let init_body = order_init_body(
            0,
            proposal.snapshot,
            expiration,
            proposal.order,
            proposal.approve_on_init,
        )?;
        let init = order_init_message(order_addr, state_init, init_body).to_cell()?;
        let execute = execute_message(
            proposal.wallet,
            execute_body(
                0,
                proposal.seqno,
                expiration,
                proposal.snapshot.signers_hash(),
                proposal.order,
            )?,
        )
        .to_cell()?;
        let forward = self.forward_fee(&init).total + self.forward_fee(&execute).total;

        let data = OrderState {
            wallet: proposal.wallet,
            seqno: proposal.seqno,
            body: Some(OrderBody::new(
                proposal.snapshot.clone(),
                expiration,
                proposal.order.clone(),
            )),
        }
        .to_cell()?;
        let storage = self.storage_fee(&order_code()?, &data, expiration.saturating_sub(now));

        Ok(FeeQuote {
            gas,
            forward,
            storage,
            total: gas + forward + storage,
        })
    }
}

/// Gas of each transaction on the proposal's path to execution, one entry
/// per transaction: the network prices a transaction's gas as a whole.
pub fn transaction_gas(proposal: &OrderProposal<'_>) -> Vec<u64> {
    let firing_approve = ORDER_APPROVE_GAS + ORDER_EXECUTE_GAS;
    match proposal.approve_on_init {
        // the initial approval already reaches the threshold
        Some(_) if proposal.snapshot.threshold <= 1 => vec![
            WALLET_NEW_ORDER_GAS,
            ORDER_INIT_GAS + firing_approve,
            WALLET_EXECUTE_GAS,
        ],
        Some(_) => vec![
            WALLET_NEW_ORDER_GAS,
            ORDER_INIT_GAS + ORDER_APPROVE_GAS,
            firing_approve,
            WALLET_EXECUTE_GAS,
        ],
        None => vec![
            WALLET_NEW_ORDER_GAS,
            ORDER_INIT_GAS,
            firing_approve,
            WALLET_EXECUTE_GAS,
        ],
    }
}

/// Forwarding fee of a serialized message: everything below the root is
/// priced, the root itself is covered by the lump price.
pub fn message_forward_fee(prices: &MsgPrices, message: &Cell) -> ForwardFee {
    prices.forward_fee(StatsCollector::new().add_refs_of(message).stats())
}

pub fn account_stats(code: &Cell, data: &Cell) -> StorageStats {
    StatsCollector::new().add_cell(code).add_cell(data).stats()
}

pub fn account_storage_fee(prices: &StoragePrices, code: &Cell, data: &Cell, seconds: u64) -> u128 {
    prices.storage_fee(account_stats(code, data), seconds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::B256;
    use multisig_types::{CellBuilder, PartyList};

    fn addr(n: u8) -> Address {
        Address::new(0, B256::repeat_byte(n))
    }

    fn snapshot(n: u8) -> AuthorizationSnapshot {
        AuthorizationSnapshot::new(1, PartyList::new((1..=n).map(addr).collect()).unwrap()).unwrap()
    }

    fn batch(payload_bits: usize) -> Cell {
        let mut b = CellBuilder::new();
        b.store_bits(&vec![0xab; payload_bits.div_ceil(8)], payload_bits).unwrap();
        b.build().unwrap()
    }

    #[test]
    fn inline_root_costs_the_lump_price() {
        let config = NetworkConfig::default();
        let msg = CellBuilder::new().store_uint(7, 32).unwrap().build().unwrap();
        let fee = FeeEstimator::new(&config).forward_fee(&msg);
        assert_eq!(fee.total, config.msg.flat_forward_fee());
    }

    #[test]
    fn quote_grows_with_lifetime_and_payload() {
        let config = NetworkConfig::default();
        let estimator = FeeEstimator::new(&config);
        let snap = snapshot(3);
        let small = batch(8);
        let large = batch(800);
        let mut proposal = OrderProposal {
            wallet: addr(9),
            seqno: 0,
            snapshot: &snap,
            order: &small,
            approve_on_init: None,
        };

        let short = estimator.estimate(&proposal, 0, 3_600).unwrap();
        let long = estimator.estimate(&proposal, 0, 86_400 * 30).unwrap();
        proposal.order = &large;
        let heavy = estimator.estimate(&proposal, 0, 3_600).unwrap();

        assert_eq!(short.total, short.gas + short.forward + short.storage);
        assert_eq!(short.gas, long.gas);
        assert!(long.storage > short.storage);
        assert!(heavy.forward > short.forward);
    }

    #[test]
    fn signer_flag_adds_init_bits() {
        let config = NetworkConfig::default();
        let estimator = FeeEstimator::new(&config);
        let snap = snapshot(2);
        let order = batch(16);
        let mut proposal = OrderProposal {
            wallet: addr(4),
            seqno: 11,
            snapshot: &snap,
            order: &order,
            approve_on_init: None,
        };
        let proposer = estimator.estimate(&proposal, 100, 200).unwrap();
        proposal.approve_on_init = Some(1);
        let signer = estimator.estimate(&proposal, 100, 200).unwrap();
        assert!(signer.forward > proposer.forward);
        assert_eq!(signer.gas, proposer.gas);
    }

    #[test]
    fn gas_is_priced_per_transaction() {
        let mut config = NetworkConfig::default();
        config.gas.flat_gas_limit = 1_000;
        config.gas.flat_gas_price = 2_000_000;
        let estimator = FeeEstimator::new(&config);
        let snap = AuthorizationSnapshot::new(2, PartyList::new(vec![addr(1), addr(2)]).unwrap()).unwrap();
        let order = batch(16);
        let mut proposal = OrderProposal {
            wallet: addr(4),
            seqno: 0,
            snapshot: &snap,
            order: &order,
            approve_on_init: None,
        };

        let quote = estimator.estimate(&proposal, 0, 60).unwrap();
        let expected = [
            WALLET_NEW_ORDER_GAS,
            ORDER_INIT_GAS,
            ORDER_APPROVE_GAS + ORDER_EXECUTE_GAS,
            WALLET_EXECUTE_GAS,
        ]
        .into_iter()
        .map(|g| config.gas.compute_fee(g))
        .sum::<u128>();
        assert_eq!(quote.gas, expected);

        // a signer's own approval runs inside the init transaction
        proposal.approve_on_init = Some(0);
        assert_eq!(
            transaction_gas(&proposal),
            vec![
                WALLET_NEW_ORDER_GAS,
                ORDER_INIT_GAS + ORDER_APPROVE_GAS,
                ORDER_APPROVE_GAS + ORDER_EXECUTE_GAS,
                WALLET_EXECUTE_GAS,
            ]
        );
    }
}
