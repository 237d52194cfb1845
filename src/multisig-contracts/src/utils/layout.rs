//! Persisted state layouts and deterministic addresses.
//!
//! An account's address is the hash of its code and initial data, so the
//! exact bit layout here is part of every Wallet's and Order's identity.

use alloy_primitives::U256;

use multisig_types::{
    Address, AuthorizationContext, AuthorizationSnapshot, Cell, CellBuilder, CellError, DictError,
    PartyList, StateInit, EXPIRATION_BITS,
};

use crate::{constants::APPROVALS_MASK_BITS, errors::DecodeError};

const WALLET_CODE_TAG: u32 = 0x6d73_6967;
const ORDER_CODE_TAG: u32 = 0x6f72_6472;
const CODE_VERSION: u8 = 2;

/// Code cell every Order account runs.
pub fn order_code() -> Result<Cell, CellError> {
    CellBuilder::new()
        .store_uint(ORDER_CODE_TAG as u64, 32)?
        .store_uint(CODE_VERSION as u64, 8)?
        .build()
}

/// Code cell of the Wallet. It embeds the Order code it trusts, which is
/// what lets it derive Order addresses.
pub fn wallet_code() -> Result<Cell, CellError> {
    CellBuilder::new()
        .store_uint(WALLET_CODE_TAG as u64, 32)?
        .store_uint(CODE_VERSION as u64, 8)?
        .store_ref(order_code()?)?
        .build()
}

/// Initial data of the Order with `seqno`: only the back-reference and the
/// salt, so the address is known before the Order exists.
pub fn order_state_init(wallet: &Address, seqno: u32) -> Result<StateInit, CellError> {
    let mut b = CellBuilder::new();
    wallet.store(&mut b)?;
    b.store_uint(seqno as u64, 32)?;
    Ok(StateInit::new(order_code()?, b.build()?))
}

pub fn order_address(wallet: &Address, seqno: u32) -> Result<Address, CellError> {
    order_state_init(wallet, seqno)?.address(wallet.workchain)
}

/// Persisted Wallet data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletState {
    pub next_order_seqno: u32,
    pub auth: AuthorizationContext,
}

impl WalletState {
    pub fn new(auth: AuthorizationContext) -> Self {
        Self {
            next_order_seqno: 0,
            auth,
        }
    }

    pub fn to_cell(&self) -> Result<Cell, DictError> {
        let signers = self
            .auth
            .signers
            .to_dict()?
            .ok_or(CellError::Malformed("wallet without signers"))?;
        let proposers = self.auth.proposers.to_dict()?;
        let cell = CellBuilder::new()
            .store_uint(self.next_order_seqno as u64, 32)?
            .store_uint(self.auth.threshold as u64, 8)?
            .store_ref(signers)?
            .store_uint(self.auth.signers.len() as u64, 8)?
            .store_maybe_ref(proposers.as_ref())?
            .store_maybe_ref(self.auth.modules.as_ref())?
            .store_maybe_ref(self.auth.guard.as_ref())?
            .build()?;
        Ok(cell)
    }

    pub fn from_cell(cell: &Cell) -> Result<Self, DecodeError> {
        let mut s = cell.as_slice();
        let next_order_seqno = s.load_u32()?;
        let threshold = s.load_u8()?;
        let signers = PartyList::from_dict(Some(&s.load_ref()?))?;
        let _signers_num = s.load_u8()?;
        let proposers = PartyList::from_dict(s.load_maybe_ref()?.as_ref())?;
        let modules = s.load_maybe_ref()?;
        let guard = s.load_maybe_ref()?;
        s.end_parse()?;
        Ok(Self {
            next_order_seqno,
            auth: AuthorizationContext {
                threshold,
                signers,
                proposers,
                modules,
                guard,
            },
        })
    }

    pub fn state_init(&self) -> Result<StateInit, DictError> {
        Ok(StateInit::new(wallet_code()?, self.to_cell()?))
    }
}

/// What an Order records once the Wallet has initialized it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBody {
    pub snapshot: AuthorizationSnapshot,
    pub executed: bool,
    pub approvals: U256,
    pub approvals_num: u8,
    pub expiration: u64,
    pub order: Cell,
}

impl OrderBody {
    pub fn new(snapshot: AuthorizationSnapshot, expiration: u64, order: Cell) -> Self {
        Self {
            snapshot,
            executed: false,
            approvals: U256::ZERO,
            approvals_num: 0,
            expiration,
            order,
        }
    }

    pub fn is_approved_by(&self, index: u8) -> bool {
        self.approvals.bit(index as usize)
    }

    /// Sets the bit of `index`; false when it was already set.
    pub fn record_approval(&mut self, index: u8) -> bool {
        if self.is_approved_by(index) {
            return false;
        }
        self.approvals.set_bit(index as usize, true);
        self.approvals_num += 1;
        true
    }

    pub fn threshold_reached(&self) -> bool {
        self.approvals_num >= self.snapshot.threshold
    }
}

/// Persisted Order data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderState {
    pub wallet: Address,
    pub seqno: u32,
    /// `None` until `init` arrives.
    pub body: Option<OrderBody>,
}

impl OrderState {
    pub fn to_cell(&self) -> Result<Cell, DictError> {
        let mut b = CellBuilder::new();
        self.wallet.store(&mut b)?;
        b.store_uint(self.seqno as u64, 32)?;
        if let Some(body) = &self.body {
            let signers = body
                .snapshot
                .signers
                .to_dict()?
                .ok_or(CellError::Malformed("order without signers"))?;
            b.store_uint(body.snapshot.threshold as u64, 8)?
                .store_bit(body.executed)?
                .store_ref(signers)?
                .store_uint(body.snapshot.signers.len() as u64, 8)?
                .store_u256(&body.approvals, APPROVALS_MASK_BITS)?
                .store_uint(body.approvals_num as u64, 8)?
                .store_uint(body.expiration, EXPIRATION_BITS)?
                .store_ref(body.order.clone())?;
        }
        Ok(b.build()?)
    }

    pub fn from_cell(cell: &Cell) -> Result<Self, DecodeError> {
        let mut s = cell.as_slice();
        let wallet = Address::load(&mut s)?;
        let seqno = s.load_u32()?;
        if s.is_empty() {
            return Ok(Self {
                wallet,
                seqno,
                body: None,
            });
        }
        let threshold = s.load_u8()?;
        let executed = s.load_bit()?;
        let signers = PartyList::from_dict(Some(&s.load_ref()?))?;
        let _signers_num = s.load_u8()?;
        let approvals = s.load_u256(APPROVALS_MASK_BITS)?;
        let approvals_num = s.load_u8()?;
        let expiration = s.load_uint(EXPIRATION_BITS)?;
        let order = s.load_ref()?;
        s.end_parse()?;
        Ok(Self {
            wallet,
            seqno,
            body: Some(OrderBody {
                snapshot: AuthorizationSnapshot::new(threshold, signers)?,
                executed,
                approvals,
                approvals_num,
                expiration,
                order,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::B256;

    fn addr(n: u8) -> Address {
        Address::new(0, B256::repeat_byte(n))
    }

    #[test]
    fn order_addresses_are_unique_per_seqno() {
        let wallet = addr(1);
        let a = order_address(&wallet, 0).unwrap();
        let b = order_address(&wallet, 1).unwrap();
        let c = order_address(&addr(2), 0).unwrap();
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, order_address(&wallet, 0).unwrap());
    }

    #[test]
    fn order_body_tracks_approvals() {
        let snapshot =
            AuthorizationSnapshot::new(2, PartyList::new(vec![addr(1), addr(2)]).unwrap()).unwrap();
        let mut body = OrderBody::new(snapshot, 100, Cell::empty());
        assert!(body.record_approval(1));
        assert!(!body.record_approval(1));
        assert!(!body.threshold_reached());
        assert!(body.record_approval(0));
        assert!(body.threshold_reached());

        let state = OrderState {
            wallet: addr(9),
            seqno: 4,
            body: Some(body),
        };
        assert_eq!(OrderState::from_cell(&state.to_cell().unwrap()).unwrap(), state);
    }

    #[test]
    fn uninitialized_order_is_just_the_salt() {
        let init = order_state_init(&addr(3), 7).unwrap();
        let state = OrderState::from_cell(&init.data).unwrap();
        assert_eq!(state.wallet, addr(3));
        assert_eq!(state.seqno, 7);
        assert!(state.body.is_none());
    }
}
