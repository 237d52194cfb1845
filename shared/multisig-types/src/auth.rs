//! Authorization context of the Wallet and the snapshot an Order keeps.
//!
//! Signer and proposer lists travel as 8-bit index-keyed dictionaries. In
//! memory they are plain arenas: position `i` is the party with index `i`.
//! Every externally supplied dictionary is checked to be dense from zero
//! before it is accepted.

use std::collections::BTreeMap;

use alloy_primitives::B256;

use crate::address::Address;
use crate::cell::{Cell, CellError};
use crate::dict::{build_dict, build_index_dict, dense_values, parse_uint_dict, DictError, DictKey};

pub const MAX_PARTIES: usize = 255;
pub const INDEX_KEY_BITS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error(transparent)]
    Dict(#[from] DictError),
    #[error("{0} parties exceed the limit of 255")]
    TooManyParties(usize),
    #[error("signer list is empty")]
    NoSigners,
    #[error("threshold {threshold} outside 1..={signers}")]
    InvalidThreshold { threshold: u8, signers: usize },
}

impl From<CellError> for AuthError {
    fn from(e: CellError) -> Self {
        AuthError::Dict(DictError::Cell(e))
    }
}

/// Addresses indexed densely from zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartyList(Vec<Address>);

impl PartyList {
    pub fn new(parties: Vec<Address>) -> Result<Self, AuthError> {
        if parties.len() > MAX_PARTIES {
            return Err(AuthError::TooManyParties(parties.len()));
        }
        Ok(Self(parties))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: u8) -> Option<&Address> {
        self.0.get(index as usize)
    }

    /// Index of `addr`, by linear search.
    pub fn position(&self, addr: &Address) -> Option<u8> {
        self.0.iter().position(|a| a == addr).map(|i| i as u8)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Address> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Address] {
        &self.0
    }

    /// Dictionary root, `None` for an empty list.
    pub fn to_dict(&self) -> Result<Option<Cell>, DictError> {
        build_index_dict(&self.0, INDEX_KEY_BITS, |b, addr| addr.store(b))
    }

    /// Accepts only dictionaries keyed `0, 1, .., n-1`.
    pub fn from_dict(root: Option<&Cell>) -> Result<Self, AuthError> {
        let values = dense_values(parse_uint_dict(root, INDEX_KEY_BITS)?)?;
        let parties = values
            .into_iter()
            .map(|mut s| -> Result<Address, CellError> {
                let addr = Address::load(&mut s)?;
                s.end_parse()?;
                Ok(addr)
            })
            .collect::<Result<Vec<_>, CellError>>()?;
        Self::new(parties)
    }

    /// Hash committing to the list, as seen by staleness checks.
    pub fn hash(&self) -> Result<B256, DictError> {
        Ok(self
            .to_dict()?
            .map(|c| c.hash())
            .unwrap_or_else(|| Cell::empty().hash()))
    }
}

/// Builds the `Address -> ^Cell` modules dictionary.
pub fn build_modules(modules: &[(Address, Cell)]) -> Result<Option<Cell>, DictError> {
    let entries = modules
        .iter()
        .map(|(addr, policy)| -> Result<(DictKey, Cell), CellError> {
            Ok((addr.dict_key()?, policy.clone()))
        })
        .collect::<Result<BTreeMap<DictKey, Cell>, CellError>>()?;
    build_dict(&entries, Address::BITS, |b, policy| {
        b.store_ref(policy.clone()).map(|_| ())
    })
}

/// Live authorization parameters, owned by the Wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationContext {
    pub threshold: u8,
    pub signers: PartyList,
    pub proposers: PartyList,
    pub modules: Option<Cell>,
    pub guard: Option<Cell>,
}

impl AuthorizationContext {
    pub fn new(threshold: u8, signers: PartyList, proposers: PartyList) -> Result<Self, AuthError> {
        let ctx = Self {
            threshold,
            signers,
            proposers,
            modules: None,
            guard: None,
        };
        ctx.validate()?;
        Ok(ctx)
    }

    pub fn validate(&self) -> Result<(), AuthError> {
        if self.signers.is_empty() {
            return Err(AuthError::NoSigners);
        }
        if self.threshold == 0 || self.threshold as usize > self.signers.len() {
            return Err(AuthError::InvalidThreshold {
                threshold: self.threshold,
                signers: self.signers.len(),
            });
        }
        Ok(())
    }

    pub fn signers_hash(&self) -> Result<B256, AuthError> {
        Ok(self.signers.hash()?)
    }

    pub fn snapshot(&self) -> Result<AuthorizationSnapshot, AuthError> {
        AuthorizationSnapshot::new(self.threshold, self.signers.clone())
    }
}

/// Immutable copy of `(threshold, signers)` taken when an Order is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationSnapshot {
    pub threshold: u8,
    pub signers: PartyList,
    signers_hash: B256,
}

impl AuthorizationSnapshot {
    pub fn new(threshold: u8, signers: PartyList) -> Result<Self, AuthError> {
        if signers.is_empty() {
            return Err(AuthError::NoSigners);
        }
        if threshold == 0 || threshold as usize > signers.len() {
            return Err(AuthError::InvalidThreshold {
                threshold,
                signers: signers.len(),
            });
        }
        let signers_hash = signers.hash()?;
        Ok(Self {
            threshold,
            signers,
            signers_hash,
        })
    }

    pub fn signers_hash(&self) -> B256 {
        self.signers_hash
    }

    /// True while the live context still has the signer set this snapshot
    /// was taken from.
    pub fn is_current(&self, live: &AuthorizationContext) -> Result<bool, AuthError> {
        Ok(live.signers_hash()? == self.signers_hash)
    }
}
