use std::fmt;
use std::str::FromStr;

use alloy_primitives::B256;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::cell::{CellBuilder, CellError, CellSlice};
use crate::dict::DictKey;

/// Standard internal address (`addr_std`, no anycast).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address {
    pub workchain: i8,
    pub hash: B256,
}

impl Address {
    /// Serialized width: tag, anycast bit, workchain and account hash.
    pub const BITS: usize = 2 + 1 + 8 + 256;

    pub const fn new(workchain: i8, hash: B256) -> Self {
        Self { workchain, hash }
    }

    pub fn store(&self, b: &mut CellBuilder) -> Result<(), CellError> {
        b.store_uint(0b10, 2)?
            .store_bit(false)?
            .store_int(self.workchain as i64, 8)?
            .store_bytes(self.hash.as_slice())?;
        Ok(())
    }

    /// `addr_none` when absent.
    pub fn store_optional(addr: Option<&Address>, b: &mut CellBuilder) -> Result<(), CellError> {
        match addr {
            Some(a) => a.store(b),
            None => b.store_uint(0, 2).map(|_| ()),
        }
    }

    pub fn load(s: &mut CellSlice) -> Result<Self, CellError> {
        Self::load_optional(s)?.ok_or(CellError::Malformed("expected a standard address"))
    }

    pub fn load_optional(s: &mut CellSlice) -> Result<Option<Self>, CellError> {
        match s.load_uint(2)? {
            0b00 => Ok(None),
            0b10 => {
                if s.load_bit()? {
                    return Err(CellError::Malformed("anycast addresses are not supported"));
                }
                let workchain = s.load_int(8)? as i8;
                let hash = B256::from_slice(&s.load_bits(256)?);
                Ok(Some(Self { workchain, hash }))
            }
            _ => Err(CellError::Malformed("unsupported address form")),
        }
    }

    /// The 267-bit key used when addresses index a dictionary.
    pub fn dict_key(&self) -> Result<DictKey, CellError> {
        let mut b = CellBuilder::new();
        self.store(&mut b)?;
        let cell = b.build()?;
        let mut s = cell.as_slice();
        (0..Self::BITS).map(|_| s.load_bit()).collect()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.workchain, hex::encode(self.hash))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid address `{0}`, expected `<workchain>:<64 hex chars>`")]
pub struct ParseAddressError(String);

impl FromStr for Address {
    type Err = ParseAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseAddressError(s.to_string());
        let (wc, hash) = s.split_once(':').ok_or_else(err)?;
        let workchain = wc.parse::<i8>().map_err(|_| err())?;
        let bytes = hex::decode(hash).map_err(|_| err())?;
        if bytes.len() != 32 {
            return Err(err());
        }
        Ok(Self {
            workchain,
            hash: B256::from_slice(&bytes),
        })
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
