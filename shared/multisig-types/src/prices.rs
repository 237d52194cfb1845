//! Network price parameters and the fee formulas the environment applies.
//!
//! All prices are fixed-point with a `2^16` denominator. Amounts are in
//! nanotons.

use serde::{Deserialize, Serialize};

use crate::cell::StorageStats;

const FIXED_POINT_SHIFT: u32 = 16;

fn shr_ceil(value: u128, shift: u32) -> u128 {
    (value + (1u128 << shift) - 1) >> shift
}

/// Computation prices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GasPrices {
    pub gas_price: u64,
    pub flat_gas_limit: u64,
    pub flat_gas_price: u64,
}

impl Default for GasPrices {
    fn default() -> Self {
        Self {
            gas_price: 65_536_000,
            flat_gas_limit: 100,
            flat_gas_price: 100_000,
        }
    }
}

impl GasPrices {
    pub fn compute_fee(&self, gas_used: u64) -> u128 {
        if gas_used <= self.flat_gas_limit {
            return self.flat_gas_price as u128;
        }
        let metered = self.gas_price as u128 * (gas_used - self.flat_gas_limit) as u128;
        self.flat_gas_price as u128 + shr_ceil(metered, FIXED_POINT_SHIFT)
    }
}

/// Forwarding fee of one message, split between what the sender's
/// transaction keeps and what travels with the message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForwardFee {
    pub total: u128,
    pub reserved: u128,
    pub remaining: u128,
}

/// Message forwarding prices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MsgPrices {
    pub lump_price: u64,
    pub bit_price: u64,
    pub cell_price: u64,
    pub ihr_price_factor: u32,
    pub first_frac: u16,
    pub next_frac: u16,
}

impl Default for MsgPrices {
    fn default() -> Self {
        Self {
            lump_price: 400_000,
            bit_price: 26_214_400,
            cell_price: 2_621_440_000,
            ihr_price_factor: 98_304,
            first_frac: 21_845,
            next_frac: 21_845,
        }
    }
}

impl MsgPrices {
    /// Fee of a message whose referenced cells total `stats`.
    pub fn forward_fee(&self, stats: StorageStats) -> ForwardFee {
        let variable = self.bit_price as u128 * stats.bits as u128
            + self.cell_price as u128 * stats.cells as u128;
        let total = self.lump_price as u128 + shr_ceil(variable, FIXED_POINT_SHIFT);
        let reserved = shr_ceil(total * self.first_frac as u128, FIXED_POINT_SHIFT);
        ForwardFee {
            total,
            reserved,
            remaining: total - reserved,
        }
    }

    /// Fee of a message that fits entirely in its root cell.
    pub fn flat_forward_fee(&self) -> u128 {
        self.lump_price as u128
    }
}

/// Storage rent prices, per second.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoragePrices {
    pub bit_price_ps: u64,
    pub cell_price_ps: u64,
}

impl Default for StoragePrices {
    fn default() -> Self {
        Self {
            bit_price_ps: 1,
            cell_price_ps: 500,
        }
    }
}

impl StoragePrices {
    pub fn storage_fee(&self, stats: StorageStats, seconds: u64) -> u128 {
        let per_second = stats.bits as u128 * self.bit_price_ps as u128
            + stats.cells as u128 * self.cell_price_ps as u128;
        shr_ceil(per_second * seconds as u128, FIXED_POINT_SHIFT)
    }
}

/// Price parameters of the workchain the contracts live on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub gas: GasPrices,
    pub msg: MsgPrices,
    pub storage: StoragePrices,
}
