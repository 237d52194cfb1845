//! Cells: the immutable storage unit of the execution environment.
//!
//! A cell holds up to 1023 data bits and up to four references to other
//! cells. It is identified by its representation hash, which commits to the
//! data and, recursively, to every referenced cell.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use alloy_primitives::{B256, U256};
use sha2::{Digest, Sha256};

pub const MAX_CELL_BITS: usize = 1023;
pub const MAX_CELL_REFS: usize = 4;

/// Errors raised while building or reading cells.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CellError {
    #[error("cell overflow: {bits} bits / {refs} refs requested")]
    Overflow { bits: usize, refs: usize },
    #[error("cell underflow: wanted {wanted} bits, {available} available")]
    Underflow { wanted: usize, available: usize },
    #[error("cell has no more references")]
    NoMoreRefs,
    #[error("value does not fit in {0} bits")]
    ValueTooLarge(usize),
    #[error("slice not fully consumed: {bits} bits / {refs} refs left")]
    TrailingData { bits: usize, refs: usize },
    #[error("malformed data: {0}")]
    Malformed(&'static str),
}

struct CellInner {
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<Cell>,
    hash: B256,
    depth: u16,
}

/// Shared, immutable cell. Cloning is cheap.
#[derive(Clone)]
pub struct Cell(Arc<CellInner>);

impl Cell {
    /// The cell with no bits and no references.
    pub fn empty() -> Self {
        Self::from_parts(Vec::new(), 0, Vec::new())
    }

    fn from_parts(mut data: Vec<u8>, bit_len: usize, refs: Vec<Cell>) -> Self {
        data.truncate(bit_len.div_ceil(8));
        // zero the unused tail so equal bit strings hash equally
        if bit_len % 8 != 0 {
            if let Some(last) = data.last_mut() {
                *last &= 0xffu8 << (8 - bit_len % 8);
            }
        }
        let depth = refs.iter().map(|r| r.depth() + 1).max().unwrap_or(0);
        let hash = representation_hash(&data, bit_len, &refs);
        Cell(Arc::new(CellInner {
            data,
            bit_len,
            refs,
            hash,
            depth,
        }))
    }

    pub fn hash(&self) -> B256 {
        self.0.hash
    }

    pub fn depth(&self) -> u16 {
        self.0.depth
    }

    pub fn bit_len(&self) -> usize {
        self.0.bit_len
    }

    /// Raw data bytes, most significant bit first; the tail of the last
    /// byte beyond `bit_len` is zero.
    pub fn data(&self) -> &[u8] {
        &self.0.data
    }

    pub fn refs(&self) -> &[Cell] {
        &self.0.refs
    }

    pub fn reference(&self, index: usize) -> Option<&Cell> {
        self.0.refs.get(index)
    }

    pub fn as_slice(&self) -> CellSlice {
        CellSlice::new(self.clone())
    }

    /// `d1` and `d2` descriptor bytes of an ordinary cell.
    pub(crate) fn descriptors(&self) -> [u8; 2] {
        descriptors(self.0.bit_len, self.0.refs.len())
    }

    /// Data bytes with the completion tag applied when the length is not
    /// byte aligned.
    pub(crate) fn padded_data(&self) -> Vec<u8> {
        padded_data(&self.0.data, self.0.bit_len)
    }
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        self.0.hash == other.0.hash
    }
}

impl Eq for Cell {}

impl std::hash::Hash for Cell {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::hash::Hash::hash(&self.0.hash, state)
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cell")
            .field("bits", &self.0.bit_len)
            .field("refs", &self.0.refs.len())
            .field("hash", &hex::encode(self.0.hash))
            .finish()
    }
}

fn descriptors(bit_len: usize, refs: usize) -> [u8; 2] {
    let d1 = refs as u8;
    let d2 = (bit_len / 8 + bit_len.div_ceil(8)) as u8;
    [d1, d2]
}

fn padded_data(data: &[u8], bit_len: usize) -> Vec<u8> {
    let mut out = data.to_vec();
    let rem = bit_len % 8;
    if rem != 0 {
        if let Some(last) = out.last_mut() {
            *last |= 0x80u8 >> rem;
        }
    }
    out
}

fn representation_hash(data: &[u8], bit_len: usize, refs: &[Cell]) -> B256 {
    let mut hasher = Sha256::new();
    hasher.update(descriptors(bit_len, refs.len()));
    hasher.update(padded_data(data, bit_len));
    for r in refs {
        hasher.update(r.depth().to_be_bytes());
    }
    for r in refs {
        hasher.update(r.hash().as_slice());
    }
    B256::from_slice(&hasher.finalize())
}

/// Bit/reference packer producing a [`Cell`].
#[derive(Debug, Clone, Default)]
pub struct CellBuilder {
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<Cell>,
}

impl CellBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    pub fn remaining_bits(&self) -> usize {
        MAX_CELL_BITS - self.bit_len
    }

    pub fn remaining_refs(&self) -> usize {
        MAX_CELL_REFS - self.refs.len()
    }

    fn reserve_bits(&self, bits: usize) -> Result<(), CellError> {
        if self.bit_len + bits > MAX_CELL_BITS {
            return Err(CellError::Overflow {
                bits: self.bit_len + bits,
                refs: self.refs.len(),
            });
        }
        Ok(())
    }

    fn push_bit(&mut self, bit: bool) {
        if self.bit_len % 8 == 0 {
            self.data.push(0);
        }
        if bit {
            let idx = self.bit_len / 8;
            self.data[idx] |= 0x80 >> (self.bit_len % 8);
        }
        self.bit_len += 1;
    }

    pub fn store_bit(&mut self, bit: bool) -> Result<&mut Self, CellError> {
        self.reserve_bits(1)?;
        self.push_bit(bit);
        Ok(self)
    }

    /// Stores the low `bits` bits of `value`, big-endian.
    pub fn store_uint(&mut self, value: u64, bits: usize) -> Result<&mut Self, CellError> {
        self.store_u128(value as u128, bits)
    }

    pub fn store_u128(&mut self, value: u128, bits: usize) -> Result<&mut Self, CellError> {
        if bits > 128 || (bits < 128 && value >> bits != 0) {
            return Err(CellError::ValueTooLarge(bits));
        }
        self.reserve_bits(bits)?;
        for i in (0..bits).rev() {
            self.push_bit((value >> i) & 1 == 1);
        }
        Ok(self)
    }

    /// Two's complement signed integer in `bits` bits.
    pub fn store_int(&mut self, value: i64, bits: usize) -> Result<&mut Self, CellError> {
        if bits == 0 || bits > 64 {
            return Err(CellError::ValueTooLarge(bits));
        }
        let min = -(1i128 << (bits - 1));
        let max = (1i128 << (bits - 1)) - 1;
        if (value as i128) < min || (value as i128) > max {
            return Err(CellError::ValueTooLarge(bits));
        }
        let mask = if bits == 64 { u64::MAX } else { (1u64 << bits) - 1 };
        self.store_uint(value as u64 & mask, bits)
    }

    pub fn store_u256(&mut self, value: &U256, bits: usize) -> Result<&mut Self, CellError> {
        if bits > 256 || (bits < 256 && value.bit_len() > bits) {
            return Err(CellError::ValueTooLarge(bits));
        }
        self.reserve_bits(bits)?;
        for i in (0..bits).rev() {
            self.push_bit(value.bit(i));
        }
        Ok(self)
    }

    /// Stores the first `bits` bits of `data` (most significant bit first).
    pub fn store_bits(&mut self, data: &[u8], bits: usize) -> Result<&mut Self, CellError> {
        if bits > data.len() * 8 {
            return Err(CellError::Malformed("bit count exceeds buffer"));
        }
        self.reserve_bits(bits)?;
        for i in 0..bits {
            self.push_bit(data[i / 8] & (0x80 >> (i % 8)) != 0);
        }
        Ok(self)
    }

    pub fn store_bytes(&mut self, data: &[u8]) -> Result<&mut Self, CellError> {
        self.store_bits(data, data.len() * 8)
    }

    /// Appends the unread bits and references of `slice`.
    pub fn store_slice(&mut self, slice: &CellSlice) -> Result<&mut Self, CellError> {
        self.reserve_bits(slice.remaining_bits())?;
        if self.refs.len() + slice.remaining_refs() > MAX_CELL_REFS {
            return Err(CellError::Overflow {
                bits: self.bit_len,
                refs: self.refs.len() + slice.remaining_refs(),
            });
        }
        let mut s = slice.clone();
        while s.remaining_bits() > 0 {
            let bit = s.load_bit()?;
            self.push_bit(bit);
        }
        while s.remaining_refs() > 0 {
            let r = s.load_ref()?;
            self.refs.push(r);
        }
        Ok(self)
    }

    pub fn store_ref(&mut self, cell: Cell) -> Result<&mut Self, CellError> {
        if self.refs.len() >= MAX_CELL_REFS {
            return Err(CellError::Overflow {
                bits: self.bit_len,
                refs: self.refs.len() + 1,
            });
        }
        self.refs.push(cell);
        Ok(self)
    }

    /// `Maybe ^Cell`: a presence bit, then the reference when present.
    pub fn store_maybe_ref(&mut self, cell: Option<&Cell>) -> Result<&mut Self, CellError> {
        match cell {
            Some(c) => {
                self.store_bit(true)?;
                self.store_ref(c.clone())
            }
            None => self.store_bit(false),
        }
    }

    /// `VarUInteger 16`: 4-bit byte length followed by the value bytes.
    pub fn store_coins(&mut self, amount: u128) -> Result<&mut Self, CellError> {
        let len = (128 - amount.leading_zeros() as usize).div_ceil(8);
        if len > 15 {
            return Err(CellError::ValueTooLarge(120));
        }
        self.store_uint(len as u64, 4)?;
        self.store_u128(amount, len * 8)
    }

    pub fn build(&self) -> Result<Cell, CellError> {
        Ok(Cell::from_parts(
            self.data.clone(),
            self.bit_len,
            self.refs.clone(),
        ))
    }
}

/// Read cursor over a cell's bits and references.
#[derive(Debug, Clone)]
pub struct CellSlice {
    cell: Cell,
    bit_pos: usize,
    ref_pos: usize,
}

impl CellSlice {
    pub fn new(cell: Cell) -> Self {
        Self {
            cell,
            bit_pos: 0,
            ref_pos: 0,
        }
    }

    pub fn remaining_bits(&self) -> usize {
        self.cell.bit_len() - self.bit_pos
    }

    pub fn remaining_refs(&self) -> usize {
        self.cell.refs().len() - self.ref_pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining_bits() == 0 && self.remaining_refs() == 0
    }

    fn ensure_bits(&self, bits: usize) -> Result<(), CellError> {
        if self.remaining_bits() < bits {
            return Err(CellError::Underflow {
                wanted: bits,
                available: self.remaining_bits(),
            });
        }
        Ok(())
    }

    fn bit_at(&self, pos: usize) -> bool {
        self.cell.data()[pos / 8] & (0x80 >> (pos % 8)) != 0
    }

    pub fn load_bit(&mut self) -> Result<bool, CellError> {
        self.ensure_bits(1)?;
        let bit = self.bit_at(self.bit_pos);
        self.bit_pos += 1;
        Ok(bit)
    }

    pub fn load_uint(&mut self, bits: usize) -> Result<u64, CellError> {
        if bits > 64 {
            return Err(CellError::ValueTooLarge(bits));
        }
        Ok(self.load_u128(bits)? as u64)
    }

    pub fn load_u8(&mut self) -> Result<u8, CellError> {
        Ok(self.load_uint(8)? as u8)
    }

    pub fn load_u32(&mut self) -> Result<u32, CellError> {
        Ok(self.load_uint(32)? as u32)
    }

    pub fn load_u64(&mut self) -> Result<u64, CellError> {
        self.load_uint(64)
    }

    pub fn load_u128(&mut self, bits: usize) -> Result<u128, CellError> {
        if bits > 128 {
            return Err(CellError::ValueTooLarge(bits));
        }
        self.ensure_bits(bits)?;
        let mut value = 0u128;
        for _ in 0..bits {
            value = (value << 1) | self.bit_at(self.bit_pos) as u128;
            self.bit_pos += 1;
        }
        Ok(value)
    }

    pub fn load_int(&mut self, bits: usize) -> Result<i64, CellError> {
        if bits == 0 || bits > 64 {
            return Err(CellError::ValueTooLarge(bits));
        }
        let raw = self.load_uint(bits)?;
        let shift = 64 - bits;
        Ok(((raw << shift) as i64) >> shift)
    }

    pub fn load_u256(&mut self, bits: usize) -> Result<U256, CellError> {
        if bits > 256 {
            return Err(CellError::ValueTooLarge(bits));
        }
        self.ensure_bits(bits)?;
        let mut value = U256::ZERO;
        for i in (0..bits).rev() {
            if self.bit_at(self.bit_pos) {
                value.set_bit(i, true);
            }
            self.bit_pos += 1;
        }
        Ok(value)
    }

    /// Reads `bits` bits packed most significant bit first.
    pub fn load_bits(&mut self, bits: usize) -> Result<Vec<u8>, CellError> {
        self.ensure_bits(bits)?;
        let mut out = vec![0u8; bits.div_ceil(8)];
        for i in 0..bits {
            if self.bit_at(self.bit_pos) {
                out[i / 8] |= 0x80 >> (i % 8);
            }
            self.bit_pos += 1;
        }
        Ok(out)
    }

    pub fn skip_bits(&mut self, bits: usize) -> Result<(), CellError> {
        self.ensure_bits(bits)?;
        self.bit_pos += bits;
        Ok(())
    }

    pub fn load_ref(&mut self) -> Result<Cell, CellError> {
        let cell = self
            .cell
            .reference(self.ref_pos)
            .cloned()
            .ok_or(CellError::NoMoreRefs)?;
        self.ref_pos += 1;
        Ok(cell)
    }

    pub fn load_maybe_ref(&mut self) -> Result<Option<Cell>, CellError> {
        if self.load_bit()? {
            Ok(Some(self.load_ref()?))
        } else {
            Ok(None)
        }
    }

    pub fn load_coins(&mut self) -> Result<u128, CellError> {
        let len = self.load_uint(4)? as usize;
        self.load_u128(len * 8)
    }

    /// Fails unless every bit and reference has been read.
    pub fn end_parse(&self) -> Result<(), CellError> {
        if !self.is_empty() {
            return Err(CellError::TrailingData {
                bits: self.remaining_bits(),
                refs: self.remaining_refs(),
            });
        }
        Ok(())
    }

    /// Materializes the unread part as a standalone cell.
    pub fn to_cell(&self) -> Result<Cell, CellError> {
        if self.bit_pos == 0 && self.ref_pos == 0 {
            return Ok(self.cell.clone());
        }
        CellBuilder::new().store_slice(self)?.build()
    }
}

/// Bit and cell totals of a cell tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageStats {
    pub bits: u64,
    pub cells: u64,
}

impl std::ops::Add for StorageStats {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            bits: self.bits + rhs.bits,
            cells: self.cells + rhs.cells,
        }
    }
}

/// Counts cells and bits, visiting each distinct cell (by hash) once.
#[derive(Debug, Default)]
pub struct StatsCollector {
    visited: HashSet<B256>,
    stats: StorageStats,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_cell(&mut self, cell: &Cell) -> &mut Self {
        let mut stack = vec![cell.clone()];
        while let Some(c) = stack.pop() {
            if !self.visited.insert(c.hash()) {
                continue;
            }
            self.stats.cells += 1;
            self.stats.bits += c.bit_len() as u64;
            stack.extend(c.refs().iter().cloned());
        }
        self
    }

    /// Everything reachable from `cell` except `cell` itself.
    pub fn add_refs_of(&mut self, cell: &Cell) -> &mut Self {
        for r in cell.refs() {
            self.add_cell(r);
        }
        self
    }

    pub fn stats(&self) -> StorageStats {
        self.stats
    }
}

/// De-duplicated statistics of a whole tree, root included.
pub fn tree_stats(cell: &Cell) -> StorageStats {
    StatsCollector::new().add_cell(cell).stats()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_cell_hash_is_canonical() {
        assert_eq!(
            hex::encode(Cell::empty().hash()),
            "96a296d224f285c67bee93c30f8a309157f0daa35dc5b87e410b78630a09cfc7"
        );
    }

    #[test]
    fn unaligned_bits_read_back() {
        let cell = CellBuilder::new()
            .store_uint(5, 3)
            .unwrap()
            .store_int(-2, 8)
            .unwrap()
            .store_coins(1_000_000_000)
            .unwrap()
            .build()
            .unwrap();
        let mut s = cell.as_slice();
        assert_eq!(s.load_uint(3).unwrap(), 5);
        assert_eq!(s.load_int(8).unwrap(), -2);
        assert_eq!(s.load_coins().unwrap(), 1_000_000_000);
        s.end_parse().unwrap();
    }

    #[test]
    fn builder_rejects_overflow() {
        let mut b = CellBuilder::new();
        b.store_bits(&[0u8; 128], 1023).unwrap();
        assert!(matches!(
            b.store_bit(true),
            Err(CellError::Overflow { .. })
        ));
        let mut b = CellBuilder::new();
        for _ in 0..4 {
            b.store_ref(Cell::empty()).unwrap();
        }
        assert!(b.store_ref(Cell::empty()).is_err());
        assert_eq!(
            CellBuilder::new().store_uint(256, 8).unwrap_err(),
            CellError::ValueTooLarge(8)
        );
    }

    #[test]
    fn stats_count_shared_subtrees_once() {
        let leaf = CellBuilder::new()
            .store_uint(0xdead, 16)
            .unwrap()
            .build()
            .unwrap();
        let root = CellBuilder::new()
            .store_uint(1, 8)
            .unwrap()
            .store_ref(leaf.clone())
            .unwrap()
            .store_ref(leaf)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(tree_stats(&root), StorageStats { bits: 24, cells: 2 });
        let only_refs = StatsCollector::new().add_refs_of(&root).stats();
        assert_eq!(only_refs, StorageStats { bits: 16, cells: 1 });
        assert_eq!(root.depth(), 1);
    }

    #[test]
    fn u256_keeps_low_bits() {
        let mut mask = U256::ZERO;
        mask.set_bit(0, true);
        mask.set_bit(254, true);
        let cell = CellBuilder::new()
            .store_u256(&mask, 255)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(cell.bit_len(), 255);
        assert_eq!(cell.as_slice().load_u256(255).unwrap(), mask);
    }
}
