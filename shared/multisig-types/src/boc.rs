//! Bag-of-cells serialization for a single root.

use std::collections::{HashMap, HashSet};

use alloy_primitives::B256;

use crate::cell::{Cell, CellBuilder, CellError};

const BOC_MAGIC: [u8; 4] = [0xb5, 0xee, 0x9c, 0x72];

fn min_bytes(value: usize) -> usize {
    let bits = usize::BITS as usize - value.leading_zeros() as usize;
    bits.div_ceil(8).max(1)
}

fn push_be(out: &mut Vec<u8>, value: usize, width: usize) {
    for i in (0..width).rev() {
        out.push((value >> (8 * i)) as u8);
    }
}

/// Orders distinct cells so that every parent precedes its children.
fn topological_order(root: &Cell) -> Vec<Cell> {
    fn visit(cell: &Cell, seen: &mut HashSet<B256>, post: &mut Vec<Cell>) {
        if !seen.insert(cell.hash()) {
            return;
        }
        for r in cell.refs() {
            visit(r, seen, post);
        }
        post.push(cell.clone());
    }
    let mut seen = HashSet::new();
    let mut post = Vec::new();
    visit(root, &mut seen, &mut post);
    post.reverse();
    post
}

/// Serializes `root` without index or CRC.
pub fn serialize_boc(root: &Cell) -> Vec<u8> {
    let cells = topological_order(root);
    let index: HashMap<B256, usize> = cells
        .iter()
        .enumerate()
        .map(|(i, c)| (c.hash(), i))
        .collect();
    let ref_size = min_bytes(cells.len());

    let mut payload = Vec::new();
    for cell in &cells {
        payload.extend_from_slice(&cell.descriptors());
        payload.extend_from_slice(&cell.padded_data());
        for r in cell.refs() {
            push_be(&mut payload, index[&r.hash()], ref_size);
        }
    }
    let off_size = min_bytes(payload.len());

    let mut out = Vec::with_capacity(payload.len() + 16);
    out.extend_from_slice(&BOC_MAGIC);
    out.push(ref_size as u8);
    out.push(off_size as u8);
    push_be(&mut out, cells.len(), ref_size);
    push_be(&mut out, 1, ref_size);
    push_be(&mut out, 0, ref_size);
    push_be(&mut out, payload.len(), off_size);
    push_be(&mut out, 0, ref_size);
    out.extend_from_slice(&payload);
    out
}

pub fn serialize_boc_hex(root: &Cell) -> String {
    hex::encode(serialize_boc(root))
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], CellError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.bytes.len())
            .ok_or(CellError::Malformed("truncated bag of cells"))?;
        let out = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn read_be(&mut self, width: usize) -> Result<usize, CellError> {
        Ok(self
            .take(width)?
            .iter()
            .fold(0usize, |acc, &b| (acc << 8) | b as usize))
    }
}

/// Parses a bag of cells and returns its first root.
pub fn deserialize_boc(bytes: &[u8]) -> Result<Cell, CellError> {
    let mut r = Reader { bytes, pos: 0 };
    if r.take(4)? != BOC_MAGIC.as_slice() {
        return Err(CellError::Malformed("bad bag-of-cells magic"));
    }
    let flags = r.take(1)?[0];
    let has_index = flags & 0x80 != 0;
    let ref_size = (flags & 0x07) as usize;
    let off_size = r.take(1)?[0] as usize;
    if ref_size == 0 || ref_size > 4 || off_size == 0 || off_size > 8 {
        return Err(CellError::Malformed("bad bag-of-cells sizes"));
    }
    let cell_count = r.read_be(ref_size)?;
    let root_count = r.read_be(ref_size)?;
    let _absent = r.read_be(ref_size)?;
    let _total = r.read_be(off_size)?;
    if root_count == 0 {
        return Err(CellError::Malformed("bag of cells has no root"));
    }
    let root_index = r.read_be(ref_size)?;
    r.take((root_count - 1).saturating_mul(ref_size))?;
    if has_index {
        r.take(cell_count.saturating_mul(off_size))?;
    }
    // every cell takes at least its two descriptor bytes
    if cell_count > r.remaining() / 2 {
        return Err(CellError::Malformed("cell count exceeds payload"));
    }

    let mut raw = Vec::with_capacity(cell_count);
    for _ in 0..cell_count {
        let d = r.take(2)?;
        let (refs, d2) = (d[0] as usize & 0x07, d[1] as usize);
        let data = r.take(d2.div_ceil(2))?.to_vec();
        let mut children = Vec::with_capacity(refs);
        for _ in 0..refs {
            children.push(r.read_be(ref_size)?);
        }
        raw.push((data, d2 % 2 == 1, children));
    }

    let mut built: Vec<Option<Cell>> = vec![None; cell_count];
    for i in (0..cell_count).rev() {
        let (data, padded, children) = &raw[i];
        let bit_len = if *padded {
            let last = *data.last().ok_or(CellError::Malformed("empty padded cell"))?;
            if last == 0 {
                return Err(CellError::Malformed("missing completion tag"));
            }
            data.len() * 8 - last.trailing_zeros() as usize - 1
        } else {
            data.len() * 8
        };
        let mut b = CellBuilder::new();
        b.store_bits(data, bit_len)?;
        for &child in children {
            if child <= i {
                return Err(CellError::Malformed("reference points backwards"));
            }
            let cell = built
                .get(child)
                .cloned()
                .flatten()
                .ok_or(CellError::Malformed("dangling reference"))?;
            b.store_ref(cell)?;
        }
        built[i] = Some(b.build()?);
    }
    built
        .get(root_index)
        .cloned()
        .flatten()
        .ok_or(CellError::Malformed("root index out of range"))
}

pub fn deserialize_boc_hex(text: &str) -> Result<Cell, CellError> {
    let bytes = hex::decode(text.trim().trim_start_matches("0x"))
        .map_err(|_| CellError::Malformed("invalid hex"))?;
    deserialize_boc(&bytes)
}
