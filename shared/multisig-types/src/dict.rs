//! `HashmapE n X` dictionaries (binary Patricia tries over fixed-width keys).

use std::collections::BTreeMap;

use crate::cell::{Cell, CellBuilder, CellError, CellSlice};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DictError {
    #[error(transparent)]
    Cell(#[from] CellError),
    #[error("key has {found} bits, dictionary uses {expected}")]
    KeyWidth { expected: usize, found: usize },
    #[error("label length {len} exceeds remaining key width {max}")]
    BadLabel { len: usize, max: usize },
    #[error("dictionary keys are not a dense sequence starting at 0")]
    InvalidSequence,
}

/// Fixed-width key, most significant bit first.
pub type DictKey = Vec<bool>;

pub fn key_from_uint(value: u64, bits: usize) -> DictKey {
    (0..bits).rev().map(|i| i < 64 && (value >> i) & 1 == 1).collect()
}

pub fn key_to_uint(key: &[bool]) -> u64 {
    key.iter().fold(0u64, |acc, &b| (acc << 1) | b as u64)
}

/// Builds the root of a `Hashmap n X`. `None` for an empty map, which is
/// how the enclosing `HashmapE` encodes emptiness.
pub fn build_dict<V, F>(
    entries: &BTreeMap<DictKey, V>,
    key_bits: usize,
    mut store_value: F,
) -> Result<Option<Cell>, DictError>
where
    F: FnMut(&mut CellBuilder, &V) -> Result<(), CellError>,
{
    if entries.is_empty() {
        return Ok(None);
    }
    let sorted: Vec<(&DictKey, &V)> = entries.iter().collect();
    for (k, _) in &sorted {
        if k.len() != key_bits {
            return Err(DictError::KeyWidth {
                expected: key_bits,
                found: k.len(),
            });
        }
    }
    build_edge(&sorted, 0, key_bits, &mut store_value).map(Some)
}

fn build_edge<V, F>(
    entries: &[(&DictKey, &V)],
    depth: usize,
    key_bits: usize,
    store_value: &mut F,
) -> Result<Cell, DictError>
where
    F: FnMut(&mut CellBuilder, &V) -> Result<(), CellError>,
{
    let m = key_bits - depth;
    let first = entries[0].0;
    // keys are sorted, so the prefix shared by first and last is shared by all
    let common = if entries.len() == 1 {
        m
    } else {
        let last = entries[entries.len() - 1].0;
        (depth..key_bits)
            .take_while(|&i| first[i] == last[i])
            .count()
    };

    let mut b = CellBuilder::new();
    store_label(&mut b, &first[depth..depth + common], m)?;
    if common == m {
        store_value(&mut b, entries[0].1)?;
    } else {
        let split = depth + common;
        let pivot = entries.partition_point(|(k, _)| !k[split]);
        let left = build_edge(&entries[..pivot], split + 1, key_bits, store_value)?;
        let right = build_edge(&entries[pivot..], split + 1, key_bits, store_value)?;
        b.store_ref(left)?.store_ref(right)?;
    }
    Ok(b.build()?)
}

/// Width of the length field of a label for a remaining key width `m`.
fn len_bits(m: usize) -> usize {
    (usize::BITS - m.leading_zeros()) as usize
}

/// Writes the shortest of `hml_short`, `hml_long` and `hml_same`.
fn store_label(b: &mut CellBuilder, label: &[bool], m: usize) -> Result<(), CellError> {
    let k = len_bits(m);
    let n = label.len();
    let uniform = n > 1 && label.iter().all(|&bit| bit == label[0]);
    if uniform && k < 2 * n - 1 {
        b.store_uint(0b11, 2)?
            .store_bit(label[0])?
            .store_uint(n as u64, k)?;
    } else if k < n {
        b.store_uint(0b10, 2)?.store_uint(n as u64, k)?;
        for &bit in label {
            b.store_bit(bit)?;
        }
    } else {
        b.store_bit(false)?;
        for _ in 0..n {
            b.store_bit(true)?;
        }
        b.store_bit(false)?;
        for &bit in label {
            b.store_bit(bit)?;
        }
    }
    Ok(())
}

fn load_label(s: &mut CellSlice, m: usize) -> Result<DictKey, DictError> {
    let k = len_bits(m);
    if !s.load_bit()? {
        let mut n = 0;
        while s.load_bit()? {
            n += 1;
        }
        if n > m {
            return Err(DictError::BadLabel { len: n, max: m });
        }
        (0..n).map(|_| s.load_bit().map_err(Into::into)).collect()
    } else if !s.load_bit()? {
        let n = s.load_uint(k)? as usize;
        if n > m {
            return Err(DictError::BadLabel { len: n, max: m });
        }
        (0..n).map(|_| s.load_bit().map_err(Into::into)).collect()
    } else {
        let bit = s.load_bit()?;
        let n = s.load_uint(k)? as usize;
        if n > m {
            return Err(DictError::BadLabel { len: n, max: m });
        }
        Ok(vec![bit; n])
    }
}

/// Parses a `Hashmap n X` root into key → value slice, in key order.
pub fn parse_dict(
    root: Option<&Cell>,
    key_bits: usize,
) -> Result<BTreeMap<DictKey, CellSlice>, DictError> {
    let mut out = BTreeMap::new();
    if let Some(root) = root {
        parse_edge(root, Vec::with_capacity(key_bits), key_bits, &mut out)?;
    }
    Ok(out)
}

fn parse_edge(
    cell: &Cell,
    mut prefix: DictKey,
    m: usize,
    out: &mut BTreeMap<DictKey, CellSlice>,
) -> Result<(), DictError> {
    let mut s = cell.as_slice();
    let label = load_label(&mut s, m)?;
    let rest = m - label.len();
    prefix.extend(label);
    if rest == 0 {
        out.insert(prefix, s);
        return Ok(());
    }
    let left = s.load_ref()?;
    let right = s.load_ref()?;
    let mut left_key = prefix.clone();
    left_key.push(false);
    parse_edge(&left, left_key, rest - 1, out)?;
    prefix.push(true);
    parse_edge(&right, prefix, rest - 1, out)
}

/// Builds an index-keyed dictionary with keys `0..values.len()`.
pub fn build_index_dict<V, F>(
    values: &[V],
    key_bits: usize,
    store_value: F,
) -> Result<Option<Cell>, DictError>
where
    F: FnMut(&mut CellBuilder, &V) -> Result<(), CellError>,
{
    let entries: BTreeMap<DictKey, &V> = values
        .iter()
        .enumerate()
        .map(|(i, v)| (key_from_uint(i as u64, key_bits), v))
        .collect();
    let mut store_value = store_value;
    build_dict(&entries, key_bits, |b, v| store_value(b, *v))
}

/// Parses an unsigned-integer keyed dictionary, in increasing key order.
pub fn parse_uint_dict(
    root: Option<&Cell>,
    key_bits: usize,
) -> Result<BTreeMap<u64, CellSlice>, DictError> {
    Ok(parse_dict(root, key_bits)?
        .into_iter()
        .map(|(k, v)| (key_to_uint(&k), v))
        .collect())
}

/// Returns the values of a dictionary whose keys are exactly `0..n`.
pub fn dense_values(map: BTreeMap<u64, CellSlice>) -> Result<Vec<CellSlice>, DictError> {
    map.into_iter()
        .enumerate()
        .map(|(expected, (key, value))| {
            if key == expected as u64 {
                Ok(value)
            } else {
                Err(DictError::InvalidSequence)
            }
        })
        .collect()
}
