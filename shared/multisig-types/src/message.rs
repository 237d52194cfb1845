//! Internal messages and account state-init.

use crate::address::Address;
use crate::cell::{Cell, CellBuilder, CellError, CellSlice};

/// Code and initial data of an account; its hash is the account address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateInit {
    pub code: Cell,
    pub data: Cell,
}

impl StateInit {
    pub fn new(code: Cell, data: Cell) -> Self {
        Self { code, data }
    }

    pub fn to_cell(&self) -> Result<Cell, CellError> {
        CellBuilder::new()
            .store_bit(false)? // split_depth
            .store_bit(false)? // special
            .store_maybe_ref(Some(&self.code))?
            .store_maybe_ref(Some(&self.data))?
            .store_bit(false)? // library
            .build()
    }

    pub fn load(s: &mut CellSlice) -> Result<Self, CellError> {
        if s.load_bit()? || s.load_bit()? {
            return Err(CellError::Malformed("split depth and special are unsupported"));
        }
        let code = s
            .load_maybe_ref()?
            .ok_or(CellError::Malformed("state init without code"))?;
        let data = s
            .load_maybe_ref()?
            .ok_or(CellError::Malformed("state init without data"))?;
        if s.load_bit()? {
            return Err(CellError::Malformed("libraries are unsupported"));
        }
        Ok(Self { code, data })
    }

    pub fn address(&self, workchain: i8) -> Result<Address, CellError> {
        Ok(Address::new(workchain, self.to_cell()?.hash()))
    }
}

/// Where a message body is serialized relative to the message root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyLayout {
    Inline,
    Ref,
    /// Inline when it fits, otherwise a reference.
    Auto,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalMessage {
    pub ihr_disabled: bool,
    pub bounce: bool,
    pub bounced: bool,
    /// `None` serializes as `addr_none`; the environment fills in the sender.
    pub src: Option<Address>,
    pub dest: Address,
    pub value: u128,
    pub ihr_fee: u128,
    pub fwd_fee: u128,
    pub created_lt: u64,
    pub created_at: u32,
    pub init: Option<StateInit>,
    pub body: Cell,
    pub body_layout: BodyLayout,
}

impl InternalMessage {
    pub fn new(dest: Address, value: u128, bounce: bool, body: Cell) -> Self {
        Self {
            ihr_disabled: true,
            bounce,
            bounced: false,
            src: None,
            dest,
            value,
            ihr_fee: 0,
            fwd_fee: 0,
            created_lt: 0,
            created_at: 0,
            init: None,
            body,
            body_layout: BodyLayout::Auto,
        }
    }

    pub fn with_init(mut self, init: StateInit) -> Self {
        self.init = Some(init);
        self
    }

    pub fn with_body_layout(mut self, layout: BodyLayout) -> Self {
        self.body_layout = layout;
        self
    }

    pub fn with_src(mut self, src: Address) -> Self {
        self.src = Some(src);
        self
    }

    pub fn body_slice(&self) -> CellSlice {
        self.body.as_slice()
    }

    fn store_header(&self, b: &mut CellBuilder) -> Result<(), CellError> {
        b.store_bit(false)? // int_msg_info$0
            .store_bit(self.ihr_disabled)?
            .store_bit(self.bounce)?
            .store_bit(self.bounced)?;
        Address::store_optional(self.src.as_ref(), b)?;
        self.dest.store(b)?;
        b.store_coins(self.value)?
            .store_bit(false)? // no extra currencies
            .store_coins(self.ihr_fee)?
            .store_coins(self.fwd_fee)?
            .store_uint(self.created_lt, 64)?
            .store_uint(self.created_at as u64, 32)?;
        match &self.init {
            Some(init) => {
                b.store_bit(true)?.store_bit(true)?.store_ref(init.to_cell()?)?;
            }
            None => {
                b.store_bit(false)?;
            }
        }
        Ok(())
    }

    pub fn to_cell(&self) -> Result<Cell, CellError> {
        let mut b = CellBuilder::new();
        self.store_header(&mut b)?;
        let inline = match self.body_layout {
            BodyLayout::Inline => true,
            BodyLayout::Ref => false,
            BodyLayout::Auto => {
                b.remaining_bits() > self.body.bit_len()
                    && b.remaining_refs() >= self.body.refs().len()
            }
        };
        if inline {
            b.store_bit(false)?.store_slice(&self.body.as_slice())?;
        } else {
            b.store_bit(true)?.store_ref(self.body.clone())?;
        }
        b.build()
    }

    pub fn from_cell(cell: &Cell) -> Result<Self, CellError> {
        let mut s = cell.as_slice();
        if s.load_bit()? {
            return Err(CellError::Malformed("only internal messages are supported"));
        }
        let ihr_disabled = s.load_bit()?;
        let bounce = s.load_bit()?;
        let bounced = s.load_bit()?;
        let src = Address::load_optional(&mut s)?;
        let dest = Address::load(&mut s)?;
        let value = s.load_coins()?;
        if s.load_bit()? {
            return Err(CellError::Malformed("extra currencies are unsupported"));
        }
        let ihr_fee = s.load_coins()?;
        let fwd_fee = s.load_coins()?;
        let created_lt = s.load_u64()?;
        let created_at = s.load_u32()?;
        let init = if s.load_bit()? {
            if s.load_bit()? {
                Some(StateInit::load(&mut s.load_ref()?.as_slice())?)
            } else {
                Some(StateInit::load(&mut s)?)
            }
        } else {
            None
        };
        let (body, body_layout) = if s.load_bit()? {
            let body = s.load_ref()?;
            s.end_parse()?;
            (body, BodyLayout::Ref)
        } else {
            (s.to_cell()?, BodyLayout::Inline)
        };
        Ok(Self {
            ihr_disabled,
            bounce,
            bounced,
            src,
            dest,
            value,
            ihr_fee,
            fwd_fee,
            created_lt,
            created_at,
            init,
            body,
            body_layout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::B256;

    fn body(bits: usize) -> Cell {
        CellBuilder::new()
            .store_bits(&vec![0x5a; bits.div_ceil(8)], bits)
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn auto_layout_spills_large_bodies() {
        let dest = Address::new(0, B256::repeat_byte(7));
        let small = InternalMessage::new(dest, 5, true, body(96));
        let parsed = InternalMessage::from_cell(&small.to_cell().unwrap()).unwrap();
        assert_eq!(parsed.body_layout, BodyLayout::Inline);
        assert_eq!(parsed.body, small.body);
        assert_eq!(parsed.value, 5);

        let large = InternalMessage::new(dest, 5, true, body(900));
        let cell = large.to_cell().unwrap();
        assert_eq!(cell.refs().len(), 1);
        let parsed = InternalMessage::from_cell(&cell).unwrap();
        assert_eq!(parsed.body_layout, BodyLayout::Ref);
    }

    #[test]
    fn state_init_is_always_a_reference() {
        let init = StateInit::new(body(8), body(16));
        let dest = init.address(0).unwrap();
        let msg = InternalMessage::new(dest, 0, false, Cell::empty())
            .with_init(init.clone())
            .with_body_layout(BodyLayout::Ref);
        let cell = msg.to_cell().unwrap();
        assert_eq!(cell.refs().len(), 2);
        let parsed = InternalMessage::from_cell(&cell).unwrap();
        assert_eq!(parsed.init, Some(init));
        assert_eq!(parsed.src, None);
    }

    #[test]
    fn inline_layout_that_does_not_fit_fails() {
        let dest = Address::new(0, B256::ZERO);
        let msg = InternalMessage::new(dest, 0, true, body(900)).with_body_layout(BodyLayout::Inline);
        assert!(matches!(msg.to_cell(), Err(CellError::Overflow { .. })));
    }
}
