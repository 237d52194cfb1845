use alloy_primitives::B256;

use multisig_types::{
    dict::parse_uint_dict, Action, ActionOp, AuthorizationUpdate, Cell, CellSlice, EXPIRATION_BITS,
};

use crate::{constants::APPROVE_COMMENT, errors::DecodeError};

const ACTION_KEY_BITS: usize = 8;

/// `new_order` payload after `op query_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderRequest {
    pub is_signer: bool,
    pub index: u8,
    pub expiration: u64,
    pub order: Cell,
}

/// `execute` payload after `op query_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecuteRequest {
    pub seqno: u32,
    pub expiration: u64,
    pub signers_hash: B256,
    pub order: Cell,
}

/// Order `init` payload after `op query_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitRequest {
    pub threshold: u8,
    pub signers: Cell,
    pub signers_num: u8,
    pub expiration: u64,
    pub order: Cell,
    pub approve_on_init: Option<u8>,
}

pub fn decode_new_order(s: &mut CellSlice) -> Result<NewOrderRequest, DecodeError> {
    let is_signer = s.load_bit()?;
    let index = s.load_u8()?;
    let expiration = s.load_uint(EXPIRATION_BITS)?;
    let order = s.load_ref()?;
    s.end_parse()?;
    Ok(NewOrderRequest {
        is_signer,
        index,
        expiration,
        order,
    })
}

pub fn decode_execute(s: &mut CellSlice) -> Result<ExecuteRequest, DecodeError> {
    let seqno = s.load_u32()?;
    let expiration = s.load_uint(EXPIRATION_BITS)?;
    let signers_hash = B256::from_slice(&s.load_bits(256)?);
    let order = s.load_ref()?;
    s.end_parse()?;
    Ok(ExecuteRequest {
        seqno,
        expiration,
        signers_hash,
        order,
    })
}

pub fn decode_execute_internal(s: &mut CellSlice) -> Result<Cell, DecodeError> {
    let order = s.load_ref()?;
    s.end_parse()?;
    Ok(order)
}

pub fn decode_init(s: &mut CellSlice) -> Result<InitRequest, DecodeError> {
    let threshold = s.load_u8()?;
    let signers = s.load_ref()?;
    let signers_num = s.load_u8()?;
    let expiration = s.load_uint(EXPIRATION_BITS)?;
    let order = s.load_ref()?;
    let approve_on_init = if s.load_bit()? {
        Some(s.load_u8()?)
    } else {
        None
    };
    s.end_parse()?;
    Ok(InitRequest {
        threshold,
        signers,
        signers_num,
        expiration,
        order,
        approve_on_init,
    })
}

/// Signer index of a structured approval.
pub fn decode_approve(s: &mut CellSlice) -> Result<u8, DecodeError> {
    let index = s.load_u8()?;
    s.end_parse()?;
    Ok(index)
}

/// True when what follows a zero op is exactly the approval comment.
pub fn is_approve_comment(s: &CellSlice) -> bool {
    if s.remaining_refs() != 0 || s.remaining_bits() != APPROVE_COMMENT.len() * 8 {
        return false;
    }
    let mut s = s.clone();
    s.load_bits(APPROVE_COMMENT.len() * 8)
        .map(|text| text == APPROVE_COMMENT)
        .unwrap_or(false)
}

/// Action cells of a batch, in increasing key order.
pub fn decode_action_list(order: &Cell) -> Result<Vec<Cell>, DecodeError> {
    let entries = parse_uint_dict(Some(order), ACTION_KEY_BITS)?;
    if entries.is_empty() {
        return Err(DecodeError::EmptyBatch);
    }
    entries
        .into_values()
        .map(|mut value| -> Result<Cell, DecodeError> {
            let action = value.load_ref()?;
            value.end_parse()?;
            Ok(action)
        })
        .collect()
}

/// Decode a single batched action.
pub fn decode_action(cell: &Cell) -> Result<Action, DecodeError> {
    let mut s = cell.as_slice();
    let op = s.load_u32()?;
    let action = match ActionOp::try_from(op).map_err(|_| DecodeError::UnknownAction(op))? {
        ActionOp::SendMessage => {
            let send_mode = s.load_u8()?;
            let message = s.load_ref()?;
            Action::Transfer { send_mode, message }
        }
        ActionOp::UpdateMultisigParams => {
            let threshold = s.load_u8()?;
            let signers = s.load_maybe_ref()?;
            let proposers = s.load_maybe_ref()?;
            let modules = s.load_maybe_ref()?;
            let guard = s.load_maybe_ref()?;
            Action::UpdateAuthorization(AuthorizationUpdate {
                threshold,
                signers,
                proposers,
                modules,
                guard,
            })
        }
    };
    s.end_parse()?;
    Ok(action)
}

#[cfg(test)]
mod tests {
    use super::*;
    use multisig_types::CellBuilder;

    fn comment(text: &[u8], with_ref: bool) -> CellSlice {
        let mut b = CellBuilder::new();
        b.store_bytes(text).unwrap();
        if with_ref {
            b.store_ref(Cell::empty()).unwrap();
        }
        b.build().unwrap().as_slice()
    }

    #[test]
    fn approve_comment_must_match_exactly() {
        assert!(is_approve_comment(&comment(b"approve", false)));
        assert!(!is_approve_comment(&comment(b"approve", true)));
        assert!(!is_approve_comment(&comment(b"approve not given", false)));
        assert!(!is_approve_comment(&comment(b"approvf", false)));
        assert!(!is_approve_comment(&comment(b"", false)));
    }

    #[test]
    fn unknown_action_is_rejected() {
        let cell = CellBuilder::new()
            .store_uint(0x77, 32)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(
            decode_action(&cell).unwrap_err(),
            DecodeError::UnknownAction(0x77)
        );
    }

    #[test]
    fn transfer_action_layout() {
        let message = CellBuilder::new().store_uint(1, 1).unwrap().build().unwrap();
        let cell = CellBuilder::new()
            .store_uint(ActionOp::SendMessage as u64, 32)
            .unwrap()
            .store_uint(3, 8)
            .unwrap()
            .store_ref(message.clone())
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(
            decode_action(&cell).unwrap(),
            Action::Transfer {
                send_mode: 3,
                message
            }
        );
    }
}
