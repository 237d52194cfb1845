#[cfg(test)]
mod tests {
    use crate::encoder::{
        approve_body, approve_comment, encode_action, new_order_body, pack_large, pack_order,
        transfer_action, update_action, EncodeError, CHAINED_EXECUTION_VALUE,
    };
    use crate::types::ActionRequest;
    use alloy_primitives::B256;
    use multisig_types::{
        dict::parse_uint_dict, send_mode, Action, ActionOp, Address, Cell, InternalMessage,
        OrderOp, WalletOp, EXPIRATION_BITS,
    };

    fn addr(n: u8) -> Address {
        Address::new(0, B256::repeat_byte(n))
    }

    fn transfers(n: usize) -> Vec<Action> {
        (0..n)
            .map(|i| {
                let msg = InternalMessage::new(addr((i % 200) as u8 + 1), i as u128 + 1, false, Cell::empty());
                transfer_action(send_mode::PAY_FEES_SEPARATELY, &msg).unwrap()
            })
            .collect()
    }

    fn entries(order: &Cell) -> Vec<Cell> {
        parse_uint_dict(Some(order), 8)
            .unwrap()
            .into_values()
            .map(|mut s| s.load_ref().unwrap())
            .collect()
    }

    #[test]
    fn test_pack_order() {
        let actions = transfers(3);
        let order = pack_order(&actions).unwrap();
        let keys: Vec<u64> = parse_uint_dict(Some(&order), 8).unwrap().into_keys().collect();
        assert_eq!(keys, vec![0, 1, 2]);
        assert_eq!(entries(&order)[1], encode_action(&actions[1]).unwrap());

        assert_eq!(pack_order(&[]).unwrap_err(), EncodeError::EmptyOrder);
        assert_eq!(
            pack_order(&transfers(256)).unwrap_err(),
            EncodeError::TooManyActions(256)
        );
    }

    #[test]
    fn test_pack_large_chains_tail_first() {
        let wallet = addr(0xee);
        let actions = transfers(600);
        let first = pack_large(&actions, &wallet).unwrap();

        let mut chunk = first;
        let mut sizes = Vec::new();
        loop {
            let cells = entries(&chunk);
            let last = cells.last().cloned().unwrap();
            let mut s = last.as_slice();
            assert_eq!(s.load_u32().unwrap(), ActionOp::SendMessage as u32);
            let mode = s.load_u8().unwrap();
            let msg = InternalMessage::from_cell(&s.load_ref().unwrap()).unwrap();
            if msg.dest != wallet {
                sizes.push(cells.len());
                break;
            }
            sizes.push(cells.len() - 1);
            assert_eq!(mode, send_mode::PAY_FEES_SEPARATELY);
            assert_eq!(msg.value, CHAINED_EXECUTION_VALUE);
            let mut body = msg.body.as_slice();
            assert_eq!(body.load_u32().unwrap(), WalletOp::ExecuteInternal as u32);
            body.load_u64().unwrap();
            chunk = body.load_ref().unwrap();
        }
        assert_eq!(sizes, vec![254, 254, 92]);
    }

    #[test]
    fn test_pack_large_small_batch_is_plain() {
        let actions = transfers(255);
        assert_eq!(
            pack_large(&actions, &addr(1)).unwrap(),
            pack_order(&actions).unwrap()
        );
    }

    #[test]
    fn test_new_order_body() {
        let order = pack_order(&transfers(1)).unwrap();
        let body = new_order_body(&order, 1_700_000_000, true, 3, 42).unwrap();
        let mut s = body.as_slice();
        assert_eq!(s.load_u32().unwrap(), WalletOp::NewOrder as u32);
        assert_eq!(s.load_u64().unwrap(), 42);
        assert!(s.load_bit().unwrap());
        assert_eq!(s.load_u8().unwrap(), 3);
        assert_eq!(s.load_uint(EXPIRATION_BITS).unwrap(), 1_700_000_000);
        assert_eq!(s.load_ref().unwrap(), order);
        s.end_parse().unwrap();
    }

    #[test]
    fn test_approve_bodies() {
        let mut s = approve_body(7, 9).unwrap().as_slice();
        assert_eq!(s.load_u32().unwrap(), OrderOp::Approve as u32);
        assert_eq!(s.load_u64().unwrap(), 9);
        assert_eq!(s.load_u8().unwrap(), 7);

        let mut c = approve_comment().unwrap().as_slice();
        assert_eq!(c.load_u32().unwrap(), 0);
        assert_eq!(c.load_bits(56).unwrap(), b"approve".to_vec());
        assert!(c.is_empty());
    }

    #[test]
    fn test_update_action_rejects_oversized_lists() {
        let many: Vec<Address> = (0..256).map(|i| addr((i % 250) as u8)).collect();
        assert!(matches!(
            update_action(1, &many, &[], None, None),
            Err(EncodeError::Auth(_))
        ));
    }

    #[test]
    fn test_action_request_json() {
        let text = format!(
            r#"[
                {{"type": "transfer", "to": "{}", "value": 5000, "comment": "hi"}},
                {{"type": "update", "threshold": 1, "signers": ["{}"]}}
            ]"#,
            addr(2),
            addr(3)
        );
        let requests: Vec<ActionRequest> = serde_json::from_str(&text).unwrap();
        let actions: Vec<Action> = requests.iter().map(|r| r.to_action().unwrap()).collect();

        match &actions[0] {
            Action::Transfer { send_mode: mode, message } => {
                assert_eq!(*mode, send_mode::PAY_FEES_SEPARATELY);
                let msg = InternalMessage::from_cell(message).unwrap();
                assert_eq!(msg.dest, addr(2));
                assert_eq!(msg.value, 5000);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(actions[1], Action::UpdateAuthorization(ref u) if u.threshold == 1));
    }
}
