use serde::{Deserialize, Serialize};

use multisig_types::{boc::deserialize_boc_hex, send_mode, Action, Address, Cell, InternalMessage};

use crate::encoder::{comment, transfer_action, update_action, EncodeError};

/// One action as it appears in an actions file.
///
/// ```json
/// [
///   { "type": "transfer", "to": "0:ab..", "value": 1000000000, "comment": "rent" },
///   { "type": "update", "threshold": 2, "signers": ["0:01..", "0:02.."] }
/// ]
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionRequest {
    Transfer(TransferRequest),
    Update(UpdateRequest),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub to: Address,
    /// Nanotons.
    pub value: u128,
    #[serde(default = "default_send_mode")]
    pub send_mode: u8,
    #[serde(default)]
    pub bounce: bool,
    /// Text comment body. Ignored when `body_boc` is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Arbitrary body as a hex bag of cells.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_boc: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRequest {
    pub threshold: u8,
    pub signers: Vec<Address>,
    #[serde(default)]
    pub proposers: Vec<Address>,
}

fn default_send_mode() -> u8 {
    send_mode::PAY_FEES_SEPARATELY
}

impl TransferRequest {
    pub fn message(&self) -> Result<InternalMessage, EncodeError> {
        let body = match (&self.body_boc, &self.comment) {
            (Some(boc), _) => deserialize_boc_hex(boc)?,
            (None, Some(text)) => comment(text)?,
            (None, None) => Cell::empty(),
        };
        Ok(InternalMessage::new(self.to, self.value, self.bounce, body))
    }
}

impl ActionRequest {
    pub fn to_action(&self) -> Result<Action, EncodeError> {
        match self {
            ActionRequest::Transfer(t) => transfer_action(t.send_mode, &t.message()?),
            ActionRequest::Update(u) => update_action(u.threshold, &u.signers, &u.proposers, None, None),
        }
    }
}
