use crate::cell::Cell;

/// Most actions one order batch dictionary can carry (8-bit keys).
pub const MAX_ACTIONS_PER_ORDER: usize = 255;

/// Actions per chunk when a batch is chained through self-calls; the
/// remaining slot holds the transfer that re-enters the Wallet.
pub const CHAINED_CHUNK_SIZE: usize = MAX_ACTIONS_PER_ORDER - 1;

/// Decoded representation of a single batched action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    /// Emit `message` verbatim with `send_mode`.
    Transfer { send_mode: u8, message: Cell },
    /// Replace the Wallet's authorization context.
    UpdateAuthorization(AuthorizationUpdate),
}

/// New authorization parameters, still in their wire form. The dictionaries
/// are validated when the update is applied, not when it is decoded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthorizationUpdate {
    pub threshold: u8,
    pub signers: Option<Cell>,
    pub proposers: Option<Cell>,
    pub modules: Option<Cell>,
    pub guard: Option<Cell>,
}
