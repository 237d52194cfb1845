use multisig_types::{AuthError, CellError, DictError};

use crate::chain::Abort;

/// Exit codes reported by aborted transactions.
pub mod exit_code {
    pub const NOT_ENOUGH_TON: u32 = 100;
    pub const UNAUTHORIZED_EXECUTE: u32 = 101;
    pub const SINGERS_OUTDATED: u32 = 102;
    pub const INVALID_DICTIONARY_SEQUENCE: u32 = 103;
    pub const UNAUTHORIZED_INIT: u32 = 104;
    pub const ALREADY_INITED: u32 = 105;
    pub const UNAUTHORIZED_SIGN: u32 = 106;
    pub const ALREADY_APPROVED: u32 = 107;
    pub const INCONSISTENT_DATA: u32 = 108;
    pub const INVALID_THRESHOLD: u32 = 109;
    pub const INVALID_SIGNERS: u32 = 110;
    pub const EXPIRED: u32 = 111;
    pub const ALREADY_EXECUTED: u32 = 112;
    pub const UNAUTHORIZED_NEW_ORDER: u32 = 1007;
    pub const INVALID_NEW_ORDER: u32 = 1008;
    pub const SEQNO_EXHAUSTED: u32 = 1009;
    pub const UNKNOWN_OP: u32 = 0xffff;
}

/// Errors while reading message bodies, batches or persisted state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error(transparent)]
    Cell(#[from] CellError),
    #[error(transparent)]
    Dict(#[from] DictError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("unknown action op {0:#x}")]
    UnknownAction(u32),
    #[error("order batch is empty")]
    EmptyBatch,
}

/// Errors raised by the Wallet.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WalletError {
    #[error("sender is not the signer/proposer at the given index")]
    UnauthorizedNewOrder,
    #[error("order batch is malformed or empty")]
    InvalidNewOrder,
    #[error("attached {provided} is below the estimated {required}")]
    NotEnoughTon { required: u128, provided: u128 },
    #[error("sender is not the order it claims to be")]
    UnauthorizedExecute,
    #[error("signer set changed since the order was created")]
    SignersOutdated,
    #[error("dictionary keys are not dense from zero")]
    InvalidDictionarySequence,
    #[error("threshold outside 1..=signers")]
    InvalidThreshold,
    #[error("signer list is empty or too long")]
    InvalidSigners,
    #[error("order expired")]
    Expired,
    #[error("order counter exhausted")]
    SeqnoExhausted,
    #[error("unknown op {0:#x}")]
    UnknownOp(u32),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl WalletError {
    pub fn exit_code(&self) -> u32 {
        use exit_code::*;
        match self {
            WalletError::UnauthorizedNewOrder => UNAUTHORIZED_NEW_ORDER,
            WalletError::InvalidNewOrder => INVALID_NEW_ORDER,
            WalletError::NotEnoughTon { .. } => NOT_ENOUGH_TON,
            WalletError::UnauthorizedExecute => UNAUTHORIZED_EXECUTE,
            WalletError::SignersOutdated => SINGERS_OUTDATED,
            WalletError::InvalidDictionarySequence => INVALID_DICTIONARY_SEQUENCE,
            WalletError::InvalidThreshold => INVALID_THRESHOLD,
            WalletError::InvalidSigners => INVALID_SIGNERS,
            WalletError::Expired => EXPIRED,
            WalletError::SeqnoExhausted => SEQNO_EXHAUSTED,
            WalletError::UnknownOp(_) => UNKNOWN_OP,
            WalletError::Decode(_) => INCONSISTENT_DATA,
        }
    }
}

impl From<WalletError> for Abort {
    fn from(e: WalletError) -> Self {
        Abort::rollback(e.exit_code())
    }
}

impl From<AuthError> for WalletError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Dict(DictError::InvalidSequence) => WalletError::InvalidDictionarySequence,
            AuthError::InvalidThreshold { .. } => WalletError::InvalidThreshold,
            AuthError::NoSigners | AuthError::TooManyParties(_) => WalletError::InvalidSigners,
            other => WalletError::Decode(DecodeError::Auth(other)),
        }
    }
}

impl From<CellError> for WalletError {
    fn from(e: CellError) -> Self {
        WalletError::Decode(DecodeError::Cell(e))
    }
}

impl From<DictError> for WalletError {
    fn from(e: DictError) -> Self {
        WalletError::Decode(DecodeError::Dict(e))
    }
}

/// Errors raised by an Order.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderError {
    #[error("init must come from the wallet")]
    UnauthorizedInit,
    #[error("order already initialized")]
    AlreadyInited,
    #[error("sender is not the signer at the given index")]
    UnauthorizedSign,
    #[error("signer already approved")]
    AlreadyApproved,
    #[error("init payload disagrees with itself")]
    InconsistentData,
    #[error("threshold outside 1..=signers")]
    InvalidThreshold,
    #[error("signer list is empty or too long")]
    InvalidSigners,
    #[error("dictionary keys are not dense from zero")]
    InvalidDictionarySequence,
    #[error("order expired")]
    Expired,
    #[error("unknown op {0:#x}")]
    UnknownOp(u32),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl OrderError {
    pub fn exit_code(&self) -> u32 {
        use exit_code::*;
        match self {
            OrderError::UnauthorizedInit => UNAUTHORIZED_INIT,
            OrderError::AlreadyInited => ALREADY_INITED,
            OrderError::UnauthorizedSign => UNAUTHORIZED_SIGN,
            OrderError::AlreadyApproved => ALREADY_APPROVED,
            OrderError::InconsistentData => INCONSISTENT_DATA,
            OrderError::InvalidThreshold => INVALID_THRESHOLD,
            OrderError::InvalidSigners => INVALID_SIGNERS,
            OrderError::InvalidDictionarySequence => INVALID_DICTIONARY_SEQUENCE,
            OrderError::Expired => EXPIRED,
            OrderError::UnknownOp(_) => UNKNOWN_OP,
            OrderError::Decode(_) => INCONSISTENT_DATA,
        }
    }
}

impl From<OrderError> for Abort {
    fn from(e: OrderError) -> Self {
        Abort::rollback(e.exit_code())
    }
}

impl From<AuthError> for OrderError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Dict(DictError::InvalidSequence) => OrderError::InvalidDictionarySequence,
            AuthError::InvalidThreshold { .. } => OrderError::InvalidThreshold,
            AuthError::NoSigners | AuthError::TooManyParties(_) => OrderError::InvalidSigners,
            other => OrderError::Decode(DecodeError::Auth(other)),
        }
    }
}

impl From<CellError> for OrderError {
    fn from(e: CellError) -> Self {
        OrderError::Decode(DecodeError::Cell(e))
    }
}

impl From<DictError> for OrderError {
    fn from(e: DictError) -> Self {
        OrderError::Decode(DecodeError::Dict(e))
    }
}

/// Errors while pricing an order.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EstimateError {
    #[error(transparent)]
    Cell(#[from] CellError),
    #[error(transparent)]
    Dict(#[from] DictError),
}

impl From<EstimateError> for WalletError {
    fn from(_: EstimateError) -> Self {
        WalletError::InvalidNewOrder
    }
}
