/// Operations accepted by the Wallet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum WalletOp {
    NewOrder = 0x1,
    Execute = 0x2,
    ExecuteInternal = 0x3,
}

/// Operations accepted or emitted by an Order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum OrderOp {
    Init = 0x5,
    Expired = 0x6,
    AlreadyExecuted = 0x7,
    Approve = 0x8,
    Approved = 0x9,
}

/// Tags of the actions an order batch may carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum ActionOp {
    SendMessage = 0xa,
    UpdateMultisigParams = 0xb,
}

/// Op value of a plain text comment.
pub const COMMENT_OP: u32 = 0;

/// Body prefix of a bounced message.
pub const BOUNCE_OP: u32 = 0xffff_ffff;

/// Width of the unix-time expiration field, in message bodies and in Order
/// data alike.
pub const EXPIRATION_BITS: usize = 48;

impl TryFrom<u32> for WalletOp {
    type Error = ();

    fn try_from(v: u32) -> Result<Self, Self::Error> {
        Ok(match v {
            0x1 => WalletOp::NewOrder,
            0x2 => WalletOp::Execute,
            0x3 => WalletOp::ExecuteInternal,
            _ => return Err(()),
        })
    }
}

impl TryFrom<u32> for OrderOp {
    type Error = ();

    fn try_from(v: u32) -> Result<Self, Self::Error> {
        Ok(match v {
            0x5 => OrderOp::Init,
            0x6 => OrderOp::Expired,
            0x7 => OrderOp::AlreadyExecuted,
            0x8 => OrderOp::Approve,
            0x9 => OrderOp::Approved,
            _ => return Err(()),
        })
    }
}

impl TryFrom<u32> for ActionOp {
    type Error = ();

    fn try_from(v: u32) -> Result<Self, Self::Error> {
        Ok(match v {
            0xa => ActionOp::SendMessage,
            0xb => ActionOp::UpdateMultisigParams,
            _ => return Err(()),
        })
    }
}

/// Send-mode flags understood by the execution environment.
pub mod send_mode {
    pub const REGULAR: u8 = 0;
    pub const PAY_FEES_SEPARATELY: u8 = 1;
    pub const IGNORE_ERRORS: u8 = 2;
    pub const CARRY_REMAINING_VALUE: u8 = 64;
    pub const CARRY_ALL_BALANCE: u8 = 128;
}
