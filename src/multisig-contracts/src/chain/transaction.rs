use multisig_types::{Address, Cell, ForwardFee};

/// A message emitted during a transaction's action or bounce phase.
#[derive(Debug, Clone)]
pub struct OutMessage {
    pub lt: u64,
    pub dest: Address,
    pub value: u128,
    pub op: Option<u32>,
    pub body: Cell,
    pub bounce: bool,
    pub bounced: bool,
    pub deploys: bool,
    pub fwd_fee: ForwardFee,
}

/// Why an action was not sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionSkip {
    MalformedMessage,
    InsufficientFunds { required: u128, available: u128 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedAction {
    pub index: usize,
    pub mode: u8,
    pub reason: ActionSkip,
}

/// Record of one delivered message.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub lt: u64,
    pub now: u32,
    pub account: Address,
    pub from: Option<Address>,
    pub value: u128,
    pub op: Option<u32>,
    pub body: Cell,
    pub bounced: bool,
    pub deployed: bool,
    /// Handler returned normally (or there was no handler).
    pub success: bool,
    pub aborted: bool,
    pub exit_code: Option<u32>,
    pub gas_used: u64,
    pub gas_fees: u128,
    pub storage_fees: u128,
    /// Forwarding fees charged for everything this transaction sent.
    pub fwd_fees: u128,
    pub out_messages: Vec<OutMessage>,
    pub skipped_actions: Vec<SkippedAction>,
    pub end_balance: u128,
}

impl Transaction {
    pub fn total_fees(&self) -> u128 {
        self.gas_fees + self.storage_fees + self.fwd_fees
    }
}

/// Every transaction caused by one injected message, in execution order.
#[derive(Debug, Clone, Default)]
pub struct Trace {
    pub transactions: Vec<Transaction>,
}

impl Trace {
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions.iter()
    }

    /// First transaction on `to` triggered by a message from `from`.
    pub fn find(&self, from: &Address, to: &Address) -> Option<&Transaction> {
        self.transactions
            .iter()
            .find(|tx| tx.from.as_ref() == Some(from) && &tx.account == to)
    }

    pub fn find_op(&self, to: &Address, op: u32) -> Option<&Transaction> {
        self.transactions
            .iter()
            .find(|tx| &tx.account == to && tx.op == Some(op))
    }

    pub fn to(&self, to: &Address) -> Vec<&Transaction> {
        self.transactions.iter().filter(|tx| &tx.account == to).collect()
    }
}
