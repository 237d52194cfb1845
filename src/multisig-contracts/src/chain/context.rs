use multisig_types::{Address, Cell, CellError, InternalMessage, NetworkConfig};

/// A message as the receiving contract sees it.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub src: Address,
    pub value: u128,
    pub bounce: bool,
    pub bounced: bool,
    pub body: Cell,
}

/// Outbound message queued by a handler, sent in the action phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutAction {
    pub message: Cell,
    pub mode: u8,
}

/// How a handler stopped short of success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Abort {
    pub exit_code: u32,
    /// State to keep despite the failure. When set, actions queued so far
    /// are still sent and the inbound message does not bounce.
    pub commit: Option<Cell>,
}

impl Abort {
    pub fn rollback(exit_code: u32) -> Self {
        Self {
            exit_code,
            commit: None,
        }
    }

    pub fn commit(exit_code: u32, data: Cell) -> Self {
        Self {
            exit_code,
            commit: Some(data),
        }
    }
}

/// Code run by accounts. Identified by its code cell.
pub trait Contract {
    fn name(&self) -> &'static str;

    fn code(&self) -> Result<Cell, CellError>;

    /// Handles one message against `data`, returning the new data.
    fn receive(
        &self,
        ctx: &mut TxContext<'_>,
        data: Cell,
        msg: &InboundMessage,
    ) -> Result<Cell, Abort>;
}

/// Per-transaction view a handler runs against: clock, own address and
/// balance, gas meter, and the outbound queue.
pub struct TxContext<'a> {
    pub now: u32,
    pub lt: u64,
    pub address: Address,
    pub balance: u128,
    pub config: &'a NetworkConfig,
    gas_used: u64,
    actions: Vec<OutAction>,
}

impl<'a> TxContext<'a> {
    pub fn new(now: u32, lt: u64, address: Address, balance: u128, config: &'a NetworkConfig) -> Self {
        Self {
            now,
            lt,
            address,
            balance,
            config,
            gas_used: 0,
            actions: Vec::new(),
        }
    }

    pub fn consume_gas(&mut self, gas: u64) {
        self.gas_used += gas;
    }

    pub fn gas_used(&self) -> u64 {
        self.gas_used
    }

    pub fn send_raw_message(&mut self, message: Cell, mode: u8) {
        self.actions.push(OutAction { message, mode });
    }

    pub fn send(&mut self, msg: &InternalMessage, mode: u8) -> Result<(), CellError> {
        self.send_raw_message(msg.to_cell()?, mode);
        Ok(())
    }

    pub fn actions(&self) -> &[OutAction] {
        &self.actions
    }

    pub(crate) fn into_actions(self) -> Vec<OutAction> {
        self.actions
    }
}
