//! In-process, message-driven execution environment.
//!
//! Purpose: run the Wallet and Orders the way the network would. Messages
//! are delivered one at a time in FIFO order; every transaction and every
//! emitted message takes the next logical time. Each delivery goes through
//! storage, credit, compute and action phases, and fees are charged with the
//! same formulas the Fee Estimator uses.

mod context;
mod transaction;

use std::collections::{HashMap, VecDeque};

use alloy_primitives::B256;
use tracing::{debug, warn};

use multisig_types::{
    opcodes::BOUNCE_OP, send_mode, Address, BodyLayout, Cell, CellBuilder, CellError,
    InternalMessage, NetworkConfig, StateInit,
};

pub use context::{Abort, Contract, InboundMessage, OutAction, TxContext};
pub use transaction::{ActionSkip, OutMessage, SkippedAction, Trace, Transaction};

use crate::{
    fees::{account_storage_fee, message_forward_fee},
    order::Order,
    wallet::Wallet,
};

const MAX_TRANSACTIONS_PER_RUN: usize = 10_000;
const BOUNCED_BODY_BITS: usize = 256;

/// Starting balance of a treasury account, in nanotons.
pub const TREASURY_BALANCE: u128 = 1_000_000 * 1_000_000_000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    #[error(transparent)]
    Cell(#[from] CellError),
    #[error("injected message has no sender")]
    MissingSender,
    #[error("sender {0} does not exist")]
    UnknownSender(Address),
    #[error("sender {sender} cannot cover {value}")]
    InsufficientSenderBalance { sender: Address, value: u128 },
    #[error("code {0} is already registered")]
    DuplicateCode(B256),
    #[error("run exceeded {0} transactions")]
    Runaway(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountState {
    pub code: Cell,
    pub data: Cell,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub balance: u128,
    /// `None` for accounts that only hold value.
    pub state: Option<AccountState>,
    pub last_paid: u32,
}

pub struct Blockchain {
    config: NetworkConfig,
    now: u32,
    lt: u64,
    accounts: HashMap<Address, Account>,
    contracts: HashMap<B256, Box<dyn Contract>>,
    queue: VecDeque<InternalMessage>,
}

impl Blockchain {
    /// Environment with the Wallet and Order code installed.
    pub fn new(config: NetworkConfig, now: u32) -> Result<Self, ChainError> {
        let mut chain = Self {
            config,
            now,
            lt: 0,
            accounts: HashMap::new(),
            contracts: HashMap::new(),
            queue: VecDeque::new(),
        };
        chain.register(Box::new(Wallet))?;
        chain.register(Box::new(Order))?;
        Ok(chain)
    }

    /// Makes accounts deployed with `contract`'s code run it.
    pub fn register(&mut self, contract: Box<dyn Contract>) -> Result<(), ChainError> {
        let hash = contract.code()?.hash();
        if self.contracts.contains_key(&hash) {
            return Err(ChainError::DuplicateCode(hash));
        }
        debug!(name = contract.name(), code = %hash, "registered contract");
        self.contracts.insert(hash, contract);
        Ok(())
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn now(&self) -> u32 {
        self.now
    }

    pub fn set_now(&mut self, now: u32) {
        self.now = now;
    }

    pub fn account(&self, addr: &Address) -> Option<&Account> {
        self.accounts.get(addr)
    }

    pub fn balance(&self, addr: &Address) -> u128 {
        self.accounts.get(addr).map(|a| a.balance).unwrap_or(0)
    }

    pub fn data(&self, addr: &Address) -> Option<&Cell> {
        self.accounts
            .get(addr)
            .and_then(|a| a.state.as_ref())
            .map(|s| &s.data)
    }

    /// Code-less account funded with [`TREASURY_BALANCE`], derived from `seed`.
    pub fn treasury(&mut self, seed: &str) -> Result<Address, ChainError> {
        let hash = CellBuilder::new()
            .store_bytes(seed.as_bytes())?
            .build()?
            .hash();
        let addr = Address::new(0, hash);
        let now = self.now;
        self.accounts.entry(addr).or_insert(Account {
            balance: TREASURY_BALANCE,
            state: None,
            last_paid: now,
        });
        Ok(addr)
    }

    /// Deploys `init` on the basechain with a first message from `from`.
    pub fn deploy(
        &mut self,
        from: Address,
        init: StateInit,
        value: u128,
        body: Cell,
    ) -> Result<(Address, Trace), ChainError> {
        let addr = init.address(0)?;
        let msg = InternalMessage::new(addr, value, false, body)
            .with_init(init)
            .with_src(from);
        Ok((addr, self.send(msg)?))
    }

    /// Injects `msg` from its `src` account and runs until the queue drains.
    pub fn send(&mut self, mut msg: InternalMessage) -> Result<Trace, ChainError> {
        let src = msg.src.ok_or(ChainError::MissingSender)?;
        let sender = self
            .accounts
            .get_mut(&src)
            .ok_or(ChainError::UnknownSender(src))?;
        if sender.balance < msg.value {
            return Err(ChainError::InsufficientSenderBalance {
                sender: src,
                value: msg.value,
            });
        }
        sender.balance -= msg.value;
        msg.created_lt = self.next_lt();
        msg.created_at = self.now;
        self.queue.push_back(msg);
        self.run()
    }

    fn run(&mut self) -> Result<Trace, ChainError> {
        let mut trace = Trace::default();
        while let Some(msg) = self.queue.pop_front() {
            if trace.len() >= MAX_TRANSACTIONS_PER_RUN {
                self.queue.clear();
                return Err(ChainError::Runaway(MAX_TRANSACTIONS_PER_RUN));
            }
            trace.transactions.push(self.process(msg)?);
        }
        Ok(trace)
    }

    fn next_lt(&mut self) -> u64 {
        self.lt += 1;
        self.lt
    }

    fn process(&mut self, msg: InternalMessage) -> Result<Transaction, ChainError> {
        let lt = self.next_lt();
        let now = self.now;
        let dest = msg.dest;
        let existed = self.accounts.contains_key(&dest);
        let mut account = self.accounts.remove(&dest).unwrap_or(Account {
            balance: 0,
            state: None,
            last_paid: now,
        });

        let mut tx = Transaction {
            lt,
            now,
            account: dest,
            from: msg.src,
            value: msg.value,
            op: read_op(&msg.body),
            body: msg.body.clone(),
            bounced: msg.bounced,
            deployed: false,
            success: false,
            aborted: false,
            exit_code: None,
            gas_used: 0,
            gas_fees: 0,
            storage_fees: 0,
            fwd_fees: 0,
            out_messages: Vec::new(),
            skipped_actions: Vec::new(),
            end_balance: 0,
        };

        // storage
        if existed {
            if let Some(state) = &account.state {
                let elapsed = now.saturating_sub(account.last_paid) as u64;
                let fee = account_storage_fee(&self.config.storage, &state.code, &state.data, elapsed);
                let collected = fee.min(account.balance);
                account.balance -= collected;
                tx.storage_fees = collected;
            }
        }
        account.last_paid = now;

        // credit
        account.balance += msg.value;

        if account.state.is_none() {
            if let Some(init) = &msg.init {
                if init.address(dest.workchain)? == dest {
                    account.state = Some(AccountState {
                        code: init.code.clone(),
                        data: init.data.clone(),
                    });
                    tx.deployed = true;
                }
            }
        }

        // compute
        let mut actions = Vec::new();
        let mut remaining_in = msg.value;
        let mut bounce = false;
        let handler = account
            .state
            .as_ref()
            .and_then(|state| self.contracts.get(&state.code.hash()).map(|c| (c, state.data.clone())));
        match (handler, msg.src) {
            (Some((contract, data)), Some(src)) => {
                let inbound = InboundMessage {
                    src,
                    value: msg.value,
                    bounce: msg.bounce,
                    bounced: msg.bounced,
                    body: msg.body.clone(),
                };
                let mut ctx = TxContext::new(now, lt, dest, account.balance, &self.config);
                let result = contract.receive(&mut ctx, data, &inbound);

                let gas_fee = self.config.gas.compute_fee(ctx.gas_used()).min(account.balance);
                account.balance -= gas_fee;
                remaining_in = msg.value.saturating_sub(gas_fee);
                tx.gas_used = ctx.gas_used();
                tx.gas_fees = gas_fee;

                match result {
                    Ok(data) => {
                        set_data(&mut account, data);
                        actions = ctx.into_actions();
                        tx.success = true;
                    }
                    Err(Abort {
                        exit_code,
                        commit: Some(data),
                    }) => {
                        set_data(&mut account, data);
                        actions = ctx.into_actions();
                        tx.aborted = true;
                        tx.exit_code = Some(exit_code);
                    }
                    Err(Abort {
                        exit_code,
                        commit: None,
                    }) => {
                        if tx.deployed {
                            account.state = None;
                            tx.deployed = false;
                        }
                        tx.aborted = true;
                        tx.exit_code = Some(exit_code);
                        bounce = msg.bounce && !msg.bounced;
                    }
                }
            }
            _ => tx.success = true,
        }

        // action
        for (index, action) in actions.into_iter().enumerate() {
            match self.apply_action(&mut account, &mut remaining_in, dest, &action) {
                Ok(out) => {
                    tx.fwd_fees += out.fwd_fee.total;
                    tx.out_messages.push(out);
                }
                Err(reason) => {
                    if action.mode & send_mode::IGNORE_ERRORS == 0 {
                        warn!(account = %dest, index, mode = action.mode, ?reason, "action skipped");
                    }
                    tx.skipped_actions.push(SkippedAction {
                        index,
                        mode: action.mode,
                        reason,
                    });
                }
            }
        }

        if bounce {
            if let Some(src) = msg.src {
                if let Some(out) = self.bounce_back(&mut account, remaining_in, dest, src, &msg.body)? {
                    tx.fwd_fees += out.fwd_fee.total;
                    tx.out_messages.push(out);
                }
            }
        }

        tx.end_balance = account.balance;
        self.accounts.insert(dest, account);
        debug!(
            lt,
            account = %dest,
            op = ?tx.op,
            success = tx.success,
            exit_code = ?tx.exit_code,
            gas = tx.gas_used,
            out = tx.out_messages.len(),
            "transaction"
        );
        Ok(tx)
    }

    fn apply_action(
        &mut self,
        account: &mut Account,
        remaining_in: &mut u128,
        src: Address,
        action: &OutAction,
    ) -> Result<OutMessage, ActionSkip> {
        let mut out =
            InternalMessage::from_cell(&action.message).map_err(|_| ActionSkip::MalformedMessage)?;
        let fee = message_forward_fee(&self.config.msg, &action.message);
        let mode = action.mode;

        let mut value = out.value;
        if mode & send_mode::CARRY_ALL_BALANCE != 0 {
            value = account.balance;
        } else if mode & send_mode::CARRY_REMAINING_VALUE != 0 {
            value += *remaining_in;
        }
        let fees_separately = mode & send_mode::PAY_FEES_SEPARATELY != 0
            && mode & send_mode::CARRY_ALL_BALANCE == 0;
        let (debit, carried) = if fees_separately {
            (value + fee.total, value)
        } else {
            if value < fee.total {
                return Err(ActionSkip::InsufficientFunds {
                    required: fee.total,
                    available: value,
                });
            }
            (value, value - fee.total)
        };
        if debit > account.balance {
            return Err(ActionSkip::InsufficientFunds {
                required: debit,
                available: account.balance,
            });
        }
        account.balance -= debit;
        if mode & send_mode::CARRY_REMAINING_VALUE != 0 {
            *remaining_in = 0;
        }

        let lt = self.next_lt();
        out.src = Some(src);
        out.value = carried;
        out.fwd_fee = fee.remaining;
        out.created_lt = lt;
        out.created_at = self.now;
        let record = OutMessage {
            lt,
            dest: out.dest,
            value: carried,
            op: read_op(&out.body),
            body: out.body.clone(),
            bounce: out.bounce,
            bounced: out.bounced,
            deploys: out.init.is_some(),
            fwd_fee: fee,
        };
        self.queue.push_back(out);
        Ok(record)
    }

    /// Returns what is left of the inbound value to its sender.
    fn bounce_back(
        &mut self,
        account: &mut Account,
        remaining_in: u128,
        from: Address,
        to: Address,
        original: &Cell,
    ) -> Result<Option<OutMessage>, ChainError> {
        let mut original = original.as_slice();
        let kept = original.remaining_bits().min(BOUNCED_BODY_BITS);
        let body = CellBuilder::new()
            .store_uint(BOUNCE_OP as u64, 32)?
            .store_bits(&original.load_bits(kept)?, kept)?
            .build()?;
        let mut msg = InternalMessage::new(to, 0, false, body).with_body_layout(BodyLayout::Inline);
        msg.bounced = true;
        let fee = message_forward_fee(&self.config.msg, &msg.to_cell()?);
        let value = remaining_in.min(account.balance);
        if value <= fee.total {
            return Ok(None);
        }
        account.balance -= value;

        let lt = self.next_lt();
        msg.src = Some(from);
        msg.value = value - fee.total;
        msg.fwd_fee = fee.remaining;
        msg.created_lt = lt;
        msg.created_at = self.now;
        let record = OutMessage {
            lt,
            dest: to,
            value: msg.value,
            op: Some(BOUNCE_OP),
            body: msg.body.clone(),
            bounce: false,
            bounced: true,
            deploys: false,
            fwd_fee: fee,
        };
        self.queue.push_back(msg);
        Ok(Some(record))
    }
}

fn set_data(account: &mut Account, data: Cell) {
    if let Some(state) = account.state.as_mut() {
        state.data = data;
    }
}

fn read_op(body: &Cell) -> Option<u32> {
    body.as_slice().load_u32().ok()
}
