//! Shared types for the multisig Wallet/Order protocol: cell encoding,
//! dictionaries, addresses and messages, op-codes, batched actions, the
//! authorization context and network prices.

pub mod actions;
pub mod address;
pub mod auth;
pub mod boc;
pub mod cell;
pub mod dict;
pub mod message;
pub mod opcodes;
pub mod prices;

pub use actions::{Action, AuthorizationUpdate, CHAINED_CHUNK_SIZE, MAX_ACTIONS_PER_ORDER};
pub use address::Address;
pub use auth::{AuthError, AuthorizationContext, AuthorizationSnapshot, PartyList};
pub use cell::{Cell, CellBuilder, CellError, CellSlice, StatsCollector, StorageStats};
pub use dict::DictError;
pub use message::{BodyLayout, InternalMessage, StateInit};
pub use opcodes::{send_mode, ActionOp, OrderOp, WalletOp, EXPIRATION_BITS};
pub use prices::{ForwardFee, GasPrices, MsgPrices, NetworkConfig, StoragePrices};
