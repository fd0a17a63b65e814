//! # spyglass-chain — resilient chain data access.
//!
//! Everything a front end needs to read a dev chain that may or may not
//! be running: a [`ConnectionManager`] owning the single node link, a
//! [`Supervisor`] that probes and repairs it in the background, and a
//! [`Dispatcher`] whose reads degrade to deterministic synthetic data
//! (marked `mock`) whenever the node is unreachable. Writes never
//! degrade.
//!
//! The main entry point is [`Dispatcher::new`] over a shared
//! [`ConnectionManager`]; see the crate-level tests for the wiring.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod manager;
pub mod normalize;
pub mod rpc;
pub mod supervisor;
pub mod synthetic;
pub mod types;

pub use config::ChainConfig;
pub use dispatch::{Dispatcher, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
pub use error::ChainError;
pub use manager::{ConnectionManager, ConnectionState};
pub use rpc::{ChainHandle, QueryClient, StatusClient};
pub use supervisor::Supervisor;
pub use types::{
    AddressInfo, BlockDetail, BlockPage, BlockSummary, ChainStatus, Coin, Envelope, Mode,
    NetworkOverview, PageInfo, SearchResult, TransferReceipt, TxInfo, ValidatorInfo, ValidatorSet,
};
