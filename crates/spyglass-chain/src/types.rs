//! Canonical chain entities and the response envelope.
//!
//! These are the only shapes the rest of the system ever sees: every
//! field is guaranteed present, heights travel as integer-as-string
//! (the upstream convention), and JSON field names are camelCase to
//! match the public API. Raw node responses never leave
//! [`crate::normalize`] in any other form.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Provenance of a payload: fetched from the node or synthesized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Real,
    Mock,
}

/// Uniform response wrapper carrying payload plus provenance.
///
/// `mode` is [`Mode::Mock`] iff the payload came from the synthesizer;
/// a single envelope never mixes real and synthetic data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub payload: T,
    pub mode: Mode,
}

impl<T> Envelope<T> {
    /// Wrap data fetched from the live node.
    pub fn real(payload: T) -> Self {
        Self { success: true, payload, mode: Mode::Real }
    }

    /// Wrap synthesized data.
    pub fn mock(payload: T) -> Self {
        Self { success: true, payload, mode: Mode::Mock }
    }

    /// True when the payload was synthesized.
    pub fn is_mock(&self) -> bool {
        self.mode == Mode::Mock
    }

    /// Reshape the payload without touching provenance.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Envelope<U> {
        Envelope { success: self.success, payload: f(self.payload), mode: self.mode }
    }
}

/// Node status flattened into one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainStatus {
    pub network: String,
    pub node_version: String,
    pub moniker: String,
    pub node_id: String,
    pub latest_block_hash: String,
    /// Integer-as-string, `"0"` when unknown.
    pub latest_block_height: String,
    /// RFC 3339 timestamp.
    pub latest_block_time: String,
    pub catching_up: bool,
    pub validator_address: String,
    pub voting_power: String,
}

/// One row of a block list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockSummary {
    pub height: String,
    pub hash: String,
    pub time: String,
    pub proposer_address: String,
    pub transaction_count: u64,
}

/// A single block with its transaction payload.
///
/// `transaction_count` always equals `transactions.len()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockDetail {
    pub height: String,
    pub hash: String,
    pub time: String,
    pub proposer_address: String,
    pub transaction_count: u64,
    /// Raw encoded transactions as carried by the block.
    pub transactions: Vec<String>,
    pub previous_block_hash: String,
    pub evidence: Value,
    pub last_commit: Value,
}

impl From<BlockDetail> for BlockSummary {
    fn from(detail: BlockDetail) -> Self {
        Self {
            height: detail.height,
            hash: detail.hash,
            time: detail.time,
            proposer_address: detail.proposer_address,
            transaction_count: detail.transaction_count,
        }
    }
}

/// Paging metadata for block lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// Chain height at the time of the query.
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
    pub has_more: bool,
}

/// One page of descending block summaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockPage {
    pub blocks: Vec<BlockSummary>,
    pub pagination: PageInfo,
}

/// A validator as reported by the node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatorInfo {
    pub address: String,
    pub public_key: String,
    pub voting_power: String,
    pub proposer_priority: String,
}

/// Validator set at one height.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatorSet {
    pub validators: Vec<ValidatorInfo>,
    pub total: u64,
    pub block_height: String,
}

/// One balance entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    /// Integer-as-string, `"0"` when the account holds none.
    pub amount: String,
}

/// Normalized transaction record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxInfo {
    pub hash: String,
    pub height: String,
    pub timestamp: String,
    pub gas_used: String,
    pub gas_wanted: String,
    pub memo: String,
    pub raw_log: String,
    pub events: Value,
}

/// Result of a broadcast transfer. Never synthesized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferReceipt {
    pub transaction_hash: String,
    pub height: String,
    pub gas_used: String,
    pub gas_wanted: String,
}

/// Aggregate view over status and validator set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkOverview {
    pub chain_id: String,
    pub latest_height: u64,
    pub latest_block_time: String,
    pub validator_count: u64,
    pub total_voting_power: u64,
    pub node_version: String,
    pub moniker: String,
    pub catching_up: bool,
}

/// Balances attached to an address, as returned by a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressInfo {
    pub address: String,
    pub balances: Vec<Coin>,
}

/// What a search query resolved to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum SearchResult {
    Block(BlockSummary),
    Transaction(TxInfo),
    Address(AddressInfo),
}
