//! Request dispatch, the single place where real and synthetic data meet.
//!
//! Every read follows one policy. Not connected: serve synthetic data
//! immediately, marked mock. Connected: query the node, normalize the
//! response, mark it real; a transient failure degrades to the same
//! synthetic fallback instead of erroring. Invalid input and missing
//! entities propagate as errors in either mode. Writes never degrade:
//! without a live connection they fail loudly, since a fabricated
//! transfer receipt cannot be made safe.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ChainError;
use crate::manager::{ConnectionManager, ConnectionState};
use crate::normalize;
use crate::rpc::ChainHandle;
use crate::synthetic;
use crate::types::{
    AddressInfo, BlockDetail, BlockPage, BlockSummary, ChainStatus, Coin, Envelope,
    NetworkOverview, PageInfo, SearchResult, TransferReceipt, TxInfo, ValidatorSet,
};

/// Hard cap on rows per block or transaction page.
pub const MAX_PAGE_LIMIT: u64 = 50;
/// Page size used when the caller passes zero.
pub const DEFAULT_PAGE_LIMIT: u64 = 10;

const MINT_MEMO: &str = "Token mint";

/// Chain reads and writes routed through one [`ConnectionManager`].
#[derive(Clone)]
pub struct Dispatcher {
    manager: Arc<ConnectionManager>,
}

fn is_tx_hash(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

fn parsed_height(tx: &TxInfo) -> u64 {
    tx.height.parse().unwrap_or(0)
}

/// Row standing in for a block the node failed to return mid-page.
fn unavailable_row(height: u64) -> BlockSummary {
    BlockSummary {
        height: height.to_string(),
        hash: "unavailable".to_string(),
        time: Utc::now().to_rfc3339(),
        proposer_address: "unknown".to_string(),
        transaction_count: 0,
    }
}

/// Close out a read: real data on success, the synthetic fallback on a
/// transient failure, the error itself otherwise.
fn finish_read<T>(
    what: &str,
    outcome: Result<T, ChainError>,
    fallback: impl FnOnce() -> T,
) -> Result<Envelope<T>, ChainError> {
    match outcome {
        Ok(payload) => Ok(Envelope::real(payload)),
        Err(e) if e.is_transient() => {
            warn!(error = %e, "{what} failed; serving synthetic data");
            Ok(Envelope::mock(fallback()))
        }
        Err(e) => Err(e),
    }
}

async fn search_address_txs(
    handle: &ChainHandle,
    address: &str,
    limit: usize,
) -> Result<Vec<TxInfo>, ChainError> {
    let sent = handle.query.tx_search("message.sender", address).await?;
    let received = handle.query.tx_search("transfer.recipient", address).await?;

    let mut txs: Vec<TxInfo> = Vec::new();
    for raw in [&sent, &received] {
        if let Some(list) = raw["txs"].as_array() {
            txs.extend(list.iter().map(normalize::tx_info));
        }
    }

    // Newest first; a transfer to self shows up in both result sets, so
    // the tie-break on hash lines duplicates up for dedup.
    txs.sort_by(|a, b| parsed_height(b).cmp(&parsed_height(a)).then_with(|| a.hash.cmp(&b.hash)));
    txs.dedup_by(|a, b| a.hash == b.hash);
    txs.truncate(limit);
    Ok(txs)
}

async fn recent_txs(handle: &ChainHandle, limit: usize) -> Result<Vec<TxInfo>, ChainError> {
    let raw = handle.query.recent_txs().await?;
    let mut txs: Vec<TxInfo> = raw["txs"]
        .as_array()
        .map(|list| list.iter().map(normalize::tx_info).collect())
        .unwrap_or_default();
    txs.sort_by(|a, b| parsed_height(b).cmp(&parsed_height(a)));
    txs.truncate(limit);
    Ok(txs)
}

impl Dispatcher {
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &Arc<ConnectionManager> {
        &self.manager
    }

    /// The handle, but only while the link is actually Connected. A
    /// Connecting or Disconnected link serves synthetic data rather
    /// than racing the attempt in flight.
    fn connected_handle(&self) -> Option<Arc<ChainHandle>> {
        if self.manager.state() == ConnectionState::Connected {
            self.manager.handle()
        } else {
            None
        }
    }

    // ── reads ──

    pub async fn status(&self) -> Result<Envelope<ChainStatus>, ChainError> {
        let chain_id = &self.manager.config().chain_id;
        let Some(handle) = self.connected_handle() else {
            return Ok(Envelope::mock(synthetic::status(chain_id)));
        };
        let outcome = handle.status.status().await.map(|raw| normalize::status(&raw, chain_id));
        finish_read("status", outcome, || synthetic::status(chain_id))
    }

    /// One block, by height or the latest when `height` is `None`.
    pub async fn block(&self, height: Option<u64>) -> Result<Envelope<BlockDetail>, ChainError> {
        if height == Some(0) {
            return Err(ChainError::invalid("height", "must be a positive integer"));
        }
        let Some(handle) = self.connected_handle() else {
            return Ok(Envelope::mock(synthetic::block(height)));
        };
        let outcome =
            handle.status.block(height).await.map(|raw| normalize::block_detail(&raw, height));
        finish_read("block", outcome, || synthetic::block(height))
    }

    /// Descending page of recent blocks. `offset` counts back from the
    /// chain tip; a zero `limit` means [`DEFAULT_PAGE_LIMIT`].
    pub async fn blocks(&self, limit: u64, offset: u64) -> Result<Envelope<BlockPage>, ChainError> {
        let limit = match limit {
            0 => DEFAULT_PAGE_LIMIT,
            n => n.min(MAX_PAGE_LIMIT),
        };
        let Some(handle) = self.connected_handle() else {
            return Ok(Envelope::mock(synthetic::block_page(limit, offset)));
        };
        let outcome = self.fetch_page(&handle, limit, offset).await;
        finish_read("block list", outcome, || synthetic::block_page(limit, offset))
    }

    async fn fetch_page(
        &self,
        handle: &ChainHandle,
        limit: u64,
        offset: u64,
    ) -> Result<BlockPage, ChainError> {
        let raw = handle.status.status().await?;
        let tip: u64 = normalize::status(&raw, &self.manager.config().chain_id)
            .latest_block_height
            .parse()
            .unwrap_or(0);

        let start = tip.saturating_sub(offset).max(1);
        let end = start.saturating_sub(limit - 1).max(1);

        // One fetch per row; a hole in the node's block store costs the
        // row, not the page.
        let mut blocks = Vec::with_capacity((start - end + 1) as usize);
        for height in (end..=start).rev() {
            match handle.status.block(Some(height)).await {
                Ok(raw) => blocks.push(normalize::block_summary(&raw)),
                Err(e) => {
                    debug!(height, error = %e, "block missing from page");
                    blocks.push(unavailable_row(height));
                }
            }
        }

        Ok(BlockPage {
            blocks,
            pagination: PageInfo { total: tip, limit, offset, has_more: end > 1 },
        })
    }

    pub async fn validators(
        &self,
        height: Option<u64>,
    ) -> Result<Envelope<ValidatorSet>, ChainError> {
        let Some(handle) = self.connected_handle() else {
            return Ok(Envelope::mock(synthetic::validators()));
        };
        let outcome =
            handle.status.validators(height).await.map(|raw| normalize::validator_set(&raw));
        finish_read("validators", outcome, synthetic::validators)
    }

    pub async fn balance(&self, address: &str, denom: &str) -> Result<Envelope<Coin>, ChainError> {
        if address.is_empty() {
            return Err(ChainError::invalid("address", "must not be empty"));
        }
        if denom.is_empty() {
            return Err(ChainError::invalid("denom", "must not be empty"));
        }
        let Some(handle) = self.connected_handle() else {
            return Ok(Envelope::mock(synthetic::balance(denom)));
        };
        let outcome =
            handle.query.balance(address, denom).await.map(|raw| normalize::coin(&raw, denom));
        finish_read("balance", outcome, || synthetic::balance(denom))
    }

    pub async fn all_balances(&self, address: &str) -> Result<Envelope<Vec<Coin>>, ChainError> {
        if address.is_empty() {
            return Err(ChainError::invalid("address", "must not be empty"));
        }
        let Some(handle) = self.connected_handle() else {
            return Ok(Envelope::mock(Vec::new()));
        };
        let outcome = handle.query.all_balances(address).await.map(|raw| normalize::coins(&raw));
        finish_read("balances", outcome, Vec::new)
    }

    /// One transaction by hash. There is no synthetic transaction store,
    /// so degraded lookups read as not found rather than fabricated.
    pub async fn transaction(&self, hash: &str) -> Result<Envelope<TxInfo>, ChainError> {
        if !is_tx_hash(hash) {
            return Err(ChainError::invalid("hash", "must be 64 hex characters"));
        }
        let Some(handle) = self.connected_handle() else {
            return Err(ChainError::NotFound(format!("transaction {hash}")));
        };
        match handle.query.tx(hash).await {
            Ok(Value::Null) => Err(ChainError::NotFound(format!("transaction {hash}"))),
            Ok(raw) => Ok(Envelope::real(normalize::tx_info(&raw))),
            Err(e) if e.is_transient() => {
                warn!(error = %e, "transaction lookup failed");
                Err(ChainError::NotFound(format!("transaction {hash}")))
            }
            Err(e) => Err(e),
        }
    }

    /// Transactions sent or received by `address`, newest first. An
    /// empty address asks the node for its most recent transactions
    /// instead.
    pub async fn transactions(
        &self,
        address: &str,
        limit: u64,
    ) -> Result<Envelope<Vec<TxInfo>>, ChainError> {
        let limit = match limit {
            0 => DEFAULT_PAGE_LIMIT,
            n => n.min(MAX_PAGE_LIMIT),
        } as usize;
        let Some(handle) = self.connected_handle() else {
            return Ok(Envelope::mock(Vec::new()));
        };
        let outcome = if address.is_empty() {
            recent_txs(&handle, limit).await
        } else {
            search_address_txs(&handle, address, limit).await
        };
        finish_read("transaction search", outcome, Vec::new)
    }

    pub async fn network(&self) -> Result<Envelope<NetworkOverview>, ChainError> {
        let chain_id = &self.manager.config().chain_id;
        let Some(handle) = self.connected_handle() else {
            return Ok(Envelope::mock(synthetic::network(chain_id)));
        };
        let outcome = self.fetch_network(&handle).await;
        finish_read("network overview", outcome, || synthetic::network(chain_id))
    }

    async fn fetch_network(&self, handle: &ChainHandle) -> Result<NetworkOverview, ChainError> {
        let (status_raw, validators_raw) =
            tokio::join!(handle.status.status(), handle.status.validators(None));
        let status = normalize::status(&status_raw?, &self.manager.config().chain_id);
        let validators = normalize::validator_set(&validators_raw?);

        let total_voting_power = validators
            .validators
            .iter()
            .map(|v| v.voting_power.parse::<u64>().unwrap_or(0))
            .sum();

        Ok(NetworkOverview {
            chain_id: status.network,
            latest_height: status.latest_block_height.parse().unwrap_or(0),
            latest_block_time: status.latest_block_time,
            validator_count: validators.total,
            total_voting_power,
            node_version: status.node_version,
            moniker: status.moniker,
            catching_up: status.catching_up,
        })
    }

    // ── search ──

    /// Interpret `query` as a block height, then a transaction hash,
    /// then an address, returning the first interpretation that yields
    /// data. An interpretation that comes back empty or not-found falls
    /// through to the next; any other error stops the search.
    pub async fn search(&self, query: &str) -> Result<Envelope<SearchResult>, ChainError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ChainError::invalid("query", "must not be empty"));
        }

        if let Ok(height) = query.parse::<u64>() {
            if height > 0 {
                match self.block(Some(height)).await {
                    Ok(env) => return Ok(env.map(|b| SearchResult::Block(b.into()))),
                    Err(ChainError::NotFound(_)) => {}
                    Err(e) => return Err(e),
                }
            }
        }

        if is_tx_hash(query) {
            match self.transaction(query).await {
                Ok(env) => return Ok(env.map(SearchResult::Transaction)),
                Err(ChainError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }

        // Anything long enough to be an account address is one exactly
        // when the node holds balances for it.
        if query.len() > 20 {
            match self.all_balances(query).await {
                Ok(env) if !env.payload.is_empty() => {
                    let address = query.to_string();
                    return Ok(
                        env.map(|balances| SearchResult::Address(AddressInfo { address, balances }))
                    );
                }
                Ok(_) => {}
                Err(ChainError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }

        Err(ChainError::NotFound(format!("no results for {query}")))
    }

    // ── writes ──

    /// Ask the node to sign and broadcast a transfer. No fallback on
    /// this path: every failure reaches the caller.
    pub async fn send_tokens(
        &self,
        from: &str,
        to: &str,
        amount: u64,
        denom: &str,
        memo: &str,
    ) -> Result<TransferReceipt, ChainError> {
        if from.is_empty() {
            return Err(ChainError::invalid("from", "must not be empty"));
        }
        if to.is_empty() {
            return Err(ChainError::invalid("to", "must not be empty"));
        }
        let prefix = &self.manager.config().address_prefix;
        if !to.starts_with(prefix.as_str()) {
            return Err(ChainError::invalid("to", format!("must start with {prefix}")));
        }
        if amount == 0 {
            return Err(ChainError::invalid("amount", "must be greater than zero"));
        }
        if denom.is_empty() {
            return Err(ChainError::invalid("denom", "must not be empty"));
        }

        let Some(handle) = self.connected_handle() else {
            return Err(ChainError::Connection("not connected to a node".to_string()));
        };

        let raw = handle.query.broadcast_transfer(from, to, amount, denom, memo).await?;
        normalize::receipt(&raw).ok_or_else(|| {
            ChainError::Rpc("broadcast response carried no transaction hash".to_string())
        })
    }

    /// A mint is a transfer from the minting account with a fixed memo.
    pub async fn mint_tokens(
        &self,
        from: &str,
        to: &str,
        amount: u64,
        denom: &str,
    ) -> Result<TransferReceipt, ChainError> {
        self.send_tokens(from, to, amount, denom, MINT_MEMO).await
    }
}
