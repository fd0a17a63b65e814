//! Total normalization of raw node responses.
//!
//! One function per entity, each taking an arbitrarily-incomplete
//! [`Value`] and producing the canonical record with every field
//! populated from the raw data or its documented default. Nothing here
//! returns an error: missing structure means missing leaves, and a leaf
//! the upstream omitted (or sent as an empty string) takes its default.
//! Heights and gas values are accepted as JSON strings or numbers, since
//! nodes disagree on which they send.

use chrono::Utc;
use serde_json::{json, Value};

use crate::types::{
    BlockDetail, BlockSummary, ChainStatus, Coin, TransferReceipt, TxInfo, ValidatorInfo,
    ValidatorSet,
};

/// Leaf text: non-empty string passes through, numbers are stringified,
/// everything else takes the default.
fn text(v: &Value, default: &str) -> String {
    match v {
        Value::String(s) if !s.is_empty() => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => default.to_string(),
    }
}

/// Leaf counter: number, or numeric string, or the default.
fn count(v: &Value, default: u64) -> u64 {
    match v {
        Value::Number(n) => n.as_u64().unwrap_or(default),
        Value::String(s) => s.parse().unwrap_or(default),
        _ => default,
    }
}

fn flag(v: &Value, default: bool) -> bool {
    v.as_bool().unwrap_or(default)
}

fn object_or_empty(v: &Value) -> Value {
    if v.is_object() { v.clone() } else { json!({}) }
}

fn array_or_empty(v: &Value) -> Value {
    if v.is_array() { v.clone() } else { json!([]) }
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

/// Flatten a raw `status` response. `chain_id` is the configured chain
/// identifier, used when the node does not report its network name.
pub fn status(raw: &Value, chain_id: &str) -> ChainStatus {
    let node = &raw["node_info"];
    let sync = &raw["sync_info"];
    let validator = &raw["validator_info"];

    ChainStatus {
        network: text(&node["network"], chain_id),
        node_version: text(&node["version"], "unknown"),
        moniker: text(&node["moniker"], "unknown"),
        node_id: text(&node["id"], "unknown"),
        latest_block_hash: text(&sync["latest_block_hash"], ""),
        latest_block_height: text(&sync["latest_block_height"], "0"),
        latest_block_time: text(&sync["latest_block_time"], &now_rfc3339()),
        catching_up: flag(&sync["catching_up"], false),
        validator_address: text(&validator["address"], ""),
        voting_power: text(&validator["voting_power"], "0"),
    }
}

/// Full block record from a raw `block` response. `fallback_height` is
/// the height the caller asked for, echoed back when the response does
/// not carry one.
pub fn block_detail(raw: &Value, fallback_height: Option<u64>) -> BlockDetail {
    let header = &raw["block"]["header"];
    let fallback = fallback_height.map(|h| h.to_string()).unwrap_or_else(|| "0".to_string());

    let transactions: Vec<String> = raw["block"]["data"]["txs"]
        .as_array()
        .map(|txs| txs.iter().filter_map(|t| t.as_str().map(str::to_owned)).collect())
        .unwrap_or_default();

    BlockDetail {
        height: text(&header["height"], &fallback),
        hash: text(&raw["block_id"]["hash"], ""),
        time: text(&header["time"], &now_rfc3339()),
        proposer_address: text(&header["proposer_address"], ""),
        transaction_count: transactions.len() as u64,
        transactions,
        previous_block_hash: text(&header["last_block_id"]["hash"], ""),
        evidence: object_or_empty(&raw["block"]["evidence"]),
        last_commit: object_or_empty(&raw["block"]["last_commit"]),
    }
}

/// List-row view of the same raw `block` response.
pub fn block_summary(raw: &Value) -> BlockSummary {
    let header = &raw["block"]["header"];
    let tx_count = raw["block"]["data"]["txs"].as_array().map(|t| t.len() as u64).unwrap_or(0);

    BlockSummary {
        height: text(&header["height"], "0"),
        hash: text(&raw["block_id"]["hash"], ""),
        time: text(&header["time"], &now_rfc3339()),
        proposer_address: text(&header["proposer_address"], ""),
        transaction_count: tx_count,
    }
}

/// Validator set from a raw `validators` response.
pub fn validator_set(raw: &Value) -> ValidatorSet {
    let validators: Vec<ValidatorInfo> = raw["validators"]
        .as_array()
        .map(|vals| vals.iter().map(validator_info).collect())
        .unwrap_or_default();

    ValidatorSet {
        total: count(&raw["total"], validators.len() as u64),
        block_height: text(&raw["block_height"], "0"),
        validators,
    }
}

fn validator_info(raw: &Value) -> ValidatorInfo {
    // pub_key arrives either as a bare string or as {type, value}.
    let public_key = match &raw["pub_key"] {
        Value::String(s) => s.clone(),
        other => text(&other["value"], ""),
    };

    ValidatorInfo {
        address: text(&raw["address"], ""),
        public_key,
        voting_power: text(&raw["voting_power"], "0"),
        proposer_priority: text(&raw["proposer_priority"], "0"),
    }
}

/// Single balance. `fallback_denom` is the denom the caller asked for.
pub fn coin(raw: &Value, fallback_denom: &str) -> Coin {
    Coin {
        denom: text(&raw["denom"], fallback_denom),
        amount: text(&raw["amount"], "0"),
    }
}

/// All balances of an account, from either a bare array or a
/// `{balances: [...]}` wrapper.
pub fn coins(raw: &Value) -> Vec<Coin> {
    let entries = if raw.is_array() { raw } else { &raw["balances"] };
    entries
        .as_array()
        .map(|list| list.iter().map(|c| coin(c, "")).collect())
        .unwrap_or_default()
}

/// Normalized transaction record from a raw `tx` response.
pub fn tx_info(raw: &Value) -> TxInfo {
    let result = &raw["tx_result"];

    TxInfo {
        hash: text(&raw["hash"], ""),
        height: text(&raw["height"], "0"),
        timestamp: text(&raw["timestamp"], &now_rfc3339()),
        gas_used: text(&result["gas_used"], "0"),
        gas_wanted: text(&result["gas_wanted"], "0"),
        memo: text(&raw["memo"], ""),
        raw_log: text(&result["log"], ""),
        events: array_or_empty(&result["events"]),
    }
}

/// Receipt for a broadcast transfer. Unlike reads, a broadcast response
/// with no transaction hash is not patched over with a default: `None`
/// tells the caller the write cannot be confirmed.
pub fn receipt(raw: &Value) -> Option<TransferReceipt> {
    let transaction_hash = match &raw["hash"] {
        Value::String(s) if !s.is_empty() => s.clone(),
        _ => return None,
    };

    Some(TransferReceipt {
        transaction_hash,
        height: text(&raw["height"], "0"),
        gas_used: text(&raw["gas_used"], "0"),
        gas_wanted: text(&raw["gas_wanted"], "0"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // --- status ---

    #[test]
    fn status_of_empty_object_is_all_defaults() {
        let s = status(&json!({}), "devnet-1");
        assert_eq!(s.network, "devnet-1");
        assert_eq!(s.node_version, "unknown");
        assert_eq!(s.moniker, "unknown");
        assert_eq!(s.node_id, "unknown");
        assert_eq!(s.latest_block_hash, "");
        assert_eq!(s.latest_block_height, "0");
        assert!(!s.latest_block_time.is_empty());
        assert!(!s.catching_up);
        assert_eq!(s.validator_address, "");
        assert_eq!(s.voting_power, "0");
    }

    #[test]
    fn status_extracts_nested_fields() {
        let raw = json!({
            "node_info": {"network": "gaia-9", "version": "0.38.1", "moniker": "alpha", "id": "ab12"},
            "sync_info": {
                "latest_block_hash": "DEADBEEF",
                "latest_block_height": "4242",
                "latest_block_time": "2026-03-01T10:00:00Z",
                "catching_up": true
            },
            "validator_info": {"address": "F00D", "voting_power": "999"}
        });
        let s = status(&raw, "devnet-1");
        assert_eq!(s.network, "gaia-9");
        assert_eq!(s.latest_block_height, "4242");
        assert!(s.catching_up);
        assert_eq!(s.voting_power, "999");
    }

    #[test]
    fn status_accepts_numeric_height() {
        let raw = json!({"sync_info": {"latest_block_height": 77}});
        assert_eq!(status(&raw, "x").latest_block_height, "77");
    }

    #[test]
    fn status_treats_empty_strings_as_absent() {
        let raw = json!({"node_info": {"network": ""}, "sync_info": {"latest_block_height": ""}});
        let s = status(&raw, "devnet-1");
        assert_eq!(s.network, "devnet-1");
        assert_eq!(s.latest_block_height, "0");
    }

    // --- blocks ---

    #[test]
    fn block_detail_of_empty_object_echoes_requested_height() {
        let b = block_detail(&json!({}), Some(31));
        assert_eq!(b.height, "31");
        assert_eq!(b.hash, "");
        assert_eq!(b.transaction_count, 0);
        assert!(b.transactions.is_empty());
        assert_eq!(b.evidence, json!({}));
        assert_eq!(b.last_commit, json!({}));
    }

    #[test]
    fn block_detail_without_fallback_defaults_to_zero() {
        assert_eq!(block_detail(&json!({}), None).height, "0");
    }

    #[test]
    fn block_detail_count_matches_transactions() {
        let raw = json!({
            "block_id": {"hash": "AA"},
            "block": {
                "header": {"height": "9", "time": "t", "proposer_address": "p",
                           "last_block_id": {"hash": "BB"}},
                "data": {"txs": ["enc1", "enc2", 42, "enc3"]}
            }
        });
        let b = block_detail(&raw, None);
        // Non-string entries are dropped; the count follows what was kept.
        assert_eq!(b.transactions, vec!["enc1", "enc2", "enc3"]);
        assert_eq!(b.transaction_count, 3);
        assert_eq!(b.previous_block_hash, "BB");
    }

    #[test]
    fn block_summary_counts_without_copying_txs() {
        let raw = json!({"block": {"data": {"txs": ["a", "b"]}, "header": {"height": 5}}});
        let s = block_summary(&raw);
        assert_eq!(s.height, "5");
        assert_eq!(s.transaction_count, 2);
    }

    // --- validators ---

    #[test]
    fn validator_set_of_empty_object() {
        let v = validator_set(&json!({}));
        assert!(v.validators.is_empty());
        assert_eq!(v.total, 0);
        assert_eq!(v.block_height, "0");
    }

    #[test]
    fn validator_pub_key_both_shapes() {
        let raw = json!({
            "block_height": 12,
            "validators": [
                {"address": "A", "pub_key": "PK-PLAIN", "voting_power": 10},
                {"address": "B", "pub_key": {"type": "ed25519", "value": "PK-NESTED"}}
            ]
        });
        let v = validator_set(&raw);
        assert_eq!(v.validators[0].public_key, "PK-PLAIN");
        assert_eq!(v.validators[0].voting_power, "10");
        assert_eq!(v.validators[1].public_key, "PK-NESTED");
        assert_eq!(v.validators[1].voting_power, "0");
        assert_eq!(v.total, 2);
        assert_eq!(v.block_height, "12");
    }

    // --- balances ---

    #[test]
    fn coin_defaults() {
        let c = coin(&json!({}), "stake");
        assert_eq!(c.denom, "stake");
        assert_eq!(c.amount, "0");
    }

    #[test]
    fn coins_accepts_bare_array_and_wrapper() {
        let bare = json!([{"denom": "stake", "amount": "7"}]);
        let wrapped = json!({"balances": [{"denom": "stake", "amount": "7"}]});
        assert_eq!(coins(&bare), coins(&wrapped));
        assert_eq!(coins(&bare)[0].amount, "7");
        assert!(coins(&json!({})).is_empty());
    }

    // --- transactions ---

    #[test]
    fn tx_info_pulls_gas_from_result() {
        let raw = json!({
            "hash": "FFAA",
            "height": 90,
            "tx_result": {"gas_used": "51234", "gas_wanted": 60000, "log": "ok",
                          "events": [{"type": "transfer"}]}
        });
        let t = tx_info(&raw);
        assert_eq!(t.hash, "FFAA");
        assert_eq!(t.height, "90");
        assert_eq!(t.gas_used, "51234");
        assert_eq!(t.gas_wanted, "60000");
        assert_eq!(t.raw_log, "ok");
        assert_eq!(t.events, json!([{"type": "transfer"}]));
    }

    #[test]
    fn tx_info_of_empty_object() {
        let t = tx_info(&json!({}));
        assert_eq!(t.hash, "");
        assert_eq!(t.height, "0");
        assert_eq!(t.events, json!([]));
    }

    // --- receipts ---

    #[test]
    fn receipt_requires_a_hash() {
        assert!(receipt(&json!({})).is_none());
        assert!(receipt(&json!({"hash": ""})).is_none());
        assert!(receipt(&json!({"hash": 42})).is_none());
    }

    #[test]
    fn receipt_carries_gas_and_height() {
        let raw = json!({"hash": "C0FFEE", "height": 12, "gas_used": "800", "gas_wanted": 1000});
        let r = receipt(&raw).unwrap();
        assert_eq!(r.transaction_hash, "C0FFEE");
        assert_eq!(r.height, "12");
        assert_eq!(r.gas_used, "800");
        assert_eq!(r.gas_wanted, "1000");
    }

    // --- proptest: totality over arbitrary JSON ---

    fn arb_json() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i32>().prop_map(|n| json!(n)),
            "[a-zA-Z0-9]{0,12}".prop_map(Value::String),
        ];
        leaf.prop_recursive(4, 32, 6, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..5).prop_map(Value::Array),
                prop::collection::vec(("[a-z_]{1,16}", inner), 0..5)
                    .prop_map(|kv| Value::Object(kv.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn status_is_total(raw in arb_json()) {
            let s = status(&raw, "devnet-1");
            prop_assert!(!s.network.is_empty());
            prop_assert!(!s.node_version.is_empty());
            prop_assert!(!s.latest_block_height.is_empty());
            prop_assert!(!s.latest_block_time.is_empty());
            prop_assert!(!s.voting_power.is_empty());
        }

        #[test]
        fn block_detail_is_total(raw in arb_json(), height in proptest::option::of(1u64..1_000_000)) {
            let b = block_detail(&raw, height);
            prop_assert!(!b.height.is_empty());
            prop_assert_eq!(b.transaction_count, b.transactions.len() as u64);
            prop_assert!(b.evidence.is_object());
            prop_assert!(b.last_commit.is_object());
        }

        #[test]
        fn validator_set_is_total(raw in arb_json()) {
            let v = validator_set(&raw);
            prop_assert!(!v.block_height.is_empty());
            for info in &v.validators {
                prop_assert!(!info.voting_power.is_empty());
                prop_assert!(!info.proposer_priority.is_empty());
            }
        }

        #[test]
        fn tx_info_is_total(raw in arb_json()) {
            let t = tx_info(&raw);
            prop_assert!(!t.height.is_empty());
            prop_assert!(!t.gas_used.is_empty());
            prop_assert!(t.events.is_array());
        }
    }
}
