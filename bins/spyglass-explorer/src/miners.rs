//! Miner registry and the mining simulation.
//!
//! Miners are registry records tied to users; "mining" rolls against a
//! hash-rate-derived probability and, on success, advances the miner's
//! totals. The chain itself is never asked to mine, only consulted for
//! the height a simulated block would land at.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

use spyglass_chain::{ChainError, Mode};

use crate::AppState;
use crate::routes::ApiResult;
use crate::users::{self, User};

const DEFAULT_HASH_RATE: u64 = 1_000_000;
const DEFAULT_REWARD: u64 = 10;
const PROBABILITY_DIVISOR: f64 = 10_000_000.0;
const PROBABILITY_CEILING: f64 = 0.8;
const HISTORY_INTERVAL_MS: i64 = 6_000;
const HISTORY_DEFAULT_LIMIT: u64 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MinerStatus {
    Active,
    Inactive,
    Maintenance,
}

impl MinerStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            "maintenance" => Some(Self::Maintenance),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Maintenance => "maintenance",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinerStatistics {
    pub blocks_today: u64,
    pub rewards_today: u64,
    /// Seconds per block averaged over the miner's lifetime.
    pub average_block_time: u64,
    pub efficiency: u64,
}

impl Default for MinerStatistics {
    fn default() -> Self {
        Self { blocks_today: 0, rewards_today: 0, average_block_time: 0, efficiency: 100 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Miner {
    pub id: String,
    pub user_id: String,
    pub address: String,
    pub name: String,
    pub hash_rate: u64,
    pub status: MinerStatus,
    pub total_blocks: u64,
    pub total_rewards: u64,
    pub last_block_time: Option<String>,
    pub registered_at: String,
    pub updated_at: String,
    pub statistics: MinerStatistics,
}

impl Miner {
    fn register(user: &User, name: Option<String>, hash_rate: Option<u64>) -> Self {
        let now = Utc::now().to_rfc3339();
        Self {
            id: format!("miner_{}", user.id),
            user_id: user.id.clone(),
            address: user.address.clone(),
            name: name.unwrap_or_else(|| format!("{}-rig", user.name)),
            hash_rate: hash_rate.unwrap_or(DEFAULT_HASH_RATE),
            status: MinerStatus::Active,
            total_blocks: 0,
            total_rewards: 0,
            last_block_time: None,
            registered_at: now.clone(),
            updated_at: now,
            statistics: MinerStatistics::default(),
        }
    }

    /// Only an active miner rolls; any other status refuses the attempt.
    fn ensure_can_mine(&self) -> Result<(), ChainError> {
        match self.status {
            MinerStatus::Active => Ok(()),
            other => Err(ChainError::invalid("status", format!("miner is {}", other.as_str()))),
        }
    }

    /// Credit one mined block: totals, daily stats and the lifetime
    /// average block time, which only becomes meaningful from the
    /// second block on.
    fn record_block(&mut self, reward: u64, now: DateTime<Utc>) {
        self.total_blocks += 1;
        self.total_rewards += reward;
        self.last_block_time = Some(now.to_rfc3339());
        self.statistics.blocks_today += 1;
        self.statistics.rewards_today += reward;
        if self.total_blocks > 1 {
            if let Ok(registered) = DateTime::parse_from_rfc3339(&self.registered_at) {
                let elapsed = now.signed_duration_since(registered).num_seconds().max(0) as u64;
                self.statistics.average_block_time = elapsed / self.total_blocks;
            }
        }
        self.updated_at = now.to_rfc3339();
    }
}

/// Chance a single attempt succeeds, linear in hash rate and capped so
/// even absurd rigs fail sometimes.
fn success_probability(hash_rate: u64) -> f64 {
    (hash_rate as f64 / PROBABILITY_DIVISOR).min(PROBABILITY_CEILING)
}

fn find_miner(miners: &[Miner], id: &str) -> Result<Miner, ChainError> {
    miners
        .iter()
        .find(|m| m.id == id)
        .cloned()
        .ok_or_else(|| ChainError::NotFound(format!("miner {id}")))
}

/// Synthetic per-miner block history, newest first. The registry only
/// keeps totals, so individual entries are invented on demand with
/// heights and timestamps that stay mutually consistent.
fn synth_history(miner: &Miner, limit: u64) -> Vec<Value> {
    let count = miner.total_blocks.min(limit);
    let base = 1_000 + miner.total_blocks.saturating_sub(1);
    let now = Utc::now();
    (0..count)
        .map(|k| {
            let at = now - Duration::milliseconds(k as i64 * HISTORY_INTERVAL_MS);
            json!({
                "blockHeight": base - k,
                "timestamp": at.to_rfc3339(),
                "reward": DEFAULT_REWARD,
                "gasRewards": rand::random::<f64>() * 0.5,
                "difficulty": 1_000_000.0 + rand::random::<f64>() * 100_000.0,
            })
        })
        .collect()
}

// ── handlers ──

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub user_id: String,
    pub miner_name: Option<String>,
    pub hash_rate: Option<u64>,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<Value> {
    let user = users::find_user(&state.users.load(), &req.user_id)?;
    let miner = Miner::register(&user, req.miner_name, req.hash_rate);
    let inserted = state.miners.update(|miners| {
        if miners.iter().any(|m| m.user_id == user.id) {
            false
        } else {
            miners.push(miner.clone());
            true
        }
    })?;
    if !inserted {
        return Err(ChainError::invalid(
            "userId",
            "a miner is already registered for this user",
        )
        .into());
    }

    info!(id = %miner.id, user = %user.id, hash_rate = miner.hash_rate, "miner registered");
    Ok(Json(json!({"success": true, "miner": miner})))
}

pub async fn list(State(state): State<AppState>) -> ApiResult<Value> {
    let miners = state.miners.load();
    let block = state.dispatcher.block(None).await?;
    let active = miners.iter().filter(|m| m.status == MinerStatus::Active).count();
    Ok(Json(json!({
        "success": true,
        "miners": miners,
        "networkStats": {
            "currentHeight": block.payload.height.parse::<u64>().unwrap_or(0),
            "totalMiners": miners.len(),
            "activeMiners": active,
        },
        "mode": block.mode,
    })))
}

pub async fn detail(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    let miner = find_miner(&state.miners.load(), &id)?;
    Ok(Json(json!({"success": true, "miner": miner})))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MineRequest {
    pub block_reward: Option<u64>,
}

/// One mining attempt. A failed roll is a successful request: the
/// caller gets `success: false` and the odds, not an error.
pub async fn mine(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<MineRequest>, JsonRejection>,
) -> ApiResult<Value> {
    let reward = body.ok().and_then(|Json(req)| req.block_reward).unwrap_or(DEFAULT_REWARD);
    let miner = find_miner(&state.miners.load(), &id)?;
    miner.ensure_can_mine()?;

    let block = state.dispatcher.block(None).await?;
    let next_height = block.payload.height.parse::<u64>().unwrap_or(0) + 1;

    let probability = success_probability(miner.hash_rate);
    if rand::random::<f64>() >= probability {
        return Ok(Json(json!({
            "success": false,
            "message": "mining attempt failed",
            "probability": (probability * 100.0).round() as u64,
        })));
    }

    let now = Utc::now();
    let mined = state
        .miners
        .update(|miners| {
            miners.iter_mut().find(|m| m.id == id).map(|m| {
                m.record_block(reward, now);
                m.clone()
            })
        })?
        .ok_or_else(|| ChainError::NotFound(format!("miner {id}")))?;

    info!(id = %mined.id, height = next_height, reward, "block mined");
    Ok(Json(json!({
        "success": true,
        "miningResult": {
            "blockHeight": next_height,
            "reward": reward,
            "timestamp": now.to_rfc3339(),
            "mode": block.mode,
            "miner": {
                "id": mined.id,
                "name": mined.name,
                "address": mined.address,
                "totalBlocks": mined.total_blocks,
                "totalRewards": mined.total_rewards,
            },
        },
        "message": "block mined",
    })))
}

#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

pub async fn set_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<StatusRequest>,
) -> ApiResult<Value> {
    let status = MinerStatus::parse(&req.status).ok_or_else(|| {
        ChainError::invalid("status", "must be one of active, inactive, maintenance")
    })?;
    let updated = state
        .miners
        .update(|miners| {
            miners.iter_mut().find(|m| m.id == id).map(|m| {
                m.status = status;
                m.updated_at = Utc::now().to_rfc3339();
                m.clone()
            })
        })?
        .ok_or_else(|| ChainError::NotFound(format!("miner {id}")))?;

    info!(id = %updated.id, status = status.as_str(), "miner status changed");
    Ok(Json(json!({"success": true, "miner": updated})))
}

pub async fn overview(State(state): State<AppState>) -> ApiResult<Value> {
    let miners = state.miners.load();
    let (status, block) = tokio::join!(state.dispatcher.status(), state.dispatcher.block(None));
    let status = status?;
    let block = block?;

    let total_miners = miners.len();
    let active_miners = miners.iter().filter(|m| m.status == MinerStatus::Active).count();
    let total_blocks: u64 = miners.iter().map(|m| m.total_blocks).sum();
    let total_rewards: u64 = miners.iter().map(|m| m.total_rewards).sum();
    let average_hash_rate = if total_miners > 0 {
        miners.iter().map(|m| m.hash_rate as f64).sum::<f64>() / total_miners as f64
    } else {
        0.0
    };

    let mut ranked = miners.clone();
    ranked.sort_by(|a, b| b.total_blocks.cmp(&a.total_blocks));
    let top_miners: Vec<Value> = ranked
        .iter()
        .take(5)
        .map(|m| {
            json!({
                "name": m.name,
                "address": m.address,
                "totalBlocks": m.total_blocks,
                "totalRewards": m.total_rewards,
                "hashRate": m.hash_rate,
            })
        })
        .collect();

    let mode = if status.mode == Mode::Real && block.mode == Mode::Real {
        Mode::Real
    } else {
        Mode::Mock
    };
    Ok(Json(json!({
        "success": true,
        "stats": {
            "network": {
                "currentHeight": block.payload.height.parse::<u64>().unwrap_or(0),
                "chainId": status.payload.network,
                "latestBlockTime": status.payload.latest_block_time,
            },
            "mining": {
                "totalMiners": total_miners,
                "activeMiners": active_miners,
                "totalBlocks": total_blocks,
                "totalRewards": total_rewards,
                "averageHashRate": average_hash_rate,
            },
            "topMiners": top_miners,
        },
        "mode": mode,
    })))
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<u64>,
}

pub async fn history(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Value> {
    let limit = query.limit.unwrap_or(HISTORY_DEFAULT_LIMIT);
    let miner = find_miner(&state.miners.load(), &id)?;
    let blocks = synth_history(&miner, limit);
    Ok(Json(json!({
        "success": true,
        "minerId": miner.id,
        "minerName": miner.name,
        "blocks": blocks,
        "totalBlocks": miner.total_blocks,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user() -> User {
        User {
            id: "aabbccdd00112233".into(),
            name: "alice".into(),
            address: "cosmos1qqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqq".into(),
            public_key: "00".repeat(32),
            created_at: "2026-01-01T00:00:00+00:00".into(),
        }
    }

    fn test_miner() -> Miner {
        Miner::register(&test_user(), None, None)
    }

    // --- probability ---

    #[test]
    fn probability_is_linear_in_hash_rate() {
        assert_eq!(success_probability(1_000_000), 0.1);
        assert_eq!(success_probability(5_000_000), 0.5);
    }

    #[test]
    fn probability_is_capped() {
        assert_eq!(success_probability(8_000_000), 0.8);
        assert_eq!(success_probability(u64::MAX), 0.8);
    }

    // --- status ---

    #[test]
    fn status_parses_its_own_names() {
        for status in [MinerStatus::Active, MinerStatus::Inactive, MinerStatus::Maintenance] {
            assert_eq!(MinerStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(MinerStatus::parse("retired"), None);
        assert_eq!(MinerStatus::parse("Active"), None);
    }

    #[test]
    fn only_active_miners_may_mine() {
        let mut miner = test_miner();
        assert!(miner.ensure_can_mine().is_ok());

        miner.status = MinerStatus::Inactive;
        let err = miner.ensure_can_mine().err().unwrap();
        assert!(matches!(err, ChainError::Validation { field: "status", .. }), "got {err}");

        miner.status = MinerStatus::Maintenance;
        assert!(miner.ensure_can_mine().is_err());
    }

    // --- registration ---

    #[test]
    fn registration_defaults() {
        let miner = test_miner();
        assert_eq!(miner.id, "miner_aabbccdd00112233");
        assert_eq!(miner.user_id, "aabbccdd00112233");
        assert_eq!(miner.name, "alice-rig");
        assert_eq!(miner.hash_rate, DEFAULT_HASH_RATE);
        assert_eq!(miner.status, MinerStatus::Active);
        assert_eq!(miner.total_blocks, 0);
        assert_eq!(miner.last_block_time, None);
        assert_eq!(miner.statistics, MinerStatistics::default());
        assert_eq!(miner.statistics.efficiency, 100);
    }

    #[test]
    fn registration_honors_explicit_fields() {
        let miner = Miner::register(&test_user(), Some("deep-rig".into()), Some(7_500_000));
        assert_eq!(miner.name, "deep-rig");
        assert_eq!(miner.hash_rate, 7_500_000);
    }

    // --- mined blocks ---

    #[test]
    fn first_block_leaves_the_average_alone() {
        let mut miner = test_miner();
        miner.registered_at = "2026-01-01T00:00:00+00:00".into();
        let now = DateTime::parse_from_rfc3339("2026-01-01T00:00:30+00:00").unwrap().to_utc();

        miner.record_block(10, now);
        assert_eq!(miner.total_blocks, 1);
        assert_eq!(miner.total_rewards, 10);
        assert_eq!(miner.statistics.blocks_today, 1);
        assert_eq!(miner.statistics.rewards_today, 10);
        assert_eq!(miner.statistics.average_block_time, 0);
        assert_eq!(miner.last_block_time.as_deref(), Some(now.to_rfc3339().as_str()));
    }

    #[test]
    fn average_block_time_spreads_lifetime_over_blocks() {
        let mut miner = test_miner();
        miner.registered_at = "2026-01-01T00:00:00+00:00".into();
        let t1 = DateTime::parse_from_rfc3339("2026-01-01T00:00:10+00:00").unwrap().to_utc();
        let t2 = DateTime::parse_from_rfc3339("2026-01-01T00:00:30+00:00").unwrap().to_utc();

        miner.record_block(10, t1);
        miner.record_block(25, t2);
        assert_eq!(miner.total_blocks, 2);
        assert_eq!(miner.total_rewards, 35);
        // 30 elapsed seconds over 2 blocks
        assert_eq!(miner.statistics.average_block_time, 15);
    }

    // --- history ---

    #[test]
    fn history_is_descending_and_consistent() {
        let mut miner = test_miner();
        miner.total_blocks = 7;

        let blocks = synth_history(&miner, 3);
        assert_eq!(blocks.len(), 3);
        let heights: Vec<u64> =
            blocks.iter().map(|b| b["blockHeight"].as_u64().unwrap()).collect();
        assert_eq!(heights, vec![1006, 1005, 1004]);

        let times: Vec<&str> = blocks.iter().map(|b| b["timestamp"].as_str().unwrap()).collect();
        assert!(times.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn history_never_exceeds_the_mined_total() {
        let mut miner = test_miner();
        miner.total_blocks = 2;
        assert_eq!(synth_history(&miner, 20).len(), 2);

        miner.total_blocks = 0;
        assert!(synth_history(&miner, 20).is_empty());
    }
}
