//! Token operations: transfers, minting and supply queries.
//!
//! Writes go through the dispatcher's no-fallback path, so a dead node
//! surfaces as an error here rather than a pretend receipt.

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use spyglass_chain::{ChainError, Mode};

use crate::AppState;
use crate::routes::ApiResult;
use crate::users;

const DEFAULT_DENOM: &str = "stake";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub from_user_id: String,
    pub to_address: String,
    pub amount: u64,
    pub denom: Option<String>,
    pub memo: Option<String>,
}

pub async fn transfer(
    State(state): State<AppState>,
    Json(req): Json<TransferRequest>,
) -> ApiResult<Value> {
    let user = users::find_user(&state.users.load(), &req.from_user_id)?;
    let denom = req.denom.unwrap_or_else(|| DEFAULT_DENOM.to_string());
    let memo = req.memo.unwrap_or_default();

    // Pre-flight the balance, but only veto on live data. A synthetic
    // zero says nothing about what the account actually holds.
    let balance = state.dispatcher.balance(&user.address, &denom).await?;
    if balance.mode == Mode::Real {
        let available = balance.payload.amount.parse::<u64>().unwrap_or(0);
        if available < req.amount {
            return Err(ChainError::invalid(
                "amount",
                format!(
                    "insufficient balance: {available} {denom} available, {} required",
                    req.amount
                ),
            )
            .into());
        }
    }

    let receipt = state
        .dispatcher
        .send_tokens(&user.address, &req.to_address, req.amount, &denom, &memo)
        .await?;

    info!(
        hash = %receipt.transaction_hash,
        from = %user.address,
        to = %req.to_address,
        amount = req.amount,
        %denom,
        "transfer broadcast"
    );
    Ok(Json(json!({
        "success": true,
        "transaction": {
            "hash": receipt.transaction_hash,
            "from": user.address,
            "to": req.to_address,
            "amount": req.amount,
            "denom": denom,
            "memo": memo,
            "height": receipt.height,
            "gasUsed": receipt.gas_used,
            "gasWanted": receipt.gas_wanted,
        },
    })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintRequest {
    pub minter_user_id: String,
    pub recipient_address: String,
    pub amount: u64,
    pub denom: Option<String>,
}

pub async fn mint(State(state): State<AppState>, Json(req): Json<MintRequest>) -> ApiResult<Value> {
    let minter = users::find_user(&state.users.load(), &req.minter_user_id)?;
    let denom = req.denom.unwrap_or_else(|| DEFAULT_DENOM.to_string());

    let receipt = state
        .dispatcher
        .mint_tokens(&minter.address, &req.recipient_address, req.amount, &denom)
        .await?;

    info!(
        hash = %receipt.transaction_hash,
        minter = %minter.address,
        recipient = %req.recipient_address,
        amount = req.amount,
        %denom,
        "mint broadcast"
    );
    Ok(Json(json!({
        "success": true,
        "transaction": {
            "hash": receipt.transaction_hash,
            "minter": minter.address,
            "recipient": req.recipient_address,
            "amount": req.amount,
            "denom": denom,
            "height": receipt.height,
            "gasUsed": receipt.gas_used,
            "gasWanted": receipt.gas_wanted,
        },
    })))
}

/// Supply and holder list for one denom, summed over registered users.
/// The result is marked mock as soon as any single balance was.
pub async fn info(State(state): State<AppState>, Path(denom): Path<String>) -> ApiResult<Value> {
    let users = state.users.load();
    let mut total_supply: u64 = 0;
    let mut holders: Vec<Value> = Vec::new();
    let mut mode = Mode::Real;

    for user in &users {
        let env = state.dispatcher.balance(&user.address, &denom).await?;
        if env.mode == Mode::Mock {
            mode = Mode::Mock;
        }
        let amount = env.payload.amount.parse::<u64>().unwrap_or(0);
        if amount > 0 {
            holders.push(json!({
                "address": user.address,
                "amount": amount,
                "denom": denom,
            }));
            total_supply += amount;
        }
    }

    Ok(Json(json!({
        "success": true,
        "tokenInfo": {
            "denom": denom,
            "totalSupply": total_supply,
            "holders": holders.len(),
            "balances": holders,
        },
        "mode": mode,
    })))
}

#[derive(Deserialize)]
pub struct TxQuery {
    pub address: Option<String>,
    pub limit: Option<u64>,
}

pub async fn transactions(
    State(state): State<AppState>,
    Query(query): Query<TxQuery>,
) -> ApiResult<Value> {
    let address = query.address.unwrap_or_default();
    let env = state
        .dispatcher
        .transactions(&address, query.limit.unwrap_or(0))
        .await?;
    Ok(Json(json!({
        "success": true,
        "transactions": env.payload,
        "mode": env.mode,
    })))
}

pub async fn transaction(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> ApiResult<Value> {
    let env = state.dispatcher.transaction(&hash).await?;
    Ok(Json(json!({
        "success": true,
        "transaction": env.payload,
        "mode": env.mode,
    })))
}
