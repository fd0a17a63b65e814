//! User registry: locally generated dev-chain accounts.
//!
//! The node custodies all signing keys for dev accounts, so a user
//! record is pure metadata: an id, a display name and an address. No
//! key material ever touches the registry.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

use spyglass_chain::ChainError;

use crate::AppState;
use crate::routes::ApiResult;

const BECH32_CHARSET: &[u8] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";
const ADDRESS_BODY_LEN: usize = 38;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub address: String,
    pub public_key: String,
    pub created_at: String,
}

impl User {
    fn create(name: Option<String>, prefix: &str) -> Self {
        let id = new_id();
        let name = name.unwrap_or_else(|| format!("User_{}", &id[..8]));
        Self {
            id,
            name,
            address: generate_address(prefix),
            public_key: hex::encode(rand::random::<[u8; 32]>()),
            created_at: Utc::now().to_rfc3339(),
        }
    }
}

pub fn new_id() -> String {
    hex::encode(rand::random::<[u8; 8]>())
}

/// Fresh account address under `prefix`: bech32-shaped but without a
/// real checksum, which is all the dev node asks of an address.
pub fn generate_address(prefix: &str) -> String {
    let mut rng = rand::thread_rng();
    let body: String = (0..ADDRESS_BODY_LEN)
        .map(|_| BECH32_CHARSET[rng.gen_range(0..BECH32_CHARSET.len())] as char)
        .collect();
    format!("{prefix}1{body}")
}

pub fn find_user(users: &[User], id: &str) -> Result<User, ChainError> {
    users
        .iter()
        .find(|u| u.id == id)
        .cloned()
        .ok_or_else(|| ChainError::NotFound(format!("user {id}")))
}

// ── handlers ──

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub name: Option<String>,
}

pub async fn create(
    State(state): State<AppState>,
    body: Result<Json<CreateUserRequest>, JsonRejection>,
) -> ApiResult<Value> {
    // The body is optional; a bare POST creates a default-named user.
    let name = body.ok().and_then(|Json(req)| req.name);
    let prefix = state.dispatcher.manager().config().address_prefix.clone();
    let user = User::create(name, &prefix);
    state.users.update(|users| users.push(user.clone()))?;

    info!(id = %user.id, address = %user.address, "user created");
    Ok(Json(json!({"success": true, "user": user})))
}

pub async fn list(State(state): State<AppState>) -> ApiResult<Value> {
    let users = state.users.load();
    Ok(Json(json!({"success": true, "users": users})))
}

pub async fn detail(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    let user = find_user(&state.users.load(), &id)?;
    Ok(Json(json!({"success": true, "user": user})))
}

/// Balances of the user's on-chain account, with provenance.
pub async fn balance(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    let user = find_user(&state.users.load(), &id)?;
    let env = state.dispatcher.all_balances(&user.address).await?;
    Ok(Json(json!({
        "success": true,
        "address": user.address,
        "balances": env.payload,
        "mode": env.mode,
    })))
}

pub async fn by_address(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> ApiResult<Value> {
    let user = state
        .users
        .load()
        .into_iter()
        .find(|u| u.address == address)
        .ok_or_else(|| ChainError::NotFound(format!("user with address {address}")))?;
    Ok(Json(json!({"success": true, "user": user})))
}
