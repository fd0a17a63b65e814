//! Chain read endpoints, each a thin veneer over the dispatcher. The
//! dispatcher's envelope already carries success and provenance, so
//! these serialize it as-is.

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;

use spyglass_chain::{
    BlockDetail, BlockPage, ChainStatus, Envelope, NetworkOverview, SearchResult, ValidatorSet,
};

use crate::AppState;
use crate::routes::ApiResult;

pub async fn status(State(state): State<AppState>) -> ApiResult<Envelope<ChainStatus>> {
    Ok(Json(state.dispatcher.status().await?))
}

#[derive(Deserialize)]
pub struct PageQuery {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

pub async fn blocks(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Envelope<BlockPage>> {
    let env = state
        .dispatcher
        .blocks(query.limit.unwrap_or(0), query.offset.unwrap_or(0))
        .await?;
    Ok(Json(env))
}

pub async fn latest_block(State(state): State<AppState>) -> ApiResult<Envelope<BlockDetail>> {
    Ok(Json(state.dispatcher.block(None).await?))
}

pub async fn block_by_height(
    State(state): State<AppState>,
    Path(height): Path<u64>,
) -> ApiResult<Envelope<BlockDetail>> {
    Ok(Json(state.dispatcher.block(Some(height)).await?))
}

#[derive(Deserialize)]
pub struct HeightQuery {
    pub height: Option<u64>,
}

pub async fn validators(
    State(state): State<AppState>,
    Query(query): Query<HeightQuery>,
) -> ApiResult<Envelope<ValidatorSet>> {
    Ok(Json(state.dispatcher.validators(query.height).await?))
}

pub async fn network(State(state): State<AppState>) -> ApiResult<Envelope<NetworkOverview>> {
    Ok(Json(state.dispatcher.network().await?))
}

pub async fn search(
    State(state): State<AppState>,
    Path(query): Path<String>,
) -> ApiResult<Envelope<SearchResult>> {
    Ok(Json(state.dispatcher.search(&query).await?))
}
