use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::to_iso;
use crate::connections::{self, ConnectionEdge, ConnectionStatus};
use crate::error::AppResult;
use crate::pagination::{Page, PageParams};
use crate::routes::collaborations::CheckResponse;
use crate::routes::invitations::CountResponse;
use crate::state::AppState;

fn default_notifications() -> bool {
    true
}

#[derive(Deserialize)]
pub struct CreateConnectionRequest {
    pub follower_id: i64,
    pub following_id: i64,
    pub note: Option<String>,
    #[serde(default = "default_notifications")]
    pub notifications_enabled: bool,
}

#[derive(Deserialize)]
pub struct UpdateConnectionStatusRequest {
    pub status: ConnectionStatus,
}

#[derive(Deserialize)]
pub struct PairQuery {
    pub follower_id: i64,
    pub following_id: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConnectionResponse {
    pub id: Uuid,
    pub follower_id: i64,
    pub following_id: i64,
    pub status: ConnectionStatus,
    pub note: Option<String>,
    pub notifications_enabled: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<ConnectionEdge> for ConnectionResponse {
    fn from(edge: ConnectionEdge) -> Self {
        Self {
            id: edge.id,
            follower_id: edge.follower_id,
            following_id: edge.following_id,
            status: edge.status,
            note: edge.note,
            notifications_enabled: edge.notifications_enabled,
            created_at: to_iso(edge.created_at),
            updated_at: to_iso(edge.updated_at),
        }
    }
}

fn to_responses(edges: Vec<ConnectionEdge>) -> Vec<ConnectionResponse> {
    edges.into_iter().map(ConnectionResponse::from).collect()
}

pub async fn create_connection(
    State(state): State<AppState>,
    Json(payload): Json<CreateConnectionRequest>,
) -> AppResult<(StatusCode, Json<ConnectionResponse>)> {
    let mut conn = state.db()?;
    let edge = connections::create_edge(
        &mut conn,
        payload.follower_id,
        payload.following_id,
        payload.note,
        payload.notifications_enabled,
    )?;
    Ok((StatusCode::CREATED, Json(edge.into())))
}

pub async fn get_connection(
    State(state): State<AppState>,
    Path(connection_id): Path<Uuid>,
) -> AppResult<Json<ConnectionResponse>> {
    let mut conn = state.db()?;
    let edge = connections::get_edge(&mut conn, connection_id)?;
    Ok(Json(edge.into()))
}

pub async fn update_connection_status(
    State(state): State<AppState>,
    Path(connection_id): Path<Uuid>,
    Json(payload): Json<UpdateConnectionStatusRequest>,
) -> AppResult<Json<ConnectionResponse>> {
    let mut conn = state.db()?;
    let edge = connections::update_edge_status(&mut conn, connection_id, payload.status)?;
    Ok(Json(edge.into()))
}

pub async fn delete_connection(
    State(state): State<AppState>,
    Path(connection_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let mut conn = state.db()?;
    connections::delete_edge(&mut conn, connection_id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_between(
    State(state): State<AppState>,
    Path((follower_id, following_id)): Path<(i64, i64)>,
) -> AppResult<Json<ConnectionResponse>> {
    let mut conn = state.db()?;
    let edge = connections::get_edge_between(&mut conn, follower_id, following_id)?;
    Ok(Json(edge.into()))
}

pub async fn list_followers(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> AppResult<Json<Vec<ConnectionResponse>>> {
    let mut conn = state.db()?;
    let edges = connections::followers(&mut conn, user_id)?;
    Ok(Json(to_responses(edges)))
}

pub async fn page_followers(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Query(params): Query<PageParams>,
) -> AppResult<Json<Page<ConnectionResponse>>> {
    let mut conn = state.db()?;
    let page = connections::page_followers(&mut conn, user_id, params)?;
    Ok(Json(page.map(ConnectionResponse::from)))
}

pub async fn count_followers(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> AppResult<Json<CountResponse>> {
    let mut conn = state.db()?;
    let count = connections::count_followers(&mut conn, user_id)?;
    Ok(Json(CountResponse { count }))
}

pub async fn list_following(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> AppResult<Json<Vec<ConnectionResponse>>> {
    let mut conn = state.db()?;
    let edges = connections::following(&mut conn, user_id)?;
    Ok(Json(to_responses(edges)))
}

pub async fn page_following(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Query(params): Query<PageParams>,
) -> AppResult<Json<Page<ConnectionResponse>>> {
    let mut conn = state.db()?;
    let page = connections::page_following(&mut conn, user_id, params)?;
    Ok(Json(page.map(ConnectionResponse::from)))
}

pub async fn count_following(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> AppResult<Json<CountResponse>> {
    let mut conn = state.db()?;
    let count = connections::count_following(&mut conn, user_id)?;
    Ok(Json(CountResponse { count }))
}

pub async fn is_following(
    State(state): State<AppState>,
    Query(query): Query<PairQuery>,
) -> AppResult<Json<CheckResponse>> {
    let mut conn = state.db()?;
    let result = connections::is_following(&mut conn, query.follower_id, query.following_id)?;
    Ok(Json(CheckResponse { result }))
}

pub async fn list_mutual(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> AppResult<Json<Vec<ConnectionResponse>>> {
    let mut conn = state.db()?;
    let edges = connections::mutual_connections(&mut conn, user_id)?;
    Ok(Json(to_responses(edges)))
}

pub async fn page_mutual(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Query(params): Query<PageParams>,
) -> AppResult<Json<Page<ConnectionResponse>>> {
    let mut conn = state.db()?;
    let page = connections::page_mutual_connections(&mut conn, user_id, params)?;
    Ok(Json(page.map(ConnectionResponse::from)))
}

pub async fn block_user(
    State(state): State<AppState>,
    Path((user_id, target_id)): Path<(i64, i64)>,
) -> AppResult<Json<ConnectionResponse>> {
    let mut conn = state.db()?;
    let edge = connections::block_user(&mut conn, user_id, target_id)?;
    Ok(Json(edge.into()))
}

pub async fn unblock_user(
    State(state): State<AppState>,
    Path((user_id, target_id)): Path<(i64, i64)>,
) -> AppResult<StatusCode> {
    let mut conn = state.db()?;
    connections::unblock_user(&mut conn, user_id, target_id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_blocked(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> AppResult<Json<Vec<ConnectionResponse>>> {
    let mut conn = state.db()?;
    let edges = connections::blocked_users(&mut conn, user_id)?;
    Ok(Json(to_responses(edges)))
}
