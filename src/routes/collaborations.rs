use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::to_iso;
use crate::collaborations::{
    self, CollaborationGrant, GrantStatus, NewCollaborator, PermissionLevel,
};
use crate::error::AppResult;
use crate::pagination::{Page, PageParams};
use crate::routes::invitations::CountResponse;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct AddCollaboratorRequest {
    pub board_id: i64,
    pub user_id: i64,
    pub invited_by: Option<i64>,
    pub permission_level: PermissionLevel,
    pub invitation_message: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: GrantStatus,
}

#[derive(Deserialize)]
pub struct UpdatePermissionRequest {
    pub permission_level: PermissionLevel,
}

#[derive(Deserialize)]
pub struct BoardUserQuery {
    pub board_id: i64,
    pub user_id: i64,
}

#[derive(Deserialize)]
pub struct PermissionQuery {
    pub board_id: i64,
    pub user_id: i64,
    pub level: PermissionLevel,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CollaborationResponse {
    pub id: Uuid,
    pub board_id: i64,
    pub user_id: i64,
    pub invited_by: Option<i64>,
    pub status: GrantStatus,
    pub permission_level: PermissionLevel,
    pub invitation_message: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<CollaborationGrant> for CollaborationResponse {
    fn from(grant: CollaborationGrant) -> Self {
        Self {
            id: grant.id,
            board_id: grant.board_id,
            user_id: grant.user_id,
            invited_by: grant.invited_by,
            status: grant.status,
            permission_level: grant.permission_level,
            invitation_message: grant.invitation_message,
            created_at: to_iso(grant.created_at),
            updated_at: to_iso(grant.updated_at),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckResponse {
    pub result: bool,
}

fn to_responses(grants: Vec<CollaborationGrant>) -> Vec<CollaborationResponse> {
    grants.into_iter().map(CollaborationResponse::from).collect()
}

pub async fn add_collaborator(
    State(state): State<AppState>,
    Json(payload): Json<AddCollaboratorRequest>,
) -> AppResult<(StatusCode, Json<CollaborationResponse>)> {
    let mut conn = state.db()?;
    let grant = collaborations::add_collaborator(
        &mut conn,
        NewCollaborator {
            board_id: payload.board_id,
            user_id: payload.user_id,
            invited_by: payload.invited_by,
            permission_level: payload.permission_level,
            invitation_message: payload.invitation_message,
        },
    )?;
    Ok((StatusCode::CREATED, Json(grant.into())))
}

pub async fn find_collaboration(
    State(state): State<AppState>,
    Path(collaboration_id): Path<Uuid>,
) -> AppResult<Json<CollaborationResponse>> {
    let mut conn = state.db()?;
    let grant = collaborations::find_collaboration(&mut conn, collaboration_id)?;
    Ok(Json(grant.into()))
}

pub async fn get_collaboration(
    State(state): State<AppState>,
    Path((board_id, user_id)): Path<(i64, i64)>,
) -> AppResult<Json<CollaborationResponse>> {
    let mut conn = state.db()?;
    let grant = collaborations::get_collaboration(&mut conn, board_id, user_id)?;
    Ok(Json(grant.into()))
}

pub async fn update_status(
    State(state): State<AppState>,
    Path(collaboration_id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> AppResult<Json<CollaborationResponse>> {
    let mut conn = state.db()?;
    let grant = collaborations::update_status(&mut conn, collaboration_id, payload.status)?;
    Ok(Json(grant.into()))
}

pub async fn update_permission(
    State(state): State<AppState>,
    Path(collaboration_id): Path<Uuid>,
    Json(payload): Json<UpdatePermissionRequest>,
) -> AppResult<Json<CollaborationResponse>> {
    let mut conn = state.db()?;
    let grant = collaborations::update_permission_level(
        &mut conn,
        collaboration_id,
        payload.permission_level,
    )?;
    Ok(Json(grant.into()))
}

pub async fn remove_collaborator(
    State(state): State<AppState>,
    Path(collaboration_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let mut conn = state.db()?;
    collaborations::remove_collaborator(&mut conn, collaboration_id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_board_collaborators(
    State(state): State<AppState>,
    Path(board_id): Path<i64>,
) -> AppResult<Json<Vec<CollaborationResponse>>> {
    let mut conn = state.db()?;
    let grants = collaborations::list_board_collaborators(&mut conn, board_id)?;
    Ok(Json(to_responses(grants)))
}

pub async fn page_board_collaborators(
    State(state): State<AppState>,
    Path(board_id): Path<i64>,
    Query(params): Query<PageParams>,
) -> AppResult<Json<Page<CollaborationResponse>>> {
    let mut conn = state.db()?;
    let page = collaborations::page_board_collaborators(&mut conn, board_id, params)?;
    Ok(Json(page.map(CollaborationResponse::from)))
}

pub async fn count_collaborators(
    State(state): State<AppState>,
    Path(board_id): Path<i64>,
) -> AppResult<Json<CountResponse>> {
    let mut conn = state.db()?;
    let count = collaborations::count_collaborators(&mut conn, board_id)?;
    Ok(Json(CountResponse { count }))
}

pub async fn list_user_collaborations(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> AppResult<Json<Vec<CollaborationResponse>>> {
    let mut conn = state.db()?;
    let grants = collaborations::list_user_collaborations(&mut conn, user_id)?;
    Ok(Json(to_responses(grants)))
}

pub async fn page_user_collaborations(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Query(params): Query<PageParams>,
) -> AppResult<Json<Page<CollaborationResponse>>> {
    let mut conn = state.db()?;
    let page = collaborations::page_user_collaborations(&mut conn, user_id, params)?;
    Ok(Json(page.map(CollaborationResponse::from)))
}

pub async fn is_collaborator(
    State(state): State<AppState>,
    Query(query): Query<BoardUserQuery>,
) -> AppResult<Json<CheckResponse>> {
    let mut conn = state.db()?;
    let result = collaborations::is_collaborator(&mut conn, query.board_id, query.user_id)?;
    Ok(Json(CheckResponse { result }))
}

pub async fn has_permission(
    State(state): State<AppState>,
    Query(query): Query<PermissionQuery>,
) -> AppResult<Json<CheckResponse>> {
    let mut conn = state.db()?;
    let result =
        collaborations::has_permission(&mut conn, query.board_id, query.user_id, query.level)?;
    Ok(Json(CheckResponse { result }))
}

pub async fn list_admin_boards(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> AppResult<Json<Vec<CollaborationResponse>>> {
    let mut conn = state.db()?;
    let grants = collaborations::list_admin_boards(&mut conn, user_id)?;
    Ok(Json(to_responses(grants)))
}
