use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::to_iso;
use crate::collaborations::PermissionLevel;
use crate::error::{AppError, AppResult};
use crate::invitations::{
    coordinator, store, Invitation, InvitationStatus, InvitationType, NewInvitation,
    ResponseStatus,
};
use crate::pagination::{Page, PageParams};
use crate::state::AppState;
use crate::sweeper::{self, SweepReport};

#[derive(Deserialize)]
pub struct CreateInvitationRequest {
    pub sender_id: i64,
    pub recipient_id: i64,
    #[serde(rename = "type")]
    pub invitation_type: InvitationType,
    pub reference_id: Option<i64>,
    pub message: Option<String>,
    pub permission_level: Option<PermissionLevel>,
}

#[derive(Deserialize)]
pub struct RespondRequest {
    pub status: ResponseStatus,
    pub response_message: Option<String>,
}

#[derive(Deserialize)]
pub struct CancelRequest {
    pub sender_id: i64,
}

#[derive(Deserialize, Default)]
pub struct ProcessExpiredRequest {
    pub expiry_days: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InvitationResponse {
    pub id: Uuid,
    pub sender_id: i64,
    pub recipient_id: i64,
    #[serde(rename = "type")]
    pub invitation_type: InvitationType,
    pub reference_id: Option<i64>,
    pub permission_level: Option<PermissionLevel>,
    pub status: InvitationStatus,
    pub message: Option<String>,
    pub response_message: Option<String>,
    pub responded_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Invitation> for InvitationResponse {
    fn from(invitation: Invitation) -> Self {
        Self {
            id: invitation.id,
            sender_id: invitation.sender_id,
            recipient_id: invitation.recipient_id,
            invitation_type: invitation.payload.invitation_type(),
            reference_id: invitation.payload.reference_id(),
            permission_level: invitation.payload.permission_level(),
            status: invitation.status,
            message: invitation.message,
            response_message: invitation.response_message,
            responded_at: invitation.responded_at.map(to_iso),
            created_at: to_iso(invitation.created_at),
            updated_at: to_iso(invitation.updated_at),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CountResponse {
    pub count: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProcessExpiredResponse {
    pub expired_count: usize,
    pub skipped_count: usize,
    pub failed_count: usize,
}

impl From<SweepReport> for ProcessExpiredResponse {
    fn from(report: SweepReport) -> Self {
        Self {
            expired_count: report.expired.len(),
            skipped_count: report.skipped.len(),
            failed_count: report.failed.len(),
        }
    }
}

fn page_response(page: Page<Invitation>) -> Page<InvitationResponse> {
    page.map(InvitationResponse::from)
}

pub async fn create_invitation(
    State(state): State<AppState>,
    Json(payload): Json<CreateInvitationRequest>,
) -> AppResult<(StatusCode, Json<InvitationResponse>)> {
    let new = NewInvitation::new(
        payload.sender_id,
        payload.recipient_id,
        payload.invitation_type,
        payload.reference_id,
        payload.message,
        payload.permission_level,
    )?;

    let mut conn = state.db()?;
    let invitation = coordinator::create_invitation(&mut conn, new)?;
    Ok((StatusCode::CREATED, Json(invitation.into())))
}

pub async fn get_invitation(
    State(state): State<AppState>,
    Path(invitation_id): Path<Uuid>,
) -> AppResult<Json<InvitationResponse>> {
    let mut conn = state.db()?;
    let invitation = store::find(&mut conn, invitation_id)?;
    Ok(Json(invitation.into()))
}

pub async fn delete_invitation(
    State(state): State<AppState>,
    Path(invitation_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let mut conn = state.db()?;
    coordinator::delete_invitation(&mut conn, invitation_id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn respond_to_invitation(
    State(state): State<AppState>,
    Path(invitation_id): Path<Uuid>,
    Json(payload): Json<RespondRequest>,
) -> AppResult<Json<InvitationResponse>> {
    let mut conn = state.db()?;
    let invitation = coordinator::respond_to_invitation(
        &mut conn,
        invitation_id,
        payload.status,
        payload.response_message,
    )?;
    Ok(Json(invitation.into()))
}

pub async fn cancel_invitation(
    State(state): State<AppState>,
    Path(invitation_id): Path<Uuid>,
    Json(payload): Json<CancelRequest>,
) -> AppResult<Json<InvitationResponse>> {
    let mut conn = state.db()?;
    let invitation = coordinator::cancel_invitation(&mut conn, invitation_id, payload.sender_id)?;
    Ok(Json(invitation.into()))
}

pub async fn list_sent(
    State(state): State<AppState>,
    Path(sender_id): Path<i64>,
    Query(params): Query<PageParams>,
) -> AppResult<Json<Page<InvitationResponse>>> {
    let mut conn = state.db()?;
    let page = store::list_sent(&mut conn, sender_id, params)?;
    Ok(Json(page_response(page)))
}

pub async fn list_received(
    State(state): State<AppState>,
    Path(recipient_id): Path<i64>,
    Query(params): Query<PageParams>,
) -> AppResult<Json<Page<InvitationResponse>>> {
    let mut conn = state.db()?;
    let page = store::list_received(&mut conn, recipient_id, params)?;
    Ok(Json(page_response(page)))
}

pub async fn list_pending(
    State(state): State<AppState>,
    Path(recipient_id): Path<i64>,
    Query(params): Query<PageParams>,
) -> AppResult<Json<Page<InvitationResponse>>> {
    let mut conn = state.db()?;
    let page = store::list_pending(&mut conn, recipient_id, params)?;
    Ok(Json(page_response(page)))
}

pub async fn list_all_pending(
    State(state): State<AppState>,
    Path(recipient_id): Path<i64>,
) -> AppResult<Json<Vec<InvitationResponse>>> {
    let mut conn = state.db()?;
    let invitations = store::all_pending(&mut conn, recipient_id)?;
    Ok(Json(
        invitations
            .into_iter()
            .map(InvitationResponse::from)
            .collect(),
    ))
}

pub async fn count_pending(
    State(state): State<AppState>,
    Path(recipient_id): Path<i64>,
) -> AppResult<Json<CountResponse>> {
    let mut conn = state.db()?;
    let count = store::count_pending(&mut conn, recipient_id)?;
    Ok(Json(CountResponse { count }))
}

pub async fn list_by_type(
    State(state): State<AppState>,
    Path((recipient_id, raw_type)): Path<(i64, String)>,
    Query(params): Query<PageParams>,
) -> AppResult<Json<Page<InvitationResponse>>> {
    let invitation_type: InvitationType = raw_type
        .to_ascii_uppercase()
        .parse()
        .map_err(|err| AppError::bad_request(format!("{err}")))?;

    let mut conn = state.db()?;
    let page = store::list_by_type(&mut conn, recipient_id, invitation_type, params)?;
    Ok(Json(page_response(page)))
}

/// Manual trigger for the expiry sweep. The body is optional, but when
/// present it must be a valid `ProcessExpiredRequest`.
pub async fn process_expired(
    State(state): State<AppState>,
    body: Bytes,
) -> AppResult<Json<ProcessExpiredResponse>> {
    let request: ProcessExpiredRequest = if body.iter().all(u8::is_ascii_whitespace) {
        ProcessExpiredRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|err| AppError::bad_request(format!("invalid request body: {err}")))?
    };
    let window = match request.expiry_days {
        Some(days) => sweeper::expiry_window(days)?,
        None => state.config.expiry_window(),
    };

    let mut conn = state.db()?;
    let report = sweeper::run_expiry_sweep(&mut conn, window)?;
    Ok(Json(report.into()))
}
