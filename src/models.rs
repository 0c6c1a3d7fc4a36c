use chrono::NaiveDateTime;
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::*;

/// Raw `invitations` row. The nullable `reference_id` / `permission_level`
/// pair is only interpreted through [`crate::invitations::Invitation`].
#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = invitations)]
pub struct InvitationRow {
    pub id: Uuid,
    pub sender_id: i64,
    pub recipient_id: i64,
    pub invitation_type: String,
    pub reference_id: Option<i64>,
    pub permission_level: Option<String>,
    pub status: String,
    pub message: Option<String>,
    pub response_message: Option<String>,
    pub responded_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = invitations)]
pub struct NewInvitationRow {
    pub id: Uuid,
    pub sender_id: i64,
    pub recipient_id: i64,
    pub invitation_type: String,
    pub reference_id: Option<i64>,
    pub permission_level: Option<String>,
    pub status: String,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = board_collaborations)]
pub struct CollaborationRow {
    pub id: Uuid,
    pub board_id: i64,
    pub user_id: i64,
    pub invited_by: Option<i64>,
    pub status: String,
    pub permission_level: String,
    pub invitation_message: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = board_collaborations)]
pub struct NewCollaborationRow {
    pub id: Uuid,
    pub board_id: i64,
    pub user_id: i64,
    pub invited_by: Option<i64>,
    pub status: String,
    pub permission_level: String,
    pub invitation_message: Option<String>,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = user_connections)]
pub struct ConnectionRow {
    pub id: Uuid,
    pub follower_id: i64,
    pub following_id: i64,
    pub status: String,
    pub note: Option<String>,
    pub notifications_enabled: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = user_connections)]
pub struct NewConnectionRow {
    pub id: Uuid,
    pub follower_id: i64,
    pub following_id: i64,
    pub status: String,
    pub note: Option<String>,
    pub notifications_enabled: bool,
}
