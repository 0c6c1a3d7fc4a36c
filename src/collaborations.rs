//! Board collaboration grants and the permission hierarchy.
//!
//! A grant authorizes one user on one board at a [`PermissionLevel`]. Only
//! ACCEPTED grants confer permissions, and at most one ACCEPTED grant may exist
//! per `(board_id, user_id)`; the partial unique index
//! `board_collaborations_single_accepted_idx` backs that rule.

use std::str::FromStr;

use chrono::{NaiveDateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CollabError, CollabResult, UnknownVariant};
use crate::models::{CollaborationRow, NewCollaborationRow};
use crate::pagination::{Page, PageParams};
use crate::schema::board_collaborations;

/// Totally ordered: `View < Contribute < Edit < Admin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum PermissionLevel {
    View = 0,
    Contribute = 1,
    Edit = 2,
    Admin = 3,
}

impl PermissionLevel {
    pub fn rank(self) -> u8 {
        self as u8
    }

    /// True when a holder of `self` may act where `required` is demanded.
    pub fn satisfies(self, required: PermissionLevel) -> bool {
        self.rank() >= required.rank()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PermissionLevel::View => "VIEW",
            PermissionLevel::Contribute => "CONTRIBUTE",
            PermissionLevel::Edit => "EDIT",
            PermissionLevel::Admin => "ADMIN",
        }
    }
}

impl FromStr for PermissionLevel {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "VIEW" => Ok(PermissionLevel::View),
            "CONTRIBUTE" => Ok(PermissionLevel::Contribute),
            "EDIT" => Ok(PermissionLevel::Edit),
            "ADMIN" => Ok(PermissionLevel::Admin),
            other => Err(UnknownVariant::new("permission level", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GrantStatus {
    Pending,
    Accepted,
    Declined,
    Removed,
}

impl GrantStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            GrantStatus::Pending => "PENDING",
            GrantStatus::Accepted => "ACCEPTED",
            GrantStatus::Declined => "DECLINED",
            GrantStatus::Removed => "REMOVED",
        }
    }
}

impl FromStr for GrantStatus {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "PENDING" => Ok(GrantStatus::Pending),
            "ACCEPTED" => Ok(GrantStatus::Accepted),
            "DECLINED" => Ok(GrantStatus::Declined),
            "REMOVED" => Ok(GrantStatus::Removed),
            other => Err(UnknownVariant::new("collaboration status", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollaborationGrant {
    pub id: Uuid,
    pub board_id: i64,
    pub user_id: i64,
    pub invited_by: Option<i64>,
    pub status: GrantStatus,
    pub permission_level: PermissionLevel,
    pub invitation_message: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl TryFrom<CollaborationRow> for CollaborationGrant {
    type Error = CollabError;

    fn try_from(row: CollaborationRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            board_id: row.board_id,
            user_id: row.user_id,
            invited_by: row.invited_by,
            status: row.status.parse()?,
            permission_level: row.permission_level.parse()?,
            invitation_message: row.invitation_message,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewCollaborator {
    pub board_id: i64,
    pub user_id: i64,
    pub invited_by: Option<i64>,
    pub permission_level: PermissionLevel,
    pub invitation_message: Option<String>,
}

fn to_grants(rows: Vec<CollaborationRow>) -> CollabResult<Vec<CollaborationGrant>> {
    rows.into_iter().map(CollaborationGrant::try_from).collect()
}

fn map_accepted_conflict(err: DieselError) -> CollabError {
    match err {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
            CollabError::AlreadyCollaborator
        }
        other => CollabError::from(other),
    }
}

/// Inserts an ACCEPTED grant. Direct additions and invitation acceptances
/// both land here; there is no pending phase at the grant layer.
pub fn add_collaborator(
    conn: &mut PgConnection,
    new: NewCollaborator,
) -> CollabResult<CollaborationGrant> {
    if is_collaborator(conn, new.board_id, new.user_id)? {
        return Err(CollabError::AlreadyCollaborator);
    }

    let row = NewCollaborationRow {
        id: Uuid::new_v4(),
        board_id: new.board_id,
        user_id: new.user_id,
        invited_by: new.invited_by,
        status: GrantStatus::Accepted.as_str().to_string(),
        permission_level: new.permission_level.as_str().to_string(),
        invitation_message: new.invitation_message,
    };

    let inserted: CollaborationRow = diesel::insert_into(board_collaborations::table)
        .values(&row)
        .get_result(conn)
        .map_err(map_accepted_conflict)?;

    tracing::info!(
        board_id = inserted.board_id,
        user_id = inserted.user_id,
        permission_level = %inserted.permission_level,
        "collaborator added"
    );
    inserted.try_into()
}

pub fn find_collaboration(conn: &mut PgConnection, id: Uuid) -> CollabResult<CollaborationGrant> {
    board_collaborations::table
        .find(id)
        .first::<CollaborationRow>(conn)
        .optional()?
        .ok_or(CollabError::NotFound("collaboration"))?
        .try_into()
}

/// The grant for a board/user pair, preferring the ACCEPTED one over
/// historical records.
pub fn get_collaboration(
    conn: &mut PgConnection,
    board_id: i64,
    user_id: i64,
) -> CollabResult<CollaborationGrant> {
    board_collaborations::table
        .filter(board_collaborations::board_id.eq(board_id))
        .filter(board_collaborations::user_id.eq(user_id))
        .order((
            board_collaborations::status
                .eq(GrantStatus::Accepted.as_str())
                .desc(),
            board_collaborations::updated_at.desc(),
        ))
        .first::<CollaborationRow>(conn)
        .optional()?
        .ok_or(CollabError::NotFound("collaboration"))?
        .try_into()
}

pub fn update_status(
    conn: &mut PgConnection,
    id: Uuid,
    status: GrantStatus,
) -> CollabResult<CollaborationGrant> {
    diesel::update(board_collaborations::table.find(id))
        .set((
            board_collaborations::status.eq(status.as_str()),
            board_collaborations::updated_at.eq(Utc::now().naive_utc()),
        ))
        .get_result::<CollaborationRow>(conn)
        .optional()
        .map_err(map_accepted_conflict)?
        .ok_or(CollabError::NotFound("collaboration"))?
        .try_into()
}

pub fn update_permission_level(
    conn: &mut PgConnection,
    id: Uuid,
    level: PermissionLevel,
) -> CollabResult<CollaborationGrant> {
    diesel::update(board_collaborations::table.find(id))
        .set((
            board_collaborations::permission_level.eq(level.as_str()),
            board_collaborations::updated_at.eq(Utc::now().naive_utc()),
        ))
        .get_result::<CollaborationRow>(conn)
        .optional()?
        .ok_or(CollabError::NotFound("collaboration"))?
        .try_into()
}

pub fn remove_collaborator(conn: &mut PgConnection, id: Uuid) -> CollabResult<()> {
    let deleted = diesel::delete(board_collaborations::table.find(id)).execute(conn)?;
    if deleted == 0 {
        return Err(CollabError::NotFound("collaboration"));
    }
    Ok(())
}

pub fn list_board_collaborators(
    conn: &mut PgConnection,
    board_id: i64,
) -> CollabResult<Vec<CollaborationGrant>> {
    let rows = board_collaborations::table
        .filter(board_collaborations::board_id.eq(board_id))
        .filter(board_collaborations::status.eq(GrantStatus::Accepted.as_str()))
        .order(board_collaborations::created_at.asc())
        .load::<CollaborationRow>(conn)?;
    to_grants(rows)
}

pub fn list_user_collaborations(
    conn: &mut PgConnection,
    user_id: i64,
) -> CollabResult<Vec<CollaborationGrant>> {
    let rows = board_collaborations::table
        .filter(board_collaborations::user_id.eq(user_id))
        .filter(board_collaborations::status.eq(GrantStatus::Accepted.as_str()))
        .order(board_collaborations::created_at.asc())
        .load::<CollaborationRow>(conn)?;
    to_grants(rows)
}

/// Every grant on the board regardless of status.
pub fn page_board_collaborators(
    conn: &mut PgConnection,
    board_id: i64,
    params: PageParams,
) -> CollabResult<Page<CollaborationGrant>> {
    let total: i64 = board_collaborations::table
        .filter(board_collaborations::board_id.eq(board_id))
        .count()
        .get_result(conn)?;
    let rows = board_collaborations::table
        .filter(board_collaborations::board_id.eq(board_id))
        .order(board_collaborations::created_at.asc())
        .limit(params.size())
        .offset(params.offset())
        .load::<CollaborationRow>(conn)?;
    Ok(Page::new(to_grants(rows)?, params, total))
}

/// Every grant held by the user regardless of status.
pub fn page_user_collaborations(
    conn: &mut PgConnection,
    user_id: i64,
    params: PageParams,
) -> CollabResult<Page<CollaborationGrant>> {
    let total: i64 = board_collaborations::table
        .filter(board_collaborations::user_id.eq(user_id))
        .count()
        .get_result(conn)?;
    let rows = board_collaborations::table
        .filter(board_collaborations::user_id.eq(user_id))
        .order(board_collaborations::created_at.asc())
        .limit(params.size())
        .offset(params.offset())
        .load::<CollaborationRow>(conn)?;
    Ok(Page::new(to_grants(rows)?, params, total))
}

pub fn count_collaborators(conn: &mut PgConnection, board_id: i64) -> CollabResult<i64> {
    let count = board_collaborations::table
        .filter(board_collaborations::board_id.eq(board_id))
        .filter(board_collaborations::status.eq(GrantStatus::Accepted.as_str()))
        .count()
        .get_result(conn)?;
    Ok(count)
}

pub fn is_collaborator(conn: &mut PgConnection, board_id: i64, user_id: i64) -> CollabResult<bool> {
    let exists = diesel::select(diesel::dsl::exists(
        board_collaborations::table
            .filter(board_collaborations::board_id.eq(board_id))
            .filter(board_collaborations::user_id.eq(user_id))
            .filter(board_collaborations::status.eq(GrantStatus::Accepted.as_str())),
    ))
    .get_result(conn)?;
    Ok(exists)
}

/// Hierarchy check: holding EDIT satisfies VIEW and CONTRIBUTE as well.
pub fn has_permission(
    conn: &mut PgConnection,
    board_id: i64,
    user_id: i64,
    required: PermissionLevel,
) -> CollabResult<bool> {
    let granted: Option<String> = board_collaborations::table
        .filter(board_collaborations::board_id.eq(board_id))
        .filter(board_collaborations::user_id.eq(user_id))
        .filter(board_collaborations::status.eq(GrantStatus::Accepted.as_str()))
        .select(board_collaborations::permission_level)
        .first(conn)
        .optional()?;

    match granted {
        Some(level) => Ok(level.parse::<PermissionLevel>()?.satisfies(required)),
        None => Ok(false),
    }
}

/// Boards where the user holds an ACCEPTED grant at exactly ADMIN.
pub fn list_admin_boards(
    conn: &mut PgConnection,
    user_id: i64,
) -> CollabResult<Vec<CollaborationGrant>> {
    let rows = board_collaborations::table
        .filter(board_collaborations::user_id.eq(user_id))
        .filter(board_collaborations::status.eq(GrantStatus::Accepted.as_str()))
        .filter(board_collaborations::permission_level.eq(PermissionLevel::Admin.as_str()))
        .order(board_collaborations::board_id.asc())
        .load::<CollaborationRow>(conn)?;
    to_grants(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEVELS: [PermissionLevel; 4] = [
        PermissionLevel::View,
        PermissionLevel::Contribute,
        PermissionLevel::Edit,
        PermissionLevel::Admin,
    ];

    #[test]
    fn every_level_satisfies_view() {
        for level in LEVELS {
            assert!(level.satisfies(PermissionLevel::View), "{level:?}");
        }
    }

    #[test]
    fn only_admin_satisfies_admin() {
        for level in LEVELS {
            assert_eq!(
                level.satisfies(PermissionLevel::Admin),
                level == PermissionLevel::Admin
            );
        }
    }

    #[test]
    fn edit_covers_lower_levels_but_not_admin() {
        let edit = PermissionLevel::Edit;
        assert!(edit.satisfies(PermissionLevel::Contribute));
        assert!(edit.satisfies(PermissionLevel::Edit));
        assert!(!edit.satisfies(PermissionLevel::Admin));
        assert!(!PermissionLevel::Contribute.satisfies(edit));
    }

    #[test]
    fn rank_agrees_with_ordering() {
        for pair in LEVELS.windows(2) {
            assert!(pair[0] < pair[1]);
            assert!(pair[0].rank() < pair[1].rank());
        }
    }

    #[test]
    fn serde_uses_upper_case_names() {
        let json = serde_json::to_string(&PermissionLevel::Contribute).unwrap();
        assert_eq!(json, "\"CONTRIBUTE\"");
        let parsed: GrantStatus = serde_json::from_str("\"REMOVED\"").unwrap();
        assert_eq!(parsed, GrantStatus::Removed);
    }

    #[test]
    fn rejects_unknown_stored_level() {
        let row = CollaborationRow {
            id: Uuid::new_v4(),
            board_id: 1,
            user_id: 2,
            invited_by: None,
            status: "ACCEPTED".to_string(),
            permission_level: "OWNER".to_string(),
            invitation_message: None,
            created_at: Utc::now().naive_utc(),
            updated_at: Utc::now().naive_utc(),
        };
        let err = CollaborationGrant::try_from(row).unwrap_err();
        assert!(matches!(err, CollabError::CorruptRecord(_)));
    }
}
