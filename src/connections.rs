//! Directed follow/block edges between users.

use std::str::FromStr;

use chrono::{NaiveDateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CollabError, CollabResult, UnknownVariant};
use crate::models::{ConnectionRow, NewConnectionRow};
use crate::pagination::{Page, PageParams};
use crate::schema::user_connections;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionStatus {
    Pending,
    Accepted,
    Blocked,
}

impl ConnectionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionStatus::Pending => "PENDING",
            ConnectionStatus::Accepted => "ACCEPTED",
            ConnectionStatus::Blocked => "BLOCKED",
        }
    }
}

impl FromStr for ConnectionStatus {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "PENDING" => Ok(ConnectionStatus::Pending),
            "ACCEPTED" => Ok(ConnectionStatus::Accepted),
            "BLOCKED" => Ok(ConnectionStatus::Blocked),
            other => Err(UnknownVariant::new("connection status", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionEdge {
    pub id: Uuid,
    pub follower_id: i64,
    pub following_id: i64,
    pub status: ConnectionStatus,
    pub note: Option<String>,
    pub notifications_enabled: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl TryFrom<ConnectionRow> for ConnectionEdge {
    type Error = CollabError;

    fn try_from(row: ConnectionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            follower_id: row.follower_id,
            following_id: row.following_id,
            status: row.status.parse()?,
            note: row.note,
            notifications_enabled: row.notifications_enabled,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn to_edges(rows: Vec<ConnectionRow>) -> CollabResult<Vec<ConnectionEdge>> {
    rows.into_iter().map(ConnectionEdge::try_from).collect()
}

fn find_between(
    conn: &mut PgConnection,
    follower_id: i64,
    following_id: i64,
) -> CollabResult<Option<ConnectionRow>> {
    let row = user_connections::table
        .filter(user_connections::follower_id.eq(follower_id))
        .filter(user_connections::following_id.eq(following_id))
        .first::<ConnectionRow>(conn)
        .optional()?;
    Ok(row)
}

/// Creates an ACCEPTED edge. Any existing edge for the ordered pair, in any
/// status, is a conflict.
pub fn create_edge(
    conn: &mut PgConnection,
    follower_id: i64,
    following_id: i64,
    note: Option<String>,
    notifications_enabled: bool,
) -> CollabResult<ConnectionEdge> {
    if find_between(conn, follower_id, following_id)?.is_some() {
        return Err(CollabError::AlreadyExists);
    }

    let row = NewConnectionRow {
        id: Uuid::new_v4(),
        follower_id,
        following_id,
        status: ConnectionStatus::Accepted.as_str().to_string(),
        note,
        notifications_enabled,
    };

    let inserted: ConnectionRow = match diesel::insert_into(user_connections::table)
        .values(&row)
        .get_result(conn)
    {
        Ok(inserted) => inserted,
        Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
            return Err(CollabError::AlreadyExists);
        }
        Err(err) => return Err(CollabError::from(err)),
    };

    tracing::info!(follower_id, following_id, "connection created");
    inserted.try_into()
}

pub fn get_edge(conn: &mut PgConnection, id: Uuid) -> CollabResult<ConnectionEdge> {
    user_connections::table
        .find(id)
        .first::<ConnectionRow>(conn)
        .optional()?
        .ok_or(CollabError::NotFound("connection"))?
        .try_into()
}

pub fn get_edge_between(
    conn: &mut PgConnection,
    follower_id: i64,
    following_id: i64,
) -> CollabResult<ConnectionEdge> {
    find_between(conn, follower_id, following_id)?
        .ok_or(CollabError::NotFound("connection"))?
        .try_into()
}

pub fn update_edge_status(
    conn: &mut PgConnection,
    id: Uuid,
    status: ConnectionStatus,
) -> CollabResult<ConnectionEdge> {
    diesel::update(user_connections::table.find(id))
        .set((
            user_connections::status.eq(status.as_str()),
            user_connections::updated_at.eq(Utc::now().naive_utc()),
        ))
        .get_result::<ConnectionRow>(conn)
        .optional()?
        .ok_or(CollabError::NotFound("connection"))?
        .try_into()
}

pub fn delete_edge(conn: &mut PgConnection, id: Uuid) -> CollabResult<()> {
    let deleted = diesel::delete(user_connections::table.find(id)).execute(conn)?;
    if deleted == 0 {
        return Err(CollabError::NotFound("connection"));
    }
    Ok(())
}

/// Users `user_id` follows with an ACCEPTED edge.
pub fn following(conn: &mut PgConnection, user_id: i64) -> CollabResult<Vec<ConnectionEdge>> {
    let rows = user_connections::table
        .filter(user_connections::follower_id.eq(user_id))
        .filter(user_connections::status.eq(ConnectionStatus::Accepted.as_str()))
        .order(user_connections::created_at.desc())
        .load::<ConnectionRow>(conn)?;
    to_edges(rows)
}

/// Users following `user_id` with an ACCEPTED edge.
pub fn followers(conn: &mut PgConnection, user_id: i64) -> CollabResult<Vec<ConnectionEdge>> {
    let rows = user_connections::table
        .filter(user_connections::following_id.eq(user_id))
        .filter(user_connections::status.eq(ConnectionStatus::Accepted.as_str()))
        .order(user_connections::created_at.desc())
        .load::<ConnectionRow>(conn)?;
    to_edges(rows)
}

pub fn page_following(
    conn: &mut PgConnection,
    user_id: i64,
    params: PageParams,
) -> CollabResult<Page<ConnectionEdge>> {
    let total = count_following(conn, user_id)?;
    let rows = user_connections::table
        .filter(user_connections::follower_id.eq(user_id))
        .filter(user_connections::status.eq(ConnectionStatus::Accepted.as_str()))
        .order(user_connections::created_at.desc())
        .limit(params.size())
        .offset(params.offset())
        .load::<ConnectionRow>(conn)?;
    Ok(Page::new(to_edges(rows)?, params, total))
}

pub fn page_followers(
    conn: &mut PgConnection,
    user_id: i64,
    params: PageParams,
) -> CollabResult<Page<ConnectionEdge>> {
    let total = count_followers(conn, user_id)?;
    let rows = user_connections::table
        .filter(user_connections::following_id.eq(user_id))
        .filter(user_connections::status.eq(ConnectionStatus::Accepted.as_str()))
        .order(user_connections::created_at.desc())
        .limit(params.size())
        .offset(params.offset())
        .load::<ConnectionRow>(conn)?;
    Ok(Page::new(to_edges(rows)?, params, total))
}

pub fn count_followers(conn: &mut PgConnection, user_id: i64) -> CollabResult<i64> {
    let count = user_connections::table
        .filter(user_connections::following_id.eq(user_id))
        .filter(user_connections::status.eq(ConnectionStatus::Accepted.as_str()))
        .count()
        .get_result(conn)?;
    Ok(count)
}

pub fn count_following(conn: &mut PgConnection, user_id: i64) -> CollabResult<i64> {
    let count = user_connections::table
        .filter(user_connections::follower_id.eq(user_id))
        .filter(user_connections::status.eq(ConnectionStatus::Accepted.as_str()))
        .count()
        .get_result(conn)?;
    Ok(count)
}

pub fn is_following(
    conn: &mut PgConnection,
    follower_id: i64,
    following_id: i64,
) -> CollabResult<bool> {
    let exists = diesel::select(diesel::dsl::exists(
        user_connections::table
            .filter(user_connections::follower_id.eq(follower_id))
            .filter(user_connections::following_id.eq(following_id))
            .filter(user_connections::status.eq(ConnectionStatus::Accepted.as_str())),
    ))
    .get_result(conn)?;
    Ok(exists)
}

/// Outgoing ACCEPTED edges of `user_id` whose target holds an ACCEPTED edge
/// back. The two directions are independent rows, so the edge table is joined
/// with itself on reversed endpoints.
pub fn mutual_connections(
    conn: &mut PgConnection,
    user_id: i64,
) -> CollabResult<Vec<ConnectionEdge>> {
    let reverse = diesel::alias!(user_connections as reverse_edges);
    let accepted = ConnectionStatus::Accepted.as_str();

    let rows = user_connections::table
        .inner_join(
            reverse.on(reverse
                .field(user_connections::follower_id)
                .eq(user_connections::following_id)
                .and(
                    reverse
                        .field(user_connections::following_id)
                        .eq(user_connections::follower_id),
                )),
        )
        .filter(user_connections::follower_id.eq(user_id))
        .filter(user_connections::status.eq(accepted))
        .filter(reverse.field(user_connections::status).eq(accepted))
        .select(user_connections::all_columns)
        .order(user_connections::created_at.desc())
        .load::<ConnectionRow>(conn)?;
    to_edges(rows)
}

pub fn page_mutual_connections(
    conn: &mut PgConnection,
    user_id: i64,
    params: PageParams,
) -> CollabResult<Page<ConnectionEdge>> {
    let all = mutual_connections(conn, user_id)?;
    let total = all.len() as i64;
    let content = all
        .into_iter()
        .skip(params.offset() as usize)
        .take(params.size() as usize)
        .collect();
    Ok(Page::new(content, params, total))
}

/// Upsert: an existing edge is overwritten to BLOCKED, otherwise a BLOCKED
/// edge is created.
pub fn block_user(
    conn: &mut PgConnection,
    user_id: i64,
    target_id: i64,
) -> CollabResult<ConnectionEdge> {
    let now = Utc::now().naive_utc();
    let row = NewConnectionRow {
        id: Uuid::new_v4(),
        follower_id: user_id,
        following_id: target_id,
        status: ConnectionStatus::Blocked.as_str().to_string(),
        note: None,
        notifications_enabled: false,
    };

    let blocked: ConnectionRow = diesel::insert_into(user_connections::table)
        .values(&row)
        .on_conflict((user_connections::follower_id, user_connections::following_id))
        .do_update()
        .set((
            user_connections::status.eq(ConnectionStatus::Blocked.as_str()),
            user_connections::updated_at.eq(now),
        ))
        .get_result(conn)?;

    tracing::info!(user_id, target_id, "user blocked");
    blocked.try_into()
}

/// Removes a BLOCKED edge entirely; unblocking never reverts to a follow.
pub fn unblock_user(conn: &mut PgConnection, user_id: i64, target_id: i64) -> CollabResult<()> {
    conn.transaction(|conn| {
        let row = user_connections::table
            .filter(user_connections::follower_id.eq(user_id))
            .filter(user_connections::following_id.eq(target_id))
            .for_update()
            .first::<ConnectionRow>(conn)
            .optional()?
            .ok_or(CollabError::NotFound("block relationship"))?;

        if row.status.parse::<ConnectionStatus>()? != ConnectionStatus::Blocked {
            return Err(CollabError::NotBlocked);
        }

        diesel::delete(user_connections::table.find(row.id)).execute(conn)?;
        tracing::info!(user_id, target_id, "user unblocked");
        Ok(())
    })
}

pub fn blocked_users(conn: &mut PgConnection, user_id: i64) -> CollabResult<Vec<ConnectionEdge>> {
    let rows = user_connections::table
        .filter(user_connections::follower_id.eq(user_id))
        .filter(user_connections::status.eq(ConnectionStatus::Blocked.as_str()))
        .order(user_connections::updated_at.desc())
        .load::<ConnectionRow>(conn)?;
    to_edges(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corrupt_status_surfaces_as_corrupt_record() {
        let row = ConnectionRow {
            id: Uuid::new_v4(),
            follower_id: 1,
            following_id: 2,
            status: "MUTED".to_string(),
            note: None,
            notifications_enabled: true,
            created_at: Utc::now().naive_utc(),
            updated_at: Utc::now().naive_utc(),
        };
        let err = ConnectionEdge::try_from(row).unwrap_err();
        assert!(matches!(err, CollabError::CorruptRecord(_)));
    }

    #[test]
    fn lower_case_status_is_rejected() {
        let err = "blocked".parse::<ConnectionStatus>().unwrap_err();
        assert_eq!(err.kind, "connection status");
    }
}
