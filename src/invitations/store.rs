use chrono::NaiveDateTime;
use diesel::pg::{Pg, PgConnection};
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use uuid::Uuid;

use super::{Invitation, InvitationStatus, InvitationType, NewInvitation};
use crate::error::{CollabError, CollabResult};
use crate::models::{InvitationRow, NewInvitationRow};
use crate::pagination::{Page, PageParams};
use crate::schema::invitations;

fn to_invitations(rows: Vec<InvitationRow>) -> CollabResult<Vec<Invitation>> {
    rows.into_iter().map(Invitation::try_from).collect()
}

pub fn find(conn: &mut PgConnection, id: Uuid) -> CollabResult<Invitation> {
    invitations::table
        .find(id)
        .first::<InvitationRow>(conn)
        .optional()?
        .ok_or(CollabError::NotFound("invitation"))?
        .try_into()
}

/// Loads the invitation holding a row lock until the surrounding transaction
/// ends, so concurrent responses and cancellations serialize on it.
pub(crate) fn find_for_update(conn: &mut PgConnection, id: Uuid) -> CollabResult<Invitation> {
    invitations::table
        .find(id)
        .for_update()
        .first::<InvitationRow>(conn)
        .optional()?
        .ok_or(CollabError::NotFound("invitation"))?
        .try_into()
}

pub fn pending_exists(
    conn: &mut PgConnection,
    sender_id: i64,
    recipient_id: i64,
    invitation_type: InvitationType,
    reference_id: Option<i64>,
) -> CollabResult<bool> {
    let mut query = invitations::table
        .filter(invitations::sender_id.eq(sender_id))
        .filter(invitations::recipient_id.eq(recipient_id))
        .filter(invitations::invitation_type.eq(invitation_type.as_str()))
        .filter(invitations::status.eq(InvitationStatus::Pending.as_str()))
        .into_boxed();
    query = match reference_id {
        Some(reference_id) => query.filter(invitations::reference_id.eq(reference_id)),
        None => query.filter(invitations::reference_id.is_null()),
    };

    let exists = diesel::select(diesel::dsl::exists(query)).get_result(conn)?;
    Ok(exists)
}

/// Inserts a PENDING invitation. The partial unique index on pending tuples
/// turns a lost insert race into [`CollabError::DuplicatePending`].
pub(crate) fn insert(conn: &mut PgConnection, new: &NewInvitation) -> CollabResult<Invitation> {
    let row = NewInvitationRow {
        id: Uuid::new_v4(),
        sender_id: new.sender_id,
        recipient_id: new.recipient_id,
        invitation_type: new.payload.invitation_type().as_str().to_string(),
        reference_id: new.payload.reference_id(),
        permission_level: new
            .payload
            .permission_level()
            .map(|level| level.as_str().to_string()),
        status: InvitationStatus::Pending.as_str().to_string(),
        message: new.message.clone(),
    };

    match diesel::insert_into(invitations::table)
        .values(&row)
        .get_result::<InvitationRow>(conn)
    {
        Ok(inserted) => inserted.try_into(),
        Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
            Err(CollabError::DuplicatePending)
        }
        Err(err) => Err(CollabError::from(err)),
    }
}

/// Moves a PENDING invitation into `status`. Returns `AlreadyResolved` if the
/// row is no longer pending at write time.
pub(crate) fn resolve(
    conn: &mut PgConnection,
    id: Uuid,
    status: InvitationStatus,
    response_message: Option<String>,
    now: NaiveDateTime,
) -> CollabResult<Invitation> {
    diesel::update(
        invitations::table
            .find(id)
            .filter(invitations::status.eq(InvitationStatus::Pending.as_str())),
    )
    .set((
        invitations::status.eq(status.as_str()),
        invitations::response_message.eq(response_message),
        invitations::responded_at.eq(Some(now)),
        invitations::updated_at.eq(now),
    ))
    .get_result::<InvitationRow>(conn)
    .optional()?
    .ok_or(CollabError::AlreadyResolved)?
    .try_into()
}

/// Guarded single-row expiry. `Ok(false)` means the invitation was resolved by
/// someone else first.
pub(crate) fn expire_if_pending(
    conn: &mut PgConnection,
    id: Uuid,
    now: NaiveDateTime,
) -> CollabResult<bool> {
    let updated = diesel::update(
        invitations::table
            .find(id)
            .filter(invitations::status.eq(InvitationStatus::Pending.as_str())),
    )
    .set((
        invitations::status.eq(InvitationStatus::Expired.as_str()),
        invitations::responded_at.eq(Some(now)),
        invitations::updated_at.eq(now),
    ))
    .execute(conn)?;
    Ok(updated == 1)
}

pub(crate) fn stale_pending_ids(
    conn: &mut PgConnection,
    created_before: NaiveDateTime,
) -> CollabResult<Vec<Uuid>> {
    let ids = invitations::table
        .filter(invitations::status.eq(InvitationStatus::Pending.as_str()))
        .filter(invitations::created_at.lt(created_before))
        .select(invitations::id)
        .load(conn)?;
    Ok(ids)
}

pub fn delete(conn: &mut PgConnection, id: Uuid) -> CollabResult<()> {
    let deleted = diesel::delete(invitations::table.find(id)).execute(conn)?;
    if deleted == 0 {
        return Err(CollabError::NotFound("invitation"));
    }
    Ok(())
}

fn paged<F>(conn: &mut PgConnection, params: PageParams, build: F) -> CollabResult<Page<Invitation>>
where
    F: Fn() -> invitations::BoxedQuery<'static, Pg>,
{
    let total: i64 = build().count().get_result(conn)?;
    let rows = build()
        .order((invitations::created_at.desc(), invitations::id.asc()))
        .limit(params.size())
        .offset(params.offset())
        .load::<InvitationRow>(conn)?;
    Ok(Page::new(to_invitations(rows)?, params, total))
}

pub fn list_sent(
    conn: &mut PgConnection,
    sender_id: i64,
    params: PageParams,
) -> CollabResult<Page<Invitation>> {
    paged(conn, params, || {
        invitations::table
            .filter(invitations::sender_id.eq(sender_id))
            .into_boxed()
    })
}

pub fn list_received(
    conn: &mut PgConnection,
    recipient_id: i64,
    params: PageParams,
) -> CollabResult<Page<Invitation>> {
    paged(conn, params, || {
        invitations::table
            .filter(invitations::recipient_id.eq(recipient_id))
            .into_boxed()
    })
}

pub fn list_pending(
    conn: &mut PgConnection,
    recipient_id: i64,
    params: PageParams,
) -> CollabResult<Page<Invitation>> {
    paged(conn, params, || {
        invitations::table
            .filter(invitations::recipient_id.eq(recipient_id))
            .filter(invitations::status.eq(InvitationStatus::Pending.as_str()))
            .into_boxed()
    })
}

pub fn list_by_type(
    conn: &mut PgConnection,
    recipient_id: i64,
    invitation_type: InvitationType,
    params: PageParams,
) -> CollabResult<Page<Invitation>> {
    paged(conn, params, || {
        invitations::table
            .filter(invitations::recipient_id.eq(recipient_id))
            .filter(invitations::invitation_type.eq(invitation_type.as_str()))
            .into_boxed()
    })
}

pub fn all_pending(conn: &mut PgConnection, recipient_id: i64) -> CollabResult<Vec<Invitation>> {
    let rows = invitations::table
        .filter(invitations::recipient_id.eq(recipient_id))
        .filter(invitations::status.eq(InvitationStatus::Pending.as_str()))
        .order(invitations::created_at.desc())
        .load::<InvitationRow>(conn)?;
    to_invitations(rows)
}

pub fn count_pending(conn: &mut PgConnection, recipient_id: i64) -> CollabResult<i64> {
    let count = invitations::table
        .filter(invitations::recipient_id.eq(recipient_id))
        .filter(invitations::status.eq(InvitationStatus::Pending.as_str()))
        .count()
        .get_result(conn)?;
    Ok(count)
}
