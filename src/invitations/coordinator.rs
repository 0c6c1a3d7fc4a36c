//! Invitation lifecycle transitions.
//!
//! Every mutating operation runs in one database transaction. Acceptance
//! creates the connection edge or collaboration grant inside the same
//! transaction as the status write, so either both land or neither does.

use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::Connection;
use tracing::info;
use uuid::Uuid;

use super::{store, Invitation, InvitationPayload, InvitationStatus, NewInvitation, ResponseStatus};
use crate::collaborations::{self, NewCollaborator};
use crate::connections;
use crate::error::{CollabError, CollabResult};

pub fn create_invitation(conn: &mut PgConnection, new: NewInvitation) -> CollabResult<Invitation> {
    conn.transaction(|conn| {
        if store::pending_exists(
            conn,
            new.sender_id,
            new.recipient_id,
            new.payload.invitation_type(),
            new.payload.reference_id(),
        )? {
            return Err(CollabError::DuplicatePending);
        }

        let invitation = store::insert(conn, &new)?;
        info!(
            invitation_id = %invitation.id,
            sender_id = invitation.sender_id,
            recipient_id = invitation.recipient_id,
            invitation_type = invitation.invitation_type().as_str(),
            "invitation created"
        );
        Ok(invitation)
    })
}

/// Records the recipient's answer. Responses are not idempotent: answering a
/// resolved invitation fails with [`CollabError::AlreadyResolved`].
pub fn respond_to_invitation(
    conn: &mut PgConnection,
    id: Uuid,
    response: ResponseStatus,
    response_message: Option<String>,
) -> CollabResult<Invitation> {
    conn.transaction(|conn| {
        let invitation = store::find_for_update(conn, id)?;
        if !invitation.is_pending() {
            return Err(CollabError::AlreadyResolved);
        }

        if response == ResponseStatus::Accepted {
            let created = materialize(conn, &invitation)?;
            info!(invitation_id = %id, created_id = %created, "acceptance materialized");
        }

        let status = InvitationStatus::from(response);
        let updated = store::resolve(conn, id, status, response_message, Utc::now().naive_utc())?;
        info!(invitation_id = %id, status = status.as_str(), "invitation answered");
        Ok(updated)
    })
}

/// Creates the relationship an accepted invitation stands for and returns its
/// id.
fn materialize(conn: &mut PgConnection, invitation: &Invitation) -> CollabResult<Uuid> {
    match invitation.payload {
        InvitationPayload::Connection => {
            let edge = connections::create_edge(
                conn,
                invitation.sender_id,
                invitation.recipient_id,
                invitation.message.clone(),
                true,
            )?;
            Ok(edge.id)
        }
        InvitationPayload::BoardCollaboration(request) => {
            let grant = collaborations::add_collaborator(
                conn,
                NewCollaborator {
                    board_id: request.board_id,
                    user_id: invitation.recipient_id,
                    invited_by: Some(invitation.sender_id),
                    permission_level: request.permission_level,
                    invitation_message: invitation.message.clone(),
                },
            )?;
            Ok(grant.id)
        }
    }
}

pub fn cancel_invitation(
    conn: &mut PgConnection,
    id: Uuid,
    requesting_sender_id: i64,
) -> CollabResult<Invitation> {
    conn.transaction(|conn| {
        let invitation = store::find_for_update(conn, id)?;
        if invitation.sender_id != requesting_sender_id {
            return Err(CollabError::Forbidden(
                "only the sender can cancel an invitation",
            ));
        }
        if !invitation.is_pending() {
            return Err(CollabError::AlreadyResolved);
        }

        let updated = store::resolve(
            conn,
            id,
            InvitationStatus::Canceled,
            None,
            Utc::now().naive_utc(),
        )?;
        info!(invitation_id = %id, sender_id = requesting_sender_id, "invitation canceled");
        Ok(updated)
    })
}

/// Administrative hard delete; ignores the invitation's status.
pub fn delete_invitation(conn: &mut PgConnection, id: Uuid) -> CollabResult<()> {
    store::delete(conn, id)?;
    info!(invitation_id = %id, "invitation deleted");
    Ok(())
}
