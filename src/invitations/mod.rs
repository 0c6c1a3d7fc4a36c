//! Invitations: requests to follow a user or to collaborate on a board.
//!
//! Storage keeps the legacy nullable `reference_id` / `permission_level`
//! columns; everything above [`store`] works with [`InvitationPayload`], so a
//! CONNECTION invitation cannot carry board data and a BOARD_COLLABORATION
//! invitation cannot lack it.

use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::collaborations::PermissionLevel;
use crate::error::{CollabError, CollabResult, UnknownVariant};
use crate::models::InvitationRow;

pub mod coordinator;
pub mod store;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvitationType {
    Connection,
    BoardCollaboration,
}

impl InvitationType {
    pub fn as_str(self) -> &'static str {
        match self {
            InvitationType::Connection => "CONNECTION",
            InvitationType::BoardCollaboration => "BOARD_COLLABORATION",
        }
    }
}

impl FromStr for InvitationType {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "CONNECTION" => Ok(InvitationType::Connection),
            "BOARD_COLLABORATION" => Ok(InvitationType::BoardCollaboration),
            other => Err(UnknownVariant::new("invitation type", other)),
        }
    }
}

/// PENDING is the only initial state and every other state is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Declined,
    Ignored,
    Canceled,
    Expired,
}

impl InvitationStatus {
    pub fn is_terminal(self) -> bool {
        self != InvitationStatus::Pending
    }

    pub fn as_str(self) -> &'static str {
        match self {
            InvitationStatus::Pending => "PENDING",
            InvitationStatus::Accepted => "ACCEPTED",
            InvitationStatus::Declined => "DECLINED",
            InvitationStatus::Ignored => "IGNORED",
            InvitationStatus::Canceled => "CANCELED",
            InvitationStatus::Expired => "EXPIRED",
        }
    }
}

impl FromStr for InvitationStatus {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "PENDING" => Ok(InvitationStatus::Pending),
            "ACCEPTED" => Ok(InvitationStatus::Accepted),
            "DECLINED" => Ok(InvitationStatus::Declined),
            "IGNORED" => Ok(InvitationStatus::Ignored),
            "CANCELED" => Ok(InvitationStatus::Canceled),
            "EXPIRED" => Ok(InvitationStatus::Expired),
            other => Err(UnknownVariant::new("invitation status", other)),
        }
    }
}

/// The outcomes a recipient can choose. Cancellation and expiry have their
/// own paths and are not valid responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseStatus {
    Accepted,
    Declined,
    Ignored,
}

impl From<ResponseStatus> for InvitationStatus {
    fn from(value: ResponseStatus) -> Self {
        match value {
            ResponseStatus::Accepted => InvitationStatus::Accepted,
            ResponseStatus::Declined => InvitationStatus::Declined,
            ResponseStatus::Ignored => InvitationStatus::Ignored,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollaborationRequest {
    pub board_id: i64,
    pub permission_level: PermissionLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvitationPayload {
    Connection,
    BoardCollaboration(CollaborationRequest),
}

impl InvitationPayload {
    /// Builds a payload from the nullable request/storage shape, rejecting
    /// combinations that do not fit the type.
    pub fn from_parts(
        invitation_type: InvitationType,
        reference_id: Option<i64>,
        permission_level: Option<PermissionLevel>,
    ) -> CollabResult<Self> {
        match (invitation_type, reference_id, permission_level) {
            (InvitationType::Connection, None, None) => Ok(InvitationPayload::Connection),
            (InvitationType::Connection, Some(_), _) => Err(CollabError::invalid(
                "connection invitations must not carry a reference_id",
            )),
            (InvitationType::Connection, None, Some(_)) => Err(CollabError::invalid(
                "connection invitations must not carry a permission_level",
            )),
            (InvitationType::BoardCollaboration, Some(board_id), Some(permission_level)) => {
                Ok(InvitationPayload::BoardCollaboration(CollaborationRequest {
                    board_id,
                    permission_level,
                }))
            }
            (InvitationType::BoardCollaboration, None, _) => Err(CollabError::invalid(
                "board collaboration invitations require a reference_id (board id)",
            )),
            (InvitationType::BoardCollaboration, Some(_), None) => Err(CollabError::invalid(
                "board collaboration invitations require a permission_level",
            )),
        }
    }

    pub fn invitation_type(&self) -> InvitationType {
        match self {
            InvitationPayload::Connection => InvitationType::Connection,
            InvitationPayload::BoardCollaboration(_) => InvitationType::BoardCollaboration,
        }
    }

    pub fn reference_id(&self) -> Option<i64> {
        match self {
            InvitationPayload::Connection => None,
            InvitationPayload::BoardCollaboration(request) => Some(request.board_id),
        }
    }

    pub fn permission_level(&self) -> Option<PermissionLevel> {
        match self {
            InvitationPayload::Connection => None,
            InvitationPayload::BoardCollaboration(request) => Some(request.permission_level),
        }
    }
}

/// A validated invitation ready for insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInvitation {
    pub sender_id: i64,
    pub recipient_id: i64,
    pub payload: InvitationPayload,
    pub message: Option<String>,
}

impl NewInvitation {
    pub fn new(
        sender_id: i64,
        recipient_id: i64,
        invitation_type: InvitationType,
        reference_id: Option<i64>,
        message: Option<String>,
        permission_level: Option<PermissionLevel>,
    ) -> CollabResult<Self> {
        let payload = InvitationPayload::from_parts(invitation_type, reference_id, permission_level)?;
        Ok(Self {
            sender_id,
            recipient_id,
            payload,
            message,
        })
    }

    pub fn connection(sender_id: i64, recipient_id: i64, message: Option<String>) -> Self {
        Self {
            sender_id,
            recipient_id,
            payload: InvitationPayload::Connection,
            message,
        }
    }

    pub fn board_collaboration(
        sender_id: i64,
        recipient_id: i64,
        board_id: i64,
        permission_level: PermissionLevel,
        message: Option<String>,
    ) -> Self {
        Self {
            sender_id,
            recipient_id,
            payload: InvitationPayload::BoardCollaboration(CollaborationRequest {
                board_id,
                permission_level,
            }),
            message,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invitation {
    pub id: Uuid,
    pub sender_id: i64,
    pub recipient_id: i64,
    pub payload: InvitationPayload,
    pub status: InvitationStatus,
    pub message: Option<String>,
    pub response_message: Option<String>,
    pub responded_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Invitation {
    pub fn invitation_type(&self) -> InvitationType {
        self.payload.invitation_type()
    }

    pub fn is_pending(&self) -> bool {
        self.status == InvitationStatus::Pending
    }
}

impl TryFrom<InvitationRow> for Invitation {
    type Error = CollabError;

    fn try_from(row: InvitationRow) -> Result<Self, Self::Error> {
        let invitation_type: InvitationType = row.invitation_type.parse()?;
        let permission_level = row
            .permission_level
            .as_deref()
            .map(str::parse::<PermissionLevel>)
            .transpose()?;
        let payload = InvitationPayload::from_parts(invitation_type, row.reference_id, permission_level)
            .map_err(|err| CollabError::CorruptRecord(format!("invitation {}: {err}", row.id)))?;

        Ok(Self {
            id: row.id,
            sender_id: row.sender_id,
            recipient_id: row.recipient_id,
            payload,
            status: row.status.parse()?,
            message: row.message,
            response_message: row.response_message,
            responded_at: row.responded_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
