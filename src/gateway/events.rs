use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::session::EditSession;
use crate::models::user::{UserIdentity, UserView};

/// Inbound frame types a client may send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestType {
    EnterEdit,
    EditAction,
    ExitEdit,
    QueryStatus,
}

/// Outbound frame types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    Info,
    EnterEdit,
    EditAction,
    ExitEdit,
    CurrentEditStatus,
}

/// Edit operations the current editor can apply to a picture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EditAction {
    ZoomIn,
    ZoomOut,
    RotateLeft,
    RotateRight,
}

impl EditAction {
    pub fn from_value(value: &str) -> Option<Self> {
        match value {
            "ZOOM_IN" => Some(Self::ZoomIn),
            "ZOOM_OUT" => Some(Self::ZoomOut),
            "ROTATE_LEFT" => Some(Self::RotateLeft),
            "ROTATE_RIGHT" => Some(Self::RotateRight),
            _ => None,
        }
    }

    /// Human-readable description used in notices.
    pub fn text(self) -> &'static str {
        match self {
            Self::ZoomIn => "zoom in",
            Self::ZoomOut => "zoom out",
            Self::RotateLeft => "rotate left",
            Self::RotateRight => "rotate right",
        }
    }
}

/// Raw inbound frame as sent by the client.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditRequest {
    #[serde(rename = "type")]
    pub request_type: RequestType,
    pub edit_action: Option<String>,
    pub picture_id: Option<i64>,
}

impl EditRequest {
    pub fn decode(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Validate the frame against the connection's bound picture.
    ///
    /// Returns `None` for frames that target another picture and for
    /// `EDIT_ACTION` frames whose action is missing or unknown.
    pub fn into_kind(self, bound_picture_id: i64) -> Option<EditEventKind> {
        if self.picture_id.is_some_and(|id| id != bound_picture_id) {
            return None;
        }
        match self.request_type {
            RequestType::EnterEdit => Some(EditEventKind::Enter),
            RequestType::ExitEdit => Some(EditEventKind::Exit),
            RequestType::QueryStatus => Some(EditEventKind::QueryStatus),
            RequestType::EditAction => self
                .edit_action
                .as_deref()
                .and_then(EditAction::from_value)
                .map(EditEventKind::Action),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditEventKind {
    Enter,
    Action(EditAction),
    Exit,
    QueryStatus,
}

/// A decoded event travelling through the ingestion pipeline.
#[derive(Debug, Clone)]
pub struct EditEvent {
    pub picture_id: i64,
    pub session: Arc<EditSession>,
    pub kind: EditEventKind,
}

impl EditEvent {
    pub fn new(session: Arc<EditSession>, kind: EditEventKind) -> Self {
        Self {
            picture_id: session.picture_id,
            session,
            kind,
        }
    }
}

/// Outbound frame delivered to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditResponse {
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edit_action: Option<EditAction>,
}

impl EditResponse {
    fn new(message_type: MessageType, message: String, user: Option<&UserIdentity>) -> Self {
        Self {
            message_type,
            message,
            user: user.map(UserView::from),
            edit_action: None,
        }
    }

    pub fn joined(user: &UserIdentity) -> Self {
        Self::new(
            MessageType::Info,
            format!("user {} joined editing", user.display_name),
            Some(user),
        )
    }

    pub fn left(user: &UserIdentity) -> Self {
        Self::new(
            MessageType::Info,
            format!("user {} left editing", user.display_name),
            Some(user),
        )
    }

    pub fn enter_edit(user: &UserIdentity) -> Self {
        Self::new(
            MessageType::EnterEdit,
            format!("user {} started editing the picture", user.display_name),
            Some(user),
        )
    }

    /// Sent only to a requester when the token is already held.
    pub fn held_by(holder: &UserIdentity) -> Self {
        Self::new(
            MessageType::EnterEdit,
            format!("user {} is editing", holder.display_name),
            Some(holder),
        )
    }

    pub fn edit_action(user: &UserIdentity, action: EditAction) -> Self {
        let mut response = Self::new(
            MessageType::EditAction,
            format!("{} executed {}", user.display_name, action.text()),
            Some(user),
        );
        response.edit_action = Some(action);
        response
    }

    pub fn exit_edit(user: &UserIdentity) -> Self {
        Self::new(
            MessageType::ExitEdit,
            format!("user {} exited editing", user.display_name),
            Some(user),
        )
    }

    pub fn current_status(holder: Option<&UserIdentity>) -> Self {
        let message = match holder {
            Some(user) => format!("user {} is editing", user.display_name),
            None => "no one is editing".to_string(),
        };
        Self::new(MessageType::CurrentEditStatus, message, holder)
    }
}
