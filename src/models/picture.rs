use serde::Serialize;

use super::user::UserView;

/// Snapshot of a picture's collaborative editing state.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditStatus {
    pub picture_id: String,
    pub editing: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserView>,
    pub watchers: usize,
}
