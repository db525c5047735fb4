use serde::{Deserialize, Serialize};

/// Identity attached to a connection once, at upgrade time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub id: i64,
    pub display_name: String,
}

impl UserIdentity {
    pub fn new(id: i64, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
        }
    }
}

/// Public view of a user as it appears in outbound frames.
///
/// The id is carried as a string so 64-bit ids survive JavaScript clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: String,
    pub display_name: String,
}

impl From<&UserIdentity> for UserView {
    fn from(user: &UserIdentity) -> Self {
        Self {
            id: user.id.to_string(),
            display_name: user.display_name.clone(),
        }
    }
}
