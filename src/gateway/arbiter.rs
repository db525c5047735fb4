use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::session::EditSession;
use crate::models::user::UserIdentity;

/// Current owner of a picture's edit token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditHolder {
    pub user: UserIdentity,
    pub session_id: String,
}

impl From<&EditSession> for EditHolder {
    fn from(session: &EditSession) -> Self {
        Self {
            user: session.user.clone(),
            session_id: session.session_id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acquire {
    /// The token was free and now belongs to the requester.
    Granted,
    /// The requester's user already holds the token.
    AlreadyHolding,
    HeldByOther(EditHolder),
}

/// Edit tokens: picture id -> exclusive editor.
///
/// Acquisition inserts into a vacant entry under the shard lock, so of two
/// racing requests exactly one observes the vacancy. Releases are
/// compare-and-remove against the expected holder.
#[derive(Default)]
pub struct EditArbiter {
    tokens: DashMap<i64, EditHolder>,
}

impl EditArbiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self, picture_id: i64, holder: EditHolder) -> Acquire {
        match self.tokens.entry(picture_id) {
            Entry::Vacant(slot) => {
                slot.insert(holder);
                Acquire::Granted
            }
            Entry::Occupied(current) if current.get().user.id == holder.user.id => {
                Acquire::AlreadyHolding
            }
            Entry::Occupied(current) => Acquire::HeldByOther(current.get().clone()),
        }
    }

    /// Release the token if `user_id` holds it.
    pub fn release(&self, picture_id: i64, user_id: i64) -> Option<EditHolder> {
        self.tokens
            .remove_if(&picture_id, |_, holder| holder.user.id == user_id)
            .map(|(_, holder)| holder)
    }

    /// Release the token if it was granted through `session_id`.
    pub fn release_session(&self, picture_id: i64, session_id: &str) -> Option<EditHolder> {
        self.tokens
            .remove_if(&picture_id, |_, holder| holder.session_id == session_id)
            .map(|(_, holder)| holder)
    }

    pub fn holder(&self, picture_id: i64) -> Option<EditHolder> {
        self.tokens.get(&picture_id).map(|h| h.clone())
    }

    pub fn is_held_by(&self, picture_id: i64, user_id: i64) -> bool {
        self.tokens
            .get(&picture_id)
            .is_some_and(|holder| holder.user.id == user_id)
    }

    pub fn held_count(&self) -> usize {
        self.tokens.len()
    }
}
