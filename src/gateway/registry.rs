use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;

use super::session::EditSession;

/// Watch groups: picture id -> sessions currently observing that picture.
///
/// A group exists only while at least one session is bound to it. All
/// mutations go through the map's entry API so a join or leave on one
/// picture never races with another on the same key, and unrelated
/// pictures only contend when they share a map shard.
#[derive(Default)]
pub struct SessionRegistry {
    groups: DashMap<i64, HashMap<String, Arc<EditSession>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a session to its picture's group. Returns the group size after the join.
    pub fn join(&self, session: Arc<EditSession>) -> usize {
        let mut group = self.groups.entry(session.picture_id).or_default();
        group.insert(session.session_id.clone(), session);
        group.len()
    }

    /// Remove a session, dropping the group when it becomes empty.
    pub fn leave(&self, picture_id: i64, session_id: &str) -> bool {
        match self.groups.entry(picture_id) {
            Entry::Occupied(mut group) => {
                let removed = group.get_mut().remove(session_id).is_some();
                if group.get().is_empty() {
                    group.remove();
                }
                removed
            }
            Entry::Vacant(_) => false,
        }
    }

    /// Snapshot of a group's sessions. The map guard is released before returning.
    pub fn members(&self, picture_id: i64) -> Vec<Arc<EditSession>> {
        self.groups
            .get(&picture_id)
            .map(|group| group.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn watcher_count(&self, picture_id: i64) -> usize {
        self.groups.get(&picture_id).map(|g| g.len()).unwrap_or(0)
    }

    pub fn contains(&self, picture_id: i64, session_id: &str) -> bool {
        self.groups
            .get(&picture_id)
            .is_some_and(|group| group.contains_key(session_id))
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }
}
