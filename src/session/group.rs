//! Insertion-ordered registry owning all shell sessions.

use std::collections::HashMap;

use crate::pattern;

use super::{SessionId, SessionState, ShellSession};

/// Result of resolving a pattern against the group.
#[derive(Debug, Clone, Default)]
pub struct Resolved {
    /// Matched session ids, in insertion order.
    pub ids: Vec<SessionId>,
    /// Literal pattern tokens that matched nothing.
    pub unmatched: Vec<String>,
}

/// Active/dead/total counts for `:list` and prompt rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupCounts {
    pub active: usize,
    pub dead: usize,
    pub total: usize,
}

/// Ordered registry of sessions.
///
/// Invariant: the rendered `(display_name, index)` pair is unique among
/// registered sessions; `renumber` restores it after every membership
/// or naming mutation.
#[derive(Default)]
pub struct ShellGroup {
    sessions: Vec<ShellSession>,
}

impl ShellGroup {
    /// Create a new empty group.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a session, assigning a disambiguation index if its name
    /// collides with an existing one. Returns the new session's id.
    pub fn add(&mut self, session: ShellSession) -> SessionId {
        let id = session.id;
        self.sessions.push(session);
        self.renumber();
        id
    }

    /// Number of registered sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether the group is empty.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Get a session by id.
    pub fn get(&self, id: SessionId) -> Option<&ShellSession> {
        self.sessions.iter().find(|s| s.id == id)
    }

    /// Get a session mutably by id.
    pub fn get_mut(&mut self, id: SessionId) -> Option<&mut ShellSession> {
        self.sessions.iter_mut().find(|s| s.id == id)
    }

    /// Iterate sessions in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &ShellSession> {
        self.sessions.iter()
    }

    /// Iterate sessions mutably in insertion order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ShellSession> {
        self.sessions.iter_mut()
    }

    /// Rendered names in insertion order, for pattern matching and
    /// completion.
    pub fn rendered_names(&self) -> Vec<String> {
        self.sessions.iter().map(|s| s.rendered_name()).collect()
    }

    /// Point-in-time snapshot of broadcast-eligible session ids.
    pub fn active_ids(&self) -> Vec<SessionId> {
        self.sessions
            .iter()
            .filter(|s| s.state.is_broadcast_eligible())
            .map(|s| s.id)
            .collect()
    }

    /// Resolve a pattern to a subset of sessions.
    pub fn resolve(&self, pattern: &str) -> Resolved {
        let names = self.rendered_names();
        let selection = pattern::select(&names, pattern);
        Resolved {
            ids: selection
                .indices
                .iter()
                .map(|&i| self.sessions[i].id)
                .collect(),
            unmatched: selection.unmatched,
        }
    }

    /// Toggle matched sessions into the Active state.
    ///
    /// Dead sessions are skipped: only `:reconnect` revives them,
    /// since Active implies a usable connection.
    pub fn enable(&mut self, pattern: &str) -> Resolved {
        let resolved = self.resolve(pattern);
        for id in &resolved.ids {
            if let Some(session) = self.get_mut(*id) {
                if !session.state.is_dead() {
                    session.state.transition_to(SessionState::Active);
                }
            }
        }
        resolved
    }

    /// Toggle matched sessions into the Disabled state.
    pub fn disable(&mut self, pattern: &str) -> Resolved {
        let resolved = self.resolve(pattern);
        for id in &resolved.ids {
            if let Some(session) = self.get_mut(*id) {
                session.state.transition_to(SessionState::Disabled);
            }
        }
        resolved
    }

    /// Rename matched sessions, then restore index disambiguation.
    pub fn rename(&mut self, pattern: &str, new_name: &str) -> Resolved {
        let resolved = self.resolve(pattern);
        for id in &resolved.ids {
            if let Some(session) = self.get_mut(*id) {
                session.display_name = new_name.to_string();
            }
        }
        self.renumber();
        resolved
    }

    /// Drop all dead sessions, renumbering survivors' indices.
    /// Returns the number of sessions removed. Idempotent.
    pub fn purge(&mut self) -> usize {
        let before = self.sessions.len();
        for session in self.sessions.iter_mut().filter(|s| s.state.is_dead()) {
            session.close();
        }
        self.sessions.retain(|s| !s.state.is_dead());
        self.renumber();
        before - self.sessions.len()
    }

    /// Counts over the whole group.
    pub fn counts(&self) -> GroupCounts {
        self.counts_over(self.sessions.iter())
    }

    /// Counts restricted to the given ids.
    pub fn counts_for(&self, ids: &[SessionId]) -> GroupCounts {
        self.counts_over(self.sessions.iter().filter(|s| ids.contains(&s.id)))
    }

    fn counts_over<'a>(&self, sessions: impl Iterator<Item = &'a ShellSession>) -> GroupCounts {
        let mut counts = GroupCounts {
            active: 0,
            dead: 0,
            total: 0,
        };
        for session in sessions {
            counts.total += 1;
            match session.state {
                SessionState::Active => counts.active += 1,
                SessionState::Dead => counts.dead += 1,
                SessionState::Disabled => {}
            }
        }
        counts
    }

    /// Reassign `#index` suffixes: per display name in insertion order,
    /// the first occurrence carries no suffix, duplicates get #1, #2...
    fn renumber(&mut self) {
        let mut seen: HashMap<String, u32> = HashMap::new();
        for session in &mut self.sessions {
            let n = seen.entry(session.display_name.clone()).or_insert(0);
            session.index = if *n == 0 { None } else { Some(*n) };
            *n += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::shell::testing::MockConnection;

    fn group_of(hosts: &[&str]) -> ShellGroup {
        let mut group = ShellGroup::new();
        for host in hosts {
            group.add(ShellSession::new(SessionId::new(), *host, MockConnection::boxed()));
        }
        group
    }

    #[test]
    fn test_duplicate_names_get_indices() {
        let group = group_of(&["localhost", "localhost", "localhost"]);
        assert_eq!(
            group.rendered_names(),
            vec!["localhost", "localhost#1", "localhost#2"]
        );
    }

    #[test]
    fn test_distinct_names_unsuffixed() {
        let group = group_of(&["web", "db"]);
        assert_eq!(group.rendered_names(), vec!["web", "db"]);
    }

    #[test]
    fn test_resolve_literal_and_glob() {
        let group = group_of(&["localhost", "localhost", "remote"]);

        let resolved = group.resolve("localhost");
        assert_eq!(resolved.ids.len(), 1);

        let resolved = group.resolve("localhost#*");
        assert_eq!(resolved.ids.len(), 1);

        let resolved = group.resolve("*");
        assert_eq!(resolved.ids.len(), 3);
    }

    #[test]
    fn test_resolve_unmatched_token_reported() {
        let group = group_of(&["localhost"]);
        let resolved = group.resolve("local* not_found");
        assert_eq!(resolved.ids.len(), 1);
        assert_eq!(resolved.unmatched, vec!["not_found".to_string()]);
    }

    #[test]
    fn test_resolve_empty_group() {
        let group = ShellGroup::new();
        let resolved = group.resolve("*");
        assert!(resolved.ids.is_empty());
        assert!(resolved.unmatched.is_empty());
    }

    #[test]
    fn test_disable_enable_roundtrip() {
        let mut group = group_of(&["a", "b", "c"]);
        assert_eq!(group.counts().active, 3);

        group.disable("*");
        assert_eq!(group.counts().active, 0);

        group.enable("*");
        assert_eq!(group.counts().active, 3);
    }

    #[test]
    fn test_enable_skips_dead_sessions() {
        let mut group = group_of(&["a", "b"]);
        let dead_id = group.resolve("a").ids[0];
        group.get_mut(dead_id).unwrap().mark_dead();

        group.enable("*");
        let counts = group.counts();
        assert_eq!(counts.active, 1);
        assert_eq!(counts.dead, 1);
    }

    #[test]
    fn test_purge_drops_dead_and_renumbers() {
        let mut group = group_of(&["localhost", "localhost", "localhost"]);
        // Kill the middle session (localhost#1).
        let dead_id = group.resolve("localhost#1").ids[0];
        group.get_mut(dead_id).unwrap().mark_dead();

        let removed = group.purge();
        assert_eq!(removed, 1);
        assert_eq!(group.rendered_names(), vec!["localhost", "localhost#1"]);
    }

    #[test]
    fn test_purge_is_idempotent() {
        let mut group = group_of(&["a", "b"]);
        let dead_id = group.resolve("a").ids[0];
        group.get_mut(dead_id).unwrap().mark_dead();

        group.purge();
        let counts_after_first = group.counts();
        let removed = group.purge();
        assert_eq!(removed, 0);
        assert_eq!(group.counts(), counts_after_first);
    }

    #[test]
    fn test_rename_preserves_disambiguation() {
        let mut group = group_of(&["localhost", "localhost"]);
        group.rename("*", "newname");
        assert_eq!(group.rendered_names(), vec!["newname", "newname#1"]);
    }

    #[test]
    fn test_counts() {
        let mut group = group_of(&["a", "b", "c"]);
        group.disable("b");
        let dead_id = group.resolve("c").ids[0];
        group.get_mut(dead_id).unwrap().mark_dead();

        let counts = group.counts();
        assert_eq!(counts.active, 1);
        assert_eq!(counts.dead, 1);
        assert_eq!(counts.total, 3);
    }

    #[test]
    fn test_counts_for_subset() {
        let group = group_of(&["a", "b"]);
        let ids = group.resolve("a").ids;
        let counts = group.counts_for(&ids);
        assert_eq!(counts.total, 1);
        assert_eq!(counts.active, 1);
    }

    #[test]
    fn test_active_ids_snapshot() {
        let mut group = group_of(&["a", "b"]);
        group.disable("a");
        let ids = group.active_ids();
        assert_eq!(ids.len(), 1);
        assert_eq!(group.get(ids[0]).unwrap().display_name, "b");
    }
}
