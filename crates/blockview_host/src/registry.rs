//! Preview sessions keyed by the panel that hosts them.

use std::collections::BTreeMap;
use std::fmt;

/// Identity of a host panel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PanelId(pub u32);

impl fmt::Display for PanelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "panel#{}", self.0)
    }
}

/// Explicit creation, lookup and disposal of per-panel sessions.
pub struct SessionRegistry<S> {
    sessions: BTreeMap<PanelId, S>,
}

impl<S> SessionRegistry<S> {
    pub fn new() -> Self {
        Self {
            sessions: BTreeMap::new(),
        }
    }

    /// Return the session for `panel`, creating it with `create` if needed.
    /// The flag is `true` when a new session was created.
    pub fn open_or_reveal(&mut self, panel: PanelId, create: impl FnOnce() -> S) -> (&mut S, bool) {
        let mut created = false;
        let session = self.sessions.entry(panel).or_insert_with(|| {
            created = true;
            create()
        });
        (session, created)
    }

    pub fn get(&self, panel: PanelId) -> Option<&S> {
        self.sessions.get(&panel)
    }

    pub fn get_mut(&mut self, panel: PanelId) -> Option<&mut S> {
        self.sessions.get_mut(&panel)
    }

    /// Remove and return the session. Disposing an unknown panel is a no-op.
    pub fn dispose(&mut self, panel: PanelId) -> Option<S> {
        self.sessions.remove(&panel)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (PanelId, &mut S)> {
        self.sessions.iter_mut().map(|(panel, session)| (*panel, session))
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl<S> Default for SessionRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_then_reveal() {
        let mut registry = SessionRegistry::new();

        let (session, created) = registry.open_or_reveal(PanelId(1), || "first");
        assert!(created);
        assert_eq!(*session, "first");

        let (session, created) = registry.open_or_reveal(PanelId(1), || "second");
        assert!(!created);
        assert_eq!(*session, "first");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_panels_are_independent() {
        let mut registry = SessionRegistry::new();
        registry.open_or_reveal(PanelId(1), || 10);
        registry.open_or_reveal(PanelId(2), || 20);

        *registry.get_mut(PanelId(2)).unwrap() += 1;
        assert_eq!(registry.get(PanelId(1)), Some(&10));
        assert_eq!(registry.get(PanelId(2)), Some(&21));
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let mut registry = SessionRegistry::new();
        registry.open_or_reveal(PanelId(7), || ());

        assert!(registry.dispose(PanelId(7)).is_some());
        assert!(registry.dispose(PanelId(7)).is_none());
        assert!(registry.is_empty());
    }
}
