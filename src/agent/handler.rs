//! Handler types and the route-keyed handler table
//!
//! Handlers are boxed closures registered at configuration time. The table
//! keeps first-registration order, which decides which send handler wins
//! when several routes match.

use crate::agent::memory::AgentMemory;
use crate::agent::route::{EventLabel, Route, StateName};
use crate::types::Message;

/// Produces at most one outbound message per round
pub type SendHandler = Box<dyn FnMut(&mut AgentMemory) -> anyhow::Result<Option<Message>>>;

/// Consumes one inbound message, optionally reporting a transition event
pub type ReceiveHandler =
    Box<dyn FnMut(&mut AgentMemory, &Message) -> anyhow::Result<Option<EventLabel>>>;

/// Reports the state the orchestrator should route on
pub type StateUploader = Box<dyn Fn(Option<&StateName>, &AgentMemory) -> Option<StateName>>;

/// Observes a freshly committed state
pub type StateDownloader = Box<dyn FnMut(&StateName, &mut AgentMemory)>;

/// Ordered mapping from route to handler
pub struct HandlerTable<H> {
    entries: Vec<(Route, H)>,
}

impl<H> HandlerTable<H> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Insert or replace the handler for `route`
    ///
    /// A replaced handler keeps its original position.
    pub fn insert(&mut self, route: Route, handler: H) {
        match self.entries.iter_mut().find(|(r, _)| *r == route) {
            Some(entry) => entry.1 = handler,
            None => self.entries.push((route, handler)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.entries.iter().map(|(r, _)| r)
    }

    /// First handler active under `current`
    pub fn first_active(&mut self, current: Option<&StateName>) -> Option<&mut H> {
        self.entries
            .iter_mut()
            .find(|(route, _)| route.matches(current))
            .map(|(_, handler)| handler)
    }

    /// Every handler active under `current`, in registration order
    pub fn active(&mut self, current: Option<&StateName>) -> impl Iterator<Item = &mut H> {
        let current = current.cloned();
        self.entries
            .iter_mut()
            .filter(move |(route, _)| route.matches(current.as_ref()))
            .map(|(_, handler)| handler)
    }
}

impl<H> Default for HandlerTable<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> std::fmt::Debug for HandlerTable<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.routes()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_preserves_order_and_replaces_in_place() {
        let mut table: HandlerTable<u8> = HandlerTable::new();
        table.insert(Route::named("Start"), 1);
        table.insert(Route::Wildcard, 2);
        table.insert(Route::named("Start"), 3);

        assert_eq!(table.len(), 2);
        let routes: Vec<_> = table.routes().cloned().collect();
        assert_eq!(routes, vec![Route::named("Start"), Route::Wildcard]);

        let start = StateName::new("Start");
        assert_eq!(table.first_active(Some(&start)).copied(), Some(3));
    }

    #[test]
    fn test_active_filters_by_state() {
        let mut table: HandlerTable<u8> = HandlerTable::new();
        table.insert(Route::named("Ready"), 1);
        table.insert(Route::Wildcard, 2);
        table.insert(Route::named("Waiting"), 3);

        let ready = StateName::new("Ready");
        let active: Vec<u8> = table.active(Some(&ready)).map(|h| *h).collect();
        assert_eq!(active, vec![1, 2]);

        let unrouted: Vec<u8> = table.active(None).map(|h| *h).collect();
        assert_eq!(unrouted, vec![2]);
    }

    #[test]
    fn test_first_active_none_when_nothing_matches() {
        let mut table: HandlerTable<u8> = HandlerTable::new();
        table.insert(Route::named("Ready"), 1);
        assert!(table.first_active(Some(&StateName::new("Start"))).is_none());
        assert!(table.first_active(None).is_none());
    }
}
