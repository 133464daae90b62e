//! Bounded per-agent memory
//!
//! Each agent owns one `AgentMemory`, handed to its handlers by `&mut`:
//! - Keyed slots for "remember the latest X" recall
//! - A bounded FIFO log of messages, evicting the oldest when full
//!
//! Memory is the only channel besides the current state that carries
//! information from one round to the next.

use crate::types::Message;
use std::collections::{BTreeMap, VecDeque};

/// Maximum number of logged messages (bounded storage guarantee)
pub const MAX_MEMORY_ENTRIES: usize = 100;

/// Private memory of one agent
#[derive(Debug, Clone)]
pub struct AgentMemory {
    /// Messages stored under a key, usually their purpose
    slots: BTreeMap<String, Message>,

    /// Circular buffer of logged messages (bounded by max_entries)
    log: VecDeque<Message>,

    /// Maximum allowed log entries
    max_entries: usize,
}

impl AgentMemory {
    /// Create memory with default log capacity
    pub fn new() -> Self {
        Self::with_capacity(MAX_MEMORY_ENTRIES)
    }

    /// Create memory with custom log capacity
    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            slots: BTreeMap::new(),
            log: VecDeque::with_capacity(max_entries.min(MAX_MEMORY_ENTRIES)),
            max_entries,
        }
    }

    /// Store `msg` under `key`, overwriting any previous value
    pub fn remember(&mut self, key: impl Into<String>, msg: Message) {
        self.slots.insert(key.into(), msg);
    }

    /// Store `msg` under `key` unless the slot is taken; returns whether it was stored
    pub fn remember_once(&mut self, key: impl Into<String>, msg: Message) -> bool {
        use std::collections::btree_map::Entry;

        match self.slots.entry(key.into()) {
            Entry::Vacant(slot) => {
                slot.insert(msg);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    pub fn recall(&self, key: &str) -> Option<&Message> {
        self.slots.get(key)
    }

    /// Remove and return the slot value
    pub fn take(&mut self, key: &str) -> Option<Message> {
        self.slots.remove(key)
    }

    pub fn clear_slots(&mut self) {
        self.slots.clear();
    }

    pub fn slot_keys(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(String::as_str)
    }

    /// Append to the log, evicting the oldest entry if at capacity
    ///
    /// # Complexity
    /// - O(1) amortized push_back, O(1) pop_front eviction
    pub fn record(&mut self, msg: Message) {
        if self.max_entries == 0 {
            return;
        }
        if self.log.len() >= self.max_entries {
            self.log.pop_front();
        }
        self.log.push_back(msg);
    }

    pub fn log(&self) -> &VecDeque<Message> {
        &self.log
    }

    /// Most recently logged message
    pub fn last(&self) -> Option<&Message> {
        self.log.back()
    }

    /// Number of logged messages
    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty() && self.slots.is_empty()
    }

    /// Drop slots and log
    pub fn clear(&mut self) {
        self.slots.clear();
        self.log.clear();
    }
}

impl Default for AgentMemory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(n: usize) -> Message {
        Message::response(vec![format!("item{}", n)])
    }

    #[test]
    fn test_bounded_capacity() {
        let mut memory = AgentMemory::with_capacity(5);

        for i in 0..10 {
            memory.record(response(i));
        }

        assert_eq!(memory.len(), 5);
        assert_eq!(memory.last(), Some(&response(9)));
    }

    #[test]
    fn test_fifo_eviction() {
        let mut memory = AgentMemory::with_capacity(3);

        memory.record(response(1));
        memory.record(response(2));
        memory.record(response(3));
        memory.record(response(4)); // evicts 1

        assert_eq!(memory.len(), 3);
        assert_eq!(memory.log()[0], response(2));
        assert_eq!(memory.log()[2], response(4));
    }

    #[test]
    fn test_remember_once_keeps_first() {
        let mut memory = AgentMemory::new();

        assert!(memory.remember_once("elements", Message::elements(["a"])));
        assert!(!memory.remember_once("elements", Message::elements(["b"])));
        assert_eq!(memory.recall("elements"), Some(&Message::elements(["a"])));

        memory.remember("elements", Message::elements(["c"]));
        assert_eq!(memory.recall("elements"), Some(&Message::elements(["c"])));
    }

    #[test]
    fn test_take_and_clear_slots() {
        let mut memory = AgentMemory::new();
        memory.remember("elements", Message::elements(["a"]));
        memory.remember("function", Message::function(Default::default()));

        assert!(memory.take("elements").is_some());
        assert!(memory.recall("elements").is_none());
        assert_eq!(memory.slot_keys().collect::<Vec<_>>(), vec!["function"]);

        memory.clear_slots();
        assert!(memory.is_empty());
    }
}
