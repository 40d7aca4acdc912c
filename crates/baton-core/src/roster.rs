//! Ordered, duplicate-free participant list. Insertion order is turn order.
//!
//! Membership checks are O(1). Removal and position lookups scan the order
//! vector, which stays small for a hand-sized group of participants.

use std::collections::HashSet;

pub type ParticipantId = String;

#[derive(Debug, Clone, Default)]
pub struct Roster {
    order: Vec<ParticipantId>,
    members: HashSet<ParticipantId>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.members.contains(id)
    }

    /// Append at the back of the queue. Returns false if already present.
    pub fn insert(&mut self, id: ParticipantId) -> bool {
        if !self.members.insert(id.clone()) {
            return false;
        }
        self.order.push(id);
        true
    }

    /// Remove, shifting everyone behind it forward. Returns false if absent.
    pub fn remove(&mut self, id: &str) -> bool {
        if !self.members.remove(id) {
            return false;
        }
        self.order.retain(|p| p != id);
        true
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        if !self.members.contains(id) {
            return None;
        }
        self.order.iter().position(|p| p == id)
    }

    pub fn first(&self) -> Option<&ParticipantId> {
        self.order.first()
    }

    /// The participant after `id` in turn order, wrapping to the front.
    ///
    /// Falls back to the front of the queue when `id` is not on the roster.
    pub fn next_after(&self, id: &str) -> Option<&ParticipantId> {
        match self.position(id) {
            Some(idx) => self.order.get((idx + 1) % self.order.len()),
            None => self.order.first(),
        }
    }

    pub fn to_vec(&self) -> Vec<ParticipantId> {
        self.order.clone()
    }
}
