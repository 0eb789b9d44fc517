//! Contacts reported by the sensing source, consumed once per tick.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::target::TargetId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum ContactKind {
    Checkpoint(usize),
    Target(TargetId),
    Wall(usize),
    Hazard(usize),
}

#[derive(Clone, Debug, Default)]
pub struct EventQueue {
    pending: VecDeque<ContactKind>,
}

impl EventQueue {
    pub fn push(&mut self, contact: ContactKind) {
        self.pending.push_back(contact);
    }

    pub fn pop(&mut self) -> Option<ContactKind> {
        self.pending.pop_front()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
