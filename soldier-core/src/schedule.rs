//! Delayed one-shot events tied to the episode that scheduled them.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EpisodeId(pub u32);

impl EpisodeId {
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Scheduled<T> {
    episode: EpisodeId,
    due_tick: u32,
    payload: T,
}

#[derive(Clone, Debug)]
pub struct DelayQueue<T> {
    pending: Vec<Scheduled<T>>,
}

impl<T> Default for DelayQueue<T> {
    fn default() -> Self {
        Self {
            pending: Vec::new(),
        }
    }
}

impl<T: Copy> DelayQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, episode: EpisodeId, due_tick: u32, payload: T) {
        self.pending.push(Scheduled {
            episode,
            due_tick,
            payload,
        });
    }

    /// Pops every entry due at or before `tick`, in scheduling order.
    ///
    /// Entries scheduled by any other episode are discarded without firing.
    pub fn drain_due(&mut self, episode: EpisodeId, tick: u32) -> Vec<T> {
        let mut fired = Vec::new();
        self.pending.retain(|entry| {
            if entry.episode != episode {
                return false;
            }
            if entry.due_tick <= tick {
                fired.push(entry.payload);
                return false;
            }
            true
        });
        fired
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_in_order_once_due() {
        let mut queue = DelayQueue::new();
        let ep = EpisodeId(3);
        queue.schedule(ep, 10, 'a');
        queue.schedule(ep, 5, 'b');
        queue.schedule(ep, 12, 'c');

        assert!(queue.drain_due(ep, 4).is_empty());
        assert_eq!(queue.drain_due(ep, 10), vec!['a', 'b']);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.drain_due(ep, 100), vec!['c']);
        assert!(queue.is_empty());
    }

    #[test]
    fn stale_episode_entries_never_fire() {
        let mut queue = DelayQueue::new();
        queue.schedule(EpisodeId(1), 5, 7u16);
        queue.schedule(EpisodeId(2), 50, 8u16);

        assert!(queue.drain_due(EpisodeId(2), 10).is_empty());
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.drain_due(EpisodeId(2), 50), vec![8]);
    }
}
