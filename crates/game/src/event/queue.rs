use std::collections::VecDeque;

use super::types::GameEvent;

#[derive(Debug, Clone, PartialEq)]
pub struct PendingEvent {
    pub tick: u32,
    pub sequence: u32,
    pub event: GameEvent,
}

#[derive(Debug)]
pub struct EventQueue {
    pending: VecDeque<PendingEvent>,
    next_sequence: u32,
    max_pending: usize,
}

impl EventQueue {
    pub fn new(max_pending: usize) -> Self {
        Self {
            pending: VecDeque::with_capacity(max_pending),
            next_sequence: 0,
            max_pending: max_pending.max(1),
        }
    }

    pub fn push(&mut self, tick: u32, event: GameEvent) -> u32 {
        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.wrapping_add(1);

        if self.pending.len() >= self.max_pending {
            if let Some(evicted) = self.pending.pop_front() {
                log::warn!("event queue full, dropping {:?}", evicted.event);
            }
        }

        self.pending.push_back(PendingEvent {
            tick,
            sequence,
            event,
        });

        sequence
    }

    pub fn drain(&mut self) -> impl Iterator<Item = PendingEvent> + '_ {
        self.pending.drain(..)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingEvent> {
        self.pending.iter()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
