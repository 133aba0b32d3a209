//! Index-linked FIFO queue over the PCB table.
//!
//! Every PCB embeds one [`QueueNode`]; a queue is just a head/tail/len
//! triple of table slot indices. Linking by slot index instead of node
//! address keeps the "container_of" arithmetic of classic intrusive lists
//! out of the kernel entirely while preserving the O(1) contracts:
//! `put` appends at the tail, `get` pops the head, `remove` unlinks an
//! arbitrary member.
//!
//! A PCB may be a member of at most one queue at any instant. The queue
//! cannot enforce that globally; it asserts the local half of the invariant
//! (a node is never inserted twice) via the `linked` flag.

use crate::sched::pcb::{PcbTable, Slot};

/// Doubly-linked queue node embedded in each PCB.
#[derive(Clone, Copy, Debug)]
pub struct QueueNode {
    prev: Option<Slot>,
    next: Option<Slot>,
    linked: bool,
}

impl QueueNode {
    pub const fn new() -> Self {
        Self {
            prev: None,
            next: None,
            linked: false,
        }
    }

    fn reset(&mut self) {
        *self = Self::new();
    }

    /// Whether this node currently belongs to some queue.
    pub fn is_linked(&self) -> bool {
        self.linked
    }
}

impl Default for QueueNode {
    fn default() -> Self {
        Self::new()
    }
}

/// FIFO of PCB-table slots. Ordering is insertion order.
#[derive(Clone, Copy, Debug)]
pub struct FifoQueue {
    head: Option<Slot>,
    tail: Option<Slot>,
    len: usize,
}

impl FifoQueue {
    pub const fn new() -> Self {
        Self {
            head: None,
            tail: None,
            len: 0,
        }
    }

    /// Appends `slot` at the tail. O(1).
    pub fn put(&mut self, pcbs: &mut PcbTable, slot: Slot) {
        let node = pcbs.node_mut(slot);
        debug_assert!(!node.linked, "PCB slot {} already linked into a queue", slot);
        node.linked = true;
        node.prev = self.tail;
        node.next = None;

        match self.tail {
            Some(tail) => pcbs.node_mut(tail).next = Some(slot),
            None => self.head = Some(slot),
        }
        self.tail = Some(slot);
        self.len += 1;
    }

    /// Removes and returns the head slot, or `None` when empty. O(1).
    pub fn get(&mut self, pcbs: &mut PcbTable) -> Option<Slot> {
        let head = self.head?;
        let next = pcbs.node(head).next;

        self.head = next;
        match next {
            Some(slot) => pcbs.node_mut(slot).prev = None,
            None => self.tail = None,
        }
        pcbs.node_mut(head).reset();
        self.len -= 1;
        Some(head)
    }

    /// Returns the head slot without removing it. O(1).
    pub fn peek(&self) -> Option<Slot> {
        self.head
    }

    /// Unlinks `slot` from anywhere in the queue.
    ///
    /// Membership is verified by walking the links first, so a slot that is
    /// linked into a *different* queue is left untouched and `false` is
    /// returned. O(n) for the verification, O(1) for the unlink itself.
    pub fn remove(&mut self, pcbs: &mut PcbTable, slot: Slot) -> bool {
        if !self.contains(pcbs, slot) {
            return false;
        }

        let QueueNode { prev, next, .. } = *pcbs.node(slot);
        match prev {
            Some(p) => pcbs.node_mut(p).next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => pcbs.node_mut(n).prev = prev,
            None => self.tail = prev,
        }
        pcbs.node_mut(slot).reset();
        self.len -= 1;
        true
    }

    /// Whether `slot` is a member of this queue. O(n).
    pub fn contains(&self, pcbs: &PcbTable, slot: Slot) -> bool {
        let mut cursor = self.head;
        while let Some(current) = cursor {
            if current == slot {
                return true;
            }
            cursor = pcbs.node(current).next;
        }
        false
    }

    /// Empties the queue, resetting every member node. O(n).
    pub fn clear(&mut self, pcbs: &mut PcbTable) {
        while self.get(pcbs).is_some() {}
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Default for FifoQueue {
    fn default() -> Self {
        Self::new()
    }
}
