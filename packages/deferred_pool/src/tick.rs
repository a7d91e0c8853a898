use std::collections::VecDeque;
use std::mem;

use crate::TypeTag;

/// Delivers deferred work to the next tick of the host loop.
///
/// A pool calls [`schedule_next_tick()`][Self::schedule_next_tick] when requests start waiting
/// in its spawn queue. The host must then, once, on its next tick and on the same thread that
/// mutates the pools, deliver that tick to the pool through
/// [`PoolRegistry::on_next_tick()`][crate::PoolRegistry::on_next_tick].
///
/// A pool never asks for a second tick while one is already pending.
#[cfg_attr(test, mockall::automock)]
pub trait NextTick {
    /// Requests one future tick for the pool of the given type.
    fn schedule_next_tick(&mut self, type_tag: TypeTag);
}

/// A [`NextTick`] that records the pools awaiting a tick, for hosts that poll.
///
/// This is the default tick source of [`PoolRegistry`][crate::PoolRegistry], whose
/// [`tick()`][crate::PoolRegistry::tick] delivers every pending tick.
///
/// # Example
///
/// ```
/// use deferred_pool::{NextTick, TickQueue, TypeTag};
///
/// let mut ticks = TickQueue::new();
/// ticks.schedule_next_tick(TypeTag::new("bullet"));
///
/// assert!(ticks.contains(TypeTag::new("bullet")));
/// assert_eq!(ticks.take_pending(), [TypeTag::new("bullet")]);
/// assert!(ticks.is_empty());
/// ```
#[derive(Debug, Default)]
pub struct TickQueue {
    pending: VecDeque<TypeTag>,
}

impl TickQueue {
    /// Creates an empty tick queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of pools awaiting a tick.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether no pool is awaiting a tick.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Whether the pool of the given type is awaiting a tick.
    #[must_use]
    pub fn contains(&self, type_tag: TypeTag) -> bool {
        self.pending.contains(&type_tag)
    }

    /// Removes and returns the pools awaiting a tick, in the order they asked for it.
    ///
    /// Ticks requested after this call belong to the following host tick.
    #[must_use]
    pub fn take_pending(&mut self) -> Vec<TypeTag> {
        mem::take(&mut self.pending).into()
    }
}

impl NextTick for TickQueue {
    fn schedule_next_tick(&mut self, type_tag: TypeTag) {
        self.pending.push_back(type_tag);
    }
}
