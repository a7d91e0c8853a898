use std::collections::VecDeque;
use std::fmt;

use crate::{Handle, SpawnPriority, SpawnRequest};

/// Pending spawn requests of one pool, ordered for processing.
///
/// The queue is kept sorted by descending priority. Requests of equal priority keep the order in
/// which they were inserted. [`Critical`][SpawnPriority::Critical] requests never enter a queue.
///
/// Insertion is a linear scan, which is adequate for the queue lengths of a single pool.
pub struct SpawnQueue<O, P> {
    requests: VecDeque<SpawnRequest<O, P>>,
}

impl<O, P> SpawnQueue<O, P> {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            requests: VecDeque::new(),
        }
    }

    /// Inserts a request at the position its priority dictates.
    ///
    /// `Normal` requests are appended. `High` and `Medium` requests are placed after every
    /// request of the same or higher priority and before the first request of lower priority.
    ///
    /// # Panics
    ///
    /// Panics if the request has [`Critical`][SpawnPriority::Critical] priority. Such requests
    /// are processed immediately and must never be queued.
    pub fn insert(&mut self, request: SpawnRequest<O, P>) {
        match request.priority() {
            SpawnPriority::Critical => {
                panic!(
                    "critical spawn request {} must be processed immediately, not queued",
                    request.handle()
                );
            }
            SpawnPriority::High | SpawnPriority::Medium => {
                let index = self.insertion_index(request.priority());
                self.requests.insert(index, request);
            }
            SpawnPriority::Normal => {
                self.requests.push_back(request);
            }
        }
    }

    // One past the last element whose priority is greater than or equal to `priority`.
    fn insertion_index(&self, priority: SpawnPriority) -> usize {
        self.requests
            .iter()
            .position(|queued| queued.priority() < priority)
            .unwrap_or(self.requests.len())
    }

    /// Removes and returns the oldest request of the highest priority, if any.
    pub fn dequeue(&mut self) -> Option<SpawnRequest<O, P>> {
        self.requests.pop_front()
    }

    /// Removes and returns the request with the given handle, keeping the order of the rest.
    ///
    /// Returns `None` and leaves the queue untouched if no queued request has the handle. This
    /// is the normal outcome for a request that was already processed.
    pub fn dequeue_by_handle(&mut self, handle: Handle) -> Option<SpawnRequest<O, P>> {
        let index = self
            .requests
            .iter()
            .position(|request| request.handle() == handle)?;

        self.requests.remove(index)
    }

    /// Whether a request with the given handle is queued.
    #[must_use]
    pub fn contains(&self, handle: Handle) -> bool {
        self.requests.iter().any(|request| request.handle() == handle)
    }

    /// The number of queued requests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    /// Whether the queue has no requests.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Iterates over the queued requests in processing order.
    pub fn iter(&self) -> impl Iterator<Item = &SpawnRequest<O, P>> {
        self.requests.iter()
    }

    /// The handles of the queued requests in processing order.
    #[must_use]
    pub fn handles(&self) -> Vec<Handle> {
        self.requests.iter().map(SpawnRequest::handle).collect()
    }

    /// Removes every queued request, returning them in processing order.
    pub fn drain(&mut self) -> Vec<SpawnRequest<O, P>> {
        self.requests.drain(..).collect()
    }
}

impl<O, P> Default for SpawnQueue<O, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O, P> fmt::Debug for SpawnQueue<O, P> {
    #[cfg_attr(test, mutants::skip)] // No API contract.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(
                self.requests
                    .iter()
                    .map(|request| (request.priority(), request.handle())),
            )
            .finish()
    }
}
