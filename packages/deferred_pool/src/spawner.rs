use std::fmt;
use std::num::NonZero;

use tracing::{debug, trace, warn};

use crate::{
    Factory, Handle, NextTick, PoolObject, PoolObjectData, PoolObjectState, SpawnPriority,
    SpawnQueue, SpawnRequest, TypeTag,
};

/// Whether a pool is waiting for a tick to process its spawn queue.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[expect(
    clippy::exhaustive_enums,
    reason = "a pool either waits for a tick or it does not"
)]
pub enum SchedulerState {
    /// No tick is pending. The next queued request will ask for one.
    #[default]
    Idle,

    /// One tick has been requested and not yet delivered.
    Armed,
}

/// The factory of a pool together with the spawn queue and scheduler that drive it.
pub(crate) struct Spawner<O: PoolObject<P>, P> {
    type_tag: TypeTag,
    factory: Box<dyn Factory<Object = O, Payload = P>>,
    queue: SpawnQueue<O, P>,
    state: SchedulerState,
}

impl<O, P> Spawner<O, P>
where
    O: PoolObject<P>,
{
    /// Creates a spawner with an empty queue.
    ///
    /// `state` is [`Armed`][SchedulerState::Armed] if a tick for the pool is already pending
    /// from an earlier spawner, so that the new one waits for it instead of asking again.
    pub(crate) fn new(
        type_tag: TypeTag,
        factory: Box<dyn Factory<Object = O, Payload = P>>,
        state: SchedulerState,
    ) -> Self {
        Self {
            type_tag,
            factory,
            queue: SpawnQueue::new(),
            state,
        }
    }

    pub(crate) fn state(&self) -> SchedulerState {
        self.state
    }

    pub(crate) fn adopt_pending_tick(&mut self) {
        self.state = SchedulerState::Armed;
    }

    pub(crate) fn pending(&self) -> &SpawnQueue<O, P> {
        &self.queue
    }

    pub(crate) fn factory_mut(&mut self) -> &mut dyn Factory<Object = O, Payload = P> {
        &mut *self.factory
    }

    /// Queues the request, or processes it right away if it is critical.
    ///
    /// Invalid requests are logged and ignored.
    pub(crate) fn enqueue(
        &mut self,
        request: SpawnRequest<O, P>,
        objects: &mut Vec<PoolObjectData<O>>,
        ticks: &mut dyn NextTick,
    ) {
        if !request.is_valid() {
            warn!(pool = %self.type_tag, "spawn request is not valid and cannot be processed");
            return;
        }

        if request.priority() == SpawnPriority::Critical {
            self.process_now(request, objects);
            return;
        }

        trace!(
            pool = %self.type_tag,
            handle = %request.handle(),
            priority = ?request.priority(),
            "queued spawn request"
        );

        self.queue.insert(request);

        if self.state == SchedulerState::Idle {
            self.arm(ticks);
        }
    }

    /// Removes a queued request. Returns `None` if the request is not (or no longer) queued.
    pub(crate) fn dequeue_by_handle(&mut self, handle: Handle) -> Option<SpawnRequest<O, P>> {
        let request = self.queue.dequeue_by_handle(handle);

        if request.is_some() {
            debug!(pool = %self.type_tag, %handle, "cancelled spawn request");
        } else {
            trace!(pool = %self.type_tag, %handle, "spawn request to cancel is not queued");
        }

        request
    }

    /// Removes every queued request without processing it.
    pub(crate) fn drain(&mut self) -> Vec<SpawnRequest<O, P>> {
        self.queue.drain()
    }

    /// Handles the delivery of the requested tick: processes up to `budget` requests from the
    /// front of the queue and asks for another tick if requests remain.
    ///
    /// A tick delivered while no tick is pending was not asked for and is ignored.
    ///
    /// Returns the number of processed requests.
    pub(crate) fn process_tick(
        &mut self,
        budget: NonZero<usize>,
        objects: &mut Vec<PoolObjectData<O>>,
        ticks: &mut dyn NextTick,
    ) -> usize {
        if self.state != SchedulerState::Armed {
            debug!(pool = %self.type_tag, "ignored tick that the pool did not ask for");
            return 0;
        }

        // The pending tick is the one being delivered now.
        self.state = SchedulerState::Idle;

        let batch = budget.get().min(self.queue.len());

        for processed in 0..batch {
            let Some(request) = self.queue.dequeue() else {
                panic!(
                    "spawn queue of pool {} ran out after {processed} of {batch} requests",
                    self.type_tag
                );
            };

            self.process_now(request, objects);
        }

        debug!(
            pool = %self.type_tag,
            processed = batch,
            remaining = self.queue.len(),
            "processed spawn batch"
        );

        if !self.queue.is_empty() {
            self.arm(ticks);
        }

        batch
    }

    /// Constructs the requested object and registers it, running every lifecycle hook.
    ///
    /// Returns the handle the object is registered under.
    ///
    /// # Panics
    ///
    /// Panics if an object with the same handle is already registered, or if the factory fails
    /// to construct the object.
    pub(crate) fn process_now(
        &mut self,
        mut request: SpawnRequest<O, P>,
        objects: &mut Vec<PoolObjectData<O>>,
    ) -> Handle {
        let handle = request.handle();
        assert!(
            !objects.iter().any(|data| data.handle() == handle),
            "object {handle} is already registered in pool {}",
            self.type_tag
        );

        let object = self.factory.construct_now(&request);
        let mut data = PoolObjectData::new(handle, object, true);

        request.callbacks_mut().pre_registered(&mut data);
        self.factory.on_pre_registered(&request, &mut data);

        objects.push(data);
        let Some(data) = objects.last_mut() else {
            unreachable!("an object was registered just now");
        };

        self.factory
            .on_changed_state_in_pool(PoolObjectState::Active, data.object_mut());

        request.callbacks_mut().post_spawned(data);
        self.factory.on_post_spawned(&request, data);

        trace!(pool = %self.type_tag, %handle, "spawned object");

        handle
    }

    fn arm(&mut self, ticks: &mut dyn NextTick) {
        self.state = SchedulerState::Armed;
        ticks.schedule_next_tick(self.type_tag);

        trace!(pool = %self.type_tag, "scheduled next tick");
    }
}

impl<O: PoolObject<P>, P> fmt::Debug for Spawner<O, P> {
    #[cfg_attr(test, mutants::skip)] // No API contract.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Spawner")
            .field("type_tag", &self.type_tag)
            .field("queue", &self.queue)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use mockall::predicate::eq;

    use super::*;
    use crate::MockNextTick;
    use crate::test_utils::{BULLET, Bullet, BulletFactory, bullet_request};

    fn spawner() -> (Spawner<Bullet, u32>, BulletFactory) {
        let factory = BulletFactory::default();
        let spawner = Spawner::new(BULLET, Box::new(factory.clone()), SchedulerState::Idle);
        (spawner, factory)
    }

    fn budget(value: usize) -> NonZero<usize> {
        NonZero::new(value).unwrap()
    }

    fn ticks_expecting(times: usize) -> MockNextTick {
        let mut ticks = MockNextTick::new();
        ticks
            .expect_schedule_next_tick()
            .with(eq(BULLET))
            .times(times)
            .return_const(());
        ticks
    }

    #[test]
    fn first_enqueue_arms_once() {
        let (mut spawner, factory) = spawner();
        let mut objects = Vec::new();
        let mut ticks = ticks_expecting(1);

        spawner.enqueue(bullet_request(1), &mut objects, &mut ticks);
        spawner.enqueue(bullet_request(2), &mut objects, &mut ticks);
        spawner.enqueue(
            bullet_request(3).with_priority(SpawnPriority::High),
            &mut objects,
            &mut ticks,
        );

        assert_eq!(spawner.state(), SchedulerState::Armed);
        assert_eq!(spawner.pending().len(), 3);
        assert!(objects.is_empty());
        assert_eq!(factory.constructed.get(), 0);
    }

    #[test]
    fn invalid_request_is_ignored() {
        let (mut spawner, factory) = spawner();
        let mut objects = Vec::new();
        let mut ticks = ticks_expecting(0);

        spawner.enqueue(
            SpawnRequest::with_handle(Handle::EMPTY, 1),
            &mut objects,
            &mut ticks,
        );

        assert_eq!(spawner.state(), SchedulerState::Idle);
        assert!(spawner.pending().is_empty());
        assert_eq!(factory.constructed.get(), 0);
    }

    #[test]
    fn critical_is_processed_synchronously() {
        let (mut spawner, factory) = spawner();
        let mut objects = Vec::new();
        let mut ticks = ticks_expecting(0);

        let request = bullet_request(7).with_priority(SpawnPriority::Critical);
        let handle = request.handle();
        spawner.enqueue(request, &mut objects, &mut ticks);

        assert_eq!(factory.constructed.get(), 1);
        assert_eq!(spawner.state(), SchedulerState::Idle);
        assert!(!spawner.pending().contains(handle));
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].handle(), handle);
        assert!(objects[0].is_active());
    }

    #[test]
    fn tick_processes_budget_and_rearms() {
        let (mut spawner, factory) = spawner();
        let mut objects = Vec::new();
        let mut ticks = ticks_expecting(2);

        for payload in 0..5 {
            spawner.enqueue(bullet_request(payload), &mut objects, &mut ticks);
        }

        let processed = spawner.process_tick(budget(2), &mut objects, &mut ticks);

        assert_eq!(processed, 2);
        assert_eq!(spawner.pending().len(), 3);
        assert_eq!(objects.len(), 2);
        assert_eq!(factory.constructed.get(), 2);
        assert_eq!(spawner.state(), SchedulerState::Armed);
    }

    #[test]
    fn tick_draining_queue_goes_idle() {
        let (mut spawner, _factory) = spawner();
        let mut objects = Vec::new();
        let mut ticks = ticks_expecting(1);

        spawner.enqueue(bullet_request(1), &mut objects, &mut ticks);

        let processed = spawner.process_tick(budget(5), &mut objects, &mut ticks);

        assert_eq!(processed, 1);
        assert!(spawner.pending().is_empty());
        assert_eq!(spawner.state(), SchedulerState::Idle);
    }

    #[test]
    fn unrequested_tick_is_ignored() {
        let (mut spawner, factory) = spawner();
        let mut objects = Vec::new();
        let mut ticks = ticks_expecting(1);

        spawner.enqueue(bullet_request(1), &mut objects, &mut ticks);
        assert_eq!(spawner.process_tick(budget(1), &mut objects, &mut ticks), 1);

        // A second delivery of the same tick neither spawns nor asks for another tick.
        assert_eq!(spawner.process_tick(budget(1), &mut objects, &mut ticks), 0);
        assert_eq!(spawner.state(), SchedulerState::Idle);
        assert_eq!(factory.constructed.get(), 1);
    }

    #[test]
    fn spawner_created_armed_waits_for_pending_tick() {
        let factory = BulletFactory::default();
        let mut spawner = Spawner::new(BULLET, Box::new(factory.clone()), SchedulerState::Armed);
        let mut objects = Vec::new();
        let mut ticks = ticks_expecting(1);

        spawner.enqueue(bullet_request(1), &mut objects, &mut ticks);
        spawner.enqueue(bullet_request(2), &mut objects, &mut ticks);

        // The pending tick is delivered and the remaining request asks for the next one.
        assert_eq!(spawner.process_tick(budget(1), &mut objects, &mut ticks), 1);
        assert_eq!(spawner.state(), SchedulerState::Armed);
        assert_eq!(factory.constructed.get(), 1);
    }

    #[test]
    fn ticks_follow_priority_order() {
        let (mut spawner, _factory) = spawner();
        let mut objects = Vec::new();
        let mut ticks = ticks_expecting(1);

        spawner.enqueue(bullet_request(1), &mut objects, &mut ticks);
        spawner.enqueue(
            bullet_request(2).with_priority(SpawnPriority::Medium),
            &mut objects,
            &mut ticks,
        );
        spawner.enqueue(
            bullet_request(3).with_priority(SpawnPriority::High),
            &mut objects,
            &mut ticks,
        );

        spawner.process_tick(budget(3), &mut objects, &mut ticks);

        let positions = objects
            .iter()
            .map(|data| data.object().position)
            .collect::<Vec<_>>();
        assert_eq!(positions, [3, 2, 1]);
    }

    #[test]
    fn enqueue_after_cancel_does_not_rearm_pending_tick() {
        let (mut spawner, _factory) = spawner();
        let mut objects = Vec::new();
        let mut ticks = ticks_expecting(1);

        let request = bullet_request(1);
        let handle = request.handle();
        spawner.enqueue(request, &mut objects, &mut ticks);
        assert!(spawner.dequeue_by_handle(handle).is_some());

        // The queue is empty again but the tick is still pending.
        spawner.enqueue(bullet_request(2), &mut objects, &mut ticks);

        assert_eq!(spawner.state(), SchedulerState::Armed);
        assert_eq!(spawner.process_tick(budget(1), &mut objects, &mut ticks), 1);
        assert_eq!(spawner.state(), SchedulerState::Idle);
    }

    #[test]
    fn cancel_of_unknown_handle_is_a_miss() {
        let (mut spawner, _factory) = spawner();
        let mut objects = Vec::new();
        let mut ticks = ticks_expecting(1);

        spawner.enqueue(bullet_request(1), &mut objects, &mut ticks);
        let before = spawner.pending().handles();

        assert!(spawner.dequeue_by_handle(Handle::new(BULLET)).is_none());
        assert_eq!(spawner.pending().handles(), before);
    }

    #[test]
    fn lifecycle_hooks_run_in_order() {
        let (mut spawner, _factory) = spawner();
        let mut objects = Vec::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        let pre_order = Rc::clone(&order);
        let post_order = Rc::clone(&order);
        let request = bullet_request(42)
            .on_pre_registered(move |data| {
                pre_order.borrow_mut().push("pre");
                assert!(data.object().takes.is_empty());
                data.object_mut().position = 1;
            })
            .on_post_spawned(move |data| {
                post_order.borrow_mut().push("post");
                assert_eq!(data.object().states, [PoolObjectState::Active]);
            });

        let handle = spawner.process_now(request, &mut objects);

        assert_eq!(*order.borrow(), ["pre", "post"]);

        let bullet = objects[0].object();
        assert_eq!(objects[0].handle(), handle);
        assert_eq!(bullet.position, 42);
        assert_eq!(bullet.takes, [true]);
        assert_eq!(bullet.states, [PoolObjectState::Active]);
    }

    #[test]
    #[should_panic(expected = "is already registered")]
    fn duplicate_handle_is_fatal() {
        let (mut spawner, _factory) = spawner();
        let mut objects = Vec::new();

        let handle = Handle::new(BULLET);
        spawner.process_now(SpawnRequest::with_handle(handle, 1), &mut objects);
        spawner.process_now(SpawnRequest::with_handle(handle, 2), &mut objects);
    }
}
