use std::fmt;
use std::mem;
use std::num::NonZero;
use std::ptr;

use tracing::{debug, trace, warn};

use crate::{
    Error, Factory, Handle, NextTick, PoolObject, PoolObjectData, PoolObjectState, Result,
    SchedulerState, SpawnQueue, SpawnRequest, Spawner, TakeFromPoolPayload, TypeTag,
};

/// All objects of one pooled type, together with the factory that constructs them.
///
/// The container owns every registered object, active or inactive, in registration order.
/// Lookups are linear scans. New objects arrive through the spawn queue of the bound factory,
/// which the container drives through [`enqueue()`][Self::enqueue] and
/// [`process_tick()`][Self::process_tick].
///
/// A container without a bound factory can hold and look up objects but cannot spawn any.
/// Attempting to spawn through such a container is a programming error and panics.
///
/// # Example
///
/// ```
/// use std::num::NonZero;
///
/// use deferred_pool::{Factory, PoolContainer, PoolObject, SpawnRequest, TickQueue, TypeTag};
///
/// struct Coin;
///
/// impl PoolObject<()> for Coin {}
///
/// struct CoinFactory;
///
/// impl Factory for CoinFactory {
///     type Object = Coin;
///     type Payload = ();
///
///     fn construct_now(&mut self, _request: &SpawnRequest<Coin, ()>) -> Coin {
///         Coin
///     }
/// }
///
/// let coins = TypeTag::new("coin");
/// let mut container = PoolContainer::with_factory(coins, CoinFactory);
/// let mut ticks = TickQueue::new();
///
/// let request = SpawnRequest::new(coins, ());
/// let handle = request.handle();
/// container.enqueue(request, &mut ticks);
///
/// // Nothing is constructed until the pool receives its tick.
/// assert!(container.find_by_handle(handle).is_none());
///
/// for _ in ticks.take_pending() {
///     container.process_tick(NonZero::new(1).unwrap(), &mut ticks);
/// }
///
/// assert!(container.find_by_handle(handle).unwrap().is_active());
/// ```
pub struct PoolContainer<O: PoolObject<P>, P> {
    type_tag: TypeTag,
    objects: Vec<PoolObjectData<O>>,
    spawner: Option<Spawner<O, P>>,
}

impl<O, P> PoolContainer<O, P>
where
    O: PoolObject<P>,
{
    /// Creates an empty container with no factory bound.
    #[must_use]
    pub fn new(type_tag: TypeTag) -> Self {
        Self {
            type_tag,
            objects: Vec::new(),
            spawner: None,
        }
    }

    /// Creates an empty container bound to the given factory.
    #[must_use]
    pub fn with_factory<F>(type_tag: TypeTag, factory: F) -> Self
    where
        F: Factory<Object = O, Payload = P> + 'static,
    {
        let mut container = Self::new(type_tag);
        container.bind_factory(factory);
        container
    }

    /// Binds the factory that constructs the objects of this container.
    ///
    /// If a factory was already bound, it is replaced and its pending requests are dropped.
    /// Objects already registered stay registered. A tick the container already asked for stays
    /// pending and is delivered to the new factory.
    pub fn bind_factory<F>(&mut self, factory: F)
    where
        F: Factory<Object = O, Payload = P> + 'static,
    {
        let state = self.scheduler_state();

        if let Some(previous) = self.spawner.as_mut() {
            let dropped = previous.drain().len();
            warn!(
                pool = %self.type_tag,
                dropped,
                "replaced the factory of a pool, its pending spawn requests are dropped"
            );
        }

        self.spawner = Some(Spawner::new(self.type_tag, Box::new(factory), state));
    }

    // Takes over a tick that an earlier container of the same type asked for and never received.
    pub(crate) fn adopt_pending_tick(&mut self) {
        let type_tag = self.type_tag;
        self.require_spawner_mut().adopt_pending_tick();
        trace!(pool = %type_tag, "adopted pending tick of removed pool");
    }

    /// The type of the objects in this container.
    #[must_use]
    pub fn type_tag(&self) -> TypeTag {
        self.type_tag
    }

    /// Whether the container belongs to a type.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.type_tag.is_set()
    }

    /// Whether a factory is bound to the container.
    #[must_use]
    pub fn has_factory(&self) -> bool {
        self.spawner.is_some()
    }

    /// The bound factory.
    ///
    /// # Panics
    ///
    /// Panics if no factory is bound.
    pub fn require_factory(&mut self) -> &mut dyn Factory<Object = O, Payload = P> {
        self.require_spawner_mut().factory_mut()
    }

    pub(crate) fn require_spawner_mut(&mut self) -> &mut Spawner<O, P> {
        self.split_mut().1
    }

    // The registered objects and the bound spawner, borrowed side by side.
    fn split_mut(&mut self) -> (&mut Vec<PoolObjectData<O>>, &mut Spawner<O, P>) {
        let Some(spawner) = self.spawner.as_mut() else {
            panic!("pool {} has no factory bound", self.type_tag);
        };

        (&mut self.objects, spawner)
    }

    /// Finds the registered data of the given object, compared by address.
    #[must_use]
    pub fn find_by_object(&self, object: &O) -> Option<&PoolObjectData<O>> {
        self.objects
            .iter()
            .find(|data| ptr::eq(data.object(), object))
    }

    /// Finds the registered data of the given object, compared by address, mutably.
    #[must_use]
    pub fn find_by_object_mut(&mut self, object: &O) -> Option<&mut PoolObjectData<O>> {
        self.objects
            .iter_mut()
            .find(|data| ptr::eq(data.object(), object))
    }

    /// Finds the registered data with the given handle.
    ///
    /// An invalid handle is a caller error: it is logged and `None` is returned.
    #[must_use]
    pub fn find_by_handle(&self, handle: Handle) -> Option<&PoolObjectData<O>> {
        let index = self.position_of(handle)?;
        self.objects.get(index)
    }

    /// Finds the registered data with the given handle, mutably.
    ///
    /// An invalid handle is a caller error: it is logged and `None` is returned.
    #[must_use]
    pub fn find_by_handle_mut(&mut self, handle: Handle) -> Option<&mut PoolObjectData<O>> {
        let index = self.position_of(handle)?;
        self.objects.get_mut(index)
    }

    fn position_of(&self, handle: Handle) -> Option<usize> {
        if !handle.is_valid() {
            warn!(pool = %self.type_tag, "handle is not valid and cannot be looked up");
            return None;
        }

        self.objects.iter().position(|data| data.handle() == handle)
    }

    /// The first registered object that is ready to be taken, if any.
    #[must_use]
    pub fn first_free_mut(&mut self) -> Option<&mut PoolObjectData<O>> {
        self.objects.iter_mut().find(|data| data.is_free())
    }

    /// Every registered object, in registration order.
    #[must_use]
    pub fn objects(&self) -> &[PoolObjectData<O>] {
        &self.objects
    }

    /// The number of registered objects, active or inactive.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether no object is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// The number of registered objects that are ready to be taken.
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.objects.iter().filter(|data| data.is_free()).count()
    }

    /// The number of registered objects that are currently taken.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.objects.iter().filter(|data| data.is_active()).count()
    }

    /// The spawn requests waiting to be processed, if a factory is bound.
    #[must_use]
    pub fn pending(&self) -> Option<&SpawnQueue<O, P>> {
        self.spawner.as_ref().map(Spawner::pending)
    }

    /// Whether a spawn request with the given handle is waiting to be processed.
    #[must_use]
    pub fn is_pending(&self, handle: Handle) -> bool {
        self.pending().is_some_and(|queue| queue.contains(handle))
    }

    /// Whether the container is waiting for a tick. A container without a factory is always
    /// [`Idle`][SchedulerState::Idle].
    #[must_use]
    pub fn scheduler_state(&self) -> SchedulerState {
        self.spawner
            .as_ref()
            .map_or(SchedulerState::Idle, Spawner::state)
    }

    /// Registers an object that was constructed outside of the pool.
    ///
    /// Returns the handle generated for the object, or [`Handle::EMPTY`] if the container has
    /// no type.
    pub fn register_object(&mut self, object: O, is_active: bool) -> Handle {
        let handle = Handle::new(self.type_tag);
        if !handle.is_valid() {
            return Handle::EMPTY;
        }

        self.objects
            .push(PoolObjectData::new(handle, object, is_active));

        debug!(pool = %self.type_tag, %handle, is_active, "registered external object");

        handle
    }

    /// Queues a spawn request, or processes it immediately if it is critical.
    ///
    /// # Panics
    ///
    /// Panics if no factory is bound.
    pub fn enqueue(&mut self, request: SpawnRequest<O, P>, ticks: &mut dyn NextTick) {
        let (objects, spawner) = self.split_mut();
        spawner.enqueue(request, objects, ticks);
    }

    /// Delivers the tick this container asked for, processing up to `budget` requests.
    ///
    /// Returns the number of spawned objects.
    ///
    /// # Panics
    ///
    /// Panics if no factory is bound.
    pub fn process_tick(&mut self, budget: NonZero<usize>, ticks: &mut dyn NextTick) -> usize {
        let (objects, spawner) = self.split_mut();
        spawner.process_tick(budget, objects, ticks)
    }

    /// Constructs the requested object immediately, bypassing the queue.
    ///
    /// Returns the handle of the new object.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHandle`] if the request does not carry a valid handle.
    ///
    /// # Panics
    ///
    /// Panics if no factory is bound or if an object with the same handle is already registered.
    pub fn process_now(&mut self, request: SpawnRequest<O, P>) -> Result<Handle> {
        if !request.is_valid() {
            warn!(pool = %self.type_tag, "spawn request is not valid and cannot be processed");
            return Err(Error::InvalidHandle);
        }

        let (objects, spawner) = self.split_mut();
        Ok(spawner.process_now(request, objects))
    }

    /// Removes a pending spawn request. Returns `false` if the request is not pending.
    pub fn cancel(&mut self, handle: Handle) -> bool {
        self.spawner
            .as_mut()
            .and_then(|spawner| spawner.dequeue_by_handle(handle))
            .is_some()
    }

    /// Hands out the first free object for the request, if there is one.
    ///
    /// The object is activated, receives the take notification with the request payload and
    /// `is_new_spawned = false`, and then the post-spawn callback of the request runs. If no
    /// object is free, the request is left untouched so the caller can queue it.
    pub(crate) fn take_first_free(&mut self, request: &mut SpawnRequest<O, P>) -> Option<Handle> {
        let index = self.objects.iter().position(PoolObjectData::is_free)?;
        self.take_at(index, request)
    }

    /// Hands out the free object registered under the handle of the request, if there is one.
    pub(crate) fn take_registered(&mut self, request: &mut SpawnRequest<O, P>) -> Option<Handle> {
        let handle = request.handle();
        let index = self
            .objects
            .iter()
            .position(|data| data.handle() == handle && data.is_free())?;
        self.take_at(index, request)
    }

    fn take_at(&mut self, index: usize, request: &mut SpawnRequest<O, P>) -> Option<Handle> {
        let type_tag = self.type_tag;
        let (objects, spawner) = self.split_mut();
        let data = objects.get_mut(index)?;
        let factory = spawner.factory_mut();

        data.set_active(true);
        factory.on_changed_state_in_pool(PoolObjectState::Active, data.object_mut());

        let payload = TakeFromPoolPayload::reused(request.payload());
        factory.on_take_from_pool(data.object_mut(), &payload);

        request.callbacks_mut().post_spawned(data);

        let handle = data.handle();
        trace!(pool = %type_tag, %handle, "reused object");

        Some(handle)
    }

    /// Returns an active object to the pool.
    ///
    /// The object receives the return notification while still active, is then deactivated and
    /// receives the state change notification. Without a bound factory the object is notified
    /// directly.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no object is registered under the handle and
    /// [`Error::NotActive`] if the object is already in the pool.
    pub fn deactivate(&mut self, handle: Handle) -> Result<()> {
        let index = self.position_of(handle).ok_or(Error::NotFound(handle))?;

        let type_tag = self.type_tag;
        let data = self
            .objects
            .get_mut(index)
            .ok_or(Error::NotFound(handle))?;

        if !data.is_active() {
            return Err(Error::NotActive(handle));
        }

        if let Some(spawner) = self.spawner.as_mut() {
            let factory = spawner.factory_mut();

            factory.on_return_to_pool(data.object_mut());
            data.set_active(false);
            factory.on_changed_state_in_pool(PoolObjectState::Inactive, data.object_mut());
        } else {
            crate::notify::return_to_pool::<_, P>(data.object_mut());
            data.set_active(false);
            crate::notify::changed_state_in_pool::<_, P>(
                data.object_mut(),
                PoolObjectState::Inactive,
            );
        }

        trace!(pool = %type_tag, %handle, "returned object to pool");

        Ok(())
    }

    /// Destroys every registered object through the factory and drops every pending request.
    ///
    /// Returns the number of destroyed objects. Without a bound factory the objects are dropped.
    pub fn empty(&mut self) -> usize {
        let objects = mem::take(&mut self.objects);
        let destroyed = objects.len();

        if let Some(spawner) = self.spawner.as_mut() {
            let cancelled = spawner.drain().len();
            let factory = spawner.factory_mut();

            for data in objects {
                factory.destroy(data.into_object());
            }

            debug!(pool = %self.type_tag, destroyed, cancelled, "emptied pool");
        } else {
            drop(objects);

            debug!(pool = %self.type_tag, destroyed, "emptied pool without factory");
        }

        destroyed
    }
}

impl<O: PoolObject<P>, P> fmt::Debug for PoolContainer<O, P> {
    #[cfg_attr(test, mutants::skip)] // No API contract.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolContainer")
            .field("type_tag", &self.type_tag)
            .field("objects", &self.objects.len())
            .field("spawner", &self.spawner)
            .finish()
    }
}
