use std::fmt;
use std::marker::PhantomData;
use std::num::NonZero;

use foldhash::{HashMap, HashMapExt, HashSet, HashSetExt};
use tracing::{debug, trace, warn};

use crate::{
    Error, Factory, Handle, NextTick, PoolContainer, PoolObject, PoolObjectData, PoolObjectState,
    PoolSettings, Result, SchedulerState, SpawnPriority, SpawnRequest, TickQueue, TypeTag,
    filter_requests,
};

/// The entry point for callers: one [`PoolContainer`] per pooled type, the tick source that
/// drives their spawn queues and the per-tick spawn budget they share.
///
/// Every pool in a registry holds objects of the same Rust type `O`. Registries that pool
/// unrelated types typically use an enum or a boxed trait object as `O` and tell the pools
/// apart by [`TypeTag`].
///
/// Acquiring an object hands out a [`Handle`] immediately. If the pool has a free object, it is
/// reused on the spot. Otherwise a spawn request is queued and the object is constructed on a
/// later tick, within the per-tick budget, unless the request is
/// [`Critical`][SpawnPriority::Critical].
///
/// The registry is single-threaded: every call, including tick delivery, must come from the
/// thread that owns it.
///
/// # Example
///
/// ```
/// use deferred_pool::{
///     Factory, PoolObject, PoolObjectState, PoolRegistry, SpawnPriority, SpawnRequest, TypeTag,
/// };
///
/// struct Enemy;
///
/// impl PoolObject<()> for Enemy {}
///
/// struct EnemyFactory;
///
/// impl Factory for EnemyFactory {
///     type Object = Enemy;
///     type Payload = ();
///
///     fn construct_now(&mut self, _request: &SpawnRequest<Enemy, ()>) -> Enemy {
///         Enemy
///     }
/// }
///
/// let enemies = TypeTag::new("enemy");
///
/// let mut registry = PoolRegistry::new();
/// registry.register_pool(enemies, EnemyFactory).unwrap();
///
/// let handle = registry
///     .acquire(enemies, (), SpawnPriority::Normal)
///     .unwrap();
/// assert!(registry.is_pending(handle));
///
/// // The host loop delivers the ticks the pools asked for.
/// registry.tick();
///
/// assert_eq!(registry.state_of(handle), PoolObjectState::Active);
///
/// registry.release(handle).unwrap();
/// assert_eq!(registry.state_of(handle), PoolObjectState::Inactive);
/// ```
pub struct PoolRegistry<O: PoolObject<P>, P = (), T: NextTick = TickQueue> {
    pools: HashMap<TypeTag, PoolContainer<O, P>>,
    // Types whose pool was removed while a tick for it was still pending.
    orphaned_ticks: HashSet<TypeTag>,
    ticks: T,
    spawn_budget: NonZero<usize>,
    default_priority: SpawnPriority,
}

impl<O, P> PoolRegistry<O, P>
where
    O: PoolObject<P>,
{
    /// Creates a registry with default settings that records its pending ticks in a
    /// [`TickQueue`].
    ///
    /// Use [`PoolRegistry::builder()`] for custom configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates a builder for configuring the registry.
    #[must_use]
    pub fn builder() -> PoolRegistryBuilder<O, P> {
        PoolRegistryBuilder::new()
    }

    /// Delivers every tick the pools asked for before this call.
    ///
    /// Ticks that pools ask for while this call runs are delivered by the next call.
    ///
    /// Returns the number of spawned objects.
    pub fn tick(&mut self) -> usize {
        let pending = self.ticks.take_pending();

        pending
            .into_iter()
            .map(|type_tag| self.on_next_tick(type_tag))
            .sum()
    }
}

impl<O, P> Default for PoolRegistry<O, P>
where
    O: PoolObject<P>,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<O, P, T> PoolRegistry<O, P, T>
where
    O: PoolObject<P>,
    T: NextTick,
{
    /// Creates the pool for a type, or binds a new factory to an existing pool.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsetTypeTag`] if the type tag is not set.
    pub fn register_pool<F>(&mut self, type_tag: TypeTag, factory: F) -> Result<()>
    where
        F: Factory<Object = O, Payload = P> + 'static,
    {
        if !type_tag.is_set() {
            warn!("cannot register a pool without a type tag");
            return Err(Error::UnsetTypeTag);
        }

        if let Some(container) = self.pools.get_mut(&type_tag) {
            container.bind_factory(factory);
            debug!(pool = %type_tag, "rebound factory of existing pool");
        } else {
            let mut container = PoolContainer::with_factory(type_tag, factory);
            if self.orphaned_ticks.remove(&type_tag) {
                container.adopt_pending_tick();
            }

            self.pools.insert(type_tag, container);
            debug!(pool = %type_tag, "registered pool");
        }

        Ok(())
    }

    /// Whether a pool is registered for the type.
    #[must_use]
    pub fn contains_pool(&self, type_tag: TypeTag) -> bool {
        self.pools.contains_key(&type_tag)
    }

    /// The number of registered pools.
    #[must_use]
    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    /// The pool of the given type.
    #[must_use]
    pub fn container(&self, type_tag: TypeTag) -> Option<&PoolContainer<O, P>> {
        self.pools.get(&type_tag)
    }

    /// The pool of the given type, mutably.
    #[must_use]
    pub fn container_mut(&mut self, type_tag: TypeTag) -> Option<&mut PoolContainer<O, P>> {
        self.pools.get_mut(&type_tag)
    }

    /// The tick source that receives the tick requests of the pools.
    #[must_use]
    pub fn ticks(&self) -> &T {
        &self.ticks
    }

    /// The tick source that receives the tick requests of the pools, mutably.
    #[must_use]
    pub fn ticks_mut(&mut self) -> &mut T {
        &mut self.ticks
    }

    /// How many spawn requests each pool processes per tick.
    #[must_use]
    pub fn spawn_budget(&self) -> NonZero<usize> {
        self.spawn_budget
    }

    /// The priority of requests created through [`new_request()`][Self::new_request].
    #[must_use]
    pub fn default_priority(&self) -> SpawnPriority {
        self.default_priority
    }

    /// Creates a spawn request for the type with the configured default priority.
    #[must_use]
    pub fn new_request(&self, type_tag: TypeTag, payload: P) -> SpawnRequest<O, P> {
        SpawnRequest::new(type_tag, payload).with_priority(self.default_priority)
    }

    fn pool_in(
        pools: &mut HashMap<TypeTag, PoolContainer<O, P>>,
        type_tag: TypeTag,
    ) -> Result<&mut PoolContainer<O, P>> {
        pools.get_mut(&type_tag).ok_or_else(|| {
            warn!(pool = %type_tag, "no pool is registered for the type");
            Error::UnknownPool(type_tag)
        })
    }

    /// Takes an object of the given type from its pool.
    ///
    /// A free object is reused immediately and receives the take notification with
    /// `is_new_spawned = false`. Otherwise a spawn request with the given priority is queued and
    /// the returned handle resolves once the object is constructed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsetTypeTag`] if the type tag is not set and [`Error::UnknownPool`] if
    /// no pool is registered for it.
    pub fn acquire(
        &mut self,
        type_tag: TypeTag,
        payload: P,
        priority: SpawnPriority,
    ) -> Result<Handle> {
        if !type_tag.is_set() {
            warn!("cannot acquire an object without a type tag");
            return Err(Error::UnsetTypeTag);
        }

        self.acquire_request(SpawnRequest::new(type_tag, payload).with_priority(priority))
    }

    /// Takes an object from its pool for a caller-built request.
    ///
    /// The callbacks of the request are honored. When a free object is reused, the post-spawn
    /// callback receives the reused object and its handle is returned instead of the handle of
    /// the request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHandle`] if the request does not carry a valid handle and
    /// [`Error::UnknownPool`] if no pool is registered for its type.
    pub fn acquire_request(&mut self, mut request: SpawnRequest<O, P>) -> Result<Handle> {
        if !request.is_valid() {
            warn!("spawn request is not valid and cannot be acquired");
            return Err(Error::InvalidHandle);
        }

        let type_tag = request.type_tag();
        let container = Self::pool_in(&mut self.pools, type_tag)?;

        if let Some(handle) = container.take_first_free(&mut request) {
            return Ok(handle);
        }

        let handle = request.handle();
        container.enqueue(request, &mut self.ticks);

        Ok(handle)
    }

    /// Takes `amount` objects of the given type, each with its own handle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsetTypeTag`] if the type tag is not set and [`Error::UnknownPool`] if
    /// no pool is registered for it.
    pub fn acquire_many(
        &mut self,
        type_tag: TypeTag,
        payload: P,
        amount: usize,
        priority: SpawnPriority,
    ) -> Result<Vec<Handle>>
    where
        P: Clone,
    {
        if !type_tag.is_set() {
            warn!("cannot acquire objects without a type tag");
            return Err(Error::UnsetTypeTag);
        }

        let container = Self::pool_in(&mut self.pools, type_tag)?;
        let mut handles = Vec::with_capacity(amount);

        for _ in 0..amount {
            let mut request = SpawnRequest::new(type_tag, payload.clone()).with_priority(priority);

            if let Some(handle) = container.take_first_free(&mut request) {
                handles.push(handle);
            } else {
                handles.push(request.handle());
                container.enqueue(request, &mut self.ticks);
            }
        }

        Ok(handles)
    }

    /// Takes objects for a batch of caller-built requests, possibly for several pools.
    ///
    /// A request whose handle names a free object of its pool reactivates that object. The
    /// remaining requests are queued, or processed at once if they are critical. The returned
    /// handles are the handles of the requests, in the same order.
    ///
    /// Nothing is acquired if any request is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHandle`] if a request does not carry a valid handle and
    /// [`Error::UnknownPool`] if no pool is registered for the type of a request.
    ///
    /// # Panics
    ///
    /// A request whose handle names an object that is currently active panics when it is
    /// processed, since the handle is already registered.
    pub fn acquire_requests(&mut self, requests: Vec<SpawnRequest<O, P>>) -> Result<Vec<Handle>> {
        if requests.is_empty() {
            warn!("no spawn requests to acquire");
            return Ok(Vec::new());
        }

        if !requests.iter().all(SpawnRequest::is_valid) {
            warn!("a spawn request in the batch is not valid, nothing is acquired");
            return Err(Error::InvalidHandle);
        }

        if let Some(unknown) = requests
            .iter()
            .map(SpawnRequest::type_tag)
            .find(|type_tag| !self.pools.contains_key(type_tag))
        {
            warn!(pool = %unknown, "no pool is registered for a request in the batch");
            return Err(Error::UnknownPool(unknown));
        }

        let handles = Handle::requests_to_handles(&requests);

        // Grouped by pool, in order of first appearance.
        let mut batches: Vec<(TypeTag, Vec<SpawnRequest<O, P>>)> = Vec::new();
        for request in requests {
            let type_tag = request.type_tag();

            if let Some((_, batch)) = batches.iter_mut().find(|(tag, _)| *tag == type_tag) {
                batch.push(request);
            } else {
                batches.push((type_tag, vec![request]));
            }
        }

        for (type_tag, mut batch) in batches {
            let container = Self::pool_in(&mut self.pools, type_tag)?;

            let mut reactivated = HashSet::new();
            for request in &mut batch {
                if let Some(handle) = container.take_registered(request) {
                    reactivated.insert(handle);
                }
            }

            let expected_amount = batch.len().saturating_sub(reactivated.len());
            filter_requests(
                &mut batch,
                container
                    .objects()
                    .iter()
                    .filter(|data| reactivated.contains(&data.handle())),
                Some(expected_amount),
            );

            trace!(
                pool = %type_tag,
                reactivated = reactivated.len(),
                queued = batch.len(),
                "acquired request batch"
            );

            for request in batch {
                container.enqueue(request, &mut self.ticks);
            }
        }

        Ok(handles)
    }

    /// Returns an object to its pool, or cancels its spawn request if it is still pending.
    ///
    /// A returned object receives the return notification and then the state change
    /// notification. It stays registered and can be reused by a later acquire.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHandle`] for the empty handle, [`Error::NotFound`] if the handle
    /// names neither a registered object nor a pending request and [`Error::NotActive`] if the
    /// object was already returned.
    pub fn release(&mut self, handle: Handle) -> Result<()> {
        if !handle.is_valid() {
            warn!("cannot release an object through an invalid handle");
            return Err(Error::InvalidHandle);
        }

        let Some(container) = self.pools.get_mut(&handle.type_tag()) else {
            warn!(pool = %handle.type_tag(), %handle, "no pool is registered for the handle");
            return Err(Error::NotFound(handle));
        };

        if container.cancel(handle) {
            return Ok(());
        }

        container.deactivate(handle).inspect_err(|error| {
            warn!(pool = %handle.type_tag(), %handle, %error, "cannot release object");
        })
    }

    /// Removes a pending spawn request. Returns `false` if the request is not pending.
    pub fn cancel(&mut self, handle: Handle) -> bool {
        self.pools
            .get_mut(&handle.type_tag())
            .is_some_and(|container| container.cancel(handle))
    }

    /// The object registered under the handle, active or inactive.
    #[must_use]
    pub fn resolve(&self, handle: Handle) -> Option<&O> {
        self.pools
            .get(&handle.type_tag())?
            .find_by_handle(handle)
            .map(PoolObjectData::object)
    }

    /// The object registered under the handle, active or inactive, mutably.
    #[must_use]
    pub fn resolve_mut(&mut self, handle: Handle) -> Option<&mut O> {
        self.pools
            .get_mut(&handle.type_tag())?
            .find_by_handle_mut(handle)
            .map(PoolObjectData::object_mut)
    }

    /// The state of the object registered under the handle.
    ///
    /// Returns [`PoolObjectState::None`] if no object is registered under the handle, including
    /// while its spawn request is pending.
    #[must_use]
    pub fn state_of(&self, handle: Handle) -> PoolObjectState {
        self.pools
            .get(&handle.type_tag())
            .and_then(|container| container.find_by_handle(handle))
            .map_or(PoolObjectState::None, PoolObjectData::state)
    }

    /// Whether the spawn request with the given handle is waiting to be processed.
    #[must_use]
    pub fn is_pending(&self, handle: Handle) -> bool {
        self.pools
            .get(&handle.type_tag())
            .is_some_and(|container| container.is_pending(handle))
    }

    /// Delivers the tick that the pool of the given type asked for.
    ///
    /// The host calls this once per request it received through [`NextTick`]. Returns the number
    /// of spawned objects, zero if the pool no longer exists.
    pub fn on_next_tick(&mut self, type_tag: TypeTag) -> usize {
        let Some(container) = self.pools.get_mut(&type_tag) else {
            self.orphaned_ticks.remove(&type_tag);
            debug!(pool = %type_tag, "tick delivered to a pool that is no longer registered");
            return 0;
        };

        container.process_tick(self.spawn_budget, &mut self.ticks)
    }

    /// Destroys every object of the pool and drops its pending requests. Returns the number of
    /// destroyed objects.
    ///
    /// The pool stays registered.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownPool`] if no pool is registered for the type.
    pub fn empty_pool(&mut self, type_tag: TypeTag) -> Result<usize> {
        Ok(Self::pool_in(&mut self.pools, type_tag)?.empty())
    }

    /// Destroys every object of every pool and drops all pending requests. Returns the number
    /// of destroyed objects.
    pub fn empty_all_pools(&mut self) -> usize {
        self.pools.values_mut().map(PoolContainer::empty).sum()
    }

    /// Empties the pool of the given type and unregisters it. Returns the number of destroyed
    /// objects.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownPool`] if no pool is registered for the type.
    pub fn remove_pool(&mut self, type_tag: TypeTag) -> Result<usize> {
        let Some(mut container) = self.pools.remove(&type_tag) else {
            warn!(pool = %type_tag, "no pool is registered for the type");
            return Err(Error::UnknownPool(type_tag));
        };

        if container.scheduler_state() == SchedulerState::Armed {
            self.orphaned_ticks.insert(type_tag);
        }

        let destroyed = container.empty();
        debug!(pool = %type_tag, destroyed, "removed pool");

        Ok(destroyed)
    }
}

impl<O, P, T> fmt::Debug for PoolRegistry<O, P, T>
where
    O: PoolObject<P>,
    T: NextTick,
{
    #[cfg_attr(test, mutants::skip)] // No API contract.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolRegistry")
            .field("pools", &self.pools)
            .field("spawn_budget", &self.spawn_budget)
            .field("default_priority", &self.default_priority)
            .finish_non_exhaustive()
    }
}

/// Builder for configuring a [`PoolRegistry`].
pub struct PoolRegistryBuilder<O, P, T = TickQueue> {
    settings: PoolSettings,
    ticks: T,
    _pools: PhantomData<fn() -> (O, P)>,
}

impl<O, P> PoolRegistryBuilder<O, P> {
    fn new() -> Self {
        Self {
            settings: PoolSettings::default(),
            ticks: TickQueue::new(),
            _pools: PhantomData,
        }
    }
}

impl<O, P, T> PoolRegistryBuilder<O, P, T>
where
    O: PoolObject<P>,
    T: NextTick,
{
    /// Replaces all settings at once, for example with settings read from a file.
    #[must_use]
    pub fn settings(mut self, settings: PoolSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Sets how many spawn requests each pool processes per tick.
    ///
    /// Default is 5. Values below 1 are treated as 1.
    #[must_use]
    pub fn spawn_objects_per_tick(mut self, count: i64) -> Self {
        self.settings.spawn_objects_per_tick = count;
        self
    }

    /// Sets the tick source that receives the tick requests of the pools.
    ///
    /// Default is a [`TickQueue`] drained by [`PoolRegistry::tick()`].
    #[must_use]
    pub fn next_tick<U: NextTick>(self, ticks: U) -> PoolRegistryBuilder<O, P, U> {
        PoolRegistryBuilder {
            settings: self.settings,
            ticks,
            _pools: PhantomData,
        }
    }

    /// Builds the registry with the configured settings.
    #[must_use]
    pub fn build(self) -> PoolRegistry<O, P, T> {
        PoolRegistry {
            pools: HashMap::new(),
            orphaned_ticks: HashSet::new(),
            ticks: self.ticks,
            spawn_budget: self.settings.spawn_budget(),
            default_priority: self.settings.default_priority,
        }
    }
}

impl<O, P, T> fmt::Debug for PoolRegistryBuilder<O, P, T> {
    #[cfg_attr(test, mutants::skip)] // No API contract.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolRegistryBuilder")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
