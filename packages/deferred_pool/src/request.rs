use std::fmt;

use foldhash::HashSet;
use tracing::warn;

use crate::{Handle, PoolObjectData, SpawnPriority, TypeTag};

type PreRegisteredFn<O> = Box<dyn FnOnce(&mut PoolObjectData<O>)>;
type PostSpawnedFn<O> = Box<dyn FnOnce(&PoolObjectData<O>)>;

/// Functions called while a requested object is being spawned.
///
/// Both are optional and each is called at most once.
#[non_exhaustive]
pub struct SpawnCallbacks<O> {
    /// Called after the object is constructed but before it is registered in its pool, the last
    /// point at which nobody else can observe it yet.
    pub on_pre_registered: Option<PreRegisteredFn<O>>,

    /// Called once the object is registered in its pool and handed out to the requester.
    pub on_post_spawned: Option<PostSpawnedFn<O>>,
}

impl<O> SpawnCallbacks<O> {
    pub(crate) fn pre_registered(&mut self, data: &mut PoolObjectData<O>) {
        if let Some(callback) = self.on_pre_registered.take() {
            callback(data);
        }
    }

    pub(crate) fn post_spawned(&mut self, data: &PoolObjectData<O>) {
        if let Some(callback) = self.on_post_spawned.take() {
            callback(data);
        }
    }
}

impl<O> Default for SpawnCallbacks<O> {
    fn default() -> Self {
        Self {
            on_pre_registered: None,
            on_post_spawned: None,
        }
    }
}

impl<O> fmt::Debug for SpawnCallbacks<O> {
    #[cfg_attr(test, mutants::skip)] // No API contract.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpawnCallbacks")
            .field("on_pre_registered", &self.on_pre_registered.is_some())
            .field("on_post_spawned", &self.on_post_spawned.is_some())
            .finish()
    }
}

/// An order to construct one object of a pooled type.
///
/// The handle of the future object is generated when the request is created, so it can be
/// handed to the caller before the object exists. The type of the object is the type tag of
/// that handle.
///
/// `P` is the payload delivered to the object when it is handed out, for example its initial
/// placement in the world.
///
/// # Example
///
/// ```
/// use deferred_pool::{SpawnPriority, SpawnRequest, TypeTag};
///
/// let request = SpawnRequest::<String, (f32, f32)>::new(TypeTag::new("enemy"), (10.0, 4.0))
///     .with_priority(SpawnPriority::High)
///     .on_post_spawned(|data| println!("enemy {} is ready", data.handle()));
///
/// assert!(request.is_valid());
/// assert_eq!(request.priority(), SpawnPriority::High);
/// ```
pub struct SpawnRequest<O, P> {
    handle: Handle,
    payload: P,
    priority: SpawnPriority,
    callbacks: SpawnCallbacks<O>,
}

impl<O, P> SpawnRequest<O, P> {
    /// Creates a request of [`Normal`][SpawnPriority::Normal] priority, generating its handle.
    ///
    /// If the type tag is not set, the request carries the empty handle and is invalid.
    #[must_use]
    pub fn new(type_tag: TypeTag, payload: P) -> Self {
        Self::with_handle(Handle::new(type_tag), payload)
    }

    /// Creates a request for a handle that was generated in advance.
    #[must_use]
    pub fn with_handle(handle: Handle, payload: P) -> Self {
        Self {
            handle,
            payload,
            priority: SpawnPriority::default(),
            callbacks: SpawnCallbacks::default(),
        }
    }

    /// Sets the priority of the request.
    #[must_use]
    pub fn with_priority(mut self, priority: SpawnPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the function called after construction, before the object is registered.
    #[must_use]
    pub fn on_pre_registered<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(&mut PoolObjectData<O>) + 'static,
    {
        self.callbacks.on_pre_registered = Some(Box::new(callback));
        self
    }

    /// Sets the function called once the object is registered and handed out.
    #[must_use]
    pub fn on_post_spawned<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(&PoolObjectData<O>) + 'static,
    {
        self.callbacks.on_post_spawned = Some(Box::new(callback));
        self
    }

    /// Creates `amount` requests of the same type and priority, each with its own handle.
    #[must_use]
    pub fn make_requests(
        type_tag: TypeTag,
        amount: usize,
        priority: SpawnPriority,
        payload: P,
    ) -> Vec<Self>
    where
        P: Clone,
    {
        (0..amount)
            .map(|_| Self::new(type_tag, payload.clone()).with_priority(priority))
            .collect()
    }

    /// Whether the request can be processed.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.handle.is_valid()
    }

    /// The handle the requested object will be registered under.
    #[must_use]
    pub const fn handle(&self) -> Handle {
        self.handle
    }

    /// The type of the requested object.
    #[must_use]
    pub const fn type_tag(&self) -> TypeTag {
        self.handle.type_tag()
    }

    /// The priority of the request.
    #[must_use]
    pub const fn priority(&self) -> SpawnPriority {
        self.priority
    }

    /// The payload delivered to the object when it is handed out.
    #[must_use]
    pub const fn payload(&self) -> &P {
        &self.payload
    }

    pub(crate) const fn callbacks_mut(&mut self) -> &mut SpawnCallbacks<O> {
        &mut self.callbacks
    }
}

impl<O, P: fmt::Debug> fmt::Debug for SpawnRequest<O, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpawnRequest")
            .field("handle", &self.handle)
            .field("payload", &self.payload)
            .field("priority", &self.priority)
            .field("callbacks", &self.callbacks)
            .finish()
    }
}

/// Keeps only the requests that do not match any of the given free objects.
///
/// A request matches an object if both carry the same handle. If `expected_amount` is given and
/// the number of remaining requests differs from it, a warning is logged.
///
/// An empty `requests` list is a caller error: it is logged and nothing happens.
///
/// # Example
///
/// ```
/// use deferred_pool::{PoolObjectData, SpawnPriority, SpawnRequest, TypeTag, filter_requests};
///
/// let tag = TypeTag::new("bullet");
/// let mut requests = SpawnRequest::<u32, ()>::make_requests(tag, 3, SpawnPriority::Normal, ());
/// let free = [PoolObjectData::new(requests[1].handle(), 0_u32, false)];
///
/// let expected = [requests[0].handle(), requests[2].handle()];
/// filter_requests(&mut requests, &free, Some(2));
///
/// assert_eq!(requests.len(), 2);
/// assert_eq!(requests[0].handle(), expected[0]);
/// assert_eq!(requests[1].handle(), expected[1]);
/// ```
pub fn filter_requests<'a, O, P, I>(
    requests: &mut Vec<SpawnRequest<O, P>>,
    free_objects: I,
    expected_amount: Option<usize>,
) where
    O: 'a,
    I: IntoIterator<Item = &'a PoolObjectData<O>>,
{
    if requests.is_empty() {
        warn!("no spawn requests to filter");
        return;
    }

    let free_handles = free_objects
        .into_iter()
        .map(PoolObjectData::handle)
        .collect::<HashSet<_>>();

    requests.retain(|request| !free_handles.contains(&request.handle));

    if expected_amount.is_some_and(|expected| requests.len() != expected) {
        warn!(
            remaining = requests.len(),
            expected_amount, "filtered spawn request count differs from the expected amount"
        );
    }
}
