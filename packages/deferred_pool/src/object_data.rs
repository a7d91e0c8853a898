use crate::{Handle, PoolObjectState};

/// A pooled object together with its handle and its active flag.
///
/// The container of a pool owns one `PoolObjectData` per registered object. The data is valid
/// when its handle is valid; the object itself always exists because it is owned by value.
///
/// # Example
///
/// ```
/// use deferred_pool::{Handle, PoolObjectData, PoolObjectState, TypeTag};
///
/// let handle = Handle::new(TypeTag::new("crate"));
/// let data = PoolObjectData::new(handle, "wooden crate", false);
///
/// assert!(data.is_free());
/// assert_eq!(data.state(), PoolObjectState::Inactive);
/// assert_eq!(*data.object(), "wooden crate");
/// ```
#[derive(Debug)]
pub struct PoolObjectData<O> {
    handle: Handle,
    object: O,
    is_active: bool,
}

impl<O> PoolObjectData<O> {
    /// Joins an object to its handle.
    #[must_use]
    pub const fn new(handle: Handle, object: O, is_active: bool) -> Self {
        Self {
            handle,
            object,
            is_active,
        }
    }

    /// The handle through which callers refer to the object.
    #[must_use]
    pub const fn handle(&self) -> Handle {
        self.handle
    }

    /// The pooled object.
    #[must_use]
    pub const fn object(&self) -> &O {
        &self.object
    }

    /// The pooled object, mutably.
    #[must_use]
    pub const fn object_mut(&mut self) -> &mut O {
        &mut self.object
    }

    /// Consumes the data, returning the pooled object.
    #[must_use]
    pub fn into_object(self) -> O {
        self.object
    }

    /// Whether the data refers to a registered object.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.handle.is_valid()
    }

    /// Whether the object is currently taken from the pool.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.is_active && self.is_valid()
    }

    /// Whether the object is inactive and ready to be taken from the pool.
    #[must_use]
    pub const fn is_free(&self) -> bool {
        !self.is_active && self.is_valid()
    }

    /// The state of the object, derived from its validity and its active flag.
    #[must_use]
    pub const fn state(&self) -> PoolObjectState {
        if !self.is_valid() {
            PoolObjectState::None
        } else if self.is_active {
            PoolObjectState::Active
        } else {
            PoolObjectState::Inactive
        }
    }

    pub(crate) const fn set_active(&mut self, is_active: bool) {
        self.is_active = is_active;
    }
}
