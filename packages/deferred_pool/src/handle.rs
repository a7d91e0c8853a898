use std::fmt;
use std::hash::{Hash, Hasher};
use std::num::NonZero;

use tracing::warn;

use crate::{PoolObjectData, SpawnRequest, TypeTag};

/// A stable, opaque reference to a pooled object.
///
/// A handle is generated before the object it refers to exists: callers receive it as soon as
/// they ask a pool for an object, even when the construction of that object is deferred to a
/// later tick. The handle is resolved through the pool that owns the object and is never
/// dereferenced directly, so it cannot dangle. Once the object is removed from its pool, the
/// handle simply stops resolving.
///
/// A handle is valid if it carries a set [`TypeTag`] and a generated token. [`Handle::EMPTY`]
/// (also the [`Default`]) is the universal "no handle" value.
///
/// Two handles are equal if their tokens are equal. The type tag does not participate in
/// equality or hashing.
///
/// # Example
///
/// ```
/// use deferred_pool::{Handle, TypeTag};
///
/// let handle = Handle::new(TypeTag::new("projectile"));
/// assert!(handle.is_valid());
/// assert_eq!(handle.type_tag(), TypeTag::new("projectile"));
///
/// assert_ne!(handle, Handle::EMPTY);
/// assert_ne!(handle, Handle::new(TypeTag::new("projectile")));
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct Handle {
    type_tag: TypeTag,
    token: Option<NonZero<u128>>,
}

impl Handle {
    /// The empty handle. It never resolves to anything.
    pub const EMPTY: Self = Self {
        type_tag: TypeTag::UNSET,
        token: None,
    };

    /// Generates a new unique handle for an object of the given type.
    ///
    /// If the type tag is not set, a warning is logged and [`Handle::EMPTY`] is returned.
    #[must_use]
    pub fn new(type_tag: TypeTag) -> Self {
        if !type_tag.is_set() {
            warn!("type tag is not set, cannot generate a handle");
            return Self::EMPTY;
        }

        Self {
            type_tag,
            token: Some(new_token()),
        }
    }

    /// Whether the handle was generated for a type.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.type_tag.is_set() && self.token.is_some()
    }

    /// The type of the object the handle refers to.
    #[must_use]
    pub const fn type_tag(&self) -> TypeTag {
        self.type_tag
    }

    /// The unique token of the handle, `None` for the empty handle.
    #[must_use]
    pub const fn token(&self) -> Option<NonZero<u128>> {
        self.token
    }

    /// Collects the handles of the given spawn requests, in order.
    #[must_use]
    pub fn requests_to_handles<O, P>(requests: &[SpawnRequest<O, P>]) -> Vec<Self> {
        requests.iter().map(SpawnRequest::handle).collect()
    }

    /// Collects the handles of the given pooled objects, in order.
    #[must_use]
    pub fn objects_to_handles<O>(objects: &[PoolObjectData<O>]) -> Vec<Self> {
        objects.iter().map(PoolObjectData::handle).collect()
    }
}

// 128 random bits; zero is reserved for "not generated".
fn new_token() -> NonZero<u128> {
    loop {
        if let Some(token) = NonZero::new(rand::random::<u128>()) {
            return token;
        }
    }
}

impl PartialEq for Handle {
    fn eq(&self, other: &Self) -> bool {
        self.token == other.token
    }
}

impl Eq for Handle {}

impl Hash for Handle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.token.hash(state);
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.token {
            Some(token) => write!(f, "{:032x}", token.get()),
            None => f.write_str("<empty>"),
        }
    }
}
