use std::any::type_name;
use std::fmt;

/// Identifies the type of object a pool holds.
///
/// Every pool, handle and spawn request carries the tag of the type it belongs to. The tag is
/// opaque to the pools themselves: it is only compared, hashed and printed.
///
/// The default value is [`TypeTag::UNSET`], which never identifies a pool. Operations that
/// receive an unset tag reject the call.
///
/// # Example
///
/// ```
/// use deferred_pool::TypeTag;
///
/// let projectiles = TypeTag::new("projectile");
/// assert!(projectiles.is_set());
/// assert_eq!(projectiles.name(), "projectile");
///
/// assert!(!TypeTag::default().is_set());
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct TypeTag {
    name: &'static str,
}

impl TypeTag {
    /// The tag that identifies no type.
    pub const UNSET: Self = Self { name: "" };

    /// Creates a tag with the given name. An empty name produces [`TypeTag::UNSET`].
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self { name }
    }

    /// Creates a tag named after the Rust type `T`.
    ///
    /// ```
    /// use deferred_pool::TypeTag;
    ///
    /// struct Projectile;
    ///
    /// assert_eq!(TypeTag::of::<Projectile>(), TypeTag::of::<Projectile>());
    /// assert_ne!(TypeTag::of::<Projectile>(), TypeTag::of::<u32>());
    /// ```
    #[must_use]
    pub fn of<T: ?Sized>() -> Self {
        Self::new(type_name::<T>())
    }

    /// The name the tag was created with.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the tag identifies a type.
    #[must_use]
    pub const fn is_set(&self) -> bool {
        !self.name.is_empty()
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_set() {
            f.write_str(self.name)
        } else {
            f.write_str("<unset>")
        }
    }
}
