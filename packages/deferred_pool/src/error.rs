use thiserror::Error;

use crate::{Handle, TypeTag};

/// Errors that can occur when callers interact with the pools.
///
/// These are validation errors: the call was rejected and nothing was mutated. Violations of the
/// pool's internal invariants are not reported through this type, they panic instead.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The caller supplied a type tag that was never set.
    #[error("type tag is not set")]
    UnsetTypeTag,

    /// The caller supplied the empty handle or a handle that was never generated.
    #[error("handle is not valid")]
    InvalidHandle,

    /// No pool is registered for the requested type.
    #[error("no pool is registered for type '{0}'")]
    UnknownPool(TypeTag),

    /// The handle is valid but does not resolve to any registered object or pending request.
    #[error("handle {0} does not resolve to any pooled object")]
    NotFound(Handle),

    /// The object is already inactive, so it cannot be returned to the pool again.
    #[error("object {0} is not active")]
    NotActive(Handle),

    /// A raw priority value does not correspond to any known priority.
    #[error("unknown spawn priority value {0}")]
    UnknownPriority(u8),

    /// The pool settings could not be parsed.
    #[error("invalid pool settings: {0}")]
    InvalidSettings(#[from] toml::de::Error),
}

/// A specialized `Result` type for pool operations, returning the crate's
/// [`Error`] type as the error value.
pub type Result<T> = std::result::Result<T, Error>;
