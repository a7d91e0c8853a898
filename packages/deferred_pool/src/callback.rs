use crate::{PoolObjectState, TakeFromPoolPayload};

/// Notifications a pooled object may choose to receive from its pool.
///
/// All methods do nothing by default, so an implementation only overrides what it cares about.
pub trait PoolObjectCallback<P> {
    /// Called right before the object is handed out by its pool.
    fn on_take_from_pool(&mut self, payload: &TakeFromPoolPayload<'_, P>) {
        _ = payload;
    }

    /// Called right before the object is returned to its pool.
    fn on_return_to_pool(&mut self) {}

    /// Called when the object is activated or deactivated within its pool.
    fn on_changed_state_in_pool(&mut self, new_state: PoolObjectState) {
        _ = new_state;
    }
}

/// A type whose instances can be kept in a pool.
///
/// Pooled objects can opt in to lifecycle notifications by returning themselves (or a part of
/// themselves) from [`pool_callbacks()`][Self::pool_callbacks]. An object without the capability
/// is simply not notified.
///
/// # Example
///
/// ```
/// use deferred_pool::{PoolObject, PoolObjectCallback, TakeFromPoolPayload};
///
/// // A rock does not care about its pool.
/// struct Rock;
///
/// impl PoolObject<()> for Rock {}
///
/// // A projectile moves to its spawn point whenever it is taken from the pool.
/// struct Projectile {
///     position: (f32, f32),
/// }
///
/// impl PoolObjectCallback<(f32, f32)> for Projectile {
///     fn on_take_from_pool(&mut self, payload: &TakeFromPoolPayload<'_, (f32, f32)>) {
///         self.position = *payload.payload;
///     }
/// }
///
/// impl PoolObject<(f32, f32)> for Projectile {
///     fn pool_callbacks(&mut self) -> Option<&mut dyn PoolObjectCallback<(f32, f32)>> {
///         Some(self)
///     }
/// }
/// ```
pub trait PoolObject<P> {
    /// The notification capability of the object, if it has one.
    fn pool_callbacks(&mut self) -> Option<&mut dyn PoolObjectCallback<P>> {
        None
    }
}
