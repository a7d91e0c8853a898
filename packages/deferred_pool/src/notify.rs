//! Delivery of lifecycle notifications to pooled objects.
//!
//! Each function checks whether the object has the notification capability and does nothing if
//! it does not. These are the default behaviors of the [`Factory`][crate::Factory] hooks, exposed
//! for factories that override a hook but still want the object to be notified.

use crate::{PoolObject, PoolObjectState, TakeFromPoolPayload};

/// Tells the object it is about to be handed out.
pub fn take_from_pool<O, P>(object: &mut O, payload: &TakeFromPoolPayload<'_, P>)
where
    O: PoolObject<P>,
{
    if let Some(callbacks) = object.pool_callbacks() {
        callbacks.on_take_from_pool(payload);
    }
}

/// Tells the object it is about to be returned to its pool.
pub fn return_to_pool<O, P>(object: &mut O)
where
    O: PoolObject<P>,
{
    if let Some(callbacks) = object.pool_callbacks() {
        callbacks.on_return_to_pool();
    }
}

/// Tells the object its state within the pool changed.
pub fn changed_state_in_pool<O, P>(object: &mut O, new_state: PoolObjectState)
where
    O: PoolObject<P>,
{
    if let Some(callbacks) = object.pool_callbacks() {
        callbacks.on_changed_state_in_pool(new_state);
    }
}
