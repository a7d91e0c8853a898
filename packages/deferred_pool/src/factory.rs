use crate::{PoolObject, PoolObjectData, PoolObjectState, SpawnRequest, TakeFromPoolPayload};

/// Knows how to construct and destroy the objects of one pooled type.
///
/// Each pool is bound to exactly one factory. The pool decides when objects are constructed
/// (immediately for [`Critical`][crate::SpawnPriority::Critical] requests, otherwise in
/// per-tick batches) and the factory decides how.
///
/// Only [`construct_now()`][Self::construct_now] must be implemented. The lifecycle hooks have
/// default implementations that forward the take, return and state change notifications to the
/// object's [`PoolObjectCallback`][crate::PoolObjectCallback] capability, if it has one.
/// Implementations that override them usually still want to call the forwarding helpers in
/// [`notify`][crate::notify].
///
/// # Example
///
/// ```
/// use deferred_pool::{Factory, PoolObject, SpawnRequest};
///
/// struct Particle {
///     lifetime: u32,
/// }
///
/// impl PoolObject<()> for Particle {}
///
/// struct ParticleFactory;
///
/// impl Factory for ParticleFactory {
///     type Object = Particle;
///     type Payload = ();
///
///     fn construct_now(&mut self, _request: &SpawnRequest<Particle, ()>) -> Particle {
///         Particle { lifetime: 60 }
///     }
/// }
/// ```
pub trait Factory {
    /// The type of the objects this factory constructs.
    type Object: PoolObject<Self::Payload>;

    /// The payload delivered to objects when they are taken from the pool.
    type Payload;

    /// Constructs the requested object.
    ///
    /// # Panics
    ///
    /// Construction failure is not recoverable: an implementation that cannot produce a usable
    /// object must panic. A pool never registers a partially constructed object.
    fn construct_now(&mut self, request: &SpawnRequest<Self::Object, Self::Payload>)
    -> Self::Object;

    /// Permanently releases an object that is removed from its pool.
    fn destroy(&mut self, object: Self::Object) {
        drop(object);
    }

    /// Called after construction, before the object is registered in its pool.
    fn on_pre_registered(
        &mut self,
        request: &SpawnRequest<Self::Object, Self::Payload>,
        data: &mut PoolObjectData<Self::Object>,
    ) {
        _ = (request, data);
    }

    /// Called once the object is registered in its pool.
    ///
    /// The default delivers [`on_take_from_pool()`][Self::on_take_from_pool], flagging the
    /// object as newly spawned.
    fn on_post_spawned(
        &mut self,
        request: &SpawnRequest<Self::Object, Self::Payload>,
        data: &mut PoolObjectData<Self::Object>,
    ) {
        let payload = TakeFromPoolPayload::new_spawned(request.payload());
        self.on_take_from_pool(data.object_mut(), &payload);
    }

    /// Called right before an object is handed out, whether reused or newly spawned.
    fn on_take_from_pool(
        &mut self,
        object: &mut Self::Object,
        payload: &TakeFromPoolPayload<'_, Self::Payload>,
    ) {
        crate::notify::take_from_pool(object, payload);
    }

    /// Called right before an object is returned to its pool.
    fn on_return_to_pool(&mut self, object: &mut Self::Object) {
        crate::notify::return_to_pool::<_, Self::Payload>(object);
    }

    /// Called when an object is activated or deactivated within its pool.
    fn on_changed_state_in_pool(&mut self, new_state: PoolObjectState, object: &mut Self::Object) {
        crate::notify::changed_state_in_pool::<_, Self::Payload>(object, new_state);
    }
}
