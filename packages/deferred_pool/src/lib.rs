#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Per-type object pools that hand out handles immediately and construct objects later, in
//! bounded batches, ordered by priority.
//!
//! Constructing some objects is expensive enough that doing many of them at once causes a visible
//! stall, as in a game spawning a wave of enemies in one frame. This crate spreads that cost over
//! time. A caller asking for an object immediately receives a [`Handle`] for it. If the pool has
//! a free object, that object is reused on the spot. Otherwise the request joins the spawn queue
//! of the pool and the object is constructed on a later tick of the host loop, a few objects per
//! tick. Returned objects stay in the pool for the next caller.
//!
//! # Quick start
//!
//! ```
//! use deferred_pool::{
//!     Factory, PoolObject, PoolObjectCallback, PoolObjectState, PoolRegistry, SpawnPriority,
//!     SpawnRequest, TakeFromPoolPayload, TypeTag,
//! };
//!
//! // Where a bullet appears when it is taken from the pool.
//! type Position = (f32, f32);
//!
//! #[derive(Default)]
//! struct Bullet {
//!     position: Position,
//! }
//!
//! impl PoolObjectCallback<Position> for Bullet {
//!     fn on_take_from_pool(&mut self, payload: &TakeFromPoolPayload<'_, Position>) {
//!         self.position = *payload.payload;
//!     }
//! }
//!
//! impl PoolObject<Position> for Bullet {
//!     fn pool_callbacks(&mut self) -> Option<&mut dyn PoolObjectCallback<Position>> {
//!         Some(self)
//!     }
//! }
//!
//! struct BulletFactory;
//!
//! impl Factory for BulletFactory {
//!     type Object = Bullet;
//!     type Payload = Position;
//!
//!     fn construct_now(&mut self, _request: &SpawnRequest<Bullet, Position>) -> Bullet {
//!         Bullet::default()
//!     }
//! }
//!
//! const BULLET: TypeTag = TypeTag::new("bullet");
//!
//! let mut registry = PoolRegistry::builder().spawn_objects_per_tick(2).build();
//! registry.register_pool(BULLET, BulletFactory).unwrap();
//!
//! let handles = registry
//!     .acquire_many(BULLET, (1.0, 2.0), 3, SpawnPriority::Normal)
//!     .unwrap();
//!
//! // Two bullets per tick.
//! assert_eq!(registry.tick(), 2);
//! assert_eq!(registry.tick(), 1);
//!
//! let bullet = registry.resolve(handles[2]).unwrap();
//! assert_eq!(bullet.position, (1.0, 2.0));
//!
//! registry.release(handles[0]).unwrap();
//! assert_eq!(registry.state_of(handles[0]), PoolObjectState::Inactive);
//! ```
//!
//! # Ticks
//!
//! A pool with waiting requests asks its [`NextTick`] source for exactly one tick and asks again
//! only after that tick was delivered and requests remain. The default source is a
//! [`TickQueue`] that [`PoolRegistry::tick()`] drains, for hosts that poll once per frame. Hosts
//! with their own scheduler supply a [`NextTick`] implementation through
//! [`PoolRegistryBuilder::next_tick()`] and deliver each tick through
//! [`PoolRegistry::on_next_tick()`].
//!
//! # Priorities
//!
//! Requests are processed in [`SpawnPriority`] order, oldest first within the same priority.
//! [`Critical`][SpawnPriority::Critical] requests skip the queue and are constructed inside the
//! call that makes them.
//!
//! # Configuration
//!
//! The per-tick budget and the default priority come from [`PoolSettings`], which can be read
//! from TOML.
//!
//! # Thread safety
//!
//! Pools are single-threaded. Factories and callbacks are not required to be `Send`, so neither
//! is the registry.

mod callback;
mod container;
mod error;
mod factory;
mod handle;
pub mod notify;
mod object_data;
mod object_state;
mod payload;
mod priority;
mod registry;
mod request;
mod settings;
mod spawn_queue;
mod spawner;
mod tick;
mod type_tag;

#[cfg(test)]
mod test_utils;

pub use callback::*;
pub use container::*;
pub use error::*;
pub use factory::*;
pub use handle::*;
pub use object_data::*;
pub use object_state::*;
pub use payload::*;
pub use priority::*;
pub use registry::*;
pub use request::*;
pub use settings::*;
pub use spawn_queue::*;
pub use spawner::SchedulerState;
pub(crate) use spawner::Spawner;
pub use tick::*;
pub use type_tag::*;
