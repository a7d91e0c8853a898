//! Factories and objects shared by the unit tests of this crate.

use std::cell::Cell;
use std::rc::Rc;

use crate::{
    Factory, PoolObject, PoolObjectCallback, PoolObjectState, SpawnRequest, TakeFromPoolPayload,
    TypeTag,
};

pub(crate) const BULLET: TypeTag = TypeTag::new("bullet");

/// Remembers every notification it receives.
#[derive(Debug, Default)]
pub(crate) struct Bullet {
    pub(crate) position: u32,
    pub(crate) takes: Vec<bool>,
    pub(crate) returns: usize,
    pub(crate) states: Vec<PoolObjectState>,
}

impl PoolObjectCallback<u32> for Bullet {
    fn on_take_from_pool(&mut self, payload: &TakeFromPoolPayload<'_, u32>) {
        self.position = *payload.payload;
        self.takes.push(payload.is_new_spawned);
    }

    fn on_return_to_pool(&mut self) {
        self.returns += 1;
    }

    fn on_changed_state_in_pool(&mut self, new_state: PoolObjectState) {
        self.states.push(new_state);
    }
}

impl PoolObject<u32> for Bullet {
    fn pool_callbacks(&mut self) -> Option<&mut dyn PoolObjectCallback<u32>> {
        Some(self)
    }
}

/// Counts constructions and destructions through counters the test keeps a clone of.
#[derive(Clone, Debug, Default)]
pub(crate) struct BulletFactory {
    pub(crate) constructed: Rc<Cell<usize>>,
    pub(crate) destroyed: Rc<Cell<usize>>,
}

impl Factory for BulletFactory {
    type Object = Bullet;
    type Payload = u32;

    fn construct_now(&mut self, _request: &SpawnRequest<Bullet, u32>) -> Bullet {
        self.constructed.set(self.constructed.get() + 1);
        Bullet::default()
    }

    fn destroy(&mut self, object: Bullet) {
        self.destroyed.set(self.destroyed.get() + 1);
        drop(object);
    }
}

pub(crate) fn bullet_request(payload: u32) -> SpawnRequest<Bullet, u32> {
    SpawnRequest::new(BULLET, payload)
}
