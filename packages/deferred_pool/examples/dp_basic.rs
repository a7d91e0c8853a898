//! Basic usage example for `deferred_pool`.
//!
//! A wave of enemies is requested in one frame. The registry hands out handles immediately and
//! constructs the enemies over the following frames, a few per frame, with the boss first.

use deferred_pool::{
    Factory, PoolObject, PoolObjectCallback, PoolObjectState, PoolRegistry, PoolSettings,
    SpawnPriority, SpawnRequest, TakeFromPoolPayload, TypeTag,
};

const ENEMY: TypeTag = TypeTag::new("enemy");

const SETTINGS: &str = r#"
spawn_objects_per_tick = 3
default_priority = "normal"
"#;

/// The lane an enemy appears in.
type Lane = u8;

#[derive(Debug)]
struct Enemy {
    id: usize,
    lane: Lane,
}

impl PoolObjectCallback<Lane> for Enemy {
    fn on_take_from_pool(&mut self, payload: &TakeFromPoolPayload<'_, Lane>) {
        self.lane = *payload.payload;

        if payload.is_new_spawned {
            println!("  enemy {} constructed in lane {}", self.id, self.lane);
        } else {
            println!("  enemy {} reused in lane {}", self.id, self.lane);
        }
    }

    fn on_return_to_pool(&mut self) {
        println!("  enemy {} returned to the pool", self.id);
    }
}

impl PoolObject<Lane> for Enemy {
    fn pool_callbacks(&mut self) -> Option<&mut dyn PoolObjectCallback<Lane>> {
        Some(self)
    }
}

#[derive(Default)]
struct EnemyFactory {
    next_id: usize,
}

impl Factory for EnemyFactory {
    type Object = Enemy;
    type Payload = Lane;

    fn construct_now(&mut self, _request: &SpawnRequest<Enemy, Lane>) -> Enemy {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);

        Enemy { id, lane: 0 }
    }
}

fn main() {
    let settings = PoolSettings::from_toml_str(SETTINGS).expect("settings are valid TOML");

    let mut registry = PoolRegistry::builder().settings(settings).build();
    registry
        .register_pool(ENEMY, EnemyFactory::default())
        .expect("enemy type tag is set");

    println!("Requesting a wave of 7 enemies and a boss");

    let wave = registry
        .acquire_many(ENEMY, 1, 7, SpawnPriority::Normal)
        .expect("enemy pool is registered");
    let boss = registry
        .acquire(ENEMY, 9, SpawnPriority::High)
        .expect("enemy pool is registered");

    let mut frame = 0;
    while !registry.ticks().is_empty() {
        frame += 1;
        println!("Frame {frame}");

        let spawned = registry.tick();
        println!("  {spawned} spawned this frame");
    }

    println!("Boss is {:?}", registry.resolve(boss));

    println!("Returning the first two enemies of the wave");
    for &handle in wave.iter().take(2) {
        registry.release(handle).expect("enemy is active");
    }

    println!("Requesting one more enemy");
    let extra = registry
        .acquire(ENEMY, 4, SpawnPriority::Normal)
        .expect("enemy pool is registered");

    assert_eq!(registry.state_of(extra), PoolObjectState::Active);
    println!("Enemy {extra} is active without waiting for a frame");

    let destroyed = registry.empty_all_pools();
    println!("Destroyed {destroyed} enemies");
}
