//! Integration tests for `deferred_pool` driven through the public API only.

use std::cell::RefCell;
use std::rc::Rc;

use deferred_pool::{
    Error, Factory, Handle, NextTick, PoolObject, PoolObjectCallback, PoolObjectData,
    PoolObjectState, PoolRegistry, PoolSettings, SpawnPriority, SpawnRequest, TakeFromPoolPayload,
    TypeTag,
};

const ZOMBIE: TypeTag = TypeTag::new("zombie");
const GHOST: TypeTag = TypeTag::new("ghost");

type Journal = Rc<RefCell<Vec<String>>>;

/// A monster that writes every notification it receives to a shared journal.
struct Monster {
    name: String,
    journal: Journal,
}

impl PoolObjectCallback<&'static str> for Monster {
    fn on_take_from_pool(&mut self, payload: &TakeFromPoolPayload<'_, &'static str>) {
        self.journal.borrow_mut().push(format!(
            "take {} {} new={}",
            self.name, payload.payload, payload.is_new_spawned
        ));
    }

    fn on_return_to_pool(&mut self) {
        self.journal.borrow_mut().push(format!("return {}", self.name));
    }

    fn on_changed_state_in_pool(&mut self, new_state: PoolObjectState) {
        self.journal
            .borrow_mut()
            .push(format!("state {} {new_state:?}", self.name));
    }
}

impl PoolObject<&'static str> for Monster {
    fn pool_callbacks(&mut self) -> Option<&mut dyn PoolObjectCallback<&'static str>> {
        Some(self)
    }
}

struct MonsterFactory {
    kind: &'static str,
    built: usize,
    journal: Journal,
}

impl MonsterFactory {
    fn new(kind: &'static str, journal: &Journal) -> Self {
        Self {
            kind,
            built: 0,
            journal: Rc::clone(journal),
        }
    }
}

impl Factory for MonsterFactory {
    type Object = Monster;
    type Payload = &'static str;

    fn construct_now(&mut self, _request: &SpawnRequest<Monster, &'static str>) -> Monster {
        self.built += 1;
        let name = format!("{}{}", self.kind, self.built);
        self.journal.borrow_mut().push(format!("construct {name}"));

        Monster {
            name,
            journal: Rc::clone(&self.journal),
        }
    }

    fn destroy(&mut self, object: Monster) {
        self.journal
            .borrow_mut()
            .push(format!("destroy {}", object.name));
    }

    fn on_pre_registered(
        &mut self,
        _request: &SpawnRequest<Monster, &'static str>,
        data: &mut PoolObjectData<Monster>,
    ) {
        self.journal
            .borrow_mut()
            .push(format!("register {}", data.object().name));
    }
}

/// Records tick requests so the test can deliver them one at a time.
#[derive(Default)]
struct ManualTicks {
    requested: Vec<TypeTag>,
}

impl NextTick for ManualTicks {
    fn schedule_next_tick(&mut self, type_tag: TypeTag) {
        self.requested.push(type_tag);
    }
}

fn registry(spawn_objects_per_tick: i64) -> (PoolRegistry<Monster, &'static str>, Journal) {
    let journal = Journal::default();

    let mut registry = PoolRegistry::builder()
        .spawn_objects_per_tick(spawn_objects_per_tick)
        .build();
    registry
        .register_pool(ZOMBIE, MonsterFactory::new("zombie", &journal))
        .unwrap();
    registry
        .register_pool(GHOST, MonsterFactory::new("ghost", &journal))
        .unwrap();

    (registry, journal)
}

fn drain(journal: &Journal) -> Vec<String> {
    journal.borrow_mut().drain(..).collect()
}

#[test]
fn spawn_runs_hooks_in_order() {
    let (mut registry, journal) = registry(5);

    let order = Rc::clone(&journal);
    let request = SpawnRequest::new(ZOMBIE, "graveyard")
        .on_pre_registered({
            let order = Rc::clone(&order);
            move |_| order.borrow_mut().push("request pre".to_string())
        })
        .on_post_spawned(move |_| order.borrow_mut().push("request post".to_string()));

    registry.acquire_request(request).unwrap();
    assert!(drain(&journal).is_empty());

    registry.tick();

    assert_eq!(
        drain(&journal),
        [
            "construct zombie1",
            "request pre",
            "register zombie1",
            "state zombie1 Active",
            "request post",
            "take zombie1 graveyard new=true",
        ]
    );
}

#[test]
fn priorities_decide_construction_order() {
    let (mut registry, journal) = registry(10);

    registry
        .acquire(ZOMBIE, "normal", SpawnPriority::Normal)
        .unwrap();
    registry
        .acquire(ZOMBIE, "medium", SpawnPriority::Medium)
        .unwrap();
    registry.acquire(ZOMBIE, "high", SpawnPriority::High).unwrap();
    registry
        .acquire(ZOMBIE, "high again", SpawnPriority::High)
        .unwrap();

    registry.tick();

    let takes = drain(&journal)
        .into_iter()
        .filter(|line| line.starts_with("take"))
        .collect::<Vec<_>>();
    assert_eq!(
        takes,
        [
            "take zombie1 high new=true",
            "take zombie2 high again new=true",
            "take zombie3 medium new=true",
            "take zombie4 normal new=true",
        ]
    );
}

#[test]
fn critical_request_overtakes_queue() {
    let (mut registry, journal) = registry(1);

    let queued = registry
        .acquire(ZOMBIE, "queued", SpawnPriority::High)
        .unwrap();
    let critical = registry
        .acquire(ZOMBIE, "now", SpawnPriority::Critical)
        .unwrap();

    assert_eq!(registry.state_of(critical), PoolObjectState::Active);
    assert!(registry.is_pending(queued));
    assert!(drain(&journal).contains(&"take zombie1 now new=true".to_string()));
}

#[test]
fn pools_progress_independently() {
    let (mut registry, _journal) = registry(2);

    let zombies = registry
        .acquire_many(ZOMBIE, "north", 3, SpawnPriority::Normal)
        .unwrap();
    let ghosts = registry
        .acquire_many(GHOST, "south", 1, SpawnPriority::Normal)
        .unwrap();

    // Each pool has its own budget per tick.
    assert_eq!(registry.tick(), 3);
    assert_eq!(registry.tick(), 1);
    assert_eq!(registry.tick(), 0);

    for handle in zombies.iter().chain(&ghosts) {
        assert_eq!(registry.state_of(*handle), PoolObjectState::Active);
    }

    assert_eq!(registry.container(ZOMBIE).unwrap().len(), 3);
    assert_eq!(registry.container(GHOST).unwrap().len(), 1);
}

#[test]
fn round_trip_reuses_object() {
    let (mut registry, journal) = registry(5);

    let first = registry
        .acquire(GHOST, "attic", SpawnPriority::Critical)
        .unwrap();
    registry.release(first).unwrap();
    drain(&journal);

    let second = registry
        .acquire(GHOST, "cellar", SpawnPriority::Normal)
        .unwrap();

    assert_eq!(second, first);
    assert_eq!(
        drain(&journal),
        ["state ghost1 Active", "take ghost1 cellar new=false"]
    );
    assert_eq!(registry.resolve(second).unwrap().name, "ghost1");
}

#[test]
fn release_notifies_before_deactivating() {
    let (mut registry, journal) = registry(5);

    let handle = registry
        .acquire(GHOST, "attic", SpawnPriority::Critical)
        .unwrap();
    drain(&journal);

    registry.release(handle).unwrap();

    assert_eq!(drain(&journal), ["return ghost1", "state ghost1 Inactive"]);
    assert!(matches!(registry.release(handle), Err(Error::NotActive(_))));
}

#[test]
fn manual_tick_source_receives_one_request_per_batch() {
    let journal = Journal::default();
    let mut registry = PoolRegistry::builder()
        .spawn_objects_per_tick(2)
        .next_tick(ManualTicks::default())
        .build();
    registry
        .register_pool(ZOMBIE, MonsterFactory::new("zombie", &journal))
        .unwrap();

    registry
        .acquire_many(ZOMBIE, "field", 5, SpawnPriority::Normal)
        .unwrap();
    assert_eq!(registry.ticks().requested, [ZOMBIE]);

    let mut delivered = 0;
    while let Some(type_tag) = registry.ticks_mut().requested.pop() {
        delivered += 1;
        registry.on_next_tick(type_tag);
    }

    assert_eq!(delivered, 3);
    assert_eq!(registry.container(ZOMBIE).unwrap().len(), 5);
}

#[test]
fn settings_configure_registry() {
    let settings = PoolSettings::from_toml_str(
        r#"
        spawn_objects_per_tick = -3
        default_priority = "high"
        "#,
    )
    .unwrap();

    let registry = PoolRegistry::<Monster, &'static str>::builder()
        .settings(settings)
        .build();

    assert_eq!(registry.spawn_budget().get(), 1);
    assert_eq!(
        registry.new_request(ZOMBIE, "x").priority(),
        SpawnPriority::High
    );
}

#[test]
fn remove_pool_destroys_through_factory() {
    let (mut registry, journal) = registry(5);

    registry
        .acquire_many(GHOST, "attic", 2, SpawnPriority::Critical)
        .unwrap();
    let pending = registry
        .acquire(GHOST, "later", SpawnPriority::Normal)
        .unwrap();
    drain(&journal);

    assert_eq!(registry.remove_pool(GHOST).unwrap(), 2);

    assert_eq!(drain(&journal), ["destroy ghost1", "destroy ghost2"]);
    assert!(!registry.is_pending(pending));
    assert!(matches!(
        registry.acquire(GHOST, "gone", SpawnPriority::Normal),
        Err(Error::UnknownPool(tag)) if tag == GHOST
    ));
}

#[test]
fn handles_identify_objects_across_pools() {
    let (mut registry, _journal) = registry(5);

    let zombie = registry
        .acquire(ZOMBIE, "a", SpawnPriority::Critical)
        .unwrap();
    let ghost = registry
        .acquire(GHOST, "b", SpawnPriority::Critical)
        .unwrap();

    assert_ne!(zombie, ghost);
    assert_eq!(zombie.type_tag(), ZOMBIE);
    assert_eq!(ghost.type_tag(), GHOST);
    assert!(registry.resolve(Handle::EMPTY).is_none());
    assert_eq!(registry.state_of(Handle::new(ZOMBIE)), PoolObjectState::None);
}
