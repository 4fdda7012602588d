#![allow(dead_code)]

use std::sync::Once;

use sim_engine::engine::component::component_id_of;
use sim_engine::engine::entity::EntityManager;

pub const AGENTS_SMALL: usize = 100_000;
pub const AGENTS_MED: usize = 1_000_000;
pub const AGENTS_LARGE: usize = 10_000_000;

#[derive(Clone, Copy)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

#[derive(Clone, Copy)]
pub struct Velocity {
    pub x: i32,
    pub y: i32,
}

#[derive(Clone, Copy)]
pub struct Comflabulation {
    pub thingy: f32,
    pub mingy: bool,
    pub dingy: i32,
}

static INIT: Once = Once::new();

pub fn init_components() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
        component_id_of::<Position>().unwrap();
        component_id_of::<Velocity>().unwrap();
        component_id_of::<Comflabulation>().unwrap();
    });
}

/// Populates a store with entities alternating between the two-component
/// and three-component archetypes, the worst case for iteration.
pub fn populate(manager: &mut EntityManager, agent_count: usize) {
    for i in 0..agent_count {
        let value = i as i32;
        if i % 2 != 0 {
            manager
                .create_entity_with((Position { x: value, y: value }, Velocity { x: 1, y: 1 }))
                .unwrap();
        } else {
            manager
                .create_entity_with((
                    Position { x: value, y: value },
                    Velocity { x: 1, y: 1 },
                    Comflabulation { thingy: 1.0, mingy: true, dingy: 0 },
                ))
                .unwrap();
        }
    }
}
