use std::mem::size_of;
use std::sync::Once;

use sim_engine::engine::chunk::compute_chunk_layout;
use sim_engine::engine::component::{archetype_of, component_id_of};
use sim_engine::engine::error::{EngineError, LayoutError};
use sim_engine::engine::types::{build_archetype, Archetype, CHUNK_SIZE};

#[derive(Clone, Copy, Debug, PartialEq)]
struct Position {
    x: i32,
    y: i32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Velocity {
    x: i32,
    y: i32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Render {
    color: i32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Comflabulation {
    thingy: f32,
    mingy: bool,
    dingy: i32,
}

// Components used only by the failure-path tests, registered last so the
// ids of the types above stay stable.
#[derive(Clone, Copy)]
struct Huge([u8; 2 * CHUNK_SIZE]);

#[derive(Clone, Copy)]
struct OddByte(u8);

#[derive(Clone, Copy)]
struct Wide(u64);

static INIT: Once = Once::new();

fn init_registry() {
    INIT.call_once(|| {
        component_id_of::<Position>().unwrap();
        component_id_of::<Velocity>().unwrap();
        component_id_of::<Render>().unwrap();
        component_id_of::<Comflabulation>().unwrap();
        component_id_of::<Huge>().unwrap();
        component_id_of::<OddByte>().unwrap();
        component_id_of::<Wide>().unwrap();
    });
}

#[test]
fn component_ids_are_stable_and_dense() {
    init_registry();

    let first = component_id_of::<Position>().unwrap();
    let second = component_id_of::<Position>().unwrap();
    assert_eq!(first, second);

    let velocity = component_id_of::<Velocity>().unwrap();
    assert_ne!(first, velocity);
}

#[test]
fn archetype_is_order_independent() {
    init_registry();

    let oracle = build_archetype(&[
        component_id_of::<Render>().unwrap(),
        component_id_of::<Position>().unwrap(),
        component_id_of::<Velocity>().unwrap(),
    ]);

    let a = archetype_of::<(Position, Render, Velocity)>().unwrap();
    let b = archetype_of::<(Velocity, Position, Render)>().unwrap();
    let c = archetype_of::<(Render, Velocity, Position)>().unwrap();

    assert_eq!(a, oracle);
    assert_eq!(b, oracle);
    assert_eq!(c, oracle);
}

#[test]
fn archetype_containment_is_subset() {
    init_registry();

    let full = archetype_of::<(Position, Velocity, Render)>().unwrap();
    let pair = archetype_of::<(Position, Render)>().unwrap();
    let other = archetype_of::<(Position, Comflabulation)>().unwrap();

    assert!(full.contains(&pair));
    assert!(!pair.contains(&full));
    assert!(!full.contains(&other));
    assert!(full.contains(&full));
}

fn check_two_column_layout<A: sim_engine::Component, B: sim_engine::Component>() {
    let a = component_id_of::<A>().unwrap();
    let b = component_id_of::<B>().unwrap();
    let (first, second, first_size, second_size) = if a < b {
        (a, b, size_of::<A>(), size_of::<B>())
    } else {
        (b, a, size_of::<B>(), size_of::<A>())
    };

    let layout = compute_chunk_layout(build_archetype(&[a, b])).unwrap();

    // Capacity oracle.
    let capacity = CHUNK_SIZE / (size_of::<A>() + size_of::<B>());
    assert_eq!(layout.capacity, capacity);

    // Columns are packed in ascending id order and do not overlap.
    assert_eq!(layout.column_offsets[first as usize], 0);
    assert_eq!(layout.column_offsets[second as usize], capacity * first_size);
    assert!(layout.column_offsets[second as usize] + capacity * second_size <= CHUNK_SIZE);
}

#[test]
fn layout_matches_capacity_and_offset_oracles() {
    init_registry();

    check_two_column_layout::<Render, Position>();
    check_two_column_layout::<Position, Velocity>();
    check_two_column_layout::<Velocity, Comflabulation>();
}

#[test]
fn layout_is_order_independent() {
    init_registry();

    let forward = compute_chunk_layout(archetype_of::<(Render, Position)>().unwrap()).unwrap();
    let backward = compute_chunk_layout(archetype_of::<(Position, Render)>().unwrap()).unwrap();

    assert_eq!(forward.archetype, backward.archetype);
    assert_eq!(forward.capacity, backward.capacity);
    assert_eq!(forward.column_offsets, backward.column_offsets);
}

#[test]
fn three_column_layout_fills_without_overlap() {
    init_registry();

    let archetype = archetype_of::<(Position, Velocity, Comflabulation)>().unwrap();
    let layout = compute_chunk_layout(archetype).unwrap();

    let row = size_of::<Position>() + size_of::<Velocity>() + size_of::<Comflabulation>();
    assert_eq!(layout.capacity, CHUNK_SIZE / row);

    // Offsets strictly increase across present ids and each column ends
    // where the next begins.
    let mut expected_offset = 0usize;
    for component_id in archetype.iter_ids() {
        let info = sim_engine::component_info(component_id).unwrap();
        assert_eq!(layout.column_offsets[component_id as usize], expected_offset);
        expected_offset += layout.capacity * info.size;
    }
    assert!(expected_offset <= CHUNK_SIZE);
}

#[test]
fn empty_archetype_is_rejected() {
    init_registry();

    let result = compute_chunk_layout(Archetype::new());
    assert!(matches!(
        result,
        Err(EngineError::Layout(LayoutError::EmptyArchetype))
    ));
}

#[test]
fn oversized_row_is_rejected() {
    init_registry();

    let huge = component_id_of::<Huge>().unwrap();
    let result = compute_chunk_layout(build_archetype(&[huge]));
    assert!(matches!(
        result,
        Err(EngineError::Layout(LayoutError::RowTooLarge { .. }))
    ));
}

#[test]
fn misaligned_column_is_rejected() {
    init_registry();

    // One byte per row in the first column makes the second column start
    // at an offset that is not a multiple of 8.
    let odd = component_id_of::<OddByte>().unwrap();
    let wide = component_id_of::<Wide>().unwrap();
    assert!(odd < wide, "registration order fixed by init_registry");

    let result = compute_chunk_layout(build_archetype(&[odd, wide]));
    assert!(matches!(
        result,
        Err(EngineError::Layout(LayoutError::MisalignedColumn { .. }))
    ));
}

#[test]
fn zero_sized_components_are_rejected() {
    init_registry();

    #[derive(Clone, Copy)]
    struct Empty;

    let result = component_id_of::<Empty>();
    assert!(matches!(
        result,
        Err(EngineError::Registry(
            sim_engine::RegistryError::ZeroSized { .. }
        ))
    ));
}
