//! End-to-end properties of the buffer format

use nether_flat::reader::{self, Table};
use nether_flat::{FlatBuilder, FlatStruct, Offset, TableOffset};

/// Profile { name: string, events: [Event] } / Event { is_open: bool, at: i32, frame: i32 }
fn build_profile(builder: &mut FlatBuilder, name: &str, events: &[(bool, i32, i32)]) -> Offset<TableOffset> {
    let event_offsets: Vec<_> = events
        .iter()
        .map(|&(is_open, at, frame)| {
            builder.start_object(3).unwrap();
            builder.push_slot(1, at, 0).unwrap();
            builder.push_slot(2, frame, 0).unwrap();
            builder.push_slot(0, is_open, false).unwrap();
            builder.end_object().unwrap()
        })
        .collect();
    let events = builder.create_vector_of_offsets(&event_offsets).unwrap();
    let name = builder.create_string(name).unwrap();

    builder.start_object(2).unwrap();
    builder.push_slot_offset(0, name).unwrap();
    builder.push_slot_offset(1, events).unwrap();
    builder.end_object().unwrap()
}

#[test]
fn test_profile_scenario() {
    let mut builder = FlatBuilder::new();
    let events = [(true, 0, 1), (false, 250, 2)];
    let root = build_profile(&mut builder, "match1", &events);
    let bytes = builder.finish(root).unwrap().to_vec();

    let profile = reader::root(&bytes).unwrap();
    assert_eq!(profile.get_str(0).unwrap(), Some("match1"));
    let list = profile.get_vector::<Table>(1).unwrap().unwrap();
    assert_eq!(list.len(), 2);

    for (i, &(is_open, at, frame)) in events.iter().enumerate() {
        let event = list.get(i).unwrap();
        assert_eq!(event.get(0, false).unwrap(), is_open);
        assert_eq!(event.get(1, 0i32).unwrap(), at);
        assert_eq!(event.get(2, 0i32).unwrap(), frame);
    }

    // `at` = 0 and `is_open` = false are defaults, so the events differ in layout
    let first = list.get(0).unwrap().vtable().unwrap();
    let second = list.get(1).unwrap().vtable().unwrap();
    assert_ne!(first.as_bytes(), second.as_bytes());
    assert!(!list.get(0).unwrap().has_field(1).unwrap());
    assert!(list.get(2).is_err());
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct UpgradeAction {
    id: u16,
}

impl FlatStruct for UpgradeAction {
    const SIZE: usize = 2;
    const ALIGN: usize = 2;

    fn write_to(&self, dst: &mut [u8]) {
        dst[..2].copy_from_slice(&self.id.to_le_bytes());
    }

    fn read_from(src: &[u8]) -> Self {
        Self {
            id: u16::from_le_bytes([src[0], src[1]]),
        }
    }
}

#[test]
fn test_struct_scenario() {
    let mut builder = FlatBuilder::new();
    let action = builder.create_struct(&UpgradeAction { id: 7 }).unwrap();
    builder.start_object(2).unwrap();
    builder.push_slot_union(0, 1, 14, action).unwrap();
    let root = builder.end_object().unwrap();
    let bytes = builder.finish(root).unwrap().to_vec();

    let table = reader::root(&bytes).unwrap();
    let (tag, value) = table.get_union(0, 1).unwrap().unwrap();
    assert_eq!(tag, 14);
    assert_eq!(UpgradeAction::SIZE, 2);
    assert_eq!(&bytes[value..value + 2], &7u16.to_le_bytes());
    let action = table.get_union_struct::<UpgradeAction>(0, 1).unwrap().unwrap().1;
    assert_eq!(action.id, 7);
}

#[test]
fn test_references_point_towards_buffer_end() {
    let mut builder = FlatBuilder::new();
    let root = build_profile(&mut builder, "order", &[(true, 1, 1), (true, 2, 2), (false, 3, 3)]);
    let bytes = builder.finish(root).unwrap().to_vec();

    // Children are written before parents, so every uoffset target lies after it
    let profile = reader::root(&bytes).unwrap();
    let name_field = profile.field_pos(0).unwrap().unwrap();
    assert!(profile.field_target(0).unwrap().unwrap() > name_field);
    let events_field = profile.field_pos(1).unwrap().unwrap();
    let events_pos = profile.field_target(1).unwrap().unwrap();
    assert!(events_pos > events_field);

    let list = profile.get_vector::<Table>(1).unwrap().unwrap();
    for (i, event) in list.iter().enumerate() {
        let element_pos = events_pos + 4 + i * 4;
        assert!(event.unwrap().pos() > element_pos);
    }
    assert!(profile.pos() < events_pos);
}

#[test]
fn test_vtables_bounded_by_distinct_layouts() {
    let mut builder = FlatBuilder::new();
    let events: Vec<_> = (1..=50).map(|i| (true, i, i)).collect();
    let root = build_profile(&mut builder, "dedup", &events);
    // One layout for all events, one for the profile
    assert_eq!(builder.vtable_count(), 2);
    let bytes = builder.finish(root).unwrap().to_vec();

    let list = reader::root(&bytes)
        .unwrap()
        .get_vector::<Table>(1)
        .unwrap()
        .unwrap();
    let first = list.get(0).unwrap().vtable().unwrap().pos();
    assert!(list.iter().all(|e| e.unwrap().vtable().unwrap().pos() == first));
}

#[test]
fn test_reads_are_idempotent() {
    let mut builder = FlatBuilder::new();
    let root = build_profile(&mut builder, "twice", &[(true, 5, 6)]);
    let bytes = builder.finish(root).unwrap().to_vec();
    let snapshot = bytes.clone();

    let table = reader::root(&bytes).unwrap();
    let first = (table.get_str(0).unwrap(), table.get_vector::<Table>(1).unwrap().unwrap().len());
    let second = (table.get_str(0).unwrap(), table.get_vector::<Table>(1).unwrap().unwrap().len());
    assert_eq!(first, second);
    assert_eq!(bytes, snapshot);
}

#[test]
fn test_absent_fields_from_older_writers() {
    // A writer that only knows slot 0 ...
    let mut builder = FlatBuilder::new();
    builder.start_object(1).unwrap();
    builder.push_slot(0, 3u8, 0).unwrap();
    let root = builder.end_object().unwrap();
    let bytes = builder.finish(root).unwrap().to_vec();

    // ... read by a reader that knows slots 0..4
    let table = reader::root(&bytes).unwrap();
    assert_eq!(table.get(0, 0u8).unwrap(), 3);
    assert_eq!(table.get(1, -1i64).unwrap(), -1);
    assert_eq!(table.get_str(2).unwrap(), None);
    assert!(table.get_vector::<u32>(3).unwrap().is_none());
}

#[test]
fn test_concurrent_readers() {
    let mut builder = FlatBuilder::new();
    let root = build_profile(&mut builder, "shared", &[(true, 1, 2), (false, 3, 4)]);
    builder.finish(root).unwrap();
    let bytes = builder.into_finished().unwrap().into_vec();

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                let table = reader::root(&bytes).unwrap();
                assert_eq!(table.get_str(0).unwrap(), Some("shared"));
                let list = table.get_vector::<Table>(1).unwrap().unwrap();
                assert_eq!(list.get(1).unwrap().get(2, 0i32).unwrap(), 4);
            });
        }
    });
}
