//! Builder tests

use super::*;
use crate::reader::{self, Table};

#[derive(Debug, Clone, Copy, PartialEq)]
struct Vec3 {
    x: f32,
    y: f32,
    z: f32,
}

impl FlatStruct for Vec3 {
    const SIZE: usize = 12;
    const ALIGN: usize = 4;

    fn write_to(&self, dst: &mut [u8]) {
        dst[0..4].copy_from_slice(&self.x.to_le_bytes());
        dst[4..8].copy_from_slice(&self.y.to_le_bytes());
        dst[8..12].copy_from_slice(&self.z.to_le_bytes());
    }

    fn read_from(src: &[u8]) -> Self {
        Self {
            x: f32::read_le(&src[0..4]),
            y: f32::read_le(&src[4..8]),
            z: f32::read_le(&src[8..12]),
        }
    }
}

fn build_pair(builder: &mut FlatBuilder, a: u32, b: u16) -> Offset<TableOffset> {
    builder.start_object(2).unwrap();
    builder.push_slot(0, a, 0).unwrap();
    builder.push_slot(1, b, 0).unwrap();
    builder.end_object().unwrap()
}

#[test]
fn test_single_field_table_layout() {
    let mut builder = FlatBuilder::new();
    builder.start_object(1).unwrap();
    builder.push_slot_always(0, 7u8).unwrap();
    let root = builder.end_object().unwrap();
    let bytes = builder.finish(root).unwrap();

    #[rustfmt::skip]
    let expected: [u8; 20] = [
        12, 0, 0, 0,            // root uoffset -> 12
        0, 0,                   // padding
        6, 0, 8, 0, 7, 0,       // vtable: size 6, table size 8, slot 0 at +7
        6, 0, 0, 0,             // soffset: vtable at 12 - 6
        0, 0, 0,                // padding
        7,                      // slot 0
    ];
    assert_eq!(bytes, &expected);
}

#[test]
fn test_round_trip_scalars_strings_structs() {
    let mut builder = FlatBuilder::new();
    let name = builder.create_string("player one").unwrap();
    builder.start_object(5).unwrap();
    builder.push_slot_offset(0, name).unwrap();
    builder.push_slot(1, -12i32, 0).unwrap();
    builder.push_slot(2, true, false).unwrap();
    builder.push_slot_struct(3, &Vec3 { x: 1.0, y: -2.5, z: 8.0 }).unwrap();
    builder.push_slot(4, 0.25f64, 0.0).unwrap();
    let root = builder.end_object().unwrap();
    let bytes = builder.finish(root).unwrap().to_vec();

    let table = reader::root(&bytes).unwrap();
    assert_eq!(table.get_str(0).unwrap(), Some("player one"));
    assert_eq!(table.get(1, 0i32).unwrap(), -12);
    assert!(table.get(2, false).unwrap());
    assert_eq!(
        table.get_struct::<Vec3>(3).unwrap(),
        Some(Vec3 { x: 1.0, y: -2.5, z: 8.0 })
    );
    assert_eq!(table.get(4, 0.0f64).unwrap(), 0.25);
    // f64 field forces 8-byte alignment of the whole buffer
    assert_eq!(bytes.len() % 8, 0);
}

#[test]
fn test_default_valued_fields_are_elided() {
    let mut builder = FlatBuilder::new();
    builder.start_object(3).unwrap();
    builder.push_slot(0, 5u16, 5).unwrap();
    builder.push_slot(2, 9u16, 5).unwrap();
    let root = builder.end_object().unwrap();
    let bytes = builder.finish(root).unwrap().to_vec();

    let table = reader::root(&bytes).unwrap();
    assert!(!table.has_field(0).unwrap());
    assert!(!table.has_field(1).unwrap());
    assert_eq!(table.get(0, 5u16).unwrap(), 5);
    assert_eq!(table.get(1, 42u16).unwrap(), 42);
    assert_eq!(table.get(2, 5u16).unwrap(), 9);
    // Interior hole kept, trailing absent slots dropped
    assert_eq!(table.vtable().unwrap().num_fields(), 3);
}

#[test]
fn test_trailing_absent_slots_trimmed() {
    let mut builder = FlatBuilder::new();
    builder.start_object(8).unwrap();
    builder.push_slot_always(1, 3u8).unwrap();
    let root = builder.end_object().unwrap();
    let bytes = builder.finish(root).unwrap().to_vec();

    let table = reader::root(&bytes).unwrap();
    let vtable = table.vtable().unwrap();
    assert_eq!(vtable.num_fields(), 2);
    assert_eq!(vtable.field_offset(0), 0);
    assert_eq!(vtable.field_offset(7), 0);
    assert_eq!(table.get(7, 11u8).unwrap(), 11);
}

#[test]
fn test_force_defaults_writes_every_field() {
    let mut builder = FlatBuilder::with_options(BuilderOptions {
        force_defaults: true,
        ..BuilderOptions::default()
    });
    builder.start_object(1).unwrap();
    builder.push_slot(0, 0u32, 0).unwrap();
    let root = builder.end_object().unwrap();
    let bytes = builder.finish(root).unwrap().to_vec();

    let table = reader::root(&bytes).unwrap();
    assert!(table.has_field(0).unwrap());
}

#[test]
fn test_identical_layouts_share_one_vtable() {
    let mut builder = FlatBuilder::new();
    let items: Vec<_> = (0..10).map(|i| build_pair(&mut builder, i + 1, 5)).collect();
    assert_eq!(builder.vtable_count(), 1);

    // Different presence pattern needs its own vtable
    builder.start_object(2).unwrap();
    builder.push_slot(0, 77u32, 0).unwrap();
    let odd = builder.end_object().unwrap();
    assert_eq!(builder.vtable_count(), 2);

    let list = builder.create_vector_of_offsets(&items).unwrap();
    builder.start_object(2).unwrap();
    builder.push_slot_offset(0, list).unwrap();
    builder.push_slot_offset(1, odd).unwrap();
    let root = builder.end_object().unwrap();
    let bytes = builder.finish(root).unwrap().to_vec();

    let table = reader::root(&bytes).unwrap();
    let list = table.get_vector::<Table>(0).unwrap().unwrap();
    assert_eq!(list.len(), 10);
    let vtables: Vec<usize> = list
        .iter()
        .map(|t| t.unwrap().vtable().unwrap().pos())
        .collect();
    assert!(vtables.windows(2).all(|w| w[0] == w[1]));
    for (i, item) in list.iter().enumerate() {
        let item = item.unwrap();
        assert_eq!(item.get(0, 0u32).unwrap(), i as u32 + 1);
        assert_eq!(item.get(1, 0u16).unwrap(), 5);
    }
    assert_eq!(table.get_table(1).unwrap().unwrap().get(0, 0u32).unwrap(), 77);
}

#[test]
fn test_dedup_can_be_disabled() {
    let mut builder = FlatBuilder::with_options(BuilderOptions {
        dedup_vtables: false,
        ..BuilderOptions::default()
    });
    build_pair(&mut builder, 1, 2);
    build_pair(&mut builder, 3, 4);
    assert_eq!(builder.vtable_count(), 2);
}

#[test]
fn test_vtable_shared_whatever_the_preceding_padding() {
    let mut builder = FlatBuilder::new();
    let mut counts = Vec::new();
    for round in 1..=3 {
        builder.start_object(3).unwrap();
        builder.push_slot(0, round, 0i32).unwrap();
        builder.push_slot(1, -round, 0i32).unwrap();
        builder.push_slot(2, true, false).unwrap();
        builder.end_object().unwrap();
        counts.push(builder.vtable_count());
    }
    assert_eq!(counts, [1, 1, 1]);

    // Each filler table emits a new vtable and leaves the cursor misaligned
    let mut pairs = Vec::new();
    for k in 1..=4u16 {
        builder.start_object(k).unwrap();
        builder.push_slot_always(k - 1, 1u8).unwrap();
        builder.end_object().unwrap();

        let before = builder.vtable_count();
        builder.start_object(2).unwrap();
        builder.push_slot(0, true, false).unwrap();
        builder.push_slot(1, k as f64, 0.0).unwrap();
        pairs.push(builder.end_object().unwrap());
        let expected = if k == 1 { 1 } else { 0 };
        assert_eq!(builder.vtable_count() - before, expected, "pair table {k}");
    }

    let list = builder.create_vector_of_offsets(&pairs).unwrap();
    builder.start_object(1).unwrap();
    builder.push_slot_offset(0, list).unwrap();
    let root = builder.end_object().unwrap();
    let bytes = builder.finish(root).unwrap().to_vec();

    let list = reader::root(&bytes).unwrap().get_vector::<Table>(0).unwrap().unwrap();
    for (i, pair) in list.iter().enumerate() {
        let pair = pair.unwrap();
        assert!(pair.get(0, false).unwrap());
        assert_eq!(pair.get(1, 0.0f64).unwrap(), (i + 1) as f64);
    }
}

#[test]
fn test_vectors_preserve_order() {
    let mut builder = FlatBuilder::new();
    let numbers = builder.create_vector(&[1i16, -2, 3, -4]).unwrap();
    let points = builder
        .create_vector_of_structs(&[
            Vec3 { x: 1.0, y: 0.0, z: 0.0 },
            Vec3 { x: 0.0, y: 2.0, z: 0.0 },
        ])
        .unwrap();
    let names = builder.create_vector_of_strings(&["a", "bb", "ccc"]).unwrap();
    let blob = builder.create_vector(&[0xDEu8, 0xAD]).unwrap();
    let empty = builder.create_vector::<u32>(&[]).unwrap();

    builder.start_object(5).unwrap();
    builder.push_slot_offset(0, numbers).unwrap();
    builder.push_slot_offset(1, points).unwrap();
    builder.push_slot_offset(2, names).unwrap();
    builder.push_slot_offset(3, blob).unwrap();
    builder.push_slot_offset(4, empty).unwrap();
    let root = builder.end_object().unwrap();
    let bytes = builder.finish(root).unwrap().to_vec();

    let table = reader::root(&bytes).unwrap();
    let numbers = table.get_vector::<i16>(0).unwrap().unwrap();
    assert_eq!(numbers.to_vec().unwrap(), vec![1, -2, 3, -4]);

    let points = table
        .get_vector::<reader::Inline<Vec3>>(1)
        .unwrap()
        .unwrap();
    assert_eq!(points.get(1).unwrap().y, 2.0);

    let names = table.get_vector::<&str>(2).unwrap().unwrap();
    assert_eq!(names.to_vec().unwrap(), vec!["a", "bb", "ccc"]);

    let blob = table.get_vector::<u8>(3).unwrap().unwrap();
    assert_eq!(blob.bytes(), &[0xDE, 0xAD]);

    let empty = table.get_vector::<u32>(4).unwrap().unwrap();
    assert!(empty.is_empty());
}

#[test]
fn test_manual_vector_must_match_declared_length() {
    let mut builder = FlatBuilder::new();
    builder.start_vector(4, 2, 4).unwrap();
    builder.push_element(1u32).unwrap();
    assert_eq!(
        builder.end_vector::<u32>(2),
        Err(BuildError::VectorLengthMismatch {
            declared: 2,
            pushed: 1
        })
    );

    builder.start_vector(1, 1, 1).unwrap();
    builder.push_element(1u8).unwrap();
    assert!(matches!(
        builder.push_element(2u8),
        Err(BuildError::VectorLengthMismatch { .. })
    ));
}

#[test]
fn test_shared_strings_are_written_once() {
    let mut builder = FlatBuilder::new();
    let a = builder.create_shared_string("frame").unwrap();
    let b = builder.create_shared_string("frame").unwrap();
    let c = builder.create_shared_string("other").unwrap();
    assert_eq!(a, b);
    assert_ne!(a, c);

    // Plain strings are never shared
    let d = builder.create_string("frame").unwrap();
    assert_ne!(a, d);
}

#[test]
fn test_string_is_nul_terminated() {
    let mut builder = FlatBuilder::new();
    let s = builder.create_string("hi").unwrap();
    builder.start_object(1).unwrap();
    builder.push_slot_offset(0, s).unwrap();
    let root = builder.end_object().unwrap();
    let bytes = builder.finish(root).unwrap().to_vec();

    let table = reader::root(&bytes).unwrap();
    let target = table.field_target(0).unwrap().unwrap();
    assert_eq!(&bytes[target..target + 7], &[2, 0, 0, 0, b'h', b'i', 0]);
    assert_eq!(target % 4, 0);
}

#[test]
fn test_union_slots() {
    let mut builder = FlatBuilder::new();
    let value = builder.create_struct(&Vec3 { x: 4.0, y: 5.0, z: 6.0 }).unwrap();
    builder.start_object(2).unwrap();
    builder.push_slot_union(0, 1, 3, value).unwrap();
    let root = builder.end_object().unwrap();
    let bytes = builder.finish(root).unwrap().to_vec();

    let table = reader::root(&bytes).unwrap();
    let (tag, point) = table.get_union_struct::<Vec3>(0, 1).unwrap().unwrap();
    assert_eq!(tag, 3);
    assert_eq!(point.z, 6.0);
}

#[test]
fn test_union_tag_zero_rejected() {
    let mut builder = FlatBuilder::new();
    let value = builder.create_string("x").unwrap();
    builder.start_object(2).unwrap();
    assert!(matches!(
        builder.push_slot_union(0, 1, 0, value),
        Err(BuildError::BuilderMisuse(_))
    ));
    assert!(matches!(
        builder.push_slot_union(2, 1, 1, value),
        Err(BuildError::InvalidSlot { slot: 2, .. })
    ));
}

#[test]
fn test_required_fields_checked_at_end() {
    let mut builder = FlatBuilder::new();
    builder.start_object(2).unwrap();
    builder.push_slot_always(1, 1u8).unwrap();
    assert_eq!(
        builder.end_object_required(&[0, 1]),
        Err(BuildError::MissingRequiredField { slot: 0 })
    );

    builder.start_object(2).unwrap();
    builder.push_slot_always(0, 1u8).unwrap();
    assert!(builder.end_object_required(&[0]).is_ok());
}

#[test]
fn test_construction_order_errors() {
    let mut builder = FlatBuilder::new();

    assert_eq!(
        builder.push_slot_always(0, 1u8),
        Err(BuildError::InvalidSlot {
            slot: 0,
            field_count: 0
        })
    );
    assert_eq!(builder.end_object(), Err(BuildError::NoOpenObject));

    builder.start_object(2).unwrap();
    assert_eq!(
        builder.push_slot_always(2, 1u8),
        Err(BuildError::InvalidSlot {
            slot: 2,
            field_count: 2
        })
    );
    assert_eq!(builder.start_object(1), Err(BuildError::UnclosedObject));
    assert_eq!(
        builder.create_string("nested"),
        Err(BuildError::UnclosedObject)
    );
    builder.push_slot_always(0, 1u8).unwrap();
    assert!(matches!(
        builder.push_slot_always(0, 2u8),
        Err(BuildError::BuilderMisuse(_))
    ));
    let root = builder.end_object().unwrap();

    builder.finish(root).unwrap();
    assert!(builder.is_finished());
    assert!(matches!(builder.finish(root), Err(BuildError::AlreadyFinished)));
    assert_eq!(builder.start_object(1), Err(BuildError::AlreadyFinished));
}

#[test]
fn test_finish_without_objects() {
    let mut builder = FlatBuilder::new();
    let bogus = Offset::<TableOffset>::new(4, builder.id);
    assert!(matches!(builder.finish(bogus), Err(BuildError::NothingToFinish)));
}

#[test]
fn test_foreign_and_stale_offsets_rejected() {
    let mut first = FlatBuilder::new();
    let mut second = FlatBuilder::new();
    let name = first.create_string("mine").unwrap();

    second.start_object(1).unwrap();
    assert_eq!(
        second.push_slot_offset(0, name),
        Err(BuildError::ForeignOffset(name.value()))
    );

    first.reset();
    first.start_object(1).unwrap();
    assert_eq!(
        first.push_slot_offset(0, name),
        Err(BuildError::ForeignOffset(name.value()))
    );
}

#[test]
fn test_reset_produces_identical_buffers() {
    let mut builder = FlatBuilder::new();
    let root = build_pair(&mut builder, 10, 20);
    let first = builder.finish(root).unwrap().to_vec();

    builder.reset();
    assert!(!builder.is_finished());
    assert_eq!(builder.vtable_count(), 0);
    let root = build_pair(&mut builder, 10, 20);
    let second = builder.finish(root).unwrap().to_vec();

    assert_eq!(first, second);
}

#[test]
fn test_identifier_and_size_prefix() {
    let mut builder = FlatBuilder::new();
    let root = build_pair(&mut builder, 1, 2);
    let bytes = builder.finish_with_identifier(root, b"NCTR").unwrap().to_vec();
    assert_eq!(&bytes[4..8], b"NCTR");
    assert!(reader::buffer_has_identifier(&bytes, b"NCTR", false));
    assert_eq!(
        reader::root_with_identifier(&bytes, b"NCTR")
            .unwrap()
            .get(0, 0u32)
            .unwrap(),
        1
    );

    builder.reset();
    let root = build_pair(&mut builder, 3, 4);
    let bytes = builder
        .finish_size_prefixed(root, Some(b"NCTR"))
        .unwrap()
        .to_vec();
    assert_eq!(u32::read_le(&bytes[0..4]) as usize, bytes.len() - 4);
    assert!(reader::buffer_has_identifier(&bytes, b"NCTR", true));
    let table = reader::size_prefixed_root(&bytes).unwrap();
    assert_eq!(table.get(1, 0u16).unwrap(), 4);
}

#[test]
fn test_grows_from_tiny_capacity() {
    let mut builder = FlatBuilder::with_capacity(1);
    let names: Vec<String> = (0..200).map(|i| format!("frame-{i}")).collect();
    let list = builder.create_vector_of_strings(&names).unwrap();
    builder.start_object(1).unwrap();
    builder.push_slot_offset(0, list).unwrap();
    let root = builder.end_object().unwrap();
    let bytes = builder.into_finished_after(root);

    let table = reader::root(&bytes).unwrap();
    let list = table.get_vector::<&str>(0).unwrap().unwrap();
    assert_eq!(list.len(), 200);
    assert_eq!(list.get(199).unwrap(), "frame-199");
}

#[test]
fn test_into_finished_requires_finish() {
    let builder = FlatBuilder::new();
    assert!(matches!(
        builder.into_finished(),
        Err(BuildError::BuilderMisuse(_))
    ));
}

impl FlatBuilder {
    fn into_finished_after(mut self, root: Offset<TableOffset>) -> FinishedBuffer {
        self.finish(root).unwrap();
        self.into_finished().unwrap()
    }
}
