//! Every field kind written through a scenario reads back unchanged, both
//! from the cache and after reloading the bytes.

mod common;

use common::*;
use pretty_assertions::assert_eq;
use scnr_common::{ByteStore, Endian};
use scnr_schema::{FieldId, FieldKind, FormatVersion, SchemaCatalog, SectionLayout};
use scnr_tag::{EntityHandle, Error, FieldValue, Scenario, SelectionKind, TagReference, WriteOutcome};

const VOLUME: EntityHandle = EntityHandle::new(SelectionKind::TriggerVolumes, 0);

/// The synthetic schema with the trigger volume element reduced to a single
/// `Flags` field of `kind` at its start.
fn catalog_with_flags(kind: FieldKind) -> SchemaCatalog {
    catalog(FormatVersion::Modern).with_section(
        "trigger_volumes",
        SectionLayout::new(80).at(40).with_field(FieldId::Flags, 0, kind),
    )
}

fn boundary_values() -> Vec<FieldValue> {
    vec![
        FieldValue::Int8(i8::MIN),
        FieldValue::Int8(i8::MAX),
        FieldValue::UInt8(u8::MAX),
        FieldValue::Int16(i16::MIN),
        FieldValue::Int16(-1),
        FieldValue::UInt16(u16::MAX),
        FieldValue::Int32(i32::MIN),
        FieldValue::Int32(i32::MAX),
        FieldValue::UInt32(u32::MAX),
        FieldValue::Float(f32::MAX),
        FieldValue::Float(-f32::MIN_POSITIVE),
        FieldValue::Vector2([-1.5, 0.25]),
        FieldValue::Vector3([f32::MAX, -0.5, 1e-20]),
        FieldValue::Vector4([0.0, 1.0, -1.0, 0.5]),
        FieldValue::String(String::new()),
        FieldValue::String("x".repeat(31)),
        FieldValue::StringId(u32::MAX),
        FieldValue::TagRef(TagReference::new(*b"vehi", 0xFFFF_0001)),
        FieldValue::TagRef(TagReference::NULL),
    ]
}

#[test]
fn test_every_kind_round_trips_through_store() {
    for value in boundary_values() {
        let kind = value.kind();
        let mut scenario = Scenario::load(scenario_bytes(FormatVersion::Modern), catalog_with_flags(kind)).unwrap();

        let outcome = scenario.set_field(VOLUME, FieldId::Flags, value.clone()).unwrap();
        assert_eq!(outcome, WriteOutcome::Written, "{kind}");
        assert_eq!(scenario.get_field(VOLUME, FieldId::Flags).unwrap(), Some(value.clone()), "{kind}");
        assert_model_matches_store(&scenario);

        let bytes = ByteStore::from_bytes(scenario.store().as_bytes().to_vec(), Endian::Big);
        let reloaded = Scenario::load(bytes, catalog_with_flags(kind)).unwrap();
        assert_eq!(reloaded.get_field(VOLUME, FieldId::Flags).unwrap(), Some(value), "{kind} after reload");
    }
}

#[test]
fn test_every_kind_is_covered() {
    let kinds: Vec<FieldKind> = boundary_values().iter().map(FieldValue::kind).collect();
    for kind in [
        FieldKind::Int8,
        FieldKind::UInt8,
        FieldKind::Int16,
        FieldKind::UInt16,
        FieldKind::Int32,
        FieldKind::UInt32,
        FieldKind::Float32,
        FieldKind::Vector2,
        FieldKind::Vector3,
        FieldKind::Vector4,
        FieldKind::String32,
        FieldKind::StringId,
        FieldKind::TagRef,
    ] {
        assert!(kinds.contains(&kind), "{kind} has no boundary value");
    }
}

#[test]
fn test_oversized_string_is_rejected_not_truncated() {
    let mut scenario = Scenario::load(
        scenario_bytes(FormatVersion::Modern),
        catalog_with_flags(FieldKind::String32),
    )
    .unwrap();
    let before = scenario.get_field(VOLUME, FieldId::Flags).unwrap();

    for text in ["x".repeat(32), "\u{e9}".repeat(4)] {
        let result = scenario.set_field(VOLUME, FieldId::Flags, FieldValue::String(text));
        assert!(matches!(result, Err(Error::InvalidValue { kind: FieldKind::String32, .. })));
    }
    assert_eq!(scenario.get_field(VOLUME, FieldId::Flags).unwrap(), before);
    assert!(!scenario.is_dirty());
    assert_model_matches_store(&scenario);
}
