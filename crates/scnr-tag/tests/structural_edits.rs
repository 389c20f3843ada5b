mod common;

use common::*;
use pretty_assertions::assert_eq;
use scnr_common::FileOrigin;
use scnr_schema::{FieldId, FieldKind, FormatVersion, SectionLayout};
use scnr_tag::{
    EntityHandle, Error, FieldValue, IndexChange, PlacementKind, Scenario, Selection, SelectionKind, StructuralOp,
    ZoneSlot,
};

const SCENERY: SelectionKind = SelectionKind::Placements(PlacementKind::Scenery);
const VEHICLES: SelectionKind = SelectionKind::Placements(PlacementKind::Vehicle);

fn positions_x(scenario: &Scenario, kind: SelectionKind) -> Vec<f32> {
    scenario
        .collection(kind)
        .unwrap()
        .iter()
        .map(|r| r.get(FieldId::Position).and_then(FieldValue::as_vector3).unwrap()[0])
        .collect()
}

#[test]
fn test_remove_placement_rewrites_names() {
    let mut scenario = load(FormatVersion::Modern);
    assert_eq!(refs(&scenario, SelectionKind::ObjectNames, FieldId::PlacementIndex), vec![0, 1, 2, 0]);

    let report = scenario.remove(SCENERY, 1).unwrap();

    assert_eq!(positions_x(&scenario, SCENERY), vec![0.0, 2.0]);
    // The removed placement's name is orphaned, the later one follows its
    // placement down, and the biped name is untouched.
    assert_eq!(refs(&scenario, SelectionKind::ObjectNames, FieldId::PlacementIndex), vec![0, -1, 1, 0]);
    assert_eq!(report.detached, vec![EntityHandle::new(SCENERY, 1)]);
    assert_eq!(
        report.reindexed,
        vec![IndexChange {
            kind: SCENERY,
            old: 2,
            new: 1
        }]
    );
    assert_eq!(report.count(SCENERY), Some(2));
    assert_model_matches_store(&scenario);
}

#[test]
fn test_copy_placement_shifts_names_past_destination() {
    let mut scenario = load(FormatVersion::Modern);
    scenario.remove(SCENERY, 2).unwrap();
    assert_eq!(refs(&scenario, SelectionKind::ObjectNames, FieldId::PlacementIndex), vec![0, 1, -1, 0]);

    let report = scenario.copy(SCENERY, 0, 1).unwrap();

    assert_eq!(positions_x(&scenario, SCENERY), vec![0.0, 0.0, 1.0]);
    assert_eq!(refs(&scenario, SelectionKind::ObjectNames, FieldId::PlacementIndex), vec![0, 2, -1, 0]);
    assert_eq!(refs(&scenario, SCENERY, FieldId::PaletteIndex), vec![0, 0, 1]);
    assert_eq!(report.created, Some(EntityHandle::new(SCENERY, 1)));
    assert_model_matches_store(&scenario);
}

#[test]
fn test_add_to_unallocated_block_uses_sentinels() {
    let mut scenario = load(FormatVersion::Modern);
    assert_eq!(scenario.count(VEHICLES), Some(0));
    let block = scenario.collection(VEHICLES).unwrap().block();
    assert!(!scenario.blocks().get(block).unwrap().is_allocated());

    let report = scenario.add(VEHICLES).unwrap();

    assert_eq!(report.created, Some(EntityHandle::new(VEHICLES, 0)));
    assert_eq!(scenario.count(VEHICLES), Some(1));
    assert!(scenario.blocks().get(block).unwrap().is_allocated());
    assert_eq!(refs(&scenario, VEHICLES, FieldId::PaletteIndex), vec![-1]);
    assert_eq!(refs(&scenario, VEHICLES, FieldId::NameIndex), vec![-1]);

    let placement = scenario.placement(PlacementKind::Vehicle, 0).unwrap();
    assert_eq!(placement.palette_index(), None);
    assert_eq!(placement.name_index(), None);
    assert_model_matches_store(&scenario);
}

#[test]
fn test_add_appends_after_existing_records() {
    let mut scenario = load(FormatVersion::Modern);
    scenario.add(SCENERY).unwrap();

    assert_eq!(refs(&scenario, SCENERY, FieldId::PaletteIndex), vec![0, 1, 1, -1]);
    assert_eq!(refs(&scenario, SCENERY, FieldId::NameIndex), vec![0, 1, 2, -1]);
    assert_eq!(refs(&scenario, SelectionKind::ObjectNames, FieldId::PlacementIndex), vec![0, 1, 2, 0]);
    assert_model_matches_store(&scenario);
}

#[test]
fn test_squad_without_zone_stays_in_default_zone() {
    let mut scenario = load(FormatVersion::Modern);
    let default_squads = |scenario: &Scenario| -> Vec<usize> {
        scenario.ai_tree().default_zone.squads.iter().map(|s| s.index).collect()
    };
    assert_eq!(default_squads(&scenario), vec![1]);

    scenario.add(SelectionKind::Zones).unwrap();
    assert_eq!(default_squads(&scenario), vec![1]);

    scenario.copy(SelectionKind::Zones, 0, 0).unwrap();
    assert_eq!(refs(&scenario, SelectionKind::Squads, FieldId::ZoneIndex), vec![1, -1, 2]);
    assert_eq!(default_squads(&scenario), vec![1]);

    // Removing the zone squad 0 lives in sends it to the default zone too.
    scenario.remove(SelectionKind::Zones, 1).unwrap();
    assert_eq!(refs(&scenario, SelectionKind::Squads, FieldId::ZoneIndex), vec![-1, -1, 1]);
    assert_eq!(default_squads(&scenario), vec![0, 1]);
    assert_model_matches_store(&scenario);
}

#[test]
fn test_remove_zone_moves_nested_views() {
    let mut scenario = load(FormatVersion::Modern);
    scenario.remove(SelectionKind::Zones, 0).unwrap();

    assert_eq!(names(&scenario, SelectionKind::Zones), vec!["zone_b"]);
    assert_eq!(refs(&scenario, SelectionKind::Squads, FieldId::ZoneIndex), vec![-1, -1, 0]);
    assert_eq!(scenario.count(SelectionKind::FiringPositions { zone: 0 }), Some(0));
    assert_eq!(names(&scenario, SelectionKind::Areas { zone: 0 }), vec!["area_b0"]);

    let tree = scenario.ai_tree();
    assert_eq!(tree.zone_of(2), Some(ZoneSlot::Index(0)));
    assert_eq!(tree.zone_of(0), Some(ZoneSlot::Default));
    assert_model_matches_store(&scenario);
}

#[test]
fn test_remove_area_rewrites_firing_positions() {
    let mut scenario = load(FormatVersion::Modern);
    let areas = SelectionKind::Areas { zone: 0 };
    let firing = SelectionKind::FiringPositions { zone: 0 };

    scenario.remove(areas, 0).unwrap();

    assert_eq!(names(&scenario, areas), vec!["area_a1"]);
    assert_eq!(refs(&scenario, firing, FieldId::AreaIndex), vec![-1, 0]);
    // The other zone's areas are a different collection.
    assert_eq!(names(&scenario, SelectionKind::Areas { zone: 1 }), vec!["area_b0"]);
    assert_model_matches_store(&scenario);
}

#[test]
fn test_copy_squad_group_keeps_parent_links() {
    let mut scenario = load(FormatVersion::Modern);
    assert_eq!(refs(&scenario, SelectionKind::SquadGroups, FieldId::ParentIndex), vec![-1, 0]);

    scenario.copy(SelectionKind::SquadGroups, 1, 0).unwrap();

    assert_eq!(names(&scenario, SelectionKind::SquadGroups), vec!["left", "all", "left"]);
    // Both copies of "left" still point at "all".
    assert_eq!(refs(&scenario, SelectionKind::SquadGroups, FieldId::ParentIndex), vec![1, -1, 1]);
    assert_eq!(refs(&scenario, SelectionKind::Squads, FieldId::SquadGroupIndex), vec![2, 1, -1]);
    assert_model_matches_store(&scenario);
}

#[test]
fn test_copy_squad_clones_nested_blocks() {
    let mut scenario = load(FormatVersion::Legacy);
    let source = SelectionKind::Encounters { squad: 0 };
    let copy = SelectionKind::Encounters { squad: 3 };

    scenario.copy(SelectionKind::Squads, 0, 3).unwrap();
    assert_eq!(names(&scenario, copy), vec!["enc_0a", "enc_0b"]);
    assert_ne!(
        scenario.collection(copy).unwrap().block(),
        scenario.collection(source).unwrap().block()
    );
    assert_eq!(
        scenario.count(SelectionKind::StartingLocations { squad: 3, encounter: 0 }),
        Some(2)
    );

    scenario
        .set_field(EntityHandle::new(copy, 0), FieldId::Name, FieldValue::String("enc_copy".into()))
        .unwrap();
    assert_eq!(names(&scenario, source), vec!["enc_0a", "enc_0b"]);
    assert_model_matches_store(&scenario);

    // The clone outlives its source.
    scenario.remove(SelectionKind::Squads, 0).unwrap();
    assert_eq!(names(&scenario, SelectionKind::Squads), vec!["squad_1", "squad_2", "squad_0"]);
    assert_eq!(names(&scenario, SelectionKind::Encounters { squad: 2 }), vec!["enc_copy", "enc_0b"]);
    assert_model_matches_store(&scenario);
}

#[test]
fn test_modern_squad_copy_keeps_location_sets() {
    let mut scenario = load(FormatVersion::Modern);
    scenario.copy(SelectionKind::Squads, 0, 1).unwrap();

    assert_eq!(scenario.count(SelectionKind::GroupLocations { squad: 1 }), Some(2));
    assert_eq!(scenario.count(SelectionKind::SoloLocations { squad: 1 }), Some(1));
    // The old squad 1 moved up with its own locations.
    assert_eq!(scenario.count(SelectionKind::GroupLocations { squad: 2 }), Some(1));
    assert_eq!(scenario.count(SelectionKind::SoloLocations { squad: 2 }), Some(0));
    assert_model_matches_store(&scenario);
}

#[test]
fn test_locate_follows_shifted_records() {
    let mut scenario = load(FormatVersion::Modern);
    let before = scenario.locate(Selection::item(SCENERY, 2)).unwrap().base_address;

    scenario.copy(SCENERY, 0, 0).unwrap();

    let after = scenario.locate(Selection::item(SCENERY, 3)).unwrap();
    assert_eq!(after.base_address, before + u64::from(PLACEMENT_STRIDE));
    let again = scenario.locate(Selection::item(SCENERY, 3)).unwrap();
    assert_eq!(again.base_address, after.base_address);
    assert_eq!(again.auxiliary.len(), after.auxiliary.len());
}

#[test]
fn test_overflowing_reference_rejects_edit() {
    let format = FormatVersion::Modern;
    let catalog = catalog(format).with_section(
        "object_names",
        SectionLayout::new(NAME_STRIDE)
            .at(32)
            .with_field(FieldId::Name, 0, FieldKind::String32)
            .with_field(FieldId::ObjectType, 32, FieldKind::Int16)
            .with_field(FieldId::PlacementIndex, 35, FieldKind::Int8),
    );
    let mut scenario = Scenario::load(scenario_bytes(format), catalog).unwrap();
    scenario
        .set_field(
            EntityHandle::new(SelectionKind::ObjectNames, 0),
            FieldId::PlacementIndex,
            FieldValue::Int8(i8::MAX),
        )
        .unwrap();
    let before = scenario.store().as_bytes().to_vec();

    let result = scenario.apply(StructuralOp::copy(SCENERY, 0, 0));

    assert!(matches!(result, Err(Error::IndexOverflow { field: FieldId::PlacementIndex, .. })));
    assert_eq!(scenario.store().as_bytes(), &before[..]);
    assert_eq!(scenario.count(SCENERY), Some(3));
    assert_model_matches_store(&scenario);
}

#[test]
fn test_commit_round_trips_through_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.scenario");
    let format = FormatVersion::Modern;
    std::fs::write(&path, scenario_bytes(format).as_bytes()).unwrap();

    let mut scenario = Scenario::open(&path, catalog(format)).unwrap();
    scenario.remove(SCENERY, 0).unwrap();
    scenario.add(VEHICLES).unwrap();
    assert!(scenario.is_dirty());
    scenario.commit().unwrap();
    assert!(!scenario.is_dirty());
    assert_eq!(std::fs::read(&path).unwrap(), scenario.store().as_bytes());

    let reopened = Scenario::open(&path, catalog(format)).unwrap();
    assert_eq!(reopened.count(SCENERY), Some(2));
    assert_eq!(reopened.count(VEHICLES), Some(1));
    assert_eq!(
        refs(&reopened, SelectionKind::ObjectNames, FieldId::PlacementIndex),
        vec![-1, 0, 1, 0]
    );
    assert_model_matches_store(&reopened);
}

#[test]
fn test_failed_commit_stays_dirty() {
    let dir = tempfile::tempdir().unwrap();
    let mut scenario = load(FormatVersion::Modern);
    scenario.remove(SCENERY, 0).unwrap();
    // A directory cannot be written as a file.
    scenario.set_origin(Box::new(FileOrigin::new(dir.path())));

    let result = scenario.commit();

    assert!(matches!(result, Err(Error::Store(scnr_common::Error::Commit { .. }))));
    assert!(scenario.is_dirty());
    assert_eq!(scenario.count(SCENERY), Some(2));
}
