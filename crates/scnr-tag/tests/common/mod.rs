#![allow(dead_code)]

#[path = "../../src/test_support.rs"]
mod support;

pub use support::*;

use scnr_schema::{FieldId, FormatVersion, SectionLayout};
use scnr_tag::{BlockHeader, BoundRecord, Collection, FieldValue, Scenario, SelectionKind};

pub fn load(format: FormatVersion) -> Scenario {
    Scenario::load(scenario_bytes(format), catalog(format)).unwrap()
}

/// Integer reference stored in every record of `kind`.
pub fn refs(scenario: &Scenario, kind: SelectionKind, field: FieldId) -> Vec<i64> {
    scenario
        .collection(kind)
        .unwrap()
        .iter()
        .map(|r| r.index_ref(field).unwrap())
        .collect()
}

pub fn names(scenario: &Scenario, kind: SelectionKind) -> Vec<String> {
    scenario
        .collection(kind)
        .unwrap()
        .iter()
        .map(|r| r.name().unwrap_or_default().to_string())
        .collect()
}

/// Assert the bound model agrees with the bytes.
///
/// Every loaded collection's header count matches its record count, every
/// record's index is its position and every cached value is what the store
/// holds at the record's current address.
pub fn assert_model_matches_store(scenario: &Scenario) {
    for kind in SelectionKind::top_level() {
        let (Some(layout), Some(collection)) = (scenario.layout(kind), scenario.collection(kind)) else {
            continue;
        };
        check_collection(scenario, collection, layout, &kind.to_string());
    }
}

fn check_collection(scenario: &Scenario, collection: &Collection, layout: &SectionLayout, path: &str) {
    let header_address = scenario.blocks().header_address(collection.block()).unwrap();
    let header = BlockHeader::read(scenario.store(), header_address).unwrap();
    assert_eq!(header.count as usize, collection.len(), "{path}: header count");
    assert_eq!(
        scenario.blocks().get(collection.block()).unwrap().count,
        collection.len(),
        "{path}: registered count"
    );

    for (position, record) in collection.iter().enumerate() {
        assert_eq!(record.index(), position, "{path}: record index");
        assert!(!record.binding().is_detached(), "{path}[{position}] detached");
        check_values(scenario, record, layout, &format!("{path}[{position}]"));

        for name in layout.block_names() {
            let (Some(child_layout), Some(child)) = (layout.block(name), record.child(name)) else {
                continue;
            };
            check_collection(scenario, child, child_layout, &format!("{path}[{position}]/{name}"));
        }
    }
}

fn check_values(scenario: &Scenario, record: &BoundRecord, layout: &SectionLayout, path: &str) {
    let base = record.binding().element_address(scenario.blocks()).unwrap();
    for (field, cached) in record.values() {
        let def = layout.field(field).unwrap();
        let mut reader = scenario.store().reader(def.address(base), def.kind.size()).unwrap();
        let stored = FieldValue::read(&mut reader, def.kind).unwrap();
        assert_eq!(&stored, cached, "{path}.{}", field.as_str());
    }
}
