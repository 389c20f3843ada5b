//! Property locator: from a selection to the layout and address describing it.

use scnr_schema::{FieldId, SectionLayout};

use crate::entity::{PaletteEntry, Placement};
use crate::record::BoundRecord;
use crate::scenario::Scenario;
use crate::selection::{EntityHandle, Selection, SelectionKind};

/// Everything a property panel needs to render one entity.
#[derive(Debug, Clone)]
pub struct PropertyContext<'a> {
    pub target: EntityHandle,
    pub layout: &'a SectionLayout,
    /// Address of the target element.
    pub base_address: u64,
    /// Sibling tables needed to turn stored indices into names.
    pub auxiliary: Vec<AuxiliaryTable<'a>>,
}

/// A sibling table loaded alongside a target.
#[derive(Debug, Clone)]
pub struct AuxiliaryTable<'a> {
    pub kind: SelectionKind,
    pub layout: &'a SectionLayout,
    /// First element, `None` while the block is unallocated.
    pub base_address: Option<u64>,
    pub count: usize,
}

/// Tables whose contents name the indices stored in `kind`.
pub fn auxiliary_kinds(kind: SelectionKind) -> Vec<SelectionKind> {
    match kind {
        SelectionKind::Placements(placement) => {
            vec![SelectionKind::Palette(placement), SelectionKind::ObjectNames]
        }
        SelectionKind::Squads => vec![SelectionKind::SquadGroups, SelectionKind::Zones],
        SelectionKind::SquadGroups => vec![SelectionKind::SquadGroups],
        SelectionKind::FiringPositions { zone } => vec![SelectionKind::Areas { zone }],
        _ => Vec::new(),
    }
}

/// Resolve a selection.
///
/// `None` for a bare category, the synthetic default zone, an index past the
/// end or a collection that was not loaded.
pub fn locate(scenario: &Scenario, selection: Selection) -> Option<PropertyContext<'_>> {
    let index = selection.item?;
    let kind = selection.kind;
    let layout = scenario.layout(kind)?;
    let record = scenario.collection(kind)?.get(index)?;
    let base_address = record.binding().element_address(scenario.blocks()).ok()?;

    let auxiliary = auxiliary_kinds(kind)
        .into_iter()
        .filter_map(|aux| {
            let layout = scenario.layout(aux)?;
            let collection = scenario.collection(aux)?;
            let block = scenario.blocks().get(collection.block()).ok()?;
            Some(AuxiliaryTable {
                kind: aux,
                layout,
                base_address: block.first_address,
                count: block.count,
            })
        })
        .collect();

    Some(PropertyContext {
        target: EntityHandle::new(kind, index),
        layout,
        base_address,
        auxiliary,
    })
}

fn named(scenario: &Scenario, kind: SelectionKind, index: Option<usize>) -> Option<String> {
    let record = scenario.collection(kind)?.get(index?)?;
    record.name().filter(|n| !n.is_empty()).map(str::to_string)
}

fn position_text(record: &BoundRecord) -> Option<String> {
    let [x, y, z] = record.get(FieldId::Position)?.as_vector3()?;
    Some(format!("({x:.2}, {y:.2}, {z:.2})"))
}

/// Human-readable name of an entity.
///
/// Placements are named through the object-name table, falling back to their
/// palette entry's tag. Location records show their position.
pub fn display_name(scenario: &Scenario, handle: EntityHandle) -> String {
    let Some(record) = scenario.record(handle) else {
        return handle.to_string();
    };

    let name = match handle.kind {
        SelectionKind::Placements(kind) => {
            let placement = Placement::new(record);
            named(scenario, SelectionKind::ObjectNames, placement.name_index()).or_else(|| {
                scenario
                    .palette_entry(kind, placement.palette_index()?)?
                    .object()
                    .map(|tag| tag.to_string())
            })
        }
        SelectionKind::Palette(_) => PaletteEntry::new(record).object().map(|tag| tag.to_string()),
        SelectionKind::FiringPositions { .. }
        | SelectionKind::StartingPositions
        | SelectionKind::StartingLocations { .. }
        | SelectionKind::GroupLocations { .. }
        | SelectionKind::SoloLocations { .. } => position_text(record),
        _ => record.name().filter(|n| !n.is_empty()).map(str::to_string),
    };

    name.unwrap_or_else(|| handle.kind.to_string())
}

/// List caption embedding the index, e.g. `[003] warthog_1`.
pub fn label(scenario: &Scenario, handle: EntityHandle) -> String {
    format!("[{:03}] {}", handle.index, display_name(scenario, handle))
}
