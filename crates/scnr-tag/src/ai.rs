//! AI hierarchy: squad groups, zones, squads, encounters and spawn locations.
//!
//! The builder makes one pass over each loaded block type. Squads are
//! partitioned by `ZoneIndex`; a squad with no zone (or a zone index past the
//! end) lands in the synthetic default zone, which has no backing record.
//!
//! The shape of a squad's locations depends on the format and is chosen once
//! per build: legacy squads own encounters with starting locations, modern
//! squads own group and solo location blocks directly.

use scnr_schema::{FieldId, FormatVersion};
use tracing::warn;

use crate::entity::facing;
use crate::record::{BoundRecord, Collection};
use crate::scenario::Scenario;
use crate::selection::{EntityHandle, SelectionKind};

/// Which zone a squad belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ZoneSlot {
    /// The synthetic default zone.
    Default,
    Index(usize),
}

impl ZoneSlot {
    /// Handle of the backing zone record, if there is one.
    pub fn handle(&self) -> Option<EntityHandle> {
        match *self {
            Self::Default => None,
            Self::Index(index) => Some(EntityHandle::new(SelectionKind::Zones, index)),
        }
    }
}

/// Which location block a location record lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocationSet {
    Starting { encounter: usize },
    Group,
    Solo,
}

impl LocationSet {
    /// Collection holding this set for squad `squad`.
    pub fn selection(&self, squad: usize) -> SelectionKind {
        match *self {
            Self::Starting { encounter } => SelectionKind::StartingLocations { squad, encounter },
            Self::Group => SelectionKind::GroupLocations { squad },
            Self::Solo => SelectionKind::SoloLocations { squad },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub index: usize,
    pub set: LocationSet,
    pub position: Option<[f32; 3]>,
    pub facing: Option<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FiringPosition {
    pub index: usize,
    pub position: Option<[f32; 3]>,
    /// Area of the same zone.
    pub area: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Area {
    pub index: usize,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Encounter {
    pub index: usize,
    pub name: String,
    pub starting_locations: Vec<Location>,
}

/// Format-dependent location ownership of a squad.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationOwner {
    Encounters(Vec<Encounter>),
    GroupSolo { group: Vec<Location>, solo: Vec<Location> },
}

impl LocationOwner {
    /// Every location the squad owns, in block order.
    pub fn locations(&self) -> Vec<&Location> {
        match self {
            Self::Encounters(encounters) => encounters
                .iter()
                .flat_map(|e| e.starting_locations.iter())
                .collect(),
            Self::GroupSolo { group, solo } => group.iter().chain(solo.iter()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Squad {
    pub index: usize,
    pub name: String,
    pub zone: ZoneSlot,
    pub group: Option<usize>,
    pub locations: LocationOwner,
}

impl Squad {
    #[inline]
    pub fn handle(&self) -> EntityHandle {
        EntityHandle::new(SelectionKind::Squads, self.index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SquadGroup {
    pub index: usize,
    pub name: String,
    pub parent: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    pub slot: ZoneSlot,
    pub name: String,
    pub areas: Vec<Area>,
    pub firing_positions: Vec<FiringPosition>,
    pub squads: Vec<Squad>,
}

impl Zone {
    fn default_zone() -> Self {
        Self {
            slot: ZoneSlot::Default,
            name: "default".to_string(),
            areas: Vec::new(),
            firing_positions: Vec::new(),
            squads: Vec::new(),
        }
    }

    #[inline]
    pub fn is_default(&self) -> bool {
        self.slot == ZoneSlot::Default
    }
}

/// The reconstructed hierarchy.
#[derive(Debug, Clone, PartialEq)]
pub struct AiTree {
    pub format: FormatVersion,
    pub squad_groups: Vec<SquadGroup>,
    pub zones: Vec<Zone>,
    /// Squads without a zone. Display only.
    pub default_zone: Zone,
}

impl AiTree {
    /// Real zones followed by the default zone when it has squads.
    pub fn iter_zones(&self) -> impl Iterator<Item = &Zone> {
        self.zones
            .iter()
            .chain(Some(&self.default_zone).filter(|z| !z.squads.is_empty()))
    }

    pub fn squad_count(&self) -> usize {
        self.iter_zones().map(|z| z.squads.len()).sum()
    }

    /// Zone holding squad `index`.
    pub fn zone_of(&self, squad: usize) -> Option<ZoneSlot> {
        self.iter_zones()
            .find(|z| z.squads.iter().any(|s| s.index == squad))
            .map(|z| z.slot)
    }
}

type LocationReader = fn(&BoundRecord, &str) -> LocationOwner;

/// Builds an [`AiTree`] from a loaded scenario.
pub struct AiTreeBuilder<'a> {
    scenario: &'a Scenario,
    read_locations: LocationReader,
}

impl<'a> AiTreeBuilder<'a> {
    pub fn new(scenario: &'a Scenario) -> Self {
        let read_locations: LocationReader = match scenario.format() {
            FormatVersion::Legacy => encounters_of,
            FormatVersion::Modern => group_solo_of,
        };
        Self {
            scenario,
            read_locations,
        }
    }

    pub fn build(self) -> AiTree {
        let squad_groups = self.squad_groups();
        let mut zones = self.zones();
        let mut default_zone = Zone::default_zone();

        for squad in self.squads() {
            match squad.zone {
                ZoneSlot::Index(i) if i < zones.len() => zones[i].squads.push(squad),
                ZoneSlot::Index(i) => {
                    warn!(squad = squad.index, zone = i, "squad zone out of range, using default zone");
                    default_zone.squads.push(Squad {
                        zone: ZoneSlot::Default,
                        ..squad
                    });
                }
                ZoneSlot::Default => default_zone.squads.push(squad),
            }
        }

        AiTree {
            format: self.scenario.format(),
            squad_groups,
            zones,
            default_zone,
        }
    }

    fn collection(&self, kind: SelectionKind) -> Option<&'a Collection> {
        self.scenario.collection(kind)
    }

    fn squad_groups(&self) -> Vec<SquadGroup> {
        let Some(groups) = self.collection(SelectionKind::SquadGroups) else {
            return Vec::new();
        };
        groups
            .iter()
            .map(|record| SquadGroup {
                index: record.index(),
                name: name_of(record),
                parent: record.valid_ref(FieldId::ParentIndex),
            })
            .collect()
    }

    fn zones(&self) -> Vec<Zone> {
        let Some(zones) = self.collection(SelectionKind::Zones) else {
            return Vec::new();
        };
        zones
            .iter()
            .map(|record| Zone {
                slot: ZoneSlot::Index(record.index()),
                name: name_of(record),
                areas: nested(record, "areas", "zone")
                    .map(|areas| {
                        areas
                            .iter()
                            .map(|area| Area {
                                index: area.index(),
                                name: name_of(area),
                            })
                            .collect()
                    })
                    .unwrap_or_default(),
                firing_positions: nested(record, "firing_positions", "zone")
                    .map(|positions| {
                        positions
                            .iter()
                            .map(|fp| FiringPosition {
                                index: fp.index(),
                                position: fp.get(FieldId::Position).and_then(|v| v.as_vector3()),
                                area: fp.valid_ref(FieldId::AreaIndex),
                            })
                            .collect()
                    })
                    .unwrap_or_default(),
                squads: Vec::new(),
            })
            .collect()
    }

    fn squads(&self) -> Vec<Squad> {
        let Some(squads) = self.collection(SelectionKind::Squads) else {
            return Vec::new();
        };
        squads
            .iter()
            .map(|record| {
                let name = name_of(record);
                let zone = match record.valid_ref(FieldId::ZoneIndex) {
                    Some(index) => ZoneSlot::Index(index),
                    None => ZoneSlot::Default,
                };
                Squad {
                    index: record.index(),
                    zone,
                    group: record.valid_ref(FieldId::SquadGroupIndex),
                    locations: (self.read_locations)(record, &name),
                    name,
                }
            })
            .collect()
    }
}

fn name_of(record: &BoundRecord) -> String {
    record.name().unwrap_or_default().to_string()
}

/// Nested collection of `owner`, logging when it could not be read.
fn nested<'r>(owner: &'r BoundRecord, block: &str, what: &str) -> Option<&'r Collection> {
    let child = owner.child(block);
    if child.is_none() {
        warn!(owner = what, index = owner.index(), block, "nested block unavailable, omitting");
    }
    child
}

fn locations_of(collection: &Collection, set: LocationSet) -> Vec<Location> {
    collection
        .iter()
        .map(|record| Location {
            index: record.index(),
            set,
            position: record.get(FieldId::Position).and_then(|v| v.as_vector3()),
            facing: facing(record),
        })
        .collect()
}

fn encounters_of(squad: &BoundRecord, name: &str) -> LocationOwner {
    let encounters = nested(squad, "encounters", name)
        .map(|encounters| {
            encounters
                .iter()
                .filter_map(|encounter| {
                    let index = encounter.index();
                    let locations = nested(encounter, "starting_locations", name)?;
                    Some(Encounter {
                        index,
                        name: name_of(encounter),
                        starting_locations: locations_of(locations, LocationSet::Starting { encounter: index }),
                    })
                })
                .collect()
        })
        .unwrap_or_default();
    LocationOwner::Encounters(encounters)
}

fn group_solo_of(squad: &BoundRecord, name: &str) -> LocationOwner {
    let read = |block, set| {
        nested(squad, block, name)
            .map(|c| locations_of(c, set))
            .unwrap_or_default()
    };
    LocationOwner::GroupSolo {
        group: read("group_locations", LocationSet::Group),
        solo: read("solo_locations", LocationSet::Solo),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{catalog, scenario_bytes};
    use pretty_assertions::assert_eq;

    fn load(format: FormatVersion) -> Scenario {
        Scenario::load(scenario_bytes(format), catalog(format)).unwrap()
    }

    #[test]
    fn test_modern_tree() {
        let tree = load(FormatVersion::Modern).ai_tree();

        assert_eq!(tree.squad_groups.len(), 2);
        assert_eq!(tree.squad_groups[1].parent, Some(0));
        assert_eq!(tree.zones.len(), 2);
        assert_eq!(tree.zones[0].areas.len(), 2);
        assert_eq!(tree.zones[0].firing_positions[1].area, Some(1));
        assert!(tree.zones[1].firing_positions.is_empty());

        let squad = &tree.zones[0].squads[0];
        assert_eq!(squad.name, "squad_0");
        assert_eq!(squad.group, Some(1));
        match &squad.locations {
            LocationOwner::GroupSolo { group, solo } => {
                assert_eq!(group.len(), 2);
                assert_eq!(solo.len(), 1);
                assert_eq!(group[1].position, Some([0.0, 1.0, 0.0]));
                assert_eq!(solo[0].set, LocationSet::Solo);
            }
            other => panic!("unexpected shape {other:?}"),
        }
    }

    #[test]
    fn test_squad_without_zone_goes_to_default() {
        let tree = load(FormatVersion::Modern).ai_tree();
        let names: Vec<_> = tree.default_zone.squads.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["squad_1"]);
        assert!(tree.default_zone.is_default());
        assert_eq!(tree.default_zone.slot.handle(), None);
        assert_eq!(tree.zone_of(1), Some(ZoneSlot::Default));
        assert_eq!(tree.zone_of(2), Some(ZoneSlot::Index(1)));
        assert_eq!(tree.squad_count(), 3);
        assert_eq!(tree.iter_zones().count(), 3);
    }

    #[test]
    fn test_legacy_encounters() {
        let tree = load(FormatVersion::Legacy).ai_tree();
        let squad = &tree.zones[0].squads[0];
        let LocationOwner::Encounters(encounters) = &squad.locations else {
            panic!("legacy squads own encounters");
        };
        assert_eq!(encounters.len(), 2);
        assert_eq!(encounters[0].name, "enc_0a");
        assert_eq!(encounters[0].starting_locations.len(), 2);
        assert_eq!(
            encounters[1].starting_locations[0].set.selection(0),
            SelectionKind::StartingLocations { squad: 0, encounter: 1 }
        );
        assert_eq!(squad.locations.locations().len(), 3);
    }

    #[test]
    fn test_out_of_range_zone_falls_back_to_default() {
        let mut scenario = load(FormatVersion::Modern);
        let squad = EntityHandle::new(SelectionKind::Squads, 0);
        scenario
            .set_field(squad, FieldId::ZoneIndex, crate::FieldValue::Int16(7))
            .unwrap();

        let tree = scenario.ai_tree();
        assert_eq!(tree.zone_of(0), Some(ZoneSlot::Default));
        assert!(tree.zones[0].squads.is_empty());
    }
}
