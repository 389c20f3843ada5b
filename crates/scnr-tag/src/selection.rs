//! Selection kinds: every addressable collection in a scenario.
//!
//! A [`SelectionKind`] names one ordered collection, including the parent
//! indices needed to reach nested blocks. It maps to a schema path, parses
//! from and formats to a stable text form, and is what the locator, the
//! coordinator and the CLI all consume.

use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Object placement families. Each has a placement block and a palette block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PlacementKind {
    Scenery,
    Biped,
    Vehicle,
    Equipment,
    Weapon,
    Machine,
    Control,
    Crate,
}

impl PlacementKind {
    pub const ALL: [PlacementKind; 8] = [
        PlacementKind::Scenery,
        PlacementKind::Biped,
        PlacementKind::Vehicle,
        PlacementKind::Equipment,
        PlacementKind::Weapon,
        PlacementKind::Machine,
        PlacementKind::Control,
        PlacementKind::Crate,
    ];

    /// Short name used in selection text.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scenery => "scenery",
            Self::Biped => "biped",
            Self::Vehicle => "vehicle",
            Self::Equipment => "equipment",
            Self::Weapon => "weapon",
            Self::Machine => "machine",
            Self::Control => "control",
            Self::Crate => "crate",
        }
    }

    /// Schema section of the placement block.
    pub fn section(&self) -> &'static str {
        match self {
            Self::Scenery => "scenery",
            Self::Biped => "bipeds",
            Self::Vehicle => "vehicles",
            Self::Equipment => "equipment",
            Self::Weapon => "weapons",
            Self::Machine => "machines",
            Self::Control => "controls",
            Self::Crate => "crates",
        }
    }

    /// Schema section of the palette block.
    pub fn palette_section(&self) -> &'static str {
        match self {
            Self::Scenery => "scenery_palette",
            Self::Biped => "biped_palette",
            Self::Vehicle => "vehicle_palette",
            Self::Equipment => "equipment_palette",
            Self::Weapon => "weapon_palette",
            Self::Machine => "machine_palette",
            Self::Control => "control_palette",
            Self::Crate => "crate_palette",
        }
    }

    /// Object type code stored in object-name entries.
    pub fn object_type(&self) -> i64 {
        match self {
            Self::Biped => 0,
            Self::Vehicle => 1,
            Self::Weapon => 2,
            Self::Equipment => 3,
            Self::Scenery => 6,
            Self::Machine => 7,
            Self::Control => 8,
            Self::Crate => 10,
        }
    }

    pub fn from_object_type(code: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.object_type() == code)
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }
}

/// One ordered collection of a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionKind {
    Placements(PlacementKind),
    Palette(PlacementKind),
    ObjectNames,
    TriggerVolumes,
    StartingPositions,
    SquadGroups,
    Zones,
    FiringPositions { zone: usize },
    Areas { zone: usize },
    Squads,
    Encounters { squad: usize },
    StartingLocations { squad: usize, encounter: usize },
    GroupLocations { squad: usize },
    SoloLocations { squad: usize },
    /// Synthetic grouping of squads without a zone. Has no backing block.
    DefaultZone,
}

/// One step from the scenario root to a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PathStep {
    /// Top-level section by schema name.
    Section(&'static str),
    /// Nested block `name` of element `index` of the current collection.
    Nested { index: usize, name: &'static str },
}

impl SelectionKind {
    /// Whether the kind is backed by a block at all.
    #[inline]
    pub fn is_synthetic(&self) -> bool {
        matches!(self, Self::DefaultZone)
    }

    /// Schema section names from the root down to this collection.
    pub fn schema_path(&self) -> Vec<&'static str> {
        self.steps()
            .into_iter()
            .map(|step| match step {
                PathStep::Section(name) => name,
                PathStep::Nested { name, .. } => name,
            })
            .collect()
    }

    pub(crate) fn steps(&self) -> Vec<PathStep> {
        use PathStep::{Nested, Section};
        match *self {
            Self::Placements(kind) => vec![Section(kind.section())],
            Self::Palette(kind) => vec![Section(kind.palette_section())],
            Self::ObjectNames => vec![Section("object_names")],
            Self::TriggerVolumes => vec![Section("trigger_volumes")],
            Self::StartingPositions => vec![Section("player_starting_locations")],
            Self::SquadGroups => vec![Section("squad_groups")],
            Self::Zones => vec![Section("zones")],
            Self::FiringPositions { zone } => vec![
                Section("zones"),
                Nested { index: zone, name: "firing_positions" },
            ],
            Self::Areas { zone } => vec![Section("zones"), Nested { index: zone, name: "areas" }],
            Self::Squads => vec![Section("squads")],
            Self::Encounters { squad } => vec![
                Section("squads"),
                Nested { index: squad, name: "encounters" },
            ],
            Self::StartingLocations { squad, encounter } => vec![
                Section("squads"),
                Nested { index: squad, name: "encounters" },
                Nested { index: encounter, name: "starting_locations" },
            ],
            Self::GroupLocations { squad } => vec![
                Section("squads"),
                Nested { index: squad, name: "group_locations" },
            ],
            Self::SoloLocations { squad } => vec![
                Section("squads"),
                Nested { index: squad, name: "solo_locations" },
            ],
            Self::DefaultZone => Vec::new(),
        }
    }

    /// Every top-level kind, in display order.
    pub fn top_level() -> Vec<SelectionKind> {
        let mut kinds = Vec::with_capacity(PlacementKind::ALL.len() * 2 + 6);
        for kind in PlacementKind::ALL {
            kinds.push(Self::Placements(kind));
            kinds.push(Self::Palette(kind));
        }
        kinds.extend([
            Self::ObjectNames,
            Self::TriggerVolumes,
            Self::StartingPositions,
            Self::SquadGroups,
            Self::Zones,
            Self::Squads,
        ]);
        kinds
    }
}

impl fmt::Display for SelectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Placements(kind) => f.write_str(kind.as_str()),
            Self::Palette(kind) => write!(f, "{}-palette", kind.as_str()),
            Self::ObjectNames => f.write_str("object-names"),
            Self::TriggerVolumes => f.write_str("trigger-volumes"),
            Self::StartingPositions => f.write_str("starting-positions"),
            Self::SquadGroups => f.write_str("squad-groups"),
            Self::Zones => f.write_str("zones"),
            Self::FiringPositions { zone } => write!(f, "zone:{zone}:firing-positions"),
            Self::Areas { zone } => write!(f, "zone:{zone}:areas"),
            Self::Squads => f.write_str("squads"),
            Self::Encounters { squad } => write!(f, "squad:{squad}:encounters"),
            Self::StartingLocations { squad, encounter } => {
                write!(f, "squad:{squad}:encounter:{encounter}:starting-locations")
            }
            Self::GroupLocations { squad } => write!(f, "squad:{squad}:group-locations"),
            Self::SoloLocations { squad } => write!(f, "squad:{squad}:solo-locations"),
            Self::DefaultZone => f.write_str("default-zone"),
        }
    }
}

impl FromStr for SelectionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidSelection(s.to_string());
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        let parts: Vec<&str> = normalized.split(':').collect();
        let index = |text: &str| text.parse::<usize>().map_err(|_| invalid());

        let kind = match *parts.as_slice() {
            ["object-names"] => Self::ObjectNames,
            ["trigger-volumes"] => Self::TriggerVolumes,
            ["starting-positions"] => Self::StartingPositions,
            ["squad-groups"] => Self::SquadGroups,
            ["zones"] => Self::Zones,
            ["squads"] => Self::Squads,
            ["default-zone"] => Self::DefaultZone,
            ["zone", zone, "firing-positions"] => Self::FiringPositions { zone: index(zone)? },
            ["zone", zone, "areas"] => Self::Areas { zone: index(zone)? },
            ["squad", squad, "encounters"] => Self::Encounters { squad: index(squad)? },
            ["squad", squad, "group-locations"] => Self::GroupLocations { squad: index(squad)? },
            ["squad", squad, "solo-locations"] => Self::SoloLocations { squad: index(squad)? },
            ["squad", squad, "encounter", encounter, "starting-locations"] => Self::StartingLocations {
                squad: index(squad)?,
                encounter: index(encounter)?,
            },
            [single] => match single.strip_suffix("-palette") {
                Some(kind) => Self::Palette(PlacementKind::from_name(kind).ok_or_else(invalid)?),
                None => Self::Placements(PlacementKind::from_name(single).ok_or_else(invalid)?),
            },
            _ => return Err(invalid()),
        };
        Ok(kind)
    }
}

/// Positional handle to one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityHandle {
    pub kind: SelectionKind,
    pub index: usize,
}

impl EntityHandle {
    pub const fn new(kind: SelectionKind, index: usize) -> Self {
        Self { kind, index }
    }
}

impl fmt::Display for EntityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.kind, self.index)
    }
}

/// A UI selection: a collection plus, optionally, one item of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Selection {
    pub kind: SelectionKind,
    pub item: Option<usize>,
}

impl Selection {
    /// A bare category node.
    pub const fn category(kind: SelectionKind) -> Self {
        Self { kind, item: None }
    }

    pub const fn item(kind: SelectionKind, index: usize) -> Self {
        Self {
            kind,
            item: Some(index),
        }
    }
}
