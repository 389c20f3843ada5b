//! Synthetic scenario data for tests.
//!
//! Builds a small big-endian scenario buffer with a non-zero pointer base and
//! the schema describing it. Only depends on the store and schema crates so
//! the integration tests can include it too.

use scnr_common::{ByteStore, Endian};
use scnr_schema::{FieldId, FieldKind, FormatVersion, SchemaCatalog, SectionLayout};

pub const POINTER_BASE: u32 = 0x1000;

/// Size of the root element holding the top-level block headers.
pub const ROOT_SIZE: usize = 88;

pub const PLACEMENT_STRIDE: u32 = 32;
pub const NAME_STRIDE: u32 = 36;

fn placement(header_offset: u32) -> SectionLayout {
    SectionLayout::new(PLACEMENT_STRIDE)
        .at(header_offset)
        .with_field(FieldId::PaletteIndex, 0, FieldKind::Int16)
        .with_field(FieldId::NameIndex, 2, FieldKind::Int16)
        .with_field(FieldId::Position, 4, FieldKind::Vector3)
        .with_field(FieldId::Rotation, 16, FieldKind::Vector3)
        .with_field(FieldId::Scale, 28, FieldKind::Float32)
}

fn palette(header_offset: u32) -> SectionLayout {
    SectionLayout::new(16)
        .at(header_offset)
        .with_field(FieldId::ObjectRef, 0, FieldKind::TagRef)
}

fn location(header_offset: u32) -> SectionLayout {
    SectionLayout::new(16)
        .at(header_offset)
        .with_field(FieldId::Position, 0, FieldKind::Vector3)
        .with_field(FieldId::Rotation, 12, FieldKind::Float32)
}

fn squads(format: FormatVersion) -> SectionLayout {
    let squad = |stride| {
        SectionLayout::new(stride)
            .at(72)
            .with_field(FieldId::Name, 0, FieldKind::String32)
            .with_field(FieldId::SquadGroupIndex, 32, FieldKind::Int16)
            .with_field(FieldId::ZoneIndex, 34, FieldKind::Int16)
    };
    match format {
        FormatVersion::Legacy => squad(44).with_block(
            "encounters",
            SectionLayout::new(40)
                .at(36)
                .with_field(FieldId::Name, 0, FieldKind::String32)
                .with_block("starting_locations", location(32)),
        ),
        FormatVersion::Modern => squad(52)
            .with_block("group_locations", location(36))
            .with_block("solo_locations", location(44)),
    }
}

/// Schema of the synthetic scenario.
pub fn catalog(format: FormatVersion) -> SchemaCatalog {
    let mut catalog = SchemaCatalog::new(format, Endian::Big)
        .with_section("scenery", placement(0))
        .with_section("scenery_palette", palette(8))
        .with_section("bipeds", placement(16))
        .with_section("biped_palette", palette(24))
        .with_section(
            "object_names",
            SectionLayout::new(NAME_STRIDE)
                .at(32)
                .with_field(FieldId::Name, 0, FieldKind::String32)
                .with_field(FieldId::ObjectType, 32, FieldKind::Int16)
                .with_field(FieldId::PlacementIndex, 34, FieldKind::Int16),
        )
        .with_section(
            "trigger_volumes",
            SectionLayout::new(80)
                .at(40)
                .with_field(FieldId::Name, 0, FieldKind::String32)
                .with_field(FieldId::Forward, 32, FieldKind::Vector3)
                .with_field(FieldId::Up, 44, FieldKind::Vector3)
                .with_field(FieldId::Position, 56, FieldKind::Vector3)
                .with_field(FieldId::Size, 68, FieldKind::Vector3),
        )
        .with_section("player_starting_locations", location(48))
        .with_section(
            "squad_groups",
            SectionLayout::new(36)
                .at(56)
                .with_field(FieldId::Name, 0, FieldKind::String32)
                .with_field(FieldId::ParentIndex, 32, FieldKind::Int16),
        )
        .with_section(
            "zones",
            SectionLayout::new(48)
                .at(64)
                .with_field(FieldId::Name, 0, FieldKind::String32)
                .with_block(
                    "firing_positions",
                    SectionLayout::new(16)
                        .at(32)
                        .with_field(FieldId::Position, 0, FieldKind::Vector3)
                        .with_field(FieldId::AreaIndex, 12, FieldKind::Int16),
                )
                .with_block(
                    "areas",
                    SectionLayout::new(32)
                        .at(40)
                        .with_field(FieldId::Name, 0, FieldKind::String32),
                ),
        )
        .with_section("squads", squads(format))
        .with_section("vehicles", placement(80));
    catalog.pointer_base = POINTER_BASE;
    catalog
}

struct Builder {
    store: ByteStore,
}

impl Builder {
    fn new() -> Self {
        Self {
            store: ByteStore::from_bytes(vec![0; ROOT_SIZE], Endian::Big),
        }
    }

    /// Allocate `count` elements at the end and point the header at them.
    /// Returns the first element's address; an empty block keeps a null header.
    fn block(&mut self, header: u64, count: usize, stride: u32) -> u64 {
        if count == 0 {
            return 0;
        }
        let first = self.store.append_zeroed(count * stride as usize);
        self.store.write_i32(header, count as i32).unwrap();
        self.store.write_u32(header + 4, first as u32 + POINTER_BASE).unwrap();
        first
    }

    fn string(&mut self, at: u64, value: &str) {
        let mut writer = self.store.writer(at, 32).unwrap();
        writer.write_string_in_buffer(value, 32).unwrap();
    }

    fn i16(&mut self, at: u64, value: i16) {
        self.store.writer(at, 2).unwrap().write_i16(value).unwrap();
    }

    fn floats(&mut self, at: u64, values: &[f32]) {
        let mut writer = self.store.writer(at, values.len() * 4).unwrap();
        for v in values {
            writer.write_f32(*v).unwrap();
        }
    }

    fn tag(&mut self, at: u64, group: &[u8; 4], datum: u32) {
        self.store.write_u32(at, u32::from_be_bytes(*group)).unwrap();
        self.store.write_u32(at + 12, datum).unwrap();
    }

    fn locations(&mut self, header: u64, count: usize, seed: f32) {
        let first = self.block(header, count, 16);
        for i in 0..count {
            let at = first + i as u64 * 16;
            self.floats(at, &[seed, i as f32, 0.0, 0.25 * i as f32]);
        }
    }

    fn placements(&mut self, header: u64, rows: &[(i16, i16)]) {
        let first = self.block(header, rows.len(), PLACEMENT_STRIDE);
        for (i, (palette, name)) in rows.iter().enumerate() {
            let at = first + i as u64 * u64::from(PLACEMENT_STRIDE);
            self.i16(at, *palette);
            self.i16(at + 2, *name);
            self.floats(at + 4, &[i as f32, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
        }
    }

    fn finish(self) -> ByteStore {
        ByteStore::from_bytes(self.store.as_bytes().to_vec(), Endian::Big)
    }
}

/// Scenario buffer matching [`catalog`].
///
/// - scenery `[0, 1, 2]` with palette indices `[0, 1, 1]`, names `[0, 1, 2]`
/// - one biped (palette 0, name 3); no vehicles (null header)
/// - names `scenery_a`, `scenery_b`, `scenery_c` (scenery 0..3) and `biped_a` (biped 0)
/// - squad groups `all` (root) and `left` (parent 0)
/// - zones `zone_a` (two areas, firing positions on areas 0 and 1) and
///   `zone_b` (one area, no firing positions)
/// - squads `squad_0` (zone 0, group 1), `squad_1` (no zone, group 0),
///   `squad_2` (zone 1, no group)
pub fn scenario_bytes(format: FormatVersion) -> ByteStore {
    let mut b = Builder::new();

    b.placements(0, &[(0, 0), (1, 1), (1, 2)]);
    let first = b.block(8, 2, 16);
    for i in 0..2u32 {
        b.tag(first + u64::from(i) * 16, b"scen", 0xE000_0001 + i);
    }
    b.placements(16, &[(0, 3)]);
    let first = b.block(24, 1, 16);
    b.tag(first, b"bipd", 0xE000_0010);

    let names = [("scenery_a", 6, 0), ("scenery_b", 6, 1), ("scenery_c", 6, 2), ("biped_a", 0, 0)];
    let first = b.block(32, names.len(), NAME_STRIDE);
    for (i, (name, object_type, placement)) in names.iter().enumerate() {
        let at = first + i as u64 * u64::from(NAME_STRIDE);
        b.string(at, name);
        b.i16(at + 32, *object_type);
        b.i16(at + 34, *placement);
    }

    let first = b.block(40, 1, 80);
    b.string(first, "tv_a");
    b.floats(first + 32, &[1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 5.0, 5.0, 5.0, 2.0, 2.0, 2.0]);

    b.locations(48, 2, 10.0);

    let groups = [("all", -1), ("left", 0)];
    let first = b.block(56, groups.len(), 36);
    for (i, (name, parent)) in groups.iter().enumerate() {
        let at = first + i as u64 * 36;
        b.string(at, name);
        b.i16(at + 32, *parent);
    }

    let zones: [(&str, &[&str], &[i16]); 2] = [
        ("zone_a", &["area_a0", "area_a1"], &[0, 1]),
        ("zone_b", &["area_b0"], &[]),
    ];
    let first = b.block(64, zones.len(), 48);
    for (i, (name, areas, firing)) in zones.iter().enumerate() {
        let at = first + i as u64 * 48;
        b.string(at, name);
        let positions = b.block(at + 32, firing.len(), 16);
        for (j, area) in firing.iter().enumerate() {
            let fp = positions + j as u64 * 16;
            b.floats(fp, &[j as f32, 1.0, 0.0]);
            b.i16(fp + 12, *area);
        }
        let area_first = b.block(at + 40, areas.len(), 32);
        for (j, area) in areas.iter().enumerate() {
            b.string(area_first + j as u64 * 32, area);
        }
    }

    let squads = [("squad_0", 1, 0), ("squad_1", 0, -1), ("squad_2", -1, 1)];
    match format {
        FormatVersion::Modern => {
            let sets = [(2, 1), (1, 0), (0, 0)];
            let first = b.block(72, squads.len(), 52);
            for (i, ((name, group, zone), (grouped, solo))) in squads.iter().zip(sets).enumerate() {
                let at = first + i as u64 * 52;
                b.string(at, name);
                b.i16(at + 32, *group);
                b.i16(at + 34, *zone);
                b.locations(at + 36, grouped, i as f32);
                b.locations(at + 44, solo, 100.0 + i as f32);
            }
        }
        FormatVersion::Legacy => {
            let encounters: [&[(&str, usize)]; 3] = [&[("enc_0a", 2), ("enc_0b", 1)], &[("enc_1a", 0)], &[]];
            let first = b.block(72, squads.len(), 44);
            for (i, ((name, group, zone), squad_encounters)) in squads.iter().zip(encounters).enumerate() {
                let at = first + i as u64 * 44;
                b.string(at, name);
                b.i16(at + 32, *group);
                b.i16(at + 34, *zone);
                let enc_first = b.block(at + 36, squad_encounters.len(), 40);
                for (j, (enc_name, locations)) in squad_encounters.iter().enumerate() {
                    let enc = enc_first + j as u64 * 40;
                    b.string(enc, enc_name);
                    b.locations(enc + 32, *locations, j as f32);
                }
            }
        }
    }

    b.finish()
}
