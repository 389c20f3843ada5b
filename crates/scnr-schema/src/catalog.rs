//! The schema catalog: every section of one scenario format.

use std::path::Path;

use scnr_common::Endian;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::section::FxHashMap;
use crate::{Error, Result, SectionLayout};

/// Shape of the AI squad location data.
///
/// Legacy formats nest starting locations under per-squad encounters, modern
/// formats give each squad group-formation and solo location blocks directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatVersion {
    Legacy,
    #[default]
    Modern,
}

impl FormatVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::Modern => "modern",
        }
    }
}

impl std::fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static layout description of a scenario format. Read-only once loaded.
///
/// # Example
///
/// ```
/// use scnr_schema::{FieldId, SchemaCatalog};
///
/// let catalog = SchemaCatalog::from_json(r#"{
///     "format": "modern",
///     "endian": "little",
///     "sections": {
///         "object_names": {
///             "header_offset": 0,
///             "stride": 36,
///             "fields": {
///                 "name": { "offset": 0, "type": "string32" },
///                 "placement_index": { "offset": 34, "type": "int16" }
///             }
///         }
///     }
/// }"#)?;
///
/// let names = catalog.section("object_names").unwrap();
/// assert_eq!(names.offset_of(FieldId::PlacementIndex), Some(34));
/// # Ok::<(), scnr_schema::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaCatalog {
    #[serde(default)]
    pub format: FormatVersion,
    #[serde(default)]
    pub endian: Endian,
    /// Subtracted from stored block pointers to obtain buffer offsets.
    #[serde(default)]
    pub pointer_base: u32,
    /// Address of the scenario root element that holds top-level headers.
    #[serde(default)]
    pub root_address: u64,
    #[serde(default)]
    pub sections: FxHashMap<String, SectionLayout>,
}

impl Default for SchemaCatalog {
    fn default() -> Self {
        Self::new(FormatVersion::default(), Endian::default())
    }
}

impl SchemaCatalog {
    /// Create an empty catalog.
    pub fn new(format: FormatVersion, endian: Endian) -> Self {
        Self {
            format,
            endian,
            pointer_base: 0,
            root_address: 0,
            sections: FxHashMap::default(),
        }
    }

    /// Add a top-level section.
    pub fn with_section(mut self, name: impl Into<String>, layout: SectionLayout) -> Self {
        self.sections.insert(name.into(), layout);
        self
    }

    /// Parse and validate a JSON catalog.
    pub fn from_json(json: &str) -> Result<Self> {
        let catalog: Self = serde_json::from_str(json)?;
        catalog.validate()?;
        debug!(
            format = %catalog.format,
            endian = %catalog.endian,
            sections = catalog.sections.len(),
            "loaded schema catalog"
        );
        Ok(catalog)
    }

    /// Load and validate a JSON catalog from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<()> {
        for (name, layout) in &self.sections {
            layout.validate(name)?;
        }
        Ok(())
    }

    /// Top-level section by name.
    #[inline]
    pub fn section(&self, name: &str) -> Option<&SectionLayout> {
        self.sections.get(name)
    }

    /// Walk a section path such as `["zones", "areas"]`.
    pub fn resolve(&self, path: &[&str]) -> Option<&SectionLayout> {
        let (first, rest) = path.split_first()?;
        rest.iter()
            .try_fold(self.section(first)?, |layout, name| layout.block(name))
    }

    /// Like [`resolve`](Self::resolve) but reports the missing path.
    pub fn require(&self, path: &[&str]) -> Result<&SectionLayout> {
        self.resolve(path)
            .ok_or_else(|| Error::MissingSection(path.join("/")))
    }

    /// Top-level section names in a stable order.
    pub fn section_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.sections.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
