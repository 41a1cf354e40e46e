use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::LocationError;

/// The two national grids Geograph records locations in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridSystem {
    /// British National Grid (EPSG:27700).
    Osgb36,
    /// Irish Grid (EPSG:29903).
    IrishGrid,
}

impl GridSystem {
    /// Name used inside provenance strings, e.g. "source:geograph-osgb36(...)".
    pub fn name(self) -> &'static str {
        match self {
            GridSystem::Osgb36 => "osgb36",
            GridSystem::IrishGrid => "irishgrid",
        }
    }

    /// Geograph's reference_index column: 1 is the British grid, 2 the Irish.
    pub fn from_reference_index(index: u8) -> Result<Self, LocationError> {
        match index {
            1 => Ok(GridSystem::Osgb36),
            2 => Ok(GridSystem::IrishGrid),
            other => Err(LocationError::UnknownGridSystem(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationStatus {
    Pending,
    Accepted,
    /// Fully moderated: a Geograph moderator has checked the subject square.
    Geograph,
    Rejected,
}

impl ModerationStatus {
    pub fn is_fully_moderated(self) -> bool {
        matches!(self, ModerationStatus::Geograph)
    }
}

/// One row of the archive mirror (gridimage_base joined with gridimage_geo).
/// Read-only; fetched by image id, never written back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRecord {
    pub gridimage_id: u64,
    pub moderation_status: ModerationStatus,
    /// Subject square as text, always four figures, e.g. "SO8001".
    pub grid_reference: String,
    /// 1 = British grid, 2 = Irish grid.
    pub reference_index: u8,
    pub nateastings: i32,
    pub natnorthings: i32,
    /// Digits of the subject reference; 4 when only grid_reference is stored.
    pub natgrlen: u8,
    pub viewpoint_eastings: i32,
    pub viewpoint_northings: i32,
    /// 0 when the photographer did not record a viewpoint.
    pub viewpoint_grlen: u8,
    /// Degrees clockwise from grid north, or -1 when unset.
    pub view_direction: i16,
    pub use6fig: bool,
}

impl SourceRecord {
    pub fn grid(&self) -> Result<GridSystem, LocationError> {
        GridSystem::from_reference_index(self.reference_index)
    }

    pub fn heading(&self) -> Option<u16> {
        if self.view_direction < 0 {
            None
        } else {
            Some(self.view_direction as u16)
        }
    }

    pub fn has_viewpoint(&self) -> bool {
        self.viewpoint_grlen != 0
    }
}

/// Row-keyed lookup into the local mirror of the archive database.
pub trait SourceArchive {
    fn lookup(&self, image_id: u64) -> anyhow::Result<Option<SourceRecord>>;
}

/// Which of the two location facts a value describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Camera,
    Object,
}

impl Role {
    pub fn other(self) -> Role {
        match self {
            Role::Camera => Role::Object,
            Role::Object => Role::Camera,
        }
    }

    /// Template name the engine writes for this role.
    pub fn template_name(self) -> &'static str {
        match self {
            Role::Camera => "Location",
            Role::Object => "Object location",
        }
    }

    /// Template names accepted as an existing fact for this role. First-letter
    /// case is not significant when matching.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Role::Camera => &["Location", "Location dec", "Camera location", "Koordynaty"],
            Role::Object => &["Object location", "Object location dec"],
        }
    }

    /// Structured-data property carrying this role's coordinate.
    pub fn property_id(self) -> &'static str {
        match self {
            Role::Camera => "P1259",
            Role::Object => "P625",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Camera => "camera",
            Role::Object => "object",
        })
    }
}

/// Structured form of the "source:geograph-…[_region:…][_heading:…]" template
/// parameter. Only serialized to the string form at the document-rendering
/// boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Provenance {
    pub source: Option<String>,
    pub region: Option<String>,
    pub heading: Option<u16>,
}

impl Provenance {
    /// Parse the underscore-joined key:value mini-format. Unknown keys are
    /// ignored; a template with no source parameter parses to all-None.
    pub fn parse(raw: &str) -> Self {
        let mut parsed = Provenance::default();
        for part in raw.trim().split('_') {
            match part.split_once(':') {
                Some(("source", value)) => parsed.source = Some(value.to_string()),
                Some(("region", value)) => parsed.region = Some(value.to_string()),
                Some(("heading", value)) => parsed.heading = value.parse().ok(),
                _ => {}
            }
        }
        parsed
    }

    /// True when the source component says the coordinate came from the
    /// archive: "geograph" alone, or "geograph-<grid>(<ref>)".
    pub fn is_archival(&self) -> bool {
        match &self.source {
            Some(source) => source == "geograph" || source.starts_with("geograph-"),
            None => false,
        }
    }

    /// The source component carries a grid reference when it has a "-"
    /// separator; plain "geograph" predates gridref tagging.
    pub fn has_grid_reference(&self) -> bool {
        self.source.as_deref().is_some_and(|source| source.contains('-'))
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(source) = &self.source {
            write!(f, "source:{}", source)?;
        }
        if let Some(region) = &self.region {
            write!(f, "_region:{}", region)?;
        }
        if let Some(heading) = self.heading {
            write!(f, "_heading:{}", heading)?;
        }
        Ok(())
    }
}

/// A freshly computed location fact, ready to render as a template or
/// compare against what a page already says.
#[derive(Debug, Clone)]
pub struct LocationFact {
    pub role: Role,
    pub latitude: String,
    pub longitude: String,
    /// Grid square side in metres, possibly floored by the six-figure rule.
    pub precision: f64,
    /// Digits of the grid reference this fact was derived from.
    pub digits: u8,
    pub provenance: Provenance,
}

impl LocationFact {
    /// Precision as written to the prec= parameter.
    pub fn precision_string(&self) -> String {
        if self.precision.fract() == 0.0 {
            format!("{}", self.precision as i64)
        } else {
            format!("{}", self.precision)
        }
    }

    /// Numeric view of the coordinates. These were produced by formatting
    /// floats, so parsing cannot fail.
    pub fn coords(&self) -> (f64, f64) {
        (
            self.latitude.parse().unwrap_or_default(),
            self.longitude.parse().unwrap_or_default(),
        )
    }
}

/// A location fact extracted from current page markup by the parse-tree
/// collaborator. Coordinates stay as written; they may not even be decimal.
#[derive(Debug, Clone)]
pub struct ExistingLocation {
    pub role: Role,
    pub template_name: String,
    pub latitude: String,
    pub longitude: String,
    /// Raw third positional parameter, if any.
    pub source_param: Option<String>,
    /// True when a fourth positional parameter is present, i.e. the template
    /// is in degrees/minutes/seconds form.
    pub dms: bool,
}

impl ExistingLocation {
    pub fn provenance(&self) -> Provenance {
        self.source_param
            .as_deref()
            .map(Provenance::parse)
            .unwrap_or_default()
    }

    pub fn is_archive_provenanced(&self) -> bool {
        self.provenance().is_archival()
    }

    /// Both coordinates parsed as decimal degrees, if they are decimal.
    pub fn coords(&self) -> Option<(f64, f64)> {
        let lat = self.latitude.parse().ok()?;
        let lon = self.longitude.parse().ok()?;
        Some((lat, lon))
    }

    /// Structural equality with a computed fact: template name, coordinate
    /// strings and provenance string. Precision is advisory metadata and
    /// takes no part in this.
    pub fn matches_fact(&self, fact: &LocationFact) -> bool {
        self.template_name == fact.role.template_name()
            && self.latitude == fact.latitude
            && self.longitude == fact.longitude
            && self.source_param.as_deref().unwrap_or("") == fact.provenance.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provenance_round_trip() {
        let raw = "source:geograph-osgb36(SO80980134)_region:GB-EAW_heading:292";
        let parsed = Provenance::parse(raw);
        assert_eq!(parsed.source.as_deref(), Some("geograph-osgb36(SO80980134)"));
        assert_eq!(parsed.region.as_deref(), Some("GB-EAW"));
        assert_eq!(parsed.heading, Some(292));
        assert_eq!(parsed.to_string(), raw);
    }

    #[test]
    fn test_provenance_archival() {
        assert!(Provenance::parse("source:geograph").is_archival());
        assert!(Provenance::parse("source:geograph-irishgrid(W208765)").is_archival());
        assert!(!Provenance::parse("source:geograph").has_grid_reference());
        assert!(Provenance::parse("source:geograph-osgb36(SO8201)").has_grid_reference());
        assert!(!Provenance::parse("").is_archival());
        assert!(!Provenance::parse("source:geographical society").is_archival());
    }

    #[test]
    fn test_structural_equality_ignores_precision() {
        let fact = LocationFact {
            role: Role::Camera,
            latitude: "51.71051".to_string(),
            longitude: "-2.2766".to_string(),
            precision: 100.0,
            digits: 8,
            provenance: Provenance {
                source: Some("geograph-osgb36(SO80980134)".to_string()),
                region: None,
                heading: Some(292),
            },
        };
        let existing = ExistingLocation {
            role: Role::Camera,
            template_name: "Location".to_string(),
            latitude: "51.71051".to_string(),
            longitude: "-2.2766".to_string(),
            source_param: Some("source:geograph-osgb36(SO80980134)_heading:292".to_string()),
            dms: false,
        };
        assert!(existing.matches_fact(&fact));

        // A different stated precision changes nothing.
        let mut coarser = fact.clone();
        coarser.precision = 1000.0;
        assert!(existing.matches_fact(&coarser));

        // A different heading does.
        let mut turned = fact;
        turned.provenance.heading = Some(100);
        assert!(!existing.matches_fact(&turned));
    }

    #[test]
    fn test_record_heading_sentinel() {
        let mut record = SourceRecord {
            gridimage_id: 4,
            moderation_status: ModerationStatus::Geograph,
            grid_reference: "SO8001".to_string(),
            reference_index: 1,
            nateastings: 380930,
            natnorthings: 201360,
            natgrlen: 8,
            viewpoint_eastings: 380980,
            viewpoint_northings: 201340,
            viewpoint_grlen: 8,
            view_direction: 292,
            use6fig: true,
        };
        assert_eq!(record.heading(), Some(292));
        record.view_direction = -1;
        assert_eq!(record.heading(), None);
    }

    #[test]
    fn test_record_deserializes_from_mirror_row() {
        let record: SourceRecord = serde_json::from_str(
            r#"{
                "gridimage_id": 2913,
                "moderation_status": "geograph",
                "grid_reference": "W2076",
                "reference_index": 2,
                "nateastings": 120800,
                "natnorthings": 76500,
                "natgrlen": 6,
                "viewpoint_eastings": 0,
                "viewpoint_northings": 0,
                "viewpoint_grlen": 0,
                "view_direction": -1,
                "use6fig": false
            }"#,
        )
        .unwrap();
        assert_eq!(record.grid().unwrap(), GridSystem::IrishGrid);
        assert!(!record.has_viewpoint());
        assert!(record.moderation_status.is_fully_moderated());
    }
}
