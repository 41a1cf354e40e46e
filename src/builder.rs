use anyhow::Result;
use tracing::warn;

use crate::error::LocationError;
use crate::gridref;
use crate::model::{GridSystem, LocationFact, Provenance, Role, SourceRecord};
use crate::transform::{self, GeodesyProvider};

/// Point-in-region geocoding collaborator. Lookups are rate-limited
/// upstream, so callers gate them with an allowed flag; a failed lookup
/// degrades to "no region code".
pub trait RegionLookup {
    fn resolve(&self, lat: f64, lon: f64) -> Result<Option<String>>;
}

/// Region lookup that never answers.
pub struct NullRegionLookup;

impl RegionLookup for NullRegionLookup {
    fn resolve(&self, _lat: f64, _lon: f64) -> Result<Option<String>> {
        Ok(None)
    }
}

/// The camera and object facts derived from one archive record.
#[derive(Debug, Clone, Default)]
pub struct LocationFacts {
    pub camera: Option<LocationFact>,
    pub object: Option<LocationFact>,
}

/// Derives location facts from archive records. Collaborators are injected
/// once per run and shared across pages.
pub struct LocationBuilder<'a, G, R> {
    geodesy: &'a G,
    region: &'a R,
}

impl<'a, G: GeodesyProvider, R: RegionLookup> LocationBuilder<'a, G, R> {
    pub fn new(geodesy: &'a G, region: &'a R) -> Self {
        Self { geodesy, region }
    }

    pub fn build(
        &self,
        record: &SourceRecord,
        region_allowed: bool,
    ) -> Result<LocationFacts, LocationError> {
        let camera = self.camera_fact(record, region_allowed)?;
        let mut object = self.object_fact(record, region_allowed)?;
        // Two 1 km facts for the same square say nothing twice.
        let duplicate = match (&camera, &object) {
            (Some(cam), Some(obj)) => {
                cam.digits == 4
                    && obj.digits == 4
                    && cam.provenance.source == obj.provenance.source
            }
            _ => false,
        };
        if duplicate {
            object = None;
        }
        Ok(LocationFacts { camera, object })
    }

    /// Camera fact: the recorded viewpoint when there is one; otherwise, for
    /// fully moderated images, the subject square (the photographer stood
    /// within 1 km of the subject). A 1 km camera position is never worth
    /// recording, so four-figure derivations are suppressed.
    pub fn camera_fact(
        &self,
        record: &SourceRecord,
        region_allowed: bool,
    ) -> Result<Option<LocationFact>, LocationError> {
        let grid = record.grid()?;
        let (easting, northing, digits) = if record.has_viewpoint() {
            (
                record.viewpoint_eastings,
                record.viewpoint_northings,
                record.viewpoint_grlen,
            )
        } else if record.moderation_status.is_fully_moderated() {
            let (easting, northing) = gridref::gridref_to_en(grid, &record.grid_reference)?;
            (easting, northing, 4)
        } else {
            return Ok(None);
        };
        if digits == 4 {
            return Ok(None);
        }
        self.fact(Role::Camera, grid, easting, northing, digits, record, region_allowed)
            .map(Some)
    }

    /// Object fact: explicit subject eastings/northings when the archive
    /// holds them at better than 1 km, otherwise the textual four-figure
    /// reference.
    pub fn object_fact(
        &self,
        record: &SourceRecord,
        region_allowed: bool,
    ) -> Result<Option<LocationFact>, LocationError> {
        let grid = record.grid()?;
        let (easting, northing, digits) = match record.natgrlen {
            6 | 8 | 10 => (record.nateastings, record.natnorthings, record.natgrlen),
            _ => {
                let (easting, northing) = gridref::gridref_to_en(grid, &record.grid_reference)?;
                (easting, northing, 4)
            }
        };
        self.fact(Role::Object, grid, easting, northing, digits, record, region_allowed)
            .map(Some)
    }

    #[allow(clippy::too_many_arguments)]
    fn fact(
        &self,
        role: Role,
        grid: GridSystem,
        easting: i32,
        northing: i32,
        digits: u8,
        record: &SourceRecord,
        region_allowed: bool,
    ) -> Result<LocationFact, LocationError> {
        let (center_e, center_n) = transform::square_center(easting, northing, digits);
        let (lat, lon) = self.geodesy.project(grid, center_e, center_n)?;
        let (latitude, longitude) = transform::format_lat_lon(lat, lon, digits);
        let reference = gridref::en_to_gridref(grid, center_e, center_n, digits)?;

        let region = if region_allowed {
            match self.region.resolve(lat, lon) {
                Ok(region) => region,
                Err(err) => {
                    warn!("region lookup failed at ({lat}, {lon}): {err:#}");
                    None
                }
            }
        } else {
            None
        };

        Ok(LocationFact {
            role,
            latitude,
            longitude,
            precision: transform::precision_metres(digits, record.use6fig),
            digits,
            provenance: Provenance {
                source: Some(format!("geograph-{}({})", grid.name(), reference)),
                region,
                // The view direction is recorded in grid space rather than
                // as a true heading. The divergence stays under 10 degrees
                // even at the worst corners of the grid, against a stated
                // granularity of 23 degrees.
                heading: record.heading(),
            },
        })
    }
}
