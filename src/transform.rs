use anyhow::{Context, Result};
use geographiclib_rs::{Geodesic, InverseGeodesic};
use proj::Proj;

use crate::model::GridSystem;

// Classic proj4 definitions with explicit Helmert terms, so transforms do
// not depend on datum grid files being installed.
const OSGB36_DEF: &str = "+proj=tmerc +lat_0=49 +lon_0=-2 +k=0.9996012717 \
    +x_0=400000 +y_0=-100000 +ellps=airy \
    +towgs84=446.448,-125.157,542.06,0.15,0.247,0.842,-20.489 \
    +units=m +no_defs +type=crs";
const IRISH_DEF: &str = "+proj=tmerc +lat_0=53.5 +lon_0=-8 +k=1.000035 \
    +x_0=200000 +y_0=250000 +ellps=mod_airy \
    +towgs84=482.530,-130.596,564.557,-1.042,-0.214,-0.631,8.15 \
    +units=m +no_defs +type=crs";
const WGS84_DEF: &str = "+proj=longlat +datum=WGS84 +no_defs +type=crs";

/// Side of the square named by a grid reference, in metres.
pub fn square_side(digits: u8) -> f64 {
    10f64.powi(5 - (digits as i32) / 2)
}

/// A grid reference names a square, but consumers want a point, so move the
/// stored south-west corner half a square in each direction.
pub fn square_center(easting: i32, northing: i32, digits: u8) -> (f64, f64) {
    let half = 0.5 * square_side(digits);
    (easting as f64 + half, northing as f64 + half)
}

/// At 6 d.p. one ulp of latitude is about 11 cm and one of longitude about
/// 6 cm at these latitudes, so digits/2 + 1 places of latitude and digits/2
/// of longitude are always finer than the grid square being encoded.
pub fn format_lat_lon(lat: f64, lon: f64, digits: u8) -> (String, String) {
    let places = (digits / 2) as usize;
    (
        format!("{:.*}", places + 1, lat),
        format!("{:.*}", places, lon),
    )
}

/// Claimed precision in metres: the grid square side, floored to 100 m when
/// the source was only ever a six-figure reference.
pub fn precision_metres(digits: u8, use6fig: bool) -> f64 {
    let side = square_side(digits);
    if use6fig {
        side.max(100.0)
    } else {
        side
    }
}

const COMPASS_POINTS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

/// Nearest of the 16 compass points, wrapping at north. Accepts negative
/// azimuths as the geodesic inverse reports them.
pub fn compass_direction(degrees: f64) -> &'static str {
    let index = (degrees.rem_euclid(360.0) / 22.5).round() as usize % 16;
    COMPASS_POINTS[index]
}

/// Projection and inverse-geodesic collaborator. The engine carries no
/// projection mathematics of its own.
pub trait GeodesyProvider {
    /// Forward transform from grid eastings/northings to WGS84 (lat, lon).
    fn project(&self, system: GridSystem, easting: f64, northing: f64) -> Result<(f64, f64)>;

    /// WGS84 inverse problem: forward azimuth, back azimuth and distance in
    /// metres between two points.
    fn inverse(&self, lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> Result<(f64, f64, f64)>;
}

/// Default provider: PROJ for the two national grids, GeographicLib for the
/// WGS84 ellipsoid.
pub struct ProjGeodesy {
    bng: Proj,
    ig: Proj,
    geod: Geodesic,
}

impl ProjGeodesy {
    pub fn new() -> Result<Self> {
        let bng = Proj::new_known_crs(OSGB36_DEF, WGS84_DEF, None)
            .context("creating the British National Grid transform")?;
        let ig = Proj::new_known_crs(IRISH_DEF, WGS84_DEF, None)
            .context("creating the Irish Grid transform")?;
        Ok(Self {
            bng,
            ig,
            geod: Geodesic::wgs84(),
        })
    }
}

impl GeodesyProvider for ProjGeodesy {
    fn project(&self, system: GridSystem, easting: f64, northing: f64) -> Result<(f64, f64)> {
        let transform = match system {
            GridSystem::Osgb36 => &self.bng,
            GridSystem::IrishGrid => &self.ig,
        };
        let (lon, lat) = transform
            .convert((easting, northing))
            .with_context(|| format!("projecting ({easting}, {northing}) from {}", system.name()))?;
        Ok((lat, lon))
    }

    fn inverse(&self, lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> Result<(f64, f64, f64)> {
        let (distance, azi1, azi2, _arc): (f64, f64, f64, f64) =
            self.geod.inverse(lat1, lon1, lat2, lon2);
        // GeographicLib reports the forward azimuth at the second point;
        // flip it to get the back azimuth.
        let back = if azi2 > 0.0 { azi2 - 180.0 } else { azi2 + 180.0 };
        Ok((azi1, back, distance))
    }
}
