/// Great-circle geometry on a spherical Earth.
///
/// Coordinates are validated once at construction, so every distance
/// computed here is over finite, in-range degrees and never yields NaN.
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

const DEG_TO_RAD: f64 = core::f64::consts::PI / 180.0;

/// Rejected coordinate or radius input.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum GeoError {
    #[error("coordinate is not a finite number")]
    NotFinite,
    #[error("latitude {0} outside [-90, 90]")]
    LatitudeOutOfRange(f64),
    #[error("longitude {0} outside [-180, 180]")]
    LongitudeOutOfRange(f64),
    #[error("radius {0} is not a finite non-negative number of meters")]
    InvalidRadius(f64),
}

/// A WGS84-ish latitude/longitude pair in degrees. No datum correction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    lat: f64,
    lng: f64,
}

/// Unvalidated wire shape of a [`Coordinate`].
#[derive(Deserialize)]
struct RawCoordinate {
    lat: f64,
    lng: f64,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = GeoError;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        Coordinate::new(raw.lat, raw.lng)
    }
}

impl Coordinate {
    /// Validate and build a coordinate.
    pub fn new(lat: f64, lng: f64) -> Result<Self, GeoError> {
        if !lat.is_finite() || !lng.is_finite() {
            return Err(GeoError::NotFinite);
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(GeoError::LatitudeOutOfRange(lat));
        }
        if !(-180.0..=180.0).contains(&lng) {
            return Err(GeoError::LongitudeOutOfRange(lng));
        }
        Ok(Self { lat, lng })
    }

    pub fn latitude(&self) -> f64 {
        self.lat
    }

    pub fn longitude(&self) -> f64 {
        self.lng
    }
}

/// Haversine great-circle distance in meters.
///
/// Deltas are taken as absolute values so the result is bit-for-bit
/// symmetric in its arguments. The haversine term is clamped to `[0, 1]`
/// so antipodal pairs stay finite.
pub fn distance_m(a: &Coordinate, b: &Coordinate) -> f64 {
    let d_lat = libm::fabs(b.lat - a.lat) * DEG_TO_RAD;
    let d_lng = libm::fabs(b.lng - a.lng) * DEG_TO_RAD;

    let sin_lat = libm::sin(d_lat / 2.0);
    let sin_lng = libm::sin(d_lng / 2.0);
    let h = sin_lat * sin_lat
        + libm::cos(a.lat * DEG_TO_RAD) * libm::cos(b.lat * DEG_TO_RAD) * sin_lng * sin_lng;
    let h = h.clamp(0.0, 1.0);

    let c = 2.0 * libm::atan2(libm::sqrt(h), libm::sqrt(1.0 - h));
    EARTH_RADIUS_M * c
}

/// An axis-aligned box in degrees, used as a search viewbox.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl BoundingBox {
    /// Box extending `radius_deg` degrees from `center` on every side.
    ///
    /// Degrees, not meters: at the equator 0.01° is roughly 1.1 km.
    /// Edges are not wrapped at the antimeridian or clamped at the poles.
    pub fn around(center: &Coordinate, radius_deg: f64) -> Self {
        Self {
            left: center.lng - radius_deg,
            top: center.lat + radius_deg,
            right: center.lng + radius_deg,
            bottom: center.lat - radius_deg,
        }
    }

    /// Whether `point` lies inside the box (edges inclusive).
    pub fn contains(&self, point: &Coordinate) -> bool {
        point.lng >= self.left
            && point.lng <= self.right
            && point.lat >= self.bottom
            && point.lat <= self.top
    }
}
