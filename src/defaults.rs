/// Reference configuration data.
///
/// Hotspot centers and radii from the Mumbai pilot deployment, Indian
/// emergency numbers, and nearby-search constants. The engine never reads
/// these directly: callers inject hotspots as a slice, so a remote or
/// stored configuration can replace the reference set.
use crate::geo::{Coordinate, GeoError};
use crate::hotspot::Hotspot;

/// Reference hotspot table: (latitude, longitude, radius in meters).
pub static REFERENCE_HOTSPOTS: &[(f64, f64, f64)] = &[
    (19.0695559, 72.8906955, 500.0),
    (19.0295559, 72.8506955, 700.0),
    (19.085559, 72.8606955, 500.0),
    (19.0495559, 72.8906955, 500.0),
];

/// Default map center when no fix is available yet (Mumbai).
pub const DEFAULT_MAP_CENTER: (f64, f64) = (19.0760, 72.8777);

/// Half-width of the nearby-search viewbox in degrees (~2 km).
pub const SEARCH_RADIUS_DEG: f64 = 0.02;

/// Wider viewbox used by the standalone police/hospital lists (~3 km).
pub const WIDE_SEARCH_RADIUS_DEG: f64 = 0.03;

/// Maximum places requested from the search provider per query.
pub const SEARCH_LIMIT: usize = 20;

/// Emergency services with a dedicated number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmergencyService {
    Police,
    Hospital,
    Ambulance,
    Medical,
    Fire,
    WomenHelpline,
    General,
}

/// Dial number for an emergency service.
pub fn emergency_number(service: EmergencyService) -> &'static str {
    match service {
        EmergencyService::Police => "100",
        EmergencyService::Hospital => "102",
        EmergencyService::Ambulance | EmergencyService::Medical => "108",
        EmergencyService::Fire => "101",
        EmergencyService::WomenHelpline => "1091",
        EmergencyService::General => "112",
    }
}

/// Build the reference hotspots as validated values.
pub fn reference_hotspots() -> Result<heapless::Vec<Hotspot, 4>, GeoError> {
    let mut out = heapless::Vec::new();
    for &(lat, lng, radius) in REFERENCE_HOTSPOTS {
        let _ = out.push(Hotspot::new(Coordinate::new(lat, lng)?, radius)?);
    }
    Ok(out)
}
