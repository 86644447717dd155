/// Collaborator interfaces.
///
/// The engine never touches the platform: location, place search, the
/// dialer and alert delivery are supplied by the embedding application.
/// Every call is an explicit request/response; the core only ever sees
/// resolved values.
use crate::geo::Coordinate;
use crate::hotspot::AlertEvent;
use crate::protocol::PlaceList;
use crate::search::SearchQuery;

/// Result of a foreground location permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
}

/// Source of location fixes.
pub trait LocationProvider {
    type Error: core::fmt::Debug;

    /// Ask for foreground location access.
    fn request_permission(&mut self) -> Permission;

    /// Current best fix.
    fn current_fix(&mut self) -> Result<Coordinate, Self::Error>;
}

/// Category search within a bounding box.
pub trait NearbySearch {
    type Error: core::fmt::Debug;

    fn search(&mut self, query: &SearchQuery) -> Result<PlaceList, Self::Error>;
}

/// Device dialer reached through `tel:` URIs.
pub trait Dialer {
    type Error: core::fmt::Debug;

    /// Whether the device can open `uri`.
    fn can_open(&self, uri: &str) -> bool;

    fn open(&mut self, uri: &str) -> Result<(), Self::Error>;
}

/// Receiver of hotspot alerts (notification, vibration, prompt).
pub trait AlertSink {
    fn hotspot_alert(&mut self, event: &AlertEvent);
}
