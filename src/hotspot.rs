/// Hotspot geofencing: radius containment, matching a fix against the
/// configured hotspot list, and turning matches into alert events.
///
/// `check_hotspots` is pure. Alert de-duplication lives in the
/// caller-owned [`GeofenceTracker`], which remembers which hotspots the
/// previous fix was inside.
use heapless::Vec;
use serde::{Deserialize, Serialize};

use crate::geo::{distance_m, Coordinate, GeoError};

/// Maximum number of hotspots a configuration can hold (one bit each in
/// [`HotspotSet`]).
pub const MAX_HOTSPOTS: usize = 64;

/// A circular geofence: center plus radius in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawHotspot", into = "RawHotspot")]
pub struct Hotspot {
    center: Coordinate,
    radius_m: f64,
}

/// Wire shape of a [`Hotspot`]: `{"lat":…,"lng":…,"radius":…}`.
#[derive(Clone, Copy, Serialize, Deserialize)]
struct RawHotspot {
    lat: f64,
    lng: f64,
    radius: f64,
}

impl TryFrom<RawHotspot> for Hotspot {
    type Error = GeoError;

    fn try_from(raw: RawHotspot) -> Result<Self, Self::Error> {
        Hotspot::new(Coordinate::new(raw.lat, raw.lng)?, raw.radius)
    }
}

impl From<Hotspot> for RawHotspot {
    fn from(h: Hotspot) -> Self {
        Self {
            lat: h.center.latitude(),
            lng: h.center.longitude(),
            radius: h.radius_m,
        }
    }
}

impl Hotspot {
    /// Build a hotspot. The radius must be finite and non-negative.
    pub fn new(center: Coordinate, radius_m: f64) -> Result<Self, GeoError> {
        if !radius_m.is_finite() || radius_m < 0.0 {
            return Err(GeoError::InvalidRadius(radius_m));
        }
        Ok(Self { center, radius_m })
    }

    pub fn center(&self) -> &Coordinate {
        &self.center
    }

    pub fn radius_m(&self) -> f64 {
        self.radius_m
    }
}

/// True iff `point` is within `hotspot.radius_m` of its center.
/// The boundary counts as inside.
pub fn is_within_radius(point: &Coordinate, hotspot: &Hotspot) -> bool {
    distance_m(point, &hotspot.center) <= hotspot.radius_m
}

/// A hotspot that contains the evaluated point.
#[derive(Debug, Clone, Copy)]
pub struct HotspotMatch<'a> {
    /// Position of the hotspot in the configured list
    pub index: usize,
    pub hotspot: &'a Hotspot,
    /// Distance from the point to the hotspot center
    pub distance_m: f64,
}

pub type HotspotMatches<'a> = Vec<HotspotMatch<'a>, MAX_HOTSPOTS>;

/// Evaluate `point` against every hotspot, in order, and return all
/// matches. Overlapping hotspots all match.
///
/// Hotspots past [`MAX_HOTSPOTS`] are not evaluated.
pub fn check_hotspots<'a>(point: &Coordinate, hotspots: &'a [Hotspot]) -> HotspotMatches<'a> {
    let mut matches = Vec::new();

    if hotspots.len() > MAX_HOTSPOTS {
        log::warn!(
            "{} hotspots configured, only the first {} are evaluated",
            hotspots.len(),
            MAX_HOTSPOTS
        );
    }

    for (index, hotspot) in hotspots.iter().take(MAX_HOTSPOTS).enumerate() {
        let d = distance_m(point, &hotspot.center);
        if d <= hotspot.radius_m {
            // Capacity equals the evaluated count, so this cannot fail
            let _ = matches.push(HotspotMatch {
                index,
                hotspot,
                distance_m: d,
            });
        }
    }

    log::debug!(
        "fix ({}, {}) inside {} of {} hotspots",
        point.latitude(),
        point.longitude(),
        matches.len(),
        hotspots.len()
    );

    matches
}

/// A 64-bit set of hotspot indices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HotspotSet {
    bits: u64,
}

impl HotspotSet {
    pub const fn new() -> Self {
        Self { bits: 0 }
    }

    /// Mark a hotspot index. Indices >= MAX_HOTSPOTS are silently ignored.
    #[inline]
    pub fn set(&mut self, idx: usize) {
        if idx < MAX_HOTSPOTS {
            self.bits |= 1u64 << idx;
        }
    }

    #[inline]
    pub fn get(&self, idx: usize) -> bool {
        idx < MAX_HOTSPOTS && (self.bits >> idx) & 1 == 1
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    pub fn len(&self) -> usize {
        self.bits.count_ones() as usize
    }
}

/// How hotspot matches turn into alerts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AlertPolicy {
    /// One alert per entry event: emitted when a fix is inside a hotspot
    /// the previous fix was not inside. Overlapping hotspots entered on the
    /// same fix produce a single alert.
    #[default]
    PerEntry,
    /// One alert per matched hotspot on every fix, including repeats while
    /// the user stays inside.
    PerMatch,
}

/// A single alert to surface (notification, vibration, prompt).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertEvent {
    /// Index of the hotspot that triggered the alert
    pub hotspot: usize,
    pub distance_m: f64,
}

pub type AlertEvents = Vec<AlertEvent, MAX_HOTSPOTS>;

/// Caller-owned geofence state: which hotspots the last fix was inside.
#[derive(Debug, Clone, Default)]
pub struct GeofenceTracker {
    policy: AlertPolicy,
    inside: HotspotSet,
}

impl GeofenceTracker {
    pub const fn new(policy: AlertPolicy) -> Self {
        Self {
            policy,
            inside: HotspotSet::new(),
        }
    }

    pub fn policy(&self) -> AlertPolicy {
        self.policy
    }

    /// Hotspots the most recent fix was inside.
    pub fn inside(&self) -> &HotspotSet {
        &self.inside
    }

    /// Forget previous containment, e.g. when the hotspot list changes.
    pub fn reset(&mut self) {
        self.inside = HotspotSet::new();
    }

    /// Evaluate a new fix and return the alerts it triggers.
    pub fn update(&mut self, point: &Coordinate, hotspots: &[Hotspot]) -> AlertEvents {
        let matches = check_hotspots(point, hotspots);

        let mut now = HotspotSet::new();
        for m in &matches {
            now.set(m.index);
        }

        let mut events = AlertEvents::new();
        match self.policy {
            AlertPolicy::PerMatch => {
                for m in &matches {
                    let _ = events.push(AlertEvent {
                        hotspot: m.index,
                        distance_m: m.distance_m,
                    });
                }
            }
            AlertPolicy::PerEntry => {
                if let Some(m) = matches.iter().find(|m| !self.inside.get(m.index)) {
                    let _ = events.push(AlertEvent {
                        hotspot: m.index,
                        distance_m: m.distance_m,
                    });
                }
            }
        }

        if !events.is_empty() {
            log::info!(
                "Hotspot alert: {} event(s), inside {} hotspot(s)",
                events.len(),
                now.len()
            );
        }

        self.inside = now;
        events
    }
}
