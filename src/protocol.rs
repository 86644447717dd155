/// JSON message protocol between the engine, the place search, and the UI.
///
/// Search responses and hotspot configurations are parsed with
/// `serde-json-core` into fixed-capacity types; outgoing messages are
/// newline-delimited JSON (NDJSON). Uses `heapless` types for
/// no_std/no-alloc operation.
use core::fmt;

use heapless::{String, Vec};
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::defaults::SEARCH_LIMIT;
use crate::geo::{Coordinate, GeoError};
use crate::hotspot::{Hotspot, MAX_HOTSPOTS};
use crate::nearby::Category;

/// Protocol-level failures.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ProtocolError {
    #[error("malformed JSON or too many entries")]
    Malformed,
    #[error("invalid coordinate: {0}")]
    InvalidCoordinate(#[from] GeoError),
    #[error("unparseable number: {0}")]
    InvalidNumber(&'static str),
    #[error("command is missing field `{0}`")]
    MissingField(&'static str),
    #[error("unknown command")]
    UnknownCommand,
}

/// Copy `s` into a fixed-capacity string, cutting on a char boundary if it
/// does not fit.
pub(crate) fn truncate_into<const N: usize>(s: &str) -> String<N> {
    let mut end = s.len().min(N);
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    let mut out = String::new();
    let _ = out.push_str(&s[..end]);
    out
}

// ── Search response ────────────────────────────────────────────────────

/// Scratch space for unescaping one JSON string while parsing.
const UNESCAPE_LEN: usize = 1024;

/// A string field copied out of a JSON document, unescaped, and cut on a
/// char boundary if it exceeds `N` bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Text<const N: usize>(String<N>);

impl<const N: usize> Text<N> {
    pub fn new(s: &str) -> Self {
        Self(truncate_into(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de, const N: usize> Deserialize<'de> for Text<N> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TextVisitor<const N: usize>;

        impl<'de, const N: usize> Visitor<'de> for TextVisitor<N> {
            type Value = Text<N>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                Ok(Text::new(v))
            }
        }

        deserializer.deserialize_str(TextVisitor::<N>)
    }
}

/// One place from a nearby-search response (Nominatim `format=json`).
///
/// Coordinates arrive as decimal strings. Fields other than these four
/// are ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SearchPlace {
    pub lat: Text<32>,
    pub lon: Text<32>,
    #[serde(default)]
    pub name: Option<Text<64>>,
    #[serde(default)]
    pub display_name: Option<Text<160>>,
}

impl SearchPlace {
    pub fn new(lat: &str, lon: &str, name: Option<&str>, display_name: Option<&str>) -> Self {
        Self {
            lat: Text::new(lat),
            lon: Text::new(lon),
            name: name.map(Text::new),
            display_name: display_name.map(Text::new),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_ref().map(Text::as_str)
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_ref().map(Text::as_str)
    }

    /// Parse and validate the place coordinate.
    pub fn coordinate(&self) -> Result<Coordinate, ProtocolError> {
        let lat = self
            .lat
            .as_str()
            .trim()
            .parse::<f64>()
            .map_err(|_| ProtocolError::InvalidNumber("lat"))?;
        let lng = self
            .lon
            .as_str()
            .trim()
            .parse::<f64>()
            .map_err(|_| ProtocolError::InvalidNumber("lon"))?;
        Ok(Coordinate::new(lat, lng)?)
    }
}

/// Parsed search response.
pub type PlaceList = Vec<SearchPlace, SEARCH_LIMIT>;

/// Parse a search response body (a JSON array of places).
pub fn parse_search_response(data: &[u8]) -> Result<PlaceList, ProtocolError> {
    let mut scratch = [0u8; UNESCAPE_LEN];
    serde_json_core::from_slice_escaped::<PlaceList>(data, &mut scratch)
        .map(|(places, _)| places)
        .map_err(|_| ProtocolError::Malformed)
}

// ── Hotspot configuration ──────────────────────────────────────────────

/// Injected hotspot configuration: `{"hotspots":[{"lat","lng","radius"}, …]}`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HotspotConfig {
    pub hotspots: Vec<Hotspot, MAX_HOTSPOTS>,
}

/// Parse and validate a hotspot configuration. Any invalid hotspot rejects
/// the whole document.
pub fn parse_hotspot_config(data: &[u8]) -> Result<HotspotConfig, ProtocolError> {
    serde_json_core::from_slice::<HotspotConfig>(data)
        .map(|(config, _)| config)
        .map_err(|_| ProtocolError::Malformed)
}

// ── Outgoing messages ──────────────────────────────────────────────────

/// Alert text shown with a hotspot notification.
pub const HOTSPOT_ALERT_TEXT: &str = "You are entering a hotspot location!";

/// Messages sent from the engine to the UI.
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum AppMessage<'a> {
    /// Engine started: map center and number of configured hotspots
    #[serde(rename = "ready")]
    Ready {
        version: &'static str,
        center: Coordinate,
        hotspots: usize,
    },
    /// One configured hotspot, sent after `ready` for map overlays
    #[serde(rename = "hotspot")]
    Hotspot { index: usize, hotspot: &'a Hotspot },
    /// The user entered (or is inside) a hotspot
    #[serde(rename = "hotspot_alert")]
    HotspotAlert {
        hotspot: usize,
        /// Distance to the hotspot center, whole meters
        distance_m: u32,
        message: &'static str,
    },
    /// One ranked nearby place
    #[serde(rename = "place")]
    Place {
        id: &'a str,
        category: Category,
        name: &'a str,
        address: &'a str,
        lat: f64,
        lng: f64,
        /// Whole meters from the last fix
        distance_m: u32,
        /// Display label, e.g. "2.3 km"
        distance: &'a str,
        /// Number dialed from this row
        phone: &'static str,
    },
    /// End of a ranked list
    #[serde(rename = "nearby_done")]
    NearbyDone { category: Category, count: usize },
    /// Search returned nothing; offer the emergency number instead
    #[serde(rename = "no_results")]
    NoResults {
        category: Category,
        emergency: &'static str,
    },
    /// The active category was deselected and results cleared
    #[serde(rename = "cleared")]
    Cleared {
        #[serde(skip_serializing_if = "Option::is_none")]
        category: Option<Category>,
    },
    /// Outcome of a call request
    #[serde(rename = "call")]
    Call {
        number: &'a str,
        outcome: &'static str,
    },
    /// A request could not be served
    #[serde(rename = "error")]
    Error {
        reason: &'a str,
        /// Fallback number to offer, if any
        #[serde(skip_serializing_if = "Option::is_none")]
        emergency: Option<&'static str>,
    },
}

/// Commands sent from the UI to the engine.
///
/// Deserialized via [`RawCommand`] in `bridge::parse_command()` because
/// `serde_json_core` does not support internally tagged enums.
#[derive(Debug, Clone, PartialEq)]
pub enum UiCommand {
    /// A new location fix
    Fix { coordinate: Coordinate },
    /// Toggle a nearby-place category
    Nearby { category: Category },
    /// Clear results and the active category
    Clear,
    /// Dial a number
    Call { number: PhoneString },
}

/// Maximum length for a phone number as typed
pub type PhoneString = String<24>;

/// Wire format for UI commands: a flat struct `serde_json_core` can
/// deserialize without `deserialize_any`.
#[derive(Deserialize)]
pub(crate) struct RawCommand {
    pub cmd: String<16>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub number: Option<PhoneString>,
}

/// Crate version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Maximum size of a serialized JSON message
pub const MAX_MSG_LEN: usize = 512;

/// Buffer type for serialized JSON messages
pub type MsgBuffer = Vec<u8, MAX_MSG_LEN>;

#[cfg(test)]
mod tests {
    use super::*;

    // ── truncate_into ───────────────────────────────────────────────

    #[test]
    fn truncate_short_string_unchanged() {
        let s: String<8> = truncate_into("abc");
        assert_eq!(s.as_str(), "abc");
    }

    #[test]
    fn truncate_respects_char_boundary() {
        // "é" is two bytes; cutting at 4 would split the third one
        let s: String<4> = truncate_into("aéé");
        assert_eq!(s.as_str(), "aé");
    }

    // ── Search response parsing ─────────────────────────────────────

    const RESPONSE: &str = r#"[
        {"place_id":1,"lat":"19.0800","lon":"72.8800","name":"Colaba Police Station","display_name":"Colaba Police Station, Colaba, Mumbai","boundingbox":["19.07","19.09","72.87","72.89"]},
        {"place_id":2,"lat":"19.0700","lon":"72.8700","name":"","display_name":"Azad Maidan Police, Fort, Mumbai"},
        {"place_id":3,"lat":"19.0600","lon":"72.8600"}
    ]"#;

    #[test]
    fn parse_search_response_reads_places() {
        let places = parse_search_response(RESPONSE.as_bytes()).unwrap();
        assert_eq!(places.len(), 3);
        assert_eq!(places[0].name(), Some("Colaba Police Station"));
        assert_eq!(places[1].name(), Some(""));
        assert_eq!(places[2].name(), None);
        assert_eq!(places[2].display_name(), None);
    }

    #[test]
    fn search_place_coordinate() {
        let places = parse_search_response(RESPONSE.as_bytes()).unwrap();
        let c = places[0].coordinate().unwrap();
        assert_eq!(c.latitude(), 19.08);
        assert_eq!(c.longitude(), 72.88);
    }

    #[test]
    fn search_place_bad_coordinate() {
        let place = SearchPlace::new("north", "72.0", None, None);
        assert_eq!(place.coordinate(), Err(ProtocolError::InvalidNumber("lat")));

        let place = SearchPlace::new("95.0", "72.0", None, None);
        assert_eq!(
            place.coordinate(),
            Err(ProtocolError::InvalidCoordinate(GeoError::LatitudeOutOfRange(95.0)))
        );
    }

    #[test]
    fn search_strings_are_unescaped() {
        let body = br#"[
            {"lat":"19.08","lon":"72.88","name":"St. Xavier\"s","display_name":"Sh\u0101h Rd, \"Fort\", Mumbai"},
            {"lat":"19.07","lon":"72.87","name":"A\\B\/C","display_name":"Line\nbreak"}
        ]"#;
        let places = parse_search_response(body).unwrap();
        assert_eq!(places[0].name(), Some("St. Xavier\"s"));
        assert_eq!(places[0].display_name(), Some("Sh\u{101}h Rd, \"Fort\", Mumbai"));
        assert_eq!(places[1].name(), Some("A\\B/C"));
        assert_eq!(places[1].display_name(), Some("Line\nbreak"));
    }

    #[test]
    fn escaped_ignored_fields_are_skipped() {
        let body = br#"[{"lat":"19.08","lon":"72.88","licence":"Data \u00a9 OpenStreetMap","name":"Q"}]"#;
        let places = parse_search_response(body).unwrap();
        assert_eq!(places[0].name(), Some("Q"));
    }

    #[test]
    fn long_search_strings_are_truncated() {
        let long = "x".repeat(300);
        let body = std::format!(r#"[{{"lat":"19.08","lon":"72.88","display_name":"{long}"}}]"#);
        let places = parse_search_response(body.as_bytes()).unwrap();
        assert_eq!(places[0].display_name().map(str::len), Some(160));
    }

    #[test]
    fn empty_response_is_empty_list() {
        assert!(parse_search_response(b"[]").unwrap().is_empty());
    }

    #[test]
    fn malformed_response_is_error() {
        assert_eq!(
            parse_search_response(b"{\"error\":").unwrap_err(),
            ProtocolError::Malformed
        );
    }

    // ── Hotspot config ──────────────────────────────────────────────

    #[test]
    fn parse_hotspot_config_valid() {
        let json = br#"{"hotspots":[
            {"lat":19.0295559,"lng":72.8506955,"radius":700},
            {"lat":19.085559,"lng":72.8606955,"radius":500}
        ]}"#;
        let config = parse_hotspot_config(json).unwrap();
        assert_eq!(config.hotspots.len(), 2);
        assert_eq!(config.hotspots[0].radius_m(), 700.0);
    }

    #[test]
    fn parse_hotspot_config_rejects_invalid_entry() {
        let json = br#"{"hotspots":[{"lat":19.0,"lng":272.0,"radius":700}]}"#;
        assert_eq!(parse_hotspot_config(json), Err(ProtocolError::Malformed));
    }

    #[test]
    fn parse_hotspot_config_empty_list() {
        let config = parse_hotspot_config(br#"{"hotspots":[]}"#).unwrap();
        assert!(config.hotspots.is_empty());
    }

    // ── AppMessage serialization ────────────────────────────────────

    fn to_json(msg: &AppMessage) -> std::string::String {
        let mut buf = [0u8; MAX_MSG_LEN];
        let len = serde_json_core::to_slice(msg, &mut buf).unwrap();
        core::str::from_utf8(&buf[..len]).unwrap().into()
    }

    #[test]
    fn serialize_hotspot_alert() {
        let json = to_json(&AppMessage::HotspotAlert {
            hotspot: 2,
            distance_m: 120,
            message: HOTSPOT_ALERT_TEXT,
        });
        assert!(json.contains(r#""type":"hotspot_alert""#));
        assert!(json.contains(r#""hotspot":2"#));
        assert!(json.contains(r#""distance_m":120"#));
    }

    #[test]
    fn serialize_place() {
        let json = to_json(&AppMessage::Place {
            id: "police-0",
            category: Category::Police,
            name: "Colaba Police Station",
            address: "Colaba, Mumbai",
            lat: 19.08,
            lng: 72.88,
            distance_m: 450,
            distance: "450 m",
            phone: "100",
        });
        assert!(json.contains(r#""type":"place""#));
        assert!(json.contains(r#""id":"police-0""#));
        assert!(json.contains(r#""category":"police""#));
        assert!(json.contains(r#""distance":"450 m""#));
        assert!(json.contains(r#""phone":"100""#));
    }

    #[test]
    fn serialize_ready_and_hotspot() {
        let center = Coordinate::new(19.076, 72.8777).unwrap();
        let json = to_json(&AppMessage::Ready {
            version: "0.1.0",
            center,
            hotspots: 4,
        });
        assert_eq!(
            json,
            r#"{"type":"ready","version":"0.1.0","center":{"lat":19.076,"lng":72.8777},"hotspots":4}"#
        );

        let hotspot = Hotspot::new(center, 500.0).unwrap();
        let json = to_json(&AppMessage::Hotspot {
            index: 1,
            hotspot: &hotspot,
        });
        assert!(json.contains(r#""type":"hotspot""#));
        assert!(json.contains(r#""hotspot":{"lat":19.076,"lng":72.8777,"radius":500"#));
    }

    #[test]
    fn serialize_no_results() {
        let json = to_json(&AppMessage::NoResults {
            category: Category::Medical,
            emergency: "108",
        });
        assert!(json.contains(r#""type":"no_results""#));
        assert!(json.contains(r#""category":"medical""#));
        assert!(json.contains(r#""emergency":"108""#));
    }

    #[test]
    fn serialize_error_omits_missing_emergency() {
        let json = to_json(&AppMessage::Error {
            reason: "no location fix",
            emergency: None,
        });
        assert!(json.contains(r#""reason":"no location fix""#));
        assert!(!json.contains("emergency"));
    }

    #[test]
    fn version_is_semver() {
        let parts: heapless::Vec<&str, 4> = VERSION.split('.').collect();
        assert_eq!(parts.len(), 3, "VERSION should be semver (major.minor.patch)");
        for part in &parts {
            assert!(part.parse::<u32>().is_ok(), "'{part}' is not a number");
        }
    }
}
