//! File- and log-backed collaborators for the host companion.

use std::convert::Infallible;
use std::fs;
use std::path::PathBuf;

use anyhow::Context;

use safewalk::format::format_distance;
use safewalk::geo::Coordinate;
use safewalk::hotspot::AlertEvent;
use safewalk::protocol::{parse_search_response, PlaceList, HOTSPOT_ALERT_TEXT};
use safewalk::provider::{AlertSink, Dialer, LocationProvider, NearbySearch, Permission};
use safewalk::search::{QueryString, SearchQuery};

// ── Location ─────────────────────────────────────────────────────────

/// Startup position given on the command line. Without one, permission
/// is reported as denied and fixes only arrive over stdin.
pub struct StartLocation {
    fix: Option<Coordinate>,
}

impl StartLocation {
    pub fn new(fix: Option<Coordinate>) -> Self {
        Self { fix }
    }
}

impl LocationProvider for StartLocation {
    type Error = anyhow::Error;

    fn request_permission(&mut self) -> Permission {
        if self.fix.is_some() {
            Permission::Granted
        } else {
            Permission::Denied
        }
    }

    fn current_fix(&mut self) -> Result<Coordinate, Self::Error> {
        self.fix.context("no start location configured")
    }
}

// ── Nearby search ────────────────────────────────────────────────────

/// Serves saved search responses from `<dir>/<term>.json`.
///
/// Places outside the query viewbox are dropped, like a bounded search.
pub struct FileSearch {
    dir: PathBuf,
}

impl FileSearch {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

impl NearbySearch for FileSearch {
    type Error = anyhow::Error;

    fn search(&mut self, query: &SearchQuery) -> Result<PlaceList, Self::Error> {
        let path = self.dir.join(format!("{}.json", query.term()));

        let mut qs = QueryString::new();
        if query.write_query_string(&mut qs).is_ok() {
            log::debug!("search {} ({})", path.display(), qs);
        }

        let body = fs::read(&path).with_context(|| format!("reading {}", path.display()))?;

        let mut places = parse_search_response(&body)
            .with_context(|| format!("parsing {}", path.display()))?;

        // Unparseable coordinates are kept so candidate conversion reports them
        places.retain(|p| match p.coordinate() {
            Ok(c) => query.viewbox.contains(&c),
            Err(_) => true,
        });
        places.truncate(query.limit);

        Ok(places)
    }
}

// ── Dialer ───────────────────────────────────────────────────────────

/// Dialer that only logs the `tel:` URI it would open.
pub struct LogDialer;

impl Dialer for LogDialer {
    type Error = Infallible;

    fn can_open(&self, uri: &str) -> bool {
        uri.starts_with("tel:")
    }

    fn open(&mut self, uri: &str) -> Result<(), Self::Error> {
        log::info!("Opening dialer: {}", uri);
        Ok(())
    }
}

// ── Alerts ───────────────────────────────────────────────────────────

pub struct LogAlertSink;

impl AlertSink for LogAlertSink {
    fn hotspot_alert(&mut self, event: &AlertEvent) {
        log::warn!(
            "{} (hotspot {}, {} from center)",
            HOTSPOT_ALERT_TEXT,
            event.hotspot,
            format_distance(event.distance_m)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use safewalk::nearby::Category;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("safewalk-host-{}-{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn mumbai() -> Coordinate {
        Coordinate::new(19.0760, 72.8777).unwrap()
    }

    #[test]
    fn file_search_reads_term_file_and_bounds_results() {
        let dir = temp_dir("bounded");
        fs::write(
            dir.join("pharmacy.json"),
            r#"[
                {"lat":"19.0770","lon":"72.8780","name":"Inside"},
                {"lat":"19.5000","lon":"72.8780","name":"Outside"},
                {"lat":"oops","lon":"72.8780","name":"Broken"}
            ]"#,
        )
        .unwrap();

        let mut search = FileSearch::new(dir);
        let query = SearchQuery::around(&mumbai(), Category::Medical);
        let places = search.search(&query).unwrap();
        let names: Vec<_> = places.iter().filter_map(|p| p.name()).collect();
        assert_eq!(names, ["Inside", "Broken"]);
    }

    #[test]
    fn file_search_missing_file_is_error() {
        let mut search = FileSearch::new(temp_dir("missing"));
        let query = SearchQuery::around(&mumbai(), Category::Police);
        let err = search.search(&query).unwrap_err();
        assert!(format!("{err:#}").contains("police.json"));
    }

    #[test]
    fn start_location_permission() {
        let mut with = StartLocation::new(Some(mumbai()));
        assert_eq!(with.request_permission(), Permission::Granted);
        assert_eq!(with.current_fix().unwrap(), mumbai());

        let mut without = StartLocation::new(None);
        assert_eq!(without.request_permission(), Permission::Denied);
        assert!(without.current_fix().is_err());
    }

    #[test]
    fn log_dialer_only_opens_tel() {
        assert!(LogDialer.can_open("tel:112"));
        assert!(!LogDialer.can_open("https://example.com"));
    }
}
