/// Nearby lookup session.
///
/// Holds the last known fix, the active category and the current ranked
/// list. Each lookup replaces the previous list wholesale; selecting the
/// active category again deselects it and clears the list.
use thiserror::Error;

use crate::defaults::SEARCH_RADIUS_DEG;
use crate::geo::Coordinate;
use crate::nearby::{rank_nearby, Category, RankedList, RankedResult, DEFAULT_MAX_RESULTS};
use crate::provider::NearbySearch;
use crate::search::{candidates_from_places, SearchQuery};

/// Why a lookup could not produce a list.
#[derive(Debug, Error)]
pub enum LookupError<E: core::fmt::Debug> {
    /// No fix has been recorded yet; the caller should prompt for location
    #[error("no location fix available")]
    NoLocationFix,
    #[error("nearby search failed: {0:?}")]
    Search(E),
}

/// Result of a category selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupOutcome {
    /// A ranked list with this many entries is available
    Results(usize),
    /// The search found nothing; offer this number instead
    Empty { emergency: &'static str },
    /// The category was deselected and results cleared
    Cleared,
}

#[derive(Debug, Clone)]
pub struct NearbyLookup {
    last_fix: Option<Coordinate>,
    active: Option<Category>,
    results: RankedList,
    max_results: usize,
    radius_deg: f64,
}

impl Default for NearbyLookup {
    fn default() -> Self {
        Self::new()
    }
}

impl NearbyLookup {
    pub fn new() -> Self {
        Self {
            last_fix: None,
            active: None,
            results: RankedList::new(),
            max_results: DEFAULT_MAX_RESULTS,
            radius_deg: SEARCH_RADIUS_DEG,
        }
    }

    /// Cap the ranked list below the default of 15.
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results.min(DEFAULT_MAX_RESULTS);
        self
    }

    /// Search viewbox half-width in degrees.
    pub fn with_radius_deg(mut self, radius_deg: f64) -> Self {
        self.radius_deg = radius_deg;
        self
    }

    /// Record a new fix. Later lookups rank from here.
    pub fn update_fix(&mut self, fix: Coordinate) {
        self.last_fix = Some(fix);
    }

    pub fn last_fix(&self) -> Option<&Coordinate> {
        self.last_fix.as_ref()
    }

    pub fn active_category(&self) -> Option<Category> {
        self.active
    }

    pub fn results(&self) -> &[RankedResult] {
        &self.results
    }

    /// Drop the list and the active category.
    pub fn clear(&mut self) {
        self.active = None;
        self.results.clear();
    }

    /// Toggle `category`: deselect it if active, otherwise search around
    /// the last fix and replace the list.
    pub fn select_category<S: NearbySearch>(
        &mut self,
        category: Category,
        search: &mut S,
    ) -> Result<LookupOutcome, LookupError<S::Error>> {
        if self.active == Some(category) {
            log::info!("Deselected {}", category.as_str());
            self.clear();
            return Ok(LookupOutcome::Cleared);
        }
        self.lookup(category, search)
    }

    /// Re-run the active category, e.g. after the fix moved.
    /// Returns `None` when no category is active.
    pub fn refresh<S: NearbySearch>(
        &mut self,
        search: &mut S,
    ) -> Option<Result<LookupOutcome, LookupError<S::Error>>> {
        let category = self.active?;
        Some(self.lookup(category, search))
    }

    fn lookup<S: NearbySearch>(
        &mut self,
        category: Category,
        search: &mut S,
    ) -> Result<LookupOutcome, LookupError<S::Error>> {
        let origin = self.last_fix.ok_or(LookupError::NoLocationFix)?;

        self.active = Some(category);
        self.results.clear();

        let query = SearchQuery::around(&origin, category).with_radius_deg(&origin, self.radius_deg);
        let places = search.search(&query).map_err(LookupError::Search)?;
        let candidates = candidates_from_places(category, &places);
        self.results = rank_nearby(&origin, &candidates, self.max_results);

        log::info!(
            "{} lookup: {} places, {} ranked",
            category.as_str(),
            places.len(),
            self.results.len()
        );

        if self.results.is_empty() {
            Ok(LookupOutcome::Empty {
                emergency: category.emergency_number(),
            })
        } else {
            Ok(LookupOutcome::Results(self.results.len()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{parse_search_response, PlaceList};

    const POLICE: &str = r#"[
        {"lat":"19.0900","lon":"72.8777","name":"Far Station"},
        {"lat":"19.0770","lon":"72.8777","name":"Near Station"},
        {"lat":"19.0800","lon":"72.8777","name":"Mid Station"}
    ]"#;

    struct FakeSearch {
        body: &'static str,
        fail: bool,
        queries: std::vec::Vec<SearchQuery>,
    }

    impl FakeSearch {
        fn new(body: &'static str) -> Self {
            Self {
                body,
                fail: false,
                queries: std::vec::Vec::new(),
            }
        }
    }

    impl NearbySearch for FakeSearch {
        type Error = &'static str;

        fn search(&mut self, query: &SearchQuery) -> Result<PlaceList, Self::Error> {
            self.queries.push(*query);
            if self.fail {
                return Err("connection refused");
            }
            parse_search_response(self.body.as_bytes()).map_err(|_| "bad body")
        }
    }

    fn mumbai() -> Coordinate {
        Coordinate::new(19.0760, 72.8777).unwrap()
    }

    #[test]
    fn no_fix_is_an_error_and_leaves_state() {
        let mut lookup = NearbyLookup::new();
        let mut search = FakeSearch::new(POLICE);
        let err = lookup.select_category(Category::Police, &mut search).unwrap_err();
        assert!(matches!(err, LookupError::NoLocationFix));
        assert_eq!(lookup.active_category(), None);
        assert!(search.queries.is_empty());
    }

    #[test]
    fn ranks_results_from_last_fix() {
        let mut lookup = NearbyLookup::new();
        lookup.update_fix(mumbai());
        let mut search = FakeSearch::new(POLICE);

        let outcome = lookup.select_category(Category::Police, &mut search).unwrap();
        assert_eq!(outcome, LookupOutcome::Results(3));
        let names: std::vec::Vec<&str> =
            lookup.results().iter().map(|r| r.candidate.name.as_str()).collect();
        assert_eq!(names, ["Near Station", "Mid Station", "Far Station"]);
        assert_eq!(lookup.active_category(), Some(Category::Police));

        let q = &search.queries[0];
        assert_eq!(q.term(), "police");
        assert!(q.viewbox.contains(&mumbai()));
    }

    #[test]
    fn selecting_active_category_clears() {
        let mut lookup = NearbyLookup::new();
        lookup.update_fix(mumbai());
        let mut search = FakeSearch::new(POLICE);
        lookup.select_category(Category::Police, &mut search).unwrap();

        let outcome = lookup.select_category(Category::Police, &mut search).unwrap();
        assert_eq!(outcome, LookupOutcome::Cleared);
        assert!(lookup.results().is_empty());
        assert_eq!(lookup.active_category(), None);
        assert_eq!(search.queries.len(), 1);
    }

    #[test]
    fn new_category_replaces_results() {
        let mut lookup = NearbyLookup::new();
        lookup.update_fix(mumbai());
        let mut police = FakeSearch::new(POLICE);
        lookup.select_category(Category::Police, &mut police).unwrap();

        let mut pharmacies = FakeSearch::new(r#"[{"lat":"19.0761","lon":"72.8777","name":"Chemist"}]"#);
        let outcome = lookup.select_category(Category::Medical, &mut pharmacies).unwrap();
        assert_eq!(outcome, LookupOutcome::Results(1));
        assert_eq!(lookup.results()[0].candidate.name.as_str(), "Chemist");
        assert_eq!(lookup.results()[0].candidate.category, Category::Medical);
        assert_eq!(pharmacies.queries[0].term(), "pharmacy");
    }

    #[test]
    fn empty_search_offers_emergency_number() {
        let mut lookup = NearbyLookup::new();
        lookup.update_fix(mumbai());
        let mut search = FakeSearch::new("[]");
        let outcome = lookup.select_category(Category::Hospital, &mut search).unwrap();
        assert_eq!(outcome, LookupOutcome::Empty { emergency: "102" });
        assert_eq!(lookup.active_category(), Some(Category::Hospital));
    }

    #[test]
    fn search_failure_clears_stale_results() {
        let mut lookup = NearbyLookup::new();
        lookup.update_fix(mumbai());
        let mut search = FakeSearch::new(POLICE);
        lookup.select_category(Category::Police, &mut search).unwrap();

        let mut broken = FakeSearch::new(POLICE);
        broken.fail = true;
        let err = lookup.select_category(Category::Hospital, &mut broken).unwrap_err();
        assert!(matches!(err, LookupError::Search("connection refused")));
        assert!(lookup.results().is_empty());
    }

    #[test]
    fn max_results_caps_list() {
        let mut lookup = NearbyLookup::new().with_max_results(2);
        lookup.update_fix(mumbai());
        let mut search = FakeSearch::new(POLICE);
        assert_eq!(
            lookup.select_category(Category::Police, &mut search).unwrap(),
            LookupOutcome::Results(2)
        );
    }

    #[test]
    fn refresh_uses_new_fix() {
        let mut lookup = NearbyLookup::new();
        let mut search = FakeSearch::new(POLICE);
        assert!(lookup.refresh(&mut search).is_none());

        lookup.update_fix(mumbai());
        lookup.select_category(Category::Police, &mut search).unwrap();
        lookup.update_fix(Coordinate::new(19.0900, 72.8777).unwrap());
        lookup.refresh(&mut search).unwrap().unwrap();
        assert_eq!(lookup.results()[0].candidate.name.as_str(), "Far Station");
    }

    #[test]
    fn wider_radius_reaches_query() {
        let mut lookup = NearbyLookup::new().with_radius_deg(0.03);
        lookup.update_fix(mumbai());
        let mut search = FakeSearch::new("[]");
        lookup.select_category(Category::Police, &mut search).unwrap();
        let vb = search.queries[0].viewbox;
        assert!((vb.top - (19.0760 + 0.03)).abs() < 1e-9);
    }
}
