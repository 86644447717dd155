/// Nearby-search queries and conversion of search places into candidates.
///
/// The search itself belongs to a [`NearbySearch`](crate::provider::NearbySearch)
/// collaborator. This module only decides what to ask for (term, bounded
/// viewbox, limit) and how to read the answer.
use core::fmt::Write;

use heapless::{String, Vec};

use crate::defaults::{SEARCH_LIMIT, SEARCH_RADIUS_DEG};
use crate::geo::{BoundingBox, Coordinate};
use crate::nearby::{Candidate, Category, NameString};
use crate::protocol::SearchPlace;

/// Address shown when a place has no display name.
pub const ADDRESS_UNAVAILABLE: &str = "Address not available";

/// Buffer type for a rendered query string.
pub type QueryString = String<256>;

/// Candidates built from one search response.
pub type CandidateList = Vec<Candidate, SEARCH_LIMIT>;

/// A bounded category search around a location fix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchQuery {
    pub category: Category,
    pub viewbox: BoundingBox,
    pub limit: usize,
}

impl SearchQuery {
    /// Query for `category` in the default viewbox around `origin`.
    pub fn around(origin: &Coordinate, category: Category) -> Self {
        Self {
            category,
            viewbox: BoundingBox::around(origin, SEARCH_RADIUS_DEG),
            limit: SEARCH_LIMIT,
        }
    }

    /// Same query with a different viewbox half-width in degrees.
    pub fn with_radius_deg(self, origin: &Coordinate, radius_deg: f64) -> Self {
        Self {
            viewbox: BoundingBox::around(origin, radius_deg),
            ..self
        }
    }

    pub fn term(&self) -> &'static str {
        self.category.search_term()
    }

    /// Render the URL query string (without the leading `?`).
    ///
    /// Terms are fixed ASCII words, so no percent-encoding is needed.
    pub fn write_query_string(&self, buf: &mut QueryString) -> core::fmt::Result {
        let b = &self.viewbox;
        write!(
            buf,
            "format=json&q={}&viewbox={},{},{},{}&bounded=1&limit={}&addressdetails=1",
            self.term(),
            b.left,
            b.top,
            b.right,
            b.bottom,
            self.limit
        )
    }
}

/// Display name for a place: its own name if non-empty, else the first
/// comma-separated segment of its display name, else `"<Category> <n>"`.
pub fn place_name(place: &SearchPlace, category: Category, index: usize) -> NameString {
    if let Some(name) = place.name().filter(|n| !n.trim().is_empty()) {
        return crate::protocol::truncate_into(name.trim());
    }

    if let Some(first) = place
        .display_name()
        .and_then(|d| d.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        return crate::protocol::truncate_into(first);
    }

    let mut s = NameString::new();
    let _ = write!(s, "{} {}", category.label(), index + 1);
    s
}

/// Convert search places into candidates, in response order.
///
/// Places with unparseable or out-of-range coordinates are skipped.
pub fn candidates_from_places(category: Category, places: &[SearchPlace]) -> CandidateList {
    let mut out = CandidateList::new();

    for (index, place) in places.iter().enumerate() {
        let coordinate = match place.coordinate() {
            Ok(c) => c,
            Err(e) => {
                log::warn!("Skipping {} result {}: {}", category.as_str(), index, e);
                continue;
            }
        };

        let name = place_name(place, category, index);
        let address = place
            .display_name()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or(ADDRESS_UNAVAILABLE);

        let candidate = Candidate::new(index as u16, &name, address, coordinate, category);
        if out.push(candidate).is_err() {
            log::warn!(
                "More than {} {} results, dropping the rest",
                SEARCH_LIMIT,
                category.as_str()
            );
            break;
        }
    }

    out
}
