/// Nearby-place ranking.
///
/// Candidates come from a category search around the user's last fix.
/// Ranking computes each candidate's distance from the fix, orders the
/// list nearest-first and keeps the closest few. The sort is stable: the
/// upstream response is already ordered by search relevance, so ties keep
/// that order.
use heapless::{String, Vec};
use serde::{Deserialize, Serialize};

use crate::defaults::{self, EmergencyService};
use crate::format::{format_distance, DistanceLabel};
use crate::geo::{distance_m, Coordinate};
use crate::protocol::truncate_into;

/// Default cap on ranked results.
pub const DEFAULT_MAX_RESULTS: usize = 15;

/// Maximum length for place names
pub type NameString = String<64>;

/// Maximum length for place addresses
pub type AddressString = String<160>;

/// Maximum length for candidate ids ("hospital-19")
pub type CandidateIdString = String<16>;

/// Emergency service category the user can search for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Police,
    Hospital,
    /// Pharmacies and chemists
    Medical,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Police, Category::Hospital, Category::Medical];

    /// Wire name, also the prefix of candidate ids.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Police => "police",
            Category::Hospital => "hospital",
            Category::Medical => "medical",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }

    /// Human-readable name used when a search result carries no name.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Police => "Police",
            Category::Hospital => "Hospital",
            Category::Medical => "Medical",
        }
    }

    /// Free-text term sent to the place search.
    pub fn search_term(&self) -> &'static str {
        match self {
            Category::Medical => "pharmacy",
            other => other.as_str(),
        }
    }

    pub fn emergency_service(&self) -> EmergencyService {
        match self {
            Category::Police => EmergencyService::Police,
            Category::Hospital => EmergencyService::Hospital,
            Category::Medical => EmergencyService::Medical,
        }
    }

    /// Number to offer when this category has no results or the search fails.
    pub fn emergency_number(&self) -> &'static str {
        defaults::emergency_number(self.emergency_service())
    }
}

/// A point of interest returned by a nearby search, before ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Position in the upstream search response
    pub id: u16,
    pub name: NameString,
    pub address: AddressString,
    pub coordinate: Coordinate,
    pub category: Category,
}

impl Candidate {
    /// Build a candidate, truncating `name` and `address` on a char
    /// boundary if they exceed the fixed capacities.
    pub fn new(id: u16, name: &str, address: &str, coordinate: Coordinate, category: Category) -> Self {
        Self {
            id,
            name: truncate_into(name),
            address: truncate_into(address),
            coordinate,
            category,
        }
    }

    /// Stable display id, e.g. `police-3`.
    pub fn display_id(&self) -> CandidateIdString {
        use core::fmt::Write;
        let mut s = CandidateIdString::new();
        let _ = write!(s, "{}-{}", self.category.as_str(), self.id);
        s
    }
}

/// A candidate with its distance from the ranking origin.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedResult {
    pub candidate: Candidate,
    pub distance_m: f64,
}

impl RankedResult {
    pub fn distance_label(&self) -> DistanceLabel {
        format_distance(self.distance_m)
    }
}

/// Ranked list with the default capacity.
pub type RankedList = Vec<RankedResult, DEFAULT_MAX_RESULTS>;

/// Rank `candidates` by distance from `origin`, nearest first, keeping at
/// most `max_results` (and at most `N`) entries.
///
/// Equal distances keep their input order. Empty input yields an empty
/// list.
pub fn rank_nearby<const N: usize>(
    origin: &Coordinate,
    candidates: &[Candidate],
    max_results: usize,
) -> Vec<RankedResult, N> {
    let mut ranked: Vec<RankedResult, N> = Vec::new();
    let limit = max_results.min(N);
    if limit == 0 {
        return ranked;
    }

    for candidate in candidates {
        let d = distance_m(origin, &candidate.coordinate);

        // Upper bound: after every entry at the same distance
        let pos = ranked.partition_point(|r| r.distance_m <= d);
        if pos >= limit {
            continue;
        }
        if ranked.len() == limit {
            ranked.pop();
        }
        let _ = ranked.insert(
            pos,
            RankedResult {
                candidate: candidate.clone(),
                distance_m: d,
            },
        );
    }

    log::debug!(
        "ranked {} of {} candidates (limit {})",
        ranked.len(),
        candidates.len(),
        limit
    );

    ranked
}
