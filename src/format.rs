/// Distance labels for list rows and detail views.
use core::fmt;

use heapless::String;

/// Buffer type for a formatted distance ("20015.1 km" fits comfortably).
pub type DistanceLabel = String<16>;

/// Distance in meters, displayed as `450 m` below one kilometer and
/// `2.3 km` (one decimal) from one kilometer up. Both round half away
/// from zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Distance(pub f64);

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let meters = self.0;
        if meters < 1000.0 {
            write!(f, "{} m", libm::round(meters) as u64)
        } else {
            write!(f, "{:.1} km", libm::round(meters / 100.0) / 10.0)
        }
    }
}

/// Format `meters` into a fixed-size label.
///
/// Labels that would not fit (distances far beyond any great-circle length) come back truncated.
pub fn format_distance(meters: f64) -> DistanceLabel {
    use core::fmt::Write;
    let mut label = DistanceLabel::new();
    let _ = write!(label, "{}", Distance(meters));
    label
}
