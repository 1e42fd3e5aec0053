//! Scale ranges.
//!
//! A scale is the number of map meters per screen pixel; larger means more
//! zoomed out. Every selector is valid over a half-open scale interval, and
//! the cascade tracks the interval over which the style it currently holds
//! stays valid, so a renderer can skip re-styling while zoom stays inside it.

use std::fmt;

/// Equatorial radius used for zoom to scale conversion.
const EARTH_RADIUS: f64 = 6_378_135.0;

/// Half-open interval `[lower, upper)` of render scales.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range {
    lower: f64,
    upper: f64,
}

impl Range {
    pub const ZERO_TO_INFINITY: Range = Range { lower: 0.0, upper: f64::INFINITY };

    /// Build a range. Returns `None` when the bounds are not ordered or negative.
    pub fn new(lower: f64, upper: f64) -> Option<Self> {
        if lower < 0.0 || lower.is_nan() || upper.is_nan() || lower > upper {
            return None;
        }
        Some(Range { lower, upper })
    }

    pub fn lower(&self) -> f64 {
        self.lower
    }

    pub fn upper(&self) -> f64 {
        self.upper
    }

    pub fn contains(&self, scale: f64) -> bool {
        self.lower <= scale && scale < self.upper
    }

    /// Intersection of two ranges. Disjoint inputs yield an empty range
    /// anchored at the larger lower bound.
    pub fn cut(a: Range, b: Range) -> Range {
        let lower = a.lower.max(b.lower);
        let upper = a.upper.min(b.upper).max(lower);
        Range { lower, upper }
    }

    /// Shrink `self` to the part around `scale` that does not overlap `other`.
    ///
    /// `scale` must lie inside `self` and outside `other`; otherwise `self`
    /// is returned unchanged.
    pub fn reduce_around(self, scale: f64, other: Range) -> Range {
        if !self.contains(scale) || other.contains(scale) {
            return self;
        }
        if scale < other.lower && other.lower < self.upper {
            return Range { lower: self.lower, upper: other.lower };
        }
        if self.lower < other.upper && other.upper <= scale {
            return Range { lower: other.upper, upper: self.upper };
        }
        self
    }

    /// Scale covering zoom levels `min..=max` (slippy-map numbering).
    ///
    /// Bounds sit half a level outside the named levels, so the exact scale
    /// of every level in `min..=max` is inside and its neighbours are not.
    /// `None` on either side leaves that side unbounded.
    pub fn from_zoom(min: Option<u32>, max: Option<u32>) -> Option<Range> {
        if let (Some(a), Some(b)) = (min, max) {
            if a > b {
                return None;
            }
        }
        let lower = max.map_or(0.0, |z| level_scale(z as f64 + 0.5));
        let upper = match min {
            Some(z) if z > 0 => level_scale(z as f64 - 0.5),
            _ => f64::INFINITY,
        };
        Range::new(lower, upper)
    }
}

impl Default for Range {
    fn default() -> Self {
        Range::ZERO_TO_INFINITY
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.lower, self.upper)
    }
}

/// Meters per pixel at the equator for a 256px tile at zoom `level`.
pub fn zoom_to_scale(level: u32) -> f64 {
    level_scale(level as f64)
}

fn level_scale(level: f64) -> f64 {
    2.0 * std::f64::consts::PI * EARTH_RADIUS / (256.0 * level.exp2())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(lower: f64, upper: f64) -> Range {
        Range::new(lower, upper).unwrap()
    }

    #[test]
    fn contains_is_half_open() {
        let range = r(10.0, 20.0);
        assert!(range.contains(10.0));
        assert!(range.contains(15.0));
        assert!(!range.contains(20.0));
        assert!(!range.contains(9.99));
    }

    #[test]
    fn cut_intersects() {
        assert_eq!(Range::cut(Range::ZERO_TO_INFINITY, r(10.0, 20.0)), r(10.0, 20.0));
        assert_eq!(Range::cut(r(5.0, 15.0), r(10.0, 20.0)), r(10.0, 15.0));
    }

    #[test]
    fn reduce_around_above_other() {
        // scale 25 sits above [10, 20): valid window starts where the selector stops
        let reduced = Range::ZERO_TO_INFINITY.reduce_around(25.0, r(10.0, 20.0));
        assert_eq!(reduced, r(20.0, f64::INFINITY));
        assert!(reduced.contains(25.0));
    }

    #[test]
    fn reduce_around_below_other() {
        let reduced = Range::ZERO_TO_INFINITY.reduce_around(5.0, r(10.0, 20.0));
        assert_eq!(reduced, r(0.0, 10.0));
    }

    #[test]
    fn reduce_around_ignores_contradicting_input() {
        let range = r(0.0, 30.0);
        assert_eq!(range.reduce_around(15.0, r(10.0, 20.0)), range);
        assert_eq!(range.reduce_around(40.0, r(10.0, 20.0)), range);
    }

    #[test]
    fn zoom_levels_map_to_decreasing_scales() {
        let z12 = Range::from_zoom(Some(12), None).unwrap();
        assert_eq!(z12.lower(), 0.0);
        assert!(z12.contains(zoom_to_scale(12)));
        assert!(z12.contains(zoom_to_scale(18)));
        assert!(!z12.contains(zoom_to_scale(11)));

        let z12_15 = Range::from_zoom(Some(12), Some(15)).unwrap();
        assert!(z12_15.upper() > zoom_to_scale(12) && z12_15.upper() < zoom_to_scale(11));
        for z in 12..=15 {
            assert!(z12_15.contains(zoom_to_scale(z)), "z{z}");
        }
        assert!(!z12_15.contains(zoom_to_scale(11)));
        assert!(!z12_15.contains(zoom_to_scale(16)));

        assert!(Range::from_zoom(Some(15), Some(12)).is_none());
        assert_eq!(Range::from_zoom(None, None), Some(Range::ZERO_TO_INFINITY));
    }
}
