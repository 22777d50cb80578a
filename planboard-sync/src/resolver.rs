//! Position resolution: which insertion index does the pointer point at?
//!
//! The presentation layer reports the pointer position along the container's
//! layout axis and the rendered extent of each sibling, in display order.
//! The candidate index is derived from the sibling whose midpoint is closest
//! to the pointer: past that midpoint inserts after it, otherwise before it.

use serde::{Deserialize, Serialize};

/// Layout direction of a container's children
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    /// Lists laid out left to right across a board
    Horizontal,
    /// Cards laid out top to bottom in a list
    Vertical,
}

impl Axis {
    /// Project a 2D pointer position onto this axis
    pub fn project(self, x: f64, y: f64) -> f64 {
        match self {
            Self::Horizontal => x,
            Self::Vertical => y,
        }
    }
}

/// The span a rendered sibling occupies along the layout axis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub start: f64,
    pub length: f64,
}

impl Extent {
    /// Create an extent
    pub fn new(start: f64, length: f64) -> Self {
        Self { start, length }
    }

    /// Center of the extent
    pub fn midpoint(&self) -> f64 {
        self.start + self.length / 2.0
    }

    /// Check that both start and length are finite
    pub fn is_finite(&self) -> bool {
        self.start.is_finite() && self.length.is_finite()
    }
}

/// Compute the insertion index for `pointer` among `siblings`.
///
/// Returns a value in `[0, siblings.len()]`. Ties between equally close
/// midpoints go to the first sibling. A NaN pointer resolves to 0, infinite
/// pointers to the nearest end, and non-finite extents are ignored.
pub fn resolve_index(pointer: f64, siblings: &[Extent]) -> usize {
    if siblings.is_empty() || pointer.is_nan() {
        return 0;
    }
    if pointer == f64::INFINITY {
        return siblings.len();
    }
    if pointer == f64::NEG_INFINITY {
        return 0;
    }

    let mut closest: Option<(usize, f64, f64)> = None;
    for (position, sibling) in siblings.iter().enumerate() {
        if !sibling.is_finite() {
            continue;
        }
        let midpoint = sibling.midpoint();
        let distance = (pointer - midpoint).abs();
        match closest {
            Some((_, best, _)) if distance >= best => {}
            _ => closest = Some((position, distance, midpoint)),
        }
    }

    let Some((position, _, midpoint)) = closest else {
        return 0;
    };
    let index = if pointer > midpoint {
        position + 1
    } else {
        position
    };
    index.min(siblings.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(heights: &[f64]) -> Vec<Extent> {
        let mut start = 0.0;
        heights
            .iter()
            .map(|h| {
                let extent = Extent::new(start, *h);
                start += h;
                extent
            })
            .collect()
    }

    #[test]
    fn test_empty_container_resolves_to_zero() {
        assert_eq!(resolve_index(120.0, &[]), 0);
    }

    #[test]
    fn test_before_and_after_midpoint() {
        let siblings = column(&[100.0, 100.0, 100.0]);
        assert_eq!(resolve_index(10.0, &siblings), 0);
        assert_eq!(resolve_index(60.0, &siblings), 1);
        assert_eq!(resolve_index(140.0, &siblings), 1);
        assert_eq!(resolve_index(160.0, &siblings), 2);
        assert_eq!(resolve_index(299.0, &siblings), 3);
    }

    #[test]
    fn test_pointer_beyond_ends_is_clamped() {
        let siblings = column(&[40.0, 40.0]);
        assert_eq!(resolve_index(-500.0, &siblings), 0);
        assert_eq!(resolve_index(5000.0, &siblings), 2);
    }

    #[test]
    fn test_exactly_on_midpoint_inserts_before() {
        let siblings = column(&[100.0]);
        assert_eq!(resolve_index(50.0, &siblings), 0);
    }

    #[test]
    fn test_tie_goes_to_first_sibling() {
        // Two siblings with the same midpoint (overlapping render)
        let siblings = vec![Extent::new(0.0, 100.0), Extent::new(25.0, 50.0)];
        assert_eq!(resolve_index(70.0, &siblings), 1);
    }

    #[test]
    fn test_non_finite_inputs() {
        let mut siblings = column(&[100.0, 100.0]);
        assert_eq!(resolve_index(f64::NAN, &siblings), 0);
        assert_eq!(resolve_index(f64::INFINITY, &siblings), 2);
        assert_eq!(resolve_index(f64::NEG_INFINITY, &siblings), 0);

        siblings[0] = Extent::new(f64::NAN, 100.0);
        assert_eq!(resolve_index(10.0, &siblings), 1);
    }

    #[test]
    fn test_axis_projection() {
        assert_eq!(Axis::Horizontal.project(3.0, 7.0), 3.0);
        assert_eq!(Axis::Vertical.project(3.0, 7.0), 7.0);
    }
}
