//! Bounding boxes and the viewBox.

use serde::{Deserialize, Serialize};

use crate::consts::FALLBACK_BOUNDS;
use crate::model::Element;

/// Axis-aligned box in scene coordinates (`min` inclusive, `max` inclusive).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    /// Box spanning two corners in any order.
    #[must_use]
    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            min_x: x1.min(x2),
            min_y: y1.min(y2),
            max_x: x1.max(x2),
            max_y: y1.max(y2),
        }
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    /// Smallest box containing both.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Grow by `margin` on all four sides.
    #[must_use]
    pub fn expand(&self, margin: f64) -> Self {
        Self {
            min_x: self.min_x - margin,
            min_y: self.min_y - margin,
            max_x: self.max_x + margin,
            max_y: self.max_y + margin,
        }
    }

    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.min_x.is_finite()
            && self.min_y.is_finite()
            && self.max_x.is_finite()
            && self.max_y.is_finite()
    }

    /// `min-x min-y width height`, as used by the SVG `viewBox` attribute.
    #[must_use]
    pub fn to_view_box_attr(&self) -> String {
        format!(
            "{} {} {} {}",
            fmt_num(self.min_x),
            fmt_num(self.min_y),
            fmt_num(self.width()),
            fmt_num(self.height())
        )
    }
}

/// Bounds of a single element.
///
/// Linear elements (line, arrow, freedraw) are measured over their absolute
/// points; everything else over its box, normalized for negative sizes.
#[must_use]
pub fn element_bounds(element: &Element) -> Bounds {
    let points = element.absolute_points();
    if element.element_type().is_linear() && !points.is_empty() {
        return points.iter().fold(
            Bounds::from_corners(points[0].0, points[0].1, points[0].0, points[0].1),
            |acc, &(x, y)| acc.union(&Bounds::from_corners(x, y, x, y)),
        );
    }
    Bounds::from_corners(
        element.x,
        element.y,
        element.x + element.width,
        element.y + element.height,
    )
}

/// Union of all element bounds, or [`FALLBACK_BOUNDS`] when there are no
/// elements or the result is not finite.
#[must_use]
pub fn scene_bounds(elements: &[Element]) -> Bounds {
    elements
        .iter()
        .map(element_bounds)
        .reduce(|acc, b| acc.union(&b))
        .filter(Bounds::is_finite)
        .unwrap_or(FALLBACK_BOUNDS)
}

/// Scene bounds expanded by `padding` on every side.
#[must_use]
pub fn view_box(elements: &[Element], padding: f64) -> Bounds {
    scene_bounds(elements).expand(padding)
}

/// Format a coordinate compactly: integers without a fraction, others with
/// at most two decimals.
pub(crate) fn fmt_num(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded == rounded.trunc() {
        format!("{rounded:.0}")
    } else {
        let s = format!("{rounded:.2}");
        s.trim_end_matches('0').to_owned()
    }
}
