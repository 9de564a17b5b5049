//! Rendering constants.

use crate::geometry::Bounds;

/// Margin added on every side of the scene bounds to form the viewBox.
pub const DEFAULT_PADDING: f64 = 16.0;

/// Bounds used when a scene has nothing measurable.
pub const FALLBACK_BOUNDS: Bounds = Bounds {
    min_x: 0.0,
    min_y: 0.0,
    max_x: 100.0,
    max_y: 100.0,
};

/// Text line height as a multiple of the font size.
pub const LINE_HEIGHT_RATIO: f64 = 1.35;

/// Opacity range (percent) applied to colors.
pub const MIN_OPACITY: f64 = 5.0;
pub const MAX_OPACITY: f64 = 100.0;

/// Default interactive zoom range.
pub const DEFAULT_ZOOM_MIN: f64 = 0.25;
pub const DEFAULT_ZOOM_MAX: f64 = 8.0;

/// Version tag for persisted decoded scenes; bump when [`Scene`](crate::Scene)
/// changes shape.
pub const SCENE_CACHE_VERSION: &str = "scene-v1";
