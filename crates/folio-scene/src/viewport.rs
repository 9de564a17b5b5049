//! Interactive pan/zoom state.
//!
//! A [`Viewport`] only decides which part of a fixed viewBox is visible. It
//! never touches element geometry or the viewBox itself, so any number of
//! viewports can share one [`RenderedScene`](crate::RenderedScene).

use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_ZOOM_MAX, DEFAULT_ZOOM_MIN};
use crate::geometry::Bounds;

/// Allowed zoom range.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ZoomLimits {
    pub min: f64,
    pub max: f64,
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self {
            min: DEFAULT_ZOOM_MIN,
            max: DEFAULT_ZOOM_MAX,
        }
    }
}

impl ZoomLimits {
    /// Usable form of these limits: a bound that is not a positive finite
    /// number falls back to its default, and inverted bounds are swapped.
    #[must_use]
    pub fn normalized(self) -> Self {
        let usable = |value: f64, default: f64| {
            if value.is_finite() && value > 0.0 {
                value
            } else {
                default
            }
        };
        let min = usable(self.min, DEFAULT_ZOOM_MIN);
        let max = usable(self.max, DEFAULT_ZOOM_MAX);
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    fn clamp(self, zoom: f64) -> f64 {
        if zoom.is_finite() {
            zoom.clamp(self.min, self.max)
        } else {
            1.0_f64.clamp(self.min, self.max)
        }
    }
}

/// Pan/zoom over a fixed viewBox.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    view_box: Bounds,
    limits: ZoomLimits,
    zoom: f64,
    pan_x: f64,
    pan_y: f64,
}

impl Viewport {
    /// Viewport showing all of `view_box` at zoom 1.
    #[must_use]
    pub fn new(view_box: Bounds, limits: ZoomLimits) -> Self {
        let limits = limits.normalized();
        Self {
            view_box,
            limits,
            zoom: limits.clamp(1.0),
            pan_x: 0.0,
            pan_y: 0.0,
        }
    }

    #[must_use]
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Current pan offset of the visible center, in scene units.
    #[must_use]
    pub fn pan(&self) -> (f64, f64) {
        (self.pan_x, self.pan_y)
    }

    /// The viewBox this viewport looks at.
    #[must_use]
    pub fn view_box(&self) -> Bounds {
        self.view_box
    }

    /// Multiply the zoom by `factor`, clamped to the limits.
    pub fn zoom_by(&mut self, factor: f64) {
        self.set_zoom(self.zoom * factor);
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = self.limits.clamp(zoom);
        self.clamp_pan();
    }

    /// Move the visible center by (`dx`, `dy`) scene units. The center never
    /// leaves the viewBox.
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        if dx.is_finite() {
            self.pan_x += dx;
        }
        if dy.is_finite() {
            self.pan_y += dy;
        }
        self.clamp_pan();
    }

    /// Back to zoom 1, centered.
    pub fn reset(&mut self) {
        *self = Self::new(self.view_box, self.limits);
    }

    /// Part of the viewBox currently visible.
    #[must_use]
    pub fn visible_box(&self) -> Bounds {
        let (cx, cy) = self.view_box.center();
        let half_w = self.view_box.width() / self.zoom / 2.0;
        let half_h = self.view_box.height() / self.zoom / 2.0;
        let (cx, cy) = (cx + self.pan_x, cy + self.pan_y);
        Bounds {
            min_x: cx - half_w,
            min_y: cy - half_h,
            max_x: cx + half_w,
            max_y: cy + half_h,
        }
    }

    fn clamp_pan(&mut self) {
        let max_x = (self.view_box.width() / 2.0).max(0.0);
        let max_y = (self.view_box.height() / 2.0).max(0.0);
        self.pan_x = self.pan_x.clamp(-max_x, max_x);
        self.pan_y = self.pan_y.clamp(-max_y, max_y);
    }
}

/// Per-instance view state of one displayed diagram: the inline viewport and
/// a separate fullscreen one, clamped independently.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneView {
    pub inline: Viewport,
    pub fullscreen: Viewport,
}

impl SceneView {
    #[must_use]
    pub fn new(view_box: Bounds, limits: ZoomLimits) -> Self {
        Self {
            inline: Viewport::new(view_box, limits),
            fullscreen: Viewport::new(view_box, limits),
        }
    }

    /// Fullscreen always opens unzoomed, whatever the inline state is.
    pub fn open_fullscreen(&mut self) {
        self.fullscreen.reset();
    }
}
