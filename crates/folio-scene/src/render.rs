//! Scene to drawable primitives.
//!
//! [`render_scene`] maps every live element to a [`Primitive`] in paint order
//! and computes the padded viewBox. The result is plain data; [`crate::svg`]
//! turns it into markup.

use serde::Serialize;

use crate::consts::{DEFAULT_PADDING, LINE_HEIGHT_RATIO};
use crate::geometry::{Bounds, element_bounds, view_box};
use crate::model::{Element, ElementType, Scene};
use crate::style::{Style, font_family};

/// Renderer settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderOptions {
    /// Margin around the scene bounds.
    pub padding: f64,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            padding: DEFAULT_PADDING,
        }
    }
}

/// Geometry of one primitive, in scene coordinates.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "shape", rename_all = "camelCase")]
pub enum Shape {
    #[serde(rename_all = "camelCase")]
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        radius: f64,
    },
    Ellipse { cx: f64, cy: f64, rx: f64, ry: f64 },
    /// Closed polygon (diamonds).
    Polygon { points: Vec<(f64, f64)> },
    /// Open path through absolute points; arrows carry an end marker.
    Polyline { points: Vec<(f64, f64)>, arrow: bool },
    /// Multi-line text. Line `i` sits on baseline `y + font_size + i * line_height`.
    #[serde(rename_all = "camelCase")]
    Text {
        x: f64,
        y: f64,
        font_size: f64,
        line_height: f64,
        font_family: String,
        lines: Vec<String>,
    },
    /// Embedded raster drawn from the scene's files.
    Image {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        href: String,
    },
    /// Dashed outline for an image whose file is missing.
    Placeholder {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
}

/// A drawable primitive derived from one element.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Primitive {
    /// Source element id.
    pub id: String,
    #[serde(flatten)]
    pub shape: Shape,
    pub style: Style,
}

/// Output of [`render_scene`].
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedScene {
    pub view_box: Bounds,
    pub primitives: Vec<Primitive>,
}

/// Render `scene` into primitives and a viewBox.
///
/// Deleted elements are skipped even if the scene was built by hand.
///
/// # Example
///
/// ```
/// use folio_scene::{RenderOptions, decode, render_scene};
///
/// let scene = decode(r#"{"elements":[{"type":"rectangle","x":10,"y":10,"width":20,"height":30}]}"#).unwrap();
/// let rendered = render_scene(&scene, &RenderOptions::default());
/// assert_eq!(rendered.primitives.len(), 1);
/// assert_eq!(rendered.view_box.min_x, -6.0);
/// ```
#[must_use]
pub fn render_scene(scene: &Scene, options: &RenderOptions) -> RenderedScene {
    let live: Vec<Element> = scene
        .elements
        .iter()
        .filter(|e| !e.is_deleted)
        .cloned()
        .collect();
    let primitives = live.iter().map(|e| render_element(e, scene)).collect();
    RenderedScene {
        view_box: view_box(&live, options.padding),
        primitives,
    }
}

fn render_element(element: &Element, scene: &Scene) -> Primitive {
    let bounds = element_bounds(element);
    let mut style = Style::resolve(element, &bounds);
    let (x, y, width, height) = (bounds.min_x, bounds.min_y, bounds.width(), bounds.height());

    let shape = match element.element_type() {
        ElementType::Rectangle | ElementType::Frame => Shape::Rect {
            x,
            y,
            width,
            height,
            radius: element
                .roundness
                .and_then(|r| r.value)
                .filter(|v| v.is_finite())
                .unwrap_or(0.0)
                .max(0.0),
        },
        ElementType::Ellipse => Shape::Ellipse {
            cx: x + width / 2.0,
            cy: y + height / 2.0,
            rx: width / 2.0,
            ry: height / 2.0,
        },
        ElementType::Diamond => Shape::Polygon {
            points: vec![
                (x + width / 2.0, y),
                (x + width, y + height / 2.0),
                (x + width / 2.0, y + height),
                (x, y + height / 2.0),
            ],
        },
        ElementType::Text => {
            let font_size = element.font_size();
            // text is painted with its stroke color
            style.fill.clone_from(&style.stroke);
            Shape::Text {
                x,
                y,
                font_size,
                line_height: font_size * LINE_HEIGHT_RATIO,
                font_family: font_family(element.font_family.as_ref()).to_owned(),
                lines: element
                    .text
                    .as_deref()
                    .unwrap_or_default()
                    .split('\n')
                    .map(str::to_owned)
                    .collect(),
            }
        }
        ElementType::Image => {
            let file = element.file_id.as_ref().and_then(|id| scene.files.get(id));
            match file {
                Some(file) => Shape::Image {
                    x,
                    y,
                    width,
                    height,
                    href: file.data_url.clone(),
                },
                None => {
                    tracing::debug!(id = %element.id, "image file missing, drawing placeholder");
                    style.fill = "none".to_owned();
                    style.dash_array = Some("6,4".to_owned());
                    Shape::Placeholder {
                        x,
                        y,
                        width,
                        height,
                    }
                }
            }
        }
        ElementType::Line | ElementType::Arrow | ElementType::Freedraw => {
            let mut points = element.absolute_points();
            if points.is_empty() {
                points = vec![(element.x, element.y)];
            }
            if element.element_type() == ElementType::Freedraw {
                style.fill = "none".to_owned();
            }
            Shape::Polyline {
                points,
                arrow: element.element_type() == ElementType::Arrow,
            }
        }
        ElementType::Other => Shape::Rect {
            x,
            y,
            width,
            height,
            radius: 0.0,
        },
    };

    Primitive {
        id: element.id.clone(),
        shape,
        style,
    }
}
