//! Embedded vector-diagram scenes for Folio.
//!
//! This crate turns a scene blob into something drawable:
//! - [`decode`] runs the fault-tolerant decode ladder (plain JSON, fenced
//!   sub-blocks, compressed payloads) and yields a canonical [`Scene`]
//! - [`render_scene`] maps elements to styled [`Primitive`]s and computes the
//!   padded viewBox
//! - [`to_svg`] serializes the rendered scene
//! - [`Viewport`] / [`SceneView`] hold per-instance pan/zoom state
//! - [`SceneCache`] memoizes decodes by source hash, coalescing concurrent
//!   requests
//!
//! # Example
//!
//! ```
//! use folio_scene::{RenderOptions, SceneCache, render_scene, to_svg};
//!
//! let cache = SceneCache::new();
//! let scene = cache
//!     .get_or_decode("```json\n{\"elements\":[{\"type\":\"diamond\",\"width\":10,\"height\":10}]}\n```")
//!     .unwrap();
//! let svg = to_svg(&render_scene(&scene, &RenderOptions::default()));
//! assert!(svg.contains("<polygon"));
//! ```

mod cache;
mod consts;
mod decode;
mod error;
mod geometry;
mod model;
mod render;
mod style;
mod svg;
mod viewport;

pub use cache::{SceneCache, SceneKey, SceneResult};
pub use consts::{DEFAULT_PADDING, DEFAULT_ZOOM_MAX, DEFAULT_ZOOM_MIN, FALLBACK_BOUNDS};
pub use decode::{Codec, decode};
pub use error::DecodeError;
pub use geometry::{Bounds, element_bounds, scene_bounds, view_box};
pub use model::{
    BinaryFile, Element, ElementType, FontFamily, Roundness, Scene, StrokeStyle,
};
pub use render::{Primitive, RenderOptions, RenderedScene, Shape, render_scene};
pub use style::{Style, blend_opacity, dash_array, fill_color, font_family, rotation};
pub use svg::{escape_xml, to_svg};
pub use viewport::{SceneView, Viewport, ZoomLimits};
