//! Canonical scene model.
//!
//! Field names follow the interchange JSON (`camelCase`). Deserialization is
//! lenient: unknown fields are ignored and missing or `null` values fall back
//! to defaults, so a sloppy element still renders instead of failing the
//! whole scene.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A decoded vector diagram.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    /// Drawable elements in paint order. Never contains deleted elements.
    pub elements: Vec<Element>,
    /// Editor UI state, carried through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_state: Option<Map<String, Value>>,
    /// Embedded binaries keyed by file id.
    #[serde(default)]
    pub files: BTreeMap<String, BinaryFile>,
}

/// An embedded binary referenced by image elements.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinaryFile {
    /// `data:` URL holding the file contents.
    #[serde(rename = "dataURL")]
    pub data_url: String,
    #[serde(default, deserialize_with = "nullable")]
    pub mime_type: String,
}

/// Stroke dash style.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrokeStyle {
    Dashed,
    Dotted,
    #[default]
    #[serde(other)]
    Solid,
}

/// Corner rounding of rectangles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Roundness {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

/// Font reference: numeric id from the fixed font table, or a family name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FontFamily {
    Id(u32),
    Name(String),
}

/// One drawable primitive of a [`Scene`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    #[serde(default, deserialize_with = "nullable")]
    pub id: String,
    /// Raw element type (`rectangle`, `arrow`, ...). See [`Element::element_type`].
    #[serde(rename = "type", default, deserialize_with = "nullable")]
    pub kind: String,
    #[serde(default, deserialize_with = "nullable")]
    pub x: f64,
    #[serde(default, deserialize_with = "nullable")]
    pub y: f64,
    #[serde(default, deserialize_with = "nullable")]
    pub width: f64,
    #[serde(default, deserialize_with = "nullable")]
    pub height: f64,
    /// Rotation in radians around the element center.
    #[serde(default, deserialize_with = "nullable")]
    pub angle: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f64>,
    #[serde(default, deserialize_with = "nullable")]
    pub stroke_style: StrokeStyle,
    /// Opacity in percent (0-100).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(default, deserialize_with = "nullable")]
    pub is_deleted: bool,
    /// Offsets relative to (`x`, `y`) for line, arrow and freedraw.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<Vec<[f64; 2]>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<FontFamily>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roundness: Option<Roundness>,
}

/// Element types the renderer distinguishes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementType {
    Rectangle,
    Frame,
    Ellipse,
    Diamond,
    Text,
    Image,
    Line,
    Arrow,
    Freedraw,
    Other,
}

impl ElementType {
    /// Parse the interchange `type` string. Unknown types map to
    /// [`ElementType::Other`].
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "rectangle" => Self::Rectangle,
            "frame" | "magicframe" => Self::Frame,
            "ellipse" => Self::Ellipse,
            "diamond" => Self::Diamond,
            "text" => Self::Text,
            "image" => Self::Image,
            "line" => Self::Line,
            "arrow" => Self::Arrow,
            "freedraw" => Self::Freedraw,
            _ => Self::Other,
        }
    }

    /// Whether geometry comes from the `points` list.
    #[must_use]
    pub fn is_linear(self) -> bool {
        matches!(self, Self::Line | Self::Arrow | Self::Freedraw)
    }
}

/// Stroke color used when an element does not set one.
pub const DEFAULT_STROKE_COLOR: &str = "#1e1e1e";
/// Background used when an element does not set one.
pub const DEFAULT_BACKGROUND: &str = "transparent";
/// Font size used when a text element does not set one.
pub const DEFAULT_FONT_SIZE: f64 = 20.0;

impl Element {
    #[must_use]
    pub fn element_type(&self) -> ElementType {
        ElementType::parse(&self.kind)
    }

    #[must_use]
    pub fn stroke_color(&self) -> &str {
        self.stroke_color.as_deref().unwrap_or(DEFAULT_STROKE_COLOR)
    }

    #[must_use]
    pub fn background_color(&self) -> &str {
        self.background_color.as_deref().unwrap_or(DEFAULT_BACKGROUND)
    }

    #[must_use]
    pub fn stroke_width(&self) -> f64 {
        self.stroke_width.unwrap_or(1.0)
    }

    #[must_use]
    pub fn opacity(&self) -> f64 {
        self.opacity.unwrap_or(100.0)
    }

    #[must_use]
    pub fn font_size(&self) -> f64 {
        self.font_size.filter(|s| *s > 0.0).unwrap_or(DEFAULT_FONT_SIZE)
    }

    /// Absolute positions of the `points` offsets, if any.
    #[must_use]
    pub fn absolute_points(&self) -> Vec<(f64, f64)> {
        self.points
            .iter()
            .flatten()
            .map(|[dx, dy]| (self.x + dx, self.y + dy))
            .collect()
    }
}

/// Deserialize `null` as the type's default.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_element_defaults_for_missing_and_null_fields() {
        let el: Element = serde_json::from_value(json!({
            "type": "rectangle",
            "x": 5,
            "width": null,
            "strokeStyle": "wavy",
            "customField": [1, 2, 3]
        }))
        .unwrap();

        assert_eq!(el.element_type(), ElementType::Rectangle);
        assert_eq!(el.x, 5.0);
        assert_eq!(el.width, 0.0);
        assert_eq!(el.stroke_style, StrokeStyle::Solid);
        assert_eq!(el.stroke_color(), DEFAULT_STROKE_COLOR);
        assert_eq!(el.opacity(), 100.0);
        assert!(!el.is_deleted);
    }

    #[test]
    fn test_font_family_accepts_id_or_name() {
        let by_id: Element = serde_json::from_value(json!({"type": "text", "fontFamily": 3})).unwrap();
        let by_name: Element =
            serde_json::from_value(json!({"type": "text", "fontFamily": "Serif"})).unwrap();

        assert_eq!(by_id.font_family, Some(FontFamily::Id(3)));
        assert_eq!(by_name.font_family, Some(FontFamily::Name("Serif".to_owned())));
    }

    #[test]
    fn test_absolute_points_offsets_origin() {
        let el = Element {
            kind: "line".to_owned(),
            x: 10.0,
            y: 20.0,
            points: Some(vec![[0.0, 0.0], [5.0, -5.0]]),
            ..Element::default()
        };
        assert_eq!(el.absolute_points(), vec![(10.0, 20.0), (15.0, 15.0)]);
    }

    #[test]
    fn test_scene_serde_roundtrip_keeps_files() {
        let raw = json!({
            "elements": [{"id": "a", "type": "image", "fileId": "f1"}],
            "files": {"f1": {"dataURL": "data:image/png;base64,AAAA", "mimeType": "image/png"}}
        });
        let scene: Scene = serde_json::from_value(raw).unwrap();
        let back: Scene = serde_json::from_str(&serde_json::to_string(&scene).unwrap()).unwrap();

        assert_eq!(back, scene);
        assert_eq!(back.files["f1"].mime_type, "image/png");
    }
}
