//! Per-element paint resolution: colors, dash patterns, fonts, rotation.

use serde::Serialize;

use crate::consts::{MAX_OPACITY, MIN_OPACITY};
use crate::geometry::{Bounds, fmt_num};
use crate::model::{Element, FontFamily, StrokeStyle};

/// Resolved paint attributes for one primitive.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Style {
    pub stroke: String,
    pub fill: String,
    pub stroke_width: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dash_array: Option<String>,
    /// SVG `transform` value, present for rotated elements.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transform: Option<String>,
}

impl Style {
    /// Resolve the style of `element` drawn within `bounds`.
    #[must_use]
    pub fn resolve(element: &Element, bounds: &Bounds) -> Self {
        let opacity = element.opacity();
        Self {
            stroke: blend_opacity(element.stroke_color(), opacity),
            fill: fill_color(element.background_color(), opacity),
            stroke_width: element.stroke_width(),
            dash_array: dash_array(element.stroke_style, element.stroke_width()),
            transform: rotation(element.angle, bounds),
        }
    }
}

/// Apply an element opacity (percent) to a color.
///
/// Hex colors (`#rgb`, `#rrggbb`, `#rrggbbaa`) become `rgba(...)` with the
/// opacity, clamped to 5-100, multiplied into their alpha. Anything else
/// (named colors, `rgb()` forms) passes through unchanged.
#[must_use]
pub fn blend_opacity(color: &str, opacity: f64) -> String {
    let Some((r, g, b, a)) = parse_hex(color) else {
        return color.to_owned();
    };
    let factor = if opacity.is_finite() {
        opacity.clamp(MIN_OPACITY, MAX_OPACITY) / 100.0
    } else {
        1.0
    };
    let alpha = f64::from(a) / 255.0 * factor;
    format!("rgba({r},{g},{b},{})", fmt_alpha(alpha))
}

/// Background fill: sentinel values mean no fill at all.
#[must_use]
pub fn fill_color(color: &str, opacity: f64) -> String {
    if is_transparent(color) {
        "none".to_owned()
    } else {
        blend_opacity(color, opacity)
    }
}

fn is_transparent(color: &str) -> bool {
    let color = color.trim();
    color.is_empty()
        || color.eq_ignore_ascii_case("transparent")
        || color.eq_ignore_ascii_case("none")
        || color.eq_ignore_ascii_case("#00000000")
}

fn parse_hex(color: &str) -> Option<(u8, u8, u8, u8)> {
    let hex = color.trim().strip_prefix('#')?;
    if !hex.is_ascii() {
        return None;
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        3 => {
            let mut digits = hex.chars().map(|c| c.to_digit(16));
            let mut next = || -> Option<u8> {
                let d = u8::try_from(digits.next()??).ok()?;
                Some(d * 17)
            };
            Some((next()?, next()?, next()?, 255))
        }
        6 => Some((
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
            255,
        )),
        8 => Some((
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
            channel(&hex[6..8])?,
        )),
        _ => None,
    }
}

fn fmt_alpha(alpha: f64) -> String {
    let rounded = (alpha * 1000.0).round() / 1000.0;
    if rounded == rounded.trunc() {
        format!("{rounded:.0}")
    } else {
        format!("{rounded:.3}").trim_end_matches('0').to_owned()
    }
}

/// SVG `stroke-dasharray` for a stroke style, scaled by the stroke width.
#[must_use]
pub fn dash_array(style: StrokeStyle, stroke_width: f64) -> Option<String> {
    let w = stroke_width.max(1.0);
    match style {
        StrokeStyle::Solid => None,
        StrokeStyle::Dashed => Some(format!("{},{}", fmt_num(8.0 * w), fmt_num(6.0 * w))),
        StrokeStyle::Dotted => Some(format!("{},{}", fmt_num(1.5 * w), fmt_num(6.0 * w))),
    }
}

/// CSS font family for a text element.
#[must_use]
pub fn font_family(family: Option<&FontFamily>) -> &str {
    match family {
        Some(FontFamily::Id(1)) => "Virgil",
        Some(FontFamily::Id(3)) => "Cascadia",
        Some(FontFamily::Id(5)) => "Excalifont",
        Some(FontFamily::Id(6)) => "Nunito",
        Some(FontFamily::Id(7)) => "Lilita One",
        Some(FontFamily::Id(8)) => "Comic Shanns",
        Some(FontFamily::Name(name)) if !name.trim().is_empty() => name.trim(),
        _ => "Helvetica",
    }
}

/// Rotation about the center of `bounds`; `None` for unrotated elements.
#[must_use]
pub fn rotation(angle: f64, bounds: &Bounds) -> Option<String> {
    if angle == 0.0 || !angle.is_finite() {
        return None;
    }
    let (cx, cy) = bounds.center();
    Some(format!(
        "rotate({} {} {})",
        fmt_num(angle.to_degrees()),
        fmt_num(cx),
        fmt_num(cy)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_blend_short_hex() {
        assert_eq!(blend_opacity("#f00", 100.0), "rgba(255,0,0,1)");
    }

    #[test]
    fn test_blend_long_hex_half_opacity() {
        assert_eq!(blend_opacity("#1e1e1e", 50.0), "rgba(30,30,30,0.5)");
    }

    #[test]
    fn test_blend_clamps_opacity() {
        assert_eq!(blend_opacity("#000000", 0.0), "rgba(0,0,0,0.05)");
        assert_eq!(blend_opacity("#000000", 400.0), "rgba(0,0,0,1)");
    }

    #[test]
    fn test_blend_multiplies_existing_alpha() {
        assert_eq!(blend_opacity("#ffffff80", 50.0), "rgba(255,255,255,0.251)");
    }

    #[test]
    fn test_non_hex_passes_through() {
        assert_eq!(blend_opacity("red", 30.0), "red");
        assert_eq!(blend_opacity("rgb(1, 2, 3)", 30.0), "rgb(1, 2, 3)");
        assert_eq!(blend_opacity("#12", 30.0), "#12");
    }

    #[test]
    fn test_fill_sentinels() {
        assert_eq!(fill_color("transparent", 100.0), "none");
        assert_eq!(fill_color("none", 100.0), "none");
        assert_eq!(fill_color("#00000000", 100.0), "none");
        assert_eq!(fill_color("#ffc9c9", 100.0), "rgba(255,201,201,1)");
    }

    #[test]
    fn test_dash_arrays() {
        assert_eq!(dash_array(StrokeStyle::Solid, 2.0), None);
        assert_eq!(dash_array(StrokeStyle::Dashed, 2.0), Some("16,12".to_owned()));
        assert_eq!(dash_array(StrokeStyle::Dotted, 0.5), Some("1.5,6".to_owned()));
    }

    #[test]
    fn test_font_table() {
        assert_eq!(font_family(Some(&FontFamily::Id(1))), "Virgil");
        assert_eq!(font_family(Some(&FontFamily::Id(2))), "Helvetica");
        assert_eq!(font_family(Some(&FontFamily::Id(42))), "Helvetica");
        assert_eq!(font_family(Some(&FontFamily::Name("Georgia".to_owned()))), "Georgia");
        assert_eq!(font_family(None), "Helvetica");
    }

    #[test]
    fn test_rotation_pivots_on_center() {
        let bounds = Bounds::from_corners(0.0, 0.0, 20.0, 10.0);
        assert_eq!(
            rotation(std::f64::consts::FRAC_PI_2, &bounds),
            Some("rotate(90 10 5)".to_owned())
        );
        assert_eq!(rotation(0.0, &bounds), None);
    }
}
