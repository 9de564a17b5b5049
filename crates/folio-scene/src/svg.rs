//! SVG serialization of rendered scenes.

use std::fmt::Write;

use crate::geometry::fmt_num;
use crate::render::{Primitive, RenderedScene, Shape};

/// Serialize a rendered scene as a standalone SVG document.
///
/// Every attribute value and text node is escaped, so element text and
/// colors from untrusted scenes cannot break out of the markup.
#[must_use]
pub fn to_svg(scene: &RenderedScene) -> String {
    let mut out = String::new();
    let vb = &scene.view_box;
    let _ = write!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="{}" width="{}" height="{}">"#,
        vb.to_view_box_attr(),
        fmt_num(vb.width()),
        fmt_num(vb.height())
    );

    let arrows: Vec<(usize, &Primitive)> = scene
        .primitives
        .iter()
        .enumerate()
        .filter(|(_, p)| matches!(p.shape, Shape::Polyline { arrow: true, .. }))
        .collect();
    if !arrows.is_empty() {
        out.push_str("<defs>");
        for (index, prim) in &arrows {
            let _ = write!(
                out,
                r#"<marker id="arrow-{index}" viewBox="0 0 10 10" refX="9" refY="5" markerWidth="6" markerHeight="6" orient="auto-start-reverse"><path d="M0,0 L10,5 L0,10 z" fill="{}"/></marker>"#,
                escape_xml(&prim.style.stroke)
            );
        }
        out.push_str("</defs>");
    }

    for (index, prim) in scene.primitives.iter().enumerate() {
        write_primitive(&mut out, index, prim);
    }
    out.push_str("</svg>");
    out
}

fn write_primitive(out: &mut String, index: usize, prim: &Primitive) {
    let style = style_attrs(prim);
    match &prim.shape {
        Shape::Rect {
            x,
            y,
            width,
            height,
            radius,
        } => {
            let _ = write!(
                out,
                r#"<rect x="{}" y="{}" width="{}" height="{}""#,
                fmt_num(*x),
                fmt_num(*y),
                fmt_num(*width),
                fmt_num(*height)
            );
            if *radius > 0.0 {
                let _ = write!(out, r#" rx="{0}" ry="{0}""#, fmt_num(*radius));
            }
            let _ = write!(out, "{style}/>");
        }
        Shape::Placeholder {
            x,
            y,
            width,
            height,
        } => {
            let _ = write!(
                out,
                r#"<rect x="{}" y="{}" width="{}" height="{}"{style}/>"#,
                fmt_num(*x),
                fmt_num(*y),
                fmt_num(*width),
                fmt_num(*height)
            );
        }
        Shape::Ellipse { cx, cy, rx, ry } => {
            let _ = write!(
                out,
                r#"<ellipse cx="{}" cy="{}" rx="{}" ry="{}"{style}/>"#,
                fmt_num(*cx),
                fmt_num(*cy),
                fmt_num(*rx),
                fmt_num(*ry)
            );
        }
        Shape::Polygon { points } => {
            let _ = write!(out, r#"<polygon points="{}"{style}/>"#, points_attr(points));
        }
        Shape::Polyline { points, arrow } => {
            let _ = write!(
                out,
                r#"<polyline points="{}" fill="none" stroke="{}" stroke-width="{}""#,
                points_attr(points),
                escape_xml(&prim.style.stroke),
                fmt_num(prim.style.stroke_width)
            );
            write_dash_and_transform(out, prim);
            if *arrow {
                let _ = write!(out, r#" marker-end="url(#arrow-{index})""#);
            }
            out.push_str("/>");
        }
        Shape::Text {
            x,
            y,
            font_size,
            line_height,
            font_family,
            lines,
        } => {
            let _ = write!(
                out,
                r#"<text font-size="{}" font-family="{}" fill="{}""#,
                fmt_num(*font_size),
                escape_xml(font_family),
                escape_xml(&prim.style.fill)
            );
            if let Some(transform) = &prim.style.transform {
                let _ = write!(out, r#" transform="{}""#, escape_xml(transform));
            }
            out.push('>');
            for (i, line) in lines.iter().enumerate() {
                #[allow(clippy::cast_precision_loss)]
                let baseline = y + font_size + i as f64 * line_height;
                let _ = write!(
                    out,
                    r#"<tspan x="{}" y="{}">{}</tspan>"#,
                    fmt_num(*x),
                    fmt_num(baseline),
                    escape_xml(line)
                );
            }
            out.push_str("</text>");
        }
        Shape::Image {
            x,
            y,
            width,
            height,
            href,
        } => {
            let _ = write!(
                out,
                r#"<image x="{}" y="{}" width="{}" height="{}" href="{}""#,
                fmt_num(*x),
                fmt_num(*y),
                fmt_num(*width),
                fmt_num(*height),
                escape_xml(href)
            );
            if let Some(transform) = &prim.style.transform {
                let _ = write!(out, r#" transform="{}""#, escape_xml(transform));
            }
            out.push_str("/>");
        }
    }
}

fn style_attrs(prim: &Primitive) -> String {
    let mut attrs = format!(
        r#" fill="{}" stroke="{}" stroke-width="{}""#,
        escape_xml(&prim.style.fill),
        escape_xml(&prim.style.stroke),
        fmt_num(prim.style.stroke_width)
    );
    write_dash_and_transform(&mut attrs, prim);
    attrs
}

fn write_dash_and_transform(out: &mut String, prim: &Primitive) {
    if let Some(dash) = &prim.style.dash_array {
        let _ = write!(out, r#" stroke-dasharray="{}""#, escape_xml(dash));
    }
    if let Some(transform) = &prim.style.transform {
        let _ = write!(out, r#" transform="{}""#, escape_xml(transform));
    }
}

fn points_attr(points: &[(f64, f64)]) -> String {
    points
        .iter()
        .map(|(x, y)| format!("{},{}", fmt_num(*x), fmt_num(*y)))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Escape text for use in XML attribute values and text nodes.
#[must_use]
pub fn escape_xml(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(c),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Element, Scene};
    use crate::render::{RenderOptions, render_scene};

    fn svg_for(elements: Vec<Element>) -> String {
        let scene = Scene {
            elements,
            ..Scene::default()
        };
        to_svg(&render_scene(&scene, &RenderOptions::default()))
    }

    #[test]
    fn test_empty_scene_uses_fallback_view_box() {
        let svg = svg_for(Vec::new());
        assert!(svg.starts_with(r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="-16 -16 132 132""#));
        assert!(svg.ends_with("</svg>"));
    }

    #[test]
    fn test_text_is_escaped() {
        let svg = svg_for(vec![Element {
            kind: "text".to_owned(),
            text: Some("<b>&\"x\"</b>".to_owned()),
            ..Element::default()
        }]);
        assert!(svg.contains("&lt;b&gt;&amp;&quot;x&quot;&lt;/b&gt;"));
        assert!(!svg.contains("<b>"));
    }

    #[test]
    fn test_arrow_gets_marker() {
        let svg = svg_for(vec![Element {
            kind: "arrow".to_owned(),
            points: Some(vec![[0.0, 0.0], [10.0, 10.0]]),
            ..Element::default()
        }]);
        assert!(svg.contains(r#"<marker id="arrow-0""#));
        assert!(svg.contains(r##"marker-end="url(#arrow-0)""##));
    }

    #[test]
    fn test_attribute_injection_is_escaped() {
        let svg = svg_for(vec![Element {
            kind: "rectangle".to_owned(),
            stroke_color: Some(r#"red" onload="x"#.to_owned()),
            width: 5.0,
            height: 5.0,
            ..Element::default()
        }]);
        assert!(svg.contains(r#"stroke="red&quot; onload=&quot;x""#));
    }

    #[test]
    fn test_rotated_rect_has_transform() {
        let svg = svg_for(vec![Element {
            kind: "rectangle".to_owned(),
            width: 10.0,
            height: 10.0,
            angle: std::f64::consts::PI,
            ..Element::default()
        }]);
        assert!(svg.contains(r#"transform="rotate(180 5 5)""#));
    }
}
