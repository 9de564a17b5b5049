//! Scene decode ladder.
//!
//! A scene blob may arrive as plain interchange JSON, as a markdown-ish
//! document with fenced sub-blocks, or as a compressed text payload. The
//! strategies are tried in a fixed order and the first one producing an
//! element list wins:
//!
//! 1. The whole input as JSON (`elements` at the top level or nested one
//!    level under `scene` / `data`; a JSON string is unwrapped once).
//! 2. Fenced sub-blocks in document order. `json`, `jsonc` and `excalidraw`
//!    fences go through step 1; `compressed-json` fences go to step 3;
//!    untagged fences try step 1, then step 3.
//! 3. Compressed payloads: each normalization (as-is, whitespace-stripped)
//!    against each [`Codec`], feeding every successful decode back through
//!    step 1.
//!
//! Input without any fence is finally tried as a bare compressed payload.

use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use serde_json::{Map, Value};

use crate::error::DecodeError;
use crate::model::{BinaryFile, Element, Scene};

/// Reversible text encodings a compressed payload may use, in trial order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Codec {
    /// LZ-string, base64 alphabet.
    LzBase64,
    /// LZ-string, URI-safe alphabet.
    LzUriComponent,
    /// LZ-string, UTF-16 packing.
    LzUtf16,
    /// Standard base64 over UTF-8 text, no compression.
    Base64,
}

impl Codec {
    /// All codecs in the order the ladder tries them.
    pub const ALL: [Self; 4] = [
        Self::LzBase64,
        Self::LzUriComponent,
        Self::LzUtf16,
        Self::Base64,
    ];

    /// Decode `payload` to text, or `None` if it is not valid for this codec.
    #[must_use]
    pub fn decode(self, payload: &str) -> Option<String> {
        match self {
            Self::LzBase64 => lz_str::decompress_from_base64(payload).and_then(utf16_to_string),
            Self::LzUriComponent => {
                lz_str::decompress_from_encoded_uri_component(payload).and_then(utf16_to_string)
            }
            Self::LzUtf16 => {
                // UTF-16 packing offsets every unit by 32
                if payload.encode_utf16().any(|unit| unit < 32) {
                    return None;
                }
                lz_str::decompress_from_utf16(payload).and_then(utf16_to_string)
            }
            Self::Base64 => {
                let bytes = BASE64_STANDARD.decode(payload).ok()?;
                String::from_utf8(bytes).ok()
            }
        }
    }
}

fn utf16_to_string(units: Vec<u16>) -> Option<String> {
    if units.is_empty() {
        return None;
    }
    String::from_utf16(&units).ok()
}

/// Decode a scene from any supported representation.
///
/// # Errors
///
/// Returns [`DecodeError::Unparseable`] once every strategy has failed.
///
/// # Example
///
/// ```
/// let scene = folio_scene::decode(r#"{"elements":[{"id":"a","type":"ellipse"}]}"#).unwrap();
/// assert_eq!(scene.elements.len(), 1);
///
/// let err = folio_scene::decode("not a scene").unwrap_err();
/// assert_eq!(err.code(), "unparseable-scene");
/// ```
pub fn decode(raw: &str) -> Result<Scene, DecodeError> {
    let text = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    let mut ladder = Ladder::default();

    if let Some(scene) = ladder.json(text) {
        tracing::debug!(elements = scene.elements.len(), "scene decoded from plain JSON");
        return Ok(scene);
    }

    let fences = scan_fences(text);
    for fence in &fences {
        let found = match fence.tag {
            "json" | "excalidraw" => ladder.json(&fence.body),
            "jsonc" => ladder.json(&strip_json_comments(&fence.body)),
            "compressed-json" => ladder.compressed(&fence.body),
            "" => ladder
                .json(&fence.body)
                .or_else(|| ladder.compressed(&fence.body)),
            other => {
                tracing::trace!(tag = other, "skipping fence with unrelated tag");
                None
            }
        };
        if let Some(scene) = found {
            tracing::debug!(
                tag = fence.tag,
                elements = scene.elements.len(),
                "scene decoded from fenced block"
            );
            return Ok(scene);
        }
    }

    if fences.is_empty()
        && let Some(scene) = ladder.compressed(text)
    {
        tracing::debug!(elements = scene.elements.len(), "scene decoded from bare payload");
        return Ok(scene);
    }

    tracing::debug!(attempts = ladder.attempts, "scene decode ladder exhausted");
    Err(DecodeError::Unparseable {
        attempts: ladder.attempts,
    })
}

/// Counts strategy attempts across one [`decode`] call.
#[derive(Default)]
struct Ladder {
    attempts: usize,
}

impl Ladder {
    fn json(&mut self, text: &str) -> Option<Scene> {
        self.attempts += 1;
        parse_scene_json(text)
    }

    fn compressed(&mut self, payload: &str) -> Option<Scene> {
        let stripped: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        let normalizations = [payload.trim(), stripped.as_str()];

        for (index, candidate) in normalizations.iter().enumerate() {
            if candidate.is_empty() || (index > 0 && *candidate == normalizations[0]) {
                continue;
            }
            for codec in Codec::ALL {
                self.attempts += 1;
                let Some(decoded) = codec.decode(candidate) else {
                    tracing::trace!(?codec, normalization = index, "codec rejected payload");
                    continue;
                };
                if let Some(scene) = parse_scene_json(&decoded) {
                    tracing::debug!(?codec, normalization = index, "compressed payload decoded");
                    return Some(scene);
                }
            }
        }
        None
    }
}

/// Parse interchange JSON, unwrapping one level of string encoding.
fn parse_scene_json(text: &str) -> Option<Scene> {
    let value: Value = serde_json::from_str(text.trim()).ok()?;
    let value = match value {
        Value::String(inner) => serde_json::from_str(&inner).ok()?,
        other => other,
    };
    scene_from_value(&value)
}

fn scene_from_value(value: &Value) -> Option<Scene> {
    let object = value.as_object()?;
    scene_from_object(object).or_else(|| {
        ["scene", "data"]
            .iter()
            .find_map(|key| object.get(*key)?.as_object().and_then(scene_from_object))
    })
}

/// Scene from an object with an `elements` array. One malformed element
/// rejects the whole candidate.
fn scene_from_object(object: &Map<String, Value>) -> Option<Scene> {
    let raw_elements = object.get("elements")?.as_array()?;

    let mut elements = Vec::with_capacity(raw_elements.len());
    for raw in raw_elements {
        match serde_json::from_value::<Element>(raw.clone()) {
            Ok(element) if element.is_deleted => {}
            Ok(element) => elements.push(element),
            Err(e) => {
                tracing::trace!("rejecting candidate with malformed element: {e}");
                return None;
            }
        }
    }

    let app_state = object.get("appState").and_then(Value::as_object).cloned();
    let files = object
        .get("files")
        .and_then(Value::as_object)
        .map(|files| {
            files
                .iter()
                .filter_map(|(id, file)| {
                    let file = serde_json::from_value::<BinaryFile>(file.clone()).ok()?;
                    Some((id.clone(), file))
                })
                .collect()
        })
        .unwrap_or_default();

    Some(Scene {
        elements,
        app_state,
        files,
    })
}

/// A fenced sub-block: info-string tag plus body text.
#[derive(Debug, PartialEq, Eq)]
struct Fence<'a> {
    tag: &'a str,
    body: String,
}

/// Collect fenced blocks (backtick or tilde, three or more) in order.
///
/// An unclosed fence runs to the end of the input.
fn scan_fences(text: &str) -> Vec<Fence<'_>> {
    let mut fences = Vec::new();
    let mut lines = text.lines();

    while let Some(line) = lines.next() {
        let trimmed = line.trim_start();
        let Some((marker, len)) = fence_marker(trimmed) else {
            continue;
        };
        let tag = trimmed[len..].split_whitespace().next().unwrap_or("");

        let mut body = String::new();
        for inner in lines.by_ref() {
            let inner_trimmed = inner.trim_start();
            if let Some((close, close_len)) = fence_marker(inner_trimmed)
                && close == marker
                && close_len >= len
                && inner_trimmed[close_len..].trim().is_empty()
            {
                break;
            }
            body.push_str(inner);
            body.push('\n');
        }
        fences.push(Fence { tag, body });
    }
    fences
}

fn fence_marker(trimmed: &str) -> Option<(char, usize)> {
    let first = trimmed.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let len = trimmed.chars().take_while(|c| *c == first).count();
    (len >= 3).then_some((first, len))
}

/// Remove `//` and `/* */` comments outside string literals.
fn strip_json_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match (c, chars.peek()) {
            ('"', _) => {
                in_string = true;
                out.push(c);
            }
            ('/', Some('/')) => {
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for skipped in chars.by_ref() {
                    if prev == '*' && skipped == '/' {
                        break;
                    }
                    prev = skipped;
                }
            }
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SCENE: &str = r##"{"type":"excalidraw","elements":[
        {"id":"r1","type":"rectangle","x":10,"y":10,"width":20,"height":30},
        {"id":"gone","type":"ellipse","isDeleted":true},
        {"id":"t1","type":"text","x":0,"y":0,"text":"hi","fontSize":16}
    ],"appState":{"viewBackgroundColor":"#ffffff"},"files":{}}"##;

    fn ids(scene: &Scene) -> Vec<&str> {
        scene.elements.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn test_plain_json_drops_deleted_elements() {
        let scene = decode(SCENE).unwrap();
        assert_eq!(ids(&scene), vec!["r1", "t1"]);
        assert!(scene.app_state.is_some());
    }

    #[test]
    fn test_nested_under_scene_or_data() {
        let nested = format!(r#"{{"scene": {SCENE}}}"#);
        let data = format!(r#"{{"version": 2, "data": {SCENE}}}"#);

        assert_eq!(ids(&decode(&nested).unwrap()), vec!["r1", "t1"]);
        assert_eq!(ids(&decode(&data).unwrap()), vec!["r1", "t1"]);
    }

    #[test]
    fn test_double_encoded_json() {
        let encoded = serde_json::to_string(SCENE).unwrap();
        assert_eq!(decode(&encoded).unwrap(), decode(SCENE).unwrap());
    }

    #[test]
    fn test_compressed_json_fence() {
        let compressed = lz_str::compress_to_base64(SCENE);
        let doc = format!("# Drawing\n```compressed-json\n{compressed}\n```\n%%\n");
        assert_eq!(decode(&doc).unwrap(), decode(SCENE).unwrap());
    }

    #[test]
    fn test_compressed_payload_wrapped_across_lines() {
        let compressed = lz_str::compress_to_base64(SCENE);
        let wrapped: Vec<String> = compressed
            .as_bytes()
            .chunks(32)
            .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
            .collect();
        let doc = format!("```compressed-json\n{}\n```", wrapped.join("\n\n"));

        assert_eq!(ids(&decode(&doc).unwrap()), vec!["r1", "t1"]);
    }

    #[test]
    fn test_uri_component_codec_in_untagged_fence() {
        let compressed = lz_str::compress_to_encoded_uri_component(SCENE);
        let doc = format!("```\n{compressed}\n```");
        assert_eq!(ids(&decode(&doc).unwrap()), vec!["r1", "t1"]);
    }

    #[test]
    fn test_bare_base64_payload() {
        let encoded = BASE64_STANDARD.encode(SCENE);
        assert_eq!(ids(&decode(&encoded).unwrap()), vec!["r1", "t1"]);
    }

    #[test]
    fn test_jsonc_fence_with_comments() {
        let doc = "```jsonc\n// exported\n{\"elements\": [ /* one */ {\"id\": \"a//b\", \"type\": \"line\"}]}\n```";
        let scene = decode(doc).unwrap();
        assert_eq!(ids(&scene), vec!["a//b"]);
    }

    #[test]
    fn test_first_matching_fence_wins() {
        let doc = "```json\n{\"elements\":[{\"id\":\"first\"}]}\n```\n```json\n{\"elements\":[{\"id\":\"second\"}]}\n```";
        assert_eq!(ids(&decode(doc).unwrap()), vec!["first"]);
    }

    #[test]
    fn test_unrelated_fence_is_skipped() {
        let doc = "```rust\n{\"elements\":[]}\n```";
        assert!(decode(doc).is_err());
    }

    #[test]
    fn test_object_without_elements_is_rejected() {
        let err = decode(r#"{"type":"excalidraw","version":2}"#).unwrap_err();
        assert_eq!(err.code(), "unparseable-scene");
    }

    #[test]
    fn test_garbage_is_one_categorized_error() {
        let err = decode("```compressed-json\n%%%not-a-payload%%%\n```").unwrap_err();
        assert!(matches!(err, DecodeError::Unparseable { attempts } if attempts > 1));
        assert!(err.to_string().starts_with("unparseable-scene"));
    }

    #[test]
    fn test_malformed_element_rejects_scene() {
        let err = decode(r#"{"elements":[42, {"id":"ok","type":"diamond"}]}"#).unwrap_err();
        assert_eq!(err.code(), "unparseable-scene");

        let err = decode(r#"{"elements":[{"id":"ok","type":"diamond","x":"left"}]}"#).unwrap_err();
        assert_eq!(err.code(), "unparseable-scene");
    }

    #[test]
    fn test_malformed_candidate_falls_through_to_next_fence() {
        let text = "```json\n{\"elements\":[42]}\n```\n```json\n{\"elements\":[{\"id\":\"b\"}]}\n```";
        assert_eq!(ids(&decode(text).unwrap()), vec!["b"]);
    }

    #[test]
    fn test_scan_fences_unclosed_runs_to_end() {
        let fences = scan_fences("text\n~~~~ json extra\n{}\n~~~\nmore");
        assert_eq!(
            fences,
            vec![Fence {
                tag: "json",
                body: "{}\n~~~\nmore\n".to_owned()
            }]
        );
    }

    #[test]
    fn test_strip_json_comments_keeps_strings() {
        assert_eq!(
            strip_json_comments("{\"u\": \"http://x\"} // tail"),
            "{\"u\": \"http://x\"} "
        );
    }
}
