//! Asset tokens, the trailing manifest, and reference classification.
//!
//! Long URLs are written once in a trailing `:::assets` block and referenced
//! from the body as `asset:<token>`. Tokens are `a1`, `a2`, ... and a URL is
//! only ever given one token.

use std::collections::BTreeMap;
use std::fmt::Write;

use percent_encoding::percent_decode_str;
use serde_json::Value;

/// Token → URL table of one document.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize), serde(transparent))]
pub struct AssetManifest {
    entries: BTreeMap<String, String>,
}

impl AssetManifest {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a manifest body. Anything but a JSON object yields an empty
    /// manifest; non-string values are dropped.
    #[must_use]
    pub fn from_json(body: &str) -> Self {
        let entries = match serde_json::from_str::<Value>(body.trim()) {
            Ok(Value::Object(map)) => map
                .into_iter()
                .filter_map(|(token, url)| match url {
                    Value::String(url) => Some((token, url)),
                    _ => None,
                })
                .collect(),
            Ok(_) => BTreeMap::new(),
            Err(e) => {
                tracing::debug!("ignoring malformed asset manifest: {e}");
                BTreeMap::new()
            }
        };
        Self { entries }
    }

    #[must_use]
    pub fn get(&self, token: &str) -> Option<&str> {
        self.entries.get(token).map(String::as_str)
    }

    /// Token already assigned to `url`, if any.
    #[must_use]
    pub fn token_for(&self, url: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, existing)| existing.as_str() == url)
            .map(|(token, _)| token.as_str())
    }

    /// Token for `url`, allocating the smallest unused `a<N>` if the URL is
    /// new.
    ///
    /// # Example
    ///
    /// ```
    /// use folio_markup::AssetManifest;
    ///
    /// let mut manifest = AssetManifest::new();
    /// let first = manifest.allocate("https://cdn.example.com/cat.png");
    /// let again = manifest.allocate("https://cdn.example.com/cat.png");
    /// let other = manifest.allocate("https://cdn.example.com/dog.png");
    /// assert_eq!(first, "a1");
    /// assert_eq!(again, first);
    /// assert_eq!(other, "a2");
    /// ```
    pub fn allocate(&mut self, url: &str) -> String {
        if let Some(token) = self.token_for(url) {
            return token.to_owned();
        }
        let token = (1_u64..)
            .map(|n| format!("a{n}"))
            .find(|candidate| !self.entries.contains_key(candidate))
            .unwrap_or_default();
        self.entries.insert(token.clone(), url.to_owned());
        token
    }

    pub fn insert(&mut self, token: impl Into<String>, url: impl Into<String>) {
        self.entries.insert(token.into(), url.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(t, u)| (t.as_str(), u.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Serialize a manifest as a trailing `:::assets` block.
#[must_use]
pub fn render_manifest(manifest: &AssetManifest) -> String {
    let json = serde_json::to_string(&manifest.entries).unwrap_or_else(|_| "{}".to_owned());
    let mut out = String::with_capacity(json.len() + 16);
    let _ = write!(out, ":::assets\n{json}\n:::\n");
    out
}

/// Source of URLs for asset tokens.
pub trait TokenResolver {
    fn resolve_token(&self, token: &str) -> Option<String>;
}

impl TokenResolver for AssetManifest {
    fn resolve_token(&self, token: &str) -> Option<String> {
        self.get(token).map(str::to_owned)
    }
}

impl<F> TokenResolver for F
where
    F: Fn(&str) -> Option<String>,
{
    fn resolve_token(&self, token: &str) -> Option<String> {
        self(token)
    }
}

/// What a reference points at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize),
    serde(rename_all = "camelCase")
)]
pub enum AssetKind {
    Image,
    VectorDrawing,
    Diagram,
    ExternalLink,
    PlainText,
}

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp", "avif", "ico"];

/// Classify a (resolved) reference.
///
/// Any http(s) URL is an external link, whatever its extension. Other
/// references are sorted by extension.
#[must_use]
pub fn classify(path: &str) -> AssetKind {
    let lower = path.trim().to_ascii_lowercase();
    if is_http(&lower) {
        return AssetKind::ExternalLink;
    }
    let bare = lower
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .trim_end_matches('/');

    if bare.ends_with(".excalidraw.md") || bare.ends_with(".excalidraw") || bare.ends_with(".json")
    {
        return AssetKind::Diagram;
    }
    if bare.ends_with(".svg") {
        return AssetKind::VectorDrawing;
    }
    let extension = bare.rsplit_once('.').map(|(_, ext)| ext);
    if extension.is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext)) {
        AssetKind::Image
    } else {
        AssetKind::PlainText
    }
}

fn is_http(s: &str) -> bool {
    let lower = s.get(..8).unwrap_or(s).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Normalize a written reference.
///
/// Surrounding angle brackets are removed. Non-HTTP paths are also
/// percent-decoded, have backslashes and repeated slashes collapsed, and lose
/// any query or fragment.
#[must_use]
pub fn normalize_path(raw: &str) -> String {
    let trimmed = raw.trim();
    let trimmed = trimmed
        .strip_prefix('<')
        .and_then(|s| s.strip_suffix('>'))
        .unwrap_or(trimmed)
        .trim();
    if is_http(trimmed) {
        return trimmed.to_owned();
    }

    let decoded = percent_decode_str(trimmed).decode_utf8_lossy();
    let without_suffix = decoded.split(['?', '#']).next().unwrap_or_default();
    let mut out = String::with_capacity(without_suffix.len());
    for c in without_suffix.chars() {
        let c = if c == '\\' { '/' } else { c };
        if c == '/' && out.ends_with('/') {
            continue;
        }
        out.push(c);
    }
    out
}

/// Resolves references against the document manifest, then an optional
/// caller-supplied resolver.
pub(crate) struct AssetResolver<'a> {
    manifest: &'a AssetManifest,
    fallback: Option<&'a dyn TokenResolver>,
}

/// Result of resolving one reference.
pub(crate) struct Resolved {
    /// Empty when the token is unknown.
    pub url: String,
    pub kind: AssetKind,
    pub missing_token: Option<String>,
}

impl<'a> AssetResolver<'a> {
    pub(crate) fn new(manifest: &'a AssetManifest, fallback: Option<&'a dyn TokenResolver>) -> Self {
        Self { manifest, fallback }
    }

    pub(crate) fn resolve(&self, reference: &str) -> Resolved {
        match resolve(reference, self) {
            Some(url) => Resolved {
                kind: classify(&url),
                url,
                missing_token: None,
            },
            None => Resolved {
                url: String::new(),
                kind: classify(reference),
                missing_token: Some(reference.trim().to_owned()),
            },
        }
    }
}

impl TokenResolver for AssetResolver<'_> {
    fn resolve_token(&self, token: &str) -> Option<String> {
        self.manifest
            .resolve_token(token)
            .or_else(|| self.fallback?.resolve_token(token))
    }
}

/// Resolve a reference: `asset:<token>` goes through `resolver` (`None` when
/// unknown), anything else is a literal path or URL and is normalized.
///
/// # Example
///
/// ```
/// use folio_markup::{AssetManifest, resolve};
///
/// let mut manifest = AssetManifest::new();
/// manifest.insert("a3", "https://cdn.example.com/very/long/cat.png");
/// assert_eq!(resolve("asset:a3", &manifest).as_deref(), Some("https://cdn.example.com/very/long/cat.png"));
/// assert_eq!(resolve("asset:a9", &manifest), None);
/// assert_eq!(resolve("<img%20dir//cat.png?x=1>", &manifest).as_deref(), Some("img dir/cat.png"));
/// ```
pub fn resolve(reference: &str, resolver: &dyn TokenResolver) -> Option<String> {
    let reference = reference.trim();
    match reference.strip_prefix("asset:") {
        Some(token) => resolver
            .resolve_token(token.trim())
            .filter(|url| !url.is_empty()),
        None => Some(normalize_path(reference)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_manifest_from_json_drops_non_strings() {
        let manifest = AssetManifest::from_json(r#"{"a1":"https://x/1.png","a2":3,"a3":null}"#);
        assert_eq!(manifest.len(), 1);
        assert_eq!(manifest.get("a1"), Some("https://x/1.png"));
    }

    #[test]
    fn test_manifest_from_non_object_is_empty() {
        assert!(AssetManifest::from_json("[1,2]").is_empty());
        assert!(AssetManifest::from_json("{oops").is_empty());
    }

    #[test]
    fn test_allocate_fills_smallest_gap() {
        let mut manifest = AssetManifest::new();
        manifest.insert("a1", "https://x/1");
        manifest.insert("a3", "https://x/3");
        assert_eq!(manifest.allocate("https://x/new"), "a2");
        assert_eq!(manifest.allocate("https://x/newer"), "a4");
    }

    #[test]
    fn test_allocate_dedups_existing_url() {
        let mut manifest = AssetManifest::new();
        manifest.insert("a7", "https://x/cat.png");
        assert_eq!(manifest.allocate("https://x/cat.png"), "a7");
        assert_eq!(manifest.len(), 1);
    }

    #[test]
    fn test_allocate_distinct_urls_get_distinct_tokens() {
        let mut manifest = AssetManifest::new();
        let a = manifest.allocate("https://x/a");
        let b = manifest.allocate("https://x/b");
        assert_ne!(a, b);
        assert_eq!(manifest.allocate("https://x/a"), a);
    }

    #[test]
    fn test_render_manifest() {
        let mut manifest = AssetManifest::new();
        manifest.insert("a1", "https://x/1.png");
        assert_eq!(
            render_manifest(&manifest),
            ":::assets\n{\"a1\":\"https://x/1.png\"}\n:::\n"
        );
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify("https://example.com/page"), AssetKind::ExternalLink);
        assert_eq!(classify("cat.PNG?w=2"), AssetKind::Image);
        assert_eq!(classify("photos/cat.jpeg"), AssetKind::Image);
        assert_eq!(classify("logo.svg"), AssetKind::VectorDrawing);
        assert_eq!(classify("drawings/flow.excalidraw"), AssetKind::Diagram);
        assert_eq!(classify("drawings/flow.excalidraw.md"), AssetKind::Diagram);
        assert_eq!(classify("scene.json"), AssetKind::Diagram);
        assert_eq!(classify("notes/readme.md"), AssetKind::PlainText);
        assert_eq!(classify(""), AssetKind::PlainText);
    }

    #[test]
    fn test_classify_http_url_is_external_before_extension() {
        assert_eq!(classify("https://cdn.example.com/cat.png"), AssetKind::ExternalLink);
        assert_eq!(classify("HTTP://cdn.example.com/flow.excalidraw"), AssetKind::ExternalLink);
        assert_eq!(classify("http://x.example/logo.svg"), AssetKind::ExternalLink);
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("<my%20file.png>"), "my file.png");
        assert_eq!(normalize_path(r"dir\\sub\file.png"), "dir/sub/file.png");
        assert_eq!(normalize_path("a//b///c.png#frag"), "a/b/c.png");
        assert_eq!(
            normalize_path("https://x.com/a%20b?q=1"),
            "https://x.com/a%20b?q=1"
        );
    }

    #[test]
    fn test_resolve_prefers_manifest_then_fallback() {
        let mut manifest = AssetManifest::new();
        manifest.insert("a1", "https://doc/1.png");
        let fallback = |token: &str| (token == "a2").then(|| "https://app/2.png".to_owned());
        let resolver = AssetResolver::new(&manifest, Some(&fallback));

        assert_eq!(resolver.resolve("asset:a1").url, "https://doc/1.png");
        assert_eq!(resolver.resolve("asset:a2").url, "https://app/2.png");

        let missing = resolver.resolve("asset:a3");
        assert_eq!(missing.url, "");
        assert_eq!(missing.missing_token.as_deref(), Some("asset:a3"));
    }
}
