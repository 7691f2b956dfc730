//! Reference rewriting for text assets
//!
//! Original relative paths are swapped for their fingerprinted counterparts in
//! one leftmost-longest pass. No CSS or JS is parsed.

use aho_corasick::{AhoCorasick, MatchKind};
use std::borrow::Cow;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use crate::filter::normalize_extension;
use crate::pipeline::PipelineError;

/// Stylesheets and scripts
pub const DEFAULT_TEXT_EXTENSIONS: &[&str] = &["css", "js"];

/// Static extension-based classification of text assets
#[derive(Debug, Clone)]
pub struct TextAssetPolicy {
    extensions: HashSet<String>,
}

impl TextAssetPolicy {
    pub fn new<E, S>(extensions: E) -> Self
    where
        E: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .filter_map(|e| normalize_extension(e.as_ref()))
                .collect(),
        }
    }

    pub fn is_text_asset(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map_or(false, |e| self.extensions.contains(&e.to_lowercase()))
    }
}

impl Default for TextAssetPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_TEXT_EXTENSIONS)
    }
}

/// Applies an old-path → new-path map to text
pub struct ReferenceRewriter {
    matcher: Option<AhoCorasick>,
    replacements: Vec<String>,
}

impl ReferenceRewriter {
    /// Build from the complete rename map
    ///
    /// Identity entries and empty keys are dropped; they can never change
    /// anything.
    pub fn new(map: &BTreeMap<String, String>) -> Result<Self, PipelineError> {
        let (patterns, replacements): (Vec<&str>, Vec<String>) = map
            .iter()
            .filter(|(from, to)| !from.is_empty() && from != to)
            .map(|(from, to)| (from.as_str(), to.clone()))
            .unzip();

        if patterns.is_empty() {
            return Ok(Self {
                matcher: None,
                replacements,
            });
        }

        let matcher = AhoCorasick::builder()
            .match_kind(MatchKind::LeftmostLongest)
            .build(&patterns)
            .map_err(|e| {
                PipelineError::PreconditionViolation(format!("cannot build rewrite matcher: {}", e))
            })?;

        Ok(Self {
            matcher: Some(matcher),
            replacements,
        })
    }

    pub fn len(&self) -> usize {
        self.replacements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.replacements.is_empty()
    }

    /// Rewrite `text`, borrowing it back untouched when nothing matched
    pub fn rewrite<'t>(&self, text: &'t str) -> Cow<'t, str> {
        match self.rewrite_bytes(text.as_bytes()) {
            Cow::Borrowed(_) => Cow::Borrowed(text),
            Cow::Owned(bytes) => match String::from_utf8(bytes) {
                Ok(rewritten) => Cow::Owned(rewritten),
                Err(e) => Cow::Owned(String::from_utf8_lossy(e.as_bytes()).into_owned()),
            },
        }
    }

    /// Byte-level variant for files of unknown (ASCII-compatible) encoding
    ///
    /// A match already followed by the rest of its replacement is left alone,
    /// so keys that are a prefix of their own replacement (`LICENSE` →
    /// `LICENSE,q1`) are not rewritten twice.
    pub fn rewrite_bytes<'t>(&self, bytes: &'t [u8]) -> Cow<'t, [u8]> {
        let Some(matcher) = &self.matcher else {
            return Cow::Borrowed(bytes);
        };

        let mut replacements = Vec::new();
        for mat in matcher.find_iter(bytes) {
            let replacement = self.replacements[mat.pattern().as_usize()].as_bytes();
            if !bytes[mat.start()..].starts_with(replacement) {
                replacements.push((mat.start(), mat.end(), replacement));
            }
        }
        if replacements.is_empty() {
            return Cow::Borrowed(bytes);
        }

        let mut result = Vec::with_capacity(bytes.len());
        let mut last = 0;
        for (start, end, replacement) in replacements {
            result.extend_from_slice(&bytes[last..start]);
            result.extend_from_slice(replacement);
            last = end;
        }
        result.extend_from_slice(&bytes[last..]);
        Cow::Owned(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewriter(pairs: &[(&str, &str)]) -> ReferenceRewriter {
        let map = pairs
            .iter()
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .collect();
        ReferenceRewriter::new(&map).unwrap()
    }

    #[test]
    fn test_rewrites_reference() {
        let r = rewriter(&[("Image1.jpg", "Image1,abc.jpg")]);
        assert_eq!(
            r.rewrite(".a {background-image:url('Image1.jpg');}"),
            ".a {background-image:url('Image1,abc.jpg');}"
        );
    }

    #[test]
    fn test_unchanged_text_is_borrowed() {
        let r = rewriter(&[("Image1.jpg", "Image1,abc.jpg")]);
        assert!(matches!(r.rewrite("body { color: red; }"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_rewrite_is_idempotent() {
        let r = rewriter(&[("x/a.png", "x/a,1.png"), ("y/a.png", "y/a,2.png")]);
        let once = r.rewrite("url(../x/a.png) url(../y/a.png)").into_owned();
        let twice = r.rewrite(&once).into_owned();
        assert_eq!(once, "url(../x/a,1.png) url(../y/a,2.png)");
        assert_eq!(once, twice);
    }

    #[test]
    fn test_extensionless_key_is_not_rewritten_twice() {
        let r = rewriter(&[("LICENSE", "LICENSE,q1")]);
        let once = r.rewrite("/* see LICENSE */").into_owned();
        assert_eq!(once, "/* see LICENSE,q1 */");
        assert!(matches!(r.rewrite(&once), Cow::Borrowed(_)));
        assert_eq!(r.rewrite_bytes(once.as_bytes()), once.as_bytes());
    }

    #[test]
    fn test_longest_key_wins_over_contained_key() {
        let r = rewriter(&[("a.png", "a,1.png"), ("img/a.png", "img/a,2.png")]);
        assert_eq!(r.rewrite("url(img/a.png) url(a.png)"), "url(img/a,2.png) url(a,1.png)");
    }

    #[test]
    fn test_bytes_outside_utf8_survive() {
        let r = rewriter(&[("a.png", "a,1.png")]);
        let latin1 = b"/* caf\xe9 */ url(a.png)";
        assert_eq!(&r.rewrite_bytes(latin1)[..], b"/* caf\xe9 */ url(a,1.png)");
    }

    #[test]
    fn test_empty_map_is_noop() {
        let r = rewriter(&[]);
        assert!(r.is_empty());
        assert_eq!(r.rewrite("anything"), "anything");
    }

    #[test]
    fn test_text_asset_policy() {
        let policy = TextAssetPolicy::default();
        assert!(policy.is_text_asset(Path::new("/p/Site.CSS")));
        assert!(policy.is_text_asset(Path::new("/p/app.js")));
        assert!(!policy.is_text_asset(Path::new("/p/logo.png")));
        assert!(!policy.is_text_asset(Path::new("/p/Makefile")));
    }
}
