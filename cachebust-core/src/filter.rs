//! Resource filter - decides from a path string alone whether a file is a
//! manageable static asset.
//!
//! Rules are checked in order; the first that applies decides.

use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    /// Listed in the exclusions
    Excluded,
    /// No extension at all; passed through
    Extensionless,
    /// Extension is in the manageable set
    Manageable,
    /// Extension is not in the manageable set
    Unmanaged,
}

impl FilterDecision {
    pub fn is_included(self) -> bool {
        matches!(self, Self::Extensionless | Self::Manageable)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResourceFilter {
    extensions: HashSet<String>,
    exclusions: Vec<String>,
}

impl ResourceFilter {
    /// Build a filter; extensions may be given with or without a leading dot
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
            exclusions: Vec::new(),
        }
    }

    pub fn with_exclusions<X, S>(mut self, exclusions: X) -> Self
    where
        X: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.exclusions = exclusions
            .into_iter()
            .map(|x| x.as_ref().trim().to_lowercase())
            .filter(|x| !x.is_empty())
            .collect();
        self
    }

    pub fn decide(&self, path: &str) -> FilterDecision {
        let lowered = path.to_lowercase();
        if self.exclusions.iter().any(|x| *x == lowered) {
            return FilterDecision::Excluded;
        }

        match Path::new(path).extension().and_then(|e| e.to_str()) {
            None => FilterDecision::Extensionless,
            Some(ext) if ext.trim().is_empty() => FilterDecision::Extensionless,
            Some(ext) if self.extensions.contains(&ext.to_lowercase()) => {
                FilterDecision::Manageable
            }
            Some(_) => FilterDecision::Unmanaged,
        }
    }

    pub fn is_resource(&self, path: &str) -> bool {
        self.decide(path).is_included()
    }
}

/// Lower-case an extension and strip its leading dot; blank entries vanish
pub fn normalize_extension(extension: &str) -> Option<String> {
    let ext = extension.trim().trim_start_matches('.').to_lowercase();
    (!ext.is_empty()).then_some(ext)
}
