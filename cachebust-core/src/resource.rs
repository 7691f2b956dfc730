//! Resources under management and the collection that holds them

use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

/// One static asset
///
/// Created by the collector; the hash and naming stages fill in
/// `content_hash`, `hashed_path` and `relative_hashed_path` exactly once.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assembly: Option<String>,
    pub path: PathBuf,
    pub relative_path: PathBuf,
    pub content_hash: Option<String>,
    pub hashed_path: Option<PathBuf>,
    pub relative_hashed_path: Option<PathBuf>,
}

impl Resource {
    /// A loose resource deployed as a plain file
    pub fn content(path: PathBuf, relative_path: PathBuf, name: String) -> Self {
        Self {
            name,
            assembly: None,
            path,
            relative_path,
            content_hash: None,
            hashed_path: None,
            relative_hashed_path: None,
        }
    }

    /// A resource bound for embedding into `assembly`
    pub fn embedded(
        path: PathBuf,
        relative_path: PathBuf,
        name: String,
        assembly: String,
    ) -> Self {
        Self {
            assembly: Some(assembly),
            ..Self::content(path, relative_path, name)
        }
    }

    pub fn is_embedded(&self) -> bool {
        self.assembly
            .as_deref()
            .map_or(false, |assembly| !assembly.trim().is_empty())
    }

    pub fn hashed_path(&self) -> Option<&Path> {
        self.hashed_path.as_deref()
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Name: {}, Assembly: {}, RelativePath: {}",
            self.name,
            self.assembly.as_deref().unwrap_or(""),
            self.relative_path.display()
        )
    }
}

/// A set of resources
///
/// Every pushed `Resource` is its own member: two records pointing at the
/// same file are still two resources.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct ResourceCollection {
    resources: Vec<Resource>,
}

impl ResourceCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, resource: Resource) {
        self.resources.push(resource);
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Resource> {
        self.resources.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Resource> {
        self.resources.iter_mut()
    }

    pub fn as_mut_slice(&mut self) -> &mut [Resource] {
        &mut self.resources
    }

    /// Lower-cased hashed paths of every resource that has one
    pub fn hashed_paths(&self) -> HashSet<String> {
        self.resources
            .iter()
            .filter_map(Resource::hashed_path)
            .map(|p| p.to_string_lossy().to_lowercase())
            .filter(|p| !p.trim().is_empty())
            .collect()
    }
}

impl Extend<Resource> for ResourceCollection {
    fn extend<I: IntoIterator<Item = Resource>>(&mut self, iter: I) {
        self.resources.extend(iter);
    }
}

impl FromIterator<Resource> for ResourceCollection {
    fn from_iter<I: IntoIterator<Item = Resource>>(iter: I) -> Self {
        Self {
            resources: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ResourceCollection {
    type Item = Resource;
    type IntoIter = std::vec::IntoIter<Resource>;

    fn into_iter(self) -> Self::IntoIter {
        self.resources.into_iter()
    }
}

impl<'a> IntoIterator for &'a ResourceCollection {
    type Item = &'a Resource;
    type IntoIter = std::slice::Iter<'a, Resource>;

    fn into_iter(self) -> Self::IntoIter {
        self.resources.iter()
    }
}
