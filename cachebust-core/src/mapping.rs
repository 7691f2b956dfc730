//! Mapping hand-off
//!
//! After a run, every resource is described by a [`MappingEntry`] and handed
//! to a [`MappingSink`]. Runtime lookup tables (original path → hashed URL)
//! are generated from these entries by whoever consumes them.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use url::Url;

use crate::paths::to_slash;
use crate::pipeline::PipelineError;
use crate::resource::{Resource, ResourceCollection};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingEntry {
    pub name: String,
    pub embedded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assembly: Option<String>,
    pub relative_path: String,
    pub relative_hashed_path: String,
    pub url_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cdn_url: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct MappingSettings {
    pub force_lowercase: bool,
    pub cdn_base_uri: Option<String>,
}

/// Forward slashes, optionally lower-cased
pub fn normalize_url_path(relative: &str, force_lowercase: bool) -> String {
    let path = relative.replace('\\', "/");
    if force_lowercase {
        path.to_lowercase()
    } else {
        path
    }
}

impl MappingEntry {
    pub fn from_resource(
        resource: &Resource,
        settings: &MappingSettings,
        cdn_base: Option<&Url>,
    ) -> Result<Self, PipelineError> {
        let relative_hashed = resource.relative_hashed_path.as_deref().ok_or_else(|| {
            PipelineError::PreconditionViolation(format!(
                "resource {} has no hashed path to map",
                resource.path.display()
            ))
        })?;
        let relative_hashed_path = to_slash(relative_hashed);
        let url_path = normalize_url_path(&relative_hashed_path, settings.force_lowercase);

        let cdn_url = match cdn_base {
            Some(base) => Some(
                base.join(&url_path)
                    .map_err(|e| {
                        PipelineError::InvalidArgument(format!(
                            "cannot join {} onto CDN base {}: {}",
                            url_path, base, e
                        ))
                    })?
                    .to_string(),
            ),
            None => None,
        };

        Ok(Self {
            name: resource.name.clone(),
            embedded: resource.is_embedded(),
            assembly: resource.assembly.clone().filter(|_| resource.is_embedded()),
            relative_path: to_slash(&resource.relative_path),
            relative_hashed_path,
            url_path,
            cdn_url,
        })
    }
}

/// Describe every resource, sorted by original relative path
pub fn build_entries(
    resources: &ResourceCollection,
    settings: &MappingSettings,
) -> Result<Vec<MappingEntry>, PipelineError> {
    let cdn_base = match settings.cdn_base_uri.as_deref().filter(|b| !b.trim().is_empty()) {
        Some(base) => Some(Url::parse(base).map_err(|e| {
            PipelineError::InvalidArgument(format!("invalid CDN base URI {}: {}", base, e))
        })?),
        None => None,
    };

    let mut entries = resources
        .iter()
        .map(|r| MappingEntry::from_resource(r, settings, cdn_base.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;
    entries.sort_by(|a, b| {
        a.relative_path
            .cmp(&b.relative_path)
            .then_with(|| a.name.cmp(&b.name))
    });
    Ok(entries)
}

pub trait MappingSink: Send + Sync {
    fn publish(&self, entries: &[MappingEntry]) -> Result<(), PipelineError>;
}

/// Writes the entries as pretty JSON
pub struct JsonMappingWriter {
    path: PathBuf,
}

impl JsonMappingWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl MappingSink for JsonMappingWriter {
    fn publish(&self, entries: &[MappingEntry]) -> Result<(), PipelineError> {
        let mut json = serde_json::to_string_pretty(entries)?;
        json.push('\n');

        // Same bytes already on disk: leave the timestamp alone.
        if fs::read_to_string(&self.path).ok().as_deref() == Some(json.as_str()) {
            return Ok(());
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| PipelineError::Filesystem {
                action: "create directory",
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&self.path, json).map_err(|source| PipelineError::Filesystem {
            action: "write mapping",
            path: self.path.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hashed_resource(relative: &str, hashed: &str) -> Resource {
        let mut resource = Resource::content(
            PathBuf::from("/proj").join(relative),
            PathBuf::from(relative),
            PathBuf::from(relative)
                .file_name()
                .unwrap()
                .to_string_lossy()
                .into_owned(),
        );
        resource.relative_hashed_path = Some(PathBuf::from(hashed));
        resource
    }

    #[test]
    fn test_entry_fields() {
        let resource = hashed_resource("css/Site.css", "static/css/Site,k2.css");
        let entry =
            MappingEntry::from_resource(&resource, &MappingSettings::default(), None).unwrap();

        assert_eq!(entry.name, "Site.css");
        assert!(!entry.embedded);
        assert_eq!(entry.relative_path, "css/Site.css");
        assert_eq!(entry.url_path, "static/css/Site,k2.css");
        assert_eq!(entry.cdn_url, None);
    }

    #[test]
    fn test_lowercase_and_cdn_join() {
        let resources: ResourceCollection =
            [hashed_resource("img/Logo.PNG", "static/img/Logo,ab.PNG")].into_iter().collect();
        let settings = MappingSettings {
            force_lowercase: true,
            cdn_base_uri: Some("https://cdn.example.com/site/".into()),
        };

        let entries = build_entries(&resources, &settings).unwrap();
        assert_eq!(entries[0].url_path, "static/img/logo,ab.png");
        assert_eq!(
            entries[0].cdn_url.as_deref(),
            Some("https://cdn.example.com/site/static/img/logo,ab.png")
        );
    }

    #[test]
    fn test_unhashed_resource_is_precondition_violation() {
        let resource = Resource::content("/p/a.css".into(), "a.css".into(), "a.css".into());
        let err = MappingEntry::from_resource(&resource, &MappingSettings::default(), None)
            .unwrap_err();
        assert!(matches!(err, PipelineError::PreconditionViolation(_)));
    }

    #[test]
    fn test_json_writer_skips_identical_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("obj/mapping.json");
        let writer = JsonMappingWriter::new(&path);
        let entries = vec![MappingEntry::from_resource(
            &hashed_resource("a.css", "static/a,1.css"),
            &MappingSettings::default(),
            None,
        )
        .unwrap()];

        writer.publish(&entries).unwrap();
        let first = fs::metadata(&path).unwrap().modified().unwrap();
        writer.publish(&entries).unwrap();
        let second = fs::metadata(&path).unwrap().modified().unwrap();
        assert_eq!(first, second);

        let parsed: Vec<MappingEntry> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed, entries);
    }
}
