//! Pipeline configuration
//!
//! Loaded from JSON (camelCase keys) or built in code. Everything except
//! `projectDir` has a default.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::paths::{is_within, normalize};
use crate::pipeline::PipelineError;
use crate::rewrite::DEFAULT_TEXT_EXTENSIONS;

/// Images, stylesheets, scripts and fonts
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "svg", "ico", "webp", "css", "js", "woff", "woff2", "ttf", "eot",
    "otf",
];

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum CopyMode {
    /// Overwrite every output on every run
    #[default]
    Always,
    /// Skip binary outputs whose destination is at least as new as the source
    IfNewer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineConfig {
    pub project_dir: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub content: Vec<PathBuf>,
    #[serde(default)]
    pub embedded_resources: Vec<PathBuf>,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub exclusions: Vec<String>,
    #[serde(default = "default_text_extensions")]
    pub text_extensions: Vec<String>,
    #[serde(default)]
    pub force_lowercase: bool,
    #[serde(default)]
    pub assembly_name: Option<String>,
    #[serde(default)]
    pub root_namespace: Option<String>,
    #[serde(default)]
    pub mapping_path: Option<PathBuf>,
    #[serde(default)]
    pub cdn_base_uri: Option<String>,
    #[serde(default)]
    pub copy_mode: CopyMode,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("static")
}

fn default_extensions() -> Vec<String> {
    DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect()
}

fn default_text_extensions() -> Vec<String> {
    DEFAULT_TEXT_EXTENSIONS.iter().map(|e| e.to_string()).collect()
}

impl PipelineConfig {
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
            output_dir: default_output_dir(),
            content: Vec::new(),
            embedded_resources: Vec::new(),
            extensions: default_extensions(),
            exclusions: Vec::new(),
            text_extensions: default_text_extensions(),
            force_lowercase: false,
            assembly_name: None,
            root_namespace: None,
            mapping_path: None,
            cdn_base_uri: None,
            copy_mode: CopyMode::default(),
        }
    }

    /// Read a JSON config; a relative `projectDir` is taken relative to the
    /// config file's own directory
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let raw = fs::read_to_string(path).map_err(|source| PipelineError::Filesystem {
            action: "read config",
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self = serde_json::from_str(&raw)?;
        if config.project_dir.is_relative() {
            let base = path.parent().unwrap_or_else(|| Path::new(""));
            config.project_dir = base.join(&config.project_dir);
        }
        Ok(config)
    }

    /// Absolute, normalized project root
    pub fn project_root(&self) -> Result<PathBuf, PipelineError> {
        if self.project_dir.as_os_str().is_empty() {
            return Err(PipelineError::InvalidArgument(
                "project directory is empty".into(),
            ));
        }
        let absolute = std::path::absolute(&self.project_dir).map_err(|source| {
            PipelineError::Filesystem {
                action: "resolve",
                path: self.project_dir.clone(),
                source,
            }
        })?;
        Ok(normalize(&absolute))
    }

    /// Absolute output directory under the project root
    pub fn output_root(&self) -> Result<PathBuf, PipelineError> {
        Ok(normalize(&self.project_root()?.join(&self.output_dir)))
    }

    /// Absolute mapping artifact path, if one is configured
    pub fn mapping_file(&self) -> Result<Option<PathBuf>, PipelineError> {
        match &self.mapping_path {
            Some(path) if !path.as_os_str().is_empty() => {
                Ok(Some(normalize(&self.project_root()?.join(path))))
            }
            _ => Ok(None),
        }
    }

    /// Reject configurations that must not reach any I/O
    pub fn validate(&self) -> Result<(), PipelineError> {
        self.project_root()?;

        let output_dir = &self.output_dir;
        if output_dir.as_os_str().is_empty() || normalize(output_dir).as_os_str().is_empty() {
            return Err(PipelineError::InvalidArgument(
                "output directory is empty".into(),
            ));
        }
        if output_dir.is_absolute()
            || output_dir.components().any(|c| {
                matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_))
            })
        {
            return Err(PipelineError::InvalidArgument(format!(
                "output directory {} must be a subdirectory of the project",
                output_dir.display()
            )));
        }

        if !self.embedded_resources.is_empty() {
            let has = |value: &Option<String>| {
                value.as_deref().map_or(false, |v| !v.trim().is_empty())
            };
            if !has(&self.assembly_name) || !has(&self.root_namespace) {
                return Err(PipelineError::InvalidArgument(
                    "embedded resources need both assemblyName and rootNamespace".into(),
                ));
            }
        }

        if let Some(base) = self.cdn_base_uri.as_deref().filter(|b| !b.trim().is_empty()) {
            url::Url::parse(base).map_err(|e| {
                PipelineError::InvalidArgument(format!("invalid CDN base URI {}: {}", base, e))
            })?;
        }

        if let Some(mapping) = self.mapping_file()? {
            if is_within(&mapping, &self.output_root()?) {
                return Err(PipelineError::InvalidArgument(format!(
                    "mapping file {} would be removed as an orphan of the output directory",
                    mapping.display()
                )));
            }
        }

        Ok(())
    }
}
