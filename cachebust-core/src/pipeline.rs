//! Fingerprinting Pipeline - Single Entry Point
//!
//! Stages run strictly in order; each finishes for every resource before the
//! next starts:
//!
//! collect → hash → name → create directories → copy → rewrite references →
//! delete orphans → publish mapping
//!
//! Per-resource work inside the hash, copy and rewrite stages runs on the
//! rayon pool.

use rayon::prelude::*;
use serde::Serialize;
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;
use walkdir::WalkDir;

use crate::collector::ResourceCollector;
use crate::config::{CopyMode, PipelineConfig};
use crate::encoding::DigestEncoder;
use crate::filter::ResourceFilter;
use crate::hashing::{hex, sha256_file};
use crate::log::{Importance, Logger, NullLogger};
use crate::mapping::{build_entries, JsonMappingWriter, MappingSettings, MappingSink};
use crate::naming::hashed_file_name;
use crate::paths::{relative_path, to_slash};
use crate::resource::ResourceCollection;
use crate::rewrite::{ReferenceRewriter, TextAssetPolicy};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Cannot read source {}: {source}", path.display())]
    SourceRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to {action} {}: {source}", path.display())]
    Filesystem {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Precondition violated: {0}")]
    PreconditionViolation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// What a completed run did
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub resources: ResourceCollection,
    pub copied: usize,
    pub skipped: usize,
    pub rewritten: usize,
    pub orphans_deleted: Vec<PathBuf>,
    pub mapping_published: bool,
}

/// The fingerprinting pipeline
pub struct FingerprintPipeline {
    config: PipelineConfig,
    encoder: DigestEncoder,
    logger: Arc<dyn Logger>,
    mapping_sink: Option<Box<dyn MappingSink>>,
}

impl FingerprintPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            encoder: DigestEncoder::default(),
            logger: Arc::new(NullLogger),
            mapping_sink: None,
        }
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_encoder(mut self, encoder: DigestEncoder) -> Self {
        self.encoder = encoder;
        self
    }

    /// Replace the JSON writer implied by `mappingPath`
    pub fn with_mapping_sink(mut self, sink: Box<dyn MappingSink>) -> Self {
        self.mapping_sink = Some(sink);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage
    pub fn run(&self) -> Result<RunReport, PipelineError> {
        self.config.validate()?;
        let root = self.config.project_root()?;
        let output_root = self.config.output_root()?;
        let text_policy = TextAssetPolicy::new(&self.config.text_extensions);

        let mut resources = self.collect(&root, &output_root)?;
        self.hash_resources(&mut resources)?;
        self.assign_hashed_paths(&mut resources, &root, &output_root)?;
        self.create_directories(&resources)?;
        let (copied, skipped) = self.copy_resources(&resources, &text_policy)?;
        let rewritten = self.rewrite_references(&resources, &output_root, &text_policy)?;
        let orphans_deleted = self.delete_orphans(&resources, &output_root)?;
        let mapping_published = self.publish_mapping(&resources)?;

        self.log(
            Importance::High,
            format!(
                "Fingerprinted {} resources: {} copied, {} up to date, {} rewritten, {} orphans deleted.",
                resources.len(),
                copied,
                skipped,
                rewritten,
                orphans_deleted.len()
            ),
        );

        Ok(RunReport {
            resources,
            copied,
            skipped,
            rewritten,
            orphans_deleted,
            mapping_published,
        })
    }

    /// Collect, hash and name without writing anything
    pub fn plan(&self) -> Result<ResourceCollection, PipelineError> {
        self.config.validate()?;
        let root = self.config.project_root()?;
        let output_root = self.config.output_root()?;

        let mut resources = self.collect(&root, &output_root)?;
        self.hash_resources(&mut resources)?;
        self.assign_hashed_paths(&mut resources, &root, &output_root)?;
        Ok(resources)
    }

    fn log(&self, importance: Importance, message: impl AsRef<str>) {
        self.logger.log(importance, message.as_ref());
    }

    fn collect(&self, root: &Path, output_root: &Path) -> Result<ResourceCollection, PipelineError> {
        self.log(
            Importance::High,
            format!("Collecting static resources from \"{}\"", root.display()),
        );

        let filter = ResourceFilter::new(&self.config.extensions)
            .with_exclusions(&self.config.exclusions);
        let collector = ResourceCollector::new(root, filter).skip_directory(output_root);
        let mut resources = ResourceCollection::new();

        if !self.config.embedded_resources.is_empty() {
            let assembly = self.config.assembly_name.as_deref().unwrap_or_default();
            let namespace = self.config.root_namespace.as_deref().unwrap_or_default();
            let embedded =
                collector.collect_embedded(assembly, namespace, &self.config.embedded_resources)?;
            for resource in embedded {
                resources.push(resource?);
            }
        }
        for resource in collector.collect_content(&self.config.content) {
            resources.push(resource?);
        }

        let candidates = self.config.embedded_resources.len() + self.config.content.len();
        if candidates == 0 {
            self.log(Importance::Normal, "There are no content items to process");
        } else if candidates > resources.len() {
            self.log(
                Importance::Low,
                format!(
                    "Skipped {} candidates that are not manageable static files.",
                    candidates - resources.len()
                ),
            );
        }
        self.log(
            Importance::High,
            format!("Collected \"{}\" static resources.", resources.len()),
        );
        Ok(resources)
    }

    fn hash_resources(&self, resources: &mut ResourceCollection) -> Result<(), PipelineError> {
        resources.as_mut_slice().par_iter_mut().try_for_each(|resource| {
            if resource.content_hash.is_some() {
                return Ok(());
            }
            self.log(
                Importance::Normal,
                format!("Computing the SHA256 hash of \"{}\".", resource.path.display()),
            );
            let digest = sha256_file(&resource.path).map_err(|source| {
                PipelineError::SourceRead {
                    path: resource.path.clone(),
                    source,
                }
            })?;
            self.log(
                Importance::Low,
                format!(
                    "Encoding the SHA256 hash of \"{}\" [{}].",
                    resource.path.display(),
                    hex::encode(digest)
                ),
            );
            resource.content_hash = Some(self.encoder.encode(&digest));
            Ok(())
        })
    }

    fn assign_hashed_paths(
        &self,
        resources: &mut ResourceCollection,
        root: &Path,
        output_root: &Path,
    ) -> Result<(), PipelineError> {
        for resource in resources.iter_mut() {
            if resource.hashed_path.is_some() {
                continue;
            }
            let file_name = hashed_file_name(resource)?;
            let mut hashed = output_root.to_path_buf();
            if let Some(dir) = resource.relative_path.parent() {
                hashed.push(dir);
            }
            hashed.push(file_name);

            self.log(
                Importance::Low,
                format!(
                    "Computed the new filename of \"{}\": \"{}\".",
                    resource.path.display(),
                    hashed.display()
                ),
            );
            resource.relative_hashed_path = Some(relative_path(&hashed, root));
            resource.hashed_path = Some(hashed);
        }
        Ok(())
    }

    fn create_directories(&self, resources: &ResourceCollection) -> Result<(), PipelineError> {
        let directories: BTreeSet<&Path> = resources
            .iter()
            .filter_map(|r| r.hashed_path())
            .filter_map(Path::parent)
            .collect();

        for directory in directories {
            if directory.is_dir() {
                continue;
            }
            self.log(
                Importance::Normal,
                format!(
                    "Creating directory \"{}\" because it does not exist.",
                    directory.display()
                ),
            );
            fs::create_dir_all(directory).map_err(|source| PipelineError::Filesystem {
                action: "create directory",
                path: directory.to_path_buf(),
                source,
            })?;
        }
        Ok(())
    }

    fn copy_resources(
        &self,
        resources: &ResourceCollection,
        text_policy: &TextAssetPolicy,
    ) -> Result<(usize, usize), PipelineError> {
        let jobs = distinct_outputs(resources);
        let copied = AtomicUsize::new(0);
        let skipped = AtomicUsize::new(0);

        jobs.par_iter().try_for_each(|(source, destination)| -> Result<(), PipelineError> {
            if self.config.copy_mode == CopyMode::IfNewer
                && !text_policy.is_text_asset(source)
                && is_up_to_date(source, destination)
            {
                self.log(
                    Importance::Normal,
                    format!("Skipping \"{}\" because it is up to date.", destination.display()),
                );
                skipped.fetch_add(1, Ordering::Relaxed);
                return Ok(());
            }

            self.log(
                Importance::Normal,
                format!(
                    "Copying \"{}\" to \"{}\".",
                    source.display(),
                    destination.display()
                ),
            );
            fs::copy(source, destination).map_err(|source| PipelineError::Filesystem {
                action: "copy to",
                path: destination.to_path_buf(),
                source,
            })?;
            copied.fetch_add(1, Ordering::Relaxed);
            Ok(())
        })?;

        Ok((copied.into_inner(), skipped.into_inner()))
    }

    /// Original relative path → hashed path relative to the output directory
    ///
    /// The output tree mirrors the source tree, so a reference that was
    /// relative between two sources stays relative between their outputs.
    fn rename_map(
        &self,
        resources: &ResourceCollection,
        output_root: &Path,
    ) -> BTreeMap<String, String> {
        resources
            .iter()
            .filter_map(|r| {
                let hashed = r.hashed_path()?;
                Some((
                    to_slash(&r.relative_path),
                    to_slash(&relative_path(hashed, output_root)),
                ))
            })
            .collect()
    }

    fn rewrite_references(
        &self,
        resources: &ResourceCollection,
        output_root: &Path,
        text_policy: &TextAssetPolicy,
    ) -> Result<usize, PipelineError> {
        let map = self.rename_map(resources, output_root);
        let rewriter = ReferenceRewriter::new(&map)?;
        let targets: Vec<&Path> = distinct_outputs(resources)
            .into_iter()
            .map(|(_, destination)| destination)
            .filter(|destination| text_policy.is_text_asset(destination))
            .collect();

        self.log(
            Importance::High,
            format!(
                "Rewriting references in {} text assets ({} renames).",
                targets.len(),
                rewriter.len()
            ),
        );
        if rewriter.is_empty() {
            return Ok(0);
        }

        let rewritten = AtomicUsize::new(0);
        targets.par_iter().try_for_each(|destination| -> Result<(), PipelineError> {
            let original = fs::read(destination).map_err(|source| PipelineError::Filesystem {
                action: "read",
                path: destination.to_path_buf(),
                source,
            })?;

            if let Cow::Owned(updated) = rewriter.rewrite_bytes(&original) {
                if updated != original {
                    self.log(
                        Importance::Normal,
                        format!("Rewriting references in \"{}\".", destination.display()),
                    );
                    fs::write(destination, &updated).map_err(|source| {
                        PipelineError::Filesystem {
                            action: "write",
                            path: destination.to_path_buf(),
                            source,
                        }
                    })?;
                    rewritten.fetch_add(1, Ordering::Relaxed);
                }
            }
            Ok(())
        })?;

        Ok(rewritten.into_inner())
    }

    fn delete_orphans(
        &self,
        resources: &ResourceCollection,
        output_root: &Path,
    ) -> Result<Vec<PathBuf>, PipelineError> {
        if !output_root.is_dir() {
            return Ok(Vec::new());
        }

        let keep = resources.hashed_paths();
        let mut orphans = Vec::new();
        for entry in WalkDir::new(output_root) {
            let entry = entry.map_err(|e| PipelineError::Filesystem {
                action: "scan",
                path: output_root.to_path_buf(),
                source: e.into(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            if !keep.contains(&entry.path().to_string_lossy().to_lowercase()) {
                orphans.push(entry.into_path());
            }
        }

        for orphan in &orphans {
            self.log(
                Importance::Normal,
                format!("Deleting \"{}\" because it is an orphan.", orphan.display()),
            );
            fs::remove_file(orphan).map_err(|source| PipelineError::Filesystem {
                action: "delete",
                path: orphan.clone(),
                source,
            })?;
        }
        Ok(orphans)
    }

    fn publish_mapping(&self, resources: &ResourceCollection) -> Result<bool, PipelineError> {
        let fallback;
        let sink: &dyn MappingSink = match (&self.mapping_sink, self.config.mapping_file()?) {
            (Some(sink), _) => sink.as_ref(),
            (None, Some(path)) => {
                fallback = JsonMappingWriter::new(path);
                &fallback
            }
            (None, None) => return Ok(false),
        };

        let settings = MappingSettings {
            force_lowercase: self.config.force_lowercase,
            cdn_base_uri: self.config.cdn_base_uri.clone(),
        };
        let entries = build_entries(resources, &settings)?;
        self.log(
            Importance::High,
            format!("Publishing the mapping of {} resources.", entries.len()),
        );
        sink.publish(&entries)?;
        Ok(true)
    }
}

/// (source, destination) pairs with every destination listed once
fn distinct_outputs(resources: &ResourceCollection) -> Vec<(&Path, &Path)> {
    let mut seen = HashSet::new();
    resources
        .iter()
        .filter_map(|r| Some((r.path.as_path(), r.hashed_path()?)))
        .filter(|(_, destination)| seen.insert(*destination))
        .collect()
}

fn is_up_to_date(source: &Path, destination: &Path) -> bool {
    let modified = |path: &Path| fs::metadata(path).and_then(|m| m.modified()).ok();
    match (modified(source), modified(destination)) {
        (Some(source), Some(destination)) => destination >= source,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingLogger {
        lines: Mutex<Vec<(Importance, String)>>,
    }

    impl Logger for RecordingLogger {
        fn log(&self, importance: Importance, message: &str) {
            self.lines.lock().unwrap().push((importance, message.to_string()));
        }
    }

    fn project() -> (tempfile::TempDir, PipelineConfig) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("site.css"), "body{background:url(logo.png)}").unwrap();
        fs::write(dir.path().join("logo.png"), [0x89, 0x50, 0x4e, 0x47]).unwrap();
        let mut config = PipelineConfig::new(dir.path());
        config.content = vec![dir.path().join("site.css"), dir.path().join("logo.png")];
        (dir, config)
    }

    #[test]
    fn test_plan_writes_nothing() {
        let (dir, config) = project();
        let resources = FingerprintPipeline::new(config).plan().unwrap();

        assert_eq!(resources.len(), 2);
        assert!(resources.iter().all(|r| r.hashed_path.is_some()));
        assert!(!dir.path().join("static").exists());
    }

    #[test]
    fn test_logger_sees_stage_summaries() {
        let (_dir, config) = project();
        let logger = Arc::new(RecordingLogger::default());
        FingerprintPipeline::new(config)
            .with_logger(logger.clone())
            .run()
            .unwrap();

        let lines = logger.lines.lock().unwrap();
        assert!(lines
            .iter()
            .any(|(i, l)| *i == Importance::High && l.starts_with("Collected \"2\"")));
        assert!(lines
            .iter()
            .any(|(i, l)| *i == Importance::Low && l.starts_with("Encoding the SHA256 hash")));
    }

    #[test]
    fn test_missing_source_is_source_read_failure() {
        let (dir, mut config) = project();
        config.content.push(dir.path().join("gone.js"));
        let err = FingerprintPipeline::new(config).run().unwrap_err();
        assert!(matches!(err, PipelineError::SourceRead { .. }));
    }

    #[test]
    fn test_duplicate_entries_copy_once() {
        let (dir, mut config) = project();
        config.content.push(dir.path().join("logo.png"));
        let report = FingerprintPipeline::new(config).run().unwrap();

        assert_eq!(report.resources.len(), 3);
        assert_eq!(report.copied, 2);
    }

    #[test]
    fn test_rename_map_is_relative_to_output_dir() {
        let (_dir, config) = project();
        let pipeline = FingerprintPipeline::new(config);
        let resources = pipeline.plan().unwrap();
        let output_root = pipeline.config().output_root().unwrap();

        let map = pipeline.rename_map(&resources, &output_root);
        let logo = &map["logo.png"];
        assert!(logo.starts_with("logo,") && logo.ends_with(".png"));
        assert!(!logo.contains('/'));
    }
}
