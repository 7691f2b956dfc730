//! Resource collection from raw input file lists

use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use crate::filter::ResourceFilter;
use crate::naming::is_hashed_file_name;
use crate::paths::{escapes_root, is_within, normalize, relative_path, to_slash};
use crate::pipeline::PipelineError;
use crate::resource::Resource;

/// Turns candidate paths into [`Resource`] records
///
/// Both entry points are lazy; nothing is read from disk.
pub struct ResourceCollector {
    project_dir: PathBuf,
    filter: ResourceFilter,
    skip_dir: Option<PathBuf>,
}

impl ResourceCollector {
    pub fn new(project_dir: impl Into<PathBuf>, filter: ResourceFilter) -> Self {
        Self {
            project_dir: normalize(&project_dir.into()),
            filter,
            skip_dir: None,
        }
    }

    /// Treat `dir` as the output directory
    ///
    /// Fingerprinted files under it are previous outputs and are ignored;
    /// any other candidate under it is rejected.
    pub fn skip_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.skip_dir = Some(normalize(&dir.into()));
        self
    }

    /// Collect resources bound for embedding into `assembly`
    ///
    /// Names are `{namespace}.{relative path with separators as dots}`.
    pub fn collect_embedded<'a, P: AsRef<Path>>(
        &'a self,
        assembly: &'a str,
        namespace: &'a str,
        files: &'a [P],
    ) -> Result<impl Iterator<Item = Result<Resource, PipelineError>> + 'a, PipelineError> {
        if assembly.trim().is_empty() {
            return Err(PipelineError::InvalidArgument(
                "embedded resources need an assembly name".into(),
            ));
        }
        if namespace.trim().is_empty() {
            return Err(PipelineError::InvalidArgument(
                "embedded resources need a root namespace".into(),
            ));
        }

        Ok(self.candidates(files).map(move |candidate| {
            let (path, relative) = candidate?;
            let name = format!("{}.{}", namespace, to_slash(&relative).replace('/', "."));
            Ok(Resource::embedded(path, relative, name, assembly.to_string()))
        }))
    }

    /// Collect loose content; names are plain file names
    pub fn collect_content<'a, P: AsRef<Path>>(
        &'a self,
        files: &'a [P],
    ) -> impl Iterator<Item = Result<Resource, PipelineError>> + 'a {
        self.candidates(files).map(|candidate| {
            let (path, relative) = candidate?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            Ok(Resource::content(path, relative, name))
        })
    }

    fn candidates<'a, P: AsRef<Path>>(
        &'a self,
        files: &'a [P],
    ) -> impl Iterator<Item = Result<(PathBuf, PathBuf), PipelineError>> + 'a {
        files.iter().filter_map(move |file| {
            let file = file.as_ref();
            if !self.filter.is_resource(&file.to_string_lossy()) {
                return None;
            }

            let path = normalize(&self.project_dir.join(file));
            if let Some(skip) = &self.skip_dir {
                if is_within(&path, skip) {
                    // Previous outputs are skipped; anything else there would
                    // be swept away as an orphan.
                    if is_hashed_file_name(&path) {
                        return None;
                    }
                    return Some(Err(PipelineError::InvalidArgument(format!(
                        "{} lives in the output directory {} and would be deleted",
                        path.display(),
                        skip.display()
                    ))));
                }
            }

            let relative = relative_path(&path, &self.project_dir);
            if relative.as_os_str().is_empty() || escapes_root(&relative) {
                return Some(Err(PipelineError::InvalidArgument(format!(
                    "{} is not inside the project directory {}",
                    path.display(),
                    self.project_dir.display()
                ))));
            }
            Some(Ok((path, relative)))
        })
    }
}

/// Every file under `project_dir`, skipping `skip_dir` and hidden entries
///
/// Used when no explicit content list is supplied. Hidden directories
/// (`.git`, `.vs`, ...) are pruned whole.
pub fn discover_files(
    project_dir: &Path,
    skip_dir: Option<&Path>,
) -> Result<Vec<PathBuf>, PipelineError> {
    let mut files = Vec::new();
    let walker = WalkDir::new(project_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            (e.depth() == 0 || !is_hidden(e))
                && skip_dir.map_or(true, |skip| !is_within(e.path(), skip))
        });
    for entry in walker {
        let entry = entry.map_err(|e| PipelineError::Filesystem {
            action: "scan",
            path: project_dir.to_path_buf(),
            source: e.into(),
        })?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map_or(false, |name| name.starts_with('.'))
}
