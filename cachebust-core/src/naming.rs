//! Naming policy for fingerprinted files
//!
//! `site.css` with token `k3x9` becomes `site,k3x9.css`. The comma keeps the
//! token apart from dot-separated extension conventions.

use std::path::Path;

use crate::pipeline::PipelineError;
use crate::resource::Resource;

pub const HASH_SEPARATOR: char = ',';

/// Build the fingerprinted file name of a hashed resource
pub fn hashed_file_name(resource: &Resource) -> Result<String, PipelineError> {
    let hash = resource
        .content_hash
        .as_deref()
        .filter(|hash| !hash.is_empty())
        .ok_or_else(|| {
            PipelineError::PreconditionViolation(format!(
                "resource {} has no content hash yet",
                resource.path.display()
            ))
        })?;

    let stem = resource
        .path
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();

    Ok(match resource.path.extension() {
        Some(ext) => format!("{}{}{}.{}", stem, HASH_SEPARATOR, hash, ext.to_string_lossy()),
        None => format!("{}{}{}", stem, HASH_SEPARATOR, hash),
    })
}

/// True when `path` names a file of the `{stem},{token}.{ext}` form
///
/// The token must be non-empty ASCII alphanumerics, as every encoder alphabet
/// used for output names is.
pub fn is_hashed_file_name(path: &Path) -> bool {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .and_then(|stem| stem.rsplit_once(HASH_SEPARATOR))
        .map_or(false, |(original, token)| {
            !original.is_empty()
                && !token.is_empty()
                && token.chars().all(|c| c.is_ascii_alphanumeric())
        })
}
