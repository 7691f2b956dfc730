//! Lexical path helpers
//!
//! Nothing here touches the filesystem; every function is a pure mapping over
//! path components.

use std::path::{Component, Path, PathBuf};

/// Fold `.` and `..` components without consulting the filesystem
///
/// `..` directly under a root is dropped; leading `..` of a relative path is
/// kept.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    out.iter().map(|c| c.as_os_str()).collect()
}

/// Path of `path` relative to `root`
///
/// Components `root` has beyond the shared prefix turn into `..`. A relative
/// `path` is taken to be root-relative already and comes back normalized; an
/// absolute path on a different prefix (another drive) comes back unchanged,
/// since joining it onto `root` yields it again.
pub fn relative_path(path: &Path, root: &Path) -> PathBuf {
    let path = normalize(path);
    if path.is_relative() {
        return path;
    }
    let root = normalize(root);

    let mut path_components = path.components().peekable();
    let mut root_components = root.components().peekable();

    match (path_components.peek(), root_components.peek()) {
        (Some(a), Some(b)) if a == b => {}
        _ => return path,
    }

    while let (Some(a), Some(b)) = (path_components.peek(), root_components.peek()) {
        if a != b {
            break;
        }
        path_components.next();
        root_components.next();
    }

    let mut relative = PathBuf::new();
    for _ in root_components {
        relative.push("..");
    }
    for component in path_components {
        relative.push(component.as_os_str());
    }
    relative
}

/// True when `path` escapes its base through a leading `..`
pub fn escapes_root(relative: &Path) -> bool {
    matches!(relative.components().next(), Some(Component::ParentDir))
        || relative.is_absolute()
}

/// Render a relative path with `/` separators regardless of platform
pub fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// True when `path` lies inside `dir` (lexically, case-insensitive)
pub fn is_within(path: &Path, dir: &Path) -> bool {
    let path = normalize(path);
    let dir = normalize(dir);
    let mut inner = path.components();
    for expected in dir.components() {
        match inner.next() {
            Some(actual) if eq_ignore_case(actual.as_os_str(), expected.as_os_str()) => {}
            _ => return false,
        }
    }
    true
}

fn eq_ignore_case(a: &std::ffi::OsStr, b: &std::ffi::OsStr) -> bool {
    a.to_string_lossy().to_lowercase() == b.to_string_lossy().to_lowercase()
}
