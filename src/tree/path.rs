//! Node path parsing and resolution.
//!
//! Store paths are relative to the root and never start with a separator:
//! `""` is the root, `"ui/window"` is two levels down. Facade paths are the
//! same strings rendered with a leading `/`.

use crate::error::{PrefsError, PrefsResult};

pub const SEPARATOR: char = '/';

/// Split a store path into its segments. The root path yields no segments.
pub fn segments(path: &str) -> PrefsResult<Vec<&str>> {
    if path.is_empty() {
        return Ok(Vec::new());
    }
    let parts: Vec<&str> = path.split(SEPARATOR).collect();
    if parts.iter().any(|part| part.is_empty()) {
        return Err(PrefsError::InvalidPath {
            path: path.to_string(),
            reason: "path segments must not be empty".to_string(),
        });
    }
    Ok(parts)
}

/// Join a child name or relative path onto a store path.
pub fn join(parent: &str, child: &str) -> String {
    if parent.is_empty() {
        child.to_string()
    } else if child.is_empty() {
        parent.to_string()
    } else {
        format!("{}{}{}", parent, SEPARATOR, child)
    }
}

/// Resolve `relative` against the store path `base`.
///
/// A leading `/` makes `relative` absolute, `""` resolves to `base` itself.
pub fn resolve(base: &str, relative: &str) -> PrefsResult<String> {
    let (start, rest) = match relative.strip_prefix(SEPARATOR) {
        Some(rest) => ("", rest),
        None => (base, relative),
    };
    if !rest.is_empty() {
        segments(rest).map_err(|_| PrefsError::InvalidPath {
            path: relative.to_string(),
            reason: "path segments must not be empty".to_string(),
        })?;
    }
    Ok(join(start, rest))
}

/// Canonical `/`-rooted rendering of a store path.
pub fn absolute(path: &str) -> String {
    format!("{}{}", SEPARATOR, path)
}

/// Last segment of a store path, `""` for the root.
pub fn name(path: &str) -> &str {
    path.rsplit(SEPARATOR).next().unwrap_or("")
}

/// Store path of the parent node, `None` for the root.
pub fn parent(path: &str) -> Option<&str> {
    if path.is_empty() {
        return None;
    }
    Some(path.rfind(SEPARATOR).map_or("", |idx| &path[..idx]))
}
