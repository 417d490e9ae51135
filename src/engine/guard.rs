//! Path Security Guard - resolves manifest globs inside the corpus root.
//!
//! Manifest patterns are untrusted input. They are checked lexically before
//! any filesystem access, and every match is re-checked after symlink
//! resolution so nothing outside the root is ever handed to the loader.

use std::path::{Component, Path, PathBuf};

use glob::{MatchOptions, Pattern};

use crate::error::{CompileError, CompileResult};

/// Reject empty, absolute, or traversing relative paths.
///
/// Applied to glob patterns and to manifest `output_file` values.
pub fn check_relative(pattern: &str) -> CompileResult<()> {
    if pattern.trim().is_empty() {
        return Err(CompileError::security(pattern, "empty path"));
    }
    if pattern.contains('\0') {
        return Err(CompileError::security(pattern, "contains a NUL byte"));
    }
    if pattern.contains('\\') {
        return Err(CompileError::security(
            pattern,
            "backslash separators are not allowed",
        ));
    }

    for component in Path::new(pattern).components() {
        match component {
            Component::ParentDir => {
                return Err(CompileError::security(
                    pattern,
                    "contains a parent-directory traversal segment",
                ))
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(CompileError::security(
                    pattern,
                    "absolute paths are not allowed; use a path relative to the corpus root",
                ))
            }
            Component::CurDir | Component::Normal(_) => {}
        }
    }
    Ok(())
}

/// Expand `pattern` relative to `root`, returning canonical file paths.
///
/// `root` must already be canonical. Results are sorted. Directories are
/// skipped; dot-files only match when the pattern names the dot explicitly.
pub fn resolve_pattern(root: &Path, pattern: &str) -> CompileResult<Vec<PathBuf>> {
    check_relative(pattern)?;

    Pattern::new(pattern).map_err(|e| CompileError::Config {
        agent: None,
        pattern: Some(pattern.to_string()),
        reason: format!("invalid glob: {e}"),
    })?;

    let full = format!(
        "{}/{}",
        Pattern::escape(&root.to_string_lossy()),
        pattern.trim_start_matches("./")
    );
    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: true,
    };

    let entries = glob::glob_with(&full, options).map_err(|e| CompileError::Config {
        agent: None,
        pattern: Some(pattern.to_string()),
        reason: format!("invalid glob: {e}"),
    })?;

    let mut matches = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| {
            let path = e.path().to_path_buf();
            CompileError::io(&path, e.into_error())
        })?;

        let canonical = path.canonicalize().map_err(|e| CompileError::io(&path, e))?;
        if !canonical.starts_with(root) {
            tracing::warn!(
                pattern,
                resolved = %canonical.display(),
                "Glob match escapes corpus root"
            );
            return Err(CompileError::security(
                pattern,
                format!("match {} resolves outside the corpus root", path.display()),
            ));
        }
        if canonical.is_file() {
            matches.push(canonical);
        }
    }

    matches.sort();
    matches.dedup();
    Ok(matches)
}
