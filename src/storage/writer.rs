//! Package writer - persists compiled packages atomically.
//!
//! Packages are written to a temporary file in the destination directory and
//! renamed into place, so the final path only ever holds a complete file.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::domain::CompiledAgentPackage;
use crate::error::{CompileError, CompileResult};

/// What a write did to the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Created,
    Updated,
    /// Existing file already holds the same content; left untouched.
    Unchanged,
}

impl std::fmt::Display for WriteOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WriteOutcome::Created => write!(f, "created"),
            WriteOutcome::Updated => write!(f, "updated"),
            WriteOutcome::Unchanged => write!(f, "unchanged"),
        }
    }
}

/// Result of comparing a fresh package with the one on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriftStatus {
    UpToDate,
    Stale,
    Missing,
}

impl std::fmt::Display for DriftStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DriftStatus::UpToDate => write!(f, "up to date"),
            DriftStatus::Stale => write!(f, "stale"),
            DriftStatus::Missing => write!(f, "missing"),
        }
    }
}

/// Writes packages below one output directory.
#[derive(Debug, Clone)]
pub struct PackageWriter {
    output_dir: PathBuf,
    force: bool,
}

impl PackageWriter {
    pub fn new(output_dir: impl Into<PathBuf>, force: bool) -> Self {
        Self {
            output_dir: output_dir.into(),
            force,
        }
    }

    /// Destination for a manifest `output_file`.
    pub fn path_for(&self, output_file: &str) -> PathBuf {
        self.output_dir.join(output_file.trim_start_matches("./"))
    }

    pub fn write(&self, package: &CompiledAgentPackage, output_file: &str) -> CompileResult<WriteOutcome> {
        write_package(package, &self.path_for(output_file), self.force)
    }

    pub fn check(&self, package: &CompiledAgentPackage, output_file: &str) -> CompileResult<DriftStatus> {
        check_package(package, &self.path_for(output_file))
    }
}

/// Persist `package` at `output_path`.
///
/// An existing file with different content is only replaced when `force`
/// is set. A file differing only in `build_date`/`version` counts as
/// unchanged.
pub fn write_package(
    package: &CompiledAgentPackage,
    output_path: &Path,
    force: bool,
) -> CompileResult<WriteOutcome> {
    let bytes = package.to_json_bytes()?;

    let outcome = match read_existing(output_path)? {
        None => WriteOutcome::Created,
        Some(existing) if existing == bytes => return Ok(WriteOutcome::Unchanged),
        Some(existing) if same_package_content(&existing, package) => {
            tracing::debug!(path = %output_path.display(), "Only stamp fields differ; keeping existing file");
            return Ok(WriteOutcome::Unchanged);
        }
        Some(_) if !force => {
            return Err(CompileError::Exists {
                path: output_path.to_path_buf(),
            })
        }
        Some(_) => WriteOutcome::Updated,
    };

    write_atomic(output_path, &bytes)?;
    tracing::info!(path = %output_path.display(), outcome = %outcome, "Package written");
    Ok(outcome)
}

/// Compare `package` with the file at `output_path` without writing.
pub fn check_package(package: &CompiledAgentPackage, output_path: &Path) -> CompileResult<DriftStatus> {
    match read_existing(output_path)? {
        None => Ok(DriftStatus::Missing),
        Some(existing) if same_package_content(&existing, package) => Ok(DriftStatus::UpToDate),
        Some(_) => Ok(DriftStatus::Stale),
    }
}

fn read_existing(path: &Path) -> CompileResult<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(CompileError::io(path, e)),
    }
}

fn same_package_content(existing: &[u8], package: &CompiledAgentPackage) -> bool {
    serde_json::from_slice::<CompiledAgentPackage>(existing)
        .map(|old| old.same_content(package))
        .unwrap_or(false)
}

/// Write `bytes` to a temp file beside `path`, fsync, then rename over `path`.
///
/// The temp file is removed on every failure path when it is dropped.
fn write_atomic(path: &Path, bytes: &[u8]) -> CompileResult<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|e| CompileError::io(dir, e))?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".rulecard-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| CompileError::io(dir, e))?;

    tmp.write_all(bytes).map_err(|e| CompileError::io(tmp.path(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| CompileError::io(tmp.path(), e))?;

    tmp.persist(path)
        .map_err(|e| CompileError::io(path, e.error))?;
    Ok(())
}
