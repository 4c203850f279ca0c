// ABOUTME: Per-execution directory store: allocation, uploads, snapshots, file resolution
// ABOUTME: All filesystem access is confined to the upload root; ids and names are sanitized

use crate::error::{Result, SandboxError};
use bytes::Bytes;
use crucible_core::protocol::{CreatedExecution, ExecutionListing};
use crucible_core::tree::{FileNode, TreeStats};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tracing::{debug, info, warn};
use uuid::Uuid;
use walkdir::WalkDir;

/// One file received in a multipart upload.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub data: Bytes,
}

/// Owns the upload root and every execution directory beneath it.
#[derive(Debug)]
pub struct ExecutionStore {
    upload_root: PathBuf,
}

impl ExecutionStore {
    pub fn new(upload_root: impl Into<PathBuf>) -> Self {
        Self {
            upload_root: upload_root.into(),
        }
    }

    pub fn upload_root(&self) -> &Path {
        &self.upload_root
    }

    /// Allocate a fresh execution directory and write the uploaded files into
    /// it under sanitized names. Files with unusable names are skipped.
    pub async fn create_execution(&self, files: Vec<UploadedFile>) -> Result<CreatedExecution> {
        if files.is_empty() {
            return Err(SandboxError::NoFilesProvided);
        }

        let execution_id = Uuid::new_v4().to_string();
        let dir = self.upload_root.join(&execution_id);
        debug!("Creating execution directory {}", dir.display());
        tokio::fs::create_dir_all(&dir).await?;

        let mut saved_files = Vec::new();
        for file in files {
            let Some(name) = sanitize_filename(&file.name) else {
                warn!("Skipping upload with unusable filename: {:?}", file.name);
                continue;
            };
            tokio::fs::write(dir.join(&name), &file.data).await?;
            saved_files.push(name);
        }

        info!(
            "Created execution {} with {} file(s)",
            execution_id,
            saved_files.len()
        );

        Ok(CreatedExecution {
            execution_id,
            directory: dir.to_string_lossy().into_owned(),
            saved_files,
        })
    }

    /// Resolve an execution id to its directory, failing when it is unknown.
    pub fn execution_dir(&self, execution_id: &str) -> Result<PathBuf> {
        validate_execution_id(execution_id)?;
        let dir = self.upload_root.join(execution_id);
        if !dir.is_dir() {
            return Err(SandboxError::ExecutionNotFound {
                execution_id: execution_id.to_string(),
            });
        }
        Ok(dir)
    }

    /// Resolve a relative path inside an execution directory to a readable
    /// file. The resolved path is canonicalized and must stay under the
    /// canonicalized execution directory; escapes are rejected before any
    /// read happens.
    pub fn resolve_file(&self, execution_id: &str, relative: &str) -> Result<PathBuf> {
        let dir = self.execution_dir(execution_id)?;
        let requested = dir.join(relative);

        let canonical_dir = dir.canonicalize()?;
        let canonical_requested = requested.canonicalize().map_err(|_| {
            SandboxError::FileNotFound {
                path: relative.to_string(),
            }
        })?;

        if !canonical_requested.starts_with(&canonical_dir) {
            warn!(
                "Attempted path traversal out of execution {}: {}",
                execution_id,
                requested.display()
            );
            return Err(SandboxError::PathOutsideExecution);
        }

        if !canonical_requested.is_file() {
            return Err(SandboxError::FileNotFound {
                path: relative.to_string(),
            });
        }

        Ok(canonical_requested)
    }

    /// Build the recursive, name-sorted snapshot of an execution directory
    /// together with its aggregate stats.
    pub async fn snapshot(&self, execution_id: &str) -> Result<ExecutionListing> {
        let dir = self.execution_dir(execution_id)?;
        let id = execution_id.to_string();
        let walk_dir = dir.clone();

        let (structure, stats) = tokio::task::spawn_blocking(
            move || -> std::io::Result<(FileNode, TreeStats)> {
                let structure = build_node(&walk_dir)?;
                let stats = compute_stats(&walk_dir, &id)?;
                Ok((structure, stats))
            },
        )
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))??;

        Ok(ExecutionListing {
            structure,
            stats,
            directory: dir.to_string_lossy().into_owned(),
        })
    }
}

fn validate_execution_id(execution_id: &str) -> Result<()> {
    if execution_id.is_empty()
        || execution_id == "."
        || execution_id == ".."
        || execution_id.contains(['/', '\\'])
    {
        return Err(SandboxError::InvalidExecutionId {
            execution_id: execution_id.to_string(),
        });
    }
    Ok(())
}

/// Reduce an uploaded filename to a safe base name: final path component
/// only, unsafe characters replaced, leading dots stripped. `None` when
/// nothing usable remains.
pub fn sanitize_filename(raw: &str) -> Option<String> {
    let base = Path::new(raw).file_name().and_then(|n| n.to_str())?;
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

fn build_node(path: &Path) -> std::io::Result<FileNode> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned());

    let metadata = fs::metadata(path)?;
    if metadata.is_dir() {
        let mut paths: Vec<PathBuf> = fs::read_dir(path)?
            .collect::<std::io::Result<Vec<_>>>()?
            .into_iter()
            .map(|entry| entry.path())
            .collect();
        paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        let children = paths
            .iter()
            .map(|p| build_node(p))
            .collect::<std::io::Result<Vec<_>>>()?;

        Ok(FileNode::Directory { name, children })
    } else {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_string);
        Ok(FileNode::File {
            name,
            size: metadata.len(),
            extension,
        })
    }
}

fn compute_stats(dir: &Path, execution_id: &str) -> std::io::Result<TreeStats> {
    let mut total_files = 0u64;
    let mut total_size = 0u64;
    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.file_type().is_file() {
            total_files += 1;
            total_size += entry.metadata().map_err(std::io::Error::from)?.len();
        }
    }

    let metadata = fs::metadata(dir)?;
    let created = metadata.created().or_else(|_| metadata.modified())?;
    let created_time = created
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0);

    Ok(TreeStats {
        total_files,
        total_size,
        execution_id: execution_id.to_string(),
        created_time,
    })
}
