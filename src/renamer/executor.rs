use crate::renamer::session::{RenamePlan, ScanSession, VIDEO_NOT_RENAMED};
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Why a single rename did not happen
#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    #[error("destination already exists: {}", .0.display())]
    DestinationExists(PathBuf),

    #[error("source file is missing: {}", .0.display())]
    SourceMissing(PathBuf),

    #[error("permission denied: {0}")]
    PermissionDenied(std::io::Error),

    #[error("IO error: {0}")]
    Io(std::io::Error),
}

impl From<std::io::Error> for ApplyError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            ErrorKind::PermissionDenied => Self::PermissionDenied(e),
            _ => Self::Io(e),
        }
    }
}

/// Performs the renames of a reviewed session
#[derive(Debug, Clone, Default)]
pub struct Executor {
    prune_empty_dirs: bool,
}

impl Executor {
    pub fn new(prune_empty_dirs: bool) -> Self {
        Self { prune_empty_dirs }
    }

    /// Apply every pending plan that changes a path
    pub fn apply(&self, session: ScanSession) -> ScanSession {
        self.apply_with(session, |_, _| {})
    }

    /// Like [`Executor::apply`], calling `on_progress` after each attempted
    /// rename with the plan's index and its final state. A failure never
    /// stops the batch and nothing is rolled back.
    pub fn apply_with<F>(&self, session: ScanSession, on_progress: F) -> ScanSession
    where
        F: FnMut(usize, &RenamePlan),
    {
        self.apply_with_cancel(session, &CancellationToken::new(), on_progress)
    }

    /// Like [`Executor::apply_with`], stopping before the next video once
    /// `cancel` fires. A video's companion files are still moved with it.
    /// Plans not reached stay `Pending`.
    pub fn apply_with_cancel<F>(
        &self,
        mut session: ScanSession,
        cancel: &CancellationToken,
        mut on_progress: F,
    ) -> ScanSession
    where
        F: FnMut(usize, &RenamePlan),
    {
        let mut vacated = BTreeSet::new();
        let mut moved: HashSet<PathBuf> = HashSet::new();

        for (index, plan) in session.plans.iter_mut().enumerate() {
            if plan.sidecar_of.is_none() && cancel.is_cancelled() {
                warn!("Apply interrupted, remaining renames left pending");
                break;
            }
            if !plan.needs_rename() {
                continue;
            }

            if let Some(video) = &plan.sidecar_of
                && !moved.contains(video)
            {
                debug!(path = %plan.original_path.display(), "Video not renamed, leaving companion file");
                plan.mark_failed(VIDEO_NOT_RENAMED);
                on_progress(index, plan);
                continue;
            }

            match Self::rename(&plan.original_path, &plan.proposed_path) {
                Ok(()) => {
                    info!(
                        from = %plan.original_path.display(),
                        to = %plan.proposed_path.display(),
                        "Renamed"
                    );
                    if let Some(parent) = plan.original_path.parent() {
                        vacated.insert(parent.to_path_buf());
                    }
                    moved.insert(plan.original_path.clone());
                    plan.mark_applied();
                }
                Err(e) => {
                    warn!(path = %plan.original_path.display(), error = %e, "Rename failed");
                    plan.mark_failed(e.to_string());
                }
            }

            on_progress(index, plan);
        }

        if self.prune_empty_dirs {
            Self::prune(&session.root, vacated);
        }

        let summary = session.summary();
        info!(
            applied = summary.applied,
            failed = summary.failed,
            pending = summary.to_rename,
            "Apply complete"
        );

        session
    }

    fn rename(source: &Path, destination: &Path) -> Result<(), ApplyError> {
        if fs::symlink_metadata(source).is_err() {
            return Err(ApplyError::SourceMissing(source.to_path_buf()));
        }

        // A case-only rename on a case-insensitive filesystem sees itself
        if fs::symlink_metadata(destination).is_ok() && !Self::same_file(source, destination) {
            return Err(ApplyError::DestinationExists(destination.to_path_buf()));
        }

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::rename(source, destination)?;
        Ok(())
    }

    fn same_file(a: &Path, b: &Path) -> bool {
        match (fs::canonicalize(a), fs::canonicalize(b)) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }

    /// Remove directories left empty by the renames, walking up to the root
    fn prune(root: &Path, vacated: BTreeSet<PathBuf>) {
        // Deepest first so emptied parents are seen after their children
        for dir in vacated.into_iter().rev() {
            let mut current = dir.as_path();
            while current != root && current.starts_with(root) {
                match fs::remove_dir(current) {
                    Ok(()) => debug!(path = %current.display(), "Removed empty directory"),
                    Err(_) => break,
                }
                match current.parent() {
                    Some(parent) => current = parent,
                    None => break,
                }
            }
        }
    }
}
