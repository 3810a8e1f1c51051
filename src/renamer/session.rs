use crate::scraper::{MediaCandidate, MetadataRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// Reason recorded on plans that would overwrite another plan's target
pub const PATH_COLLISION: &str = "path collision";

/// Reason recorded on companion files whose video is not being renamed
pub const VIDEO_NOT_RENAMED: &str = "video not renamed";

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid session file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Lifecycle of a plan. Moves forward only: `Pending` to `Applied` or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    Pending,
    Applied,
    Failed,
}

impl std::fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Applied => write!(f, "applied"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Proposed rename of one file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenamePlan {
    pub original_path: PathBuf,
    pub proposed_path: PathBuf,
    pub status: PlanStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    pub candidate: MediaCandidate,
    #[serde(default)]
    pub record: Option<MetadataRecord>,
    /// Original path of the video this subtitle or .nfo file travels with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sidecar_of: Option<PathBuf>,
}

impl RenamePlan {
    pub fn new(
        original_path: PathBuf,
        proposed_path: PathBuf,
        candidate: MediaCandidate,
        record: Option<MetadataRecord>,
    ) -> Self {
        Self {
            original_path,
            proposed_path,
            status: PlanStatus::Pending,
            failure_reason: None,
            candidate,
            record,
            sidecar_of: None,
        }
    }

    /// Companion file moving along with `video`
    pub fn sidecar(original_path: PathBuf, proposed_path: PathBuf, video: &RenamePlan) -> Self {
        Self {
            sidecar_of: Some(video.original_path.clone()),
            ..Self::new(
                original_path,
                proposed_path,
                video.candidate.clone(),
                video.record.clone(),
            )
        }
    }

    /// A plan that failed before a target could be computed
    pub fn failed(original_path: PathBuf, candidate: MediaCandidate, reason: impl Into<String>) -> Self {
        Self {
            proposed_path: original_path.clone(),
            original_path,
            status: PlanStatus::Failed,
            failure_reason: Some(reason.into()),
            candidate,
            record: None,
            sidecar_of: None,
        }
    }

    /// No metadata was found, so the file keeps its name
    pub fn is_unresolved(&self) -> bool {
        self.status == PlanStatus::Pending && self.record.is_none()
    }

    pub fn is_noop(&self) -> bool {
        self.proposed_path == self.original_path
    }

    /// Pending and pointing somewhere new
    pub fn needs_rename(&self) -> bool {
        self.status == PlanStatus::Pending && !self.is_noop()
    }

    pub(crate) fn mark_applied(&mut self) {
        if self.status == PlanStatus::Pending {
            self.status = PlanStatus::Applied;
        }
    }

    pub(crate) fn mark_failed(&mut self, reason: impl Into<String>) {
        if self.status == PlanStatus::Pending {
            self.status = PlanStatus::Failed;
            self.failure_reason = Some(reason.into());
        }
    }
}

/// Counts per outcome, for reporting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub total: usize,
    pub to_rename: usize,
    pub unchanged: usize,
    pub unresolved: usize,
    pub applied: usize,
    pub failed: usize,
}

impl std::fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} files: {} to rename, {} applied, {} failed, {} unresolved, {} unchanged",
            self.total, self.to_rename, self.applied, self.failed, self.unresolved, self.unchanged
        )
    }
}

/// All plans produced by one scan, in discovery order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSession {
    pub id: Uuid,
    pub root: PathBuf,
    pub created_at: DateTime<Utc>,
    pub plans: Vec<RenamePlan>,
}

impl ScanSession {
    pub fn new(root: PathBuf, plans: Vec<RenamePlan>) -> Self {
        Self {
            id: Uuid::new_v4(),
            root,
            created_at: Utc::now(),
            plans,
        }
    }

    /// Demote every pending plan whose target is already taken to `Failed`.
    ///
    /// Walking in order, a target is taken when an earlier plan will move a
    /// file there, or when a file that is not moving away first already sits
    /// there (any plan that will not move, or a later one). Returns the
    /// number of demoted plans.
    ///
    /// Companion files of a video that was demoted (or failed earlier) are
    /// demoted with it.
    pub fn detect_collisions(&mut self) -> usize {
        let originals: HashMap<PathBuf, usize> = self
            .plans
            .iter()
            .enumerate()
            .map(|(i, p)| (p.original_path.clone(), i))
            .collect();

        let mut claimed: HashSet<PathBuf> = HashSet::new();
        let mut demoted = 0;

        for i in 0..self.plans.len() {
            if !self.plans[i].needs_rename() {
                continue;
            }

            let orphaned = self.plans[i]
                .sidecar_of
                .as_ref()
                .and_then(|video| originals.get(video))
                .is_some_and(|&j| self.plans[j].status == PlanStatus::Failed);
            if orphaned {
                self.plans[i].mark_failed(VIDEO_NOT_RENAMED);
                demoted += 1;
                continue;
            }

            let target = self.plans[i].proposed_path.clone();
            let occupied = originals
                .get(&target)
                .is_some_and(|&j| j != i && (j > i || !self.plans[j].needs_rename()));

            if occupied || claimed.contains(&target) {
                debug!(path = %self.plans[i].original_path.display(), target = %target.display(), "Path collision");
                self.plans[i].mark_failed(PATH_COLLISION);
                demoted += 1;
            } else {
                claimed.insert(target);
            }
        }

        if demoted > 0 {
            warn!(count = demoted, "Plans demoted because of path collisions");
        }
        demoted
    }

    pub fn summary(&self) -> SessionSummary {
        let mut summary = SessionSummary {
            total: self.plans.len(),
            ..Default::default()
        };

        for plan in &self.plans {
            match plan.status {
                PlanStatus::Applied => summary.applied += 1,
                PlanStatus::Failed => summary.failed += 1,
                PlanStatus::Pending if plan.is_unresolved() => summary.unresolved += 1,
                PlanStatus::Pending if plan.is_noop() => summary.unchanged += 1,
                PlanStatus::Pending => summary.to_rename += 1,
            }
        }

        summary
    }

    /// Write the session as pretty JSON
    pub fn save(&self, path: &Path) -> Result<(), SessionError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Read a session written by [`ScanSession::save`], possibly edited by
    /// hand, and re-check it for collisions
    pub fn load(path: &Path) -> Result<Self, SessionError> {
        let content = fs::read_to_string(path)?;
        let mut session: Self = serde_json::from_str(&content)?;
        session.detect_collisions();
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::Parser;
    use tempfile::TempDir;

    fn plan(from: &str, to: &str) -> RenamePlan {
        let record = MetadataRecord::new("Title", "1", "test");
        RenamePlan::new(
            PathBuf::from(from),
            PathBuf::from(to),
            Parser::parse_filename(from),
            Some(record),
        )
    }

    #[test]
    fn test_status_never_reverts() {
        let mut p = plan("/m/a.mkv", "/m/b.mkv");
        p.mark_failed("boom");
        p.mark_applied();
        assert_eq!(p.status, PlanStatus::Failed);
        assert_eq!(p.failure_reason.as_deref(), Some("boom"));

        let mut p = plan("/m/a.mkv", "/m/b.mkv");
        p.mark_applied();
        p.mark_failed("late");
        assert_eq!(p.status, PlanStatus::Applied);
        assert!(p.failure_reason.is_none());
    }

    #[test]
    fn test_second_plan_to_same_target_demoted() {
        let mut session = ScanSession::new(
            PathBuf::from("/m"),
            vec![
                plan("/m/Heat.1995.mkv", "/m/Heat (1995).mkv"),
                plan("/m/heat.1995.720p.mkv", "/m/Heat (1995).mkv"),
            ],
        );

        assert_eq!(session.detect_collisions(), 1);
        assert_eq!(session.plans[0].status, PlanStatus::Pending);
        assert_eq!(session.plans[1].status, PlanStatus::Failed);
        assert_eq!(session.plans[1].failure_reason.as_deref(), Some(PATH_COLLISION));
    }

    #[test]
    fn test_target_occupied_by_unmoved_file() {
        let unresolved = RenamePlan::new(
            PathBuf::from("/m/b.mkv"),
            PathBuf::from("/m/b.mkv"),
            Parser::parse_filename("b.mkv"),
            None,
        );
        let mut session = ScanSession::new(
            PathBuf::from("/m"),
            vec![plan("/m/a.mkv", "/m/b.mkv"), unresolved],
        );

        assert_eq!(session.detect_collisions(), 1);
        assert_eq!(session.plans[0].status, PlanStatus::Failed);
        assert!(session.plans[1].is_unresolved());
    }

    #[test]
    fn test_target_freed_by_earlier_move() {
        let mut session = ScanSession::new(
            PathBuf::from("/m"),
            vec![plan("/m/b.mkv", "/m/c.mkv"), plan("/m/a.mkv", "/m/b.mkv")],
        );

        assert_eq!(session.detect_collisions(), 0);
        assert!(session.plans.iter().all(|p| p.status == PlanStatus::Pending));
    }

    #[test]
    fn test_sidecar_follows_demoted_video() {
        let video = plan("/m/heat.1995.720p.mkv", "/m/Heat (1995).mkv");
        let subtitle = RenamePlan::sidecar(
            PathBuf::from("/m/heat.1995.720p.en.srt"),
            PathBuf::from("/m/Heat (1995).en.srt"),
            &video,
        );
        let mut session = ScanSession::new(
            PathBuf::from("/m"),
            vec![plan("/m/Heat.1995.mkv", "/m/Heat (1995).mkv"), video, subtitle],
        );

        assert_eq!(session.detect_collisions(), 2);
        assert_eq!(session.plans[1].failure_reason.as_deref(), Some(PATH_COLLISION));
        assert_eq!(session.plans[2].status, PlanStatus::Failed);
        assert_eq!(session.plans[2].failure_reason.as_deref(), Some(VIDEO_NOT_RENAMED));
    }

    #[test]
    fn test_sidecar_target_collides_with_existing_file() {
        let video = plan("/m/Heat.1995.mkv", "/m/Heat (1995).mkv");
        let subtitle = RenamePlan::sidecar(
            PathBuf::from("/m/Heat.1995.srt"),
            PathBuf::from("/m/Heat (1995).srt"),
            &video,
        );
        let stray = RenamePlan::new(
            PathBuf::from("/m/Heat (1995).srt"),
            PathBuf::from("/m/Heat (1995).srt"),
            Parser::parse_filename("Heat (1995).srt"),
            None,
        );
        let mut session = ScanSession::new(PathBuf::from("/m"), vec![video, subtitle, stray]);

        assert_eq!(session.detect_collisions(), 1);
        assert_eq!(session.plans[0].status, PlanStatus::Pending);
        assert_eq!(session.plans[1].failure_reason.as_deref(), Some(PATH_COLLISION));
    }

    #[test]
    fn test_summary_counts() {
        let unresolved = RenamePlan::new(
            PathBuf::from("/m/x.mkv"),
            PathBuf::from("/m/x.mkv"),
            Parser::parse_filename("x.mkv"),
            None,
        );
        let failed = RenamePlan::failed(
            PathBuf::from("/m/y.mkv"),
            Parser::parse_filename("y.mkv"),
            "Network error",
        );
        let session = ScanSession::new(
            PathBuf::from("/m"),
            vec![plan("/m/a.mkv", "/m/b.mkv"), unresolved, failed],
        );

        let summary = session.summary();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.to_rename, 1);
        assert_eq!(summary.unresolved, 1);
        assert_eq!(summary.failed, 1);
    }

    #[test]
    fn test_save_and_load_rechecks_collisions() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("session.json");

        let session = ScanSession::new(
            PathBuf::from("/m"),
            vec![plan("/m/a.mkv", "/m/c.mkv"), plan("/m/b.mkv", "/m/d.mkv")],
        );
        session.save(&file).unwrap();

        // Simulate a hand edit pointing both files at the same name
        let edited = fs::read_to_string(&file).unwrap().replace("/m/d.mkv", "/m/c.mkv");
        fs::write(&file, edited).unwrap();

        let loaded = ScanSession::load(&file).unwrap();
        assert_eq!(loaded.id, session.id);
        assert_eq!(loaded.plans[0].status, PlanStatus::Pending);
        assert_eq!(loaded.plans[1].status, PlanStatus::Failed);
    }

    #[test]
    fn test_load_rejects_garbage() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("session.json");
        fs::write(&file, "not json").unwrap();

        assert!(matches!(ScanSession::load(&file), Err(SessionError::Json(_))));
    }
}
