//! Renamer integration tests

#[cfg(test)]
mod scan_tests {
    use crate::renamer::{
        LOOKUP_CANCELLED, Orchestrator, OrchestratorConfig, PATH_COLLISION, PlanStatus,
    };
    use crate::scraper::{Resolver, ResolverConfig, ScraperError, tests::FakeProvider};
    use std::fs::{self, File};
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use tempfile::TempDir;
    use tokio_util::sync::CancellationToken;

    fn orchestrator(provider: FakeProvider) -> Orchestrator {
        let resolver = Resolver::new(Arc::new(provider), ResolverConfig::default());
        Orchestrator::new(Arc::new(resolver), OrchestratorConfig::default())
    }

    fn library() -> FakeProvider {
        FakeProvider::new()
            .with_movie("603", "The Matrix", 1999)
            .with_movie("949", "Heat", 1995)
            .with_series("77", "Show Name", 2010)
            .with_episode("77", 2, 5, "Episode Title")
    }

    fn touch(root: &Path, name: &str) -> PathBuf {
        let path = root.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        File::create(&path).unwrap();
        path
    }

    fn relative(root: &Path, path: &Path) -> PathBuf {
        path.strip_prefix(root).unwrap().to_path_buf()
    }

    #[tokio::test]
    async fn test_scan_examples() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        touch(root, "The.Matrix.1999.1080p.BluRay.x264-GRP.mkv");
        touch(root, "Show.Name.S02E05.Episode.Title.720p.mkv");
        touch(root, "randomfile.mkv");

        let session = orchestrator(library()).scan(root).await.unwrap();

        let proposed: Vec<PathBuf> = session
            .plans
            .iter()
            .map(|p| relative(root, &p.proposed_path))
            .collect();
        assert_eq!(
            proposed,
            vec![
                PathBuf::from("Show Name/Season 02/Show Name - S02E05 - Episode Title.mkv"),
                PathBuf::from("The Matrix (1999)/The Matrix (1999).mkv"),
                PathBuf::from("randomfile.mkv"),
            ]
        );
        assert!(session.plans[2].is_unresolved());
        assert!(session.plans.iter().all(|p| p.status == PlanStatus::Pending));

        // Scanning never touches the filesystem
        assert!(root.join("randomfile.mkv").exists());
        assert!(root.join("The.Matrix.1999.1080p.BluRay.x264-GRP.mkv").exists());
        assert!(!root.join("The Matrix (1999)").exists());
    }

    #[tokio::test]
    async fn test_lookup_error_recorded_and_scan_continues() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        touch(root, "Heat.1995.mkv");
        touch(root, "The.Matrix.1999.mkv");

        let session = orchestrator(library().failing_on("Heat"))
            .scan(root)
            .await
            .unwrap();

        assert_eq!(session.plans[0].status, PlanStatus::Failed);
        assert!(
            session.plans[0]
                .failure_reason
                .as_deref()
                .unwrap()
                .contains("500")
        );
        assert_eq!(session.plans[1].status, PlanStatus::Pending);
        assert!(session.plans[1].record.is_some());
    }

    #[tokio::test]
    async fn test_collision_demotes_later_plan() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        touch(root, "Heat.1995.1080p.mkv");
        touch(root, "heat.1995.mkv");

        let session = orchestrator(library()).scan(root).await.unwrap();

        assert_eq!(session.plans[0].status, PlanStatus::Pending);
        assert_eq!(session.plans[1].status, PlanStatus::Failed);
        assert_eq!(session.plans[1].failure_reason.as_deref(), Some(PATH_COLLISION));
        assert_eq!(session.plans[0].proposed_path, session.plans[1].proposed_path);
    }

    #[tokio::test]
    async fn test_cancelled_scan_skips_lookups() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        touch(root, "Heat.1995.mkv");
        touch(root, "The.Matrix.1999.mkv");

        let provider = Arc::new(library());
        let resolver = Resolver::new(provider.clone(), ResolverConfig::default());
        let orchestrator = Orchestrator::new(Arc::new(resolver), OrchestratorConfig::default());

        let cancel = CancellationToken::new();
        cancel.cancel();
        let session = orchestrator.scan_with_cancel(root, cancel).await.unwrap();

        assert_eq!(session.plans.len(), 2);
        for plan in &session.plans {
            assert_eq!(plan.status, PlanStatus::Failed);
            assert_eq!(plan.failure_reason.as_deref(), Some(LOOKUP_CANCELLED));
        }
        assert!(provider.searches().is_empty());
    }

    #[tokio::test]
    async fn test_root_folder_name_not_used_as_title() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("Show.Name");
        touch(&root, "S02E05.mkv");

        let provider = Arc::new(library());
        let resolver = Resolver::new(provider.clone(), ResolverConfig::default());
        let orchestrator = Orchestrator::new(Arc::new(resolver), OrchestratorConfig::default());
        let session = orchestrator.scan(&root).await.unwrap();

        assert!(session.plans[0].is_unresolved());
        assert!(provider.searches().iter().all(|(query, _)| query != "Show Name"));
    }

    #[tokio::test]
    async fn test_rejected_credentials_abort_before_lookups() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), "Heat.1995.mkv");

        let provider = Arc::new(library().rejecting_credentials());
        let resolver = Resolver::new(provider.clone(), ResolverConfig::default());
        let orchestrator = Orchestrator::new(Arc::new(resolver), OrchestratorConfig::default());

        let err = orchestrator.scan(temp_dir.path()).await.unwrap_err();
        assert!(err.is_unauthorized());
        assert!(provider.searches().is_empty());
    }

    #[tokio::test]
    async fn test_root_must_be_directory() {
        let temp_dir = TempDir::new().unwrap();
        let file = touch(temp_dir.path(), "Heat.1995.mkv");

        let err = orchestrator(library()).scan(&file).await.unwrap_err();
        assert!(matches!(err, ScraperError::Config(_)));
    }

    #[tokio::test]
    async fn test_concurrent_lookups_keep_discovery_order() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let names: Vec<String> = (1..=12).map(|i| format!("Show.Name.S02E{i:02}.mkv")).collect();
        for name in &names {
            touch(root, name);
        }

        let resolver = Resolver::new(Arc::new(library()), ResolverConfig::default());
        let config = OrchestratorConfig {
            concurrency: 8,
            ..Default::default()
        };
        let session = Orchestrator::new(Arc::new(resolver), config)
            .scan(root)
            .await
            .unwrap();

        let originals: Vec<String> = session
            .plans
            .iter()
            .map(|p| p.candidate.raw_filename.clone())
            .collect();
        assert_eq!(originals, names);
        assert_eq!(
            session.plans[4].proposed_path.file_name().unwrap(),
            "Show Name - S02E05 - Episode Title.mkv"
        );
    }
}

#[cfg(test)]
mod apply_tests {
    use crate::renamer::{
        Executor, Orchestrator, OrchestratorConfig, PlanStatus, ScanSession, VIDEO_NOT_RENAMED,
    };
    use crate::scraper::{Resolver, ResolverConfig, tests::FakeProvider};
    use std::fs::{self, File};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn orchestrator() -> Orchestrator {
        let provider = FakeProvider::new()
            .with_movie("603", "The Matrix", 1999)
            .with_movie("949", "Heat", 1995)
            .with_movie("680", "Pulp Fiction", 1994);
        let resolver = Resolver::new(Arc::new(provider), ResolverConfig::default());
        Orchestrator::new(Arc::new(resolver), OrchestratorConfig::default())
    }

    #[tokio::test]
    async fn test_k_of_n_applied() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        for name in ["Heat.1995.mkv", "Pulp.Fiction.1994.mkv", "The.Matrix.1999.mkv"] {
            File::create(root.join(name)).unwrap();
        }

        let session = orchestrator().scan(root).await.unwrap();
        assert_eq!(session.summary().to_rename, 3);

        // Something else claims one destination between scan and apply
        fs::create_dir_all(root.join("Pulp Fiction (1994)")).unwrap();
        File::create(root.join("Pulp Fiction (1994)/Pulp Fiction (1994).mkv")).unwrap();

        let session = Executor::default().apply(session);
        let summary = session.summary();

        assert_eq!(summary.applied, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(session.plans[1].status, PlanStatus::Failed);
        assert!(root.join("Pulp.Fiction.1994.mkv").exists());
        assert!(root.join("Heat (1995)/Heat (1995).mkv").exists());
        assert!(root.join("The Matrix (1999)/The Matrix (1999).mkv").exists());
    }

    #[tokio::test]
    async fn test_exported_session_applies_later() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("library");
        fs::create_dir(&root).unwrap();
        File::create(root.join("Heat.1995.mkv")).unwrap();
        let export = temp_dir.path().join("session.json");

        let session = orchestrator().scan(&root).await.unwrap();
        session.save(&export).unwrap();

        let loaded = ScanSession::load(&export).unwrap();
        let applied = Executor::new(true).apply(loaded);

        assert_eq!(applied.plans[0].status, PlanStatus::Applied);
        assert!(root.join("Heat (1995)/Heat (1995).mkv").exists());
    }

    #[tokio::test]
    async fn test_subtitles_follow_video() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        for name in ["Heat.1995.mkv", "Heat.1995.en.srt", "Heat.1995.nfo", "notes.txt"] {
            File::create(root.join(name)).unwrap();
        }

        let session = orchestrator().scan(root).await.unwrap();
        assert_eq!(session.plans.len(), 3);
        assert_eq!(
            session.plans[1].sidecar_of.as_deref(),
            Some(root.join("Heat.1995.mkv").as_path())
        );

        let session = Executor::new(true).apply(session);

        assert_eq!(session.summary().applied, 3);
        assert!(root.join("Heat (1995)/Heat (1995).mkv").exists());
        assert!(root.join("Heat (1995)/Heat (1995).en.srt").exists());
        assert!(root.join("Heat (1995)/Heat (1995).nfo").exists());
        assert!(!root.join("Heat.1995.en.srt").exists());
        assert!(root.join("notes.txt").exists());
    }

    #[tokio::test]
    async fn test_subtitle_of_unresolved_video_stays() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        File::create(root.join("home.video.mkv")).unwrap();
        File::create(root.join("home.video.srt")).unwrap();

        let session = orchestrator().scan(root).await.unwrap();

        assert_eq!(session.plans.len(), 1);
        assert!(session.plans[0].is_unresolved());
    }

    #[tokio::test]
    async fn test_subtitle_of_colliding_video_stays() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        for name in ["Heat.1995.1080p.mkv", "heat.1995.mkv", "heat.1995.srt"] {
            File::create(root.join(name)).unwrap();
        }

        let session = orchestrator().scan(root).await.unwrap();
        let subtitle = session
            .plans
            .iter()
            .find(|p| p.sidecar_of.is_some())
            .unwrap();

        assert_eq!(subtitle.status, PlanStatus::Failed);
        assert_eq!(subtitle.failure_reason.as_deref(), Some(VIDEO_NOT_RENAMED));
    }

    #[tokio::test]
    async fn test_shared_folder_kept_and_not_pruned() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let movies = root.join("Movies");
        fs::create_dir(&movies).unwrap();
        File::create(movies.join("Heat.1995.mkv")).unwrap();
        File::create(movies.join("The.Matrix.1999.mkv")).unwrap();
        let single = root.join("pulp.fiction.1994");
        fs::create_dir(&single).unwrap();
        File::create(single.join("pulp.fiction.1994.mkv")).unwrap();

        let session = orchestrator().scan(root).await.unwrap();
        let session = Executor::new(true).apply(session);

        assert_eq!(session.summary().applied, 3);
        assert!(movies.join("Heat (1995)/Heat (1995).mkv").exists());
        assert!(movies.join("The Matrix (1999)/The Matrix (1999).mkv").exists());
        assert!(root.join("Pulp Fiction (1994)/Pulp Fiction (1994).mkv").exists());
        assert!(!single.exists());
    }
}
