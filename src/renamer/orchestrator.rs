use crate::renamer::{
    planner::{FolderOwners, NamingTemplate, Planner},
    scanner::{ScanOptions, Scanner},
    session::{RenamePlan, ScanSession},
};
use crate::scraper::{MediaCandidate, MetadataRecord, Parser, Resolver, Result, ScraperError};
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Reason recorded on files skipped after a cancel request
pub const LOOKUP_CANCELLED: &str = "lookup cancelled";

/// Orchestrator configuration
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub scan: ScanOptions,
    pub naming: NamingTemplate,
    /// Lookups in flight at once
    pub concurrency: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            scan: ScanOptions::default(),
            naming: NamingTemplate::default(),
            concurrency: 4,
        }
    }
}

/// What looking up one file produced
struct Lookup {
    path: PathBuf,
    candidate: MediaCandidate,
    /// The match (if any), or why the lookup failed
    outcome: std::result::Result<Option<MetadataRecord>, String>,
}

impl Lookup {
    fn record(&self) -> Option<&MetadataRecord> {
        self.outcome.as_ref().ok().and_then(Option::as_ref)
    }
}

/// Drives Scanner, Parser, Resolver and Planner over a directory
pub struct Orchestrator {
    resolver: Arc<Resolver>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(resolver: Arc<Resolver>, config: OrchestratorConfig) -> Self {
        Self { resolver, config }
    }

    /// Build a preview session for `root`. Touches nothing on disk.
    pub async fn scan(&self, root: &Path) -> Result<ScanSession> {
        self.scan_with_cancel(root, CancellationToken::new()).await
    }

    /// Like [`Orchestrator::scan`]; once `cancel` fires, files not yet looked
    /// up get a failed plan instead. In-flight lookups run to completion.
    ///
    /// Fails only when the root is not a directory or the provider rejects
    /// the credentials. Per-file lookup errors end up on that file's plan.
    pub async fn scan_with_cancel(&self, root: &Path, cancel: CancellationToken) -> Result<ScanSession> {
        let root = std::path::absolute(root)?;
        if !root.is_dir() {
            return Err(ScraperError::Config(format!(
                "{} is not a directory",
                root.display()
            )));
        }

        self.resolver.preflight().await?;

        let scanner = Scanner::new(&self.config.scan);
        let files = scanner.scan(&root)?;
        let sidecars = scanner.sidecars(&files);
        info!(root = %root.display(), files = files.len(), "Discovered media files");

        // `buffered` yields in input order, so plans stay in discovery order
        let lookups: Vec<Lookup> = stream::iter(files)
            .map(|path| self.lookup(&root, path, &cancel))
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await;

        // Placement needs to know which folders hold a single title
        let mut owners = FolderOwners::new(root.clone());
        for lookup in &lookups {
            owners.claim(&lookup.path, lookup.record());
        }
        let planner = Planner::new(root.clone(), self.config.naming.clone()).with_owners(owners);

        let mut plans = Vec::with_capacity(lookups.len());
        for (lookup, companions) in lookups.into_iter().zip(sidecars) {
            let plan = match lookup.outcome {
                Ok(record) => planner.plan(lookup.path, lookup.candidate, record),
                Err(reason) => RenamePlan::failed(lookup.path, lookup.candidate, reason),
            };
            let companions: Vec<RenamePlan> = companions
                .into_iter()
                .filter_map(|sidecar| planner.plan_sidecar(&plan, sidecar))
                .collect();

            plans.push(plan);
            plans.extend(companions);
        }

        let mut session = ScanSession::new(root, plans);
        session.detect_collisions();

        info!(summary = %session.summary(), "Scan complete");
        Ok(session)
    }

    async fn lookup(&self, root: &Path, path: PathBuf, cancel: &CancellationToken) -> Lookup {
        let candidate = Parser::parse_within(&path, root);

        if cancel.is_cancelled() {
            debug!(path = %path.display(), "Skipping lookup after cancel");
            return Lookup {
                path,
                candidate,
                outcome: Err(LOOKUP_CANCELLED.to_string()),
            };
        }

        let outcome = match self.resolver.resolve(&candidate).await {
            Ok(record) => {
                if record.is_none() {
                    debug!(path = %path.display(), title = %candidate.guessed_title, "Unresolved");
                }
                Ok(record)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Lookup failed");
                Err(e.to_string())
            }
        };

        Lookup {
            path,
            candidate,
            outcome,
        }
    }
}
