mod executor;
mod orchestrator;
mod planner;
mod scanner;
mod session;

#[cfg(test)]
mod tests;

pub use executor::{ApplyError, Executor};
pub use orchestrator::{LOOKUP_CANCELLED, Orchestrator, OrchestratorConfig};
pub use planner::{
    DEFAULT_MOVIE_TEMPLATE, DEFAULT_SERIES_TEMPLATE, FolderOwners, NamingTemplate, Placement,
    Planner,
};
pub use scanner::{SIDECAR_EXTENSIONS, ScanOptions, Scanner, VIDEO_EXTENSIONS};
pub use session::{
    PATH_COLLISION, PlanStatus, RenamePlan, ScanSession, SessionError, SessionSummary,
    VIDEO_NOT_RENAMED,
};
