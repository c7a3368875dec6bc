pub mod deploy;
pub mod matcher;
pub mod reconcile;
pub mod resolver;

pub use deploy::{
    DeployError, DeployPhase, DeployResult, DeployState, DeploySummary, Orchestrator,
};
pub use matcher::{best_match, similarity, DEFAULT_THRESHOLD};
pub use reconcile::{
    rewrite_target_path, MatchReport, MatchRow, ReconcileOptions, Reconciler, REPORT_HEADER,
};
pub use resolver::resolve_deployed_applications;
