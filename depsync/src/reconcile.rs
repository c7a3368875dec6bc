//! Environment reconciliation.
//!
//! Matches deployed applications from one environment tree against another
//! and produces a tabular report of proposed target environments.

use crate::matcher::{best_match, DEFAULT_THRESHOLD};
use crate::resolver::resolve_deployed_applications;
use client::{ClientResult, DeployApi, DeployedApplication, UDM_ENVIRONMENT};
use serde::Serialize;
use tracing::{debug, info, warn};

pub const REPORT_HEADER: &str = "Application Name,Old Environment,Old Version,New Environment";

/// Marker emitted in the report when no match was found.
const NOT_FOUND: &str = "Not Found";

#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    pub threshold: f64,
    pub page_size: u32,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            page_size: 1000,
        }
    }
}

/// One reconciliation result row. `target_environment: None` means the
/// application had no acceptable match on the new side.
#[derive(Debug, Clone, Serialize)]
pub struct MatchRow {
    pub application: String,
    pub old_environment: Option<String>,
    pub old_version: Option<String>,
    pub target_environment: Option<String>,
}

impl MatchRow {
    /// Comma-joined fields, unescaped and unquoted. Matched rows carry four
    /// fields, unmatched rows three (the third being the literal marker);
    /// consumers must handle the variable width.
    fn csv_fields(&self) -> Vec<&str> {
        let old_env = self.old_environment.as_deref().unwrap_or("");
        match &self.target_environment {
            Some(target) => vec![
                &self.application,
                old_env,
                self.old_version.as_deref().unwrap_or(""),
                target,
            ],
            None => vec![&self.application, old_env, NOT_FOUND],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchReport {
    pub rows: Vec<MatchRow>,
}

impl MatchReport {
    /// Header plus one line per old-side application. Embedded commas are
    /// not escaped; the format is inherited, not designed.
    pub fn to_csv(&self) -> String {
        let mut lines = vec![REPORT_HEADER.to_string()];
        lines.extend(self.rows.iter().map(|row| row.csv_fields().join(",")));
        lines.join("\n")
    }
}

/// Rewrite a chosen target environment path for promotion: `/STG/` becomes
/// `/PROD/` and every `-stg` marker is stripped. Applied unconditionally.
pub fn rewrite_target_path(path: &str) -> String {
    path.replace("/STG/", "/PROD/").replace("-stg", "")
}

fn contains_secrets(value: &str) -> bool {
    value.to_lowercase().contains("secrets")
}

fn keep_old_side(app: &DeployedApplication) -> bool {
    !contains_secrets(&app.reference)
}

// The new side keeps an application when its ref or its environment is free
// of "secrets", i.e. drops it only when both carry the marker. Inherited
// asymmetry, kept as-is; see DESIGN.md before changing.
fn keep_new_side(app: &DeployedApplication) -> bool {
    let ref_clean = !contains_secrets(&app.reference);
    let env_clean = app
        .environment
        .as_deref()
        .map(|env| !contains_secrets(env))
        .unwrap_or(true);
    ref_clean || env_clean
}

pub struct Reconciler<'a> {
    api: &'a dyn DeployApi,
    options: ReconcileOptions,
}

impl<'a> Reconciler<'a> {
    pub fn new(api: &'a dyn DeployApi, options: ReconcileOptions) -> Self {
        Self { api, options }
    }

    /// Match every deployed application under `old_ancestor` against the
    /// pool under `new_ancestor`.
    ///
    /// A resolve failure for a single environment downgrades to "zero
    /// applications from that environment"; enumeration failure of either
    /// ancestor aborts the run.
    pub async fn reconcile(
        &self,
        old_ancestor: &str,
        new_ancestor: &str,
    ) -> ClientResult<MatchReport> {
        let old_envs = self.environments_under(old_ancestor).await?;
        let new_envs = self.environments_under(new_ancestor).await?;

        let old_apps = self.gather(&old_envs, keep_old_side).await;
        let new_apps = self.gather(&new_envs, keep_new_side).await;

        let new_names: Vec<&str> = new_apps.iter().map(|app| app.short_name()).collect();
        let new_env_pool: Vec<&str> = new_apps
            .iter()
            .filter_map(|app| app.environment.as_deref())
            .collect();

        let mut rows = Vec::with_capacity(old_apps.len());
        for old_app in &old_apps {
            let name = old_app.short_name();
            let matched = best_match(name, new_names.iter().copied(), self.options.threshold)
                .and_then(|m| new_apps.iter().find(|app| app.short_name() == m));

            let target_environment = matched.map(|new_app| {
                // Prefer a more specific environment sub-match over the
                // matched application's own environment.
                let old_env = old_app.environment.as_deref().unwrap_or("");
                let chosen =
                    best_match(old_env, new_env_pool.iter().copied(), self.options.threshold)
                        .or(new_app.environment.as_deref())
                        .unwrap_or("");
                rewrite_target_path(chosen)
            });

            rows.push(MatchRow {
                application: name.to_string(),
                old_environment: old_app.environment.clone(),
                old_version: old_app.version.clone(),
                target_environment,
            });
        }

        info!(
            "Reconciled {} applications ({} matched)",
            rows.len(),
            rows.iter()
                .filter(|r| r.target_environment.is_some())
                .count()
        );
        Ok(MatchReport { rows })
    }

    async fn environments_under(&self, ancestor: &str) -> ClientResult<Vec<String>> {
        let envs = self
            .api
            .query_children(ancestor, UDM_ENVIRONMENT, None, self.options.page_size)
            .await?;
        debug!("{} environments under {}", envs.len(), ancestor);
        Ok(envs)
    }

    async fn gather(
        &self,
        environments: &[String],
        keep: fn(&DeployedApplication) -> bool,
    ) -> Vec<DeployedApplication> {
        let mut apps = Vec::new();
        for env in environments {
            match resolve_deployed_applications(self.api, env).await {
                Ok(resolved) => {
                    debug!("{} applications in {}", resolved.len(), env);
                    apps.extend(resolved.into_iter().filter(keep));
                }
                Err(e) => {
                    warn!("Skipping {}: {}", env, e);
                }
            }
        }
        apps
    }
}
