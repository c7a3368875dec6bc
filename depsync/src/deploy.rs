//! Deployment workflow driver.
//!
//! Four sequential phases, each gated on success of the previous one:
//! prepare, generate (initial deployments only), create task, start task.
//! Any failure is fatal for the whole workflow; an already-created task is
//! never rolled back.

use client::{xml, ClientError, DeployApi};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeployPhase {
    Prepare,
    Generate,
    CreateTask,
    StartTask,
}

impl fmt::Display for DeployPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeployPhase::Prepare => "prepare",
            DeployPhase::Generate => "generate",
            DeployPhase::CreateTask => "create-task",
            DeployPhase::StartTask => "start-task",
        };
        f.write_str(name)
    }
}

/// State of a deployment workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeployState {
    Idle,
    Prepared,
    /// Initial deployments only; the update flow goes straight from
    /// `Prepared` to `TaskCreated`.
    Generated,
    TaskCreated,
    Started,
    /// Absorbing: there is no transition out. Callers re-invoke the whole
    /// workflow.
    Failed(DeployPhase),
}

#[derive(Error, Debug)]
pub enum DeployError {
    #[error("{phase} phase failed: {source}")]
    Phase {
        phase: DeployPhase,
        #[source]
        source: ClientError,
    },

    #[error("Version ref '{reference}' has no application segment")]
    InvalidVersionRef { reference: String },
}

pub type DeployResult<T> = Result<T, DeployError>;

#[derive(Debug, Clone)]
pub struct DeploySummary {
    pub task_id: String,
    pub final_state: DeployState,
}

/// Drives the prepare/generate/create/start sequence against a server.
pub struct Orchestrator {
    state: DeployState,
}

impl Orchestrator {
    pub fn new() -> Self {
        Self {
            state: DeployState::Idle,
        }
    }

    pub fn state(&self) -> &DeployState {
        &self.state
    }

    /// First-time deployment of an application version to an environment.
    pub async fn run_initial(
        &mut self,
        api: &dyn DeployApi,
        version: &str,
        environment: &str,
    ) -> DeployResult<DeploySummary> {
        info!("Starting initial deployment of {} to {}", version, environment);

        let prepared = api
            .prepare_initial(version, environment)
            .await
            .map_err(|e| self.fail(DeployPhase::Prepare, e))?;
        self.transition_to(DeployState::Prepared);

        let deployables = xml::deployable_refs(&prepared)
            .map_err(|e| self.fail(DeployPhase::Generate, e))?;
        debug!("Prepared payload lists {} deployables", deployables.len());
        let generated = api
            .generate_selected(&prepared, &deployables)
            .await
            .map_err(|e| self.fail(DeployPhase::Generate, e))?;
        self.transition_to(DeployState::Generated);

        let task_id = api
            .create_task(&generated)
            .await
            .map_err(|e| self.fail(DeployPhase::CreateTask, e))?;
        self.transition_to(DeployState::TaskCreated);

        api.start_task(&task_id)
            .await
            .map_err(|e| self.fail(DeployPhase::StartTask, e))?;
        self.transition_to(DeployState::Started);

        info!("Deployed {} to {} (task {})", version, environment, task_id);
        Ok(DeploySummary {
            task_id,
            final_state: self.state.clone(),
        })
    }

    /// Update an existing deployed application to a new version.
    ///
    /// The prepared payload is already submission-ready, so the generate
    /// phase is skipped.
    pub async fn run_update(
        &mut self,
        api: &dyn DeployApi,
        version: &str,
        target_env: &str,
    ) -> DeployResult<DeploySummary> {
        let deployed_application = derive_deployed_application(version, target_env)?;
        info!(
            "Starting update of {} with version {}",
            deployed_application, version
        );

        let prepared = api
            .prepare_update(version, &deployed_application)
            .await
            .map_err(|e| self.fail(DeployPhase::Prepare, e))?;
        self.transition_to(DeployState::Prepared);

        let task_id = api
            .create_task(&prepared)
            .await
            .map_err(|e| self.fail(DeployPhase::CreateTask, e))?;
        self.transition_to(DeployState::TaskCreated);

        api.start_task(&task_id)
            .await
            .map_err(|e| self.fail(DeployPhase::StartTask, e))?;
        self.transition_to(DeployState::Started);

        info!("Updated {} (task {})", deployed_application, task_id);
        Ok(DeploySummary {
            task_id,
            final_state: self.state.clone(),
        })
    }

    fn transition_to(&mut self, new_state: DeployState) {
        debug!("State transition: {:?} -> {:?}", self.state, new_state);
        self.state = new_state;
    }

    fn fail(&mut self, phase: DeployPhase, source: ClientError) -> DeployError {
        error!("Deployment halted at {} phase: {}", phase, source);
        self.transition_to(DeployState::Failed(phase));
        DeployError::Phase { phase, source }
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

/// The deployed-application identity targeted by an update: the target
/// environment joined with the version ref's application segment (the
/// second-to-last path segment, e.g. `Applications/x/sms-service/1.2.5`
/// names application `sms-service`).
fn derive_deployed_application(version: &str, target_env: &str) -> DeployResult<String> {
    let mut segments = version.rsplit('/');
    segments.next();
    let application = segments
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| DeployError::InvalidVersionRef {
            reference: version.to_string(),
        })?;
    Ok(format!("{}/{}", target_env, application))
}
