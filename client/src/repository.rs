use crate::error::ClientResult;
use crate::types::ConfigurationItem;
use async_trait::async_trait;

/// The full surface of the remote server consumed by this tool.
///
/// Repository queries feed the reconciliation engine; the deployment
/// endpoints are driven by the orchestrator. Implementations block the
/// caller per call; there is no shared mutable state behind the trait.
#[async_trait]
pub trait DeployApi: Send + Sync {
    /// Whether a repository entry exists.
    ///
    /// Returns `false` both when the remote reports absence and when the
    /// call itself fails; callers cannot distinguish "absent" from
    /// "unreachable" at this boundary.
    async fn exists(&self, reference: &str) -> ClientResult<bool>;

    /// Query configuration items under an ancestor, one page only.
    ///
    /// Zero matches yield an empty list, never an error. Results are capped
    /// at `page_size`; a full page may mean truncation.
    async fn query_children(
        &self,
        ancestor: &str,
        type_name: &str,
        name_pattern: Option<&str>,
        page_size: u32,
    ) -> ClientResult<Vec<String>>;

    /// List the refs of applications deployed in an environment.
    async fn deployed_application_refs(&self, environment: &str) -> ClientResult<Vec<String>>;

    /// Fetch one configuration item, checking its type discriminant.
    async fn read_configuration_item(
        &self,
        type_name: &str,
        reference: &str,
    ) -> ClientResult<ConfigurationItem>;

    /// Request a deployment plan for a first-time deployment.
    async fn prepare_initial(&self, version: &str, environment: &str) -> ClientResult<String>;

    /// Request a deployment plan for updating an existing deployed application.
    async fn prepare_update(
        &self,
        version: &str,
        deployed_application: &str,
    ) -> ClientResult<String>;

    /// Generate a fully-specified deployment restricted to the given deployables.
    async fn generate_selected(
        &self,
        deployment_xml: &str,
        deployables: &[String],
    ) -> ClientResult<String>;

    /// Submit a deployment payload; the response body is the opaque task id.
    async fn create_task(&self, deployment_xml: &str) -> ClientResult<String>;

    /// Trigger execution of a created task. Success is a no-content status.
    async fn start_task(&self, task_id: &str) -> ClientResult<()>;
}
