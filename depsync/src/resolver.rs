//! Deployed-application resolution.

use client::types::UDM_DEPLOYED_APPLICATION;
use client::{ClientResult, DeployApi, DeployedApplication};
use tracing::debug;

/// Fetch and decorate every application deployed in an environment.
///
/// A failure of the listing call (or of any per-application CI fetch)
/// propagates: an empty environment is a valid outcome and must stay
/// distinguishable from a failed call. Absent `version`/`environment`
/// sub-references decode to `None`.
pub async fn resolve_deployed_applications(
    api: &dyn DeployApi,
    environment: &str,
) -> ClientResult<Vec<DeployedApplication>> {
    let refs = api.deployed_application_refs(environment).await?;
    debug!("{} deployed applications listed in {}", refs.len(), environment);

    let mut apps = Vec::with_capacity(refs.len());
    for reference in refs {
        let ci = api
            .read_configuration_item(UDM_DEPLOYED_APPLICATION, &reference)
            .await?;
        let version = ci.child_ref("version").map(str::to_string);
        let env = ci.child_ref("environment").map(str::to_string);
        apps.push(DeployedApplication::new(reference, env, version));
    }
    Ok(apps)
}
