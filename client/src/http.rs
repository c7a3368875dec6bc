use crate::config::{Credentials, DeployConfig};
use crate::error::{ClientError, ClientResult};
use crate::repository::DeployApi;
use crate::types::ConfigurationItem;
use crate::xml;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use tracing::{debug, info, warn};

const XML: &str = "application/xml";

/// HTTP implementation of [`DeployApi`].
///
/// One `reqwest::Client` per instance, configured timeout, basic auth from
/// an immutable `Credentials` value on every request.
pub struct HttpDeployClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Credentials,
}

impl HttpDeployClient {
    pub fn new(config: DeployConfig) -> ClientResult<Self> {
        config
            .validate()
            .map_err(|message| ClientError::InvalidConfig { message })?;

        let base_url = if config.base_url.ends_with('/') {
            config.base_url.clone()
        } else {
            format!("{}/", config.base_url)
        };

        let mut builder = reqwest::Client::builder().timeout(config.timeout);
        if !config.verify_tls {
            warn!("TLS certificate validation is disabled");
            builder = builder.danger_accept_invalid_certs(true);
        }
        let http = builder.build().map_err(|e| ClientError::InvalidConfig {
            message: format!("Failed to build HTTP client: {}", e),
        })?;

        Ok(Self {
            http,
            base_url,
            credentials: config.credentials,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.http.get(url).basic_auth(
            &self.credentials.username,
            Some(&self.credentials.password),
        )
    }

    fn post(&self, url: &str) -> reqwest::RequestBuilder {
        self.http.post(url).basic_auth(
            &self.credentials.username,
            Some(&self.credentials.password),
        )
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        url: &str,
    ) -> ClientResult<reqwest::Response> {
        let response = request
            .send()
            .await
            .map_err(|e| ClientError::from_reqwest(e, url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Remote {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn body_text(&self, response: reqwest::Response, url: &str) -> ClientResult<String> {
        response
            .text()
            .await
            .map_err(|e| ClientError::from_reqwest(e, url))
    }
}

#[async_trait]
impl DeployApi for HttpDeployClient {
    async fn exists(&self, reference: &str) -> ClientResult<bool> {
        debug!("Checking existence of {}", reference);
        let url = self.url(&format!("deployit/repository/exists/{}", reference));

        // Failures are swallowed into `false` at this boundary; callers
        // cannot tell "absent" from "unreachable".
        let response = match self.send(self.get(&url), &url).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Existence check for {} failed: {}", reference, e);
                return Ok(false);
            }
        };

        let body = match self.body_text(response, &url).await {
            Ok(body) => body,
            Err(e) => {
                warn!("Existence check for {} failed: {}", reference, e);
                return Ok(false);
            }
        };

        match xml::parse_boolean(&body) {
            Ok(present) => Ok(present),
            Err(e) => {
                warn!("Existence check for {} returned unexpected body: {}", reference, e);
                Ok(false)
            }
        }
    }

    async fn query_children(
        &self,
        ancestor: &str,
        type_name: &str,
        name_pattern: Option<&str>,
        page_size: u32,
    ) -> ClientResult<Vec<String>> {
        debug!("Querying {} items under {}", type_name, ancestor);
        let url = self.url("deployit/repository/v2/query");

        let mut params = vec![
            ("ancestor", ancestor.to_string()),
            ("type", type_name.to_string()),
            ("resultsPerPage", page_size.to_string()),
        ];
        if let Some(pattern) = name_pattern {
            params.push(("namePattern", pattern.to_string()));
        }

        let response = self.send(self.get(&url).query(&params), &url).await?;
        let body = self.body_text(response, &url).await?;
        let refs = xml::parse_ci_list(&body)?;

        info!("Query under {} returned {} refs", ancestor, refs.len());
        Ok(refs)
    }

    async fn deployed_application_refs(&self, environment: &str) -> ClientResult<Vec<String>> {
        debug!("Listing deployed applications in {}", environment);
        let url = self.url(&format!(
            "deployit/environment/{}/deployed-applications",
            environment
        ));

        let response = self.send(self.get(&url), &url).await?;
        let entries: Vec<crate::types::DeployedApplicationRef> = response
            .json()
            .await
            .map_err(|e| ClientError::from_reqwest(e, &url))?;

        // Refs occasionally arrive with escaped separators; strip them.
        Ok(entries
            .into_iter()
            .map(|e| e.reference.replace('\\', ""))
            .collect())
    }

    async fn read_configuration_item(
        &self,
        type_name: &str,
        reference: &str,
    ) -> ClientResult<ConfigurationItem> {
        debug!("Reading configuration item {}", reference);
        let url = self.url(&format!("deployit/repository/ci/{}", reference));

        let response = self.send(self.get(&url), &url).await?;
        let body = self.body_text(response, &url).await?;
        xml::decode_configuration_item(type_name, reference, &body)
    }

    async fn prepare_initial(&self, version: &str, environment: &str) -> ClientResult<String> {
        debug!("Preparing initial deployment of {} to {}", version, environment);
        let url = self.url("deployit/deployment/prepare/initial");

        let params = [("version", version), ("environment", environment)];
        let response = self.send(self.get(&url).query(&params), &url).await?;
        self.body_text(response, &url).await
    }

    async fn prepare_update(
        &self,
        version: &str,
        deployed_application: &str,
    ) -> ClientResult<String> {
        debug!(
            "Preparing update of {} for {}",
            deployed_application, version
        );
        let url = self.url("deployit/deployment/prepare/update");

        let params = [
            ("version", version),
            ("deployedApplication", deployed_application),
        ];
        let response = self.send(self.get(&url).query(&params), &url).await?;
        self.body_text(response, &url).await
    }

    async fn generate_selected(
        &self,
        deployment_xml: &str,
        deployables: &[String],
    ) -> ClientResult<String> {
        debug!("Generating deployeds for {} deployables", deployables.len());
        let url = self.url("deployit/deployment/generate/selected");

        let params: Vec<(&str, &str)> = deployables
            .iter()
            .map(|r| ("deployables", r.as_str()))
            .collect();

        let request = self
            .post(&url)
            .header(CONTENT_TYPE, XML)
            .header(ACCEPT, XML)
            .query(&params)
            .body(deployment_xml.to_string());
        let response = self.send(request, &url).await?;
        self.body_text(response, &url).await
    }

    async fn create_task(&self, deployment_xml: &str) -> ClientResult<String> {
        debug!("Creating deployment task");
        let url = self.url("deployit/deployment");

        let request = self
            .post(&url)
            .header(CONTENT_TYPE, XML)
            .header(ACCEPT, XML)
            .body(deployment_xml.to_string());
        let response = self.send(request, &url).await?;
        let task_id = self.body_text(response, &url).await?.trim().to_string();

        info!("Created deployment task {}", task_id);
        Ok(task_id)
    }

    async fn start_task(&self, task_id: &str) -> ClientResult<()> {
        debug!("Starting task {}", task_id);
        let url = self.url(&format!("deployit/task/{}/start", task_id));

        let response = self
            .post(&url)
            .send()
            .await
            .map_err(|e| ClientError::from_reqwest(e, &url))?;

        let status = response.status();
        if status != reqwest::StatusCode::NO_CONTENT {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Remote {
                status: status.as_u16(),
                body,
            });
        }

        info!("Task {} started", task_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{UDM_DEPLOYED_APPLICATION, UDM_ENVIRONMENT};

    fn client_for(url: String) -> HttpDeployClient {
        HttpDeployClient::new(DeployConfig::default().with_base_url(url)).unwrap()
    }

    #[test]
    fn test_base_url_normalization() {
        let client = client_for("http://localhost:4516".to_string());
        assert_eq!(client.base_url, "http://localhost:4516/");

        let client = client_for("http://localhost:4516/".to_string());
        assert_eq!(client.base_url, "http://localhost:4516/");
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let result = HttpDeployClient::new(DeployConfig::default().with_base_url(""));
        assert!(matches!(result, Err(ClientError::InvalidConfig { .. })));
    }

    #[tokio::test]
    async fn test_exists_true_and_false() {
        let mut server = mockito::Server::new_async().await;
        let _present = server
            .mock("GET", "/deployit/repository/exists/Environments/PROD")
            .with_status(200)
            .with_body("<boolean>true</boolean>")
            .create_async()
            .await;
        let _absent = server
            .mock("GET", "/deployit/repository/exists/Environments/GONE")
            .with_status(200)
            .with_body("<boolean>false</boolean>")
            .create_async()
            .await;

        let client = client_for(server.url());
        assert!(client.exists("Environments/PROD").await.unwrap());
        assert!(!client.exists("Environments/GONE").await.unwrap());
    }

    #[tokio::test]
    async fn test_exists_swallows_remote_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/deployit/repository/exists/Environments/PROD")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let client = client_for(server.url());
        assert!(!client.exists("Environments/PROD").await.unwrap());
    }

    #[tokio::test]
    async fn test_exists_swallows_transport_failure() {
        // Nothing listens here; the connection error must come back as false.
        let client = client_for("http://127.0.0.1:1".to_string());
        assert!(!client.exists("Environments/PROD").await.unwrap());
    }

    #[tokio::test]
    async fn test_query_children_normalizes_shapes() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/deployit/repository/v2/query")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"<list><ci ref="Environments/STG/only" type="udm.Environment"/></list>"#)
            .create_async()
            .await;

        let client = client_for(server.url());
        let refs = client
            .query_children("Environments/STG", UDM_ENVIRONMENT, None, 1000)
            .await
            .unwrap();
        assert_eq!(refs, vec!["Environments/STG/only"]);
    }

    #[tokio::test]
    async fn test_query_children_empty_is_not_an_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/deployit/repository/v2/query")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body("<list/>")
            .create_async()
            .await;

        let client = client_for(server.url());
        let refs = client
            .query_children("Environments/STG", UDM_ENVIRONMENT, Some("app-*"), 1000)
            .await
            .unwrap();
        assert!(refs.is_empty());
    }

    #[tokio::test]
    async fn test_query_children_surfaces_remote_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/deployit/repository/v2/query")
            .match_query(mockito::Matcher::Any)
            .with_status(403)
            .with_body("forbidden")
            .create_async()
            .await;

        let client = client_for(server.url());
        let err = client
            .query_children("Environments/STG", UDM_ENVIRONMENT, None, 1000)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Remote { status: 403, .. }));
    }

    #[tokio::test]
    async fn test_deployed_application_refs_strips_backslashes() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock(
                "GET",
                "/deployit/environment/Environments/STG/app1-stg/deployed-applications",
            )
            .with_status(200)
            .with_body(r#"[{"ref": "Environments\\/STG\\/app1-stg\\/app1"}]"#)
            .create_async()
            .await;

        let client = client_for(server.url());
        let refs = client
            .deployed_application_refs("Environments/STG/app1-stg")
            .await
            .unwrap();
        assert_eq!(refs, vec!["Environments/STG/app1-stg/app1"]);
    }

    #[tokio::test]
    async fn test_deployed_application_refs_propagates_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock(
                "GET",
                "/deployit/environment/Environments/STG/deployed-applications",
            )
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let client = client_for(server.url());
        let err = client
            .deployed_application_refs("Environments/STG")
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Remote { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_read_configuration_item_type_mismatch() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/deployit/repository/ci/Environments/PROD/app1")
            .with_status(200)
            .with_body(r#"<udm.Environment id="Environments/PROD/app1"/>"#)
            .create_async()
            .await;

        let client = client_for(server.url());
        let err = client
            .read_configuration_item(UDM_DEPLOYED_APPLICATION, "Environments/PROD/app1")
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::TypeMismatch { .. }));
    }

    #[tokio::test]
    async fn test_create_task_trims_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/deployit/deployment")
            .with_status(200)
            .with_body("4711-task\n")
            .create_async()
            .await;

        let client = client_for(server.url());
        let task_id = client.create_task("<deployment/>").await.unwrap();
        assert_eq!(task_id, "4711-task");
    }

    #[tokio::test]
    async fn test_start_task_requires_no_content() {
        let mut server = mockito::Server::new_async().await;
        let _ok = server
            .mock("POST", "/deployit/task/good/start")
            .with_status(204)
            .create_async()
            .await;
        let _bad = server
            .mock("POST", "/deployit/task/bad/start")
            .with_status(200)
            .with_body("unexpected")
            .create_async()
            .await;

        let client = client_for(server.url());
        client.start_task("good").await.unwrap();

        let err = client.start_task("bad").await.unwrap_err();
        assert!(matches!(err, ClientError::Remote { status: 200, .. }));
    }

    #[tokio::test]
    async fn test_generate_selected_posts_payload() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/deployit/deployment/generate/selected")
            .match_query(mockito::Matcher::Any)
            .match_body("<deployment/>")
            .with_status(200)
            .with_body("<deployment><deployeds/></deployment>")
            .create_async()
            .await;

        let client = client_for(server.url());
        let generated = client
            .generate_selected("<deployment/>", &["Applications/app1/1.0/web".to_string()])
            .await
            .unwrap();
        assert_eq!(generated, "<deployment><deployeds/></deployment>");
    }
}
