use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Type discriminant of environment configuration items.
pub const UDM_ENVIRONMENT: &str = "udm.Environment";
/// Type discriminant of deployed-application configuration items.
pub const UDM_DEPLOYED_APPLICATION: &str = "udm.DeployedApplication";

/// Final segment of a `/`-separated repository path.
///
/// References are opaque hierarchical paths; the last segment is the local
/// name used for matching.
pub fn short_name(reference: &str) -> &str {
    reference.rsplit('/').next().unwrap_or(reference)
}

/// One entry of the deployed-applications listing (JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployedApplicationRef {
    #[serde(rename = "ref")]
    pub reference: String,
}

/// A typed configuration item decoded from the repository's XML body.
///
/// `refs` maps child element names to their `ref` attribute, e.g.
/// `version` -> `Applications/app1/1.0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigurationItem {
    pub id: String,
    pub type_name: String,
    pub refs: HashMap<String, String>,
}

impl ConfigurationItem {
    pub fn child_ref(&self, name: &str) -> Option<&str> {
        self.refs.get(name).map(|s| s.as_str())
    }
}

/// A deployed application decorated with its version and environment.
///
/// Built once per reconciliation run and immutable afterwards. Absent
/// sub-references stay `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployedApplication {
    pub reference: String,
    pub environment: Option<String>,
    pub version: Option<String>,
}

impl DeployedApplication {
    pub fn new(
        reference: impl Into<String>,
        environment: Option<String>,
        version: Option<String>,
    ) -> Self {
        Self {
            reference: reference.into(),
            environment,
            version,
        }
    }

    pub fn short_name(&self) -> &str {
        short_name(&self.reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_name() {
        assert_eq!(short_name("Environments/PROD/app"), "app");
        assert_eq!(short_name("app"), "app");
        assert_eq!(short_name(""), "");
    }

    #[test]
    fn test_deployed_application() {
        let app = DeployedApplication::new(
            "Applications/service/sms-service",
            Some("Environments/STG/sms-service-stg".to_string()),
            Some("Applications/service/sms-service/1.2.5".to_string()),
        );
        assert_eq!(app.short_name(), "sms-service");
        assert!(app.environment.as_deref().unwrap().ends_with("-stg"));
    }

    #[test]
    fn test_listing_entry_deserializes_ref_field() {
        let entry: DeployedApplicationRef =
            serde_json::from_str(r#"{"ref": "Environments/PROD/app/app1"}"#).unwrap();
        assert_eq!(entry.reference, "Environments/PROD/app/app1");
    }

    #[test]
    fn test_configuration_item_child_ref() {
        let mut refs = HashMap::new();
        refs.insert("version".to_string(), "Applications/app1/1.0".to_string());
        let ci = ConfigurationItem {
            id: "Environments/PROD/app1".to_string(),
            type_name: UDM_DEPLOYED_APPLICATION.to_string(),
            refs,
        };
        assert_eq!(ci.child_ref("version"), Some("Applications/app1/1.0"));
        assert_eq!(ci.child_ref("environment"), None);
    }
}
