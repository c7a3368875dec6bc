//! Decode step for the server's XML bodies.
//!
//! Every response shape is turned into a typed value here; shape mismatches
//! fail fast instead of leaking string-keyed lookups into business logic.

use crate::error::{ClientError, ClientResult};
use crate::types::ConfigurationItem;
use std::collections::HashMap;

fn parse_document(body: &str) -> ClientResult<roxmltree::Document<'_>> {
    roxmltree::Document::parse(body).map_err(|e| ClientError::Decode {
        message: format!("invalid XML: {}", e),
    })
}

/// Decode `<boolean>true</boolean>` existence responses.
pub fn parse_boolean(body: &str) -> ClientResult<bool> {
    let doc = parse_document(body)?;
    let root = doc.root_element();
    if root.tag_name().name() != "boolean" {
        return Err(ClientError::Decode {
            message: format!("expected <boolean>, got <{}>", root.tag_name().name()),
        });
    }
    Ok(root.text().map(str::trim) == Some("true"))
}

/// Decode a `<list>` of `<ci ref="…"/>` entries into the refs.
///
/// The one-result and many-result shapes come out as the same uniform list;
/// zero matches decode to an empty vec. Entries without a `ref` attribute
/// are skipped.
pub fn parse_ci_list(body: &str) -> ClientResult<Vec<String>> {
    let doc = parse_document(body)?;
    let root = doc.root_element();
    if root.tag_name().name() != "list" {
        return Err(ClientError::Decode {
            message: format!("expected <list>, got <{}>", root.tag_name().name()),
        });
    }
    Ok(root
        .children()
        .filter(|n| n.is_element() && n.tag_name().name() == "ci")
        .filter_map(|n| n.attribute("ref").map(str::to_string))
        .collect())
}

/// Decode a configuration-item body, checking the type discriminant.
///
/// The root element name carries the CI type; a mismatch against
/// `expected_type` is a `TypeMismatch`. Child elements carrying a `ref`
/// attribute (e.g. `version`, `environment`) are collected into the item's
/// ref map.
pub fn decode_configuration_item(
    expected_type: &str,
    reference: &str,
    body: &str,
) -> ClientResult<ConfigurationItem> {
    let doc = parse_document(body)?;
    let root = doc.root_element();
    let actual = root.tag_name().name();
    if actual != expected_type {
        return Err(ClientError::TypeMismatch {
            reference: reference.to_string(),
            expected: expected_type.to_string(),
            actual: actual.to_string(),
        });
    }

    let mut refs = HashMap::new();
    for child in root.children().filter(|n| n.is_element()) {
        if let Some(r) = child.attribute("ref") {
            refs.insert(child.tag_name().name().to_string(), r.to_string());
        }
    }

    Ok(ConfigurationItem {
        id: root.attribute("id").unwrap_or(reference).to_string(),
        type_name: actual.to_string(),
        refs,
    })
}

/// Extract every deployable's ref from a prepared deployment payload.
///
/// The payload itself stays opaque; only `<deployment><deployables><ci
/// ref="…"/></deployables>` is read. A payload without a deployables
/// section is malformed.
pub fn deployable_refs(deployment_xml: &str) -> ClientResult<Vec<String>> {
    let doc = parse_document(deployment_xml)?;
    let root = doc.root_element();
    if root.tag_name().name() != "deployment" {
        return Err(ClientError::Decode {
            message: format!("expected <deployment>, got <{}>", root.tag_name().name()),
        });
    }

    let deployables = root
        .children()
        .find(|n| n.is_element() && n.tag_name().name() == "deployables")
        .ok_or_else(|| ClientError::Decode {
            message: "deployment payload has no <deployables> section".to_string(),
        })?;

    Ok(deployables
        .children()
        .filter(|n| n.is_element() && n.tag_name().name() == "ci")
        .filter_map(|n| n.attribute("ref").map(str::to_string))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UDM_DEPLOYED_APPLICATION;

    #[test]
    fn test_parse_boolean() {
        assert!(parse_boolean("<boolean>true</boolean>").unwrap());
        assert!(!parse_boolean("<boolean>false</boolean>").unwrap());
        assert!(parse_boolean("<flag>true</flag>").is_err());
        assert!(parse_boolean("not xml").is_err());
    }

    #[test]
    fn test_parse_ci_list_many() {
        let body = r#"<list>
            <ci ref="Environments/PROD/app1" type="udm.Environment"/>
            <ci ref="Environments/PROD/app2" type="udm.Environment"/>
        </list>"#;
        let refs = parse_ci_list(body).unwrap();
        assert_eq!(refs, vec!["Environments/PROD/app1", "Environments/PROD/app2"]);
    }

    #[test]
    fn test_parse_ci_list_single_and_empty() {
        let one = parse_ci_list(r#"<list><ci ref="Environments/PROD/only"/></list>"#).unwrap();
        assert_eq!(one, vec!["Environments/PROD/only"]);

        let none = parse_ci_list("<list/>").unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_parse_ci_list_skips_entries_without_ref() {
        let refs = parse_ci_list(r#"<list><ci/><ci ref="Environments/PROD/kept"/></list>"#).unwrap();
        assert_eq!(refs, vec!["Environments/PROD/kept"]);
    }

    #[test]
    fn test_decode_configuration_item() {
        let body = r#"<udm.DeployedApplication id="Environments/PROD/app1">
            <version ref="Applications/app1/1.0"/>
            <environment ref="Environments/PROD"/>
            <deployeds/>
        </udm.DeployedApplication>"#;
        let ci =
            decode_configuration_item(UDM_DEPLOYED_APPLICATION, "Environments/PROD/app1", body)
                .unwrap();
        assert_eq!(ci.type_name, UDM_DEPLOYED_APPLICATION);
        assert_eq!(ci.child_ref("version"), Some("Applications/app1/1.0"));
        assert_eq!(ci.child_ref("environment"), Some("Environments/PROD"));
        assert_eq!(ci.child_ref("deployeds"), None);
    }

    #[test]
    fn test_decode_configuration_item_type_mismatch() {
        let body = r#"<udm.Environment id="Environments/PROD"/>"#;
        let err = decode_configuration_item(UDM_DEPLOYED_APPLICATION, "Environments/PROD", body)
            .unwrap_err();
        match err {
            ClientError::TypeMismatch {
                expected, actual, ..
            } => {
                assert_eq!(expected, UDM_DEPLOYED_APPLICATION);
                assert_eq!(actual, "udm.Environment");
            }
            other => panic!("expected TypeMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_configuration_item_optional_refs_absent() {
        let body = r#"<udm.DeployedApplication id="Environments/PROD/app1"/>"#;
        let ci =
            decode_configuration_item(UDM_DEPLOYED_APPLICATION, "Environments/PROD/app1", body)
                .unwrap();
        assert!(ci.refs.is_empty());
    }

    #[test]
    fn test_deployable_refs() {
        let body = r#"<deployment id="0" type="INITIAL">
            <deployables>
                <ci ref="Applications/app1/1.0/web"/>
                <ci ref="Applications/app1/1.0/db"/>
            </deployables>
            <deployeds/>
        </deployment>"#;
        let refs = deployable_refs(body).unwrap();
        assert_eq!(refs, vec!["Applications/app1/1.0/web", "Applications/app1/1.0/db"]);
    }

    #[test]
    fn test_deployable_refs_missing_section() {
        let err = deployable_refs("<deployment/>").unwrap_err();
        assert!(matches!(err, ClientError::Decode { .. }));
    }
}
