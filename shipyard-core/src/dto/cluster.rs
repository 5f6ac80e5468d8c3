//! Cluster manifests
//!
//! Minimal Kubernetes `Service` and `apps/v1 Deployment` shapes: one network
//! entry point and one workload with a single container on port 80.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Annotation read by the ingress gateway to route a host to a service
pub const ROUTING_ANNOTATION: &str = "getambassador.io/config";

/// Port served by every deployed container
pub const CONTAINER_PORT: u16 = 80;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
}

/// Any object, when only its metadata matters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectHeader {
    #[serde(default)]
    pub metadata: ObjectMeta,
}

// =============================================================================
// Service
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    pub spec: ServiceSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSpec {
    #[serde(default)]
    pub selector: BTreeMap<String, String>,

    #[serde(default)]
    pub ports: Vec<ServicePort>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePort {
    pub port: u16,
    pub target_port: u16,
}

impl Service {
    /// Service named `id` that routes `host` to pods matching `labels`
    pub fn routed(id: &str, host: &str, labels: &BTreeMap<String, String>) -> Self {
        let mut annotations = BTreeMap::new();
        annotations.insert(ROUTING_ANNOTATION.to_string(), routing_mapping(id, host));

        Self {
            api_version: "v1".to_string(),
            kind: "Service".to_string(),
            metadata: ObjectMeta {
                name: id.to_string(),
                annotations,
                ..Default::default()
            },
            spec: ServiceSpec {
                selector: labels.clone(),
                ports: vec![ServicePort {
                    port: CONTAINER_PORT,
                    target_port: CONTAINER_PORT,
                }],
            },
        }
    }
}

/// Ambassador `Mapping` binding `host` to the service `id`
fn routing_mapping(id: &str, host: &str) -> String {
    format!(
        "---\napiVersion: ambassador/v0\nkind: Mapping\nname: {id}\nhost: {host}\nservice: {id}\n"
    )
}

// =============================================================================
// Deployment
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    pub spec: DeploymentSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentSpec {
    pub replicas: i32,
    pub strategy: DeploymentStrategy,
    pub selector: LabelSelector,
    pub template: PodTemplate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentStrategy {
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelSelector {
    pub match_labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PodTemplate {
    pub metadata: ObjectMeta,
    pub spec: PodSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PodSpec {
    pub containers: Vec<Container>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub name: String,
    pub image: String,
    #[serde(default)]
    pub ports: Vec<ContainerPort>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerPort {
    pub container_port: u16,
}

impl Deployment {
    /// Single replica, rolling-update deployment of `image` named `id`
    ///
    /// Pod labels equal the selector, which equals the service selector.
    pub fn single_replica(id: &str, image: &str, labels: &BTreeMap<String, String>) -> Self {
        Self {
            api_version: "apps/v1".to_string(),
            kind: "Deployment".to_string(),
            metadata: ObjectMeta {
                name: id.to_string(),
                ..Default::default()
            },
            spec: DeploymentSpec {
                replicas: 1,
                strategy: DeploymentStrategy {
                    kind: "RollingUpdate".to_string(),
                },
                selector: LabelSelector {
                    match_labels: labels.clone(),
                },
                template: PodTemplate {
                    metadata: ObjectMeta {
                        labels: labels.clone(),
                        ..Default::default()
                    },
                    spec: PodSpec {
                        containers: vec![Container {
                            name: id.to_string(),
                            image: image.to_string(),
                            ports: vec![ContainerPort {
                                container_port: CONTAINER_PORT,
                            }],
                        }],
                    },
                },
            },
        }
    }
}
