//! Payloads carried in the event data field, and the names the codec relies on.

use super::event::DataType;
use crate::types::Condition;
use serde::{Deserialize, Serialize};

pub const MANIFEST_GROUP: &str = "io.open-cluster-management.works";
pub const MANIFEST_VERSION: &str = "v1alpha1";
pub const MANIFEST_RESOURCE: &str = "manifests";

/// Action set on outbound status events.
pub const STATUS_UPDATE_ACTION: &str = "status_update";

pub const EXTENSION_RESOURCE_ID: &str = "resourceid";
pub const EXTENSION_RESOURCE_VERSION: &str = "resourceversion";
pub const EXTENSION_CLUSTER_NAME: &str = "clustername";
pub const EXTENSION_DELETION_TIMESTAMP: &str = "deletiontimestamp";

/// The only data type this codec accepts.
pub fn manifest_data_type() -> DataType {
    DataType::new(MANIFEST_GROUP, MANIFEST_VERSION, MANIFEST_RESOURCE)
}

/// Inbound payload: the desired state of one resource.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub manifest: serde_json::Value,
}

/// Outbound payload: the observed status of one resource.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ManifestStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
}
