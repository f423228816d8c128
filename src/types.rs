//! Core types for the bridge.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a logical resource instance in the store.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey {
    pub namespace: String,
    pub resource_id: String,
}

impl ResourceKey {
    pub fn new(namespace: impl Into<String>, resource_id: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            resource_id: resource_id.into(),
        }
    }
}

impl fmt::Debug for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourceKey({}/{})", self.namespace, self.resource_id)
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.resource_id)
    }
}

/// Status of a condition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

impl Default for ConditionStatus {
    fn default() -> Self {
        ConditionStatus::Unknown
    }
}

/// One observation of a resource's state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub condition_type: String,

    pub status: ConditionStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    pub last_transition_time: DateTime<Utc>,

    #[serde(default)]
    pub reason: String,

    #[serde(default)]
    pub message: String,
}

impl Condition {
    /// Create a condition that transitioned now.
    pub fn new(
        condition_type: impl Into<String>,
        status: ConditionStatus,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            condition_type: condition_type.into(),
            status,
            observed_generation: None,
            last_transition_time: Utc::now(),
            reason: reason.into(),
            message: message.into(),
        }
    }
}

/// Reported status of a resource.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

/// A namespaced, versioned object synchronized between a publisher and its
/// subscribers.
///
/// Resources are handed around by value. A delivered resource never shares
/// state with the copy held by the store.
#[derive(Clone, Debug, PartialEq)]
pub struct Resource {
    /// Origin identifier, matched against subscription filters.
    pub source: String,

    /// Unique within a namespace.
    pub resource_id: String,

    /// Non-decreasing across updates of the same key.
    pub resource_version: i64,

    /// Logical partition, usually the target cluster.
    pub namespace: String,

    /// Desired state (the manifest), opaque to the bridge.
    pub spec: serde_json::Value,

    pub status: ResourceStatus,

    /// Set when the resource is marked for deletion.
    pub deletion_timestamp: Option<DateTime<Utc>>,
}

impl Resource {
    /// Create a resource with an empty spec and status.
    pub fn new(
        source: impl Into<String>,
        namespace: impl Into<String>,
        resource_id: impl Into<String>,
        resource_version: i64,
    ) -> Self {
        Self {
            source: source.into(),
            resource_id: resource_id.into(),
            resource_version,
            namespace: namespace.into(),
            spec: serde_json::Value::Null,
            status: ResourceStatus::default(),
            deletion_timestamp: None,
        }
    }

    /// Set the desired state.
    pub fn with_spec(mut self, spec: serde_json::Value) -> Self {
        self.spec = spec;
        self
    }

    /// Set the status conditions.
    pub fn with_conditions(mut self, conditions: Vec<Condition>) -> Self {
        self.status.conditions = conditions;
        self
    }

    /// Mark for deletion.
    pub fn with_deletion_timestamp(mut self, at: DateTime<Utc>) -> Self {
        self.deletion_timestamp = Some(at);
        self
    }

    pub fn key(&self) -> ResourceKey {
        ResourceKey::new(self.namespace.clone(), self.resource_id.clone())
    }

    pub fn is_deleting(&self) -> bool {
        self.deletion_timestamp.is_some()
    }
}
