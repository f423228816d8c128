//! Resource ⇄ event translation.

use super::event::{Event, EventType, ExtensionValue, SubResource};
use super::payload::{
    manifest_data_type, Manifest, ManifestStatus, EXTENSION_CLUSTER_NAME,
    EXTENSION_DELETION_TIMESTAMP, EXTENSION_RESOURCE_ID, EXTENSION_RESOURCE_VERSION,
    STATUS_UPDATE_ACTION,
};
use crate::error::CodecError;
use crate::types::{Resource, ResourceStatus};

/// Encode the status of a resource as a status-update event.
///
/// Only the status conditions travel in the payload; the manifest does not.
pub fn encode(resource: &Resource) -> Result<Event, CodecError> {
    let event_type = EventType::new(
        manifest_data_type(),
        SubResource::Status,
        STATUS_UPDATE_ACTION,
    );

    let mut event = Event::new(resource.source.clone(), &event_type)
        .with_extension(EXTENSION_RESOURCE_ID, resource.resource_id.clone())
        .with_extension(EXTENSION_RESOURCE_VERSION, resource.resource_version)
        .with_extension(EXTENSION_CLUSTER_NAME, resource.namespace.clone());

    if let Some(deleted_at) = resource.deletion_timestamp {
        event = event.with_extension(EXTENSION_DELETION_TIMESTAMP, deleted_at);
    }

    let status = ManifestStatus {
        conditions: resource.status.conditions.clone(),
    };
    event
        .set_json_data(&status)
        .map_err(|e| CodecError::Encoding(e.to_string()))?;

    Ok(event)
}

/// Decode a manifest event into a resource.
///
/// Stages run in order and stop at the first failure: type parsing, data
/// type check, required extensions, payload, then the optional deletion
/// timestamp. An event without data decodes to a resource whose spec is
/// `Null`.
pub fn decode(event: &Event) -> Result<Resource, CodecError> {
    let event_type: EventType =
        event
            .event_type
            .parse()
            .map_err(|reason| CodecError::MalformedType {
                event_type: event.event_type.clone(),
                reason,
            })?;

    if event_type.data_type != manifest_data_type() {
        return Err(CodecError::UnsupportedType(event_type.data_type.to_string()));
    }

    let resource_id = required(event, EXTENSION_RESOURCE_ID, ExtensionValue::as_string)?;
    let resource_version = required(event, EXTENSION_RESOURCE_VERSION, ExtensionValue::as_integer)?;
    let namespace = required(event, EXTENSION_CLUSTER_NAME, ExtensionValue::as_string)?;

    // Deletion requests may carry no data at all; the manifest stays unset.
    let data = event.data_bytes();
    let manifest = if data.is_empty() {
        Manifest::default()
    } else {
        serde_json::from_slice::<Manifest>(data).map_err(|e| CodecError::PayloadDecode {
            payload: String::from_utf8_lossy(data).into_owned(),
            reason: e.to_string(),
        })?
    };

    let deletion_timestamp = match event.extension(EXTENSION_DELETION_TIMESTAMP) {
        Some(value) => Some(value.as_timestamp().map_err(|reason| {
            CodecError::InvalidTimestamp {
                value: value.to_string(),
                reason,
            }
        })?),
        None => None,
    };

    Ok(Resource {
        source: event.source.clone(),
        resource_id,
        resource_version,
        namespace,
        spec: manifest.manifest,
        status: ResourceStatus::default(),
        deletion_timestamp,
    })
}

fn required<T>(
    event: &Event,
    name: &str,
    convert: impl Fn(&ExtensionValue) -> Result<T, String>,
) -> Result<T, CodecError> {
    let value = event
        .extension(name)
        .ok_or_else(|| CodecError::MissingExtension {
            name: name.to_string(),
            reason: "not present".to_string(),
        })?;

    convert(value).map_err(|reason| CodecError::MissingExtension {
        name: name.to_string(),
        reason,
    })
}
