//! Error handling and edge case tests.

use herald::codec::payload::{
    manifest_data_type, EXTENSION_CLUSTER_NAME, EXTENSION_DELETION_TIMESTAMP,
    EXTENSION_RESOURCE_ID, EXTENSION_RESOURCE_VERSION,
};
use herald::{
    binding, BindingError, Bridge, BridgeError, CodecError, DataType, Event, EventType,
    ExtensionValue, MemoryStore, ResourceKey, StoreError, SubResource, WireEvent,
};
use chrono::{TimeZone, Utc};
use serde_json::json;
use std::sync::Arc;

fn test_bridge() -> (Arc<MemoryStore>, Bridge<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let bridge = Bridge::new(Arc::clone(&store));
    (store, bridge)
}

fn manifest_event(id: &str, version: i64) -> Event {
    let event_type = EventType::new(manifest_data_type(), SubResource::Spec, "update_request");
    let mut event = Event::new("hub", &event_type)
        .with_extension(EXTENSION_RESOURCE_ID, id)
        .with_extension(EXTENSION_RESOURCE_VERSION, version)
        .with_extension(EXTENSION_CLUSTER_NAME, "cluster1");
    event.set_json_data(&json!({"manifest": {"kind": "Pod"}})).unwrap();
    event
}

fn publish(bridge: &Bridge<MemoryStore>, event: &Event) -> herald::Result<()> {
    bridge.publish(&binding::from_event(event))
}

// --- Codec Stages ---

#[test]
fn test_malformed_type_rejected() {
    let (store, bridge) = test_bridge();
    let mut event = manifest_event("r1", 1);
    event.event_type = "manifests.spec".to_string();

    let err = publish(&bridge, &event).unwrap_err();
    assert!(matches!(err, BridgeError::Codec(CodecError::MalformedType { .. })));
    assert!(err.to_string().contains("failed to parse event type"));
    assert!(store.is_empty());
}

#[test]
fn test_unsupported_data_type_rejected() {
    let (store, bridge) = test_bridge();
    let mut event = manifest_event("r1", 1);
    event.event_type = EventType::new(
        DataType::new("io.open-cluster-management.works", "v1alpha1", "manifestbundles"),
        SubResource::Spec,
        "create_request",
    )
    .to_string();

    let err = publish(&bridge, &event).unwrap_err();
    assert!(matches!(err, BridgeError::Codec(CodecError::UnsupportedType(_))));
    assert!(store.is_empty());
}

#[test]
fn test_each_required_extension_is_named() {
    for name in [
        EXTENSION_RESOURCE_ID,
        EXTENSION_RESOURCE_VERSION,
        EXTENSION_CLUSTER_NAME,
    ] {
        let (store, bridge) = test_bridge();
        let mut event = manifest_event("r1", 1);
        event.extensions.remove(name);

        match publish(&bridge, &event) {
            Err(BridgeError::Codec(CodecError::MissingExtension { name: missing, .. })) => {
                assert_eq!(missing, name)
            }
            other => panic!("Expected MissingExtension for {}, got {:?}", name, other),
        }
        assert!(store.is_empty());
    }
}

#[test]
fn test_non_integer_version_rejected() {
    let (_store, bridge) = test_bridge();
    let mut event = manifest_event("r1", 1);
    event.extensions.insert(
        EXTENSION_RESOURCE_VERSION.to_string(),
        ExtensionValue::String("v1".to_string()),
    );

    let err = publish(&bridge, &event).unwrap_err();
    assert!(matches!(
        err,
        BridgeError::Codec(CodecError::MissingExtension { ref name, .. }) if name == EXTENSION_RESOURCE_VERSION
    ));
}

#[test]
fn test_payload_error_includes_raw_data() {
    let (store, bridge) = test_bridge();
    let mut event = manifest_event("r1", 1);
    event.data = Some(b"[1, 2".to_vec());

    let err = publish(&bridge, &event).unwrap_err();
    assert!(matches!(err, BridgeError::Codec(CodecError::PayloadDecode { .. })));
    assert!(err.to_string().contains("[1, 2"));
    assert!(store.is_empty());
}

#[test]
fn test_missing_payload_accepted_with_unset_spec() {
    let (store, bridge) = test_bridge();
    let mut event = manifest_event("r1", 1);
    event.data = None;
    event.data_content_type = None;

    publish(&bridge, &event).unwrap();

    let stored = store.get(&ResourceKey::new("cluster1", "r1")).unwrap();
    assert_eq!(stored.spec, serde_json::Value::Null);
    assert_eq!(stored.resource_version, 1);
}

#[test]
fn test_deletion_request_without_data() {
    let (store, bridge) = test_bridge();
    let deleted_at = Utc.with_ymd_and_hms(2024, 6, 1, 12, 30, 0).unwrap();
    let event_type = EventType::new(manifest_data_type(), SubResource::Spec, "delete_request");
    let event = Event::new("hub", &event_type)
        .with_extension(EXTENSION_RESOURCE_ID, "r1")
        .with_extension(EXTENSION_RESOURCE_VERSION, 2i64)
        .with_extension(EXTENSION_CLUSTER_NAME, "cluster1")
        .with_extension(EXTENSION_DELETION_TIMESTAMP, deleted_at);
    assert!(event.data.is_none());

    publish(&bridge, &event).unwrap();

    let stored = store.get(&ResourceKey::new("cluster1", "r1")).unwrap();
    assert_eq!(stored.deletion_timestamp, Some(deleted_at));
    assert!(stored.is_deleting());
    assert_eq!(stored.spec, serde_json::Value::Null);
}

#[test]
fn test_invalid_deletion_timestamp_rejected() {
    let (store, bridge) = test_bridge();
    let event = manifest_event("r1", 1).with_extension(EXTENSION_DELETION_TIMESTAMP, 12345i64);

    let err = publish(&bridge, &event).unwrap_err();
    assert!(matches!(err, BridgeError::Codec(CodecError::InvalidTimestamp { .. })));
    assert!(store.is_empty());
}

// --- Binding ---

#[test]
fn test_wire_without_type_rejected() {
    let (store, bridge) = test_bridge();
    let mut wire = binding::from_event(&manifest_event("r1", 1));
    wire.event_type.clear();

    let err = bridge.publish(&wire).unwrap_err();
    assert!(matches!(
        err,
        BridgeError::Binding(BindingError::MissingAttribute("type"))
    ));
    assert!(store.is_empty());
}

#[test]
fn test_truncated_frame_rejected() {
    let bytes = binding::from_event(&manifest_event("r1", 1))
        .to_bytes()
        .unwrap();

    let result = WireEvent::from_bytes(&bytes[..bytes.len() / 2]);
    assert!(matches!(result, Err(BindingError::Frame(_))));
}

// --- Store ---

#[test]
fn test_stale_publish_rejected_and_newer_kept() {
    let (store, bridge) = test_bridge();
    publish(&bridge, &manifest_event("r1", 5)).unwrap();

    let err = publish(&bridge, &manifest_event("r1", 3)).unwrap_err();
    assert!(matches!(
        err,
        BridgeError::Store(StoreError::StaleVersion {
            current: 5,
            attempted: 3,
            ..
        })
    ));

    let stored = store.get(&ResourceKey::new("cluster1", "r1")).unwrap();
    assert_eq!(stored.resource_version, 5);
}

#[test]
fn test_failed_publish_does_not_notify() {
    let (_store, bridge) = test_bridge();
    let handle = bridge
        .broadcaster()
        .subscribe(herald::SubscriptionConfig::source("hub"));

    let mut event = manifest_event("r1", 1);
    event.extensions.remove(EXTENSION_CLUSTER_NAME);
    assert!(publish(&bridge, &event).is_err());

    assert!(handle.try_recv().is_err());
}
