//! Wire message for the CloudEvents transport and its conversions.
//!
//! [`WireEvent`] follows the shape of the CloudEvents protobuf message: the
//! four required context attributes as fields, everything else in an
//! attribute map, and the payload as either bytes or text.
//!
//! The conversions here are written for this message specifically. Every
//! extension and the full payload must survive [`from_event`] followed by
//! [`to_event`]; a generic converter that goes through an intermediate
//! representation is not a substitute.

use crate::codec::{Event, ExtensionValue};
use crate::error::BindingError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const ATTR_DATA_CONTENT_TYPE: &str = "datacontenttype";
const ATTR_TIME: &str = "time";

/// A typed attribute value on the wire.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireAttribute {
    CeBoolean(bool),
    CeInteger(i64),
    CeString(String),
    CeBytes(Vec<u8>),
    CeUri(String),
    CeUriRef(String),
    CeTimestamp(DateTime<Utc>),
}

/// Event payload on the wire.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireData {
    Binary(Vec<u8>),
    Text(String),
}

/// CloudEvent as carried by the transport.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WireEvent {
    pub id: String,
    pub source: String,
    pub spec_version: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, WireAttribute>,
    #[serde(default)]
    pub data: Option<WireData>,
}

impl WireEvent {
    /// Frame the message for the transport.
    pub fn to_bytes(&self) -> Result<Vec<u8>, BindingError> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    /// Parse a framed message.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BindingError> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

impl From<&ExtensionValue> for WireAttribute {
    fn from(value: &ExtensionValue) -> Self {
        match value {
            ExtensionValue::Boolean(b) => WireAttribute::CeBoolean(*b),
            ExtensionValue::Integer(i) => WireAttribute::CeInteger(*i),
            ExtensionValue::String(s) => WireAttribute::CeString(s.clone()),
            ExtensionValue::Binary(b) => WireAttribute::CeBytes(b.clone()),
            ExtensionValue::Uri(s) => WireAttribute::CeUri(s.clone()),
            ExtensionValue::UriRef(s) => WireAttribute::CeUriRef(s.clone()),
            ExtensionValue::Timestamp(t) => WireAttribute::CeTimestamp(*t),
        }
    }
}

impl From<WireAttribute> for ExtensionValue {
    fn from(value: WireAttribute) -> Self {
        match value {
            WireAttribute::CeBoolean(b) => ExtensionValue::Boolean(b),
            WireAttribute::CeInteger(i) => ExtensionValue::Integer(i),
            WireAttribute::CeString(s) => ExtensionValue::String(s),
            WireAttribute::CeBytes(b) => ExtensionValue::Binary(b),
            WireAttribute::CeUri(s) => ExtensionValue::Uri(s),
            WireAttribute::CeUriRef(s) => ExtensionValue::UriRef(s),
            WireAttribute::CeTimestamp(t) => ExtensionValue::Timestamp(t),
        }
    }
}

/// Convert an event into its wire form.
pub fn from_event(event: &Event) -> WireEvent {
    let mut attributes: BTreeMap<String, WireAttribute> = event
        .extensions
        .iter()
        .map(|(name, value)| (name.clone(), WireAttribute::from(value)))
        .collect();

    if let Some(content_type) = &event.data_content_type {
        attributes.insert(
            ATTR_DATA_CONTENT_TYPE.to_string(),
            WireAttribute::CeString(content_type.clone()),
        );
    }
    if let Some(time) = event.time {
        attributes.insert(ATTR_TIME.to_string(), WireAttribute::CeTimestamp(time));
    }

    let data = event.data.as_ref().map(|bytes| {
        if is_textual(event.data_content_type.as_deref()) {
            match String::from_utf8(bytes.clone()) {
                Ok(text) => WireData::Text(text),
                Err(e) => WireData::Binary(e.into_bytes()),
            }
        } else {
            WireData::Binary(bytes.clone())
        }
    });

    WireEvent {
        id: event.id.clone(),
        source: event.source.clone(),
        spec_version: event.spec_version.clone(),
        event_type: event.event_type.clone(),
        attributes,
        data,
    }
}

/// Convert a wire message into an event.
pub fn to_event(wire: &WireEvent) -> Result<Event, BindingError> {
    require("id", &wire.id)?;
    require("source", &wire.source)?;
    require("specversion", &wire.spec_version)?;
    require("type", &wire.event_type)?;

    let mut event = Event {
        id: wire.id.clone(),
        source: wire.source.clone(),
        spec_version: wire.spec_version.clone(),
        event_type: wire.event_type.clone(),
        time: None,
        data_content_type: None,
        extensions: BTreeMap::new(),
        data: None,
    };

    for (name, value) in &wire.attributes {
        match name.as_str() {
            ATTR_DATA_CONTENT_TYPE => match value {
                WireAttribute::CeString(s) => event.data_content_type = Some(s.clone()),
                other => return Err(invalid(name, format!("expected string, got {:?}", other))),
            },
            ATTR_TIME => {
                let time = ExtensionValue::from(value.clone())
                    .as_timestamp()
                    .map_err(|reason| invalid(name, reason))?;
                event.time = Some(time);
            }
            _ => {
                validate_name(name)?;
                event
                    .extensions
                    .insert(name.clone(), ExtensionValue::from(value.clone()));
            }
        }
    }

    event.data = wire.data.as_ref().map(|data| match data {
        WireData::Binary(bytes) => bytes.clone(),
        WireData::Text(text) => text.clone().into_bytes(),
    });

    Ok(event)
}

fn require(name: &'static str, value: &str) -> Result<(), BindingError> {
    if value.is_empty() {
        Err(BindingError::MissingAttribute(name))
    } else {
        Ok(())
    }
}

fn invalid(name: &str, reason: String) -> BindingError {
    BindingError::InvalidAttribute {
        name: name.to_string(),
        reason,
    }
}

/// Extension names are lowercase ASCII letters and digits. Names past
/// CloudEvents' recommended 20 characters are still carried.
fn validate_name(name: &str) -> Result<(), BindingError> {
    if name.is_empty() {
        return Err(invalid(name, "must not be empty".to_string()));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
    {
        return Err(invalid(name, "must be lowercase alphanumeric".to_string()));
    }
    Ok(())
}

fn is_textual(content_type: Option<&str>) -> bool {
    match content_type {
        Some(ct) => {
            let ct = ct.split(';').next().unwrap_or("").trim();
            ct.starts_with("text/") || ct == "application/json" || ct.ends_with("+json")
        }
        None => false,
    }
}
