//! CloudEvents envelope types.

use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// CloudEvents spec version emitted by the codec.
pub const SPEC_VERSION: &str = "1.0";

/// Content type of every payload the codec produces.
pub const APPLICATION_JSON: &str = "application/json";

/// A typed extension attribute value.
///
/// Mirrors the CloudEvents type system. Values arriving over text-based
/// transports are usually strings, so the accessors also accept the
/// canonical string form of the requested kind.
#[derive(Clone, Debug, PartialEq)]
pub enum ExtensionValue {
    Boolean(bool),
    Integer(i64),
    String(String),
    Binary(Vec<u8>),
    Uri(String),
    UriRef(String),
    Timestamp(DateTime<Utc>),
}

impl ExtensionValue {
    /// Name of the CloudEvents kind, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            ExtensionValue::Boolean(_) => "boolean",
            ExtensionValue::Integer(_) => "integer",
            ExtensionValue::String(_) => "string",
            ExtensionValue::Binary(_) => "binary",
            ExtensionValue::Uri(_) => "uri",
            ExtensionValue::UriRef(_) => "uri-ref",
            ExtensionValue::Timestamp(_) => "timestamp",
        }
    }

    /// URI and URI-reference values are strings in CloudEvents canonical
    /// form, so they coerce too.
    pub fn as_string(&self) -> Result<String, String> {
        match self {
            ExtensionValue::String(s) | ExtensionValue::Uri(s) | ExtensionValue::UriRef(s) => {
                Ok(s.clone())
            }
            other => Err(format!("cannot convert {} to string", other.kind())),
        }
    }

    pub fn as_integer(&self) -> Result<i64, String> {
        match self {
            ExtensionValue::Integer(i) => Ok(*i),
            ExtensionValue::String(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|e| format!("cannot convert {:?} to integer: {}", s, e)),
            other => Err(format!("cannot convert {} to integer", other.kind())),
        }
    }

    pub fn as_timestamp(&self) -> Result<DateTime<Utc>, String> {
        match self {
            ExtensionValue::Timestamp(t) => Ok(*t),
            ExtensionValue::String(s) => DateTime::parse_from_rfc3339(s)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| format!("cannot convert {:?} to timestamp: {}", s, e)),
            other => Err(format!("cannot convert {} to timestamp", other.kind())),
        }
    }
}

impl fmt::Display for ExtensionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtensionValue::Boolean(b) => write!(f, "{}", b),
            ExtensionValue::Integer(i) => write!(f, "{}", i),
            ExtensionValue::String(s) | ExtensionValue::Uri(s) | ExtensionValue::UriRef(s) => {
                write!(f, "{}", s)
            }
            ExtensionValue::Binary(b) => write!(f, "<{} bytes>", b.len()),
            ExtensionValue::Timestamp(t) => {
                write!(f, "{}", t.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
        }
    }
}

impl From<&str> for ExtensionValue {
    fn from(s: &str) -> Self {
        ExtensionValue::String(s.to_string())
    }
}

impl From<String> for ExtensionValue {
    fn from(s: String) -> Self {
        ExtensionValue::String(s)
    }
}

impl From<i64> for ExtensionValue {
    fn from(i: i64) -> Self {
        ExtensionValue::Integer(i)
    }
}

impl From<bool> for ExtensionValue {
    fn from(b: bool) -> Self {
        ExtensionValue::Boolean(b)
    }
}

impl From<DateTime<Utc>> for ExtensionValue {
    fn from(t: DateTime<Utc>) -> Self {
        ExtensionValue::Timestamp(t)
    }
}

/// Identifies the payload class an event carries: `<group>.<version>.<resource>`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DataType {
    pub group: String,
    pub version: String,
    pub resource: String,
}

impl DataType {
    pub fn new(
        group: impl Into<String>,
        version: impl Into<String>,
        resource: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            resource: resource.into(),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.group, self.version, self.resource)
    }
}

/// Which half of a resource an event is about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SubResource {
    Spec,
    Status,
}

impl SubResource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubResource::Spec => "spec",
            SubResource::Status => "status",
        }
    }
}

impl fmt::Display for SubResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured event type: data type, sub-resource and action.
///
/// Serialized as `<group>.<version>.<resource>.<subresource>.<action>`. The
/// group may itself contain dots, so parsing works from the right.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EventType {
    pub data_type: DataType,
    pub sub_resource: SubResource,
    pub action: String,
}

impl EventType {
    pub fn new(data_type: DataType, sub_resource: SubResource, action: impl Into<String>) -> Self {
        Self {
            data_type,
            sub_resource,
            action: action.into(),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.data_type, self.sub_resource, self.action)
    }
}

impl FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('.').collect();
        let len = parts.len();
        if len < 5 {
            return Err("unsupported cloudevents type format".to_string());
        }
        if parts.iter().any(|p| p.is_empty()) {
            return Err("empty segment in cloudevents type".to_string());
        }

        let sub_resource = match parts[len - 2] {
            "spec" => SubResource::Spec,
            "status" => SubResource::Status,
            other => return Err(format!("unsupported subresource {}", other)),
        };

        Ok(Self {
            data_type: DataType {
                group: parts[..len - 4].join("."),
                version: parts[len - 4].to_string(),
                resource: parts[len - 3].to_string(),
            },
            sub_resource,
            action: parts[len - 1].to_string(),
        })
    }
}

/// A CloudEvents envelope.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    pub id: String,
    pub source: String,
    pub spec_version: String,
    pub event_type: String,
    pub time: Option<DateTime<Utc>>,
    pub data_content_type: Option<String>,
    pub extensions: BTreeMap<String, ExtensionValue>,
    pub data: Option<Vec<u8>>,
}

impl Event {
    /// Create an event with a fresh id and the current time.
    pub fn new(source: impl Into<String>, event_type: &EventType) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            source: source.into(),
            spec_version: SPEC_VERSION.to_string(),
            event_type: event_type.to_string(),
            time: Some(Utc::now()),
            data_content_type: None,
            extensions: BTreeMap::new(),
            data: None,
        }
    }

    /// Set an extension attribute.
    pub fn with_extension(mut self, name: impl Into<String>, value: impl Into<ExtensionValue>) -> Self {
        self.extensions.insert(name.into(), value.into());
        self
    }

    pub fn extension(&self, name: &str) -> Option<&ExtensionValue> {
        self.extensions.get(name)
    }

    /// Serialize `payload` as JSON into the data field.
    pub fn set_json_data(&mut self, payload: &impl serde::Serialize) -> Result<(), serde_json::Error> {
        self.data = Some(serde_json::to_vec(payload)?);
        self.data_content_type = Some(APPLICATION_JSON.to_string());
        Ok(())
    }

    /// Raw payload bytes, empty if there is none.
    pub fn data_bytes(&self) -> &[u8] {
        self.data.as_deref().unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_string_coerces_uri_forms_only() {
        assert_eq!(
            ExtensionValue::Uri("https://example.io".into()).as_string(),
            Ok("https://example.io".to_string())
        );
        assert_eq!(
            ExtensionValue::UriRef("/clusters/c1".into()).as_string(),
            Ok("/clusters/c1".to_string())
        );
        assert!(ExtensionValue::Integer(7).as_string().is_err());
        assert!(ExtensionValue::Boolean(true).as_string().is_err());
    }

    #[test]
    fn test_parse_event_type_with_dotted_group() {
        let parsed: EventType = "io.open-cluster-management.works.v1alpha1.manifests.spec.create_request"
            .parse()
            .unwrap();

        assert_eq!(parsed.data_type.group, "io.open-cluster-management.works");
        assert_eq!(parsed.data_type.version, "v1alpha1");
        assert_eq!(parsed.data_type.resource, "manifests");
        assert_eq!(parsed.sub_resource, SubResource::Spec);
        assert_eq!(parsed.action, "create_request");
    }

    #[test]
    fn test_event_type_display_parses_back() {
        let event_type = EventType::new(
            DataType::new("example.io", "v1", "widgets"),
            SubResource::Status,
            "status_update",
        );
        let text = event_type.to_string();
        assert_eq!(text, "example.io.v1.widgets.status.status_update");
        assert_eq!(text.parse::<EventType>().unwrap(), event_type);
    }

    #[test]
    fn test_parse_event_type_rejects_short_and_bad_subresource() {
        assert!("a.b.c.d".parse::<EventType>().is_err());
        assert!("a.b.c.d.e".parse::<EventType>().is_err());
        assert!("a..c.spec.e".parse::<EventType>().is_err());
    }

    #[test]
    fn test_extension_coercions() {
        assert_eq!(ExtensionValue::from(7i64).as_integer(), Ok(7));
        assert_eq!(ExtensionValue::from("42").as_integer(), Ok(42));
        assert!(ExtensionValue::from("forty").as_integer().is_err());
        assert!(ExtensionValue::from(true).as_string().is_err());
        assert_eq!(
            ExtensionValue::Uri("https://x".into()).as_string(),
            Ok("https://x".to_string())
        );

        let ts = ExtensionValue::from("2024-05-01T10:00:00Z").as_timestamp().unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-05-01T10:00:00+00:00");
        assert!(ExtensionValue::from(3i64).as_timestamp().is_err());
    }
}
