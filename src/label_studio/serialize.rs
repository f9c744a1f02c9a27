//! JSON rendering of Label Studio records
//!
//! Records returned by the platform come in several shapes. Each shape
//! implements [`RemoteRecord`] for the capabilities it actually has, and
//! [`render_record`] picks the richest one in a fixed order:
//! structured dump, plain field map, identity fields, text.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Result, SerializationError};
use crate::label_studio::types::{
    Annotation, AnnotationRecord, ImportOutcome, ImportSummary, Prediction, Project,
};

/// Fields dropped from structured dumps because they change on every write
const VOLATILE_FIELDS: [&str; 2] = ["created_at", "updated_at"];

/// Capabilities a remote record may offer for JSON rendering
pub trait RemoteRecord {
    /// Complete typed dump of the record
    fn structured_dump(&self) -> Result<Option<Map<String, Value>>> {
        Ok(None)
    }

    /// Plain key/value view of the record
    fn field_map(&self) -> Option<Map<String, Value>> {
        None
    }

    /// Minimal identifying fields (`id`, `title`)
    fn identity(&self) -> Option<Map<String, Value>> {
        None
    }

    /// Last-resort textual form
    fn describe(&self) -> String;
}

/// A record rendered for output
#[derive(Debug, Clone, PartialEq)]
pub enum Rendered {
    Object(Map<String, Value>),
    Text(String),
}

impl Rendered {
    pub fn into_value(self) -> Value {
        match self {
            Rendered::Object(map) => Value::Object(map),
            Rendered::Text(text) => Value::String(text),
        }
    }
}

/// Render a record through the first capability it supports
pub fn render_record<R: RemoteRecord + ?Sized>(record: &R) -> Result<Rendered> {
    if let Some(dump) = record.structured_dump()? {
        return Ok(Rendered::Object(dump));
    }
    if let Some(fields) = record.field_map() {
        return Ok(Rendered::Object(normalize_field_map(fields)?));
    }
    if let Some(identity) = record.identity() {
        return Ok(Rendered::Object(identity));
    }
    Ok(Rendered::Text(record.describe()))
}

const NAIVE_ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Datetime types with an ISO-8601 rendering
pub trait IsoDateTime {
    fn to_iso_8601(&self) -> String;
}

impl IsoDateTime for DateTime<Utc> {
    fn to_iso_8601(&self) -> String {
        self.to_rfc3339()
    }
}

impl IsoDateTime for DateTime<FixedOffset> {
    fn to_iso_8601(&self) -> String {
        self.to_rfc3339()
    }
}

impl IsoDateTime for NaiveDateTime {
    fn to_iso_8601(&self) -> String {
        self.format(NAIVE_ISO_FORMAT).to_string()
    }
}

/// Encode a datetime as an ISO-8601 JSON string
pub fn datetime_to_json<T: IsoDateTime + ?Sized>(value: &T) -> Value {
    Value::String(value.to_iso_8601())
}

/// Encode an untyped value that should hold a datetime.
///
/// Strings in RFC 3339 or naive ISO-8601 form are re-encoded as ISO-8601 and
/// `null` stays `null`. Anything else is a programming error and is reported
/// as [`SerializationError::UnsupportedType`].
pub fn datetime_value_to_json(value: &Value) -> std::result::Result<Value, SerializationError> {
    let type_name = match value {
        Value::Null => return Ok(Value::Null),
        Value::String(raw) => {
            if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
                return Ok(datetime_to_json(&dt));
            }
            if let Ok(dt) = NaiveDateTime::parse_from_str(raw, NAIVE_ISO_FORMAT) {
                return Ok(datetime_to_json(&dt));
            }
            "str"
        }
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    };
    Err(SerializationError::UnsupportedType { type_name })
}

/// Serialize to a JSON object, dropping volatile timestamps and re-adding
/// `created_at` in ISO-8601 form
fn dump_without_timestamps<T: Serialize>(
    record: &T,
    created_at: Option<&DateTime<Utc>>,
) -> Result<Option<Map<String, Value>>> {
    let Value::Object(mut map) = serde_json::to_value(record)? else {
        return Ok(None);
    };
    for field in VOLATILE_FIELDS {
        map.remove(field);
    }
    map.insert("created_at".to_string(), optional_datetime(created_at));
    Ok(Some(map))
}

/// Drop volatile timestamps from a plain mapping, re-adding `created_at`
/// in ISO-8601 form when it was set
fn normalize_field_map(mut map: Map<String, Value>) -> Result<Map<String, Value>> {
    let created_at = map.remove("created_at");
    for field in VOLATILE_FIELDS {
        map.remove(field);
    }
    if let Some(created_at) = created_at.filter(|v| !v.is_null()) {
        map.insert("created_at".to_string(), datetime_value_to_json(&created_at)?);
    }
    Ok(map)
}

fn plain_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl RemoteRecord for Project {
    fn structured_dump(&self) -> Result<Option<Map<String, Value>>> {
        dump_without_timestamps(self, self.created_at.as_ref())
    }

    fn identity(&self) -> Option<Map<String, Value>> {
        let mut map = Map::new();
        map.insert("id".to_string(), Value::from(self.id));
        map.insert(
            "title".to_string(),
            Value::from(self.title.clone().unwrap_or_else(|| "N/A".to_string())),
        );
        Some(map)
    }

    fn describe(&self) -> String {
        format!("Project {}", self.id)
    }
}

impl RemoteRecord for Annotation {
    fn structured_dump(&self) -> Result<Option<Map<String, Value>>> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(Some(map)),
            _ => Ok(None),
        }
    }

    fn describe(&self) -> String {
        format!("Annotation {}", self.id)
    }
}

impl RemoteRecord for Map<String, Value> {
    fn field_map(&self) -> Option<Map<String, Value>> {
        Some(self.clone())
    }

    fn describe(&self) -> String {
        Value::Object(self.clone()).to_string()
    }
}

impl RemoteRecord for Value {
    fn field_map(&self) -> Option<Map<String, Value>> {
        self.as_object().cloned()
    }

    fn describe(&self) -> String {
        plain_text(self)
    }
}

impl RemoteRecord for AnnotationRecord {
    fn structured_dump(&self) -> Result<Option<Map<String, Value>>> {
        match self {
            AnnotationRecord::Structured(annotation) => annotation.structured_dump(),
            _ => Ok(None),
        }
    }

    fn field_map(&self) -> Option<Map<String, Value>> {
        match self {
            AnnotationRecord::Mapping(map) => Some(map.clone()),
            _ => None,
        }
    }

    fn describe(&self) -> String {
        match self {
            AnnotationRecord::Structured(annotation) => annotation.describe(),
            AnnotationRecord::Mapping(map) => map.describe(),
            AnnotationRecord::Opaque(value) => plain_text(value),
        }
    }
}

impl RemoteRecord for ImportSummary {
    fn structured_dump(&self) -> Result<Option<Map<String, Value>>> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(Some(map)),
            _ => Ok(None),
        }
    }

    fn describe(&self) -> String {
        format!("Imported {} tasks", self.task_count)
    }
}

impl RemoteRecord for ImportOutcome {
    fn structured_dump(&self) -> Result<Option<Map<String, Value>>> {
        match self {
            ImportOutcome::Summary(summary) => summary.structured_dump(),
            _ => Ok(None),
        }
    }

    fn field_map(&self) -> Option<Map<String, Value>> {
        match self {
            ImportOutcome::Mapping(map) => Some(map.clone()),
            _ => None,
        }
    }

    fn describe(&self) -> String {
        match self {
            ImportOutcome::Summary(summary) => summary.describe(),
            ImportOutcome::Mapping(map) => map.describe(),
            ImportOutcome::Other(value) => plain_text(value),
        }
    }
}

impl Prediction {
    /// The whitelisted prediction fields, timestamps in ISO-8601 form.
    ///
    /// Values JSON cannot represent (a non-finite score) are left out.
    pub fn whitelisted_fields(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("id".to_string(), self.id.map_or(Value::Null, Value::from));
        map.insert("task".to_string(), self.task.clone().unwrap_or(Value::Null));
        map.insert(
            "model_version".to_string(),
            self.model_version.clone().map_or(Value::Null, Value::from),
        );
        match self.score {
            Some(score) => {
                if let Some(number) = serde_json::Number::from_f64(score) {
                    map.insert("score".to_string(), Value::Number(number));
                }
            }
            None => {
                map.insert("score".to_string(), Value::Null);
            }
        }
        map.insert("result".to_string(), self.result.clone().unwrap_or(Value::Null));
        map.insert("created_at".to_string(), optional_datetime(self.created_at.as_ref()));
        map.insert("updated_at".to_string(), optional_datetime(self.updated_at.as_ref()));
        map
    }
}

fn optional_datetime(value: Option<&DateTime<Utc>>) -> Value {
    value.map_or(Value::Null, datetime_to_json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    struct IdentityOnly;

    impl RemoteRecord for IdentityOnly {
        fn identity(&self) -> Option<Map<String, Value>> {
            let mut map = Map::new();
            map.insert("id".to_string(), json!(5));
            map.insert("title".to_string(), json!("Only identity"));
            Some(map)
        }

        fn describe(&self) -> String {
            "identity only".to_string()
        }
    }

    struct Nothing;

    impl RemoteRecord for Nothing {
        fn describe(&self) -> String {
            "<opaque record>".to_string()
        }
    }

    fn project() -> Project {
        serde_json::from_value(json!({
            "id": 1,
            "title": "Birds",
            "created_at": "2024-05-01T10:00:00Z",
            "updated_at": "2024-05-02T10:00:00Z",
            "label_config": "<View/>"
        }))
        .unwrap()
    }

    #[test]
    fn test_project_dump_drops_updated_at_and_formats_created_at() {
        let rendered = render_record(&project()).unwrap();
        let Rendered::Object(map) = rendered else {
            panic!("expected object");
        };
        assert_eq!(map["created_at"], "2024-05-01T10:00:00+00:00");
        assert!(!map.contains_key("updated_at"));
        assert_eq!(map["title"], "Birds");
        assert_eq!(map["label_config"], "<View/>");
    }

    #[test]
    fn test_precedence_falls_through_to_identity_and_text() {
        let Rendered::Object(map) = render_record(&IdentityOnly).unwrap() else {
            panic!("expected object");
        };
        assert_eq!(map["title"], "Only identity");

        assert_eq!(
            render_record(&Nothing).unwrap(),
            Rendered::Text("<opaque record>".to_string())
        );
    }

    #[test]
    fn test_annotation_record_rendering() {
        let mapping: AnnotationRecord =
            serde_json::from_value(json!({"result": "odd", "lead_time": 3})).unwrap();
        let Rendered::Object(map) = render_record(&mapping).unwrap() else {
            panic!("expected object");
        };
        assert_eq!(map["result"], "odd");

        let opaque = AnnotationRecord::Opaque(json!("plain"));
        assert_eq!(
            render_record(&opaque).unwrap(),
            Rendered::Text("plain".to_string())
        );
    }

    #[test]
    fn test_datetime_to_json() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(datetime_to_json(&dt), json!("2024-01-02T03:04:05+00:00"));

        let offset = dt.with_timezone(&FixedOffset::east_opt(2 * 3600).unwrap());
        assert_eq!(datetime_to_json(&offset), json!("2024-01-02T05:04:05+02:00"));

        let naive = dt.naive_utc();
        assert_eq!(datetime_to_json(&naive), json!("2024-01-02T03:04:05"));
    }

    #[test]
    fn test_datetime_value_to_json() {
        assert_eq!(
            datetime_value_to_json(&json!("2024-01-02T03:04:05Z")).unwrap(),
            json!("2024-01-02T03:04:05+00:00")
        );
        assert_eq!(
            datetime_value_to_json(&json!("2024-01-02T03:04:05.500")).unwrap(),
            json!("2024-01-02T03:04:05.500")
        );
        assert_eq!(datetime_value_to_json(&Value::Null).unwrap(), Value::Null);

        let err = datetime_value_to_json(&json!(42)).unwrap_err();
        assert_eq!(err.to_string(), "Object of type number is not JSON serializable");
        assert!(datetime_value_to_json(&json!("yesterday")).is_err());
    }

    #[test]
    fn test_field_map_timestamps_are_normalized() {
        let record = json!({
            "id": 3,
            "created_at": "2024-01-02T03:04:05Z",
            "updated_at": "2024-01-03T03:04:05Z"
        });
        let Rendered::Object(map) = render_record(&record).unwrap() else {
            panic!("expected object");
        };
        assert_eq!(map["created_at"], "2024-01-02T03:04:05+00:00");
        assert!(!map.contains_key("updated_at"));

        let bad = json!({"id": 3, "created_at": 17});
        let err = render_record(&bad).unwrap_err();
        assert_eq!(err.kind(), "TypeError");
    }

    #[test]
    fn test_prediction_whitelist() {
        let prediction: Prediction = serde_json::from_value(json!({
            "id": 10,
            "task": 4,
            "score": 0.5,
            "result": [{"type": "choices"}],
            "created_at": "2024-01-02T03:04:05Z",
            "cluster": 7
        }))
        .unwrap();

        let fields = prediction.whitelisted_fields();
        let keys: Vec<&str> = fields.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec!["created_at", "id", "model_version", "result", "score", "task", "updated_at"]
        );
        assert_eq!(fields["id"], 10);
        assert_eq!(fields["created_at"], "2024-01-02T03:04:05+00:00");
        assert_eq!(fields["model_version"], Value::Null);
        assert!(!fields.contains_key("cluster"));
    }
}
