//! Field normalization: turns a raw stored document into a canonical
//! [`Client`].
//!
//! Records reach the store from two writers: manual entry (camelCase fields)
//! and the automation pipeline (snake_case fields, a boolean automation flag,
//! an `images` array, and the store-native `_id`). Both are resolved through a
//! single priority table, [`PRIORITY`]: for each canonical field the sources
//! are tried in order, skipping absent, `null` and empty values, and the
//! field's default applies when nothing matches.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone as _, Utc};
use serde_json::{Map, Value};

use crate::{
  Error, Result,
  client::{AutomationStatus, Client, ClientId, MeetingType, ReferencePhoto, WorkflowStatus},
  placement::detect_placement,
};

// ─── Priority table ──────────────────────────────────────────────────────────

/// A canonical field whose value may come from more than one source key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
  Id,
  Name,
  Phone,
  MeetingType,
  IdeaSummary,
  TattooDescription,
  AiActive,
  Status,
  ReferencePhotos,
  CreatedAt,
  UpdatedAt,
}

/// Source keys per field, highest priority first.
pub const PRIORITY: &[(Field, &[&str])] = &[
  (Field::Id,                &["id", "_id"]),
  (Field::Name,              &["name", "client_name"]),
  (Field::Phone,             &["phone", "phone_number"]),
  (Field::MeetingType,       &["meetingType", "meeting_type"]),
  (Field::IdeaSummary,       &["ideaSummary", "idea_summary"]),
  (Field::TattooDescription, &["tattooDescription"]),
  (Field::AiActive,          &["aiActive", "ai_active"]),
  (Field::Status,            &["status"]),
  (Field::ReferencePhotos,   &["referencePhotos", "images"]),
  (Field::CreatedAt,         &["createdAt", "created_at", "timestamp"]),
  (Field::UpdatedAt,         &["updatedAt", "updated_at"]),
];

/// Name used when no name field is present.
pub const DEFAULT_NAME: &str = "Unknown";

pub fn sources(field: Field) -> &'static [&'static str] {
  PRIORITY
    .iter()
    .find(|(f, _)| *f == field)
    .map(|(_, keys)| *keys)
    .unwrap_or(&[])
}

/// Keys only the automation pipeline writes.
const AUTOMATION_KEYS: &[&str] = &[
  "client_name",
  "phone_number",
  "meeting_type",
  "idea_summary",
  "ai_active",
  "images",
  "created_at",
  "updated_at",
];

/// Keys only manual entry writes.
const MANUAL_KEYS: &[&str] = &[
  "name",
  "phone",
  "meetingType",
  "ideaSummary",
  "aiActive",
  "referencePhotos",
  "createdAt",
  "updatedAt",
];

// ─── Raw records ─────────────────────────────────────────────────────────────

/// Which naming convention a raw record follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawShape {
  Manual,
  Automation,
  Mixed,
}

/// A stored document tagged with the naming convention it follows.
#[derive(Debug, Clone, PartialEq)]
pub enum RawClient {
  Manual(Map<String, Value>),
  Automation(Map<String, Value>),
  Mixed(Map<String, Value>),
}

impl RawClient {
  /// Classify a JSON document. Documents with no recognisable keys count as
  /// manual.
  pub fn classify(value: Value) -> Result<Self> {
    let Value::Object(fields) = value else {
      return Err(Error::NotAnObject);
    };
    let has = |keys: &[&str]| keys.iter().any(|k| fields.contains_key(*k));
    Ok(match (has(MANUAL_KEYS), has(AUTOMATION_KEYS)) {
      (_, false) => Self::Manual(fields),
      (false, true) => Self::Automation(fields),
      (true, true) => Self::Mixed(fields),
    })
  }

  pub fn shape(&self) -> RawShape {
    match self {
      Self::Manual(_) => RawShape::Manual,
      Self::Automation(_) => RawShape::Automation,
      Self::Mixed(_) => RawShape::Mixed,
    }
  }

  pub fn fields(&self) -> &Map<String, Value> {
    match self {
      Self::Manual(m) | Self::Automation(m) | Self::Mixed(m) => m,
    }
  }

  /// First usable value for `field` according to [`PRIORITY`].
  fn lookup(&self, field: Field) -> Option<&Value> {
    let fields = self.fields();
    sources(field)
      .iter()
      .filter_map(|key| fields.get(*key))
      .find(|v| is_present(v))
  }

  fn text(&self, key: &str) -> Option<String> {
    self.fields().get(key).and_then(as_text)
  }
}

fn is_present(v: &Value) -> bool {
  match v {
    Value::Null => false,
    Value::String(s) => !s.trim().is_empty(),
    Value::Array(a) => !a.is_empty(),
    _ => true,
  }
}

// ─── Normalization ───────────────────────────────────────────────────────────

/// Normalize a raw JSON document using the current time for missing
/// timestamps.
pub fn normalize_value(value: Value) -> Result<Client> {
  normalize(&RawClient::classify(value)?, Utc::now())
}

/// Normalize every document, separating the records that could not be
/// normalized (e.g. because they carry no identifier).
pub fn normalize_all(values: Vec<Value>) -> (Vec<Client>, Vec<Error>) {
  let now = Utc::now();
  let mut clients = Vec::with_capacity(values.len());
  let mut rejected = Vec::new();
  for value in values {
    match RawClient::classify(value).and_then(|raw| normalize(&raw, now)) {
      Ok(client) => clients.push(client),
      Err(e) => rejected.push(e),
    }
  }
  (clients, rejected)
}

/// Produce the canonical record for `raw`. `now` stands in for any missing
/// timestamp.
pub fn normalize(raw: &RawClient, now: DateTime<Utc>) -> Result<Client> {
  let id = raw.lookup(Field::Id).and_then(as_id).ok_or(Error::MissingId)?;

  let text_field = |field: Field| raw.lookup(field).and_then(as_text);

  let idea_summary = text_field(Field::IdeaSummary).unwrap_or_default();
  let tattoo_description =
    text_field(Field::TattooDescription).unwrap_or_else(|| idea_summary.clone());

  let placement = raw
    .text("placement")
    .or_else(|| detect_placement(&idea_summary).map(str::to_owned));

  let ai_active = match raw.lookup(Field::AiActive) {
    Some(Value::Bool(flag)) => AutomationStatus::from_flag(*flag),
    Some(v) => as_text(v).and_then(|s| s.parse().ok()).unwrap_or_default(),
    None => AutomationStatus::default(),
  };

  let meeting_type: MeetingType = text_field(Field::MeetingType)
    .and_then(|s| s.parse().ok())
    .unwrap_or_default();
  let status: WorkflowStatus = text_field(Field::Status)
    .and_then(|s| s.parse().ok())
    .unwrap_or_default();

  let reference_photos = raw
    .lookup(Field::ReferencePhotos)
    .map(as_photos)
    .unwrap_or_default();

  let created_at = raw.lookup(Field::CreatedAt).and_then(as_timestamp).unwrap_or(now);
  let updated_at = raw
    .lookup(Field::UpdatedAt)
    .and_then(as_timestamp)
    .unwrap_or(now)
    .max(created_at);

  Ok(Client {
    id,
    name: text_field(Field::Name).unwrap_or_else(|| DEFAULT_NAME.to_owned()),
    phone: text_field(Field::Phone).unwrap_or_default(),
    meeting_type,
    idea_summary,
    tattoo_description,
    ai_active,
    status,
    email: raw.text("email"),
    instagram: raw.text("instagram"),
    placement,
    size: raw.text("size"),
    budget: raw.text("budget"),
    next_appointment: raw.text("nextAppointment"),
    consultation_date: raw.fields().get("consultationDate").and_then(as_timestamp),
    calendar_event_id: raw.text("calendarEventId"),
    calendar_event_link: raw.text("calendarEventLink"),
    reference_photos,
    created_at,
    updated_at,
  })
}

// ─── Value coercions ─────────────────────────────────────────────────────────

fn as_id(v: &Value) -> Option<ClientId> {
  match v {
    Value::Object(o) => o.get("$oid").and_then(as_text).map(ClientId::from),
    other => as_text(other).map(ClientId::from),
  }
}

/// Strings pass through trimmed-empty-as-absent; numbers are rendered (the
/// pipeline sometimes stores phone numbers as integers).
fn as_text(v: &Value) -> Option<String> {
  match v {
    Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    _ => None,
  }
}

fn as_photos(v: &Value) -> Vec<ReferencePhoto> {
  match v {
    Value::Array(items) => items
      .iter()
      .filter_map(|item| serde_json::from_value(item.clone()).ok())
      .collect(),
    Value::String(url) => vec![ReferencePhoto::Url(url.clone())],
    _ => Vec::new(),
  }
}

/// Accepts RFC 3339 strings, `YYYY-MM-DD HH:MM[:SS]`, bare dates, epoch
/// milliseconds and extended-JSON `{"$date": ...}` wrappers.
fn as_timestamp(v: &Value) -> Option<DateTime<Utc>> {
  match v {
    Value::String(s) => parse_timestamp(s.trim()),
    Value::Number(n) => n.as_i64().and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
    Value::Object(o) => o.get("$date").and_then(as_timestamp),
    _ => None,
  }
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
  if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
    return Some(dt.with_timezone(&Utc));
  }
  for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S%.f"] {
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
      return Some(naive.and_utc());
    }
  }
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .ok()
    .and_then(|d| d.and_hms_opt(0, 0, 0))
    .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone as _;
  use serde_json::json;

  use super::*;
  use crate::placement::SHOULDER;

  fn now() -> DateTime<Utc> { Utc.with_ymd_and_hms(2025, 8, 5, 9, 30, 0).unwrap() }

  fn norm(v: Value) -> Client { normalize(&RawClient::classify(v).unwrap(), now()).unwrap() }

  #[test]
  fn automation_only_fields() {
    let raw = RawClient::classify(json!({
      "_id": "66b1f0c2a1",
      "client_name": "Dana",
      "phone_number": "+972501112222",
    }))
    .unwrap();
    assert_eq!(raw.shape(), RawShape::Automation);

    let c = normalize(&raw, now()).unwrap();
    assert_eq!(c.id.as_str(), "66b1f0c2a1");
    assert_eq!(c.name, "Dana");
    assert_eq!(c.phone, "+972501112222");
    assert_eq!(c.status, WorkflowStatus::Consultation);
    assert_eq!(c.ai_active, AutomationStatus::Pending);
    assert_eq!(c.meeting_type, MeetingType::Consultation);
    assert_eq!(c.created_at, now());
    assert_eq!(c.updated_at, now());
  }

  #[test]
  fn primary_name_wins_over_alternate() {
    let raw = RawClient::classify(json!({
      "id": "1",
      "name": "Primary",
      "client_name": "Alternate",
      "phone": "",
      "phone_number": "+1555",
    }))
    .unwrap();
    assert_eq!(raw.shape(), RawShape::Mixed);

    let c = normalize(&raw, now()).unwrap();
    assert_eq!(c.name, "Primary");
    // Empty primary falls through to the alternate.
    assert_eq!(c.phone, "+1555");
  }

  #[test]
  fn automation_flag_boolean() {
    assert_eq!(norm(json!({"id": "1", "ai_active": true})).ai_active, AutomationStatus::Completed);
    assert_eq!(norm(json!({"id": "1", "ai_active": false})).ai_active, AutomationStatus::Pending);
    assert_eq!(norm(json!({"id": "1"})).ai_active, AutomationStatus::Pending);
    assert_eq!(
      norm(json!({"id": "1", "aiActive": "in_progress", "ai_active": true})).ai_active,
      AutomationStatus::InProgress
    );
  }

  #[test]
  fn defaults_when_nothing_present() {
    let c = norm(json!({"id": "x"}));
    assert_eq!(c.name, DEFAULT_NAME);
    assert_eq!(c.phone, "");
    assert_eq!(c.status, WorkflowStatus::Consultation);
    assert!(c.reference_photos.is_empty());
    assert_eq!(c.placement, None);
  }

  #[test]
  fn unknown_enum_values_fall_back() {
    let c = norm(json!({"id": "x", "status": "Someday", "meetingType": "party"}));
    assert_eq!(c.status, WorkflowStatus::Consultation);
    assert_eq!(c.meeting_type, MeetingType::Consultation);
  }

  #[test]
  fn native_id_is_copied() {
    let c = norm(json!({"_id": {"$oid": "66b1f0c2a1b2c3d4e5f60718"}, "name": "N"}));
    assert_eq!(c.id.as_str(), "66b1f0c2a1b2c3d4e5f60718");
  }

  #[test]
  fn missing_id_is_rejected() {
    let raw = RawClient::classify(json!({"name": "Ghost"})).unwrap();
    assert!(matches!(normalize(&raw, now()), Err(Error::MissingId)));
  }

  #[test]
  fn non_object_is_rejected() {
    assert!(matches!(RawClient::classify(json!([1, 2])), Err(Error::NotAnObject)));
  }

  #[test]
  fn placement_detected_from_idea_when_empty() {
    let c = norm(json!({"id": "1", "idea_summary": "Fine-line swallow on the shoulder", "placement": ""}));
    assert_eq!(c.placement.as_deref(), Some(SHOULDER));
    assert_eq!(c.tattoo_description, "Fine-line swallow on the shoulder");

    let explicit = norm(json!({"id": "1", "ideaSummary": "shoulder", "placement": "Left forearm"}));
    assert_eq!(explicit.placement.as_deref(), Some("Left forearm"));
  }

  #[test]
  fn images_used_when_reference_photos_absent() {
    let c = norm(json!({
      "id": "1",
      "referencePhotos": [],
      "images": [{"url": "https://wasenderapi.com/a", "base64": "aGk="}, "https://x/y.png"],
    }));
    assert_eq!(c.reference_photos.len(), 2);
  }

  #[test]
  fn timestamps_from_either_convention() {
    let c = norm(json!({
      "id": "1",
      "created_at": "2025-07-01T10:00:00Z",
      "updated_at": 1_751_371_200_000_i64,
    }));
    assert_eq!(c.created_at, Utc.with_ymd_and_hms(2025, 7, 1, 10, 0, 0).unwrap());
    assert_eq!(c.updated_at, Utc.with_ymd_and_hms(2025, 7, 1, 12, 0, 0).unwrap());

    let legacy = norm(json!({"id": "1", "timestamp": {"$date": "2025-06-30 08:15:00"}}));
    assert_eq!(legacy.created_at, Utc.with_ymd_and_hms(2025, 6, 30, 8, 15, 0).unwrap());
  }

  #[test]
  fn updated_never_precedes_created() {
    let c = norm(json!({
      "id": "1",
      "createdAt": "2025-07-02T00:00:00Z",
      "updatedAt": "2025-07-01T00:00:00Z",
    }));
    assert!(c.created_at <= c.updated_at);
  }

  #[test]
  fn numeric_phone_is_rendered() {
    assert_eq!(norm(json!({"id": "1", "phone_number": 972501234567_i64})).phone, "972501234567");
  }

  #[test]
  fn canonical_roundtrip_is_stable() {
    let original = norm(json!({"id": "1", "name": "A", "phone": "+1000", "email": "a@b.co"}));
    let again = normalize_value(serde_json::to_value(&original).unwrap()).unwrap();
    assert_eq!(again, original);
  }

  #[test]
  fn normalize_all_separates_rejects() {
    let (ok, bad) = normalize_all(vec![json!({"id": "1"}), json!({"name": "no id"}), json!(3)]);
    assert_eq!(ok.len(), 1);
    assert_eq!(bad.len(), 2);
  }
}
