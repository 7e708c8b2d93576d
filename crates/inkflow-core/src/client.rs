//! Client record types: the canonical shape of the single CRM entity.
//!
//! Everything that leaves a store or crosses the wire is a [`Client`]. Records
//! that arrive in other shapes go through [`crate::normalize`] first.

use std::fmt;

use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Identity ────────────────────────────────────────────────────────────────

/// Opaque identifier assigned by the storage layer on creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
  pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

  /// A fresh random identifier.
  pub fn generate() -> Self { Self(Uuid::new_v4().simple().to_string()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for ClientId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl From<&str> for ClientId {
  fn from(s: &str) -> Self { Self(s.to_owned()) }
}

impl From<String> for ClientId {
  fn from(s: String) -> Self { Self(s) }
}

// ─── Enumerations ────────────────────────────────────────────────────────────

/// What kind of meeting the client is booked for.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
pub enum MeetingType {
  #[default]
  #[serde(rename = "consultation")]
  #[strum(serialize = "consultation")]
  Consultation,
  #[serde(rename = "appointment")]
  #[strum(serialize = "appointment")]
  Appointment,
  #[serde(rename = "follow-up")]
  #[strum(serialize = "follow-up")]
  FollowUp,
}

/// Workflow status shown on the client card.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
pub enum WorkflowStatus {
  #[default]
  #[serde(rename = "Consultation")]
  #[strum(serialize = "Consultation")]
  Consultation,
  #[serde(rename = "In Progress")]
  #[strum(serialize = "In Progress")]
  InProgress,
  #[serde(rename = "Booked")]
  #[strum(serialize = "Booked")]
  Booked,
  #[serde(rename = "Completed")]
  #[strum(serialize = "Completed")]
  Completed,
  #[serde(rename = "Canceled", alias = "Cancelled")]
  #[strum(to_string = "Canceled", serialize = "Cancelled")]
  Canceled,
  #[serde(rename = "Consultation Scheduled")]
  #[strum(serialize = "Consultation Scheduled")]
  ConsultationScheduled,
  #[serde(rename = "scheduled")]
  #[strum(serialize = "scheduled")]
  Scheduled,
}

/// Progress of the external automation pipeline for this client.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AutomationStatus {
  Completed,
  Error,
  #[default]
  Pending,
  InProgress,
}

impl AutomationStatus {
  /// The automation pipeline reports a boolean instead of a status.
  pub fn from_flag(active: bool) -> Self {
    if active { Self::Completed } else { Self::Pending }
  }
}

// ─── Reference photos ────────────────────────────────────────────────────────

/// An image delivered by the automation pipeline.
///
/// `url` points at the messaging provider and expires; `base64` is the
/// durable copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomationImage {
  #[serde(default)]
  pub url:       String,
  #[serde(default)]
  pub base64:    String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub analysis:  Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub timestamp: Option<String>,
}

impl AutomationImage {
  /// Decode the embedded payload, accepting a bare base64 string or a
  /// `data:<mime>;base64,` URI.
  pub fn decode(&self) -> Result<Vec<u8>> {
    let payload = match self.base64.split_once(";base64,") {
      Some((prefix, data)) if prefix.starts_with("data:") => data,
      _ => self.base64.as_str(),
    };
    B64
      .decode(payload.trim())
      .map_err(|e| Error::ImagePayload(e.to_string()))
  }

  /// MIME type declared by a `data:` URI prefix, if any.
  pub fn media_type(&self) -> Option<&str> {
    self
      .base64
      .strip_prefix("data:")
      .and_then(|rest| rest.split_once(';'))
      .map(|(mime, _)| mime)
  }
}

/// A reference photo: either a plain URL or a structured automation image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReferencePhoto {
  Url(String),
  Image(AutomationImage),
}

impl ReferencePhoto {
  /// The source to display: the embedded payload as a data URI when present,
  /// otherwise the URL.
  pub fn display_source(&self) -> String {
    match self {
      Self::Url(url) => url.clone(),
      Self::Image(img) if img.base64.is_empty() => img.url.clone(),
      Self::Image(img) if img.base64.starts_with("data:") => img.base64.clone(),
      Self::Image(img) => format!("data:image/jpeg;base64,{}", img.base64),
    }
  }

  pub fn analysis(&self) -> Option<&str> {
    match self {
      Self::Url(_) => None,
      Self::Image(img) => img.analysis.as_deref(),
    }
  }
}

// ─── Client ──────────────────────────────────────────────────────────────────

/// The canonical client record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
  pub id:                  ClientId,
  pub name:                String,
  pub phone:               String,
  #[serde(default)]
  pub meeting_type:        MeetingType,
  #[serde(default)]
  pub idea_summary:        String,
  #[serde(default)]
  pub tattoo_description:  String,
  #[serde(default)]
  pub ai_active:           AutomationStatus,
  #[serde(default)]
  pub status:              WorkflowStatus,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub email:               Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub instagram:           Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub placement:           Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub size:                Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub budget:              Option<String>,
  /// Free-form, as entered in the booking form (e.g. `2025-08-10 14:00`).
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub next_appointment:    Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub consultation_date:   Option<DateTime<Utc>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub calendar_event_id:   Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub calendar_event_link: Option<String>,
  #[serde(default)]
  pub reference_photos:    Vec<ReferencePhoto>,
  pub created_at:          DateTime<Utc>,
  pub updated_at:          DateTime<Utc>,
}

impl Client {
  /// Apply `patch` and refresh `updated_at`. `id` and `created_at` are not
  /// part of a patch and therefore never change.
  pub fn apply(&mut self, patch: ClientPatch, now: DateTime<Utc>) {
    let ClientPatch {
      name,
      phone,
      meeting_type,
      idea_summary,
      tattoo_description,
      ai_active,
      status,
      email,
      instagram,
      placement,
      size,
      budget,
      next_appointment,
      consultation_date,
      calendar_event_id,
      calendar_event_link,
      reference_photos,
    } = patch;

    set(&mut self.name, name);
    set(&mut self.phone, phone);
    set(&mut self.meeting_type, meeting_type);
    set(&mut self.idea_summary, idea_summary);
    set(&mut self.tattoo_description, tattoo_description);
    set(&mut self.ai_active, ai_active);
    set(&mut self.status, status);
    set_opt(&mut self.email, email);
    set_opt(&mut self.instagram, instagram);
    set_opt(&mut self.placement, placement);
    set_opt(&mut self.size, size);
    set_opt(&mut self.budget, budget);
    set_opt(&mut self.next_appointment, next_appointment);
    set_opt(&mut self.consultation_date, consultation_date);
    set_opt(&mut self.calendar_event_id, calendar_event_id);
    set_opt(&mut self.calendar_event_link, calendar_event_link);
    set(&mut self.reference_photos, reference_photos);

    self.updated_at = next_update_stamp(self.updated_at, now);
  }

  /// Whether the client's phone contains `digits` once formatting is removed.
  pub fn phone_contains_digits(&self, digits: &str) -> bool {
    !digits.is_empty() && digits_only(&self.phone).contains(digits)
  }
}

fn set<T>(slot: &mut T, value: Option<T>) {
  if let Some(v) = value {
    *slot = v;
  }
}

fn set_opt<T>(slot: &mut Option<T>, value: Option<T>) {
  if value.is_some() {
    *slot = value;
  }
}

/// The timestamp to record for a mutation at `now`, kept strictly after
/// `previous` even when the clock has not advanced.
pub fn next_update_stamp(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
  if now > previous { now } else { previous + TimeDelta::microseconds(1) }
}

/// Strip everything but ASCII digits.
pub fn digits_only(s: &str) -> String {
  s.chars().filter(char::is_ascii_digit).collect()
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Payload for creating a client. Identity and timestamps are assigned by the
/// store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewClient {
  pub name:                String,
  pub phone:               String,
  #[serde(default)]
  pub meeting_type:        MeetingType,
  #[serde(default)]
  pub idea_summary:        String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub tattoo_description:  Option<String>,
  #[serde(default)]
  pub ai_active:           AutomationStatus,
  #[serde(default)]
  pub status:              WorkflowStatus,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub email:               Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub instagram:           Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub placement:           Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub size:                Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub budget:              Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub next_appointment:    Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub consultation_date:   Option<DateTime<Utc>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub calendar_event_id:   Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub calendar_event_link: Option<String>,
  #[serde(default)]
  pub reference_photos:    Vec<ReferencePhoto>,
}

impl NewClient {
  pub fn new(name: impl Into<String>, phone: impl Into<String>) -> Self {
    Self { name: name.into(), phone: phone.into(), ..Self::default() }
  }

  /// Materialise the record with the identity and creation time chosen by
  /// the store.
  pub fn into_client(self, id: ClientId, now: DateTime<Utc>) -> Client {
    let tattoo_description = self
      .tattoo_description
      .filter(|d| !d.is_empty())
      .unwrap_or_else(|| self.idea_summary.clone());

    Client {
      id,
      name: self.name,
      phone: self.phone,
      meeting_type: self.meeting_type,
      idea_summary: self.idea_summary,
      tattoo_description,
      ai_active: self.ai_active,
      status: self.status,
      email: self.email,
      instagram: self.instagram,
      placement: self.placement,
      size: self.size,
      budget: self.budget,
      next_appointment: self.next_appointment,
      consultation_date: self.consultation_date,
      calendar_event_id: self.calendar_event_id,
      calendar_event_link: self.calendar_event_link,
      reference_photos: self.reference_photos,
      created_at: now,
      updated_at: now,
    }
  }
}

impl From<Client> for NewClient {
  fn from(c: Client) -> Self {
    Self {
      name:                c.name,
      phone:               c.phone,
      meeting_type:        c.meeting_type,
      idea_summary:        c.idea_summary,
      tattoo_description:  Some(c.tattoo_description),
      ai_active:           c.ai_active,
      status:              c.status,
      email:               c.email,
      instagram:           c.instagram,
      placement:           c.placement,
      size:                c.size,
      budget:              c.budget,
      next_appointment:    c.next_appointment,
      consultation_date:   c.consultation_date,
      calendar_event_id:   c.calendar_event_id,
      calendar_event_link: c.calendar_event_link,
      reference_photos:    c.reference_photos,
    }
  }
}

/// A partial update. Absent fields are left untouched. Unknown keys in a JSON
/// body (including `id`, `_id` and `createdAt`) are ignored on deserialise.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientPatch {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name:                Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub phone:               Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub meeting_type:        Option<MeetingType>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub idea_summary:        Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub tattoo_description:  Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub ai_active:           Option<AutomationStatus>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub status:              Option<WorkflowStatus>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub email:               Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub instagram:           Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub placement:           Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub size:                Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub budget:              Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub next_appointment:    Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub consultation_date:   Option<DateTime<Utc>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub calendar_event_id:   Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub calendar_event_link: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub reference_photos:    Option<Vec<ReferencePhoto>>,
}

impl ClientPatch {
  pub fn is_empty(&self) -> bool { *self == Self::default() }
}
