//! Sample studio clients, used to seed the fallback store and for demos.

use chrono::{DateTime, TimeDelta, TimeZone as _, Utc};
use inkflow_core::{
  Classify, ErrorKind,
  client::{AutomationStatus, Client, ClientId, MeetingType, NewClient, WorkflowStatus},
  store::ClientRepository,
};
use tracing::{info, warn};

struct Sample {
  name:             &'static str,
  phone:            &'static str,
  meeting_type:     MeetingType,
  idea_summary:     &'static str,
  ai_active:        AutomationStatus,
  status:           WorkflowStatus,
  email:            Option<&'static str>,
  description:      &'static str,
  placement:        &'static str,
  size:             &'static str,
  budget:           &'static str,
  next_appointment: Option<&'static str>,
}

const SAMPLES: [Sample; 5] = [
  Sample {
    name:             "אלי רוזן",
    phone:            "+972-50-123-4567",
    meeting_type:     MeetingType::Consultation,
    idea_summary:     "קעקוע של שדה פרחים על הכתף השמאלית, סגנון מינימליסטי",
    ai_active:        AutomationStatus::Completed,
    status:           WorkflowStatus::Consultation,
    email:            Some("eli.rosen@email.com"),
    description:      "קעקוע של שדה פרחים על הכתף השמאלית",
    placement:        "כתף שמאלית",
    size:             "Medium",
    budget:           "800-1200 ₪",
    next_appointment: None,
  },
  Sample {
    name:             "מיה כהן",
    phone:            "+972-54-987-6543",
    meeting_type:     MeetingType::Consultation,
    idea_summary:     "קעקוע על הזרוע, דגם גיאומטרי, בצבע שחור בלבד",
    ai_active:        AutomationStatus::Error,
    status:           WorkflowStatus::InProgress,
    email:            None,
    description:      "קעקוע על הזרוע, דגם גיאומטרי",
    placement:        "זרוע",
    size:             "Small",
    budget:           "600-900 ₪",
    next_appointment: None,
  },
  Sample {
    name:             "דוד לוי",
    phone:            "+972-52-111-2222",
    meeting_type:     MeetingType::Appointment,
    idea_summary:     "קעקוע של אריה על הגב, סגנון ריאליסטי עם פרטים",
    ai_active:        AutomationStatus::Completed,
    status:           WorkflowStatus::Booked,
    email:            None,
    description:      "קעקוע של אריה על הגב",
    placement:        "גב",
    size:             "Large",
    budget:           "1500-2000 ₪",
    next_appointment: Some("2025-08-10 14:00"),
  },
  Sample {
    name:             "שרה אבן",
    phone:            "+972-53-333-4444",
    meeting_type:     MeetingType::Consultation,
    idea_summary:     "קעקוע קטן על הקרסול, פרח לוטוס מינימליסטי",
    ai_active:        AutomationStatus::Pending,
    status:           WorkflowStatus::ConsultationScheduled,
    email:            None,
    description:      "קעקוע קטן על הקרסול, פרח לוטוס",
    placement:        "קרסול",
    size:             "Small",
    budget:           "400-600 ₪",
    next_appointment: Some("2025-08-06 16:30"),
  },
  Sample {
    name:             "יוסי גבריאל",
    phone:            "+972-50-555-6666",
    meeting_type:     MeetingType::FollowUp,
    idea_summary:     "השלמת קעקוע קיים על היד, הוספת צבעים",
    ai_active:        AutomationStatus::InProgress,
    status:           WorkflowStatus::Completed,
    email:            None,
    description:      "השלמת קעקוע קיים על היד",
    placement:        "יד",
    size:             "Medium",
    budget:           "700-1000 ₪",
    next_appointment: None,
  },
];

impl Sample {
  fn to_new_client(&self) -> NewClient {
    NewClient {
      meeting_type: self.meeting_type,
      idea_summary: self.idea_summary.to_owned(),
      tattoo_description: Some(self.description.to_owned()),
      ai_active: self.ai_active,
      status: self.status,
      email: self.email.map(str::to_owned),
      placement: Some(self.placement.to_owned()),
      size: Some(self.size.to_owned()),
      budget: Some(self.budget.to_owned()),
      next_appointment: self.next_appointment.map(str::to_owned),
      ..NewClient::new(self.name, self.phone)
    }
  }
}

/// The sample clients as creation payloads, in listing order.
pub fn sample_clients() -> Vec<NewClient> { SAMPLES.iter().map(Sample::to_new_client).collect() }

/// The sample clients as stored records with ids `1`..`5`, the first one
/// newest.
pub fn sample_records() -> Vec<Client> {
  let base: DateTime<Utc> = Utc.with_ymd_and_hms(2025, 8, 1, 9, 0, 0).single().unwrap_or_default();
  let count = SAMPLES.len() as i64;
  sample_clients()
    .into_iter()
    .zip(1..)
    .map(|(input, n)| {
      let at = base + TimeDelta::hours(count - n);
      input.into_client(ClientId::new(n.to_string()), at)
    })
    .collect()
}

/// Create every sample client in `repo`, skipping any whose phone is already
/// present. Returns how many were added.
pub async fn seed<R: ClientRepository>(repo: &R) -> Result<usize, R::Error> {
  let mut added = 0;
  for input in sample_clients() {
    let name = input.name.clone();
    match repo.create(input).await {
      Ok(_) => {
        info!(%name, "sample client added");
        added += 1;
      }
      Err(e) if e.kind() == ErrorKind::Duplicate => {
        warn!(%name, "sample client already exists, skipping");
      }
      Err(e) => return Err(e),
    }
  }
  Ok(added)
}
