//! Integration tests for `SqliteStore` and `SqliteKv` against in-memory
//! databases.

use inkflow_core::{
  Classify, ErrorKind,
  client::{AutomationStatus, ClientId, ClientPatch, NewClient, WorkflowStatus},
  kv::KeyValueStore,
  placement::SHOULDER,
  store::ClientRepository,
};
use serde_json::json;

use crate::{Error, SqliteKv, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn new_client(name: &str, phone: &str) -> NewClient { NewClient::new(name, phone) }

// ─── Create ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_assigns_identity_and_timestamps() {
  let s = store().await;
  let c = s.create(new_client("Noa", "+972501234567")).await.unwrap();

  assert!(!c.id.as_str().is_empty());
  assert_eq!(c.created_at, c.updated_at);
  assert_eq!(c.status, WorkflowStatus::Consultation);

  let all = s.list().await.unwrap();
  assert_eq!(all.len(), 1);
  assert_eq!(all[0], c);
}

#[tokio::test]
async fn duplicate_phone_is_rejected_and_store_unchanged() {
  let s = store().await;
  s.create(new_client("Noa", "+972501234567")).await.unwrap();

  let err = s
    .create(new_client("Someone Else", "+972501234567"))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::DuplicatePhone(_)));
  assert_eq!(err.kind(), ErrorKind::Duplicate);
  assert_eq!(err.to_string(), "A client with this phone number already exists");

  let all = s.list().await.unwrap();
  assert_eq!(all.len(), 1);
  assert_eq!(all[0].name, "Noa");
}

#[tokio::test]
async fn list_is_newest_first() {
  let s = store().await;
  let a = s.create(new_client("A", "+1")).await.unwrap();
  let b = s.create(new_client("B", "+2")).await.unwrap();
  let c = s.create(new_client("C", "+3")).await.unwrap();

  let ids: Vec<_> = s.list().await.unwrap().into_iter().map(|c| c.id).collect();
  assert_eq!(ids, vec![c.id, b.id, a.id]);
}

// ─── Update ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn update_preserves_identity_and_advances_updated_at() {
  let s = store().await;
  let original = s.create(new_client("Noa", "+972501234567")).await.unwrap();

  let patch: ClientPatch = serde_json::from_value(json!({
    "id": "hijack",
    "createdAt": "2001-01-01T00:00:00Z",
    "status": "Booked",
    "budget": "1500",
  }))
  .unwrap();

  let updated = s.update(&original.id, patch).await.unwrap();
  assert_eq!(updated.id, original.id);
  assert_eq!(updated.created_at, original.created_at);
  assert!(updated.updated_at > original.updated_at);
  assert_eq!(updated.status, WorkflowStatus::Booked);
  assert_eq!(updated.budget.as_deref(), Some("1500"));

  let again = s
    .update(&original.id, ClientPatch { size: Some("10cm".into()), ..Default::default() })
    .await
    .unwrap();
  assert!(again.updated_at > updated.updated_at);

  let listed = s.list().await.unwrap();
  assert_eq!(listed[0], again);
}

#[tokio::test]
async fn update_unknown_id_is_not_found() {
  let s = store().await;
  let err = s
    .update(&ClientId::from("missing"), ClientPatch::default())
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
}

// ─── Delete ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn delete_removes_client() {
  let s = store().await;
  let c = s.create(new_client("Noa", "+1")).await.unwrap();
  s.delete(&c.id).await.unwrap();
  assert!(s.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn delete_unknown_id_is_not_found() {
  let s = store().await;
  s.create(new_client("Noa", "+1")).await.unwrap();

  let err = s.delete(&ClientId::from("nope")).await.unwrap_err();
  assert!(matches!(err, Error::NotFound(_)));
  assert_eq!(s.list().await.unwrap().len(), 1);
}

// ─── Queries ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn search_matches_name_phone_and_email() {
  let s = store().await;
  let mut with_email = new_client("Yael Cohen", "+972-52-111-2222");
  with_email.email = Some("yael@example.com".into());
  s.create(with_email).await.unwrap();
  s.create(new_client("Avi Levi", "+972-54-333-4444")).await.unwrap();

  assert_eq!(s.search("yael").await.unwrap().len(), 1);
  assert_eq!(s.search("333").await.unwrap()[0].name, "Avi Levi");
  assert_eq!(s.search("example.com").await.unwrap().len(), 1);
  assert!(s.search("100%").await.unwrap().is_empty());
}

#[tokio::test]
async fn search_folds_case_beyond_ascii() {
  let s = store().await;
  let mut elodie = new_client("Élodie Brun", "+33-6-12-34-56-78");
  elodie.email = Some("ÉLODIE@Studio.fr".into());
  s.create(elodie).await.unwrap();
  s.create(new_client("Dana", "+972-50-111-2222")).await.unwrap();

  assert_eq!(s.search("élodie").await.unwrap().len(), 1);
  assert_eq!(s.search("ÉLODIE BRUN").await.unwrap()[0].name, "Élodie Brun");
  assert_eq!(s.search("élodie@studio").await.unwrap().len(), 1);
  assert_eq!(s.search("DANA").await.unwrap().len(), 1);
}

#[tokio::test]
async fn find_by_phone_is_exact() {
  let s = store().await;
  s.create(new_client("Noa", "+972501234567")).await.unwrap();

  assert!(s.find_by_phone("+972501234567").await.unwrap().is_some());
  assert!(s.find_by_phone("0501234567").await.unwrap().is_none());
}

#[tokio::test]
async fn filter_by_automation_status() {
  let s = store().await;
  let mut done = new_client("Done", "+1");
  done.ai_active = AutomationStatus::Completed;
  s.create(done).await.unwrap();
  s.create(new_client("Waiting", "+2")).await.unwrap();

  let completed = s.by_automation_status(AutomationStatus::Completed).await.unwrap();
  assert_eq!(completed.len(), 1);
  assert_eq!(completed[0].name, "Done");

  let pending = s.by_automation_status(AutomationStatus::Pending).await.unwrap();
  assert_eq!(pending[0].name, "Waiting");
}

// ─── Automation documents ────────────────────────────────────────────────────

#[tokio::test]
async fn raw_automation_document_is_normalized() {
  let s = store().await;
  let c = s
    .insert_raw(json!({
      "client_name": "Dana",
      "phone_number": "+972509998888",
      "idea_summary": "Small rose on the shoulder",
      "ai_active": true,
      "timestamp": "2025-08-01 10:00:00",
    }))
    .await
    .unwrap();

  assert!(!c.id.as_str().is_empty());
  assert_eq!(c.name, "Dana");
  assert_eq!(c.ai_active, AutomationStatus::Completed);
  assert_eq!(c.placement.as_deref(), Some(SHOULDER));

  let listed = s.list().await.unwrap();
  assert_eq!(listed[0].id, c.id);
  assert_eq!(listed[0].phone, "+972509998888");

  // Automation records can be edited like any other.
  let updated = s
    .update(&c.id, ClientPatch { status: Some(WorkflowStatus::Booked), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(updated.name, "Dana");
  assert_eq!(updated.created_at, c.created_at);
}

#[tokio::test]
async fn raw_document_keeps_its_own_id() {
  let s = store().await;
  let c = s
    .insert_raw(json!({ "_id": { "$oid": "66b1f0c2a1" }, "name": "Lior", "phone": "+3" }))
    .await
    .unwrap();
  assert_eq!(c.id.as_str(), "66b1f0c2a1");
  s.delete(&c.id).await.unwrap();
}

// ─── Key-value ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn kv_set_get_remove_clear() {
  let kv = SqliteKv::open_in_memory().await.unwrap();

  assert_eq!(kv.get("a").await.unwrap(), None);
  kv.set("a", "1".into()).await.unwrap();
  kv.set("a", "2".into()).await.unwrap();
  kv.set("b", "3".into()).await.unwrap();
  assert_eq!(kv.get("a").await.unwrap().as_deref(), Some("2"));

  kv.remove("a").await.unwrap();
  assert_eq!(kv.get("a").await.unwrap(), None);

  kv.clear().await.unwrap();
  assert_eq!(kv.get("b").await.unwrap(), None);
}
