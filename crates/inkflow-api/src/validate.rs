//! Request validation for client payloads.
//!
//! Enumerated fields are already constrained by their types; what remains are
//! the length limits and the phone and email shapes.

use inkflow_core::client::{ClientPatch, NewClient};

use crate::error::{ApiError, FieldError};

pub const NAME_MAX: usize = 100;
pub const TEXT_MAX: usize = 1000;
pub const PLACEMENT_MAX: usize = 100;
pub const SIZE_MAX: usize = 50;
pub const BUDGET_MAX: usize = 100;
pub const QUERY_MAX: usize = 100;

/// Shared field checks for create and update payloads.
#[derive(Default)]
struct Checker {
  errors: Vec<FieldError>,
}

impl Checker {
  fn fail(&mut self, field: &str, message: &str) { self.errors.push(FieldError::new(field, message)); }

  fn name(&mut self, name: &str, message: &str) {
    let len = name.trim().chars().count();
    if len == 0 || len > NAME_MAX {
      self.fail("name", message);
    }
  }

  fn phone(&mut self, phone: &str, message: &str) {
    if !looks_like_phone(phone) {
      self.fail("phone", message);
    }
  }

  fn email(&mut self, email: Option<&str>) {
    if email.is_some_and(|e| !looks_like_email(e)) {
      self.fail("email", "Must be a valid email");
    }
  }

  fn max_len(&mut self, field: &str, value: Option<&str>, max: usize, message: &str) {
    if value.is_some_and(|v| v.trim().chars().count() > max) {
      self.fail(field, message);
    }
  }

  fn optional_text(
    &mut self,
    idea: Option<&str>,
    description: Option<&str>,
    placement: Option<&str>,
    size: Option<&str>,
    budget: Option<&str>,
  ) {
    self.max_len("ideaSummary", idea, TEXT_MAX, "Idea summary must be less than 1000 characters");
    self.max_len(
      "tattooDescription",
      description,
      TEXT_MAX,
      "Tattoo description must be less than 1000 characters",
    );
    self.max_len("placement", placement, PLACEMENT_MAX, "Placement must be less than 100 characters");
    self.max_len("size", size, SIZE_MAX, "Size must be less than 50 characters");
    self.max_len("budget", budget, BUDGET_MAX, "Budget must be less than 100 characters");
  }

  fn finish(self) -> Result<(), ApiError> {
    if self.errors.is_empty() { Ok(()) } else { Err(ApiError::Validation(self.errors)) }
  }
}

pub fn new_client(input: &NewClient) -> Result<(), ApiError> {
  let mut c = Checker::default();
  c.name(&input.name, "Name is required and must be between 1-100 characters");
  c.phone(&input.phone, "Valid phone number is required");
  c.email(input.email.as_deref());
  c.optional_text(
    Some(&input.idea_summary),
    input.tattoo_description.as_deref(),
    input.placement.as_deref(),
    input.size.as_deref(),
    input.budget.as_deref(),
  );
  c.finish()
}

pub fn patch(patch: &ClientPatch) -> Result<(), ApiError> {
  let mut c = Checker::default();
  if let Some(name) = &patch.name {
    c.name(name, "Name must be between 1-100 characters");
  }
  if let Some(phone) = &patch.phone {
    c.phone(phone, "Must be a valid phone number");
  }
  c.email(patch.email.as_deref());
  c.optional_text(
    patch.idea_summary.as_deref(),
    patch.tattoo_description.as_deref(),
    patch.placement.as_deref(),
    patch.size.as_deref(),
    patch.budget.as_deref(),
  );
  c.finish()
}

/// A trimmed search query of 1 to 100 characters.
pub fn search_query(q: Option<&str>) -> Result<&str, ApiError> {
  let q = q.map(str::trim).unwrap_or_default();
  let len = q.chars().count();
  if len == 0 || len > QUERY_MAX {
    return Err(ApiError::Validation(vec![FieldError::new(
      "q",
      "Search query is required and must be between 1-100 characters",
    )]));
  }
  Ok(q)
}

/// An optional leading `+`, then 7 to 15 digits with spaces, dashes, dots or
/// parentheses between them.
pub fn looks_like_phone(s: &str) -> bool {
  let s = s.trim();
  let body = s.strip_prefix('+').unwrap_or(s);
  let mut digits = 0;
  for ch in body.chars() {
    match ch {
      '0'..='9' => digits += 1,
      ' ' | '-' | '.' | '(' | ')' => {}
      _ => return false,
    }
  }
  (7..=15).contains(&digits)
}

pub fn looks_like_email(s: &str) -> bool {
  let s = s.trim();
  let Some((local, domain)) = s.split_once('@') else {
    return false;
  };
  !local.is_empty()
    && !domain.contains('@')
    && !s.chars().any(char::is_whitespace)
    && domain
      .split_once('.')
      .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn phone_shapes() {
    assert!(looks_like_phone("+972-50-123-4567"));
    assert!(looks_like_phone("(054) 987 6543"));
    assert!(!looks_like_phone("12345"));
    assert!(!looks_like_phone("call me"));
    assert!(!looks_like_phone("+972 50 123 4567 8888 99"));
  }

  #[test]
  fn email_shapes() {
    assert!(looks_like_email("maya@example.co.il"));
    assert!(!looks_like_email("maya@"));
    assert!(!looks_like_email("maya example.com"));
    assert!(!looks_like_email("a@b@c.com"));
    assert!(!looks_like_email("a@localhost"));
  }

  #[test]
  fn create_requires_name_and_phone() {
    let Err(ApiError::Validation(details)) = new_client(&NewClient::default()) else {
      panic!("expected validation failure");
    };
    let fields: Vec<_> = details.iter().map(|d| d.field.as_str()).collect();
    assert_eq!(fields, ["name", "phone"]);
  }

  #[test]
  fn patch_checks_only_present_fields() {
    assert!(patch(&ClientPatch::default()).is_ok());
    let long = ClientPatch { size: Some("x".repeat(51)), ..Default::default() };
    assert!(patch(&long).is_err());
  }

  #[test]
  fn search_query_bounds() {
    assert_eq!(search_query(Some("  noa ")).unwrap(), "noa");
    assert!(search_query(None).is_err());
    assert!(search_query(Some("   ")).is_err());
    assert!(search_query(Some(&"a".repeat(101))).is_err());
  }
}
