//! Per-field validation and the keyed error set rendered next to fields.
//!
//! Validation is pure: a definition and a value go in, `Valid` or `Invalid(message)`
//! comes out. Errors are keyed by field name, or by (course index, sub-field) for
//! course records, so two courses never share error state.

use std::collections::BTreeMap;
use std::fmt;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use thiserror::Error as ThisError;
use url::Url;

use crate::record::{CourseField, FieldValue};
use crate::schema::{FieldDefinition, FieldKind};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValidationResult {
  Valid,
  Invalid(String),
}

impl ValidationResult {
  pub fn is_valid(&self) -> bool {
    matches!(self, ValidationResult::Valid)
  }

  pub fn message(&self) -> Option<&str> {
    match self {
      ValidationResult::Valid => None,
      ValidationResult::Invalid(m) => Some(m),
    }
  }
}

impl FieldDefinition {
  /// Check `value` against this definition.
  pub fn validate(&self, value: &FieldValue) -> ValidationResult {
    let ok = match self.kind {
      FieldKind::ShortText | FieldKind::LongText | FieldKind::Date | FieldKind::NumericText => {
        text_ok(self, value.as_text().unwrap_or(""))
      }
      // Option membership is not enforced; any non-empty choice passes.
      FieldKind::Enum => !self.required || !value.as_text().unwrap_or("").trim().is_empty(),
      FieldKind::Url => url_ok(self, value.as_text().unwrap_or("")),
      FieldKind::FileReference => !self.required || value.as_file().is_some(),
      FieldKind::Courses => !self.required || value.as_courses().map_or(false, |c| !c.is_empty()),
    };
    if ok {
      ValidationResult::Valid
    } else {
      ValidationResult::Invalid(self.message.to_string())
    }
  }

  /// Check a bare string against this definition (course sub-fields).
  pub fn validate_text(&self, value: &str) -> ValidationResult {
    if text_ok(self, value) {
      ValidationResult::Valid
    } else {
      ValidationResult::Invalid(self.message.to_string())
    }
  }
}

fn text_ok(def: &FieldDefinition, value: &str) -> bool {
  !def.required || value.trim().chars().count() >= def.min_length
}

fn url_ok(def: &FieldDefinition, value: &str) -> bool {
  let value = value.trim();
  if value.is_empty() {
    return !def.required;
  }
  // Url::parse refuses relative references, so any success is absolute.
  Url::parse(value).is_ok()
}

/// Where an error is rendered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorKey {
  Field(&'static str),
  Course { index: usize, field: CourseField },
}

impl ErrorKey {
  pub fn field_name(&self) -> &'static str {
    match self {
      ErrorKey::Field(name) => name,
      ErrorKey::Course { field, .. } => field.name(),
    }
  }

  pub fn course_index(&self) -> Option<usize> {
    match self {
      ErrorKey::Field(_) => None,
      ErrorKey::Course { index, .. } => Some(*index),
    }
  }
}

/// Same notation as the submission payload: `fullName`, `courses[0].courseName`.
impl fmt::Display for ErrorKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ErrorKey::Field(name) => f.write_str(name),
      ErrorKey::Course { index, field } => write!(f, "courses[{}].{}", index, field.name()),
    }
  }
}

impl Serialize for ErrorKey {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

/// A single failed check.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("{key}: {message}")]
pub struct FieldValidationError {
  pub key: ErrorKey,
  pub message: String,
}

impl FieldValidationError {
  pub fn field_name(&self) -> &'static str {
    self.key.field_name()
  }

  pub fn course_index(&self) -> Option<usize> {
    self.key.course_index()
  }
}

/// Current error set of a form session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationErrors {
  entries: BTreeMap<ErrorKey, String>,
}

impl ValidationErrors {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn get(&self, key: &ErrorKey) -> Option<&str> {
    self.entries.get(key).map(String::as_str)
  }

  pub fn field(&self, name: &str) -> Option<&str> {
    self
      .entries
      .iter()
      .find(|(k, _)| matches!(k, ErrorKey::Field(n) if *n == name))
      .map(|(_, m)| m.as_str())
  }

  pub fn course(&self, index: usize, field: CourseField) -> Option<&str> {
    self.get(&ErrorKey::Course { index, field })
  }

  /// Record `result` under `key`, clearing any previous error when valid.
  pub fn apply(&mut self, key: ErrorKey, result: ValidationResult) {
    match result {
      ValidationResult::Valid => {
        self.entries.remove(&key);
      }
      ValidationResult::Invalid(message) => {
        self.entries.insert(key, message);
      }
    }
  }

  pub fn remove(&mut self, key: &ErrorKey) -> Option<String> {
    self.entries.remove(key)
  }

  /// Drop the errors of the removed course and move later courses' errors down by one.
  pub fn shift_courses_after_removal(&mut self, removed: usize) {
    let entries = std::mem::take(&mut self.entries);
    self.entries = entries
      .into_iter()
      .filter_map(|(key, message)| match key {
        ErrorKey::Course { index, .. } if index == removed => None,
        ErrorKey::Course { index, field } if index > removed => {
          Some((ErrorKey::Course { index: index - 1, field }, message))
        }
        other => Some((other, message)),
      })
      .collect();
  }

  pub fn iter(&self) -> impl Iterator<Item = FieldValidationError> + '_ {
    self
      .entries
      .iter()
      .map(|(key, message)| FieldValidationError { key: *key, message: message.clone() })
  }

  pub fn keys(&self) -> impl Iterator<Item = &ErrorKey> {
    self.entries.keys()
  }
}

impl FromIterator<FieldValidationError> for ValidationErrors {
  fn from_iter<I: IntoIterator<Item = FieldValidationError>>(iter: I) -> Self {
    Self { entries: iter.into_iter().map(|e| (e.key, e.message)).collect() }
  }
}

/// Serialized as `{ "fullName": "...", "courses[0].courseName": "..." }`.
impl Serialize for ValidationErrors {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(self.entries.len()))?;
    for (key, message) in &self.entries {
      map.serialize_entry(&key.to_string(), message)?;
    }
    map.end()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::courses::CourseList;
  use crate::record::FileRef;
  use crate::schema::{FormSchema, SchemaVersion};

  fn def(name: &str) -> FieldDefinition {
    FormSchema::certificate(SchemaVersion::V3).field(name).cloned().expect("field")
  }

  #[test]
  fn min_length_uses_trimmed_char_count() {
    let full_name = def("fullName");
    let invalid = ValidationResult::Invalid("Full Name must be at least 2 characters.".into());
    assert_eq!(full_name.validate(&FieldValue::text("A")), invalid);
    assert_eq!(full_name.validate(&FieldValue::text("  A  ")), invalid);
    assert_eq!(full_name.validate(&FieldValue::text("Al")), ValidationResult::Valid);
    assert_eq!(full_name.validate(&FieldValue::text("Éa")), ValidationResult::Valid);
  }

  #[test]
  fn every_required_text_field_reports_its_own_message() {
    let schema = FormSchema::certificate(SchemaVersion::V3);
    for f in schema.fields().iter().filter(|f| f.required && f.kind.is_textual()) {
      let short = "x".repeat(f.min_length.saturating_sub(1));
      assert_eq!(f.validate(&FieldValue::text(short)), ValidationResult::Invalid(f.message.into()), "{}", f.name);
      let long = "x".repeat(f.min_length.max(1));
      assert!(f.validate(&FieldValue::text(long)).is_valid(), "{}", f.name);
    }
  }

  #[test]
  fn optional_text_is_always_valid() {
    assert!(def("honors").validate(&FieldValue::text("")).is_valid());
    assert!(def("gpa").validate(&FieldValue::text("   ")).is_valid());
  }

  #[test]
  fn url_is_optional_but_must_be_absolute_when_present() {
    let link = def("documentLink");
    assert!(link.validate(&FieldValue::text("")).is_valid());
    assert!(link.validate(&FieldValue::text("https://example.org/quota.pdf")).is_valid());
    for good in ["mailto:registrar@example.org", "urn:isbn:0451450523", "ftp://files.example.org/q.pdf"] {
      assert!(link.validate(&FieldValue::text(good)).is_valid(), "{good}");
    }
    for bad in ["not a url", "/relative/path", "example.org", "//example.org/proof.pdf"] {
      assert_eq!(
        link.validate(&FieldValue::text(bad)).message(),
        Some("Supporting Document Link must be a valid URL."),
        "{bad}"
      );
    }
  }

  #[test]
  fn enum_only_checks_presence() {
    let quota = def("quota");
    assert_eq!(quota.validate(&FieldValue::text("")).message(), Some("Quota is required."));
    assert!(quota.validate(&FieldValue::text("None")).is_valid());
    // Values outside the option set are accepted.
    assert!(quota.validate(&FieldValue::text("Veteran")).is_valid());
  }

  #[test]
  fn file_reference_checks_presence_only() {
    let logo = def("institutionLogo");
    assert!(logo.validate(&FieldValue::File(None)).is_valid());
    assert!(logo.validate(&FieldValue::File(Some(FileRef::named("logo.svg")))).is_valid());

    let required = FieldDefinition::required("scan", "Scan", FieldKind::FileReference, "Scan is required.");
    assert_eq!(required.validate(&FieldValue::File(None)).message(), Some("Scan is required."));
    assert!(required.validate(&FieldValue::File(Some(FileRef::named("scan.pdf")))).is_valid());
  }

  #[test]
  fn empty_course_list_is_invalid() {
    let courses = def("courses");
    assert_eq!(
      courses.validate(&FieldValue::Courses(CourseList::default())).message(),
      Some("At least one course is required.")
    );
    assert!(courses.validate(&FieldValue::Courses(CourseList::with_blank())).is_valid());
  }

  #[test]
  fn course_errors_shift_down_after_removal() {
    let mut errors = ValidationErrors::new();
    errors.apply(ErrorKey::Field("fullName"), ValidationResult::Invalid("a".into()));
    errors.apply(ErrorKey::Course { index: 0, field: CourseField::CourseName }, ValidationResult::Invalid("b".into()));
    errors.apply(ErrorKey::Course { index: 1, field: CourseField::CourseCode }, ValidationResult::Invalid("c".into()));
    errors.apply(ErrorKey::Course { index: 2, field: CourseField::FullMark }, ValidationResult::Invalid("d".into()));

    errors.shift_courses_after_removal(1);

    assert_eq!(errors.len(), 3);
    assert_eq!(errors.field("fullName"), Some("a"));
    assert_eq!(errors.course(0, CourseField::CourseName), Some("b"));
    assert_eq!(errors.course(1, CourseField::FullMark), Some("d"));
    assert_eq!(errors.course(1, CourseField::CourseCode), None);
  }

  #[test]
  fn errors_serialize_with_payload_keys() {
    let errors: ValidationErrors = [
      FieldValidationError { key: ErrorKey::Field("fullName"), message: "short".into() },
      FieldValidationError {
        key: ErrorKey::Course { index: 2, field: CourseField::CourseGpa },
        message: "missing".into(),
      },
    ]
    .into_iter()
    .collect();
    let json = serde_json::to_value(&errors).expect("json");
    assert_eq!(json["fullName"], "short");
    assert_eq!(json["courses[2].courseGPA"], "missing");
  }
}
