//! Variable-length list of course records bound to the `courses` key of a form.
//!
//! Records have no identity beyond their position. Removing one shifts every later
//! record down by one index.
//!
//! Contract: the form requires at least one course, but `remove_at` does not enforce
//! it. The minimum is checked when the form is submitted; callers that want to forbid
//! removing the last course must check `len()` before calling (the wizard does so when
//! `WizardOptions::guard_last_course` is set).

use serde::Serialize;

use crate::error::IntakeError;
use crate::record::{CourseField, CourseRecord};
use crate::validation::{ErrorKey, ValidationErrors, ValidationResult};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CourseList {
  records: Vec<CourseRecord>,
}

impl CourseList {
  /// A list holding a single blank course, the state of a freshly mounted form.
  pub fn with_blank() -> Self {
    Self { records: vec![CourseRecord::default()] }
  }

  pub fn len(&self) -> usize {
    self.records.len()
  }

  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }

  pub fn get(&self, index: usize) -> Option<&CourseRecord> {
    self.records.get(index)
  }

  pub fn iter(&self) -> std::slice::Iter<'_, CourseRecord> {
    self.records.iter()
  }

  /// Add a blank course at the end and return its index.
  pub fn append(&mut self) -> usize {
    self.records.push(CourseRecord::default());
    self.records.len() - 1
  }

  /// Remove the course at `index`. Out-of-range indices are a no-op and yield `None`.
  pub fn remove_at(&mut self, index: usize) -> Option<CourseRecord> {
    if index < self.records.len() {
      Some(self.records.remove(index))
    } else {
      None
    }
  }

  /// Set one sub-field of the course at `index`. Does not validate.
  pub fn update_field(&mut self, index: usize, field: CourseField, value: impl Into<String>) -> Result<(), IntakeError> {
    let len = self.records.len();
    let record = self
      .records
      .get_mut(index)
      .ok_or(IntakeError::CourseIndexOutOfRange { index, len })?;
    record.set(field, value.into());
    Ok(())
  }

  pub fn validate_entry(&self, index: usize, field: CourseField) -> ValidationResult {
    match self.records.get(index) {
      Some(record) => field.definition().validate_text(record.get(field)),
      None => ValidationResult::Valid,
    }
  }

  /// Validate every sub-field of every course into `errors`.
  pub fn validate_into(&self, errors: &mut ValidationErrors) {
    for index in 0..self.records.len() {
      for field in CourseField::ALL {
        errors.apply(ErrorKey::Course { index, field }, self.validate_entry(index, field));
      }
    }
  }
}

impl<'a> IntoIterator for &'a CourseList {
  type Item = &'a CourseRecord;
  type IntoIter = std::slice::Iter<'a, CourseRecord>;

  fn into_iter(self) -> Self::IntoIter {
    self.records.iter()
  }
}
