//! Step navigation state machine for one form session.
//!
//! `next()` and `previous()` are unconditional: an incomplete step never blocks
//! moving on, and values persist across steps because the record is the single
//! source of truth. Only `submit()` is gated by a full validation pass, and it is
//! only available from the last step.

use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error as ThisError;
use tracing::{debug, info, instrument};

use crate::courses::CourseList;
use crate::error::IntakeError;
use crate::payload::SubmissionPayload;
use crate::record::{CourseField, CourseRecord, FieldValue, FormRecord};
use crate::schema::{FieldDefinition, FieldKind, FormSchema, Step};
use crate::validation::{ErrorKey, ValidationErrors};

/// Opt-in behaviors layered on top of the default wizard.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WizardOptions {
  /// On a rejected submit, jump to the first step holding an error instead of staying put.
  pub focus_first_invalid_step: bool,
  /// Refuse to remove the only remaining course.
  pub guard_last_course: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum SubmitError {
  #[error("{} field(s) failed validation", .0.len())]
  Rejected(ValidationErrors),

  #[error(transparent)]
  Intake(#[from] IntakeError),
}

#[derive(Clone, Debug)]
pub struct WizardController {
  schema: Arc<FormSchema>,
  options: WizardOptions,
  current: usize,
  record: FormRecord,
  errors: ValidationErrors,
  submit_attempted: bool,
}

impl WizardController {
  pub fn new(schema: Arc<FormSchema>, options: WizardOptions) -> Self {
    let record = FormRecord::new(&schema);
    Self {
      schema,
      options,
      current: 0,
      record,
      errors: ValidationErrors::new(),
      submit_attempted: false,
    }
  }

  pub fn schema(&self) -> &FormSchema {
    &self.schema
  }

  pub fn options(&self) -> WizardOptions {
    self.options
  }

  pub fn record(&self) -> &FormRecord {
    &self.record
  }

  pub fn errors(&self) -> &ValidationErrors {
    &self.errors
  }

  pub fn current_step_index(&self) -> usize {
    self.current
  }

  pub fn step_count(&self) -> usize {
    self.schema.step_count()
  }

  pub fn current_step(&self) -> Option<&Step> {
    self.schema.step(self.current)
  }

  pub fn is_first_step(&self) -> bool {
    self.current == 0
  }

  pub fn is_last_step(&self) -> bool {
    self.current + 1 >= self.step_count()
  }

  pub fn courses(&self) -> Option<&CourseList> {
    self.record.courses()
  }

  pub fn next(&mut self) -> usize {
    self.current = (self.current + 1).min(self.step_count().saturating_sub(1));
    self.current
  }

  pub fn previous(&mut self) -> usize {
    self.current = self.current.saturating_sub(1);
    self.current
  }

  /// Whether `name` is currently rendered, given the live values its rules depend on.
  /// Hidden fields keep their key and value in the record.
  pub fn is_visible(&self, name: &str) -> bool {
    self
      .schema
      .rules()
      .iter()
      .filter(|r| r.field == name)
      .all(|r| self.record.text(r.depends_on) != r.hidden_when)
  }

  /// Flat fields the current step renders right now.
  pub fn visible_fields(&self) -> Vec<&FieldDefinition> {
    let Some(step) = self.current_step() else {
      return Vec::new();
    };
    step
      .fields
      .iter()
      .filter(|name| self.is_visible(name))
      .filter_map(|name| self.schema.field(name))
      .collect()
  }

  /// Whether the current step renders the course list.
  pub fn shows_courses(&self) -> bool {
    self.current_step().map_or(false, |s| s.repeated.is_some())
  }

  #[instrument(level = "debug", skip(self, value), fields(step = self.current))]
  pub fn set_value(&mut self, name: &str, value: FieldValue) -> Result<(), IntakeError> {
    let def = self
      .schema
      .field(name)
      .ok_or_else(|| IntakeError::UnknownField(name.to_string()))?;
    if def.kind == FieldKind::Courses || !value.fits(def.kind) {
      return Err(IntakeError::KindMismatch { field: name.to_string(), expected: def.kind.as_str() });
    }
    let name = def.name;
    self.record.set(name, value);
    if self.submit_attempted {
      self.revalidate(name);
    }
    // Fields whose visibility hangs on this one.
    let dependents: Vec<&'static str> = self
      .schema
      .rules()
      .iter()
      .filter(|r| r.depends_on == name)
      .map(|r| r.field)
      .collect();
    for dependent in dependents {
      if !self.is_visible(dependent) {
        self.errors.remove(&ErrorKey::Field(dependent));
      } else if self.submit_attempted {
        self.revalidate(dependent);
      }
    }
    Ok(())
  }

  /// Append a blank course; returns its index.
  pub fn append_course(&mut self) -> Result<usize, IntakeError> {
    let index = self.courses_mut()?.append();
    if self.submit_attempted {
      self.revalidate_courses();
    }
    debug!(target: "intake", index, "Course appended");
    Ok(index)
  }

  /// Remove the course at `index`. Out-of-range indices are a silent no-op (`Ok(None)`).
  pub fn remove_course(&mut self, index: usize) -> Result<Option<CourseRecord>, IntakeError> {
    let guard = self.options.guard_last_course;
    let courses = self.courses_mut()?;
    if guard && courses.len() == 1 && index == 0 {
      return Err(IntakeError::RemovalWouldEmptyCourses);
    }
    let removed = courses.remove_at(index);
    if removed.is_some() {
      self.errors.shift_courses_after_removal(index);
      if self.submit_attempted {
        self.revalidate_courses();
      }
      debug!(target: "intake", index, "Course removed");
    }
    Ok(removed)
  }

  pub fn set_course_field(&mut self, index: usize, field: CourseField, value: impl Into<String>) -> Result<(), IntakeError> {
    self.courses_mut()?.update_field(index, field, value)?;
    if self.submit_attempted {
      let result = self.record.courses().map(|c| c.validate_entry(index, field));
      if let Some(result) = result {
        self.errors.apply(ErrorKey::Course { index, field }, result);
      }
    }
    Ok(())
  }

  /// Validate every visible field and every course, without touching session state.
  pub fn validate_all(&self) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    for def in self.schema.fields() {
      if !self.is_visible(def.name) {
        continue;
      }
      if let Some(value) = self.record.get(def.name) {
        errors.apply(ErrorKey::Field(def.name), def.validate(value));
      }
      if let Some(FieldValue::Courses(courses)) = self.record.get(def.name) {
        courses.validate_into(&mut errors);
      }
    }
    errors
  }

  /// Validate the whole record and, when everything passes, flatten it for delivery.
  /// A rejected submit keeps the current step unless `focus_first_invalid_step` is set.
  #[instrument(level = "info", skip(self), fields(step = self.current))]
  pub fn submit(&mut self) -> Result<SubmissionPayload, SubmitError> {
    if !self.is_last_step() {
      return Err(IntakeError::NotOnLastStep {
        current: self.current,
        last: self.step_count().saturating_sub(1),
      }
      .into());
    }
    self.submit_attempted = true;
    self.errors = self.validate_all();
    if !self.errors.is_empty() {
      if self.options.focus_first_invalid_step {
        if let Some(step) = self.first_invalid_step() {
          self.current = step;
        }
      }
      for e in self.errors.iter() {
        debug!(target: "intake", field = e.field_name(), course = ?e.course_index(), "{}", e);
      }
      info!(target: "intake", errors = self.errors.len(), step = self.current, "Submit rejected");
      return Err(SubmitError::Rejected(self.errors.clone()));
    }
    let payload = SubmissionPayload::from_record(&self.schema, &self.record);
    info!(target: "intake", entries = payload.len(), "Submit accepted");
    Ok(payload)
  }

  /// Lowest step index that renders a field with an error.
  pub fn first_invalid_step(&self) -> Option<usize> {
    self
      .errors
      .keys()
      .filter_map(|key| match key {
        ErrorKey::Field(name) => self.schema.step_of(name),
        ErrorKey::Course { .. } => self.schema.repeated_field().and_then(|f| self.schema.step_of(f.name)),
      })
      .min()
  }

  fn courses_mut(&mut self) -> Result<&mut CourseList, IntakeError> {
    self
      .record
      .courses_mut()
      .ok_or_else(|| IntakeError::UnknownField(crate::schema::COURSES.to_string()))
  }

  fn revalidate(&mut self, name: &'static str) {
    if !self.is_visible(name) {
      self.errors.remove(&ErrorKey::Field(name));
      return;
    }
    let result = match (self.schema.field(name), self.record.get(name)) {
      (Some(def), Some(value)) => def.validate(value),
      _ => return,
    };
    self.errors.apply(ErrorKey::Field(name), result);
  }

  fn revalidate_courses(&mut self) {
    if let Some(def) = self.schema.repeated_field() {
      let name = def.name;
      self.revalidate(name);
    }
  }
}
