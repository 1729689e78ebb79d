//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Translating client change events into wizard operations
//!   - Submitting a form and handing the accepted payload to the submission sink

use tracing::{debug, info, instrument, warn};

use crate::error::IntakeError;
use crate::payload::SubmissionPayload;
use crate::record::{CourseField, FieldValue};
use crate::submission::SubmissionSink;
use crate::validation::ValidationErrors;
use crate::wizard::{SubmitError, WizardController};

/// One user edit or navigation event.
#[derive(Debug)]
pub enum FormAction {
  SetField { name: String, value: serde_json::Value },
  Next,
  Previous,
  AppendCourse,
  RemoveCourse { index: usize },
  SetCourseField { index: usize, field: String, value: String },
}

#[derive(Debug)]
pub enum SubmitOutcome {
  Accepted(SubmissionPayload),
  Rejected { step_index: usize, errors: ValidationErrors },
}

#[instrument(level = "debug", skip(ctrl, action), fields(step = ctrl.current_step_index()))]
pub fn apply_action(ctrl: &mut WizardController, action: FormAction) -> Result<(), IntakeError> {
  match action {
    FormAction::SetField { name, value } => {
      let def = ctrl
        .schema()
        .field(&name)
        .cloned()
        .ok_or_else(|| IntakeError::UnknownField(name.clone()))?;
      let value = FieldValue::from_json(&def, value)?;
      debug!(target: "intake", field = %name, kind = def.kind.as_str(), len = value.as_text().map_or(0, str::len), "Field changed");
      ctrl.set_value(&name, value)
    }
    FormAction::Next => {
      let step = ctrl.next();
      debug!(target: "intake", step, "Step forward");
      Ok(())
    }
    FormAction::Previous => {
      let step = ctrl.previous();
      debug!(target: "intake", step, "Step back");
      Ok(())
    }
    FormAction::AppendCourse => ctrl.append_course().map(|_| ()),
    FormAction::RemoveCourse { index } => {
      if ctrl.remove_course(index)?.is_none() {
        warn!(target: "intake", index, "Course removal ignored: index out of range");
      }
      Ok(())
    }
    FormAction::SetCourseField { index, field, value } => {
      let field: CourseField = field.parse()?;
      debug!(target: "intake", index, field = field.name(), len = value.len(), "Course field changed");
      ctrl.set_course_field(index, field, value)
    }
  }
}

/// Submit `ctrl`; an accepted payload is delivered to `sink` before returning.
pub fn submit_and_deliver(ctrl: &mut WizardController, sink: &dyn SubmissionSink) -> Result<SubmitOutcome, IntakeError> {
  match ctrl.submit() {
    Ok(payload) => {
      sink.deliver(payload.clone());
      info!(target: "intake", entries = payload.len(), "Submission handed to sink");
      Ok(SubmitOutcome::Accepted(payload))
    }
    Err(SubmitError::Rejected(errors)) => Ok(SubmitOutcome::Rejected { step_index: ctrl.current_step_index(), errors }),
    Err(SubmitError::Intake(e)) => Err(e),
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use serde_json::json;

  use super::*;
  use crate::schema::FormSchema;
  use crate::submission::testing::RecordingSink;
  use crate::wizard::WizardOptions;

  fn wizard() -> WizardController {
    WizardController::new(Arc::new(FormSchema::default()), WizardOptions::default())
  }

  #[test]
  fn set_field_converts_json_per_kind() {
    let mut w = wizard();
    apply_action(&mut w, FormAction::SetField { name: "fullName".into(), value: json!("Ann Lee") }).expect("text");
    apply_action(
      &mut w,
      FormAction::SetField { name: "institutionSeal".into(), value: json!({"fileName": "seal.png"}) },
    )
    .expect("file");
    assert_eq!(w.record().text("fullName"), "Ann Lee");
    assert!(w.record().get("institutionSeal").and_then(FieldValue::as_file).is_some());

    let err = apply_action(&mut w, FormAction::SetField { name: "fullName".into(), value: json!({"x": 1}) });
    assert!(matches!(err, Err(IntakeError::KindMismatch { .. })));
  }

  #[test]
  fn course_actions_parse_field_names() {
    let mut w = wizard();
    apply_action(&mut w, FormAction::AppendCourse).expect("append");
    apply_action(
      &mut w,
      FormAction::SetCourseField { index: 1, field: "courseGPA".into(), value: "4.00".into() },
    )
    .expect("set");
    assert_eq!(w.courses().and_then(|c| c.get(1)).map(|c| c.course_gpa.as_str()), Some("4.00"));

    let err = apply_action(&mut w, FormAction::SetCourseField { index: 0, field: "instructor".into(), value: "x".into() });
    assert_eq!(err, Err(IntakeError::UnknownCourseField("instructor".into())));

    apply_action(&mut w, FormAction::RemoveCourse { index: 9 }).expect("silent no-op");
    assert_eq!(w.courses().map(|c| c.len()), Some(2));
  }

  #[test]
  fn rejected_submit_delivers_nothing() {
    let mut w = wizard();
    while !w.is_last_step() {
      apply_action(&mut w, FormAction::Next).expect("next");
    }
    let sink = RecordingSink::default();
    let outcome = submit_and_deliver(&mut w, &sink).expect("outcome");
    assert!(matches!(outcome, SubmitOutcome::Rejected { step_index: 7, .. }));
    assert!(sink.delivered.lock().map(|d| d.is_empty()).unwrap_or(false));
  }

  #[test]
  fn submit_away_from_last_step_is_misuse() {
    let mut w = wizard();
    let sink = RecordingSink::default();
    assert_eq!(
      submit_and_deliver(&mut w, &sink).map(|_| ()),
      Err(IntakeError::NotOnLastStep { current: 0, last: 7 })
    );
  }
}
