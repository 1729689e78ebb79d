use thiserror::Error as ThisError;

///
/// IntakeError
///
/// Requests the wizard refuses outright. Field validation failures are not errors
/// of this kind; they live in `ValidationErrors` and never abort a session.
///

#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum IntakeError {
  #[error("unknown field '{0}'")]
  UnknownField(String),

  #[error("unknown course field '{0}'")]
  UnknownCourseField(String),

  /// The value's shape does not match the field kind (e.g. text sent to a file field).
  #[error("field '{field}' expects a {expected} value")]
  KindMismatch { field: String, expected: &'static str },

  #[error("course index {index} is out of range ({len} courses)")]
  CourseIndexOutOfRange { index: usize, len: usize },

  #[error("submit is only available on the last step (current step {current}, last step {last})")]
  NotOnLastStep { current: usize, last: usize },

  /// Only raised when `WizardOptions::guard_last_course` is enabled.
  #[error("at least one course must remain")]
  RemovalWouldEmptyCourses,

  #[error("too many open form sessions (limit {max})")]
  SessionLimitReached { max: usize },
}
