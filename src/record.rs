//! Form values: the flat record, file references, and one course record.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};

use crate::courses::CourseList;
use crate::error::IntakeError;
use crate::schema::{FieldDefinition, FieldKind, FormSchema, COURSE_FIELDS};

/// Metadata of an uploaded file. The bytes themselves go to the upload endpoint,
/// never through the form state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRef {
  pub file_name: String,
  #[serde(default)] pub content_type: Option<String>,
  #[serde(default)] pub size: u64,
  #[serde(default)] pub location: Option<String>,
}

impl FileRef {
  pub fn named(file_name: impl Into<String>) -> Self {
    Self { file_name: file_name.into(), content_type: None, size: 0, location: None }
  }
}

/// Current value of one top-level field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
  Text(String),
  File(Option<FileRef>),
  Courses(CourseList),
}

impl FieldValue {
  /// Blank value a freshly mounted form starts with.
  pub fn empty_for(kind: FieldKind) -> Self {
    match kind {
      FieldKind::FileReference => FieldValue::File(None),
      FieldKind::Courses => FieldValue::Courses(CourseList::with_blank()),
      _ => FieldValue::Text(String::new()),
    }
  }

  pub fn text(value: impl Into<String>) -> Self {
    FieldValue::Text(value.into())
  }

  pub fn as_text(&self) -> Option<&str> {
    match self {
      FieldValue::Text(s) => Some(s),
      _ => None,
    }
  }

  pub fn as_file(&self) -> Option<&FileRef> {
    match self {
      FieldValue::File(f) => f.as_ref(),
      _ => None,
    }
  }

  pub fn as_courses(&self) -> Option<&CourseList> {
    match self {
      FieldValue::Courses(c) => Some(c),
      _ => None,
    }
  }

  pub fn fits(&self, kind: FieldKind) -> bool {
    match self {
      FieldValue::Text(_) => kind.is_textual(),
      FieldValue::File(_) => kind == FieldKind::FileReference,
      FieldValue::Courses(_) => kind == FieldKind::Courses,
    }
  }

  /// Interpret a JSON change event for `def`. Courses are edited through the
  /// course operations, never replaced wholesale.
  pub fn from_json(def: &FieldDefinition, value: serde_json::Value) -> Result<Self, IntakeError> {
    use serde_json::Value;

    let mismatch = |expected| IntakeError::KindMismatch { field: def.name.to_string(), expected };
    match def.kind {
      FieldKind::Courses => Err(mismatch("course list")),
      FieldKind::FileReference => match value {
        Value::Null => Ok(FieldValue::File(None)),
        Value::String(s) if s.trim().is_empty() => Ok(FieldValue::File(None)),
        Value::String(s) => Ok(FieldValue::File(Some(FileRef::named(s)))),
        v @ Value::Object(_) => serde_json::from_value::<FileRef>(v)
          .map(|f| FieldValue::File(Some(f)))
          .map_err(|_| mismatch("file reference")),
        _ => Err(mismatch("file reference")),
      },
      _ => match value {
        Value::Null => Ok(FieldValue::Text(String::new())),
        Value::String(s) => Ok(FieldValue::Text(s)),
        Value::Number(n) => Ok(FieldValue::Text(n.to_string())),
        _ => Err(mismatch("text")),
      },
    }
  }
}

/// Sub-fields of a course record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CourseField {
  CourseName,
  CourseCode,
  CourseDuration,
  CourseStartDate,
  CourseEndDate,
  FullMark,
  ObtainedMark,
  CourseGpa,
}

impl CourseField {
  pub const ALL: [CourseField; 8] = [
    CourseField::CourseName,
    CourseField::CourseCode,
    CourseField::CourseDuration,
    CourseField::CourseStartDate,
    CourseField::CourseEndDate,
    CourseField::FullMark,
    CourseField::ObtainedMark,
    CourseField::CourseGpa,
  ];

  pub fn definition(self) -> &'static FieldDefinition {
    &COURSE_FIELDS[self as usize]
  }

  pub fn name(self) -> &'static str {
    self.definition().name
  }
}

impl FromStr for CourseField {
  type Err = IntakeError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    CourseField::ALL
      .into_iter()
      .find(|f| f.name() == s)
      .ok_or_else(|| IntakeError::UnknownCourseField(s.to_string()))
  }
}

impl Serialize for CourseField {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(self.name())
  }
}

/// One block of course-specific fields. Addressed only by its position in the list.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseRecord {
  pub course_name: String,
  pub course_code: String,
  pub course_duration: String,
  pub course_start_date: String,
  pub course_end_date: String,
  pub full_mark: String,
  pub obtained_mark: String,
  #[serde(rename = "courseGPA")]
  pub course_gpa: String,
}

impl CourseRecord {
  pub fn get(&self, field: CourseField) -> &str {
    match field {
      CourseField::CourseName => &self.course_name,
      CourseField::CourseCode => &self.course_code,
      CourseField::CourseDuration => &self.course_duration,
      CourseField::CourseStartDate => &self.course_start_date,
      CourseField::CourseEndDate => &self.course_end_date,
      CourseField::FullMark => &self.full_mark,
      CourseField::ObtainedMark => &self.obtained_mark,
      CourseField::CourseGpa => &self.course_gpa,
    }
  }

  pub fn set(&mut self, field: CourseField, value: String) {
    let slot = match field {
      CourseField::CourseName => &mut self.course_name,
      CourseField::CourseCode => &mut self.course_code,
      CourseField::CourseDuration => &mut self.course_duration,
      CourseField::CourseStartDate => &mut self.course_start_date,
      CourseField::CourseEndDate => &mut self.course_end_date,
      CourseField::FullMark => &mut self.full_mark,
      CourseField::ObtainedMark => &mut self.obtained_mark,
      CourseField::CourseGpa => &mut self.course_gpa,
    };
    *slot = value;
  }

  pub fn is_blank(&self) -> bool {
    CourseField::ALL.into_iter().all(|f| self.get(f).is_empty())
  }
}

/// Complete value state of one form session. Every key of the schema is present from
/// construction on, whether or not its step has been shown yet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormRecord {
  values: BTreeMap<&'static str, FieldValue>,
}

impl FormRecord {
  pub fn new(schema: &FormSchema) -> Self {
    let values = schema
      .fields()
      .iter()
      .map(|f| (f.name, FieldValue::empty_for(f.kind)))
      .collect();
    Self { values }
  }

  pub fn get(&self, name: &str) -> Option<&FieldValue> {
    self.values.get(name)
  }

  /// Text value of `name`, or "" when the field is absent or not textual.
  pub fn text(&self, name: &str) -> &str {
    self.get(name).and_then(FieldValue::as_text).unwrap_or("")
  }

  pub fn contains_key(&self, name: &str) -> bool {
    self.values.contains_key(name)
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  /// Replace the value of a known key. Unknown keys are ignored and yield `None`.
  pub(crate) fn set(&mut self, name: &str, value: FieldValue) -> Option<FieldValue> {
    self.values.get_mut(name).map(|slot| std::mem::replace(slot, value))
  }

  pub fn courses(&self) -> Option<&CourseList> {
    self.values.values().find_map(FieldValue::as_courses)
  }

  pub fn courses_mut(&mut self) -> Option<&mut CourseList> {
    self.values.values_mut().find_map(|v| match v {
      FieldValue::Courses(c) => Some(c),
      _ => None,
    })
  }
}
