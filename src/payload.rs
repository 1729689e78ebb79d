//! Flattened submission payload handed to the submission collaborator.
//!
//! One entry per top-level field, in schema order, with the course list expanded
//! into `courses[i].<subfield>` keys.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{json, Value};

use crate::record::{CourseField, FieldValue, FileRef, FormRecord};
use crate::schema::FormSchema;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SubmissionPayload {
  entries: Vec<(String, Value)>,
}

impl SubmissionPayload {
  pub fn from_record(schema: &FormSchema, record: &FormRecord) -> Self {
    let mut entries = Vec::new();
    for def in schema.fields() {
      match record.get(def.name) {
        Some(FieldValue::Courses(courses)) => {
          for (index, course) in courses.iter().enumerate() {
            for field in CourseField::ALL {
              entries.push((
                format!("{}[{}].{}", def.name, index, field.name()),
                Value::String(course.get(field).to_string()),
              ));
            }
          }
        }
        Some(FieldValue::File(file)) => entries.push((def.name.to_string(), file_value(file.as_ref()))),
        Some(FieldValue::Text(text)) => entries.push((def.name.to_string(), Value::String(text.clone()))),
        None => entries.push((def.name.to_string(), Value::Null)),
      }
    }
    Self { entries }
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn get(&self, key: &str) -> Option<&Value> {
    self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
    self.entries.iter().map(|(k, v)| (k.as_str(), v))
  }

  pub fn to_json(&self) -> Value {
    Value::Object(self.entries.iter().cloned().collect())
  }
}

fn file_value(file: Option<&FileRef>) -> Value {
  match file {
    Some(f) => json!({
      "fileName": f.file_name,
      "contentType": f.content_type,
      "size": f.size,
      "location": f.location,
    }),
    None => Value::Null,
  }
}

impl Serialize for SubmissionPayload {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(self.entries.len()))?;
    for (key, value) in &self.entries {
      map.serialize_entry(key, value)?;
    }
    map.end()
  }
}
