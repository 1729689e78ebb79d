//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Views are what a renderer needs per visible field; events carry `{name, value}` back.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::payload::SubmissionPayload;
use crate::record::{CourseField, FieldValue};
use crate::schema::{FieldDefinition, FieldKind, FormSchema, SchemaVersion};
use crate::util::placeholder_for;
use crate::validation::ValidationErrors;
use crate::wizard::WizardController;

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    View,
    SetField {
        name: String,
        #[serde(default)]
        value: serde_json::Value,
    },
    Next,
    Previous,
    AppendCourse,
    RemoveCourse {
        index: usize,
    },
    SetCourseField {
        index: usize,
        field: String,
        value: String,
    },
    Submit,
    /// Drop the current form and start a blank one.
    Reset,
}

impl ClientWsMessage {
    /// Wire name of the message, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientWsMessage::Ping => "ping",
            ClientWsMessage::View => "view",
            ClientWsMessage::SetField { .. } => "set_field",
            ClientWsMessage::Next => "next",
            ClientWsMessage::Previous => "previous",
            ClientWsMessage::AppendCourse => "append_course",
            ClientWsMessage::RemoveCourse { .. } => "remove_course",
            ClientWsMessage::SetCourseField { .. } => "set_course_field",
            ClientWsMessage::Submit => "submit",
            ClientWsMessage::Reset => "reset",
        }
    }

    /// Byte length of the user-entered value this message carries, if any.
    pub fn value_len(&self) -> Option<usize> {
        match self {
            ClientWsMessage::SetField { value, .. } => Some(match value {
                serde_json::Value::Null => 0,
                serde_json::Value::String(s) => s.len(),
                other => other.to_string().len(),
            }),
            ClientWsMessage::SetCourseField { value, .. } => Some(value.len()),
            _ => None,
        }
    }
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Form {
        form: FormView,
    },
    Submitted {
        payload: SubmissionPayload,
    },
    Rejected {
        #[serde(rename = "stepIndex")]
        step_index: usize,
        errors: ValidationErrors,
        form: FormView,
    },
    Error {
        message: String,
    },
}

/// Everything the renderer needs for one flat field.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldView {
    pub name: &'static str,
    pub label: Cow<'static, str>,
    pub placeholder: String,
    pub kind: FieldKind,
    pub control: &'static str,
    pub required: bool,
    pub value: FieldValue,
    pub error: Option<String>,
    pub options: &'static [&'static str],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseFieldView {
    pub name: CourseField,
    pub label: Cow<'static, str>,
    pub placeholder: String,
    pub value: String,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CourseView {
    pub index: usize,
    pub fields: Vec<CourseFieldView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormView {
    pub id: String,
    pub schema_version: SchemaVersion,
    pub step_index: usize,
    pub step_count: usize,
    pub title: &'static str,
    pub is_first_step: bool,
    pub is_last_step: bool,
    pub fields: Vec<FieldView>,
    /// Present only on the step that hosts the course list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub courses: Option<Vec<CourseView>>,
    pub errors: ValidationErrors,
}

/// Input control a field kind is rendered with.
pub fn control_for(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::LongText => "textarea",
        FieldKind::Enum => "select",
        FieldKind::FileReference => "file",
        FieldKind::Date => "date",
        FieldKind::Url => "url",
        FieldKind::Courses => "repeated",
        FieldKind::ShortText | FieldKind::NumericText => "input",
    }
}

fn field_view(ctrl: &WizardController, def: &FieldDefinition) -> FieldView {
    let label = def.display_label();
    FieldView {
        name: def.name,
        placeholder: placeholder_for(&label),
        label,
        kind: def.kind,
        control: control_for(def.kind),
        required: def.required,
        value: ctrl
            .record()
            .get(def.name)
            .cloned()
            .unwrap_or_else(|| FieldValue::empty_for(def.kind)),
        error: ctrl.errors().field(def.name).map(str::to_string),
        options: def.options,
    }
}

fn course_views(ctrl: &WizardController) -> Vec<CourseView> {
    let Some(courses) = ctrl.courses() else {
        return Vec::new();
    };
    courses
        .iter()
        .enumerate()
        .map(|(index, course)| CourseView {
            index,
            fields: CourseField::ALL
                .into_iter()
                .map(|field| CourseFieldView {
                    name: field,
                    label: field.definition().display_label(),
                    placeholder: placeholder_for(&field.definition().display_label()),
                    value: course.get(field).to_string(),
                    error: ctrl.errors().course(index, field).map(str::to_string),
                })
                .collect(),
        })
        .collect()
}

/// Render the current step of `ctrl` for the client.
pub fn to_view(id: &str, ctrl: &WizardController) -> FormView {
    FormView {
        id: id.to_string(),
        schema_version: ctrl.schema().version(),
        step_index: ctrl.current_step_index(),
        step_count: ctrl.step_count(),
        title: ctrl.current_step().map(|s| s.title).unwrap_or(""),
        is_first_step: ctrl.is_first_step(),
        is_last_step: ctrl.is_last_step(),
        fields: ctrl.visible_fields().into_iter().map(|d| field_view(ctrl, d)).collect(),
        courses: ctrl.shows_courses().then(|| course_views(ctrl)),
        errors: ctrl.errors().clone(),
    }
}

//
// Schema description
//

#[derive(Debug, Serialize)]
pub struct StepOut {
    pub title: &'static str,
    pub fields: Vec<FieldDefinition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repeated: Option<RepeatedOut>,
}

#[derive(Debug, Serialize)]
pub struct RepeatedOut {
    pub name: &'static str,
    pub fields: Vec<FieldDefinition>,
}

#[derive(Debug, Serialize)]
pub struct SchemaOut {
    pub version: SchemaVersion,
    pub steps: Vec<StepOut>,
    pub rules: Vec<crate::schema::VisibilityRule>,
}

pub fn schema_out(schema: &FormSchema) -> SchemaOut {
    SchemaOut {
        version: schema.version(),
        steps: schema
            .steps()
            .iter()
            .map(|step| StepOut {
                title: step.title,
                fields: step.fields.iter().filter_map(|n| schema.field(n).cloned()).collect(),
                repeated: step.repeated.map(|name| RepeatedOut {
                    name,
                    fields: CourseField::ALL.into_iter().map(|f| f.definition().clone()).collect(),
                }),
            })
            .collect(),
        rules: schema.rules().to_vec(),
    }
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Deserialize)]
pub struct FieldIn {
    pub name: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct CourseFieldIn {
    pub field: String,
    pub value: String,
}

#[derive(Serialize)]
pub struct SubmittedOut {
    pub ok: bool,
    pub payload: SubmissionPayload,
}

#[derive(Serialize)]
pub struct RejectedOut {
    pub ok: bool,
    #[serde(rename = "stepIndex")]
    pub step_index: usize,
    pub errors: ValidationErrors,
}

#[derive(Serialize)]
pub struct ErrorOut {
    pub error: String,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
    pub sessions: usize,
}
