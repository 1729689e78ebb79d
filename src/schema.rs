//! Declarative field table and step partition for the certificate intake form.
//!
//! The form went through three revisions. Rather than three separate forms, a single
//! table carries every field ever collected, each tagged with the revision that
//! introduced it (and, for the flat course fields, the revision that retired it).
//! `FormSchema::certificate(version)` projects the table onto one revision.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::util::label_from_name;

/// Revision of the intake form.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaVersion {
  /// Flat course fields, no quota.
  V1,
  /// Repeated course sub-form replaces the flat course fields; adds quota.
  V2,
  /// Adds the quota-dependent document link.
  #[default]
  V3,
}

impl SchemaVersion {
  pub const LATEST: SchemaVersion = SchemaVersion::V3;

  pub fn as_str(self) -> &'static str {
    match self {
      SchemaVersion::V1 => "v1",
      SchemaVersion::V2 => "v2",
      SchemaVersion::V3 => "v3",
    }
  }
}

/// Semantic type of a collectible field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
  ShortText,
  LongText,
  Date,
  Url,
  /// Single choice out of `FieldDefinition::options`.
  Enum,
  FileReference,
  NumericText,
  /// Ordered sequence of course records.
  Courses,
}

impl FieldKind {
  /// Kinds whose value is a plain string.
  pub fn is_textual(self) -> bool {
    !matches!(self, FieldKind::FileReference | FieldKind::Courses)
  }

  pub fn as_str(self) -> &'static str {
    match self {
      FieldKind::ShortText => "short_text",
      FieldKind::LongText => "long_text",
      FieldKind::Date => "date",
      FieldKind::Url => "url",
      FieldKind::Enum => "enum",
      FieldKind::FileReference => "file_reference",
      FieldKind::NumericText => "numeric_text",
      FieldKind::Courses => "courses",
    }
  }
}

/// One collectible field: identity, kind, and the rule it is validated against.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
  pub name: &'static str,
  pub label: &'static str,
  pub kind: FieldKind,
  pub required: bool,
  pub min_length: usize,
  /// Shown next to the field when validation fails.
  pub message: &'static str,
  pub options: &'static [&'static str],
  #[serde(skip)]
  pub introduced: SchemaVersion,
  #[serde(skip)]
  pub retired: Option<SchemaVersion>,
}

impl FieldDefinition {
  pub const fn required(
    name: &'static str,
    label: &'static str,
    kind: FieldKind,
    message: &'static str,
  ) -> Self {
    Self {
      name,
      label,
      kind,
      required: true,
      min_length: 1,
      message,
      options: &[],
      introduced: SchemaVersion::V1,
      retired: None,
    }
  }

  pub const fn optional(name: &'static str, label: &'static str, kind: FieldKind) -> Self {
    Self {
      name,
      label,
      kind,
      required: false,
      min_length: 0,
      message: "",
      options: &[],
      introduced: SchemaVersion::V1,
      retired: None,
    }
  }

  pub const fn min_length(mut self, min_length: usize) -> Self {
    self.min_length = min_length;
    self
  }

  pub const fn with_message(mut self, message: &'static str) -> Self {
    self.message = message;
    self
  }

  pub const fn with_options(mut self, options: &'static [&'static str]) -> Self {
    self.options = options;
    self
  }

  pub const fn since(mut self, version: SchemaVersion) -> Self {
    self.introduced = version;
    self
  }

  pub const fn retired_in(mut self, version: SchemaVersion) -> Self {
    self.retired = Some(version);
    self
  }

  /// The declared label, or one derived from the key when none was given.
  pub fn display_label(&self) -> Cow<'static, str> {
    if self.label.is_empty() {
      Cow::Owned(label_from_name(self.name))
    } else {
      Cow::Borrowed(self.label)
    }
  }

  pub fn is_active(&self, version: SchemaVersion) -> bool {
    self.introduced <= version && self.retired.map_or(true, |r| version < r)
  }
}

/// `field` is rendered only while `depends_on` holds something other than `hidden_when`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibilityRule {
  pub field: &'static str,
  pub depends_on: &'static str,
  pub hidden_when: &'static str,
}

/// One screen of the wizard.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Step {
  pub title: &'static str,
  /// Flat fields rendered together. May be empty when the step only hosts a repeated record.
  pub fields: Vec<&'static str>,
  /// Name of the repeated-record field rendered by this step, if any.
  pub repeated: Option<&'static str>,
}

pub const COURSES: &str = "courses";
pub const QUOTA: &str = "quota";
pub const DOCUMENT_LINK: &str = "documentLink";

pub const QUOTA_NONE: &str = "None";

pub const QUOTA_OPTIONS: &[&str] = &[
  QUOTA_NONE,
  "Freedom Fighter",
  "Ethnic Minority",
  "Person with Disability",
  "Other",
];

struct StepDef {
  title: &'static str,
  fields: &'static [FieldDefinition],
}

use FieldKind::*;
use SchemaVersion::*;

static CERTIFICATE_STEPS: &[StepDef] = &[
  StepDef {
    title: "Student Information",
    fields: &[
      FieldDefinition::required("fullName", "Full Name", ShortText, "Full Name must be at least 2 characters.")
        .min_length(2),
      FieldDefinition::required("dateOfBirth", "Date of Birth", Date, "Date of Birth is required."),
      FieldDefinition::required("studentId", "Student ID Number", ShortText, "Student ID Number is required."),
      FieldDefinition::required("registrationId", "Registration Number", ShortText, "Registration Number is required."),
      FieldDefinition::required(QUOTA, "Quota", Enum, "Quota is required.")
        .with_options(QUOTA_OPTIONS)
        .since(V2),
      FieldDefinition::optional(DOCUMENT_LINK, "Supporting Document Link", Url)
        .with_message("Supporting Document Link must be a valid URL.")
        .since(V3),
    ],
  },
  StepDef {
    title: "Institution Details",
    fields: &[
      FieldDefinition::required(
        "institutionName",
        "Name of the Educational Institution",
        ShortText,
        "Name of the Educational Institution is required.",
      ),
      FieldDefinition::required(
        "institutionEIIN",
        "Institution EIIN",
        ShortText,
        "EIIN no of the Educational Institution is required.",
      ),
      FieldDefinition::required(
        "institutionPostalCode",
        "Postal Code",
        ShortText,
        "Postal Code of the Educational Institution is required.",
      ),
      FieldDefinition::required("institutionAddress", "Address", LongText, "Address is required."),
      FieldDefinition::required(
        "institutionContact",
        "Contact Information",
        ShortText,
        "Contact Information is required.",
      ),
    ],
  },
  StepDef {
    title: "Course Details",
    fields: &[
      FieldDefinition::required("courseName", "Course Name", ShortText, "Course Name is required.").retired_in(V2),
      FieldDefinition::required("courseCode", "Course Code", ShortText, "Course Code is required.").retired_in(V2),
      FieldDefinition::required(
        "courseDuration",
        "Duration of the Course",
        ShortText,
        "Duration of the Course is required.",
      )
      .retired_in(V2),
      FieldDefinition::required("courseStartDate", "Start Date", Date, "Start Date is required.").retired_in(V2),
      FieldDefinition::required("courseEndDate", "End Date", Date, "End Date is required.").retired_in(V2),
      FieldDefinition::required(COURSES, "Courses", Courses, "At least one course is required.").since(V2),
    ],
  },
  StepDef {
    title: "Academic Performance",
    fields: &[
      FieldDefinition::required("grades", "Grades or Marks", ShortText, "Grades or Marks are required."),
      FieldDefinition::optional("gpa", "GPA", NumericText),
      FieldDefinition::optional("honors", "Honors", ShortText),
    ],
  },
  StepDef {
    title: "Certificate Information",
    fields: &[
      FieldDefinition::required(
        "certificateNumber",
        "Certificate Number",
        ShortText,
        "Certificate Number or Unique Identifier is required.",
      ),
      FieldDefinition::required("issuanceDate", "Date of Issuance", Date, "Date of Issuance is required."),
      FieldDefinition::optional("expiryDate", "Expiry Date", Date),
    ],
  },
  StepDef {
    title: "Signatory Details",
    fields: &[
      FieldDefinition::required(
        "signatories",
        "Authorized Signatories",
        LongText,
        "Names and Titles of Authorized Signatories are required.",
      ),
      FieldDefinition::required("signatures", "Signatures", ShortText, "Digital or Physical Signatures are required."),
    ],
  },
  StepDef {
    title: "Official Logos and Seals",
    fields: &[
      FieldDefinition::optional("institutionLogo", "Institution Logo", FileReference),
      FieldDefinition::optional("institutionSeal", "Official Seal or Stamp", FileReference),
    ],
  },
  StepDef {
    title: "Additional Information",
    fields: &[
      FieldDefinition::optional("accreditationDetails", "Accreditation Details", LongText),
      FieldDefinition::optional("qrCode", "QR Code", LongText),
      FieldDefinition::optional("legalStatements", "Legal Statements", LongText),
    ],
  },
];

static CERTIFICATE_RULES: &[VisibilityRule] = &[VisibilityRule {
  field: DOCUMENT_LINK,
  depends_on: QUOTA,
  hidden_when: QUOTA_NONE,
}];

/// Sub-fields of one course record, in rendering order.
pub static COURSE_FIELDS: [FieldDefinition; 8] = [
  FieldDefinition::required("courseName", "Course Name", ShortText, "Course Name is required."),
  FieldDefinition::required("courseCode", "Course Code", ShortText, "Course Code is required."),
  FieldDefinition::required("courseDuration", "Duration of the Course", ShortText, "Duration of the Course is required."),
  FieldDefinition::required("courseStartDate", "Start Date", ShortText, "Start Date is required."),
  FieldDefinition::required("courseEndDate", "End Date", ShortText, "End Date is required."),
  FieldDefinition::required("fullMark", "Full Mark", ShortText, "Full Mark is required."),
  FieldDefinition::required("obtainedMark", "Obtained Mark", ShortText, "Obtained Mark is required."),
  FieldDefinition::required("courseGPA", "Course GPA", ShortText, "Course GPA is required."),
];

/// A field table projected onto one revision, partitioned into steps.
#[derive(Clone, Debug)]
pub struct FormSchema {
  version: SchemaVersion,
  fields: Vec<FieldDefinition>,
  steps: Vec<Step>,
  rules: Vec<VisibilityRule>,
}

impl FormSchema {
  /// The certificate intake form as it looked at `version`.
  pub fn certificate(version: SchemaVersion) -> Self {
    let steps = CERTIFICATE_STEPS
      .iter()
      .map(|def| {
        let fields = def.fields.iter().filter(|f| f.is_active(version)).cloned().collect();
        (def.title, fields)
      })
      .collect();
    Self::from_steps(version, steps, CERTIFICATE_RULES.to_vec())
  }

  /// Build a schema from explicit steps. A `Courses` field becomes the step's repeated
  /// record; everything else is rendered as a flat field. Rules that reference fields
  /// missing from `steps` are dropped.
  pub fn from_steps(
    version: SchemaVersion,
    steps: Vec<(&'static str, Vec<FieldDefinition>)>,
    rules: Vec<VisibilityRule>,
  ) -> Self {
    let mut fields = Vec::new();
    let mut out = Vec::with_capacity(steps.len());
    for (title, defs) in steps {
      let mut step = Step { title, fields: Vec::new(), repeated: None };
      for def in defs {
        if def.kind == FieldKind::Courses {
          step.repeated = Some(def.name);
        } else {
          step.fields.push(def.name);
        }
        fields.push(def);
      }
      out.push(step);
    }
    let rules = rules
      .into_iter()
      .filter(|r| {
        fields.iter().any(|f| f.name == r.field) && fields.iter().any(|f| f.name == r.depends_on)
      })
      .collect();
    Self { version, fields, steps: out, rules }
  }

  pub fn version(&self) -> SchemaVersion {
    self.version
  }

  /// Every field, in rendering order.
  pub fn fields(&self) -> &[FieldDefinition] {
    &self.fields
  }

  pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
    self.fields.iter().find(|f| f.name == name)
  }

  pub fn steps(&self) -> &[Step] {
    &self.steps
  }

  pub fn step(&self, index: usize) -> Option<&Step> {
    self.steps.get(index)
  }

  pub fn step_count(&self) -> usize {
    self.steps.len()
  }

  /// Index of the step that renders `name`.
  pub fn step_of(&self, name: &str) -> Option<usize> {
    self
      .steps
      .iter()
      .position(|s| s.repeated == Some(name) || s.fields.iter().any(|f| *f == name))
  }

  pub fn rules(&self) -> &[VisibilityRule] {
    &self.rules
  }

  /// The repeated-record field, when this revision has one.
  pub fn repeated_field(&self) -> Option<&FieldDefinition> {
    self.fields.iter().find(|f| f.kind == FieldKind::Courses)
  }

  /// Every field must be rendered by exactly one step.
  pub fn check_coverage(&self) -> Result<(), String> {
    for field in &self.fields {
      let owners: usize = self
        .steps
        .iter()
        .map(|s| {
          s.fields.iter().filter(|f| **f == field.name).count() + usize::from(s.repeated == Some(field.name))
        })
        .sum();
      if owners != 1 {
        return Err(format!("field '{}' is rendered by {} steps", field.name, owners));
      }
    }
    let mut names: Vec<&str> = self.fields.iter().map(|f| f.name).collect();
    names.sort_unstable();
    if let Some(pair) = names.windows(2).find(|w| w[0] == w[1]) {
      return Err(format!("field '{}' is declared twice", pair[0]));
    }
    Ok(())
  }
}

impl Default for FormSchema {
  fn default() -> Self {
    Self::certificate(SchemaVersion::LATEST)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn every_revision_covers_its_fields_once() {
    for version in [V1, V2, V3] {
      let schema = FormSchema::certificate(version);
      assert_eq!(schema.step_count(), 8);
      schema.check_coverage().expect("coverage");
    }
  }

  #[test]
  fn course_step_switches_from_flat_fields_to_repeated_record() {
    let v1 = FormSchema::certificate(V1);
    let step = v1.step(2).expect("course step");
    assert_eq!(step.fields.len(), 5);
    assert_eq!(step.repeated, None);
    assert!(v1.repeated_field().is_none());

    let v3 = FormSchema::certificate(V3);
    let step = v3.step(2).expect("course step");
    assert!(step.fields.is_empty());
    assert_eq!(step.repeated, Some(COURSES));
  }

  #[test]
  fn later_revisions_only_add_student_fields() {
    let v1 = FormSchema::certificate(V1);
    let v3 = FormSchema::certificate(V3);
    assert!(v1.field(QUOTA).is_none());
    assert!(v3.field(QUOTA).is_some());
    assert!(v3.field(DOCUMENT_LINK).is_some());
    assert!(FormSchema::certificate(V2).field(DOCUMENT_LINK).is_none());
    assert_eq!(v3.step_of(DOCUMENT_LINK), Some(0));
    assert_eq!(v3.step_of(COURSES), Some(2));
  }

  #[test]
  fn v3_adds_only_the_document_link() {
    let v2: Vec<&str> = FormSchema::certificate(V2).fields().iter().map(|f| f.name).collect();
    let added: Vec<&str> = FormSchema::certificate(V3)
      .fields()
      .iter()
      .map(|f| f.name)
      .filter(|n| !v2.contains(n))
      .collect();
    assert_eq!(added, vec![DOCUMENT_LINK]);
  }

  #[test]
  fn file_fields_are_optional_in_every_revision() {
    for version in [V1, V2, V3] {
      let schema = FormSchema::certificate(version);
      let files: Vec<&FieldDefinition> = schema.fields().iter().filter(|f| f.kind == FileReference).collect();
      assert_eq!(files.len(), 2);
      assert!(files.iter().all(|f| !f.required), "{:?}", version);
    }
  }

  #[test]
  fn quota_rule_only_exists_when_both_fields_do() {
    assert_eq!(FormSchema::certificate(V3).rules().len(), 1);
    assert!(FormSchema::certificate(V2).rules().is_empty());
  }

  #[test]
  fn duplicated_field_is_reported() {
    let name = FieldDefinition::required("fullName", "Full Name", ShortText, "Full Name is required.");
    let schema = FormSchema::from_steps(V3, vec![("A", vec![name.clone()]), ("B", vec![name])], vec![]);
    assert!(schema.check_coverage().is_err());
  }
}
