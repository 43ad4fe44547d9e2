//! Label-driven field extraction from OCR text.
//!
//! Each group (name, contact, address, date, other) runs its own patterns;
//! a group's patterns never see each other's matches. Labels are matched
//! case-insensitively and values stop at the end of the line.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::document::NewFieldMapping;

static RE_FIRST_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?P<label>first[ \t]*name|given[ \t]*name)[:\t ]*(?P<value>\p{L}[\p{L}'\-]*)")
        .unwrap()
});
static RE_LAST_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?P<label>last[ \t]*name|family[ \t]*name|surname)[:\t ]*(?P<value>\p{L}[\p{L}'\-]*)",
    )
    .unwrap()
});
static RE_FULL_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?P<label>full[ \t]*name|name)[:\t ]*(?P<value>\p{L}[\p{L}'\- \t]*)").unwrap()
});
static RE_EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?P<label>e-?mail)[:\t ]*(?P<value>[a-z0-9._%+\-]+@[a-z0-9.\-]+\.[a-z]{2,})")
        .unwrap()
});
static RE_PHONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?P<label>phone|telephone|mobile|cell)[:\t ]*(?P<value>\+?[1-9]?[0-9]{7,15})")
        .unwrap()
});
static RE_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?P<label>address|street)[:\t ]*(?P<value>[\p{L}0-9][\p{L}0-9 \t,./#\-]*)")
        .unwrap()
});
static RE_CITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?P<label>city)[:\t ]*(?P<value>\p{L}[\p{L}'\- \t]*)").unwrap()
});
static RE_ZIP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?P<label>zip(?:[ \t]*code)?|postal[ \t]*code|post[ \t]*code)[:\t ]*(?P<value>[a-z0-9][a-z0-9 \-]*)",
    )
    .unwrap()
});
static RE_DATE_OF_BIRTH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?P<label>date[ \t]*of[ \t]*birth|birth[ \t]*date|dob)[:\t ]*(?P<value>[0-9]{1,2}[/\-][0-9]{1,2}[/\-][0-9]{2,4})",
    )
    .unwrap()
});
static RE_GENDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?P<label>gender|sex)[:\t ]*(?P<value>male|female|m|f|other)\b").unwrap()
});
static RE_AGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?P<label>age)[:\t ]*(?P<value>[0-9]{1,3})\b").unwrap());

/// One value found in the text, with the label it was found under.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedField {
    pub source_label: String,
    pub target_key: &'static str,
    pub field_type: &'static str,
    pub value: Value,
}

impl ExtractedField {
    fn text(label: &str, target_key: &'static str, field_type: &'static str, value: &str) -> Self {
        Self {
            source_label: label.to_string(),
            target_key,
            field_type,
            value: Value::String(value.to_string()),
        }
    }

    /// Converts to a persistable mapping row carrying the run's confidence.
    pub fn to_mapping(&self, confidence: Option<f64>) -> NewFieldMapping {
        let extracted_value = match &self.value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        NewFieldMapping {
            source_field: self.source_label.clone(),
            target_field: self.target_key.to_string(),
            field_type: self.field_type.to_string(),
            extracted_value: Some(extracted_value),
            confidence,
        }
    }
}

/// Returns `(label, value)` of the first match, value trimmed.
fn capture<'t>(re: &Regex, text: &'t str) -> Option<(&'t str, &'t str)> {
    let caps = re.captures(text)?;
    let label = caps.name("label")?.as_str();
    let value = caps.name("value")?.as_str().trim();
    (!value.is_empty()).then_some((label, value))
}

fn name_fields(text: &str, out: &mut Vec<ExtractedField>) {
    let first = capture(&RE_FIRST_NAME, text);
    let last = capture(&RE_LAST_NAME, text);

    if let Some((label, value)) = first {
        out.push(ExtractedField::text(label, "firstName", "string", value));
    }
    if let Some((label, value)) = last {
        out.push(ExtractedField::text(label, "lastName", "string", value));
    }
    if first.is_some() || last.is_some() {
        return;
    }

    let Some((label, value)) = capture(&RE_FULL_NAME, text) else {
        return;
    };
    let tokens: Vec<&str> = value.split_whitespace().collect();
    match tokens.as_slice() {
        [] => {}
        [single] => out.push(ExtractedField::text(label, "fullName", "string", single)),
        [head, .., tail] => {
            out.push(ExtractedField::text(label, "firstName", "string", head));
            out.push(ExtractedField::text(label, "lastName", "string", tail));
        }
    }
}

fn contact_fields(text: &str, out: &mut Vec<ExtractedField>) {
    if let Some((label, value)) = capture(&RE_EMAIL, text) {
        out.push(ExtractedField::text(label, "email", "email", value));
    }
    if let Some((label, value)) = capture(&RE_PHONE, text) {
        out.push(ExtractedField::text(label, "phone", "phone", value));
    }
}

fn address_fields(text: &str, out: &mut Vec<ExtractedField>) {
    if let Some((label, value)) = capture(&RE_ADDRESS, text) {
        out.push(ExtractedField::text(label, "address", "string", value));
    }
    if let Some((label, value)) = capture(&RE_CITY, text) {
        out.push(ExtractedField::text(label, "city", "string", value));
    }
    if let Some((label, value)) = capture(&RE_ZIP, text) {
        out.push(ExtractedField::text(label, "zipCode", "string", value));
    }
}

fn date_fields(text: &str, out: &mut Vec<ExtractedField>) {
    if let Some((label, value)) = capture(&RE_DATE_OF_BIRTH, text) {
        out.push(ExtractedField::text(label, "dateOfBirth", "date", value));
    }
}

fn other_fields(text: &str, out: &mut Vec<ExtractedField>) {
    if let Some((label, value)) = capture(&RE_GENDER, text) {
        out.push(ExtractedField::text(label, "gender", "string", value));
    }
    if let Some((label, value)) = capture(&RE_AGE, text) {
        if let Ok(age) = value.parse::<u32>() {
            out.push(ExtractedField {
                source_label: label.to_string(),
                target_key: "age",
                field_type: "integer",
                value: Value::from(age),
            });
        }
    }
}

/// Runs every extraction group over `text`.
pub fn extract_fields(text: &str) -> Vec<ExtractedField> {
    let mut fields = Vec::new();
    if text.trim().is_empty() {
        return fields;
    }
    name_fields(text, &mut fields);
    contact_fields(text, &mut fields);
    address_fields(text, &mut fields);
    date_fields(text, &mut fields);
    other_fields(text, &mut fields);
    fields
}

/// Collects fields into a flat JSON object keyed by target key.
pub fn fields_to_object(fields: &[ExtractedField]) -> Map<String, Value> {
    fields
        .iter()
        .map(|f| (f.target_key.to_string(), f.value.clone()))
        .collect()
}

/// Turns OCR text into a JSON object string; `{}` when nothing matches.
pub fn generate_json(text: &str) -> String {
    let fields = extract_fields(text);
    tracing::debug!(fields = fields.len(), "Generated JSON from extracted text");
    Value::Object(fields_to_object(&fields)).to_string()
}
