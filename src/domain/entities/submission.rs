use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// A single scalar form value as posted by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Number(Number),
    Text(String),
}

impl FieldValue {
    /// Returns `None` for arrays and objects, which are not form values.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(FieldValue::Null),
            Value::Bool(b) => Some(FieldValue::Bool(*b)),
            Value::Number(n) => Some(FieldValue::Number(n.clone())),
            Value::String(s) => Some(FieldValue::Text(s.clone())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Number(Number::from(value))
    }
}

/// Renders the value the way it is embedded in fingerprints and emails:
/// integral numbers never carry a trailing `.0`.
impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => write!(f, "null"),
            FieldValue::Bool(b) => write!(f, "{b}"),
            FieldValue::Number(n) => write!(f, "{}", format_number(n)),
            FieldValue::Text(s) => write!(f, "{s}"),
        }
    }
}

fn format_number(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 => (v as i64).to_string(),
        Some(v) => v.to_string(),
        None => n.to_string(),
    }
}

/// Field names with dedicated validation rules. Everything else lands in the
/// extension bucket, which has no type or length rule of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnownField {
    Name,
    Email,
    Message,
    Phone,
    Company,
    Subject,
}

impl KnownField {
    pub const ALL: [KnownField; 6] = [
        KnownField::Name,
        KnownField::Email,
        KnownField::Message,
        KnownField::Phone,
        KnownField::Company,
        KnownField::Subject,
    ];

    pub fn key(self) -> &'static str {
        match self {
            KnownField::Name => "name",
            KnownField::Email => "email",
            KnownField::Message => "message",
            KnownField::Phone => "phone",
            KnownField::Company => "company",
            KnownField::Subject => "subject",
        }
    }

    /// Exact, case-sensitive match on the submitted key.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.key() == key)
    }

    pub fn max_length(self) -> u64 {
        match self {
            KnownField::Name => 100,
            KnownField::Email => 254,
            KnownField::Message => 5000,
            KnownField::Phone => 20,
            KnownField::Company => 100,
            KnownField::Subject => 200,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Known(KnownField),
    Extra,
}

impl FieldKind {
    pub fn of(key: &str) -> Self {
        KnownField::from_key(key).map_or(FieldKind::Extra, FieldKind::Known)
    }

    /// `None` for extension fields, which are only bounded by the field count.
    pub fn max_length(self) -> Option<u64> {
        match self {
            FieldKind::Known(field) => Some(field.max_length()),
            FieldKind::Extra => None,
        }
    }
}

/// Raw submission: field name to scalar value, exactly as posted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FormSubmission {
    fields: BTreeMap<String, FieldValue>,
}

impl FormSubmission {
    /// Builds a submission from a JSON object of scalars. Anything else yields `None`.
    pub fn from_json(data: &Value) -> Option<Self> {
        data.as_object()?
            .iter()
            .map(|(key, value)| FieldValue::from_json(value).map(|v| (key.clone(), v)))
            .collect::<Option<BTreeMap<_, _>>>()
            .map(|fields| FormSubmission { fields })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, FieldValue)> for FormSubmission {
    fn from_iter<I: IntoIterator<Item = (K, FieldValue)>>(iter: I) -> Self {
        FormSubmission {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Canonical form of a submission: lower-cased trimmed keys, trimmed text,
/// no null entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedSubmission {
    fields: BTreeMap<String, FieldValue>,
}

impl NormalizedSubmission {
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn known(&self, field: KnownField) -> Option<&FieldValue> {
        self.fields.get(field.key())
    }

    /// Non-empty text of a well-known field.
    pub fn known_text(&self, field: KnownField) -> Option<&str> {
        self.known(field)
            .and_then(FieldValue::as_text)
            .filter(|s| !s.is_empty())
    }

    pub fn extras(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.fields
            .iter()
            .filter(|(key, _)| KnownField::from_key(key).is_none())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub(crate) fn insert(&mut self, key: String, value: FieldValue) {
        self.fields.insert(key, value);
    }
}

impl<K: Into<String>> FromIterator<(K, FieldValue)> for NormalizedSubmission {
    fn from_iter<I: IntoIterator<Item = (K, FieldValue)>>(iter: I) -> Self {
        NormalizedSubmission {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Where a submission came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientInfo {
    pub ip: String,
    pub user_agent: Option<String>,
}

/// An accepted submission, ready to be turned into a notification.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedSubmission {
    pub normalized: NormalizedSubmission,
    pub hash: String,
    pub timestamp: DateTime<Utc>,
    pub ip: String,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    pub success: bool,
    pub message: String,
    pub submission_id: String,
}
