//! Request-side data carried into the document pipeline.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One submission's answers, keyed by business field name.
///
/// Lookups never fail: absent and `null` values read back as an empty string
/// through [`RequestRecord::text`]. Dotted keys (`insured.name`) walk nested
/// objects.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestRecord(Map<String, Value>);

impl RequestRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from an arbitrary JSON value. Non-object values yield an
    /// empty record.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn as_map_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Resolve a key, first as a literal top-level key, then as a dotted path.
    pub fn get(&self, key: &str) -> Option<&Value> {
        if let Some(value) = self.0.get(key) {
            return Some(value);
        }
        if !key.contains('.') {
            return None;
        }

        let mut parts = key.split('.');
        let mut cursor = self.0.get(parts.next()?)?;
        for part in parts {
            cursor = match cursor {
                Value::Object(map) => map.get(part)?,
                Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(cursor)
    }

    /// Total lookup: the display text of a field, or `""` when it is missing.
    pub fn text(&self, key: &str) -> String {
        self.get(key).map(display_value).unwrap_or_default()
    }

    /// Like [`text`](Self::text) but `None` for blank values.
    pub fn non_empty(&self, key: &str) -> Option<String> {
        let value = self.text(key);
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    pub fn id(&self) -> Option<String> {
        self.non_empty("id")
    }

    pub fn segment(&self) -> Option<String> {
        self.non_empty("segment")
    }

    pub fn form_id(&self) -> Option<String> {
        self.non_empty("form_id")
    }
}

impl From<Map<String, Value>> for RequestRecord {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Render a JSON value the way it should appear on a printed form.
///
/// Strings print verbatim, numbers in their shortest form, `true` as a check
/// mark `X`, and `false`/`null` as blank. Arrays join their printable
/// elements with `", "`.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(true) => "X".to_string(),
        Value::Bool(false) => String::new(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(display_value)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(_) => String::new(),
    }
}

/// The unit of work accepted by the document factory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub request_row: RequestRecord,
    #[serde(default)]
    pub template_identifier: Option<String>,
    #[serde(default)]
    pub segment: Option<String>,
}

impl Job {
    pub fn new(request_row: RequestRecord) -> Self {
        Self {
            request_row,
            template_identifier: None,
            segment: None,
        }
    }

    pub fn with_template(mut self, identifier: impl Into<String>) -> Self {
        self.template_identifier = Some(identifier.into());
        self
    }

    pub fn with_segment(mut self, segment: impl Into<String>) -> Self {
        self.segment = Some(segment.into());
        self
    }
}

/// An additional insured entry on a certificate request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdditionalInsured {
    #[serde(default)]
    pub name: Option<String>,
}

/// A certificate-of-insurance request as stored by the intake side.
///
/// Only the fields the document pipeline needs are typed; everything else is
/// kept in `extra` and flows through to the templates untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoiRequest {
    #[serde(default)]
    pub bundle_id: Option<String>,
    #[serde(default)]
    pub endorsements_needed: Vec<String>,
    #[serde(default)]
    pub additional_insureds: Vec<AdditionalInsured>,
    #[serde(default)]
    pub special_wording_text: Option<String>,
    #[serde(default)]
    pub special_wording_confirmed: bool,
    #[serde(default)]
    pub description_special_text: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

pub const DEFAULT_COI_BUNDLE: &str = "coi_standard_v1";

impl CoiRequest {
    /// Special wording only prints once the requester confirmed it.
    pub fn validate(&self) -> Result<(), String> {
        let has_wording = self
            .special_wording_text
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty());
        if has_wording && !self.special_wording_confirmed {
            return Err("WORDING_NOT_CONFIRMED".to_string());
        }
        Ok(())
    }

    pub fn bundle_id(&self) -> &str {
        self.bundle_id.as_deref().unwrap_or(DEFAULT_COI_BUNDLE)
    }

    /// The printable description block: endorsements, additional insureds and
    /// special wording, one line each, in that order.
    pub fn description_block(&self) -> Option<String> {
        let mut lines = Vec::new();

        let endorsements: Vec<&str> = self
            .endorsements_needed
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect();
        if !endorsements.is_empty() {
            lines.push(format!("Endorsements: {}", endorsements.join(", ")));
        }

        let insureds: Vec<&str> = self
            .additional_insureds
            .iter()
            .filter_map(|ai| ai.name.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        if !insureds.is_empty() {
            lines.push(format!("Additional Insured(s): {}", insureds.join("; ")));
        }

        if let Some(wording) = self
            .special_wording_text
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            lines.push(format!("Special Wording: {wording}"));
        }

        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n"))
        }
    }

    /// Flatten into a render record. The backend segment always wins over
    /// whatever the requester supplied.
    pub fn into_record(self, segment: &str) -> RequestRecord {
        let description = self
            .description_block()
            .or_else(|| self.description_special_text.clone());

        let mut record = RequestRecord::from(self.extra);
        if let Some(bundle_id) = self.bundle_id {
            record.insert("bundle_id", bundle_id);
        }
        record.insert("segment", segment);
        record.insert(
            "description_special_text",
            description.map(Value::String).unwrap_or(Value::Null),
        );
        record
    }
}
