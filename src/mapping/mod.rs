//! Field mapping: translates a submission's key space into the one a
//! template was authored against.
//!
//! A mapping file lives at `<mapping dir>/<TemplateName>.json` and maps a
//! destination key (optionally a dotted path) to a source record key:
//!
//! ```json
//! { "insured.name": "applicant_name", "policy_no": "policy_number" }
//! ```

use log::debug;
use serde_json::{Map, Value};
use std::io::ErrorKind;
use std::path::PathBuf;

use crate::generators::GeneratorError;
use crate::models::RequestRecord;

/// Parsed mapping file: destination path → source key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMapping {
    entries: Vec<(String, String)>,
}

impl FieldMapping {
    pub fn from_json_str(raw: &str, source: &str) -> Result<Self, GeneratorError> {
        let value: Value = serde_json::from_str(raw).map_err(|e| {
            GeneratorError::configuration(format!("malformed field mapping {source}: {e}"))
        })?;
        let Value::Object(map) = value else {
            return Err(GeneratorError::configuration(format!(
                "field mapping {source} must be a JSON object"
            )));
        };

        let mut entries = Vec::with_capacity(map.len());
        for (dest, src) in map {
            match src {
                Value::String(src) => entries.push((dest, src)),
                other => {
                    return Err(GeneratorError::configuration(format!(
                        "field mapping {source}: source for '{dest}' must be a string, got {other}"
                    )))
                }
            }
        }
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// A mapped copy of `record`. Unmapped keys pass through; missing sources
    /// become `""`.
    pub fn apply(&self, record: &RequestRecord) -> RequestRecord {
        let mut mapped = record.clone();
        for (dest, src) in &self.entries {
            let value = match record.get(src) {
                None | Some(Value::Null) => Value::String(String::new()),
                Some(v) => v.clone(),
            };
            set_path(mapped.as_map_mut(), dest, value);
        }
        mapped
    }
}

/// Assign `value` at a dotted path, creating objects along the way. A
/// non-object sitting on the path is replaced.
fn set_path(root: &mut Map<String, Value>, path: &str, value: Value) {
    let mut segments = path.split('.').filter(|s| !s.is_empty()).peekable();
    let mut cursor = root;

    while let Some(segment) = segments.next() {
        if segments.peek().is_none() {
            cursor.insert(segment.to_string(), value);
            return;
        }
        let slot = cursor
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        let Value::Object(next) = slot else { return };
        cursor = next;
    }
}

/// Loads mapping files from one directory, on every call.
#[derive(Debug, Clone)]
pub struct FieldMapper {
    mapping_dir: PathBuf,
}

impl FieldMapper {
    pub fn new(mapping_dir: impl Into<PathBuf>) -> Self {
        Self {
            mapping_dir: mapping_dir.into(),
        }
    }

    /// The mapping for `template_name`, or `None` when it has no file.
    pub async fn load(&self, template_name: &str) -> Result<Option<FieldMapping>, GeneratorError> {
        let path = self.mapping_dir.join(format!("{template_name}.json"));
        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => FieldMapping::from_json_str(&raw, &path.display().to_string()).map(Some),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(GeneratorError::asset_io(&path, e)),
        }
    }

    /// Map `record` for `template_name`; identity when there is no mapping.
    pub async fn apply(
        &self,
        template_name: &str,
        record: &RequestRecord,
    ) -> Result<RequestRecord, GeneratorError> {
        match self.load(template_name).await? {
            Some(mapping) => {
                debug!("applying {} field mappings for {template_name}", mapping.len());
                Ok(mapping.apply(record))
            }
            None => Ok(record.clone()),
        }
    }
}
