//! The `form_id` → template configuration table.

use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::generators::{EngineKind, GeneratorError};

/// Default form rendered when neither the job nor the record names one.
pub const DEFAULT_FORM_ID: &str = "acord25_v1";

/// One document type.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TemplateConfig {
    #[serde(default)]
    pub template_path: Option<String>,
    /// Kept raw so an unrecognised engine fails the job that uses it rather
    /// than the whole table.
    pub engine: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub strict_mapping: Option<bool>,
    /// CSS selector whose boxes must match the locked page size before printing.
    #[serde(default)]
    pub geometry_selector: Option<String>,
    #[serde(default)]
    pub filename_prefix: Option<String>,
}

fn default_enabled() -> bool {
    true
}

impl TemplateConfig {
    pub fn engine(&self) -> Result<EngineKind, GeneratorError> {
        self.engine.parse()
    }

    pub fn template_path(&self) -> Option<&str> {
        self.template_path
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }
}

/// Read-only table of every configured form.
#[derive(Debug, Clone, Default)]
pub struct FormsTable {
    forms: HashMap<String, TemplateConfig>,
}

impl FormsTable {
    pub fn load(path: &Path) -> Result<Self, GeneratorError> {
        let raw = fs::read_to_string(path).map_err(|e| {
            GeneratorError::configuration(format!(
                "cannot read forms config {}: {e}",
                path.display()
            ))
        })?;
        Self::from_json_str(&raw).map_err(|e| match e {
            GeneratorError::Configuration(msg) => {
                GeneratorError::configuration(format!("{}: {msg}", path.display()))
            }
            other => other,
        })
    }

    pub fn from_json_str(raw: &str) -> Result<Self, GeneratorError> {
        let forms: HashMap<String, TemplateConfig> = serde_json::from_str(raw)
            .map_err(|e| GeneratorError::configuration(format!("malformed forms config: {e}")))?;
        Ok(Self { forms })
    }

    pub fn insert(&mut self, form_id: impl Into<String>, config: TemplateConfig) {
        self.forms.insert(form_id.into(), config);
    }

    pub fn contains(&self, form_id: &str) -> bool {
        self.forms.contains_key(form_id)
    }

    pub fn len(&self) -> usize {
        self.forms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forms.is_empty()
    }

    /// The enabled configuration for `form_id`.
    pub fn lookup(&self, form_id: &str) -> Result<&TemplateConfig, GeneratorError> {
        let config = self.forms.get(form_id).ok_or_else(|| {
            GeneratorError::configuration(format!("configuration missing for form_id: {form_id}"))
        })?;
        if !config.enabled {
            return Err(GeneratorError::configuration(format!(
                "form {form_id} is disabled"
            )));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FORMS: &str = r#"{
        "acord25_v1": { "templatePath": "templates/ACORD25", "engine": "svg", "filenamePrefix": "COI" },
        "acord125_v1": { "templatePath": "ACORD125", "engine": "html", "geometrySelector": ".page" },
        "acord140_v1": { "templatePath": "ACORD140", "engine": "html", "enabled": false },
        "legacy_v1": { "templatePath": "LEGACY", "engine": "pdfkit" }
    }"#;

    #[test]
    fn test_lookup() {
        let table = FormsTable::from_json_str(FORMS).unwrap();
        assert_eq!(table.len(), 4);

        let coi = table.lookup("acord25_v1").unwrap();
        assert_eq!(coi.engine().unwrap(), EngineKind::Svg);
        assert_eq!(coi.filename_prefix.as_deref(), Some("COI"));
        assert!(coi.enabled);

        let app = table.lookup("acord125_v1").unwrap();
        assert_eq!(app.geometry_selector.as_deref(), Some(".page"));
    }

    #[test]
    fn test_missing_and_disabled() {
        let table = FormsTable::from_json_str(FORMS).unwrap();

        let missing = table.lookup("acord999_v1").unwrap_err();
        assert!(missing.is_configuration());
        assert!(missing.to_string().contains("acord999_v1"));

        let disabled = table.lookup("acord140_v1").unwrap_err();
        assert!(disabled.to_string().contains("disabled"));
    }

    #[test]
    fn test_unknown_engine_surfaces_on_use() {
        let table = FormsTable::from_json_str(FORMS).unwrap();
        let legacy = table.lookup("legacy_v1").unwrap();
        assert!(legacy.engine().unwrap_err().is_configuration());
    }

    #[test]
    fn test_malformed_table() {
        let err = FormsTable::from_json_str("{ not json").unwrap_err();
        assert!(err.is_configuration());
    }
}
