//! Named bundles of forms rendered together for one request.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use super::TemplateCatalog;
use crate::generators::GeneratorError;

#[derive(Debug, Clone, Default)]
pub struct BundleTable {
    bundles: HashMap<String, Vec<String>>,
}

impl BundleTable {
    pub fn load(path: &Path) -> Result<Self, GeneratorError> {
        let raw = fs::read_to_string(path).map_err(|e| {
            GeneratorError::configuration(format!(
                "cannot read bundles config {}: {e}",
                path.display()
            ))
        })?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, GeneratorError> {
        let bundles = serde_json::from_str(raw)
            .map_err(|e| GeneratorError::configuration(format!("malformed bundles config: {e}")))?;
        Ok(Self { bundles })
    }

    pub fn form_ids(&self, bundle_id: &str) -> Result<&[String], GeneratorError> {
        match self.bundles.get(bundle_id) {
            Some(ids) if !ids.is_empty() => Ok(ids),
            _ => Err(GeneratorError::configuration(format!(
                "unknown or empty bundle_id: {bundle_id}"
            ))),
        }
    }

    /// Template folders for a bundle. Form ids without a folder convention
    /// are dropped; a bundle left with nothing is an error.
    pub fn templates_for(
        &self,
        bundle_id: &str,
        catalog: &TemplateCatalog,
    ) -> Result<Vec<String>, GeneratorError> {
        let folders: Vec<String> = self
            .form_ids(bundle_id)?
            .iter()
            .filter_map(|id| catalog.folder_for_form_id(id))
            .collect();

        if folders.is_empty() {
            return Err(GeneratorError::configuration(format!(
                "bundle \"{bundle_id}\" produced no template folders"
            )));
        }
        Ok(folders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates_for() {
        let table = BundleTable::from_json_str(
            r#"{
                "coi_standard_v1": ["acord25_v1"],
                "coi_plus_v1": ["acord25_v1", "supp_plumber_v1", "acord140_v1"],
                "broken_v1": ["supp_plumber_v1"],
                "empty_v1": []
            }"#,
        )
        .unwrap();
        let catalog = TemplateCatalog::default();

        assert_eq!(table.templates_for("coi_standard_v1", &catalog).unwrap(), vec!["ACORD25"]);
        assert_eq!(
            table.templates_for("coi_plus_v1", &catalog).unwrap(),
            vec!["ACORD25", "ACORD140"]
        );
        assert!(table.templates_for("broken_v1", &catalog).is_err());
        assert!(table.templates_for("empty_v1", &catalog).is_err());
        assert!(table
            .templates_for("nope", &catalog)
            .unwrap_err()
            .to_string()
            .contains("nope"));
    }
}
