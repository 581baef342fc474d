//! Template catalog: inbound names, folder names and form ids.
//!
//! Front ends send a variety of names for the same form (`Accord125`,
//! `PlumberAccord125`, `ACORD125`). The catalog folds them onto one template
//! folder, derives the form id from the folder by convention and knows the
//! display filename each form is delivered under.

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

const ALIASES: &[(&str, &str)] = &[
    ("Accord125", "ACORD125"),
    ("Accord126", "ACORD126"),
    ("Accord140", "ACORD140"),
    ("WCForm", "ACORD130"),
    ("Accord25", "ACORD25"),
    ("Supplemental", "SUPP_BERKLEY_PLUMBER"),
    ("PlumberAccord125", "ACORD125"),
    ("PlumberAccord126", "ACORD126"),
    ("PlumberSupp", "SUPP_BERKLEY_PLUMBER"),
];

const DISPLAY_FILENAMES: &[(&str, &str)] = &[
    ("ACORD125", "ACORD-125.pdf"),
    ("ACORD126", "ACORD-126.pdf"),
    ("ACORD130", "ACORD-130.pdf"),
    ("ACORD140", "ACORD-140.pdf"),
    ("ACORD25", "ACORD-25.pdf"),
    ("SUPP_BERKLEY_PLUMBER", "Supplemental-Application.pdf"),
];

fn acord_folder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^ACORD(\d+)$").expect("valid regex"))
}

fn acord_form_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^acord(\d+)_v1$").expect("valid regex"))
}

#[derive(Debug, Clone)]
pub struct TemplateCatalog {
    aliases: HashMap<String, String>,
    filenames: HashMap<String, String>,
}

impl Default for TemplateCatalog {
    fn default() -> Self {
        Self {
            aliases: ALIASES
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            filenames: DISPLAY_FILENAMES
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

impl TemplateCatalog {
    pub fn with_alias(mut self, alias: impl Into<String>, folder: impl Into<String>) -> Self {
        self.aliases.insert(alias.into(), folder.into());
        self
    }

    pub fn with_filename(mut self, folder: impl Into<String>, filename: impl Into<String>) -> Self {
        self.filenames.insert(folder.into(), filename.into());
        self
    }

    /// Inbound template name → template folder. Unknown names pass through.
    pub fn resolve<'a>(&'a self, name: &'a str) -> &'a str {
        let name = name.trim();
        self.aliases.get(name).map(String::as_str).unwrap_or(name)
    }

    /// Form id the folder renders as: `ACORD125` → `acord125_v1`,
    /// `SUPP_*` → `supp_<segment>_v1`.
    pub fn form_id_for_folder(&self, folder: &str, segment: &str) -> Option<String> {
        if let Some(caps) = acord_folder_re().captures(folder) {
            return Some(format!("acord{}_v1", &caps[1]));
        }
        if folder.get(..5).is_some_and(|p| p.eq_ignore_ascii_case("SUPP_")) {
            return Some(format!("supp_{}_v1", segment.to_ascii_lowercase()));
        }
        None
    }

    /// Template folder for an `acord<N>_v1` form id.
    pub fn folder_for_form_id(&self, form_id: &str) -> Option<String> {
        acord_form_re()
            .captures(form_id.trim())
            .map(|caps| format!("ACORD{}", &caps[1]))
    }

    /// Resolve any accepted identifier (alias, folder or form id) to a form id.
    pub fn form_id_for(&self, identifier: &str, segment: &str) -> Option<String> {
        let folder = self.resolve(identifier);
        self.form_id_for_folder(folder, segment)
    }

    pub fn display_filename(&self, folder: &str) -> Option<&str> {
        self.filenames.get(folder).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_aliases() {
        let catalog = TemplateCatalog::default();
        assert_eq!(catalog.resolve("Accord125"), "ACORD125");
        assert_eq!(catalog.resolve("WCForm"), "ACORD130");
        assert_eq!(catalog.resolve("PlumberSupp"), "SUPP_BERKLEY_PLUMBER");
        assert_eq!(catalog.resolve("ACORD140"), "ACORD140");
        assert_eq!(catalog.resolve("Custom"), "Custom");
    }

    #[test]
    fn test_form_id_convention() {
        let catalog = TemplateCatalog::default();
        assert_eq!(
            catalog.form_id_for_folder("ACORD125", "plumber").as_deref(),
            Some("acord125_v1")
        );
        assert_eq!(
            catalog.form_id_for_folder("SUPP_BERKLEY_PLUMBER", "Plumber").as_deref(),
            Some("supp_plumber_v1")
        );
        assert_eq!(catalog.form_id_for_folder("Brochure", "plumber"), None);
        assert_eq!(
            catalog.form_id_for("Accord25", "plumber").as_deref(),
            Some("acord25_v1")
        );
    }

    #[test]
    fn test_folder_for_form_id() {
        let catalog = TemplateCatalog::default();
        assert_eq!(catalog.folder_for_form_id("acord25_v1").as_deref(), Some("ACORD25"));
        assert_eq!(catalog.folder_for_form_id("supp_plumber_v1"), None);
    }

    #[test]
    fn test_custom_alias() {
        let catalog = TemplateCatalog::default().with_alias("GLApp", "ACORD126");
        assert_eq!(catalog.resolve("GLApp"), "ACORD126");
        assert_eq!(catalog.resolve("Accord125"), "ACORD125");
    }

    #[test]
    fn test_display_filename() {
        let catalog = TemplateCatalog::default().with_filename("ACORD999", "Custom.pdf");
        assert_eq!(catalog.display_filename("ACORD126"), Some("ACORD-126.pdf"));
        assert_eq!(catalog.display_filename("ACORD999"), Some("Custom.pdf"));
        assert_eq!(catalog.display_filename("Nope"), None);
    }
}
