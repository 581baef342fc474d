//! Template binding.
//!
//! Templates are handlebars sources (`index.hbs`) or legacy EJS sources
//! (`index.ejs`, translated on load). The registry runs in non-strict mode so
//! a field the record does not carry renders as an empty string.

pub mod context;
pub mod ejs;
pub mod helpers;

pub use context::{BindingContext, TemplateAssets};

use handlebars::Handlebars;
use std::io::ErrorKind;
use std::path::Path;

use crate::generators::GeneratorError;

/// Index file names, in order of preference.
pub const INDEX_FILES: [&str; 2] = ["index.hbs", "index.ejs"];

/// A template ready for binding.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateSource {
    /// Used in error messages, e.g. `ACORD25/index.ejs`.
    pub name: String,
    pub body: String,
}

impl TemplateSource {
    pub fn handlebars(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: body.into(),
        }
    }

    pub fn ejs(name: impl Into<String>, body: &str) -> Result<Self, GeneratorError> {
        let name = name.into();
        let body = ejs::translate(body).map_err(|cause| GeneratorError::binding(&name, cause))?;
        Ok(Self { name, body })
    }

    /// Pick the dialect from the markup itself; page SVGs come in both.
    pub fn detect(name: impl Into<String>, body: &str) -> Result<Self, GeneratorError> {
        if body.contains("<%") {
            Self::ejs(name, body)
        } else {
            Ok(Self::handlebars(name, body))
        }
    }
}

fn display_name(dir: &Path, file: &str) -> String {
    match dir.file_name().and_then(|n| n.to_str()) {
        Some(folder) => format!("{folder}/{file}"),
        None => file.to_string(),
    }
}

/// Load the template's index file. Missing both candidates is a
/// configuration error naming the directory.
pub async fn load_index(dir: &Path) -> Result<TemplateSource, GeneratorError> {
    for file in INDEX_FILES {
        let path = dir.join(file);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => continue,
            Err(e) => return Err(GeneratorError::asset_io(&path, e)),
        };
        let name = display_name(dir, file);
        return if file.ends_with(".ejs") {
            TemplateSource::ejs(name, &raw)
        } else {
            Ok(TemplateSource::handlebars(name, raw))
        };
    }

    Err(GeneratorError::configuration(format!(
        "template file missing: {} (looked for {})",
        dir.display(),
        INDEX_FILES.join(", ")
    )))
}

/// Shared handlebars registry with the form helpers installed.
pub struct TemplateRenderer {
    registry: Handlebars<'static>,
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateRenderer {
    pub fn new() -> Self {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(false);
        helpers::register(&mut registry);
        Self { registry }
    }

    /// Bind `context` into `template`. Compile and evaluation failures are
    /// binding errors carrying the template name.
    pub fn render(
        &self,
        template: &TemplateSource,
        context: &BindingContext,
    ) -> Result<String, GeneratorError> {
        self.registry
            .render_template(&template.body, context)
            .map_err(|e| GeneratorError::binding(&template.name, e))
    }
}
