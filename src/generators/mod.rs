//! Generators module - turns a job into a finished PDF.
//!
//! - `factory` - config lookup, field mapping and engine dispatch
//! - `html` - single-template HTML engine
//! - `svg` - per-page SVG engine with coordinate overlays
//! - `bundle` - several templates for one record, with per-template outcomes
//! - `common` - filename policy and markup helpers shared by the engines

pub mod bundle;
pub mod common;
pub mod engine;
pub mod factory;
pub mod html;
pub mod svg;
pub mod traits;

pub use bundle::{BundleRenderer, BundleReport, TemplateOutcome, TemplateRequest};
pub use engine::EngineKind;
pub use factory::{DocumentFactory, FactorySettings};
pub use traits::Generator;

use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Errors that can occur during document generation.
///
/// Every variant is fatal to the single render that raised it.
#[derive(Debug, Error)]
pub enum GeneratorError {
    /// Unknown or disabled form, missing template directory or file, or a
    /// malformed mapping / page-map file.
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("failed to bind template '{template}': {cause}")]
    Binding { template: String, cause: String },
    #[error("page geometry contract violated for '{selector}': {detail}")]
    GeometryContract { selector: String, detail: String },
    #[error("invalid PDF output: {0}")]
    OutputValidation(String),
    #[error("rendering surface failed: {0}")]
    Surface(String),
    #[error("timed out after {}s waiting for {what}", .after.as_secs())]
    Timeout { after: Duration, what: &'static str },
    #[error("failed to read {}: {source}", .path.display())]
    AssetIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl GeneratorError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn binding(template: impl Into<String>, cause: impl ToString) -> Self {
        Self::Binding {
            template: template.into(),
            cause: cause.to_string(),
        }
    }

    pub fn asset_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::AssetIo {
            path: path.into(),
            source,
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

/// Metadata travelling with a rendered buffer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMeta {
    pub filename: String,
    pub content_type: &'static str,
}

/// Result of a successful document generation.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub buffer: Vec<u8>,
    pub meta: DocumentMeta,
}

impl RenderedDocument {
    pub fn pdf(buffer: Vec<u8>, filename: impl Into<String>) -> Self {
        Self {
            buffer,
            meta: DocumentMeta {
                filename: filename.into(),
                content_type: PDF_CONTENT_TYPE,
            },
        }
    }

    pub fn filename(&self) -> &str {
        &self.meta.filename
    }
}
