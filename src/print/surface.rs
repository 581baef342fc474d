use async_trait::async_trait;
use serde::Deserialize;

use super::PageSpec;
use crate::generators::GeneratorError;

/// Rendered size of one element, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ElementBox {
    pub width: f64,
    pub height: f64,
}

/// Opens one rendering surface per render.
#[async_trait]
pub trait SurfaceLauncher: Send + Sync {
    async fn open(&self, spec: &PageSpec) -> Result<Box<dyn RenderSurface>, GeneratorError>;
}

/// A live page that markup is loaded into and printed from.
///
/// Owners must call [`close`](RenderSurface::close) on every path.
#[async_trait]
pub trait RenderSurface: Send {
    async fn load(&mut self, markup: &str) -> Result<(), GeneratorError>;

    /// Resolves once the document has loaded and its fonts are ready.
    async fn wait_until_ready(&mut self) -> Result<(), GeneratorError>;

    /// Boxes of every element matching `selector`.
    async fn measure(&mut self, selector: &str) -> Result<Vec<ElementBox>, GeneratorError>;

    async fn print(&mut self, spec: &PageSpec) -> Result<Vec<u8>, GeneratorError>;

    async fn close(&mut self) -> Result<(), GeneratorError>;
}
