//! Markup to PDF through a browser surface.
//!
//! Every dimension is in CSS pixels at 96 per inch: a Letter page is
//! 816×1056. Templates, page-map coordinates and print settings all use it.

pub mod surface;
pub mod validate;
pub mod webdriver;

pub use surface::{ElementBox, RenderSurface, SurfaceLauncher};
pub use validate::validate_pdf;
pub use webdriver::WebDriverLauncher;

use log::{debug, error};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::generators::GeneratorError;

pub const CSS_PX_PER_INCH: f64 = 96.0;
pub const LETTER_WIDTH_PX: u32 = 816;
pub const LETTER_HEIGHT_PX: u32 = 1056;
pub const GEOMETRY_TOLERANCE_PX: f64 = 1.0;
pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(45);

/// The logical page a render is locked to.
#[derive(Debug, Clone, PartialEq)]
pub struct PageSpec {
    pub width_px: u32,
    pub height_px: u32,
    /// Elements that must render at exactly the page size before printing.
    pub root_selector: Option<String>,
}

impl Default for PageSpec {
    fn default() -> Self {
        Self::letter()
    }
}

impl PageSpec {
    pub fn letter() -> Self {
        Self {
            width_px: LETTER_WIDTH_PX,
            height_px: LETTER_HEIGHT_PX,
            root_selector: None,
        }
    }

    pub fn with_root_selector(mut self, selector: Option<String>) -> Self {
        self.root_selector = selector.filter(|s| !s.trim().is_empty());
        self
    }

    pub fn width_in(&self) -> f64 {
        f64::from(self.width_px) / CSS_PX_PER_INCH
    }

    pub fn height_in(&self) -> f64 {
        f64::from(self.height_px) / CSS_PX_PER_INCH
    }
}

/// Every box matching the root selector must be the page size, ±1px. No
/// match at all also violates the contract.
pub fn check_geometry(
    selector: &str,
    boxes: &[ElementBox],
    spec: &PageSpec,
) -> Result<(), GeneratorError> {
    if boxes.is_empty() {
        return Err(GeneratorError::GeometryContract {
            selector: selector.to_string(),
            detail: "no element matched".to_string(),
        });
    }

    let (width, height) = (f64::from(spec.width_px), f64::from(spec.height_px));
    for (i, b) in boxes.iter().enumerate() {
        if (b.width - width).abs() > GEOMETRY_TOLERANCE_PX
            || (b.height - height).abs() > GEOMETRY_TOLERANCE_PX
        {
            return Err(GeneratorError::GeometryContract {
                selector: selector.to_string(),
                detail: format!(
                    "element {i} rendered {:.1}x{:.1}, expected {}x{}",
                    b.width, b.height, spec.width_px, spec.height_px
                ),
            });
        }
    }
    Ok(())
}

/// Close `surface`. A failure is logged and never replaces the outcome of
/// the render it belonged to.
pub(crate) async fn close_logged(surface: &mut dyn RenderSurface) {
    if let Err(e) = surface.close().await {
        error!("failed to close rendering surface: {e}");
    }
}

/// Drives one surface per call: open, load, wait, check, print, close.
#[derive(Clone)]
pub struct PrintEngine {
    launcher: Arc<dyn SurfaceLauncher>,
    load_timeout: Duration,
}

impl PrintEngine {
    pub fn new(launcher: Arc<dyn SurfaceLauncher>, load_timeout: Duration) -> Self {
        Self {
            launcher,
            load_timeout,
        }
    }

    pub async fn to_pdf(&self, markup: &str, spec: &PageSpec) -> Result<Vec<u8>, GeneratorError> {
        let mut surface = self.launcher.open(spec).await?;
        let captured = self.capture(surface.as_mut(), markup, spec).await;
        close_logged(surface.as_mut()).await;

        let buffer = captured?;
        validate_pdf(&buffer)?;
        debug!("printed {} bytes", buffer.len());
        Ok(buffer)
    }

    async fn capture(
        &self,
        surface: &mut dyn RenderSurface,
        markup: &str,
        spec: &PageSpec,
    ) -> Result<Vec<u8>, GeneratorError> {
        timeout(self.load_timeout, async {
            surface.load(markup).await?;
            surface.wait_until_ready().await
        })
        .await
        .map_err(|_| GeneratorError::Timeout {
            after: self.load_timeout,
            what: "document load and fonts",
        })??;

        if let Some(selector) = spec.root_selector.as_deref() {
            let boxes = surface.measure(selector).await?;
            check_geometry(selector, &boxes, spec)?;
        }

        timeout(self.load_timeout, surface.print(spec))
            .await
            .map_err(|_| GeneratorError::Timeout {
                after: self.load_timeout,
                what: "print",
            })?
    }
}
