//! Template asset resolution.
//!
//! Everything here reads from disk and nothing is cached: each render sees
//! the template directory as it is at that moment.

pub mod pages;
pub mod resolver;
pub mod segment;

pub use pages::{list_page_files, load_page_maps, Baseline, FieldPlacement, PageFile, PageMap};
pub use resolver::{load_background, read_optional_css, resolve_template_dir, DEFAULT_TEMPLATE_DIR};
pub use segment::{load_global_css, SegmentAssets};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use std::io::ErrorKind;
use std::path::Path;

use crate::generators::GeneratorError;

/// Encode bytes as a `data:` URI, guessing the MIME type from the path.
pub fn data_uri(path: &Path, bytes: &[u8]) -> String {
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    format!("data:{};base64,{}", mime.essence_str(), BASE64.encode(bytes))
}

/// Read a file that may legitimately be absent. Other I/O failures are errors.
pub(crate) async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, GeneratorError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(GeneratorError::asset_io(path, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_uri() {
        assert_eq!(data_uri(Path::new("logo.png"), b"abc"), "data:image/png;base64,YWJj");
        assert!(data_uri(Path::new("sig.svg"), b"<svg/>").starts_with("data:image/svg+xml;base64,"));
    }
}
