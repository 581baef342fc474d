//! Branding shared by every template of a business segment.

use log::warn;
use std::path::Path;

use super::{data_uri, read_optional};
use crate::generators::GeneratorError;

const SEGMENTS_DIR: &str = "templates/assets/segments";
const GLOBAL_CSS: &str = "templates/assets/common/global-print.css";
const FALLBACK_SEGMENT: &str = "default";

/// Logo and signature as data URIs; empty when neither the segment nor the
/// `default` segment has one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentAssets {
    pub logo: String,
    pub signature: String,
}

impl SegmentAssets {
    pub async fn load(root: &Path, segment: &str) -> Result<Self, GeneratorError> {
        let segment = segment.trim().to_ascii_lowercase();
        Ok(Self {
            logo: load_branding(root, &segment, "logo.png").await?,
            signature: load_branding(root, &segment, "signature.svg").await?,
        })
    }
}

async fn load_branding(root: &Path, segment: &str, file: &str) -> Result<String, GeneratorError> {
    let segments = root.join(SEGMENTS_DIR);
    for candidate in [segment, FALLBACK_SEGMENT] {
        if candidate.is_empty() {
            continue;
        }
        let path = segments.join(candidate).join(file);
        if let Some(bytes) = read_optional(&path).await? {
            return Ok(data_uri(&path, &bytes));
        }
    }
    warn!("segment '{segment}' has no {file}, leaving it blank");
    Ok(String::new())
}

/// Print stylesheet shared by every HTML template, or `""`.
pub async fn load_global_css(root: &Path) -> Result<String, GeneratorError> {
    Ok(read_optional(&root.join(GLOBAL_CSS))
        .await?
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn test_segment_falls_back_to_default() {
        let root = tempfile::tempdir().unwrap();
        let default_dir = root.path().join(SEGMENTS_DIR).join("default");
        let plumber_dir = root.path().join(SEGMENTS_DIR).join("plumber");
        fs::create_dir_all(&default_dir).unwrap();
        fs::create_dir_all(&plumber_dir).unwrap();
        fs::write(plumber_dir.join("logo.png"), b"png").unwrap();
        fs::write(default_dir.join("signature.svg"), b"<svg/>").unwrap();

        let assets = SegmentAssets::load(root.path(), "Plumber").await.unwrap();
        assert!(assets.logo.starts_with("data:image/png;base64,"));
        assert!(assets.signature.starts_with("data:image/svg+xml;base64,"));

        let none = SegmentAssets::load(tempfile::tempdir().unwrap().path(), "hvac")
            .await
            .unwrap();
        assert_eq!(none, SegmentAssets::default());
    }

    #[tokio::test]
    async fn test_global_css() {
        let root = tempfile::tempdir().unwrap();
        assert_eq!(load_global_css(root.path()).await.unwrap(), "");

        let path = root.path().join(GLOBAL_CSS);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "@page{margin:0}").unwrap();
        assert_eq!(load_global_css(root.path()).await.unwrap(), "@page{margin:0}");
    }
}
