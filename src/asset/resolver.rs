//! Template directory resolution and optional per-template files.

use log::warn;
use std::path::{Path, PathBuf};

use super::{data_uri, read_optional};
use crate::generators::GeneratorError;

/// Where templates live when a specifier is a bare name.
pub const TEMPLATES_ROOT: &str = "templates";

/// Used by engines that tolerate a missing template path.
pub const DEFAULT_TEMPLATE_DIR: &str = "templates/default";

/// Prefixes that already name a location under the project root.
const ROOTED_PREFIXES: [&str; 2] = ["vendor/", "templates/"];

const BACKGROUND_CANDIDATES: [&str; 5] = [
    "background.png",
    "background.jpg",
    "background.jpeg",
    "background.svg",
    "background.webp",
];

/// Resolve a template path specifier to one directory.
///
/// Absolute paths pass through, `vendor/…` and `templates/…` are joined to
/// the project root as-is, and anything else is a bare name under
/// `<root>/templates`.
pub fn resolve_template_dir(root: &Path, specifier: &str) -> PathBuf {
    let specifier = specifier.trim();
    let path = Path::new(specifier);

    if path.is_absolute() {
        return path.to_path_buf();
    }
    if ROOTED_PREFIXES.iter().any(|p| specifier.starts_with(p)) {
        return root.join(specifier);
    }
    root.join(TEMPLATES_ROOT).join(specifier)
}

/// Contents of `styles.css`, or an empty string when there is none.
pub async fn read_optional_css(dir: &Path) -> Result<String, GeneratorError> {
    let path = dir.join("styles.css");
    Ok(read_optional(&path)
        .await?
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default())
}

/// The template's background image as a data URI, or an empty string.
pub async fn load_background(dir: &Path) -> Result<String, GeneratorError> {
    for name in BACKGROUND_CANDIDATES {
        let path = dir.join(name);
        if let Some(bytes) = read_optional(&path).await? {
            return Ok(data_uri(&path, &bytes));
        }
    }
    warn!("no background image in {}, rendering without one", dir.display());
    Ok(String::new())
}
