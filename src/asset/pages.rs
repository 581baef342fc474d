//! Per-page assets of the SVG engine: page files and coordinate maps.

use log::warn;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::generators::GeneratorError;

pub const DEFAULT_FONT_SIZE: f64 = 10.0;

fn page_file_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^page-(\d+)\.([a-z0-9]+)$").expect("valid regex"))
}

fn page_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^(?:page-?)?(\d+)$").expect("valid regex"))
}

/// One `assets/page-<N>.<ext>` file.
#[derive(Debug, Clone, PartialEq)]
pub struct PageFile {
    pub number: u32,
    pub path: PathBuf,
}

impl PageFile {
    pub fn is_svg(&self) -> bool {
        self.path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("svg"))
    }
}

/// Page files sorted by their embedded number. Gaps are fine; an absent
/// `assets` directory is an empty list.
pub async fn list_page_files(dir: &Path) -> Result<Vec<PageFile>, GeneratorError> {
    let assets = dir.join("assets");
    let mut entries = match tokio::fs::read_dir(&assets).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(GeneratorError::asset_io(&assets, e)),
    };

    let mut pages = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| GeneratorError::asset_io(&assets, e))?
    {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        let Some(caps) = page_file_re().captures(name) else { continue };
        let Ok(number) = caps[1].parse::<u32>() else { continue };
        pages.push(PageFile {
            number,
            path: entry.path(),
        });
    }

    pages.sort_by_key(|p| p.number);
    Ok(pages)
}

/// How a field sits on its y coordinate: a numeric nudge added to `y`, or a
/// `dominant-baseline` keyword passed through to the text node.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Baseline {
    Offset(f64),
    Keyword(String),
}

/// Where one value lands on a page.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldPlacement {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    key: Option<String>,
    pub x: f64,
    pub y: f64,
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    #[serde(default)]
    pub baseline: Option<Baseline>,
}

fn default_font_size() -> f64 {
    DEFAULT_FONT_SIZE
}

impl FieldPlacement {
    pub fn new(field: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            name: Some(field.into()),
            key: None,
            x,
            y,
            font_size: DEFAULT_FONT_SIZE,
            baseline: None,
        }
    }

    /// Record key the value is read from; `name` wins over `key`.
    pub fn field(&self) -> &str {
        self.name
            .as_deref()
            .or(self.key.as_deref())
            .unwrap_or_default()
    }

    /// Effective y after a numeric baseline offset.
    pub fn baseline_y(&self) -> f64 {
        match self.baseline {
            Some(Baseline::Offset(dy)) => self.y + dy,
            _ => self.y,
        }
    }

    pub fn dominant_baseline(&self) -> Option<&str> {
        match &self.baseline {
            Some(Baseline::Keyword(k)) if !k.trim().is_empty() => Some(k.trim()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPageMap {
    #[serde(default)]
    page_id: Option<serde_json::Value>,
    #[serde(default)]
    fields: Vec<FieldPlacement>,
}

/// Field placements for one page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageMap {
    pub page: u32,
    pub fields: Vec<FieldPlacement>,
}

fn parse_page_id(value: &serde_json::Value) -> Option<u32> {
    match value {
        serde_json::Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        serde_json::Value::String(s) => page_id_re()
            .captures(s.trim())
            .and_then(|caps| caps[1].parse().ok()),
        _ => None,
    }
}

impl PageMap {
    /// Parse one `*.map.json` document. `source` only labels errors.
    pub fn from_json_str(raw: &str, source: &str) -> Result<Self, GeneratorError> {
        let parsed: RawPageMap = serde_json::from_str(raw).map_err(|e| {
            GeneratorError::configuration(format!("malformed page map {source}: {e}"))
        })?;

        let page = match parsed.page_id.as_ref() {
            None | Some(serde_json::Value::Null) => {
                return Err(GeneratorError::configuration(format!(
                    "page map {source} has no pageId"
                )))
            }
            Some(id) => parse_page_id(id).ok_or_else(|| {
                GeneratorError::configuration(format!(
                    "page map {source} has an unusable pageId: {id}"
                ))
            })?,
        };

        if parsed.fields.is_empty() {
            return Err(GeneratorError::configuration(format!(
                "page map {source} declares no fields"
            )));
        }
        if let Some(unnamed) = parsed.fields.iter().position(|f| f.field().is_empty()) {
            return Err(GeneratorError::configuration(format!(
                "page map {source}: field #{unnamed} has neither name nor key"
            )));
        }

        Ok(Self {
            page,
            fields: parsed.fields,
        })
    }
}

/// Load every `mapping/*.map.json` under `dir`, keyed by page number.
///
/// Strict: a missing or empty mapping directory, or any invalid file, fails.
/// Lenient: those cases are logged and skipped.
pub async fn load_page_maps(
    dir: &Path,
    strict: bool,
) -> Result<BTreeMap<u32, PageMap>, GeneratorError> {
    let mapping_dir = dir.join("mapping");
    let mut entries = match tokio::fs::read_dir(&mapping_dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            if strict {
                return Err(GeneratorError::configuration(format!(
                    "page map directory missing: {}",
                    mapping_dir.display()
                )));
            }
            warn!("no page maps at {}, pages render without overlays", mapping_dir.display());
            return Ok(BTreeMap::new());
        }
        Err(e) => return Err(GeneratorError::asset_io(&mapping_dir, e)),
    };

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| GeneratorError::asset_io(&mapping_dir, e))?
    {
        let path = entry.path();
        let is_map = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(".map.json"));
        if is_map {
            files.push(path);
        }
    }
    files.sort();

    let mut maps = BTreeMap::new();
    for path in files {
        let raw = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| GeneratorError::asset_io(&path, e))?;
        let source = path.display().to_string();

        match PageMap::from_json_str(&raw, &source) {
            Ok(map) => {
                if let Some(previous) = maps.insert(map.page, map) {
                    let message = format!("duplicate page map for page {}: {source}", previous.page);
                    if strict {
                        return Err(GeneratorError::configuration(message));
                    }
                    warn!("{message}, keeping the later file");
                }
            }
            Err(e) if strict => return Err(e),
            Err(e) => warn!("skipping page map: {e}"),
        }
    }

    if maps.is_empty() && strict {
        return Err(GeneratorError::configuration(format!(
            "no usable page maps in {}",
            mapping_dir.display()
        )));
    }
    Ok(maps)
}
