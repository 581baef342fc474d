//! Process configuration.
//!
//! - `forms` - the `form_id` → template table, loaded once at start
//! - `bundles` - named groups of forms rendered together
//! - `catalog` - template aliases, display filenames and form-id conventions

pub mod bundles;
pub mod catalog;
pub mod forms;

pub use bundles::BundleTable;
pub use catalog::TemplateCatalog;
pub use forms::{FormsTable, TemplateConfig};

use dotenvy::dotenv;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::generators::GeneratorError;

pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:4444";
pub const DEFAULT_SEGMENT: &str = "plumber";
pub const DEFAULT_LOAD_TIMEOUT_SECS: u64 = 45;

/// Settings read from the environment (and `.env`, when present).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub project_root: PathBuf,
    pub forms_config: PathBuf,
    pub bundles_config: PathBuf,
    pub mapping_dir: PathBuf,
    /// Business line the backend stamps on every batch render.
    pub segment: String,
    /// Default page-map policy; templates may override it.
    pub strict_mapping: bool,
    pub webdriver_url: String,
    pub chrome_binary: Option<String>,
    pub load_timeout: Duration,
    pub mail: MailConfig,
}

/// Outbound mail relay settings. All optional; delivery is skipped when the
/// relay is not configured.
#[derive(Debug, Clone, Default)]
pub struct MailConfig {
    pub relay_url: Option<String>,
    pub relay_token: Option<String>,
    pub from: Option<String>,
    pub carrier_email: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, GeneratorError> {
        dotenv().ok();

        let project_root = PathBuf::from(env_or("PROJECT_ROOT", "."));
        let forms_config = under_root(&project_root, &env_or("FORMS_CONFIG", "config/forms.json"));
        let bundles_config =
            under_root(&project_root, &env_or("BUNDLES_CONFIG", "config/bundles.json"));
        let mapping_dir = under_root(&project_root, &env_or("MAPPING_DIR", "mapping"));

        let strict_mapping = match env::var("STRICT_MAPPING") {
            Ok(raw) => parse_bool(&raw).ok_or_else(|| {
                GeneratorError::configuration(format!("STRICT_MAPPING must be a boolean, got '{raw}'"))
            })?,
            Err(_) => true,
        };

        let load_timeout = match env::var("RENDER_LOAD_TIMEOUT_SECS") {
            Ok(raw) => parse_timeout_secs(&raw)?,
            Err(_) => DEFAULT_LOAD_TIMEOUT_SECS,
        };

        Ok(Self {
            project_root,
            forms_config,
            bundles_config,
            mapping_dir,
            segment: env_or("SEGMENT", DEFAULT_SEGMENT),
            strict_mapping,
            webdriver_url: env_or("WEBDRIVER_URL", DEFAULT_WEBDRIVER_URL),
            chrome_binary: env_opt("CHROME_BINARY"),
            load_timeout: Duration::from_secs(load_timeout),
            mail: MailConfig {
                relay_url: env_opt("MAIL_RELAY_URL"),
                relay_token: env_opt("MAIL_RELAY_TOKEN"),
                from: env_opt("MAIL_FROM"),
                carrier_email: env_opt("CARRIER_EMAIL"),
            },
        })
    }

    /// A configuration rooted at `project_root` with every other setting at
    /// its default. Handy for tests and embedding.
    pub fn for_root(project_root: impl Into<PathBuf>) -> Self {
        let project_root = project_root.into();
        Self {
            forms_config: project_root.join("config/forms.json"),
            bundles_config: project_root.join("config/bundles.json"),
            mapping_dir: project_root.join("mapping"),
            project_root,
            segment: DEFAULT_SEGMENT.to_string(),
            strict_mapping: true,
            webdriver_url: DEFAULT_WEBDRIVER_URL.to_string(),
            chrome_binary: None,
            load_timeout: Duration::from_secs(DEFAULT_LOAD_TIMEOUT_SECS),
            mail: MailConfig::default(),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    env_opt(key).unwrap_or_else(|| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn under_root(root: &Path, value: &str) -> PathBuf {
    let path = Path::new(value);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

/// Whole seconds, at least one. Zero would time out every render.
fn parse_timeout_secs(raw: &str) -> Result<u64, GeneratorError> {
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(GeneratorError::configuration(
            "RENDER_LOAD_TIMEOUT_SECS must be at least 1 second",
        )),
        Ok(secs) => Ok(secs),
        Err(_) => Err(GeneratorError::configuration(format!(
            "RENDER_LOAD_TIMEOUT_SECS must be a number of seconds, got '{raw}'"
        ))),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
