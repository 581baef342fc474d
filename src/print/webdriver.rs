//! Headless Chrome driven over WebDriver.

use async_trait::async_trait;
use fantoccini::wd::{PrintConfiguration, PrintMargins, PrintSize, TimeoutConfiguration};
use fantoccini::{Client, ClientBuilder};
use log::debug;
use reqwest::Url;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tempfile::TempDir;

use super::surface::{ElementBox, RenderSurface, SurfaceLauncher};
use super::{close_logged, PageSpec, DEFAULT_LOAD_TIMEOUT};
use crate::generators::GeneratorError;

const DOCUMENT_FILE: &str = "document.html";

const READY_SCRIPT: &str = r#"
const done = arguments[arguments.length - 1];
const fontsReady = () => (document.fonts ? document.fonts.ready : Promise.resolve());
const finish = () => fontsReady().then(() => done(true), () => done(true));
if (document.readyState === 'complete') { finish(); }
else { window.addEventListener('load', finish, { once: true }); }
"#;

const MEASURE_SCRIPT: &str = r#"
return Array.from(document.querySelectorAll(arguments[0])).map((el) => {
  const r = el.getBoundingClientRect();
  return { width: r.width, height: r.height };
});
"#;

/// Connects to a WebDriver endpoint (chromedriver, selenium) and opens one
/// browser session per render.
#[derive(Debug, Clone)]
pub struct WebDriverLauncher {
    webdriver_url: String,
    chrome_binary: Option<String>,
    load_timeout: Duration,
}

impl WebDriverLauncher {
    pub fn new(webdriver_url: impl Into<String>) -> Self {
        Self {
            webdriver_url: webdriver_url.into(),
            chrome_binary: None,
            load_timeout: DEFAULT_LOAD_TIMEOUT,
        }
    }

    pub fn with_chrome_binary(mut self, binary: Option<String>) -> Self {
        self.chrome_binary = binary;
        self
    }

    pub fn with_load_timeout(mut self, load_timeout: Duration) -> Self {
        self.load_timeout = load_timeout;
        self
    }

    /// Session capabilities: headless Chrome with a viewport the size of
    /// the page.
    pub fn capabilities(&self, spec: &PageSpec) -> Map<String, Value> {
        let mut options = Map::new();
        options.insert(
            "args".to_string(),
            json!([
                "--headless=new",
                "--no-sandbox",
                "--disable-dev-shm-usage",
                "--disable-gpu",
                "--hide-scrollbars",
                format!("--window-size={},{}", spec.width_px, spec.height_px),
            ]),
        );
        if let Some(binary) = &self.chrome_binary {
            options.insert("binary".to_string(), json!(binary));
        }

        let mut caps = Map::new();
        caps.insert("browserName".to_string(), json!("chrome"));
        caps.insert("goog:chromeOptions".to_string(), Value::Object(options));
        caps
    }
}

#[async_trait]
impl SurfaceLauncher for WebDriverLauncher {
    async fn open(&self, spec: &PageSpec) -> Result<Box<dyn RenderSurface>, GeneratorError> {
        let workdir = tempfile::tempdir()
            .map_err(|e| GeneratorError::Surface(format!("cannot create render directory: {e}")))?;

        let client = ClientBuilder::native()
            .capabilities(self.capabilities(spec))
            .connect(&self.webdriver_url)
            .await
            .map_err(|e| {
                GeneratorError::Surface(format!(
                    "cannot start a browser session at {}: {e}",
                    self.webdriver_url
                ))
            })?;

        let mut surface = WebDriverSurface {
            client: Some(client),
            workdir,
        };
        if let Err(e) = surface.configure(spec, self.load_timeout).await {
            close_logged(&mut surface).await;
            return Err(e);
        }

        debug!("opened browser session via {}", self.webdriver_url);
        Ok(Box::new(surface))
    }
}

/// One browser session plus the scratch directory its document lives in.
struct WebDriverSurface {
    client: Option<Client>,
    workdir: TempDir,
}

fn surface_err(step: &str, e: impl std::fmt::Display) -> GeneratorError {
    GeneratorError::Surface(format!("{step}: {e}"))
}

/// Letter paper, no margins, backgrounds on. Page boxes already carry the
/// full 8.5x11in layout, so nothing may shrink them.
fn letter_print_configuration() -> Result<PrintConfiguration, GeneratorError> {
    PrintConfiguration::builder()
        .size(PrintSize::US_LETTER)
        .margins(PrintMargins {
            top: 0.0,
            left: 0.0,
            right: 0.0,
            bottom: 0.0,
        })
        .background(true)
        .shrink_to_fit(false)
        .build()
        .map_err(|e| surface_err("configure printer", e))
}

impl WebDriverSurface {
    fn client(&self) -> Result<&Client, GeneratorError> {
        self.client
            .as_ref()
            .ok_or_else(|| GeneratorError::Surface("browser session already closed".to_string()))
    }

    async fn configure(&self, spec: &PageSpec, load_timeout: Duration) -> Result<(), GeneratorError> {
        let client = self.client()?;
        client
            .set_window_size(spec.width_px, spec.height_px)
            .await
            .map_err(|e| surface_err("set window size", e))?;
        client
            .update_timeouts(TimeoutConfiguration::new(
                Some(load_timeout),
                Some(load_timeout),
                None,
            ))
            .await
            .map_err(|e| surface_err("set timeouts", e))
    }
}

#[async_trait]
impl RenderSurface for WebDriverSurface {
    async fn load(&mut self, markup: &str) -> Result<(), GeneratorError> {
        let path = self.workdir.path().join(DOCUMENT_FILE);
        tokio::fs::write(&path, markup)
            .await
            .map_err(|e| GeneratorError::asset_io(&path, e))?;
        let url = Url::from_file_path(&path)
            .map_err(|_| GeneratorError::Surface(format!("not a file URL: {}", path.display())))?;

        self.client()?
            .goto(url.as_str())
            .await
            .map_err(|e| surface_err("load document", e))
    }

    async fn wait_until_ready(&mut self) -> Result<(), GeneratorError> {
        self.client()?
            .execute_async(READY_SCRIPT, Vec::new())
            .await
            .map(|_| ())
            .map_err(|e| surface_err("wait for fonts", e))
    }

    async fn measure(&mut self, selector: &str) -> Result<Vec<ElementBox>, GeneratorError> {
        let raw = self
            .client()?
            .execute(MEASURE_SCRIPT, vec![json!(selector)])
            .await
            .map_err(|e| surface_err("measure page boxes", e))?;
        serde_json::from_value(raw).map_err(|e| surface_err("measure page boxes", e))
    }

    async fn print(&mut self, _spec: &PageSpec) -> Result<Vec<u8>, GeneratorError> {
        let config = letter_print_configuration()?;
        self.client()?
            .print(config)
            .await
            .map_err(|e| surface_err("print", e))
    }

    async fn close(&mut self) -> Result<(), GeneratorError> {
        match self.client.take() {
            Some(client) => client.close().await.map_err(|e| surface_err("close session", e)),
            None => Ok(()),
        }
    }
}
