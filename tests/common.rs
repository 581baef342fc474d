//! Shared fixtures: a recording stand-in for the browser and template trees
//! built in temporary directories.

#![allow(dead_code)]

use acord_pdf_factory::config::{FormsTable, TemplateCatalog};
use acord_pdf_factory::generators::GeneratorError;
use acord_pdf_factory::print::{ElementBox, PageSpec, RenderSurface, SurfaceLauncher};
use acord_pdf_factory::{DocumentFactory, FactorySettings};
use async_trait::async_trait;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// What the fake browser saw across every render.
#[derive(Default)]
pub struct Recorder {
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    pub markup: Mutex<Vec<String>>,
}

impl Recorder {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn last_markup(&self) -> String {
        self.markup.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

pub fn fake_pdf() -> Vec<u8> {
    let mut buf = b"%PDF-1.7\n%fake\n".to_vec();
    buf.resize(256, b' ');
    buf.extend_from_slice(b"\n%%EOF\n");
    buf
}

/// Prints a fixed PDF and reports one letter-sized box per `class="page"`
/// element in the loaded markup.
pub struct RecordingLauncher {
    pub recorder: Arc<Recorder>,
}

struct RecordingSurface {
    recorder: Arc<Recorder>,
    markup: String,
}

#[async_trait]
impl SurfaceLauncher for RecordingLauncher {
    async fn open(&self, _spec: &PageSpec) -> Result<Box<dyn RenderSurface>, GeneratorError> {
        self.recorder.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(RecordingSurface {
            recorder: self.recorder.clone(),
            markup: String::new(),
        }))
    }
}

#[async_trait]
impl RenderSurface for RecordingSurface {
    async fn load(&mut self, markup: &str) -> Result<(), GeneratorError> {
        self.markup = markup.to_string();
        self.recorder.markup.lock().unwrap().push(markup.to_string());
        Ok(())
    }

    async fn wait_until_ready(&mut self) -> Result<(), GeneratorError> {
        Ok(())
    }

    async fn measure(&mut self, _selector: &str) -> Result<Vec<ElementBox>, GeneratorError> {
        let pages = self.markup.matches("class=\"page\"").count();
        Ok(vec![
            ElementBox {
                width: 816.0,
                height: 1056.0
            };
            pages
        ])
    }

    async fn print(&mut self, _spec: &PageSpec) -> Result<Vec<u8>, GeneratorError> {
        Ok(fake_pdf())
    }

    async fn close(&mut self) -> Result<(), GeneratorError> {
        self.recorder.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

pub const FORMS: &str = r#"{
    "acord125_v1": { "templatePath": "ACORD125", "engine": "html" },
    "acord25_v1": { "templatePath": "templates/ACORD25", "engine": "svg", "filenamePrefix": "COI" },
    "acord126_v1": { "templatePath": "ACORD126", "engine": "html" },
    "supp_plumber_v1": { "templatePath": "SUPP_BERKLEY_PLUMBER", "engine": "html" },
    "legacy_v1": { "templatePath": "ACORD125", "engine": "pdfkit" }
}"#;

/// A project tree with an HTML form (ACORD125), a two-page SVG form
/// (ACORD25) and a plumber supplemental. ACORD126 is configured but has no
/// directory.
pub fn project() -> TempDir {
    let root = tempfile::tempdir().unwrap();
    let r = root.path();

    write(
        r,
        "templates/ACORD125/index.ejs",
        "<html><head><title>ACORD 125</title></head><body><section class=\"page\"><h1><%= applicant_name %></h1><p><%= insured.name %></p></section></body></html>",
    );
    write(r, "templates/ACORD125/styles.css", "h1 { font-size: 14pt }");

    write(
        r,
        "templates/ACORD25/index.hbs",
        "<html><head><title>COI</title></head><body>{{{pages}}}</body></html>",
    );
    write(
        r,
        "templates/ACORD25/assets/page-1.svg",
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="816" height="1056"><text x="5" y="5">{{producer_name}}</text></svg>"#,
    );
    write(
        r,
        "templates/ACORD25/assets/page-2.svg",
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="816" height="1056"></svg>"#,
    );
    write(
        r,
        "templates/ACORD25/mapping/page-1.map.json",
        r#"{ "pageId": 1, "fields": [ { "name": "holder_name", "x": 40, "y": 120 } ] }"#,
    );
    write(
        r,
        "templates/ACORD25/mapping/page-2.map.json",
        r#"{ "pageId": "page-2", "fields": [ { "key": "policy_number", "x": 60, "y": 300, "fontSize": 9 } ] }"#,
    );

    write(
        r,
        "templates/SUPP_BERKLEY_PLUMBER/index.hbs",
        "<html><head></head><body>{{business_name}} {{yn gas_line_work}}</body></html>",
    );

    write(r, "config/forms.json", FORMS);
    write(
        r,
        "config/bundles.json",
        r#"{ "coi_standard_v1": ["acord25_v1"], "new_business_v1": ["acord125_v1", "acord126_v1"] }"#,
    );
    root
}

pub fn factory(root: &Path) -> (Arc<DocumentFactory>, Arc<Recorder>) {
    factory_with_settings(FactorySettings::new(root))
}

pub fn factory_with_settings(settings: FactorySettings) -> (Arc<DocumentFactory>, Arc<Recorder>) {
    let recorder = Arc::new(Recorder::default());
    let forms = FormsTable::from_json_str(FORMS).unwrap();
    let factory = DocumentFactory::new(
        Arc::new(forms),
        settings,
        Arc::new(RecordingLauncher {
            recorder: recorder.clone(),
        }),
    )
    .with_catalog(Arc::new(TemplateCatalog::default()));
    (Arc::new(factory), recorder)
}
