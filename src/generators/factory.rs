//! The document factory: job in, PDF out.

use async_trait::async_trait;
use log::info;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use super::common::document_filename;
use super::traits::Generator;
use super::{html, svg, EngineKind, GeneratorError, RenderedDocument};
use crate::asset::{load_background, resolve_template_dir, SegmentAssets, DEFAULT_TEMPLATE_DIR};
use crate::config::forms::DEFAULT_FORM_ID;
use crate::config::{AppConfig, FormsTable, TemplateCatalog, TemplateConfig};
use crate::mapping::FieldMapper;
use crate::models::{Job, RequestRecord};
use crate::print::{PageSpec, PrintEngine, SurfaceLauncher, WebDriverLauncher};
use crate::template::{TemplateAssets, TemplateRenderer};

/// Segment used when neither the job nor the record names one.
pub const FALLBACK_SEGMENT: &str = "default";

/// Filesystem and policy settings the factory needs.
#[derive(Debug, Clone)]
pub struct FactorySettings {
    pub project_root: PathBuf,
    pub mapping_dir: PathBuf,
    /// Page-map policy for templates that do not set `strictMapping`.
    pub strict_mapping: bool,
    pub load_timeout: Duration,
}

impl FactorySettings {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        let project_root = project_root.into();
        Self {
            mapping_dir: project_root.join("mapping"),
            project_root,
            strict_mapping: true,
            load_timeout: crate::print::DEFAULT_LOAD_TIMEOUT,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            project_root: config.project_root.clone(),
            mapping_dir: config.mapping_dir.clone(),
            strict_mapping: config.strict_mapping,
            load_timeout: config.load_timeout,
        }
    }

    pub fn with_strict_mapping(mut self, strict: bool) -> Self {
        self.strict_mapping = strict;
        self
    }
}

/// Everything resolved for one job before anything is rendered.
struct RenderPlan<'a> {
    form_id: String,
    config: &'a TemplateConfig,
    engine: EngineKind,
    dir: PathBuf,
    segment: String,
}

pub struct DocumentFactory {
    forms: Arc<FormsTable>,
    catalog: Arc<TemplateCatalog>,
    settings: FactorySettings,
    mapper: FieldMapper,
    renderer: TemplateRenderer,
    printer: PrintEngine,
}

impl DocumentFactory {
    pub fn new(
        forms: Arc<FormsTable>,
        settings: FactorySettings,
        launcher: Arc<dyn SurfaceLauncher>,
    ) -> Self {
        Self {
            forms,
            catalog: Arc::new(TemplateCatalog::default()),
            mapper: FieldMapper::new(&settings.mapping_dir),
            renderer: TemplateRenderer::new(),
            printer: PrintEngine::new(launcher, settings.load_timeout),
            settings,
        }
    }

    /// Production wiring: forms table from disk, Chrome over WebDriver.
    pub fn from_config(config: &AppConfig) -> Result<Self, GeneratorError> {
        let forms = FormsTable::load(&config.forms_config)?;
        info!(
            "loaded {} form configurations from {}",
            forms.len(),
            config.forms_config.display()
        );
        let launcher = WebDriverLauncher::new(&config.webdriver_url)
            .with_chrome_binary(config.chrome_binary.clone())
            .with_load_timeout(config.load_timeout);

        Ok(Self::new(
            Arc::new(forms),
            FactorySettings::from_config(config),
            Arc::new(launcher),
        ))
    }

    pub fn with_catalog(mut self, catalog: Arc<TemplateCatalog>) -> Self {
        self.catalog = catalog;
        self
    }

    /// The job's segment: job → record → `default`.
    pub fn segment_for(job: &Job) -> String {
        job.segment
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .or_else(|| job.request_row.segment())
            .unwrap_or_else(|| FALLBACK_SEGMENT.to_string())
    }

    /// The job's form id: template identifier → record `form_id` →
    /// `acord25_v1`. Identifiers that are not configured form ids go
    /// through the catalog (`Accord125` → `acord125_v1`).
    pub fn resolve_form_id(&self, job: &Job, segment: &str) -> String {
        let identifier = job
            .template_identifier
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .or_else(|| job.request_row.form_id())
            .unwrap_or_else(|| DEFAULT_FORM_ID.to_string());

        if self.forms.contains(&identifier) {
            return identifier;
        }
        match self.catalog.form_id_for(&identifier, segment) {
            Some(form_id) if self.forms.contains(&form_id) => form_id,
            _ => identifier,
        }
    }

    async fn plan(&self, job: &Job) -> Result<RenderPlan<'_>, GeneratorError> {
        let segment = Self::segment_for(job);
        let form_id = self.resolve_form_id(job, &segment);
        let config = self.forms.lookup(&form_id)?;
        let engine = config.engine()?;

        let dir = match config.template_path() {
            Some(specifier) => resolve_template_dir(&self.settings.project_root, specifier),
            None if engine.tolerates_missing_path() => {
                self.settings.project_root.join(DEFAULT_TEMPLATE_DIR)
            }
            None => {
                return Err(GeneratorError::configuration(format!(
                    "form {form_id} has no templatePath and the {engine} engine requires one"
                )))
            }
        };
        ensure_dir(&dir).await?;

        Ok(RenderPlan {
            form_id,
            config,
            engine,
            dir,
            segment,
        })
    }
}

async fn ensure_dir(dir: &Path) -> Result<(), GeneratorError> {
    match tokio::fs::metadata(dir).await {
        Ok(meta) if meta.is_dir() => Ok(()),
        _ => Err(GeneratorError::configuration(format!(
            "template directory not found: {}",
            dir.display()
        ))),
    }
}

fn template_name(dir: &Path) -> String {
    dir.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string()
}

#[async_trait]
impl Generator for DocumentFactory {
    async fn generate(&self, job: Job) -> Result<RenderedDocument, GeneratorError> {
        let plan = self.plan(&job).await?;
        let record: &RequestRecord = &job.request_row;
        let render_id = Uuid::new_v4();

        info!(
            "[factory] render {render_id}: {} ({}) seg={} engine={}",
            record.id().as_deref().unwrap_or("-"),
            plan.form_id,
            plan.segment,
            plan.engine
        );

        let mapped = self.mapper.apply(&template_name(&plan.dir), record).await?;
        let assets = TemplateAssets::new(
            SegmentAssets::load(&self.settings.project_root, &plan.segment).await?,
            load_background(&plan.dir).await?,
        );

        let geometry_selector = plan.config.geometry_selector.clone();
        let (markup, spec) = match plan.engine {
            EngineKind::Html => {
                let markup = html::compose(
                    &self.renderer,
                    &self.settings.project_root,
                    &plan.dir,
                    &mapped,
                    &assets,
                )
                .await?;
                (markup, PageSpec::letter().with_root_selector(geometry_selector))
            }
            EngineKind::Svg => {
                let strict = plan
                    .config
                    .strict_mapping
                    .unwrap_or(self.settings.strict_mapping);
                let spec = PageSpec::letter().with_root_selector(
                    geometry_selector.or_else(|| Some(svg::PAGE_SELECTOR.to_string())),
                );
                let markup =
                    svg::compose(&self.renderer, &plan.dir, &mapped, &assets, strict, &spec)
                        .await?;
                (markup, spec)
            }
        };

        let buffer = self.printer.to_pdf(&markup, &spec).await?;
        let filename =
            document_filename(plan.config.filename_prefix.as_deref(), &plan.segment, record);

        info!(
            "[factory] render {render_id} done: {filename} ({} bytes)",
            buffer.len()
        );
        Ok(RenderedDocument::pdf(buffer, filename))
    }
}
