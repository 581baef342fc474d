//! Several templates rendered for one record.
//!
//! Templates render concurrently and independently: one failure never stops
//! the others. The report lists every template's outcome so the caller can
//! decide whether a partial bundle is worth sending.

use futures::future::join_all;
use log::{info, warn};
use serde::Serialize;
use std::sync::Arc;

use super::traits::Generator;
use super::GeneratorError;
use crate::config::{BundleTable, TemplateCatalog};
use crate::delivery::Attachment;
use crate::models::{Job, RequestRecord};

/// One requested template: a name the catalog understands plus an optional
/// caller-chosen attachment name.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateRequest {
    pub template: String,
    pub filename: Option<String>,
}

impl TemplateRequest {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            filename: None,
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum TemplateOutcome {
    Fulfilled { template: String, filename: String },
    Rejected { template: String, reason: String },
}

impl TemplateOutcome {
    pub fn template(&self) -> &str {
        match self {
            Self::Fulfilled { template, .. } | Self::Rejected { template, .. } => template,
        }
    }

    pub fn is_fulfilled(&self) -> bool {
        matches!(self, Self::Fulfilled { .. })
    }
}

#[derive(Debug, Default)]
pub struct BundleReport {
    pub attachments: Vec<Attachment>,
    pub outcomes: Vec<TemplateOutcome>,
}

impl BundleReport {
    /// Nothing rendered at all.
    pub fn is_total_failure(&self) -> bool {
        self.attachments.is_empty()
    }

    pub fn failures(&self) -> impl Iterator<Item = &TemplateOutcome> {
        self.outcomes.iter().filter(|o| !o.is_fulfilled())
    }
}

/// Renders template lists through any [`Generator`].
pub struct BundleRenderer {
    generator: Arc<dyn Generator>,
    catalog: Arc<TemplateCatalog>,
    segment: String,
}

fn attachment_name(requested: Option<&str>, folder: &str) -> String {
    match requested.map(str::trim).filter(|s| !s.is_empty()) {
        Some(name) => {
            let name = sanitize_filename::sanitize(name);
            if name.to_ascii_lowercase().ends_with(".pdf") {
                name
            } else {
                format!("{name}.pdf")
            }
        }
        None => format!("{folder}.pdf"),
    }
}

impl BundleRenderer {
    /// `segment` is the backend's business line; it replaces whatever
    /// segment the record carries.
    pub fn new(
        generator: Arc<dyn Generator>,
        catalog: Arc<TemplateCatalog>,
        segment: impl Into<String>,
    ) -> Self {
        Self {
            generator,
            catalog,
            segment: segment.into(),
        }
    }

    async fn render_one(
        &self,
        record: &RequestRecord,
        request: &TemplateRequest,
    ) -> Result<Attachment, GeneratorError> {
        let folder = self.catalog.resolve(&request.template);
        let form_id = self
            .catalog
            .form_id_for_folder(folder, &self.segment)
            .ok_or_else(|| {
                GeneratorError::configuration(format!(
                    "no form id convention for template folder: {folder}"
                ))
            })?;

        let mut row = record.clone();
        row.insert("segment", self.segment.as_str());
        row.insert("form_id", form_id.as_str());
        let job = Job::new(row)
            .with_template(form_id)
            .with_segment(self.segment.as_str());

        let document = self.generator.generate(job).await?;
        let filename = match self.catalog.display_filename(folder) {
            Some(display) => display.to_string(),
            None => attachment_name(request.filename.as_deref(), folder),
        };
        Ok(Attachment::from_document(document, filename))
    }

    /// Render every request concurrently. Outcomes keep request order.
    pub async fn render(&self, record: &RequestRecord, requests: &[TemplateRequest]) -> BundleReport {
        let results = join_all(requests.iter().map(|r| self.render_one(record, r))).await;

        let mut report = BundleReport::default();
        for (request, result) in requests.iter().zip(results) {
            match result {
                Ok(attachment) => {
                    report.outcomes.push(TemplateOutcome::Fulfilled {
                        template: request.template.clone(),
                        filename: attachment.filename.clone(),
                    });
                    report.attachments.push(attachment);
                }
                Err(e) => {
                    warn!("template {} failed: {e}", request.template);
                    report.outcomes.push(TemplateOutcome::Rejected {
                        template: request.template.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            "bundle rendered: {}/{} templates for segment {}",
            report.attachments.len(),
            requests.len(),
            self.segment
        );
        report
    }

    /// Render a named bundle from the bundle table.
    pub async fn render_bundle(
        &self,
        bundles: &BundleTable,
        bundle_id: &str,
        record: &RequestRecord,
    ) -> Result<BundleReport, GeneratorError> {
        let requests: Vec<TemplateRequest> = bundles
            .templates_for(bundle_id, &self.catalog)?
            .into_iter()
            .map(TemplateRequest::new)
            .collect();
        Ok(self.render(record, &requests).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::RenderedDocument;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Fails any job whose form id is listed; records every job it sees.
    struct ScriptedGenerator {
        failing: Vec<&'static str>,
        seen: Mutex<Vec<Job>>,
    }

    #[async_trait]
    impl Generator for ScriptedGenerator {
        async fn generate(&self, job: Job) -> Result<RenderedDocument, GeneratorError> {
            self.seen.lock().unwrap().push(job.clone());
            let form_id = job.template_identifier.clone().unwrap_or_default();
            if self.failing.contains(&form_id.as_str()) {
                return Err(GeneratorError::configuration(format!(
                    "configuration missing for form_id: {form_id}"
                )));
            }
            Ok(RenderedDocument::pdf(b"%PDF-1.7".to_vec(), format!("{form_id}.pdf")))
        }
    }

    fn renderer(failing: Vec<&'static str>) -> (BundleRenderer, Arc<ScriptedGenerator>) {
        let generator = Arc::new(ScriptedGenerator {
            failing,
            seen: Mutex::new(Vec::new()),
        });
        let renderer = BundleRenderer::new(
            generator.clone(),
            Arc::new(TemplateCatalog::default()),
            "plumber",
        );
        (renderer, generator)
    }

    #[tokio::test]
    async fn test_partial_failure_is_reported() {
        let (renderer, _) = renderer(vec!["acord126_v1"]);
        let record = RequestRecord::from_value(json!({"applicant_name": "Joe", "segment": "hvac"}));
        let requests = [
            TemplateRequest::new("Accord125"),
            TemplateRequest::new("Accord126"),
            TemplateRequest::new("Brochure").with_filename("My Brochure"),
        ];

        let report = renderer.render(&record, &requests).await;

        assert!(!report.is_total_failure());
        assert_eq!(report.attachments.len(), 1);
        assert_eq!(report.attachments[0].filename, "ACORD-125.pdf");
        assert_eq!(report.outcomes.len(), 3);
        assert!(report.outcomes[0].is_fulfilled());
        assert!(matches!(&report.outcomes[1], TemplateOutcome::Rejected { reason, .. } if reason.contains("acord126_v1")));
        assert!(matches!(&report.outcomes[2], TemplateOutcome::Rejected { reason, .. } if reason.contains("Brochure")));
        assert_eq!(report.failures().count(), 2);
    }

    #[tokio::test]
    async fn test_backend_segment_wins() {
        let (renderer, generator) = renderer(vec![]);
        let record = RequestRecord::from_value(json!({"segment": "hvac", "form_id": "acord25_v1"}));

        let report = renderer
            .render(&record, &[TemplateRequest::new("PlumberSupp")])
            .await;
        assert_eq!(report.attachments[0].filename, "Supplemental-Application.pdf");

        let seen = generator.seen.lock().unwrap();
        assert_eq!(seen[0].segment.as_deref(), Some("plumber"));
        assert_eq!(seen[0].template_identifier.as_deref(), Some("supp_plumber_v1"));
        assert_eq!(seen[0].request_row.text("segment"), "plumber");
    }

    #[tokio::test]
    async fn test_total_failure() {
        let (renderer, _) = renderer(vec!["acord25_v1"]);
        let report = renderer
            .render(&RequestRecord::new(), &[TemplateRequest::new("ACORD25")])
            .await;
        assert!(report.is_total_failure());
    }

    #[test]
    fn test_attachment_name() {
        assert_eq!(attachment_name(Some("Loss Runs"), "CUSTOM"), "Loss Runs.pdf");
        assert_eq!(attachment_name(Some("a/b.PDF"), "CUSTOM"), "ab.PDF");
        assert_eq!(attachment_name(None, "CUSTOM"), "CUSTOM.pdf");
    }
}
