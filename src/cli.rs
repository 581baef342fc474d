//! Command-line front end over the factory, bundles and delivery.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{AppConfig, BundleTable, TemplateCatalog};
use crate::delivery::{self, Attachment, HttpRelayTransport, OutgoingMessage};
use crate::generators::{BundleRenderer, BundleReport, DocumentFactory, Generator, TemplateRequest};
use crate::models::{CoiRequest, Job, RequestRecord};

#[derive(Parser, Debug)]
#[command(name = "acord-pdf-factory")]
#[command(about = "Render insurance submission forms to PDF", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render one form for one record
    Render {
        /// Form id from the forms table (e.g. acord125_v1), or a template alias
        #[arg(long)]
        form: String,

        /// JSON file holding the record
        #[arg(long)]
        record: PathBuf,

        /// Business segment; defaults to the record's own
        #[arg(long)]
        segment: Option<String>,

        #[arg(long, default_value = "out")]
        out: PathBuf,
    },

    /// Render several templates for one record and optionally e-mail them
    Bundle {
        /// Bundle id from the bundles table
        #[arg(long, conflicts_with = "template", required_unless_present = "template")]
        bundle: Option<String>,

        /// Template name or alias (repeatable)
        #[arg(long)]
        template: Vec<String>,

        #[arg(long)]
        record: PathBuf,

        #[command(flatten)]
        output: BundleOutput,
    },

    /// Render a certificate-of-insurance request with its bundle
    Coi {
        /// JSON file holding the COI request
        #[arg(long)]
        request: PathBuf,

        #[command(flatten)]
        output: BundleOutput,
    },
}

#[derive(Args, Debug)]
pub struct BundleOutput {
    #[arg(long, default_value = "out")]
    pub out: PathBuf,

    /// Recipient address (repeatable)
    #[arg(long = "email-to")]
    pub email_to: Vec<String>,

    /// Send to CARRIER_EMAIL when no --email-to is given
    #[arg(long)]
    pub submit: bool,

    #[arg(long)]
    pub subject: Option<String>,
}

impl BundleOutput {
    fn recipients(&self, config: &AppConfig) -> Vec<String> {
        if !self.email_to.is_empty() {
            return self.email_to.clone();
        }
        match (&config.mail.carrier_email, self.submit) {
            (Some(carrier), true) => vec![carrier.clone()],
            _ => Vec::new(),
        }
    }
}

async fn read_json(path: &Path) -> Result<serde_json::Value> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("cannot read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("{} is not valid JSON", path.display()))
}

async fn write_pdf(out: &Path, filename: &str, buffer: &[u8]) -> Result<PathBuf> {
    tokio::fs::create_dir_all(out)
        .await
        .with_context(|| format!("cannot create {}", out.display()))?;
    let path = out.join(filename);
    tokio::fs::write(&path, buffer)
        .await
        .with_context(|| format!("cannot write {}", path.display()))?;
    Ok(path)
}

pub async fn execute(cli: Cli, config: AppConfig) -> Result<()> {
    let catalog = Arc::new(TemplateCatalog::default());
    let factory =
        Arc::new(DocumentFactory::from_config(&config)?.with_catalog(catalog.clone()));

    match cli.command {
        Command::Render {
            form,
            record,
            segment,
            out,
        } => {
            let record = RequestRecord::from_value(read_json(&record).await?);
            let mut job = Job::new(record).with_template(form);
            if let Some(segment) = segment {
                job = job.with_segment(segment);
            }

            let document = factory.generate(job).await?;
            let path = write_pdf(&out, document.filename(), &document.buffer).await?;
            println!("{}", path.display());
            Ok(())
        }
        Command::Bundle {
            bundle,
            template,
            record,
            output,
        } => {
            let record = RequestRecord::from_value(read_json(&record).await?);
            let renderer = BundleRenderer::new(factory, catalog, config.segment.as_str());
            let report = match bundle {
                Some(bundle_id) => {
                    let bundles = BundleTable::load(&config.bundles_config)?;
                    renderer.render_bundle(&bundles, &bundle_id, &record).await?
                }
                None => {
                    let requests: Vec<TemplateRequest> =
                        template.into_iter().map(TemplateRequest::new).collect();
                    renderer.render(&record, &requests).await
                }
            };
            finish_bundle(&config, &record, report, &output).await
        }
        Command::Coi { request, output } => {
            let request: CoiRequest = serde_json::from_value(read_json(&request).await?)
                .context("malformed COI request")?;
            request
                .validate()
                .map_err(|code| anyhow!("COI request rejected: {code}"))?;

            let bundle_id = request.bundle_id().to_string();
            let record = request.into_record(&config.segment);
            let bundles = BundleTable::load(&config.bundles_config)?;
            let renderer = BundleRenderer::new(factory, catalog, config.segment.as_str());
            let report = renderer.render_bundle(&bundles, &bundle_id, &record).await?;
            finish_bundle(&config, &record, report, &output).await
        }
    }
}

/// Write what rendered, print every outcome, then deliver if asked.
async fn finish_bundle(
    config: &AppConfig,
    record: &RequestRecord,
    report: BundleReport,
    output: &BundleOutput,
) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&report.outcomes)?);
    if report.is_total_failure() {
        bail!("no valid PDFs were generated");
    }
    for failure in report.failures() {
        warn!("partial bundle: {} was not rendered", failure.template());
    }

    for attachment in &report.attachments {
        let path = write_pdf(&output.out, &attachment.filename, &attachment.buffer).await?;
        info!("wrote {}", path.display());
    }

    let recipients = output.recipients(config);
    if recipients.is_empty() {
        return Ok(());
    }
    let transport = HttpRelayTransport::from_config(&config.mail)?
        .ok_or_else(|| anyhow!("e-mail requested but MAIL_RELAY_URL is not set"))?;

    let attachments: Vec<Attachment> = report.attachments;
    let message =
        OutgoingMessage::submission(recipients, output.subject.clone(), record, attachments);
    let message_id = delivery::deliver(&transport, &message).await?;
    println!("sent: {message_id}");
    Ok(())
}
