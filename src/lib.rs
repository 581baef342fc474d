//! Insurance submission document factory.
//!
//! A job (a record plus a form id) goes through field mapping, template
//! binding and a headless-browser print to become a validated PDF. Several
//! templates can be rendered for one record and mailed as a bundle.

pub mod asset;
pub mod cli;
pub mod config;
pub mod delivery;
pub mod generators;
pub mod mapping;
pub mod models;
pub mod print;
pub mod template;

pub use config::AppConfig;
pub use delivery::{deliver, Attachment, DeliveryError, MailTransport, OutgoingMessage};
pub use generators::{
    BundleRenderer, BundleReport, DocumentFactory, FactorySettings, Generator, GeneratorError,
    RenderedDocument, TemplateOutcome, TemplateRequest,
};
pub use models::{Job, RequestRecord};

use clap::Parser;
use env_logger::Env;

pub async fn run() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = cli::Cli::parse();
    let config = AppConfig::from_env()?;
    log::debug!(
        "project root {}, webdriver {}",
        config.project_root.display(),
        config.webdriver_url
    );

    cli::execute(cli, config).await
}
