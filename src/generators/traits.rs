//! Traits for generator system standardization.

use async_trait::async_trait;

use super::{GeneratorError, RenderedDocument};
use crate::models::Job;

/// Anything that can turn a job into a rendered document.
///
/// The batch renderer only depends on this trait, so a single-template
/// factory, a test double or a remote renderer can all sit behind it.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, job: Job) -> Result<RenderedDocument, GeneratorError>;
}
