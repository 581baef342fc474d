//! HTML engine: one `index` template rendered once, with the shared print
//! stylesheet and the template's `styles.css` injected into its head.

use std::path::Path;

use super::common::inject_styles;
use super::GeneratorError;
use crate::asset::{load_global_css, read_optional_css};
use crate::models::RequestRecord;
use crate::template::{load_index, BindingContext, TemplateAssets, TemplateRenderer};

pub async fn compose(
    renderer: &TemplateRenderer,
    project_root: &Path,
    dir: &Path,
    record: &RequestRecord,
    assets: &TemplateAssets,
) -> Result<String, GeneratorError> {
    let index = load_index(dir).await?;
    let context = BindingContext::new(record, assets);
    let markup = renderer.render(&index, &context)?;

    let global_css = load_global_css(project_root).await?;
    let local_css = read_optional_css(dir).await?;
    Ok(inject_styles(&markup, &[&global_css, &local_css]))
}
