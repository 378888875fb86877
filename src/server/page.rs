//! The upload page served at `/`

use crate::catalog::VisionModelCatalog;
use crate::config::DEFAULT_USER_PROMPT;
use askama::Template;

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate<'a> {
    models: Vec<ModelOption<'a>>,
    default_prompt: &'a str,
}

/// One entry of the model `<select>`
struct ModelOption<'a> {
    id: &'a str,
    selected: bool,
}

/// Render the page with one `<option>` per catalog entry, the default model
/// preselected
pub fn render(catalog: &VisionModelCatalog, default_model: &str) -> askama::Result<String> {
    let models = catalog
        .iter()
        .map(|id| ModelOption {
            id,
            selected: id == default_model,
        })
        .collect();

    IndexTemplate {
        models,
        default_prompt: DEFAULT_USER_PROMPT,
    }
    .render()
}
