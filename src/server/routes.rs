//! Routes of the front end. `/analyze` accepts the upload form, decodes the
//! image and hands it to the analysis client; every outcome is answered with
//! a JSON `AnalysisResult`

use super::protocol::{text_or_empty, AnalyzeForm};
use super::{page, Server};
use crate::analysis::{AnalysisRequest, AnalysisResult};
use crate::config::DEFAULT_USER_PROMPT;
use crate::error::AnalysisError;
use actix_multipart::form::MultipartForm;
use actix_web::http::header::ContentType;
use actix_web::{get, post, web, HttpResponse, Responder};
use tracing::{debug, info, warn};

/// The upload page
#[get("/")]
pub async fn index(state: web::Data<Server>) -> HttpResponse {
    match page::render(&state.catalog, &state.default_model) {
        Ok(html) => HttpResponse::Ok()
            .content_type(ContentType::html())
            .body(html),
        Err(e) => {
            warn!("failed to render the upload page: {e}");
            HttpResponse::InternalServerError()
                .content_type(ContentType::plaintext())
                .body(format!("template error: {e}"))
        }
    }
}

#[post("/analyze")]
pub async fn analyze(
    form: MultipartForm<AnalyzeForm>,
    state: web::Data<Server>,
) -> impl Responder {
    let result = match parse_form(form.into_inner(), &state).await {
        Ok(request) => state.client.analyze(request).await,
        Err(err) => {
            warn!(kind = err.kind(), "rejected analysis request: {err}");
            AnalysisResult::from(err)
        }
    };

    info!(
        success = result.is_success(),
        "finished serving analysis request"
    );

    web::Json(result)
}

/// Validate the form and decode the uploaded image
async fn parse_form(form: AnalyzeForm, state: &Server) -> Result<AnalysisRequest, AnalysisError> {
    let upload = form.image.ok_or(AnalysisError::MissingImage)?;
    let file_name = upload.file_name.ok_or(AnalysisError::MissingImage)?;
    if file_name.is_empty() {
        return Err(AnalysisError::NoFileSelected);
    }

    debug!(%file_name, bytes = upload.data.len(), "decoding upload");
    let data = upload.data;
    let image = tokio::task::spawn_blocking(move || image::load_from_memory(&data))
        .await?
        .map_err(AnalysisError::Decode)?;

    let model = match text_or_empty(form.model) {
        model if model.is_empty() => state.default_model.clone(),
        model => {
            if !state.catalog.contains(&model) {
                warn!(%model, "model is not in the catalog");
            }
            model
        }
    };

    Ok(AnalysisRequest {
        api_key: text_or_empty(form.api_key),
        model,
        system_prompt: text_or_empty(form.system_prompt),
        user_prompt: form
            .user_prompt
            .map(|p| p.into_inner())
            .unwrap_or_else(|| DEFAULT_USER_PROMPT.to_string()),
        image,
    })
}
