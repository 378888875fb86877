//! The user-facing web server: an upload page and the JSON analysis route

use crate::analysis::{AnalysisClient, AnalysisResult};
use crate::catalog::VisionModelCatalog;
use crate::error::AnalysisError;
use crate::settings::Settings;
use actix_multipart::form::MultipartFormConfig;
use actix_multipart::MultipartError;
use actix_web::error::PayloadError;
use actix_web::http::header::ContentType;
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse};
use anyhow::Result;

mod page;
pub mod protocol;
pub mod routes;

/// State shared by every handler. Read-only after startup
#[derive(Debug)]
pub struct Server {
    pub catalog: VisionModelCatalog,
    pub client: AnalysisClient,

    /// Model used when a request leaves `model` empty
    pub default_model: String,

    pub max_upload_bytes: usize,
}

impl Server {
    pub fn new(settings: &Settings) -> Result<Self> {
        let catalog = settings.catalog()?;
        let default_model = settings.default_model(&catalog);
        Ok(Server {
            client: AnalysisClient::new(settings)?,
            catalog,
            default_model,
            max_upload_bytes: settings.max_upload_bytes,
        })
    }
}

/// Register the shared state, upload limits and routes
pub fn configure(server: web::Data<Server>) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        let limit = server.max_upload_bytes;
        cfg.app_data(server)
            .app_data(upload_config(limit))
            .service(routes::index)
            .service(routes::analyze);
    }
}

fn upload_config(limit: usize) -> MultipartFormConfig {
    MultipartFormConfig::default()
        .total_limit(limit)
        .memory_limit(limit)
        .error_handler(move |err, _req| WebError::upload(err, limit).into())
}

/// A request that failed before reaching the handler, rendered as
/// `{"error": ...}`
#[derive(Debug)]
pub struct WebError {
    err: AnalysisError,
    status: StatusCode,
}

impl WebError {
    /// Oversized uploads are refused with 413. Anything else keeps the
    /// usual 200 with the error in the body
    fn upload(err: MultipartError, limit: usize) -> Self {
        match err {
            MultipartError::Payload(PayloadError::Overflow) => WebError {
                err: AnalysisError::Upload(format!(
                    "the upload exceeds the {} limit",
                    human_size(limit)
                )),
                status: StatusCode::PAYLOAD_TOO_LARGE,
            },
            err => WebError {
                err: AnalysisError::Upload(err.to_string()),
                status: StatusCode::OK,
            },
        }
    }
}

impl std::fmt::Display for WebError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.err)
    }
}

impl actix_web::error::ResponseError for WebError {
    fn error_response(&self) -> HttpResponse {
        tracing::warn!(kind = self.err.kind(), status = %self.status, "rejected upload: {}", self.err);

        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .json(AnalysisResult::Failure {
                message: self.to_string(),
            })
    }

    fn status_code(&self) -> StatusCode {
        self.status
    }
}

fn human_size(bytes: usize) -> String {
    const MIB: usize = 1024 * 1024;
    match bytes % MIB {
        0 => format!("{} MiB", bytes / MIB),
        _ => format!("{bytes} bytes"),
    }
}
