//! Every way an analysis can fail. The `Display` text of each variant is the
//! message returned to the caller in `{"error": ...}`

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("please upload an image")]
    MissingImage,

    #[error("please select an image")]
    NoFileSelected,

    #[error("please enter an OpenRouter API key")]
    MissingApiKey,

    #[error("an error occurred: {0}")]
    Decode(#[source] image::ImageError),

    #[error("an error occurred: {0}")]
    Upload(String),

    #[error("API error: {0}\n\nplease check the API key and model selection")]
    Transport(#[source] reqwest::Error),

    /// The remote answered 2xx but without a usable `choices` entry. Holds
    /// the pretty-printed body
    #[error("error: unexpected response format\n{0}")]
    UnexpectedResponse(String),

    #[error("error: {0}")]
    Encode(#[source] image::ImageError),

    #[error("error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("error: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl AnalysisError {
    /// Coarse failure class, for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingImage | Self::NoFileSelected | Self::MissingApiKey => "validation",
            Self::Decode(_) => "decode",
            Self::Transport(_) => "transport",
            Self::UnexpectedResponse(_) => "protocol",
            Self::Upload(_) | Self::Encode(_) | Self::Json(_) | Self::Task(_) => "unknown",
        }
    }
}
