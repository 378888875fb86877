use crate::analysis::AnalysisResult;
use actix_multipart::form::{bytes::Bytes, text::Text, MultipartForm};
use serde::ser::{Serialize, SerializeMap, Serializer};

/// The multipart form posted to `/analyze`. Every part is optional here so
/// that missing parts turn into readable errors instead of extractor
/// failures
#[derive(MultipartForm)]
pub struct AnalyzeForm {
    pub image: Option<Bytes>,
    pub api_key: Option<Text<String>>,
    pub model: Option<Text<String>>,
    pub system_prompt: Option<Text<String>>,
    pub user_prompt: Option<Text<String>>,
}

/// The value of an optional text part, empty when absent
pub fn text_or_empty(field: Option<Text<String>>) -> String {
    field.map(Text::into_inner).unwrap_or_default()
}

/// Written as `{"success": true, "analysis": ...}` or `{"error": ...}`
impl Serialize for AnalysisResult {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            AnalysisResult::Success { analysis_text } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("success", &true)?;
                map.serialize_entry("analysis", analysis_text)?;
                map.end()
            }
            AnalysisResult::Failure { message } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("error", message)?;
                map.end()
            }
        }
    }
}
