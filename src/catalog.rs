//! The list of vision-capable models offered to the user

use anyhow::{anyhow, Result};

/// An ordered, non-empty list of model identifiers. Built once at startup
/// and shared read-only between requests
#[derive(Debug, Clone, PartialEq)]
pub struct VisionModelCatalog(Vec<String>);

impl VisionModelCatalog {
    pub fn new(models: Vec<String>) -> Result<Self> {
        let models: Vec<String> = models
            .into_iter()
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .collect();

        match models.is_empty() {
            true => Err(anyhow!("the model catalog must list at least one model")),
            false => Ok(Self(models)),
        }
    }

    /// The first listed model
    pub fn first(&self) -> &str {
        &self.0[0]
    }

    pub fn contains(&self, model: &str) -> bool {
        self.0.iter().any(|m| m == model)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl Default for VisionModelCatalog {
    fn default() -> Self {
        Self(
            crate::config::VISION_MODELS
                .iter()
                .map(|m| m.to_string())
                .collect(),
        )
    }
}
