//! Extraction collaborators: turn a video URL into raw title/description/transcript.
//!
//! One extractor is registered per supported platform. The production
//! implementation calls a remote service over HTTP; tests use [`FakeExtractor`].

mod fake;
mod http;

pub use fake::FakeExtractor;
pub use http::HttpExtractor;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::ExtractError;
use crate::platform::{VideoPlatform, VideoSource};
use crate::types::ExtractedContent;

/// Used when a collaborator reports failure without saying why.
pub const GENERIC_EXTRACT_ERROR: &str = "Failed to extract video content";

#[async_trait]
pub trait VideoExtractor: Send + Sync + fmt::Debug {
    async fn extract(&self, source: &VideoSource) -> Result<ExtractedContent, ExtractError>;

    fn platform(&self) -> VideoPlatform;
}

/// Extractors keyed by the platform they serve.
#[derive(Debug, Clone, Default)]
pub struct ExtractorSet {
    extractors: HashMap<VideoPlatform, Arc<dyn VideoExtractor>>,
}

impl ExtractorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an extractor under its own platform, replacing any previous one.
    pub fn with(mut self, extractor: Arc<dyn VideoExtractor>) -> Self {
        self.extractors.insert(extractor.platform(), extractor);
        self
    }

    pub fn get(&self, platform: VideoPlatform) -> Result<&dyn VideoExtractor, ExtractError> {
        self.extractors
            .get(&platform)
            .map(|e| e.as_ref())
            .ok_or(ExtractError::NotConfigured(platform))
    }
}

/// Envelope returned by the extraction services:
/// `{ "success": bool, "error"?: string, "data"?: {...} }`.
#[derive(Debug, Deserialize)]
pub(crate) struct ExtractEnvelope {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub data: Option<ExtractedContent>,
}

impl ExtractEnvelope {
    pub(crate) fn into_content(self) -> Result<ExtractedContent, ExtractError> {
        if !self.success {
            return Err(ExtractError::Rejected(
                self.error
                    .filter(|e| !e.trim().is_empty())
                    .unwrap_or_else(|| GENERIC_EXTRACT_ERROR.to_string()),
            ));
        }
        self.data
            .ok_or_else(|| ExtractError::Rejected(GENERIC_EXTRACT_ERROR.to_string()))
    }
}
