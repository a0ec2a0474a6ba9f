use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use super::{ExtractEnvelope, VideoExtractor};
use crate::error::ExtractError;
use crate::platform::{VideoPlatform, VideoSource};
use crate::types::ExtractedContent;

/// Calls a platform extraction service.
///
/// YouTube services receive `{"videoId": ...}`, TikTok services `{"url": ...}`.
#[derive(Debug, Clone)]
pub struct HttpExtractor {
    platform: VideoPlatform,
    endpoint: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExtractRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    video_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<&'a str>,
}

impl HttpExtractor {
    pub fn new(platform: VideoPlatform, endpoint: impl Into<String>) -> Result<Self, ExtractError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| ExtractError::RequestFailed(e.to_string()))?;

        Ok(Self {
            platform,
            endpoint: endpoint.into(),
            client,
        })
    }

    fn request_body<'a>(&self, source: &'a VideoSource) -> ExtractRequest<'a> {
        match self.platform {
            VideoPlatform::YouTube => ExtractRequest {
                video_id: Some(source.identifier()),
                url: None,
            },
            VideoPlatform::TikTok => ExtractRequest {
                video_id: None,
                url: Some(source.identifier()),
            },
        }
    }
}

#[async_trait]
impl VideoExtractor for HttpExtractor {
    async fn extract(&self, source: &VideoSource) -> Result<ExtractedContent, ExtractError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&self.request_body(source))
            .send()
            .await
            .map_err(|e| ExtractError::RequestFailed(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ExtractError::RequestFailed(e.to_string()))?;

        match serde_json::from_str::<ExtractEnvelope>(&body) {
            Ok(envelope) => envelope.into_content(),
            Err(_) if !status.is_success() => Err(ExtractError::ApiError {
                status: status.as_u16(),
                message: body,
            }),
            Err(e) => Err(ExtractError::InvalidResponse(e.to_string())),
        }
    }

    fn platform(&self) -> VideoPlatform {
        self.platform
    }
}
