use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::VideoExtractor;
use crate::error::ExtractError;
use crate::platform::{VideoPlatform, VideoSource};
use crate::types::ExtractedContent;

#[derive(Debug, Clone)]
enum FakeOutcome {
    Content(ExtractedContent),
    Failure(Option<String>),
}

/// Scripted extractor keyed by extractor identifier (video id or URL).
///
/// Unscripted identifiers succeed with a title derived from the identifier.
/// Also records how many calls were in flight at once, so tests can check the
/// scheduler's admission bound from the collaborator's point of view.
#[derive(Debug)]
pub struct FakeExtractor {
    platform: VideoPlatform,
    outcomes: HashMap<String, FakeOutcome>,
    latencies: HashMap<String, Duration>,
    default_latency: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeExtractor {
    pub fn new(platform: VideoPlatform) -> Self {
        Self {
            platform,
            outcomes: HashMap::new(),
            latencies: HashMap::new(),
            default_latency: Duration::ZERO,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_content(mut self, identifier: &str, content: ExtractedContent) -> Self {
        self.outcomes
            .insert(identifier.to_string(), FakeOutcome::Content(content));
        self
    }

    /// Script a reported failure. `None` simulates a failure with no message.
    pub fn with_failure(mut self, identifier: &str, error: Option<&str>) -> Self {
        self.outcomes.insert(
            identifier.to_string(),
            FakeOutcome::Failure(error.map(str::to_string)),
        );
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.default_latency = latency;
        self
    }

    pub fn with_latency_for(mut self, identifier: &str, latency: Duration) -> Self {
        self.latencies.insert(identifier.to_string(), latency);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of overlapping `extract` calls observed.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VideoExtractor for FakeExtractor {
    async fn extract(&self, source: &VideoSource) -> Result<ExtractedContent, ExtractError> {
        let identifier = source.identifier();
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let latency = self
            .latencies
            .get(identifier)
            .copied()
            .unwrap_or(self.default_latency);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.outcomes.get(identifier) {
            Some(FakeOutcome::Content(content)) => Ok(content.clone()),
            Some(FakeOutcome::Failure(Some(message))) => {
                Err(ExtractError::Rejected(message.clone()))
            }
            Some(FakeOutcome::Failure(None)) => Err(ExtractError::Rejected(
                super::GENERIC_EXTRACT_ERROR.to_string(),
            )),
            None => Ok(ExtractedContent {
                title: format!("Recipe from {}", identifier),
                description: format!("A {} video", self.platform),
                transcript: Some("Mix everything and cook until done.".to_string()),
                thumbnail_url: None,
                author: None,
            }),
        }
    }

    fn platform(&self) -> VideoPlatform {
        self.platform
    }
}
