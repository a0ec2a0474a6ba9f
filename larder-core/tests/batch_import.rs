use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use larder_core::extract::{ExtractorSet, FakeExtractor};
use larder_core::generate::FakeGenerator;
use larder_core::platform::VideoPlatform;
use larder_core::store::MemoryStore;
use larder_core::{
    BatchError, BatchImporter, BatchSummary, CacheInvalidator, ImportBatch, ImportEvent,
    ImporterConfig, ListingView, MAX_BATCH_SIZE,
};
use tokio::sync::mpsc;
use uuid::Uuid;

#[derive(Default)]
struct RecordingInvalidator {
    calls: Mutex<Vec<(Uuid, Vec<ListingView>)>>,
}

impl RecordingInvalidator {
    fn calls(&self) -> Vec<(Uuid, Vec<ListingView>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CacheInvalidator for RecordingInvalidator {
    async fn invalidate(&self, owner: Uuid, views: &[ListingView]) {
        self.calls.lock().unwrap().push((owner, views.to_vec()));
    }
}

struct Harness {
    youtube: Arc<FakeExtractor>,
    tiktok: Arc<FakeExtractor>,
    store: Arc<MemoryStore>,
    invalidator: Arc<RecordingInvalidator>,
    importer: BatchImporter,
}

fn harness(
    youtube: FakeExtractor,
    tiktok: FakeExtractor,
    generator: FakeGenerator,
    store: MemoryStore,
    concurrency: usize,
) -> Harness {
    let youtube = Arc::new(youtube);
    let tiktok = Arc::new(tiktok);
    let store = Arc::new(store);
    let invalidator = Arc::new(RecordingInvalidator::default());

    let importer = BatchImporter::new(
        ExtractorSet::new().with(youtube.clone()).with(tiktok.clone()),
        Arc::new(generator),
        store.clone(),
        invalidator.clone(),
        ImporterConfig {
            concurrency,
            ..ImporterConfig::default()
        },
    );

    Harness {
        youtube,
        tiktok,
        store,
        invalidator,
        importer,
    }
}

fn default_harness(concurrency: usize) -> Harness {
    harness(
        FakeExtractor::new(VideoPlatform::YouTube),
        FakeExtractor::new(VideoPlatform::TikTok),
        FakeGenerator::new(),
        MemoryStore::new(),
        concurrency,
    )
}

fn batch(urls: &[&str]) -> ImportBatch {
    ImportBatch::new(urls.iter().map(|u| u.to_string()).collect()).unwrap()
}

fn youtube_urls(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("https://youtu.be/vid{}", i)).collect()
}

async fn drain(mut rx: mpsc::UnboundedReceiver<ImportEvent>) -> Vec<ImportEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

fn complete(events: &[ImportEvent]) -> &BatchSummary {
    match events.last() {
        Some(ImportEvent::Complete(summary)) => summary,
        other => panic!("expected complete as final event, got {:?}", other),
    }
}

#[tokio::test]
async fn every_task_reports_exactly_once() {
    let h = default_harness(3);
    let urls = [
        "https://youtu.be/AAA",
        "https://vimeo.com/1",
        "https://www.tiktok.com/@cook/video/123",
        "https://www.youtube.com/watch?v=BBB",
        "not a url",
        "https://www.youtube.com/shorts/CCC",
        "https://vm.tiktok.com/ZMshort/",
    ];

    let rx = h.importer.start(Uuid::new_v4(), batch(&urls)).unwrap();
    let events = drain(rx).await;
    let summary = complete(&events);

    assert_eq!(summary.total_processed, urls.len());
    assert_eq!(summary.successful.len() + summary.failed.len(), urls.len());

    let indices: BTreeSet<usize> = summary
        .successful
        .iter()
        .chain(summary.failed.iter())
        .map(|r| r.index)
        .collect();
    assert_eq!(indices, (0..urls.len()).collect::<BTreeSet<_>>());

    let failed: Vec<usize> = summary.failed.iter().map(|r| r.index).collect();
    assert_eq!(failed, vec![1, 4]);
    assert!(summary
        .failed
        .iter()
        .all(|r| r.error.as_deref() == Some("unsupported URL")));

    let starts = events
        .iter()
        .filter(|e| matches!(e, ImportEvent::Start { .. }))
        .count();
    let progress: Vec<usize> = events
        .iter()
        .filter_map(|e| match e {
            ImportEvent::Progress { progress, .. } => Some(progress.current),
            _ => None,
        })
        .collect();
    assert_eq!(starts, urls.len());
    assert_eq!(progress, (1..=urls.len()).collect::<Vec<_>>());
}

#[tokio::test(start_paused = true)]
async fn never_more_than_w_pipelines_in_flight() {
    let h = harness(
        FakeExtractor::new(VideoPlatform::YouTube)
            .with_latency(Duration::from_millis(50))
            .with_latency_for("vid4", Duration::from_millis(400)),
        FakeExtractor::new(VideoPlatform::TikTok),
        FakeGenerator::new(),
        MemoryStore::new(),
        3,
    );

    let batch = ImportBatch::new(youtube_urls(12)).unwrap();
    let rx = h.importer.start(Uuid::new_v4(), batch).unwrap();
    let summary = complete(&drain(rx).await).clone();

    assert_eq!(summary.successful.len(), 12);
    assert_eq!(h.youtube.call_count(), 12);
    assert_eq!(h.youtube.max_in_flight(), 3);
}

#[tokio::test(start_paused = true)]
async fn slow_task_does_not_hold_back_the_window() {
    let h = harness(
        FakeExtractor::new(VideoPlatform::YouTube)
            .with_latency(Duration::from_millis(10))
            .with_latency_for("vid0", Duration::from_secs(5)),
        FakeExtractor::new(VideoPlatform::TikTok),
        FakeGenerator::new(),
        MemoryStore::new(),
        2,
    );

    let batch = ImportBatch::new(youtube_urls(6)).unwrap();
    let events = drain(h.importer.start(Uuid::new_v4(), batch).unwrap()).await;

    // The other slot keeps draining the batch while index 0 is still running.
    let finished: Vec<usize> = events
        .iter()
        .filter_map(|e| match e {
            ImportEvent::Progress { result, .. } => Some(result.index),
            _ => None,
        })
        .collect();
    assert_eq!(finished.last(), Some(&0));
    assert_eq!(finished.len(), 6);
    assert_eq!(h.youtube.max_in_flight(), 2);
}

#[tokio::test]
async fn one_failure_does_not_affect_siblings() {
    let h = harness(
        FakeExtractor::new(VideoPlatform::YouTube).with_failure("vid2", None),
        FakeExtractor::new(VideoPlatform::TikTok),
        FakeGenerator::new(),
        MemoryStore::new(),
        3,
    );

    let batch = ImportBatch::new(youtube_urls(5)).unwrap();
    let summary = complete(&drain(h.importer.start(Uuid::new_v4(), batch).unwrap()).await).clone();

    assert_eq!(summary.successful.len(), 4);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].index, 2);
    assert_eq!(
        summary.failed[0].error.as_deref(),
        Some("Failed to extract video content")
    );
    assert_eq!(h.store.recipes().len(), 4);
}

#[tokio::test(start_paused = true)]
async fn concurrent_same_name_recipes_get_distinct_slugs() {
    let mut generator = FakeGenerator::new();
    for i in 0..6 {
        generator = generator.with_name_for(&format!("Recipe from vid{}", i), "Pad Thai");
    }
    let store = MemoryStore::new().with_latency(Duration::from_millis(5));
    store.fail_next_recipe_inserts(2);
    let h = harness(
        FakeExtractor::new(VideoPlatform::YouTube),
        FakeExtractor::new(VideoPlatform::TikTok),
        generator,
        store,
        3,
    );

    let owner = Uuid::new_v4();
    let batch = ImportBatch::new(youtube_urls(6)).unwrap();
    let summary = complete(&drain(h.importer.start(owner, batch).unwrap()).await).clone();

    assert_eq!(summary.successful.len(), 6, "{:?}", summary.failed);
    let recipes = h.store.recipes_for(owner);
    let slugs: HashSet<&str> = recipes.iter().map(|r| r.slug.as_str()).collect();
    assert_eq!(slugs.len(), 6);
    assert!(slugs.iter().all(|s| s.starts_with("pad-thai-")));
}

#[tokio::test(start_paused = true)]
async fn shared_new_tag_is_created_once() {
    let h = harness(
        FakeExtractor::new(VideoPlatform::YouTube),
        FakeExtractor::new(VideoPlatform::TikTok),
        FakeGenerator::new().with_tags(["Weeknight", "weeknight "]),
        MemoryStore::new().with_latency(Duration::from_millis(5)),
        4,
    );

    let owner = Uuid::new_v4();
    let batch = ImportBatch::new(youtube_urls(8)).unwrap();
    let summary = complete(&drain(h.importer.start(owner, batch).unwrap()).await).clone();

    assert_eq!(summary.successful.len(), 8, "{:?}", summary.failed);
    assert_eq!(h.store.tag_count(), 1);
    assert_eq!(h.store.tag_creates(), 1);

    let tag_id = h.store.tag("weeknight").unwrap().id;
    for recipe in h.store.recipes_for(owner) {
        assert_eq!(recipe.tag_ids, vec![tag_id]);
    }
}

#[tokio::test]
async fn oversized_batch_is_rejected_before_any_work() {
    let h = default_harness(3);
    let urls = youtube_urls(MAX_BATCH_SIZE + 1);

    let err = ImportBatch::new(urls).unwrap_err();
    assert_eq!(err, BatchError::TooLarge { max: 20, got: 21 });
    assert_eq!(h.youtube.call_count(), 0);
    assert!(h.store.recipes().is_empty());
}

#[tokio::test]
async fn youtube_succeeds_while_tiktok_fails() {
    let h = harness(
        FakeExtractor::new(VideoPlatform::YouTube),
        FakeExtractor::new(VideoPlatform::TikTok)
            .with_failure("https://www.tiktok.com/@u/video/BBB", Some("Video unavailable")),
        FakeGenerator::new().with_name_for("Recipe from AAA", "Chili Oil Noodles"),
        MemoryStore::new(),
        3,
    );
    let owner = Uuid::new_v4();

    let events = drain(
        h.importer
            .start(
                owner,
                batch(&["https://youtu.be/AAA", "https://www.tiktok.com/@u/video/BBB"]),
            )
            .unwrap(),
    )
    .await;

    let starts = events
        .iter()
        .filter(|e| matches!(e, ImportEvent::Start { .. }))
        .count();
    let progress = events
        .iter()
        .filter(|e| matches!(e, ImportEvent::Progress { .. }))
        .count();
    assert_eq!(starts, 2);
    assert_eq!(progress, 2);
    assert_eq!(events.len(), 5);

    let summary = complete(&events);
    assert_eq!(summary.successful.len(), 1);
    assert_eq!(summary.successful[0].index, 0);
    assert_eq!(
        summary.successful[0].recipe_name.as_deref(),
        Some("Chili Oil Noodles")
    );
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].index, 1);
    assert_eq!(summary.failed[0].error.as_deref(), Some("Video unavailable"));

    assert_eq!(h.tiktok.call_count(), 1);
    assert_eq!(
        h.invalidator.calls(),
        vec![(owner, vec![ListingView::Recipes, ListingView::Tags])]
    );
}

#[tokio::test]
async fn all_failures_skip_cache_invalidation() {
    let h = default_harness(3);

    let events = drain(
        h.importer
            .start(Uuid::new_v4(), batch(&["https://vimeo.com/1", "ftp://x"]))
            .unwrap(),
    )
    .await;

    assert_eq!(complete(&events).failed.len(), 2);
    assert!(h.invalidator.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn processing_continues_after_caller_disconnects() {
    let h = harness(
        FakeExtractor::new(VideoPlatform::YouTube).with_latency(Duration::from_millis(100)),
        FakeExtractor::new(VideoPlatform::TikTok),
        FakeGenerator::new(),
        MemoryStore::new(),
        2,
    );
    let owner = Uuid::new_v4();

    let (tx, rx) = mpsc::unbounded_channel();
    drop(rx);
    let summary = h
        .importer
        .run(owner, ImportBatch::new(youtube_urls(5)).unwrap(), tx)
        .await;

    assert_eq!(summary.successful.len(), 5);
    assert_eq!(h.store.recipes_for(owner).len(), 5);
    assert_eq!(h.invalidator.calls().len(), 1);
}

struct PanickingInvalidator;

#[async_trait]
impl CacheInvalidator for PanickingInvalidator {
    async fn invalidate(&self, _owner: Uuid, _views: &[ListingView]) {
        panic!("listing cache unavailable");
    }
}

#[tokio::test]
async fn orchestration_failure_ends_stream_with_error() {
    let store = Arc::new(MemoryStore::new());
    let importer = BatchImporter::new(
        ExtractorSet::new().with(Arc::new(FakeExtractor::new(VideoPlatform::YouTube))),
        Arc::new(FakeGenerator::new()),
        store.clone(),
        Arc::new(PanickingInvalidator),
        ImporterConfig::default(),
    );
    let owner = Uuid::new_v4();

    let events = drain(importer.start(owner, batch(&["https://youtu.be/AAA"])).unwrap()).await;

    let names: Vec<&str> = events.iter().map(|e| e.event_name()).collect();
    assert_eq!(names, vec!["start", "progress", "error"]);
    assert!(!events
        .iter()
        .any(|e| matches!(e, ImportEvent::Complete(_))));
    match &events[2] {
        ImportEvent::Error { error } => assert!(!error.is_empty()),
        other => panic!("expected error event, got {:?}", other),
    }
    // Results already streamed stay saved.
    assert_eq!(store.recipes_for(owner).len(), 1);
}
