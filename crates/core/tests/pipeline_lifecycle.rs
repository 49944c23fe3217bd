//! Pipeline lifecycle integration tests.
//!
//! These tests drive the dispatcher end to end with mock collaborators:
//! - Stage sequencing and forwarding only on success
//! - Per-stage concurrency limits
//! - Status message lifecycle across stages
//! - Temp file cleanup with and without archival

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tempfile::TempDir;
use tokio::sync::mpsc;

use tubecast_core::{
    converter::ConverterError,
    downloader::DownloaderError,
    media::MediaPaths,
    pipeline::{
        Collaborators, PipelineConfig, PipelineDispatcher, PipelineError, Stage, TaskEvent,
        STATUS_ERROR, STATUS_FETCHING, STATUS_TRANSCODING,
    },
    testing::{
        fixtures, MessagingOp, MockConverter, MockDownloader, MockMessaging, MockUploader,
        FIRST_MESSAGE_ID,
    },
    uploader::UploadError,
};

const EVENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Test helper wiring a dispatcher to mocks.
struct TestHarness {
    dispatcher: Arc<PipelineDispatcher>,
    downloader: Arc<MockDownloader>,
    converter: Arc<MockConverter>,
    uploader: Arc<MockUploader>,
    messaging: Arc<MockMessaging>,
    events: mpsc::Receiver<TaskEvent>,
    paths: MediaPaths,
    _temp_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        Self::with_archive(false)
    }

    fn with_archive(archive: bool) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let paths = MediaPaths::new(temp_dir.path());

        let downloader = Arc::new(MockDownloader::new(paths.clone()));
        let converter = Arc::new(MockConverter::new(paths.clone()));
        let uploader = Arc::new(MockUploader::new());
        let messaging = Arc::new(MockMessaging::new());

        let collaborators = Collaborators {
            downloader: downloader.clone(),
            converter: converter.clone(),
            uploader: Some(uploader.clone()),
            messaging: messaging.clone(),
        };
        let config = PipelineConfig::default()
            .with_temp_dir(temp_dir.path())
            .with_archive(archive.then(fixtures::archive_feed));

        let (tx, events) = mpsc::channel(256);
        let dispatcher = Arc::new(PipelineDispatcher::with_events(config, collaborators, tx));

        Self {
            dispatcher,
            downloader,
            converter,
            uploader,
            messaging,
            events,
            paths,
            _temp_dir: temp_dir,
        }
    }

    async fn submit(&self, locator: &str) {
        self.dispatcher
            .submit(fixtures::inbound(locator))
            .await
            .expect("submit should be accepted");
    }

    /// Waits until an event matching `pred` arrives, returning it.
    async fn wait_for(&mut self, pred: impl Fn(&TaskEvent) -> bool) -> TaskEvent {
        let events = &mut self.events;
        tokio::time::timeout(EVENT_TIMEOUT, async {
            loop {
                let event = events.recv().await.expect("event channel closed");
                if pred(&event) {
                    return event;
                }
            }
        })
        .await
        .expect("timed out waiting for event")
    }

    /// Collects events until `count` tasks reached a terminal event.
    async fn collect_terminal(&mut self, count: usize) -> Vec<TaskEvent> {
        let mut collected = Vec::new();
        let mut terminal = 0;
        while terminal < count {
            let event = self.wait_for(|_| true).await;
            if matches!(event, TaskEvent::CleanedUp { .. } | TaskEvent::Failed { .. }) {
                terminal += 1;
            }
            collected.push(event);
        }
        collected
    }

    async fn temp_files(&self) -> Vec<String> {
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(self.paths.dir()).await.unwrap();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        names.sort();
        names
    }
}

#[tokio::test]
async fn test_single_segment_without_archive() {
    let mut harness = TestHarness::new();
    harness.dispatcher.start(1, 1, 1).await.unwrap();

    harness.submit("https://example.com/watch?v=abc").await;
    let cleaned = harness
        .wait_for(|e| matches!(e, TaskEvent::CleanedUp { .. }))
        .await;

    // Source media and the one segment.
    assert!(matches!(cleaned, TaskEvent::CleanedUp { files_removed: 2, .. }));
    assert!(harness.temp_files().await.is_empty());

    let ops = harness.messaging.recorded_ops().await;
    assert_eq!(ops.len(), 5, "unexpected ops: {:?}", ops);
    assert_eq!(
        ops[0],
        MessagingOp::Send {
            chat_id: fixtures::CHAT_ID,
            message_id: FIRST_MESSAGE_ID,
            text: STATUS_FETCHING.to_string(),
        }
    );
    assert_eq!(
        ops[1],
        MessagingOp::Delete {
            chat_id: fixtures::CHAT_ID,
            message_id: 1,
        }
    );
    assert_eq!(
        ops[2],
        MessagingOp::Edit {
            chat_id: fixtures::CHAT_ID,
            message_id: FIRST_MESSAGE_ID,
            text: format!("{}{}", STATUS_FETCHING, STATUS_TRANSCODING),
        }
    );
    match &ops[3] {
        MessagingOp::SendAudio { chat_id, delivery } => {
            assert_eq!(*chat_id, fixtures::CHAT_ID);
            assert_eq!(delivery.title, "Title abc : 00");
        }
        other => panic!("expected audio delivery, got {:?}", other),
    }
    assert_eq!(
        ops[4],
        MessagingOp::Delete {
            chat_id: fixtures::CHAT_ID,
            message_id: FIRST_MESSAGE_ID,
        }
    );

    assert_eq!(harness.uploader.upload_count().await, 0);
    harness.dispatcher.stop().await;
}

#[tokio::test]
async fn test_multi_segment_with_archive() {
    let mut harness = TestHarness::with_archive(true);
    harness.converter.set_segment_count(3).await;
    harness.converter.set_write_full_audio(true).await;
    harness.dispatcher.start(1, 1, 1).await.unwrap();

    harness.submit("https://example.com/watch?v=talk42").await;
    let archived = harness
        .wait_for(|e| matches!(e, TaskEvent::Archived { .. }))
        .await;
    harness
        .wait_for(|e| matches!(e, TaskEvent::CleanedUp { .. }))
        .await;

    match archived {
        TaskEvent::Archived { item_id, feed_url, .. } => {
            assert_eq!(item_id, "youtube-audio-42-talk42");
            assert!(feed_url.contains("youtube-audio-42-"));
        }
        other => panic!("unexpected event {:?}", other),
    }

    let titles: Vec<String> = harness
        .messaging
        .audios()
        .await
        .into_iter()
        .map(|a| a.title)
        .collect();
    assert_eq!(
        titles,
        vec!["Title talk42 : 02", "Title talk42 : 01", "Title talk42 : 00"]
    );

    let uploads = harness.uploader.recorded_uploads().await;
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].media_id, "talk42");
    assert!(harness.temp_files().await.is_empty());

    harness.dispatcher.stop().await;
}

#[tokio::test]
async fn test_status_message_is_shared_across_stages() {
    let mut harness = TestHarness::with_archive(true);
    harness.dispatcher.start(1, 1, 1).await.unwrap();

    harness.submit("https://example.com/watch?v=abc").await;
    harness
        .wait_for(|e| matches!(e, TaskEvent::CleanedUp { .. }))
        .await;

    let edits = harness.messaging.edits().await;
    assert_eq!(edits.len(), 3);
    assert!(edits.iter().all(|(id, _)| *id == FIRST_MESSAGE_ID));
    // Every edit extends the previous text.
    for pair in edits.windows(2) {
        assert!(pair[1].1.starts_with(&pair[0].1));
    }
    assert!(edits[2].1.contains("*Done!*"));
    assert_eq!(harness.messaging.deleted().await, vec![1, FIRST_MESSAGE_ID]);

    harness.dispatcher.stop().await;
}

#[tokio::test]
async fn test_fetch_failure_is_not_forwarded() {
    let mut harness = TestHarness::new();
    harness
        .downloader
        .set_next_error(DownloaderError::info_failed("private video"))
        .await;
    harness.dispatcher.start(1, 1, 1).await.unwrap();

    harness.submit("https://example.com/watch?v=abc").await;
    let failed = harness
        .wait_for(|e| matches!(e, TaskEvent::Failed { .. }))
        .await;

    assert!(matches!(failed, TaskEvent::Failed { stage: Stage::Fetch, .. }));
    assert_eq!(harness.converter.transcode_count().await, 0);
    assert!(harness.messaging.audios().await.is_empty());

    let edits = harness.messaging.edits().await;
    assert_eq!(edits, vec![(FIRST_MESSAGE_ID, format!("{}{}", STATUS_FETCHING, STATUS_ERROR))]);

    let status = harness.dispatcher.status();
    assert_eq!(status.fetch_pool.total_failed, 1);
    assert_eq!(status.transcode_pool.total_processed, 0);

    harness.dispatcher.stop().await;
}

#[tokio::test]
async fn test_transcode_failure_leaves_temp_files() {
    let mut harness = TestHarness::new();
    harness
        .converter
        .set_next_error(ConverterError::conversion_failed("corrupt stream", None))
        .await;
    harness.dispatcher.start(1, 1, 1).await.unwrap();

    harness.submit("https://example.com/watch?v=abc").await;
    let failed = harness
        .wait_for(|e| matches!(e, TaskEvent::Failed { .. }))
        .await;

    assert!(matches!(failed, TaskEvent::Failed { stage: Stage::Transcode, .. }));
    assert!(harness.messaging.audios().await.is_empty());
    // Status message stays with the error annotation; the source stays on disk.
    assert_eq!(harness.messaging.deleted().await, vec![1]);
    assert_eq!(harness.temp_files().await, vec!["abc.mp4"]);

    harness.dispatcher.stop().await;
}

#[tokio::test]
async fn test_archive_failure_leaves_temp_files() {
    let mut harness = TestHarness::with_archive(true);
    harness
        .uploader
        .set_next_error(UploadError::ConnectionFailed("reset by peer".to_string()))
        .await;
    harness.dispatcher.start(1, 1, 1).await.unwrap();

    harness.submit("https://example.com/watch?v=abc").await;
    let failed = harness
        .wait_for(|e| matches!(e, TaskEvent::Failed { .. }))
        .await;

    match failed {
        TaskEvent::Failed { stage, error, .. } => {
            assert_eq!(stage, Stage::Publish);
            assert!(error.contains("reset by peer"));
        }
        other => panic!("unexpected event {:?}", other),
    }
    assert_eq!(harness.messaging.audios().await.len(), 1);
    assert_eq!(harness.temp_files().await, vec!["abc.00.mp3", "abc.mp4"]);
    assert_eq!(harness.messaging.deleted().await, vec![1]);

    harness.dispatcher.stop().await;
}

#[tokio::test]
async fn test_events_follow_stage_order() {
    let mut harness = TestHarness::new();
    harness.dispatcher.start(1, 1, 1).await.unwrap();

    harness.submit("https://example.com/watch?v=abc").await;
    let events = harness.collect_terminal(1).await;

    let kinds: Vec<&str> = events
        .iter()
        .map(|e| match e {
            TaskEvent::Fetched { .. } => "fetched",
            TaskEvent::Transcoded { .. } => "transcoded",
            TaskEvent::Delivered { .. } => "delivered",
            TaskEvent::Archived { .. } => "archived",
            TaskEvent::CleanedUp { .. } => "cleaned_up",
            TaskEvent::Failed { .. } => "failed",
        })
        .collect();
    assert_eq!(kinds, vec!["fetched", "transcoded", "delivered", "cleaned_up"]);

    let task_id = events[0].task_id();
    assert!(events.iter().all(|e| e.task_id() == task_id));

    harness.dispatcher.stop().await;
}

#[tokio::test]
async fn test_worker_pools_bound_concurrency() {
    let mut harness = TestHarness::new();
    harness.downloader.set_delay(Duration::from_millis(50)).await;
    harness.converter.set_delay(Duration::from_millis(50)).await;
    // Slower than transcoding so publish jobs overlap.
    harness
        .messaging
        .set_audio_delay(Duration::from_millis(150))
        .await;
    harness.dispatcher.start(2, 1, 2).await.unwrap();

    let tasks = 6;
    let submissions = (0..tasks).map(|i| {
        harness
            .dispatcher
            .submit(fixtures::inbound(&format!("https://example.com/watch?v=vid{}", i)))
    });
    for result in join_all(submissions).await {
        result.expect("submit should be accepted");
    }

    let events = harness.collect_terminal(tasks).await;
    let cleaned = events
        .iter()
        .filter(|e| matches!(e, TaskEvent::CleanedUp { .. }))
        .count();
    assert_eq!(cleaned, tasks);

    assert_eq!(harness.downloader.probe().peak(), 2);
    assert_eq!(harness.converter.probe().peak(), 1);
    assert_eq!(harness.messaging.audio_probe().peak(), 2);
    assert_eq!(harness.messaging.audios().await.len(), tasks);
    assert!(harness.temp_files().await.is_empty());

    let status = harness.dispatcher.status();
    for stage in Stage::ALL {
        assert_eq!(status.pool(stage).total_processed, tasks as u64);
        assert_eq!(status.pool(stage).total_failed, 0);
    }

    harness.dispatcher.stop().await;
}

#[tokio::test]
async fn test_tasks_get_their_own_status_messages() {
    let mut harness = TestHarness::new();
    harness.dispatcher.start(1, 1, 1).await.unwrap();

    harness.submit("https://example.com/watch?v=first").await;
    harness.submit("https://example.com/watch?v=second").await;
    harness.collect_terminal(2).await;

    let sent = harness.messaging.sent().await;
    assert_eq!(sent.len(), 2);
    assert_ne!(sent[0].1, sent[1].1);

    let deleted = harness.messaging.deleted().await;
    assert!(deleted.contains(&sent[0].1));
    assert!(deleted.contains(&sent[1].1));
    assert_eq!(harness.converter.recorded_transcodes().await, vec!["first", "second"]);

    harness.dispatcher.stop().await;
}

#[tokio::test]
async fn test_submit_after_stop_is_rejected() {
    let mut harness = TestHarness::new();
    harness.downloader.set_delay(Duration::from_millis(200)).await;
    harness.dispatcher.start(1, 1, 1).await.unwrap();

    harness.submit("https://example.com/watch?v=abc").await;
    harness
        .wait_for(|e| matches!(e, TaskEvent::Fetched { .. }))
        .await;

    tokio::time::timeout(EVENT_TIMEOUT, harness.dispatcher.stop())
        .await
        .expect("stop should not hang");
    assert!(!harness.dispatcher.is_running());

    let result = harness
        .dispatcher
        .submit(fixtures::inbound("https://example.com/watch?v=late"))
        .await;
    assert!(matches!(result, Err(PipelineError::NotRunning)));
    assert_eq!(harness.downloader.fetch_count().await, 1);
}
