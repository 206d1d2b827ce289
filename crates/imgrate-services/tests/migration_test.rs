//! End-to-end pipeline tests against in-memory collaborators.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use imgrate_core::models::{BatchSummary, ProcessOutcome, Question, QuestionUpdate};
use imgrate_core::{AppError, StorageBackend};
use imgrate_db::QuestionStore;
use imgrate_services::{BatchRunner, FetchError, FetchedImage, ImageFetcher, QuestionProcessor};
use imgrate_storage::{Storage, StorageError, StorageResult};
use uuid::Uuid;

#[derive(Default)]
struct FakeStore {
    questions: Mutex<Vec<Question>>,
    updates: Mutex<Vec<(Uuid, QuestionUpdate)>>,
    list_calls: AtomicUsize,
}

impl FakeStore {
    fn with_questions(questions: Vec<Question>) -> Arc<Self> {
        Arc::new(Self {
            questions: Mutex::new(questions),
            ..Self::default()
        })
    }

    fn updates(&self) -> Vec<(Uuid, QuestionUpdate)> {
        self.updates.lock().unwrap().clone()
    }
}

#[async_trait]
impl QuestionStore for FakeStore {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Question>, AppError> {
        Ok(self
            .questions
            .lock()
            .unwrap()
            .iter()
            .find(|q| q.id == id)
            .cloned())
    }

    async fn list_for_chapter(
        &self,
        chapter_id: Uuid,
        skip_processed: bool,
    ) -> Result<Vec<Question>, AppError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .questions
            .lock()
            .unwrap()
            .iter()
            .filter(|q| q.chapter_id == chapter_id)
            .filter(|q| !skip_processed || q.image_storing != Some(true))
            .cloned()
            .collect())
    }

    async fn apply_update(&self, id: Uuid, update: &QuestionUpdate) -> Result<(), AppError> {
        self.updates.lock().unwrap().push((id, update.clone()));
        Ok(())
    }
}

#[derive(Default)]
struct FakeStorage {
    uploads: Mutex<Vec<(String, Option<String>)>>,
    fail_keys_containing: Option<String>,
}

impl FakeStorage {
    fn failing_on(substring: &str) -> Arc<Self> {
        Arc::new(Self {
            fail_keys_containing: Some(substring.to_string()),
            ..Self::default()
        })
    }
}

#[async_trait]
impl Storage for FakeStorage {
    async fn upload(
        &self,
        key: &str,
        _data: Vec<u8>,
        content_type: Option<&str>,
    ) -> StorageResult<String> {
        if let Some(ref fragment) = self.fail_keys_containing {
            if key.contains(fragment.as_str()) {
                return Err(StorageError::UploadFailed {
                    key: key.to_string(),
                    message: "simulated backend failure".to_string(),
                });
            }
        }
        self.uploads
            .lock()
            .unwrap()
            .push((key.to_string(), content_type.map(String::from)));
        Ok(format!(
            "https://storage.googleapis.com/quesimage/{}",
            key
        ))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

#[derive(Default)]
struct FakeFetcher {
    images: HashMap<String, (Vec<u8>, Option<String>)>,
    failing: Vec<String>,
}

impl FakeFetcher {
    fn with_image(mut self, url: &str, content_type: Option<&str>) -> Self {
        self.images.insert(
            url.to_string(),
            (vec![0xAB, 0xCD], content_type.map(String::from)),
        );
        self
    }

    fn with_failure(mut self, url: &str) -> Self {
        self.failing.push(url.to_string());
        self
    }
}

#[async_trait]
impl ImageFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedImage, FetchError> {
        if self.failing.iter().any(|u| u == url) {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: reqwest::StatusCode::NOT_FOUND,
            });
        }
        let (bytes, content_type) = self
            .images
            .get(url)
            .cloned()
            .unwrap_or((vec![0x00], None));
        Ok(FetchedImage {
            bytes,
            content_type,
        })
    }
}

fn question(chapter_id: Uuid) -> Question {
    let now = Utc::now();
    Question {
        id: Uuid::new_v4(),
        chapter_id,
        ques: None,
        options: Vec::new(),
        solution: None,
        image_storing: None,
        created_at: now,
        updated_at: now,
    }
}

#[tokio::test]
async fn test_two_body_images_are_migrated_and_rewritten() {
    let chapter = Uuid::new_v4();
    let mut q = question(chapter);
    q.ques = Some(r#"<p><img src="http://x/a.jpg"/><img src="http://x/b.png"/></p>"#.to_string());

    let store = FakeStore::with_questions(vec![q.clone()]);
    let storage = Arc::new(FakeStorage::default());
    let fetcher = FakeFetcher::default()
        .with_image("http://x/a.jpg", Some("image/jpeg"))
        .with_image("http://x/b.png", Some("image/png"));

    let processor = QuestionProcessor::new(store.clone(), storage.clone(), Arc::new(fetcher));
    let outcome = processor.process(&q).await.unwrap();

    assert_eq!(
        outcome,
        ProcessOutcome::Completed {
            fields_updated: 1,
            images_migrated: 2,
        }
    );

    let updates = store.updates();
    assert_eq!(updates.len(), 1, "exactly one persistence write");
    let (id, update) = &updates[0];
    assert_eq!(*id, q.id);
    assert!(update.image_storing);
    assert!(update.options.is_none());
    assert!(update.solution.is_none());

    let ques = update.ques.as_ref().unwrap();
    let first = format!(
        "https://storage.googleapis.com/quesimage/{}/{}_ques_0.jpg",
        chapter, q.id
    );
    let second = format!(
        "https://storage.googleapis.com/quesimage/{}/{}_ques_1.png",
        chapter, q.id
    );
    assert!(ques.contains(&format!(r#"src="{}""#, first)));
    assert!(ques.contains(&format!(r#"src="{}""#, second)));
    assert!(ques.contains(r#"src_ori="http://x/a.jpg""#));
    assert!(ques.contains(r#"src_ori="http://x/b.png""#));

    let uploads = storage.uploads.lock().unwrap();
    assert_eq!(uploads.len(), 2);
    assert_eq!(uploads[0].1.as_deref(), Some("image/jpeg"));
}

#[tokio::test]
async fn test_question_without_images_gets_marker_only_update() {
    let chapter = Uuid::new_v4();
    let mut q = question(chapter);
    q.ques = Some("<p>text only</p>".to_string());
    q.options = vec![Some("<p>option a</p>".to_string()), None, Some(String::new())];

    let store = FakeStore::with_questions(vec![q.clone()]);
    let processor = QuestionProcessor::new(
        store.clone(),
        Arc::new(FakeStorage::default()),
        Arc::new(FakeFetcher::default()),
    );

    let outcome = processor.process(&q).await.unwrap();
    assert_eq!(
        outcome,
        ProcessOutcome::Completed {
            fields_updated: 0,
            images_migrated: 0,
        }
    );

    let updates = store.updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].1, QuestionUpdate::marker(true));
}

#[tokio::test]
async fn test_option_fetch_failure_marks_question_failed() {
    let chapter = Uuid::new_v4();
    let mut q = question(chapter);
    q.options = vec![
        Some("<p>plain</p>".to_string()),
        Some(r#"<img src="http://x/broken.png"/>"#.to_string()),
    ];

    let store = FakeStore::with_questions(vec![q.clone()]);
    let processor = QuestionProcessor::new(
        store.clone(),
        Arc::new(FakeStorage::default()),
        Arc::new(FakeFetcher::default().with_failure("http://x/broken.png")),
    );

    let outcome = processor.process(&q).await.unwrap();
    assert!(matches!(outcome, ProcessOutcome::Failed { .. }));

    let updates = store.updates();
    assert_eq!(updates.len(), 1, "failure persists exactly one write");
    assert_eq!(updates[0].1, QuestionUpdate::marker(false));
}

#[tokio::test]
async fn test_failure_discards_updates_from_earlier_fields() {
    let chapter = Uuid::new_v4();
    let mut q = question(chapter);
    q.ques = Some(r#"<img src="http://x/good.jpg"/>"#.to_string());
    q.solution = Some(r#"<img src="http://x/bad.png"/>"#.to_string());

    let store = FakeStore::with_questions(vec![q.clone()]);
    let storage = Arc::new(FakeStorage::default());
    let processor = QuestionProcessor::new(
        store.clone(),
        storage.clone(),
        Arc::new(
            FakeFetcher::default()
                .with_image("http://x/good.jpg", Some("image/jpeg"))
                .with_failure("http://x/bad.png"),
        ),
    );

    let outcome = processor.process(&q).await.unwrap();
    assert!(matches!(outcome, ProcessOutcome::Failed { .. }));

    // The body image did upload before the solution failed, but no content
    // field may be persisted.
    assert_eq!(storage.uploads.lock().unwrap().len(), 1);
    let updates = store.updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].1, QuestionUpdate::marker(false));
}

#[tokio::test]
async fn test_option_upload_failure_uses_failure_marker() {
    let chapter = Uuid::new_v4();
    let mut q = question(chapter);
    q.options = vec![Some(r#"<img src="http://x/a.jpg"/>"#.to_string())];

    let store = FakeStore::with_questions(vec![q.clone()]);
    let processor = QuestionProcessor::new(
        store.clone(),
        FakeStorage::failing_on("option0"),
        Arc::new(FakeFetcher::default().with_image("http://x/a.jpg", Some("image/jpeg"))),
    );

    let outcome = processor.process(&q).await.unwrap();
    assert!(matches!(outcome, ProcessOutcome::Failed { .. }));
    assert_eq!(store.updates()[0].1, QuestionUpdate::marker(false));
}

#[tokio::test]
async fn test_options_list_is_rebuilt_at_original_indices() {
    let chapter = Uuid::new_v4();
    let mut q = question(chapter);
    q.options = vec![
        Some("<p>first</p>".to_string()),
        Some(r#"<img src="http://x/opt.png"/>"#.to_string()),
        None,
        Some(String::new()),
    ];

    let store = FakeStore::with_questions(vec![q.clone()]);
    let processor = QuestionProcessor::new(
        store.clone(),
        Arc::new(FakeStorage::default()),
        Arc::new(FakeFetcher::default().with_image("http://x/opt.png", Some("image/png"))),
    );

    processor.process(&q).await.unwrap();

    let updates = store.updates();
    let options = updates[0].1.options.as_ref().unwrap();
    assert_eq!(options.len(), 4);
    assert_eq!(options[0].as_deref(), Some("<p>first</p>"));
    let rewritten = options[1].as_ref().unwrap();
    assert!(rewritten.contains(&format!(
        r#"src="https://storage.googleapis.com/quesimage/{}/{}_option1_0.png""#,
        chapter, q.id
    )));
    assert!(rewritten.contains(r#"src_ori="http://x/opt.png""#));
    assert_eq!(options[2], None);
    assert_eq!(options[3].as_deref(), Some(""));
}

#[tokio::test]
async fn test_batch_continues_past_failed_questions() {
    let chapter = Uuid::new_v4();
    let mut failing = question(chapter);
    failing.ques = Some(r#"<img src="http://x/broken.png"/>"#.to_string());
    let mut passing = question(chapter);
    passing.solution = Some(r#"<img src="http://x/fine.jpg"/>"#.to_string());

    let store = FakeStore::with_questions(vec![failing.clone(), passing.clone()]);
    let processor = QuestionProcessor::new(
        store.clone(),
        Arc::new(FakeStorage::default()),
        Arc::new(
            FakeFetcher::default()
                .with_failure("http://x/broken.png")
                .with_image("http://x/fine.jpg", Some("image/jpeg")),
        ),
    );
    let runner = BatchRunner::new(store.clone(), processor);

    let summary = runner.run(&chapter.to_string(), false).await.unwrap();
    assert_eq!(
        summary,
        BatchSummary {
            succeeded: 1,
            failed: 1,
            total: 2,
        }
    );

    // Both questions were persisted exactly once.
    assert_eq!(store.updates().len(), 2);
}

#[tokio::test]
async fn test_batch_skips_processed_questions_unless_reprocessing() {
    let chapter = Uuid::new_v4();
    let mut done = question(chapter);
    done.image_storing = Some(true);
    let fresh = question(chapter);
    let mut failed_before = question(chapter);
    failed_before.image_storing = Some(false);

    let store = FakeStore::with_questions(vec![done, fresh, failed_before]);
    let processor = QuestionProcessor::new(
        store.clone(),
        Arc::new(FakeStorage::default()),
        Arc::new(FakeFetcher::default()),
    );
    let runner = BatchRunner::new(store.clone(), processor);

    let summary = runner.run(&chapter.to_string(), false).await.unwrap();
    assert_eq!(summary.total, 2, "previously failed and fresh are retried");

    let summary = runner.run(&chapter.to_string(), true).await.unwrap();
    assert_eq!(summary.total, 3, "reprocess includes migrated questions");
}

#[tokio::test]
async fn test_malformed_chapter_id_fails_before_any_query() {
    let store = FakeStore::with_questions(vec![]);
    let processor = QuestionProcessor::new(
        store.clone(),
        Arc::new(FakeStorage::default()),
        Arc::new(FakeFetcher::default()),
    );
    let runner = BatchRunner::new(store.clone(), processor);

    let result = runner.run("not-an-identifier", false).await;
    assert!(matches!(result, Err(AppError::InvalidIdentifier(_))));
    assert_eq!(store.list_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_inspect_dry_run_does_not_persist() {
    let chapter = Uuid::new_v4();
    let mut q = question(chapter);
    q.ques = Some(r#"<img src="http://x/a.jpg"/>"#.to_string());

    let store = FakeStore::with_questions(vec![q.clone()]);
    let storage = Arc::new(FakeStorage::default());
    let processor =
        QuestionProcessor::new(store.clone(), storage.clone(), Arc::new(FakeFetcher::default()));
    let runner = BatchRunner::new(store.clone(), processor);

    let outcome = runner.inspect(&q.id.to_string(), true).await.unwrap();
    assert!(matches!(outcome, ProcessOutcome::Completed { .. }));
    assert!(store.updates().is_empty());
    assert!(storage.uploads.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_inspect_unknown_question_is_not_found() {
    let store = FakeStore::with_questions(vec![]);
    let processor = QuestionProcessor::new(
        store.clone(),
        Arc::new(FakeStorage::default()),
        Arc::new(FakeFetcher::default()),
    );
    let runner = BatchRunner::new(store.clone(), processor);

    let result = runner.inspect(&Uuid::new_v4().to_string(), false).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_inspect_processes_when_not_dry_run() {
    let chapter = Uuid::new_v4();
    let mut q = question(chapter);
    q.ques = Some(r#"<img src="http://x/a.jpg"/>"#.to_string());

    let store = FakeStore::with_questions(vec![q.clone()]);
    let processor = QuestionProcessor::new(
        store.clone(),
        Arc::new(FakeStorage::default()),
        Arc::new(FakeFetcher::default().with_image("http://x/a.jpg", Some("image/jpeg"))),
    );
    let runner = BatchRunner::new(store.clone(), processor);

    let outcome = runner.inspect(&q.id.to_string(), false).await.unwrap();
    assert_eq!(
        outcome,
        ProcessOutcome::Completed {
            fields_updated: 1,
            images_migrated: 1,
        }
    );
    assert_eq!(store.updates().len(), 1);
}
