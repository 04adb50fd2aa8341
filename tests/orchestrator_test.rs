//! End-to-end orchestration against in-process fakes

mod common;

use common::{
    ASSISTANT_REPLY, FakeAssistant, FakeImageHost, FakeVision, init_logging, test_config,
};
use layover_fuel::{
    Error, ImageCategory, MessageContentInput, MessageRole, Orchestrator, RunStatus,
};
use std::sync::Arc;
use std::sync::atomic::Ordering;

const PNG: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk+M9QDwADhgGAWjR9awAAAABJRU5ErkJggg==";

struct Harness {
    assistant: Arc<FakeAssistant>,
    images: Arc<FakeImageHost>,
    vision: Arc<FakeVision>,
    orchestrator: Orchestrator,
}

fn harness(assistant: FakeAssistant, vision: FakeVision) -> Harness {
    init_logging();
    let assistant = Arc::new(assistant);
    let images = Arc::new(FakeImageHost::default());
    let vision = Arc::new(vision);
    let orchestrator = Orchestrator::new(
        &test_config(),
        assistant.clone(),
        images.clone(),
        vision.clone(),
    );
    Harness {
        assistant,
        images,
        vision,
        orchestrator,
    }
}

fn texts(parts: &[MessageContentInput]) -> Vec<String> {
    parts
        .iter()
        .filter_map(|p| match p {
            MessageContentInput::Text { text } => Some(text.clone()),
            MessageContentInput::ImageUrl { .. } => None,
        })
        .collect()
}

#[tokio::test]
async fn test_meal_photo_turn_end_to_end() {
    let h = harness(FakeAssistant::completing(), FakeVision::classifying("meal_photo"));

    let conversation = h
        .orchestrator
        .send(None, Some("pairs with steak"), &[PNG.to_string()])
        .await
        .expect("turn completes");

    assert_eq!(
        h.assistant.calls(),
        ["create_thread", "create_message", "create_run", "list_messages"]
    );
    assert_eq!(h.images.uploads.load(Ordering::SeqCst), 1);
    assert_eq!(h.assistant.status_checks.load(Ordering::SeqCst), 3);

    let appended = h.assistant.appended.lock().unwrap();
    let (thread_id, parts) = &appended[0];
    assert_eq!(thread_id, &conversation.thread_id);
    assert_eq!(parts.len(), 2);
    let text = &texts(parts)[0];
    assert!(text.contains("photo of a meal"));
    assert!(text.contains("pairs with steak"));
    assert!(text.starts_with("You are a test persona."));
    assert_eq!(parts[1], MessageContentInput::image_url("https://img.test/upload_1.png"));

    let messages = &conversation.messages;
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, MessageRole::User);
    assert_eq!(messages[0].image_refs, ["https://img.test/upload_1.png"]);
    let last = messages.last().unwrap();
    assert_eq!(last.role, MessageRole::Assistant);
    assert_eq!(last.texts, [ASSISTANT_REPLY]);
}

#[tokio::test]
async fn test_empty_turn_rejected_before_any_call() {
    let h = harness(FakeAssistant::completing(), FakeVision::classifying("meal_photo"));

    for text in [None, Some(""), Some("  \n ")] {
        let result = h.orchestrator.send(None, text, &[]).await;
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    assert!(h.assistant.calls().is_empty());
    assert_eq!(h.images.uploads.load(Ordering::SeqCst), 0);
    assert_eq!(h.vision.request_count(), 0);
}

#[tokio::test]
async fn test_partial_upload_failure_adds_advisory() {
    let h = harness(FakeAssistant::completing(), FakeVision::classifying("meal_photo"));
    let images = vec![
        PNG.to_string(),
        "data:image/png;base64,FAIL".to_string(),
        PNG.to_string(),
    ];

    h.orchestrator
        .add_message("thread_x", None, &images)
        .await
        .expect("message appended");

    let appended = h.assistant.appended.lock().unwrap();
    let parts = &appended[0].1;
    assert_eq!(parts.iter().filter(|p| p.is_image()).count(), 2);
    assert!(
        texts(parts)
            .iter()
            .any(|t| t == "Note: 1 of 3 images could not be processed.")
    );
    assert_eq!(h.images.uploads.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_all_uploads_failed_keeps_text() {
    let h = harness(FakeAssistant::completing(), FakeVision::classifying("meal_photo"));

    h.orchestrator
        .add_message("thread_x", Some("what about this?"), &["FAIL".to_string()])
        .await
        .expect("text still goes through");

    let appended = h.assistant.appended.lock().unwrap();
    let parts = &appended[0].1;
    assert_eq!(
        texts(parts),
        [
            "what about this?",
            "Note: the attached image could not be processed."
        ]
    );
    assert_eq!(h.vision.request_count(), 0, "nothing to classify");
}

#[tokio::test]
async fn test_all_uploads_failed_without_text_is_validation_error() {
    let h = harness(FakeAssistant::completing(), FakeVision::classifying("meal_photo"));

    let result = h
        .orchestrator
        .add_message("thread_x", None, &["FAIL".to_string(), "FAIL".to_string()])
        .await;

    assert!(matches!(result, Err(Error::Validation(_))));
    assert!(h.assistant.calls().is_empty());
}

#[tokio::test]
async fn test_rejected_turn_creates_no_thread() {
    let h = harness(FakeAssistant::completing(), FakeVision::classifying("meal_photo"));

    let result = h
        .orchestrator
        .send(None, Some("   "), &["FAIL".to_string()])
        .await;

    assert!(matches!(result, Err(Error::Validation(_))));
    // The upload was attempted, but nothing reached the assistant
    assert_eq!(h.images.uploads.load(Ordering::SeqCst), 1);
    assert!(h.assistant.calls().is_empty());
}

#[tokio::test]
async fn test_classifier_failure_falls_back_to_other() {
    let h = harness(FakeAssistant::completing(), FakeVision::failing());

    h.orchestrator
        .add_message("thread_x", Some("hmm"), &[PNG.to_string()])
        .await
        .expect("classification failure never fails the turn");

    let appended = h.assistant.appended.lock().unwrap();
    let prompt = &texts(&appended[0].1)[0];
    assert!(prompt.contains("clarify"));
    assert!(prompt.ends_with("User's message: hmm"));
}

#[tokio::test]
async fn test_wine_menu_uses_extraction() {
    let extraction = r#"{
        "restaurantName": "Quayside",
        "sections": [
            {"sectionName": "Champagne", "wines": [{"producer": "Billecart-Salmon", "name": "Brut Rosé"}]},
            {"sectionName": "Rhône", "wines": [
                {"producer": "Guigal", "name": "Crozes-Hermitage", "vintage": 2020, "bottlePrice": 48},
                {"producer": "Jaboulet", "name": "Hermitage La Chapelle", "vintage": "2015"}
            ]}
        ],
        "totalWineCount": 3
    }"#;
    let h = harness(
        FakeAssistant::completing(),
        FakeVision::classifying("wine_menu").with_json(extraction),
    );

    h.orchestrator
        .add_message("thread_x", Some("something for lamb"), &[PNG.to_string()])
        .await
        .unwrap();

    assert_eq!(h.vision.request_count(), 2);
    let appended = h.assistant.appended.lock().unwrap();
    let prompt = &texts(&appended[0].1)[0];
    for needle in ["Champagne", "Rhône", "Billecart-Salmon", "Guigal", "Jaboulet"] {
        assert_eq!(prompt.matches(needle).count(), 1, "{}", needle);
    }
    assert!(prompt.contains("Total wines listed: 3"));
    assert!(prompt.ends_with("User's message: something for lamb"));
}

#[tokio::test]
async fn test_wine_menu_extraction_failure_uses_generic_template() {
    let h = harness(
        FakeAssistant::completing(),
        FakeVision::classifying("wine_menu").with_json("I could not read the list, sorry."),
    );

    h.orchestrator
        .add_message("thread_x", None, &[PNG.to_string()])
        .await
        .unwrap();

    let appended = h.assistant.appended.lock().unwrap();
    let prompt = &texts(&appended[0].1)[0];
    assert!(prompt.contains("Extract every wine"));
    assert!(!prompt.contains("Total wines listed"));
}

#[tokio::test]
async fn test_only_first_uploaded_image_is_classified() {
    let h = harness(FakeAssistant::completing(), FakeVision::classifying("wine_bottle"));

    h.orchestrator
        .add_message(
            "thread_x",
            None,
            &["FAIL".to_string(), PNG.to_string(), PNG.to_string()],
        )
        .await
        .unwrap();

    let requests = h.vision.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].image_url, "https://img.test/upload_2.png");
}

#[tokio::test]
async fn test_existing_thread_is_trusted() {
    let h = harness(FakeAssistant::completing(), FakeVision::classifying("other"));

    let id = h
        .orchestrator
        .get_or_create_thread(Some("thread_from_browser"))
        .await
        .unwrap();
    assert_eq!(id, "thread_from_browser");
    assert!(h.assistant.calls().is_empty());

    let created = h.orchestrator.get_or_create_thread(Some("   ")).await.unwrap();
    assert!(created.starts_with("thread_"));
    assert_eq!(h.assistant.calls(), ["create_thread"]);
}

#[tokio::test]
async fn test_poll_times_out_after_thirty_checks() {
    let h = harness(
        FakeAssistant::with_statuses(&[RunStatus::InProgress]),
        FakeVision::classifying("other"),
    );

    let result = h.orchestrator.poll_until_complete("thread_x", "run_1").await;

    assert!(matches!(result, Err(Error::Timeout { attempts: 30 })));
    assert_eq!(h.assistant.status_checks.load(Ordering::SeqCst), 30);
}

#[tokio::test]
async fn test_poll_returns_provider_terminal_status() {
    for terminal in [RunStatus::Failed, RunStatus::Cancelled, RunStatus::Expired] {
        let h = harness(
            FakeAssistant::with_statuses(&[RunStatus::Queued, terminal]),
            FakeVision::classifying("other"),
        );
        let run = h
            .orchestrator
            .poll_until_complete("thread_x", "run_1")
            .await
            .unwrap();
        assert_eq!(run.status, terminal);
        assert_eq!(h.assistant.status_checks.load(Ordering::SeqCst), 2);
    }
}

#[tokio::test]
async fn test_failed_run_surfaces_run_failed() {
    let h = harness(
        FakeAssistant::with_statuses(&[RunStatus::InProgress, RunStatus::Failed]),
        FakeVision::classifying("other"),
    );

    let result = h
        .orchestrator
        .send(Some("thread_1"), Some("hello"), &[])
        .await;

    match result {
        Err(Error::RunFailed { status, message }) => {
            assert_eq!(status, RunStatus::Failed);
            assert_eq!(message, "Sorry, something went wrong.");
        }
        other => panic!("expected RunFailed, got {:?}", other),
    }
    assert!(!h.assistant.calls().contains(&"list_messages".to_string()));
}

#[tokio::test]
async fn test_text_only_turn_sends_text_verbatim() {
    let h = harness(FakeAssistant::completing(), FakeVision::classifying("other"));

    h.orchestrator
        .send(Some("thread_1"), Some("  high protein breakfast near JFK?  "), &[])
        .await
        .unwrap();

    let appended = h.assistant.appended.lock().unwrap();
    assert_eq!(
        appended[0].1,
        [MessageContentInput::text("high protein breakfast near JFK?")]
    );
    assert_eq!(h.vision.request_count(), 0);
}

#[tokio::test]
async fn test_messages_are_chronological() {
    let h = harness(FakeAssistant::completing(), FakeVision::classifying("other"));

    h.orchestrator
        .send(Some("thread_1"), Some("first"), &[])
        .await
        .unwrap();
    h.orchestrator
        .send(Some("thread_1"), Some("second"), &[])
        .await
        .unwrap();

    let messages = h.orchestrator.messages("thread_1").await.unwrap();
    let flattened: Vec<String> = messages.iter().flat_map(|m| m.texts.clone()).collect();
    assert_eq!(flattened, ["first", ASSISTANT_REPLY, "second", ASSISTANT_REPLY]);
}

#[test]
fn test_every_category_round_trips_through_classifier_parse() {
    for category in ImageCategory::ALL {
        assert_eq!(layover_fuel::parse_category(category.as_str()), Some(category));
    }
}
