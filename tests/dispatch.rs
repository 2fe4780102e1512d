use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing_subscriber::layer::SubscriberExt;

use build_notify::build::Build;
use build_notify::config::NotifyConfig;
use build_notify::dispatcher::Dispatcher;
use build_notify::error::{NotifyError, Result};
use build_notify::event::BuildEvent;
use build_notify::logging::NotificationLogLayer;
use build_notify::registry::HandlerRegistry;
use build_notify::transport::{HttpRequest, HttpResponse, Transport};

const HOST: &str = "https://ci.example.com";

enum Reply {
    Status(u16, &'static str),
    Unreachable,
}

/// Records every request; answers 200 unless a reply is scripted for the URL.
#[derive(Default)]
struct RecordingTransport {
    requests: Mutex<Vec<HttpRequest>>,
    replies: Mutex<HashMap<String, Reply>>,
}

impl RecordingTransport {
    fn reply(self, url: &str, reply: Reply) -> Self {
        self.replies.lock().unwrap().insert(url.to_string(), reply);
        self
    }

    fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn urls(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.url).collect()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let replies = self.replies.lock().unwrap();
        match replies.get(&request.url) {
            Some(Reply::Unreachable) => Err(NotifyError::Transport {
                url: request.url.clone(),
                message: "connection refused".to_string(),
            }),
            Some(Reply::Status(status, body)) => Ok(HttpResponse {
                status: *status,
                headers: Vec::new(),
                body: body.to_string(),
            }),
            None => Ok(HttpResponse {
                status: 200,
                headers: Vec::new(),
                body: String::new(),
            }),
        }
    }
}

fn dispatcher(handlers: &str, transport: Arc<RecordingTransport>) -> Dispatcher {
    let config = NotifyConfig::from_toml(&format!(
        r#"
        notifications = {handlers}
        http_host = "{HOST}"
        [webhook]
        token = "secret"
        [github]
        token = "gh-token"
        "#
    ))
    .unwrap();
    let registry = HandlerRegistry::from_config(&config, transport).unwrap();
    Dispatcher::new(Arc::new(registry))
}

fn build(notifications: Value) -> Build {
    serde_json::from_value(json!({
        "id": 1,
        "number": "2",
        "result": "passed",
        "started_at": "2011-06-01T12:00:00Z",
        "finished_at": "2011-06-01T12:01:30Z",
        "repository": {
            "id": 3,
            "owner_name": "svenfuchs",
            "name": "minimal",
            "url": "https://github.com/svenfuchs/minimal"
        },
        "commit": {
            "sha": "62aae5f70ceee39123ef",
            "branch": "master",
            "message": "the commit message",
            "compare_url": "https://github.com/svenfuchs/minimal/compare/master...develop",
            "author_name": "Sven Fuchs"
        },
        "config": { "rvm": ["1.9.2"], "notifications": notifications }
    }))
    .unwrap()
}

fn pull_request_build() -> Build {
    let mut build = build(json!({}));
    build.request.pull_request = true;
    build.request.comments_url =
        Some("https://api.github.com/repos/svenfuchs/minimal/issues/1/comments".to_string());
    build.request.head_commit = Some("abcdef1234".to_string());
    build.request.base_commit = Some("0123456789abc".to_string());
    build
}

fn capture_logs() -> (NotificationLogLayer, tracing::subscriber::DefaultGuard) {
    let layer = NotificationLogLayer::new();
    let subscriber = tracing_subscriber::registry().with(layer.clone());
    let guard = tracing::subscriber::set_default(subscriber);
    (layer, guard)
}

#[tokio::test]
async fn handlers_ignore_events_outside_their_interest() {
    let transport = Arc::new(RecordingTransport::default());
    let dispatcher = dispatcher(r#"["campfire", "github"]"#, transport.clone());
    let build = build(json!({ "campfire": "evome:apitoken@42" }));

    let report = dispatcher.dispatch(BuildEvent::Started, &build).await;

    assert_eq!(report.attempted(), 0);
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn blank_config_sends_nothing() {
    let transport = Arc::new(RecordingTransport::default());
    let dispatcher = dispatcher(r#"["webhook", "campfire"]"#, transport.clone());

    for notifications in [json!({}), json!({ "webhooks": "" }), json!({ "webhooks": [] })] {
        let report = dispatcher.dispatch(BuildEvent::Finished, &build(notifications)).await;
        assert_eq!(report.attempted(), 0);
    }
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn webhook_posts_to_string_and_list_targets() {
    let transport = Arc::new(RecordingTransport::default());
    let dispatcher = dispatcher(r#"["webhook"]"#, transport.clone());

    dispatcher
        .dispatch(BuildEvent::Finished, &build(json!({ "webhooks": "http://one.example.com/" })))
        .await;
    dispatcher
        .dispatch(
            BuildEvent::Finished,
            &build(json!({ "webhooks": ["http://two.example.com/", "http://three.example.com/"] })),
        )
        .await;

    assert_eq!(
        transport.urls(),
        vec![
            "http://one.example.com/",
            "http://two.example.com/",
            "http://three.example.com/"
        ]
    );
}

#[tokio::test]
async fn webhook_request_carries_signed_form_payload() {
    let transport = Arc::new(RecordingTransport::default());
    let dispatcher = dispatcher(r#"["webhook"]"#, transport.clone());
    let build = build(json!({ "webhooks": ["http://a.example.com/", "http://b.example.com/"] }));

    dispatcher.dispatch(BuildEvent::Finished, &build).await;

    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    let request = &requests[0];
    assert_eq!(
        request.header_value("content-type"),
        Some("application/x-www-form-urlencoded")
    );
    let signature = request.header_value("Authorization").unwrap();
    assert!(build_notify::auth::verify_webhook_signature(Some("secret"), &build, signature));
    assert_eq!(requests[1].header_value("Authorization"), Some(signature));
    assert_eq!(requests[0].body, requests[1].body);

    let form: HashMap<String, String> = url::form_urlencoded::parse(request.body.as_bytes())
        .into_owned()
        .collect();
    let payload: Value = serde_json::from_str(&form["payload"]).unwrap();
    assert_eq!(payload["id"], 1);
    assert_eq!(payload["status_message"], "Passed");
    assert_eq!(payload["build_url"], "https://ci.example.com/svenfuchs/minimal/builds/1");
    assert_eq!(payload["repository"]["name"], "minimal");
}

#[tokio::test]
async fn on_start_flag_controls_started_notifications() {
    let cases = [
        (json!("http://example.com/"), 0),
        (json!({ "urls": "http://example.com/" }), 0),
        (json!({ "urls": "http://example.com/", "on_start": false }), 0),
        (json!({ "urls": "http://example.com/", "on_start": "never" }), 0),
        (json!({ "urls": "http://example.com/", "on_start": true }), 1),
        (json!({ "urls": "http://example.com/", "on_start": "always" }), 1),
        (json!({ "urls": "http://example.com/", "on_start": 1 }), 1),
    ];

    for (config, expected) in cases {
        let transport = Arc::new(RecordingTransport::default());
        let dispatcher = dispatcher(r#"["webhook"]"#, transport.clone());
        let report = dispatcher
            .dispatch(BuildEvent::Started, &build(json!({ "webhooks": config.clone() })))
            .await;
        assert_eq!(report.attempted(), expected, "config: {config}");
        assert_eq!(transport.requests().len(), expected);
    }
}

#[tokio::test]
async fn failing_target_does_not_stop_its_siblings() {
    let (logs, _guard) = capture_logs();
    let transport = Arc::new(
        RecordingTransport::default().reply("http://example.com/", Reply::Status(403, "nono.")),
    );
    let dispatcher = dispatcher(r#"["webhook"]"#, transport.clone());
    let build = build(json!({ "webhooks": ["http://example.com/", "http://other.example.com/"] }));

    let report = dispatcher.dispatch(BuildEvent::Finished, &build).await;

    assert_eq!(transport.urls(), vec!["http://example.com/", "http://other.example.com/"]);
    assert_eq!(report.delivered(), 1);
    assert_eq!(report.failed(), 1);
    assert!(logs.contains(r#"[webhook] Could not notify http://example.com/. Status: 403 ("nono.")"#));
    assert!(logs.contains("[webhook] Successfully notified http://other.example.com/"));
}

#[tokio::test]
async fn unreachable_target_is_a_failed_outcome() {
    let (logs, _guard) = capture_logs();
    let transport = Arc::new(
        RecordingTransport::default().reply("http://down.example.com/", Reply::Unreachable),
    );
    let dispatcher = dispatcher(r#"["webhook"]"#, transport.clone());

    let report = dispatcher
        .dispatch(BuildEvent::Finished, &build(json!({ "webhooks": "http://down.example.com/" })))
        .await;

    assert_eq!(report.failed(), 1);
    assert!(report.outcomes[0].to_record().code.is_none());
    assert!(logs.contains("[webhook] Could not notify http://down.example.com/."));
}

#[tokio::test]
async fn campfire_speaks_each_line_with_basic_auth() {
    let transport = Arc::new(RecordingTransport::default());
    let dispatcher = dispatcher(r#"["campfire"]"#, transport.clone());
    let build = build(json!({ "campfire": "evome:apitoken@42" }));

    let report = dispatcher.dispatch(BuildEvent::Finished, &build).await;

    let requests = transport.requests();
    assert_eq!(report.attempted(), 3);
    assert!(
        requests
            .iter()
            .all(|r| r.url == "https://evome.campfirenow.com/room/42/speak.json")
    );
    assert!(
        requests
            .iter()
            .all(|r| r.header_value("Authorization") == Some("Basic YXBpdG9rZW46WA=="))
    );

    let bodies: Vec<String> = requests
        .iter()
        .map(|r| {
            let body: Value = serde_json::from_str(&r.body).unwrap();
            body["message"]["body"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(
        bodies,
        vec![
            "[ci] svenfuchs/minimal#2 (master - 62aae5f : Sven Fuchs): the build has passed",
            "[ci] Change view : https://github.com/svenfuchs/minimal/compare/master...develop",
            "[ci] Build details : https://ci.example.com/svenfuchs/minimal/builds/1",
        ]
    );
}

#[tokio::test]
async fn campfire_skips_unparseable_rooms() {
    let transport = Arc::new(RecordingTransport::default());
    let dispatcher = dispatcher(r#"["campfire"]"#, transport.clone());
    let build = build(json!({ "campfire": ["not a room", "evome:apitoken@42"] }));

    let report = dispatcher.dispatch(BuildEvent::Finished, &build).await;

    assert_eq!(report.attempted(), 3);
    assert!(transport.urls().iter().all(|u| u.contains("evome.campfirenow.com")));
}

#[tokio::test]
async fn github_comments_on_pull_requests() {
    let transport = Arc::new(RecordingTransport::default());
    let dispatcher = dispatcher(r#"["github"]"#, transport.clone());

    let report = dispatcher.dispatch(BuildEvent::Finished, &pull_request_build()).await;

    assert_eq!(report.delivered(), 1);
    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(
        request.url,
        "https://api.github.com/repos/svenfuchs/minimal/issues/1/comments"
    );
    assert_eq!(request.header_value("Authorization"), Some("token gh-token"));
    let body: Value = serde_json::from_str(&request.body).unwrap();
    assert_eq!(
        body["body"],
        "This pull request [passes](https://ci.example.com/svenfuchs/minimal/builds/1) (merged abcdef1 into 0123456)."
    );
}

#[tokio::test]
async fn campfire_authorizes_each_room_with_its_own_token() {
    let transport = Arc::new(RecordingTransport::default());
    let dispatcher = dispatcher(r#"["campfire"]"#, transport.clone());
    let build = build(json!({ "campfire": ["evome:apitoken@42", "rails:sometoken@69"] }));

    let report = dispatcher.dispatch(BuildEvent::Finished, &build).await;

    let requests = transport.requests();
    assert_eq!(report.attempted(), 6);
    let (first, second) = requests.split_at(3);
    assert!(first.iter().all(|r| {
        r.url == "https://evome.campfirenow.com/room/42/speak.json"
            && r.header_value("Authorization") == Some("Basic YXBpdG9rZW46WA==")
    }));
    assert!(second.iter().all(|r| {
        r.url == "https://rails.campfirenow.com/room/69/speak.json"
            && r.header_value("Authorization") == Some("Basic c29tZXRva2VuOlg=")
    }));
}

#[tokio::test]
async fn github_logs_successful_comment() {
    let (logs, _guard) = capture_logs();
    let transport = Arc::new(RecordingTransport::default());
    let dispatcher = dispatcher(r#"["github"]"#, transport);

    dispatcher.dispatch(BuildEvent::Finished, &pull_request_build()).await;

    assert!(logs.contains(
        "[github] Successfully commented on https://api.github.com/repos/svenfuchs/minimal/issues/1/comments."
    ));
}

#[tokio::test]
async fn rejected_comment_is_a_failed_outcome() {
    let (logs, _guard) = capture_logs();
    let comments_url = "https://api.github.com/repos/svenfuchs/minimal/issues/1/comments";
    let transport = Arc::new(RecordingTransport::default().reply(comments_url, Reply::Status(403, "nono.")));
    let dispatcher = dispatcher(r#"["github"]"#, transport.clone());

    let report = dispatcher.dispatch(BuildEvent::Finished, &pull_request_build()).await;

    assert_eq!(transport.requests().len(), 1);
    assert_eq!(report.failed(), 1);
    let record = report.outcomes[0].to_record();
    assert_eq!(record.handler, "github");
    assert_eq!(record.code, Some(403));
    assert_eq!(record.error.as_deref(), Some(r#"Status: 403 ("nono.")"#));
    assert!(logs.contains(&format!(r#"[github] Could not comment on {comments_url} (403 "nono.")."#)));
}

#[tokio::test]
async fn github_ignores_builds_without_pull_request() {
    let transport = Arc::new(RecordingTransport::default());
    let dispatcher = dispatcher(r#"["github"]"#, transport.clone());

    let report = dispatcher.dispatch(BuildEvent::Finished, &build(json!({}))).await;

    assert_eq!(report.attempted(), 0);
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn repeated_dispatch_repeats_every_attempt() {
    let transport = Arc::new(RecordingTransport::default());
    let dispatcher = dispatcher(r#"["webhook", "campfire"]"#, transport.clone());
    let build = build(json!({
        "webhooks": "http://example.com/",
        "campfire": "evome:apitoken@42"
    }));

    let first = dispatcher.dispatch(BuildEvent::Finished, &build).await;
    let second = dispatcher.dispatch(BuildEvent::Finished, &build).await;

    assert_eq!(first.attempted(), 4);
    assert_eq!(second.attempted(), 4);
    let urls = transport.urls();
    assert_eq!(urls.len(), 8);
    assert_eq!(urls[..4], urls[4..]);
    assert_eq!(urls[0], "http://example.com/");
}

#[tokio::test]
async fn finish_filters_follow_previous_result() {
    let transport = Arc::new(RecordingTransport::default());
    let dispatcher = dispatcher(r#"["webhook"]"#, transport.clone());
    let mut build = build(json!({
        "webhooks": { "urls": "http://example.com/", "on_success": "change" }
    }));

    build.previous_result = Some(build_notify::build::BuildResult::Passed);
    assert_eq!(dispatcher.dispatch(BuildEvent::Finished, &build).await.attempted(), 0);

    build.previous_result = Some(build_notify::build::BuildResult::Failed);
    assert_eq!(dispatcher.dispatch(BuildEvent::Finished, &build).await.attempted(), 1);
}

#[tokio::test]
async fn odd_flag_values_still_notify_on_finish() {
    let transport = Arc::new(RecordingTransport::default());
    let dispatcher = dispatcher(r#"["webhook"]"#, transport.clone());
    let build = build(json!({
        "webhooks": { "urls": "http://example.com/", "on_start": 1, "on_success": 0 }
    }));

    let report = dispatcher.dispatch(BuildEvent::Finished, &build).await;

    assert_eq!(report.attempted(), 1);
    assert_eq!(transport.urls(), vec!["http://example.com/"]);
}

#[tokio::test]
async fn unknown_event_names_are_rejected() {
    let transport = Arc::new(RecordingTransport::default());
    let dispatcher = dispatcher(r#"["webhook"]"#, transport.clone());
    let build = build(json!({ "webhooks": "http://example.com/" }));

    let err = dispatcher.dispatch_named("build:created", &build).await.unwrap_err();

    assert!(matches!(err, NotifyError::UnknownEvent(_)));
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn outcomes_are_published_to_subscribers() {
    let transport = Arc::new(
        RecordingTransport::default().reply("http://example.com/", Reply::Status(500, "boom")),
    );
    let (tx, mut rx) = broadcast::channel(16);
    let dispatcher = dispatcher(r#"["webhook"]"#, transport).with_events(tx);

    dispatcher
        .dispatch_named("build:finished", &build(json!({ "webhooks": "http://example.com/" })))
        .await
        .unwrap();

    let delivery = rx.recv().await.unwrap();
    assert_eq!(delivery.event, "build:finished");
    assert_eq!(delivery.build_id, 1);
    assert_eq!(delivery.outcome.status, "failed");
    assert_eq!(delivery.outcome.code, Some(500));
}
