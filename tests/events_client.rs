use assert_matches::assert_matches;
use chrono::{TimeZone, Utc};
use initialstate::{
    ClientConfig, DispatchMode, ErrorKind, EventsClient, FailureReporter, Record,
};
use mockito::{Matcher, Server};
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone, Default)]
struct RecordingReporter(Arc<Mutex<Vec<String>>>);

impl RecordingReporter {
    fn messages(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    async fn wait_for(&self, count: usize) -> Vec<String> {
        for _ in 0..200 {
            if self.0.lock().unwrap().len() >= count {
                break;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        self.messages()
    }
}

impl FailureReporter for RecordingReporter {
    fn report(&self, message: &str) {
        self.0.lock().unwrap().push(message.to_string());
    }
}

fn client_for(server: &Server, config: ClientConfig) -> (EventsClient, RecordingReporter) {
    let reporter = RecordingReporter::default();
    let client = EventsClient::new(config.with_api_base(server.url()))
        .unwrap()
        .with_reporter(reporter.clone());
    (client, reporter)
}

#[tokio::test]
async fn create_bucket_posts_key_name_and_tags() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/buckets")
        .match_header("content-type", "application/json")
        .match_header("accept-version", "~0")
        .match_body(Matcher::Json(json!({
            "bucketName": "Kitchen",
            "bucketKey": "kitchen",
            "tags": ["home", "sensors"],
        })))
        .with_status(201)
        .create_async()
        .await;

    let (client, reporter) = client_for(&server, ClientConfig::new("someaccesskey"));
    let key = client
        .create_bucket(Some("kitchen"), Some("Kitchen"), Some(&["home", "sensors"][..]))
        .await
        .unwrap();

    assert_eq!(key, "kitchen");
    assert_eq!(client.default_bucket_key(), None);
    assert!(reporter.messages().is_empty());
    mock.assert_async().await;
}

#[tokio::test]
async fn create_bucket_generates_and_keeps_default_key() {
    let mut server = Server::new_async().await;
    let first = server
        .mock("POST", "/buckets")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#""bucketName":"[0-9a-f]{32}""#.to_string()),
            Matcher::Regex(r#""bucketKey":"[0-9a-f]{32}""#.to_string()),
            Matcher::PartialJson(json!({ "tags": null })),
        ]))
        .with_status(201)
        .expect(1)
        .create_async()
        .await;

    let (client, _) = client_for(&server, ClientConfig::new("someaccesskey"));

    let generated = client.create_bucket(None, None, None).await.unwrap();
    assert_eq!(generated.len(), 32);
    assert!(generated.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(client.default_bucket_key().as_deref(), Some(generated.as_str()));
    first.assert_async().await;
    first.remove_async().await;

    // The generated key is both the key and the name
    let again = server
        .mock("POST", "/buckets")
        .match_body(Matcher::Json(json!({
            "bucketName": generated,
            "bucketKey": generated,
            "tags": null,
        })))
        .with_status(201)
        .expect(1)
        .create_async()
        .await;

    let key = client.create_bucket(None, None, None).await.unwrap();
    assert_eq!(key, generated);
    again.assert_async().await;

    let events = server
        .mock("POST", "/events")
        .match_header("x-is-bucketkey", generated.as_str())
        .with_status(204)
        .create_async()
        .await;

    client
        .send_event("k", "v", None, None, DispatchMode::Sync)
        .await
        .unwrap();
    events.assert_async().await;
}

#[tokio::test]
async fn failed_first_create_reports_generated_key_as_name() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/buckets")
        .with_status(409)
        .create_async()
        .await;

    let (client, _) = client_for(&server, ClientConfig::new("someaccesskey"));
    let err = client.create_bucket(None, None, None).await.unwrap_err();
    let generated = client.default_bucket_key().unwrap();

    match err.kind {
        ErrorKind::Transport { request_body, .. } => {
            let sent: serde_json::Value = serde_json::from_str(&request_body).unwrap();
            assert_eq!(
                sent,
                json!({ "bucketName": generated, "bucketKey": generated, "tags": null })
            );
        }
        other => panic!("unexpected kind: {:?}", other),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_agree_on_one_generated_key() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/buckets")
        .with_status(201)
        .expect(8)
        .create_async()
        .await;

    let (client, _) = client_for(&server, ClientConfig::new("someaccesskey"));
    let client = Arc::new(client);

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..8 {
        let client = Arc::clone(&client);
        tasks.spawn(async move { client.create_bucket(None, None, None).await });
    }

    let mut keys = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        keys.push(joined.unwrap().unwrap());
    }

    assert_eq!(keys.len(), 8);
    assert!(keys.iter().all(|k| k == &keys[0]));
    assert_eq!(client.default_bucket_key(), Some(keys[0].clone()));
    mock.assert_async().await;
}

#[tokio::test]
async fn create_bucket_uses_key_as_name_and_null_tags() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/buckets")
        .match_body(Matcher::Json(json!({
            "bucketName": "defaultbucketkey",
            "bucketKey": "defaultbucketkey",
            "tags": null,
        })))
        .with_status(200)
        .create_async()
        .await;

    let (client, _) = client_for(
        &server,
        ClientConfig::new("someaccesskey").with_default_bucket_key("defaultbucketkey"),
    );

    let key = client.create_bucket(None, Some(""), None).await.unwrap();
    assert_eq!(key, "defaultbucketkey");
    mock.assert_async().await;
}

#[tokio::test]
async fn create_bucket_failure_carries_status_and_bodies() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/buckets")
        .with_status(404)
        .with_body("no such api")
        .create_async()
        .await;

    let (client, reporter) = client_for(&server, ClientConfig::new("someaccesskey"));
    let err = client
        .create_bucket(Some("kitchen"), None, None)
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), Some(404));
    assert_matches!(
        err.kind,
        ErrorKind::Transport { status_code: 404, ref request_body, ref response_body }
            if request_body == r#"{"bucketName":"kitchen","bucketKey":"kitchen","tags":null}"#
                && response_body == "no such api"
    );
    assert_eq!(reporter.messages().len(), 1);
}

#[tokio::test]
async fn failed_create_keeps_generated_default() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/buckets")
        .with_status(500)
        .create_async()
        .await;

    let (client, _) = client_for(&server, ClientConfig::new("someaccesskey"));
    let err = client.create_bucket(None, None, None).await.unwrap_err();

    assert!(err.is_transport());
    assert_eq!(client.default_bucket_key().map(|k| k.len()), Some(32));
}

#[tokio::test]
async fn send_events_sync_sends_headers_and_shared_epoch() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/events")
        .match_header("x-is-accesskey", "someaccesskey")
        .match_header("x-is-bucketkey", "override")
        .match_header("accept-version", "~1")
        .match_body(Matcher::Json(json!([
            {"key": "a", "value": "1", "epoch": 1.5},
            {"key": "b", "value": "2", "epoch": 1.5},
        ])))
        .with_status(200)
        .create_async()
        .await;

    let (client, _) = client_for(
        &server,
        ClientConfig::new("someaccesskey")
            .with_api_version("~1")
            .with_default_bucket_key("defaultbucketkey"),
    );

    // BTreeMap keeps the body order stable for the exact-body matcher
    let source: std::collections::BTreeMap<&str, &str> = [("a", "1"), ("b", "2")].into();
    let timestamp = Utc.timestamp_millis_opt(1_500).unwrap();

    client
        .send_events(&source, Some("override"), Some(timestamp), DispatchMode::Sync)
        .await
        .unwrap();
    mock.assert_async().await;
}

#[derive(Serialize)]
struct Reading {
    temperature: i32,
    door_open: bool,
    label: String,
}

#[tokio::test]
async fn send_record_renders_fields_as_text() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/events")
        .match_body(Matcher::Json(json!([
            {"key": "temperature", "value": "42", "epoch": 0.0},
            {"key": "door_open", "value": "true", "epoch": 0.0},
            {"key": "label", "value": "front", "epoch": 0.0},
        ])))
        .with_status(201)
        .create_async()
        .await;

    let (client, _) = client_for(
        &server,
        ClientConfig::new("someaccesskey").with_default_bucket_key("defaultbucketkey"),
    );
    let reading = Reading {
        temperature: 42,
        door_open: true,
        label: "front".to_string(),
    };

    client
        .send_events(
            &Record(&reading),
            None,
            Some(Utc.timestamp_millis_opt(0).unwrap()),
            DispatchMode::Sync,
        )
        .await
        .unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn send_events_sync_failure_is_returned() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/events")
        .with_status(401)
        .with_body("bad access key")
        .create_async()
        .await;

    let (client, reporter) = client_for(
        &server,
        ClientConfig::new("someaccesskey").with_default_bucket_key("defaultbucketkey"),
    );
    let timestamp = Utc.timestamp_millis_opt(2_000).unwrap();

    let err = client
        .send_event("k", "v", None, Some(timestamp), DispatchMode::Sync)
        .await
        .unwrap_err();

    assert_matches!(
        err.kind,
        ErrorKind::Transport { status_code: 401, ref request_body, ref response_body }
            if request_body == r#"[{"key":"k","value":"v","epoch":2.0}]"#
                && response_body == "bad access key"
    );
    assert_eq!(reporter.messages().len(), 1);
}

#[tokio::test]
async fn send_events_async_failure_is_only_reported() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/events")
        .with_status(404)
        .expect(1)
        .create_async()
        .await;

    let (client, reporter) = client_for(
        &server,
        ClientConfig::new("someaccesskey").with_default_bucket_key("defaultbucketkey"),
    );

    let result = client
        .send_events(&HashMap::from([("k", "v")]), None, None, DispatchMode::Async)
        .await;
    assert!(result.is_ok());

    let messages = reporter.wait_for(1).await;
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("defaultbucketkey"));
    assert!(messages[0].contains("404"));
    assert!(messages[0].contains(r#""key":"k","value":"v""#));
    mock.assert_async().await;
}

#[tokio::test]
async fn send_events_async_success_reports_nothing() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/events")
        .with_status(204)
        .create_async()
        .await;

    let (client, reporter) = client_for(
        &server,
        ClientConfig::new("someaccesskey").with_default_bucket_key("defaultbucketkey"),
    );

    client
        .send_event("k", "v", None, None, DispatchMode::default())
        .await
        .unwrap();

    for _ in 0..200 {
        if mock.matched_async().await {
            break;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    mock.assert_async().await;

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(reporter.messages().is_empty());
}

#[tokio::test]
async fn empty_source_sends_empty_batch() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/events")
        .match_body(Matcher::Json(json!([])))
        .with_status(200)
        .create_async()
        .await;

    let (client, _) = client_for(&server, ClientConfig::new("someaccesskey"));
    let empty: HashMap<String, String> = HashMap::new();

    client
        .send_events(&empty, Some("bucket"), None, DispatchMode::Sync)
        .await
        .unwrap();
    mock.assert_async().await;
}
