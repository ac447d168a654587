use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use mockito::Matcher;
use serde_json::json;

use uphook_core::{
    HookError, HookEvent, HookRequest, HookType, HttpRequest, HttpResponse, Outcome, Upload,
};
use uphook_infra::{Dispatcher, HookHandler, HttpHook};

const SIZE_LIMIT: usize = 64 * 1024;

fn pre_create_event() -> HookEvent {
    let mut upload = Upload::new("upload-1");
    upload.size = Some(100);
    upload
        .meta_data
        .insert("owner".to_string(), "bob".to_string());
    let http_request = HttpRequest {
        method: "POST".to_string(),
        uri: "/files".to_string(),
        remote_addr: "10.0.0.1:5000".to_string(),
        headers: HashMap::from([
            ("Authorization".to_string(), vec!["Bearer abc".to_string()]),
            ("Cookie".to_string(), vec!["session=secret".to_string()]),
        ]),
    };
    HookEvent::new(upload, http_request)
}

fn hook(url: String) -> HttpHook {
    HttpHook::new(
        url,
        vec!["authorization".to_string()],
        Duration::from_secs(2),
        SIZE_LIMIT,
    )
    .unwrap()
}

#[tokio::test]
async fn test_rejecting_handler_end_to_end() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/hooks")
        .match_header("content-type", "application/json")
        .match_header("authorization", "Bearer abc")
        .match_header("cookie", Matcher::Missing)
        .match_body(Matcher::PartialJson(json!({
            "Type": "pre-create",
            "Event": {
                "Upload": { "ID": "upload-1", "Size": 100, "MetaData": { "owner": "bob" } },
                "HTTPRequest": { "Method": "POST", "URI": "/files" }
            }
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"RejectUpload":true,"HTTPResponse":{"Body":"no filename provided"}}"#)
        .create_async()
        .await;

    let handler = Arc::new(hook(format!("{}/hooks", server.url())));
    let dispatcher = Dispatcher::new(handler, Duration::from_secs(5));

    let resolution = dispatcher
        .invoke(HookType::PreCreate, pre_create_event())
        .await
        .unwrap();

    assert_eq!(
        resolution.outcome,
        Outcome::Reject(HttpResponse::new(400).with_body("no filename provided"))
    );
    mock.assert_async().await;
}

#[tokio::test]
async fn test_change_file_info() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/hooks")
        .with_status(200)
        .with_header("content-type", "application/json; charset=utf-8")
        .with_body(r#"{"ChangeFileInfo":{"ID":"tenant-a/upload-1","MetaData":{}}}"#)
        .create_async()
        .await;

    let handler = Arc::new(hook(format!("{}/hooks", server.url())));
    let dispatcher = Dispatcher::new(handler, Duration::from_secs(5));

    let resolution = dispatcher
        .invoke(HookType::PreCreate, pre_create_event())
        .await
        .unwrap();

    match resolution.outcome {
        Outcome::ProceedWithChanges(changes) => {
            assert_eq!(changes.id.as_deref(), Some("tenant-a/upload-1"));
            assert_eq!(changes.meta_data, Some(HashMap::new()));
            assert_eq!(changes.storage, None);
        }
        other => panic!("expected changes, got {:?}", other),
    }
}

#[tokio::test]
async fn test_non_2xx_is_handler_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/hooks")
        .with_status(500)
        .with_body("database is down")
        .create_async()
        .await;

    let request = HookRequest::new(HookType::PreCreate, pre_create_event()).unwrap();
    let err = hook(format!("{}/hooks", server.url()))
        .invoke_hook(&request)
        .await
        .unwrap_err();

    match err {
        HookError::HandlerError(message) => {
            assert!(message.contains("500"), "{}", message);
            assert!(message.contains("database is down"), "{}", message);
        }
        other => panic!("expected handler error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_wrong_content_type_is_malformed() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/hooks")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body("<html>proxy login</html>")
        .create_async()
        .await;

    let request = HookRequest::new(HookType::PostCreate, pre_create_event()).unwrap();
    let err = hook(format!("{}/hooks", server.url()))
        .invoke_hook(&request)
        .await
        .unwrap_err();

    assert!(matches!(err, HookError::MalformedResponse(_)), "{:?}", err);
}

#[tokio::test]
async fn test_invalid_json_is_malformed() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/hooks")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"RejectUpload": "#)
        .create_async()
        .await;

    let request = HookRequest::new(HookType::PreCreate, pre_create_event()).unwrap();
    let err = hook(format!("{}/hooks", server.url()))
        .invoke_hook(&request)
        .await
        .unwrap_err();

    assert!(matches!(err, HookError::MalformedResponse(_)), "{:?}", err);
}

#[tokio::test]
async fn test_oversized_response_is_malformed() {
    let mut server = mockito::Server::new_async().await;
    let body = format!(
        r#"{{"HTTPResponse":{{"Body":"{}"}}}}"#,
        "x".repeat(SIZE_LIMIT)
    );
    let _mock = server
        .mock("POST", "/hooks")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body)
        .create_async()
        .await;

    let request = HookRequest::new(HookType::PreFinish, pre_create_event()).unwrap();
    let err = hook(format!("{}/hooks", server.url()))
        .invoke_hook(&request)
        .await
        .unwrap_err();

    match err {
        HookError::MalformedResponse(message) => assert!(message.contains("exceeds")),
        other => panic!("expected malformed response, got {:?}", other),
    }
}

#[tokio::test]
async fn test_oversized_error_response_is_handler_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/hooks")
        .with_status(500)
        .with_header("content-type", "text/html")
        .with_body("e".repeat(SIZE_LIMIT + 4_000))
        .create_async()
        .await;

    let request = HookRequest::new(HookType::PreCreate, pre_create_event()).unwrap();
    let err = hook(format!("{}/hooks", server.url()))
        .invoke_hook(&request)
        .await
        .unwrap_err();

    match err {
        HookError::HandlerError(message) => {
            assert!(message.contains("(500)"), "{}", message);
            assert!(message.len() <= SIZE_LIMIT + 100);
        }
        other => panic!("expected handler error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_json_lookalike_content_type_is_malformed() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/hooks")
        .with_status(200)
        .with_header("content-type", "application/json-seq")
        .with_body(r#"{"RejectUpload":true}"#)
        .create_async()
        .await;

    let request = HookRequest::new(HookType::PreCreate, pre_create_event()).unwrap();
    let err = hook(format!("{}/hooks", server.url()))
        .invoke_hook(&request)
        .await
        .unwrap_err();

    assert!(matches!(err, HookError::MalformedResponse(_)), "{:?}", err);
}

#[tokio::test]
async fn test_content_type_is_case_insensitive() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/hooks")
        .with_status(200)
        .with_header("content-type", "Application/JSON; Charset=UTF-8")
        .with_body(r#"{"RejectUpload":true}"#)
        .create_async()
        .await;

    let request = HookRequest::new(HookType::PreCreate, pre_create_event()).unwrap();
    let response = hook(format!("{}/hooks", server.url()))
        .invoke_hook(&request)
        .await
        .unwrap();

    assert!(response.reject_upload);
}

#[tokio::test]
async fn test_unreachable_endpoint() {
    // Nothing listens on port 1
    let request = HookRequest::new(HookType::PreCreate, pre_create_event()).unwrap();
    let err = hook("http://127.0.0.1:1/hooks".to_string())
        .invoke_hook(&request)
        .await
        .unwrap_err();

    assert!(matches!(err, HookError::Unreachable(_)), "{:?}", err);
}

#[tokio::test]
async fn test_blocking_hook_failure_becomes_client_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/hooks")
        .with_status(503)
        .create_async()
        .await;

    let handler = Arc::new(hook(format!("{}/hooks", server.url())));
    let dispatcher = Dispatcher::new(handler, Duration::from_secs(5));

    let response = dispatcher
        .invoke_or_fail(HookType::PreCreate, pre_create_event())
        .await
        .unwrap_err();
    assert_eq!(response.status_code, Some(500));

    let resolution = dispatcher
        .invoke_or_fail(HookType::PostCreate, pre_create_event())
        .await
        .unwrap();
    assert_eq!(resolution.outcome, Outcome::Proceed);
}
