//! HTTP client adapter tests against a wiremock backend.

use csvchat_core::api::{ApiClient, RequestBody, RequestError};
use csvchat_core::StagedFile;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde_json::{json, Value};
use wiremock::matchers::{body_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_call_returns_parsed_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/prompt/"))
        .and(body_json(json!({"prompt": "rows?"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"aiResponse": "12"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri());
    let body = client
        .call(
            "/prompt/",
            Method::POST,
            Some(RequestBody::Json(json!({"prompt": "rows?"}))),
            None,
        )
        .await
        .unwrap();

    assert_eq!(body, json!({"aiResponse": "12"}));
}

#[tokio::test]
async fn test_prompt_sends_text_verbatim() {
    let question = "average \"price\"\nper región?";
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/prompt/"))
        .and(body_json(json!({"prompt": question})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"aiResponse": "4.2"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri());
    let body = client.prompt(question).await.unwrap();

    assert_eq!(body["aiResponse"], "4.2");
}

#[tokio::test]
async fn test_call_applies_header_overrides() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .and(header("x-dataset", "sales"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let mut headers = HeaderMap::new();
    headers.insert("x-dataset", HeaderValue::from_static("sales"));

    let client = ApiClient::new(&server.uri());
    let body = client
        .call("/health", Method::GET, None, Some(headers))
        .await
        .unwrap();

    // Non-JSON bodies come back as plain strings
    assert_eq!(body, Value::String("ok".to_string()));
}

#[tokio::test]
async fn test_empty_success_body_is_null() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload-csv/"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri());
    let body = client
        .call("/upload-csv/", Method::POST, None, None)
        .await
        .unwrap();

    assert_eq!(body, Value::Null);
}

#[tokio::test]
async fn test_non_2xx_is_request_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/prompt/"))
        .respond_with(ResponseTemplate::new(422).set_body_string("no dataset"))
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri());
    let err = client.prompt("anything").await.unwrap_err();

    match err {
        RequestError::Status { status, body, url } => {
            assert_eq!(status.as_u16(), 422);
            assert_eq!(body, "no dataset");
            assert!(url.ends_with("/prompt/"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_unreachable_backend_is_transport_error() {
    let client = ApiClient::new("http://127.0.0.1:1");
    let err = client.prompt("anything").await.unwrap_err();
    assert!(matches!(err, RequestError::Transport { .. }));
}

#[tokio::test]
async fn test_upload_sends_multipart_file_field() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload-csv/"))
        .and(body_string_contains("name=\"file\""))
        .and(body_string_contains("filename=\"sales.csv\""))
        .and(body_string_contains("region,total"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "stored"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri());
    let file = StagedFile::new("sales.csv", b"region,total\nnorth,10\n".to_vec());
    client.upload_csv(&file).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let content_type = requests[0]
        .headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("multipart/form-data"));
}

#[tokio::test]
async fn test_graph_bytes_body_shape() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/prompt/getGraphBytes/"))
        .and(body_json(json!({
            "graph_prompt": "pie of totals",
            "df": "[{\"a\":1}]"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"graph": "abc"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri());
    let body = client.graph_bytes("pie of totals", "[{\"a\":1}]").await.unwrap();
    assert_eq!(body["graph"], "abc");
}
