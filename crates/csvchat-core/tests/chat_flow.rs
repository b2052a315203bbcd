//! End-to-end controller flows: upload, chat, table, graph.
//!
//! The backend is a wiremock server; no real service is contacted.

use csvchat_core::controller::{GRAPH_FAILED, GRAPH_NOT_FOUND, UPLOAD_FAILED, UPLOAD_OK};
use csvchat_core::state::INSUFFICIENT_DATA;
use csvchat_core::{ApiClient, ChatController, NoticeLevel, Sender, StagedFile, TableView};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const VIEWER: &str = "http://viewer.local/graph/";

fn staged() -> StagedFile {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cities.csv");
    std::fs::write(&path, "city,pop\nLima,10\n").unwrap();
    StagedFile::from_path(&path).unwrap()
}

async fn mount_upload_ok(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/upload-csv/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "ok"})))
        .mount(server)
        .await;
}

async fn uploaded_controller(client: &ApiClient) -> ChatController {
    let mut controller = ChatController::new(VIEWER);
    controller.select_file(staged());
    controller.upload(client).await;
    assert!(controller.state().upload.uploaded);
    controller.dismiss_notice();
    controller
}

#[tokio::test]
async fn test_upload_success_and_failure_notices() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload-csv/"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_upload_ok(&server).await;

    let client = ApiClient::new(&server.uri());
    let mut controller = ChatController::new(VIEWER);
    controller.select_file(staged());

    controller.upload(&client).await;
    let state = controller.state();
    assert!(!state.upload.uploaded);
    assert!(!state.upload.uploading);
    assert_eq!(state.notice.as_ref().map(|n| n.text.as_str()), Some(UPLOAD_FAILED));
    assert_eq!(state.notice.as_ref().map(|n| n.level), Some(NoticeLevel::Error));
    assert!(controller.view().chat_form.is_none());

    assert!(controller.dismiss_notice());
    controller.upload(&client).await;
    let state = controller.state();
    assert!(state.upload.uploaded);
    assert_eq!(state.notice.as_ref().map(|n| n.text.as_str()), Some(UPLOAD_OK));
    assert!(controller.view().chat_form.is_some());
}

#[tokio::test]
async fn test_blank_input_never_calls_backend() {
    let server = MockServer::start().await;
    mount_upload_ok(&server).await;
    Mock::given(method("POST"))
        .and(path("/prompt/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"aiResponse": "x"})))
        .expect(0)
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri());
    let mut controller = uploaded_controller(&client).await;

    for blank in ["", " ", "\t\n"] {
        controller.set_input(blank);
        controller.send_message(&client).await;
    }
    assert!(controller.state().messages.is_empty());
    assert!(!controller.state().loading);
}

#[tokio::test]
async fn test_messages_grow_by_two_per_round_trip() {
    let server = MockServer::start().await;
    mount_upload_ok(&server).await;
    Mock::given(method("POST"))
        .and(path("/prompt/"))
        .and(body_json(json!({"prompt": "how many cities?"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"aiResponse": "One city."})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/prompt/"))
        .and(body_json(json!({"prompt": "break it"})))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri());
    let mut controller = uploaded_controller(&client).await;

    controller.set_input("how many cities?");
    controller.send_message(&client).await;
    assert_eq!(controller.state().messages.len(), 2);
    assert!(!controller.state().loading);

    controller.set_input("break it");
    controller.send_message(&client).await;
    assert_eq!(controller.state().messages.len(), 4);
    assert!(!controller.state().loading);

    let texts: Vec<(&str, Sender)> = controller
        .state()
        .messages
        .iter()
        .map(|m| (m.text.as_str(), m.sender))
        .collect();
    assert_eq!(
        texts,
        vec![
            ("how many cities?", Sender::User),
            ("One city.", Sender::Ai),
            ("break it", Sender::User),
            (INSUFFICIENT_DATA, Sender::Ai),
        ]
    );
    // The failed round trip keeps the earlier response
    assert!(controller.view().graph_form.is_some());
}

#[tokio::test]
async fn test_tabular_response_then_graph() {
    let server = MockServer::start().await;
    mount_upload_ok(&server).await;
    let rows = json!([{"a": 1, "b": 2}, {"a": 3, "b": 4}]);
    Mock::given(method("POST"))
        .and(path("/prompt/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows.clone()))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/prompt/getGraphBytes/"))
        .and(body_json(json!({
            "graph_prompt": "scatter a vs b",
            "df": r#"[{"a":1,"b":2},{"a":3,"b":4}]"#
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"graph": "iVBORw0"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri());
    let mut controller = uploaded_controller(&client).await;
    assert!(controller.view().graph_form.is_none());

    controller.set_input("list rows");
    controller.send_message(&client).await;

    let view = controller.view();
    assert_eq!(
        view.table,
        Some(TableView::Rows {
            columns: vec!["a".to_string(), "b".to_string()],
            rows: vec![
                vec!["1".to_string(), "2".to_string()],
                vec!["3".to_string(), "4".to_string()],
            ],
        })
    );
    assert!(view.graph_form.is_some());

    controller.set_graph_prompt("scatter a vs b");
    controller.submit_graph(&client).await;
    let view = controller.view();
    assert_eq!(view.iframe_src, Some(VIEWER));
    assert_eq!(view.graph_error, None);
    assert!(!controller.state().graph.loading);
}

#[tokio::test]
async fn test_graph_missing_key_and_failure() {
    let server = MockServer::start().await;
    mount_upload_ok(&server).await;
    Mock::given(method("POST"))
        .and(path("/prompt/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"aiResponse": "done"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/prompt/getGraphBytes/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/prompt/getGraphBytes/"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri());
    let mut controller = uploaded_controller(&client).await;
    controller.set_input("summary");
    controller.send_message(&client).await;

    let view = controller.view();
    assert_eq!(view.table, Some(TableView::Empty));

    controller.submit_graph(&client).await;
    let view = controller.view();
    assert_eq!(view.iframe_src, None);
    assert_eq!(view.graph_error, Some(GRAPH_NOT_FOUND));
    assert!(!controller.state().graph.loading);

    controller.submit_graph(&client).await;
    let view = controller.view();
    assert_eq!(view.iframe_src, None);
    assert_eq!(view.graph_error, Some(GRAPH_FAILED));
    assert!(!controller.state().graph.loading);
}
