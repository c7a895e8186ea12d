//! HTTP platform adapter against a wiremock server.

use std::collections::HashMap;
use std::sync::Arc;

use agent_steward::adapters::platform::HttpClientFactory;
use agent_steward::domain::models::{
    AgentSpec, IndexingStatus, MessageRole, ProtectionPolicy, ProviderDefinition, RateLimitConfig,
    RunStatus, ToolKind,
};
use agent_steward::domain::ports::AgentPlatform;
use agent_steward::services::{ProviderRegistry, ResourceCleanupService};
use agent_steward::LifecycleError;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API_KEY: &str = "aoai-key-0123456789abcdef";

fn registry(server: &MockServer, provider_type: &str) -> Arc<ProviderRegistry> {
    let mut definition = ProviderDefinition::new("", provider_type, server.uri(), "gpt-4o").with_api_key(API_KEY);
    if provider_type == "azure_openai" {
        definition = definition.with_api_version("2024-05-01-preview");
    }
    definition.max_retries = 2;

    let factory = Arc::new(HttpClientFactory::new(RateLimitConfig::default()));
    Arc::new(ProviderRegistry::new([("p1".to_string(), definition)], factory).unwrap())
}

fn client(server: &MockServer, provider_type: &str) -> Arc<dyn AgentPlatform> {
    registry(server, provider_type).resolve("p1").unwrap()
}

#[tokio::test]
async fn test_list_files_sends_key_and_api_version() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files"))
        .and(header("api-key", API_KEY))
        .and(query_param("api-version", "2024-05-01-preview"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": [
                {"id": "file-1", "filename": "claim.pdf", "purpose": "assistants"},
                {"id": "file-2", "filename": "policy.md", "purpose": "assistants"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let files = client(&server, "azure_openai").list_files().await.unwrap();
    let names: Vec<&str> = files.iter().map(|f| f.filename.as_str()).collect();
    assert_eq!(names, vec!["claim.pdf", "policy.md"]);
}

#[tokio::test]
async fn test_openai_uses_bearer_without_api_version() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/assistants"))
        .and(header("authorization", format!("Bearer {API_KEY}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": "asst_1", "name": "temp-classifier"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let agents = client(&server, "openai").list_agents().await.unwrap();
    assert_eq!(agents[0].id, "asst_1");
    assert_eq!(agents[0].name.as_deref(), Some("temp-classifier"));

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].url.query().is_none());
}

#[tokio::test]
async fn test_transient_get_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/vector_stores/vs_1/files/file-1"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {"code": "rate_limit_exceeded", "message": "Too many requests"}
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/vector_stores/vs_1/files/file-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "file-1", "status": "completed", "last_error": null
        })))
        .mount(&server)
        .await;

    let status = client(&server, "azure_openai")
        .get_store_file("vs_1", "file-1")
        .await
        .unwrap();
    assert_eq!(status.status, IndexingStatus::Completed);
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_failed_post_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/vector_stores"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server, "azure_openai")
        .create_store("wf-1", HashMap::new())
        .await
        .unwrap_err();
    assert!(err.is_transient());
    assert!(matches!(
        err,
        LifecycleError::Remote { ref operation, status: Some(503), .. } if operation == "create_store"
    ));
}

#[tokio::test]
async fn test_error_bodies_are_scrubbed() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/files/file-9"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {
                "code": "invalid_api_key",
                "message": "Incorrect API key provided: sk-proj-abcdefghijklmnopqrstuvwx"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server, "openai").delete_file("file-9").await.unwrap_err();
    let message = err.to_string();
    assert!(!message.contains("abcdefghijklmnop"), "{message}");
    assert!(!err.is_transient());
}

#[tokio::test]
async fn test_create_agent_binds_store_to_file_search() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/assistants"))
        .and(body_partial_json(json!({
            "model": "gpt-4o",
            "name": "classifier",
            "tools": [{"type": "file_search"}],
            "tool_resources": {"file_search": {"vector_store_ids": ["vs_1"]}},
            "metadata": {"agent_key": "classifier"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "asst_42", "name": "classifier"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let spec = AgentSpec {
        name: "classifier".to_string(),
        model: "gpt-4o".to_string(),
        instructions: "Classify documents.".to_string(),
        tools: vec![ToolKind::FileSearch],
        store_ids: vec!["vs_1".to_string()],
        temperature: None,
        metadata: [("agent_key".to_string(), "classifier".to_string())].into_iter().collect(),
    };
    let agent = client(&server, "azure_openai").create_agent(&spec).await.unwrap();
    assert_eq!(agent.id, "asst_42");
}

#[tokio::test]
async fn test_run_and_messages_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/threads/thread_1/runs/run_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "run_1",
            "status": "failed",
            "last_error": {"code": "server_error", "message": "model overloaded"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/threads/thread_1/messages"))
        .and(query_param("order", "asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"role": "user", "content": [{"type": "text", "text": {"value": "Classify claim.pdf"}}]},
                {"role": "assistant", "content": [
                    {"type": "text", "text": {"value": "Category:"}},
                    {"type": "text", "text": {"value": "claim form"}}
                ]}
            ]
        })))
        .mount(&server)
        .await;

    let platform = client(&server, "azure_openai");
    let run = platform.get_run("thread_1", "run_1").await.unwrap();
    assert_eq!(run.status, RunStatus::Failed);
    assert!(run.last_error.unwrap().contains("model overloaded"));

    let messages = platform.list_messages("thread_1").await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].content, "Category:\nclaim form");
}

#[tokio::test]
async fn test_thread_listing_unsupported_makes_no_request() {
    let server = MockServer::start().await;

    let err = client(&server, "azure_openai").list_threads().await.unwrap_err();
    assert!(matches!(err, LifecycleError::InvalidOperation(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_upload_file_is_multipart() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "file-7", "filename": "claim.pdf"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let file = client(&server, "azure_openai")
        .upload_file("claim.pdf", b"%PDF-1.7".to_vec())
        .await
        .unwrap();
    assert_eq!(file.id, "file-7");

    let requests = server.received_requests().await.unwrap();
    let content_type = requests[0]
        .headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("multipart/form-data"), "{content_type}");
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains("name=\"purpose\""));
    assert!(body.contains("assistants"));
}

#[tokio::test]
async fn test_list_follows_pages() {
    let server = MockServer::start().await;
    // Later pages are mounted first so the cursor-less matcher does not shadow them.
    Mock::given(method("GET"))
        .and(path("/files"))
        .and(query_param("after", "file-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": "file-3", "filename": "c.pdf"}],
            "has_more": false,
            "last_id": "file-3"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"id": "file-1", "filename": "a.pdf"},
                {"id": "file-2", "filename": "b.pdf"}
            ],
            "has_more": true,
            "last_id": "file-2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let files = client(&server, "azure_openai").list_files().await.unwrap();
    let ids: Vec<&str> = files.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(ids, vec!["file-1", "file-2", "file-3"]);
}

#[tokio::test]
async fn test_cleanup_sweeps_every_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files"))
        .and(query_param("after", "file_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": "file_2", "filename": "b.pdf"}],
            "has_more": false
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": "file_1", "filename": "a.pdf"}],
            "has_more": true,
            "last_id": "file_1"
        })))
        .mount(&server)
        .await;
    for id in ["file_1", "file_2"] {
        Mock::given(method("DELETE"))
            .and(path(format!("/files/{id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": id, "deleted": true})))
            .expect(1)
            .mount(&server)
            .await;
    }

    let service = ResourceCleanupService::new(registry(&server, "openai"), ProtectionPolicy::default());
    let stats = service
        .cleanup_files("p1", &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(stats.files.deleted, 2);
    assert_eq!(stats.files.failed, 0);
}

#[tokio::test]
async fn test_messages_are_read_past_the_first_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/threads/thread_1/messages"))
        .and(query_param("order", "asc"))
        .and(query_param("after", "msg_2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"id": "msg_3", "role": "user", "content": [{"type": "text", "text": {"value": "And this one?"}}]},
                {"id": "msg_4", "role": "assistant", "content": [{"type": "text", "text": {"value": "invoice"}}]}
            ],
            "has_more": false,
            "last_id": "msg_4"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/threads/thread_1/messages"))
        .and(query_param("order", "asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"id": "msg_1", "role": "user", "content": [{"type": "text", "text": {"value": "Classify claim.pdf"}}]},
                {"id": "msg_2", "role": "assistant", "content": [{"type": "text", "text": {"value": "claim form"}}]}
            ],
            "has_more": true,
            "last_id": "msg_2"
        })))
        .mount(&server)
        .await;

    let messages = client(&server, "azure_openai")
        .list_messages("thread_1")
        .await
        .unwrap();
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[3].role, MessageRole::Assistant);
    assert_eq!(messages[3].content, "invoice");
}
