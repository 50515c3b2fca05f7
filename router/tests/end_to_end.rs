//! Router tests against a mocked Azure OpenAI embeddings endpoint.

use std::time::Duration;

use pretty_assertions::assert_eq;
use semroute_encoders::{AzureOpenAIConfig, AzureOpenAIEncoder, EncoderError};
use semroute_router::{
    HashStatus, LocalIndex, Route, RouteIndex, RouterError, SemanticRouter, StateHash,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DEPLOYMENT_PATH: &str = "/openai/deployments/embed-small/embeddings";

fn encoder(uri: &str) -> AzureOpenAIEncoder {
    let config = AzureOpenAIConfig::new()
        .with_api_key("test-key")
        .with_endpoint(uri)
        .with_api_version("2024-02-01")
        .with_model("text-embedding-3-small")
        .with_deployment("embed-small")
        .with_max_retries(2)
        .with_backoff_unit(Duration::from_millis(1));
    AzureOpenAIEncoder::new(config).unwrap()
}

#[tokio::test]
async fn test_aadd_writes_vectors_and_hash() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(DEPLOYMENT_PATH))
        .and(body_partial_json(json!({"input": ["hi", "hello"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"embedding": [0.0, 1.0], "index": 1},
                {"embedding": [1.0, 0.0], "index": 0}
            ],
            "model": "text-embedding-3-small"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut router = SemanticRouter::new(encoder(&server.uri()), LocalIndex::new());
    let greeting = Route::new("greeting", ["hi", "hello"]);

    let outcome = router.aadd(greeting.clone()).await.unwrap();

    let expected = StateHash::compute(&[greeting]).unwrap();
    assert_eq!(outcome.hash, HashStatus::Written(expected.clone()));
    assert_eq!(router.index().read_hash().unwrap(), expected);

    let stored: Vec<(&str, &Vec<f32>)> = router
        .index()
        .entries()
        .iter()
        .map(|e| (e.utterance.as_str(), &e.embedding))
        .collect();
    assert_eq!(
        stored,
        vec![("hi", &vec![1.0, 0.0]), ("hello", &vec![0.0, 1.0])]
    );
    assert!(router.get_utterance_diff(false).unwrap().iter().all(|l| l.starts_with("  ")));
}

#[tokio::test]
async fn test_rejected_credentials_leave_router_untouched() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(DEPLOYMENT_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"code": "401", "message": "Access denied"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut router = SemanticRouter::new(encoder(&server.uri()), LocalIndex::new());

    let err = router
        .aadd(Route::new("greeting", ["hi"]))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        RouterError::Encoder(EncoderError::ProviderCall { .. })
    ));
    assert!(router.routes().is_empty());
    assert!(router.index().is_empty());
    assert!(router.index().read_hash().unwrap().is_uninitialized());
}

#[tokio::test]
async fn test_persisted_index_keeps_sync_state() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(DEPLOYMENT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"embedding": [0.5, 0.5], "index": 0}]
        })))
        .mount(&server)
        .await;

    let mut router = SemanticRouter::new(encoder(&server.uri()), LocalIndex::new());
    router.aadd(Route::new("farewell", ["bye"])).await.unwrap();

    let restored = LocalIndex::from_json(&router.index().to_json().unwrap()).unwrap();
    assert_eq!(restored.read_hash().unwrap(), router.get_hash().unwrap());

    // A fresh router with no routes disagrees with the restored index.
    let mut fresh = SemanticRouter::new(encoder(&server.uri()), restored);
    assert!(!fresh.is_synced().unwrap());
    let outcome = fresh.aadd(Route::new("greeting", ["hi"])).await.unwrap();
    assert!(matches!(outcome.hash, HashStatus::Diverged { .. }));
    assert_eq!(fresh.index().len(), 2);
}
