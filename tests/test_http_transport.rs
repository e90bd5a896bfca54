// tests/test_http_transport.rs
//! The HTTP stack against a mock Omeka S server: authentication, status
//! classification, retries and the total-results header.

mod common;

use common::{fetcher, http_client, KEY_CREDENTIAL, KEY_IDENTITY};
use omeka_harvest::{ApiRequest, FetchError, RecordId, Transport};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_credentials_are_sent_as_query_params() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/items"))
        .and(query_param("key_identity", KEY_IDENTITY))
        .and(query_param("key_credential", KEY_CREDENTIAL))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"o:id": 1}])))
        .expect(1)
        .mount(&server)
        .await;

    let response = http_client(&server)
        .get(&ApiRequest::new("items").param("page", 1))
        .await
        .unwrap();
    assert_eq!(response.payload, json!([{"o:id": 1}]));
    assert!(!response.from_cache);
}

#[tokio::test]
async fn test_total_results_header_is_read() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/items"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Omeka-S-Total-Results", "250")
                .set_body_json(json!([])),
        )
        .mount(&server)
        .await;

    let response = http_client(&server)
        .get(&ApiRequest::new("items"))
        .await
        .unwrap();
    assert_eq!(response.total_results, Some(250));
}

#[tokio::test]
async fn test_server_error_is_retried_until_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/items"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"o:id": 7}])))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = fetcher(&server, 3);
    let (records, _) = fetcher
        .fetch_page(&ApiRequest::new("items").param("page", 1))
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(fetcher.stats().network_attempts, 2);
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/items/404"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = fetcher(&server, 3);
    let err = fetcher
        .fetch_resource("items", RecordId::new(404))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Rejected { status: 404, .. }));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn test_retry_budget_exhausted_on_persistent_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/media"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let err = fetcher(&server, 2)
        .fetch(&ApiRequest::new("media"))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Transient { status: Some(503), .. }));
}

#[tokio::test]
async fn test_invalid_json_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/items"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let err = fetcher(&server, 3)
        .fetch(&ApiRequest::new("items"))
        .await
        .unwrap_err();
    match err {
        FetchError::Decode { url, reason } => {
            assert_eq!(url, "items");
            assert!(reason.contains("maintenance"));
        }
        other => panic!("expected decode error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_errors_never_carry_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let err = http_client(&server)
        .get(&ApiRequest::new("items").param("page", 1))
        .await
        .unwrap_err();
    let message = err.to_string();
    assert!(!message.contains(KEY_CREDENTIAL));
    assert!(!message.contains(KEY_IDENTITY));
}
