//! REST client behaviour against scripted and live mock transports.

use chrono::{TimeDelta, Utc};
use sdk_http_client::{HttpClientConfig, HttpMethod, HttpOutcome, RequestOptions};
use sdk_rest_client::{
    ErrorKind, RestClient, RestClientError, StaticTokenCredential, TokenCredential,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use test_utils::fixtures::{CONFLICT_MESSAGE, SampleUser};
use test_utils::mocks::MockTransport;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_ok_body_is_returned_unchanged() {
    let transport =
        MockTransport::with_outcomes([HttpOutcome::new(200, json!({ "message": "OK" }))]);
    let client = RestClient::with_transport(transport);

    let body = client.get("/status", RequestOptions::default()).await.unwrap();

    assert_eq!(body, json!({ "message": "OK" }));
}

#[tokio::test]
async fn test_conflict_is_classified() {
    let transport = MockTransport::with_outcomes([HttpOutcome::new(
        409,
        json!({ "message": CONFLICT_MESSAGE }),
    )]);
    let client = RestClient::with_transport(transport);
    let user = SampleUser::root();

    let err = client
        .post(
            "/api/v1/users",
            RequestOptions::default().with_body(serde_json::to_value(&user).unwrap()),
        )
        .await
        .unwrap_err();

    let classified = err.as_classified().unwrap();
    assert_eq!(classified.name(), "Conflict");
    assert_eq!(classified.http_code(), 409);
    assert_eq!(classified.message(), CONFLICT_MESSAGE);
    assert!(classified.is_operational());
}

#[tokio::test]
async fn test_helpers_set_method() {
    let client = RestClient::with_transport(MockTransport::new());

    client.get("/r", RequestOptions::default()).await.unwrap();
    client.post("/r", RequestOptions::default()).await.unwrap();
    client.put("/r", RequestOptions::default()).await.unwrap();
    client.patch("/r", RequestOptions::default()).await.unwrap();
    client.delete("/r", RequestOptions::default()).await.unwrap();

    let methods: Vec<HttpMethod> = client
        .transport()
        .requests()
        .await
        .into_iter()
        .map(|r| r.options.method)
        .collect();
    assert_eq!(
        methods,
        vec![
            HttpMethod::Get,
            HttpMethod::Post,
            HttpMethod::Put,
            HttpMethod::Patch,
            HttpMethod::Delete
        ]
    );
}

#[tokio::test]
async fn test_request_as_deserialises_body() {
    #[derive(Debug, Deserialize, PartialEq)]
    struct Status {
        message: String,
    }

    let transport = MockTransport::with_outcomes([
        HttpOutcome::new(200, json!({ "message": "OK" })),
        HttpOutcome::new(200, json!({ "unexpected": true })),
    ]);
    let client = RestClient::with_transport(transport);

    let status: Status = client
        .request_as("/status", RequestOptions::default())
        .await
        .unwrap();
    assert_eq!(status.message, "OK");

    let err = client
        .request_as::<Status>("/status", RequestOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, RestClientError::Deserialize(_)));
}

#[tokio::test]
async fn test_credential_adds_bearer_header() {
    let credential: Arc<dyn TokenCredential> = Arc::new(StaticTokenCredential::new(
        "token-123",
        Utc::now() + TimeDelta::hours(1),
    ));
    let client = RestClient::with_transport(MockTransport::new())
        .with_credential(credential, vec!["users.read".to_string()]);

    client.get("/me", RequestOptions::default()).await.unwrap();

    let requests = client.transport().requests().await;
    assert_eq!(
        requests[0].options.headers.get("authorization").map(String::as_str),
        Some("Bearer token-123")
    );
}

#[tokio::test]
async fn test_expired_credential_fails_before_sending() {
    let credential: Arc<dyn TokenCredential> = Arc::new(StaticTokenCredential::new(
        "token-123",
        Utc::now() - TimeDelta::minutes(1),
    ));
    let client =
        RestClient::with_transport(MockTransport::new()).with_credential(credential, Vec::new());

    let err = client.get("/me", RequestOptions::default()).await.unwrap_err();

    assert!(matches!(err, RestClientError::Credential(_)));
    assert_eq!(client.transport().count().await, 0);
}

#[tokio::test]
async fn test_end_to_end_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "OK" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/users"))
        .and(header("content-type", "application/json"))
        .respond_with(
            ResponseTemplate::new(409).set_body_json(json!({ "message": CONFLICT_MESSAGE })),
        )
        .mount(&server)
        .await;

    let client = RestClient::new(HttpClientConfig::new(server.uri())).unwrap();

    let body = client.get("/status", RequestOptions::default()).await.unwrap();
    assert_eq!(body, json!({ "message": "OK" }));

    let err = client
        .post(
            "/api/v1/users",
            RequestOptions::default().with_body(json!({ "username": "root-user" })),
        )
        .await
        .unwrap_err();
    let classified = err.as_classified().unwrap();
    assert_eq!(classified.kind(), ErrorKind::Conflict);
    assert_eq!(classified.message(), CONFLICT_MESSAGE);
}

#[tokio::test]
async fn test_transport_failure_is_not_classified() {
    // Nothing listens on port 9 of the loopback interface.
    let client = RestClient::new(HttpClientConfig::new("http://127.0.0.1:9")).unwrap();

    let err = client.get("/status", RequestOptions::default()).await.unwrap_err();

    assert!(matches!(err, RestClientError::Http(_)));
    assert!(err.as_classified().is_none());
}
