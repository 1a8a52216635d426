//! Request-shape tests for the PostgREST client.
//!
//! These run against a local mock HTTP server; no real endpoint is needed.
//! The live tests at the bottom need `SUPABASE_URL` and `SUPABASE_KEY`:
//!
//!   cargo test --test rest_client -- --ignored

use std::sync::Arc;

use httpmock::{Method, MockServer};
use serde_json::json;
use table_client::{row_from, ClientConfig, Filter, RestClient, Table, TableError, TableService};

const KEY: &str = "test-key";

fn client_for(server: &MockServer) -> RestClient {
    RestClient::new(ClientConfig::new(server.base_url(), KEY)).unwrap()
}

#[tokio::test]
async fn test_select_sends_filters_and_auth() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(Method::GET)
                .path("/rest/v1/users")
                .query_param("select", "id")
                .query_param("id", "eq.42")
                .header("apikey", KEY)
                .header("authorization", "Bearer test-key");
            then.status(200).json_body(json!([{"id": 42}]));
        })
        .await;

    let users = Table::new(Arc::new(client_for(&server)), "users");
    let rows = users.select("id").eq("id", 42).execute().await.unwrap();

    mock.assert_async().await;
    assert_eq!(rows, vec![row_from(json!({"id": 42}))]);
}

#[tokio::test]
async fn test_select_single_requests_object() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(Method::GET)
                .path("/rest/v1/dialogues")
                .query_param("select", "messages")
                .query_param("id", "eq.abc")
                .header("accept", "application/vnd.pgrst.object+json");
            then.status(200).json_body(json!({"messages": ["hi"]}));
        })
        .await;

    let client = client_for(&server);
    let row = client
        .select_single("dialogues", "messages", &[Filter::eq("id", "abc")])
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(row.get("messages"), Some(&json!(["hi"])));
}

#[tokio::test]
async fn test_select_single_no_rows_maps_to_single_row_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(Method::GET).path("/rest/v1/dialogues");
            then.status(406).json_body(json!({
                "code": "PGRST116",
                "details": "The result contains 0 rows",
                "hint": null,
                "message": "JSON object requested, multiple (or no) rows returned"
            }));
        })
        .await;

    let client = client_for(&server);
    let err = client
        .select_single("dialogues", "*", &[Filter::eq("id", "missing")])
        .await
        .unwrap_err();

    assert!(matches!(err, TableError::SingleRow { rows: 0 }));
}

#[tokio::test]
async fn test_insert_posts_json() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(Method::POST)
                .path("/rest/v1/users")
                .header("prefer", "return=minimal")
                .json_body(json!({"id": 7, "username": "alice"}));
            then.status(201);
        })
        .await;

    let client = client_for(&server);
    client
        .insert("users", row_from(json!({"id": 7, "username": "alice"})))
        .await
        .unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_insert_conflict_is_unique_violation() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(Method::POST).path("/rest/v1/users");
            then.status(409).json_body(json!({
                "code": "23505",
                "details": "Key (id)=(7) already exists.",
                "hint": null,
                "message": "duplicate key value violates unique constraint \"users_pkey\""
            }));
        })
        .await;

    let client = client_for(&server);
    let err = client
        .insert("users", row_from(json!({"id": 7})))
        .await
        .unwrap_err();

    assert!(err.is_unique_violation());
    match err {
        TableError::Api { status, .. } => assert_eq!(status, 409),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_update_patches_filtered_rows() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(Method::PATCH)
                .path("/rest/v1/users")
                .query_param("id", "eq.7")
                .json_body(json!({"current_model": "gpt-4o"}));
            then.status(204);
        })
        .await;

    let users = Table::new(Arc::new(client_for(&server)), "users");
    users
        .update(row_from(json!({"current_model": "gpt-4o"})))
        .eq("id", 7)
        .execute()
        .await
        .unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_server_error_without_json_body() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(Method::GET).path("/rest/v1/users");
            then.status(502).body("bad gateway");
        })
        .await;

    let client = client_for(&server);
    let err = client.select("users", "*", &[]).await.unwrap_err();

    match err {
        TableError::Api {
            status, message, ..
        } => {
            assert_eq!(status, 502);
            assert_eq!(message, "bad gateway");
        }
        other => panic!("unexpected error: {other}"),
    }
}

// ============================================================================
// Live tests (require a reachable endpoint)
// ============================================================================

#[tokio::test]
#[ignore]
async fn test_live_select_users() {
    let _ = dotenvy::dotenv();
    let config = ClientConfig::from_env().expect("SUPABASE_URL and SUPABASE_KEY required");
    let client = RestClient::new(config).unwrap();

    let rows = client
        .select("users", "id", &[Filter::eq("id", -1)])
        .await
        .unwrap();
    assert!(rows.is_empty());
}
