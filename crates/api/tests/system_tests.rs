mod common;

use api::gql::build_schema;
use common::*;

#[tokio::test]
async fn test_server_time_query() {
    let schema = build_schema(lazy_state());

    let query = r#"
        query {
            serverTime
        }
    "#;

    let response = execute_graphql(&schema, query, None, None).await;

    assert!(
        response.errors.is_empty(),
        "Server time query should succeed: {:?}",
        response.errors
    );

    let data = response.data.into_json().unwrap();
    assert!(
        data["serverTime"].is_string(),
        "Server time should be a string"
    );
}

#[tokio::test]
async fn test_invalid_query() {
    let schema = build_schema(lazy_state());

    let query = r#"
        query {
            nonExistentField
        }
    "#;

    let response = execute_graphql(&schema, query, None, None).await;

    assert!(
        !response.errors.is_empty(),
        "Invalid query should return errors"
    );
    assert!(response.errors[0].message.contains("Cannot query field"));
}

#[tokio::test]
async fn test_malformed_query() {
    let schema = build_schema(lazy_state());

    let query = r#"
        query {
            teams {
                id
                # missing closing brace
    "#;

    let response = execute_graphql(&schema, query, None, None).await;

    assert!(
        !response.errors.is_empty(),
        "Malformed query should return errors"
    );
}

#[tokio::test]
async fn test_admin_queries_require_authentication() {
    let schema = build_schema(lazy_state());

    for query in [
        "query { registrations { id } }",
        "query { outboxStatus { pending } }",
        "query { spectatorRequests { id } }",
        "mutation { capitalizeNames { total } }",
        "mutation { resetFantasyGameweek }",
    ] {
        let response = execute_graphql(&schema, query, None, None).await;
        assert_eq!(
            error_code(&response).as_deref(),
            Some("UNAUTHORIZED"),
            "{query} should be refused without a token"
        );
    }
}

#[tokio::test]
async fn test_me_requires_authentication() {
    let schema = build_schema(lazy_state());

    let response = execute_graphql(&schema, "query { me { id email } }", None, None).await;

    assert_eq!(error_code(&response).as_deref(), Some("UNAUTHORIZED"));
}

#[tokio::test]
async fn test_schema_exposes_registration_subscription() {
    let schema = build_schema(lazy_state());
    let sdl = schema.sdl();

    assert!(sdl.contains("registrationEvents"));
    assert!(sdl.contains("scalar Price"));
}
