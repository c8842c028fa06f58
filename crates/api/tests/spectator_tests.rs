mod common;

use api::gql::build_schema;
use chrono::{Duration, Utc};
use common::*;
use serde_json::{json, Value};
use uuid::Uuid;

const REQUEST_SEAT: &str = r#"
    mutation Request($input: SpectatorRequestInput!) {
        requestSpectatorSeat(input: $input) { id status }
    }
"#;

const APPROVE: &str = r#"
    mutation Approve($id: UUID!) { approveSpectator(id: $id) { id status } }
"#;

const CHECK_IN: &str = r#"
    mutation CheckIn($id: UUID!) { checkInSpectator(id: $id) { checkedIn checkedInAt } }
"#;

fn seat_request(match_id: &Value, first_name: &str) -> Value {
    json!({
        "input": {
            "matchId": match_id,
            "firstName": first_name,
            "lastName": "Spectateur",
            "email": format!("{}-{}@league.test", first_name.to_lowercase(), Uuid::new_v4()),
        }
    })
}

async fn create_match(schema: &api::gql::AppSchema, admin: &api::auth::Claims, home: Uuid, away: Uuid) -> Value {
    let query = r#"
        mutation Create($input: CreateMatchInput!) {
            createMatch(input: $input) { id status }
        }
    "#;
    let variables = json!({
        "input": {
            "homeTeamId": home,
            "awayTeamId": away,
            "kickoffAt": (Utc::now() + Duration::days(7)).to_rfc3339(),
            "venue": "Stade municipal"
        }
    });
    let response = execute_graphql(schema, query, Some(variables), Some(admin.clone())).await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);
    response.data.into_json().unwrap()["createMatch"]["id"].clone()
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_capacity_is_enforced_on_approval() {
    let app_state = setup_test_db().await;
    let schema = build_schema(app_state.clone());
    let admin = create_test_admin(&app_state).await;
    let home = create_test_team(&app_state, "Les Aigles").await;
    let away = create_test_team(&app_state, "Les Lions").await;
    let match_id = create_match(&schema, &admin, home, away).await;

    let set_limit = r#"
        mutation Limit($matchId: UUID!) {
            setSpectatorLimit(matchId: $matchId, maxSpectators: 1) { maxSpectators remaining }
        }
    "#;
    let response = execute_graphql(
        &schema,
        set_limit,
        Some(json!({ "matchId": match_id })),
        Some(admin.clone()),
    )
    .await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);

    let mut ids = Vec::new();
    for name in ["Alice", "Bruno"] {
        let response = execute_graphql(&schema, REQUEST_SEAT, Some(seat_request(&match_id, name)), None).await;
        assert!(response.errors.is_empty(), "{:?}", response.errors);
        let request = response.data.into_json().unwrap()["requestSpectatorSeat"].clone();
        assert_eq!(request["status"], json!("PENDING"));
        ids.push(request["id"].clone());
    }

    let response = execute_graphql(&schema, APPROVE, Some(json!({ "id": ids[0] })), Some(admin.clone())).await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);

    let response = execute_graphql(&schema, APPROVE, Some(json!({ "id": ids[1] })), Some(admin.clone())).await;
    assert_eq!(error_code(&response).as_deref(), Some("CAPACITY_REACHED"));

    // The match is now full for new requests too.
    let response = execute_graphql(&schema, REQUEST_SEAT, Some(seat_request(&match_id, "Chloe")), None).await;
    assert_eq!(error_code(&response).as_deref(), Some("CAPACITY_REACHED"));

    let limit = r#"
        query Limit($matchId: UUID!) { spectatorLimit(matchId: $matchId) { approved remaining } }
    "#;
    let response = execute_graphql(&schema, limit, Some(json!({ "matchId": match_id })), None).await;
    let limit = response.data.into_json().unwrap()["spectatorLimit"].clone();
    assert_eq!(limit["approved"], json!(1));
    assert_eq!(limit["remaining"], json!(0));
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_check_in_keeps_first_timestamp() {
    let app_state = setup_test_db().await;
    let schema = build_schema(app_state.clone());
    let admin = create_test_admin(&app_state).await;
    let home = create_test_team(&app_state, "Les Loups").await;
    let away = create_test_team(&app_state, "Les Ours").await;
    let match_id = create_match(&schema, &admin, home, away).await;

    let response = execute_graphql(&schema, REQUEST_SEAT, Some(seat_request(&match_id, "Denis")), None).await;
    let id = response.data.into_json().unwrap()["requestSpectatorSeat"]["id"].clone();

    let response = execute_graphql(&schema, CHECK_IN, Some(json!({ "id": id })), Some(admin.clone())).await;
    assert_eq!(error_code(&response).as_deref(), Some("INVALID_STATE"));

    execute_graphql(&schema, APPROVE, Some(json!({ "id": id })), Some(admin.clone())).await;

    let response = execute_graphql(&schema, CHECK_IN, Some(json!({ "id": id })), Some(admin.clone())).await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);
    let first = response.data.into_json().unwrap()["checkInSpectator"].clone();
    assert_eq!(first["checkedIn"], json!(true));

    let response = execute_graphql(&schema, CHECK_IN, Some(json!({ "id": id })), Some(admin)).await;
    let second = response.data.into_json().unwrap()["checkInSpectator"].clone();
    assert_eq!(second["checkedInAt"], first["checkedInAt"]);
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_match_against_itself_is_refused() {
    let app_state = setup_test_db().await;
    let schema = build_schema(app_state.clone());
    let admin = create_test_admin(&app_state).await;
    let team = create_test_team(&app_state, "Les Renards").await;

    let query = r#"
        mutation Create($input: CreateMatchInput!) { createMatch(input: $input) { id } }
    "#;
    let variables = json!({
        "input": { "homeTeamId": team, "awayTeamId": team, "kickoffAt": Utc::now().to_rfc3339() }
    });
    let response = execute_graphql(&schema, query, Some(variables), Some(admin)).await;

    assert_eq!(error_code(&response).as_deref(), Some("VALIDATION"));
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_concurrent_approvals_respect_the_limit() {
    let app_state = setup_test_db().await;
    let schema = build_schema(app_state.clone());
    let admin = create_test_admin(&app_state).await;
    let home = create_test_team(&app_state, "Les Castors").await;
    let away = create_test_team(&app_state, "Les Blaireaux").await;
    let match_id = create_match(&schema, &admin, home, away).await;

    let set_limit = r#"
        mutation Limit($matchId: UUID!) {
            setSpectatorLimit(matchId: $matchId, maxSpectators: 1) { maxSpectators }
        }
    "#;
    execute_graphql(&schema, set_limit, Some(json!({ "matchId": match_id })), Some(admin.clone())).await;

    let mut ids = Vec::new();
    for name in ["Emma", "Farid"] {
        let response = execute_graphql(&schema, REQUEST_SEAT, Some(seat_request(&match_id, name)), None).await;
        assert!(response.errors.is_empty(), "{:?}", response.errors);
        ids.push(response.data.into_json().unwrap()["requestSpectatorSeat"]["id"].clone());
    }

    let (first, second) = tokio::join!(
        execute_graphql(&schema, APPROVE, Some(json!({ "id": ids[0] })), Some(admin.clone())),
        execute_graphql(&schema, APPROVE, Some(json!({ "id": ids[1] })), Some(admin.clone())),
    );

    let approved = [&first, &second].iter().filter(|r| r.errors.is_empty()).count();
    assert_eq!(approved, 1);
    let refused = if first.errors.is_empty() { &second } else { &first };
    assert_eq!(error_code(refused).as_deref(), Some("CAPACITY_REACHED"));

    let approved_rows: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM spectator_requests WHERE match_id = $1 AND status = 'approved'",
    )
    .bind(serde_json::from_value::<Uuid>(match_id).unwrap())
    .fetch_one(&app_state.db)
    .await
    .unwrap();
    assert_eq!(approved_rows, 1);
}
