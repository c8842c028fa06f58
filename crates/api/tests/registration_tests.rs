mod common;

use api::gql::build_schema;
use common::*;
use infra::repos::{AccountRepo, AccountRole, OutboxRepo, OutboxStatus};
use serde_json::json;

const SUBMIT: &str = r#"
    mutation Submit($input: RegistrationInput!) {
        submitRegistration(input: $input) { id status waitingList players { jerseyNumber } }
    }
"#;

const APPROVE: &str = r#"
    mutation Approve($id: UUID!) {
        approveRegistration(id: $id, notifyCaptain: true) {
            alreadyApproved
            accountsCreated
            emailsQueued
            registration { status teamId }
            team { id name players { jerseyNumber position } statistics { points played } }
        }
    }
"#;

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_approval_creates_team_and_is_idempotent() {
    let app_state = setup_test_db().await;
    let schema = build_schema(app_state.clone());
    let admin = create_test_admin(&app_state).await;

    let response = execute_graphql(
        &schema,
        SUBMIT,
        Some(json!({ "input": registration_input("Les Aigles") })),
        None,
    )
    .await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);
    let submitted = response.data.into_json().unwrap()["submitRegistration"].clone();
    let id = submitted["id"].clone();

    let response = execute_graphql(&schema, APPROVE, Some(json!({ "id": id })), Some(admin.clone())).await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);
    let first = response.data.into_json().unwrap()["approveRegistration"].clone();

    assert_eq!(first["alreadyApproved"], json!(false));
    // One player with an e-mail plus the coach.
    assert_eq!(first["accountsCreated"], json!(2));
    // Two credential e-mails and the captain's decision.
    assert_eq!(first["emailsQueued"], json!(3));
    assert_eq!(first["registration"]["status"], json!("APPROVED"));
    assert_eq!(first["registration"]["teamId"], first["team"]["id"]);
    assert_eq!(first["team"]["players"].as_array().unwrap().len(), 2);
    assert_eq!(first["team"]["statistics"]["points"], json!(0));

    let response = execute_graphql(&schema, APPROVE, Some(json!({ "id": id })), Some(admin)).await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);
    let second = response.data.into_json().unwrap()["approveRegistration"].clone();

    assert_eq!(second["alreadyApproved"], json!(true));
    assert_eq!(second["team"]["id"], first["team"]["id"]);
    assert_eq!(second["emailsQueued"], json!(0));

    let pending = OutboxRepo::new(app_state.db.clone())
        .list(Some(OutboxStatus::Pending), None)
        .await
        .unwrap();
    assert!(pending.iter().any(|row| row.kind == "account_setup"));
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_only_rejected_registrations_can_be_deleted() {
    let app_state = setup_test_db().await;
    let schema = build_schema(app_state.clone());
    let admin = create_test_admin(&app_state).await;

    let response = execute_graphql(
        &schema,
        SUBMIT,
        Some(json!({ "input": registration_input("Les Lions") })),
        None,
    )
    .await;
    let id = response.data.into_json().unwrap()["submitRegistration"]["id"].clone();

    let delete = r#"mutation Delete($id: UUID!) { deleteRegistration(id: $id) }"#;
    let response = execute_graphql(&schema, delete, Some(json!({ "id": id })), Some(admin.clone())).await;
    assert_eq!(error_code(&response).as_deref(), Some("INVALID_STATE"));

    let reject = r#"
        mutation Reject($id: UUID!) {
            rejectRegistration(id: $id, reason: "Dossier incomplet", notifyCaptain: false) {
                status
                rejectionReason
            }
        }
    "#;
    let response = execute_graphql(&schema, reject, Some(json!({ "id": id })), Some(admin.clone())).await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);
    let rejected = response.data.into_json().unwrap()["rejectRegistration"].clone();
    assert_eq!(rejected["status"], json!("REJECTED"));
    assert_eq!(rejected["rejectionReason"], json!("Dossier incomplet"));

    let approve = execute_graphql(&schema, APPROVE, Some(json!({ "id": id })), Some(admin.clone())).await;
    assert_eq!(error_code(&approve).as_deref(), Some("INVALID_STATE"));

    let response = execute_graphql(&schema, delete, Some(json!({ "id": id })), Some(admin)).await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);
    assert_eq!(response.data.into_json().unwrap()["deleteRegistration"], json!(true));
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_invalid_registration_lists_every_error() {
    let app_state = setup_test_db().await;
    let schema = build_schema(app_state);

    let mut input = registration_input("");
    input["captain"]["email"] = json!("pas-une-adresse");
    input["players"][1]["jerseyNumber"] = json!(1);

    let response = execute_graphql(&schema, SUBMIT, Some(json!({ "input": input })), None).await;

    assert_eq!(error_code(&response).as_deref(), Some("VALIDATION"));
    let errors = response.errors[0]
        .extensions
        .as_ref()
        .and_then(|ext| ext.get("errors").cloned())
        .unwrap();
    match errors {
        async_graphql::Value::List(errors) => assert_eq!(errors.len(), 3),
        other => panic!("unexpected errors value: {other:?}"),
    }
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_collaborative_registration_flow() {
    let app_state = setup_test_db().await;
    let schema = build_schema(app_state);

    let mut input = registration_input("Les Loups");
    input["players"] = json!([]);
    let create = r#"
        mutation Create($input: RegistrationInput!) {
            createCollaborativeRegistration(input: $input) { id status inviteToken }
        }
    "#;
    let response = execute_graphql(&schema, create, Some(json!({ "input": input })), None).await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);
    let created = response.data.into_json().unwrap()["createCollaborativeRegistration"].clone();
    assert_eq!(created["status"], json!("PENDING_PLAYERS"));
    let token = created["inviteToken"].as_str().unwrap().to_string();

    let finalize = r#"
        mutation Finalize($token: String!) { finalizeRegistration(token: $token) { status inviteToken } }
    "#;
    let response = execute_graphql(&schema, finalize, Some(json!({ "token": token })), None).await;
    assert_eq!(error_code(&response).as_deref(), Some("VALIDATION"));

    let add = r#"
        mutation Add($token: String!, $player: PlayerInput!) {
            addRegistrationPlayer(token: $token, player: $player) { players { jerseyNumber } }
        }
    "#;
    let player = json!({
        "firstName": "Nina",
        "lastName": "Roux",
        "position": "DEFENDER",
        "foot": "BOTH",
        "jerseyNumber": 4
    });
    let response = execute_graphql(
        &schema,
        add,
        Some(json!({ "token": token, "player": player })),
        None,
    )
    .await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);

    let response = execute_graphql(&schema, finalize, Some(json!({ "token": token })), None).await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);
    let finalized = response.data.into_json().unwrap()["finalizeRegistration"].clone();
    assert_eq!(finalized["inviteToken"], json!(null));
}

async fn submit_and_approve(
    schema: &api::gql::AppSchema,
    admin: &api::auth::Claims,
    input: serde_json::Value,
) -> serde_json::Value {
    let response = execute_graphql(schema, SUBMIT, Some(json!({ "input": input })), None).await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);
    let id = response.data.into_json().unwrap()["submitRegistration"]["id"].clone();

    let response = execute_graphql(schema, APPROVE, Some(json!({ "id": id })), Some(admin.clone())).await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);
    response.data.into_json().unwrap()["approveRegistration"].clone()
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_failed_approval_leaves_nothing_behind() {
    let app_state = setup_test_db().await;
    let schema = build_schema(app_state.clone());
    let admin = create_test_admin(&app_state).await;

    let first = registration_input("Les Faucons");
    let taken_email = first["players"][0]["email"].clone();
    submit_and_approve(&schema, &admin, first).await;

    let team_name = format!("Les Vautours {}", uuid::Uuid::new_v4());
    let mut second = registration_input(&team_name);
    let taken = taken_email.as_str().unwrap().to_string();
    second["players"][0]["email"] = taken_email;
    let coach_email = second["coach"]["email"].as_str().unwrap().to_string();
    let captain_email = second["captain"]["email"].as_str().unwrap().to_string();

    let response = execute_graphql(&schema, SUBMIT, Some(json!({ "input": second })), None).await;
    let id = response.data.into_json().unwrap()["submitRegistration"]["id"].clone();

    let response = execute_graphql(&schema, APPROVE, Some(json!({ "id": id })), Some(admin.clone())).await;
    assert_eq!(error_code(&response).as_deref(), Some("CONFLICT"));

    let teams: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM teams WHERE name = $1")
        .bind(&team_name)
        .fetch_one(&app_state.db)
        .await
        .unwrap();
    assert_eq!(teams, 0);

    let coaches: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM coach_accounts WHERE email = $1")
        .bind(&coach_email)
        .fetch_one(&app_state.db)
        .await
        .unwrap();
    assert_eq!(coaches, 0);

    let queued: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM email_outbox WHERE recipient = $1 OR recipient = $2",
    )
    .bind(&coach_email)
    .bind(&captain_email)
    .fetch_one(&app_state.db)
    .await
    .unwrap();
    assert_eq!(queued, 0);

    // Only the first team's copy of the shared address survives.
    let players: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM players WHERE email = $1")
        .bind(taken.as_str())
        .fetch_one(&app_state.db)
        .await
        .unwrap();
    assert_eq!(players, 1);

    let query = r#"query Get($id: UUID!) { registration(id: $id) { status teamId } }"#;
    let response = execute_graphql(&schema, query, Some(json!({ "id": id })), Some(admin)).await;
    let registration = response.data.into_json().unwrap()["registration"].clone();
    assert_eq!(registration["status"], json!("PENDING"));
    assert_eq!(registration["teamId"], json!(null));
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_team_contacts_are_limited_to_members() {
    let app_state = setup_test_db().await;
    let schema = build_schema(app_state.clone());
    let admin = create_test_admin(&app_state).await;

    let approved = submit_and_approve(&schema, &admin, registration_input("Les Hiboux")).await;
    let team_id: uuid::Uuid = serde_json::from_value(approved["team"]["id"].clone()).unwrap();
    let other_team = create_test_team(&app_state, "Les Chouettes").await;

    let query = r#"
        query Team($id: UUID!) {
            team(id: $id) { name captain { email phone } coach { email } players { email birthDate } }
        }
    "#;

    // Anonymous callers see the team but none of its people.
    let response = execute_graphql(&schema, query, Some(json!({ "id": team_id })), None).await;
    assert_eq!(error_code(&response).as_deref(), Some("UNAUTHORIZED"));
    let team = response.data.into_json().unwrap()["team"].clone();
    assert_eq!(team["name"], json!("Les Hiboux"));
    assert_eq!(team["captain"], json!(null));
    assert_eq!(team["coach"], json!(null));
    assert_eq!(team["players"], json!(null));

    let accounts = AccountRepo::new(app_state.db.clone())
        .list(Some(team_id))
        .await
        .unwrap();
    let player = accounts.iter().find(|a| a.role == "player").unwrap();
    let member = claims_for(player.id, &player.email, AccountRole::Player, Some(team_id));

    let response = execute_graphql(&schema, query, Some(json!({ "id": team_id })), Some(member.clone())).await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);
    let team = response.data.into_json().unwrap()["team"].clone();
    assert_eq!(team["captain"]["phone"], json!("0601020304"));
    assert_eq!(team["players"].as_array().unwrap().len(), 2);

    let response = execute_graphql(&schema, query, Some(json!({ "id": other_team })), Some(member)).await;
    assert_eq!(error_code(&response).as_deref(), Some("FORBIDDEN"));
    let team = response.data.into_json().unwrap()["team"].clone();
    assert_eq!(team["captain"], json!(null));
}
