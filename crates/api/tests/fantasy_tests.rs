mod common;

use api::gql::build_schema;
use common::*;
use serde_json::{json, Value};
use uuid::Uuid;

const VALIDATE_TEAM: &str = r#"
    query Validate($name: String!, $formation: Formation!, $slots: [FantasySlotInput!]!) {
        validateFantasyTeam(name: $name, formation: $formation, slots: $slots) {
            valid
            errors
        }
    }
"#;

fn slot(position: &str, price: f64, captain: bool) -> Value {
    json!({
        "playerId": Uuid::new_v4(),
        "position": position,
        "price": price,
        "isCaptain": captain,
    })
}

/// 3-2-1 squad: goalkeeper, three defenders, two midfielders, one attacker.
fn squad(prices: [f64; 7]) -> Vec<Value> {
    let positions = [
        "GOALKEEPER",
        "DEFENDER",
        "DEFENDER",
        "DEFENDER",
        "MIDFIELDER",
        "MIDFIELDER",
        "ATTACKER",
    ];
    positions
        .iter()
        .zip(prices)
        .enumerate()
        .map(|(i, (position, price))| slot(position, price, i == 6))
        .collect()
}

async fn validate(slots: Vec<Value>) -> Value {
    let schema = build_schema(lazy_state());
    let variables = json!({ "name": "Les Aigles", "formation": "F_3_2_1", "slots": slots });

    let response = execute_graphql(&schema, VALIDATE_TEAM, Some(variables), None).await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);

    response.data.into_json().unwrap()["validateFantasyTeam"].clone()
}

#[tokio::test]
async fn test_squad_within_budget_is_valid() {
    let result = validate(squad([5.0, 6.0, 6.0, 7.0, 7.0, 6.0, 9.0])).await;

    assert_eq!(result["valid"], json!(true), "{result}");
    assert_eq!(result["errors"], json!([]));
}

#[tokio::test]
async fn test_squad_over_budget_reports_overage() {
    let result = validate(squad([5.0, 6.0, 6.0, 7.0, 7.0, 6.0, 63.5])).await;

    assert_eq!(result["valid"], json!(false));
    let errors = result["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert!(
        errors[0].as_str().unwrap().contains("Budget dépassé de 0.5M€"),
        "{errors:?}"
    );
}

#[tokio::test]
async fn test_captain_count_is_checked() {
    let mut no_captain = squad([5.0, 6.0, 6.0, 7.0, 7.0, 6.0, 9.0]);
    no_captain[6]["isCaptain"] = json!(false);
    let result = validate(no_captain).await;
    assert_eq!(result["valid"], json!(false));
    assert_eq!(result["errors"], json!(["Vous devez désigner un capitaine"]));

    let mut two_captains = squad([5.0, 6.0, 6.0, 7.0, 7.0, 6.0, 9.0]);
    two_captains[0]["isCaptain"] = json!(true);
    let result = validate(two_captains).await;
    assert_eq!(result["errors"], json!(["Un seul capitaine est autorisé"]));
}

#[tokio::test]
async fn test_cannot_add_to_full_position() {
    let schema = build_schema(lazy_state());
    let query = r#"
        query Check($slots: [FantasySlotInput!]!, $candidate: FantasySlotInput!) {
            canAddFantasyPlayer(formation: F_3_2_1, slots: $slots, candidate: $candidate) {
                valid
                errors
            }
        }
    "#;
    let slots = vec![slot("ATTACKER", 5.0, false)];
    let variables = json!({ "slots": slots, "candidate": slot("ATTACKER", 1.0, false) });

    let response = execute_graphql(&schema, query, Some(variables), None).await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);

    let result = response.data.into_json().unwrap()["canAddFantasyPlayer"].clone();
    assert_eq!(result["valid"], json!(false));
    assert_eq!(result["errors"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_transfer_across_positions_fails() {
    let schema = build_schema(lazy_state());
    let query = r#"
        query Transfer($slots: [FantasySlotInput!]!, $outgoing: UUID!, $incoming: FantasySlotInput!) {
            validateFantasyTransfer(slots: $slots, outgoing: $outgoing, incoming: $incoming) {
                valid
                errors
            }
        }
    "#;
    let slots = squad([5.0, 6.0, 6.0, 7.0, 7.0, 6.0, 9.0]);
    let outgoing = slots[1]["playerId"].clone();
    let variables = json!({
        "slots": slots,
        "outgoing": outgoing,
        "incoming": slot("ATTACKER", 6.0, false),
    });

    let response = execute_graphql(&schema, query, Some(variables), None).await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);

    let result = response.data.into_json().unwrap()["validateFantasyTransfer"].clone();
    assert_eq!(result["valid"], json!(false));
}

#[tokio::test]
async fn test_rules_list_every_formation() {
    let schema = build_schema(lazy_state());
    let query = r#"
        query {
            fantasyRules {
                squadSize
                budget
                freeTransfers
                transferPenalty
                formations { formation label defenders midfielders attackers }
            }
        }
    "#;

    let response = execute_graphql(&schema, query, None, None).await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);

    let rules = response.data.into_json().unwrap()["fantasyRules"].clone();
    assert_eq!(rules["squadSize"], json!(7));
    assert_eq!(rules["budget"].as_f64(), Some(100.0));
    assert_eq!(rules["transferPenalty"], json!(4));

    let formations = rules["formations"].as_array().unwrap();
    assert_eq!(formations.len(), 5);
    for formation in formations {
        let outfield = formation["defenders"].as_i64().unwrap()
            + formation["midfielders"].as_i64().unwrap()
            + formation["attackers"].as_i64().unwrap();
        assert_eq!(outfield, 6, "{formation}");
    }
}

#[tokio::test]
async fn test_negative_price_is_rejected() {
    let schema = build_schema(lazy_state());
    let mut slots = squad([5.0, 6.0, 6.0, 7.0, 7.0, 6.0, 9.0]);
    slots[0]["price"] = json!(-1.0);
    let variables = json!({ "name": "Les Aigles", "formation": "F_3_2_1", "slots": slots });

    let response = execute_graphql(&schema, VALIDATE_TEAM, Some(variables), None).await;
    assert!(!response.errors.is_empty());
}

#[tokio::test]
async fn test_price_above_budget_is_rejected() {
    let schema = build_schema(lazy_state());
    let mut slots = squad([5.0, 6.0, 6.0, 7.0, 7.0, 6.0, 9.0]);
    slots[0]["price"] = json!(214_748_364.0);
    slots[1]["price"] = json!(214_748_364.0);
    let variables = json!({ "name": "Les Aigles", "formation": "F_3_2_1", "slots": slots });

    let response = execute_graphql(&schema, VALIDATE_TEAM, Some(variables), None).await;

    assert!(!response.errors.is_empty());
    assert!(response.errors[0].message.contains("between 0 and 100"), "{:?}", response.errors);
}

#[tokio::test]
async fn test_squad_of_full_budget_players_is_over_budget() {
    let result = validate(squad([100.0; 7])).await;

    assert_eq!(result["valid"], json!(false));
    let errors = result["errors"].as_array().unwrap();
    assert!(
        errors.iter().any(|e| e.as_str().unwrap().starts_with("Budget dépassé de 600M€")),
        "{result}"
    );
}

const ADD_PLAYER: &str = r#"
    mutation Add($teamId: UUID!, $input: PlayerInput!) {
        addPlayer(teamId: $teamId, input: $input) { id }
    }
"#;

const SAVE_SQUAD: &str = r#"
    mutation Save($input: SaveFantasyTeamInput!) {
        saveFantasyTeam(input: $input) { transfersMade penaltyPoints totalCost }
    }
"#;

const TRANSFER: &str = r#"
    mutation Transfer($outgoing: UUID!, $incoming: UUID!) {
        transferFantasyPlayer(outgoing: $outgoing, incoming: $incoming) {
            transfersMade
            penaltyPoints
        }
    }
"#;

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_transfers_beyond_the_free_one_cost_points() {
    let app_state = setup_test_db().await;
    let schema = build_schema(app_state.clone());
    let admin = create_test_admin(&app_state).await;
    let team_id = create_test_team(&app_state, "Les Mouettes").await;

    // Goalkeeper, five defenders, two midfielders, one attacker.
    let positions = [
        "GOALKEEPER", "DEFENDER", "DEFENDER", "DEFENDER", "DEFENDER", "DEFENDER",
        "MIDFIELDER", "MIDFIELDER", "ATTACKER",
    ];
    let mut ids = Vec::new();
    for (index, position) in positions.iter().enumerate() {
        let input = json!({
            "firstName": format!("Joueur{index}"),
            "lastName": "Test",
            "position": position,
            "foot": "RIGHT",
            "jerseyNumber": index + 1
        });
        let response = execute_graphql(
            &schema,
            ADD_PLAYER,
            Some(json!({ "teamId": team_id, "input": input })),
            Some(admin.clone()),
        )
        .await;
        assert!(response.errors.is_empty(), "{:?}", response.errors);
        ids.push(response.data.into_json().unwrap()["addPlayer"]["id"].clone());
    }

    let squad_ids = [0, 1, 2, 3, 6, 7, 8];
    let picks: Vec<Value> = squad_ids
        .iter()
        .map(|&i| json!({ "playerId": ids[i], "isCaptain": i == 8 }))
        .collect();
    let input = json!({ "name": "Les Goélands", "formation": "F_3_2_1", "players": picks });
    let response = execute_graphql(&schema, SAVE_SQUAD, Some(json!({ "input": input })), Some(admin.clone())).await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);
    let saved = response.data.into_json().unwrap()["saveFantasyTeam"].clone();
    assert_eq!(saved["transfersMade"], json!(0));
    assert_eq!(saved["penaltyPoints"], json!(0));
    // 5 + 3 × 5.5 + 2 × 6 + 7
    assert_eq!(saved["totalCost"], json!(40.5));

    let response = execute_graphql(
        &schema,
        TRANSFER,
        Some(json!({ "outgoing": ids[1], "incoming": ids[4] })),
        Some(admin.clone()),
    )
    .await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);
    let first = response.data.into_json().unwrap()["transferFantasyPlayer"].clone();
    assert_eq!(first["transfersMade"], json!(1));
    assert_eq!(first["penaltyPoints"], json!(0));

    let response = execute_graphql(
        &schema,
        TRANSFER,
        Some(json!({ "outgoing": ids[2], "incoming": ids[5] })),
        Some(admin.clone()),
    )
    .await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);
    let second = response.data.into_json().unwrap()["transferFantasyPlayer"].clone();
    assert_eq!(second["transfersMade"], json!(2));
    assert_eq!(second["penaltyPoints"], json!(4));

    // A defender who left earlier can come back.
    let response = execute_graphql(
        &schema,
        TRANSFER,
        Some(json!({ "outgoing": ids[3], "incoming": ids[1] })),
        Some(admin.clone()),
    )
    .await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);
    let third = response.data.into_json().unwrap()["transferFantasyPlayer"].clone();
    assert_eq!(third["transfersMade"], json!(3));
    assert_eq!(third["penaltyPoints"], json!(8));
}
