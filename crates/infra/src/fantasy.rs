//! Fantasy squad rules.
//!
//! A squad is a list of [`FantasySlot`]s built under a [`Formation`] and the
//! [`TOTAL_BUDGET`]. Every check returns a [`Validation`] listing all the
//! violated rules as French messages, which the league UI shows verbatim.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Sub};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Position;

/// Goalkeeper plus six outfield players.
pub const SQUAD_SIZE: usize = 7;
pub const TOTAL_BUDGET: Price = Price::from_millions(100);
/// No single player can cost more than the whole budget.
pub const MAX_PRICE: Price = TOTAL_BUDGET;
pub const FREE_TRANSFERS: u32 = 1;
/// Points deducted for each transfer beyond [`FREE_TRANSFERS`].
pub const TRANSFER_PENALTY: u32 = 4;

/// Amount in tenths of a million euros, so 55 is 5.5M€.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(i32);

impl Price {
    pub const fn from_tenths(tenths: i32) -> Self {
        Self(tenths)
    }

    pub const fn from_millions(millions: i32) -> Self {
        Self(millions * 10)
    }

    /// Rounds to the nearest tenth. Rejects negative and non finite amounts
    /// and anything above [`MAX_PRICE`].
    pub fn from_millions_f64(millions: f64) -> Option<Self> {
        if !millions.is_finite() || millions < 0.0 || millions > MAX_PRICE.as_millions() {
            return None;
        }
        Some(Self((millions * 10.0).round() as i32))
    }

    pub fn tenths(self) -> i32 {
        self.0
    }

    pub fn as_millions(self) -> f64 {
        self.0 as f64 / 10.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        if abs % 10 == 0 {
            write!(f, "{sign}{}M€", abs / 10)
        } else {
            write!(f, "{sign}{}.{}M€", abs / 10, abs % 10)
        }
    }
}

impl Add for Price {
    type Output = Price;

    fn add(self, rhs: Price) -> Price {
        Price(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Price {
    type Output = Price;

    fn sub(self, rhs: Price) -> Price {
        Price(self.0.saturating_sub(rhs.0))
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Price>>(iter: I) -> Price {
        iter.fold(Price::default(), Add::add)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Formation {
    #[serde(rename = "4-2-0")]
    F420,
    #[serde(rename = "3-3-0")]
    F330,
    #[serde(rename = "3-2-1")]
    F321,
    #[serde(rename = "2-3-1")]
    F231,
    #[serde(rename = "2-2-2")]
    F222,
}

impl Formation {
    pub const ALL: [Formation; 5] = [
        Formation::F420,
        Formation::F330,
        Formation::F321,
        Formation::F231,
        Formation::F222,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Formation::F420 => "4-2-0",
            Formation::F330 => "3-3-0",
            Formation::F321 => "3-2-1",
            Formation::F231 => "2-3-1",
            Formation::F222 => "2-2-2",
        }
    }

    /// Defenders, midfielders, attackers.
    pub fn lines(&self) -> (usize, usize, usize) {
        match self {
            Formation::F420 => (4, 2, 0),
            Formation::F330 => (3, 3, 0),
            Formation::F321 => (3, 2, 1),
            Formation::F231 => (2, 3, 1),
            Formation::F222 => (2, 2, 2),
        }
    }

    pub fn required(&self, position: Position) -> usize {
        let (defenders, midfielders, attackers) = self.lines();
        match position {
            Position::Goalkeeper => 1,
            Position::Defender => defenders,
            Position::Midfielder => midfielders,
            Position::Attacker => attackers,
        }
    }
}

impl fmt::Display for Formation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Formation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Formation::ALL
            .into_iter()
            .find(|formation| formation.as_str() == s)
            .ok_or_else(|| format!("Formation inconnue: {s}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FantasySlot {
    pub player_id: Uuid,
    pub position: Position,
    pub price: Price,
    pub points: i32,
    pub is_captain: bool,
}

#[derive(Debug, Clone)]
pub struct SquadDraft {
    pub name: String,
    pub formation: Formation,
    pub slots: Vec<FantasySlot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Validation {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl Validation {
    pub fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }

    pub fn into_result(self) -> Result<(), Vec<String>> {
        if self.valid {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

pub fn total_cost(slots: &[FantasySlot]) -> Price {
    slots.iter().map(|slot| slot.price).sum()
}

pub fn remaining_budget(slots: &[FantasySlot]) -> Price {
    TOTAL_BUDGET - total_cost(slots)
}

fn count_at(slots: &[FantasySlot], position: Position) -> usize {
    slots.iter().filter(|slot| slot.position == position).count()
}

/// Squad size and exact per-position counts for the formation.
pub fn validate_composition(slots: &[FantasySlot], formation: Formation) -> Validation {
    let mut errors = Vec::new();

    if slots.len() != SQUAD_SIZE {
        errors.push(format!(
            "L'équipe doit compter exactement {SQUAD_SIZE} joueurs ({} sélectionnés)",
            slots.len()
        ));
    }

    for position in Position::ALL {
        let required = formation.required(position);
        let actual = count_at(slots, position);
        if actual != required {
            errors.push(format!(
                "La formation {formation} exige {required} {} (actuellement {actual})",
                position.label(required)
            ));
        }
    }

    Validation::from_errors(errors)
}

pub fn validate_budget(slots: &[FantasySlot]) -> Validation {
    let total = total_cost(slots);
    if total > TOTAL_BUDGET {
        let overage = total - TOTAL_BUDGET;
        return Validation::from_errors(vec![format!(
            "Budget dépassé de {overage} (total {total} pour un budget de {TOTAL_BUDGET})"
        )]);
    }
    Validation::from_errors(Vec::new())
}

/// Incremental check run before a player is added while building a squad.
pub fn can_add_player(
    slots: &[FantasySlot],
    formation: Formation,
    candidate: &FantasySlot,
) -> Validation {
    let mut errors = Vec::new();

    if slots.iter().any(|slot| slot.player_id == candidate.player_id) {
        errors.push("Ce joueur fait déjà partie de votre équipe".to_string());
    }

    let required = formation.required(candidate.position);
    if count_at(slots, candidate.position) >= required {
        errors.push(format!(
            "Plus de place pour un {} dans la formation {formation}",
            candidate.position
        ));
    }

    let remaining = remaining_budget(slots);
    if candidate.price > remaining {
        errors.push(format!(
            "Budget insuffisant : {} requis, {remaining} restant",
            candidate.price
        ));
    }

    Validation::from_errors(errors)
}

pub fn validate_transfer(
    slots: &[FantasySlot],
    outgoing: Uuid,
    incoming: &FantasySlot,
) -> Validation {
    let mut errors = Vec::new();

    let Some(out) = slots.iter().find(|slot| slot.player_id == outgoing) else {
        errors.push("Le joueur sortant ne fait pas partie de votre équipe".to_string());
        return Validation::from_errors(errors);
    };

    if slots.iter().any(|slot| slot.player_id == incoming.player_id) {
        errors.push("Le joueur entrant fait déjà partie de votre équipe".to_string());
    }

    if out.position != incoming.position {
        errors.push(format!(
            "Un transfert doit remplacer un {} par un joueur du même poste (reçu : {})",
            out.position, incoming.position
        ));
    }

    let delta = incoming.price - out.price;
    let remaining = remaining_budget(slots);
    if delta > remaining {
        errors.push(format!(
            "Budget insuffisant pour ce transfert : il manque {}",
            delta - remaining
        ));
    }

    Validation::from_errors(errors)
}

/// Replaces `outgoing` by `incoming`. The armband follows the slot.
pub fn apply_transfer(
    slots: &[FantasySlot],
    outgoing: Uuid,
    incoming: FantasySlot,
) -> Result<Vec<FantasySlot>, Vec<String>> {
    validate_transfer(slots, outgoing, &incoming).into_result()?;

    Ok(slots
        .iter()
        .map(|slot| {
            if slot.player_id == outgoing {
                FantasySlot {
                    is_captain: slot.is_captain,
                    ..incoming.clone()
                }
            } else {
                slot.clone()
            }
        })
        .collect())
}

pub fn validate_team(draft: &SquadDraft) -> Validation {
    let mut errors = Vec::new();

    if draft.name.trim().is_empty() {
        errors.push("Le nom de l'équipe est obligatoire".to_string());
    }

    errors.extend(validate_composition(&draft.slots, draft.formation).errors);
    errors.extend(validate_budget(&draft.slots).errors);

    match draft.slots.iter().filter(|slot| slot.is_captain).count() {
        0 => errors.push("Vous devez désigner un capitaine".to_string()),
        1 => {}
        _ => errors.push("Un seul capitaine est autorisé".to_string()),
    }

    Validation::from_errors(errors)
}

pub fn set_captain(slots: &mut [FantasySlot], player_id: Uuid) -> Result<(), String> {
    if !slots.iter().any(|slot| slot.player_id == player_id) {
        return Err("Le capitaine doit faire partie de l'équipe".to_string());
    }
    for slot in slots.iter_mut() {
        slot.is_captain = slot.player_id == player_id;
    }
    Ok(())
}

pub fn transfer_penalty(transfers_made: u32) -> u32 {
    transfers_made
        .saturating_sub(FREE_TRANSFERS)
        .saturating_mul(TRANSFER_PENALTY)
}

/// Squad score with the captain counted twice.
pub fn squad_points(slots: &[FantasySlot]) -> i32 {
    slots.iter().fold(0i32, |total, slot| {
        let points = if slot.is_captain {
            slot.points.saturating_mul(2)
        } else {
            slot.points
        };
        total.saturating_add(points)
    })
}

/// Launch price of a freshly approved player.
pub fn default_price(position: Position) -> Price {
    match position {
        Position::Goalkeeper => Price::from_tenths(50),
        Position::Defender => Price::from_tenths(55),
        Position::Midfielder => Price::from_tenths(60),
        Position::Attacker => Price::from_tenths(70),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchLine {
    pub goals: i32,
    pub assists: i32,
    pub yellow_cards: i32,
    pub red_cards: i32,
    pub clean_sheet: bool,
}

/// Fantasy points earned by a player who took part in a match.
pub fn match_points(position: Position, line: &MatchLine) -> i32 {
    let per_goal = match position {
        Position::Goalkeeper | Position::Defender => 6,
        Position::Midfielder => 5,
        Position::Attacker => 4,
    };
    let clean_sheet = match position {
        Position::Goalkeeper | Position::Defender if line.clean_sheet => 4,
        Position::Midfielder if line.clean_sheet => 1,
        _ => 0,
    };

    2i32.saturating_add(line.goals.saturating_mul(per_goal))
        .saturating_add(line.assists.saturating_mul(3))
        .saturating_add(clean_sheet)
        .saturating_sub(line.yellow_cards)
        .saturating_sub(line.red_cards.saturating_mul(3))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(position: Position, millions: i32) -> FantasySlot {
        FantasySlot {
            player_id: Uuid::new_v4(),
            position,
            price: Price::from_millions(millions),
            points: 0,
            is_captain: false,
        }
    }

    /// Full squad for `formation`, prices taken in order from `prices`.
    fn squad(formation: Formation, prices: &[i32]) -> Vec<FantasySlot> {
        let mut positions = Vec::new();
        for position in Position::ALL {
            for _ in 0..formation.required(position) {
                positions.push(position);
            }
        }
        positions
            .into_iter()
            .zip(prices.iter().cycle())
            .map(|(position, price)| slot(position, *price))
            .collect()
    }

    fn draft(formation: Formation, slots: Vec<FantasySlot>) -> SquadDraft {
        SquadDraft {
            name: "Les Lions".to_string(),
            formation,
            slots,
        }
    }

    #[test]
    fn test_every_formation_fills_the_squad() {
        for formation in Formation::ALL {
            let total: usize = Position::ALL.iter().map(|p| formation.required(*p)).sum();
            assert_eq!(total, SQUAD_SIZE, "{formation}");
            assert_eq!(formation.required(Position::Goalkeeper), 1);
        }
    }

    #[test]
    fn test_formation_parsing() {
        assert_eq!("3-2-1".parse::<Formation>(), Ok(Formation::F321));
        assert!("5-1-0".parse::<Formation>().is_err());
        for formation in Formation::ALL {
            assert_eq!(formation.as_str().parse::<Formation>(), Ok(formation));
        }
    }

    #[test]
    fn test_price_display() {
        assert_eq!(Price::from_tenths(55).to_string(), "5.5M€");
        assert_eq!(Price::from_millions(100).to_string(), "100M€");
        assert_eq!(Price::from_tenths(-15).to_string(), "-1.5M€");
        assert_eq!(Price::from_millions_f64(6.25), Some(Price::from_tenths(63)));
        assert_eq!(Price::from_millions_f64(-1.0), None);
        assert_eq!(Price::from_millions_f64(f64::NAN), None);
    }

    #[test]
    fn test_price_above_budget_is_rejected() {
        assert_eq!(Price::from_millions_f64(100.0), Some(TOTAL_BUDGET));
        assert_eq!(Price::from_millions_f64(100.05), None);
        assert_eq!(Price::from_millions_f64(214_748_364.0), None);
    }

    #[test]
    fn test_huge_prices_never_wrap_under_budget() {
        let mut slots = squad(Formation::F321, &[5]);
        slots[0].price = Price::from_tenths(i32::MAX - 5);
        slots[1].price = Price::from_tenths(i32::MAX - 5);

        let result = validate_budget(&slots);

        assert!(!result.valid);
        assert!(total_cost(&slots) > TOTAL_BUDGET);
    }

    #[test]
    fn test_points_saturate() {
        let mut slots = squad(Formation::F321, &[5]);
        slots[0].points = i32::MAX;
        slots[0].is_captain = true;
        slots[1].points = i32::MAX;

        assert_eq!(squad_points(&slots), i32::MAX);
        assert_eq!(transfer_penalty(u32::MAX), u32::MAX);

        let line = MatchLine {
            goals: i32::MAX,
            ..MatchLine::default()
        };
        assert_eq!(match_points(Position::Attacker, &line), i32::MAX);
    }

    #[test]
    fn test_matching_composition_is_valid_for_all_formations() {
        for formation in Formation::ALL {
            let slots = squad(formation, &[5]);
            let result = validate_composition(&slots, formation);
            assert!(result.valid, "{formation}: {:?}", result.errors);
        }
    }

    #[test]
    fn test_composition_reports_each_mismatched_position() {
        // 4-2-0 squad checked against 2-2-2: defenders over, attackers under
        let slots = squad(Formation::F420, &[5]);
        let result = validate_composition(&slots, Formation::F222);
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 2);
        assert!(result.errors.iter().any(|e| e.contains("Défenseurs")));
        assert!(result.errors.iter().any(|e| e.contains("Attaquants")));
    }

    #[test]
    fn test_composition_rejects_wrong_squad_size() {
        let mut slots = squad(Formation::F321, &[5]);
        slots.pop();
        let result = validate_composition(&slots, Formation::F321);
        assert!(!result.valid);
        assert!(result.errors[0].contains("exactement 7 joueurs"));
    }

    #[test]
    fn test_budget_example_from_league_rules() {
        let slots = squad(Formation::F321, &[5, 6, 6, 7, 7, 6, 9]);
        assert_eq!(total_cost(&slots), Price::from_millions(46));
        assert!(validate_budget(&slots).valid);
        assert!(validate_composition(&slots, Formation::F321).valid);

        // 46 - 9 + 64 = 101
        let mut expensive = slots.clone();
        expensive[6].price = Price::from_millions(64);
        let result = validate_budget(&expensive);
        assert!(!result.valid);
        assert!(result.errors[0].contains("Budget dépassé de 1M€"), "{:?}", result.errors);
    }

    #[test]
    fn test_budget_boundary() {
        let mut slots = squad(Formation::F222, &[10]);
        slots[0].price = Price::from_millions(40);
        assert_eq!(total_cost(&slots), TOTAL_BUDGET);
        assert!(validate_budget(&slots).valid);

        slots[0].price = Price::from_tenths(405);
        let result = validate_budget(&slots);
        assert!(!result.valid);
        assert!(result.errors[0].contains("0.5M€"));
    }

    #[test]
    fn test_cannot_add_to_full_position_even_with_budget() {
        for formation in Formation::ALL {
            let slots = squad(formation, &[1]);
            for position in Position::ALL {
                let candidate = slot(position, 0);
                let result = can_add_player(&slots, formation, &candidate);
                assert!(!result.valid, "{formation} {position}");
                assert!(result.errors.iter().any(|e| e.contains("Plus de place")));
            }
        }
    }

    #[test]
    fn test_add_player_checks() {
        let slots = vec![slot(Position::Goalkeeper, 5), slot(Position::Defender, 90)];

        let ok = can_add_player(&slots, Formation::F321, &slot(Position::Midfielder, 5));
        assert!(ok.valid, "{:?}", ok.errors);

        let duplicate = FantasySlot {
            position: Position::Defender,
            ..slots[1].clone()
        };
        let result = can_add_player(&slots, Formation::F321, &duplicate);
        assert!(result.errors.iter().any(|e| e.contains("déjà")));

        let too_expensive = can_add_player(&slots, Formation::F321, &slot(Position::Attacker, 6));
        assert!(!too_expensive.valid);
        assert!(too_expensive.errors[0].contains("Budget insuffisant"));
        assert!(too_expensive.errors[0].contains("5M€ restant"));
    }

    #[test]
    fn test_transfer_across_positions_always_fails() {
        let slots = squad(Formation::F222, &[5]);
        for out in &slots {
            for position in Position::ALL {
                if position == out.position {
                    continue;
                }
                for millions in [0, 5, 50] {
                    let incoming = slot(position, millions);
                    let result = validate_transfer(&slots, out.player_id, &incoming);
                    assert!(!result.valid);
                }
            }
        }
    }

    #[test]
    fn test_transfer_budget_and_membership() {
        let slots = squad(Formation::F321, &[10]);
        let out = slots[1].clone();

        let same_price = slot(out.position, 10);
        assert!(validate_transfer(&slots, out.player_id, &same_price).valid);

        // 70 spent, 30 left: a 40M€ step up is short by 0
        let step_up = slot(out.position, 40);
        assert!(validate_transfer(&slots, out.player_id, &step_up).valid);
        let too_much = slot(out.position, 41);
        let result = validate_transfer(&slots, out.player_id, &too_much);
        assert!(result.errors[0].contains("il manque 1M€"));

        let unknown = validate_transfer(&slots, Uuid::new_v4(), &same_price);
        assert!(unknown.errors[0].contains("sortant"));

        let already_in = validate_transfer(&slots, out.player_id, &slots[2]);
        assert!(already_in.errors.iter().any(|e| e.contains("entrant")));
    }

    #[test]
    fn test_apply_transfer_keeps_captaincy() {
        let mut slots = squad(Formation::F321, &[10]);
        let out = slots[3].player_id;
        set_captain(&mut slots, out).unwrap();

        let incoming = slot(slots[3].position, 8);
        let incoming_id = incoming.player_id;
        let updated = apply_transfer(&slots, out, incoming).unwrap();

        assert_eq!(updated.len(), SQUAD_SIZE);
        assert!(updated.iter().all(|s| s.player_id != out));
        let new_slot = updated.iter().find(|s| s.player_id == incoming_id).unwrap();
        assert!(new_slot.is_captain);
        assert_eq!(total_cost(&updated), Price::from_millions(68));
    }

    #[test]
    fn test_captain_rules() {
        let mut slots = squad(Formation::F330, &[5]);

        let none = validate_team(&draft(Formation::F330, slots.clone()));
        assert!(!none.valid);
        assert_eq!(none.errors, vec!["Vous devez désigner un capitaine".to_string()]);

        slots[0].is_captain = true;
        slots[4].is_captain = true;
        let several = validate_team(&draft(Formation::F330, slots.clone()));
        assert_eq!(several.errors, vec!["Un seul capitaine est autorisé".to_string()]);

        let captain = slots[4].player_id;
        set_captain(&mut slots, captain).unwrap();
        let one = validate_team(&draft(Formation::F330, slots.clone()));
        assert!(one.valid, "{:?}", one.errors);

        assert!(set_captain(&mut slots, Uuid::new_v4()).is_err());
    }

    #[test]
    fn test_validate_team_accumulates_errors() {
        let mut slots = squad(Formation::F420, &[20]);
        slots.truncate(6);
        let result = validate_team(&SquadDraft {
            name: "   ".to_string(),
            formation: Formation::F420,
            slots,
        });
        assert!(!result.valid);
        // name, size, midfielders, budget, captain
        assert_eq!(result.errors.len(), 5, "{:?}", result.errors);
    }

    #[test]
    fn test_transfer_penalty() {
        assert_eq!(transfer_penalty(0), 0);
        assert_eq!(transfer_penalty(1), 0);
        assert_eq!(transfer_penalty(2), 4);
        assert_eq!(transfer_penalty(4), 12);
    }

    #[test]
    fn test_squad_points_double_captain() {
        let mut slots = squad(Formation::F321, &[5]);
        for (i, s) in slots.iter_mut().enumerate() {
            s.points = i as i32;
        }
        assert_eq!(squad_points(&slots), 21);
        let captain = slots[6].player_id;
        set_captain(&mut slots, captain).unwrap();
        assert_eq!(squad_points(&slots), 27);
    }

    #[test]
    fn test_match_points() {
        let line = MatchLine {
            goals: 2,
            assists: 1,
            ..Default::default()
        };
        assert_eq!(match_points(Position::Attacker, &line), 2 + 8 + 3);
        assert_eq!(match_points(Position::Defender, &line), 2 + 12 + 3);

        let keeper = MatchLine {
            clean_sheet: true,
            yellow_cards: 1,
            ..Default::default()
        };
        assert_eq!(match_points(Position::Goalkeeper, &keeper), 2 + 4 - 1);
        assert_eq!(match_points(Position::Attacker, &keeper), 2 - 1);

        let sent_off = MatchLine {
            red_cards: 1,
            ..Default::default()
        };
        assert_eq!(match_points(Position::Midfielder, &sent_off), -1);
    }
}
