//! Checks on registration content before it is stored.

use std::collections::HashSet;

use crate::models::{Contact, PlayerInfo};
use crate::text::looks_like_email;

pub const MAX_PLAYERS: usize = 15;

pub fn contact_errors(role: &str, contact: &Contact) -> Vec<String> {
    let mut errors = Vec::new();
    if contact.first_name.trim().is_empty() || contact.last_name.trim().is_empty() {
        errors.push(format!("Le nom et le prénom du {role} sont obligatoires"));
    }
    if !looks_like_email(&contact.email) {
        errors.push(format!("L'adresse e-mail du {role} est invalide"));
    }
    errors
}

/// Every problem in the player list, one message each.
pub fn roster_errors(players: &[PlayerInfo]) -> Vec<String> {
    let mut errors = Vec::new();

    if players.len() > MAX_PLAYERS {
        errors.push(format!("Une équipe ne peut pas compter plus de {MAX_PLAYERS} joueurs"));
    }

    let mut jerseys = HashSet::new();
    let mut emails = HashSet::new();
    for player in players {
        let name = format!("{} {}", player.first_name.trim(), player.last_name.trim());
        if player.first_name.trim().is_empty() || player.last_name.trim().is_empty() {
            errors.push("Chaque joueur doit avoir un nom et un prénom".to_string());
        }
        if !(1..=99).contains(&player.jersey_number) {
            errors.push(format!("Numéro de maillot invalide pour {name} (1 à 99)"));
        } else if !jerseys.insert(player.jersey_number) {
            errors.push(format!("Le numéro {} est attribué deux fois", player.jersey_number));
        }
        if let Some(email) = &player.email {
            if !looks_like_email(email) {
                errors.push(format!("L'adresse e-mail de {name} est invalide"));
            } else if !emails.insert(email.trim().to_lowercase()) {
                errors.push(format!("L'adresse {email} est utilisée par deux joueurs"));
            }
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Foot, Position};

    fn player(first: &str, jersey: i32, email: Option<&str>) -> PlayerInfo {
        PlayerInfo {
            first_name: first.to_string(),
            last_name: "Martin".to_string(),
            email: email.map(str::to_string),
            phone: None,
            position: Position::Midfielder,
            foot: Foot::Right,
            jersey_number: jersey,
            birth_date: None,
            height_cm: None,
            weight_kg: None,
        }
    }

    #[test]
    fn test_valid_roster() {
        let players = vec![
            player("Lucas", 1, Some("lucas@example.fr")),
            player("Hugo", 2, None),
            player("Léa", 3, Some("lea@example.fr")),
        ];
        assert!(roster_errors(&players).is_empty());
    }

    #[test]
    fn test_duplicates_and_ranges() {
        let players = vec![
            player("Lucas", 7, Some("same@example.fr")),
            player("Hugo", 7, Some("SAME@example.fr")),
            player("", 120, Some("broken")),
        ];
        let errors = roster_errors(&players);
        assert_eq!(errors.len(), 5, "{errors:?}");
        assert!(errors.iter().any(|e| e.contains("attribué deux fois")));
        assert!(errors.iter().any(|e| e.contains("deux joueurs")));
        assert!(errors.iter().any(|e| e.contains("1 à 99")));
    }

    #[test]
    fn test_contact_errors() {
        let contact = Contact {
            first_name: "Nadia".to_string(),
            last_name: " ".to_string(),
            email: "nadia@".to_string(),
            phone: String::new(),
        };
        assert_eq!(contact_errors("capitaine", &contact).len(), 2);
    }
}
