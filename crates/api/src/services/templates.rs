//! Rendering of outbox messages into e-mails.

use infra::repos::{AccountRole, OutboxMessage};

use super::mailer::Email;

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn layout(body: &str) -> String {
    format!(
        r#"<!doctype html><html><body style="font-family: sans-serif; color: #1d2a3a">{body}<p style="color: #6b7785; font-size: 12px">Ligue scolaire de football</p></body></html>"#
    )
}

pub fn setup_link(base_url: &str, token: &str) -> String {
    format!("{base_url}/accounts/setup?token={}", urlencoding::encode(token))
}

pub fn tracking_pixel(base_url: &str, receipt_id: &uuid::Uuid) -> String {
    format!("{base_url}/notifications/track/{receipt_id}")
}

pub fn render(recipient: &str, message: &OutboxMessage, base_url: &str) -> Email {
    let (subject, body) = match message {
        OutboxMessage::AccountSetup {
            name,
            team_name,
            role,
            token,
        } => {
            let role = match role {
                AccountRole::Coach => "coach",
                AccountRole::Player | AccountRole::Admin => "joueur",
            };
            (
                format!("Votre compte {role} - {team_name}"),
                format!(
                    r#"<p>Bonjour {},</p><p>L'équipe <strong>{}</strong> a été validée. Un compte {role} a été créé pour vous.</p><p><a href="{}">Choisir mon mot de passe</a></p><p>Ce lien est valable 14 jours.</p>"#,
                    escape(name),
                    escape(team_name),
                    setup_link(base_url, token)
                ),
            )
        }
        OutboxMessage::Notification {
            receipt_id,
            title,
            message,
        } => (
            title.clone(),
            format!(
                r#"<h2>{}</h2><p>{}</p><img src="{}" width="1" height="1" alt="">"#,
                escape(title),
                escape(message).replace('\n', "<br>"),
                tracking_pixel(base_url, receipt_id)
            ),
        ),
        OutboxMessage::SpectatorDecision {
            name,
            match_label,
            kickoff_at,
            approved,
        } => {
            let when = kickoff_at.format("%d/%m/%Y à %H:%M");
            if *approved {
                (
                    format!("Demande acceptée : {match_label}"),
                    format!(
                        "<p>Bonjour {},</p><p>Votre venue au match {} du {when} est confirmée. Présentez-vous à l'entrée avec une pièce d'identité.</p>",
                        escape(name),
                        escape(match_label)
                    ),
                )
            } else {
                (
                    format!("Demande refusée : {match_label}"),
                    format!(
                        "<p>Bonjour {},</p><p>Nous ne pouvons malheureusement pas accepter votre demande pour le match {} du {when}.</p>",
                        escape(name),
                        escape(match_label)
                    ),
                )
            }
        }
        OutboxMessage::RegistrationDecision {
            captain_name,
            team_name,
            approved,
            reason,
        } => {
            if *approved {
                (
                    format!("Inscription validée : {team_name}"),
                    format!(
                        "<p>Bonjour {},</p><p>L'inscription de l'équipe <strong>{}</strong> est validée. Chaque joueur va recevoir ses identifiants.</p>",
                        escape(captain_name),
                        escape(team_name)
                    ),
                )
            } else {
                let reason = reason
                    .as_deref()
                    .map(|r| format!("<p>Motif : {}</p>", escape(r)))
                    .unwrap_or_default();
                (
                    format!("Inscription refusée : {team_name}"),
                    format!(
                        "<p>Bonjour {},</p><p>L'inscription de l'équipe <strong>{}</strong> n'a pas été retenue.</p>{reason}",
                        escape(captain_name),
                        escape(team_name)
                    ),
                )
            }
        }
    };

    Email {
        to: recipient.to_string(),
        subject,
        html: layout(&body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_setup_email_links_to_setup_page() {
        let email = render(
            "lea@example.fr",
            &OutboxMessage::AccountSetup {
                name: "Léa Martin".to_string(),
                team_name: "Les Aigles".to_string(),
                role: AccountRole::Player,
                token: "abc-123".to_string(),
            },
            "https://ligue.example.fr",
        );

        assert_eq!(email.to, "lea@example.fr");
        assert_eq!(email.subject, "Votre compte joueur - Les Aigles");
        assert!(email
            .html
            .contains("https://ligue.example.fr/accounts/setup?token=abc-123"));
    }

    #[test]
    fn test_notification_embeds_tracking_pixel_and_escapes() {
        let receipt_id = Uuid::new_v4();
        let email = render(
            "coach@example.fr",
            &OutboxMessage::Notification {
                receipt_id,
                title: "Match <reporté>".to_string(),
                message: "Rendez-vous samedi".to_string(),
            },
            "http://localhost:8080",
        );

        assert!(email
            .html
            .contains(&format!("http://localhost:8080/notifications/track/{receipt_id}")));
        assert!(email.html.contains("Match &lt;reporté&gt;"));
    }

    #[test]
    fn test_rejection_mentions_reason() {
        let email = render(
            "capitaine@example.fr",
            &OutboxMessage::RegistrationDecision {
                captain_name: "Inès".to_string(),
                team_name: "Les Aigles".to_string(),
                approved: false,
                reason: Some("Dossier incomplet".to_string()),
            },
            "http://localhost:8080",
        );

        assert_eq!(email.subject, "Inscription refusée : Les Aigles");
        assert!(email.html.contains("Motif : Dossier incomplet"));
    }
}
