use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::auth::password::PasswordService;
use crate::error::AppError;
use crate::state::AppState;
use infra::repos::AccountRepo;

#[derive(Deserialize)]
pub struct SetupQuery {
    pub token: Option<String>,
}

#[derive(Deserialize)]
pub struct SetupRequest {
    pub token: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct SetupResponse {
    pub token: String,
    pub email: String,
    pub role: String,
}

/// GET /accounts/setup?token=… - page linked from the credential e-mail
pub async fn setup_page(Query(params): Query<SetupQuery>) -> impl IntoResponse {
    let token = params.token.unwrap_or_default();
    let token_json = script_string(&token);

    Html(format!(
        r#"
        <!DOCTYPE html>
        <html lang="fr">
        <head>
            <meta charset="utf-8">
            <title>Création du mot de passe</title>
            <style>
                body {{ font-family: Arial, sans-serif; max-width: 420px; margin: 60px auto; padding: 20px; }}
                input, button {{ width: 100%; padding: 10px; margin: 8px 0; box-sizing: border-box; }}
                #message {{ margin-top: 12px; }}
            </style>
        </head>
        <body>
            <h2>Choisissez votre mot de passe</h2>
            <form id="setup">
                <input type="password" id="password" placeholder="Mot de passe" required minlength="8">
                <input type="password" id="confirm" placeholder="Confirmation" required minlength="8">
                <button type="submit">Valider</button>
            </form>
            <div id="message"></div>
            <script>
                const token = {token_json};
                document.getElementById('setup').addEventListener('submit', async (event) => {{
                    event.preventDefault();
                    const password = document.getElementById('password').value;
                    const message = document.getElementById('message');
                    if (password !== document.getElementById('confirm').value) {{
                        message.textContent = 'Les mots de passe ne correspondent pas.';
                        return;
                    }}
                    const response = await fetch('/accounts/setup', {{
                        method: 'POST',
                        headers: {{ 'Content-Type': 'application/json' }},
                        body: JSON.stringify({{ token, password }})
                    }});
                    const body = await response.json();
                    message.textContent = response.ok
                        ? 'Votre compte est prêt, vous pouvez vous connecter.'
                        : body.error;
                }});
            </script>
        </body>
        </html>
        "#
    ))
}

/// JSON string literal safe to inline in a `<script>` element.
fn script_string(value: &str) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|_| "\"\"".to_string())
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
}

/// POST /accounts/setup - store the first password of a player or coach
pub async fn complete_setup(
    State(state): State<AppState>,
    Json(request): Json<SetupRequest>,
) -> Result<Json<SetupResponse>, AppError> {
    if request.token.trim().is_empty() {
        return Err(AppError::BadRequest("missing setup token".to_string()));
    }
    PasswordService::validate_password_strength(&request.password)?;
    let password_hash = PasswordService::hash_password(&request.password)?;

    let login = AccountRepo::new(state.db.clone())
        .complete_setup(request.token.trim(), &password_hash)
        .await?;
    let role = login
        .role
        .parse()
        .map_err(|e: String| AppError::Internal(e))?;

    let token = state
        .jwt_service()
        .create_token(login.id, login.email.clone(), role, login.team_id)?;

    tracing::info!(account_id = %login.id, role = %login.role, "account setup completed");
    Ok(Json(SetupResponse {
        token,
        email: login.email,
        role: login.role,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn page_for(token: &str) -> String {
        let response = setup_page(Query(SetupQuery {
            token: Some(token.to_string()),
        }))
        .await
        .into_response();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(body.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_token_cannot_close_the_script() {
        let page = page_for("</script><script>alert(1)</script>").await;

        assert_eq!(page.matches("</script>").count(), 1);
        assert!(!page.contains("<script>alert(1)"));
        assert!(page.contains(r#"const token = "\u003c/script\u003e\u003cscript\u003ealert(1)"#));
    }

    #[tokio::test]
    async fn test_plain_token_is_inlined() {
        let page = page_for("abc_DEF-123").await;

        assert!(page.contains(r#"const token = "abc_DEF-123";"#));
    }

    #[test]
    fn test_script_string_escapes_markup() {
        assert_eq!(script_string("a<b>&c"), r#""a\u003cb\u003e\u0026c""#);
    }
}
