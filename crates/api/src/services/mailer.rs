use std::time::Duration;

use serde::Serialize;

use crate::config::EmailConfig;
use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

/// Sends outbox e-mails through the provider's HTTP API, or only logs them
/// when no API key is configured.
#[derive(Clone)]
pub enum Mailer {
    Http {
        client: reqwest::Client,
        api_url: String,
        api_key: String,
        from: String,
    },
    Log,
}

impl Mailer {
    pub fn from_config(config: &EmailConfig) -> Result<Self, AppError> {
        let Some(api_key) = config.api_key.clone() else {
            tracing::warn!("EMAIL_API_KEY not set, e-mails will only be logged");
            return Ok(Mailer::Log);
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Mailer::Http {
            client,
            api_url: config.api_url.clone(),
            api_key,
            from: config.from.clone(),
        })
    }

    pub async fn send(&self, email: &Email) -> Result<(), AppError> {
        match self {
            Mailer::Log => {
                tracing::info!(to = %email.to, subject = %email.subject, "e-mail (not sent, log-only mailer)");
                Ok(())
            }
            Mailer::Http {
                client,
                api_url,
                api_key,
                from,
            } => {
                let response = client
                    .post(format!("{api_url}/emails"))
                    .bearer_auth(api_key)
                    .json(&SendEmailRequest {
                        from: from.as_str(),
                        to: [email.to.as_str()],
                        subject: &email.subject,
                        html: &email.html,
                    })
                    .send()
                    .await
                    .map_err(|e| AppError::Internal(format!("Failed to reach e-mail provider: {}", e)))?;

                if !response.status().is_success() {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    return Err(AppError::Internal(format!(
                        "E-mail provider answered {status}: {body}"
                    )));
                }
                Ok(())
            }
        }
    }
}
