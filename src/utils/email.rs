use std::env;

use tracing::info;

/// Envoie le code de réinitialisation par email via l'API HTTP configurée.
///
/// Sans MAIL_API_URL, le code est simplement affiché dans les logs (mode
/// développement, comme le backend console d'origine). L'appelant décide quoi
/// faire d'une erreur de transport ; les handlers de reset l'avalent.
pub async fn send_reset_code(to: &str, code: &str) -> Result<(), String> {
    let api_url = match env::var("MAIL_API_URL") {
        Ok(url) if !url.trim().is_empty() => url,
        _ => {
            info!(to, code, "MAIL_API_URL absent, code de réinitialisation loggé");
            return Ok(());
        }
    };

    let from = env::var("MAIL_FROM").unwrap_or_else(|_| "no-reply@crm-formation.local".to_string());
    let api_key = env::var("MAIL_API_KEY").unwrap_or_default();

    let body = serde_json::json!({
        "from": from,
        "to": to,
        "subject": "Réinitialisation de votre mot de passe",
        "text": format!(
            "Votre code de réinitialisation est : {}\n\nCe code expire dans 5 minutes.",
            code
        ),
    });

    let client = reqwest::Client::new();
    let response = client
        .post(&api_url)
        .bearer_auth(api_key)
        .json(&body)
        .send()
        .await
        .map_err(|e| format!("Mail transport error: {}", e))?;

    if response.status().is_success() {
        Ok(())
    } else {
        Err(format!("Mail API returned {}", response.status()))
    }
}
