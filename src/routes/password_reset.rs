use actix_web::{post, web, HttpResponse};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use tracing::warn;

use crate::models::password_reset_codes::{
    self, ActiveModel as ResetCodeActiveModel, Column as ResetCodeColumn,
    Entity as PasswordResetCodes,
};
use crate::models::users::{self, ActiveModel as UserActiveModel, Entity as Users};
use crate::utils::{email as mailer, password, validation};

// DTO pour la demande de code
#[derive(Deserialize)]
pub struct ResetRequestBody {
    pub email: Option<String>,
}

// DTO pour la vérification du code
#[derive(Deserialize)]
pub struct VerifyCodeBody {
    pub email: Option<String>,
    pub code: Option<String>,
}

// DTO pour la confirmation avec nouveau mot de passe
#[derive(Deserialize)]
pub struct ConfirmResetBody {
    pub email: Option<String>,
    pub code: Option<String>,
    pub new_password: Option<String>,
}

fn db_error(e: sea_orm::DbErr) -> HttpResponse {
    HttpResponse::InternalServerError().json(serde_json::json!({
        "success": false,
        "error": format!("Database error: {}", e)
    }))
}

fn invalid_code() -> HttpResponse {
    HttpResponse::BadRequest().json(serde_json::json!({
        "success": false,
        "error": "Code invalide",
        "error_type": "invalid_code"
    }))
}

fn expired_code() -> HttpResponse {
    HttpResponse::BadRequest().json(serde_json::json!({
        "success": false,
        "error": "Code expiré. Veuillez demander un nouveau code.",
        "error_type": "expired_code"
    }))
}

/// Retrouve le code non utilisé le plus récent pour cet email (insensible à
/// la casse) et cette valeur exacte
async fn find_reset_code(
    db: &DatabaseConnection,
    email: &str,
    code: &str,
) -> Result<Option<password_reset_codes::Model>, sea_orm::DbErr> {
    PasswordResetCodes::find()
        .filter(password_reset_codes::email_eq_insensitive(email))
        .filter(ResetCodeColumn::Code.eq(code))
        .filter(ResetCodeColumn::IsUsed.eq(false))
        .order_by_desc(ResetCodeColumn::CreatedAt)
        .one(db)
        .await
}

/// POST /password-reset/request - Demander un code par email (PUBLIC)
#[post("/request")]
pub async fn request_password_reset(
    body: web::Json<ResetRequestBody>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    // 1. Validation de l'email
    let email = body.email.as_deref().unwrap_or("").trim().to_string();

    if email.is_empty() {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "success": false,
            "error": "L'email est requis",
            "field": "email"
        }));
    }

    if !validation::is_valid_email(&email) {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "success": false,
            "error": "Format d'email invalide",
            "field": "email"
        }));
    }

    // 2. Recherche du compte, insensible à la casse
    let user = match Users::find()
        .filter(users::email_eq_insensitive(&email))
        .one(db.get_ref())
        .await
    {
        Ok(Some(user)) => user,
        Ok(None) => {
            return HttpResponse::NotFound().json(serde_json::json!({
                "success": false,
                "error": "Aucun compte trouvé avec cet email"
            }));
        }
        Err(e) => return db_error(e),
    };

    // 3. Invalider les codes encore actifs : au plus un code utilisable
    if let Err(e) = PasswordResetCodes::update_many()
        .col_expr(ResetCodeColumn::IsUsed, Expr::value(true))
        .filter(ResetCodeColumn::UserId.eq(user.id))
        .filter(ResetCodeColumn::IsUsed.eq(false))
        .exec(db.get_ref())
        .await
    {
        return db_error(e);
    }

    // 4. Nouveau code à 6 chiffres, lié à l'email canonique du compte
    let code = password_reset_codes::Model::generate_code();
    let record = ResetCodeActiveModel {
        user_id: Set(user.id),
        code: Set(code.clone()),
        email: Set(user.email.clone()),
        created_at: Set(Utc::now().naive_utc()),
        is_used: Set(false),
        ..Default::default()
    };

    if let Err(e) = record.insert(db.get_ref()).await {
        return db_error(e);
    }

    // 5. Envoi du code ; un échec d'envoi est loggé mais jamais remonté au
    //    client, le code en base reste utilisable
    if let Err(e) = mailer::send_reset_code(&user.email, &code).await {
        warn!(user_id = user.id, error = %e, "échec d'envoi du code de réinitialisation");
    }

    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Un code de réinitialisation a été envoyé à votre adresse email"
    }))
}

/// POST /password-reset/verify - Vérifier un code sans le consommer (PUBLIC)
#[post("/verify")]
pub async fn verify_reset_code(
    body: web::Json<VerifyCodeBody>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    let email = body.email.as_deref().unwrap_or("").trim();
    let code = body.code.as_deref().unwrap_or("").trim();

    if email.is_empty() {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "success": false,
            "error": "L'email est requis",
            "field": "email"
        }));
    }

    if code.is_empty() {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "success": false,
            "error": "Le code est requis",
            "field": "code"
        }));
    }

    match find_reset_code(db.get_ref(), email, code).await {
        Ok(Some(reset_code)) => {
            // Expiré mais pas consommé : une nouvelle demande reste le seul
            // moyen d'obtenir un code utilisable
            if !reset_code.is_valid() {
                return expired_code();
            }

            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "message": "Code vérifié avec succès"
            }))
        }
        Ok(None) => invalid_code(),
        Err(e) => db_error(e),
    }
}

/// POST /password-reset/confirm - Consommer le code et changer le mot de passe (PUBLIC)
#[post("/confirm")]
pub async fn reset_password(
    body: web::Json<ConfirmResetBody>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    let email = body.email.as_deref().unwrap_or("").trim();
    let code = body.code.as_deref().unwrap_or("").trim();
    let new_password = body.new_password.as_deref().unwrap_or("");

    // 1. Nouveau mot de passe présent et assez long
    if new_password.is_empty() {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "success": false,
            "error": "Le nouveau mot de passe est requis",
            "field": "new_password"
        }));
    }

    if new_password.chars().count() < 8 {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "success": false,
            "error": "Le mot de passe doit contenir au moins 8 caractères",
            "field": "new_password"
        }));
    }

    // 2. Même recherche que pour la vérification
    let reset_code = match find_reset_code(db.get_ref(), email, code).await {
        Ok(Some(reset_code)) => reset_code,
        Ok(None) => return invalid_code(),
        Err(e) => return db_error(e),
    };

    if !reset_code.is_valid() {
        return expired_code();
    }

    // 3. Changer le mot de passe du propriétaire du code
    let user = match Users::find_by_id(reset_code.user_id).one(db.get_ref()).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return HttpResponse::NotFound().json(serde_json::json!({
                "success": false,
                "error": "Utilisateur non trouvé"
            }));
        }
        Err(e) => return db_error(e),
    };

    let new_hash = match password::hash_password(new_password) {
        Ok(hash) => hash,
        Err(e) => {
            return HttpResponse::InternalServerError().json(serde_json::json!({
                "success": false,
                "error": format!("Failed to hash password: {}", e)
            }));
        }
    };

    let mut user_active: UserActiveModel = user.into();
    user_active.password = Set(new_hash);
    user_active.password_plain = Set(Some(new_password.to_string()));

    if let Err(e) = user_active.update(db.get_ref()).await {
        return db_error(e);
    }

    // 4. Le code est consommé, état terminal ; les sessions existantes
    //    restent ouvertes
    let mut code_active: ResetCodeActiveModel = reset_code.into();
    code_active.is_used = Set(true);

    if let Err(e) = code_active.update(db.get_ref()).await {
        return db_error(e);
    }

    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Mot de passe réinitialisé avec succès"
    }))
}

pub fn password_reset_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/password-reset")
            .service(request_password_reset)
            .service(verify_reset_code)
            .service(reset_password),
    );
}
