use actix_web::cookie::{Cookie, SameSite};
use actix_web::{get, post, web, HttpResponse};
use chrono::{Duration, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::Deserialize;
use uuid::Uuid;

use crate::middleware::auth::{AuthUser, CSRF_COOKIE, SESSION_COOKIE};
use crate::models::dto::UserPublic;
use crate::models::sessions::{self, ActiveModel as SessionActiveModel, Entity as Sessions, SESSION_TTL_HOURS};
use crate::models::users::{self, ActiveModel as UserActiveModel, Entity as Users};
use crate::utils::{password, validation};

// DTO pour la connexion
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

// DTO pour changer le mot de passe
#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: Option<String>,
    pub new_password: Option<String>,
    pub confirm_password: Option<String>,
}

/// Crée une ligne de session pour l'utilisateur (token + jeton CSRF)
async fn open_session(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<sessions::Model, sea_orm::DbErr> {
    let now = Utc::now().naive_utc();

    let session = SessionActiveModel {
        user_id: Set(user_id),
        token: Set(Uuid::new_v4().to_string()),
        csrf_token: Set(Uuid::new_v4().to_string()),
        created_at: Set(now),
        expires_at: Set(now + Duration::hours(SESSION_TTL_HOURS)),
        ..Default::default()
    };

    session.insert(db).await
}

fn session_cookies(session: &sessions::Model) -> (Cookie<'static>, Cookie<'static>) {
    let session_cookie = Cookie::build(SESSION_COOKIE, session.token.clone())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .finish();

    // Lisible côté frontend pour renvoyer le header X-CSRF-Token
    let csrf_cookie = Cookie::build(CSRF_COOKIE, session.csrf_token.clone())
        .path("/")
        .same_site(SameSite::Lax)
        .finish();

    (session_cookie, csrf_cookie)
}

fn removal_cookies() -> (Cookie<'static>, Cookie<'static>) {
    let mut session_cookie = Cookie::build(SESSION_COOKIE, "").path("/").finish();
    session_cookie.make_removal();

    let mut csrf_cookie = Cookie::build(CSRF_COOKIE, "").path("/").finish();
    csrf_cookie.make_removal();

    (session_cookie, csrf_cookie)
}

/// POST /login - Se connecter par email + mot de passe (PUBLIC)
#[post("/login")]
pub async fn login(
    body: web::Json<LoginRequest>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    // 1. Validation des champs
    let email = body.email.as_deref().unwrap_or("").trim().to_string();
    let password_input = body.password.as_deref().unwrap_or("");

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

    if password_input.is_empty() {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "success": false,
            "error": "Le mot de passe est requis",
            "field": "password"
        }));
    }

    // Pré-contrôle de longueur, pas un contrôle de sécurité
    if password_input.chars().count() < 3 {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "success": false,
            "error": "Le mot de passe doit contenir au moins 3 caractères",
            "field": "password"
        }));
    }

    // 2. Recherche par email, insensible à la casse
    let user = match Users::find()
        .filter(users::email_eq_insensitive(&email))
        .one(db.get_ref())
        .await
    {
        Ok(Some(user)) => user,
        Ok(None) => {
            return HttpResponse::NotFound().json(serde_json::json!({
                "success": false,
                "error": "Aucun compte trouvé avec cet email",
                "error_type": "email_not_found"
            }));
        }
        Err(e) => {
            return HttpResponse::InternalServerError().json(serde_json::json!({
                "success": false,
                "error": format!("Database error: {}", e)
            }));
        }
    };

    // 3. Compte actif ?
    if !user.is_active {
        return HttpResponse::Forbidden().json(serde_json::json!({
            "success": false,
            "error": "Ce compte est désactivé. Contactez l'administrateur.",
            "error_type": "account_inactive"
        }));
    }

    // 4. Vérification du mot de passe
    let is_valid = match password::verify_password(password_input, &user.password) {
        Ok(valid) => valid,
        Err(e) => {
            return HttpResponse::InternalServerError().json(serde_json::json!({
                "success": false,
                "error": format!("Password verification error: {}", e)
            }));
        }
    };

    if !is_valid {
        return HttpResponse::Unauthorized().json(serde_json::json!({
            "success": false,
            "error": "Mot de passe incorrect",
            "error_type": "wrong_password"
        }));
    }

    // 5. Repli du flag superuser hérité sur le rôle, une seule fois,
    //    puis mise à jour de last_login
    let mut active_model: UserActiveModel = user.clone().into();
    if user.is_superuser && user.role != "super_admin" {
        active_model.role = Set("super_admin".to_string());
    }
    active_model.last_login = Set(Some(Utc::now().naive_utc()));

    let user = match active_model.update(db.get_ref()).await {
        Ok(user) => user,
        Err(e) => {
            return HttpResponse::InternalServerError().json(serde_json::json!({
                "success": false,
                "error": format!("Failed to update user: {}", e)
            }));
        }
    };

    // 6. Ouverture de la session + cookies
    let session = match open_session(db.get_ref(), user.id).await {
        Ok(session) => session,
        Err(e) => {
            return HttpResponse::InternalServerError().json(serde_json::json!({
                "success": false,
                "error": format!("Failed to create session: {}", e)
            }));
        }
    };

    let (session_cookie, csrf_cookie) = session_cookies(&session);

    HttpResponse::Ok()
        .cookie(session_cookie)
        .cookie(csrf_cookie)
        .json(serde_json::json!({
            "success": true,
            "message": "Connexion réussie",
            "user": UserPublic::from_model(&user)
        }))
}

/// POST /logout - Détruire la session courante (PROTÉGÉE)
#[post("/logout")]
pub async fn logout(auth_user: AuthUser, db: web::Data<DatabaseConnection>) -> HttpResponse {
    match Sessions::delete_by_id(auth_user.session_id)
        .exec(db.get_ref())
        .await
    {
        Ok(_) => {
            let (session_cookie, csrf_cookie) = removal_cookies();
            HttpResponse::Ok()
                .cookie(session_cookie)
                .cookie(csrf_cookie)
                .json(serde_json::json!({
                    "success": true,
                    "message": "Déconnexion réussie"
                }))
        }
        Err(e) => HttpResponse::InternalServerError().json(serde_json::json!({
            "success": false,
            "error": format!("Database error: {}", e)
        })),
    }
}

/// GET /me - Profil de l'utilisateur connecté (PROTÉGÉE)
#[get("/me")]
pub async fn me(auth_user: AuthUser) -> HttpResponse {
    let user = &auth_user.user;

    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "id": user.id,
        "username": user.username,
        "email": user.email,
        "first_name": user.first_name,
        "last_name": user.last_name,
        "role": user.role,
        "phone": user.phone,
        "email_verified": user.email_verified,
        "created_at": user.created_at.format("%Y-%m-%d %H:%M:%S").to_string()
    }))
}

/// POST /change-password - Changer son mot de passe (PROTÉGÉE)
#[post("/change-password")]
pub async fn change_password(
    auth_user: AuthUser,
    body: web::Json<ChangePasswordRequest>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    let old_password = body.old_password.as_deref().unwrap_or("");
    let new_password = body.new_password.as_deref().unwrap_or("");
    let confirm_password = body.confirm_password.as_deref().unwrap_or("");

    // 1. Vérifier l'ancien mot de passe
    let old_is_valid = match password::verify_password(old_password, &auth_user.user.password) {
        Ok(valid) => valid,
        Err(e) => {
            return HttpResponse::InternalServerError().json(serde_json::json!({
                "success": false,
                "error": format!("Password verification error: {}", e)
            }));
        }
    };

    if !old_is_valid {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "success": false,
            "error": "L'ancien mot de passe est incorrect",
            "field": "old_password"
        }));
    }

    // 2. Les deux nouveaux doivent correspondre
    if new_password != confirm_password {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "success": false,
            "error": "Les nouveaux mots de passe ne correspondent pas",
            "field": "confirm_password"
        }));
    }

    // 3. Longueur minimale
    if new_password.chars().count() < 8 {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "success": false,
            "error": "Le mot de passe doit contenir au moins 8 caractères",
            "field": "new_password"
        }));
    }

    // 4. Rehacher et mettre à jour, avec le miroir en clair pour l'admin
    let new_hash = match password::hash_password(new_password) {
        Ok(hash) => hash,
        Err(e) => {
            return HttpResponse::InternalServerError().json(serde_json::json!({
                "success": false,
                "error": format!("Failed to hash password: {}", e)
            }));
        }
    };

    let mut active_model: UserActiveModel = auth_user.user.clone().into();
    active_model.password = Set(new_hash);
    active_model.password_plain = Set(Some(new_password.to_string()));

    let user = match active_model.update(db.get_ref()).await {
        Ok(user) => user,
        Err(e) => {
            return HttpResponse::InternalServerError().json(serde_json::json!({
                "success": false,
                "error": format!("Failed to update password: {}", e)
            }));
        }
    };

    // 5. Rotation de la session : on détruit l'ancienne et on en rouvre une
    if let Err(e) = Sessions::delete_by_id(auth_user.session_id)
        .exec(db.get_ref())
        .await
    {
        return HttpResponse::InternalServerError().json(serde_json::json!({
            "success": false,
            "error": format!("Database error: {}", e)
        }));
    }

    let session = match open_session(db.get_ref(), user.id).await {
        Ok(session) => session,
        Err(e) => {
            return HttpResponse::InternalServerError().json(serde_json::json!({
                "success": false,
                "error": format!("Failed to create session: {}", e)
            }));
        }
    };

    let (session_cookie, csrf_cookie) = session_cookies(&session);

    HttpResponse::Ok()
        .cookie(session_cookie)
        .cookie(csrf_cookie)
        .json(serde_json::json!({
            "success": true,
            "message": "Mot de passe modifié avec succès"
        }))
}

pub fn auth_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(login)
        .service(logout)
        .service(me)
        .service(change_password);
}
