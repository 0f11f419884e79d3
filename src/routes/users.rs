use std::collections::HashMap;

use actix_web::{delete, get, patch, post, web, HttpResponse};
use chrono::Utc;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Deserialize;

use crate::middleware::AuthUser;
use crate::models::dto::{self, UserDetail, UserListItem};
use crate::models::users::{
    self, is_valid_role, ActiveModel as UserActiveModel, Column as UserColumn, Entity as Users,
};
use crate::utils::{password, validation};

// DTO pour les filtres de la liste
#[derive(Deserialize)]
pub struct ListUsersQuery {
    pub search: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
}

// DTO pour la création d'un compte
#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
    pub password: Option<String>,
}

fn forbidden() -> HttpResponse {
    HttpResponse::Forbidden().json(serde_json::json!({
        "success": false,
        "error": "Accès réservé au super administrateur"
    }))
}

fn user_not_found() -> HttpResponse {
    HttpResponse::NotFound().json(serde_json::json!({
        "success": false,
        "error": "Utilisateur non trouvé"
    }))
}

fn db_error(e: sea_orm::DbErr) -> HttpResponse {
    HttpResponse::InternalServerError().json(serde_json::json!({
        "success": false,
        "error": format!("Database error: {}", e)
    }))
}

/// Base du username : prénom+nom en minuscules sans caractères spéciaux,
/// sinon la partie locale de l'email
fn derive_username_base(first_name: &str, last_name: &str, email: &str) -> String {
    let base: String = format!("{}{}", first_name, last_name)
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect::<String>()
        .to_lowercase();

    if !base.is_empty() {
        return base;
    }

    let local_part = email.split('@').next().unwrap_or("");
    let fallback: String = local_part
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect::<String>()
        .to_lowercase();

    if fallback.is_empty() {
        "utilisateur".to_string()
    } else {
        fallback
    }
}

/// Valide la création d'un compte et cumule toutes les erreurs par champ
fn validate_new_user(
    req: &CreateUserRequest,
    email_in_use: bool,
) -> HashMap<&'static str, String> {
    let mut errors = HashMap::new();

    let first_name = req.first_name.as_deref().unwrap_or("").trim();
    if first_name.is_empty() {
        errors.insert("first_name", "Le prénom est requis".to_string());
    } else if first_name.chars().count() < 2 {
        errors.insert(
            "first_name",
            "Le prénom doit contenir au moins 2 caractères".to_string(),
        );
    }

    let last_name = req.last_name.as_deref().unwrap_or("").trim();
    if last_name.is_empty() {
        errors.insert("last_name", "Le nom est requis".to_string());
    } else if last_name.chars().count() < 2 {
        errors.insert(
            "last_name",
            "Le nom doit contenir au moins 2 caractères".to_string(),
        );
    }

    let email = req.email.as_deref().unwrap_or("").trim();
    if email.is_empty() {
        errors.insert("email", "L'email est requis".to_string());
    } else if !validation::is_valid_email(email) {
        errors.insert("email", "Format d'email invalide".to_string());
    } else if email_in_use {
        errors.insert("email", "Cet email est déjà utilisé".to_string());
    }

    let role = req.role.as_deref().unwrap_or("").trim();
    if role.is_empty() {
        errors.insert("role", "Le rôle est requis".to_string());
    } else if !is_valid_role(role) {
        errors.insert("role", "Rôle invalide".to_string());
    }

    let password_input = req.password.as_deref().unwrap_or("");
    if password_input.is_empty() {
        errors.insert("password", "Le mot de passe est requis".to_string());
    } else if password_input.chars().count() < 8 {
        errors.insert(
            "password",
            "Le mot de passe doit contenir au moins 8 caractères".to_string(),
        );
    }

    errors
}

/// GET /users - Liste filtrable des comptes (PROTÉGÉE, lecture pour tous)
#[get("/users")]
pub async fn list_users(
    auth_user: AuthUser,
    query: web::Query<ListUsersQuery>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    let mut finder = Users::find().order_by_asc(UserColumn::Id);

    // 1. Recherche insensible à la casse sur prénom / nom / email / username
    if let Some(term) = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        let pattern = format!("%{}%", term.to_lowercase());
        finder = finder.filter(
            Condition::any()
                .add(
                    Expr::expr(Func::lower(Expr::col(UserColumn::FirstName)))
                        .like(pattern.clone()),
                )
                .add(Expr::expr(Func::lower(Expr::col(UserColumn::LastName))).like(pattern.clone()))
                .add(Expr::expr(Func::lower(Expr::col(UserColumn::Email))).like(pattern.clone()))
                .add(Expr::expr(Func::lower(Expr::col(UserColumn::Username))).like(pattern)),
        );
    }

    // 2. Filtres exacts
    if let Some(role) = query.role.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        finder = finder.filter(UserColumn::Role.eq(role));
    }

    if let Some(is_active) = query.is_active {
        finder = finder.filter(UserColumn::IsActive.eq(is_active));
    }

    // 3. Projection décorée (numéro, code, nom affiché, initiales)
    match finder.all(db.get_ref()).await {
        Ok(found) => {
            let items: Vec<UserListItem> = found
                .iter()
                .enumerate()
                .map(|(position, user)| UserListItem::from_model(user, position))
                .collect();

            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "can_manage": auth_user.user.is_super_admin(),
                "total": items.len(),
                "users": items
            }))
        }
        Err(e) => db_error(e),
    }
}

/// GET /users/{id} - Fiche complète d'un compte (SUPER ADMIN)
#[get("/users/{user_id}")]
pub async fn get_user_detail(
    auth_user: AuthUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    if !auth_user.user.is_super_admin() {
        return forbidden();
    }

    let user_id = path.into_inner();

    match Users::find_by_id(user_id).one(db.get_ref()).await {
        Ok(Some(user)) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "user": UserDetail::from_model(&user)
        })),
        Ok(None) => user_not_found(),
        Err(e) => db_error(e),
    }
}

/// POST /users/create - Créer un compte (SUPER ADMIN)
#[post("/users/create")]
pub async fn create_user(
    auth_user: AuthUser,
    body: web::Json<CreateUserRequest>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    if !auth_user.user.is_super_admin() {
        return forbidden();
    }

    // 1. L'email est-il déjà pris ? (uniquement si le champ est exploitable)
    let email = body.email.as_deref().unwrap_or("").trim().to_string();
    let email_in_use = if !email.is_empty() && validation::is_valid_email(&email) {
        match Users::find()
            .filter(users::email_eq_insensitive(&email))
            .one(db.get_ref())
            .await
        {
            Ok(existing) => existing.is_some(),
            Err(e) => return db_error(e),
        }
    } else {
        false
    };

    // 2. Validation cumulée champ par champ
    let errors = validate_new_user(&body, email_in_use);
    if !errors.is_empty() {
        let email_conflict = errors
            .get("email")
            .map(|msg| msg == "Cet email est déjà utilisé")
            .unwrap_or(false);

        let mut response = if email_conflict {
            HttpResponse::Conflict()
        } else {
            HttpResponse::BadRequest()
        };

        return response.json(serde_json::json!({
            "success": false,
            "message": "Erreurs de validation",
            "errors": errors
        }));
    }

    let first_name = body.first_name.as_deref().unwrap_or("").trim().to_string();
    let last_name = body.last_name.as_deref().unwrap_or("").trim().to_string();
    let role = body.role.as_deref().unwrap_or("").trim().to_string();
    let phone = body.phone.as_deref().unwrap_or("").trim().to_string();
    let password_input = body.password.as_deref().unwrap_or("").to_string();

    // 3. Username unique : base puis suffixe incrémental
    let base = derive_username_base(&first_name, &last_name, &email);
    let mut username = base.clone();
    let mut suffix = 1;
    loop {
        match Users::find()
            .filter(UserColumn::Username.eq(&username))
            .one(db.get_ref())
            .await
        {
            Ok(None) => break,
            Ok(Some(_)) => {
                username = format!("{}{}", base, suffix);
                suffix += 1;
            }
            Err(e) => return db_error(e),
        }
    }

    // 4. Hash + miroir en clair pour l'affichage admin
    let password_hash = match password::hash_password(&password_input) {
        Ok(hash) => hash,
        Err(e) => {
            return HttpResponse::InternalServerError().json(serde_json::json!({
                "success": false,
                "error": format!("Failed to hash password: {}", e)
            }));
        }
    };

    let now = Utc::now().naive_utc();
    let new_user = UserActiveModel {
        username: Set(username),
        password: Set(password_hash),
        password_plain: Set(Some(password_input)),
        email: Set(email),
        first_name: Set(first_name),
        last_name: Set(last_name),
        phone: Set(phone),
        role: Set(role),
        is_active: Set(body.is_active.unwrap_or(true)),
        is_superuser: Set(false),
        email_verified: Set(false),
        date_joined: Set(now),
        last_login: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    match new_user.insert(db.get_ref()).await {
        Ok(user) => HttpResponse::Created().json(serde_json::json!({
            "success": true,
            "message": "Utilisateur créé avec succès",
            "user": {
                "id": user.id,
                "code": dto::user_code(user.id),
                "username": user.username,
                "email": user.email,
                "first_name": user.first_name,
                "last_name": user.last_name,
                "display_name": user.display_name(),
                "initials": user.initials(),
                "role": user.role,
                "role_display": user.role_display(),
                "phone": user.phone,
                "is_active": user.is_active
            }
        })),
        Err(e) => db_error(e),
    }
}

/// PATCH /users/{id}/toggle-status - Activer/désactiver un compte (SUPER ADMIN)
#[patch("/users/{user_id}/toggle-status")]
pub async fn toggle_user_status(
    auth_user: AuthUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    if !auth_user.user.is_super_admin() {
        return forbidden();
    }

    let user_id = path.into_inner();

    // Anti auto-verrouillage : on ne touche pas à son propre compte
    if user_id == auth_user.user.id {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "success": false,
            "error": "Vous ne pouvez pas désactiver votre propre compte"
        }));
    }

    let user = match Users::find_by_id(user_id).one(db.get_ref()).await {
        Ok(Some(user)) => user,
        Ok(None) => return user_not_found(),
        Err(e) => return db_error(e),
    };

    let new_state = !user.is_active;
    let mut active_model: UserActiveModel = user.into();
    active_model.is_active = Set(new_state);

    let message = if new_state {
        "Utilisateur activé"
    } else {
        "Utilisateur désactivé"
    };

    match active_model.update(db.get_ref()).await {
        Ok(user) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "message": message,
            "user_id": user.id,
            "is_active": user.is_active
        })),
        Err(e) => db_error(e),
    }
}

/// DELETE /users/{id}/delete - Supprimer définitivement un compte (SUPER ADMIN)
#[delete("/users/{user_id}/delete")]
pub async fn delete_user(
    auth_user: AuthUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    if !auth_user.user.is_super_admin() {
        return forbidden();
    }

    let user_id = path.into_inner();

    if user_id == auth_user.user.id {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "success": false,
            "error": "Vous ne pouvez pas supprimer votre propre compte"
        }));
    }

    match Users::find_by_id(user_id).one(db.get_ref()).await {
        Ok(Some(_)) => {}
        Ok(None) => return user_not_found(),
        Err(e) => return db_error(e),
    }

    // Suppression définitive ; codes et sessions suivent par cascade
    match Users::delete_by_id(user_id).exec(db.get_ref()).await {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "message": "Utilisateur supprimé avec succès"
        })),
        Err(e) => db_error(e),
    }
}

pub fn user_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(list_users)
        .service(create_user)
        .service(get_user_detail)
        .service(toggle_user_status)
        .service(delete_user);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(
        first_name: &str,
        last_name: &str,
        email: &str,
        role: &str,
        password: &str,
    ) -> CreateUserRequest {
        CreateUserRequest {
            first_name: Some(first_name.to_string()),
            last_name: Some(last_name.to_string()),
            email: Some(email.to_string()),
            phone: None,
            role: Some(role.to_string()),
            is_active: None,
            password: Some(password.to_string()),
        }
    }

    #[test]
    fn test_username_base_from_names() {
        assert_eq!(derive_username_base("Jean", "Dupont", "x@y.fr"), "jeandupont");
        assert_eq!(
            derive_username_base("Marie-Claire", "De La Tour", "x@y.fr"),
            "marieclairedelatour"
        );
    }

    #[test]
    fn test_username_base_keeps_letters_only() {
        assert_eq!(derive_username_base("Jean!", "D.", "x@y.fr"), "jeand");
    }

    #[test]
    fn test_username_base_falls_back_to_email_local_part() {
        assert_eq!(derive_username_base("", "", "paul.martin@y.fr"), "paulmartin");
        assert_eq!(derive_username_base("--", "!!", "formation@y.fr"), "formation");
    }

    #[test]
    fn test_username_base_last_resort() {
        assert_eq!(derive_username_base("", "", "---@y.fr"), "utilisateur");
    }

    #[test]
    fn test_valid_request_has_no_errors() {
        let req = request("Jean", "Dupont", "jean@x.com", "etudiant", "longenough1");
        assert!(validate_new_user(&req, false).is_empty());
    }

    #[test]
    fn test_errors_accumulate_across_fields() {
        let req = request("J", "", "pas-un-email", "pilote", "court");
        let errors = validate_new_user(&req, false);

        assert_eq!(errors.len(), 5);
        assert_eq!(
            errors["first_name"],
            "Le prénom doit contenir au moins 2 caractères"
        );
        assert_eq!(errors["last_name"], "Le nom est requis");
        assert_eq!(errors["email"], "Format d'email invalide");
        assert_eq!(errors["role"], "Rôle invalide");
        assert_eq!(
            errors["password"],
            "Le mot de passe doit contenir au moins 8 caractères"
        );
    }

    #[test]
    fn test_missing_everything_is_all_required() {
        let req = CreateUserRequest {
            first_name: None,
            last_name: None,
            email: None,
            phone: None,
            role: None,
            is_active: None,
            password: None,
        };
        let errors = validate_new_user(&req, false);

        assert_eq!(errors["first_name"], "Le prénom est requis");
        assert_eq!(errors["last_name"], "Le nom est requis");
        assert_eq!(errors["email"], "L'email est requis");
        assert_eq!(errors["role"], "Le rôle est requis");
        assert_eq!(errors["password"], "Le mot de passe est requis");
    }

    #[test]
    fn test_duplicate_email_is_reported() {
        let req = request("Jean", "Dupont", "jean@x.com", "etudiant", "longenough1");
        let errors = validate_new_user(&req, true);

        assert_eq!(errors.len(), 1);
        assert_eq!(errors["email"], "Cet email est déjà utilisé");
    }
}
