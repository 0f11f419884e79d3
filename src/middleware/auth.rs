use actix_web::http::Method;
use actix_web::{dev::Payload, web, Error, FromRequest, HttpRequest, HttpResponse};
use futures::future::LocalBoxFuture;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use crate::models::sessions::{Column as SessionColumn, Entity as Sessions};
use crate::models::users::{self, Entity as Users};

pub const SESSION_COOKIE: &str = "session_token";
pub const CSRF_COOKIE: &str = "csrf_token";
pub const CSRF_HEADER: &str = "X-CSRF-Token";

/// Principal authentifié, extrait du cookie de session
/// Utilisé comme extracteur dans les routes protégées
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: users::Model,
    pub session_id: i32,
}

fn unauthorized(message: &str) -> Error {
    let response = HttpResponse::Unauthorized().json(serde_json::json!({
        "success": false,
        "error": message
    }));
    actix_web::error::InternalError::from_response("", response).into()
}

fn forbidden(message: &str) -> Error {
    let response = HttpResponse::Forbidden().json(serde_json::json!({
        "success": false,
        "error": message
    }));
    actix_web::error::InternalError::from_response("", response).into()
}

fn server_error(message: &str) -> Error {
    let response = HttpResponse::InternalServerError().json(serde_json::json!({
        "success": false,
        "error": message
    }));
    actix_web::error::InternalError::from_response("", response).into()
}

/// Implémentation de FromRequest pour AuthUser
/// L'extracteur valide la session en base, charge l'utilisateur et, sur les
/// méthodes modifiantes, contrôle le header X-CSRF-Token (double-submit)
impl FromRequest for AuthUser {
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let req = req.clone();

        Box::pin(async move {
            // 1. Récupérer la connexion BD partagée
            let db = match req.app_data::<web::Data<DatabaseConnection>>() {
                Some(db) => db.clone(),
                None => return Err(server_error("Database connection not configured")),
            };

            // 2. Extraire le cookie de session
            let token = match req.cookie(SESSION_COOKIE) {
                Some(cookie) => cookie.value().to_string(),
                None => return Err(unauthorized("Authentification requise")),
            };

            // 3. Retrouver la session
            let session = match Sessions::find()
                .filter(SessionColumn::Token.eq(&token))
                .one(db.get_ref())
                .await
            {
                Ok(Some(session)) => session,
                Ok(None) => return Err(unauthorized("Session invalide ou expirée")),
                Err(e) => return Err(server_error(&format!("Database error: {}", e))),
            };

            if session.is_expired() {
                return Err(unauthorized("Session invalide ou expirée"));
            }

            // 4. Contrôle CSRF sur les méthodes modifiantes
            let method = req.method();
            let safe_method =
                *method == Method::GET || *method == Method::HEAD || *method == Method::OPTIONS;
            if !safe_method {
                let header_token = req
                    .headers()
                    .get(CSRF_HEADER)
                    .and_then(|value| value.to_str().ok());
                if header_token != Some(session.csrf_token.as_str()) {
                    return Err(forbidden("Jeton CSRF manquant ou invalide"));
                }
            }

            // 5. Charger l'utilisateur propriétaire
            let user = match Users::find_by_id(session.user_id).one(db.get_ref()).await {
                Ok(Some(user)) => user,
                Ok(None) => return Err(unauthorized("Session invalide ou expirée")),
                Err(e) => return Err(server_error(&format!("Database error: {}", e))),
            };

            if !user.is_active {
                return Err(unauthorized("Ce compte est désactivé"));
            }

            Ok(AuthUser {
                user,
                session_id: session.id,
            })
        })
    }
}
