pub mod auth;
pub mod health;
pub mod password_reset;
pub mod users;

use actix_web::web;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(health::health_check)
            .configure(auth::auth_routes)
            .configure(users::user_routes)
            .configure(password_reset::password_reset_routes),
    );
}
